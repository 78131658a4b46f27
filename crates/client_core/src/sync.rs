use std::sync::Arc;

use shared::{
    domain::{AccountAddress, Task, TaskId, TodoListResource},
    error::LedgerError,
    protocol::TableItemRequest,
};
use thiserror::Error;
use tracing::{debug, info};

use crate::{gateway::LedgerGateway, module::ListModule};

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("failed to read todo list of {owner}: {source}")]
    Resource {
        owner: AccountAddress,
        source: LedgerError,
    },
    #[error("todo list of {owner} is malformed: {reason}")]
    MalformedResource { owner: AccountAddress, reason: String },
    #[error("failed to read task {key} of {owner}: {source}")]
    Task {
        owner: AccountAddress,
        key: TaskId,
        source: LedgerError,
    },
    #[error("task {key} of {owner} is malformed: {reason}")]
    MalformedTask {
        owner: AccountAddress,
        key: TaskId,
        reason: String,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListSnapshot {
    pub list_exists: bool,
    pub tasks: Vec<Task>,
}

impl ListSnapshot {
    pub fn absent() -> Self {
        Self::default()
    }
}

pub struct ListSynchronizer {
    gateway: Arc<dyn LedgerGateway>,
    module: ListModule,
}

impl ListSynchronizer {
    pub fn new(gateway: Arc<dyn LedgerGateway>, module: ListModule) -> Self {
        Self { gateway, module }
    }

    pub async fn sync(&self, account: Option<&AccountAddress>) -> Result<ListSnapshot, SyncError> {
        let Some(owner) = account else {
            return Ok(ListSnapshot::absent());
        };

        let resource = match self
            .gateway
            .account_resource(owner, &self.module.resource_type())
            .await
        {
            Ok(resource) => resource,
            Err(LedgerError::NotFound(message)) => {
                debug!(%owner, %message, "no todo list under account");
                return Ok(ListSnapshot::absent());
            }
            Err(source) => {
                return Err(SyncError::Resource {
                    owner: owner.clone(),
                    source,
                })
            }
        };

        let list: TodoListResource =
            serde_json::from_value(resource.data).map_err(|e| SyncError::MalformedResource {
                owner: owner.clone(),
                reason: e.to_string(),
            })?;

        let tasks = self.enumerate(owner, &list).await?;
        info!(%owner, tasks = tasks.len(), "todo list synchronized");
        Ok(ListSnapshot {
            list_exists: true,
            tasks,
        })
    }

    // The table has no range scan; keys are read one at a time, in order.
    async fn enumerate(
        &self,
        owner: &AccountAddress,
        list: &TodoListResource,
    ) -> Result<Vec<Task>, SyncError> {
        let value_type = self.module.task_type();
        let mut tasks = Vec::new();

        for key in (1..=list.task_counter).map(TaskId) {
            let request = TableItemRequest::task(value_type.as_str(), key);
            let value = self
                .gateway
                .table_item(list.handle(), &request)
                .await
                .map_err(|source| SyncError::Task {
                    owner: owner.clone(),
                    key,
                    source,
                })?;
            let task: Task = serde_json::from_value(value).map_err(|e| SyncError::MalformedTask {
                owner: owner.clone(),
                key,
                reason: e.to_string(),
            })?;
            if task.id != key {
                return Err(SyncError::MalformedTask {
                    owner: owner.clone(),
                    key,
                    reason: format!("table returned task {} under key {key}", task.id),
                });
            }
            debug!(%owner, task_id = %key, "fetched task");
            tasks.push(task);
        }

        Ok(tasks)
    }
}

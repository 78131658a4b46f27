use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use async_trait::async_trait;
use shared::{
    domain::{AccountAddress, Task, TaskId},
    error::LedgerError,
    protocol::{EntryFunctionPayload, TransactionInfo},
};
use thiserror::Error;
use tokio::sync::{broadcast, Mutex};
use tracing::{debug, error, info, warn};
use wallet_integration::{WalletConnector, WalletError};

pub mod gateway;
pub mod module;
pub mod sync;

pub use gateway::{GatewayOptions, HttpLedgerGateway, LedgerGateway, MissingLedgerGateway};
pub use module::ListModule;
pub use sync::{ListSnapshot, ListSynchronizer, SyncError};

const EVENT_CHANNEL_CAPACITY: usize = 256;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListState {
    pub list_exists: bool,
    pub tasks: Vec<Task>,
    pub pending: bool,
}

#[derive(Debug, Clone)]
pub enum ClientEvent {
    StateChanged(ListState),
    TransactionCommitted {
        function: String,
        info: TransactionInfo,
    },
    Error(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MutationOutcome {
    /// No account is connected; nothing was submitted.
    NoIdentity,
    Committed(TransactionInfo),
}

#[derive(Debug, Error)]
pub enum MutationError {
    #[error("task content must not be empty")]
    EmptyContent,
    #[error("failed to submit {function}: {source}")]
    Submit {
        function: String,
        source: WalletError,
    },
    #[error("transaction {hash} for {function} was not confirmed: {source}")]
    Confirm {
        function: String,
        hash: String,
        source: LedgerError,
    },
}

#[async_trait]
pub trait TodoHandle: Send + Sync {
    async fn current_state(&self) -> ListState;
    async fn on_identity_changed(
        &self,
        account: Option<AccountAddress>,
    ) -> Result<ListState, SyncError>;
    async fn refresh(&self) -> Result<ListState, SyncError>;
    async fn request_create_list(&self) -> Result<MutationOutcome, MutationError>;
    async fn request_add_item(&self, content: &str) -> Result<MutationOutcome, MutationError>;
    async fn request_complete_item(&self, id: TaskId)
        -> Result<MutationOutcome, MutationError>;
    fn subscribe_events(&self) -> broadcast::Receiver<ClientEvent>;
}

pub struct TodoClient {
    wallet: Arc<dyn WalletConnector>,
    gateway: Arc<dyn LedgerGateway>,
    synchronizer: ListSynchronizer,
    module: ListModule,
    inner: Mutex<TodoClientState>,
    pending: AtomicBool,
    events: broadcast::Sender<ClientEvent>,
}

#[derive(Default)]
struct TodoClientState {
    account: Option<AccountAddress>,
    sync_generation: u64,
    list_exists: bool,
    tasks: Vec<Task>,
}

impl TodoClientState {
    fn reset(&mut self) {
        self.list_exists = false;
        self.tasks.clear();
    }
}

// Clears the flag on drop, including cancellation.
struct PendingGuard<'a> {
    flag: &'a AtomicBool,
}

impl<'a> PendingGuard<'a> {
    fn acquire(flag: &'a AtomicBool, operation: &'static str) -> Self {
        if flag.swap(true, Ordering::SeqCst) {
            warn!(operation, "mutation started while another is still pending");
        }
        Self { flag }
    }
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::SeqCst);
    }
}

impl TodoClient {
    pub fn new(
        module: ListModule,
        gateway: Arc<dyn LedgerGateway>,
        wallet: Arc<dyn WalletConnector>,
    ) -> Arc<Self> {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Arc::new(Self {
            wallet,
            synchronizer: ListSynchronizer::new(gateway.clone(), module.clone()),
            gateway,
            module,
            inner: Mutex::new(TodoClientState::default()),
            pending: AtomicBool::new(false),
            events,
        })
    }

    pub fn module(&self) -> &ListModule {
        &self.module
    }

    async fn snapshot(&self) -> ListState {
        let guard = self.inner.lock().await;
        self.snapshot_of(&guard)
    }

    fn snapshot_of(&self, state: &TodoClientState) -> ListState {
        ListState {
            list_exists: state.list_exists,
            tasks: state.tasks.clone(),
            pending: self.pending.load(Ordering::SeqCst),
        }
    }

    async fn emit_state(&self) {
        let state = self.snapshot().await;
        let _ = self.events.send(ClientEvent::StateChanged(state));
    }

    async fn connected_account(&self) -> Option<AccountAddress> {
        self.inner.lock().await.account.clone()
    }

    async fn resync(
        &self,
        account: Option<AccountAddress>,
        generation: u64,
    ) -> Result<ListState, SyncError> {
        let result = self.synchronizer.sync(account.as_ref()).await;

        let mut guard = self.inner.lock().await;
        if guard.sync_generation != generation {
            debug!(?account, "discarding superseded sync result");
            return Ok(self.snapshot_of(&guard));
        }

        match result {
            Ok(snapshot) => {
                guard.list_exists = snapshot.list_exists;
                guard.tasks = snapshot.tasks;
                let state = self.snapshot_of(&guard);
                drop(guard);
                let _ = self.events.send(ClientEvent::StateChanged(state.clone()));
                Ok(state)
            }
            Err(err) => {
                guard.reset();
                let state = self.snapshot_of(&guard);
                drop(guard);
                warn!(error = %err, "todo list could not be read");
                let _ = self.events.send(ClientEvent::Error(err.to_string()));
                let _ = self.events.send(ClientEvent::StateChanged(state));
                Err(err)
            }
        }
    }

    async fn submit_and_confirm(
        &self,
        payload: &EntryFunctionPayload,
    ) -> Result<TransactionInfo, MutationError> {
        let pending = self
            .wallet
            .sign_and_submit(payload)
            .await
            .map_err(|source| MutationError::Submit {
                function: payload.function.clone(),
                source,
            })?;
        info!(function = %payload.function, hash = %pending.hash, "transaction submitted");

        self.gateway
            .wait_for_transaction(&pending)
            .await
            .map_err(|source| MutationError::Confirm {
                function: payload.function.clone(),
                hash: pending.hash.clone(),
                source,
            })
    }

    async fn run_mutation<F>(
        &self,
        operation: &'static str,
        owner: &AccountAddress,
        payload: EntryFunctionPayload,
        patch: F,
    ) -> Result<MutationOutcome, MutationError>
    where
        F: FnOnce(&mut TodoClientState, bool) + Send,
    {
        let pending = PendingGuard::acquire(&self.pending, operation);
        let generation = self.inner.lock().await.sync_generation;
        self.emit_state().await;

        let result = self.submit_and_confirm(&payload).await;

        {
            let mut guard = self.inner.lock().await;
            // A resync since submission already rebuilt state from the ledger.
            if guard.sync_generation == generation && guard.account.as_ref() == Some(owner) {
                patch(&mut *guard, result.is_ok());
            } else {
                warn!(operation, %owner, "list was resynced before confirmation; patch skipped");
            }
        }

        match &result {
            Ok(info) => {
                info!(operation, %owner, hash = %info.hash, "mutation committed");
                let _ = self.events.send(ClientEvent::TransactionCommitted {
                    function: payload.function.clone(),
                    info: info.clone(),
                });
            }
            Err(err) => {
                error!(operation, %owner, error = %err, "mutation failed");
                let _ = self.events.send(ClientEvent::Error(err.to_string()));
            }
        }

        drop(pending);
        self.emit_state().await;
        result.map(MutationOutcome::Committed)
    }
}

/// Assumes this client is the only writer to the list.
pub fn next_task_id(tasks: &[Task]) -> TaskId {
    tasks.last().map_or(TaskId(1), |task| task.id.next())
}

#[async_trait]
impl TodoHandle for Arc<TodoClient> {
    async fn current_state(&self) -> ListState {
        self.snapshot().await
    }

    async fn on_identity_changed(
        &self,
        account: Option<AccountAddress>,
    ) -> Result<ListState, SyncError> {
        let generation = {
            let mut guard = self.inner.lock().await;
            guard.account = account.clone();
            guard.reset();
            guard.sync_generation += 1;
            guard.sync_generation
        };
        info!(?account, "account changed; rebuilding todo list state");
        self.emit_state().await;
        self.resync(account, generation).await
    }

    async fn refresh(&self) -> Result<ListState, SyncError> {
        let (account, generation) = {
            let mut guard = self.inner.lock().await;
            guard.sync_generation += 1;
            (guard.account.clone(), guard.sync_generation)
        };
        self.resync(account, generation).await
    }

    async fn request_create_list(&self) -> Result<MutationOutcome, MutationError> {
        let Some(owner) = self.connected_account().await else {
            debug!("create list ignored: no account connected");
            return Ok(MutationOutcome::NoIdentity);
        };

        let payload = self.module.create_list_payload();
        self.run_mutation("create_list", &owner, payload, |state, committed| {
            state.list_exists = committed;
        })
        .await
    }

    async fn request_add_item(&self, content: &str) -> Result<MutationOutcome, MutationError> {
        let Some(owner) = self.connected_account().await else {
            debug!("add item ignored: no account connected");
            return Ok(MutationOutcome::NoIdentity);
        };
        if content.trim().is_empty() {
            return Err(MutationError::EmptyContent);
        }

        let payload = self.module.create_task_payload(content);
        let task_owner = owner.clone();
        self.run_mutation("add_item", &owner, payload, move |state, committed| {
            if committed {
                let id = next_task_id(&state.tasks);
                state.tasks.push(Task::new(task_owner, id, content));
            }
        })
        .await
    }

    async fn request_complete_item(
        &self,
        id: TaskId,
    ) -> Result<MutationOutcome, MutationError> {
        let Some(owner) = self.connected_account().await else {
            debug!(task_id = %id, "complete item ignored: no account connected");
            return Ok(MutationOutcome::NoIdentity);
        };

        let payload = self.module.complete_task_payload(id);
        self.run_mutation("complete_item", &owner, payload, move |state, committed| {
            if !committed {
                return;
            }
            match state.tasks.iter().position(|task| task.id == id) {
                Some(index) => {
                    let done = state.tasks[index].marked_completed();
                    state.tasks[index] = done;
                }
                None => warn!(task_id = %id, "completed task is not in local state"),
            }
        })
        .await
    }

    fn subscribe_events(&self) -> broadcast::Receiver<ClientEvent> {
        self.events.subscribe()
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;

//! Fixed identifiers of the on-chain todo list module.
//!
//! Every type and function name is namespaced under one module address that
//! comes from configuration; nothing here is discovered at runtime.

use serde_json::Value;
use shared::{
    domain::{AccountAddress, TaskId},
    protocol::EntryFunctionPayload,
};

pub const MODULE_NAME: &str = "todolist";
pub const LIST_RESOURCE: &str = "TodoList";
pub const TASK_STRUCT: &str = "Task";
pub const CREATE_LIST_FN: &str = "create_list";
pub const CREATE_TASK_FN: &str = "create_task";
pub const COMPLETE_TASK_FN: &str = "complete_task";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListModule {
    address: AccountAddress,
}

impl ListModule {
    pub fn new(address: AccountAddress) -> Self {
        Self { address }
    }

    pub fn address(&self) -> &AccountAddress {
        &self.address
    }

    fn qualified(&self, member: &str) -> String {
        format!("{}::{MODULE_NAME}::{member}", self.address)
    }

    pub fn resource_type(&self) -> String {
        self.qualified(LIST_RESOURCE)
    }

    pub fn task_type(&self) -> String {
        self.qualified(TASK_STRUCT)
    }

    pub fn create_list_payload(&self) -> EntryFunctionPayload {
        EntryFunctionPayload::new(self.qualified(CREATE_LIST_FN), Vec::new())
    }

    pub fn create_task_payload(&self, content: &str) -> EntryFunctionPayload {
        EntryFunctionPayload::new(
            self.qualified(CREATE_TASK_FN),
            vec![Value::String(content.to_string())],
        )
    }

    pub fn complete_task_payload(&self, id: TaskId) -> EntryFunctionPayload {
        EntryFunctionPayload::new(
            self.qualified(COMPLETE_TASK_FN),
            vec![Value::String(id.to_string())],
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn module() -> ListModule {
        ListModule::new(AccountAddress::parse("0xCAFE").expect("address"))
    }

    #[test]
    fn qualifies_types_under_module_address() {
        let module = module();
        assert_eq!(module.resource_type(), "0xcafe::todolist::TodoList");
        assert_eq!(module.task_type(), "0xcafe::todolist::Task");
    }

    #[test]
    fn builds_operation_payloads() {
        let module = module();

        let create_list = module.create_list_payload();
        assert_eq!(create_list.kind, "entry_function_payload");
        assert_eq!(create_list.function, "0xcafe::todolist::create_list");
        assert!(create_list.arguments.is_empty());
        assert!(create_list.type_arguments.is_empty());

        let create_task = module.create_task_payload("walk dog");
        assert_eq!(create_task.function, "0xcafe::todolist::create_task");
        assert_eq!(create_task.arguments, vec![Value::String("walk dog".into())]);

        let complete = module.complete_task_payload(TaskId(12));
        assert_eq!(complete.function, "0xcafe::todolist::complete_task");
        assert_eq!(complete.arguments, vec![Value::String("12".into())]);
    }
}

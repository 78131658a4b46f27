//! Plain-text rendering of the list state.

use client_core::ListState;

pub fn render(state: &ListState) -> String {
    if !state.list_exists {
        return "No todo list for this account yet; run `create-list` to add one.".to_string();
    }
    if state.tasks.is_empty() {
        return "Todo list is empty.".to_string();
    }

    let mut out = String::new();
    for task in &state.tasks {
        let mark = if task.completed { 'x' } else { ' ' };
        out.push_str(&format!("[{mark}] {:>3}  {}\n", task.id, task.content));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::domain::{AccountAddress, Task, TaskId};

    #[test]
    fn renders_absent_list_hint() {
        assert!(render(&ListState::default()).contains("create-list"));
    }

    #[test]
    fn renders_tasks_in_order_with_completion_marks() {
        let owner = AccountAddress::parse("0x1").expect("address");
        let state = ListState {
            list_exists: true,
            tasks: vec![
                Task::new(owner.clone(), TaskId(1), "buy milk").marked_completed(),
                Task::new(owner, TaskId(2), "call mom"),
            ],
            pending: false,
        };

        let rendered = render(&state);
        let lines: Vec<&str> = rendered.lines().collect();
        assert_eq!(lines, vec!["[x]   1  buy milk", "[ ]   2  call mom"]);
    }
}

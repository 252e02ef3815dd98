//! Output formatting for CLI client commands.

use crate::types::Task;
use clap::ValueEnum;

/// Output format for client commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable lines
    #[default]
    Text,
    /// JSON as returned by the API
    Json,
}

/// Format a single task as one line: `[x] #3 Buy milk (2024-05-01)`.
pub fn format_task_line(task: &Task) -> String {
    format!(
        "[{}] #{} {} ({})",
        if task.completed { "x" } else { " " },
        task.id,
        task.title,
        task.created_at.format("%Y-%m-%d")
    )
}

/// Format a task list with a summary line.
pub fn format_tasks_text(tasks: &[Task], summary: &str) -> String {
    if tasks.is_empty() {
        return "No tasks yet. Add one with `task-manager add <title>`.\n".to_string();
    }

    let mut out = String::new();
    out.push_str(summary);
    out.push('\n');
    for task in tasks {
        out.push_str(&format_task_line(task));
        out.push('\n');
    }
    out
}

pub fn format_tasks(tasks: &[Task], summary: &str, format: OutputFormat) -> String {
    match format {
        OutputFormat::Text => format_tasks_text(tasks, summary),
        OutputFormat::Json => serde_json::to_string_pretty(tasks).unwrap_or_default() + "\n",
    }
}

pub fn format_task(task: &Task, format: OutputFormat) -> String {
    match format {
        OutputFormat::Text => format_task_line(task) + "\n",
        OutputFormat::Json => serde_json::to_string_pretty(task).unwrap_or_default() + "\n",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn task(id: i64, title: &str, completed: bool) -> Task {
        Task {
            id,
            title: title.to_string(),
            completed,
            created_at: "2024-05-01T10:00:00Z".parse().unwrap(),
        }
    }

    #[test]
    fn task_line_shows_checkbox_and_date() {
        assert_eq!(
            format_task_line(&task(3, "Buy milk", false)),
            "[ ] #3 Buy milk (2024-05-01)"
        );
        assert_eq!(
            format_task_line(&task(4, "Walk dog", true)),
            "[x] #4 Walk dog (2024-05-01)"
        );
    }

    #[test]
    fn empty_list_has_hint() {
        let out = format_tasks(&[], "0 tasks • 0 completed", OutputFormat::Text);
        assert!(out.starts_with("No tasks yet"));
    }

    #[test]
    fn text_list_starts_with_summary() {
        let tasks = vec![task(2, "b", true), task(1, "a", false)];
        let out = format_tasks(&tasks, "2 tasks • 1 completed", OutputFormat::Text);
        let lines: Vec<_> = out.lines().collect();
        assert_eq!(lines[0], "2 tasks • 1 completed");
        assert_eq!(lines[1], "[x] #2 b (2024-05-01)");
        assert_eq!(lines[2], "[ ] #1 a (2024-05-01)");
    }

    #[test]
    fn json_output_is_the_wire_shape() {
        let out = format_task(&task(1, "a", false), OutputFormat::Json);
        let value: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(value["id"], 1);
        assert_eq!(value["completed"], false);
    }
}

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;

use crate::error::{Result, StateviewError};
use crate::model::{FileSnapshot, TodoItem, TodoSnapshot, TodoStatus};

pub const MAX_INLINE_PREVIEW: usize = 220;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TodoProgress {
    pub completed: usize,
    pub total: usize,
}

impl TodoProgress {
    pub fn of(todos: &[TodoItem]) -> Self {
        Self {
            completed: todos
                .iter()
                .filter(|todo| todo.status == TodoStatus::Completed)
                .count(),
            total: todos.len(),
        }
    }

    pub fn all_completed(self) -> bool {
        self.completed == self.total
    }

    /// Header label for the task panel. A run that is still going and has
    /// open tasks reads as updating.
    pub fn status_label(self, is_running: bool) -> String {
        if is_running && !self.all_completed() {
            "Updating".to_string()
        } else if self.all_completed() {
            "Complete".to_string()
        } else {
            format!("{}/{} complete", self.completed, self.total)
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct StateView<'a> {
    thread_id: Option<&'a str>,
    todos: &'a TodoSnapshot,
    files: &'a FileSnapshot,
}

pub fn render_state_markdown(
    thread_id: Option<&str>,
    todos: &TodoSnapshot,
    files: &FileSnapshot,
    is_running: bool,
) -> String {
    let mut output = String::new();
    output.push_str("# Agent State\n\n");
    if let Some(thread_id) = thread_id {
        output.push_str(&format!("- Thread: `{thread_id}`\n\n"));
    }
    output.push_str(&render_todos_markdown(todos, is_running));
    output.push('\n');
    output.push_str(&render_files_markdown(files));
    output
}

pub fn state_to_raw_json(
    thread_id: Option<&str>,
    todos: &TodoSnapshot,
    files: &FileSnapshot,
) -> Result<String> {
    let view = StateView {
        thread_id,
        todos,
        files,
    };
    let mut raw = serde_json::to_string_pretty(&view)
        .map_err(|err| StateviewError::Serialization(err.to_string()))?;
    raw.push('\n');
    Ok(raw)
}

pub fn render_todos_markdown(snapshot: &TodoSnapshot, is_running: bool) -> String {
    let mut output = String::new();
    output.push_str("## Tasks\n\n");

    if snapshot.todos.is_empty() {
        output.push_str("_No tasks._\n");
        return output;
    }

    let progress = TodoProgress::of(&snapshot.todos);
    output.push_str(&format!(
        "- Progress: {} of {} completed\n",
        progress.completed, progress.total
    ));
    output.push_str(&format!("- Status: {}\n", progress.status_label(is_running)));
    push_last_updated(&mut output, snapshot.last_updated_at);
    output.push('\n');

    for (idx, todo) in snapshot.todos.iter().enumerate() {
        output.push_str(&format!(
            "{}. {} {}\n",
            idx + 1,
            status_badge(todo.status),
            todo.content.trim()
        ));
    }

    output
}

pub fn render_files_markdown(snapshot: &FileSnapshot) -> String {
    let mut output = String::new();
    output.push_str(&format!("## Files ({})\n\n", snapshot.files.len()));

    if snapshot.files.is_empty() {
        output.push_str("_No files._\n");
        return output;
    }

    push_last_updated(&mut output, snapshot.last_updated_at);
    output.push('\n');

    for (name, content) in &snapshot.files {
        output.push_str(&format!("### {name}\n\n"));
        let preview = truncate_preview(content, MAX_INLINE_PREVIEW);
        if preview.is_empty() {
            output.push_str("_Empty file._\n\n");
        } else {
            output.push_str(&format!("> {preview}\n\n"));
        }
    }

    output
}

pub fn file_content<'a>(
    snapshot: &'a FileSnapshot,
    thread_id: &str,
    name: &str,
) -> Result<&'a str> {
    snapshot
        .files
        .get(name)
        .map(String::as_str)
        .ok_or_else(|| StateviewError::FileNotFound {
            thread_id: thread_id.to_string(),
            name: name.to_string(),
        })
}

fn status_badge(status: TodoStatus) -> &'static str {
    match status {
        TodoStatus::Completed => "[x]",
        TodoStatus::InProgress => "[~]",
        TodoStatus::Pending => "[ ]",
    }
}

fn push_last_updated(output: &mut String, last_updated_at: i64) {
    if last_updated_at <= 0 {
        return;
    }
    if let Some(timestamp) = DateTime::<Utc>::from_timestamp_millis(last_updated_at) {
        output.push_str(&format!(
            "- Last Updated: `{}`\n",
            timestamp.to_rfc3339_opts(SecondsFormat::Millis, true)
        ));
    }
}

fn truncate_preview(input: &str, max_chars: usize) -> String {
    let normalized = input.split_whitespace().collect::<Vec<_>>().join(" ");
    if normalized.chars().count() <= max_chars {
        return normalized;
    }

    let mut out = normalized.chars().take(max_chars).collect::<String>();
    out.push('…');
    out
}

use serde_json::Value;

use crate::model::{FileMap, TodoItem, TodoList, TodoStatus};

/// Reads a `todos` field. An explicit null is an empty list, a non-list is
/// rejected, and malformed entries are dropped individually.
pub fn parse_todos(value: &Value) -> Option<TodoList> {
    match value {
        Value::Null => Some(TodoList::new()),
        Value::Array(entries) => Some(entries.iter().filter_map(parse_todo_item).collect()),
        _ => None,
    }
}

fn parse_todo_item(entry: &Value) -> Option<TodoItem> {
    let object = entry.as_object()?;
    let content = object.get("content").and_then(Value::as_str)?;
    let status = object
        .get("status")
        .and_then(Value::as_str)
        .and_then(TodoStatus::parse)?;

    Some(TodoItem {
        content: content.to_string(),
        status,
    })
}

/// Reads a `files` field. An explicit null is an empty map, a non-object is
/// rejected, and entries whose content is not a string are dropped.
pub fn parse_files(value: &Value) -> Option<FileMap> {
    match value {
        Value::Null => Some(FileMap::new()),
        Value::Object(entries) => Some(
            entries
                .iter()
                .filter_map(|(name, content)| {
                    content
                        .as_str()
                        .map(|content| (name.clone(), content.to_string()))
                })
                .collect(),
        ),
        _ => None,
    }
}

use std::sync::Arc;

use serde_json::Value;
use tokio::sync::watch;
use tracing::debug;

use crate::extract::find_state_field;
use crate::model::{FileMap, FileSnapshot, TodoList, TodoSnapshot};
use crate::tracked::{Clock, SystemClock, TrackedSnapshot, TrackedValue, files_equal, todos_equal};
use crate::validate::{parse_files, parse_todos};

pub const TODOS_FIELD: &str = "todos";
pub const FILES_FIELD: &str = "files";

/// The agent-side state mirrored by the front end: the task list and the
/// generated files. Cloning yields another handle to the same stores.
#[derive(Debug, Clone)]
pub struct AgentState {
    todos: TrackedValue<TodoList>,
    files: TrackedValue<FileMap>,
}

impl Default for AgentState {
    fn default() -> Self {
        Self::new(Arc::new(SystemClock))
    }
}

impl AgentState {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            todos: TrackedValue::new(TodoList::new, todos_equal, Arc::clone(&clock)),
            files: TrackedValue::new(FileMap::new, files_equal, clock),
        }
    }

    /// Pulls `todos` and `files` out of an arbitrary state payload.
    ///
    /// A field that is not found leaves its store untouched, unless
    /// `fallback_to_empty` is set, in which case the store is reset.
    pub fn apply_state_updates(&self, payload: &Value, fallback_to_empty: bool) {
        match find_state_field(payload, TODOS_FIELD, parse_todos) {
            Some(todos) => {
                let count = todos.len();
                if self.todos.update(todos) {
                    debug!(count, "todo list changed");
                }
            }
            None if fallback_to_empty => {
                if self.todos.reset() {
                    debug!("todo list reset");
                }
            }
            None => {}
        }

        match find_state_field(payload, FILES_FIELD, parse_files) {
            Some(files) => {
                let count = files.len();
                if self.files.update(files) {
                    debug!(count, "file map changed");
                }
            }
            None if fallback_to_empty => {
                if self.files.reset() {
                    debug!("file map reset");
                }
            }
            None => {}
        }
    }

    pub fn reset(&self) {
        self.todos.reset();
        self.files.reset();
    }

    pub fn todo_snapshot(&self) -> TodoSnapshot {
        let snapshot = self.todos.snapshot();
        TodoSnapshot {
            todos: snapshot.value.clone(),
            last_updated_at: snapshot.last_updated_at,
        }
    }

    pub fn file_snapshot(&self) -> FileSnapshot {
        let snapshot = self.files.snapshot();
        FileSnapshot {
            files: snapshot.value.clone(),
            last_updated_at: snapshot.last_updated_at,
        }
    }

    pub fn todos(&self) -> Arc<TrackedSnapshot<TodoList>> {
        self.todos.snapshot()
    }

    pub fn files(&self) -> Arc<TrackedSnapshot<FileMap>> {
        self.files.snapshot()
    }

    pub fn watch_todos(&self) -> watch::Receiver<Arc<TrackedSnapshot<TodoList>>> {
        self.todos.subscribe()
    }

    pub fn watch_files(&self) -> watch::Receiver<Arc<TrackedSnapshot<FileMap>>> {
        self.files.subscribe()
    }
}

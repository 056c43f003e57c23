pub mod error;
pub mod extract;
pub mod model;
pub mod render;
pub mod runtime;
pub mod session;
pub mod state;
pub mod tracked;
pub mod validate;

pub use error::{Result, StateviewError};
pub use extract::{MAX_STATE_SEARCH_DEPTH, find_state_field};
pub use model::{
    CreatedThread, FileMap, FileSnapshot, StreamChunk, ThreadState, TodoItem, TodoList,
    TodoSnapshot, TodoStatus, UPDATES_EVENT,
};
pub use render::{
    TodoProgress, file_content, render_files_markdown, render_state_markdown,
    render_todos_markdown, state_to_raw_json,
};
pub use runtime::local::LocalRuntime;
pub use runtime::{ChunkStream, SendMessage, ThreadRuntime, root_from_env_or_home};
pub use session::{ChatSession, SendRequest, observe_state_updates};
pub use state::AgentState;
pub use tracked::{Clock, SystemClock, TrackedSnapshot, TrackedValue};
pub use validate::{parse_files, parse_todos};

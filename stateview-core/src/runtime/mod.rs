use std::env;
use std::path::PathBuf;

use async_trait::async_trait;
use dirs::home_dir;
use futures::stream::BoxStream;
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::error::{Result, StateviewError};
use crate::model::{CreatedThread, StreamChunk, ThreadState};

pub mod local;

pub type ChunkStream = BoxStream<'static, Result<StreamChunk>>;

#[derive(Debug, Clone)]
pub struct SendMessage {
    pub thread_id: String,
    pub messages: Vec<Value>,
    pub command: Option<Value>,
    pub run_config: Option<Value>,
    pub cancel: CancellationToken,
}

/// The agent runtime that owns threads and produces run streams.
#[async_trait]
pub trait ThreadRuntime: Send + Sync {
    async fn create_thread(&self) -> Result<CreatedThread>;

    /// Starts a run on `request.thread_id`. The returned stream should end
    /// early once `request.cancel` fires.
    async fn send_message(&self, request: SendMessage) -> Result<ChunkStream>;

    async fn get_thread_state(&self, thread_id: &str) -> Result<ThreadState>;

    async fn list_threads(&self) -> Result<Vec<String>>;
}

pub fn root_from_env_or_home() -> Result<PathBuf> {
    // Precedence:
    // 1) STATEVIEW_HOME
    // 2) ~/.stateview
    if let Some(root) = env::var_os("STATEVIEW_HOME").filter(|path| !path.is_empty()) {
        return Ok(PathBuf::from(root));
    }

    let home = home_dir().ok_or(StateviewError::HomeDirectoryNotFound)?;
    Ok(home.join(".stateview"))
}

/// Thread ids become file names, so only a conservative alphabet is accepted.
pub fn validate_thread_id(thread_id: &str) -> Result<()> {
    let valid = !thread_id.is_empty()
        && thread_id
            .chars()
            .all(|ch| ch.is_ascii_alphanumeric() || matches!(ch, '-' | '_' | '.'))
        && !thread_id.starts_with('.');

    if valid {
        Ok(())
    } else {
        Err(StateviewError::InvalidThreadId(thread_id.to_string()))
    }
}

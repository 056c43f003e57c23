use futures::{StreamExt, TryStreamExt};
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::error::Result;
use crate::runtime::{ChunkStream, SendMessage, ThreadRuntime};
use crate::state::AgentState;

#[derive(Debug, Clone, Default)]
pub struct SendRequest {
    pub messages: Vec<Value>,
    pub command: Option<Value>,
    pub run_config: Option<Value>,
}

/// Drives one conversation against a [`ThreadRuntime`] and keeps the shared
/// [`AgentState`] in step with the thread being shown.
#[derive(Debug)]
pub struct ChatSession<R> {
    runtime: R,
    thread_id: Option<String>,
    state: AgentState,
}

impl<R: ThreadRuntime> ChatSession<R> {
    pub fn new(runtime: R, state: AgentState) -> Self {
        Self {
            runtime,
            thread_id: None,
            state,
        }
    }

    pub fn thread_id(&self) -> Option<&str> {
        self.thread_id.as_deref()
    }

    pub fn state(&self) -> &AgentState {
        &self.state
    }

    pub fn runtime(&self) -> &R {
        &self.runtime
    }

    /// Sends `request` on the current thread, creating one first if needed.
    ///
    /// Every `updates` chunk is applied to the agent state before it is
    /// yielded. Chunks are passed through unmodified and in order, one at a
    /// time as the caller polls.
    pub async fn send(
        &mut self,
        request: SendRequest,
        cancel: CancellationToken,
    ) -> Result<ChunkStream> {
        let thread_id = match &self.thread_id {
            Some(thread_id) => thread_id.clone(),
            None => {
                let created = self.runtime.create_thread().await?;
                info!(thread_id = %created.thread_id, "started thread");
                self.thread_id = Some(created.thread_id.clone());
                created.thread_id
            }
        };

        let upstream = self
            .runtime
            .send_message(SendMessage {
                thread_id,
                messages: request.messages,
                command: request.command,
                run_config: request.run_config,
                cancel: cancel.clone(),
            })
            .await?;

        Ok(observe_state_updates(upstream, self.state.clone())
            .take_until(cancel.cancelled_owned())
            .boxed())
    }

    /// Moves to a freshly created thread. Tracked state is cleared since a new
    /// thread has none.
    pub async fn switch_to_new_thread(&mut self) -> Result<String> {
        let created = self.runtime.create_thread().await?;
        info!(thread_id = %created.thread_id, "switched to new thread");
        self.thread_id = Some(created.thread_id.clone());
        self.state.reset();
        Ok(created.thread_id)
    }

    /// Moves to an existing thread and loads its tracked state from a full
    /// snapshot. Returns the thread's message history.
    pub async fn switch_to_thread(&mut self, thread_id: &str) -> Result<Value> {
        let snapshot = self.runtime.get_thread_state(thread_id).await?;
        info!(%thread_id, "switched to thread");
        self.thread_id = Some(thread_id.to_string());
        self.state.apply_state_updates(&snapshot.values, true);
        Ok(snapshot.messages())
    }
}

/// Applies state-update chunks from `upstream` to `state` as they pass through.
pub fn observe_state_updates(upstream: ChunkStream, state: AgentState) -> ChunkStream {
    upstream
        .inspect_ok(move |chunk| {
            if chunk.is_state_update() {
                debug!("observed state update");
                state.apply_state_updates(&chunk.data, false);
            }
        })
        .boxed()
}

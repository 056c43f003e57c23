use std::io::ErrorKind;
use std::path::PathBuf;

use async_trait::async_trait;
use futures::{StreamExt, stream};
use serde_json::json;
use tracing::{debug, warn};
use uuid::Uuid;
use walkdir::WalkDir;

use crate::error::{Result, StateviewError};
use crate::model::{CreatedThread, StreamChunk, ThreadState};
use crate::runtime::{ChunkStream, SendMessage, ThreadRuntime, validate_thread_id};

/// A runtime backed by a directory of thread snapshots and recorded runs.
///
/// ```text
/// <root>/threads/<thread_id>.json   {"values": {...}}
/// <root>/runs/<thread_id>.jsonl     one {"event": ..., "data": ...} per line
/// ```
///
/// Sending a message replays the thread's recorded run.
#[derive(Debug, Clone)]
pub struct LocalRuntime {
    root: PathBuf,
}

impl LocalRuntime {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn threads_root(&self) -> PathBuf {
        self.root.join("threads")
    }

    fn runs_root(&self) -> PathBuf {
        self.root.join("runs")
    }

    fn thread_path(&self, thread_id: &str) -> PathBuf {
        self.threads_root().join(format!("{thread_id}.json"))
    }

    fn run_path(&self, thread_id: &str) -> PathBuf {
        self.runs_root().join(format!("{thread_id}.jsonl"))
    }
}

#[async_trait]
impl ThreadRuntime for LocalRuntime {
    async fn create_thread(&self) -> Result<CreatedThread> {
        let thread_id = Uuid::new_v4().to_string();
        let threads_root = self.threads_root();
        tokio::fs::create_dir_all(&threads_root)
            .await
            .map_err(|source| StateviewError::Io {
                path: threads_root.clone(),
                source,
            })?;

        let state = ThreadState {
            values: json!({ "messages": [] }),
        };
        let body = serde_json::to_string_pretty(&state)
            .map_err(|err| StateviewError::Serialization(err.to_string()))?;
        let path = self.thread_path(&thread_id);
        tokio::fs::write(&path, body)
            .await
            .map_err(|source| StateviewError::Io { path, source })?;

        debug!(%thread_id, "created thread");
        Ok(CreatedThread { thread_id })
    }

    async fn send_message(&self, request: SendMessage) -> Result<ChunkStream> {
        validate_thread_id(&request.thread_id)?;
        let path = self.run_path(&request.thread_id);

        let raw = match tokio::fs::read_to_string(&path).await {
            Ok(raw) => raw,
            Err(source) if source.kind() == ErrorKind::NotFound => {
                warn!(thread_id = %request.thread_id, path = %path.display(), "no recorded run");
                return Ok(stream::empty::<Result<StreamChunk>>().boxed());
            }
            Err(source) if source.kind() == ErrorKind::InvalidData => {
                return Err(StateviewError::NonUtf8ThreadFile { path });
            }
            Err(source) => return Err(StateviewError::Io { path, source }),
        };

        debug!(
            thread_id = %request.thread_id,
            messages = request.messages.len(),
            "replaying recorded run"
        );

        let lines = raw
            .lines()
            .enumerate()
            .map(|(line_idx, line)| (line_idx + 1, line.trim().to_string()))
            .filter(|(_, line)| !line.is_empty())
            .collect::<Vec<_>>();

        let chunks = stream::iter(lines).map(move |(line, raw_line)| {
            serde_json::from_str::<StreamChunk>(&raw_line).map_err(|source| {
                StateviewError::InvalidJsonLine {
                    path: path.clone(),
                    line,
                    source,
                }
            })
        });

        Ok(chunks
            .take_until(request.cancel.cancelled_owned())
            .boxed())
    }

    async fn get_thread_state(&self, thread_id: &str) -> Result<ThreadState> {
        validate_thread_id(thread_id)?;
        let path = self.thread_path(thread_id);

        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(source) if source.kind() == ErrorKind::NotFound => {
                return Err(StateviewError::ThreadNotFound {
                    thread_id: thread_id.to_string(),
                    searched_root: self.threads_root(),
                });
            }
            Err(source) => return Err(StateviewError::Io { path, source }),
        };

        if bytes.is_empty() {
            return Err(StateviewError::EmptyThreadFile { path });
        }

        let raw =
            String::from_utf8(bytes).map_err(|_| StateviewError::NonUtf8ThreadFile {
                path: path.clone(),
            })?;

        serde_json::from_str::<ThreadState>(&raw)
            .map_err(|source| StateviewError::InvalidJson { path, source })
    }

    async fn list_threads(&self) -> Result<Vec<String>> {
        let threads_root = self.threads_root();
        if !threads_root.exists() {
            return Ok(Vec::new());
        }

        let mut thread_ids = WalkDir::new(&threads_root)
            .min_depth(1)
            .max_depth(1)
            .into_iter()
            .filter_map(std::result::Result::ok)
            .filter(|entry| entry.file_type().is_file())
            .filter_map(|entry| {
                let path = entry.path();
                if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
                    return None;
                }
                path.file_stem()
                    .and_then(|stem| stem.to_str())
                    .map(ToString::to_string)
            })
            .collect::<Vec<_>>();

        thread_ids.sort();
        Ok(thread_ids)
    }
}

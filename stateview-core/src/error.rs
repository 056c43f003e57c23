use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StateviewError {
    #[error("invalid thread id: {0}")]
    InvalidThreadId(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("cannot determine home directory")]
    HomeDirectoryNotFound,

    #[error("thread not found: thread_id={thread_id}")]
    ThreadNotFound {
        thread_id: String,
        searched_root: PathBuf,
    },

    #[error("file not found in thread state: thread_id={thread_id} name={name}")]
    FileNotFound { thread_id: String, name: String },

    #[error("thread file is empty: {path}")]
    EmptyThreadFile { path: PathBuf },

    #[error("thread file is not valid UTF-8: {path}")]
    NonUtf8ThreadFile { path: PathBuf },

    #[error("i/o error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid json in {path}: {source}")]
    InvalidJson {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid json line in {path} at line {line}: {source}")]
    InvalidJsonLine {
        path: PathBuf,
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("transport error: {0}")]
    Transport(String),
}

pub type Result<T> = std::result::Result<T, StateviewError>;

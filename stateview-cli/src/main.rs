use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::{Parser, Subcommand};
use futures::StreamExt;
use serde_json::json;
use stateview_core::{
    AgentState, ChatSession, LocalRuntime, SendRequest, StateviewError, ThreadRuntime,
    file_content, render_state_markdown, root_from_env_or_home, state_to_raw_json,
};
use tokio_util::sync::CancellationToken;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(
    name = "stateview",
    version,
    about = "Follow agent runs and inspect their task lists and generated files"
)]
struct Cli {
    /// Runtime root holding threads/ and runs/ (defaults to $STATEVIEW_HOME, then ~/.stateview)
    #[arg(long, global = true)]
    root: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Start a new thread and print its id
    New,

    /// List known thread ids
    List,

    /// Switch to an existing thread and render its tasks and files
    Show {
        thread_id: String,

        /// Output raw JSON instead of markdown
        #[arg(long)]
        raw: bool,
    },

    /// Send a message and follow the run stream, then render the resulting state
    Run {
        /// Thread to continue; a new thread is created when omitted
        #[arg(long)]
        thread: Option<String>,

        /// Message text to send
        #[arg(long, default_value = "")]
        message: String,

        /// Cancel the run after this many milliseconds
        #[arg(long)]
        timeout_ms: Option<u64>,

        /// Print each stream event kind as it arrives
        #[arg(long)]
        events: bool,

        /// Output raw JSON instead of markdown
        #[arg(long)]
        raw: bool,
    },

    /// Print the full content of one generated file
    File { thread_id: String, name: String },
}

fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();

    let result = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|err| StateviewError::Transport(format!("cannot start runtime: {err}")))
        .and_then(|runtime| runtime.block_on(run(cli)));

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::from(1)
        }
    }
}

fn init_tracing() {
    let filter =
        EnvFilter::try_from_env("STATEVIEW_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .try_init();
}

async fn run(cli: Cli) -> stateview_core::Result<()> {
    let root = match cli.root {
        Some(root) => root,
        None => root_from_env_or_home()?,
    };
    let runtime = LocalRuntime::new(root);
    let state = AgentState::default();

    match cli.command {
        Command::New => {
            let mut session = ChatSession::new(runtime, state);
            let thread_id = session.switch_to_new_thread().await?;
            println!("{thread_id}");
        }
        Command::List => {
            for thread_id in runtime.list_threads().await? {
                println!("{thread_id}");
            }
        }
        Command::Show { thread_id, raw } => {
            let mut session = ChatSession::new(runtime, state);
            session.switch_to_thread(&thread_id).await?;
            print_state(&session, raw)?;
        }
        Command::Run {
            thread,
            message,
            timeout_ms,
            events,
            raw,
        } => {
            let mut session = ChatSession::new(runtime, state);
            if let Some(thread_id) = thread {
                session.switch_to_thread(&thread_id).await?;
            }

            let cancel = CancellationToken::new();
            let timer = timeout_ms.map(|millis| {
                let cancel = cancel.clone();
                tokio::spawn(async move {
                    tokio::time::sleep(Duration::from_millis(millis)).await;
                    cancel.cancel();
                })
            });

            let request = SendRequest {
                messages: vec![json!({ "type": "human", "content": message })],
                ..SendRequest::default()
            };
            let mut stream = session.send(request, cancel).await?;
            while let Some(chunk) = stream.next().await {
                let chunk = chunk?;
                debug!(event = %chunk.event, "chunk");
                if events {
                    println!("event: {}", chunk.event);
                }
            }

            if let Some(timer) = timer {
                timer.abort();
            }
            if events {
                println!();
            }
            print_state(&session, raw)?;
        }
        Command::File { thread_id, name } => {
            let mut session = ChatSession::new(runtime, state);
            session.switch_to_thread(&thread_id).await?;
            let files = session.state().file_snapshot();
            let content = file_content(&files, &thread_id, &name)?;
            print!("{content}");
            if !content.ends_with('\n') {
                println!();
            }
        }
    }

    Ok(())
}

fn print_state<R: ThreadRuntime>(session: &ChatSession<R>, raw: bool) -> stateview_core::Result<()> {
    let todos = session.state().todo_snapshot();
    let files = session.state().file_snapshot();

    if raw {
        let raw_json = state_to_raw_json(session.thread_id(), &todos, &files)?;
        print!("{raw_json}");
    } else {
        let markdown = render_state_markdown(session.thread_id(), &todos, &files, false);
        print!("{markdown}");
    }
    Ok(())
}

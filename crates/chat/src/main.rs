use std::io::Write;
use std::sync::Arc;

use chatline::app::{ChatAppShell, ShellFlow};
use chatline::chat::ChatView;
use chatline::settings::SettingsStore;
use chatline_api::{ChatBackend, HttpBackend, TransportError};
use snafu::{ResultExt, Snafu};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

const PROMPT: &str = "> ";
/// Used when stdout is not a terminal.
const FALLBACK_COLUMNS: u16 = 80;

#[derive(Debug, Snafu)]
enum RunError {
    #[snafu(display("failed to start async runtime on `{stage}`: {source}"))]
    Runtime {
        stage: &'static str,
        source: std::io::Error,
    },
    #[snafu(display("failed to configure backend on `{stage}`: {source}"))]
    Backend {
        stage: &'static str,
        source: TransportError,
    },
    #[snafu(display("failed to read input on `{stage}`: {source}"))]
    ReadInput {
        stage: &'static str,
        source: std::io::Error,
    },
    #[snafu(display("failed to write output on `{stage}`: {source}"))]
    WriteOutput {
        stage: &'static str,
        source: std::io::Error,
    },
}

/// Terminal entry point.
///
/// Logs go to stderr so the rendered frames on stdout stay readable.
fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(error) = run() {
        tracing::error!(%error, "chatline exited");
        std::process::exit(1);
    }
}

fn run() -> Result<(), RunError> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context(RuntimeSnafu {
            stage: "build-current-thread-runtime",
        })?;

    runtime.block_on(run_shell())
}

async fn run_shell() -> Result<(), RunError> {
    let settings = SettingsStore::load();
    let current = settings.settings();

    let mut builder = HttpBackend::builder().base_url(current.backend_url.clone());
    if let Some(timeout) = current.request_timeout() {
        builder = builder.timeout(timeout);
    }
    let backend: Arc<dyn ChatBackend> = Arc::new(builder.build().context(BackendSnafu {
        stage: "build-http-backend",
    })?);
    tracing::info!(
        backend_url = %current.backend_url,
        layout = current.layout.name(),
        "starting chatline"
    );

    let mut shell = ChatAppShell::new(ChatView::new(backend), settings);
    shell.chat_view_mut().load_conversations();
    draw(&mut shell)?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let line = line.context(ReadInputSnafu { stage: "read-stdin-line" })?;
                let Some(line) = line else {
                    // Input closed; let in-flight requests land before leaving.
                    shell.settle().await;
                    draw(&mut shell)?;
                    break;
                };
                if shell.handle_line(&line) == ShellFlow::Quit {
                    break;
                }
            }
            Some(completion) = shell.next_completion(), if shell.has_pending_requests() => {
                shell.apply(completion);
            }
        }

        draw(&mut shell)?;
    }

    Ok(())
}

fn draw(shell: &mut ChatAppShell) -> Result<(), RunError> {
    let (columns, _) = crossterm::terminal::size().unwrap_or((FALLBACK_COLUMNS, 24));
    shell.set_render_width(usize::from(columns));

    let frame = shell.render();
    let mut stdout = std::io::stdout().lock();
    write!(stdout, "\n{frame}{PROMPT}")
        .and_then(|()| stdout.flush())
        .context(WriteOutputSnafu {
            stage: "write-frame",
        })
}

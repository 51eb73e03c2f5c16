use std::future::Future;
use std::path::PathBuf;

use tokio::io::{BufWriter, Stdout};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use super::error::AppError;

pub const USAGE: &str = "\
Usage: analytics <command>

Commands:
  get                               Print the current snapshot, computing it if needed
  refresh                           Recompute the snapshot and print it
  preprocess [--csv P] [--cache P]  Build the cache file and print ingest stats";

/// Subcommand selected on the command line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Get,
    Refresh,
    Preprocess {
        csv: Option<PathBuf>,
        cache: Option<PathBuf>,
    },
}

impl Command {
    /// Parse arguments, program name excluded
    pub fn parse<I>(args: I) -> Result<Self, AppError>
    where
        I: IntoIterator<Item = String>,
    {
        let mut args = args.into_iter();
        let name = args
            .next()
            .ok_or_else(|| AppError::InvalidArguments("missing command".to_string()))?;

        let command = match name.as_str() {
            "get" => Command::Get,
            "refresh" => Command::Refresh,
            "preprocess" => {
                let mut csv = None;
                let mut cache = None;
                while let Some(flag) = args.next() {
                    let slot = match flag.as_str() {
                        "--csv" => &mut csv,
                        "--cache" => &mut cache,
                        other => {
                            return Err(AppError::InvalidArguments(format!("unknown option {other}")));
                        }
                    };
                    let value = args
                        .next()
                        .ok_or_else(|| AppError::InvalidArguments(format!("{flag} needs a path")))?;
                    *slot = Some(PathBuf::from(value));
                }
                return Ok(Command::Preprocess { csv, cache });
            }
            other => {
                return Err(AppError::InvalidArguments(format!("unknown command {other}")));
            }
        };

        if let Some(extra) = args.next() {
            return Err(AppError::InvalidArguments(format!("unexpected argument {extra}")));
        }
        Ok(command)
    }
}

/// Reusable CLI application runner that handles:
/// - Signal handling (SIGINT, SIGTERM, SIGHUP)
/// - Stdout buffering
/// - Exit codes (0 = success, 1 = error, 130 = SIGINT, 143 = SIGTERM)
/// - Graceful shutdown through a cancellation token
pub struct CliApp {
    name: String,
}

impl CliApp {
    /// Create a new CLI application runner
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Run the CLI application with signal handling
    ///
    /// A signal cancels the token handed to `main_fn` and waits for it to
    /// unwind before exiting with the signal's code.
    ///
    /// This function never returns - it calls std::process::exit with the appropriate code
    pub async fn run<F, Fut>(self, main_fn: F) -> !
    where
        F: FnOnce(BufWriter<Stdout>, CancellationToken) -> Fut,
        Fut: Future<Output = Result<(), AppError>>,
    {
        let writer = BufWriter::new(tokio::io::stdout());
        let cancel = CancellationToken::new();
        info!(app = %self.name, "Starting");

        let main_fut = main_fn(writer, cancel.clone());
        tokio::pin!(main_fut);

        let code = tokio::select! {
            result = &mut main_fut => exit_code(&result),
            signal_code = wait_for_signal() => {
                warn!(exit_code = signal_code, "Interrupted, cancelling running work");
                cancel.cancel();
                if let Err(e) = main_fut.await {
                    info!(error = %e, "Stopped after interrupt");
                }
                signal_code
            }
        };

        std::process::exit(code);
    }
}

fn exit_code(result: &Result<(), AppError>) -> i32 {
    match result {
        Ok(()) => 0,
        Err(e) => {
            error!(error = %e, "Command failed");
            1
        }
    }
}

/// Wait for any Unix signal (SIGINT, SIGTERM, SIGHUP) or Ctrl+C
/// Returns the exit code to use (130 for SIGINT, 143 for SIGTERM, etc.)
async fn wait_for_signal() -> i32 {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        let (Ok(mut sigterm), Ok(mut sigint), Ok(mut sighup)) = (
            signal(SignalKind::terminate()),
            signal(SignalKind::interrupt()),
            signal(SignalKind::hangup()),
        ) else {
            error!("Failed to install signal handlers");
            return std::future::pending().await;
        };

        tokio::select! {
            _ = sigterm.recv() => 143, // 128 + 15
            _ = sigint.recv() => 130,  // 128 + 2
            _ = sighup.recv() => 129,  // 128 + 1
        }
    }

    #[cfg(not(unix))]
    {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            return std::future::pending().await;
        }
        130
    }
}

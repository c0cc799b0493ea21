//! Main entry point for the `pty-run` command.
//!
//! Runs one command in the user's shell inside a pseudo-terminal, streams its
//! output to stdout and exits with the shell's exit code.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;

use pty_runner::config::{Preferences, PreferencesProvider, PreferencesStore};
use pty_runner::console::{ResizeSource, StdoutConsole};
use pty_runner::shell::{ProcessRunner, RunOptions};
use pty_runner::utils;

#[derive(Parser, Debug)]
#[command(author, version, about = "Run a command in a shell attached to a pseudo-terminal")]
struct Args {
    /// Directory to run the command in.
    #[arg(long)]
    cwd: Option<PathBuf>,

    /// Shell to use instead of the configured one.
    #[arg(long)]
    shell: Option<String>,

    /// Do not stream the command's output.
    #[arg(long, short)]
    quiet: bool,

    /// Use batch mode: configured shell only, no output streaming.
    #[arg(long, conflicts_with_all = ["cwd", "quiet"])]
    batch: bool,

    /// The command line to run.
    #[arg(required = true, num_args = 1.., trailing_var_arg = true)]
    command: Vec<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Keep the guard alive so buffered log lines are flushed on exit.
    let _log_guard = utils::logger::init_logging("pty-run", &utils::logger::default_log_dir());

    let preferences: Arc<dyn PreferencesProvider> = match args.shell {
        Some(shell) => Arc::new(Preferences::with_terminal_path(shell)),
        None => Arc::new(PreferencesStore::default()),
    };
    let resize = ResizeSource::new();
    let runner = ProcessRunner::new(preferences, Arc::new(StdoutConsole), resize.clone());

    #[cfg(unix)]
    forward_window_changes(resize)?;

    let command = args.command.join(" ");
    let execution = if args.batch {
        runner.exec_command(&command)?
    } else {
        let mut options = RunOptions::default();
        if let Some(cwd) = args.cwd {
            options = options.in_dir(cwd);
        }
        if args.quiet {
            options = options.suppress_output();
        }
        runner.start(&command, options)?
    };

    let code = match execution.completion.await {
        Ok(_) => 0,
        Err(e) => {
            tracing::warn!("{}", e);
            e.exit_outcome()
                .and_then(|o| o.code)
                .and_then(|c| i32::try_from(c).ok())
                .unwrap_or(1)
        }
    };
    drop(_log_guard);
    std::process::exit(code);
}

/// Turns SIGWINCH into resize notifications.
#[cfg(unix)]
fn forward_window_changes(resize: ResizeSource) -> Result<()> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut winch = signal(SignalKind::window_change())?;
    tokio::spawn(async move {
        while winch.recv().await.is_some() {
            resize.notify();
        }
    });
    Ok(())
}

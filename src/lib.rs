//! pty-runner - run shell commands inside a pseudo-terminal
//!
//! This library provides:
//! - Shell resolution from user preferences or the platform environment
//! - Spawning the shell attached to a pty and feeding it commands
//! - Streaming pty output to a console, following console resizes
//! - A completion future that settles once with the shell's exit status
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use pty_runner::config::PreferencesStore;
//! use pty_runner::console::{ChannelConsole, ResizeSource};
//! use pty_runner::shell::{ProcessRunner, RunOptions};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let (console, mut output) = ChannelConsole::new();
//!     let runner = ProcessRunner::new(
//!         Arc::new(PreferencesStore::default()),
//!         Arc::new(console),
//!         ResizeSource::new(),
//!     );
//!
//!     let execution = runner.start("cargo --version", RunOptions::default())?;
//!     tokio::spawn(async move {
//!         while let Some(chunk) = output.recv().await {
//!             print!("{}", String::from_utf8_lossy(&chunk.data));
//!         }
//!     });
//!
//!     let outcome = execution.completion.await?;
//!     println!("finished with {}", outcome);
//!     Ok(())
//! }
//! ```

#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used))]

pub mod config;
pub mod console;
pub mod error;
pub mod shell;
pub mod utils;

// Re-export commonly used types
pub use config::{Preferences, PreferencesProvider, PreferencesStore};
pub use console::{Console, OutputChunk, OutputTarget, ResizeSource};
pub use error::ExecError;
pub use shell::{Completion, Execution, ExitOutcome, ProcessHandle, ProcessRunner, RunOptions};

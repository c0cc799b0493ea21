//! Shell execution and process management module.
//!
//! This module resolves which shell to run, spawns it attached to a
//! pseudo-terminal, feeds it commands and reports how it exited.

mod completion;
mod handle;
pub mod platform;
mod runner;
mod spec;

pub use completion::{Completion, ExitOutcome};
pub use handle::{ProcessHandle, TerminalSize};
pub use platform::{Environment, FixedEnvironment, Platform, SystemEnvironment};
pub use runner::{Execution, ProcessRunner, RunOptions};
pub use spec::ShellSpec;

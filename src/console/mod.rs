//! Display surfaces that receive streamed shell output.
//!
//! The runner does not render anything. It hands raw pty bytes to a
//! [`Console`] together with the [`OutputTarget`] they belong to, and asks
//! the console how large a surface currently is when a resize comes in.

mod resize;

use std::collections::HashMap;
use std::io::Write;
use std::sync::Mutex;

use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::{error, warn};

use crate::shell::TerminalSize;

pub use resize::{ResizeSource, ResizeSubscription};

/// Which display surface an invocation's output is routed to.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub enum OutputTarget {
    #[default]
    Common,
    Named(String),
}

impl OutputTarget {
    pub fn named(name: impl Into<String>) -> Self {
        OutputTarget::Named(name.into())
    }
}

/// One piece of pty output, exactly as read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputChunk {
    pub target: OutputTarget,
    pub data: Vec<u8>,
}

pub trait Console: Send + Sync {
    fn log_raw(&self, data: &[u8], target: &OutputTarget);

    fn log_error(&self, _message: &str, _target: &OutputTarget) {}

    /// Current size of the surface, if it has one.
    fn size_of(&self, _target: &OutputTarget) -> Option<TerminalSize> {
        None
    }
}

/// Console that turns output into a stream of [`OutputChunk`]s.
pub struct ChannelConsole {
    tx: UnboundedSender<OutputChunk>,
    errors: Mutex<Vec<(OutputTarget, String)>>,
    sizes: Mutex<HashMap<OutputTarget, TerminalSize>>,
}

impl ChannelConsole {
    pub fn new() -> (Self, UnboundedReceiver<OutputChunk>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let console = Self {
            tx,
            errors: Mutex::new(Vec::new()),
            sizes: Mutex::new(HashMap::new()),
        };
        (console, rx)
    }

    /// Records the size a surface currently has.
    pub fn set_size(&self, target: OutputTarget, size: TerminalSize) {
        if let Ok(mut sizes) = self.sizes.lock() {
            sizes.insert(target, size);
        }
    }

    /// Error messages reported so far.
    pub fn errors(&self) -> Vec<(OutputTarget, String)> {
        self.errors.lock().map(|e| e.clone()).unwrap_or_default()
    }
}

impl Console for ChannelConsole {
    fn log_raw(&self, data: &[u8], target: &OutputTarget) {
        let chunk = OutputChunk {
            target: target.clone(),
            data: data.to_vec(),
        };
        if self.tx.send(chunk).is_err() {
            warn!(?target, "output receiver dropped, discarding chunk");
        }
    }

    fn log_error(&self, message: &str, target: &OutputTarget) {
        if let Ok(mut errors) = self.errors.lock() {
            errors.push((target.clone(), message.to_string()));
        }
    }

    fn size_of(&self, target: &OutputTarget) -> Option<TerminalSize> {
        self.sizes.lock().ok()?.get(target).copied()
    }
}

/// Console bound to the process's own terminal. Every target shares it.
#[derive(Debug, Clone, Copy, Default)]
pub struct StdoutConsole;

impl Console for StdoutConsole {
    fn log_raw(&self, data: &[u8], _target: &OutputTarget) {
        let mut stdout = std::io::stdout().lock();
        if let Err(e) = stdout.write_all(data).and_then(|()| stdout.flush()) {
            error!("Failed to write shell output to stdout: {}", e);
        }
    }

    fn log_error(&self, message: &str, _target: &OutputTarget) {
        eprintln!("{}", message);
    }

    fn size_of(&self, _target: &OutputTarget) -> Option<TerminalSize> {
        let (cols, rows) = crossterm::terminal::size().ok()?;
        Some(TerminalSize::new(cols, rows))
    }
}

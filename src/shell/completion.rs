//! Completion signal of a shell invocation.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::sync::oneshot;

use crate::error::ExecError;

/// How the shell process ended.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExitOutcome {
    /// `None` when killed by a signal or the status could not be read.
    pub code: Option<u32>,
    pub signal: Option<String>,
}

impl ExitOutcome {
    pub fn exited(code: u32) -> Self {
        Self {
            code: Some(code),
            signal: None,
        }
    }

    pub fn signaled(signal: impl Into<String>) -> Self {
        Self {
            code: None,
            signal: Some(signal.into()),
        }
    }

    /// Status could not be determined.
    pub fn unknown() -> Self {
        Self::default()
    }

    pub fn success(&self) -> bool {
        self.code == Some(0) && self.signal.is_none()
    }
}

impl From<portable_pty::ExitStatus> for ExitOutcome {
    fn from(status: portable_pty::ExitStatus) -> Self {
        match status.signal() {
            Some(signal) => ExitOutcome::signaled(signal),
            None => ExitOutcome::exited(status.exit_code()),
        }
    }
}

impl fmt::Display for ExitOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.code, &self.signal) {
            (_, Some(signal)) => write!(f, "terminated by signal {}", signal),
            (Some(code), None) => write!(f, "exit code {}", code),
            (None, None) => write!(f, "unknown exit status"),
        }
    }
}

/// Resolves once the shell exits: `Ok` for exit code 0, otherwise
/// [`ExecError::AbnormalExit`].
#[must_use = "a completion does nothing unless awaited"]
#[derive(Debug)]
pub struct Completion {
    rx: oneshot::Receiver<ExitOutcome>,
}

impl Completion {
    pub(crate) fn new(rx: oneshot::Receiver<ExitOutcome>) -> Self {
        Self { rx }
    }

    /// Pair of settle side and completion.
    pub(crate) fn channel() -> (oneshot::Sender<ExitOutcome>, Self) {
        let (tx, rx) = oneshot::channel();
        (tx, Self::new(rx))
    }
}

impl Future for Completion {
    type Output = Result<ExitOutcome, ExecError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let outcome = match Pin::new(&mut self.rx).poll(cx) {
            Poll::Pending => return Poll::Pending,
            Poll::Ready(Ok(outcome)) => outcome,
            // Driver went away without reporting an exit.
            Poll::Ready(Err(_)) => ExitOutcome::unknown(),
        };

        if outcome.success() {
            Poll::Ready(Ok(outcome))
        } else {
            Poll::Ready(Err(ExecError::AbnormalExit(outcome)))
        }
    }
}

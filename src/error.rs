//! Error types for shell execution.

use thiserror::Error;

use crate::shell::ExitOutcome;

#[derive(Debug, Error)]
pub enum ExecError {
    #[error("refusing to execute an empty command")]
    EmptyCommand,

    /// Neither the preferences nor the environment name a shell.
    #[error("can't execute command \"{command}\" as no shell environment is available")]
    Configuration { command: String },

    #[error("failed to read preferences: {0}")]
    Preferences(#[source] anyhow::Error),

    #[error("failed to spawn shell {shell}: {source}")]
    Spawn {
        shell: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("process exited abnormally ({0})")]
    AbnormalExit(ExitOutcome),

    #[error("pty io error: {0}")]
    Io(#[from] std::io::Error),
}

impl ExecError {
    /// Exit outcome carried by an abnormal exit, if this is one.
    pub fn exit_outcome(&self) -> Option<&ExitOutcome> {
        match self {
            ExecError::AbnormalExit(outcome) => Some(outcome),
            _ => None,
        }
    }
}

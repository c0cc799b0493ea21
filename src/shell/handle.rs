//! Handle to a live pty-backed shell process.

use std::io::Write;
use std::sync::{Arc, Mutex};

use portable_pty::{MasterPty, PtySize};
use tracing::debug;

use crate::error::ExecError;

use super::spec::ShellSpec;

pub(crate) type SharedMaster = Arc<Mutex<Box<dyn MasterPty + Send>>>;

/// Terminal dimensions in character cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TerminalSize {
    pub cols: u16,
    pub rows: u16,
}

impl TerminalSize {
    pub const DEFAULT: TerminalSize = TerminalSize { cols: 80, rows: 24 };

    pub fn new(cols: u16, rows: u16) -> Self {
        Self { cols, rows }
    }

    /// Zero-sized surfaces are never applied to a pty.
    pub fn is_empty(&self) -> bool {
        self.cols == 0 || self.rows == 0
    }

    pub(crate) fn to_pty_size(self) -> PtySize {
        PtySize {
            rows: self.rows,
            cols: self.cols,
            pixel_width: 0,
            pixel_height: 0,
        }
    }
}

impl Default for TerminalSize {
    fn default() -> Self {
        Self::DEFAULT
    }
}

pub(crate) fn resize_master(master: &SharedMaster, size: TerminalSize) -> Result<(), ExecError> {
    let pty = master
        .lock()
        .map_err(|e| std::io::Error::other(format!("Failed to lock PTY master: {}", e)))?;
    pty.resize(size.to_pty_size())
        .map_err(|e| std::io::Error::other(format!("Failed to resize PTY: {}", e)))?;
    Ok(())
}

/// Owns the input side of one shell invocation.
///
/// Dropping the handle closes the pty input; lines already written are still
/// consumed by the shell.
pub struct ProcessHandle {
    shell: ShellSpec,
    pid: Option<u32>,
    master: SharedMaster,
    writer: Mutex<Box<dyn Write + Send>>,
}

impl ProcessHandle {
    /// Wraps a freshly spawned shell.
    ///
    /// # Arguments
    /// * `shell` - The shell that was spawned
    /// * `pid` - Its process id, when the platform reports one
    /// * `master` - Pty master, shared with the runner's resize path
    /// * `writer` - Input side of the pty
    pub(crate) fn new(
        shell: ShellSpec,
        pid: Option<u32>,
        master: SharedMaster,
        writer: Box<dyn Write + Send>,
    ) -> Self {
        Self {
            shell,
            pid,
            master,
            writer: Mutex::new(writer),
        }
    }

    /// Shell this process runs.
    pub fn shell(&self) -> &ShellSpec {
        &self.shell
    }

    pub fn process_id(&self) -> Option<u32> {
        self.pid
    }

    /// Writes raw bytes to the shell's input.
    pub fn write(&self, data: &[u8]) -> Result<(), ExecError> {
        let mut writer = self
            .writer
            .lock()
            .map_err(|e| std::io::Error::other(format!("Failed to lock PTY writer: {}", e)))?;
        writer.write_all(data)?;
        // Flush to ensure the shell sees the input immediately
        writer.flush()?;
        Ok(())
    }

    /// Writes `line` followed by the platform line terminator.
    pub fn write_line(&self, line: &str) -> Result<(), ExecError> {
        self.write(self.shell.line(line).as_bytes())
    }

    pub fn resize(&self, cols: u16, rows: u16) -> Result<(), ExecError> {
        debug!(pid = ?self.pid, cols, rows, "resizing pty");
        resize_master(&self.master, TerminalSize::new(cols, rows))
    }

    /// Current pty dimensions, as the kernel reports them.
    pub fn size(&self) -> Result<TerminalSize, ExecError> {
        let pty = self
            .master
            .lock()
            .map_err(|e| std::io::Error::other(format!("Failed to lock PTY master: {}", e)))?;
        let size = pty
            .get_size()
            .map_err(|e| std::io::Error::other(format!("Failed to query PTY size: {}", e)))?;
        Ok(TerminalSize::new(size.cols, size.rows))
    }
}

impl std::fmt::Debug for ProcessHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProcessHandle")
            .field("shell", &self.shell.path())
            .field("pid", &self.pid)
            .finish()
    }
}

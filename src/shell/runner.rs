//! Runs shell commands inside a pseudo-terminal.
//!
//! Each invocation gets its own pty, two blocking threads and a small Tokio
//! task:
//!
//! - the reader thread pumps pty output into an event channel until EOF;
//! - the wait thread blocks on the shell process and sends a single exit
//!   event down the same channel as soon as the shell itself ends, even if a
//!   background job keeps the pty open;
//! - the driver task forwards output to the [`Console`], applies resize
//!   notifications, and on exit drops its resize subscription, flushes the
//!   output still queued, then settles the [`Completion`].
//!
//! Output is delivered in the order the shell produced it and nothing is
//! forwarded after the completion settles, so the exit is always the last
//! event of an invocation.

use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use portable_pty::{native_pty_system, Child, ChildKiller, CommandBuilder};
use tokio::runtime::Handle;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::sync::oneshot;
use tracing::{debug, error, info, warn};

use crate::config::PreferencesProvider;
use crate::console::{Console, OutputTarget, ResizeSource, ResizeSubscription};
use crate::error::ExecError;

use super::completion::{Completion, ExitOutcome};
use super::handle::{resize_master, ProcessHandle, SharedMaster, TerminalSize};
use super::platform::{Environment, SystemEnvironment};
use super::spec::ShellSpec;

// Channel buffer sizes
const PTY_READ_BUFFER: usize = 16384; // 16KB per read for good throughput

// How long the pty may stay silent after the shell exited before the
// completion settles anyway.
const EXIT_DRAIN_QUIET: Duration = Duration::from_millis(100);

/// Per-invocation settings.
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Directory the shell starts in; the caller's own when unset.
    pub working_directory: Option<PathBuf>,
    /// Neither forward output nor follow resizes.
    pub suppress_output_streaming: bool,
    pub output_target: OutputTarget,
    /// Write `exit` after the command so the session ends with it.
    pub terminate_shell_after_command: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            working_directory: None,
            suppress_output_streaming: false,
            output_target: OutputTarget::Common,
            terminate_shell_after_command: true,
        }
    }
}

impl RunOptions {
    pub fn in_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_directory = Some(dir.into());
        self
    }

    pub fn suppress_output(mut self) -> Self {
        self.suppress_output_streaming = true;
        self
    }

    pub fn target(mut self, target: OutputTarget) -> Self {
        self.output_target = target;
        self
    }

    /// Leave the shell running after the command.
    pub fn keep_shell_open(mut self) -> Self {
        self.terminate_shell_after_command = false;
        self
    }

    fn batch() -> Self {
        Self::default().suppress_output()
    }
}

/// A started invocation.
#[derive(Debug)]
pub struct Execution {
    pub handle: ProcessHandle,
    pub completion: Completion,
}

#[derive(Debug)]
enum PtyEvent {
    Output(Vec<u8>),
    Exited(ExitOutcome),
}

struct SpawnedPty {
    pid: Option<u32>,
    master: SharedMaster,
    writer: Box<dyn std::io::Write + Send>,
    events: UnboundedReceiver<PtyEvent>,
}

pub struct ProcessRunner {
    preferences: Arc<dyn PreferencesProvider>,
    console: Arc<dyn Console>,
    resize: ResizeSource,
    env: Arc<dyn Environment>,
}

impl ProcessRunner {
    /// Creates a runner for the host environment.
    ///
    /// # Arguments
    /// * `preferences` - Source of the configured shell, read on every invocation
    /// * `console` - Display surfaces that receive output and report their size
    /// * `resize` - Resize notifications shared by every invocation
    pub fn new(
        preferences: Arc<dyn PreferencesProvider>,
        console: Arc<dyn Console>,
        resize: ResizeSource,
    ) -> Self {
        Self {
            preferences,
            console,
            resize,
            env: Arc::new(SystemEnvironment),
        }
    }

    /// Replaces the host environment used for shell resolution.
    pub fn with_environment(mut self, env: Arc<dyn Environment>) -> Self {
        self.env = env;
        self
    }

    pub fn resize_source(&self) -> &ResizeSource {
        &self.resize
    }

    /// Starts `command` in a fresh shell session.
    ///
    /// Must be called from within a Tokio runtime. Configuration and spawn
    /// failures are returned here and nothing keeps running; a non-zero exit
    /// surfaces later through the returned [`Completion`].
    pub fn start(&self, command: &str, options: RunOptions) -> Result<Execution, ExecError> {
        self.run(command, options, true)
    }

    /// Like [`start`](Self::start), keeping only the completion.
    pub fn exec(&self, command: &str, options: RunOptions) -> Result<Completion, ExecError> {
        Ok(self.start(command, options)?.completion)
    }

    /// Batch mode: runs `command` with the configured shell and no output or
    /// resize wiring, then ends the session.
    pub fn exec_command(&self, command: &str) -> Result<Execution, ExecError> {
        self.run(command, RunOptions::batch(), false)
    }

    fn run(
        &self,
        command: &str,
        options: RunOptions,
        report_to_console: bool,
    ) -> Result<Execution, ExecError> {
        if command.trim().is_empty() {
            return Err(ExecError::EmptyCommand);
        }

        // Configured shell, else COMSPEC / SHELL; never guess one
        let shell = match self.resolve_shell(command) {
            Ok(shell) => shell,
            Err(e) => {
                error!("{}", e);
                if report_to_console {
                    self.console.log_error(&e.to_string(), &options.output_target);
                }
                return Err(e);
            }
        };

        // The driver task needs a runtime; check before anything is spawned
        let runtime = Handle::try_current().map_err(|e| ExecError::Spawn {
            shell: shell.path().to_string(),
            source: anyhow::Error::new(e).context("no Tokio runtime to drive the process"),
        })?;

        // Open at the size of the target surface, or the default size
        let streaming = !options.suppress_output_streaming;
        let target = options.output_target;
        let size = streaming
            .then(|| self.console.size_of(&target))
            .flatten()
            .filter(|s| !s.is_empty())
            .unwrap_or_default();

        let spawned = spawn_pty(&shell, options.working_directory.as_deref(), size).map_err(
            |source| ExecError::Spawn {
                shell: shell.path().to_string(),
                source,
            },
        )?;
        info!(
            shell = shell.path(),
            pid = ?spawned.pid,
            streaming,
            cols = size.cols,
            rows = size.rows,
            "spawned shell"
        );

        // Subscribe before anything can exit so the exit path always finds
        // the subscription to drop.
        let resize = streaming.then(|| self.resize.subscribe());
        let sink = streaming.then(|| Arc::clone(&self.console));
        let (settle, completion) = Completion::channel();

        runtime.spawn(drive(Driver {
            events: spawned.events,
            resize,
            sink,
            target,
            master: Arc::clone(&spawned.master),
            settle,
            pid: spawned.pid,
        }));

        // Send the command, then `exit` so the session ends with it
        let handle = ProcessHandle::new(shell, spawned.pid, spawned.master, spawned.writer);
        let line = handle.shell().normalize_command(command).into_owned();
        handle.write_line(&line)?;
        if options.terminate_shell_after_command {
            handle.write(handle.shell().exit_line().as_bytes())?;
        }

        Ok(Execution { handle, completion })
    }

    fn resolve_shell(&self, command: &str) -> Result<ShellSpec, ExecError> {
        let prefs = self
            .preferences
            .preferences()
            .map_err(ExecError::Preferences)?;
        ShellSpec::resolve(&prefs, self.env.as_ref()).ok_or_else(|| ExecError::Configuration {
            command: command.to_string(),
        })
    }
}

fn spawn_pty(
    shell: &ShellSpec,
    cwd: Option<&Path>,
    size: TerminalSize,
) -> anyhow::Result<SpawnedPty> {
    let pty_system = native_pty_system();

    // Create PTY at the size of the surface it will be shown on
    let pair = pty_system.openpty(size.to_pty_size())?;

    // Shell plus its platform arguments (login flag on macOS)
    let mut cmd = CommandBuilder::new(shell.path());
    cmd.args(shell.args());
    cmd.env("TERM", "xterm-256color");

    // Start in the requested directory, else inherit ours
    match cwd {
        Some(dir) => {
            if !dir.is_dir() {
                anyhow::bail!("working directory {} does not exist", dir.display());
            }
            cmd.cwd(dir);
        }
        None => {
            if let Ok(cwd) = std::env::current_dir() {
                cmd.cwd(cwd);
            }
        }
    }

    let mut child = pair.slave.spawn_command(cmd)?;

    // Drop slave side in parent process
    drop(pair.slave);

    let pid = child.process_id();

    // From here on a failure must not leave the shell behind
    let (reader, writer) = match pair
        .master
        .try_clone_reader()
        .and_then(|reader| Ok((reader, pair.master.take_writer()?)))
    {
        Ok(io) => io,
        Err(e) => {
            abandon(child.as_mut());
            return Err(e);
        }
    };
    let master: SharedMaster = Arc::new(Mutex::new(pair.master));

    // Output and exit share one channel; the waiter sends the only Exited
    let (tx, events) = mpsc::unbounded_channel();
    let killer = child.clone_killer();

    let exit_tx = tx.clone();
    if let Err(e) = std::thread::Builder::new()
        .name(format!("pty-wait-{}", pid.unwrap_or_default()))
        .spawn(move || wait_for_exit(child, exit_tx))
    {
        // The child went down with the closure, so it can only be killed
        kill_quietly(killer);
        return Err(anyhow::Error::new(e).context("Failed to spawn PTY wait thread"));
    }

    if let Err(e) = std::thread::Builder::new()
        .name(format!("pty-reader-{}", pid.unwrap_or_default()))
        .spawn(move || pump(reader, tx))
    {
        // The wait thread reaps it
        kill_quietly(killer);
        return Err(anyhow::Error::new(e).context("Failed to spawn PTY reader thread"));
    }

    Ok(SpawnedPty {
        pid,
        master,
        writer,
        events,
    })
}

/// Kills and reaps a child we can no longer drive.
fn abandon(child: &mut (dyn Child + Send + Sync)) {
    if let Err(e) = child.kill() {
        warn!("Failed to kill abandoned shell: {}", e);
    }
    if let Err(e) = child.wait() {
        warn!("Failed to reap abandoned shell: {}", e);
    }
}

fn kill_quietly(mut killer: Box<dyn ChildKiller + Send + Sync>) {
    if let Err(e) = killer.kill() {
        warn!("Failed to kill shell: {}", e);
    }
}

/// Reads the pty until EOF.
///
/// EOF only comes once every process holding the slave has closed it, which
/// can be long after the shell itself exited (background jobs). Exit is
/// reported by [`wait_for_exit`] instead.
fn pump(mut reader: Box<dyn Read + Send>, tx: UnboundedSender<PtyEvent>) {
    let mut buf = [0u8; PTY_READ_BUFFER];
    loop {
        match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => {
                // Keep draining even without a listener so the child never
                // blocks on a full pty.
                if tx.send(PtyEvent::Output(buf[..n].to_vec())).is_err() {
                    debug!("pty event receiver dropped");
                }
            }
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => {}
            // Linux reports EIO once the slave side is closed.
            Err(e) => {
                debug!("PTY read ended: {}", e);
                break;
            }
        }
    }
}

/// Waits for the shell itself and reports how it ended.
fn wait_for_exit(mut child: Box<dyn Child + Send + Sync>, tx: UnboundedSender<PtyEvent>) {
    let outcome = match child.wait() {
        Ok(status) => ExitOutcome::from(status),
        Err(e) => {
            error!("Failed to wait for shell process: {}", e);
            ExitOutcome::unknown()
        }
    };
    if tx.send(PtyEvent::Exited(outcome)).is_err() {
        debug!("pty event receiver dropped before exit");
    }
}

struct Driver {
    events: UnboundedReceiver<PtyEvent>,
    resize: Option<ResizeSubscription>,
    sink: Option<Arc<dyn Console>>,
    target: OutputTarget,
    master: SharedMaster,
    settle: oneshot::Sender<ExitOutcome>,
    pid: Option<u32>,
}

async fn drive(driver: Driver) {
    let Driver {
        mut events,
        mut resize,
        sink,
        target,
        master,
        settle,
        pid,
    } = driver;

    let forward = |data: &[u8]| {
        if let Some(console) = &sink {
            console.log_raw(data, &target);
        }
    };

    let outcome = loop {
        tokio::select! {
            biased;

            event = events.recv() => match event {
                Some(PtyEvent::Output(data)) => forward(&data),
                Some(PtyEvent::Exited(outcome)) => break outcome,
                None => break ExitOutcome::unknown(),
            },

            changed = next_resize(&mut resize) => match changed {
                Some(()) => {
                    if let Some(console) = &sink {
                        follow_resize(console.as_ref(), &target, &master);
                    }
                }
                None => resize = None,
            },
        }
    };

    // No more resizes once the shell is gone
    drop(resize);
    drop(master);

    // Flush what the shell wrote before exiting. Stop at EOF, or once the pty
    // goes quiet when a background job still holds it open.
    loop {
        match tokio::time::timeout(EXIT_DRAIN_QUIET, events.recv()).await {
            Ok(Some(PtyEvent::Output(data))) => forward(&data),
            Ok(Some(PtyEvent::Exited(_))) => {}
            Ok(None) | Err(_) => break,
        }
    }
    // Anything later belongs to whatever outlived the shell
    drop(events);
    debug!(?pid, %outcome, "shell exited");

    if settle.send(outcome).is_err() {
        debug!(?pid, "completion dropped before the shell exited");
    }
}

async fn next_resize(resize: &mut Option<ResizeSubscription>) -> Option<()> {
    match resize {
        Some(sub) => sub.changed().await,
        None => std::future::pending().await,
    }
}

fn follow_resize(console: &dyn Console, target: &OutputTarget, master: &SharedMaster) {
    let Some(size) = console.size_of(target).filter(|s| !s.is_empty()) else {
        return;
    };
    debug!(?target, cols = size.cols, rows = size.rows, "following resize");
    if let Err(e) = resize_master(master, size) {
        warn!("Failed to resize PTY: {}", e);
    }
}

#[cfg(all(test, unix))]
mod tests {
    use tokio::time::timeout;

    use super::*;
    use crate::config::Preferences;
    use crate::console::{ChannelConsole, OutputChunk};
    use crate::shell::platform::{FixedEnvironment, Platform};

    const WAIT: Duration = Duration::from_secs(10);

    fn sh_env() -> Arc<FixedEnvironment> {
        Arc::new(FixedEnvironment::new(Platform::Unix).with_var("SHELL", "/bin/sh"))
    }

    fn runner() -> (ProcessRunner, Arc<ChannelConsole>, UnboundedReceiver<OutputChunk>) {
        let (console, rx) = ChannelConsole::new();
        let console = Arc::new(console);
        let runner = ProcessRunner::new(
            Arc::new(Preferences::default()),
            console.clone(),
            ResizeSource::new(),
        )
        .with_environment(sh_env());
        (runner, console, rx)
    }

    async fn finish(completion: Completion) -> Result<ExitOutcome, ExecError> {
        timeout(WAIT, completion).await.unwrap()
    }

    fn drain(rx: &mut UnboundedReceiver<OutputChunk>, target: &OutputTarget) -> String {
        let mut out = Vec::new();
        while let Ok(chunk) = rx.try_recv() {
            if &chunk.target == target {
                out.extend_from_slice(&chunk.data);
            }
        }
        String::from_utf8_lossy(&out).into_owned()
    }

    #[tokio::test]
    async fn test_zero_exit_fulfills() {
        let (runner, _console, _rx) = runner();
        let execution = runner.start("true", RunOptions::default()).unwrap();
        assert!(execution.handle.process_id().is_some());

        let outcome = finish(execution.completion).await.unwrap();
        assert_eq!(outcome, ExitOutcome::exited(0));
    }

    #[tokio::test]
    async fn test_non_zero_exit_rejects() {
        let (runner, _console, _rx) = runner();
        for (command, code) in [("false", 1), ("definitely-not-a-command-xyz", 127)] {
            let completion = runner.exec(command, RunOptions::default()).unwrap();
            let err = finish(completion).await.unwrap_err();
            assert_eq!(err.exit_outcome(), Some(&ExitOutcome::exited(code)), "{}", command);
        }
    }

    #[tokio::test]
    async fn test_killed_by_signal_rejects() {
        let (runner, _console, _rx) = runner();
        let completion = runner.exec("kill -9 $$", RunOptions::default()).unwrap();
        let err = finish(completion).await.unwrap_err();
        let outcome = err.exit_outcome().unwrap();
        assert!(outcome.signal.is_some());
        assert!(!outcome.success());
    }

    #[tokio::test]
    async fn test_streams_output_and_unsubscribes_on_exit() {
        let (runner, _console, mut rx) = runner();
        let execution = runner
            .start("printf 'mark%s\\n' er", RunOptions::default())
            .unwrap();
        assert_eq!(runner.resize_source().subscriber_count(), 1);

        finish(execution.completion).await.unwrap();
        assert_eq!(runner.resize_source().subscriber_count(), 0);
        assert_eq!(runner.resize_source().notify(), 0);
        assert!(drain(&mut rx, &OutputTarget::Common).contains("marker"));
    }

    #[tokio::test]
    async fn test_suppressed_streaming_creates_nothing() {
        let (runner, _console, mut rx) = runner();
        let execution = runner
            .start("printf 'mark%s\\n' er", RunOptions::default().suppress_output())
            .unwrap();
        assert_eq!(runner.resize_source().subscriber_count(), 0);

        finish(execution.completion).await.unwrap();
        assert_eq!(runner.resize_source().subscriber_count(), 0);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_missing_shell_is_a_configuration_error() {
        let (console, mut rx) = ChannelConsole::new();
        let console = Arc::new(console);
        let runner = ProcessRunner::new(
            Arc::new(Preferences::default()),
            console.clone(),
            ResizeSource::new(),
        )
        .with_environment(Arc::new(
            FixedEnvironment::new(Platform::Unix).with_var("SHELL", ""),
        ));

        let target = OutputTarget::named("build");
        let err = runner
            .start("ls", RunOptions::default().target(target.clone()))
            .unwrap_err();
        assert!(matches!(err, ExecError::Configuration { .. }));
        assert_eq!(runner.resize_source().subscriber_count(), 0);
        assert!(rx.try_recv().is_err());

        let errors = console.errors();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].0, target);
        assert!(errors[0].1.contains("no shell environment is available"));

        // Batch mode fails the same way but does not report to the console.
        let err = runner.exec_command("ls").unwrap_err();
        assert!(matches!(err, ExecError::Configuration { .. }));
        assert_eq!(console.errors().len(), 1);
    }

    #[tokio::test]
    async fn test_empty_command_is_rejected() {
        let (runner, _console, _rx) = runner();
        assert!(matches!(
            runner.start("   ", RunOptions::default()),
            Err(ExecError::EmptyCommand)
        ));
    }

    #[tokio::test]
    async fn test_configured_shell_is_used() {
        let (console, _rx) = ChannelConsole::new();
        let runner = ProcessRunner::new(
            Arc::new(Preferences::with_terminal_path("/bin/sh")),
            Arc::new(console),
            ResizeSource::new(),
        )
        .with_environment(Arc::new(FixedEnvironment::new(Platform::Unix)));

        let execution = runner.start("true", RunOptions::default()).unwrap();
        assert_eq!(execution.handle.shell().path(), "/bin/sh");
        finish(execution.completion).await.unwrap();
    }

    #[tokio::test]
    async fn test_pty_opens_at_console_size() {
        let (runner, console, _rx) = runner();
        console.set_size(OutputTarget::Common, TerminalSize::new(120, 50));

        let execution = runner.start("true", RunOptions::default()).unwrap();
        assert_eq!(execution.handle.size().unwrap(), TerminalSize::new(120, 50));
        finish(execution.completion).await.unwrap();

        // Suppressed invocations ignore the console and use the default.
        let execution = runner
            .start("true", RunOptions::default().suppress_output())
            .unwrap();
        assert_eq!(execution.handle.size().unwrap(), TerminalSize::DEFAULT);
        finish(execution.completion).await.unwrap();
    }

    #[tokio::test]
    async fn test_resize_follows_console() {
        let (runner, console, _rx) = runner();
        let execution = runner.start("sleep 2", RunOptions::default()).unwrap();
        assert_eq!(execution.handle.size().unwrap(), TerminalSize::DEFAULT);

        // Zero-sized surfaces are ignored.
        console.set_size(OutputTarget::Common, TerminalSize::new(0, 40));
        runner.resize_source().notify();
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(execution.handle.size().unwrap(), TerminalSize::DEFAULT);

        console.set_size(OutputTarget::Common, TerminalSize::new(100, 40));
        assert_eq!(runner.resize_source().notify(), 1);
        let resized = timeout(WAIT, async {
            while execution.handle.size().unwrap() != TerminalSize::new(100, 40) {
                tokio::time::sleep(Duration::from_millis(20)).await;
            }
        })
        .await;
        assert!(resized.is_ok());

        finish(execution.completion).await.unwrap();
    }

    #[tokio::test]
    async fn test_concurrent_invocations_are_isolated() {
        let (runner, _console, mut rx) = runner();
        let left = OutputTarget::named("left");
        let right = OutputTarget::named("right");

        let a = runner
            .start("printf 'alpha%s\\n' one", RunOptions::default().target(left.clone()))
            .unwrap();
        let b = runner
            .start("printf 'beta%s\\n' two; false", RunOptions::default().target(right.clone()))
            .unwrap();
        assert_eq!(runner.resize_source().subscriber_count(), 2);

        let (a, b) = tokio::join!(finish(a.completion), finish(b.completion));
        assert!(a.is_ok());
        assert_eq!(b.unwrap_err().exit_outcome(), Some(&ExitOutcome::exited(1)));
        assert_eq!(runner.resize_source().subscriber_count(), 0);

        let mut left_out = Vec::new();
        let mut right_out = Vec::new();
        while let Ok(chunk) = rx.try_recv() {
            if chunk.target == left {
                left_out.extend(chunk.data);
            } else if chunk.target == right {
                right_out.extend(chunk.data);
            }
        }
        let left_out = String::from_utf8_lossy(&left_out);
        let right_out = String::from_utf8_lossy(&right_out);
        assert!(left_out.contains("alphaone"));
        assert!(!left_out.contains("betatwo"));
        assert!(right_out.contains("betatwo"));
        assert!(!right_out.contains("alphaone"));
    }

    #[tokio::test]
    async fn test_keep_shell_open_accepts_more_commands() {
        let (runner, _console, mut rx) = runner();
        let execution = runner
            .start("printf 'first%s\\n' cmd", RunOptions::default().keep_shell_open())
            .unwrap();
        execution.handle.write_line("printf 'second%s\\n' cmd").unwrap();
        execution.handle.write_line("exit 3").unwrap();

        let err = finish(execution.completion).await.unwrap_err();
        assert_eq!(err.exit_outcome(), Some(&ExitOutcome::exited(3)));

        let out = drain(&mut rx, &OutputTarget::Common);
        let first = out.find("firstcmd").unwrap();
        let second = out.find("secondcmd").unwrap();
        assert!(first < second);
    }

    #[tokio::test]
    async fn test_working_directory() {
        let dir = tempfile::tempdir().unwrap();
        let dir_path = dir.path().canonicalize().unwrap();
        let (runner, _console, mut rx) = runner();

        let execution = runner
            .start("pwd -P", RunOptions::default().in_dir(&dir_path))
            .unwrap();
        finish(execution.completion).await.unwrap();
        assert!(drain(&mut rx, &OutputTarget::Common).contains(&*dir_path.to_string_lossy()));
    }

    #[tokio::test]
    async fn test_missing_working_directory_fails_to_spawn() {
        let (runner, _console, _rx) = runner();
        let err = runner
            .start("true", RunOptions::default().in_dir("/definitely/not/here"))
            .unwrap_err();
        assert!(matches!(err, ExecError::Spawn { .. }));
        assert_eq!(runner.resize_source().subscriber_count(), 0);
    }

    #[tokio::test]
    async fn test_batch_mode_has_no_wiring() {
        let (runner, _console, mut rx) = runner();
        let execution = runner.exec_command("printf 'mark%s\\n' er").unwrap();
        assert_eq!(runner.resize_source().subscriber_count(), 0);

        finish(execution.completion).await.unwrap();
        assert!(rx.try_recv().is_err());

        let err = finish(runner.exec_command("false").unwrap().completion)
            .await
            .unwrap_err();
        assert_eq!(err.exit_outcome(), Some(&ExitOutcome::exited(1)));
    }

    #[tokio::test]
    async fn test_background_job_does_not_hold_completion() {
        let (runner, _console, mut rx) = runner();
        let started = std::time::Instant::now();
        let execution = runner
            .start("printf 'bef%s\\n' ore; sleep 30 &", RunOptions::default())
            .unwrap();

        let outcome = timeout(Duration::from_secs(5), execution.completion)
            .await
            .unwrap()
            .unwrap();
        assert!(outcome.success());
        assert!(started.elapsed() < Duration::from_secs(5));
        assert_eq!(runner.resize_source().subscriber_count(), 0);
        assert!(drain(&mut rx, &OutputTarget::Common).contains("before"));
    }

    #[tokio::test]
    async fn test_handle_resize() {
        let (runner, _console, _rx) = runner();
        let execution = runner.start("sleep 1", RunOptions::default()).unwrap();

        execution.handle.resize(132, 43).unwrap();
        assert_eq!(execution.handle.size().unwrap(), TerminalSize::new(132, 43));

        finish(execution.completion).await.unwrap();

        // Once the shell is gone a resize is either refused or has no effect.
        let after_exit = execution.handle.resize(100, 30);
        assert!(matches!(after_exit, Ok(()) | Err(ExecError::Io(_))));
    }

    #[test]
    fn test_abandon_kills_and_reaps() {
        let pair = native_pty_system()
            .openpty(TerminalSize::DEFAULT.to_pty_size())
            .unwrap();
        let mut cmd = CommandBuilder::new("sleep");
        cmd.arg("30");
        let mut child = pair.slave.spawn_command(cmd).unwrap();

        abandon(child.as_mut());

        let status = child.try_wait().unwrap();
        assert!(status.is_some_and(|s| !s.success()));
    }
}

//! Shell resolution and command preparation.

use std::borrow::Cow;
use std::path::Path;

use crate::config::Preferences;

use super::platform::{Environment, Platform};

/// The shell an invocation runs in, resolved once at start.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShellSpec {
    path: String,
    args: Vec<String>,
    platform: Platform,
    command_interpreter: bool,
}

impl ShellSpec {
    /// Resolves the shell from the preferences, falling back to `COMSPEC` on
    /// Windows and `SHELL` elsewhere. Returns `None` when neither is set; no
    /// fallback shell is guessed.
    pub fn resolve(prefs: &Preferences, env: &dyn Environment) -> Option<Self> {
        let platform = env.platform();
        let path = match prefs.terminal_path() {
            Some(path) => path.to_string(),
            None => env.var(platform.shell_var())?,
        };

        // Login shell on macOS so the user's profile (and PATH) is sourced.
        let args = match platform {
            Platform::MacOs => vec!["-l".to_string()],
            Platform::Windows | Platform::Unix => Vec::new(),
        };

        let command_interpreter =
            is_command_interpreter(&path, env.var("COMSPEC").as_deref(), platform);

        Some(Self {
            path,
            args,
            platform,
            command_interpreter,
        })
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// Whether this is the Windows `cmd` interpreter.
    pub fn is_command_interpreter(&self) -> bool {
        self.command_interpreter
    }

    /// Rewrites `/` to `\` for the Windows command interpreter; any other
    /// shell gets the command unmodified.
    pub fn normalize_command<'a>(&self, command: &'a str) -> Cow<'a, str> {
        if self.command_interpreter && command.contains('/') {
            Cow::Owned(command.replace('/', "\\"))
        } else {
            Cow::Borrowed(command)
        }
    }

    /// `line` plus the platform terminator.
    pub fn line(&self, line: &str) -> String {
        format!("{}{}", line, self.platform.line_terminator())
    }

    /// The line that ends the shell session.
    pub fn exit_line(&self) -> String {
        self.line("exit")
    }
}

fn is_command_interpreter(path: &str, comspec: Option<&str>, platform: Platform) -> bool {
    if comspec.is_some_and(|c| c.eq_ignore_ascii_case(path)) {
        return true;
    }
    // A Unix binary that happens to be called `cmd` is not the interpreter.
    if platform != Platform::Windows {
        return false;
    }
    // Windows separators are not understood by Path on Unix.
    let name = path.rsplit(['/', '\\']).next().unwrap_or(path);
    Path::new(name)
        .file_stem()
        .and_then(|s| s.to_str())
        .is_some_and(|s| s.eq_ignore_ascii_case("cmd"))
}

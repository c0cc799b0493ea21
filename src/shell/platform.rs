//! Platform identification and environment lookup.
//!
//! Shell resolution only needs two things from the host: which platform
//! bucket it falls into and the value of a couple of environment variables.
//! Both go through the [`Environment`] trait so tests can pin them.

use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    Windows,
    MacOs,
    /// Any other Unix-like system.
    Unix,
}

impl Platform {
    pub fn current() -> Self {
        if cfg!(windows) {
            Platform::Windows
        } else if cfg!(target_os = "macos") {
            Platform::MacOs
        } else {
            Platform::Unix
        }
    }

    /// Environment variable naming the default shell.
    pub fn shell_var(self) -> &'static str {
        match self {
            Platform::Windows => "COMSPEC",
            Platform::MacOs | Platform::Unix => "SHELL",
        }
    }

    /// Terminator appended to every line written to the pty.
    pub fn line_terminator(self) -> &'static str {
        match self {
            Platform::Windows => "\r\n",
            Platform::MacOs | Platform::Unix => "\n",
        }
    }
}

pub trait Environment: Send + Sync {
    fn platform(&self) -> Platform;

    /// Value of `key`; empty values read as unset.
    fn var(&self, key: &str) -> Option<String>;
}

/// The real process environment.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemEnvironment;

impl Environment for SystemEnvironment {
    fn platform(&self) -> Platform {
        Platform::current()
    }

    fn var(&self, key: &str) -> Option<String> {
        std::env::var(key).ok().filter(|v| !v.trim().is_empty())
    }
}

/// A pinned platform and variable set.
#[derive(Debug, Clone)]
pub struct FixedEnvironment {
    platform: Platform,
    vars: HashMap<String, String>,
}

impl FixedEnvironment {
    pub fn new(platform: Platform) -> Self {
        Self {
            platform,
            vars: HashMap::new(),
        }
    }

    pub fn with_var(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.vars.insert(key.into(), value.into());
        self
    }
}

impl Environment for FixedEnvironment {
    fn platform(&self) -> Platform {
        self.platform
    }

    fn var(&self, key: &str) -> Option<String> {
        self.vars
            .get(key)
            .filter(|v| !v.trim().is_empty())
            .cloned()
    }
}

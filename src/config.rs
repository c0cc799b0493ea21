//! User preferences consumed by the runner.
//!
//! The runner never reads persisted state on its own: it is handed a
//! [`PreferencesProvider`] at construction. [`PreferencesStore`] is the
//! file-backed provider used by the CLI; [`Preferences`] itself is a static
//! provider, handy for tests and for command-line overrides.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context as _;
use serde::{Deserialize, Serialize};

/// Fixed identifier the preferences are persisted under.
pub const PREFERENCES_KEY: &str = "editor-preferences";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Preferences {
    /// Shell the user wants commands to run in.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub terminal_path: Option<String>,
}

impl Preferences {
    pub fn with_terminal_path(path: impl Into<String>) -> Self {
        Self {
            terminal_path: Some(path.into()),
        }
    }

    /// Configured shell path, ignoring blank values.
    pub fn terminal_path(&self) -> Option<&str> {
        self.terminal_path
            .as_deref()
            .map(str::trim)
            .filter(|p| !p.is_empty())
    }
}

/// Source of preferences, read once per invocation.
pub trait PreferencesProvider: Send + Sync {
    fn preferences(&self) -> anyhow::Result<Preferences>;
}

impl PreferencesProvider for Preferences {
    fn preferences(&self) -> anyhow::Result<Preferences> {
        Ok(self.clone())
    }
}

/// JSON file holding the persisted preferences.
#[derive(Debug, Clone)]
pub struct PreferencesStore {
    path: PathBuf,
}

impl PreferencesStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// A missing file reads as default preferences.
    pub fn load(&self) -> anyhow::Result<Preferences> {
        if !self.path.exists() {
            return Ok(Preferences::default());
        }
        let raw = fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read {}", self.path.display()))?;
        let prefs = serde_json::from_str(&raw)
            .with_context(|| format!("Invalid preferences JSON at {}", self.path.display()))?;
        Ok(prefs)
    }

    pub fn save(&self, prefs: &Preferences) -> anyhow::Result<()> {
        let data = serde_json::to_vec_pretty(prefs).context("Failed to serialize preferences")?;
        write_atomic(&self.path, &data)
    }
}

impl Default for PreferencesStore {
    fn default() -> Self {
        Self::new(default_preferences_path())
    }
}

impl PreferencesProvider for PreferencesStore {
    fn preferences(&self) -> anyhow::Result<Preferences> {
        self.load()
    }
}

pub fn default_preferences_path() -> PathBuf {
    // ~/.pty-runner/editor-preferences.json
    let home = std::env::var_os("HOME")
        .or_else(|| std::env::var_os("USERPROFILE"))
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."));
    home.join(".pty-runner").join(format!("{PREFERENCES_KEY}.json"))
}

fn write_atomic(path: &Path, data: &[u8]) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).with_context(|| {
            format!("Failed to create preferences directory: {}", parent.display())
        })?;
    }
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, data).with_context(|| format!("Failed to write temp file: {}", tmp.display()))?;
    fs::rename(&tmp, path).with_context(|| {
        format!("Failed to replace {} with {}", path.display(), tmp.display())
    })?;
    Ok(())
}

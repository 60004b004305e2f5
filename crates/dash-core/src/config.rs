//! Configuration file types.
//!
//! The top-level [`Config`] is deserialized from TOML. The `[scale]` and
//! `[bitrates]` tables describe the rendition ladder keyed by resolution label;
//! `[tools]` and `[run]` control how external processes are launched. Every
//! section defaults sensibly so an empty file is valid (if useless).

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::Result;
use crate::Error;

/// File name looked up next to the executable when no `--config` is given.
pub const DEFAULT_CONFIG_FILE: &str = "config.toml";

// ---------------------------------------------------------------------------
// Top-level Config
// ---------------------------------------------------------------------------

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Resolution label -> ffmpeg scale descriptor (e.g. `180p = "320x180"`).
    pub scale: BTreeMap<String, String>,
    /// Resolution label -> allowed bitrates.
    pub bitrates: BTreeMap<String, BitrateList>,
    pub tools: ToolsConfig,
    pub run: RunConfig,
}

impl Config {
    /// Deserialize a `Config` from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        let mut config: Config = toml::from_str(toml_str)
            .map_err(|e| Error::Config(format!("config parse error: {e}")))?;
        config.tools.expand_paths();
        Ok(config)
    }

    /// Load configuration from a file. A missing file is an error: without
    /// it no resolution label can be resolved.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("failed to read config file {}: {e}", path.display()))
        })?;
        let config = Self::from_toml(&contents)?;
        tracing::debug!(
            "Loaded config {} ({} scales, {} bitrate lists)",
            path.display(),
            config.scale.len(),
            config.bitrates.len()
        );
        Ok(config)
    }

    /// Load configuration from a file path, falling back to defaults if the
    /// file is missing or broken. Used where the ladder is not needed.
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                tracing::info!("{e}; using defaults");
                Self::default()
            }
        }
    }

    /// Location of the config file beside the running executable.
    pub fn default_path() -> Result<PathBuf> {
        let exe = std::env::current_exe()?;
        let dir = exe
            .parent()
            .ok_or_else(|| Error::Config(format!("{} has no parent directory", exe.display())))?;
        Ok(dir.join(DEFAULT_CONFIG_FILE))
    }

    /// Return a list of validation warnings (non-fatal issues).
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        for label in self.scale.keys() {
            if !self.bitrates.contains_key(label) {
                warnings.push(format!("scale '{label}' has no [bitrates] entry"));
            }
        }
        for (label, list) in &self.bitrates {
            if !self.scale.contains_key(label) {
                warnings.push(format!("bitrates '{label}' has no [scale] entry"));
            }
            if list.to_vec().is_empty() {
                warnings.push(format!("bitrates '{label}' is empty"));
            }
        }

        if self.tools.timeout_secs == 0 {
            warnings.push("tools.timeout_secs is 0; every tool will time out immediately".into());
        }

        warnings
    }
}

// ---------------------------------------------------------------------------
// Sub-configs
// ---------------------------------------------------------------------------

/// A bitrate list, written either as `"500k,800k"` or `["500k", "800k"]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BitrateList {
    Csv(String),
    List(Vec<String>),
}

impl BitrateList {
    /// The bitrates in their written order, trimmed, with empty entries dropped.
    pub fn to_vec(&self) -> Vec<String> {
        let items: Vec<&str> = match self {
            BitrateList::Csv(s) => s.split(',').collect(),
            BitrateList::List(v) => v.iter().map(String::as_str).collect(),
        };
        items
            .into_iter()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect()
    }
}

/// Paths and limits for external tools.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolsConfig {
    pub ffmpeg_path: Option<PathBuf>,
    pub mp4box_path: Option<PathBuf>,
    /// Upper bound on a single tool invocation, in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    86_400
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            ffmpeg_path: None,
            mp4box_path: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl ToolsConfig {
    /// The per-invocation timeout.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    fn expand_paths(&mut self) {
        for path in [&mut self.ffmpeg_path, &mut self.mp4box_path]
            .into_iter()
            .flatten()
        {
            let expanded = shellexpand::tilde(&path.to_string_lossy()).into_owned();
            *path = PathBuf::from(expanded);
        }
    }
}

/// Run policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Run the ffmpeg transcodes before packaging. Off by default, in which
    /// case the renditions must already exist.
    pub transcode: bool,
    /// Append-only log receiving the output of every tool invocation.
    #[serde(default = "default_log_path")]
    pub log_path: PathBuf,
}

fn default_log_path() -> PathBuf {
    PathBuf::from("run.log")
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            transcode: false,
            log_path: default_log_path(),
        }
    }
}

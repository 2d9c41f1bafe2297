//! Interpreter configuration (mlang.toml)
//!
//! Every key is optional; command-line flags override whatever the file sets.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// File name searched for by [`Config::discover`]
pub const CONFIG_FILE: &str = "mlang.toml";

/// Contents of an `mlang.toml`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// How programs are started
    #[serde(default)]
    pub run: RunConfig,

    /// How results are reported
    #[serde(default)]
    pub output: OutputConfig,
}

/// `[run]` table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RunConfig {
    /// Tag run first
    #[serde(default = "default_entry")]
    pub entry: String,

    /// Tag re-invoked once per frame
    #[serde(default = "default_frame_tag")]
    pub frame_tag: String,

    /// Number of frame invocations after the entry tag
    #[serde(default)]
    pub frames: u32,

    /// Delta-time argument passed to every frame invocation, in seconds
    #[serde(default = "default_frame_delta")]
    pub frame_delta: f64,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            entry: default_entry(),
            frame_tag: default_frame_tag(),
            frames: 0,
            frame_delta: default_frame_delta(),
        }
    }
}

fn default_entry() -> String {
    "main".to_string()
}

fn default_frame_tag() -> String {
    "frame".to_string()
}

fn default_frame_delta() -> f64 {
    0.016
}

/// `[output]` table
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OutputConfig {
    /// Report diagnostics as JSON
    #[serde(default)]
    pub json: bool,
}

impl Config {
    /// Load a config from a file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        Self::parse(&content).map_err(|err| match err {
            ConfigError::Parse { message, .. } => ConfigError::Parse {
                path: Some(path.to_path_buf()),
                message,
            },
            other => other,
        })
    }

    /// Parse a config from a TOML string
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::Parse {
            path: None,
            message: e.to_string(),
        })
    }

    /// Walk up from `start` looking for `mlang.toml`
    pub fn find(start: &Path) -> Option<PathBuf> {
        start
            .ancestors()
            .map(|dir| dir.join(CONFIG_FILE))
            .find(|candidate| candidate.is_file())
    }

    /// Load the config governing `script`: the nearest `mlang.toml` above the
    /// script, then above the current directory, else the defaults
    pub fn discover(script: Option<&Path>) -> Result<Self, ConfigError> {
        let script_dir = script
            .and_then(Path::parent)
            .map(|dir| {
                if dir.as_os_str().is_empty() {
                    PathBuf::from(".")
                } else {
                    dir.to_path_buf()
                }
            });
        let cwd = std::env::current_dir().ok();

        let found = script_dir
            .iter()
            .chain(cwd.iter())
            .find_map(|dir| Self::find(dir));

        match found {
            Some(path) => {
                tracing::debug!(path = %path.display(), "loading config");
                Self::load(&path)
            }
            None => Ok(Self::default()),
        }
    }
}

/// Config errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("could not read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config{}: {message}", .path.as_ref().map(|p| format!(" {}", p.display())).unwrap_or_default())]
    Parse {
        path: Option<PathBuf>,
        message: String,
    },
}

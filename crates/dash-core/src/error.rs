//! Unified error type for mp4dash.
//!
//! Every stage funnels its failures into [`Error`], which carries enough
//! context for the binary to pick a process exit code via
//! [`Error::exit_code`].

use std::time::Duration;

/// Unified error type covering all failure modes of a packaging run.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Command-line input was missing or malformed.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// A requested resolution label has no entry in the config file.
    #[error("Unknown resolution '{label}': no [{section}] entry in config")]
    ConfigLookup {
        /// The resolution label that was looked up.
        label: String,
        /// The config section that lacks it.
        section: String,
    },

    /// The config file could not be read, parsed, or describes a conflicting
    /// rendition ladder.
    #[error("Config error: {0}")]
    Config(String),

    /// A bitrate string did not have the form `<integer><unit>`.
    #[error("Malformed bitrate '{value}': expected an integer followed by a unit letter")]
    MalformedBitrate {
        /// The offending bitrate string.
        value: String,
    },

    /// An external tool could not be spawned.
    #[error("Tool not found: {tool}")]
    ToolNotFound {
        /// Name or path of the tool.
        tool: String,
    },

    /// An external tool exited with a non-zero status.
    #[error("Tool error [{tool}]: exited with {status}")]
    ExternalProcess {
        /// Name of the tool that failed.
        tool: String,
        /// Human-readable exit status.
        status: String,
        /// Combined stdout/stderr captured from the run.
        output: String,
    },

    /// An external tool ran longer than its allotted time and was killed.
    #[error("Tool error [{tool}]: timed out after {after:?}")]
    Timeout {
        /// Name of the tool that was killed.
        tool: String,
        /// The configured bound.
        after: Duration,
    },

    /// The run was interrupted while an external tool was running.
    #[error("Tool error [{tool}]: cancelled")]
    Cancelled {
        /// Name of the tool that was killed.
        tool: String,
    },

    /// An I/O operation failed.
    #[error("IO error: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },
}

impl Error {
    /// Map this error to the process exit code reported by the CLI.
    pub fn exit_code(&self) -> u8 {
        match self {
            Error::Io { .. } => 1,
            Error::InvalidArgument(_) => 2,
            Error::ConfigLookup { .. } => 3,
            Error::Config(_) => 3,
            Error::MalformedBitrate { .. } => 4,
            Error::ToolNotFound { .. } => 5,
            Error::ExternalProcess { .. } => 6,
            Error::Timeout { .. } => 7,
            Error::Cancelled { .. } => 130,
        }
    }

    /// Convenience constructor for [`Error::InvalidArgument`].
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Error::InvalidArgument(message.into())
    }

    /// Convenience constructor for [`Error::ConfigLookup`].
    pub fn config_lookup(label: impl Into<String>, section: impl Into<String>) -> Self {
        Error::ConfigLookup {
            label: label.into(),
            section: section.into(),
        }
    }

    /// Convenience constructor for [`Error::MalformedBitrate`].
    pub fn malformed_bitrate(value: impl Into<String>) -> Self {
        Error::MalformedBitrate {
            value: value.into(),
        }
    }

    /// Convenience constructor for [`Error::ExternalProcess`].
    pub fn external_process(
        tool: impl Into<String>,
        status: impl ToString,
        output: impl Into<String>,
    ) -> Self {
        Error::ExternalProcess {
            tool: tool.into(),
            status: status.to_string(),
            output: output.into(),
        }
    }

    /// Captured tool output, if this error carries any.
    pub fn captured_output(&self) -> Option<&str> {
        match self {
            Error::ExternalProcess { output, .. } => Some(output),
            _ => None,
        }
    }
}

/// Result alias using the crate-level [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

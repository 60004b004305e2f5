//! # dash-av
//!
//! External tool management for the mp4dash pipeline.
//!
//! This crate provides:
//!
//! - **Tool discovery** ([`ToolRegistry`]) -- find ffmpeg and MP4Box.
//! - **Command execution** ([`ToolCommand`]) -- argument-list builder with
//!   timeout and cancellation, writing to the [`RunLog`].
//! - **Command builders** ([`actions`]) -- the ffmpeg invocation for each
//!   planned work item and the single MP4Box packaging invocation.

pub mod actions;
pub mod command;
pub mod runlog;
pub mod tools;

// ---- Re-exports for convenience ----

pub use command::{ToolCommand, ToolOutput};
pub use runlog::RunLog;
pub use tools::{ToolInfo, ToolRegistry, FFMPEG, MP4BOX};

pub use actions::{package_command, transcode_command};

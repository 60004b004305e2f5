//! mp4dash - package an MP4 as MPEG-DASH with ffmpeg and MP4Box
//!
//! This library crate exposes the orchestrator for integration testing.

pub mod orchestrator;

pub use orchestrator::{Failure, Orchestrator, Report, RunSettings, Stage};

//! dash-core: options, configuration, the rendition ladder, and planning.
//!
//! Everything here is pure in-memory work. No external process is started
//! and no file is written; the only I/O is reading the config file and
//! checking that the input exists.

pub mod config;
pub mod error;
pub mod ladder;
pub mod options;
pub mod plan;

// Re-export the most commonly used items at the crate root.
pub use config::Config;
pub use error::{Error, Result};
pub use ladder::{Bitrate, BitrateTable, Rung};
pub use options::{Options, Profile, RawOptions};
pub use plan::{RenditionPlan, VideoRendition, WorkItem};

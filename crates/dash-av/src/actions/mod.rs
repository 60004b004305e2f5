//! Command builders for the two external stages: ffmpeg transcoding and
//! MP4Box DASH packaging.

mod package;
mod transcode;

pub use package::package_command;
pub use transcode::{transcode_command, x264_gop_opts};

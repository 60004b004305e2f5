//! Per-rendition ffmpeg invocations.

use std::path::{Path, PathBuf};

use dash_core::WorkItem;

use crate::command::ToolCommand;

/// x264 options pinning the GOP: a keyframe exactly every `keyint` frames and
/// no scene-cut keyframes. All renditions must share keyframe positions or
/// MP4Box cannot align their segments.
pub fn x264_gop_opts(keyint: u32) -> String {
    format!("keyint={keyint}:min-keyint={keyint}:no-scenecut")
}

/// Build the ffmpeg command producing `item` from `input`.
///
/// - Audio: drop video, copy the audio stream untouched.
/// - Video: drop audio, libx264 at a fixed GOP with target and max bitrate
///   both set to the rendition bitrate, buffer at half of it, scaled.
///
/// Existing outputs are overwritten (`-y`); stdin is never read.
pub fn transcode_command(ffmpeg: PathBuf, input: &Path, item: &WorkItem, keyint: u32) -> ToolCommand {
    let mut cmd = ToolCommand::new(ffmpeg);
    cmd.args(["-nostdin", "-y", "-i"]);
    cmd.path_arg(input);

    match item {
        WorkItem::ExtractAudio { output } => {
            cmd.args(["-vn", "-c:a", "copy"]);
            cmd.path_arg(output);
        }
        WorkItem::Transcode(r) => {
            let bitrate = r.bitrate.to_string();
            cmd.args(["-an", "-c:v", "libx264"]);
            cmd.args(["-x264opts".to_string(), x264_gop_opts(keyint)]);
            cmd.args(["-b:v", bitrate.as_str(), "-maxrate", bitrate.as_str()]);
            cmd.args(["-bufsize".to_string(), r.buffer_size.to_string()]);
            cmd.args(["-vf".to_string(), format!("scale={}", r.scale)]);
            cmd.path_arg(&r.output);
        }
    }

    tracing::debug!("{}: {cmd}", item.describe());
    cmd
}

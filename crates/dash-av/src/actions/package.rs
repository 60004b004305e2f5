//! The MP4Box packaging invocation.

use std::path::{Path, PathBuf};

use dash_core::Options;

use crate::command::ToolCommand;

/// Build the MP4Box command that segments `renditions` and writes the
/// manifest.
///
/// Segments start on random-access points at both segment and fragment
/// boundaries. Rendition paths are appended after every named flag, in the
/// order given. Their existence is not checked here: a missing rendition
/// shows up as an MP4Box failure.
pub fn package_command<'a>(
    mp4box: PathBuf,
    options: &Options,
    renditions: impl IntoIterator<Item = &'a Path>,
) -> ToolCommand {
    let mut cmd = ToolCommand::new(mp4box);
    cmd.args(["-dash".to_string(), options.segment_duration.to_string()]);
    cmd.args(["-rap", "-frag-rap"]);
    cmd.args(["-profile", options.profile.as_str()]);
    cmd.args(["-segment-name", options.segment_name.as_str()]);
    if let Some(ref url) = options.base_url {
        cmd.args(["-base-url", url.as_str()]);
    }
    cmd.arg("-out");
    cmd.path_arg(&options.manifest_path());

    for rendition in renditions {
        cmd.path_arg(rendition);
    }

    tracing::debug!("package: {cmd}");
    cmd
}

//! Rendition planning: the ordered list of files to produce before packaging.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::ladder::{Bitrate, BitrateTable};
use crate::Error;

/// File name of the extracted audio track.
pub const AUDIO_FILE_NAME: &str = "video_audio.mp4";

/// Output name for the video rendition at `bitrate`.
pub fn video_file_name(bitrate: &Bitrate) -> String {
    format!("video_{bitrate}.mp4")
}

/// A video rendition to encode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoRendition {
    /// Resolution label (e.g. `180p`).
    pub label: String,
    /// ffmpeg scale descriptor (e.g. `320x180`).
    pub scale: String,
    pub bitrate: Bitrate,
    pub buffer_size: Bitrate,
    pub output: PathBuf,
}

/// One unit of transcoding work.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkItem {
    /// Copy the audio stream out of the source, dropping video.
    ExtractAudio { output: PathBuf },
    /// Encode video only at one scale and bitrate.
    Transcode(VideoRendition),
}

impl WorkItem {
    /// The file this item produces.
    pub fn output(&self) -> &Path {
        match self {
            WorkItem::ExtractAudio { output } => output,
            WorkItem::Transcode(r) => &r.output,
        }
    }

    /// Short human-readable description, used in logs and failure reports.
    pub fn describe(&self) -> String {
        match self {
            WorkItem::ExtractAudio { .. } => "audio".to_string(),
            WorkItem::Transcode(r) => format!("{}@{}", r.label, r.bitrate),
        }
    }
}

/// Ordered work items for one source file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenditionPlan {
    input: PathBuf,
    items: Vec<WorkItem>,
}

impl RenditionPlan {
    /// Plan renditions for `input`, writing outputs into `output_dir`.
    ///
    /// The audio item always comes first, followed by one video item per
    /// (resolution, bitrate) in table order. Fails with
    /// [`Error::MalformedBitrate`] on an unparseable bitrate and with
    /// [`Error::Config`] if two renditions would write the same file.
    pub fn new(input: &Path, output_dir: &Path, table: &BitrateTable) -> Result<Self> {
        let mut items = vec![WorkItem::ExtractAudio {
            output: output_dir.join(AUDIO_FILE_NAME),
        }];
        let mut seen: HashSet<PathBuf> = HashSet::new();

        for rung in table.iter() {
            for raw in &rung.bitrates {
                let bitrate: Bitrate = raw.parse()?;
                let output = output_dir.join(video_file_name(&bitrate));
                if !seen.insert(output.clone()) {
                    return Err(Error::Config(format!(
                        "bitrate {bitrate} appears more than once in the ladder; \
                         {} would be overwritten",
                        output.display()
                    )));
                }
                items.push(WorkItem::Transcode(VideoRendition {
                    label: rung.label.clone(),
                    scale: rung.scale.clone(),
                    bitrate,
                    buffer_size: bitrate.buffer_size(),
                    output,
                }));
            }
        }

        tracing::debug!("Planned {} work items for {}", items.len(), input.display());
        Ok(Self {
            input: input.to_path_buf(),
            items,
        })
    }

    /// The source video.
    pub fn input(&self) -> &Path {
        &self.input
    }

    pub fn items(&self) -> &[WorkItem] {
        &self.items
    }

    /// Every output file in plan order: audio first, then the videos.
    pub fn outputs(&self) -> impl Iterator<Item = &Path> {
        self.items.iter().map(WorkItem::output)
    }

    /// Number of video renditions.
    pub fn video_count(&self) -> usize {
        self.items.len() - 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ladder::Rung;
    use assert_matches::assert_matches;

    fn rung(label: &str, scale: &str, rates: &[&str]) -> Rung {
        Rung {
            label: label.into(),
            scale: scale.into(),
            bitrates: rates.iter().map(|s| s.to_string()).collect(),
        }
    }

    fn sample_table() -> BitrateTable {
        [
            rung("180p", "320x180", &["500k", "800k"]),
            rung("360p", "640x360", &["1200k"]),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn plan_order_matches_ladder() {
        let dir = Path::new("/media/in");
        let plan = RenditionPlan::new(&dir.join("video.mp4"), dir, &sample_table()).unwrap();

        let described: Vec<String> = plan.items().iter().map(WorkItem::describe).collect();
        assert_eq!(described, vec!["audio", "180p@500k", "180p@800k", "360p@1200k"]);
        assert_eq!(plan.video_count(), 3);
        assert_eq!(plan.input(), Path::new("/media/in/video.mp4"));

        let outputs: Vec<&Path> = plan.outputs().collect();
        assert_eq!(
            outputs,
            vec![
                Path::new("/media/in/video_audio.mp4"),
                Path::new("/media/in/video_500k.mp4"),
                Path::new("/media/in/video_800k.mp4"),
                Path::new("/media/in/video_1200k.mp4"),
            ]
        );
    }

    #[test]
    fn exactly_one_audio_item_first() {
        for table in [BitrateTable::default(), sample_table()] {
            let plan = RenditionPlan::new(Path::new("in.mp4"), Path::new("."), &table).unwrap();
            assert_matches!(plan.items()[0], WorkItem::ExtractAudio { .. });
            let audio = plan
                .items()
                .iter()
                .filter(|i| matches!(i, WorkItem::ExtractAudio { .. }))
                .count();
            assert_eq!(audio, 1);
        }
    }

    #[test]
    fn video_items_carry_buffer_size() {
        let plan =
            RenditionPlan::new(Path::new("in.mp4"), Path::new("."), &sample_table()).unwrap();
        let WorkItem::Transcode(first) = &plan.items()[1] else {
            panic!("expected a video item");
        };
        assert_eq!(first.scale, "320x180");
        assert_eq!(first.bitrate.to_string(), "500k");
        assert_eq!(first.buffer_size.to_string(), "250k");
    }

    #[test]
    fn malformed_bitrate_fails_planning() {
        let table: BitrateTable = [rung("180p", "320x180", &["500k", "fast"])].into_iter().collect();
        let err = RenditionPlan::new(Path::new("in.mp4"), Path::new("."), &table).unwrap_err();
        assert_matches!(err, Error::MalformedBitrate { value } if value == "fast");
    }

    #[test]
    fn shared_bitrate_across_resolutions_is_rejected() {
        let table: BitrateTable = [
            rung("180p", "320x180", &["500k"]),
            rung("360p", "640x360", &["500k"]),
        ]
        .into_iter()
        .collect();
        let err = RenditionPlan::new(Path::new("in.mp4"), Path::new("."), &table).unwrap_err();
        assert_matches!(err, Error::Config(msg) if msg.contains("video_500k.mp4"));
    }
}

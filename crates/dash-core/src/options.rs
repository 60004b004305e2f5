//! Validated run options.
//!
//! [`RawOptions`] mirrors the command line one-to-one with every field
//! optional; [`Options::from_raw`] checks it and produces the normalized
//! record the rest of the pipeline consumes.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::error::Result;
use crate::Error;

/// MP4Box DASH profiles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Profile {
    OnDemand,
    Live,
    Main,
    Simple,
    Full,
    DashAvc264Live,
    DashAvc264OnDemand,
}

impl Profile {
    pub const ALL: [Profile; 7] = [
        Profile::OnDemand,
        Profile::Live,
        Profile::Main,
        Profile::Simple,
        Profile::Full,
        Profile::DashAvc264Live,
        Profile::DashAvc264OnDemand,
    ];

    /// Identifier as MP4Box spells it.
    pub fn as_str(&self) -> &'static str {
        match self {
            Profile::OnDemand => "onDemand",
            Profile::Live => "live",
            Profile::Main => "main",
            Profile::Simple => "simple",
            Profile::Full => "full",
            Profile::DashAvc264Live => "dashavc264:live",
            Profile::DashAvc264OnDemand => "dashavc264:onDemand",
        }
    }
}

impl fmt::Display for Profile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Profile {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Profile::ALL
            .into_iter()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| {
                let valid: Vec<&str> = Profile::ALL.iter().map(Profile::as_str).collect();
                Error::invalid_argument(format!(
                    "unknown profile '{s}' (valid: {})",
                    valid.join(", ")
                ))
            })
    }
}

/// Options exactly as supplied on the command line.
#[derive(Debug, Clone, Default)]
pub struct RawOptions {
    pub input_dir: Option<PathBuf>,
    pub input_name: Option<String>,
    pub scale: Option<String>,
    /// Reserved; bitrates always come from the config file.
    pub bitrates: Option<String>,
    pub keyint: Option<u32>,
    pub dash: Option<u32>,
    pub profile: Option<String>,
    pub out: Option<String>,
    pub segment_name: Option<String>,
    pub base_url: Option<String>,
}

/// Validated options for one packaging run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Options {
    pub input_dir: PathBuf,
    pub input_name: String,
    /// Resolution labels in the order the user asked for them.
    pub resolutions: Vec<String>,
    /// Keyframe interval in frames.
    pub keyint: u32,
    /// Segment duration in milliseconds.
    pub segment_duration: u32,
    pub profile: Profile,
    pub manifest_name: String,
    /// Segment naming template; `$...$` placeholders are left for MP4Box.
    pub segment_name: String,
    pub base_url: Option<String>,
}

fn required<T>(value: Option<T>, flag: &str) -> Result<T> {
    value.ok_or_else(|| Error::invalid_argument(format!("missing required option {flag}")))
}

fn non_empty(value: String, flag: &str) -> Result<String> {
    if value.trim().is_empty() {
        return Err(Error::invalid_argument(format!("{flag} must not be empty")));
    }
    Ok(value)
}

fn positive(value: u32, flag: &str) -> Result<u32> {
    if value == 0 {
        return Err(Error::invalid_argument(format!("{flag} must be a positive integer")));
    }
    Ok(value)
}

/// Split a comma-separated resolution list, keeping the given order.
pub fn parse_resolutions(list: &str) -> Result<Vec<String>> {
    let mut labels: Vec<String> = Vec::new();
    for label in list.split(',').map(str::trim).filter(|l| !l.is_empty()) {
        if labels.iter().any(|l| l == label) {
            return Err(Error::invalid_argument(format!(
                "resolution '{label}' requested more than once"
            )));
        }
        labels.push(label.to_string());
    }
    if labels.is_empty() {
        return Err(Error::invalid_argument("-scale lists no resolutions"));
    }
    Ok(labels)
}

impl Options {
    /// Validate raw command-line options.
    ///
    /// Fails with [`Error::InvalidArgument`] on the first missing or malformed
    /// option, or when the input file does not exist.
    pub fn from_raw(raw: RawOptions) -> Result<Self> {
        let input_dir = required(raw.input_dir, "-input-dir")?;
        // Every tool argument is derived from this directory.
        if input_dir.to_str().is_none() {
            return Err(Error::invalid_argument(format!(
                "-input-dir is not valid UTF-8: {}",
                input_dir.display()
            )));
        }
        let input_name = non_empty(required(raw.input_name, "-input-name")?, "-input-name")?;
        let resolutions = parse_resolutions(&required(raw.scale, "-scale")?)?;
        let keyint = positive(required(raw.keyint, "-keyint")?, "-keyint")?;
        let segment_duration = positive(required(raw.dash, "-dash")?, "-dash")?;
        let profile: Profile = required(raw.profile, "-profile")?.parse()?;
        let manifest_name = non_empty(required(raw.out, "-out")?, "-out")?;
        let segment_name = non_empty(
            required(raw.segment_name, "-segment-name")?,
            "-segment-name",
        )?;

        if let Some(bitrates) = raw.bitrates {
            tracing::warn!("-bitrates '{bitrates}' ignored; bitrates are read from the config file");
        }

        let options = Self {
            input_dir,
            input_name,
            resolutions,
            keyint,
            segment_duration,
            profile,
            manifest_name,
            segment_name,
            base_url: raw.base_url.filter(|u| !u.trim().is_empty()),
        };

        let input = options.input_path();
        if !input.is_file() {
            return Err(Error::invalid_argument(format!(
                "input file does not exist: {}",
                input.display()
            )));
        }

        Ok(options)
    }

    /// The source video.
    pub fn input_path(&self) -> PathBuf {
        self.input_dir.join(&self.input_name)
    }

    /// Where MP4Box writes the manifest.
    pub fn manifest_path(&self) -> PathBuf {
        self.input_dir.join(&self.manifest_name)
    }

    /// Directory that receives the intermediate renditions.
    pub fn output_dir(&self) -> &Path {
        &self.input_dir
    }
}

use clap::{ArgAction, CommandFactory, Parser};
use dash_core::RawOptions;
use std::collections::HashMap;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "mp4dash")]
#[command(version, disable_version_flag = true)]
#[command(about = "Transcode an MP4 into DASH renditions and package them with MP4Box")]
pub struct Cli {
    /// Input file directory; renditions and the manifest are written here too
    #[arg(long = "input-dir", visible_alias = "id", value_name = "DIR")]
    pub input_dir: Option<PathBuf>,

    /// Input file name, relative to the input directory
    #[arg(long = "input-name", visible_alias = "if", value_name = "FILE")]
    pub input_name: Option<String>,

    /// Comma-separated resolution labels (e.g. 90p,180p)
    #[arg(short = 's', long = "scale", value_name = "LABELS")]
    pub scale: Option<String>,

    /// Reserved; bitrates are read from the config file
    #[arg(short = 'b', long = "bitrates", value_name = "BITRATES")]
    pub bitrates: Option<String>,

    /// x264 keyframe interval (GOP length) in frames
    #[arg(short = 'k', long = "keyint", value_name = "FRAMES")]
    pub keyint: Option<u32>,

    /// DASH segment duration in milliseconds
    #[arg(short = 'd', long = "dash", value_name = "MS")]
    pub dash: Option<u32>,

    /// Profile: onDemand, live, main, simple, full, dashavc264:live, dashavc264:onDemand
    #[arg(short = 'p', long = "profile", value_name = "PROFILE")]
    pub profile: Option<String>,

    /// Output manifest (MPD) file name
    #[arg(short = 'o', long = "out", value_name = "MPD")]
    pub out: Option<String>,

    /// Segment name template; $RepresentationID$, $Number$, $Bandwidth$ and
    /// $Time$ are expanded by MP4Box
    #[arg(long = "segment-name", visible_alias = "sn", value_name = "TEMPLATE")]
    pub segment_name: Option<String>,

    /// Base URL written at MPD level
    #[arg(long = "base-url", visible_alias = "bu", value_name = "URL")]
    pub base_url: Option<String>,

    /// Path to config file (default: config.toml beside the executable)
    #[arg(short = 'c', long = "config", value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Run the ffmpeg transcodes before packaging
    #[arg(long)]
    pub transcode: bool,

    /// Print the commands without running them
    #[arg(long)]
    pub dry_run: bool,

    /// Check that ffmpeg and MP4Box are available, then exit
    #[arg(long)]
    pub check_tools: bool,

    /// Enable verbose logging
    #[arg(long)]
    pub verbose: bool,

    /// Print version
    #[arg(short = 'v', long = "version", action = ArgAction::Version)]
    pub version: Option<bool>,
}

impl Cli {
    /// The run options, unvalidated.
    pub fn raw_options(&self) -> RawOptions {
        RawOptions {
            input_dir: self.input_dir.clone(),
            input_name: self.input_name.clone(),
            scale: self.scale.clone(),
            bitrates: self.bitrates.clone(),
            keyint: self.keyint,
            dash: self.dash,
            profile: self.profile.clone(),
            out: self.out.clone(),
            segment_name: self.segment_name.clone(),
            base_url: self.base_url.clone(),
        }
    }
}

/// Rewrite an argument vector so clap understands it.
///
/// Long options are traditionally spelled with one dash (`-input-dir`,
/// `-id`, `-sn`); those become `--input-dir`, `--id`, `--sn`. Options clap
/// does not know are dropped (with their value) and returned separately so
/// newer invocations keep working against older binaries.
pub fn normalize_args(args: impl IntoIterator<Item = String>) -> (Vec<String>, Vec<String>) {
    let command = Cli::command();
    // name -> takes a value
    let mut longs: HashMap<String, bool> = HashMap::new();
    let mut shorts: HashMap<char, bool> = HashMap::new();
    longs.insert("help".into(), false);
    shorts.insert('h', false);
    for arg in command.get_arguments() {
        let takes_value = arg.get_action().takes_values();
        if let Some(long) = arg.get_long() {
            longs.insert(long.to_string(), takes_value);
        }
        for alias in arg.get_all_aliases().unwrap_or_default() {
            longs.insert(alias.to_string(), takes_value);
        }
        if let Some(short) = arg.get_short() {
            shorts.insert(short, takes_value);
        }
    }

    let mut args = args.into_iter();
    let mut kept: Vec<String> = args.next().into_iter().collect();
    let mut ignored = Vec::new();
    let mut pending_value = false;
    let mut skip_value = false;

    for token in args.by_ref() {
        if pending_value {
            kept.push(token);
            pending_value = false;
            continue;
        }
        if skip_value {
            skip_value = false;
            if !token.starts_with('-') {
                ignored.push(token);
                continue;
            }
        }
        if token == "--" {
            break;
        }

        let body = if let Some(rest) = token.strip_prefix("--") {
            Some(rest)
        } else if token.len() > 1 {
            token.strip_prefix('-')
        } else {
            None
        };

        let Some(body) = body else {
            ignored.push(token);
            continue;
        };
        let (name, inline_value) = match body.split_once('=') {
            Some((name, _)) => (name, true),
            None => (body, false),
        };

        if let Some(&takes_value) = longs.get(name) {
            pending_value = takes_value && !inline_value;
            kept.push(format!("--{body}"));
            continue;
        }

        let single_dash = !token.starts_with("--");
        let first = body.chars().next();
        if let Some(&takes_value) = first.filter(|_| single_dash).and_then(|c| shorts.get(&c)) {
            pending_value = takes_value && body.chars().count() == 1;
            kept.push(token);
            continue;
        }

        skip_value = !inline_value;
        ignored.push(token);
    }

    // Everything after `--` is positional, and this CLI takes none.
    ignored.extend(args);
    (kept, ignored)
}

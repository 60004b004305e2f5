//! Shared test harness for integration tests.
//!
//! Provides [`TestHarness`], a scratch input directory holding an empty
//! `video.mp4`, plus stand-in `ffmpeg` / `MP4Box` shell scripts that record
//! how they were called.

#![allow(dead_code)]

use std::path::{Path, PathBuf};

use dash_core::Config;
use tempfile::TempDir;

/// Ladder used by most tests, in deliberately non-lexical order.
pub const LADDER: &str = r#"
[scale]
90p = "160x90"
180p = "320x180"
360p = "640x360"

[bitrates]
90p = "200k"
180p = "500k,800k"
360p = ["1200k"]
"#;

/// Scratch directory with an input video and optional fake tools.
pub struct TestHarness {
    pub dir: TempDir,
}

impl TestHarness {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("failed to create temp dir");
        std::fs::write(dir.path().join("video.mp4"), b"not really a video")
            .expect("failed to write input");
        Self { dir }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn log_path(&self) -> PathBuf {
        self.path().join("run.log")
    }

    /// A fake MP4Box that writes one argument per line to `mp4box.args`
    /// and exits with `code`.
    #[cfg(unix)]
    pub fn fake_mp4box(&self, code: i32) -> PathBuf {
        let args = self.path().join("mp4box.args");
        self.script(
            "MP4Box",
            &format!(
                "for a in \"$@\"; do printf '%s\\n' \"$a\"; done > '{}'\necho 'DASH-ing files'\nexit {code}\n",
                args.display()
            ),
        )
    }

    /// A fake ffmpeg that creates its last argument and appends it to
    /// `ffmpeg.calls`. Exits with `code` once `fail_on` is named as output.
    #[cfg(unix)]
    pub fn fake_ffmpeg(&self, fail_on: Option<&str>) -> PathBuf {
        let calls = self.path().join("ffmpeg.calls");
        let fail = fail_on
            .map(|name| format!("case \"$last\" in *{name}) echo 'Conversion failed!' >&2; exit 1;; esac\n"))
            .unwrap_or_default();
        self.script(
            "ffmpeg",
            &format!(
                "for last in \"$@\"; do :; done\necho \"$last\" >> '{}'\n{fail}: > \"$last\"\n",
                calls.display()
            ),
        )
    }

    #[cfg(unix)]
    fn script(&self, name: &str, body: &str) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;

        let bin = self.path().join("bin");
        std::fs::create_dir_all(&bin).expect("failed to create bin dir");
        let path = bin.join(name);
        std::fs::write(&path, format!("#!/bin/sh\n{body}")).expect("failed to write script");
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755))
            .expect("failed to chmod script");
        path
    }

    /// Arguments the fake MP4Box was last called with.
    pub fn mp4box_args(&self) -> Vec<String> {
        read_lines(&self.path().join("mp4box.args"))
    }

    /// Output paths of every fake ffmpeg call, in order.
    pub fn ffmpeg_calls(&self) -> Vec<String> {
        read_lines(&self.path().join("ffmpeg.calls"))
    }

    /// Config with [`LADDER`], the given tools, and the log inside the
    /// scratch dir.
    pub fn config(&self, ffmpeg: Option<&Path>, mp4box: Option<&Path>) -> Config {
        let mut config = Config::from_toml(LADDER).expect("ladder parses");
        config.tools.ffmpeg_path = ffmpeg.map(Path::to_path_buf);
        config.tools.mp4box_path = mp4box.map(Path::to_path_buf);
        config.tools.timeout_secs = 30;
        config.run.log_path = self.log_path();
        config
    }

    /// Write a config file into the scratch dir and return its path.
    pub fn write_config(&self, extra: &str) -> PathBuf {
        let path = self.path().join("config.toml");
        std::fs::write(&path, format!("{LADDER}\n{extra}")).expect("failed to write config");
        path
    }
}

fn read_lines(path: &Path) -> Vec<String> {
    std::fs::read_to_string(path)
        .map(|s| s.lines().map(str::to_string).collect())
        .unwrap_or_default()
}

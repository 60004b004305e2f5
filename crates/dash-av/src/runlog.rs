//! Append-only log that receives the output of every tool invocation.

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

/// The run log.
///
/// The file is created lazily on the first invocation, so runs that fail
/// validation leave nothing behind.
#[derive(Debug, Clone)]
pub struct RunLog {
    path: PathBuf,
}

impl RunLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write a header line for `command` and hand back two append handles
    /// (for the child's stdout and stderr) plus the offset where the child's
    /// output starts.
    pub(crate) fn begin(&self, command: &str) -> std::io::Result<(File, File, u64)> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(file, "$ {command}")?;
        file.flush()?;
        let start = file.metadata()?.len();
        let stderr = file.try_clone()?;
        Ok((file, stderr, start))
    }

    /// Everything appended since `offset`, as lossy UTF-8.
    pub(crate) fn read_from(&self, offset: u64) -> std::io::Result<String> {
        let mut file = File::open(&self.path)?;
        file.seek(SeekFrom::Start(offset))?;
        let mut buf = Vec::new();
        file.read_to_end(&mut buf)?;
        Ok(String::from_utf8_lossy(&buf).into_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn begin_creates_parent_dirs_and_header() {
        let dir = tempfile::tempdir().unwrap();
        let log = RunLog::new(dir.path().join("logs/nested/run.log"));
        let (mut out, _err, start) = log.begin("ffmpeg -i in.mp4").unwrap();
        writeln!(out, "frame=1").unwrap();

        let all = std::fs::read_to_string(log.path()).unwrap();
        assert!(all.starts_with("$ ffmpeg -i in.mp4\n"));
        assert_eq!(log.read_from(start).unwrap(), "frame=1\n");
    }

    #[test]
    fn begin_appends_to_existing_log() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.log");
        std::fs::write(&path, "previous run\n").unwrap();
        let log = RunLog::new(&path);
        log.begin("MP4Box").unwrap();

        let all = std::fs::read_to_string(&path).unwrap();
        assert_eq!(all, "previous run\n$ MP4Box\n");
    }

    #[test]
    fn nothing_is_written_until_begin() {
        let dir = tempfile::tempdir().unwrap();
        let log = RunLog::new(dir.path().join("run.log"));
        assert!(!log.path().exists());
    }
}

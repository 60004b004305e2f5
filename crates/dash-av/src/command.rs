//! Builder for executing external tool commands with timeout and
//! cancellation support.

use std::fmt;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use tokio::process::Command;
use tokio_util::sync::CancellationToken;

use crate::runlog::RunLog;

/// Default command timeout: 24 hours.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(86_400);

/// Result of one tool execution.
#[derive(Debug, Clone)]
pub struct ToolOutput {
    /// Name of the tool that ran.
    pub tool: String,
    /// Process exit status.
    pub status: ExitStatus,
    /// Combined stdout and stderr as appended to the run log (lossy UTF-8).
    pub output: String,
}

impl ToolOutput {
    pub fn success(&self) -> bool {
        self.status.success()
    }

    /// Turn a non-zero exit into [`dash_core::Error::ExternalProcess`].
    pub fn into_result(self) -> dash_core::Result<Self> {
        if self.success() {
            Ok(self)
        } else {
            Err(dash_core::Error::external_process(
                self.tool,
                self.status,
                self.output,
            ))
        }
    }
}

/// An external tool invocation: a program and its argument tokens.
///
/// Arguments are handed to the OS as-is, never through a shell, so paths and
/// naming templates containing `$`, spaces or quotes reach the tool verbatim.
///
/// # Example
///
/// ```no_run
/// use dash_av::{RunLog, ToolCommand};
/// use std::path::PathBuf;
///
/// # async fn example() -> dash_core::Result<()> {
/// let log = RunLog::new("run.log");
/// let output = ToolCommand::new(PathBuf::from("MP4Box"))
///     .arg("-dash").arg("2000")
///     .arg("-out").arg("stream.mpd")
///     .arg("video_500k.mp4")
///     .execute(&log)
///     .await?;
/// println!("{}", output.output);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct ToolCommand {
    program: PathBuf,
    args: Vec<String>,
    timeout: Duration,
    cancel: Option<CancellationToken>,
    /// First path argument that was not valid UTF-8; refuses execution.
    non_utf8_path: Option<PathBuf>,
}

enum Wait {
    Exited(std::io::Result<ExitStatus>),
    TimedOut,
    Cancelled,
}

impl ToolCommand {
    /// Create a new command for the given program path.
    pub fn new(program: PathBuf) -> Self {
        Self {
            program,
            args: Vec::new(),
            timeout: DEFAULT_TIMEOUT,
            cancel: None,
            non_utf8_path: None,
        }
    }

    /// Append a single argument.
    pub fn arg(&mut self, s: impl Into<String>) -> &mut Self {
        self.args.push(s.into());
        self
    }

    /// Append multiple arguments.
    pub fn args(&mut self, iter: impl IntoIterator<Item = impl Into<String>>) -> &mut Self {
        self.args.extend(iter.into_iter().map(Into::into));
        self
    }

    /// Append a path argument.
    ///
    /// A path that is not valid UTF-8 is recorded and makes
    /// [`execute`](Self::execute) fail instead of handing the tool a
    /// mangled path.
    pub fn path_arg(&mut self, path: &Path) -> &mut Self {
        if path.to_str().is_none() && self.non_utf8_path.is_none() {
            self.non_utf8_path = Some(path.to_path_buf());
        }
        self.arg(path.to_string_lossy())
    }

    /// Set the maximum execution time.
    pub fn timeout(&mut self, d: Duration) -> &mut Self {
        self.timeout = d;
        self
    }

    /// Kill the process when `token` is cancelled.
    pub fn cancel_on(&mut self, token: CancellationToken) -> &mut Self {
        self.cancel = Some(token);
        self
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    /// Argument tokens, excluding the program.
    pub fn arg_list(&self) -> &[String] {
        &self.args
    }

    /// Short tool name (file name of the program).
    pub fn tool_name(&self) -> String {
        self.program
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| self.program.to_string_lossy().to_string())
    }

    /// Run the command to completion, appending its combined stdout and
    /// stderr to `log`.
    ///
    /// A non-zero exit is *not* an error here; inspect
    /// [`ToolOutput::success`] or call [`ToolOutput::into_result`].
    ///
    /// # Errors
    ///
    /// - [`dash_core::Error::InvalidArgument`] if a path argument is not UTF-8.
    /// - [`dash_core::Error::ToolNotFound`] if the program cannot be spawned.
    /// - [`dash_core::Error::Timeout`] if the process outlives the timeout.
    /// - [`dash_core::Error::Cancelled`] if the cancel token fires first.
    /// - [`dash_core::Error::Io`] if the log cannot be written or read back.
    pub async fn execute(&self, log: &RunLog) -> dash_core::Result<ToolOutput> {
        let tool = self.tool_name();
        if let Some(ref path) = self.non_utf8_path {
            return Err(dash_core::Error::invalid_argument(format!(
                "{tool}: path is not valid UTF-8: {}",
                path.display()
            )));
        }
        let (stdout, stderr, start) = log.begin(&self.to_string())?;

        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::from(stdout))
            .stderr(Stdio::from(stderr))
            .kill_on_drop(true);

        tracing::debug!("spawning {self}");
        let mut child = cmd.spawn().map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                dash_core::Error::ToolNotFound {
                    tool: self.program.to_string_lossy().to_string(),
                }
            } else {
                dash_core::Error::from(e)
            }
        })?;

        let cancelled = async {
            match &self.cancel {
                Some(token) => token.cancelled().await,
                None => std::future::pending().await,
            }
        };

        let waited = tokio::select! {
            res = child.wait() => Wait::Exited(res),
            _ = tokio::time::sleep(self.timeout) => Wait::TimedOut,
            _ = cancelled => Wait::Cancelled,
        };

        let status = match waited {
            Wait::Exited(res) => res?,
            Wait::TimedOut => {
                tracing::warn!("{tool} exceeded {:?}; killing", self.timeout);
                if let Err(e) = child.kill().await {
                    tracing::warn!("failed to kill {tool}: {e}");
                }
                return Err(dash_core::Error::Timeout {
                    tool,
                    after: self.timeout,
                });
            }
            Wait::Cancelled => {
                tracing::warn!("{tool} cancelled; killing");
                if let Err(e) = child.kill().await {
                    tracing::warn!("failed to kill {tool}: {e}");
                }
                return Err(dash_core::Error::Cancelled { tool });
            }
        };

        let output = log.read_from(start)?;
        if status.success() {
            tracing::debug!("{tool} finished: {status}");
        } else {
            tracing::warn!("{tool} failed: {status}");
        }

        Ok(ToolOutput {
            tool,
            status,
            output,
        })
    }
}

impl fmt::Display for ToolCommand {
    /// Render for logs. Tokens with whitespace or quotes are single-quoted;
    /// this is a readable rendering, not something that is ever executed.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program.display())?;
        for arg in &self.args {
            if arg.is_empty() || arg.contains(|c: char| c.is_whitespace() || c == '\'' || c == '"')
            {
                write!(f, " '{}'", arg.replace('\'', r"'\''"))?;
            } else {
                write!(f, " {arg}")?;
            }
        }
        Ok(())
    }
}

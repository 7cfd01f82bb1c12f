//! adb process invocation.
//!
//! Operations describe what to run as an [`Invocation`]; an [`Invoker`]
//! runs it and hands back the captured output. [`AdbProcess`] spawns the
//! real executable, tests substitute their own invoker.

use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use listing::output::{self, Outcome};
use tracing::{error, trace, warn};

use crate::error::{BridgeError, Result};

/// Interval between exit checks while a deadline is pending.
const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// One adb command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    /// Arguments passed to adb, without the executable.
    pub args: Vec<String>,
    /// Kill the process if it runs longer than this.
    pub timeout: Option<Duration>,
}

impl Invocation {
    /// Creates an invocation without a deadline.
    pub fn new<I, S>(args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            args: args.into_iter().map(Into::into).collect(),
            timeout: None,
        }
    }

    /// Sets the deadline.
    pub fn timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Output captured from a finished adb process.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Standard output, decoded lossily as UTF-8.
    pub stdout: String,
    /// Standard error, decoded lossily as UTF-8.
    pub stderr: String,
    /// Exit code, `None` when killed by a signal.
    pub status: Option<i32>,
}

impl CommandOutput {
    /// Output with only standard output set and a zero exit code.
    pub fn from_stdout(stdout: impl Into<String>) -> Self {
        Self {
            stdout: stdout.into(),
            stderr: String::new(),
            status: Some(0),
        }
    }

    /// Standard output followed by standard error.
    pub fn combined(&self) -> String {
        let mut text = String::with_capacity(self.stdout.len() + self.stderr.len());
        text.push_str(&self.stdout);
        text.push_str(&self.stderr);
        text
    }

    /// Classifies the combined output.
    pub fn outcome(&self) -> Outcome {
        output::classify(&self.combined())
    }

    /// Transfer summary line of the combined output.
    pub fn second_to_last_line(&self) -> String {
        output::second_to_last_line(&self.combined()).to_string()
    }
}

/// Runs adb command lines.
pub trait Invoker: Send + Sync {
    /// Checks that adb can be run at all.
    fn ready(&self) -> Result<()>;

    /// Runs one command line to completion and captures its output.
    fn invoke(&self, invocation: &Invocation) -> Result<CommandOutput>;
}

/// The adb executable on the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdbProcess {
    executable: PathBuf,
}

/// File name of the adb executable on this platform.
pub fn adb_file_name() -> String {
    format!("adb{}", std::env::consts::EXE_SUFFIX)
}

impl AdbProcess {
    /// Points at the adb executable inside `dir`.
    ///
    /// An empty `dir` leaves the executable unset; the bridge then reports
    /// itself unavailable instead of guessing a location.
    pub fn new(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        let executable = if dir.as_os_str().is_empty() {
            PathBuf::new()
        } else {
            dir.join(adb_file_name())
        };
        if !executable.is_file() {
            error!("adb does not exist in path: {}", dir.display());
        }
        Self { executable }
    }

    /// Full path of the executable.
    pub fn executable(&self) -> &Path {
        &self.executable
    }
}

impl Invoker for AdbProcess {
    fn ready(&self) -> Result<()> {
        if self.executable.as_os_str().is_empty() {
            error!("adb path is empty");
            return Err(BridgeError::Unavailable("adb path is empty".to_string()));
        }
        if !self.executable.is_file() {
            error!("adb is not installed at {}", self.executable.display());
            return Err(BridgeError::Unavailable(format!(
                "adb does not exist at {}",
                self.executable.display()
            )));
        }
        Ok(())
    }

    fn invoke(&self, invocation: &Invocation) -> Result<CommandOutput> {
        trace!(args = ?invocation.args, "running adb");

        let mut child = Command::new(&self.executable)
            .args(&invocation.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                error!("failed to launch {}: {}", self.executable.display(), e);
                BridgeError::Spawn(e)
            })?;

        let stdout = drain(child.stdout.take());
        let stderr = drain(child.stderr.take());

        let status = match invocation.timeout {
            Some(limit) => wait_with_deadline(&mut child, limit)?,
            None => child.wait()?,
        };

        Ok(CommandOutput {
            stdout: collect(stdout)?,
            stderr: collect(stderr)?,
            status: status.code(),
        })
    }
}

/// Reads a pipe to the end on its own thread so neither pipe can fill up
/// and stall the child.
fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> JoinHandle<std::io::Result<Vec<u8>>> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        if let Some(mut pipe) = pipe {
            pipe.read_to_end(&mut buf)?;
        }
        Ok(buf)
    })
}

fn collect(handle: JoinHandle<std::io::Result<Vec<u8>>>) -> Result<String> {
    let bytes = handle
        .join()
        .map_err(|_| BridgeError::Io(std::io::Error::other("output reader panicked")))??;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

fn wait_with_deadline(child: &mut Child, limit: Duration) -> Result<ExitStatus> {
    let deadline = Instant::now() + limit;
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(status);
        }
        if Instant::now() >= deadline {
            warn!(pid = child.id(), "adb exceeded {:?}, killing it", limit);
            if let Err(e) = child.kill() {
                warn!("failed to kill adb: {}", e);
            }
            let _ = child.wait();
            return Err(BridgeError::Timeout(limit));
        }
        thread::sleep(POLL_INTERVAL);
    }
}

/// Quotes a value for the device shell.
///
/// Embedded single quotes are closed, escaped and reopened, so any path
/// survives as one word.
pub fn shell_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', r"'\''"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_invocation_builder() {
        let invocation = Invocation::new(["devices", "-l"]).timeout(Some(Duration::from_secs(5)));
        assert_eq!(invocation.args, vec!["devices", "-l"]);
        assert_eq!(invocation.timeout, Some(Duration::from_secs(5)));
    }

    #[test]
    fn test_combined_output() {
        let output = CommandOutput {
            stdout: "out\n".to_string(),
            stderr: "err\n".to_string(),
            status: Some(1),
        };
        assert_eq!(output.combined(), "out\nerr\n");
        assert_eq!(CommandOutput::from_stdout("x").combined(), "x");
    }

    #[test]
    fn test_outcome_reads_both_streams() {
        let output = CommandOutput {
            stdout: String::new(),
            stderr: "error: device 'A' not found\n".to_string(),
            status: Some(1),
        };
        assert_eq!(output.outcome(), Outcome::DeviceNotFound);
        assert!(CommandOutput::from_stdout("a\nb\n").outcome().is_success());
    }

    #[test]
    fn test_second_to_last_line() {
        let output = CommandOutput::from_stdout("/sdcard/a.jpg: 1 file pulled.\n");
        assert_eq!(output.second_to_last_line(), "/sdcard/a.jpg: 1 file pulled.");
        assert_eq!(CommandOutput::default().second_to_last_line(), "");
    }

    #[test]
    fn test_shell_quote() {
        assert_eq!(shell_quote("/sdcard/DCIM"), "'/sdcard/DCIM'");
        assert_eq!(shell_quote("My Photos"), "'My Photos'");
        assert_eq!(shell_quote("it's"), r"'it'\''s'");
        assert_eq!(shell_quote(""), "''");
    }

    #[test]
    fn test_empty_dir_is_not_ready() {
        let process = AdbProcess::new("");
        assert!(process.executable().as_os_str().is_empty());
        assert!(matches!(process.ready(), Err(BridgeError::Unavailable(_))));
    }

    #[test]
    fn test_missing_executable_is_not_ready() {
        let temp_dir = TempDir::new().unwrap();
        let process = AdbProcess::new(temp_dir.path());
        assert_eq!(process.executable(), temp_dir.path().join(adb_file_name()));
        assert!(matches!(process.ready(), Err(BridgeError::Unavailable(_))));
    }

    #[test]
    fn test_nonexistent_dir_is_not_ready() {
        let process = AdbProcess::new("/nopath/adb");
        assert!(process.ready().is_err());
    }
}

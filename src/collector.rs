//! Sources of raw gocov JSON.
//!
//! A [`Collector`] abstracts over how a coverage document is obtained: by
//! running `gocov test` or by reading a document saved earlier.
use std::io::{self, Read};
use std::path::PathBuf;
use std::process::{Command, Output, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use log::{debug, info};

use crate::error::{Result, ViewerError};

const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Produces one gocov JSON document per call.
pub trait Collector {
    fn collect(&self) -> Result<Vec<u8>>;
}

impl<C: Collector + ?Sized> Collector for Box<C> {
    fn collect(&self) -> Result<Vec<u8>> {
        (**self).collect()
    }
}

/// Runs `gocov test [target]`.
pub struct GocovCommand {
    pub program: PathBuf,
    /// Package pattern passed through to `gocov test`.
    pub target: Option<String>,
    /// Kill the collector if it runs longer than this.
    pub timeout: Option<Duration>,
}

impl GocovCommand {
    pub fn new(program: PathBuf) -> Self {
        Self {
            program,
            target: None,
            timeout: None,
        }
    }

    fn command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.arg("test");
        if let Some(target) = &self.target {
            cmd.arg(target);
        }
        cmd
    }
}

impl Collector for GocovCommand {
    fn collect(&self) -> Result<Vec<u8>> {
        info!(
            "Running {} test {}",
            self.program.display(),
            self.target.as_deref().unwrap_or("")
        );
        let started = Instant::now();

        let output = match self.timeout {
            Some(timeout) => run_with_deadline(self.command(), timeout)?,
            None => self.command().output().map_err(spawn_error)?,
        };
        debug!("gocov finished in {:?} ({})", started.elapsed(), output.status);

        if !output.status.success() {
            return Err(ViewerError::Collection {
                message: output.status.to_string(),
                detail: stderr_detail(&output.stderr),
            });
        }
        Ok(output.stdout)
    }
}

/// Reads a gocov JSON document from disk.
pub struct JsonFile {
    pub path: PathBuf,
}

impl Collector for JsonFile {
    fn collect(&self) -> Result<Vec<u8>> {
        debug!("Reading gocov output from {}", self.path.display());
        Ok(std::fs::read(&self.path)?)
    }
}

fn spawn_error(err: io::Error) -> ViewerError {
    if err.kind() == io::ErrorKind::NotFound {
        ViewerError::ToolNotFound
    } else {
        ViewerError::Collection {
            message: err.to_string(),
            detail: None,
        }
    }
}

fn stderr_detail(stderr: &[u8]) -> Option<String> {
    if stderr.is_empty() {
        None
    } else {
        Some(String::from_utf8_lossy(stderr).into_owned())
    }
}

fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> thread::JoinHandle<Vec<u8>> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        if let Some(mut pipe) = pipe {
            let _ = pipe.read_to_end(&mut buf);
        }
        buf
    })
}

/// Like `Command::output`, but kills the child once `timeout` has passed.
fn run_with_deadline(mut cmd: Command, timeout: Duration) -> Result<Output> {
    let mut child = cmd
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(spawn_error)?;

    // Both pipes are drained concurrently so a chatty child can't block on a
    // full pipe while we wait for it.
    let stdout = drain(child.stdout.take());
    let stderr = drain(child.stderr.take());

    let deadline = Instant::now() + timeout;
    let status = loop {
        if let Some(status) = child.try_wait()? {
            break Some(status);
        }
        if Instant::now() >= deadline {
            child.kill()?;
            child.wait()?;
            break None;
        }
        thread::sleep(POLL_INTERVAL);
    };

    let stdout = stdout.join().unwrap_or_default();
    let stderr = stderr.join().unwrap_or_default();

    match status {
        Some(status) => Ok(Output {
            status,
            stdout,
            stderr,
        }),
        None => Err(ViewerError::Collection {
            message: format!("gocov test did not finish within {}s", timeout.as_secs()),
            detail: stderr_detail(&stderr),
        }),
    }
}

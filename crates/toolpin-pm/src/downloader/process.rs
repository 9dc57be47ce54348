//! External downloader programs (curl, wget).

use std::ffi::OsString;
use std::process::Stdio;

use tokio::io::AsyncReadExt;
use tokio::process::{Child, ChildStderr, ChildStdout, Command};
use tokio::task::JoinHandle;

use super::progress::{strip_progress_bar, ProgressCallback, ProgressFilter, ProgressParser};
use super::DownloadError;
use crate::error::{stderr_or_placeholder, ExitReason};

const READ_BUFFER_SIZE: usize = 64 * 1024;

/// Program and leading arguments; the URL is appended last
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: OsString,
    pub args: Vec<OsString>,
}

impl CommandSpec {
    pub fn new<P, I, A>(program: P, args: I) -> Self
    where
        P: Into<OsString>,
        I: IntoIterator<Item = A>,
        A: Into<OsString>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    /// `curl -#fL <url>`: progress bar on stderr, fail on HTTP errors, follow redirects
    pub fn curl() -> Self {
        Self::new("curl", ["-#fL"])
    }

    /// `wget -O - <url>`: body on stdout
    pub fn wget() -> Self {
        Self::new("wget", ["-O", "-"])
    }
}

/// A running downloader process streaming the body on stdout
pub(crate) struct ProcessDownload {
    backend: &'static str,
    child: Child,
    stdout: Option<ChildStdout>,
    stderr_task: Option<JoinHandle<String>>,
    buffer: Vec<u8>,
    finished: bool,
}

impl ProcessDownload {
    /// Spawn the program. Spawn errors are returned untouched so the caller
    /// can tell a missing program apart from other failures.
    pub(crate) fn spawn(
        backend: &'static str,
        command: &CommandSpec,
        url: &str,
        on_progress: ProgressCallback,
    ) -> std::io::Result<Self> {
        let mut child = Command::new(&command.program)
            .args(&command.args)
            .arg(url)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        let stdout = child.stdout.take();
        let stderr_task = child
            .stderr
            .take()
            .map(|stderr| tokio::spawn(read_stderr(stderr, on_progress)));

        Ok(Self {
            backend,
            child,
            stdout,
            stderr_task,
            buffer: vec![0; READ_BUFFER_SIZE],
            finished: false,
        })
    }

    pub(crate) fn backend(&self) -> &'static str {
        self.backend
    }

    pub(crate) async fn next_chunk(&mut self) -> Result<Option<Vec<u8>>, DownloadError> {
        if self.finished {
            return Ok(None);
        }

        let Some(stdout) = self.stdout.as_mut() else {
            return self.finish().await.map(|()| None);
        };

        let read = stdout.read(&mut self.buffer).await;
        match read {
            Ok(0) => {
                self.stdout = None;
                self.finish().await.map(|()| None)
            }
            Ok(n) => Ok(Some(self.buffer[..n].to_vec())),
            Err(source) => {
                self.kill();
                Err(DownloadError::Io {
                    backend: self.backend,
                    source,
                })
            }
        }
    }

    /// Wait for the process and turn a failed exit into an error
    async fn finish(&mut self) -> Result<(), DownloadError> {
        self.finished = true;

        let stderr_task = self.stderr_task.take();
        let (status, stderr) = tokio::join!(self.child.wait(), collect_stderr(stderr_task));

        let status = status.map_err(|source| DownloadError::Io {
            backend: self.backend,
            source,
        })?;

        if status.success() {
            log::debug!("{} finished", self.backend);
            Ok(())
        } else {
            Err(DownloadError::ProcessExit {
                backend: self.backend,
                reason: ExitReason::from(status),
                stderr: stderr_or_placeholder(strip_progress_bar(&stderr)),
            })
        }
    }

    pub(crate) fn kill(&mut self) {
        if self.finished && self.stdout.is_none() {
            return;
        }
        self.finished = true;
        self.stdout = None;
        // Fails only when the process already exited.
        let _ = self.child.start_kill();
    }
}

async fn read_stderr(mut stderr: ChildStderr, on_progress: ProgressCallback) -> String {
    let mut parser = ProgressParser::new();
    let mut filter = ProgressFilter::new(on_progress);
    let mut buffer = [0u8; 4096];

    loop {
        match stderr.read(&mut buffer).await {
            Ok(0) | Err(_) => break,
            Ok(n) => {
                if let Some(fraction) = parser.push(&String::from_utf8_lossy(&buffer[..n])) {
                    filter.report(fraction);
                }
            }
        }
    }

    parser.into_text()
}

async fn collect_stderr(task: Option<JoinHandle<String>>) -> String {
    match task {
        Some(task) => task.await.unwrap_or_default(),
        None => String::new(),
    }
}

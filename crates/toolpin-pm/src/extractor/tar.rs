use std::ffi::OsStr;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::process::{Child, ChildStderr, ChildStdin, Command};
use tokio::task::JoinHandle;

use super::{split_target, ExtractError};
use crate::error::{stderr_or_placeholder, ExitReason};

/// Pipes a gzipped tarball into `tar zxf -`, extracting one named entry
pub(crate) struct TarExtractor {
    program: String,
    target: PathBuf,
    child: Child,
    stdin: Option<ChildStdin>,
    stderr_task: Option<JoinHandle<String>>,
    finished: bool,
}

impl TarExtractor {
    pub(crate) fn spawn(program: &OsStr, target: &Path) -> Result<Self, ExtractError> {
        let name = program.to_string_lossy().to_string();
        let (dir, entry) = split_target(target);

        let mut child = Command::new(program)
            .arg("zxf")
            .arg("-")
            .arg("-C")
            .arg(&dir)
            .arg(&entry)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| {
                if source.kind() == ErrorKind::NotFound {
                    ExtractError::ArchiverMissing {
                        program: name.clone(),
                        source,
                    }
                } else {
                    ExtractError::ArchiverSpawn {
                        program: name.clone(),
                        source,
                    }
                }
            })?;

        log::debug!("Extracting {} into {} with {}", entry, dir.display(), name);

        let stdin = child.stdin.take();
        let stderr_task = child.stderr.take().map(|stderr| tokio::spawn(read_all(stderr)));

        Ok(Self {
            program: name,
            target: target.to_path_buf(),
            child,
            stdin,
            stderr_task,
            finished: false,
        })
    }

    pub(crate) async fn write(&mut self, chunk: &[u8]) -> Result<(), ExtractError> {
        let Some(stdin) = self.stdin.as_mut() else {
            return Ok(());
        };

        if let Err(source) = stdin.write_all(chunk).await {
            // tar stopped reading; its exit status explains why.
            self.stdin = None;
            return match self.wait().await {
                Err(exit) => Err(exit),
                Ok(()) => Err(ExtractError::Io {
                    path: self.target.clone(),
                    source,
                }),
            };
        }

        Ok(())
    }

    pub(crate) async fn end(&mut self) -> Result<(), ExtractError> {
        if self.finished {
            return Ok(());
        }

        if let Some(mut stdin) = self.stdin.take() {
            // A failed flush means tar already exited; wait() reports it.
            let _ = stdin.shutdown().await;
        }
        self.wait().await
    }

    async fn wait(&mut self) -> Result<(), ExtractError> {
        self.finished = true;

        let stderr_task = self.stderr_task.take();
        let (status, stderr) = tokio::join!(self.child.wait(), async {
            match stderr_task {
                Some(task) => task.await.unwrap_or_default(),
                None => String::new(),
            }
        });

        let status = status.map_err(|source| ExtractError::Io {
            path: self.target.clone(),
            source,
        })?;

        if status.success() {
            Ok(())
        } else {
            Err(ExtractError::ArchiverExit {
                program: self.program.clone(),
                reason: ExitReason::from(status),
                stderr: stderr_or_placeholder(&stderr),
            })
        }
    }

    pub(crate) async fn destroy(&mut self) {
        self.stdin = None;
        if !self.finished {
            self.finished = true;
            // Fails only when tar already exited.
            let _ = self.child.start_kill();
            let _ = self.child.wait().await;
        }
    }
}

async fn read_all(mut stderr: ChildStderr) -> String {
    let mut buffer = Vec::new();
    let _ = stderr.read_to_end(&mut buffer).await;
    String::from_utf8_lossy(&buffer).to_string()
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::ffi::OsString;
    use tempfile::TempDir;

    fn tarball(name: &str, data: &[u8]) -> Vec<u8> {
        let encoder = GzEncoder::new(Vec::new(), Compression::default());
        let mut builder = ::tar::Builder::new(encoder);

        let mut header = ::tar::Header::new_gnu();
        header.set_size(data.len() as u64);
        header.set_mode(0o755);
        header.set_cksum();
        builder.append_data(&mut header, name, data).unwrap();

        builder.into_inner().unwrap().finish().unwrap()
    }

    #[tokio::test]
    async fn test_extracts_named_entry() {
        let temp_dir = TempDir::new().unwrap();
        let target = temp_dir.path().join("tool");
        let archive = tarball("tool", b"#!/bin/sh\necho tgz\n");

        let mut extractor = TarExtractor::spawn(OsStr::new("tar"), &target).unwrap();
        for chunk in archive.chunks(64) {
            extractor.write(chunk).await.unwrap();
        }
        extractor.end().await.unwrap();

        assert_eq!(std::fs::read(&target).unwrap(), b"#!/bin/sh\necho tgz\n");

        use std::os::unix::fs::PermissionsExt;
        let mode = std::fs::metadata(&target).unwrap().permissions().mode();
        assert_eq!(mode & 0o111, 0o111);
    }

    #[tokio::test]
    async fn test_missing_entry_reports_tar_exit() {
        let temp_dir = TempDir::new().unwrap();
        let target = temp_dir.path().join("tool");
        let archive = tarball("something-else", b"data");

        let mut extractor = TarExtractor::spawn(OsStr::new("tar"), &target).unwrap();
        let mut result = Ok(());
        for chunk in archive.chunks(64) {
            result = extractor.write(chunk).await;
            if result.is_err() {
                break;
            }
        }
        if result.is_ok() {
            result = extractor.end().await;
        }

        match result {
            Err(ExtractError::ArchiverExit { program, stderr, .. }) => {
                assert_eq!(program, "tar");
                assert!(!stderr.is_empty());
            }
            other => panic!("Expected ArchiverExit, got {:?}", other),
        }
        assert!(!target.exists());
    }

    #[tokio::test]
    async fn test_missing_program() {
        let temp_dir = TempDir::new().unwrap();
        let target = temp_dir.path().join("tool");
        let program = OsString::from("toolpin-test-no-such-tar");

        match TarExtractor::spawn(&program, &target) {
            Err(ExtractError::ArchiverMissing { program, .. }) => {
                assert_eq!(program, "toolpin-test-no-such-tar");
            }
            Err(other) => panic!("Expected ArchiverMissing, got {:?}", other),
            Ok(_) => panic!("Expected ArchiverMissing, got a running extractor"),
        }
    }

    #[tokio::test]
    async fn test_destroy_is_idempotent() {
        let temp_dir = TempDir::new().unwrap();
        let target = temp_dir.path().join("tool");

        let mut extractor = TarExtractor::spawn(OsStr::new("tar"), &target).unwrap();
        extractor.destroy().await;
        extractor.destroy().await;
        assert!(extractor.end().await.is_ok());
    }
}

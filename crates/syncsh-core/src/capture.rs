//! Running the recipe's shell, with or without output capture.
//!
//! Captured output goes to two anonymous temporary files, one per stream.
//! Only the child's descriptors are redirected: the files are handed to
//! `std::process::Command` as the child's stdout and stderr, so the
//! parent's own descriptors never change and nothing is written through
//! them between process creation and the child's exec.

use std::{
    ffi::OsStr,
    fs::File,
    io::{self, Seek, SeekFrom, Write},
    path::Path,
    process::{Child, Command, Stdio},
};

use crate::{status::ChildStatus, Error, Result};

/// Holding storage for one child's output streams.
#[derive(Debug)]
pub struct CapturedOutput {
    pub stdout: File,
    pub stderr: File,
}

impl CapturedOutput {
    /// Create two empty, already unlinked temporary files.
    pub fn new() -> Result<Self> {
        Ok(Self {
            stdout: tempfile::tempfile().map_err(Error::CaptureStorage)?,
            stderr: tempfile::tempfile().map_err(Error::CaptureStorage)?,
        })
    }

    /// Seek both streams back to the start for replay.
    pub fn rewind(&mut self) -> Result<()> {
        for file in [&mut self.stdout, &mut self.stderr] {
            file.seek(SeekFrom::Start(0))
                .map_err(|source| Error::Descriptor {
                    action: "rewind capture storage",
                    source,
                })?;
        }
        Ok(())
    }

    /// Total captured bytes across both streams.
    pub fn len(&self) -> Result<u64> {
        let size = |file: &File| {
            file.metadata()
                .map(|meta| meta.len())
                .map_err(|source| Error::Descriptor {
                    action: "inspect capture storage",
                    source,
                })
        };
        Ok(size(&self.stdout)? + size(&self.stderr)?)
    }

    pub fn is_empty(&self) -> Result<bool> {
        self.len().map(|len| len == 0)
    }

    fn child_stdio(&self) -> Result<(Stdio, Stdio)> {
        let dup = |file: &File| {
            file.try_clone()
                .map(Stdio::from)
                .map_err(|source| Error::Descriptor {
                    action: "duplicate capture descriptor",
                    source,
                })
        };
        Ok((dup(&self.stdout)?, dup(&self.stderr)?))
    }
}

/// `shell flag recipe`, the one command a synchronized invocation runs.
#[derive(Debug, Clone, Copy)]
pub struct ShellCommand<'a> {
    shell: &'a Path,
    flag: &'a OsStr,
    recipe: &'a OsStr,
}

impl<'a> ShellCommand<'a> {
    pub const fn new(shell: &'a Path, flag: &'a OsStr, recipe: &'a OsStr) -> Self {
        Self {
            shell,
            flag,
            recipe,
        }
    }

    pub const fn recipe(&self) -> &'a OsStr {
        self.recipe
    }

    /// Run with stdout and stderr diverted into fresh capture storage.
    ///
    /// Returns after the child has exited, with both streams rewound.
    pub fn run_captured(&self) -> Result<(ChildStatus, CapturedOutput)> {
        let mut captured = CapturedOutput::new()?;
        let (stdout, stderr) = captured.child_stdio()?;

        let mut command = self.command();
        command.stdout(stdout).stderr(stderr);
        let status = self.wait(self.spawn(&mut command)?)?;
        drop(command);

        captured.rewind()?;
        tracing::debug!(
            code = status.exit_code(),
            bytes = captured.len()?,
            "captured child finished"
        );
        Ok((status, captured))
    }

    /// Run with the real stdout and stderr inherited, streaming live.
    pub fn run_live(&self) -> Result<ChildStatus> {
        let mut command = self.command();
        command.stdout(Stdio::inherit()).stderr(Stdio::inherit());
        let status = self.wait(self.spawn(&mut command)?)?;
        tracing::debug!(code = status.exit_code(), "live child finished");
        Ok(status)
    }

    fn command(&self) -> Command {
        let mut command = Command::new(self.shell);
        command
            .arg(self.flag)
            .arg(self.recipe)
            .stdin(Stdio::inherit());
        command
    }

    fn spawn(&self, command: &mut Command) -> Result<Child> {
        // Anything we buffered must land before the child's first byte.
        if let Err(err) = io::stdout().flush() {
            tracing::warn!("failed to flush stdout before spawn: {err}");
        }
        command.spawn().map_err(|source| Error::Exec {
            shell: self.shell.to_path_buf(),
            source,
        })
    }

    fn wait(&self, mut child: Child) -> Result<ChildStatus> {
        child
            .wait()
            .map(ChildStatus::from)
            .map_err(|source| Error::Wait {
                shell: self.shell.to_path_buf(),
                source,
            })
    }
}

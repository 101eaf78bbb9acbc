//! Exit status normalization.
//!
//! The wrapper exits with whatever the recipe exited with, so callers cannot
//! tell it apart from running the shell directly. Code 125 is reserved for
//! failures of the wrapper itself: the shell returns 126 and 127 for recipe
//! commands that cannot be run, so those stay the job's.

use std::{os::unix::process::ExitStatusExt, process::ExitStatus};

/// The wrapper itself failed (configuration, resources, locking, spawning).
pub const EXIT_INTERNAL: i32 = 125;

/// Added to the signal number when the child was killed by a signal.
pub const SIGNAL_BASE: i32 = 128;

/// Termination status of the recipe's shell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChildStatus(ExitStatus);

impl ChildStatus {
    #[must_use]
    pub const fn new(status: ExitStatus) -> Self {
        Self(status)
    }

    #[must_use]
    pub fn success(&self) -> bool {
        self.0.success()
    }

    /// Exit code for this process: the child's own code, or `128 + signal`
    /// when it died abnormally.
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        match (self.0.code(), self.0.signal()) {
            (Some(code), _) => code & 0xff,
            (None, Some(signal)) => SIGNAL_BASE + signal,
            (None, None) => EXIT_INTERNAL,
        }
    }
}

impl From<ExitStatus> for ChildStatus {
    fn from(status: ExitStatus) -> Self {
        Self::new(status)
    }
}

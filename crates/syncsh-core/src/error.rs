//! Error types for syncsh with categorization:
//!
//! - **Configuration errors**: unusable lock target
//! - **Resource errors**: capture storage, descriptors, locks, waiting
//! - **Spawn errors**: shell missing or not executable
//!
//! All of them exit with [`EXIT_INTERNAL`]. Codes 126 and 127 belong to the
//! recipe: `sh -c` returns them for a missing or non-executable command.
//!
//! A recipe that fails is not an error of this crate; its status is
//! propagated through [`crate::status::ChildStatus`].

use std::{io, path::PathBuf};

use thiserror::Error;

use crate::status::EXIT_INTERNAL;

/// Fatal failures of the wrapper itself.
#[derive(Debug, Error)]
pub enum Error {
    /// Lock file given as a relative path
    #[error("lock file must be an absolute path, got '{}'", path.display())]
    RelativeLockPath { path: PathBuf },

    /// Lock file could not be opened for writing
    #[error("failed to open lock file {}: {source}", path.display())]
    LockOpen {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// `fcntl` lock or unlock failed
    #[error("failed to {action} {target} at offset {offset}: {source}")]
    Lock {
        action: &'static str,
        target: String,
        offset: u64,
        #[source]
        source: io::Error,
    },

    /// Anonymous temporary file for captured output could not be created
    #[error("failed to create capture storage: {0}")]
    CaptureStorage(#[source] io::Error),

    /// Descriptor duplication or rewind of capture storage failed
    #[error("failed to {action}: {source}")]
    Descriptor {
        action: &'static str,
        #[source]
        source: io::Error,
    },

    /// Configured shell could not be located on `PATH`
    #[error("shell '{}' not found: {source}", shell.display())]
    ShellNotFound {
        shell: PathBuf,
        #[source]
        source: which::Error,
    },

    /// Shell could not be spawned or exec'd
    #[error("failed to execute {}: {source}", shell.display())]
    Exec {
        shell: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Waiting for the child failed
    #[error("failed to wait for {}: {source}", shell.display())]
    Wait {
        shell: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl Error {
    /// Returns the exit code reserved for this failure.
    ///
    /// Every wrapper failure shares [`EXIT_INTERNAL`] so it can never be
    /// mistaken for a code the recipe itself produced.
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::RelativeLockPath { .. }
            | Self::LockOpen { .. }
            | Self::Lock { .. }
            | Self::CaptureStorage(_)
            | Self::Descriptor { .. }
            | Self::ShellNotFound { .. }
            | Self::Exec { .. }
            | Self::Wait { .. } => EXIT_INTERNAL,
        }
    }
}

/// Result type alias for syncsh-core operations
pub type Result<T> = std::result::Result<T, Error>;

//! Cross-process byte-range locks.
//!
//! Every cooperating instance opens the same lock target and takes an
//! exclusive `fcntl` record lock on a single byte. Distinct offsets are
//! independent semaphores sharing one file: offset 0 serializes
//! publication, other offsets serialize job classes.
//!
//! # Guarantees
//!
//! - **Process-scoped**: `fcntl` locks are owned by the process, so
//!   unrelated processes contend correctly and the kernel drops a dead
//!   holder's locks
//! - **No payload**: the lock file is opened for writing only because the
//!   kernel requires it for `F_WRLCK`; its content is never touched
//! - **Blocking**: acquisition waits indefinitely, there is no timeout
//! - **Drop-safe**: an unreleased [`LockGuard`] unlocks on drop
//!
//! POSIX drops all of a process's locks on a file as soon as *any* of its
//! descriptors for that file is closed. Callers must keep every handle on
//! the lock inode (a tee log on the same path included) open until their
//! guards are released.

use std::{
    fmt,
    fs::{File, OpenOptions},
    io,
    os::fd::AsFd,
    path::{Path, PathBuf},
};

use nix::{
    errno::Errno,
    fcntl::{fcntl, FcntlArg},
    libc,
};

use crate::{config::Config, Error, Result};

/// What the cooperating instances lock on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LockTarget {
    /// A shared file, addressed by absolute path
    File(PathBuf),
    /// This process's standard output, shared by every job the build tool
    /// writes to the same terminal, pipe or file
    Stdout,
}

impl LockTarget {
    /// Pick the lock target from the configured lock file and the already
    /// validated tee path (see [`Config::tee_path`]).
    ///
    /// Order: `SYNCSH_LOCKFILE`, then the tee log, then standard output.
    /// A relative lock file is rejected: instances running in different
    /// directories must agree on one physical file.
    pub fn resolve(config: &Config, tee: Option<&Path>) -> Result<Self> {
        if let Some(path) = &config.lock_file {
            if !path.is_absolute() {
                return Err(Error::RelativeLockPath { path: path.clone() });
            }
            return Ok(Self::File(path.clone()));
        }

        Ok(tee.map_or(Self::Stdout, |path| Self::File(path.to_path_buf())))
    }
}

impl fmt::Display for LockTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::File(path) => write!(f, "{}", path.display()),
            Self::Stdout => write!(f, "<stdout>"),
        }
    }
}

/// An open descriptor on the lock target.
#[derive(Debug)]
pub struct LockFile {
    file: File,
    target: LockTarget,
}

impl LockFile {
    /// Open the lock target without truncating or writing it.
    pub fn open(target: LockTarget) -> Result<Self> {
        let file = match &target {
            LockTarget::File(path) => OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(false)
                .open(path)
                .map_err(|source| Error::LockOpen {
                    path: path.clone(),
                    source,
                })?,
            LockTarget::Stdout => io::stdout()
                .as_fd()
                .try_clone_to_owned()
                .map(File::from)
                .map_err(|source| Error::Descriptor {
                    action: "duplicate standard output for locking",
                    source,
                })?,
        };
        Ok(Self { file, target })
    }

    pub const fn target(&self) -> &LockTarget {
        &self.target
    }

    /// Block until the byte at `offset` is exclusively ours.
    pub fn acquire(&self, offset: u64) -> Result<LockGuard<'_>> {
        tracing::debug!(lock = %self.target, offset, "acquiring lock");
        set_lock(&self.file, LockKind::Exclusive, offset).map_err(|source| Error::Lock {
            action: "lock",
            target: self.target.to_string(),
            offset,
            source,
        })?;
        tracing::debug!(lock = %self.target, offset, "lock acquired");
        Ok(LockGuard {
            lock: self,
            offset,
            released: false,
        })
    }
}

/// Scoped ownership of one locked byte.
#[derive(Debug)]
#[must_use = "the lock is released as soon as the guard is dropped"]
pub struct LockGuard<'a> {
    lock: &'a LockFile,
    offset: u64,
    released: bool,
}

impl LockGuard<'_> {
    pub const fn offset(&self) -> u64 {
        self.offset
    }

    /// Release the lock, reporting failure.
    pub fn release(mut self) -> Result<()> {
        self.released = true;
        self.unlock()
    }

    fn unlock(&self) -> Result<()> {
        set_lock(&self.lock.file, LockKind::Unlock, self.offset).map_err(|source| {
            Error::Lock {
                action: "unlock",
                target: self.lock.target.to_string(),
                offset: self.offset,
                source,
            }
        })?;
        tracing::debug!(lock = %self.lock.target, offset = self.offset, "lock released");
        Ok(())
    }
}

impl Drop for LockGuard<'_> {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        // Best-effort; process exit releases it anyway.
        if let Err(err) = self.unlock() {
            tracing::warn!("{err}");
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum LockKind {
    Exclusive,
    Unlock,
}

#[allow(clippy::cast_possible_truncation, clippy::unnecessary_cast)]
fn set_lock(file: &File, kind: LockKind, offset: u64) -> io::Result<()> {
    let l_type = match kind {
        LockKind::Exclusive => libc::F_WRLCK as libc::c_short,
        LockKind::Unlock => libc::F_UNLCK as libc::c_short,
    };
    let l_start = libc::off_t::try_from(offset)
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "lock offset out of range"))?;
    let request = libc::flock {
        l_type,
        l_whence: libc::SEEK_SET as libc::c_short,
        l_start,
        l_len: 1,
        l_pid: 0,
    };

    loop {
        match fcntl(file, FcntlArg::F_SETLKW(&request)) {
            Ok(_) => return Ok(()),
            Err(Errno::EINTR) => continue,
            Err(errno) => return Err(io::Error::from(errno)),
        }
    }
}

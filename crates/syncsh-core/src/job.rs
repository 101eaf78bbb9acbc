//! One synchronized recipe, from classification to exit status.
//!
//! ```text
//! publish-only:        spawn -> wait -> rewind -> lock(0) -> emit -> unlock
//! serialize:           lock(class) -> announce -> spawn (live) -> wait -> unlock
//! serialize with tee:  lock(class) -> spawn -> wait -> rewind
//!                        -> lock(0) -> emit -> unlock(0) -> unlock(class)
//! ```
//!
//! The lock target is opened before anything is spawned, so a bad lock
//! configuration never runs a recipe whose output would then be lost.
//! Locks are always taken class first, global second.

use std::{
    ffi::OsStr,
    io::{self, Write},
    os::unix::ffi::OsStrExt,
};

use crate::{
    capture::{CapturedOutput, ShellCommand},
    config::Config,
    emit::{Emitter, TeeSink},
    lock::{LockFile, LockTarget},
    policy::{SerializePolicy, GLOBAL_OFFSET},
    status::ChildStatus,
    Result,
};

/// A recipe invocation that needs synchronization.
#[derive(Debug, Clone, Copy)]
pub struct Job<'a> {
    config: &'a Config,
    flag: &'a OsStr,
    recipe: &'a OsStr,
}

impl<'a> Job<'a> {
    pub const fn new(config: &'a Config, flag: &'a OsStr, recipe: &'a OsStr) -> Self {
        Self {
            config,
            flag,
            recipe,
        }
    }

    pub fn policy(&self) -> SerializePolicy {
        SerializePolicy::classify(
            self.recipe.as_bytes(),
            self.config.serialize_pattern.as_deref(),
        )
    }

    /// Run the recipe and publish its output; returns the exit code.
    pub fn run(&self) -> Result<i32> {
        let policy = self.policy();
        let shell = self.config.resolve_shell()?;
        let command = ShellCommand::new(&shell, self.flag, self.recipe);

        // Declared before the tee: POSIX drops our locks when any descriptor
        // on the lock file closes, and the tee may be that file.
        let tee_path = self.config.tee_path();
        let lock = LockFile::open(LockTarget::resolve(self.config, tee_path)?)?;
        let mut tee = TeeSink::open_optional(tee_path);
        let emitter = Emitter::from_config(self.config, self.recipe.as_bytes());

        tracing::debug!(?policy, lock = %lock.target(), "running recipe");

        let status = match policy {
            SerializePolicy::PublishOnly => {
                let (status, mut captured) = command.run_captured()?;
                publish(&lock, &emitter, &mut captured, tee.as_mut())?;
                status
            }
            SerializePolicy::Serialize { offset } => {
                let class = lock.acquire(offset)?;
                let status = if tee.is_some() {
                    let (status, mut captured) = command.run_captured()?;
                    publish(&lock, &emitter, &mut captured, tee.as_mut())?;
                    status
                } else {
                    emitter.announce(&mut io::stdout().lock(), None);
                    command.run_live()?
                };
                class.release()?;
                status
            }
        };

        drop(tee);
        Ok(exit_code(status))
    }
}

/// Publish captured output under the global lock.
///
/// Nothing to say means no lock is taken.
fn publish(
    lock: &LockFile,
    emitter: &Emitter<'_>,
    captured: &mut CapturedOutput,
    tee: Option<&mut TeeSink>,
) -> Result<()> {
    if captured.is_empty()? && !emitter.has_preamble() {
        tracing::debug!("nothing to publish");
        return Ok(());
    }

    let guard = lock.acquire(GLOBAL_OFFSET)?;
    let stdout = io::stdout();
    let stderr = io::stderr();
    emitter.publish(
        captured,
        &mut stdout.lock(),
        &mut stderr.lock(),
        tee.map(|tee| tee as &mut dyn Write),
    );
    guard.release()
}

fn exit_code(status: ChildStatus) -> i32 {
    let code = status.exit_code();
    if !status.success() {
        tracing::debug!(code, "recipe failed");
    }
    code
}

//! # Syncsh Core
//!
//! Capture, classification and cross-process locking for `syncsh`, a shell
//! wrapper that lets parallel build recipes publish their output as whole,
//! non-interleaved blocks.
//!
//! ## Laws (Compiler Enforced)
//!
//! - No `unwrap()` - returns `Result` instead
//! - No `expect()` - returns `Result` instead
//! - No `panic!()` - returns `Result` instead
//! - No `unsafe` - safe Rust only
//!
//! ## Flow
//!
//! [`dispatch`] decides whether an invocation is a recipe, [`policy`]
//! classifies it, [`job`] runs it through [`capture`] and publishes with
//! [`emit`] while holding a [`lock`].

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

pub mod capture;
pub mod config;
pub mod dispatch;
pub mod emit;
mod error;
pub mod job;
pub mod lock;
pub mod policy;
pub mod status;

pub use capture::{CapturedOutput, ShellCommand};
pub use config::Config;
pub use dispatch::{exec_shell, Dispatch, Invocation, PassThroughReason};
pub use emit::{Emitter, TeeSink};
pub use error::{Error, Result};
pub use job::Job;
pub use lock::{LockFile, LockGuard, LockTarget};
pub use policy::{class_offset, SerializePolicy, GLOBAL_OFFSET};
pub use status::{ChildStatus, EXIT_INTERNAL};

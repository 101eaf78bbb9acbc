//! Syncsh - make recipe output without interleaving
//!
//! Installed as make's `SHELL`, each instance runs one recipe, buffers its
//! output and publishes it as one block under a cross-process lock.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

pub mod app;
pub mod logging;

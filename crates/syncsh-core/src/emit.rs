//! Publication of a job's output while the lock is held.
//!
//! Every write here is best-effort. A sink that fails is reported once and
//! skipped for the rest of the block; publication problems must never turn
//! a successful build step into a failed one.

use std::{
    fs::{File, OpenOptions},
    io::{self, Read, Write},
    os::unix::fs::OpenOptionsExt,
    path::Path,
};

use crate::{capture::CapturedOutput, config::Config};

const REPLAY_CHUNK: usize = 8192;

/// Append-only duplicate of everything published.
#[derive(Debug)]
pub struct TeeSink {
    file: File,
}

impl TeeSink {
    /// Open (creating if needed) the tee log for appending.
    pub fn open(path: &Path) -> io::Result<Self> {
        OpenOptions::new()
            .append(true)
            .create(true)
            .mode(0o644)
            .open(path)
            .map(|file| Self { file })
    }

    /// Open the tee log if there is one, degrading to no tee on failure.
    pub fn open_optional(path: Option<&Path>) -> Option<Self> {
        let path = path?;
        match Self::open(path) {
            Ok(tee) => Some(tee),
            Err(err) => {
                tracing::warn!("cannot open tee log {}: {err}", path.display());
                None
            }
        }
    }
}

impl Write for TeeSink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.file.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file.flush()
    }
}

/// Writes headline, verbose echo and captured output.
#[derive(Debug, Clone, Copy)]
pub struct Emitter<'a> {
    headline: Option<&'a str>,
    verbose: Option<&'a str>,
    recipe: &'a [u8],
}

impl<'a> Emitter<'a> {
    pub const fn new(headline: Option<&'a str>, verbose: Option<&'a str>, recipe: &'a [u8]) -> Self {
        Self {
            headline,
            verbose,
            recipe,
        }
    }

    pub fn from_config(config: &'a Config, recipe: &'a [u8]) -> Self {
        Self::new(config.headline.as_deref(), config.verbose.as_deref(), recipe)
    }

    /// Whether a block would contain anything besides captured output.
    pub const fn has_preamble(&self) -> bool {
        self.headline.is_some() || self.verbose.is_some()
    }

    /// Write only the headline and verbose echo, for jobs whose output
    /// streams live.
    pub fn announce(&self, out: &mut dyn Write, tee: Option<&mut dyn Write>) {
        let mut out = Sink::new("stdout", out);
        let mut tee = tee.map(|writer| Sink::new("tee log", writer));

        self.preamble(&mut out, tee.as_mut());
        out.flush();
        if let Some(tee) = tee.as_mut() {
            tee.flush();
        }
    }

    /// Write the preamble, then the captured stdout block, then the
    /// captured stderr block.
    ///
    /// Stdout is flushed before stderr starts. The child's own interleaving
    /// of the two streams is not reconstructed.
    pub fn publish(
        &self,
        captured: &mut CapturedOutput,
        out: &mut dyn Write,
        err: &mut dyn Write,
        tee: Option<&mut dyn Write>,
    ) {
        let mut out = Sink::new("stdout", out);
        let mut tee = tee.map(|writer| Sink::new("tee log", writer));

        self.preamble(&mut out, tee.as_mut());
        replay(&mut captured.stdout, &mut out, tee.as_mut());
        out.flush();

        let mut err = Sink::new("stderr", err);
        replay(&mut captured.stderr, &mut err, tee.as_mut());
        err.flush();

        if let Some(tee) = tee.as_mut() {
            tee.flush();
        }
    }

    fn preamble(&self, out: &mut Sink<'_>, mut tee: Option<&mut Sink<'_>>) {
        let mut line = |bytes: &[u8]| {
            out.write(bytes);
            out.write(b"\n");
            if let Some(tee) = tee.as_deref_mut() {
                tee.write(bytes);
                tee.write(b"\n");
            }
        };

        if let Some(headline) = self.headline {
            line(headline.as_bytes());
        }
        if let Some(prefix) = self.verbose {
            line(&[prefix.as_bytes(), self.recipe].concat());
        }
    }
}

/// A writer that stops being used after its first failure.
struct Sink<'w> {
    name: &'static str,
    writer: &'w mut dyn Write,
    healthy: bool,
}

impl<'w> Sink<'w> {
    fn new(name: &'static str, writer: &'w mut dyn Write) -> Self {
        Self {
            name,
            writer,
            healthy: true,
        }
    }

    fn write(&mut self, bytes: &[u8]) {
        if !self.healthy {
            return;
        }
        if let Err(err) = self.writer.write_all(bytes) {
            tracing::warn!("write to {} failed, skipping it: {err}", self.name);
            self.healthy = false;
        }
    }

    fn flush(&mut self) {
        if !self.healthy {
            return;
        }
        if let Err(err) = self.writer.flush() {
            tracing::warn!("flush of {} failed: {err}", self.name);
            self.healthy = false;
        }
    }
}

fn replay(source: &mut File, primary: &mut Sink<'_>, mut tee: Option<&mut Sink<'_>>) {
    let mut buffer = [0_u8; REPLAY_CHUNK];
    loop {
        let read = match source.read(&mut buffer) {
            Ok(0) => return,
            Ok(read) => read,
            Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
            Err(err) => {
                tracing::warn!("reading captured output failed: {err}");
                return;
            }
        };
        primary.write(&buffer[..read]);
        if let Some(tee) = tee.as_deref_mut() {
            tee.write(&buffer[..read]);
        }
    }
}

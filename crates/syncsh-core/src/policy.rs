//! Classification of recipes into serialized and publish-only jobs.
//!
//! Publish-only jobs run in parallel and only take the global lock (offset
//! 0) to publish their finished output. Jobs matching the configured
//! pattern hold a class lock for their whole lifetime. The class lock's
//! offset is derived from the pattern text, so every instance configured
//! with the same pattern contends on the same byte.

use regex::bytes::Regex;
use sha2::{Digest, Sha256};

/// Offset of the global publication lock.
pub const GLOBAL_OFFSET: u64 = 0;

/// Class offsets are kept within 31 bits so they fit any `off_t`.
const OFFSET_MASK: u32 = 0x7fff_ffff;

/// How a recipe is synchronized against other instances.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SerializePolicy {
    /// Lock at `offset` is held from before spawn until the child exits.
    Serialize { offset: u64 },
    /// Child runs unlocked; its captured output is published under the
    /// global lock.
    PublishOnly,
}

impl SerializePolicy {
    /// Classify a recipe against an optional pattern.
    ///
    /// A pattern that does not compile degrades to publish-only with a
    /// warning; a malformed filter must never block a build.
    pub fn classify(recipe: &[u8], pattern: Option<&str>) -> Self {
        let Some(pattern) = pattern else {
            return Self::PublishOnly;
        };

        match Regex::new(pattern) {
            Ok(regex) if regex.is_match(recipe) => {
                let offset = class_offset(pattern);
                tracing::debug!(pattern, offset, "recipe matches serialize pattern");
                Self::Serialize { offset }
            }
            Ok(_) => Self::PublishOnly,
            Err(err) => {
                tracing::warn!("ignoring invalid serialize pattern '{pattern}': {err}");
                Self::PublishOnly
            }
        }
    }

    /// Lock offset for this policy.
    #[must_use]
    pub const fn offset(&self) -> u64 {
        match self {
            Self::Serialize { offset } => *offset,
            Self::PublishOnly => GLOBAL_OFFSET,
        }
    }

    #[must_use]
    pub const fn is_serialized(&self) -> bool {
        matches!(self, Self::Serialize { .. })
    }
}

/// Stable lock offset for a serialization class.
///
/// Derived from the pattern text, not from what it matched. Never returns
/// [`GLOBAL_OFFSET`]. Distinct patterns may collide; a collision only merges
/// two classes.
#[must_use]
pub fn class_offset(pattern: &str) -> u64 {
    let digest = Sha256::digest(pattern.as_bytes());
    let prefix = [digest[0], digest[1], digest[2], digest[3]];
    let offset = u32::from_be_bytes(prefix) & OFFSET_MASK;
    u64::from(offset.max(1))
}

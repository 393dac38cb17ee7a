// Copyright 2026 the framewatch authors under the terms of the MIT License
// as detailed in the accompanying file README.md or
// <http://opensource.org/licenses/MIT>.

//! The single fallible result type used by every core component.
//!
//! Per the error taxonomy this crate follows, only two kinds of failure
//! are fatal: a frame whose shape disagrees with what a model was
//! initialized with, and a configuration value that can never produce a
//! working component. Everything else (an empty rectangle list, a frame
//! arriving before warm-up completes) is handled by returning an empty
//! result, not by an `Err`.

use std::fmt;

/// Width/height/channel triple a model was initialized or configured with.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct FrameShape {
    pub width: u32,
    pub height: u32,
    pub channels: u8,
}

impl fmt::Display for FrameShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}x{}", self.width, self.height, self.channels)
    }
}

/// Fatal errors a core component can raise.
///
/// A call that returns `Err` must not have mutated any persistent state;
/// the caller can retry with corrected input or abandon the pipeline.
#[derive(Clone, Debug, thiserror::Error, Eq, PartialEq)]
pub enum CoreError {
    /// The frame passed to `update`/`proc` does not match the shape
    /// captured at `init` time.
    #[error("frame shape {actual} does not match the shape {expected} this component was initialized with")]
    ShapeMismatch {
        expected: FrameShape,
        actual: FrameShape,
    },

    /// A channel count other than 1 (grayscale) or 3 (BGR/RGB) was given.
    #[error("unsupported channel count {0}, expected 1 or 3")]
    UnsupportedChannels(u8),

    /// A configuration value can never produce a working component.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Convenience alias used throughout the crate.
pub type CoreResult<T> = Result<T, CoreError>;

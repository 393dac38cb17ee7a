// Copyright 2026 the framewatch authors under the terms of the MIT License
// as detailed in the accompanying file README.md or
// <http://opensource.org/licenses/MIT>.

//! `framewatch` is a video-analytics core: for each incoming frame of a
//! fixed-resolution stream it maintains a per-pixel background model,
//! extracts candidate moving-object rectangles from the resulting
//! foreground mask, and associates those rectangles across frames into
//! tracked trajectories with configurable snapshot capture.
//!
//! Video decoding, CLI/config-file/logging surfaces, and disk I/O for
//! persisting snapshots are deliberately not part of this crate; see
//! [`pipeline`] for the orchestrator that a caller drives frame by frame.

#![allow(clippy::collapsible_if)]
#![warn(clippy::cast_lossless)]

pub mod background;
pub mod blob;
pub mod config;
pub mod error;
pub mod frame;
pub mod geometry;
pub mod imageops;
pub mod pipeline;
pub mod track;
pub mod util;
pub mod visual_info;

pub use error::CoreError;
pub use frame::Frame;

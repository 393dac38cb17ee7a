// Copyright 2026 the framewatch authors under the terms of the MIT License
// as detailed in the accompanying file README.md or
// <http://opensource.org/licenses/MIT>.

//! Per-pixel background models. Two interchangeable engines are
//! provided — [`mog::Mog`] (a bounded Gaussian mixture per pixel) and
//! [`vibe::Vibe`]/[`vibe::ExtendedVibe`] (a sample-bank model) — behind
//! the same [`BackgroundModel`] trait so [`crate::pipeline`] can pick
//! either at construction time.

pub mod mog;
pub mod vibe;

use crate::error::CoreResult;
use crate::frame::Frame;
use crate::geometry::Rect;
use crate::imageops::GrayImage;

/// Output of one `update` call: the binary foreground mask at frame
/// resolution, and a reconstructed background frame (the current model
/// mean, same shape as the input).
pub struct BackgroundUpdate {
    pub foreground: GrayImage,
    pub background: Frame,
}

/// Shared interface implemented by both background engines.
///
/// `freeze_rects` names rectangles in which the model should classify
/// but not update — used to avoid learning slow-moving "stable" objects
/// into the background (see `crate::blob::StableRectTracker`).
pub trait BackgroundModel {
    fn init(&mut self, frame: &Frame) -> CoreResult<()>;
    fn update(&mut self, frame: &Frame, freeze_rects: &[Rect]) -> CoreResult<BackgroundUpdate>;
    fn reset(&mut self);
}

pub use mog::Mog;
pub use vibe::{ExtendedVibe, Vibe};

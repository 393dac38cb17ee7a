// Copyright 2026 the framewatch authors under the terms of the MIT License
// as detailed in the accompanying file README.md or
// <http://opensource.org/licenses/MIT>.

//! Augments a background model's foreground mask with a thresholded
//! gradient-difference signal, so edges present in the current frame but
//! absent from the background (shadows lack these; most objects have
//! them) get pulled into the foreground even where pixel intensity alone
//! would have called them background.

use crate::background::{BackgroundModel, BackgroundUpdate};
use crate::error::CoreResult;
use crate::frame::Frame;
use crate::geometry::Rect;
use crate::imageops::{and_not, box_blur3, gradient_magnitude_threshold, median_blur3, or, GrayImage};

const GRAD_THRESHOLD: u32 = 145;

/// Output of one [`VisualInfo::update`] call.
pub struct VisualInfoUpdate {
    pub foreground: GrayImage,
    pub background: Frame,
    pub grad_diff: GrayImage,
}

/// Wraps a [`BackgroundModel`] with the gradient-augmentation step.
/// The background model's own state is advanced on every call; the
/// gradient-difference mask is only recomputed on `full` calls and
/// otherwise carried over from the previous one, matching the pacing the
/// pipeline uses to keep the per-frame cost down.
pub struct VisualInfo {
    model: Box<dyn BackgroundModel>,
    grad_threshold: u32,
    last_grad_diff: Option<GrayImage>,
}

impl VisualInfo {
    pub fn new(model: Box<dyn BackgroundModel>) -> Self {
        VisualInfo {
            model,
            grad_threshold: GRAD_THRESHOLD,
            last_grad_diff: None,
        }
    }

    pub fn init(&mut self, frame: &Frame) -> CoreResult<()> {
        self.last_grad_diff = None;
        self.model.init(frame)
    }

    pub fn update(&mut self, frame: &Frame, freeze_rects: &[Rect], full: bool) -> CoreResult<VisualInfoUpdate> {
        let BackgroundUpdate { foreground: model_fg, background } = self.model.update(frame, freeze_rects)?;

        let grad_diff = if full {
            let frame_gray = GrayImage::new(frame.width(), frame.height(), frame.to_grayscale());
            let frame_edges = gradient_magnitude_threshold(&box_blur3(&frame_gray), self.grad_threshold);

            let back_gray = GrayImage::new(background.width(), background.height(), background.to_grayscale());
            let back_edges = gradient_magnitude_threshold(&box_blur3(&back_gray), self.grad_threshold);

            let diff = median_blur3(&and_not(&frame_edges, &back_edges));
            self.last_grad_diff = Some(diff.clone());
            diff
        } else {
            self.last_grad_diff
                .clone()
                .unwrap_or_else(|| GrayImage::zeros(frame.width(), frame.height()))
        };

        let foreground = or(&model_fg, &grad_diff);
        Ok(VisualInfoUpdate {
            foreground,
            background,
            grad_diff,
        })
    }

    pub fn reset(&mut self) {
        self.model.reset();
        self.last_grad_diff = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::background::mog::{Mog, MogProfile};

    fn constant_frame(value: u8, w: u32, h: u32) -> Frame {
        Frame::new(vec![value; (w * h) as usize], w, h, 1, 0, 0).unwrap()
    }

    #[test]
    fn constant_frame_stays_background_on_full_and_non_full_calls() {
        let mut info = VisualInfo::new(Box::new(Mog::new(MogProfile::Relaxed)));
        let frame = constant_frame(128, 40, 30);
        info.init(&frame).unwrap();
        for i in 0..10 {
            let update = info.update(&frame, &[], i % 4 == 0).unwrap();
            if i >= 1 {
                assert_eq!(update.foreground.count_nonzero(), 0, "frame {}", i);
            }
        }
    }

    #[test]
    fn non_full_call_reuses_previous_gradient_diff() {
        let mut info = VisualInfo::new(Box::new(Mog::new(MogProfile::Relaxed)));
        let frame = constant_frame(100, 20, 20);
        info.init(&frame).unwrap();
        let first = info.update(&frame, &[], true).unwrap();
        let second = info.update(&frame, &[], false).unwrap();
        assert_eq!(first.grad_diff.data, second.grad_diff.data);
    }
}

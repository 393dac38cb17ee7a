// Copyright 2026 the framewatch authors under the terms of the MIT License
// as detailed in the accompanying file README.md or
// <http://opensource.org/licenses/MIT>.

//! Per-track time series of rectangles, plus the direction-sign streams
//! used to detect a trajectory reversal and the stability/regression
//! queries the tracker's tie-breaking step needs.

use cgmath::Point2;

use crate::frame::Frame;
use crate::geometry::Rect;
use crate::util::{linear_regress, sign};

const SMALL_RECT_AREA: i64 = 30 * 30;
const IOU_STABLE_LARGE: f64 = 0.9;
const IOU_STABLE_SMALL: f64 = 0.8;
const STABLE_GRAD_DIFF_MEAN: f64 = 5.0;
const FALLBACK_STRIDE: usize = 5;

/// One observation of a tracked rectangle.
#[derive(Clone, Debug)]
pub struct QuantRecord {
    pub rect: Rect,
    pub orig_rect: Rect,
    pub center: Point2<f64>,
    pub top: Point2<f64>,
    pub bottom: Point2<f64>,
    pub grad_diff_mean: f64,
    pub time_ms: i64,
    pub frame_index: i32,
    pub cropped_image: Option<Frame>,
}

/// Ordered history of a track's rectangles plus the X/Y direction-sign
/// streams sampled every `check_dir_step` records.
#[derive(Default)]
pub struct QuantHistory {
    records: Vec<QuantRecord>,
    x_signs: Vec<i8>,
    y_signs: Vec<i8>,
    check_dir_step: u32,
}

impl QuantHistory {
    pub fn new(check_dir_step: u32) -> Self {
        QuantHistory {
            records: Vec::new(),
            x_signs: Vec::new(),
            y_signs: Vec::new(),
            check_dir_step: check_dir_step.max(1),
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[QuantRecord] {
        &self.records
    }

    pub fn last(&self) -> Option<&QuantRecord> {
        self.records.last()
    }

    /// Appends a new observation and, every `check_dir_step` records,
    /// pushes the sign of the center's displacement onto the X/Y
    /// direction-sign streams.
    pub fn push_record(
        &mut self,
        rect: Rect,
        orig_rect: Rect,
        grad_diff_mean: f64,
        time_ms: i64,
        frame_index: i32,
        cropped_image: Option<Frame>,
    ) {
        let center = rect.center();
        let record = QuantRecord {
            rect,
            orig_rect,
            center,
            top: rect.top_mid(),
            bottom: rect.bottom_mid(),
            grad_diff_mean,
            time_ms,
            frame_index,
            cropped_image,
        };
        self.records.push(record);

        let step = self.check_dir_step as usize;
        let n = self.records.len();
        if n > step {
            let prev = &self.records[n - 1 - step];
            let curr = &self.records[n - 1];
            self.x_signs.push(sign(curr.center.x, prev.center.x));
            self.y_signs.push(sign(curr.center.y, prev.center.y));
        }
    }

    /// A trajectory reversal: one axis has at least 70% of the signs in
    /// the first half of its stream dominated by one direction, and the
    /// last 30% dominated by the opposite direction.
    pub fn check_turn_around(&self) -> bool {
        axis_reversed(&self.x_signs) || axis_reversed(&self.y_signs)
    }

    /// Whether the track has been essentially stationary for
    /// `window_ms`: consecutive rectangles in that window have IoU above
    /// the size-dependent threshold and low gradient-difference mean.
    pub fn check_stability(&self, window_ms: i64) -> bool {
        if self.records.len() < 2 {
            return false;
        }
        let last = self.records.last().unwrap();
        let cutoff = last.time_ms - window_ms;
        let mut start = self.records.len();
        for (i, r) in self.records.iter().enumerate().rev() {
            if r.time_ms < cutoff {
                break;
            }
            start = i;
        }
        if last.time_ms - self.records[start].time_ms < window_ms / 4 {
            start = self.records.len().saturating_sub(FALLBACK_STRIDE + 1);
        }
        let window = &self.records[start..];
        if window.len() < 2 {
            return false;
        }
        window.windows(2).all(|pair| {
            let (a, b) = (&pair[0], &pair[1]);
            let thresh = if a.rect.area() < SMALL_RECT_AREA {
                IOU_STABLE_SMALL
            } else {
                IOU_STABLE_LARGE
            };
            a.rect.iou(&b.rect) >= thresh && a.grad_diff_mean < STABLE_GRAD_DIFF_MEAN && b.grad_diff_mean < STABLE_GRAD_DIFF_MEAN
        })
    }

    /// Fits a line through the center-point history, minimizing
    /// perpendicular distance. Returns `(point_on_line, unit_direction,
    /// mean_error)`.
    pub fn linear_regres(&self) -> (Point2<f64>, cgmath::Vector2<f64>, f64) {
        let points: Vec<Point2<f64>> = self.records.iter().map(|r| r.center).collect();
        linear_regress(&points)
    }
}

fn axis_reversed(signs: &[i8]) -> bool {
    if signs.len() < 4 {
        return false;
    }
    let half = signs.len() / 2;
    let first_half = &signs[..half];
    let tail_len = (signs.len() as f64 * 0.3).ceil() as usize;
    let tail_len = tail_len.max(1).min(signs.len());
    let tail = &signs[signs.len() - tail_len..];

    let dominant = |s: &[i8]| -> i8 {
        let pos = s.iter().filter(|&&v| v > 0).count();
        let neg = s.iter().filter(|&&v| v < 0).count();
        if pos as f64 >= 0.7 * s.len() as f64 {
            1
        } else if neg as f64 >= 0.7 * s.len() as f64 {
            -1
        } else {
            0
        }
    };
    let head_dir = dominant(first_half);
    if head_dir == 0 {
        return false;
    }
    let tail_dir = dominant(tail);
    tail_dir != 0 && tail_dir != head_dir
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn steady_rightward_motion_never_reverses() {
        let mut history = QuantHistory::new(4);
        for i in 0..40 {
            let rect = Rect::new(10 + i * 5, 100, 30, 30);
            history.push_record(rect, rect, 0.0, i as i64 * 33, i, None);
        }
        assert!(!history.check_turn_around());
    }

    #[test]
    fn rightward_then_leftward_motion_is_detected_as_a_reversal() {
        let mut history = QuantHistory::new(4);
        let mut x = 10;
        for i in 0..15 {
            let rect = Rect::new(x, 100, 30, 30);
            history.push_record(rect, rect, 0.0, i as i64 * 33, i, None);
            x += 5;
        }
        for i in 15..30 {
            let rect = Rect::new(x, 100, 30, 30);
            history.push_record(rect, rect, 0.0, i as i64 * 33, i, None);
            x -= 5;
        }
        assert!(history.check_turn_around());
    }

    #[test]
    fn stationary_low_gradient_rectangles_are_stable() {
        let mut history = QuantHistory::new(4);
        let rect = Rect::new(10, 10, 40, 40);
        for i in 0..10 {
            history.push_record(rect, rect, 0.0, i as i64 * 100, i, None);
        }
        assert!(history.check_stability(500));
    }
}

// Copyright 2026 the framewatch authors under the terms of the MIT License
// as detailed in the accompanying file README.md or
// <http://opensource.org/licenses/MIT>.

//! Per-rectangle shadow refinement: trims rows dominated by a shadow
//! signature from the top or bottom of a candidate rectangle, and
//! tightens a rectangle to the mask's actual extent.

use crate::geometry::Rect;
use crate::imageops::{row_runs, GrayImage};

/// A row counts as a "narrow single run" when its foreground span covers
/// less than this fraction of the rectangle's width; shadows tend to cast
/// a thin line rather than fill the row.
const NARROW_RUN_RATIO: f64 = 0.3;
/// A row in the gradient-difference mask is a "shadow row" when its
/// largest zero-run covers at least this fraction of the row's
/// foreground extent.
const SHADOW_ZERO_RUN_RATIO: f64 = 0.6;

/// Trims leading/trailing rows of `rect` whose foreground run in `mask`
/// is a narrow single run, which tends to indicate a shadow's thin edge
/// rather than the object body.
pub fn refine_by_shape(mask: &GrayImage, rect: Rect) -> Rect {
    let runs = row_runs(mask, rect);
    let is_narrow = |run: &Option<(i32, i32)>| match run {
        None => true,
        Some((a, b)) => (*b - *a + 1) as f64 / rect.w.max(1) as f64 <= NARROW_RUN_RATIO,
    };

    let mut top = 0;
    while top < runs.len() && is_narrow(&runs[top]) {
        top += 1;
    }
    let mut bottom = runs.len();
    while bottom > top && is_narrow(&runs[bottom - 1]) {
        bottom -= 1;
    }
    if top >= bottom {
        return rect;
    }
    Rect::new(rect.x, rect.y + top as i32, rect.w, (bottom - top) as i32)
}

/// Trims leading/trailing rows whose largest zero-run in the
/// gradient-difference mask covers most of the foreground extent for
/// that row — a row with foreground pixels but no supporting gradient is
/// a shadow, not an edge of the object.
pub fn refine_by_gradient(grad_diff: &GrayImage, fg_mask: &GrayImage, rect: Rect) -> Rect {
    let fg_runs = row_runs(fg_mask, rect);
    let mut is_shadow_row = vec![false; rect.h.max(0) as usize];

    for (row, run) in fg_runs.iter().enumerate() {
        let Some((a, b)) = run else {
            is_shadow_row[row] = true;
            continue;
        };
        let extent = (b - a + 1).max(1);
        let y = rect.y + row as i32;
        let mut best_zero_run = 0i32;
        let mut current = 0i32;
        for col in 0..rect.w {
            let x = rect.x + col;
            if grad_diff.get(x, y) == 0 {
                current += 1;
                best_zero_run = best_zero_run.max(current);
            } else {
                current = 0;
            }
        }
        is_shadow_row[row] = best_zero_run as f64 / extent as f64 >= SHADOW_ZERO_RUN_RATIO;
    }

    let mut top = 0;
    while top < is_shadow_row.len() && is_shadow_row[top] {
        top += 1;
    }
    let mut bottom = is_shadow_row.len();
    while bottom > top && is_shadow_row[bottom - 1] {
        bottom -= 1;
    }
    if top >= bottom {
        return rect;
    }
    Rect::new(rect.x, rect.y + top as i32, rect.w, (bottom - top) as i32)
}

/// Tightens `rect` to the bounding box of the actually-set pixels of
/// `mask` within it; returns `rect` unchanged if no pixel is set.
pub fn fit_to_foreground(mask: &GrayImage, rect: Rect) -> Rect {
    let mut min_x = None;
    let mut max_x = None;
    let mut min_y = None;
    let mut max_y = None;
    for row in 0..rect.h {
        let y = rect.y + row;
        for col in 0..rect.w {
            let x = rect.x + col;
            if mask.get(x, y) != 0 {
                min_x = Some(min_x.map_or(x, |m: i32| m.min(x)));
                max_x = Some(max_x.map_or(x, |m: i32| m.max(x)));
                min_y = Some(min_y.map_or(y, |m: i32| m.min(y)));
                max_y = Some(max_y.map_or(y, |m: i32| m.max(y)));
            }
        }
    }
    match (min_x, max_x, min_y, max_y) {
        (Some(x0), Some(x1), Some(y0), Some(y1)) => Rect::new(x0, y0, x1 - x0 + 1, y1 - y0 + 1),
        _ => rect,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shape_refine_trims_narrow_shadow_rows_from_top() {
        let mut mask = GrayImage::zeros(40, 40);
        // A one-pixel-wide shadow sliver above a solid block.
        mask.set(20, 10, 255);
        for y in 15..30 {
            for x in 10..30 {
                mask.set(x, y, 255);
            }
        }
        let refined = refine_by_shape(&mask, Rect::new(10, 10, 20, 20));
        assert_eq!(refined.y, 15);
    }

    #[test]
    fn fit_to_foreground_tightens_to_actual_pixels() {
        let mut mask = GrayImage::zeros(40, 40);
        for y in 12..18 {
            for x in 14..22 {
                mask.set(x, y, 255);
            }
        }
        let refined = fit_to_foreground(&mask, Rect::new(10, 10, 20, 20));
        assert_eq!(refined, Rect::new(14, 12, 8, 6));
    }
}

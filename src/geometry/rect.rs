// Copyright 2026 the framewatch authors under the terms of the MIT License
// as detailed in the accompanying file README.md or
// <http://opensource.org/licenses/MIT>.

use cgmath::Point2;

/// An integer rectangle in normalized (or, when explicitly scaled,
/// original) frame coordinates.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub w: i32,
    pub h: i32,
}

impl Rect {
    pub const fn new(x: i32, y: i32, w: i32, h: i32) -> Self {
        Rect { x, y, w, h }
    }

    pub fn area(&self) -> i64 {
        self.w.max(0) as i64 * self.h.max(0) as i64
    }

    pub fn center(&self) -> Point2<f64> {
        Point2::new(
            self.x as f64 + self.w as f64 / 2.0,
            self.y as f64 + self.h as f64 / 2.0,
        )
    }

    pub fn top_mid(&self) -> Point2<f64> {
        Point2::new(self.x as f64 + self.w as f64 / 2.0, self.y as f64)
    }

    pub fn bottom_mid(&self) -> Point2<f64> {
        Point2::new(self.x as f64 + self.w as f64 / 2.0, (self.y + self.h) as f64)
    }

    pub fn right(&self) -> i32 {
        self.x + self.w
    }

    pub fn bottom(&self) -> i32 {
        self.y + self.h
    }

    /// Returns `true` if the rectangle touches any of the four edges of
    /// a `width` x `height` frame.
    pub fn touches_border(&self, width: i32, height: i32) -> bool {
        self.x <= 0 || self.y <= 0 || self.right() >= width || self.bottom() >= height
    }

    /// Returns `true` if the rectangle is inset by `margin` pixels
    /// strictly inside a `width` x `height` frame.
    pub fn strictly_interior(&self, width: i32, height: i32, margin: i32) -> bool {
        self.x > margin && self.y > margin && self.right() < width - margin && self.bottom() < height - margin
    }

    pub fn intersection(&self, other: &Rect) -> Rect {
        let x0 = self.x.max(other.x);
        let y0 = self.y.max(other.y);
        let x1 = self.right().min(other.right());
        let y1 = self.bottom().min(other.bottom());
        Rect::new(x0, y0, (x1 - x0).max(0), (y1 - y0).max(0))
    }

    pub fn union(&self, other: &Rect) -> Rect {
        let x0 = self.x.min(other.x);
        let y0 = self.y.min(other.y);
        let x1 = self.right().max(other.right());
        let y1 = self.bottom().max(other.bottom());
        Rect::new(x0, y0, x1 - x0, y1 - y0)
    }

    /// Ratio of `intersection(self, other).area` to `self.area`.
    pub fn overlap_ratio_to_self(&self, other: &Rect) -> f64 {
        let a = self.area();
        if a == 0 {
            return 0.0;
        }
        self.intersection(other).area() as f64 / a as f64
    }

    /// Intersection-over-union, used by the stable-rectangle detector and
    /// by shape-stability checks.
    pub fn iou(&self, other: &Rect) -> f64 {
        let inter = self.intersection(other).area();
        if inter == 0 {
            return 0.0;
        }
        let union = self.area() + other.area() - inter;
        if union == 0 {
            0.0
        } else {
            inter as f64 / union as f64
        }
    }

    pub fn intersects(&self, other: &Rect) -> bool {
        self.intersection(other).area() > 0
    }

    /// Scales this rectangle from normalized coordinates to original
    /// coordinates using the per-axis scale factors in `SizeInfo`.
    pub fn scaled(&self, hori_scale: f64, vert_scale: f64) -> Rect {
        Rect::new(
            (self.x as f64 * hori_scale).round() as i32,
            (self.y as f64 * vert_scale).round() as i32,
            (self.w as f64 * hori_scale).round() as i32,
            (self.h as f64 * vert_scale).round() as i32,
        )
    }

    /// Clamps this rectangle so that it lies within `[0, width) x [0, height)`.
    pub fn clamped(&self, width: i32, height: i32) -> Rect {
        let x0 = self.x.clamp(0, width);
        let y0 = self.y.clamp(0, height);
        let x1 = self.right().clamp(0, width);
        let y1 = self.bottom().clamp(0, height);
        Rect::new(x0, y0, (x1 - x0).max(0), (y1 - y0).max(0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn iou_of_identical_rects_is_one() {
        let r = Rect::new(0, 0, 10, 10);
        assert!((r.iou(&r) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn iou_of_disjoint_rects_is_zero() {
        let a = Rect::new(0, 0, 10, 10);
        let b = Rect::new(100, 100, 10, 10);
        assert_eq!(a.iou(&b), 0.0);
    }

    #[test]
    fn touches_border_detects_all_four_edges() {
        assert!(Rect::new(0, 5, 10, 10).touches_border(100, 100));
        assert!(Rect::new(5, 0, 10, 10).touches_border(100, 100));
        assert!(Rect::new(90, 5, 10, 10).touches_border(100, 100));
        assert!(Rect::new(5, 90, 10, 10).touches_border(100, 100));
        assert!(!Rect::new(10, 10, 10, 10).touches_border(100, 100));
    }
}

// Copyright 2026 the framewatch authors under the terms of the MIT License
// as detailed in the accompanying file README.md or
// <http://opensource.org/licenses/MIT>.

use cgmath::Point2;

/// A directed line segment used as a "cross this line" snapshot trigger.
///
/// Internally this is the line equation `a*x + b*y + c = 0` (normalized
/// so `a^2 + b^2 = 1`), plus the strip between the two lines
/// perpendicular to the segment through its endpoints (the "thickened
/// interior region"): inside that strip, distance-to-line is exact;
/// outside it, distance falls back to the nearer endpoint.
#[derive(Clone, Copy, Debug)]
pub struct LineSegment {
    beg: Point2<f64>,
    end: Point2<f64>,
    a: f64,
    b: f64,
    c: f64,
    /// Perpendicular-strip test: `a1*x + b1*y + c1` and `a2*x + b2*y +
    /// c2`, each paired with the sign its own endpoint-side has.
    strip: ParallelStrip,
    sign_on_beg_side: f64,
}

#[derive(Clone, Copy, Debug)]
struct ParallelStrip {
    a1: f64,
    b1: f64,
    c1: f64,
    sign1: f64,
    a2: f64,
    b2: f64,
    c2: f64,
    sign2: f64,
}

impl ParallelStrip {
    fn new(beg: Point2<f64>, end: Point2<f64>) -> Self {
        if beg == end {
            return ParallelStrip {
                a1: 0.0,
                b1: 0.0,
                c1: 0.0,
                sign1: 0.0,
                a2: 0.0,
                b2: 0.0,
                c2: 0.0,
                sign2: 0.0,
            };
        }
        let (a1, b1, c1, a2, b2, c2);
        if (beg.x - end.x).abs() < f64::EPSILON {
            a1 = 0.0;
            b1 = 1.0;
            c1 = -beg.y;
            a2 = 0.0;
            b2 = 1.0;
            c2 = -end.y;
        } else if (beg.y - end.y).abs() < f64::EPSILON {
            a1 = 1.0;
            b1 = 0.0;
            c1 = -beg.x;
            a2 = 1.0;
            b2 = 0.0;
            c2 = -end.x;
        } else {
            let k = -(beg.x - end.x) / (beg.y - end.y);
            let s = (k * k + 1.0).sqrt();
            a1 = k / s;
            b1 = -1.0 / s;
            a2 = a1;
            b2 = b1;
            c1 = (beg.y - k * beg.x) / s;
            c2 = (end.y - k * end.x) / s;
        }
        let center = Point2::new((beg.x + end.x) / 2.0, (beg.y + end.y) / 2.0);
        let sign1 = if center.x * a1 + center.y * b1 + c1 > 0.0 { 1.0 } else { -1.0 };
        let sign2 = if center.x * a2 + center.y * b2 + c2 > 0.0 { 1.0 } else { -1.0 };
        ParallelStrip {
            a1,
            b1,
            c1,
            sign1,
            a2,
            b2,
            c2,
            sign2,
        }
    }

    fn contains(&self, p: Point2<f64>) -> bool {
        if self.sign1 == 0.0 && self.sign2 == 0.0 {
            return false;
        }
        let val1 = p.x * self.a1 + p.y * self.b1 + self.c1;
        let val2 = p.x * self.a2 + p.y * self.b2 + self.c2;
        if val1.abs() < 1e-3 {
            return val2 * self.sign2 > 0.0;
        }
        if val2.abs() < 1e-3 {
            return val1 * self.sign1 > 0.0;
        }
        val1 * self.sign1 > 0.0 && val2 * self.sign2 > 0.0
    }
}

impl LineSegment {
    /// Builds a segment from `beg` to `end`. `beg_side_point`, if given,
    /// is a point known to lie on the side of the line's direction that
    /// should be reported as "begin side" by [`Self::in_beg_side`];
    /// defaults to the left of the directed segment when omitted.
    pub fn new(beg: (i32, i32), end: (i32, i32), beg_side_point: Option<(i32, i32)>) -> Self {
        let beg_f = Point2::new(beg.0 as f64, beg.1 as f64);
        let end_f = Point2::new(end.0 as f64, end.1 as f64);
        let (dx, dy) = (end_f.x - beg_f.x, end_f.y - beg_f.y);
        let len = (dx * dx + dy * dy).sqrt().max(f64::EPSILON);
        // ax + by + c = 0, normal pointing to the left of beg->end.
        let a = -dy / len;
        let b = dx / len;
        let c = -(a * beg_f.x + b * beg_f.y);
        let side_point = beg_side_point
            .map(|(x, y)| Point2::new(x as f64, y as f64))
            .unwrap_or_else(|| Point2::new(beg_f.x + a, beg_f.y + b));
        let side_val = a * side_point.x + b * side_point.y + c;
        let sign_on_beg_side = if side_val >= 0.0 { 1.0 } else { -1.0 };
        LineSegment {
            beg: beg_f,
            end: end_f,
            a,
            b,
            c,
            strip: ParallelStrip::new(beg_f, end_f),
            sign_on_beg_side,
        }
    }

    /// Perpendicular distance to the line when `pt`'s projection falls
    /// within the strip between the two endpoints; otherwise the
    /// distance to the nearer endpoint.
    pub fn dist_to(&self, pt: (i32, i32)) -> f64 {
        let p = Point2::new(pt.0 as f64, pt.1 as f64);
        if self.strip.contains(p) {
            (self.a * p.x + self.b * p.y + self.c).abs()
        } else {
            dist(p, self.beg).min(dist(p, self.end))
        }
    }

    pub fn close_to(&self, pt: (i32, i32), dist_thresh: f64) -> bool {
        self.dist_to(pt) < dist_thresh
    }

    /// `true` if `pt` lies on the side of the line designated "begin
    /// side" at construction.
    pub fn in_beg_side(&self, pt: (i32, i32)) -> bool {
        let p = Point2::new(pt.0 as f64, pt.1 as f64);
        (self.a * p.x + self.b * p.y + self.c) * self.sign_on_beg_side > 0.0
    }
}

fn dist(a: Point2<f64>, b: Point2<f64>) -> f64 {
    ((a.x - b.x).powi(2) + (a.y - b.y).powi(2)).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn distance_to_line_within_strip_is_perpendicular() {
        let seg = LineSegment::new((0, 0), (100, 0), Some((0, -1)));
        assert!((seg.dist_to((50, 10)) - 10.0).abs() < 1e-6);
    }

    #[test]
    fn distance_outside_strip_falls_back_to_endpoint() {
        let seg = LineSegment::new((0, 0), (100, 0), Some((0, -1)));
        let d = seg.dist_to((150, 0));
        assert!((d - 50.0).abs() < 1e-6);
    }

    #[test]
    fn beg_side_matches_the_given_hint() {
        let seg = LineSegment::new((0, 0), (100, 0), Some((0, -1)));
        assert!(seg.in_beg_side((50, -10)));
        assert!(!seg.in_beg_side((50, 10)));
    }
}

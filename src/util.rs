// Copyright 2026 the framewatch authors under the terms of the MIT License
// as detailed in the accompanying file README.md or
// <http://opensource.org/licenses/MIT>.

//! Small numeric helpers shared across background models, the blob
//! extractor and the tracker.

use cgmath::{InnerSpace, Point2, Vector2};
use once_cell::sync::Lazy;

/// The eight 8-connected neighbor offsets in a fixed clockwise order
/// starting at north, used both by ViBe's neighbor-propagation update
/// and by the background model's freeze-region bookkeeping.
pub static EIGHT_NEIGHBORS: Lazy<[(i32, i32); 8]> = Lazy::new(|| {
    [
        (0, -1),
        (1, -1),
        (1, 0),
        (1, 1),
        (0, 1),
        (-1, 1),
        (-1, 0),
        (-1, -1),
    ]
});

/// Sign of `a - b`, as `{-1, 0, 1}`; used by the direction-sign streams
/// in `QuantHistory`.
pub fn sign(a: f64, b: f64) -> i8 {
    let d = a - b;
    if d > 0.0 {
        1
    } else if d < 0.0 {
        -1
    } else {
        0
    }
}

/// Fits a line through `points` by minimizing the sum of squared
/// perpendicular distances (total least squares / Deming regression, as
/// opposed to ordinary least squares which minimizes only vertical
/// error). Returns `(point_on_line, unit_direction, mean_error)`.
///
/// Used both by `QuantHistory::linear_regres` and by the tracker's
/// tie-breaking step when multiple rectangles are tentatively matched to
/// one track.
pub fn linear_regress(points: &[Point2<f64>]) -> (Point2<f64>, Vector2<f64>, f64) {
    let n = points.len();
    if n == 0 {
        return (Point2::new(0.0, 0.0), Vector2::new(1.0, 0.0), 0.0);
    }
    let mean_x = points.iter().map(|p| p.x).sum::<f64>() / n as f64;
    let mean_y = points.iter().map(|p| p.y).sum::<f64>() / n as f64;
    let mut sxx = 0.0;
    let mut syy = 0.0;
    let mut sxy = 0.0;
    for p in points {
        let dx = p.x - mean_x;
        let dy = p.y - mean_y;
        sxx += dx * dx;
        syy += dy * dy;
        sxy += dx * dy;
    }
    // Principal axis of the scatter: eigenvector of the 2x2 covariance
    // matrix [[sxx, sxy], [sxy, syy]] with the larger eigenvalue.
    let theta = 0.5 * (2.0 * sxy).atan2(sxx - syy);
    let dir = Vector2::new(theta.cos(), theta.sin());
    let dir = if dir.magnitude() > f64::EPSILON {
        dir.normalize()
    } else {
        Vector2::new(1.0, 0.0)
    };
    let point_on_line = Point2::new(mean_x, mean_y);
    let mut error_sum = 0.0;
    for p in points {
        error_sum += perpendicular_distance(*p, point_on_line, dir);
    }
    (point_on_line, dir, error_sum / n as f64)
}

/// Perpendicular distance from `p` to the line through `origin` with
/// unit direction `dir`.
pub fn perpendicular_distance(p: Point2<f64>, origin: Point2<f64>, dir: Vector2<f64>) -> f64 {
    let v = p - origin;
    let proj_len = v.x * dir.x + v.y * dir.y;
    let proj = Vector2::new(dir.x * proj_len, dir.y * proj_len);
    let perp = v - proj;
    (perp.x * perp.x + perp.y * perp.y).sqrt()
}

/// Pearson correlation coefficient between two equal-length sample
/// slices, used by the blob extractor's background-correlation shadow
/// check. Returns `0.0` if either sample has zero variance.
pub fn pearson_correlation(a: &[f64], b: &[f64]) -> f64 {
    debug_assert_eq!(a.len(), b.len());
    let n = a.len();
    if n == 0 {
        return 0.0;
    }
    let mean_a = a.iter().sum::<f64>() / n as f64;
    let mean_b = b.iter().sum::<f64>() / n as f64;
    let mut cov = 0.0;
    let mut var_a = 0.0;
    let mut var_b = 0.0;
    for i in 0..n {
        let da = a[i] - mean_a;
        let db = b[i] - mean_b;
        cov += da * db;
        var_a += da * da;
        var_b += db * db;
    }
    if var_a <= f64::EPSILON || var_b <= f64::EPSILON {
        return 0.0;
    }
    cov / (var_a.sqrt() * var_b.sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sign_matches_comparison() {
        assert_eq!(sign(5.0, 1.0), 1);
        assert_eq!(sign(1.0, 5.0), -1);
        assert_eq!(sign(3.0, 3.0), 0);
    }

    #[test]
    fn linear_regress_fits_horizontal_line() {
        let points = vec![
            Point2::new(0.0, 5.0),
            Point2::new(1.0, 5.0),
            Point2::new(2.0, 5.0),
        ];
        let (_point, dir, err) = linear_regress(&points);
        assert!(err < 1e-6);
        assert!(dir.y.abs() < 1e-6);
    }

    #[test]
    fn pearson_correlation_of_identical_series_is_one() {
        let a = [1.0, 2.0, 3.0, 4.0];
        assert!((pearson_correlation(&a, &a) - 1.0).abs() < 1e-9);
    }
}

// Copyright 2026 the framewatch authors under the terms of the MIT License
// as detailed in the accompanying file README.md or
// <http://opensource.org/licenses/MIT>.

use bitvec::vec::BitVec;
use cgmath::Point2;

use super::Rect;

/// Number of per-axis samples used by the rectangle/ROI intersection
/// test: an `11x11` grid over the rectangle, scored as the ratio of
/// sampled points that fall inside the region.
const GRID_SAMPLES: i32 = 11;

/// A region of interest: either the union of a set of polygons
/// (`included = true`) or its complement (`included = false`), baked
/// down to a binary mask at processing resolution for O(1) point
/// membership.
///
/// A region described by exactly one two-point "polygon" degenerates to
/// a line segment thickened by a 40-pixel structuring element, so a
/// two-point entry draws a coarse strip rather than a zero-area polygon.
pub struct RegionOfInterest {
    label: String,
    width: i32,
    height: i32,
    included: bool,
    mask: BitVec,
    /// Fast path: true when the mask covers effectively the whole
    /// frame, letting `contains`/`intersects` skip the mask lookup.
    is_full_size: bool,
}

impl RegionOfInterest {
    /// Builds a region of interest from a set of polygons. `included`
    /// selects whether the polygons' union is the region of interest or
    /// its complement.
    pub fn new(label: impl Into<String>, width: i32, height: i32, included: bool, polygons: &[Vec<(i32, i32)>]) -> Self {
        let mut mask = BitVec::repeat(false, (width * height).max(0) as usize);
        for poly in polygons {
            if poly.len() == 2 {
                rasterize_thick_segment(&mut mask, width, height, poly[0], poly[1], 40);
            } else if poly.len() >= 3 {
                rasterize_polygon(&mut mask, width, height, poly);
            }
        }
        if !included {
            for mut bit in mask.iter_mut() {
                *bit = !*bit;
            }
        }
        let set_count = mask.count_ones();
        let total = (width * height).max(1) as usize;
        let is_full_size = set_count as f64 / total as f64 > 0.99;
        RegionOfInterest {
            label: label.into(),
            width,
            height,
            included,
            mask,
            is_full_size,
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn included(&self) -> bool {
        self.included
    }

    pub fn contains_point(&self, x: i32, y: i32) -> bool {
        if self.is_full_size {
            return x >= 0 && y >= 0 && x < self.width && y < self.height;
        }
        if x < 0 || y < 0 || x >= self.width || y >= self.height {
            return false;
        }
        self.mask[(y * self.width + x) as usize]
    }

    /// Samples an `11x11` grid over `rect` and returns `true` if any
    /// sampled point falls inside the region.
    pub fn intersects(&self, rect: &Rect) -> bool {
        self.intersects_ratio(rect, 0.0)
    }

    /// As `intersects`, but requires at least `ratio` of the sampled
    /// grid points to fall inside the region.
    pub fn intersects_ratio(&self, rect: &Rect, ratio: f64) -> bool {
        if self.is_full_size {
            return ratio <= 0.0 || rect.area() > 0;
        }
        let mut hits = 0i32;
        let total = GRID_SAMPLES * GRID_SAMPLES;
        for iy in 0..GRID_SAMPLES {
            let py = rect.y as f64 + (iy as f64 + 0.5) * rect.h as f64 / GRID_SAMPLES as f64;
            for ix in 0..GRID_SAMPLES {
                let px = rect.x as f64 + (ix as f64 + 0.5) * rect.w as f64 / GRID_SAMPLES as f64;
                if self.contains_point(px.floor() as i32, py.floor() as i32) {
                    hits += 1;
                }
            }
        }
        hits as f64 / total as f64 > ratio
    }

    pub fn filter_not_intersecting(&self, rects: Vec<Rect>) -> Vec<Rect> {
        rects.into_iter().filter(|r| self.intersects(r)).collect()
    }
}

fn rasterize_polygon(mask: &mut BitVec, width: i32, height: i32, poly: &[(i32, i32)]) {
    if poly.is_empty() {
        return;
    }
    let min_y = poly.iter().map(|p| p.1).min().unwrap().max(0);
    let max_y = poly.iter().map(|p| p.1).max().unwrap().min(height - 1);
    for y in min_y..=max_y {
        let mut xs: Vec<f64> = Vec::new();
        let n = poly.len();
        for i in 0..n {
            let (x0, y0) = poly[i];
            let (x1, y1) = poly[(i + 1) % n];
            let (y0, y1, x0, x1) = (y0 as f64, y1 as f64, x0 as f64, x1 as f64);
            let yf = y as f64 + 0.5;
            if (y0 <= yf && y1 > yf) || (y1 <= yf && y0 > yf) {
                let t = (yf - y0) / (y1 - y0);
                xs.push(x0 + t * (x1 - x0));
            }
        }
        xs.sort_by(|a, b| a.partial_cmp(b).unwrap());
        for pair in xs.chunks(2) {
            if pair.len() < 2 {
                continue;
            }
            let x0 = pair[0].round().max(0.0) as i32;
            let x1 = pair[1].round().min(width as f64) as i32;
            for x in x0..x1 {
                if x >= 0 && x < width {
                    mask.set((y * width + x) as usize, true);
                }
            }
        }
    }
}

fn rasterize_thick_segment(
    mask: &mut BitVec,
    width: i32,
    height: i32,
    a: (i32, i32),
    b: (i32, i32),
    thickness: i32,
) {
    let pa = Point2::new(a.0 as f64, a.1 as f64);
    let pb = Point2::new(b.0 as f64, b.1 as f64);
    let radius = thickness as f64 / 2.0;
    let min_x = (a.0.min(b.0) - thickness).max(0);
    let max_x = (a.0.max(b.0) + thickness).min(width - 1);
    let min_y = (a.1.min(b.1) - thickness).max(0);
    let max_y = (a.1.max(b.1) + thickness).min(height - 1);
    for y in min_y..=max_y {
        for x in min_x..=max_x {
            let p = Point2::new(x as f64 + 0.5, y as f64 + 0.5);
            if dist_point_to_segment(p, pa, pb) <= radius {
                mask.set((y * width + x) as usize, true);
            }
        }
    }
}

fn dist_point_to_segment(p: Point2<f64>, a: Point2<f64>, b: Point2<f64>) -> f64 {
    let ab = b - a;
    let len2 = ab.x * ab.x + ab.y * ab.y;
    if len2 <= f64::EPSILON {
        return ((p.x - a.x).powi(2) + (p.y - a.y).powi(2)).sqrt();
    }
    let t = (((p.x - a.x) * ab.x) + ((p.y - a.y) * ab.y)) / len2;
    let t = t.clamp(0.0, 1.0);
    let proj = Point2::new(a.x + t * ab.x, a.y + t * ab.y);
    ((p.x - proj.x).powi(2) + (p.y - proj.y).powi(2)).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn square_polygon_contains_its_interior() {
        let roi = RegionOfInterest::new(
            "test",
            100,
            100,
            true,
            &[vec![(10, 10), (10, 90), (90, 90), (90, 10)]],
        );
        assert!(roi.contains_point(50, 50));
        assert!(!roi.contains_point(5, 5));
    }

    #[test]
    fn excluded_region_inverts_membership() {
        let roi = RegionOfInterest::new(
            "test",
            100,
            100,
            false,
            &[vec![(10, 10), (10, 90), (90, 90), (90, 10)]],
        );
        assert!(!roi.contains_point(50, 50));
        assert!(roi.contains_point(5, 5));
    }

    #[test]
    fn rect_on_edge_is_consistent_with_mask() {
        let roi = RegionOfInterest::new(
            "test",
            100,
            100,
            true,
            &[vec![(0, 0), (0, 50), (50, 50), (50, 0)]],
        );
        // A rectangle whose center sits on the polygon edge: inclusion is
        // whatever the rasterized mask says, but it must be consistent
        // across repeated calls.
        let r = Rect::new(25, 25, 50, 50);
        let first = roi.intersects(&r);
        let second = roi.intersects(&r);
        assert_eq!(first, second);
    }
}

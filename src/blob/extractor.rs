// Copyright 2026 the framewatch authors under the terms of the MIT License
// as detailed in the accompanying file README.md or
// <http://opensource.org/licenses/MIT>.

//! Turns a binary foreground mask into a filtered, merged, and
//! shadow-refined list of rectangles, plus the stable-rectangle list.

use crate::config::ExtractorConfig;
use crate::frame::Frame;
use crate::geometry::Rect;
use crate::imageops::{dilate_ellipse, erode_ellipse, find_external_rects, median_blur3, GrayImage};
use crate::util::pearson_correlation;

use super::shadow::{fit_to_foreground, refine_by_gradient, refine_by_shape};
use super::stable::StableRectTracker;

const DILATE_RADIUS: i32 = 3;
const ERODE_RADIUS: i32 = 1;

/// Vertical-merge pairs need their horizontal intersection to cover at
/// least this fraction of each rectangle's width.
const VERT_MERGE_OVERLAP: f64 = 0.75;
const VERT_MERGE_ASPECT: f64 = 1.75;
const HORI_MERGE_OVERLAP: f64 = 0.60;
const HORI_MERGE_ASPECT: f64 = 2.5;
const BIG_SMALL_BIG_RATIO: f64 = 0.80;
const BIG_SMALL_SMALL_RATIO: f64 = 0.70;

/// Mask → rectangles: contour filtering, merging, and shadow refinement,
/// plus the stable-rectangle detector carried across calls.
pub struct BlobExtractor {
    config: ExtractorConfig,
    stable: StableRectTracker,
}

impl BlobExtractor {
    pub fn new(config: ExtractorConfig) -> Self {
        BlobExtractor {
            config,
            stable: StableRectTracker::new(),
        }
    }

    /// The mask-only path: no color-correlation rejection and no
    /// gradient-based shadow refinement (shape-based refinement still
    /// runs if enabled, since it only needs the mask).
    pub fn proc_simple(&mut self, mask: &GrayImage) -> (Vec<Rect>, Vec<Rect>) {
        self.proc(mask, None, None, None)
    }

    /// The full path: `image`/`back` enable color-correlation shadow
    /// rejection, `grad_diff` enables gradient-based shadow refinement.
    pub fn proc(
        &mut self,
        mask: &GrayImage,
        image: Option<&Frame>,
        back: Option<&Frame>,
        grad_diff: Option<&GrayImage>,
    ) -> (Vec<Rect>, Vec<Rect>) {
        let morphed = erode_ellipse(&dilate_ellipse(&median_blur3(mask), DILATE_RADIUS), ERODE_RADIUS);

        let mut rects = find_external_rects(&morphed);
        rects.retain(|r| r.area() as f64 >= self.config.min_object_area);

        if self.config.char_region_check {
            rects.retain(|r| !self.falls_in_char_region(r));
        }

        rects.retain(|r| {
            let area = r.area() as f64;
            let h = r.h.max(1) as f64;
            let w = r.w.max(1) as f64;
            area / h >= self.config.min_avg_width && area / w >= self.config.min_avg_height
        });

        if self.config.corr_ratio_check {
            if let (Some(image), Some(back)) = (image, back) {
                rects.retain(|r| !self.is_shadow_by_correlation(r, image, back));
            }
        }

        if self.config.merge {
            if self.config.merge_vert {
                rects = merge_pass(rects, |a, b| vertical_merge_candidate(a, b));
            }
            if self.config.merge_hori {
                rects = merge_pass(rects, |a, b| horizontal_merge_candidate(a, b));
            }
            if self.config.merge_big_small {
                rects = merge_until_fixed_point(rects, big_small_merge_candidate);
            }
        }

        if self.config.refine {
            rects = rects
                .into_iter()
                .map(|r| {
                    let mut r = r;
                    if self.config.refine_by_shape {
                        r = refine_by_shape(&morphed, r);
                    }
                    if self.config.refine_by_grad {
                        if let Some(grad_diff) = grad_diff {
                            r = refine_by_gradient(grad_diff, &morphed, r);
                        }
                    }
                    fit_to_foreground(&morphed, r)
                })
                .collect();
        }

        let stable_rects = self.stable.update(&rects);
        (rects, stable_rects)
    }

    fn falls_in_char_region(&self, r: &Rect) -> bool {
        self.config
            .char_region_rects
            .iter()
            .any(|cr| r.overlap_ratio_to_self(cr) >= self.config.min_area_ratio_in_char_region)
    }

    /// Rejects a rectangle as a likely shadow when its interior
    /// correlates strongly with the reconstructed background: shadows
    /// darken the background's texture without replacing it, so the
    /// per-channel shape survives almost unchanged.
    fn is_shadow_by_correlation(&self, r: &Rect, image: &Frame, back: &Frame) -> bool {
        let c = image.channels() as usize;
        let clamped = r.clamped(image.width() as i32, image.height() as i32);
        if clamped.area() == 0 {
            return false;
        }
        let mut rhos = vec![0.0f64; c];
        for ch in 0..c {
            let mut a = Vec::with_capacity(clamped.area() as usize);
            let mut b = Vec::with_capacity(clamped.area() as usize);
            for row in 0..clamped.h {
                let y = (clamped.y + row) as u32;
                for col in 0..clamped.w {
                    let x = (clamped.x + col) as u32;
                    let idx = (y as usize * image.width() as usize + x as usize) * c + ch;
                    a.push(image.pixels()[idx] as f64);
                    b.push(back.pixels()[idx] as f64);
                }
            }
            rhos[ch] = pearson_correlation(&a, &b);
        }

        if c == 3 {
            let sum: f64 = rhos.iter().sum();
            let high_count = rhos.iter().filter(|&&rho| rho > self.config.corr_ratio_high_thresh).count();
            let all_low = rhos.iter().all(|&rho| rho > self.config.corr_ratio_low_thresh);
            sum > self.config.corr_ratio_sum_thresh || high_count >= 2 || all_low
        } else {
            rhos[0] > self.config.corr_ratio_low_thresh
        }
    }
}

fn vertical_merge_candidate(a: &Rect, b: &Rect) -> bool {
    let inter = a.intersection(b);
    if inter.w <= 0 {
        return false;
    }
    let overlap_a = inter.w as f64 / a.w.max(1) as f64;
    let overlap_b = inter.w as f64 / b.w.max(1) as f64;
    if overlap_a < VERT_MERGE_OVERLAP && overlap_b < VERT_MERGE_OVERLAP {
        return false;
    }
    let union = a.union(b);
    (union.h as f64) <= VERT_MERGE_ASPECT * union.w.max(1) as f64
}

fn horizontal_merge_candidate(a: &Rect, b: &Rect) -> bool {
    let inter = a.intersection(b);
    if inter.h <= 0 {
        return false;
    }
    let overlap_a = inter.h as f64 / a.h.max(1) as f64;
    let overlap_b = inter.h as f64 / b.h.max(1) as f64;
    if overlap_a < HORI_MERGE_OVERLAP && overlap_b < HORI_MERGE_OVERLAP {
        return false;
    }
    let union = a.union(b);
    (union.w as f64) <= HORI_MERGE_ASPECT * union.h.max(1) as f64
}

fn big_small_merge_candidate(a: &Rect, b: &Rect) -> bool {
    let inter = a.intersection(b).area();
    if inter == 0 {
        return false;
    }
    let (big, small) = if a.area() >= b.area() { (a, b) } else { (b, a) };
    inter as f64 / big.area().max(1) as f64 >= BIG_SMALL_BIG_RATIO || inter as f64 / small.area().max(1) as f64 >= BIG_SMALL_SMALL_RATIO
}

/// Runs one pass over all pairs, merging (via union) the first
/// candidate pair found and restarting, until no mergeable pair remains.
fn merge_pass(mut rects: Vec<Rect>, candidate: impl Fn(&Rect, &Rect) -> bool) -> Vec<Rect> {
    loop {
        let mut merged_at = None;
        'search: for i in 0..rects.len() {
            for j in (i + 1)..rects.len() {
                if candidate(&rects[i], &rects[j]) {
                    merged_at = Some((i, j));
                    break 'search;
                }
            }
        }
        match merged_at {
            Some((i, j)) => {
                let union = rects[i].union(&rects[j]);
                rects.remove(j);
                rects.remove(i);
                rects.push(union);
            }
            None => return rects,
        }
    }
}

fn merge_until_fixed_point(mut rects: Vec<Rect>, candidate: impl Fn(&Rect, &Rect) -> bool + Copy) -> Vec<Rect> {
    loop {
        let before = rects.len();
        rects = merge_pass(rects, candidate);
        if rects.len() == before {
            return rects;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn solid_rect_mask(w: u32, h: u32, rect: Rect) -> GrayImage {
        let mut mask = GrayImage::zeros(w, h);
        for y in rect.y..rect.y + rect.h {
            for x in rect.x..rect.x + rect.w {
                mask.set(x as u32, y as u32, 255);
            }
        }
        mask
    }

    #[test]
    fn extracts_a_single_solid_rectangle() {
        let mut extractor = BlobExtractor::new(ExtractorConfig {
            merge: false,
            ..ExtractorConfig::default()
        });
        let mask = solid_rect_mask(160, 120, Rect::new(65, 105, 30, 30));
        let (rects, _stable) = extractor.proc_simple(&mask);
        assert_eq!(rects.len(), 1);
        let r = rects[0];
        let area = r.area() as f64;
        assert!((area - 900.0).abs() / 900.0 < 0.5);
        let center = r.center();
        assert!((center.x - 80.0).abs() < 6.0);
        assert!((center.y - 120.0).abs() < 6.0);
    }

    #[test]
    fn tiny_noise_blobs_are_filtered_by_min_area() {
        let mut extractor = BlobExtractor::new(ExtractorConfig::default());
        let mut mask = GrayImage::zeros(100, 100);
        mask.set(5, 5, 255);
        let (rects, _) = extractor.proc_simple(&mask);
        assert!(rects.is_empty());
    }

    #[test]
    fn vertical_merge_joins_two_stacked_rectangles() {
        assert!(vertical_merge_candidate(&Rect::new(10, 10, 20, 10), &Rect::new(10, 21, 20, 10)));
    }

    #[test]
    fn stable_rects_emerge_after_21_identical_frames() {
        let mut extractor = BlobExtractor::new(ExtractorConfig {
            merge: false,
            ..ExtractorConfig::default()
        });
        let mask = solid_rect_mask(120, 120, Rect::new(30, 30, 40, 40));
        let mut last_stable_len = 0;
        for frame in 1..=25 {
            let (_rects, stable) = extractor.proc_simple(&mask);
            if frame >= 21 {
                last_stable_len = stable.len();
            }
        }
        assert_eq!(last_stable_len, 1);
    }
}

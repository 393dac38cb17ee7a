// Copyright 2026 the framewatch authors under the terms of the MIT License
// as detailed in the accompanying file README.md or
// <http://opensource.org/licenses/MIT>.

//! Minimal in-house implementations of the pixel-level primitives the
//! blob extractor and `VisualInfo` treat as black boxes: blur, median,
//! morphology, a Sobel-like gradient, and external-contour extraction.
//!
//! These are deliberately not a general-purpose image-processing
//! library — each function does exactly the one thing the algorithms in
//! [`crate::blob`] and [`crate::visual_info`] need, and no more.

mod contours;
mod morphology;

pub use contours::find_external_rects;
pub use morphology::{dilate_ellipse, erode_ellipse, median_blur3};

use crate::geometry::Rect;

/// A single-channel byte image, row-major, used for masks, grayscale
/// frames and gradient maps alike.
#[derive(Clone, Debug)]
pub struct GrayImage {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
}

impl GrayImage {
    pub fn new(width: u32, height: u32, data: Vec<u8>) -> Self {
        debug_assert_eq!(data.len(), width as usize * height as usize);
        GrayImage { width, height, data }
    }

    pub fn zeros(width: u32, height: u32) -> Self {
        GrayImage {
            width,
            height,
            data: vec![0u8; width as usize * height as usize],
        }
    }

    #[inline]
    pub fn get(&self, x: i32, y: i32) -> u8 {
        if x < 0 || y < 0 || x >= self.width as i32 || y >= self.height as i32 {
            0
        } else {
            self.data[(y as u32 * self.width + x as u32) as usize]
        }
    }

    #[inline]
    pub fn set(&mut self, x: u32, y: u32, v: u8) {
        self.data[(y * self.width + x) as usize] = v;
    }

    pub fn count_nonzero(&self) -> usize {
        self.data.iter().filter(|&&v| v != 0).count()
    }
}

/// 3x3 box blur, replicating edge pixels.
pub fn box_blur3(img: &GrayImage) -> GrayImage {
    let (w, h) = (img.width as i32, img.height as i32);
    let mut out = GrayImage::zeros(img.width, img.height);
    for y in 0..h {
        for x in 0..w {
            let mut sum = 0u32;
            for dy in -1..=1 {
                for dx in -1..=1 {
                    sum += img.get(x + dx, y + dy) as u32;
                }
            }
            out.set(x as u32, y as u32, (sum / 9) as u8);
        }
    }
    out
}

/// Sobel-like gradient magnitude, thresholded to a binary edge map.
pub fn gradient_magnitude_threshold(img: &GrayImage, threshold: u32) -> GrayImage {
    let (w, h) = (img.width as i32, img.height as i32);
    let mut out = GrayImage::zeros(img.width, img.height);
    for y in 0..h {
        for x in 0..w {
            let gx = i32::from(img.get(x + 1, y - 1)) + 2 * i32::from(img.get(x + 1, y)) + i32::from(img.get(x + 1, y + 1))
                - i32::from(img.get(x - 1, y - 1))
                - 2 * i32::from(img.get(x - 1, y))
                - i32::from(img.get(x - 1, y + 1));
            let gy = i32::from(img.get(x - 1, y + 1)) + 2 * i32::from(img.get(x, y + 1)) + i32::from(img.get(x + 1, y + 1))
                - i32::from(img.get(x - 1, y - 1))
                - 2 * i32::from(img.get(x, y - 1))
                - i32::from(img.get(x + 1, y - 1));
            let mag = ((gx * gx + gy * gy) as f64).sqrt() as u32;
            out.set(x as u32, y as u32, if mag > threshold { 255 } else { 0 });
        }
    }
    out
}

/// `a AND NOT b`, pixel-wise, over two binary masks of equal size.
pub fn and_not(a: &GrayImage, b: &GrayImage) -> GrayImage {
    debug_assert_eq!((a.width, a.height), (b.width, b.height));
    let data = a
        .data
        .iter()
        .zip(b.data.iter())
        .map(|(&av, &bv)| if av != 0 && bv == 0 { 255 } else { 0 })
        .collect();
    GrayImage::new(a.width, a.height, data)
}

/// Pixel-wise `a OR b` over two binary masks of equal size.
pub fn or(a: &GrayImage, b: &GrayImage) -> GrayImage {
    debug_assert_eq!((a.width, a.height), (b.width, b.height));
    let data = a
        .data
        .iter()
        .zip(b.data.iter())
        .map(|(&av, &bv)| if av != 0 || bv != 0 { 255 } else { 0 })
        .collect();
    GrayImage::new(a.width, a.height, data)
}

/// Computes the bounding rectangle of the foreground run on each row of
/// `mask` restricted to `rect`: the start/end column of the first and
/// last nonzero pixel in that row. Used by the shape-based shadow
/// refinement to decide whether a row is a "narrow single run".
pub fn row_runs(mask: &GrayImage, rect: Rect) -> Vec<Option<(i32, i32)>> {
    let mut rows = Vec::with_capacity(rect.h.max(0) as usize);
    for row in 0..rect.h {
        let y = rect.y + row;
        let mut first = None;
        let mut last = None;
        for col in 0..rect.w {
            let x = rect.x + col;
            if mask.get(x, y) != 0 {
                if first.is_none() {
                    first = Some(col);
                }
                last = Some(col);
            }
        }
        rows.push(first.zip(last));
    }
    rows
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn box_blur_of_constant_image_is_constant() {
        let img = GrayImage::new(10, 10, vec![42u8; 100]);
        let blurred = box_blur3(&img);
        assert!(blurred.data.iter().all(|&v| v == 42));
    }

    #[test]
    fn and_not_removes_common_pixels() {
        let a = GrayImage::new(2, 1, vec![255, 255]);
        let b = GrayImage::new(2, 1, vec![255, 0]);
        let r = and_not(&a, &b);
        assert_eq!(r.data, vec![0, 255]);
    }
}

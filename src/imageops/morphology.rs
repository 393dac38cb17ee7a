// Copyright 2026 the framewatch authors under the terms of the MIT License
// as detailed in the accompanying file README.md or
// <http://opensource.org/licenses/MIT>.

use super::GrayImage;

/// 3x3 median filter over a binary mask (the median of nine `{0, 255}`
/// values is just "majority vote").
pub fn median_blur3(img: &GrayImage) -> GrayImage {
    let (w, h) = (img.width as i32, img.height as i32);
    let mut out = GrayImage::zeros(img.width, img.height);
    for y in 0..h {
        for x in 0..w {
            let mut nonzero = 0;
            for dy in -1..=1 {
                for dx in -1..=1 {
                    if img.get(x + dx, y + dy) != 0 {
                        nonzero += 1;
                    }
                }
            }
            out.set(x as u32, y as u32, if nonzero >= 5 { 255 } else { 0 });
        }
    }
    out
}

/// Offsets of an ellipse structuring element inscribed in a
/// `(2r+1)x(2r+1)` bounding box.
fn ellipse_offsets(radius: i32) -> Vec<(i32, i32)> {
    let mut offsets = Vec::new();
    let r2 = (radius * radius) as f64;
    for dy in -radius..=radius {
        for dx in -radius..=radius {
            // Axis-aligned ellipse equation normalized to the bounding
            // circle since the kernel here is always a square bbox.
            if (dx * dx) as f64 + (dy * dy) as f64 <= r2 + 0.5 {
                offsets.push((dx, dy));
            }
        }
    }
    offsets
}

/// Dilates a binary mask with an ellipse structuring element of
/// diameter `2*radius + 1`.
pub fn dilate_ellipse(img: &GrayImage, radius: i32) -> GrayImage {
    let offsets = ellipse_offsets(radius);
    let (w, h) = (img.width as i32, img.height as i32);
    let mut out = GrayImage::zeros(img.width, img.height);
    for y in 0..h {
        for x in 0..w {
            let mut hit = false;
            for &(dx, dy) in &offsets {
                if img.get(x + dx, y + dy) != 0 {
                    hit = true;
                    break;
                }
            }
            out.set(x as u32, y as u32, if hit { 255 } else { 0 });
        }
    }
    out
}

/// Erodes a binary mask with an ellipse structuring element of diameter
/// `2*radius + 1`.
pub fn erode_ellipse(img: &GrayImage, radius: i32) -> GrayImage {
    let offsets = ellipse_offsets(radius);
    let (w, h) = (img.width as i32, img.height as i32);
    let mut out = GrayImage::zeros(img.width, img.height);
    for y in 0..h {
        for x in 0..w {
            let mut all_set = true;
            for &(dx, dy) in &offsets {
                if img.get(x + dx, y + dy) == 0 {
                    all_set = false;
                    break;
                }
            }
            out.set(x as u32, y as u32, if all_set { 255 } else { 0 });
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dilate_grows_a_single_pixel() {
        let mut img = GrayImage::zeros(20, 20);
        img.set(10, 10, 255);
        let dilated = dilate_ellipse(&img, 2);
        assert!(dilated.count_nonzero() > 1);
        assert_eq!(dilated.get(10, 10), 255);
    }

    #[test]
    fn erode_then_dilate_removes_isolated_noise() {
        let mut img = GrayImage::zeros(30, 30);
        img.set(5, 5, 255);
        for y in 15..25 {
            for x in 15..25 {
                img.set(x, y, 255);
            }
        }
        let eroded = erode_ellipse(&img, 1);
        assert_eq!(eroded.get(5, 5), 0);
        assert!(eroded.get(20, 20) != 0);
    }
}

// Copyright 2026 the framewatch authors under the terms of the MIT License
// as detailed in the accompanying file README.md or
// <http://opensource.org/licenses/MIT>.

use super::GrayImage;
use crate::geometry::Rect;

/// Finds the bounding rectangles of the external (8-connected) contours
/// of a binary mask. The blob extractor only ever needs bounding boxes,
/// never contour point lists, so a flood-fill connected-components pass
/// is sufficient and considerably simpler than full contour tracing.
pub fn find_external_rects(mask: &GrayImage) -> Vec<Rect> {
    let (w, h) = (mask.width as usize, mask.height as usize);
    let mut visited = vec![false; w * h];
    let mut rects = Vec::new();
    let mut stack = Vec::new();

    for y0 in 0..h {
        for x0 in 0..w {
            let idx0 = y0 * w + x0;
            if visited[idx0] || mask.data[idx0] == 0 {
                continue;
            }
            stack.clear();
            stack.push((x0 as i32, y0 as i32));
            visited[idx0] = true;

            let (mut min_x, mut min_y) = (x0 as i32, y0 as i32);
            let (mut max_x, mut max_y) = (x0 as i32, y0 as i32);

            while let Some((x, y)) = stack.pop() {
                min_x = min_x.min(x);
                min_y = min_y.min(y);
                max_x = max_x.max(x);
                max_y = max_y.max(y);

                for dy in -1..=1 {
                    for dx in -1..=1 {
                        if dx == 0 && dy == 0 {
                            continue;
                        }
                        let (nx, ny) = (x + dx, y + dy);
                        if nx < 0 || ny < 0 || nx >= w as i32 || ny >= h as i32 {
                            continue;
                        }
                        let nidx = ny as usize * w + nx as usize;
                        if !visited[nidx] && mask.data[nidx] != 0 {
                            visited[nidx] = true;
                            stack.push((nx, ny));
                        }
                    }
                }
            }

            rects.push(Rect::new(min_x, min_y, max_x - min_x + 1, max_y - min_y + 1));
        }
    }
    rects
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_single_rectangular_blob() {
        let mut mask = GrayImage::zeros(20, 20);
        for y in 5..10 {
            for x in 5..12 {
                mask.set(x, y, 255);
            }
        }
        let rects = find_external_rects(&mask);
        assert_eq!(rects.len(), 1);
        assert_eq!(rects[0], Rect::new(5, 5, 7, 5));
    }

    #[test]
    fn separate_blobs_yield_separate_rects() {
        let mut mask = GrayImage::zeros(20, 20);
        mask.set(2, 2, 255);
        mask.set(15, 15, 255);
        let rects = find_external_rects(&mask);
        assert_eq!(rects.len(), 2);
    }

    #[test]
    fn redrawing_extracted_rects_reextracts_the_same_rects() {
        let mut mask = GrayImage::zeros(40, 40);
        for y in 5..15 {
            for x in 5..20 {
                mask.set(x, y, 255);
            }
        }
        for y in 25..35 {
            for x in 22..30 {
                mask.set(x, y, 255);
            }
        }
        let first = find_external_rects(&mask);

        let mut redrawn = GrayImage::zeros(40, 40);
        for r in &first {
            for y in r.y..r.y + r.h {
                for x in r.x..r.x + r.w {
                    redrawn.set(x as u32, y as u32, 255);
                }
            }
        }
        let mut second = find_external_rects(&redrawn);
        let mut first_sorted = first.clone();
        first_sorted.sort_by_key(|r| (r.x, r.y));
        second.sort_by_key(|r| (r.x, r.y));
        assert_eq!(first_sorted, second);
    }
}

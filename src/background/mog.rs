// Copyright 2026 the framewatch authors under the terms of the MIT License
// as detailed in the accompanying file README.md or
// <http://opensource.org/licenses/MIT>.

//! A per-pixel mixture of up to `K = 4` Gaussians over intensity
//! (grayscale) or color, with online weight/mean/variance updates and a
//! background-prefix foreground rule.

use crate::error::{CoreError, CoreResult, FrameShape};
use crate::frame::Frame;
use crate::geometry::Rect;
use crate::imageops::GrayImage;

use super::{BackgroundModel, BackgroundUpdate};

const K: usize = 4;
const MAX_COUNT: u32 = 1000;
const THRES_FORE_BACK: f32 = 0.7;
const THRES_SQR_MAHA_DIST: f32 = 2.5 * 2.5;
const INIT_WEIGHT: f32 = 0.05;
const WEIGHT_EPSILON: f32 = f32::EPSILON;

/// The two numeric regimes this model supports, selecting how
/// aggressively a pixel must differ from the model before it is treated
/// as a brand-new mixture component.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum MogProfile {
    /// `init_std=30, min_std=15` — tolerant of noisy cameras.
    Relaxed,
    /// `init_std=15, min_std=8` — tighter, for cleaner sources.
    Strict,
}

impl MogProfile {
    fn params(self) -> (f32, f32, f32) {
        // (init_std, init_var, min_var)
        match self {
            MogProfile::Relaxed => (30.0, 900.0, 225.0),
            MogProfile::Strict => (15.0, 225.0, 64.0),
        }
    }
}

#[derive(Clone, Copy, Debug)]
struct MixSlot {
    sort_key: f32,
    weight: f32,
    mean: [f32; 3],
    var: [f32; 3],
}

impl MixSlot {
    const EMPTY: MixSlot = MixSlot {
        sort_key: 0.0,
        weight: 0.0,
        mean: [0.0; 3],
        var: [0.0; 3],
    };
}

/// Mixture-of-Gaussians background model.
pub struct Mog {
    width: u32,
    height: u32,
    channels: u8,
    profile: MogProfile,
    frame_count: u32,
    slots: Vec<MixSlot>,
}

impl Mog {
    pub fn new(profile: MogProfile) -> Self {
        Mog {
            width: 0,
            height: 0,
            channels: 0,
            profile,
            frame_count: 0,
            slots: Vec::new(),
        }
    }

    fn check_shape(&self, frame: &Frame) -> CoreResult<()> {
        if frame.width() != self.width || frame.height() != self.height || frame.channels() != self.channels {
            return Err(CoreError::ShapeMismatch {
                expected: FrameShape {
                    width: self.width,
                    height: self.height,
                    channels: self.channels,
                },
                actual: frame.shape(),
            });
        }
        Ok(())
    }

    fn build_freeze_mask(&self, freeze_rects: &[Rect]) -> Vec<bool> {
        let mut mask = vec![false; self.width as usize * self.height as usize];
        for r in freeze_rects {
            let clamped = r.clamped(self.width as i32, self.height as i32);
            for y in clamped.y..clamped.y + clamped.h {
                for x in clamped.x..clamped.x + clamped.w {
                    mask[y as usize * self.width as usize + x as usize] = true;
                }
            }
        }
        mask
    }
}

impl BackgroundModel for Mog {
    fn init(&mut self, frame: &Frame) -> CoreResult<()> {
        self.width = frame.width();
        self.height = frame.height();
        self.channels = frame.channels();
        self.frame_count = 0;
        self.slots = vec![MixSlot::EMPTY; self.width as usize * self.height as usize * K];
        Ok(())
    }

    fn update(&mut self, frame: &Frame, freeze_rects: &[Rect]) -> CoreResult<BackgroundUpdate> {
        self.check_shape(frame)?;
        self.frame_count = (self.frame_count + 1).min(MAX_COUNT);
        let alpha = 1.0_f32 / self.frame_count as f32;
        let (init_std, init_var, min_var) = self.profile.params();
        let sk0 = INIT_WEIGHT / init_std;
        let c = self.channels as usize;
        let vt = THRES_SQR_MAHA_DIST;

        let freeze_mask = self.build_freeze_mask(freeze_rects);

        let mut fg = vec![0u8; self.width as usize * self.height as usize];
        let mut back = vec![0u8; self.width as usize * self.height as usize * c];
        let pixels = frame.pixels();

        for pix_idx in 0..(self.width as usize * self.height as usize) {
            let mut pixel = [0.0f32; 3];
            for (ch, value) in pixel.iter_mut().take(c).enumerate() {
                *value = pixels[pix_idx * c + ch] as f32;
            }
            let slots = &mut self.slots[pix_idx * K..pix_idx * K + K];

            let frozen = freeze_mask[pix_idx];
            let (k_hit, k_fg) = if frozen {
                classify_readonly(slots, &pixel, c, vt, THRES_FORE_BACK)
            } else {
                update_pixel(slots, &pixel, c, vt, alpha, min_var, INIT_WEIGHT, sk0, init_var, THRES_FORE_BACK)
            };

            fg[pix_idx] = if k_hit.map_or(true, |k| k >= k_fg) { 255 } else { 0 };
            for ch in 0..c {
                back[pix_idx * c + ch] = slots[0].mean[ch].round().clamp(0.0, 255.0) as u8;
            }
        }

        let background = Frame::new(back, self.width, self.height, self.channels, frame.time_ms(), frame.frame_index())?;
        Ok(BackgroundUpdate {
            foreground: GrayImage::new(self.width, self.height, fg),
            background,
        })
    }

    fn reset(&mut self) {
        for slot in &mut self.slots {
            *slot = MixSlot::EMPTY;
        }
        self.frame_count = 0;
    }
}

/// Runs the full update rule (hit/miss, renormalize, bubble-sort,
/// background-prefix) at one pixel. Returns `(hit_slot_index,
/// foreground_boundary_index)`; `hit_slot_index` is `None` on a total
/// miss, which is always foreground regardless of the boundary.
#[allow(clippy::too_many_arguments)]
fn update_pixel(
    slots: &mut [MixSlot],
    pixel: &[f32; 3],
    channels: usize,
    vt: f32,
    alpha: f32,
    min_var: f32,
    init_weight: f32,
    sk0: f32,
    init_var: f32,
    thres_fore_back: f32,
) -> (Option<usize>, usize) {
    let k_count = slots.len();
    let mut k_hit = None;

    for k in 0..k_count {
        if slots[k].weight < WEIGHT_EPSILON {
            break;
        }
        let mut d2 = 0.0f32;
        let mut var_sum = 0.0f32;
        for ch in 0..channels {
            let diff = pixel[ch] - slots[k].mean[ch];
            d2 += diff * diff;
            var_sum += slots[k].var[ch];
        }
        // Grayscale reduces to `d2 < vt*var` directly; color sums
        // variance across channels, which is what the Mahalanobis test
        // degenerates to when the per-channel covariance is diagonal.
        if d2 < vt * var_sum {
            for ch in 0..channels {
                let diff = pixel[ch] - slots[k].mean[ch];
                slots[k].mean[ch] += alpha * diff;
                slots[k].var[ch] = (slots[k].var[ch] + alpha * (diff * diff - slots[k].var[ch])).max(min_var);
            }
            slots[k].weight += alpha * (1.0 - slots[k].weight);
            let trace: f32 = slots[k].var[..channels].iter().sum();
            slots[k].sort_key = slots[k].weight / trace.sqrt();

            let mut pos = k;
            while pos > 0 && slots[pos - 1].sort_key < slots[pos].sort_key {
                slots.swap(pos - 1, pos);
                pos -= 1;
            }
            k_hit = Some(pos);
            break;
        }
    }

    if k_hit.is_none() {
        // Replace the weakest (last active, or last overall) slot.
        let mut replace_at = k_count - 1;
        for k in 0..k_count {
            if slots[k].weight < WEIGHT_EPSILON {
                replace_at = k;
                break;
            }
        }
        slots[replace_at] = MixSlot {
            sort_key: sk0,
            weight: init_weight,
            mean: *pixel,
            var: [init_var; 3],
        };
        k_hit = Some(replace_at);
    }

    let wsum: f32 = slots.iter().map(|s| s.weight).sum();
    let scale = if wsum > WEIGHT_EPSILON { 1.0 / wsum } else { 1.0 };
    for slot in slots.iter_mut() {
        slot.weight *= scale;
        slot.sort_key *= scale;
    }

    let mut running = 0.0f32;
    let mut boundary = k_count;
    for (k, slot) in slots.iter().enumerate() {
        running += slot.weight;
        if running > thres_fore_back {
            boundary = k + 1;
            break;
        }
    }
    (k_hit, boundary)
}

fn classify_readonly(slots: &[MixSlot], pixel: &[f32; 3], channels: usize, vt: f32, thres_fore_back: f32) -> (Option<usize>, usize) {
    let mut k_hit = None;
    for (k, slot) in slots.iter().enumerate() {
        if slot.weight < WEIGHT_EPSILON {
            break;
        }
        let mut d2 = 0.0f32;
        let mut var_sum = 0.0f32;
        for ch in 0..channels {
            let diff = pixel[ch] - slot.mean[ch];
            d2 += diff * diff;
            var_sum += slot.var[ch];
        }
        if d2 < vt * var_sum {
            k_hit = Some(k);
            break;
        }
    }
    let mut running = 0.0f32;
    let mut boundary = slots.len();
    for (k, slot) in slots.iter().enumerate() {
        running += slot.weight;
        if running > thres_fore_back {
            boundary = k + 1;
            break;
        }
    }
    (k_hit, boundary)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn constant_frame(value: u8, w: u32, h: u32) -> Frame {
        Frame::new(vec![value; (w * h) as usize], w, h, 1, 0, 0).unwrap()
    }

    #[test]
    fn constant_frame_becomes_empty_foreground_after_warmup() {
        let mut mog = Mog::new(MogProfile::Relaxed);
        let frame = constant_frame(128, 32, 24);
        mog.init(&frame).unwrap();
        let mut last_fg_count = usize::MAX;
        for i in 0..20 {
            let update = mog.update(&frame, &[]).unwrap();
            last_fg_count = update.foreground.count_nonzero();
            if i >= 1 {
                assert_eq!(last_fg_count, 0, "frame {} should be background", i);
            }
            assert!(update.background.pixels().iter().all(|&p| p == 128));
        }
        assert_eq!(last_fg_count, 0);
    }

    #[test]
    fn weights_sum_to_one_after_update() {
        let mut mog = Mog::new(MogProfile::Relaxed);
        let frame = constant_frame(100, 8, 8);
        mog.init(&frame).unwrap();
        mog.update(&frame, &[]).unwrap();
        for pix in 0..64 {
            let slots = &mog.slots[pix * K..pix * K + K];
            let sum: f32 = slots.iter().map(|s| s.weight).sum();
            assert!((sum - 1.0).abs() < 1e-4, "sum={}", sum);
            for w in 1..K {
                assert!(slots[w - 1].weight >= slots[w].weight - 1e-6);
            }
        }
    }

    #[test]
    fn shape_mismatch_is_an_error() {
        let mut mog = Mog::new(MogProfile::Relaxed);
        mog.init(&constant_frame(10, 16, 16)).unwrap();
        let bad = constant_frame(10, 8, 8);
        assert!(mog.update(&bad, &[]).is_err());
    }

    #[test]
    fn moving_block_is_detected_as_foreground() {
        let mut mog = Mog::new(MogProfile::Relaxed);
        let bg = constant_frame(128, 160, 120);
        mog.init(&bg).unwrap();
        for _ in 0..25 {
            mog.update(&bg, &[]).unwrap();
        }
        let mut pixels = vec![128u8; 160 * 120];
        for y in 105..135 {
            for x in 65..95 {
                pixels[y * 160 + x] = 200;
            }
        }
        let moving = Frame::new(pixels, 160, 120, 1, 21_000, 21).unwrap();
        let update = mog.update(&moving, &[]).unwrap();
        assert!(update.foreground.count_nonzero() > 0);
    }
}

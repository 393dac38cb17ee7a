// Copyright 2026 the framewatch authors under the terms of the MIT License
// as detailed in the accompanying file README.md or
// <http://opensource.org/licenses/MIT>.

//! A sample-bank background model: each pixel keeps `N` recently-seen
//! values, and a new pixel is background if it is close to enough of
//! them. Background pixels occasionally overwrite one of their own
//! samples, and occasionally propagate their value into a neighbor's
//! bank, so the model both adapts and spreads spatially without ever
//! computing a running mean.

use rand::{RngCore, SeedableRng};
use rand_xoshiro::Xoshiro256PlusPlus;

use crate::error::{CoreError, CoreResult, FrameShape};
use crate::frame::Frame;
use crate::geometry::Rect;
use crate::util::EIGHT_NEIGHBORS;
use crate::imageops::GrayImage;

use super::{BackgroundModel, BackgroundUpdate};

/// Tunable knobs for one [`Vibe`] instance. The three factories below
/// mirror the channel-specific presets used for color frames, grayscale
/// frames, and pre-thresholded gradient maps.
#[derive(Clone, Copy, Debug)]
pub struct VibeConfig {
    pub num_samples: usize,
    pub min_match_dist: u8,
    pub min_num_of_match_count: usize,
    pub sub_sample_interval: u32,
}

impl VibeConfig {
    pub fn rgb() -> Self {
        VibeConfig {
            num_samples: 20,
            min_match_dist: 40,
            min_num_of_match_count: 2,
            sub_sample_interval: 16,
        }
    }

    pub fn gray() -> Self {
        VibeConfig {
            num_samples: 20,
            min_match_dist: 10,
            min_num_of_match_count: 2,
            sub_sample_interval: 16,
        }
    }

    pub fn gradient() -> Self {
        VibeConfig {
            num_samples: 20,
            min_match_dist: 40,
            min_num_of_match_count: 2,
            sub_sample_interval: 16,
        }
    }
}

const RAND_BUFFER_LEN: usize = 4099;

/// A precomputed, cyclically-reused buffer of random values in
/// `[0, modulus)`. Drawing from a buffer filled once at construction
/// time instead of calling the RNG per pixel keeps `update` cheap and,
/// since the buffer and the pixel traversal order are both fixed, makes
/// the whole model's output a deterministic function of the seed.
struct RandCycle {
    values: Vec<u32>,
    cursor: usize,
}

impl RandCycle {
    fn new(modulus: u32, rng: &mut Xoshiro256PlusPlus) -> Self {
        let values = (0..RAND_BUFFER_LEN).map(|_| rng.next_u32() % modulus.max(1)).collect();
        RandCycle { values, cursor: 0 }
    }

    #[inline]
    fn next(&mut self) -> u32 {
        let v = self.values[self.cursor];
        self.cursor = (self.cursor + 1) % self.values.len();
        v
    }

    fn reset_cursor(&mut self) {
        self.cursor = 0;
    }
}

/// Sample-bank background model.
pub struct Vibe {
    width: u32,
    height: u32,
    channels: u8,
    config: VibeConfig,
    samples: Vec<u8>,
    rand_neighbor: RandCycle,
    rand_slot: RandCycle,
    rand_subsample: RandCycle,
}

impl Vibe {
    pub fn new(config: VibeConfig, seed: u64) -> Self {
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(seed);
        let rand_neighbor = RandCycle::new(EIGHT_NEIGHBORS.len() as u32 + 1, &mut rng);
        let rand_slot = RandCycle::new(config.num_samples as u32, &mut rng);
        let rand_subsample = RandCycle::new(config.sub_sample_interval, &mut rng);
        Vibe {
            width: 0,
            height: 0,
            channels: 0,
            config,
            samples: Vec::new(),
            rand_neighbor,
            rand_slot,
            rand_subsample,
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

    #[inline]
    fn clamp_coord(v: i32, max_exclusive: i32) -> i32 {
        v.clamp(0, max_exclusive - 1)
    }

    /// The neighbor offset chosen for a seed/propagation draw: index `0`
    /// of `0..=8` means "self", `1..=8` index into [`EIGHT_NEIGHBORS`].
    fn neighbor_of(&self, x: i32, y: i32, pick: u32) -> (i32, i32) {
        if pick == 0 {
            (x, y)
        } else {
            let (dx, dy) = EIGHT_NEIGHBORS[(pick - 1) as usize % EIGHT_NEIGHBORS.len()];
            (
                Self::clamp_coord(x + dx, self.width as i32),
                Self::clamp_coord(y + dy, self.height as i32),
            )
        }
    }

    fn sample_slice(&self, pix_idx: usize) -> &[u8] {
        let c = self.channels as usize;
        let n = self.config.num_samples;
        &self.samples[pix_idx * n * c..(pix_idx + 1) * n * c]
    }

    fn matches(&self, pix_idx: usize, pixel: &[u8]) -> usize {
        let c = self.channels as usize;
        let n = self.config.num_samples;
        let slot = self.sample_slice(pix_idx);
        let mut count = 0;
        for s in 0..n {
            let sample = &slot[s * c..(s + 1) * c];
            let dist: u32 = (0..c)
                .map(|ch| (sample[ch] as i32 - pixel[ch] as i32).unsigned_abs())
                .sum();
            if dist < self.config.min_match_dist as u32 {
                count += 1;
                if count >= self.config.min_num_of_match_count {
                    break;
                }
            }
        }
        count
    }

    fn background_mean(&self, pix_idx: usize) -> Vec<u8> {
        let c = self.channels as usize;
        let n = self.config.num_samples;
        let slot = self.sample_slice(pix_idx);
        let mut acc = vec![0u32; c];
        for s in 0..n {
            for (ch, a) in acc.iter_mut().enumerate() {
                *a += slot[s * c + ch] as u32;
            }
        }
        acc.into_iter().map(|a| (a / n as u32) as u8).collect()
    }
}

impl BackgroundModel for Vibe {
    fn init(&mut self, frame: &Frame) -> CoreResult<()> {
        self.width = frame.width();
        self.height = frame.height();
        self.channels = frame.channels();
        let c = self.channels as usize;
        let n = self.config.num_samples;
        self.samples = vec![0u8; self.width as usize * self.height as usize * n * c];

        for y in 0..self.height as i32 {
            for x in 0..self.width as i32 {
                let pix_idx = (y as usize * self.width as usize) + x as usize;
                for s in 0..n {
                    let pick = self.rand_neighbor.next();
                    let (sx, sy) = self.neighbor_of(x, y, pick);
                    let src_idx = sy as usize * self.width as usize + sx as usize;
                    let src_pixel = &frame.pixels()[src_idx * c..(src_idx + 1) * c];
                    let dst = (pix_idx * n + s) * c;
                    self.samples[dst..dst + c].copy_from_slice(src_pixel);
                }
            }
        }
        Ok(())
    }

    fn update(&mut self, frame: &Frame, freeze_rects: &[Rect]) -> CoreResult<BackgroundUpdate> {
        self.check_shape(frame)?;
        let c = self.channels as usize;
        let n = self.config.num_samples;

        let mut freeze_mask = vec![false; self.width as usize * self.height as usize];
        for r in freeze_rects {
            let clamped = r.clamped(self.width as i32, self.height as i32);
            for y in clamped.y..clamped.y + clamped.h {
                for x in clamped.x..clamped.x + clamped.w {
                    freeze_mask[y as usize * self.width as usize + x as usize] = true;
                }
            }
        }

        let mut fg = vec![0u8; self.width as usize * self.height as usize];
        let mut back = vec![0u8; self.width as usize * self.height as usize * c];
        let pixels = frame.pixels().to_vec();

        for y in 0..self.height as i32 {
            for x in 0..self.width as i32 {
                let pix_idx = (y as usize * self.width as usize) + x as usize;
                let pixel = &pixels[pix_idx * c..(pix_idx + 1) * c];
                let count = self.matches(pix_idx, pixel);
                let is_background = count >= self.config.min_num_of_match_count;
                fg[pix_idx] = if is_background { 0 } else { 255 };

                if is_background && !freeze_mask[pix_idx] {
                    if self.rand_subsample.next() == 0 {
                        let slot = self.rand_slot.next() as usize;
                        let c_ = self.channels as usize;
                        let n_ = self.config.num_samples;
                        let dst = (pix_idx * n_ + slot) * c_;
                        self.samples[dst..dst + c_].copy_from_slice(pixel);
                    }
                    if self.rand_subsample.next() == 0 {
                        let pick = self.rand_neighbor.next();
                        let (nx, ny) = self.neighbor_of(x, y, pick);
                        let n_idx = ny as usize * self.width as usize + nx as usize;
                        if n_idx != pix_idx {
                            let slot = self.rand_slot.next() as usize;
                            let c_ = self.channels as usize;
                            let n_ = self.config.num_samples;
                            let dst = (n_idx * n_ + slot) * c_;
                            self.samples[dst..dst + c_].copy_from_slice(pixel);
                        }
                    }
                }

                let mean = self.background_mean(pix_idx);
                back[pix_idx * c..(pix_idx + 1) * c].copy_from_slice(&mean);
            }
        }

        let background = Frame::new(back, self.width, self.height, self.channels, frame.time_ms(), frame.frame_index())?;
        Ok(BackgroundUpdate {
            foreground: GrayImage::new(self.width, self.height, fg),
            background,
        })
    }

    fn reset(&mut self) {
        self.samples.iter_mut().for_each(|v| *v = 0);
        self.rand_neighbor.reset_cursor();
        self.rand_slot.reset_cursor();
        self.rand_subsample.reset_cursor();
    }
}

/// Wraps [`Vibe`] with a slow exponential-decay running mean, used as
/// the reconstructed background frame instead of the sample-bank
/// average: the mean only moves on pixels the sample bank classifies as
/// background, and not inside a frozen rectangle, so a stable foreground
/// object never bleeds into it.
pub struct ExtendedVibe {
    inner: Vibe,
    mean: Vec<f32>,
    learn_rate: f32,
}

impl ExtendedVibe {
    pub const DEFAULT_LEARN_RATE: f32 = 0.02;

    pub fn new(config: VibeConfig, seed: u64) -> Self {
        ExtendedVibe {
            inner: Vibe::new(config, seed),
            mean: Vec::new(),
            learn_rate: Self::DEFAULT_LEARN_RATE,
        }
    }

    pub fn with_learn_rate(mut self, learn_rate: f32) -> Self {
        self.learn_rate = learn_rate;
        self
    }
}

impl BackgroundModel for ExtendedVibe {
    fn init(&mut self, frame: &Frame) -> CoreResult<()> {
        self.inner.init(frame)?;
        self.mean = frame.pixels().iter().map(|&p| p as f32).collect();
        Ok(())
    }

    fn update(&mut self, frame: &Frame, freeze_rects: &[Rect]) -> CoreResult<BackgroundUpdate> {
        let mut update = self.inner.update(frame, freeze_rects)?;
        let c = self.inner.channels as usize;

        let mut freeze_mask = vec![false; self.inner.width as usize * self.inner.height as usize];
        for r in freeze_rects {
            let clamped = r.clamped(self.inner.width as i32, self.inner.height as i32);
            for y in clamped.y..clamped.y + clamped.h {
                for x in clamped.x..clamped.x + clamped.w {
                    freeze_mask[y as usize * self.inner.width as usize + x as usize] = true;
                }
            }
        }

        let pixels = frame.pixels();
        let mut back = vec![0u8; pixels.len()];
        for pix_idx in 0..(self.inner.width as usize * self.inner.height as usize) {
            let is_background = update.foreground.data[pix_idx] == 0;
            if is_background && !freeze_mask[pix_idx] {
                for ch in 0..c {
                    let i = pix_idx * c + ch;
                    let diff = pixels[i] as f32 - self.mean[i];
                    self.mean[i] += self.learn_rate * diff;
                }
            }
            for ch in 0..c {
                let i = pix_idx * c + ch;
                back[i] = self.mean[i].round().clamp(0.0, 255.0) as u8;
            }
        }

        update.background = Frame::new(back, self.inner.width, self.inner.height, self.inner.channels, frame.time_ms(), frame.frame_index())?;
        Ok(update)
    }

    fn reset(&mut self) {
        self.inner.reset();
        self.mean.iter_mut().for_each(|v| *v = 0.0);
    }
}

// Copyright 2026 the framewatch authors under the terms of the MIT License
// as detailed in the accompanying file README.md or
// <http://opensource.org/licenses/MIT>.

//! The thin orchestrator that wires a background model, `VisualInfo`,
//! `BlobExtractor`, `BlobTracker`, and an optional `StaticBlobTracker`
//! together into the single `proc`-per-frame entry point a caller
//! drives. Owns the warm-up gate, frame-decimation stride, and
//! gradient-pacing interval named in the config surface.

use log::{debug, trace};

use crate::background::BackgroundModel;
use crate::blob::BlobExtractor;
use crate::config::PipelineConfig;
use crate::error::{CoreError, CoreResult, FrameShape};
use crate::frame::Frame;
use crate::geometry::{LineSegment, Rect, RegionOfInterest, VirtualLoop};
use crate::track::{BlobTracker, CrossGeometry, StaticBlobTracker, StaticObjectInfo, TrackUpdate};
use crate::visual_info::VisualInfo;

/// Everything one `proc` call produces: the frame's candidate and stable
/// rectangles (in original-frame coordinates), the tracker's per-frame
/// updates, and any static-object reports.
pub struct FrameOutput {
    pub rects: Vec<Rect>,
    pub stable_rects: Vec<Rect>,
    pub track_updates: Vec<TrackUpdate>,
    pub static_objects: Vec<StaticObjectInfo>,
}

impl FrameOutput {
    fn empty() -> Self {
        FrameOutput {
            rects: Vec::new(),
            stable_rects: Vec::new(),
            track_updates: Vec::new(),
            static_objects: Vec::new(),
        }
    }
}

fn build_roi(width: i32, height: i32, include: &[Vec<(i32, i32)>], exclude: &[Vec<(i32, i32)>]) -> RegionOfInterest {
    if !include.is_empty() {
        RegionOfInterest::new("include", width, height, true, include)
    } else if !exclude.is_empty() {
        RegionOfInterest::new("exclude", width, height, false, exclude)
    } else {
        RegionOfInterest::new("full", width, height, false, &[])
    }
}

fn build_cross_geometry(points: &[(i32, i32)]) -> Option<CrossGeometry> {
    match points.len() {
        2 => Some(CrossGeometry::Line(LineSegment::new(points[0], points[1], None))),
        4 => Some(CrossGeometry::Loop(VirtualLoop::new([points[0], points[1], points[2], points[3]]))),
        _ => None,
    }
}

/// Owns the full per-frame pipeline: background model → `VisualInfo` →
/// `BlobExtractor` → `BlobTracker` (+ optional `StaticBlobTracker`).
pub struct MovingObjectDetector {
    visual_info: VisualInfo,
    extractor: BlobExtractor,
    tracker: BlobTracker,
    static_tracker: Option<StaticBlobTracker>,
    config: PipelineConfig,
    shape: FrameShape,
    frames_seen: u32,
    hori_scale: f64,
    vert_scale: f64,
    last_output: FrameOutput,
}

impl MovingObjectDetector {
    /// Validates `config`, builds the normalized-size ROI/cross-geometry,
    /// and initializes `model` from `first_frame` resampled to
    /// `config.norm_size`.
    pub fn init(first_frame: &Frame, model: Box<dyn BackgroundModel>, config: PipelineConfig) -> CoreResult<Self> {
        config.validate()?;

        let norm_w = config.norm_size.width as i32;
        let norm_h = config.norm_size.height as i32;
        let roi = build_roi(norm_w, norm_h, &config.include_region, &config.exclude_region);
        let cross_geometry = build_cross_geometry(&config.cross_geometry_points);

        let tracker = BlobTracker::new(
            roi,
            cross_geometry,
            config.tracker.clone(),
            config.record_mode,
            config.save_mode,
            config.multi_record,
            norm_w,
            norm_h,
        );
        let static_tracker = config
            .static_tracker
            .map(|c| StaticBlobTracker::new(c.min_static_time_in_minute, c.allowed_miss_time_in_minute));

        let mut visual_info = VisualInfo::new(model);
        let norm_first = first_frame.resample_area(config.norm_size.width, config.norm_size.height);
        visual_info.init(&norm_first)?;

        let hori_scale = first_frame.width() as f64 / config.norm_size.width as f64;
        let vert_scale = first_frame.height() as f64 / config.norm_size.height as f64;

        debug!(
            "MovingObjectDetector initialized: norm_size={}x{}, orig_size={}x{}",
            config.norm_size.width,
            config.norm_size.height,
            first_frame.width(),
            first_frame.height()
        );

        Ok(MovingObjectDetector {
            visual_info,
            extractor: BlobExtractor::new(config.extractor.clone()),
            tracker,
            static_tracker,
            shape: first_frame.shape(),
            config,
            frames_seen: 0,
            hori_scale,
            vert_scale,
            last_output: FrameOutput::empty(),
        })
    }

    /// Advances the pipeline by one frame.
    ///
    /// Frames outside the `process_every_n_frame` stride are a no-op:
    /// the previous frame's output is returned unchanged rather than
    /// re-running the (expensive) extraction/tracking steps. Frames
    /// before `build_back_count` warm-up frames update only the
    /// background model; tracking does not start until warm-up
    /// completes.
    pub fn proc(&mut self, frame: &Frame) -> CoreResult<&FrameOutput> {
        if frame.shape() != self.shape {
            return Err(CoreError::ShapeMismatch {
                expected: self.shape,
                actual: frame.shape(),
            });
        }

        let index = self.frames_seen;
        self.frames_seen += 1;

        if index % self.config.process_every_n_frame != 0 {
            trace!("frame {} skipped by process_every_n_frame stride", index);
            return Ok(&self.last_output);
        }

        let norm_frame = frame.resample_area(self.config.norm_size.width, self.config.norm_size.height);
        let full = index % self.config.update_back_interval == 0;
        let update = self.visual_info.update(&norm_frame, &[], full)?;

        if index < self.config.build_back_count {
            trace!("frame {} still warming up the background model", index);
            self.last_output = FrameOutput::empty();
            return Ok(&self.last_output);
        }

        let (rects, stable_rects) = self
            .extractor
            .proc(&update.foreground, Some(&norm_frame), Some(&update.background), Some(&update.grad_diff));

        let orig_rects: Vec<Rect> = rects.iter().map(|r| r.scaled(self.hori_scale, self.vert_scale)).collect();
        let orig_stable: Vec<Rect> = stable_rects.iter().map(|r| r.scaled(self.hori_scale, self.vert_scale)).collect();

        let track_updates = self
            .tracker
            .proc(frame.time_ms(), frame.frame_index(), &rects, &orig_rects, Some(&norm_frame), Some(&update.foreground));

        let static_objects = match &mut self.static_tracker {
            Some(tracker) => tracker.proc(frame.time_ms(), &orig_rects),
            None => Vec::new(),
        };

        debug!(
            "frame {}: {} candidate rect(s), {} track update(s)",
            index,
            rects.len(),
            track_updates.len()
        );

        self.last_output = FrameOutput {
            rects: orig_rects,
            stable_rects: orig_stable,
            track_updates,
            static_objects,
        };
        Ok(&self.last_output)
    }

    /// Forwards to `BlobTracker::final_all`, flushing every still-live
    /// track as final. Used at end-of-stream.
    pub fn finish(&mut self) -> Vec<TrackUpdate> {
        self.tracker.final_all()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::background::mog::{Mog, MogProfile};
    use crate::config::NormSize;

    fn frame(value: u8, w: u32, h: u32, index: i32) -> Frame {
        Frame::new(vec![value; (w * h) as usize], w, h, 1, index as i64 * 33, index).unwrap()
    }

    fn test_config() -> PipelineConfig {
        PipelineConfig {
            norm_size: NormSize { width: 64, height: 48 },
            update_back_interval: 4,
            build_back_count: 5,
            process_every_n_frame: 1,
            ..PipelineConfig::with_documented_defaults()
        }
    }

    #[test]
    fn rejects_a_frame_with_the_wrong_shape() {
        let first = frame(0, 64, 48, 0);
        let mut detector = MovingObjectDetector::init(&first, Box::new(Mog::new(MogProfile::Relaxed)), test_config()).unwrap();
        let wrong = Frame::new(vec![0u8; 10 * 10], 10, 10, 1, 0, 1).unwrap();
        assert!(detector.proc(&wrong).is_err());
    }

    #[test]
    fn warm_up_frames_produce_no_rectangles() {
        let first = frame(50, 64, 48, 0);
        let mut detector = MovingObjectDetector::init(&first, Box::new(Mog::new(MogProfile::Relaxed)), test_config()).unwrap();
        for i in 1..4 {
            let out = detector.proc(&frame(50, 64, 48, i)).unwrap();
            assert!(out.rects.is_empty());
        }
    }

    #[test]
    fn a_bright_square_on_a_steady_background_is_extracted_after_warm_up() {
        let first = frame(20, 64, 48, 0);
        let mut detector = MovingObjectDetector::init(&first, Box::new(Mog::new(MogProfile::Relaxed)), test_config()).unwrap();
        for i in 1..6 {
            detector.proc(&frame(20, 64, 48, i)).unwrap();
        }
        let mut pixels = vec![20u8; 64 * 48];
        for y in 15..35 {
            for x in 15..35 {
                pixels[y * 64 + x] = 220;
            }
        }
        let square = Frame::new(pixels, 64, 48, 1, 6 * 33, 6).unwrap();
        let out = detector.proc(&square).unwrap();
        assert!(!out.rects.is_empty());
    }

    #[test]
    fn finish_flushes_live_tracks() {
        let first = frame(20, 64, 48, 0);
        let mut detector = MovingObjectDetector::init(&first, Box::new(Mog::new(MogProfile::Relaxed)), test_config()).unwrap();
        for i in 1..6 {
            detector.proc(&frame(20, 64, 48, i)).unwrap();
        }
        let mut pixels = vec![20u8; 64 * 48];
        for y in 15..35 {
            for x in 15..35 {
                pixels[y * 64 + x] = 220;
            }
        }
        for i in 6..9 {
            let square = Frame::new(pixels.clone(), 64, 48, 1, i as i64 * 33, i).unwrap();
            detector.proc(&square).unwrap();
        }
        let finals = detector.finish();
        assert!(finals.iter().all(|u| u.is_final));
    }
}

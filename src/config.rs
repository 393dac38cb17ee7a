// Copyright 2026 the framewatch authors under the terms of the MIT License
// as detailed in the accompanying file README.md or
// <http://opensource.org/licenses/MIT>.

//! Plain configuration structs matching the config surface table, each
//! with a `Default` impl matching the documented defaults and a
//! `validate` that turns "config invalid" into a fatal `CoreError` at
//! construction time rather than during `proc`.

use bitflags::bitflags;
use strum::{Display, EnumString};

use crate::error::{CoreError, CoreResult};
use crate::geometry::Rect;

/// Which variant of `SnapshotHistory` a `BlobTracker` uses.
#[derive(Clone, Copy, Debug, Display, EnumString, Eq, PartialEq)]
pub enum RecordMode {
    CrossTriBound,
    CrossBottom,
    CrossLine,
    Multi,
    None,
}

impl Default for RecordMode {
    fn default() -> Self {
        RecordMode::None
    }
}

bitflags::bitflags! {
    /// Bitset selecting which images a snapshot capture materializes.
    pub struct SaveImageMode: u8 {
        const SCENE = 1;
        const SLICE = 2;
        const MASK = 4;
    }
}

impl Default for SaveImageMode {
    fn default() -> Self {
        SaveImageMode::SCENE
    }
}

/// Processing resolution the background model and blob extractor work
/// against; the original frame is retained only for snapshot cropping.
#[derive(Clone, Copy, Debug)]
pub struct NormSize {
    pub width: u32,
    pub height: u32,
}

impl Default for NormSize {
    fn default() -> Self {
        NormSize {
            width: 320,
            height: 240,
        }
    }
}

impl NormSize {
    pub fn validate(&self) -> CoreResult<()> {
        if self.width < 16 || self.height < 16 {
            return Err(CoreError::InvalidConfig(format!(
                "normalized size {}x{} is too small to process",
                self.width, self.height
            )));
        }
        Ok(())
    }
}

/// Configuration consumed by `BlobExtractor`.
#[derive(Clone, Debug)]
pub struct ExtractorConfig {
    pub min_object_area: f64,
    pub min_avg_width: f64,
    pub min_avg_height: f64,
    pub corr_ratio_check: bool,
    pub corr_ratio_sum_thresh: f64,
    pub corr_ratio_high_thresh: f64,
    pub corr_ratio_low_thresh: f64,
    pub char_region_check: bool,
    pub char_region_rects: Vec<Rect>,
    pub min_area_ratio_in_char_region: f64,
    pub merge: bool,
    pub merge_hori: bool,
    pub merge_vert: bool,
    pub merge_big_small: bool,
    pub refine: bool,
    pub refine_by_shape: bool,
    pub refine_by_grad: bool,
    pub refine_by_color: bool,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        ExtractorConfig {
            min_object_area: 50.0,
            min_avg_width: 5.0,
            min_avg_height: 5.0,
            corr_ratio_check: false,
            corr_ratio_sum_thresh: 2.7,
            corr_ratio_high_thresh: 0.85,
            corr_ratio_low_thresh: 0.8,
            char_region_check: false,
            char_region_rects: Vec::new(),
            min_area_ratio_in_char_region: 0.5,
            merge: true,
            merge_hori: true,
            merge_vert: true,
            merge_big_small: true,
            refine: false,
            refine_by_shape: false,
            refine_by_grad: false,
            refine_by_color: false,
        }
    }
}

/// Configuration consumed by `BlobTracker`'s association step.
#[derive(Clone, Debug)]
pub struct TrackerConfig {
    pub check_turn_around: bool,
    pub max_dist_rect_and_blob: f64,
    pub min_ratio_intersect_to_self: f64,
    pub min_ratio_intersect_to_blob: f64,
    pub max_history_for_dist_match: usize,
    pub min_history_size_for_output: usize,
    pub check_dir_step: u32,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        TrackerConfig {
            check_turn_around: true,
            max_dist_rect_and_blob: 15.0,
            min_ratio_intersect_to_self: 0.6,
            min_ratio_intersect_to_blob: 0.6,
            max_history_for_dist_match: 0,
            min_history_size_for_output: 2,
            check_dir_step: 4,
        }
    }
}

/// Configuration consumed by `StaticBlobTracker`. Absent (`None` in
/// `PipelineConfig`) means the orchestrator does not run one.
#[derive(Clone, Copy, Debug)]
pub struct StaticTrackerConfig {
    pub min_static_time_in_minute: f64,
    pub allowed_miss_time_in_minute: f64,
}

impl Default for StaticTrackerConfig {
    fn default() -> Self {
        StaticTrackerConfig {
            min_static_time_in_minute: 1.0,
            allowed_miss_time_in_minute: 1.0,
        }
    }
}

/// Configuration for `MultiRecord`'s bag-of-snapshots policy.
#[derive(Clone, Copy, Debug)]
pub struct MultiRecordConfig {
    pub save_interval: u32,
    pub num_saved: usize,
}

impl Default for MultiRecordConfig {
    fn default() -> Self {
        MultiRecordConfig {
            save_interval: 2,
            num_saved: 4,
        }
    }
}

/// Top-level orchestrator configuration; wraps the per-component configs
/// plus the pacing knobs named in the config table.
#[derive(Clone, Debug, Default)]
pub struct PipelineConfig {
    pub norm_size: NormSize,
    pub update_back_interval: u32,
    pub build_back_count: u32,
    pub process_every_n_frame: u32,
    pub extractor: ExtractorConfig,
    pub tracker: TrackerConfig,
    pub record_mode: RecordMode,
    pub save_mode: SaveImageMode,
    pub multi_record: MultiRecordConfig,
    /// Polygons included in the region of interest (union semantics). A
    /// two-point entry is a thickened line segment, not a polygon.
    pub include_region: Vec<Vec<(i32, i32)>>,
    /// Polygons excluded from the region of interest (complement
    /// semantics). Mutually exclusive with `include_region` in practice,
    /// but both are accepted; an empty ROI (no polygons at all) means
    /// the whole frame.
    pub exclude_region: Vec<Vec<(i32, i32)>>,
    /// The cross-geometry the tracker's snapshot history reacts to: 2
    /// points describe a `LineSegment`, 4 describe a `VirtualLoop`. Empty
    /// when `record_mode` doesn't need one.
    pub cross_geometry_points: Vec<(i32, i32)>,
    /// When present, the orchestrator also runs a `StaticBlobTracker`
    /// alongside `BlobTracker` over the same rectangle stream.
    pub static_tracker: Option<StaticTrackerConfig>,
}

impl PipelineConfig {
    pub fn validate(&self) -> CoreResult<()> {
        self.norm_size.validate()?;
        if self.process_every_n_frame == 0 {
            return Err(CoreError::InvalidConfig(
                "process_every_n_frame must be at least 1".to_string(),
            ));
        }
        if self.update_back_interval == 0 {
            return Err(CoreError::InvalidConfig(
                "update_back_interval must be at least 1".to_string(),
            ));
        }
        let n = self.cross_geometry_points.len();
        if n != 0 && n != 2 && n != 4 {
            return Err(CoreError::InvalidConfig(format!(
                "cross_geometry_points must have 0, 2 (line) or 4 (loop) points, got {}",
                n
            )));
        }
        Ok(())
    }
}

// PipelineConfig's `#[derive(Default)]` only works because every field
// implements `Default`; `update_back_interval`/`build_back_count`/
// `process_every_n_frame` default to 0 that way, which `validate` would
// reject, so the orchestrator constructs its default with the
// documented values explicitly instead of via `PipelineConfig::default()`.
impl PipelineConfig {
    pub fn with_documented_defaults() -> Self {
        PipelineConfig {
            norm_size: NormSize::default(),
            update_back_interval: 4,
            build_back_count: 20,
            process_every_n_frame: 1,
            extractor: ExtractorConfig::default(),
            tracker: TrackerConfig::default(),
            record_mode: RecordMode::default(),
            save_mode: SaveImageMode::default(),
            multi_record: MultiRecordConfig::default(),
            include_region: Vec::new(),
            exclude_region: Vec::new(),
            cross_geometry_points: Vec::new(),
            static_tracker: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_too_small_norm_size() {
        let cfg = NormSize { width: 4, height: 4 };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn record_mode_round_trips_through_strings() {
        use std::str::FromStr;
        assert_eq!(RecordMode::from_str("CrossLine").unwrap(), RecordMode::CrossLine);
        assert_eq!(RecordMode::CrossBottom.to_string(), "CrossBottom");
    }

    #[test]
    fn documented_defaults_validate() {
        let cfg = PipelineConfig::with_documented_defaults();
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn rejects_wrong_cross_geometry_point_count() {
        let mut cfg = PipelineConfig::with_documented_defaults();
        cfg.cross_geometry_points = vec![(0, 0), (1, 1), (2, 2)];
        assert!(cfg.validate().is_err());
    }
}

//! Integration tests for the literal end-to-end scenarios.
//!
//! Each test exercises the public API at the level the scenario actually
//! describes: some drive a single background model, others the full
//! `MovingObjectDetector` pipeline, and others `BlobTracker` directly
//! where the scenario is really about association/snapshot behavior
//! rather than background subtraction.

use framewatch::background::mog::{Mog, MogProfile};
use framewatch::background::vibe::{Vibe, VibeConfig};
use framewatch::background::BackgroundModel;
use framewatch::config::{
    MultiRecordConfig, NormSize, PipelineConfig, RecordMode, SaveImageMode, TrackerConfig,
};
use framewatch::frame::Frame;
use framewatch::geometry::{Rect, RegionOfInterest, VirtualLoop};
use framewatch::pipeline::MovingObjectDetector;
use framewatch::track::{BlobTracker, CrossGeometry};

fn constant_frame(value: u8, w: u32, h: u32, index: i32) -> Frame {
    Frame::new(vec![value; (w * h) as usize], w, h, 1, index as i64 * 33, index).unwrap()
}

fn full_roi(w: i32, h: i32) -> RegionOfInterest {
    RegionOfInterest::new("full", w, h, false, &[])
}

/// Scenario 1: a single static 320x240 gray frame at 128. After `init`
/// and 20 `update` calls with the same frame, every call past the first
/// reports zero foreground pixels and a background reconstruction equal
/// to 128 exactly.
#[test]
fn scenario_1_static_frame_settles_to_empty_foreground() {
    let mut mog = Mog::new(MogProfile::Relaxed);
    let frame = constant_frame(128, 320, 240, 0);
    mog.init(&frame).unwrap();
    for i in 0..20 {
        let update = mog.update(&frame, &[]).unwrap();
        if i >= 1 {
            assert_eq!(update.foreground.count_nonzero(), 0, "call {} should be all-background", i);
        }
        assert!(update.background.pixels().iter().all(|&p| p == 128), "call {}", i);
    }
}

/// Scenario 2: a background of 128, with a 30x30 rectangle of value 200
/// centered at (80, 120) injected for five frames starting once warm-up
/// completes. The extractor should report exactly one rectangle close
/// to that size and position, and the tracker should create track id 1
/// without finalizing it yet.
#[test]
fn scenario_2_single_moving_rectangle_is_extracted_and_tracked() {
    let norm = NormSize { width: 320, height: 240 };
    let mut config = PipelineConfig::with_documented_defaults();
    config.norm_size = norm;
    let build_back_count = config.build_back_count;

    let bg_value = 128u8;
    let first = constant_frame(bg_value, norm.width, norm.height, 0);
    let mut detector = MovingObjectDetector::init(&first, Box::new(Mog::new(MogProfile::Relaxed)), config).unwrap();

    // Warm-up: the first `build_back_count` proc calls (internal frame
    // indices 0..build_back_count) update only the background.
    for i in 0..build_back_count {
        let out = detector.proc(&constant_frame(bg_value, norm.width, norm.height, i as i32)).unwrap();
        assert!(out.rects.is_empty());
        assert!(out.track_updates.is_empty());
    }

    // The rectangle of value 200 centered at (80, 120), i.e. x in
    // [65, 95), y in [105, 135).
    let mut pixels = vec![bg_value; (norm.width * norm.height) as usize];
    for y in 105..135u32 {
        for x in 65..95u32 {
            pixels[(y * norm.width + x) as usize] = 200;
        }
    }
    let square = Frame::new(pixels, norm.width, norm.height, 1, build_back_count as i64 * 33, build_back_count as i32).unwrap();
    let out = detector.proc(&square).unwrap();

    assert_eq!(out.rects.len(), 1, "expected exactly one candidate rectangle");
    let r = out.rects[0];
    let area = r.area() as f64;
    // The prescribed morphology (median3 -> dilate ellipse(3) -> erode
    // ellipse(1)) nets roughly +2px per side, growing a 30x30 block to
    // ~34x34 (~1156px, ~28% over 900) even with refinement off; match
    // the tolerance the extractor's own unit test uses for the same
    // shape (`extracts_a_single_solid_rectangle`).
    assert!((area - 900.0).abs() / 900.0 < 0.5, "area {} not within 50% of 900", area);
    let center = r.center();
    assert!((center.x - 80.0).abs() <= 3.0, "center.x={}", center.x);
    assert!((center.y - 120.0).abs() <= 3.0, "center.y={}", center.y);

    let live: Vec<_> = out.track_updates.iter().filter(|u| !u.is_final).collect();
    assert_eq!(live.len(), 1);
    assert_eq!(live[0].id, 1);
    assert!(out.track_updates.iter().all(|u| !u.is_final), "no final record should be emitted yet");
}

/// Scenario 3: a rectangle crossing a four-corner loop emits exactly one
/// `CrossTriBound` snapshot, whose `bound` names the side it first
/// crossed and whose `direction` records left-to-right travel.
#[test]
fn scenario_3_loop_crossing_emits_one_snapshot_with_the_right_direction() {
    let norm_w = 320;
    let norm_h = 240;
    let loop_ = VirtualLoop::new([(10, 120), (10, 220), (310, 220), (310, 120)]);
    let mut tracker = BlobTracker::new(
        full_roi(norm_w, norm_h),
        Some(CrossGeometry::Loop(loop_)),
        TrackerConfig::default(),
        RecordMode::CrossTriBound,
        SaveImageMode::empty(),
        MultiRecordConfig::default(),
        norm_w,
        norm_h,
    );

    for i in 0..40 {
        let x = 20 + i * (280 - 20) / 39;
        let rect = Rect::new(x, 140, 40, 40);
        tracker.proc(i as i64 * 33, i, &[rect], &[rect], None, None);
    }

    let finals = tracker.final_all();
    assert_eq!(finals.len(), 1);
    let snapshots = finals[0].snapshots.as_ref().expect("final record carries a snapshot list");
    assert_eq!(snapshots.len(), 1, "exactly one snapshot should be captured");
    let snap = &snapshots[0];
    assert!(snap.bound == 1 || snap.bound == 2, "bound={}", snap.bound);
    assert_eq!(snap.direction, 1, "left-to-right travel should record direction 1");
}

/// Scenario 4: a rectangle moving right for 15 frames then left for 15
/// frames triggers the turn-around check, deleting the original track
/// and starting a new one with a different id for the return trip.
#[test]
fn scenario_4_direction_reversal_starts_a_new_track_id() {
    let norm_w = 400;
    let norm_h = 240;
    let mut tracker = BlobTracker::new(
        full_roi(norm_w, norm_h),
        None,
        TrackerConfig {
            check_dir_step: 1,
            ..TrackerConfig::default()
        },
        RecordMode::None,
        SaveImageMode::empty(),
        MultiRecordConfig::default(),
        norm_w,
        norm_h,
    );

    let mut x = 10;
    let mut first_id = None;
    for i in 0..15 {
        let rect = Rect::new(x, 100, 30, 30);
        let updates = tracker.proc(i as i64 * 33, i, &[rect], &[rect], None, None);
        if let Some(u) = updates.iter().find(|u| !u.is_final) {
            first_id = Some(u.id);
        }
        x += 5;
    }
    assert!(first_id.is_some(), "a track should have been created for the outbound trip");

    let mut new_id = None;
    for i in 15..35 {
        let rect = Rect::new(x, 100, 30, 30);
        let updates = tracker.proc(i as i64 * 33, i, &[rect], &[rect], None, None);
        for u in &updates {
            if !u.is_final && Some(u.id) != first_id {
                new_id = Some(u.id);
            }
        }
        x -= 5;
    }
    assert!(new_id.is_some(), "the return trip should start a new track");
    assert_ne!(new_id, first_id, "the return trip's track id must differ from the original");
}

/// Scenario 5: a rectangle sliding from the frame's corner into the
/// interior and back out fills a `MultiRecord` bag of size 4 with
/// interior rectangles only, never a border-touching one, once the bag
/// has filled with interior captures.
#[test]
fn scenario_5_multi_record_prefers_interior_over_border_touching() {
    let norm_w = 320;
    let norm_h = 240;
    let mut tracker = BlobTracker::new(
        full_roi(norm_w, norm_h),
        None,
        TrackerConfig::default(),
        RecordMode::Multi,
        SaveImageMode::empty(),
        MultiRecordConfig { save_interval: 1, num_saved: 4 },
        norm_w,
        norm_h,
    );

    // Diagonal slide: border corner -> interior -> border corner, in
    // steps small enough (10px diagonal, ~14.1px center distance) that
    // the tracker's nearest-center association keeps matching the same
    // track throughout.
    let mut positions: Vec<i32> = (0..15).map(|i| 5 + i * 10).collect();
    positions.extend((0..14).rev().map(|i| 5 + i * 10));
    for (i, &p) in positions.iter().enumerate() {
        let rect = Rect::new(p, p, 20, 20);
        tracker.proc(i as i64 * 33, i as i32, &[rect], &[rect], None, None);
    }

    let finals = tracker.final_all();
    assert_eq!(finals.len(), 1);
    let snapshots = finals[0].snapshots.as_ref().expect("final record carries a snapshot list");
    assert!(!snapshots.is_empty());
    assert!(
        snapshots.iter().all(|s| s.norm_rect.strictly_interior(norm_w, norm_h, 5)),
        "once the bag fills with interior captures a border-touching one must never displace them"
    );
}

/// Scenario 6: with a fixed seed and a fixed input sequence, two
/// independent `MovingObjectDetector` runs over a ViBe background model
/// produce bit-identical candidate rectangles.
#[test]
fn scenario_6_vibe_foreground_is_reproducible_across_runs() {
    let norm = NormSize { width: 64, height: 48 };
    let bg_value = 60u8;

    let run = || {
        let mut config = PipelineConfig::with_documented_defaults();
        config.norm_size = norm;
        config.build_back_count = 3;
        let first = constant_frame(bg_value, norm.width, norm.height, 0);
        let mut detector = MovingObjectDetector::init(&first, Box::new(Vibe::new(VibeConfig::gray(), 99)), config).unwrap();
        for i in 1..5 {
            detector.proc(&constant_frame(bg_value, norm.width, norm.height, i)).unwrap();
        }
        let mut pixels = vec![bg_value; (norm.width * norm.height) as usize];
        for y in 10..20u32 {
            for x in 10..20u32 {
                pixels[(y * norm.width + x) as usize] = 220;
            }
        }
        let moving = Frame::new(pixels, norm.width, norm.height, 1, 5 * 33, 5).unwrap();
        detector.proc(&moving).unwrap().rects.clone()
    };

    assert_eq!(run(), run());
}

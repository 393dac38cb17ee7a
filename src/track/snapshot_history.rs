// Copyright 2026 the framewatch authors under the terms of the MIT License
// as detailed in the accompanying file README.md or
// <http://opensource.org/licenses/MIT>.

//! The four snapshot-capture strategies a track can be configured with,
//! represented as one tagged enum dispatched by `match` rather than as a
//! trait object, since the concrete set of variants is closed.

use cgmath::Point2;

use crate::config::{MultiRecordConfig, SaveImageMode};
use crate::frame::Frame;
use crate::geometry::{LineSegment, Rect, VirtualLoop};
use crate::imageops::GrayImage;

const MAX_DIST_TO_RECORD: f64 = 15.0;
const CROSS_LINE_THROTTLE: u32 = 3;
const INTERIOR_MARGIN: i32 = 5;

/// The cross-geometry a track's snapshot history reacts to.
#[derive(Clone)]
pub enum CrossGeometry {
    Line(LineSegment),
    Loop(VirtualLoop),
}

/// One captured (or about-to-be-captured) snapshot.
#[derive(Clone)]
pub struct SnapshotRecord {
    pub norm_rect: Rect,
    pub orig_rect: Rect,
    pub time_ms: i64,
    pub frame_index: i32,
    /// `-1` when no boundary crossing fired (an auxiliary record);
    /// otherwise which side: `1` left, `2` right, `3` bottom.
    pub bound: i8,
    /// `-1` exiting, `0` unknown/auxiliary, `1` entering.
    pub cross_in: i8,
    /// `-1` unknown; otherwise `1` left-to-right, `2` right-to-left,
    /// `3` top-to-bottom, `4` bottom-to-top.
    pub direction: i8,
    pub scene: Option<Frame>,
    pub slice: Option<Frame>,
    pub mask: Option<GrayImage>,
}

fn capture_images(
    save_mode: SaveImageMode,
    scene: Option<&Frame>,
    fore: Option<&GrayImage>,
    rect: Rect,
) -> (Option<Frame>, Option<Frame>, Option<GrayImage>) {
    let captured_scene = if save_mode.contains(SaveImageMode::SCENE) {
        scene.cloned()
    } else {
        None
    };
    let slice = if save_mode.contains(SaveImageMode::SLICE) {
        scene.map(|s| s.crop(rect))
    } else {
        None
    };
    let mask = if save_mode.contains(SaveImageMode::MASK) {
        fore.map(|m| crop_mask(m, rect))
    } else {
        None
    };
    (captured_scene, slice, mask)
}

fn crop_mask(mask: &GrayImage, rect: Rect) -> GrayImage {
    let r = rect.clamped(mask.width as i32, mask.height as i32);
    let mut out = GrayImage::zeros(r.w.max(0) as u32, r.h.max(0) as u32);
    for row in 0..r.h {
        for col in 0..r.w {
            out.set(col as u32, row as u32, mask.get(r.x + col, r.y + row));
        }
    }
    out
}

fn movement_direction(prev: Point2<f64>, curr: Point2<f64>) -> i8 {
    let dx = curr.x - prev.x;
    let dy = curr.y - prev.y;
    if dx.abs() >= dy.abs() {
        if dx > 0.0 {
            1
        } else if dx < 0.0 {
            2
        } else {
            -1
        }
    } else if dy > 0.0 {
        3
    } else if dy < 0.0 {
        4
    } else {
        -1
    }
}

/// Tracks the boolean "outside the bound" state of one loop side across
/// calls, firing once when that state flips.
#[derive(Default, Clone, Copy)]
struct BoundEdge {
    prev_outside: Option<bool>,
    fired: bool,
}

impl BoundEdge {
    /// Returns `Some(cross_in)` the first time `outside` flips relative
    /// to the previous call; `None` otherwise or once already fired.
    fn observe(&mut self, outside: bool) -> Option<i8> {
        let result = match self.prev_outside {
            Some(prev) if !self.fired && prev != outside => Some(if outside { -1 } else { 1 }),
            _ => None,
        };
        self.prev_outside = Some(outside);
        if result.is_some() {
            self.fired = true;
        }
        result
    }
}

#[derive(Default)]
struct TriBoundState {
    left: BoundEdge,
    right: BoundEdge,
    bottom: BoundEdge,
    left_record: Option<SnapshotRecord>,
    right_record: Option<SnapshotRecord>,
    bottom_record: Option<SnapshotRecord>,
    aux: Option<SnapshotRecord>,
    prev_center: Option<Point2<f64>>,
}

impl TriBoundState {
    fn update(&mut self, loop_: &VirtualLoop, save_mode: SaveImageMode, scene: Option<&Frame>, fore: Option<&GrayImage>, rect: Rect, orig_rect: Rect, time_ms: i64, frame_index: i32, track_bottom_only: bool) {
        let center = rect.center();
        let left_mid = (rect.x, (rect.y + rect.h / 2));
        let right_mid = (rect.right(), rect.y + rect.h / 2);
        let bottom_mid = (rect.x + rect.w / 2, rect.bottom());

        let direction = self.prev_center.map_or(-1, |p| movement_direction(p, center));

        if !track_bottom_only {
            if let Some(cross_in) = self.left.observe(loop_.left_to_left_bound(left_mid)) {
                self.left_record = Some(self.build_record(1, cross_in, direction, save_mode, scene, fore, rect, orig_rect, time_ms, frame_index));
            }
            if let Some(cross_in) = self.right.observe(loop_.right_to_right_bound(right_mid)) {
                self.right_record = Some(self.build_record(2, cross_in, direction, save_mode, scene, fore, rect, orig_rect, time_ms, frame_index));
            }
        }
        if let Some(cross_in) = self.bottom.observe(loop_.below_bottom_bound(bottom_mid)) {
            self.bottom_record = Some(self.build_record(3, cross_in, direction, save_mode, scene, fore, rect, orig_rect, time_ms, frame_index));
        }

        let replace_aux = self.aux.as_ref().map_or(true, |a| rect.area() > a.norm_rect.area());
        if replace_aux {
            self.aux = Some(self.build_record(-1, 0, -1, save_mode, scene, fore, rect, orig_rect, time_ms, frame_index));
        }

        self.prev_center = Some(center);
    }

    fn build_record(
        &self,
        bound: i8,
        cross_in: i8,
        direction: i8,
        save_mode: SaveImageMode,
        scene: Option<&Frame>,
        fore: Option<&GrayImage>,
        rect: Rect,
        orig_rect: Rect,
        time_ms: i64,
        frame_index: i32,
    ) -> SnapshotRecord {
        let (scene_img, slice, mask) = capture_images(save_mode, scene, fore, rect);
        SnapshotRecord {
            norm_rect: rect,
            orig_rect,
            time_ms,
            frame_index,
            bound,
            cross_in,
            direction,
            scene: scene_img,
            slice,
            mask,
        }
    }

    /// Picks exactly one winning record: the earliest-fired boundary
    /// crossing, by priority left, then right, then bottom; falls back
    /// to the largest-rectangle auxiliary record when none fired.
    fn output(&self) -> Vec<SnapshotRecord> {
        for candidate in [&self.left_record, &self.right_record, &self.bottom_record] {
            if let Some(r) = candidate {
                return vec![r.clone()];
            }
        }
        self.aux.iter().cloned().collect()
    }
}

struct CrossLineState {
    last_distance: f64,
    record: Option<SnapshotRecord>,
    update_count: u32,
}

impl CrossLineState {
    fn new() -> Self {
        CrossLineState {
            last_distance: f64::MAX,
            record: None,
            update_count: 0,
        }
    }

    fn update(&mut self, line: &LineSegment, save_mode: SaveImageMode, scene: Option<&Frame>, fore: Option<&GrayImage>, rect: Rect, orig_rect: Rect, time_ms: i64, frame_index: i32) {
        self.update_count += 1;
        if self.record.is_some() && self.update_count % CROSS_LINE_THROTTLE != 0 {
            return;
        }
        let center = rect.center();
        let pt = (center.x as i32, center.y as i32);
        let dist = line.dist_to(pt);
        if dist >= MAX_DIST_TO_RECORD || dist >= self.last_distance {
            return;
        }
        self.last_distance = dist;
        let cross_in = if line.in_beg_side(pt) { 1 } else { -1 };
        let (scene_img, slice, mask) = capture_images(save_mode, scene, fore, rect);
        self.record = Some(SnapshotRecord {
            norm_rect: rect,
            orig_rect,
            time_ms,
            frame_index,
            bound: -1,
            cross_in,
            direction: -1,
            scene: scene_img,
            slice,
            mask,
        });
    }

    fn output(&self) -> Vec<SnapshotRecord> {
        self.record.iter().cloned().collect()
    }
}

struct MultiRecordState {
    config: MultiRecordConfig,
    bag: Vec<SnapshotRecord>,
    frame_width: i32,
    frame_height: i32,
    tick: u32,
}

impl MultiRecordState {
    fn new(config: MultiRecordConfig, frame_width: i32, frame_height: i32) -> Self {
        MultiRecordState {
            config,
            bag: Vec::new(),
            frame_width,
            frame_height,
            tick: 0,
        }
    }

    fn update(&mut self, save_mode: SaveImageMode, scene: Option<&Frame>, fore: Option<&GrayImage>, rect: Rect, orig_rect: Rect, time_ms: i64, frame_index: i32) {
        self.tick += 1;
        if self.tick % self.config.save_interval.max(1) != 0 {
            return;
        }
        let interior = rect.strictly_interior(self.frame_width, self.frame_height, INTERIOR_MARGIN);
        let (scene_img, slice, mask) = capture_images(save_mode, scene, fore, rect);
        let candidate = SnapshotRecord {
            norm_rect: rect,
            orig_rect,
            time_ms,
            frame_index,
            bound: -1,
            cross_in: 0,
            direction: -1,
            scene: scene_img,
            slice,
            mask,
        };

        if self.bag.len() < self.config.num_saved {
            self.bag.push(candidate);
            return;
        }

        let border_idx = self.bag.iter().position(|r| !r.norm_rect.strictly_interior(self.frame_width, self.frame_height, INTERIOR_MARGIN));
        match border_idx {
            None => {
                if interior {
                    if let Some((i, smallest)) = self.bag.iter().enumerate().min_by_key(|(_, r)| r.norm_rect.area()) {
                        if candidate.norm_rect.area() > smallest.norm_rect.area() {
                            self.bag[i] = candidate;
                        }
                    }
                }
            }
            Some(i) => {
                if interior {
                    self.bag[i] = candidate;
                } else {
                    let border_smallest = self
                        .bag
                        .iter()
                        .enumerate()
                        .filter(|(_, r)| !r.norm_rect.strictly_interior(self.frame_width, self.frame_height, INTERIOR_MARGIN))
                        .min_by_key(|(_, r)| r.norm_rect.area());
                    if let Some((j, smallest)) = border_smallest {
                        if candidate.norm_rect.area() > smallest.norm_rect.area() {
                            self.bag[j] = candidate;
                        }
                    }
                }
            }
        }
    }

    fn output(&self) -> Vec<SnapshotRecord> {
        self.bag.clone()
    }
}

/// Which of the four capture strategies a track uses, or none.
pub enum SnapshotHistory {
    CrossTriBound { geometry: VirtualLoop, state: TriBoundState },
    CrossBottom { geometry: VirtualLoop, state: TriBoundState },
    CrossLine { geometry: LineSegment, state: CrossLineState },
    MultiRecord(MultiRecordState),
    None,
}

impl SnapshotHistory {
    pub fn cross_tri_bound(geometry: VirtualLoop) -> Self {
        SnapshotHistory::CrossTriBound {
            geometry,
            state: TriBoundState::default(),
        }
    }

    pub fn cross_bottom(geometry: VirtualLoop) -> Self {
        SnapshotHistory::CrossBottom {
            geometry,
            state: TriBoundState::default(),
        }
    }

    pub fn cross_line(geometry: LineSegment) -> Self {
        SnapshotHistory::CrossLine {
            geometry,
            state: CrossLineState::new(),
        }
    }

    pub fn multi_record(config: MultiRecordConfig, frame_width: i32, frame_height: i32) -> Self {
        SnapshotHistory::MultiRecord(MultiRecordState::new(config, frame_width, frame_height))
    }

    #[allow(clippy::too_many_arguments)]
    pub fn update(
        &mut self,
        save_mode: SaveImageMode,
        scene: Option<&Frame>,
        fore: Option<&GrayImage>,
        rect: Rect,
        orig_rect: Rect,
        time_ms: i64,
        frame_index: i32,
    ) {
        match self {
            SnapshotHistory::CrossTriBound { geometry, state } => {
                state.update(geometry, save_mode, scene, fore, rect, orig_rect, time_ms, frame_index, false)
            }
            SnapshotHistory::CrossBottom { geometry, state } => {
                state.update(geometry, save_mode, scene, fore, rect, orig_rect, time_ms, frame_index, true)
            }
            SnapshotHistory::CrossLine { geometry, state } => state.update(geometry, save_mode, scene, fore, rect, orig_rect, time_ms, frame_index),
            SnapshotHistory::MultiRecord(state) => state.update(save_mode, scene, fore, rect, orig_rect, time_ms, frame_index),
            SnapshotHistory::None => {}
        }
    }

    pub fn output(&self) -> Vec<SnapshotRecord> {
        match self {
            SnapshotHistory::CrossTriBound { state, .. } => state.output(),
            SnapshotHistory::CrossBottom { state, .. } => state.output(),
            SnapshotHistory::CrossLine { state, .. } => state.output(),
            SnapshotHistory::MultiRecord(state) => state.output(),
            SnapshotHistory::None => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loop_geometry() -> VirtualLoop {
        VirtualLoop::new([(10, 120), (10, 220), (310, 220), (310, 120)])
    }

    #[test]
    fn cross_tri_bound_fires_on_right_boundary_crossing() {
        let mut history = SnapshotHistory::cross_tri_bound(loop_geometry());
        for i in 0..40 {
            let x = 20 + (i * (280 - 20) / 39);
            let rect = Rect::new(x, 140, 40, 40);
            history.update(SaveImageMode::empty(), None, None, rect, rect, i as i64 * 33, i);
        }
        let output = history.output();
        assert_eq!(output.len(), 1);
        assert!(output[0].bound == 1 || output[0].bound == 2);
        assert_eq!(output[0].direction, 1);
    }

    #[test]
    fn cross_line_overwrites_only_on_strictly_decreasing_distance() {
        let line = LineSegment::new((0, 100), (200, 100), Some((0, 200)));
        let mut history = SnapshotHistory::cross_line(line);
        for y in [90, 80, 70, 95, 60] {
            let rect = Rect::new(50, y - 5, 10, 10);
            for _ in 0..3 {
                history.update(SaveImageMode::empty(), None, None, rect, rect, 0, 0);
            }
        }
        let output = history.output();
        assert_eq!(output.len(), 1);
    }

    #[test]
    fn multi_record_prefers_interior_rectangles() {
        let mut history = SnapshotHistory::multi_record(MultiRecordConfig { save_interval: 1, num_saved: 2 }, 320, 240);
        let border_rect = Rect::new(0, 0, 20, 20);
        let interior_small = Rect::new(100, 100, 20, 20);
        let interior_large = Rect::new(150, 100, 40, 40);
        history.update(SaveImageMode::empty(), None, None, border_rect, border_rect, 0, 0);
        history.update(SaveImageMode::empty(), None, None, interior_small, interior_small, 1, 1);
        history.update(SaveImageMode::empty(), None, None, interior_large, interior_large, 2, 2);
        let output = history.output();
        assert!(output.iter().all(|r| r.norm_rect.strictly_interior(320, 240, INTERIOR_MARGIN)));
    }
}

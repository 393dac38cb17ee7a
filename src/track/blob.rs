// Copyright 2026 the framewatch authors under the terms of the MIT License
// as detailed in the accompanying file README.md or
// <http://opensource.org/licenses/MIT>.

//! A single tracked object: its identity, current rectangle, and the
//! two histories (`QuantHistory`, `SnapshotHistory`) it owns for its
//! lifetime.

use crate::config::SaveImageMode;
use crate::frame::Frame;
use crate::geometry::Rect;
use crate::imageops::GrayImage;

use super::quant_history::QuantHistory;
use super::snapshot_history::SnapshotHistory;

/// A single tracked object. Owned exclusively by `BlobTracker`.
pub struct Track {
    pub id: i32,
    pub current_rect: Rect,
    pub current_orig_rect: Rect,
    pub to_be_deleted: bool,
    pub quant_history: QuantHistory,
    pub snapshot_history: SnapshotHistory,
    frames_since_dir_check: u32,
}

impl Track {
    pub fn new(id: i32, rect: Rect, orig_rect: Rect, check_dir_step: u32, snapshot_history: SnapshotHistory) -> Self {
        Track {
            id,
            current_rect: rect,
            current_orig_rect: orig_rect,
            to_be_deleted: false,
            quant_history: QuantHistory::new(check_dir_step),
            snapshot_history,
            frames_since_dir_check: 0,
        }
    }

    /// Records a new observation for this frame and captures a snapshot
    /// if the track's `SnapshotHistory` variant decides to.
    #[allow(clippy::too_many_arguments)]
    pub fn update(
        &mut self,
        rect: Rect,
        orig_rect: Rect,
        grad_diff_mean: f64,
        time_ms: i64,
        frame_index: i32,
        save_mode: SaveImageMode,
        scene: Option<&Frame>,
        fore: Option<&GrayImage>,
        cropped_image: Option<Frame>,
    ) {
        self.current_rect = rect;
        self.current_orig_rect = orig_rect;
        self.quant_history.push_record(rect, orig_rect, grad_diff_mean, time_ms, frame_index, cropped_image);
        self.snapshot_history.update(save_mode, scene, fore, rect, orig_rect, time_ms, frame_index);
    }

    /// Every 5 history entries, check whether the trajectory reversed
    /// direction; marks the track deleted if so.
    pub fn maybe_check_turn_around(&mut self, enabled: bool) {
        if !enabled {
            return;
        }
        self.frames_since_dir_check += 1;
        if self.frames_since_dir_check < 5 {
            return;
        }
        self.frames_since_dir_check = 0;
        if self.quant_history.check_turn_around() {
            self.to_be_deleted = true;
        }
    }

    pub fn history_len(&self) -> usize {
        self.quant_history.len()
    }
}

// Copyright 2026 the framewatch authors under the terms of the MIT License
// as detailed in the accompanying file README.md or
// <http://opensource.org/licenses/MIT>.

//! Rectangle-to-track association and the track lifecycle. Owns every
//! live `Track`; a frame's rectangles are matched to the nearest track
//! by center distance, with a history-aware tie-break when several
//! rectangles tentatively match the same track.

use indexmap::IndexMap;

use crate::config::{MultiRecordConfig, RecordMode, SaveImageMode, TrackerConfig};
use crate::frame::Frame;
use crate::geometry::{Rect, RegionOfInterest};
use crate::imageops::GrayImage;
use crate::util::perpendicular_distance;

use super::blob::Track;
use super::quant_history::QuantRecord;
use super::snapshot_history::{CrossGeometry, SnapshotHistory, SnapshotRecord};

const ID_WRAP: i32 = 1_000_000;
const SMALL_CANDIDATE_RATIO: f64 = 0.2;
const TIE_BREAK_MEAN_ERROR: f64 = 15.0;

/// One frame-index/time/rectangle/(optional cropped image) entry of a
/// finalized track's quantitative history.
pub struct HistoryEntry {
    pub time_ms: i64,
    pub frame_index: i32,
    pub norm_rect: Rect,
    pub orig_rect: Rect,
    pub image: Option<Frame>,
}

impl From<&QuantRecord> for HistoryEntry {
    fn from(r: &QuantRecord) -> Self {
        HistoryEntry {
            time_ms: r.time_ms,
            frame_index: r.frame_index,
            norm_rect: r.rect,
            orig_rect: r.orig_rect,
            image: r.cropped_image.clone(),
        }
    }
}

/// One emitted record for a track, either a lightweight per-frame
/// update or (when `is_final`) the full history and snapshot bundle.
pub struct TrackUpdate {
    pub id: i32,
    pub current_rect: Rect,
    pub is_final: bool,
    pub history: Option<Vec<HistoryEntry>>,
    pub snapshots: Option<Vec<SnapshotRecord>>,
}

enum Assignment {
    Matched(i32),
    New,
}

fn center_distance(a: Rect, b: Rect) -> f64 {
    let (ca, cb) = (a.center(), b.center());
    ((ca.x - cb.x).powi(2) + (ca.y - cb.y).powi(2)).sqrt()
}

/// Owns every live `Track` and performs the per-frame association pass.
pub struct BlobTracker {
    tracks: IndexMap<i32, Track>,
    next_id: i32,
    roi: RegionOfInterest,
    cross_geometry: Option<CrossGeometry>,
    config: TrackerConfig,
    record_mode: RecordMode,
    save_mode: SaveImageMode,
    multi_record: MultiRecordConfig,
    norm_width: i32,
    norm_height: i32,
}

impl BlobTracker {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        roi: RegionOfInterest,
        cross_geometry: Option<CrossGeometry>,
        config: TrackerConfig,
        record_mode: RecordMode,
        save_mode: SaveImageMode,
        multi_record: MultiRecordConfig,
        norm_width: i32,
        norm_height: i32,
    ) -> Self {
        BlobTracker {
            tracks: IndexMap::new(),
            next_id: 1,
            roi,
            cross_geometry,
            config,
            record_mode,
            save_mode,
            multi_record,
            norm_width,
            norm_height,
        }
    }

    fn make_snapshot_history(&self) -> SnapshotHistory {
        match (self.record_mode, &self.cross_geometry) {
            (RecordMode::CrossTriBound, Some(CrossGeometry::Loop(l))) => SnapshotHistory::cross_tri_bound(*l),
            (RecordMode::CrossBottom, Some(CrossGeometry::Loop(l))) => SnapshotHistory::cross_bottom(*l),
            (RecordMode::CrossLine, Some(CrossGeometry::Line(l))) => SnapshotHistory::cross_line(*l),
            (RecordMode::Multi, _) => SnapshotHistory::multi_record(self.multi_record, self.norm_width, self.norm_height),
            _ => SnapshotHistory::None,
        }
    }

    fn next_track_id(&mut self) -> i32 {
        loop {
            let id = self.next_id;
            self.next_id = (self.next_id + 1) % ID_WRAP;
            if !self.tracks.contains_key(&id) {
                return id;
            }
        }
    }

    fn finalize_track(id: i32, track: Track) -> TrackUpdate {
        let history = track
            .quant_history
            .records()
            .iter()
            .map(HistoryEntry::from)
            .collect();
        let snapshots = track.snapshot_history.output();
        TrackUpdate {
            id,
            current_rect: track.current_rect,
            is_final: true,
            history: Some(history),
            snapshots: Some(snapshots),
        }
    }

    fn drain_deleted(&mut self) -> Vec<TrackUpdate> {
        let deleted_ids: Vec<i32> = self
            .tracks
            .iter()
            .filter(|(_, t)| t.to_be_deleted)
            .map(|(&id, _)| id)
            .collect();
        let mut out = Vec::with_capacity(deleted_ids.len());
        for id in deleted_ids {
            if let Some(track) = self.tracks.shift_remove(&id) {
                if track.history_len() >= self.config.min_history_size_for_output {
                    out.push(Self::finalize_track(id, track));
                }
            }
        }
        out
    }

    /// Advances the tracker by one frame. `rects`/`orig_rects` are
    /// parallel slices of the same candidate rectangles at normalized
    /// and original resolution.
    pub fn proc(
        &mut self,
        time_ms: i64,
        frame_index: i32,
        rects: &[Rect],
        orig_rects: &[Rect],
        scene: Option<&Frame>,
        fore: Option<&GrayImage>,
    ) -> Vec<TrackUpdate> {
        let mut updates = self.drain_deleted();

        let surviving: Vec<(Rect, Rect)> = rects
            .iter()
            .zip(orig_rects.iter())
            .filter(|(r, _)| self.roi.intersects(r))
            .map(|(&r, &o)| (r, o))
            .collect();

        if self.config.check_turn_around {
            for track in self.tracks.values_mut() {
                track.maybe_check_turn_around(true);
            }
        }

        let mut assignment: Vec<Assignment> = Vec::with_capacity(surviving.len());
        for (rect, _) in &surviving {
            let nearest = self
                .tracks
                .iter()
                .filter(|(_, t)| !t.to_be_deleted)
                .min_by(|(_, a), (_, b)| {
                    center_distance(*rect, a.current_rect)
                        .partial_cmp(&center_distance(*rect, b.current_rect))
                        .unwrap()
                })
                .map(|(&id, t)| (id, t.current_rect));

            match nearest {
                None => assignment.push(Assignment::New),
                Some((id, track_rect)) => {
                    let dist = center_distance(*rect, track_rect);
                    let ratio_self = rect.overlap_ratio_to_self(&track_rect);
                    let ratio_blob = track_rect.overlap_ratio_to_self(rect);
                    if dist > self.config.max_dist_rect_and_blob
                        && ratio_self < self.config.min_ratio_intersect_to_self
                        && ratio_blob < self.config.min_ratio_intersect_to_blob
                    {
                        assignment.push(Assignment::New);
                    } else {
                        assignment.push(Assignment::Matched(id));
                    }
                }
            }
        }

        // Resolve tracks with more than one tentative match.
        let mut matched_track_ids: Vec<i32> = assignment
            .iter()
            .filter_map(|a| match a {
                Assignment::Matched(id) => Some(*id),
                Assignment::New => None,
            })
            .collect();
        matched_track_ids.sort_unstable();
        matched_track_ids.dedup();

        for tid in matched_track_ids {
            let candidate_indices: Vec<usize> = assignment
                .iter()
                .enumerate()
                .filter_map(|(i, a)| match a {
                    Assignment::Matched(id) if *id == tid => Some(i),
                    _ => None,
                })
                .collect();
            if candidate_indices.len() <= 1 {
                continue;
            }
            let track = &self.tracks[&tid];
            let chosen = self.resolve_tie_break(track, &candidate_indices, &surviving);
            for &i in &candidate_indices {
                if i != chosen {
                    assignment[i] = Assignment::New;
                }
            }
        }

        let mut matched_this_frame: Vec<i32> = Vec::new();
        for (i, (rect, orig_rect)) in surviving.iter().enumerate() {
            if let Assignment::Matched(id) = assignment[i] {
                if self.roi.intersects(rect) {
                    if let Some(track) = self.tracks.get_mut(&id) {
                        track.update(*rect, *orig_rect, 0.0, time_ms, frame_index, self.save_mode, scene, fore, None);
                        matched_this_frame.push(id);
                    }
                } else if let Some(track) = self.tracks.get_mut(&id) {
                    track.to_be_deleted = true;
                }
            }
        }

        for (id, track) in self.tracks.iter_mut() {
            if !matched_this_frame.contains(id) {
                track.to_be_deleted = true;
            }
        }

        for (i, (rect, orig_rect)) in surviving.iter().enumerate() {
            if matches!(assignment[i], Assignment::New) {
                let id = self.next_track_id();
                let mut track = Track::new(id, *rect, *orig_rect, self.config.check_dir_step, self.make_snapshot_history());
                track.update(*rect, *orig_rect, 0.0, time_ms, frame_index, self.save_mode, scene, fore, None);
                self.tracks.insert(id, track);
            }
        }

        let mut live_updates: Vec<TrackUpdate> = self
            .tracks
            .iter()
            .filter(|(_, t)| !t.to_be_deleted)
            .map(|(&id, t)| TrackUpdate {
                id,
                current_rect: t.current_rect,
                is_final: false,
                history: None,
                snapshots: None,
            })
            .collect();
        live_updates.sort_by_key(|u| u.id);
        updates.extend(live_updates);
        updates
    }

    fn resolve_tie_break(&self, track: &Track, candidate_indices: &[usize], surviving: &[(Rect, Rect)]) -> usize {
        let (_, _, mean_error) = track.quant_history.linear_regres();
        let all_small = candidate_indices.iter().all(|&i| {
            let (rect, _) = surviving[i];
            rect.area() as f64 / track.current_rect.area().max(1) as f64 < SMALL_CANDIDATE_RATIO
        });

        let use_nearest = track.history_len() < self.config.max_history_for_dist_match
            || mean_error > TIE_BREAK_MEAN_ERROR
            || all_small;

        if use_nearest {
            *candidate_indices
                .iter()
                .min_by(|&&a, &&b| {
                    center_distance(surviving[a].0, track.current_rect)
                        .partial_cmp(&center_distance(surviving[b].0, track.current_rect))
                        .unwrap()
                })
                .unwrap()
        } else {
            let (origin, dir, _) = track.quant_history.linear_regres();
            *candidate_indices
                .iter()
                .min_by(|&&a, &&b| {
                    perpendicular_distance(surviving[a].0.center(), origin, dir)
                        .partial_cmp(&perpendicular_distance(surviving[b].0.center(), origin, dir))
                        .unwrap()
                })
                .unwrap()
        }
    }

    /// Emits every remaining track as final, for use at end-of-stream.
    pub fn final_all(&mut self) -> Vec<TrackUpdate> {
        let ids: Vec<i32> = self.tracks.keys().copied().collect();
        let mut out = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(track) = self.tracks.shift_remove(&id) {
                if track.history_len() >= self.config.min_history_size_for_output {
                    out.push(Self::finalize_track(id, track));
                }
            }
        }
        out
    }

    pub fn live_track_count(&self) -> usize {
        self.tracks.len()
    }
}

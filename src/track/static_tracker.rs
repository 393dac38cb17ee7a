// Copyright 2026 the framewatch authors under the terms of the MIT License
// as detailed in the accompanying file README.md or
// <http://opensource.org/licenses/MIT>.

//! A secondary tracker that reports objects which have stayed in
//! essentially the same place for a configurable duration, independent
//! of `BlobTracker`'s moving-object association logic. Shares the same
//! per-frame rectangle stream but keeps its own, much simpler, state.

use crate::geometry::Rect;

const IOU_MATCH_THRESHOLD: f64 = 0.5;

/// A static object reported by `StaticBlobTracker`: identity and current
/// rectangle only, no snapshot capture.
#[derive(Clone, Copy, Debug)]
pub struct StaticObjectInfo {
    pub id: i32,
    pub rect: Rect,
}

struct Candidate {
    id: i32,
    rect: Rect,
    first_seen_ms: i64,
    last_seen_ms: i64,
    emitted: bool,
}

/// Tracks rectangles that remain essentially motionless, emitting a
/// `StaticObjectInfo` the first time a candidate's observed duration
/// crosses `min_static_time_in_minute`.
pub struct StaticBlobTracker {
    candidates: Vec<Candidate>,
    next_id: i32,
    min_static_time_ms: i64,
    allowed_miss_time_ms: i64,
}

impl StaticBlobTracker {
    pub fn new(min_static_time_in_minute: f64, allowed_miss_time_in_minute: f64) -> Self {
        StaticBlobTracker {
            candidates: Vec::new(),
            next_id: 1,
            min_static_time_ms: (min_static_time_in_minute * 60_000.0) as i64,
            allowed_miss_time_ms: (allowed_miss_time_in_minute * 60_000.0) as i64,
        }
    }

    /// Matches `rects` to existing candidates by IoU, ages out candidates
    /// that exceeded their miss tolerance, and returns every candidate
    /// whose static duration crosses the threshold for the first time
    /// this call.
    pub fn proc(&mut self, time_ms: i64, rects: &[Rect]) -> Vec<StaticObjectInfo> {
        let mut matched = vec![false; rects.len()];
        for candidate in &mut self.candidates {
            let mut best: Option<(usize, f64)> = None;
            for (i, rect) in rects.iter().enumerate() {
                if matched[i] {
                    continue;
                }
                let iou = candidate.rect.iou(rect);
                if iou >= IOU_MATCH_THRESHOLD && best.map(|(_, b)| iou > b).unwrap_or(true) {
                    best = Some((i, iou));
                }
            }
            if let Some((i, _)) = best {
                matched[i] = true;
                candidate.rect = rects[i];
                candidate.last_seen_ms = time_ms;
            }
        }

        self.candidates
            .retain(|c| time_ms - c.last_seen_ms <= self.allowed_miss_time_ms);

        for (i, rect) in rects.iter().enumerate() {
            if !matched[i] {
                let id = self.next_id;
                self.next_id += 1;
                self.candidates.push(Candidate {
                    id,
                    rect: *rect,
                    first_seen_ms: time_ms,
                    last_seen_ms: time_ms,
                    emitted: false,
                });
            }
        }

        let mut out = Vec::new();
        for candidate in &mut self.candidates {
            let duration = candidate.last_seen_ms - candidate.first_seen_ms;
            if !candidate.emitted && duration >= self.min_static_time_ms {
                candidate.emitted = true;
                out.push(StaticObjectInfo {
                    id: candidate.id,
                    rect: candidate.rect,
                });
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn a_stationary_rectangle_is_emitted_once_it_crosses_the_duration_threshold() {
        // One minute at the threshold, advanced in 10s steps.
        let mut tracker = StaticBlobTracker::new(1.0, 1.0);
        let rect = Rect::new(100, 100, 40, 40);
        let mut emitted_at = None;
        for step in 0..8 {
            let time_ms = step * 10_000;
            let out = tracker.proc(time_ms, &[rect]);
            if !out.is_empty() {
                emitted_at = Some(time_ms);
                assert_eq!(out.len(), 1);
                assert_eq!(out[0].id, 1);
                break;
            }
        }
        assert_eq!(emitted_at, Some(60_000));
    }

    #[test]
    fn a_candidate_is_emitted_at_most_once() {
        let mut tracker = StaticBlobTracker::new(0.5, 1.0);
        let rect = Rect::new(0, 0, 20, 20);
        let mut total_emitted = 0;
        for step in 0..10 {
            let out = tracker.proc(step * 10_000, &[rect]);
            total_emitted += out.len();
        }
        assert_eq!(total_emitted, 1);
    }

    #[test]
    fn a_gap_longer_than_the_allowed_miss_time_starts_a_fresh_candidate() {
        let mut tracker = StaticBlobTracker::new(10.0, 0.1);
        let rect = Rect::new(10, 10, 30, 30);
        tracker.proc(0, &[rect]);
        assert_eq!(tracker.candidates.len(), 1);
        let old_id = tracker.candidates[0].id;
        // Gap far exceeding the 0.1 minute (6s) miss tolerance.
        tracker.proc(60_000, &[rect]);
        assert_eq!(tracker.candidates.len(), 1);
        assert_ne!(tracker.candidates[0].id, old_id);
    }
}

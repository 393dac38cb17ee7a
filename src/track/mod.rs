// Copyright 2026 the framewatch authors under the terms of the MIT License
// as detailed in the accompanying file README.md or
// <http://opensource.org/licenses/MIT>.

//! Object tracking: rectangle-to-track association (`BlobTracker`), its
//! per-track histories (`QuantHistory`, `SnapshotHistory`), and the
//! static-object sibling tracker (`StaticBlobTracker`).

mod blob;
mod quant_history;
mod snapshot_history;
mod static_tracker;
mod tracker;

pub use blob::Track;
pub use quant_history::{QuantHistory, QuantRecord};
pub use snapshot_history::{CrossGeometry, SnapshotHistory, SnapshotRecord};
pub use static_tracker::{StaticBlobTracker, StaticObjectInfo};
pub use tracker::{BlobTracker, HistoryEntry, TrackUpdate};

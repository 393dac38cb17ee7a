// Copyright 2026 the framewatch authors under the terms of the MIT License
// as detailed in the accompanying file README.md or
// <http://opensource.org/licenses/MIT>.

//! Turns a background model's foreground mask into a list of rectangles:
//! contour extraction, area/shape filtering, merging, shadow refinement,
//! and the stable-rectangle detector that feeds freeze regions back into
//! the background model.

mod extractor;
mod shadow;
mod stable;

pub use extractor::BlobExtractor;
pub use stable::StableRectTracker;

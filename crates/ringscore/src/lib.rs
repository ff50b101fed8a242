//! ringscore: archery target ring geometry estimation and arrow scoring.
//!
//! Works on a single photograph of a ten-ring target face. The pipeline
//! stages are:
//!
//! 1. **Rectify** (optional) – warp the square card and the elliptical face
//!    to a fronto-parallel view.
//! 2. **Rings** – threshold the black, blue, red and yellow color bands, fit
//!    one ellipse per band and extrapolate the remaining ring boundaries.
//! 3. **Arrows** – edge map, cleanup and probabilistic Hough lines; the arrow
//!    head side is inferred from the drift of the ring centers.
//! 4. **Score** – map every arrow head to the innermost containing ring, or
//!    to concentric distance buckets.
//!
//! # Public API
//! - [`TargetScorer`] as the primary entry point
//! - [`ScoreConfig`] for tuning
//! - [`ScoreResult`] and the stage modules for direct access to the
//!   individual operations
//!
//! Intermediate data is reported through a [`DebugSink`]; nothing is
//! rendered unless the sink asks for images.

mod api;
pub mod arrow;
mod config;
pub mod conic;
pub mod debug_dump;
mod error;
pub mod overlay;
mod pipeline;
pub mod preprocess;
pub mod rectify;
pub mod ring;
pub mod score;

#[cfg(test)]
pub(crate) mod test_utils;

pub use api::TargetScorer;
pub use arrow::{detect_arrows, ArrowMark, LineSegment};
pub use config::{
    ArrowDetectConfig, HoughConfig, RadialConfig, RectifyConfig, RedFilterConfig, RingSearchConfig,
    ScoreConfig, ScoringConfig, TargetGeometry,
};
pub use debug_dump::{DebugCollector, DebugDump, DebugSink, NullSink};
pub use error::{PipelineError, Stage};
pub use overlay::render_overlay;
pub use pipeline::ScoreResult;
pub use ring::{AngleAveraging, Direction, MaskLevel, Perspective, RingEllipse, RingSet};
pub use score::{ScoredPoint, ScoringStrategy};

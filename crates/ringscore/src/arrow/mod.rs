//! Arrow shaft detection: edge map, cleanup, line detection and selection.

mod edges;
mod hough;
mod select;

pub use edges::{close_gaps, edge_map, remove_small_edges};
pub use hough::{probabilistic_hough, LineSegment};
pub use select::{iqr_bounds, remove_length_outliers, select_arrows, ArrowMark};

use image::RgbaImage;

use crate::config::ScoreConfig;
use crate::debug_dump::{ArrowDebug, DebugSink};
use crate::preprocess::{count_nonzero, to_gray};
use crate::ring::Perspective;

/// Detect arrow marks and resolve their heads with `perspective`.
///
/// Marks are returned in detection order.
pub fn detect_arrows(
    rgba: &RgbaImage,
    perspective: Perspective,
    config: &ScoreConfig,
    sink: &mut dyn DebugSink,
) -> Vec<ArrowMark> {
    let cfg = &config.arrows;
    let (w, h) = rgba.dimensions();
    if w == 0 || h == 0 {
        return Vec::new();
    }

    let edges = edge_map(&to_gray(rgba), cfg);
    let cleaned = remove_small_edges(&edges, cfg.min_component_pixels, cfg.diagonal_tolerance);
    let closed = close_gaps(&cleaned, cfg.close_gaps_radius);
    if sink.wants_images() {
        sink.image("arrows/edges", &edges);
        sink.image("arrows/cleaned", &cleaned);
        sink.image("arrows/closed", &closed);
    }

    let segments = probabilistic_hough(&closed, &cfg.hough);
    let center = [w as f64 / 2.0, h as f64 / 2.0];
    let outer_radius = config.geometry.outer_radius(w, h);
    let selected = select_arrows(&segments, perspective, cfg.min_distance_px, center, outer_radius);

    let mut record = ArrowDebug {
        edge_pixels: count_nonzero(&edges),
        edge_pixels_after_cleanup: count_nonzero(&cleaned),
        segments: segments.len(),
        selected: selected.len(),
        kept: selected.len(),
        outer_radius,
    };
    let marks = if cfg.filter_length_outliers {
        remove_length_outliers(selected)
    } else {
        selected
    };
    record.kept = marks.len();

    tracing::info!(
        "{} line segments, {} arrows after selection",
        segments.len(),
        marks.len()
    );
    sink.arrows(record);
    marks
}

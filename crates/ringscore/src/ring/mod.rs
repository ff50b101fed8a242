//! Ring geometry: band search, ellipse operators and ring-set assembly.

mod band;
mod ellipse;
mod geometry;

pub use band::{
    brighter_inner_ellipse, closest_contour_to_center, fit_ring_ellipse,
    largest_contour_containing, outer_band_ellipse, BandSearch, MaskLevel,
};
pub use ellipse::{
    average_ellipse, next_ellipse, next_ellipse_recursive, normalize_deg, AngleAveraging,
    Direction, RingEllipse,
};
pub use geometry::{
    assemble_rings, estimate_rings, infer_perspective, BandEllipses, Perspective, RingSet,
    RING_COUNT,
};

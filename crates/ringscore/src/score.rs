//! Point-to-score mapping.

use crate::ring::{RingEllipse, RING_COUNT};

/// How detected points are mapped to ring values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoringStrategy {
    /// Containment in the estimated ring ellipses.
    #[default]
    Ellipses,
    /// Concentric distance buckets around a fixed center.
    Radial,
}

/// A point together with the ring it landed in.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ScoredPoint {
    pub point: [f64; 2],
    /// Ring index, 0 = outermost.
    pub ring_index: usize,
    pub value: u32,
}

impl ScoredPoint {
    fn from_ring(point: [f64; 2], ring_index: usize) -> Self {
        Self {
            point,
            ring_index,
            value: ring_index as u32 + 1,
        }
    }
}

/// Innermost ring containing `point`, if any.
pub fn ring_index_of(point: [f64; 2], rings: &[RingEllipse]) -> Option<usize> {
    (0..rings.len()).rev().find(|&i| rings[i].contains(point))
}

/// Score each point by the innermost ring that contains it.
///
/// Points outside every ring are omitted; the output keeps input order.
pub fn score_by_ellipses(points: &[[f64; 2]], rings: &[RingEllipse]) -> Vec<ScoredPoint> {
    points
        .iter()
        .filter_map(|&p| {
            let idx = ring_index_of(p, rings);
            if idx.is_none() {
                tracing::trace!("point ({:.1}, {:.1}) outside all rings", p[0], p[1]);
            }
            idx.map(|i| ScoredPoint::from_ring(p, i))
        })
        .collect()
}

/// Score each point by its distance from `center`.
///
/// Distances up to `inner_radius` score 10; the band up to `outer_radius` is
/// split into nine equal steps scoring 9 down to 1. Farther points and
/// points with a non-finite distance are omitted.
pub fn score_by_radius(
    points: &[[f64; 2]],
    center: [f64; 2],
    inner_radius: f64,
    outer_radius: f64,
) -> Vec<ScoredPoint> {
    let top = RING_COUNT - 1;
    let step = (outer_radius - inner_radius) / top as f64;
    points
        .iter()
        .filter_map(|&p| {
            let d = (p[0] - center[0]).hypot(p[1] - center[1]);
            if !d.is_finite() {
                tracing::trace!("point ({}, {}) has no finite distance", p[0], p[1]);
                return None;
            }
            if d <= inner_radius {
                return Some(ScoredPoint::from_ring(p, top));
            }
            if d > outer_radius || !(step > 0.0) {
                return None;
            }
            let steps_out = ((d - inner_radius) / step).ceil() as usize;
            Some(ScoredPoint::from_ring(p, top - steps_out.min(top)))
        })
        .collect()
}

pub fn total_score(scored: &[ScoredPoint]) -> u32 {
    scored.iter().map(|s| s.value).sum()
}

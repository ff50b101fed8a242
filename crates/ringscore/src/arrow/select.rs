//! Turning raw segments into arrow marks.

use super::hough::LineSegment;
use crate::ring::Perspective;

/// Arrow shaft with its head (`target`) and the opposite end.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ArrowMark {
    pub target: [f64; 2],
    pub tail: [f64; 2],
}

impl ArrowMark {
    /// `Left` takes the left endpoint as the head, `Right` the right one.
    pub fn from_segment(seg: &LineSegment, perspective: Perspective) -> Self {
        match perspective {
            Perspective::Left => Self {
                target: seg.point1,
                tail: seg.point2,
            },
            Perspective::Right => Self {
                target: seg.point2,
                tail: seg.point1,
            },
        }
    }

    pub fn length(&self) -> f64 {
        distance(self.target, self.tail)
    }
}

fn distance(a: [f64; 2], b: [f64; 2]) -> f64 {
    (a[0] - b[0]).hypot(a[1] - b[1])
}

/// Accept segments in detection order.
///
/// A segment is dropped when its head or tail is closer than `min_distance`
/// to the corresponding end of an accepted mark, or when its head lies
/// farther than `outer_radius` from `center`.
pub fn select_arrows(
    segments: &[LineSegment],
    perspective: Perspective,
    min_distance: f64,
    center: [f64; 2],
    outer_radius: f64,
) -> Vec<ArrowMark> {
    let mut accepted: Vec<ArrowMark> = Vec::new();
    for seg in segments {
        let mark = ArrowMark::from_segment(seg, perspective);
        let duplicate = accepted.iter().any(|a| {
            distance(mark.target, a.target) < min_distance
                || distance(mark.tail, a.tail) < min_distance
        });
        if duplicate {
            tracing::trace!(
                "arrow at ({:.0}, {:.0}) duplicates an accepted one",
                mark.target[0],
                mark.target[1]
            );
            continue;
        }
        if distance(mark.target, center) > outer_radius {
            tracing::trace!(
                "arrow at ({:.0}, {:.0}) outside the target face",
                mark.target[0],
                mark.target[1]
            );
            continue;
        }
        accepted.push(mark);
    }
    accepted
}

/// Values kept by the 1.5 × IQR rule, as `[low, high]` bounds.
///
/// Quartiles are read from the sorted data at `floor(n / 4)` and
/// `ceil(3n / 4 - 1)`.
pub fn iqr_bounds(values: &[f64]) -> Option<[f64; 2]> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let n = sorted.len();
    let q1 = sorted[n / 4];
    let q3 = sorted[((3 * n) as f64 / 4.0 - 1.0).ceil().max(0.0) as usize];
    let iqr = q3 - q1;
    Some([q1 - 1.5 * iqr, q3 + 1.5 * iqr])
}

/// Drop marks whose length is an IQR outlier.
pub fn remove_length_outliers(marks: Vec<ArrowMark>) -> Vec<ArrowMark> {
    let lengths: Vec<f64> = marks.iter().map(ArrowMark::length).collect();
    let Some([lo, hi]) = iqr_bounds(&lengths) else {
        return marks;
    };
    marks
        .into_iter()
        .zip(lengths)
        .filter(|(_, len)| (lo..=hi).contains(len))
        .map(|(m, _)| m)
        .collect()
}

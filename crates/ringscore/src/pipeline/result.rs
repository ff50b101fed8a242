use crate::arrow::ArrowMark;
use crate::ring::{Perspective, RingEllipse, RING_COUNT};
use crate::score::{ScoredPoint, ScoringStrategy};

/// Full scoring result for a single image.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ScoreResult {
    /// Dimensions [width, height] of the image the rings were measured on.
    pub image_size: [u32; 2],
    /// Whether the input was rectified before ring search.
    #[serde(default)]
    pub rectified: bool,
    pub perspective: Perspective,
    /// Ten ring boundaries, outermost first.
    pub rings: Vec<RingEllipse>,
    /// Accepted arrow marks in detection order.
    pub arrows: Vec<ArrowMark>,
    /// Scored arrow heads; heads outside every ring are absent.
    pub scored: Vec<ScoredPoint>,
    pub total_score: u32,
    pub strategy: ScoringStrategy,
}

impl ScoreResult {
    /// Arrows that did not produce a score.
    pub fn unscored_count(&self) -> usize {
        self.arrows.len().saturating_sub(self.scored.len())
    }

    /// Number of hits per ring value, index 0 holding value 1.
    pub fn histogram(&self) -> [u32; RING_COUNT] {
        let mut hist = [0u32; RING_COUNT];
        for s in &self.scored {
            if let Some(slot) = hist.get_mut(s.ring_index) {
                *slot += 1;
            }
        }
        hist
    }
}

//! High-level scoring API.
//!
//! [`TargetScorer`] is the primary entry point. It wraps a [`ScoreConfig`]
//! and runs the full pipeline, or individual stages, on RGBA images.

use image::RgbaImage;
use std::borrow::Cow;
use std::path::Path;

use crate::config::ScoreConfig;
use crate::debug_dump::{DebugCollector, DebugDump, DebugSink, NullSink};
use crate::error::PipelineError;
use crate::pipeline::{self, ScoreResult};
use crate::ring::RingSet;
use crate::score::ScoredPoint;

/// Primary scoring interface.
///
/// Create once, score many images. The scorer is never mutated by a run, so
/// a shared reference can be used from several threads.
///
/// # Examples
///
/// ```no_run
/// use ringscore::TargetScorer;
///
/// let scorer = TargetScorer::new();
/// let image = image::open("target.jpg").unwrap().to_rgba8();
/// let result = scorer.score(&image).unwrap();
/// println!("{} arrows, total {}", result.scored.len(), result.total_score);
/// ```
#[derive(Debug, Clone, Default)]
pub struct TargetScorer {
    config: ScoreConfig,
}

impl TargetScorer {
    /// Scorer with the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: ScoreConfig) -> Self {
        Self { config }
    }

    /// Load a JSON configuration and create a scorer in one step.
    pub fn from_config_file(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        Ok(Self::with_config(ScoreConfig::from_json_file(path)?))
    }

    pub fn config(&self) -> &ScoreConfig {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut ScoreConfig {
        &mut self.config
    }

    /// Run the full pipeline.
    pub fn score(&self, image: &RgbaImage) -> Result<ScoreResult, PipelineError> {
        pipeline::score_image(image, &self.config, &mut NullSink)
    }

    /// Run the full pipeline, reporting intermediate data to `sink`.
    pub fn score_with_sink(
        &self,
        image: &RgbaImage,
        sink: &mut dyn DebugSink,
    ) -> Result<ScoreResult, PipelineError> {
        pipeline::score_image(image, &self.config, sink)
    }

    /// Run the full pipeline and return a debug dump alongside the result.
    ///
    /// The dump is produced even when the run fails, holding whatever the
    /// stages reported before the failure.
    pub fn score_with_debug(
        &self,
        image: &RgbaImage,
    ) -> (Result<ScoreResult, PipelineError>, DebugDump) {
        let mut collector = DebugCollector::new();
        let result = pipeline::score_image(image, &self.config, &mut collector);
        let dump = collector.dump(&self.config, image.width(), image.height());
        (result, dump)
    }

    /// The image the ring and arrow stages see: rectified when
    /// `rectify.enable` is set, otherwise `image` unchanged.
    pub fn prepare_image<'a>(
        &self,
        image: &'a RgbaImage,
    ) -> Result<Cow<'a, RgbaImage>, PipelineError> {
        pipeline::prepare_image(image, &self.config, &mut NullSink)
    }

    /// Estimate the ten ring boundaries without looking for arrows.
    ///
    /// Runs on `image` as given; pass it through [`Self::prepare_image`]
    /// first to honor `rectify.enable`.
    pub fn estimate_rings(&self, image: &RgbaImage) -> Result<RingSet, PipelineError> {
        crate::ring::estimate_rings(image, &self.config, &mut NullSink)
    }

    /// Warp the target card to a fronto-parallel view.
    pub fn rectify(&self, image: &RgbaImage) -> Result<RgbaImage, PipelineError> {
        crate::rectify::rectify(image, &self.config, &mut NullSink)
    }

    /// Score externally supplied points against an estimated ring set.
    pub fn score_points(
        &self,
        points: &[[f64; 2]],
        rings: &RingSet,
        image_size: [u32; 2],
    ) -> Vec<ScoredPoint> {
        pipeline::score_points(points, &rings.rings, image_size, &self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ring::Perspective;
    use crate::score::ScoringStrategy;
    use crate::test_utils::SyntheticTarget;

    #[test]
    fn scorer_config_mut() {
        let mut scorer = TargetScorer::new();
        scorer.config_mut().scoring.strategy = ScoringStrategy::Radial;
        scorer.config_mut().perspective = Some(Perspective::Left);
        assert_eq!(scorer.config().scoring.strategy, ScoringStrategy::Radial);
        assert_eq!(scorer.config().perspective, Some(Perspective::Left));
    }

    #[test]
    fn rings_without_arrows() {
        let target = SyntheticTarget::default();
        let scorer = TargetScorer::new();
        let set = scorer.estimate_rings(&target.render()).expect("rings");
        assert_eq!(set.rings.len(), 10);

        let scored = scorer.score_points(&[target.ring(9).center], &set, [400, 400]);
        assert_eq!(scored.len(), 1);
        assert_eq!(scored[0].value, 10);
    }

    #[test]
    fn clean_target_scores_nothing() {
        let img = SyntheticTarget::default().render();
        let result = TargetScorer::new().score(&img).expect("score");
        assert!(result.arrows.is_empty());
        assert_eq!(result.total_score, 0);
        assert_eq!(result.unscored_count(), 0);
    }

    #[test]
    fn debug_dump_survives_failure() {
        let img = RgbaImage::new(0, 0);
        let (result, dump) = TargetScorer::new().score_with_debug(&img);
        assert!(result.is_err());
        assert_eq!(dump.schema_version, crate::debug_dump::DEBUG_SCHEMA_V1);
        assert!(dump.stages.bands.is_empty());
    }

    #[test]
    fn debug_dump_records_bands() {
        let img = SyntheticTarget::default().render();
        let (result, dump) = TargetScorer::new().score_with_debug(&img);
        assert!(result.is_ok());
        assert_eq!(dump.stages.bands.len(), 4);
        assert_eq!(dump.stages.rings.len(), 10);
        assert_eq!(dump.image.width, 400);
    }

    #[test]
    fn prepare_image_honors_rectify_flag() {
        let flat = RgbaImage::from_pixel(64, 64, image::Rgba([128, 128, 128, 255]));
        let mut scorer = TargetScorer::new();
        assert_eq!(*scorer.prepare_image(&flat).expect("as given"), flat);

        scorer.config_mut().rectify.enable = true;
        let err = scorer.prepare_image(&flat).unwrap_err();
        assert_eq!(err.stage(), Some(crate::error::Stage::RectifySquare));
    }

    #[test]
    fn missing_config_file_is_an_error() {
        assert!(TargetScorer::from_config_file(Path::new("/nonexistent/ringscore.json")).is_err());
    }
}

//! Top-level pipeline orchestrator: rectify → rings → arrows → score.

use std::borrow::Cow;

use image::RgbaImage;

use super::ScoreResult;
use crate::arrow::detect_arrows;
use crate::config::ScoreConfig;
use crate::debug_dump::DebugSink;
use crate::error::PipelineError;
use crate::rectify::rectify;
use crate::ring::{estimate_rings, RingEllipse};
use crate::score::{score_by_ellipses, score_by_radius, total_score, ScoredPoint, ScoringStrategy};

/// Map `points` to ring values with the configured strategy.
///
/// `image_size` only matters for the radial strategy, which derives its
/// default center and radii from it.
pub(crate) fn score_points(
    points: &[[f64; 2]],
    rings: &[RingEllipse],
    image_size: [u32; 2],
    config: &ScoreConfig,
) -> Vec<ScoredPoint> {
    match config.scoring.strategy {
        ScoringStrategy::Ellipses => score_by_ellipses(points, rings),
        ScoringStrategy::Radial => {
            let radial = &config.scoring.radial;
            let [w, h] = image_size;
            let center = radial
                .center
                .unwrap_or([w as f64 / 2.0, h as f64 / 2.0]);
            let reference = config.geometry.reference_radius(w, h);
            score_by_radius(
                points,
                center,
                radial.inner_radius_frac * reference,
                radial.outer_radius_frac * reference,
            )
        }
    }
}

/// The image the ring and arrow stages run on: rectified when
/// `config.rectify.enable` is set, otherwise `rgba` itself.
pub(crate) fn prepare_image<'a>(
    rgba: &'a RgbaImage,
    config: &ScoreConfig,
    sink: &mut dyn DebugSink,
) -> Result<Cow<'a, RgbaImage>, PipelineError> {
    let (w, h) = rgba.dimensions();
    if w == 0 || h == 0 {
        return Err(PipelineError::EmptyImage {
            width: w,
            height: h,
        });
    }
    if !config.rectify.enable {
        return Ok(Cow::Borrowed(rgba));
    }
    let rectified = rectify(rgba, config, sink)?;
    let (rw, rh) = rectified.dimensions();
    tracing::info!("rectified {}x{} -> {}x{}", w, h, rw, rh);
    sink.rectified(rw, rh);
    Ok(Cow::Owned(rectified))
}

pub(crate) fn score_image(
    rgba: &RgbaImage,
    config: &ScoreConfig,
    sink: &mut dyn DebugSink,
) -> Result<ScoreResult, PipelineError> {
    let image = prepare_image(rgba, config, sink)?;
    let image_size = [image.width(), image.height()];

    let ring_set = estimate_rings(&image, config, sink)?;
    let arrows = detect_arrows(&image, ring_set.perspective, config, sink);

    let heads: Vec<[f64; 2]> = arrows.iter().map(|a| a.target).collect();
    let scored = score_points(&heads, &ring_set.rings, image_size, config);
    let total = total_score(&scored);
    tracing::info!(
        "{} arrows, {} scored, total {} ({:?})",
        arrows.len(),
        scored.len(),
        total,
        config.scoring.strategy
    );

    Ok(ScoreResult {
        image_size,
        rectified: config.rectify.enable,
        perspective: ring_set.perspective,
        rings: ring_set.rings,
        arrows,
        scored,
        total_score: total,
        strategy: config.scoring.strategy,
    })
}

//! Ten-ring assembly and the band search driver.

use image::RgbaImage;

use super::band::{brighter_inner_ellipse, outer_band_ellipse, BandSearch};
use super::ellipse::{
    average_ellipse, next_ellipse_recursive, AngleAveraging, Direction, RingEllipse,
};
use crate::config::ScoreConfig;
use crate::debug_dump::DebugSink;
use crate::error::{PipelineError, Stage};
use crate::preprocess::{apply_mask, red_filter, to_gray};

/// Number of scoring rings on the target face.
pub const RING_COUNT: usize = 10;

/// Side of the image on which arrow heads sit.
///
/// An off-axis camera makes inner ring centers drift away from the viewer;
/// arrow shafts then point from their tails toward that side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Perspective {
    Left,
    Right,
}

/// Band ellipses measured directly from the image.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct BandEllipses {
    pub black: RingEllipse,
    pub blue: RingEllipse,
    pub red: RingEllipse,
    pub yellow: RingEllipse,
}

/// Ordered ring boundaries, outermost (index 0) to innermost.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct RingSet {
    pub rings: Vec<RingEllipse>,
    pub bands: BandEllipses,
    pub perspective: Perspective,
}

/// Derive all ten ring boundaries from the four measured bands.
pub fn assemble_rings(bands: &BandEllipses, rule: AngleAveraging) -> Vec<RingEllipse> {
    let BandEllipses {
        black,
        blue,
        red,
        yellow,
    } = bands;

    let black2 = average_ellipse(blue, black, rule);
    let whites = next_ellipse_recursive(black, &black2, Direction::Out, 2);
    let blue2 = average_ellipse(blue, red, rule);
    let red2 = average_ellipse(red, yellow, rule);
    let yellow2 = next_ellipse_recursive(&red2, yellow, Direction::In, 1);

    let mut rings = Vec::with_capacity(RING_COUNT);
    rings.extend(whites.iter().rev());
    rings.extend([*black, black2, *blue, blue2, *red, red2, *yellow]);
    rings.extend(yellow2);
    rings
}

/// `Right` when the outermost center lies right of the innermost one.
pub fn infer_perspective(rings: &[RingEllipse]) -> Perspective {
    match (rings.first(), rings.last()) {
        (Some(outer), Some(inner)) if outer.center[0] > inner.center[0] => Perspective::Right,
        _ => Perspective::Left,
    }
}

/// Measure the band ellipses and derive the ring set of one image.
pub fn estimate_rings(
    rgba: &RgbaImage,
    config: &ScoreConfig,
    sink: &mut dyn DebugSink,
) -> Result<RingSet, PipelineError> {
    let (w, h) = rgba.dimensions();
    if w == 0 || h == 0 {
        return Err(PipelineError::EmptyImage {
            width: w,
            height: h,
        });
    }
    let cfg = &config.rings;
    let gray = to_gray(rgba);

    let black = outer_band_ellipse(
        &gray,
        cfg.outer_blur_sigma,
        cfg.outer_mask_level,
        cfg.min_semi_axis_px,
        sink,
    )?;
    let black_mask = black.rasterize(w, h);
    let inside_black = apply_mask(rgba, &black_mask);
    let inside_black_gray = apply_mask(&gray, &black_mask);

    let band = |stage: Stage, scalar: f64| BandSearch {
        stage,
        scalar,
        invert: cfg.invert_bands,
        blur_sigma: cfg.band_blur_sigma,
        min_semi_axis_px: cfg.min_semi_axis_px,
    };

    let blue = brighter_inner_ellipse(
        &inside_black_gray,
        &black_mask,
        &band(Stage::BlueBand, cfg.blue_scalar),
        sink,
    )?;
    let blue_mask = blue.rasterize(w, h);

    let reds = red_filter(&inside_black, &cfg.red_filter);
    if sink.wants_images() {
        sink.image("red_filter", &reds);
    }
    let red = brighter_inner_ellipse(
        &reds,
        &blue_mask,
        &band(Stage::RedBand, cfg.red_scalar),
        sink,
    )?;
    let yellow = brighter_inner_ellipse(
        &inside_black_gray,
        &blue_mask,
        &band(Stage::YellowBand, cfg.yellow_scalar),
        sink,
    )?;

    let bands = BandEllipses {
        black,
        blue,
        red,
        yellow,
    };
    let rings = assemble_rings(&bands, cfg.angle_averaging);
    for (i, ring) in rings.iter().enumerate() {
        if !ring.is_proper() {
            tracing::warn!(
                "ring {} is degenerate after extrapolation: size=({:.1}, {:.1})",
                i,
                ring.size[0],
                ring.size[1]
            );
            sink.note(format!("ring {i} has non-positive size"));
        }
    }

    let perspective = match config.perspective {
        Some(forced) => forced,
        None => infer_perspective(&rings),
    };
    tracing::info!(
        "rings estimated: outer size=({:.1}, {:.1}) inner size=({:.1}, {:.1}) perspective={:?}",
        rings[0].size[0],
        rings[0].size[1],
        rings[RING_COUNT - 1].size[0],
        rings[RING_COUNT - 1].size[1],
        perspective
    );

    let set = RingSet {
        rings,
        bands,
        perspective,
    };
    sink.ring_set(&set);
    Ok(set)
}

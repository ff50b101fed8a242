//! Scoring configuration.
//!
//! Every threshold the pipeline uses lives here. All sections deserialize with
//! defaults for missing fields, so a JSON file only needs the overrides.

use std::path::Path;

use crate::ring::{AngleAveraging, MaskLevel, Perspective};
use crate::score::ScoringStrategy;

/// Physical proportions of the target face relative to the image.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct TargetGeometry {
    /// Visible scoring face radius as a fraction of half the shorter image side.
    pub reference_circle_scaling: f64,
    /// Extra margin applied on top of the reference radius when accepting
    /// arrow heads.
    pub outer_circle_scaling: f64,
}

impl Default for TargetGeometry {
    fn default() -> Self {
        Self {
            reference_circle_scaling: 0.7,
            outer_circle_scaling: 1.29,
        }
    }
}

impl TargetGeometry {
    /// Reference face radius for a `width × height` image.
    pub fn reference_radius(&self, width: u32, height: u32) -> f64 {
        width.min(height) as f64 / 2.0 * self.reference_circle_scaling
    }

    /// Radius beyond which arrow heads are discarded.
    pub fn outer_radius(&self, width: u32, height: u32) -> f64 {
        self.reference_radius(width, height) * self.outer_circle_scaling
    }
}

/// HSV gate used to isolate the red band. Hue uses the 0..180 half-degree
/// scale, saturation and value 0..255.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct RedFilterConfig {
    /// Upper bound of the low red hue range `[0, hue_low_max]`.
    pub hue_low_max: f32,
    /// Lower bound of the wrapped red hue range `[hue_high_min, 180]`.
    pub hue_high_min: f32,
    pub min_saturation: f32,
    pub min_value: f32,
}

impl Default for RedFilterConfig {
    fn default() -> Self {
        Self {
            hue_low_max: 10.0,
            hue_high_min: 170.0,
            min_saturation: 50.0,
            min_value: 50.0,
        }
    }
}

/// Band search: outer dark band, then relative-brightness inner bands.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct RingSearchConfig {
    /// Gaussian sigma applied to the dark-band mask before re-thresholding.
    pub outer_blur_sigma: f32,
    /// Level at which the blurred dark-band mask is re-thresholded. Mid-gray
    /// by default; `mean` reuses the global gray mean.
    pub outer_mask_level: MaskLevel,
    /// Gaussian sigma used inside each band search.
    pub band_blur_sigma: f32,
    /// Mean multiplier for the blue band (gray inside the dark band).
    pub blue_scalar: f64,
    /// Mean multiplier for the red band (red-filtered image inside blue).
    pub red_scalar: f64,
    /// Mean multiplier for the yellow band (gray inside blue).
    pub yellow_scalar: f64,
    /// Invert the first threshold of each band search.
    pub invert_bands: bool,
    /// Smallest accepted semi-axis of a fitted band ellipse (px).
    pub min_semi_axis_px: f64,
    /// Angle rule of the averaging operator.
    pub angle_averaging: AngleAveraging,
    pub red_filter: RedFilterConfig,
}

impl Default for RingSearchConfig {
    fn default() -> Self {
        Self {
            outer_blur_sigma: 13.0,
            outer_mask_level: MaskLevel::MidGray,
            band_blur_sigma: 10.0,
            blue_scalar: 1.0,
            red_scalar: 0.5,
            yellow_scalar: 1.5,
            invert_bands: true,
            min_semi_axis_px: 3.0,
            angle_averaging: AngleAveraging::Circular,
            red_filter: RedFilterConfig::default(),
        }
    }
}

/// Progressive probabilistic Hough transform parameters.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct HoughConfig {
    /// Distance resolution of the accumulator (px).
    pub rho: f64,
    /// Angle resolution of the accumulator (degrees).
    pub theta_deg: f64,
    /// Accumulator votes needed before a line is traced.
    pub threshold: u32,
    /// Shortest accepted segment (px, along the dominant axis).
    pub min_line_length: f64,
    /// Largest run of missing edge pixels bridged while tracing (px).
    pub max_line_gap: f64,
    /// Seed of the point-order shuffle.
    pub seed: u64,
}

impl Default for HoughConfig {
    fn default() -> Self {
        Self {
            rho: 1.0,
            theta_deg: 1.0,
            threshold: 300,
            min_line_length: 200.0,
            max_line_gap: 10.0,
            seed: 42,
        }
    }
}

/// Arrow shaft detection.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct ArrowDetectConfig {
    /// Fraction of pixels clipped at each end of the histogram by the
    /// contrast stretch.
    pub contrast_clip_fraction: f64,
    /// Gamma exponent applied after stretching (1.0 = identity).
    pub gamma: f64,
    pub blur_sigma: f32,
    pub canny_low: f32,
    pub canny_high: f32,
    /// Edge components smaller than this are erased.
    pub min_component_pixels: u32,
    /// Edge components whose pixel count is within this fraction of their
    /// bounding-box diagonal are erased.
    pub diagonal_tolerance: f64,
    /// Radius of the diamond dilation that bridges edge gaps (0 disables).
    pub close_gaps_radius: u8,
    pub hough: HoughConfig,
    /// Segments whose head or tail is closer than this to an accepted one
    /// are duplicates (px).
    pub min_distance_px: f64,
    /// Drop segments whose length is a 1.5×IQR outlier.
    pub filter_length_outliers: bool,
}

impl Default for ArrowDetectConfig {
    fn default() -> Self {
        Self {
            contrast_clip_fraction: 0.01,
            gamma: 1.0,
            blur_sigma: 2.0,
            canny_low: 10.0,
            canny_high: 40.0,
            min_component_pixels: 10,
            diagonal_tolerance: 0.1,
            close_gaps_radius: 3,
            hough: HoughConfig::default(),
            min_distance_px: 10.0,
            filter_length_outliers: false,
        }
    }
}

/// Parameters of the radial bucketing strategy.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct RadialConfig {
    /// Fixed center; `None` uses the image center.
    pub center: Option<[f64; 2]>,
    /// Perfect-score radius as a fraction of the reference radius.
    pub inner_radius_frac: f64,
    /// Outermost scoring radius as a fraction of the reference radius.
    pub outer_radius_frac: f64,
}

impl Default for RadialConfig {
    fn default() -> Self {
        Self {
            center: None,
            inner_radius_frac: 0.1,
            outer_radius_frac: 1.0,
        }
    }
}

#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    pub strategy: ScoringStrategy,
    pub radial: RadialConfig,
}

/// Optional fronto-parallel normalization before ring search.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct RectifyConfig {
    pub enable: bool,
    /// Blur applied before edge detection in both rectification steps.
    pub blur_sigma: f32,
    pub square_canny_low: f32,
    pub square_canny_high: f32,
    /// Chebyshev radius of the closing that joins card edges.
    pub close_radius: u8,
    /// Polygon simplification tolerance as a fraction of contour perimeter.
    pub poly_epsilon_frac: f64,
    /// Largest accepted relative gap between a quad's area and the area of a
    /// square with the same perimeter.
    pub square_tolerance: f64,
    /// Binary threshold isolating the dark target face.
    pub circle_threshold: u8,
    pub circle_canny_low: f32,
    pub circle_canny_high: f32,
}

impl Default for RectifyConfig {
    fn default() -> Self {
        Self {
            enable: false,
            blur_sigma: 1.1,
            square_canny_low: 50.0,
            square_canny_high: 150.0,
            close_radius: 2,
            poly_epsilon_frac: 0.03,
            square_tolerance: 0.35,
            circle_threshold: 50,
            circle_canny_low: 2.0,
            circle_canny_high: 200.0,
        }
    }
}

/// Top-level configuration of a scoring run.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct ScoreConfig {
    pub geometry: TargetGeometry,
    pub rings: RingSearchConfig,
    pub arrows: ArrowDetectConfig,
    pub scoring: ScoringConfig,
    pub rectify: RectifyConfig,
    /// Force the arrow-head side instead of inferring it from ring drift.
    pub perspective: Option<Perspective>,
}

impl ScoreConfig {
    /// Load from a JSON file; absent fields keep their defaults.
    pub fn from_json_file(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        let data = std::fs::read_to_string(path)?;
        Self::from_json_str(&data).map_err(Into::into)
    }

    pub fn from_json_str(data: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn partial_json_keeps_defaults() {
        let cfg = ScoreConfig::from_json_str(
            r#"{ "arrows": { "hough": { "threshold": 80 } }, "scoring": { "strategy": "radial" } }"#,
        )
        .expect("parse");
        assert_eq!(cfg.arrows.hough.threshold, 80);
        assert_relative_eq!(cfg.arrows.hough.min_line_length, 200.0);
        assert_relative_eq!(cfg.arrows.blur_sigma, 2.0);
        assert_eq!(cfg.scoring.strategy, ScoringStrategy::Radial);
        assert_relative_eq!(cfg.rings.outer_blur_sigma, 13.0);
        assert!(cfg.perspective.is_none());
    }

    #[test]
    fn default_round_trips_through_json() {
        let json = serde_json::to_string(&ScoreConfig::default()).expect("serialize");
        let back = ScoreConfig::from_json_str(&json).expect("parse");
        assert_relative_eq!(back.geometry.outer_circle_scaling, 1.29);
        assert_eq!(back.rings.angle_averaging, AngleAveraging::Circular);
    }

    #[test]
    fn outer_mask_level_parses() {
        assert_eq!(ScoreConfig::default().rings.outer_mask_level, MaskLevel::MidGray);
        let cfg = ScoreConfig::from_json_str(r#"{ "rings": { "outer_mask_level": "mean" } }"#)
            .expect("parse");
        assert_eq!(cfg.rings.outer_mask_level, MaskLevel::Mean);
        assert_relative_eq!(cfg.rings.outer_blur_sigma, 13.0);
    }

    #[test]
    fn outer_radius_uses_shorter_side() {
        let g = TargetGeometry::default();
        assert_relative_eq!(g.reference_radius(800, 600), 210.0, epsilon = 1e-9);
        assert_relative_eq!(g.outer_radius(800, 600), 270.9, epsilon = 1e-9);
    }
}

//! Color-band search: each band is the smoothed region brighter (or darker)
//! than the mean of an enclosing region, fitted with an ellipse.

use image::GrayImage;

use super::ellipse::RingEllipse;
use crate::conic::{fit_ellipse_direct, rms_sampson_distance};
use crate::debug_dump::{BandDebug, DebugSink};
use crate::error::{PipelineError, Stage};
use crate::preprocess::{
    blur, count_nonzero, find_external_contours, mean_intensity, threshold, Contour,
};

/// Re-threshold level of a blurred binary mask.
const MID_GRAY: f64 = 127.5;

/// Level at which the blurred outer-band mask is cut back to binary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MaskLevel {
    /// Halfway between the two mask values; keeps the blurred edge in place.
    #[default]
    MidGray,
    /// The global gray mean used for the first threshold. The cut sits
    /// inside the blurred edge, so the band shrinks by a few pixels.
    Mean,
}

impl MaskLevel {
    fn resolve(self, mean: f64) -> f64 {
        match self {
            Self::MidGray => MID_GRAY,
            Self::Mean => mean,
        }
    }
}

/// Parameters of one relative-brightness band search.
#[derive(Debug, Clone, Copy)]
pub struct BandSearch {
    pub stage: Stage,
    /// Multiplier applied to the region mean to get the first threshold.
    pub scalar: f64,
    /// Invert the first threshold (selects pixels brighter than the level).
    pub invert: bool,
    pub blur_sigma: f32,
    pub min_semi_axis_px: f64,
}

/// Fit an ellipse to a contour, rejecting fits with a short semi-axis.
pub fn fit_ring_ellipse(
    contour: &Contour,
    min_semi_axis_px: f64,
    stage: Stage,
) -> Result<RingEllipse, PipelineError> {
    let fitted = fit_ellipse_direct(&contour.to_f64())
        .map_err(|err| PipelineError::degenerate(stage, err))?;
    if fitted.b < min_semi_axis_px {
        return Err(PipelineError::DegenerateEllipse {
            stage,
            reason: format!(
                "semi-axis {:.2}px below minimum {:.2}px",
                fitted.b, min_semi_axis_px
            ),
        });
    }
    Ok(RingEllipse::from(fitted))
}

/// Contour whose centroid is nearest `center`; zero-area contours are skipped.
pub fn closest_contour_to_center(contours: &[Contour], center: [f64; 2]) -> Option<&Contour> {
    contours
        .iter()
        .filter_map(|c| {
            let [cx, cy] = c.centroid()?;
            Some((c, (cx - center[0]).hypot(cy - center[1])))
        })
        .min_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(c, _)| c)
}

/// Largest-area contour whose polygon contains `point`.
pub fn largest_contour_containing(contours: &[Contour], point: [f64; 2]) -> Option<&Contour> {
    contours
        .iter()
        .filter(|c| c.contains(point))
        .max_by(|a, b| a.area().total_cmp(&b.area()))
}

fn largest_contour(contours: &[Contour]) -> Option<&Contour> {
    contours.iter().max_by(|a, b| a.area().total_cmp(&b.area()))
}

fn fit_rms(contour: &Contour, ellipse: &RingEllipse) -> f64 {
    rms_sampson_distance(&ellipse.to_conic_ellipse(), &contour.to_f64())
}

/// Ellipse of the band selected relative to the mean of `region` in `source`.
///
/// `source` is thresholded at `mean * scalar`, blurred and re-thresholded
/// inverted at mid-gray, so with `invert` set the result covers the pixels
/// brighter than the level. The largest external contour is fitted rather
/// than the first one found, so stray specks traced earlier in scan order
/// cannot stand in for the band.
pub fn brighter_inner_ellipse(
    source: &GrayImage,
    region: &GrayImage,
    search: &BandSearch,
    sink: &mut dyn DebugSink,
) -> Result<RingEllipse, PipelineError> {
    let stage = search.stage;
    let mean = mean_intensity(source, Some(region)).ok_or(PipelineError::EmptyMask { stage })?;
    let level = mean * search.scalar;

    let binary = threshold(source, level, search.invert);
    let mask = threshold(&blur(&binary, search.blur_sigma), MID_GRAY, true);
    if sink.wants_images() {
        sink.image(&format!("{stage}/binary"), &binary);
        sink.image(&format!("{stage}/mask"), &mask);
    }

    let contours = find_external_contours(&mask);
    let contour = largest_contour(&contours).ok_or(PipelineError::NoContourFound { stage })?;
    let ellipse = fit_ring_ellipse(contour, search.min_semi_axis_px, stage)?;

    tracing::debug!(
        "{}: mean={:.1} level={:.1} contours={} ellipse center=({:.1}, {:.1}) size=({:.1}, {:.1}) angle={:.1}",
        stage,
        mean,
        level,
        contours.len(),
        ellipse.center[0],
        ellipse.center[1],
        ellipse.size[0],
        ellipse.size[1],
        ellipse.angle_deg,
    );
    sink.band(BandDebug {
        stage,
        mean,
        level,
        mask_pixels: count_nonzero(&mask),
        contour_count: contours.len(),
        contour_points: contour.len(),
        fit_rms_px: fit_rms(contour, &ellipse),
        ellipse,
    });
    Ok(ellipse)
}

/// Ellipse of the outermost dark band.
///
/// Pixels darker than the global mean are selected, smoothed with
/// `blur_sigma` and re-thresholded at `mask_level`; the external contour
/// closest to the image center is fitted.
pub fn outer_band_ellipse(
    gray: &GrayImage,
    blur_sigma: f32,
    mask_level: MaskLevel,
    min_semi_axis_px: f64,
    sink: &mut dyn DebugSink,
) -> Result<RingEllipse, PipelineError> {
    let stage = Stage::OuterBand;
    let (w, h) = gray.dimensions();
    let mean = mean_intensity(gray, None).ok_or(PipelineError::EmptyMask { stage })?;

    let binary = threshold(gray, mean, true);
    let mask = threshold(&blur(&binary, blur_sigma), mask_level.resolve(mean), false);
    if sink.wants_images() {
        sink.image(&format!("{stage}/binary"), &binary);
        sink.image(&format!("{stage}/mask"), &mask);
    }

    // A uniform image selects everything or nothing; neither has a band.
    let mask_pixels = count_nonzero(&mask);
    if mask_pixels == 0 || mask_pixels == w as usize * h as usize {
        return Err(PipelineError::NoContourFound { stage });
    }

    let contours = find_external_contours(&mask);
    let center = [w as f64 / 2.0, h as f64 / 2.0];
    let contour = closest_contour_to_center(&contours, center)
        .ok_or(PipelineError::NoContourFound { stage })?;
    let ellipse = fit_ring_ellipse(contour, min_semi_axis_px, stage)?;

    tracing::debug!(
        "{}: mean={:.1} contours={} ellipse center=({:.1}, {:.1}) size=({:.1}, {:.1})",
        stage,
        mean,
        contours.len(),
        ellipse.center[0],
        ellipse.center[1],
        ellipse.size[0],
        ellipse.size[1],
    );
    sink.band(BandDebug {
        stage,
        mean,
        level: mean,
        mask_pixels,
        contour_count: contours.len(),
        contour_points: contour.len(),
        fit_rms_px: fit_rms(contour, &ellipse),
        ellipse,
    });
    Ok(ellipse)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::debug_dump::{DebugCollector, NullSink};
    use approx::assert_relative_eq;
    use image::Luma;
    use imageproc::point::Point;

    fn disk_image(w: u32, h: u32, cx: f64, cy: f64, r: f64, inside: u8, outside: u8) -> GrayImage {
        GrayImage::from_fn(w, h, |x, y| {
            let d = (x as f64 - cx).hypot(y as f64 - cy);
            Luma([if d <= r { inside } else { outside }])
        })
    }

    fn square(x0: i32, y0: i32, side: i32) -> Contour {
        Contour::new(vec![
            Point::new(x0, y0),
            Point::new(x0 + side, y0),
            Point::new(x0 + side, y0 + side),
            Point::new(x0, y0 + side),
        ])
    }

    #[test]
    fn closest_contour_skips_degenerate_ones() {
        let flat = Contour::new(vec![Point::new(49, 50), Point::new(51, 50)]);
        let near = square(40, 40, 10);
        let far = square(0, 0, 10);
        let contours = vec![flat, far, near.clone()];
        let picked = closest_contour_to_center(&contours, [50.0, 50.0]).expect("some");
        assert_eq!(picked, &near);
    }

    #[test]
    fn largest_containing_ignores_contours_missing_the_point() {
        let small = square(45, 45, 10);
        let big = square(10, 10, 80);
        let elsewhere = square(200, 200, 150);
        let contours = vec![small, big.clone(), elsewhere];
        assert_eq!(largest_contour_containing(&contours, [50.0, 50.0]), Some(&big));
        assert!(largest_contour_containing(&contours, [5.0, 5.0]).is_none());
    }

    #[test]
    fn outer_band_finds_dark_disk() {
        let gray = disk_image(160, 120, 78.0, 61.0, 40.0, 30, 220);
        let e = outer_band_ellipse(&gray, 4.0, MaskLevel::MidGray, 3.0, &mut NullSink)
            .expect("band");
        assert_relative_eq!(e.center[0], 78.0, epsilon = 1.0);
        assert_relative_eq!(e.center[1], 61.0, epsilon = 1.0);
        assert_relative_eq!(e.size[0], 80.0, epsilon = 4.0);
        assert_relative_eq!(e.size[1], 80.0, epsilon = 4.0);
    }

    #[test]
    fn outer_band_mean_level_shrinks_the_band() {
        // Mean is about 170, so the cut lands well inside the blurred edge.
        let gray = disk_image(160, 120, 78.0, 61.0, 40.0, 30, 220);
        let mid = outer_band_ellipse(&gray, 4.0, MaskLevel::MidGray, 3.0, &mut NullSink)
            .expect("mid-gray band");
        let mean = outer_band_ellipse(&gray, 4.0, MaskLevel::Mean, 3.0, &mut NullSink)
            .expect("mean band");
        assert_relative_eq!(mean.center[0], 78.0, epsilon = 1.0);
        assert_relative_eq!(mean.center[1], 61.0, epsilon = 1.0);
        assert_relative_eq!(mean.size[0], 80.0, epsilon = 7.0);
        assert!(mean.size[0] < mid.size[0]);
        assert!(mean.size[1] < mid.size[1]);
    }

    #[test]
    fn mask_level_resolution() {
        assert_relative_eq!(MaskLevel::MidGray.resolve(170.0), 127.5);
        assert_relative_eq!(MaskLevel::Mean.resolve(170.0), 170.0);
        assert_eq!(MaskLevel::default(), MaskLevel::MidGray);
    }

    #[test]
    fn outer_band_rejects_uniform_image() {
        let gray = GrayImage::from_pixel(64, 64, Luma([90]));
        let err = outer_band_ellipse(&gray, 4.0, MaskLevel::Mean, 3.0, &mut NullSink).unwrap_err();
        assert_eq!(
            err,
            PipelineError::NoContourFound {
                stage: Stage::OuterBand
            }
        );
    }

    #[test]
    fn brighter_band_inside_region() {
        // Dark disk of radius 50 holding a bright disk of radius 20.
        let gray = GrayImage::from_fn(140, 140, |x, y| {
            let d = (x as f64 - 70.0).hypot(y as f64 - 70.0);
            Luma([if d <= 20.0 {
                200
            } else if d <= 50.0 {
                30
            } else {
                0
            }])
        });
        let region = disk_image(140, 140, 70.0, 70.0, 50.0, 255, 0);
        let search = BandSearch {
            stage: Stage::BlueBand,
            scalar: 1.0,
            invert: true,
            blur_sigma: 3.0,
            min_semi_axis_px: 3.0,
        };
        let mut sink = DebugCollector::with_images();
        let e = brighter_inner_ellipse(&gray, &region, &search, &mut sink).expect("band");
        assert_relative_eq!(e.size[0], 40.0, epsilon = 3.0);
        assert_relative_eq!(e.size[1], 40.0, epsilon = 3.0);
        assert_relative_eq!(e.center[0], 70.0, epsilon = 1.0);

        assert_eq!(sink.stages.bands.len(), 1);
        assert_eq!(sink.stages.bands[0].stage, Stage::BlueBand);
        assert!(sink.stages.bands[0].fit_rms_px < 2.0);
        assert_eq!(sink.images().len(), 2);
    }

    #[test]
    fn empty_region_is_reported() {
        let gray = GrayImage::from_pixel(20, 20, Luma([100]));
        let region = GrayImage::new(20, 20);
        let search = BandSearch {
            stage: Stage::RedBand,
            scalar: 0.5,
            invert: true,
            blur_sigma: 2.0,
            min_semi_axis_px: 3.0,
        };
        let err = brighter_inner_ellipse(&gray, &region, &search, &mut NullSink).unwrap_err();
        assert_eq!(
            err,
            PipelineError::EmptyMask {
                stage: Stage::RedBand
            }
        );
    }

    #[test]
    fn tiny_fit_is_degenerate() {
        let c = square(10, 10, 3);
        let mut points = c.points.clone();
        points.extend([Point::new(11, 10), Point::new(13, 11), Point::new(12, 13)]);
        let err = fit_ring_ellipse(&Contour::new(points), 5.0, Stage::YellowBand);
        assert!(matches!(
            err,
            Err(PipelineError::DegenerateEllipse {
                stage: Stage::YellowBand,
                ..
            })
        ));
    }
}

//! Fronto-parallel normalization of a photographed target card.
//!
//! Two steps, both optional for the caller: the square card is warped to an
//! upright rectangle, then the target face ellipse is warped onto a reference
//! circle centered in the image.

use image::{GrayImage, Rgba, RgbaImage};
use imageproc::distance_transform::Norm;
use imageproc::geometric_transformations::{warp_into, Interpolation, Projection};
use imageproc::point::Point;

use crate::config::{RectifyConfig, ScoreConfig};
use crate::debug_dump::DebugSink;
use crate::error::{PipelineError, Stage};
use crate::preprocess::{blur, find_all_contours, find_external_contours, threshold, to_gray};
use crate::ring::{fit_ring_ellipse, largest_contour_containing};

fn closed_edges(gray: &GrayImage, low: f32, high: f32, radius: u8) -> GrayImage {
    let edges = imageproc::edges::canny(gray, low.min(high), low.max(high));
    if radius == 0 {
        edges
    } else {
        imageproc::morphology::close(&edges, Norm::LInf, radius)
    }
}

fn dist(a: (f32, f32), b: (f32, f32)) -> f32 {
    (a.0 - b.0).hypot(a.1 - b.1)
}

/// Corners ordered top-left, top-right, bottom-right, bottom-left.
fn order_corners(quad: &[Point<i32>]) -> [(f32, f32); 4] {
    let mut pts: Vec<(f32, f32)> = quad.iter().map(|p| (p.x as f32, p.y as f32)).collect();
    pts.sort_by(|a, b| a.1.total_cmp(&b.1));
    let (top, bottom) = pts.split_at_mut(2);
    top.sort_by(|a, b| a.0.total_cmp(&b.0));
    bottom.sort_by(|a, b| a.0.total_cmp(&b.0));
    [top[0], top[1], bottom[1], bottom[0]]
}

fn warp(
    rgba: &RgbaImage,
    from: [(f32, f32); 4],
    to: [(f32, f32); 4],
    out_w: u32,
    out_h: u32,
    stage: Stage,
) -> Result<RgbaImage, PipelineError> {
    let projection =
        Projection::from_control_points(from, to).ok_or(PipelineError::NoContourFound { stage })?;
    let mut out = RgbaImage::new(out_w, out_h);
    warp_into(rgba, &projection, Interpolation::Bilinear, Rgba([0, 0, 0, 0]), &mut out);
    Ok(out)
}

/// Warp the largest roughly-square quadrilateral containing the image center
/// to an upright image sized by its longer opposite sides.
pub fn rectify_square(
    rgba: &RgbaImage,
    cfg: &RectifyConfig,
    sink: &mut dyn DebugSink,
) -> Result<RgbaImage, PipelineError> {
    let stage = Stage::RectifySquare;
    let (w, h) = rgba.dimensions();
    let center = [w as f64 / 2.0, h as f64 / 2.0];

    let gray = blur(&to_gray(rgba), cfg.blur_sigma);
    let edges = closed_edges(&gray, cfg.square_canny_low, cfg.square_canny_high, cfg.close_radius);
    if sink.wants_images() {
        sink.image("rectify/square_edges", &edges);
    }

    let mut best: Option<(f64, Vec<Point<i32>>)> = None;
    for contour in find_all_contours(&edges) {
        let perimeter = contour.perimeter();
        let quad = contour.simplify(cfg.poly_epsilon_frac * perimeter);
        if quad.len() != 4 {
            continue;
        }
        let area = contour.area();
        let square_area = (perimeter / 4.0).powi(2);
        if (square_area - area).abs() > cfg.square_tolerance * square_area {
            continue;
        }
        if !contour.contains(center) {
            continue;
        }
        if best.as_ref().map_or(true, |(a, _)| area > *a) {
            best = Some((area, quad));
        }
    }
    let (area, quad) = best.ok_or(PipelineError::NoContourFound { stage })?;

    let [tl, tr, br, bl] = order_corners(&quad);
    let out_w = dist(tl, tr).max(dist(bl, br)).round().max(1.0) as u32;
    let out_h = dist(tl, bl).max(dist(tr, br)).round().max(1.0) as u32;
    let (xm, ym) = ((out_w - 1) as f32, (out_h - 1) as f32);
    tracing::info!("square card found: area={:.0} warped to {}x{}", area, out_w, out_h);

    warp(
        rgba,
        [tl, tr, br, bl],
        [(0.0, 0.0), (xm, 0.0), (xm, ym), (0.0, ym)],
        out_w,
        out_h,
        stage,
    )
}

/// Warp the largest closed contour around the image center onto a circle of
/// `reference_radius` centered in the image, via its fitted ellipse axes.
pub fn rectify_circle(
    rgba: &RgbaImage,
    cfg: &RectifyConfig,
    reference_radius: f64,
    sink: &mut dyn DebugSink,
) -> Result<RgbaImage, PipelineError> {
    let stage = Stage::RectifyCircle;
    let (w, h) = rgba.dimensions();
    let center = [w as f64 / 2.0, h as f64 / 2.0];

    let gray = blur(&to_gray(rgba), cfg.blur_sigma);
    let binary = threshold(&gray, cfg.circle_threshold as f64, false);
    let edges = closed_edges(
        &binary,
        cfg.circle_canny_low,
        cfg.circle_canny_high,
        cfg.close_radius,
    );
    if sink.wants_images() {
        sink.image("rectify/circle_binary", &binary);
        sink.image("rectify/circle_edges", &edges);
    }

    let contours = find_external_contours(&edges);
    let contour = largest_contour_containing(&contours, center)
        .ok_or(PipelineError::NoContourFound { stage })?;
    let face = fit_ring_ellipse(contour, 1.0, stage)?.to_conic_ellipse();

    let (sin_t, cos_t) = face.angle.sin_cos();
    let major = (cos_t, sin_t);
    let minor = (-sin_t, cos_t);
    let offsets = [
        (major.0, major.1),
        (-major.0, -major.1),
        (minor.0, minor.1),
        (-minor.0, -minor.1),
    ];
    let semi = [face.a, face.a, face.b, face.b];
    let mut from = [(0f32, 0f32); 4];
    let mut to = [(0f32, 0f32); 4];
    for i in 0..4 {
        let (ux, uy) = offsets[i];
        from[i] = (
            (face.cx + semi[i] * ux) as f32,
            (face.cy + semi[i] * uy) as f32,
        );
        to[i] = (
            (center[0] + reference_radius * ux) as f32,
            (center[1] + reference_radius * uy) as f32,
        );
    }
    tracing::info!(
        "target face ellipse a={:.1} b={:.1} mapped to radius {:.1}",
        face.a,
        face.b,
        reference_radius
    );
    warp(rgba, from, to, w, h, stage)
}

/// Square then circle rectification.
pub fn rectify(
    rgba: &RgbaImage,
    config: &ScoreConfig,
    sink: &mut dyn DebugSink,
) -> Result<RgbaImage, PipelineError> {
    let (w, h) = rgba.dimensions();
    if w == 0 || h == 0 {
        return Err(PipelineError::EmptyImage {
            width: w,
            height: h,
        });
    }
    let square = rectify_square(rgba, &config.rectify, sink)?;
    let (sw, sh) = square.dimensions();
    let radius = config.geometry.reference_radius(sw, sh);
    rectify_circle(&square, &config.rectify, radius, sink)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::debug_dump::NullSink;

    fn dark_run(img: &RgbaImage, horizontal: bool) -> usize {
        let (w, h) = img.dimensions();
        let n = if horizontal { w } else { h };
        (0..n)
            .filter(|&i| {
                let (x, y) = if horizontal { (i, h / 2) } else { (w / 2, i) };
                let p = img.get_pixel(x, y);
                p[3] > 0 && p[0] < 100
            })
            .count()
    }

    #[test]
    fn corners_sorted_clockwise_from_top_left() {
        let quad = [
            Point::new(90, 95),
            Point::new(10, 12),
            Point::new(8, 90),
            Point::new(95, 5),
        ];
        let [tl, tr, br, bl] = order_corners(&quad);
        assert_eq!(tl, (10.0, 12.0));
        assert_eq!(tr, (95.0, 5.0));
        assert_eq!(br, (90.0, 95.0));
        assert_eq!(bl, (8.0, 90.0));
    }

    #[test]
    fn square_card_is_cropped_upright() {
        let img = RgbaImage::from_fn(400, 360, |x, y| {
            let on_card = (80..320).contains(&x) && (60..300).contains(&y);
            Rgba(if on_card { [235, 235, 235, 255] } else { [40, 40, 40, 255] })
        });
        let out = rectify_square(&img, &RectifyConfig::default(), &mut NullSink).expect("card");
        let (w, h) = out.dimensions();
        assert!((232..=250).contains(&w), "width {w}");
        assert!((232..=250).contains(&h), "height {h}");
        assert!(out.get_pixel(w / 2, h / 2)[0] > 200);
    }

    #[test]
    fn elliptical_face_becomes_circle() {
        let img = RgbaImage::from_fn(400, 400, |x, y| {
            let u = (x as f64 - 200.0) / 120.0;
            let v = (y as f64 - 200.0) / 80.0;
            Rgba(if u * u + v * v <= 1.0 {
                [20, 20, 20, 255]
            } else {
                [230, 230, 230, 255]
            })
        });
        let out = rectify_circle(&img, &RectifyConfig::default(), 140.0, &mut NullSink)
            .expect("face");
        assert_eq!(out.dimensions(), (400, 400));
        let across = dark_run(&out, true) as f64;
        let down = dark_run(&out, false) as f64;
        assert!((across - 280.0).abs() < 12.0, "across {across}");
        assert!((down - 280.0).abs() < 12.0, "down {down}");
    }

    #[test]
    fn featureless_image_has_no_card() {
        let img = RgbaImage::from_pixel(100, 100, Rgba([128, 128, 128, 255]));
        let err = rectify_square(&img, &RectifyConfig::default(), &mut NullSink).unwrap_err();
        assert_eq!(err.stage(), Some(Stage::RectifySquare));
    }
}

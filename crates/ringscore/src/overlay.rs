//! Result visualization on top of the input image.

use image::{Rgba, RgbaImage};
use imageproc::drawing::{draw_filled_circle_mut, draw_hollow_circle_mut, draw_line_segment_mut};

use crate::arrow::ArrowMark;
use crate::ring::RingEllipse;
use crate::score::ScoredPoint;

const RING_COLOR: Rgba<u8> = Rgba([0, 255, 255, 255]);
const SHAFT_COLOR: Rgba<u8> = Rgba([255, 255, 255, 255]);
const HEAD_COLOR: Rgba<u8> = Rgba([0, 255, 0, 255]);
const SCORED_COLOR: Rgba<u8> = Rgba([255, 0, 255, 255]);

/// Rotated ellipse outline as a closed polyline.
pub fn draw_ellipse_mut(img: &mut RgbaImage, ellipse: &RingEllipse, color: Rgba<u8>) {
    let conic = ellipse.to_conic_ellipse();
    if !(conic.a > 0.0 && conic.b > 0.0) {
        return;
    }
    let n = ((conic.a + conic.b) * 2.0).clamp(16.0, 720.0) as usize;
    let pts = conic.sample_points(n);
    for (i, p) in pts.iter().enumerate() {
        let q = pts[(i + 1) % pts.len()];
        draw_line_segment_mut(img, (p[0] as f32, p[1] as f32), (q[0] as f32, q[1] as f32), color);
    }
}

/// Copy of `image` with rings, arrow shafts and scored heads drawn on it.
pub fn render_overlay(
    image: &RgbaImage,
    rings: &[RingEllipse],
    arrows: &[ArrowMark],
    scored: &[ScoredPoint],
) -> RgbaImage {
    let mut out = image.clone();
    for ring in rings {
        draw_ellipse_mut(&mut out, ring, RING_COLOR);
    }
    for arrow in arrows {
        draw_line_segment_mut(
            &mut out,
            (arrow.tail[0] as f32, arrow.tail[1] as f32),
            (arrow.target[0] as f32, arrow.target[1] as f32),
            SHAFT_COLOR,
        );
        let head = (arrow.target[0].round() as i32, arrow.target[1].round() as i32);
        draw_filled_circle_mut(&mut out, head, 2, HEAD_COLOR);
    }
    for s in scored {
        let p = (s.point[0].round() as i32, s.point[1].round() as i32);
        draw_hollow_circle_mut(&mut out, p, 6, SCORED_COLOR);
    }
    out
}

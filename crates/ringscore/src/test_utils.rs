//! Synthetic target images for unit tests.
//!
//! Built only under `cfg(test)`; `benches/hotpaths.rs` renders its own face.

use image::{Rgba, RgbaImage};

use crate::ring::RingEllipse;

/// Face colors of the ten rings, outermost first.
pub(crate) const RING_COLORS: [[u8; 4]; 10] = [
    [255, 255, 255, 255],
    [255, 255, 255, 255],
    [20, 20, 20, 255],
    [20, 20, 20, 255],
    [40, 110, 220, 255],
    [40, 110, 220, 255],
    [220, 40, 40, 255],
    [220, 40, 40, 255],
    [250, 220, 40, 255],
    [250, 220, 40, 255],
];

/// Ten concentric scoring rings of equal width on a uniform background.
///
/// Ring `i` (0 = outermost) is a circle of radius `(10 - i) * ring_width`
/// whose center moves `drift_x` pixels along x per ring, imitating the
/// off-axis view that drives perspective inference.
#[derive(Debug, Clone)]
pub(crate) struct SyntheticTarget {
    pub width: u32,
    pub height: u32,
    pub center: [f64; 2],
    pub ring_width: f64,
    pub drift_x: f64,
    pub background: [u8; 4],
}

impl Default for SyntheticTarget {
    fn default() -> Self {
        Self {
            width: 400,
            height: 400,
            center: [200.0, 200.0],
            ring_width: 14.0,
            drift_x: -1.0,
            background: [200, 200, 200, 255],
        }
    }
}

impl SyntheticTarget {
    /// Ground-truth boundary of ring `index`.
    pub fn ring(&self, index: usize) -> RingEllipse {
        let center = [self.center[0] + index as f64 * self.drift_x, self.center[1]];
        RingEllipse::circle(center, (10 - index) as f64 * self.ring_width)
    }

    pub fn rings(&self) -> Vec<RingEllipse> {
        (0..10).map(|i| self.ring(i)).collect()
    }

    pub fn render(&self) -> RgbaImage {
        let rings = self.rings();
        RgbaImage::from_fn(self.width, self.height, |x, y| {
            let p = [x as f64, y as f64];
            let color = (0..10)
                .rev()
                .find(|&i| rings[i].contains(p))
                .map_or(self.background, |i| RING_COLORS[i]);
            Rgba(color)
        })
    }
}

/// Paint a straight bar of the given thickness with round caps.
pub(crate) fn draw_bar(
    img: &mut RgbaImage,
    from: [f64; 2],
    to: [f64; 2],
    thickness: f64,
    color: [u8; 4],
) {
    let half = thickness / 2.0;
    let (dx, dy) = (to[0] - from[0], to[1] - from[1]);
    let len_sq = dx * dx + dy * dy;
    let x_lo = (from[0].min(to[0]) - half).floor().max(0.0) as u32;
    let y_lo = (from[1].min(to[1]) - half).floor().max(0.0) as u32;
    let x_hi = ((from[0].max(to[0]) + half).ceil().max(0.0) as u32).min(img.width() - 1);
    let y_hi = ((from[1].max(to[1]) + half).ceil().max(0.0) as u32).min(img.height() - 1);
    for y in y_lo..=y_hi {
        for x in x_lo..=x_hi {
            let (px, py) = (x as f64 - from[0], y as f64 - from[1]);
            let t = if len_sq > 0.0 {
                ((px * dx + py * dy) / len_sq).clamp(0.0, 1.0)
            } else {
                0.0
            };
            if (px - t * dx).hypot(py - t * dy) <= half {
                img.put_pixel(x, y, Rgba(color));
            }
        }
    }
}

//! Ring ellipse representation and the geometric operators that derive
//! unseen rings from fitted ones.

use image::{GrayImage, Luma};

use crate::conic;

/// Ellipse in the rotated-rectangle convention.
///
/// `size` holds full axis lengths; `angle_deg` rotates the `size[0]` axis
/// from +x (clockwise on screen, since y grows downward). Fitted ellipses keep
/// `angle_deg` in [0, 360) and positive sizes; extrapolated ones may drift to
/// zero or negative sizes and are used as they are.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct RingEllipse {
    pub center: [f64; 2],
    pub size: [f64; 2],
    pub angle_deg: f64,
}

/// Angle rule of [`average_ellipse`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AngleAveraging {
    /// Mean of the two angles on the circle.
    #[default]
    Circular,
    /// Keep the angle of the first argument.
    KeepFirst,
}

/// Extrapolation direction for [`next_ellipse`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Away from the inner ellipse, past the outer one.
    Out,
    /// Away from the outer ellipse, past the inner one.
    In,
}

impl RingEllipse {
    pub fn new(center: [f64; 2], size: [f64; 2], angle_deg: f64) -> Self {
        Self {
            center,
            size,
            angle_deg,
        }
    }

    /// Circle of the given radius.
    pub fn circle(center: [f64; 2], radius: f64) -> Self {
        Self::new(center, [2.0 * radius, 2.0 * radius], 0.0)
    }

    /// Semi-axes `[width / 2, height / 2]`.
    pub fn semi_axes(&self) -> [f64; 2] {
        [self.size[0] / 2.0, self.size[1] / 2.0]
    }

    /// True when both axes are strictly positive and all values finite.
    pub fn is_proper(&self) -> bool {
        self.size[0] > 0.0
            && self.size[1] > 0.0
            && self.center.iter().all(|v| v.is_finite())
            && self.angle_deg.is_finite()
    }

    /// Closed ellipse test `(x'/a)² + (y'/b)² <= 1` in the ellipse frame.
    ///
    /// Negative sizes act through their magnitude; a zero axis contains
    /// nothing.
    pub fn contains(&self, point: [f64; 2]) -> bool {
        let [a, b] = self.semi_axes();
        let (sin_t, cos_t) = self.angle_deg.to_radians().sin_cos();
        let dx = point[0] - self.center[0];
        let dy = point[1] - self.center[1];
        let u = dx * cos_t + dy * sin_t;
        let v = -dx * sin_t + dy * cos_t;
        (u / a).powi(2) + (v / b).powi(2) <= 1.0
    }

    /// Filled binary mask (255 inside) of a `width × height` image.
    pub fn rasterize(&self, width: u32, height: u32) -> GrayImage {
        let mut mask = GrayImage::new(width, height);
        let reach = self.size[0].abs().max(self.size[1].abs()) / 2.0;
        if !(reach > 0.0) || !reach.is_finite() {
            return mask;
        }
        let span = |c: f64, limit: u32| {
            let lo = (c - reach).floor().max(0.0) as u32;
            let hi = ((c + reach).ceil().max(0.0) as u32).min(limit.saturating_sub(1));
            lo..=hi
        };
        if width == 0 || height == 0 {
            return mask;
        }
        for y in span(self.center[1], height) {
            for x in span(self.center[0], width) {
                if self.contains([x as f64, y as f64]) {
                    mask.put_pixel(x, y, Luma([255]));
                }
            }
        }
        mask
    }

    /// Semi-axis/radian form for sampling and drawing.
    pub fn to_conic_ellipse(&self) -> conic::Ellipse {
        let [a, b] = self.semi_axes();
        conic::Ellipse {
            cx: self.center[0],
            cy: self.center[1],
            a: a.abs(),
            b: b.abs(),
            angle: self.angle_deg.to_radians(),
        }
    }
}

impl From<conic::Ellipse> for RingEllipse {
    fn from(e: conic::Ellipse) -> Self {
        Self {
            center: [e.cx, e.cy],
            size: [2.0 * e.a, 2.0 * e.b],
            angle_deg: normalize_deg(e.angle.to_degrees()),
        }
    }
}

/// Wrap into [0, 360).
pub fn normalize_deg(angle: f64) -> f64 {
    let a = angle.rem_euclid(360.0);
    // rem_euclid can round up to exactly 360 for tiny negative inputs.
    if a >= 360.0 {
        0.0
    } else {
        a
    }
}

/// Componentwise mean of two ellipses.
pub fn average_ellipse(
    first: &RingEllipse,
    second: &RingEllipse,
    rule: AngleAveraging,
) -> RingEllipse {
    let mean = |a: f64, b: f64| (a + b) / 2.0;

    let angle = match rule {
        AngleAveraging::KeepFirst => first.angle_deg,
        AngleAveraging::Circular => {
            let (mut a1, mut a2) = (first.angle_deg, second.angle_deg);
            if (a1 - a2).abs() > 180.0 {
                if a1 > a2 {
                    a2 += 360.0;
                } else {
                    a1 += 360.0;
                }
            }
            mean(a1, a2)
        }
    };

    RingEllipse {
        center: [
            mean(first.center[0], second.center[0]),
            mean(first.center[1], second.center[1]),
        ],
        size: [
            mean(first.size[0], second.size[0]),
            mean(first.size[1], second.size[1]),
        ],
        angle_deg: normalize_deg(angle),
    }
}

/// One step of differential extrapolation from a nested pair.
///
/// With `diff = outer − inner` (center, size and angle), `Out` yields
/// `outer + diff` and `In` yields `inner − diff`.
pub fn next_ellipse(outer: &RingEllipse, inner: &RingEllipse, direction: Direction) -> RingEllipse {
    let (base, sign) = match direction {
        Direction::Out => (outer, 1.0),
        Direction::In => (inner, -1.0),
    };
    let step = |o: f64, i: f64, b: f64| b + sign * (o - i);
    RingEllipse {
        center: [
            step(outer.center[0], inner.center[0], base.center[0]),
            step(outer.center[1], inner.center[1], base.center[1]),
        ],
        size: [
            step(outer.size[0], inner.size[0], base.size[0]),
            step(outer.size[1], inner.size[1], base.size[1]),
        ],
        angle_deg: normalize_deg(step(outer.angle_deg, inner.angle_deg, base.angle_deg)),
    }
}

/// `count` successive extrapolations, nearest to the starting pair first.
///
/// Each step slides the pair: `Out` continues from `(next, outer)`, `In`
/// from `(inner, next)`.
pub fn next_ellipse_recursive(
    outer: &RingEllipse,
    inner: &RingEllipse,
    direction: Direction,
    count: usize,
) -> Vec<RingEllipse> {
    let (mut outer, mut inner) = (*outer, *inner);
    let mut out = Vec::with_capacity(count);
    for _ in 0..count {
        let next = next_ellipse(&outer, &inner, direction);
        out.push(next);
        match direction {
            Direction::Out => (outer, inner) = (next, outer),
            Direction::In => (outer, inner) = (inner, next),
        }
    }
    out
}

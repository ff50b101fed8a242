//! Conic coefficients and geometric ellipse parameters.

use nalgebra::Matrix3;

// ── Error type ─────────────────────────────────────────────────────────────

/// Reasons a direct conic fit can fail.
#[derive(Debug, Clone, PartialEq)]
pub enum FitError {
    /// Fewer boundary points than the six a conic needs.
    TooFewPoints {
        /// Required minimum number of points.
        needed: usize,
        /// Provided number of points.
        got: usize,
    },
    /// The scatter system was singular (collinear or repeated points).
    Singular,
    /// The best conic was a parabola, hyperbola or an imaginary ellipse.
    NotAnEllipse,
}

impl std::fmt::Display for FitError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::TooFewPoints { needed, got } => {
                write!(f, "too few points: need {}, got {}", needed, got)
            }
            Self::Singular => write!(f, "singular scatter matrix"),
            Self::NotAnEllipse => write!(f, "fitted conic is not a real ellipse"),
        }
    }
}

impl std::error::Error for FitError {}

// ── Types ──────────────────────────────────────────────────────────────────

/// General conic `A x² + B xy + C y² + D x + E y + F = 0`, stored as
/// `[A, B, C, D, E, F]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConicCoeffs(pub [f64; 6]);

/// Geometric ellipse with semi-axes and a radian orientation.
///
/// After conversion from a conic, `a >= b` and `angle` lies in (−π/2, π/2].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ellipse {
    pub cx: f64,
    pub cy: f64,
    /// Semi-axis along `angle`.
    pub a: f64,
    /// Semi-axis perpendicular to `angle`.
    pub b: f64,
    /// Orientation of the `a` axis from +x, in radians.
    pub angle: f64,
}

impl ConicCoeffs {
    /// Value of the conic polynomial at `(x, y)`.
    pub fn algebraic_distance(&self, x: f64, y: f64) -> f64 {
        let [a, b, c, d, e, f] = self.0;
        a * x * x + b * x * y + c * y * y + d * x + e * y + f
    }

    /// True when the quadratic part is elliptic (B² − 4AC < 0).
    pub fn is_ellipse(&self) -> bool {
        let [a, b, c, ..] = self.0;
        b * b - 4.0 * a * c < 0.0
    }

    /// Geometric parameters, or `None` for non-elliptic or imaginary conics.
    pub fn to_ellipse(self) -> Option<Ellipse> {
        conic_to_ellipse(&self)
    }
}

impl Ellipse {
    /// Finite center and angle, strictly positive finite semi-axes.
    pub fn is_valid(&self) -> bool {
        [self.cx, self.cy, self.a, self.b, self.angle]
            .iter()
            .all(|v| v.is_finite())
            && self.a > 0.0
            && self.b > 0.0
    }

    pub fn to_conic(self) -> ConicCoeffs {
        ellipse_to_conic(&self)
    }

    /// `n` boundary points at uniform parameter steps.
    pub fn sample_points(&self, n: usize) -> Vec<[f64; 2]> {
        let (sin_t, cos_t) = self.angle.sin_cos();
        (0..n)
            .map(|i| {
                let t = std::f64::consts::TAU * i as f64 / n as f64;
                let (u, v) = (self.a * t.cos(), self.b * t.sin());
                [
                    self.cx + cos_t * u - sin_t * v,
                    self.cy + sin_t * u + cos_t * v,
                ]
            })
            .collect()
    }

    /// First-order geometric distance from `(x, y)` to the boundary.
    pub fn sampson_distance(&self, x: f64, y: f64) -> f64 {
        let conic = self.to_conic();
        let [a, b, c, d, e, _] = conic.0;
        let alg = conic.algebraic_distance(x, y);
        let gx = 2.0 * a * x + b * y + d;
        let gy = b * x + 2.0 * c * y + e;
        let grad_sq = gx * gx + gy * gy;
        if grad_sq < 1e-30 {
            alg.abs()
        } else {
            alg.abs() / grad_sq.sqrt()
        }
    }
}

// ── Conversion: conic ↔ ellipse ────────────────────────────────────────────

fn conic_to_ellipse(conic: &ConicCoeffs) -> Option<Ellipse> {
    let [a, b, c, d, e, f] = conic.0;

    let denom = 4.0 * a * c - b * b;
    if denom <= 0.0 {
        return None;
    }

    let m = Matrix3::new(
        a,
        b / 2.0,
        d / 2.0,
        b / 2.0,
        c,
        e / 2.0,
        d / 2.0,
        e / 2.0,
        f,
    );
    if m.determinant().abs() < 1e-15 {
        return None;
    }

    // Gradient vanishes at the center.
    let cx = (b * e - 2.0 * c * d) / denom;
    let cy = (b * d - 2.0 * a * e) / denom;

    // Eigenvalues of [[A, B/2], [B/2, C]].
    let half_sum = 0.5 * (a + c);
    let half_spread = 0.5 * ((a - c).powi(2) + b * b).sqrt();
    let lambda_major = half_sum - half_spread;
    let lambda_minor = half_sum + half_spread;

    let f_center = a * cx * cx + b * cx * cy + c * cy * cy + d * cx + e * cy + f;
    if f_center.abs() < 1e-15 {
        return None;
    }

    let a_sq = -f_center / lambda_major;
    let b_sq = -f_center / lambda_minor;
    if !(a_sq > 0.0 && b_sq > 0.0) {
        return None;
    }

    // 0.5·atan2(B, A − C) points along the larger eigenvalue, i.e. the short
    // axis; the long axis is a quarter turn away.
    let angle = if half_spread <= 1e-12 * half_sum.abs() {
        0.0
    } else {
        wrap_half_turn(0.5 * b.atan2(a - c) + std::f64::consts::FRAC_PI_2)
    };

    Some(Ellipse {
        cx,
        cy,
        a: a_sq.sqrt(),
        b: b_sq.sqrt(),
        angle,
    })
}

fn ellipse_to_conic(e: &Ellipse) -> ConicCoeffs {
    let (sin_t, cos_t) = e.angle.sin_cos();
    let inv_a2 = 1.0 / (e.a * e.a);
    let inv_b2 = 1.0 / (e.b * e.b);

    let a = cos_t * cos_t * inv_a2 + sin_t * sin_t * inv_b2;
    let b = 2.0 * cos_t * sin_t * (inv_a2 - inv_b2);
    let c = sin_t * sin_t * inv_a2 + cos_t * cos_t * inv_b2;
    let d = -2.0 * a * e.cx - b * e.cy;
    let ee = -b * e.cx - 2.0 * c * e.cy;
    let f = a * e.cx * e.cx + b * e.cx * e.cy + c * e.cy * e.cy - 1.0;

    ConicCoeffs([a, b, c, d, ee, f])
}

/// Wrap into (−π/2, π/2].
fn wrap_half_turn(angle: f64) -> f64 {
    use std::f64::consts::{FRAC_PI_2, PI};
    let mut t = angle % PI;
    if t > FRAC_PI_2 {
        t -= PI;
    } else if t <= -FRAC_PI_2 {
        t += PI;
    }
    t
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn tilted() -> Ellipse {
        Ellipse {
            cx: 120.0,
            cy: 90.0,
            a: 40.0,
            b: 22.0,
            angle: 0.4,
        }
    }

    #[test]
    fn conic_conversion_preserves_geometry() {
        let e = tilted();
        let back = e.to_conic().to_ellipse().expect("ellipse");
        assert_relative_eq!(back.cx, e.cx, epsilon = 1e-9);
        assert_relative_eq!(back.cy, e.cy, epsilon = 1e-9);
        assert_relative_eq!(back.a, e.a, epsilon = 1e-9);
        assert_relative_eq!(back.b, e.b, epsilon = 1e-9);
        assert_relative_eq!(back.angle, e.angle, epsilon = 1e-9);
    }

    #[test]
    fn swapped_axes_are_canonicalized() {
        let e = Ellipse {
            cx: 0.0,
            cy: 0.0,
            a: 10.0,
            b: 30.0,
            angle: 0.0,
        };
        let c = e.to_conic().to_ellipse().expect("ellipse");
        assert_relative_eq!(c.a, 30.0, epsilon = 1e-9);
        assert_relative_eq!(c.b, 10.0, epsilon = 1e-9);
        assert_relative_eq!(c.angle, std::f64::consts::FRAC_PI_2, epsilon = 1e-9);
    }

    #[test]
    fn sampled_points_lie_on_boundary() {
        let e = tilted();
        let conic = e.to_conic();
        for [x, y] in e.sample_points(64) {
            assert!(conic.algebraic_distance(x, y).abs() < 1e-10);
            assert!(e.sampson_distance(x, y) < 1e-8);
        }
        assert!(e.sampson_distance(e.cx, e.cy) > 1.0);
    }

    #[test]
    fn hyperbola_is_rejected() {
        // x² − y² − 1 = 0
        let h = ConicCoeffs([1.0, 0.0, -1.0, 0.0, 0.0, -1.0]);
        assert!(!h.is_ellipse());
        assert!(h.to_ellipse().is_none());
    }

    #[test]
    fn imaginary_ellipse_is_rejected() {
        // x² + y² + 1 = 0 has no real points.
        let c = ConicCoeffs([1.0, 0.0, 1.0, 0.0, 0.0, 1.0]);
        assert!(c.is_ellipse());
        assert!(c.to_ellipse().is_none());
    }
}

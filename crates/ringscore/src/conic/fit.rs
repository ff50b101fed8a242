//! Direct least-squares ellipse fitting (Fitzgibbon et al., 1999).

use nalgebra::{DMatrix, Matrix3, Vector6};

use super::eigen::constrained_eigenvector;
use super::types::{ConicCoeffs, Ellipse, FitError};

const MIN_POINTS: usize = 6;

/// Fit a conic that is guaranteed elliptic to `points`.
///
/// Points are centered and scaled (mean radius √2) before building the
/// scatter matrix, then the reduced 3×3 problem `M a₁ = λ C₁ a₁` is solved in
/// closed form.
pub fn fit_conic_direct(points: &[[f64; 2]]) -> Result<ConicCoeffs, FitError> {
    if points.len() < MIN_POINTS {
        return Err(FitError::TooFewPoints {
            needed: MIN_POINTS,
            got: points.len(),
        });
    }

    let frame = Normalization::of(points);
    let mut design = DMatrix::<f64>::zeros(points.len(), 6);
    for (row, p) in points.iter().enumerate() {
        let [x, y] = frame.apply(*p);
        for (col, v) in [x * x, x * y, y * y, x, y, 1.0].into_iter().enumerate() {
            design[(row, col)] = v;
        }
    }

    let scatter = design.transpose() * &design;
    let s_quad = scatter.fixed_view::<3, 3>(0, 0).into_owned();
    let s_mixed = scatter.fixed_view::<3, 3>(0, 3).into_owned();
    let s_lin = scatter.fixed_view::<3, 3>(3, 3).into_owned();

    let s_lin_inv = s_lin.try_inverse().ok_or(FitError::Singular)?;
    let reduced = s_quad - s_mixed * s_lin_inv * s_mixed.transpose();

    // C₁ encodes 4AC − B² = 1.
    let c1_inv = Matrix3::new(0.0, 0.0, 2.0, 0.0, -1.0, 0.0, 2.0, 0.0, 0.0)
        .try_inverse()
        .ok_or(FitError::Singular)?;

    let quad = constrained_eigenvector(&(c1_inv * reduced)).ok_or(FitError::NotAnEllipse)?;
    let lin = -s_lin_inv * s_mixed.transpose() * quad;

    let conic = frame.restore(&Vector6::new(
        quad[0], quad[1], quad[2], lin[0], lin[1], lin[2],
    ));
    match conic.to_ellipse() {
        Some(e) if conic.is_ellipse() && e.is_valid() => Ok(conic),
        _ => Err(FitError::NotAnEllipse),
    }
}

/// Fit and return the geometric form.
pub fn fit_ellipse_direct(points: &[[f64; 2]]) -> Result<Ellipse, FitError> {
    fit_conic_direct(points)?
        .to_ellipse()
        .ok_or(FitError::NotAnEllipse)
}

/// RMS Sampson distance of `points` to `ellipse`.
pub fn rms_sampson_distance(ellipse: &Ellipse, points: &[[f64; 2]]) -> f64 {
    if points.is_empty() {
        return 0.0;
    }
    let sum_sq: f64 = points
        .iter()
        .map(|&[x, y]| ellipse.sampson_distance(x, y).powi(2))
        .sum();
    (sum_sq / points.len() as f64).sqrt()
}

/// Similarity transform x' = s (x − m) used to condition the scatter matrix.
struct Normalization {
    mx: f64,
    my: f64,
    s: f64,
}

impl Normalization {
    fn of(points: &[[f64; 2]]) -> Self {
        let n = points.len() as f64;
        let mx = points.iter().map(|p| p[0]).sum::<f64>() / n;
        let my = points.iter().map(|p| p[1]).sum::<f64>() / n;
        let mean_r = points
            .iter()
            .map(|p| (p[0] - mx).hypot(p[1] - my))
            .sum::<f64>()
            / n;
        let s = if mean_r > 1e-15 {
            std::f64::consts::SQRT_2 / mean_r
        } else {
            1.0
        };
        Self { mx, my, s }
    }

    fn apply(&self, p: [f64; 2]) -> [f64; 2] {
        [(p[0] - self.mx) * self.s, (p[1] - self.my) * self.s]
    }

    /// Substitute x' = s (x − mx), y' = s (y − my) back into the conic.
    fn restore(&self, c: &Vector6<f64>) -> ConicCoeffs {
        let (mx, my, s) = (self.mx, self.my, self.s);
        let s2 = s * s;
        let (a, b, cc, d, e, f) = (c[0] * s2, c[1] * s2, c[2] * s2, c[3] * s, c[4] * s, c[5]);
        ConicCoeffs([
            a,
            b,
            cc,
            -2.0 * a * mx - b * my + d,
            -b * mx - 2.0 * cc * my + e,
            a * mx * mx + b * mx * my + cc * my * my - d * mx - e * my + f,
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rand::prelude::*;

    fn reference() -> Ellipse {
        Ellipse {
            cx: 210.0,
            cy: 180.0,
            a: 95.0,
            b: 70.0,
            angle: 0.35,
        }
    }

    #[test]
    fn exact_points_recover_parameters() {
        let e = reference();
        let pts = e.sample_points(60);
        let fitted = fit_ellipse_direct(&pts).expect("fit");

        assert_relative_eq!(fitted.cx, e.cx, epsilon = 1e-6);
        assert_relative_eq!(fitted.cy, e.cy, epsilon = 1e-6);
        assert_relative_eq!(fitted.a, e.a, epsilon = 1e-6);
        assert_relative_eq!(fitted.b, e.b, epsilon = 1e-6);
        assert_relative_eq!(fitted.angle, e.angle, epsilon = 1e-6);
        assert!(rms_sampson_distance(&fitted, &pts) < 1e-8);
    }

    #[test]
    fn noisy_boundary_stays_close() {
        let e = reference();
        let mut pts = e.sample_points(400);
        let mut rng = StdRng::seed_from_u64(7);
        for p in &mut pts {
            p[0] += rng.gen_range(-0.7..0.7);
            p[1] += rng.gen_range(-0.7..0.7);
        }

        let fitted = fit_ellipse_direct(&pts).expect("fit with noise");
        assert_relative_eq!(fitted.cx, e.cx, epsilon = 0.5);
        assert_relative_eq!(fitted.cy, e.cy, epsilon = 0.5);
        assert_relative_eq!(fitted.a, e.a, epsilon = 1.0);
        assert_relative_eq!(fitted.b, e.b, epsilon = 1.0);
    }

    #[test]
    fn pixel_circle_boundary() {
        // Integer boundary of a rasterized disk, as contour tracing yields.
        let (cx, cy, r) = (64.0f64, 48.0f64, 30.0f64);
        let inside = |x: i32, y: i32| (x as f64 - cx).hypot(y as f64 - cy) <= r;
        let mut pts = Vec::new();
        for y in 0..100 {
            for x in 0..130 {
                let interior =
                    inside(x - 1, y) && inside(x + 1, y) && inside(x, y - 1) && inside(x, y + 1);
                if inside(x, y) && !interior {
                    pts.push([x as f64, y as f64]);
                }
            }
        }
        let fitted = fit_ellipse_direct(&pts).expect("circle fit");
        assert_relative_eq!(fitted.cx, cx, epsilon = 0.2);
        assert_relative_eq!(fitted.cy, cy, epsilon = 0.2);
        assert_relative_eq!(fitted.a, r, epsilon = 1.0);
        assert_relative_eq!(fitted.b, r, epsilon = 1.0);
    }

    #[test]
    fn too_few_points_reports_counts() {
        let pts = [[0.0, 0.0], [1.0, 0.0], [0.0, 1.0]];
        assert_eq!(
            fit_conic_direct(&pts),
            Err(FitError::TooFewPoints { needed: 6, got: 3 })
        );
    }

    #[test]
    fn degenerate_inputs_fail_cleanly() {
        let line: Vec<[f64; 2]> = (0..12).map(|i| [i as f64 * 5.0, i as f64 * 2.0]).collect();
        assert!(fit_conic_direct(&line).is_err());

        let repeated = vec![[3.0, 4.0]; 10];
        assert!(fit_conic_direct(&repeated).is_err());

        let mut clusters = vec![[0.0, 0.0]; 5];
        clusters.extend(vec![[50.0, 50.0]; 5]);
        assert!(fit_conic_direct(&clusters).is_err());
    }
}

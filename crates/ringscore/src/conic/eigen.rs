//! Closed-form eigen solver for the reduced 3×3 Fitzgibbon system.

use nalgebra::{Matrix3, Vector3};

/// Eigenvector of `system` (= C⁻¹M) that satisfies the ellipse constraint
/// `4 v₀ v₂ − v₁² > 0`.
///
/// `system` is not symmetric, so the eigenvalues come from the characteristic
/// cubic and each eigenvector from the adjugate of `system − λI`. When more
/// than one root passes the constraint (noise), the smallest |λ| wins.
pub(crate) fn constrained_eigenvector(system: &Matrix3<f64>) -> Option<Vector3<f64>> {
    let m = system;
    let trace = m.trace();
    let principal_minors = m[(0, 0)] * m[(1, 1)] - m[(0, 1)] * m[(1, 0)]
        + m[(0, 0)] * m[(2, 2)]
        - m[(0, 2)] * m[(2, 0)]
        + m[(1, 1)] * m[(2, 2)]
        - m[(1, 2)] * m[(2, 1)];
    let det = m.determinant();

    real_cubic_roots(-trace, principal_minors, -det)
        .into_iter()
        .filter_map(|lambda| {
            let v = adjugate_null_vector(&(m - Matrix3::identity() * lambda))?;
            (4.0 * v[0] * v[2] - v[1] * v[1] > 0.0).then_some((lambda.abs(), v))
        })
        .min_by(|a, b| a.0.total_cmp(&b.0))
        .map(|(_, v)| v)
}

/// Null vector of a rank-2 matrix: the longest row of its adjugate.
fn adjugate_null_vector(m: &Matrix3<f64>) -> Option<Vector3<f64>> {
    let r0 = m.row(0).transpose();
    let r1 = m.row(1).transpose();
    let r2 = m.row(2).transpose();

    // Each cross product of two rows is orthogonal to both, hence in the
    // null space when the rows span a plane.
    let best = [r1.cross(&r2), r2.cross(&r0), r0.cross(&r1)]
        .into_iter()
        .max_by(|a, b| a.norm_squared().total_cmp(&b.norm_squared()))?;

    let norm_sq = best.norm_squared();
    if norm_sq < 1e-30 {
        return None;
    }
    Some(best / norm_sq.sqrt())
}

/// Real roots of the monic cubic `x³ + b x² + c x + d`.
fn real_cubic_roots(b: f64, c: f64, d: f64) -> Vec<f64> {
    // Depressed form t³ + p t + q with x = t − b/3.
    let p = c - b * b / 3.0;
    let q = 2.0 * b * b * b / 27.0 - b * c / 3.0 + d;
    let shift = -b / 3.0;

    let discriminant = -4.0 * p * p * p - 27.0 * q * q;
    if discriminant >= 0.0 {
        // Trigonometric form, three real roots.
        let r = (-p / 3.0).max(0.0).sqrt();
        if r < 1e-15 {
            return vec![shift];
        }
        let phi = (-q / (2.0 * r * r * r)).clamp(-1.0, 1.0).acos();
        (0..3)
            .map(|k| {
                let t = (phi + std::f64::consts::TAU * k as f64) / 3.0;
                2.0 * r * t.cos() + shift
            })
            .collect()
    } else {
        // Cardano, one real root.
        let s = (q * q / 4.0 + p * p * p / 27.0).sqrt();
        vec![(-q / 2.0 + s).cbrt() + (-q / 2.0 - s).cbrt() + shift]
    }
}

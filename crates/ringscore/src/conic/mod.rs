//! Ellipse fitting primitives.
//!
//! - Direct least-squares conic fit (Fitzgibbon et al., "Direct Least Square
//!   Fitting of Ellipses", 1999).
//! - Conversion between conic coefficients and geometric ellipse parameters.
//! - Sampson residuals for fit diagnostics.

mod eigen;
mod fit;
mod types;

pub use fit::{fit_conic_direct, fit_ellipse_direct, rms_sampson_distance};
pub use types::{ConicCoeffs, Ellipse, FitError};

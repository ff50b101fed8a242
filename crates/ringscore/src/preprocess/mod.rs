//! Image primitives shared by every stage: grayscale conversion, thresholding,
//! blur, masking, color gating and contour extraction.
//!
//! All functions allocate their output and leave the input untouched.

mod color;
mod contour;
mod gray;

pub use color::{adjust_gamma, red_filter, stretch_contrast};
pub use contour::{find_all_contours, find_external_contours, Contour};
pub use gray::{apply_mask, blur, count_nonzero, mean_intensity, threshold, to_gray};

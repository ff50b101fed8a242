//! High-level scoring pipeline.
//!
//! Wires the stages together: optional rectification -> ring estimation ->
//! arrow detection -> scoring. The algorithmic pieces live in `crate::ring`,
//! `crate::arrow`, `crate::rectify` and `crate::score`; this layer only owns
//! call order and data flow.
//!
//! Entry points:
//! - `score_image`: full run on one RGBA image
//! - `score_points`: map arbitrary points with a configured strategy
//! - `prepare_image`: the optional rectification step on its own

mod result;
mod run;

pub use result::ScoreResult;

pub(crate) use run::{prepare_image, score_image, score_points};

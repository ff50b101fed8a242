//! Pipeline failure type.

use crate::conic::FitError;

/// Pipeline stage that produced a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    OuterBand,
    BlueBand,
    RedBand,
    YellowBand,
    RectifySquare,
    RectifyCircle,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::OuterBand => "outer band",
            Self::BlueBand => "blue band",
            Self::RedBand => "red band",
            Self::YellowBand => "yellow band",
            Self::RectifySquare => "square rectification",
            Self::RectifyCircle => "circle rectification",
        };
        f.write_str(name)
    }
}

/// Fatal failure of a single scoring run. No partial score is produced.
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineError {
    /// Input image has a zero dimension.
    EmptyImage { width: u32, height: u32 },
    /// The stage mask produced no usable contour.
    NoContourFound { stage: Stage },
    /// A contour was found but no valid ellipse could be fitted to it.
    DegenerateEllipse { stage: Stage, reason: String },
    /// A mask selected no pixels, so its mean intensity is undefined.
    EmptyMask { stage: Stage },
}

impl PipelineError {
    pub(crate) fn degenerate(stage: Stage, err: FitError) -> Self {
        Self::DegenerateEllipse {
            stage,
            reason: err.to_string(),
        }
    }

    /// Stage that failed, if the failure is tied to one.
    pub fn stage(&self) -> Option<Stage> {
        match self {
            Self::EmptyImage { .. } => None,
            Self::NoContourFound { stage }
            | Self::DegenerateEllipse { stage, .. }
            | Self::EmptyMask { stage } => Some(*stage),
        }
    }
}

impl std::fmt::Display for PipelineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyImage { width, height } => {
                write!(f, "empty image: {}x{}", width, height)
            }
            Self::NoContourFound { stage } => write!(f, "{}: no contour found", stage),
            Self::DegenerateEllipse { stage, reason } => {
                write!(f, "{}: degenerate ellipse ({})", stage, reason)
            }
            Self::EmptyMask { stage } => write!(f, "{}: mask selects no pixels", stage),
        }
    }
}

impl std::error::Error for PipelineError {}

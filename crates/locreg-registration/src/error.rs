//! Error and warning types for registration operations.
//!
//! Errors abort the current operation and leave the session as it was.
//! Warnings are logged and recorded on the session but never stop a fit.

use std::fmt;

use locreg_core::CoreError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::stage::{SessionPhase, Stage};

/// Main error type for registration operations.
#[derive(Error, Debug)]
pub enum RegistrationError {
    /// Invalid configuration.
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// A stage can only be trained once per session.
    #[error("Model already fitted: the {stage} stage cannot be trained twice")]
    ModelAlreadyFitted { stage: Stage },

    /// The session has already moved past the requested stage.
    #[error("Stage order violation: cannot fit {requested} once the session is {current}")]
    StageOrder {
        requested: Stage,
        current: SessionPhase,
    },

    /// Correspondence data does not fit the point sets.
    #[error("Incompatible correspondence: {0}")]
    IncompatibleCorrespondence(String),

    /// Applying a fitted transform produced NaN or infinite coordinates.
    #[error("Diverged transform: the {stage} stage produced {non_finite} non-finite coordinates")]
    DivergedTransform { stage: Stage, non_finite: usize },

    /// Shape mismatch.
    #[error("Shape mismatch: expected {expected:?}, got {actual:?}")]
    ShapeMismatch {
        expected: Vec<usize>,
        actual: Vec<usize>,
    },

    /// Error raised by the geometric building blocks.
    #[error(transparent)]
    Core(#[from] CoreError),
}

/// Result type for registration operations.
pub type Result<T> = std::result::Result<T, RegistrationError>;

impl RegistrationError {
    /// Create an invalid configuration error.
    pub fn invalid_configuration(msg: impl Into<String>) -> Self {
        Self::InvalidConfiguration(msg.into())
    }

    /// Create an incompatible correspondence error.
    pub fn incompatible(msg: impl Into<String>) -> Self {
        Self::IncompatibleCorrespondence(msg.into())
    }

    /// Whether the error stems from how the session was driven rather than
    /// from the numbers it produced.
    pub fn is_configuration_error(&self) -> bool {
        match self {
            Self::InvalidConfiguration(_)
            | Self::ModelAlreadyFitted { .. }
            | Self::StageOrder { .. }
            | Self::IncompatibleCorrespondence(_)
            | Self::ShapeMismatch { .. } => true,
            Self::Core(err) => !matches!(err, CoreError::EmptyPointSet(_)),
            Self::DivergedTransform { .. } => false,
        }
    }
}

/// Non-fatal conditions noticed while fitting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RegistrationWarning {
    /// Rotation or scaling about the origin was fitted on off-center data.
    NotCentered { stage: Stage, midpoint: [f64; 2] },

    /// Some reference points had no candidate partner and were ignored.
    EmptyNeighborhood { empty: usize, total: usize },
}

impl fmt::Display for RegistrationWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotCentered { stage, midpoint } => write!(
                f,
                "point clouds are not centered for the {} stage (midpoint at ({:.3}, {:.3}))",
                stage, midpoint[0], midpoint[1]
            ),
            Self::EmptyNeighborhood { empty, total } => write!(
                f,
                "{} of {} reference points have no candidate neighbours and are ignored",
                empty, total
            ),
        }
    }
}

//! Registration stages and the forward-only session phase.

use std::fmt;

use serde::{Deserialize, Serialize};

/// One transform-fitting step of the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Stage {
    Shift,
    RigidBody,
    Affine,
    Polynomial3,
    Spline,
}

impl Stage {
    /// Every stage in pipeline order.
    pub const ALL: [Stage; 5] = [
        Stage::Shift,
        Stage::RigidBody,
        Stage::Affine,
        Stage::Polynomial3,
        Stage::Spline,
    ];

    /// Phase the session is in after this stage has been fitted.
    pub fn phase(self) -> SessionPhase {
        match self {
            Stage::Shift => SessionPhase::ShiftFit,
            Stage::RigidBody | Stage::Affine | Stage::Polynomial3 => SessionPhase::GlobalFit,
            Stage::Spline => SessionPhase::SplineFit,
        }
    }

    /// Whether the stage is fitted linear part first, then translation.
    pub fn is_two_phase(self) -> bool {
        matches!(self, Stage::RigidBody | Stage::Affine)
    }

    /// Whether the stage rotates or scales about the origin.
    pub fn needs_centering(self) -> bool {
        self.is_two_phase()
    }

    /// Lower-case label used in logs.
    pub fn name(self) -> &'static str {
        match self {
            Stage::Shift => "shift",
            Stage::RigidBody => "rigid body",
            Stage::Affine => "affine",
            Stage::Polynomial3 => "polynomial3",
            Stage::Spline => "spline",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.name())
    }
}

/// How far a session has progressed. Only ever moves forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub enum SessionPhase {
    #[default]
    NotStarted,
    ShiftFit,
    GlobalFit,
    SplineFit,
}

impl SessionPhase {
    /// Whether `stage` may still be fitted from this phase.
    pub fn allows(self, stage: Stage) -> bool {
        stage.phase() >= self
    }
}

impl fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionPhase::NotStarted => "not started",
            SessionPhase::ShiftFit => "shift fitted",
            SessionPhase::GlobalFit => "global fitted",
            SessionPhase::SplineFit => "spline fitted",
        };
        f.write_str(name)
    }
}

//! Hyperparameters of the registration stages and the session.

use burn::config::Config;

use crate::error::Result as RegResult;
use crate::metric::DEFAULT_SIGMA;
use crate::stage::Stage;
use crate::validation::{validate_cell_size, validate_edge_padding, validate_learning_rate, validate_sigma};

/// Hyperparameters of one stage fit.
#[derive(Config, Debug)]
pub struct StageConfig {
    /// AdaGrad learning rate
    #[config(default = 1.0)]
    pub learning_rate: f64,
    /// Number of passes over all batches
    #[config(default = 200)]
    pub iterations: usize,
    /// Control-point spacing in physical units (spline only)
    #[config(default = 1000.0)]
    pub cell_size: f64,
    /// Extra control-point rings around the data (spline only)
    #[config(default = 1)]
    pub edge_padding: usize,
    /// One optimizer step per frame instead of one per iteration
    #[config(default = false)]
    pub batch_by_frame: bool,
}

impl StageConfig {
    /// Default hyperparameters of `stage`.
    pub fn for_stage(stage: Stage) -> Self {
        match stage {
            Stage::Shift => Self::new().with_learning_rate(100.0).with_iterations(100),
            Stage::RigidBody | Stage::Affine => Self::new(),
            // Polynomial coefficients are relative to the coordinate scale,
            // spline displacements are in cells.
            Stage::Polynomial3 | Stage::Spline => Self::new().with_learning_rate(1e-2),
        }
    }

    /// Check the values that matter for `stage`.
    pub fn validate(&self, stage: Stage) -> RegResult<()> {
        validate_learning_rate(self.learning_rate)?;
        if stage == Stage::Spline {
            validate_cell_size(self.cell_size)?;
            validate_edge_padding(self.edge_padding)?;
        }
        Ok(())
    }
}

/// Settings shared by every stage of a session.
#[derive(Config, Debug)]
pub struct SessionConfig {
    /// Localization precision of the mixture loss (unlinked only)
    #[config(default = 0.15)]
    pub sigma: f64,
    /// Allowed offset of the cloud midpoint, relative to its diagonal
    #[config(default = 0.01)]
    pub centering_tolerance: f64,
    /// Iterations between console progress lines
    #[config(default = 50)]
    pub log_interval: usize,
}

impl SessionConfig {
    pub fn validate(&self) -> RegResult<()> {
        validate_sigma(self.sigma)
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self::new().with_sigma(DEFAULT_SIGMA)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_presets() {
        let shift = StageConfig::for_stage(Stage::Shift);
        assert_eq!(shift.learning_rate, 100.0);
        assert_eq!(shift.iterations, 100);

        let affine = StageConfig::for_stage(Stage::Affine);
        assert_eq!(affine.learning_rate, 1.0);
        assert_eq!(affine.iterations, 200);

        let poly = StageConfig::for_stage(Stage::Polynomial3);
        assert_eq!(poly.learning_rate, 1e-2);
        assert_eq!(poly.iterations, 200);

        let spline = StageConfig::for_stage(Stage::Spline);
        assert_eq!(spline.learning_rate, 1e-2);
        assert_eq!(spline.cell_size, 1000.0);
        assert_eq!(spline.edge_padding, 1);
        assert!(!spline.batch_by_frame);
    }

    #[test]
    fn test_stage_validation() {
        assert!(StageConfig::new().validate(Stage::Affine).is_ok());
        assert!(StageConfig::new().with_learning_rate(0.0).validate(Stage::Shift).is_err());

        // Grid settings only matter for the spline stage
        let bad_grid = StageConfig::new().with_cell_size(-1.0).with_edge_padding(0);
        assert!(bad_grid.validate(Stage::Affine).is_ok());
        assert!(bad_grid.validate(Stage::Spline).is_err());
    }

    #[test]
    fn test_session_defaults() {
        let config = SessionConfig::default();
        assert_eq!(config.sigma, 0.15);
        assert!(config.validate().is_ok());
        assert!(SessionConfig::new().with_sigma(0.0).validate().is_err());
    }

    #[test]
    fn test_config_display() {
        let config = StageConfig::new().with_iterations(12).with_batch_by_frame(true);
        let text = config.clone().to_string();
        assert!(text.contains("\"iterations\": 12"), "{}", text);
        assert!(text.contains("\"batch_by_frame\": true"), "{}", text);
    }
}

//! Staged registration of a moving channel onto a reference channel.
//!
//! A [`RegistrationSession`] owns both channels and fits the stages one at a
//! time. Every successful fit maps the moving channel with the new model, so
//! the next stage starts from the improved alignment. Stages may only be
//! fitted once and the session phase only moves forward:
//!
//! `NotStarted -> ShiftFit -> GlobalFit -> SplineFit`
//!
//! A failed fit leaves the channels, the models and the phase untouched.

pub mod models;

pub use models::{FittedModel, FittedModels};

use std::sync::Arc;

use burn::tensor::backend::AutodiffBackend;
use burn::tensor::Tensor;
use locreg_core::transform::{
    AffineTransform, CatmullRomSplineTransform, Polynomial3Transform, RigidBodyTransform,
    ShiftTransform,
};
use locreg_core::{Bounds, ControlPointGrid, PointSet, Vector2};
use serde::{Deserialize, Serialize};

use crate::batch::{build_batches, Batch};
use crate::config::{SessionConfig, StageConfig};
use crate::correspondence::Correspondence;
use crate::error::{RegistrationError, RegistrationWarning, Result};
use crate::metric::CorrespondenceMetric;
use crate::progress::{ConsoleProgressCallback, ProgressCallback, ProgressTracker};
use crate::registration::{train_single_phase, train_two_phase};
use crate::residuals::{pairs_within, residuals, ResidualStats};
use crate::stage::{SessionPhase, Stage};
use crate::validation::{check_finite, validate_points_shape};

/// Snapshot of a session after a stage completed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionState {
    pub phase: SessionPhase,
    /// Fitted stages in fitting order.
    pub fitted: Vec<Stage>,
    /// Final training loss of every fitted stage.
    pub losses: Vec<(Stage, f64)>,
    pub warnings: Vec<RegistrationWarning>,
}

impl SessionState {
    /// Final training loss of `stage`, if it was trained in this session.
    pub fn final_loss(&self, stage: Stage) -> Option<f64> {
        self.losses
            .iter()
            .find(|(s, _)| *s == stage)
            .map(|(_, loss)| *loss)
    }
}

/// Registration of two localization channels.
pub struct RegistrationSession<B: AutodiffBackend> {
    reference: PointSet<B>,
    moving: PointSet<B>,
    correspondence: Correspondence,
    config: SessionConfig,
    models: FittedModels<B>,
    phase: SessionPhase,
    warnings: Vec<RegistrationWarning>,
    losses: Vec<(Stage, f64)>,
    center_offset: Option<Vector2>,
    tracker: ProgressTracker,
}

impl<B: AutodiffBackend> std::fmt::Debug for RegistrationSession<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegistrationSession")
            .field("reference", &self.reference.len())
            .field("moving", &self.moving.len())
            .field("correspondence", &self.correspondence.name())
            .field("phase", &self.phase)
            .field("fitted", &self.models.stages())
            .finish()
    }
}

impl<B: AutodiffBackend> RegistrationSession<B> {
    /// Create a session; progress is logged to the console by default.
    pub fn new(
        reference: PointSet<B>,
        moving: PointSet<B>,
        correspondence: Correspondence,
        config: SessionConfig,
    ) -> Result<Self> {
        config.validate()?;
        correspondence.validate(reference.len(), moving.len())?;
        if reference.is_empty() || moving.is_empty() {
            return Err(RegistrationError::invalid_configuration(
                "both channels need at least one point",
            ));
        }

        let mut tracker = ProgressTracker::new();
        tracker.add_callback(Arc::new(ConsoleProgressCallback::new(config.log_interval)));

        tracing::info!(
            "New {} session: {} reference and {} moving points",
            correspondence.name(),
            reference.len(),
            moving.len()
        );

        Ok(Self {
            reference,
            moving,
            correspondence,
            config,
            models: FittedModels::new(),
            phase: SessionPhase::NotStarted,
            warnings: Vec::new(),
            losses: Vec::new(),
            center_offset: None,
            tracker,
        })
    }

    /// Report training progress to `callback` as well.
    pub fn add_callback(&mut self, callback: Arc<dyn ProgressCallback>) {
        self.tracker.add_callback(callback);
    }

    pub fn reference(&self) -> &PointSet<B> {
        &self.reference
    }

    /// Moving channel with every fitted stage applied.
    pub fn moving(&self) -> &PointSet<B> {
        &self.moving
    }

    pub fn correspondence(&self) -> &Correspondence {
        &self.correspondence
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn models(&self) -> &FittedModels<B> {
        &self.models
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn warnings(&self) -> &[RegistrationWarning] {
        &self.warnings
    }

    pub fn is_fitted(&self, stage: Stage) -> bool {
        self.models.is_fitted(stage)
    }

    /// Control-point lattice of the spline stage, once fitted.
    pub fn grid(&self) -> Option<&ControlPointGrid> {
        self.models.grid()
    }

    /// Physical coordinates of the spline control points.
    pub fn node_positions(&self) -> Option<Vec<[f64; 2]>> {
        self.grid().map(ControlPointGrid::node_positions)
    }

    /// Total translation applied by [`Self::center`].
    pub fn center_offset(&self) -> Option<Vector2> {
        self.center_offset
    }

    pub fn state(&self) -> SessionState {
        SessionState {
            phase: self.phase,
            fitted: self.models.stages(),
            losses: self.losses.clone(),
            warnings: self.warnings.clone(),
        }
    }

    /// Translate both channels so their joint bounding box is centered on
    /// the origin. Only possible before the first stage is fitted.
    pub fn center(&mut self) -> Result<Vector2> {
        if !self.models.is_empty() {
            return Err(RegistrationError::invalid_configuration(
                "channels can only be centered before any stage is fitted",
            ));
        }
        let offset = -self.joint_bounds()?.midpoint().coords;
        self.reference = self.reference.translate(offset);
        self.moving = self.moving.translate(offset);
        let total = self.center_offset.unwrap_or_else(Vector2::zeros) + offset;
        self.center_offset = Some(total);

        tracing::info!("Centered both channels, offset ({:.3}, {:.3})", offset.x, offset.y);
        Ok(offset)
    }

    /// Fit `stage` and apply it to the moving channel.
    pub fn fit_stage(&mut self, stage: Stage, config: &StageConfig) -> Result<SessionState> {
        config.validate(stage)?;
        if self.models.is_fitted(stage) {
            return Err(RegistrationError::ModelAlreadyFitted { stage });
        }
        if !self.phase.allows(stage) {
            return Err(RegistrationError::StageOrder {
                requested: stage,
                current: self.phase,
            });
        }

        let plan = build_batches(
            &self.reference,
            &self.moving,
            &self.correspondence,
            config.batch_by_frame,
        )?;
        let mut warnings = plan.warnings;
        if stage.needs_centering() {
            warnings.extend(self.centering_warning(stage, &self.joint_bounds()?));
        }

        tracing::info!(
            "Fitting the {} stage: {} batches, {} iterations, learning rate {}",
            stage,
            plan.batches.len(),
            config.iterations,
            config.learning_rate
        );

        let (model, loss) = self.train_stage(stage, config, &plan.batches)?;

        let moved = model.apply(self.moving.positions());
        if let Err(err) = check_finite(&moved, stage) {
            self.tracker.error(&err.to_string());
            return Err(err);
        }

        self.moving.set_positions(moved)?;
        self.models.insert(model)?;
        self.phase = self.phase.max(stage.phase());
        self.losses.push((stage, loss));
        self.warnings.extend(warnings);

        tracing::info!("The {} stage finished with loss {:.6}", stage, loss);
        Ok(self.state())
    }

    fn train_stage(
        &self,
        stage: Stage,
        config: &StageConfig,
        batches: &[Batch<B>],
    ) -> Result<(FittedModel<B>, f64)> {
        let device = self.moving.device();
        let metric = CorrespondenceMetric::for_correspondence(&self.correspondence, self.config.sigma);
        let tracker = self.tracker.for_phase(stage.name());
        let (iterations, lr) = (config.iterations, config.learning_rate);

        Ok(match stage {
            Stage::Shift => {
                let model = ShiftTransform::identity(&device);
                let (model, loss) = train_single_phase(model, metric, batches, iterations, lr, &tracker)?;
                (FittedModel::Shift(model), loss)
            }
            Stage::RigidBody => {
                let model = RigidBodyTransform::identity(&device);
                let (model, loss) = train_two_phase(model, metric, batches, iterations, lr, &tracker)?;
                (FittedModel::RigidBody(model), loss)
            }
            Stage::Affine => {
                let model = AffineTransform::identity(&device);
                let (model, loss) = train_two_phase(model, metric, batches, iterations, lr, &tracker)?;
                (FittedModel::Affine(model), loss)
            }
            Stage::Polynomial3 => {
                let model = Polynomial3Transform::identity(self.polynomial_scale()?, &device);
                let (model, loss) = train_single_phase(model, metric, batches, iterations, lr, &tracker)?;
                (FittedModel::Polynomial3(model), loss)
            }
            Stage::Spline => {
                let grid = ControlPointGrid::from_point_sets(
                    &[&self.reference, &self.moving],
                    config.cell_size,
                    config.edge_padding,
                )?;
                tracing::debug!(
                    "Control-point lattice {}x{}, cell size {}",
                    grid.dims()[0],
                    grid.dims()[1],
                    grid.cell_size()
                );
                let model = CatmullRomSplineTransform::identity(grid, &device);
                let (model, loss) = train_single_phase(model, metric, batches, iterations, lr, &tracker)?;
                (FittedModel::Spline(model), loss)
            }
        })
    }

    /// Map `points` with a fitted stage. An unfit stage returns the points
    /// unchanged.
    pub fn apply_stage(&self, stage: Stage, points: Tensor<B, 2>) -> Result<Tensor<B, 2>> {
        validate_points_shape(&points, None)?;
        let Some(model) = self.models.get(stage) else {
            tracing::info!("The {} stage is not fitted, points returned unchanged", stage);
            return Ok(points);
        };

        if stage.needs_centering() && points.dims()[0] > 0 {
            let bounds = PointSet::from_tensor(points.clone())?.bounds()?;
            self.centering_warning(stage, &bounds);
        }
        Ok(model.apply(points))
    }

    /// Apply a fitted stage to the session's own moving channel.
    ///
    /// Used on sessions that received their models through
    /// [`Self::copy_fitted_models`].
    pub fn transform_stage(&mut self, stage: Stage) -> Result<()> {
        if !self.models.is_fitted(stage) {
            tracing::info!("The {} stage is not fitted, moving channel unchanged", stage);
            return Ok(());
        }
        if stage.needs_centering() {
            let warning = self.centering_warning(stage, &self.joint_bounds()?);
            self.warnings.extend(warning);
        }

        let moved = self.apply_stage(stage, self.moving.positions())?;
        check_finite(&moved, stage)?;
        self.moving.set_positions(moved)?;
        Ok(())
    }

    /// Take over every fitted model of `other`.
    ///
    /// The copies count as fitted here: the phase advances accordingly and
    /// the copied stages cannot be fitted again. The moving channel is not
    /// changed; call [`Self::transform_stage`] for that.
    pub fn copy_fitted_models(&mut self, other: &Self) -> Result<()> {
        if let Some(stage) = other.models.stages().into_iter().find(|s| self.models.is_fitted(*s)) {
            return Err(RegistrationError::ModelAlreadyFitted { stage });
        }
        for model in other.models.iter() {
            self.models.insert(model.clone())?;
        }
        self.phase = self.phase.max(other.phase);
        tracing::info!("Copied {} fitted models", other.models.len());
        Ok(())
    }

    /// Map `points` with every fitted stage in fitting order.
    pub fn apply_fitted(&self, points: Tensor<B, 2>) -> Result<Tensor<B, 2>> {
        self.models
            .stages()
            .into_iter()
            .try_fold(points, |points, stage| self.apply_stage(stage, points))
    }

    /// Residuals between the reference and the current moving channel.
    pub fn residuals(&self) -> Result<ResidualStats> {
        self.require_linked("residual analysis")?;
        residuals(&self.reference, &self.moving)
    }

    /// Drop linked pairs farther apart than `max_distance`.
    ///
    /// Returns the number of removed pairs.
    pub fn filter_pairs(&mut self, max_distance: f64) -> Result<usize> {
        self.require_linked("pair filtering")?;
        let keep = pairs_within(&self.reference, &self.moving, max_distance)?;
        if keep.is_empty() {
            return Err(RegistrationError::invalid_configuration(format!(
                "no pair lies within {} of its partner",
                max_distance
            )));
        }

        let removed = self.moving.len() - keep.len();
        if removed > 0 {
            self.reference = self.reference.select(&keep);
            self.moving = self.moving.select(&keep);
            tracing::info!("Removed {} pairs farther apart than {}", removed, max_distance);
        }
        Ok(removed)
    }

    fn require_linked(&self, what: &str) -> Result<()> {
        if self.correspondence.is_linked() {
            Ok(())
        } else {
            Err(RegistrationError::incompatible(format!(
                "{} needs linked channels",
                what
            )))
        }
    }

    fn joint_bounds(&self) -> Result<Bounds> {
        Ok(self.reference.bounds()?.union(&self.moving.bounds()?))
    }

    /// Largest absolute coordinate of both channels, at least 1.
    fn polynomial_scale(&self) -> Result<f64> {
        let bounds = self.joint_bounds()?;
        let (min, max) = (bounds.min(), bounds.max());
        Ok([min.x, min.y, max.x, max.y]
            .into_iter()
            .map(f64::abs)
            .fold(1.0, f64::max))
    }

    fn centering_warning(&self, stage: Stage, bounds: &Bounds) -> Option<RegistrationWarning> {
        if bounds.is_centered(self.config.centering_tolerance) {
            return None;
        }
        let midpoint = bounds.midpoint();
        let warning = RegistrationWarning::NotCentered {
            stage,
            midpoint: [midpoint.x, midpoint.y],
        };
        tracing::warn!("{}", warning);
        Some(warning)
    }
}

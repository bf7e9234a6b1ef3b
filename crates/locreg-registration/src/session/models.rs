//! Fitted transform models of a session.

use burn::module::AutodiffModule;
use burn::tensor::backend::{AutodiffBackend, Backend};
use burn::tensor::Tensor;
use locreg_core::transform::{
    AffineTransform, CatmullRomSplineTransform, Polynomial3Transform, RigidBodyTransform,
    ShiftTransform, Transform,
};
use locreg_core::ControlPointGrid;

use crate::error::{RegistrationError, Result};
use crate::stage::Stage;

/// A trained model of one stage.
#[derive(Debug, Clone)]
pub enum FittedModel<B: Backend> {
    Shift(ShiftTransform<B>),
    RigidBody(RigidBodyTransform<B>),
    Affine(AffineTransform<B>),
    Polynomial3(Polynomial3Transform<B>),
    Spline(CatmullRomSplineTransform<B>),
}

impl<B: Backend> FittedModel<B> {
    /// Stage that produced the model.
    pub fn stage(&self) -> Stage {
        match self {
            Self::Shift(_) => Stage::Shift,
            Self::RigidBody(_) => Stage::RigidBody,
            Self::Affine(_) => Stage::Affine,
            Self::Polynomial3(_) => Stage::Polynomial3,
            Self::Spline(_) => Stage::Spline,
        }
    }
}

impl<B: AutodiffBackend> FittedModel<B> {
    /// Map `points` without recording an autodiff graph.
    pub fn apply(&self, points: Tensor<B, 2>) -> Tensor<B, 2> {
        match self {
            Self::Shift(model) => apply_detached(model, points),
            Self::RigidBody(model) => apply_detached(model, points),
            Self::Affine(model) => apply_detached(model, points),
            Self::Polynomial3(model) => apply_detached(model, points),
            Self::Spline(model) => apply_detached(model, points),
        }
    }
}

fn apply_detached<B, T>(model: &T, points: Tensor<B, 2>) -> Tensor<B, 2>
where
    B: AutodiffBackend,
    T: AutodiffModule<B>,
    T::InnerModule: Transform<B::InnerBackend>,
{
    Tensor::from_inner(model.valid().transform_points(points.inner()))
}

/// Models fitted so far, in the order they were fitted.
#[derive(Debug, Clone)]
pub struct FittedModels<B: Backend> {
    models: Vec<FittedModel<B>>,
}

impl<B: Backend> Default for FittedModels<B> {
    fn default() -> Self {
        Self { models: Vec::new() }
    }
}

impl<B: Backend> FittedModels<B> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a model; each stage can be recorded once.
    pub fn insert(&mut self, model: FittedModel<B>) -> Result<()> {
        let stage = model.stage();
        if self.is_fitted(stage) {
            return Err(RegistrationError::ModelAlreadyFitted { stage });
        }
        self.models.push(model);
        Ok(())
    }

    pub fn get(&self, stage: Stage) -> Option<&FittedModel<B>> {
        self.models.iter().find(|m| m.stage() == stage)
    }

    pub fn is_fitted(&self, stage: Stage) -> bool {
        self.get(stage).is_some()
    }

    /// Fitted stages in fitting order.
    pub fn stages(&self) -> Vec<Stage> {
        self.models.iter().map(FittedModel::stage).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &FittedModel<B>> {
        self.models.iter()
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }

    pub fn shift(&self) -> Option<&ShiftTransform<B>> {
        match self.get(Stage::Shift) {
            Some(FittedModel::Shift(model)) => Some(model),
            _ => None,
        }
    }

    pub fn rigid_body(&self) -> Option<&RigidBodyTransform<B>> {
        match self.get(Stage::RigidBody) {
            Some(FittedModel::RigidBody(model)) => Some(model),
            _ => None,
        }
    }

    pub fn affine(&self) -> Option<&AffineTransform<B>> {
        match self.get(Stage::Affine) {
            Some(FittedModel::Affine(model)) => Some(model),
            _ => None,
        }
    }

    pub fn polynomial3(&self) -> Option<&Polynomial3Transform<B>> {
        match self.get(Stage::Polynomial3) {
            Some(FittedModel::Polynomial3(model)) => Some(model),
            _ => None,
        }
    }

    pub fn spline(&self) -> Option<&CatmullRomSplineTransform<B>> {
        match self.get(Stage::Spline) {
            Some(FittedModel::Spline(model)) => Some(model),
            _ => None,
        }
    }

    /// Control-point lattice of the spline stage, once fitted.
    pub fn grid(&self) -> Option<&ControlPointGrid> {
        self.spline().map(CatmullRomSplineTransform::grid)
    }
}

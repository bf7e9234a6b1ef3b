//! Staged gradient-based registration of two localization channels.
//!
//! The moving channel is mapped onto the reference channel by a sequence of
//! increasingly flexible transforms (shift, rigid body, affine, cubic
//! polynomial, Catmull-Rom spline), each trained with AdaGrad on a
//! correspondence-aware loss. [`RegistrationSession`] drives the sequence.

pub mod batch;
pub mod config;
pub mod correspondence;
pub mod dataset;
pub mod error;
pub mod metric;
pub mod optimizer;
pub mod progress;
pub mod registration;
pub mod residuals;
pub mod session;
pub mod stage;
pub mod validation;

pub use batch::{build_batches, Batch, BatchPlan};
pub use config::{SessionConfig, StageConfig};
pub use correspondence::{Correspondence, NeighborMatrix};
pub use dataset::{split_linked, LinkedSplit};
pub use error::{RegistrationError, RegistrationWarning, Result};
pub use metric::{loss, CorrespondenceMetric, GaussianMixture, Metric, SquaredDistance};
pub use progress::{ConsoleProgressCallback, HistoryCallback, ProgressCallback, ProgressInfo, ProgressTracker};
pub use registration::Registration;
pub use residuals::{residuals, ResidualStats};
pub use session::{FittedModel, FittedModels, RegistrationSession, SessionState};
pub use stage::{SessionPhase, Stage};

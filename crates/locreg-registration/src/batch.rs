//! Training batches.
//!
//! A batch holds the moving points to transform (`source`), the reference
//! points to reach (`target`) and, for unlinked registration, the candidate
//! weights between them. Without frame partitioning there is a single batch;
//! with it there is one batch per frame in ascending frame order.

use burn::tensor::backend::Backend;
use burn::tensor::Tensor;
use locreg_core::PointSet;

use crate::correspondence::{Correspondence, NeighborMatrix};
use crate::error::{RegistrationError, RegistrationWarning, Result};

/// One unit of work for an optimizer step.
#[derive(Debug, Clone)]
pub struct Batch<B: Backend> {
    /// Frame the points come from, `None` for the whole set.
    pub frame: Option<u32>,
    /// Moving points `[S, 2]`.
    pub source: Tensor<B, 2>,
    /// Reference points `[T, 2]`.
    pub target: Tensor<B, 2>,
    /// Candidate weights `[T, S]` for unlinked registration.
    pub neighbors: Option<Tensor<B, 2>>,
}

impl<B: Backend> Batch<B> {
    /// Index-aligned batch.
    pub fn linked(source: Tensor<B, 2>, target: Tensor<B, 2>) -> Self {
        Self {
            frame: None,
            source,
            target,
            neighbors: None,
        }
    }

    /// Batch with candidate weights.
    pub fn unlinked(source: Tensor<B, 2>, target: Tensor<B, 2>, neighbors: Tensor<B, 2>) -> Self {
        Self {
            frame: None,
            source,
            target,
            neighbors: Some(neighbors),
        }
    }

    /// Tag the batch with its frame.
    pub fn with_frame(mut self, frame: u32) -> Self {
        self.frame = Some(frame);
        self
    }

    /// Number of moving points.
    pub fn source_len(&self) -> usize {
        self.source.dims()[0]
    }

    /// Number of reference points.
    pub fn target_len(&self) -> usize {
        self.target.dims()[0]
    }
}

/// Batches for one stage plus the warnings raised while building them.
#[derive(Debug, Clone)]
pub struct BatchPlan<B: Backend> {
    pub batches: Vec<Batch<B>>,
    pub warnings: Vec<RegistrationWarning>,
}

/// Partition the channels into training batches.
pub fn build_batches<B: Backend>(
    reference: &PointSet<B>,
    moving: &PointSet<B>,
    correspondence: &Correspondence,
    by_frame: bool,
) -> Result<BatchPlan<B>> {
    correspondence.validate(reference.len(), moving.len())?;
    if reference.is_empty() || moving.is_empty() {
        return Err(RegistrationError::invalid_configuration(
            "both channels need at least one point",
        ));
    }

    let plan = if by_frame {
        frame_batches(reference, moving, correspondence)?
    } else {
        whole_set_batch(reference, moving, correspondence)
    };

    if plan.batches.is_empty() {
        let reason = if by_frame {
            "no frame has both reference and moving points with candidate pairs inside it"
        } else {
            "no batch has both reference and moving points with candidate pairs"
        };
        return Err(RegistrationError::invalid_configuration(reason));
    }

    Ok(plan)
}

/// Warning for `empty` of `total` reference points left without candidates.
fn empty_neighborhood(empty: usize, total: usize) -> Vec<RegistrationWarning> {
    if empty == 0 {
        return Vec::new();
    }
    let warning = RegistrationWarning::EmptyNeighborhood { empty, total };
    tracing::warn!("{}", warning);
    vec![warning]
}

fn whole_set_batch<B: Backend>(
    reference: &PointSet<B>,
    moving: &PointSet<B>,
    correspondence: &Correspondence,
) -> BatchPlan<B> {
    match correspondence {
        Correspondence::Linked => BatchPlan {
            batches: vec![Batch::linked(moving.positions(), reference.positions())],
            warnings: Vec::new(),
        },
        Correspondence::Unlinked(matrix) => {
            let batches = if matrix.candidate_count() == 0 {
                Vec::new()
            } else {
                vec![Batch::unlinked(
                    moving.positions(),
                    reference.positions(),
                    matrix.to_tensor(&moving.device()),
                )]
            };
            BatchPlan {
                batches,
                warnings: empty_neighborhood(matrix.empty_rows().len(), matrix.rows()),
            }
        }
    }
}

fn frame_batches<B: Backend>(
    reference: &PointSet<B>,
    moving: &PointSet<B>,
    correspondence: &Correspondence,
) -> Result<BatchPlan<B>> {
    let missing = |what: &str| {
        RegistrationError::invalid_configuration(format!(
            "batching by frame needs frame ids on the {} channel",
            what
        ))
    };
    if moving.frames().is_none() {
        return Err(missing("moving"));
    }

    match correspondence {
        // Pairs share an index, so the moving channel's frames select both sides.
        Correspondence::Linked => Ok(BatchPlan {
            batches: moving
                .unique_frames()
                .into_iter()
                .map(|frame| {
                    let idx = moving.indices_of_frame(frame);
                    Batch::linked(moving.select(&idx).positions(), reference.select(&idx).positions())
                        .with_frame(frame)
                })
                .collect(),
            warnings: Vec::new(),
        }),
        Correspondence::Unlinked(matrix) => {
            if reference.frames().is_none() {
                return Err(missing("reference"));
            }
            let mut frames = moving.unique_frames();
            frames.extend(reference.unique_frames());
            frames.sort_unstable();
            frames.dedup();

            // Candidates across frames are never seen by a batch, so empty
            // rows are counted per frame.
            let mut batches = Vec::new();
            let mut empty = 0;
            for frame in frames {
                let (batch, frame_empty) = unlinked_frame_batch(reference, moving, matrix, frame);
                empty += frame_empty;
                batches.extend(batch);
            }
            Ok(BatchPlan {
                batches,
                warnings: empty_neighborhood(empty, matrix.rows()),
            })
        }
    }
}

/// Batch of one frame plus the number of its reference points without a
/// candidate in the same frame.
fn unlinked_frame_batch<B: Backend>(
    reference: &PointSet<B>,
    moving: &PointSet<B>,
    matrix: &NeighborMatrix,
    frame: u32,
) -> (Option<Batch<B>>, usize) {
    let rows = reference.indices_of_frame(frame);
    let cols = moving.indices_of_frame(frame);
    if rows.is_empty() || cols.is_empty() {
        tracing::debug!("Frame {} has points in only one channel, skipped", frame);
        return (None, rows.len());
    }
    let sub = matrix.submatrix(&rows, &cols);
    let empty = sub.empty_rows().len();
    if sub.candidate_count() == 0 {
        tracing::debug!("Frame {} has no candidate pairs, skipped", frame);
        return (None, empty);
    }
    let device = moving.device();
    let batch = Batch::unlinked(
        moving.select(&cols).positions(),
        reference.select(&rows).positions(),
        sub.to_tensor(&device),
    )
    .with_frame(frame);
    (Some(batch), empty)
}

//! How points of the two channels are paired.

pub mod neighbors;

pub use neighbors::NeighborMatrix;

use crate::error::{RegistrationError, Result};

/// Pairing between reference and moving points.
#[derive(Debug, Clone, PartialEq)]
pub enum Correspondence {
    /// Point `i` of the moving channel belongs to point `i` of the reference.
    Linked,
    /// Pairing unknown; candidates and their weights per reference point.
    Unlinked(NeighborMatrix),
}

impl Correspondence {
    /// Check the correspondence against the channel sizes.
    pub fn validate(&self, reference_len: usize, moving_len: usize) -> Result<()> {
        match self {
            Correspondence::Linked if reference_len != moving_len => {
                Err(RegistrationError::incompatible(format!(
                    "linked channels must have equal lengths, got {} reference and {} moving points",
                    reference_len, moving_len
                )))
            }
            Correspondence::Unlinked(matrix)
                if matrix.rows() != reference_len || matrix.cols() != moving_len =>
            {
                Err(RegistrationError::incompatible(format!(
                    "neighbour matrix is {}x{} but the channels have {} reference and {} moving points",
                    matrix.rows(),
                    matrix.cols(),
                    reference_len,
                    moving_len
                )))
            }
            _ => Ok(()),
        }
    }

    pub fn is_linked(&self) -> bool {
        matches!(self, Correspondence::Linked)
    }

    /// Get the neighbour matrix of an unlinked correspondence.
    pub fn neighbors(&self) -> Option<&NeighborMatrix> {
        match self {
            Correspondence::Linked => None,
            Correspondence::Unlinked(matrix) => Some(matrix),
        }
    }

    /// Label used in logs.
    pub fn name(&self) -> &'static str {
        match self {
            Correspondence::Linked => "linked",
            Correspondence::Unlinked(_) => "unlinked",
        }
    }
}

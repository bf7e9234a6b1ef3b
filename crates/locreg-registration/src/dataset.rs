//! Seeded train/test splitting of linked channels.

use burn::tensor::backend::Backend;
use locreg_core::PointSet;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use crate::error::{RegistrationError, Result};

/// Linked channels split into a training part and a held-out part.
#[derive(Debug, Clone)]
pub struct LinkedSplit<B: Backend> {
    pub train_reference: PointSet<B>,
    pub train_moving: PointSet<B>,
    pub test_reference: PointSet<B>,
    pub test_moving: PointSet<B>,
}

/// Randomly assign `fraction` of the pairs to training, the rest to testing.
///
/// Pairs stay together and keep their input order within each part. The
/// same seed always gives the same split.
pub fn split_linked<B: Backend>(
    reference: &PointSet<B>,
    moving: &PointSet<B>,
    fraction: f64,
    seed: u64,
) -> Result<LinkedSplit<B>> {
    if !(fraction > 0.0 && fraction < 1.0) {
        return Err(RegistrationError::invalid_configuration(format!(
            "Training fraction must lie in (0, 1), got {}",
            fraction
        )));
    }
    if reference.len() != moving.len() {
        return Err(RegistrationError::incompatible(format!(
            "linked channels need equal lengths, got {} reference and {} moving points",
            reference.len(),
            moving.len()
        )));
    }
    let n = reference.len();
    if n < 2 {
        return Err(RegistrationError::invalid_configuration(
            "splitting needs at least two pairs",
        ));
    }

    let mut indices: Vec<usize> = (0..n).collect();
    let mut rng = StdRng::seed_from_u64(seed);
    indices.shuffle(&mut rng);

    let n_train = ((n as f64 * fraction).round() as usize).clamp(1, n - 1);
    let (train, test) = indices.split_at_mut(n_train);
    train.sort_unstable();
    test.sort_unstable();

    tracing::debug!("Split {} pairs into {} training and {} test pairs", n, train.len(), test.len());

    Ok(LinkedSplit {
        train_reference: reference.select(train),
        train_moving: moving.select(train),
        test_reference: reference.select(test),
        test_moving: moving.select(test),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn_ndarray::NdArray;

    type TestBackend = NdArray<f32>;

    fn channels(n: usize) -> (PointSet<TestBackend>, PointSet<TestBackend>) {
        let device = Default::default();
        let reference: Vec<[f64; 2]> = (0..n).map(|i| [i as f64, 0.0]).collect();
        let moving: Vec<[f64; 2]> = (0..n).map(|i| [i as f64, 1.0]).collect();
        (
            PointSet::from_coords(&reference, &device),
            PointSet::from_coords(&moving, &device),
        )
    }

    #[test]
    fn test_split_keeps_pairs() {
        let (reference, moving) = channels(20);
        let split = split_linked(&reference, &moving, 0.75, 7).unwrap();

        assert_eq!(split.train_reference.len(), 15);
        assert_eq!(split.test_moving.len(), 5);

        let train_ref = split.train_reference.to_coords();
        let train_mov = split.train_moving.to_coords();
        for (r, m) in train_ref.iter().zip(&train_mov) {
            assert_eq!(r[0], m[0]);
        }
        // input order is kept inside each part
        assert!(train_ref.windows(2).all(|w| w[0][0] < w[1][0]));
    }

    #[test]
    fn test_split_is_seeded() {
        let (reference, moving) = channels(30);
        let a = split_linked(&reference, &moving, 0.5, 42).unwrap();
        let b = split_linked(&reference, &moving, 0.5, 42).unwrap();
        assert_eq!(a.test_reference.to_coords(), b.test_reference.to_coords());

        let mut all: Vec<f64> = a
            .train_reference
            .to_coords()
            .into_iter()
            .chain(a.test_reference.to_coords())
            .map(|c| c[0])
            .collect();
        all.sort_by(f64::total_cmp);
        assert_eq!(all, (0..30).map(|i| i as f64).collect::<Vec<_>>());
    }

    #[test]
    fn test_split_rejects_bad_input() {
        let (reference, moving) = channels(10);
        assert!(split_linked(&reference, &moving, 0.0, 1).is_err());
        assert!(split_linked(&reference, &moving, 1.0, 1).is_err());

        let (short, _) = channels(3);
        assert!(split_linked(&short, &moving, 0.5, 1).is_err());
    }
}

use burn::backend::Autodiff;
use burn::tensor::Tensor;
use burn_ndarray::NdArray;
use locreg_core::transform::{AffineTransform, LinearWithTranslation, RigidBodyTransform, Trainable};
use locreg_core::PointSet;
use locreg_registration::batch::build_batches;
use locreg_registration::metric::SquaredDistance;
use locreg_registration::progress::ProgressTracker;
use locreg_registration::registration::{train_linear_phase, train_translation_phase};
use locreg_registration::{Correspondence, RegistrationSession, SessionConfig, Stage, StageConfig};

type B = Autodiff<NdArray<f32>>;

/// 5x5 lattice centered on the origin: the coordinates sum to zero.
fn lattice() -> Vec<[f64; 2]> {
    (0..25)
        .map(|i| [(i % 5) as f64 - 2.0, (i / 5) as f64 - 2.0])
        .collect()
}

fn affine_image(coords: &[[f64; 2]], a: [[f64; 2]; 2], t: [f64; 2]) -> Vec<[f64; 2]> {
    coords
        .iter()
        .map(|p| {
            [
                a[0][0] * p[0] + a[0][1] * p[1] + t[0],
                a[1][0] * p[0] + a[1][1] * p[1] + t[1],
            ]
        })
        .collect()
}

const MATRIX: [[f64; 2]; 2] = [[1.05, 0.1], [-0.05, 0.95]];
const TRANSLATION: [f64; 2] = [0.5, -0.3];

#[test]
fn test_two_phase_freezing_invariants() {
    let device = Default::default();
    let reference = PointSet::<B>::from_coords(&affine_image(&lattice(), MATRIX, TRANSLATION), &device);
    let moving = PointSet::<B>::from_coords(&lattice(), &device);
    let plan = build_batches(&reference, &moving, &Correspondence::Linked, false).unwrap();
    let tracker = ProgressTracker::new().for_phase("affine");

    let (after_linear, _) = train_linear_phase(
        AffineTransform::<B>::identity(&device),
        SquaredDistance::new(),
        &plan.batches,
        200,
        0.1,
        &tracker,
    )
    .unwrap();

    // Phase 1 never touches the translation
    assert_eq!(after_linear.translation_vector().x, 0.0);
    assert_eq!(after_linear.translation_vector().y, 0.0);
    assert_eq!(after_linear.trainable_parameters(), vec![AffineTransform::<B>::LINEAR]);

    let matrix = after_linear.matrix_host();
    for r in 0..2 {
        for c in 0..2 {
            assert!((matrix[(r, c)] - MATRIX[r][c]).abs() < 1e-3, "A = {}", matrix);
        }
    }

    let linear_before = after_linear.matrix().into_data();
    let (after_translation, final_loss) = train_translation_phase(
        after_linear,
        SquaredDistance::new(),
        &plan.batches,
        200,
        0.1,
        &tracker,
    )
    .unwrap();

    // Phase 2 leaves the matrix bit-identical
    assert_eq!(after_translation.matrix().into_data(), linear_before);
    assert_eq!(
        after_translation.trainable_parameters(),
        vec![AffineTransform::<B>::TRANSLATION]
    );

    let t = after_translation.translation_vector();
    assert!((t.x - TRANSLATION[0]).abs() < 1e-3, "t = {}", t);
    assert!((t.y - TRANSLATION[1]).abs() < 1e-3, "t = {}", t);
    assert!(final_loss < 1e-3, "final loss = {}", final_loss);
}

#[test]
fn test_session_rigid_body_stage() {
    let device = Default::default();
    let theta: f64 = 0.1;
    let rotation = [[theta.cos(), -theta.sin()], [theta.sin(), theta.cos()]];
    let reference = PointSet::<B>::from_coords(&affine_image(&lattice(), rotation, TRANSLATION), &device);
    let moving = PointSet::<B>::from_coords(&lattice(), &device);

    // The translated reference shifts the joint midpoint off the origin a little
    let session_config = SessionConfig::new().with_centering_tolerance(0.1);
    let mut session =
        RegistrationSession::new(reference, moving, Correspondence::Linked, session_config).unwrap();
    let config = StageConfig::for_stage(Stage::RigidBody).with_learning_rate(0.1);
    let state = session.fit_stage(Stage::RigidBody, &config).unwrap();

    assert!(state.warnings.is_empty(), "{:?}", state.warnings);
    let model = session.models().rigid_body().unwrap();
    assert!((model.angle() - theta).abs() < 1e-3, "angle = {}", model.angle());
    // The linear part stays frozen after phase 2
    assert_eq!(model.trainable_parameters(), vec![RigidBodyTransform::<B>::TRANSLATION]);

    let stats = session.residuals().unwrap();
    assert!(stats.max() < 1e-2, "max residual = {}", stats.max());
}

#[test]
fn test_session_affine_stage_applies_to_new_points() {
    let device = Default::default();
    let reference = PointSet::<B>::from_coords(&affine_image(&lattice(), MATRIX, TRANSLATION), &device);
    let moving = PointSet::<B>::from_coords(&lattice(), &device);

    let mut session =
        RegistrationSession::new(reference, moving, Correspondence::Linked, SessionConfig::default()).unwrap();
    let config = StageConfig::for_stage(Stage::Affine).with_learning_rate(0.1);
    session.fit_stage(Stage::Affine, &config).unwrap();

    let points = Tensor::<B, 2>::from_floats([[10.0, 0.0], [0.0, -10.0]], &device);
    let mapped: Vec<f32> = session
        .apply_stage(Stage::Affine, points)
        .unwrap()
        .into_data()
        .to_vec()
        .unwrap();
    let expected = affine_image(&[[10.0, 0.0], [0.0, -10.0]], MATRIX, TRANSLATION);
    for (got, want) in mapped.iter().zip(expected.iter().flatten()) {
        assert!((*got as f64 - want).abs() < 2e-2, "{} vs {}", got, want);
    }
}

#[test]
fn test_off_center_data_warns() {
    let device = Default::default();
    let far: Vec<[f64; 2]> = lattice().iter().map(|p| [p[0] + 100.0, p[1] + 100.0]).collect();
    let reference = PointSet::<B>::from_coords(&far, &device);
    let moving = PointSet::<B>::from_coords(&far, &device);

    let mut session =
        RegistrationSession::new(reference, moving, Correspondence::Linked, SessionConfig::default()).unwrap();
    let config = StageConfig::for_stage(Stage::Affine).with_iterations(1).with_learning_rate(1e-3);
    let state = session.fit_stage(Stage::Affine, &config).unwrap();

    assert_eq!(state.warnings.len(), 1);
    assert!(matches!(
        state.warnings[0],
        locreg_registration::RegistrationWarning::NotCentered { stage: Stage::Affine, .. }
    ));
}

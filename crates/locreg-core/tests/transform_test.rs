use burn::backend::Autodiff;
use burn::tensor::{Tensor, TensorData};
use burn_ndarray::NdArray;
use locreg_core::spatial::{Bounds, Point2};
use locreg_core::transform::{
    AffineTransform, CatmullRomSplineTransform, Polynomial3Transform, RigidBodyTransform,
    ShiftTransform, Trainable, Transform,
};
use locreg_core::ControlPointGrid;
use std::f32::consts::PI;

type B = NdArray<f32>;
type AD = Autodiff<NdArray<f32>>;

fn sample_points() -> Tensor<B, 2> {
    let device = Default::default();
    let data = TensorData::from([[0.0f32, 0.0], [1.5, -2.25], [-1200.0, 340.5], [0.001, 9999.0]]);
    Tensor::<B, 2>::from_data(data, &device)
}

fn as_vec(t: Tensor<B, 2>) -> Vec<f32> {
    t.into_data().as_slice::<f32>().unwrap().to_vec()
}

#[test]
fn test_identity_transforms_are_exact() {
    let device = Default::default();
    let points = sample_points();
    let expected = as_vec(points.clone());

    let shift = ShiftTransform::<B>::identity(&device);
    assert_eq!(as_vec(shift.transform_points(points.clone())), expected);

    let rigid = RigidBodyTransform::<B>::identity(&device);
    assert_eq!(as_vec(rigid.transform_points(points.clone())), expected);

    let affine = AffineTransform::<B>::identity(&device);
    assert_eq!(as_vec(affine.transform_points(points)), expected);
}

#[test]
fn test_initial_polynomial_and_spline_are_identity() {
    let device = Default::default();
    let points = sample_points();
    let expected = as_vec(points.clone());

    let polynomial = Polynomial3Transform::<B>::identity(1.0, &device);
    let actual = as_vec(polynomial.transform_points(points.clone()));
    for (a, e) in actual.iter().zip(&expected) {
        assert!((a - e).abs() <= 1e-6 * e.abs().max(1.0), "{} vs {}", a, e);
    }

    let bounds = Bounds::new(Point2::new(-1200.0, -2.25), Point2::new(1.5, 9999.0));
    let grid = ControlPointGrid::build(&bounds, 500.0, 1).unwrap();
    let spline = CatmullRomSplineTransform::<B>::identity(grid, &device);
    assert_eq!(as_vec(spline.transform_points(points)), expected);
}

#[test]
fn test_rigid_transform_2d() {
    let device = Default::default();

    // Point (1, 0) -> Rotation(90) -> (0, 1) -> Translation(1, 1) -> (1, 2)
    let points = Tensor::<B, 2>::from_data(TensorData::from([[1.0f32, 0.0]]), &device);
    let translation = Tensor::<B, 1>::from_data(TensorData::from([1.0f32, 1.0]), &device);
    let rotation = Tensor::<B, 1>::from_data(TensorData::from([PI / 2.0]), &device);
    let transform = RigidBodyTransform::<B>::new(rotation, translation);

    let actual = as_vec(transform.transform_points(points));
    assert!((actual[0] - 1.0).abs() < 1e-5, "X mismatch: got {}", actual[0]);
    assert!((actual[1] - 2.0).abs() < 1e-5, "Y mismatch: got {}", actual[1]);
}

#[test]
fn test_rigid_preserves_distances() {
    let device = Default::default();
    let rotation = Tensor::<B, 1>::from_floats([0.3], &device);
    let translation = Tensor::<B, 1>::from_floats([4.0, -7.0], &device);
    let transform = RigidBodyTransform::<B>::new(rotation, translation);

    let points = Tensor::<B, 2>::from_floats([[0.0, 0.0], [3.0, 4.0]], &device);
    let out = as_vec(transform.transform_points(points));
    let d = ((out[2] - out[0]).powi(2) + (out[3] - out[1]).powi(2)).sqrt();
    assert!((d - 5.0).abs() < 1e-5);
}

#[test]
fn test_parameter_names() {
    let device = Default::default();
    assert_eq!(ShiftTransform::<AD>::identity(&device).parameter_names(), &["shift"]);
    assert_eq!(
        RigidBodyTransform::<AD>::identity(&device).parameter_names(),
        &["rotation", "translation"]
    );
    assert_eq!(
        AffineTransform::<AD>::identity(&device).parameter_names(),
        &["matrix", "translation"]
    );
    assert_eq!(
        Polynomial3Transform::<AD>::identity(1.0, &device).parameter_names(),
        &["coefficients"]
    );
}

#[test]
fn test_freeze_keeps_values() {
    let device = Default::default();
    let rotation = Tensor::<AD, 1>::from_floats([0.25], &device);
    let translation = Tensor::<AD, 1>::from_floats([1.0, 2.0], &device);
    let transform = RigidBodyTransform::<AD>::new(rotation, translation);

    let frozen = transform.freeze("translation").unwrap();
    assert_eq!(frozen.trainable_parameters(), vec!["rotation"]);
    assert!((frozen.angle() - 0.25).abs() < 1e-7);
    assert_eq!(frozen.translation_vector(), nalgebra::Vector2::new(1.0, 2.0));

    let thawed = frozen.unfreeze("translation").unwrap();
    assert_eq!(thawed.trainable_parameters(), vec!["rotation", "translation"]);
}

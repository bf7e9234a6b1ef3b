//! Two-Channel Registration Example
//!
//! Registers a simulated moving channel onto a reference channel of bead
//! localizations and checks the result on held-out beads:
//!
//! 1. Simulate linked bead positions with a distortion between the channels
//! 2. Split the beads into a training and a test set
//! 3. Fit shift, affine and spline stages on the training set
//! 4. Apply the fitted models to the test set through a secondary session
//!
//! Usage:
//!   cargo run --example two_channel_registration

use burn::backend::Autodiff;
use burn_ndarray::NdArray;
use locreg_core::PointSet;
use locreg_registration::{
    split_linked, Correspondence, RegistrationSession, SessionConfig, Stage, StageConfig,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

type Backend = Autodiff<NdArray<f32>>;

/// Field of view in nm.
const FIELD: f64 = 10_000.0;

fn distort(p: [f64; 2]) -> [f64; 2] {
    let (s, c) = 0.004f64.sin_cos();
    let x = 1.002 * (c * p[0] - s * p[1]) + 120.0;
    let y = 0.999 * (s * p[0] + c * p[1]) - 80.0;
    [
        x + 15.0 * (p[1] / 3000.0).sin(),
        y + 10.0 * (p[0] / 4000.0).cos(),
    ]
}

fn main() -> anyhow::Result<()> {
    println!("locreg Two-Channel Registration Example");
    println!("=======================================\n");

    tracing_subscriber::fmt().with_env_filter("info").init();

    let device = Default::default();

    // =======================================================================
    // Step 1: Simulate beads
    // =======================================================================
    println!("Step 1: Simulating beads...");
    let mut rng = StdRng::seed_from_u64(2024);
    let reference: Vec<[f64; 2]> = (0..400)
        .map(|_| [rng.random_range(0.0..FIELD), rng.random_range(0.0..FIELD)])
        .collect();
    let moving: Vec<[f64; 2]> = reference
        .iter()
        .map(|&p| {
            let q = distort(p);
            [q[0] + rng.random_range(-2.0..2.0), q[1] + rng.random_range(-2.0..2.0)]
        })
        .collect();

    let reference = PointSet::<Backend>::from_coords(&reference, &device);
    let moving = PointSet::<Backend>::from_coords(&moving, &device);
    println!("  {} linked bead pairs", reference.len());

    // =======================================================================
    // Step 2: Split
    // =======================================================================
    println!("\nStep 2: Splitting into training and test beads...");
    let split = split_linked(&reference, &moving, 0.8, 7)?;
    println!(
        "  {} training pairs, {} test pairs",
        split.train_reference.len(),
        split.test_reference.len()
    );

    // =======================================================================
    // Step 3: Fit
    // =======================================================================
    println!("\nStep 3: Fitting stages...");
    let mut session = RegistrationSession::new(
        split.train_reference,
        split.train_moving,
        Correspondence::Linked,
        SessionConfig::new().with_log_interval(100),
    )?;
    let offset = session.center()?;
    println!("  Initial mean residual: {:.2} nm", session.residuals()?.mean);

    let stages = [
        (Stage::Shift, StageConfig::for_stage(Stage::Shift)),
        (Stage::Affine, StageConfig::for_stage(Stage::Affine).with_learning_rate(1e-3)),
        (
            Stage::Spline,
            StageConfig::for_stage(Stage::Spline)
                .with_cell_size(2500.0)
                .with_learning_rate(1e-3),
        ),
    ];
    for (stage, config) in &stages {
        session.fit_stage(*stage, config)?;
        let stats = session.residuals()?;
        println!(
            "  After {:<12} mean residual {:.2} nm (std x {:.2}, y {:.2})",
            stage, stats.mean, stats.std_xy[0], stats.std_xy[1]
        );
    }

    // =======================================================================
    // Step 4: Validate on held-out beads
    // =======================================================================
    println!("\nStep 4: Applying the models to the test beads...");
    let mut validation = RegistrationSession::new(
        split.test_reference.translate(offset),
        split.test_moving.translate(offset),
        Correspondence::Linked,
        SessionConfig::default(),
    )?;
    validation.copy_fitted_models(&session)?;
    println!("  Test mean residual before: {:.2} nm", validation.residuals()?.mean);
    for stage in session.state().fitted {
        validation.transform_stage(stage)?;
    }
    let stats = validation.residuals()?;
    println!(
        "  Test mean residual after:  {:.2} nm (max {:.2} nm)",
        stats.mean,
        stats.max()
    );

    if let Some(grid) = session.grid() {
        println!("\nControl-point lattice: {:?} nodes, cell {} nm", grid.dims(), grid.cell_size());
    }

    println!("\nRegistration completed.");
    Ok(())
}

// ============================================================
// Layer 1 — CLI / Presentation Layer
// ============================================================
// This is the entry point for all user interaction.
// It uses the `clap` crate to parse command line arguments.
// All business logic is delegated to Layer 2 (application).
//
// Three commands are supported:
//   1. `train`      — trains the FCN on KITTI road
//   2. `infer`      — writes road overlays for the testing images
//   3. `check-data` — reports what is on disk
//
// The backend is picked here and passed down as a type
// parameter: training runs on Autodiff<..>, inference on the
// plain backend.
//
// Reference: Rust Book §7 (Modules), §12 (CLI programs)

pub mod commands;

use anyhow::Result;
use burn::backend::{
    ndarray::NdArrayDevice,
    wgpu::WgpuDevice,
    Autodiff, NdArray, Wgpu,
};
use clap::Parser;
use commands::{BackendKind, CheckDataArgs, Commands, InferArgs, TrainArgs};

use crate::application::{
    infer_use_case::{check_dataset, InferUseCase},
    train_use_case::TrainUseCase,
};

#[derive(Parser, Debug)]
#[command(
    name = "road-fcn",
    version = "0.1.0",
    about = "Train an FCN-8s road segmenter on KITTI road, then segment the test images."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    pub fn run(self) -> Result<()> {
        match self.command {
            Commands::Train(args)     => run_train(args),
            Commands::Infer(args)     => run_infer(args),
            Commands::CheckData(args) => run_check_data(args),
        }
    }
}

fn run_train(args: TrainArgs) -> Result<()> {
    tracing::info!("Starting training on KITTI road in: {}", args.data_dir);

    let backend  = args.backend;
    let use_case = TrainUseCase::new(args.into());
    let report = match backend {
        BackendKind::Wgpu    => use_case.execute::<Autodiff<Wgpu>>(WgpuDevice::default())?,
        BackendKind::NdArray => use_case.execute::<Autodiff<NdArray>>(NdArrayDevice::default())?,
    };

    if let Some(last) = report.last() {
        println!(
            "Training complete after {} epochs. Final train_loss={:.4}",
            last.epoch, last.train_loss
        );
    }
    if report.best_val_loss.is_finite() {
        println!("Best val_loss={:.4}", report.best_val_loss);
    }
    Ok(())
}

fn run_infer(args: InferArgs) -> Result<()> {
    let backend  = args.backend;
    let use_case = InferUseCase::new(args.into());
    let run_dir = match backend {
        BackendKind::Wgpu    => use_case.execute::<Wgpu>(WgpuDevice::default())?,
        BackendKind::NdArray => use_case.execute::<NdArray>(NdArrayDevice::default())?,
    };
    println!("Overlays saved to {}", run_dir.display());
    Ok(())
}

fn run_check_data(args: CheckDataArgs) -> Result<()> {
    let report = check_dataset(&args.data_dir)?;
    println!("training images : {}", report.training_images);
    println!("with ground truth: {}", report.paired_samples);
    println!("testing images  : {}", report.testing_images);
    if report.is_complete_kitti() {
        println!("Dataset matches the KITTI road release.");
    } else {
        println!("Dataset is incomplete or modified.");
    }
    Ok(())
}

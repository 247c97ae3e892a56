// ============================================================
// Layer 1 — CLI Commands and Arguments
// ============================================================
// Defines the three subcommands: `train`, `infer` and
// `check-data`, and all their configurable flags.
//
// Reference: Rust Book §12 (Building a CLI Program)

use clap::{Args, Subcommand, ValueEnum};

use crate::application::{infer_use_case::InferConfig, train_use_case::TrainConfig};

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Train the FCN-8s road segmenter on KITTI road
    Train(TrainArgs),

    /// Segment every KITTI testing image with a trained checkpoint
    Infer(InferArgs),

    /// Count training, ground-truth and testing images on disk
    CheckData(CheckDataArgs),
}

/// Tensor backend the command runs on.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    #[value(name = "ndarray")]
    NdArray,
    Wgpu,
}

#[derive(Args, Debug)]
pub struct TrainArgs {
    /// Directory containing data_road/
    #[arg(long, default_value = "data")]
    pub data_dir: String,

    /// Directory to save checkpoints, configs and metrics
    #[arg(long, default_value = "checkpoints")]
    pub checkpoint_dir: String,

    /// Burn record of the pretrained VGG16 encoder (without extension)
    #[arg(long, default_value = "data/vgg/vgg16")]
    pub backbone: String,

    /// Start from random encoder weights instead of the backbone record
    #[arg(long)]
    pub from_scratch: bool,

    /// Only update the decoder
    #[arg(long)]
    pub freeze_backbone: bool,

    #[arg(long, default_value_t = 50)]
    pub epochs: usize,

    #[arg(long, default_value_t = 5)]
    pub batch_size: usize,

    /// Adam learning rate
    #[arg(long, default_value_t = 5e-4)]
    pub lr: f64,

    /// Drop probability after fc6 and fc7
    #[arg(long, default_value_t = 0.5)]
    pub dropout: f64,

    #[arg(long, default_value_t = 2)]
    pub num_classes: usize,

    /// Must be divisible by 32
    #[arg(long, default_value_t = 160)]
    pub image_height: usize,

    /// Must be divisible by 32
    #[arg(long, default_value_t = 576)]
    pub image_width: usize,

    /// Share of the paired samples held out for validation
    #[arg(long, default_value_t = 0.1)]
    pub val_fraction: f64,

    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Weight of the decoder L2 penalty (0 trains on cross-entropy alone)
    #[arg(long, default_value_t = 0.0)]
    pub l2_scale: f64,

    /// Add horizontally mirrored copies of the training images
    #[arg(long)]
    pub mirror: bool,

    #[arg(long, default_value_t = 2)]
    pub num_workers: usize,

    /// Save weights every N epochs (the last epoch is always saved)
    #[arg(long, default_value_t = 10)]
    pub checkpoint_every: usize,

    #[arg(long, value_enum, default_value_t = BackendKind::Wgpu)]
    pub backend: BackendKind,
}

impl From<TrainArgs> for TrainConfig {
    fn from(a: TrainArgs) -> Self {
        TrainConfig {
            data_dir:         a.data_dir,
            checkpoint_dir:   a.checkpoint_dir,
            backbone:         a.backbone,
            from_scratch:     a.from_scratch,
            freeze_backbone:  a.freeze_backbone,
            epochs:           a.epochs,
            batch_size:       a.batch_size,
            lr:               a.lr,
            dropout:          a.dropout,
            num_classes:      a.num_classes,
            image_height:     a.image_height,
            image_width:      a.image_width,
            val_fraction:     a.val_fraction,
            seed:             a.seed,
            l2_scale:         a.l2_scale,
            mirror:           a.mirror,
            num_workers:      a.num_workers,
            checkpoint_every: a.checkpoint_every,
        }
    }
}

#[derive(Args, Debug)]
pub struct InferArgs {
    /// Directory containing data_road/
    #[arg(long, default_value = "data")]
    pub data_dir: String,

    /// Directory where checkpoints were saved during training
    #[arg(long, default_value = "checkpoints")]
    pub checkpoint_dir: String,

    /// Parent directory for timestamped output runs
    #[arg(long, default_value = "runs")]
    pub runs_dir: String,

    /// Road probability a pixel must exceed to be painted
    #[arg(long, default_value_t = 0.5)]
    pub threshold: f32,

    #[arg(long, value_enum, default_value_t = BackendKind::Wgpu)]
    pub backend: BackendKind,
}

impl From<InferArgs> for InferConfig {
    fn from(a: InferArgs) -> Self {
        InferConfig {
            data_dir:       a.data_dir,
            checkpoint_dir: a.checkpoint_dir,
            runs_dir:       a.runs_dir,
            threshold:      a.threshold,
        }
    }
}

#[derive(Args, Debug)]
pub struct CheckDataArgs {
    #[arg(long, default_value = "data")]
    pub data_dir: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::Cli;
    use clap::Parser;

    #[test]
    fn test_train_defaults_match_config() {
        let cli = Cli::try_parse_from(["road-fcn", "train"]).unwrap();
        let Commands::Train(args) = cli.command else { panic!("expected train") };
        assert_eq!(args.backend, BackendKind::Wgpu);

        let cfg: TrainConfig = args.into();
        let default = TrainConfig::default();
        assert_eq!(cfg.epochs, default.epochs);
        assert_eq!(cfg.batch_size, default.batch_size);
        assert_eq!(cfg.lr, default.lr);
        assert_eq!(cfg.image_shape(), default.image_shape());
        assert_eq!(cfg.backbone, default.backbone);
        assert_eq!(cfg.l2_scale, default.l2_scale);
    }

    #[test]
    fn test_infer_flags() {
        let cli = Cli::try_parse_from([
            "road-fcn", "infer", "--backend", "ndarray", "--threshold", "0.7",
        ])
        .unwrap();
        let Commands::Infer(args) = cli.command else { panic!("expected infer") };
        assert_eq!(args.backend, BackendKind::NdArray);

        let cfg: InferConfig = args.into();
        assert_eq!(cfg.threshold, 0.7);
        assert_eq!(cfg.runs_dir, "runs");
    }

    #[test]
    fn test_check_data_subcommand_name() {
        assert!(Cli::try_parse_from(["road-fcn", "check-data", "--data-dir", "x"]).is_ok());
    }
}

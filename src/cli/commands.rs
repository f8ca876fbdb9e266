// ============================================================
// Layer 1 — CLI Commands and Arguments
// ============================================================
// Two subcommands:
//   train   — train on CIFAR-10 (or synthetic data), then
//             report test accuracy
//   inspect — build the model and report its shapes
//
// Defaults reproduce the reference CIFAR-10 setup:
// 32x32 images, 4x4 patches, 512-wide tokens, 6 blocks.
//
// Reference: Rust Book §12 (Building a CLI Program)

use anyhow::Result;
use clap::{Args, Subcommand};

use crate::application::train_use_case::TrainConfig;
use crate::infra::config_store::ConfigStore;

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Train the Vision Transformer and evaluate it on the test split
    Train(TrainArgs),

    /// Build the model and print patch count, table shapes and parameter count
    Inspect(InspectArgs),
}

/// Architecture flags shared by both subcommands.
#[derive(Args, Debug, Clone)]
pub struct ModelArgs {
    /// Side length of the (square) input image after resizing
    #[arg(long, default_value_t = 32)]
    pub image_size: usize,

    /// Side length of each square patch; must divide image_size
    #[arg(long, default_value_t = 4)]
    pub patch_size: usize,

    /// Width of every token embedding
    #[arg(long, default_value_t = 512)]
    pub embed_dim: usize,

    /// Inner width of the feed-forward network
    #[arg(long, default_value_t = 1024)]
    pub hidden_dim: usize,

    /// Attention heads; embed_dim must be divisible by this
    #[arg(long, default_value_t = 8)]
    pub num_heads: usize,

    /// Number of stacked transformer blocks
    #[arg(long, default_value_t = 6)]
    pub num_layers: usize,

    #[arg(long, default_value_t = 10)]
    pub num_classes: usize,

    /// Dropout probability used during training
    #[arg(long, default_value_t = 0.2)]
    pub dropout: f64,
}

#[derive(Args, Debug)]
pub struct TrainArgs {
    /// Load the whole TrainConfig from this JSON file; other flags are ignored
    #[arg(long)]
    pub config: Option<String>,

    /// Directory holding the extracted CIFAR-10 binary batches
    #[arg(long, default_value = "data/cifar-10-batches-bin")]
    pub data_dir: String,

    /// Use generated images instead of CIFAR-10
    #[arg(long)]
    pub synthetic: bool,

    /// Training images per class for --synthetic
    #[arg(long, default_value_t = 100)]
    pub synthetic_per_class: usize,

    /// Keep at most this many CIFAR-10 samples per split
    #[arg(long)]
    pub sample_limit: Option<usize>,

    /// Write train_config.json, metrics.csv and eval.json here
    #[arg(long)]
    pub run_dir: Option<String>,

    #[arg(long, default_value_t = 128)]
    pub batch_size: usize,

    /// Number of optimizer steps
    #[arg(long, default_value_t = 2000)]
    pub num_steps: usize,

    /// Report the loss every N steps
    #[arg(long, default_value_t = 100)]
    pub log_every: usize,

    /// DataLoader worker threads; above 1 the run is no longer
    /// bit-for-bit reproducible from --seed
    #[arg(long, default_value_t = 1)]
    pub num_workers: usize,

    /// Seed for parameter init, shuffling and dropout
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    #[arg(long, default_value_t = 3e-4)]
    pub lr: f64,

    #[arg(long, default_value_t = 0.9)]
    pub beta1: f32,

    #[arg(long, default_value_t = 0.999)]
    pub beta2: f32,

    #[arg(long, default_value_t = 1e-4)]
    pub weight_decay: f32,

    #[command(flatten)]
    pub model: ModelArgs,
}

impl TrainArgs {
    /// Resolve the flags (or the --config file) into a TrainConfig.
    pub fn into_config(self) -> Result<TrainConfig> {
        match &self.config {
            Some(path) => {
                tracing::info!("Loading training config from '{}'", path);
                ConfigStore::load_file(path)
            }
            None => Ok(self.into()),
        }
    }
}

impl From<TrainArgs> for TrainConfig {
    fn from(a: TrainArgs) -> Self {
        let base = TrainConfig::from(a.model);
        TrainConfig {
            data_dir:            a.data_dir,
            synthetic:           a.synthetic,
            synthetic_per_class: a.synthetic_per_class,
            sample_limit:        a.sample_limit,
            run_dir:             a.run_dir,
            batch_size:          a.batch_size,
            num_steps:           a.num_steps,
            log_every:           a.log_every,
            num_workers:         a.num_workers,
            seed:                a.seed,
            lr:                  a.lr,
            beta_1:              a.beta1,
            beta_2:              a.beta2,
            weight_decay:        a.weight_decay,
            ..base
        }
    }
}

impl From<ModelArgs> for TrainConfig {
    fn from(m: ModelArgs) -> Self {
        TrainConfig {
            image_size:  m.image_size,
            patch_size:  m.patch_size,
            embed_dim:   m.embed_dim,
            hidden_dim:  m.hidden_dim,
            num_heads:   m.num_heads,
            num_layers:  m.num_layers,
            num_classes: m.num_classes,
            dropout:     m.dropout,
            ..TrainConfig::default()
        }
    }
}

#[derive(Args, Debug)]
pub struct InspectArgs {
    #[command(flatten)]
    pub model: ModelArgs,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::Cli;
    use clap::Parser;

    fn train_config(args: &[&str]) -> TrainConfig {
        let cli = Cli::try_parse_from(args).unwrap();
        match cli.command {
            Commands::Train(a) => a.into_config().unwrap(),
            other => panic!("expected train, got {other:?}"),
        }
    }

    #[test]
    fn test_defaults_match_train_config() {
        let parsed = train_config(&["vit-cifar", "train"]);
        let dflt   = TrainConfig::default();
        assert_eq!(parsed.embed_dim, dflt.embed_dim);
        assert_eq!(parsed.num_steps, dflt.num_steps);
        assert_eq!(parsed.beta_2, dflt.beta_2);
        assert_eq!(parsed.dropout, dflt.dropout);
        assert!(!parsed.synthetic);
    }

    #[test]
    fn test_flags_override() {
        let cfg = train_config(&[
            "vit-cifar", "train", "--synthetic", "--num-steps", "5", "--embed-dim", "64", "--num-heads", "4",
        ]);
        assert!(cfg.synthetic);
        assert_eq!(cfg.num_steps, 5);
        assert_eq!(cfg.embed_dim, 64);
        assert_eq!(cfg.num_heads, 4);
    }

    #[test]
    fn test_config_file_wins() {
        let dir  = tempfile::tempdir().unwrap();
        let path = ConfigStore::new(dir.path())
            .save(&TrainConfig { num_steps: 9, ..TrainConfig::default() })
            .unwrap();

        let cfg = train_config(&["vit-cifar", "train", "--num-steps", "5", "--config", path.to_str().unwrap()]);
        assert_eq!(cfg.num_steps, 9);
    }
}

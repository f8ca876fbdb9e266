// ============================================================
// Layer 2 — TrainUseCase
// ============================================================
// Orchestrates one training run:
//
//   Step 1: Pick the image source        (Layer 4 - data)
//   Step 2: Load train and test splits   (Layer 4 - data)
//   Step 3: Build datasets               (Layer 4 - data)
//   Step 4: Save config, open metrics    (Layer 6 - infra)
//   Step 5: Train, then evaluate         (Layer 5 - ml)

use anyhow::{ensure, Result};
use serde::{Deserialize, Serialize};

use crate::data::{cifar::Cifar10Loader, dataset::ImageDataset, synthetic::SyntheticSource};
use crate::domain::{image::Split, traits::ImageSource};
use crate::infra::{config_store::ConfigStore, metrics::MetricsLogger};
use crate::ml::model::VisionTransformerConfig;
use crate::ml::trainer::{run_training, TrainReport};

// ─── Training Configuration ──────────────────────────────────────────────────
// Every knob of a run in one serialisable struct. Nothing
// downstream reads globals; the model config is derived from
// this struct by `model_config()`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainConfig {
    // data
    pub data_dir:            String,
    pub synthetic:           bool,
    pub synthetic_per_class: usize,
    pub sample_limit:        Option<usize>,
    pub run_dir:             Option<String>,

    // loop
    pub batch_size:   usize,
    pub num_steps:    usize,
    pub log_every:    usize,
    pub num_workers:  usize,
    pub seed:         u64,

    // AdamW
    pub lr:           f64,
    pub beta_1:       f32,
    pub beta_2:       f32,
    pub weight_decay: f32,

    // model
    pub image_size:   usize,
    pub patch_size:   usize,
    pub embed_dim:    usize,
    pub hidden_dim:   usize,
    pub num_heads:    usize,
    pub num_layers:   usize,
    pub num_classes:  usize,
    pub dropout:      f64,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            data_dir:            "data/cifar-10-batches-bin".to_string(),
            synthetic:           false,
            synthetic_per_class: 100,
            sample_limit:        None,
            run_dir:             None,
            batch_size:          128,
            num_steps:           2000,
            log_every:           100,
            num_workers:         1,
            seed:                42,
            lr:                  3e-4,
            beta_1:              0.9,
            beta_2:              0.999,
            weight_decay:        1e-4,
            image_size:          32,
            patch_size:          4,
            embed_dim:           512,
            hidden_dim:          1024,
            num_heads:           8,
            num_layers:          6,
            num_classes:         10,
            dropout:             0.2,
        }
    }
}

impl TrainConfig {
    pub fn model_config(&self) -> VisionTransformerConfig {
        VisionTransformerConfig::new()
            .with_image_height(self.image_size)
            .with_image_width(self.image_size)
            .with_patch_size(self.patch_size)
            .with_embed_dim(self.embed_dim)
            .with_hidden_dim(self.hidden_dim)
            .with_num_heads(self.num_heads)
            .with_num_layers(self.num_layers)
            .with_num_classes(self.num_classes)
            .with_dropout(self.dropout)
    }

    /// The configured image source, boxed behind the ImageSource trait.
    pub fn source(&self) -> Box<dyn ImageSource> {
        if self.synthetic {
            Box::new(SyntheticSource::cifar_like(
                self.synthetic_per_class,
                (self.synthetic_per_class / 5).max(1),
                self.seed,
            ))
        } else {
            Box::new(Cifar10Loader::new(&self.data_dir).with_limit(self.sample_limit))
        }
    }
}

// ─── TrainUseCase ─────────────────────────────────────────────────────────────
pub struct TrainUseCase {
    config: TrainConfig,
}

impl TrainUseCase {
    pub fn new(config: TrainConfig) -> Self {
        Self { config }
    }

    pub fn execute(&self) -> Result<TrainReport> {
        let cfg = &self.config;

        // fail on bad hyperparameters before touching any data
        cfg.model_config().validate()?;
        ensure!(cfg.batch_size > 0, "batch_size must be positive");

        // ── Step 1–2: Load both splits ────────────────────────────────────────
        let source = cfg.source();
        ensure!(
            source.num_classes() == cfg.num_classes,
            "source provides {} classes but the model is configured for {}",
            source.num_classes(),
            cfg.num_classes
        );
        let train_samples = source.load(Split::Train)?;
        let test_samples  = source.load(Split::Test)?;
        ensure!(!train_samples.is_empty(), "training split is empty");

        // ── Step 3: Build Burn datasets ───────────────────────────────────────
        let train_dataset = ImageDataset::new(train_samples);
        let test_dataset  = ImageDataset::new(test_samples);
        tracing::info!(
            "Datasets: {} train, {} test",
            train_dataset.sample_count(),
            test_dataset.sample_count()
        );
        tracing::debug!("Train class counts: {:?}", train_dataset.class_counts(cfg.num_classes));

        // ── Step 4: Run directory ─────────────────────────────────────────────
        let logger = match &cfg.run_dir {
            Some(dir) => {
                ConfigStore::new(dir).save(cfg)?;
                Some(MetricsLogger::new(dir)?)
            }
            None => None,
        };

        // ── Step 5: Train + evaluate (Layer 5) ────────────────────────────────
        run_training(cfg, train_dataset, test_dataset, logger.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tiny() -> TrainConfig {
        TrainConfig {
            synthetic:           true,
            synthetic_per_class: 2,
            batch_size:          8,
            num_steps:           3,
            log_every:           1,
            num_workers:         1,
            image_size:          8,
            patch_size:          4,
            embed_dim:           16,
            hidden_dim:          32,
            num_heads:           2,
            num_layers:          1,
            ..TrainConfig::default()
        }
    }

    #[test]
    fn test_default_model_matches_cifar() {
        let model = TrainConfig::default().model_config();
        assert_eq!(model.num_patches(), 64);
        assert_eq!(model.sequence_len(), 65);
        assert!(model.validate().is_ok());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let cfg: TrainConfig = serde_json::from_str(r#"{"num_steps": 10, "synthetic": true}"#).unwrap();
        assert_eq!(cfg.num_steps, 10);
        assert!(cfg.synthetic);
        assert_eq!(cfg.embed_dim, 512);
    }

    #[test]
    fn test_invalid_model_fails_before_loading() {
        let cfg = TrainConfig { num_heads: 3, ..tiny() };
        assert!(TrainUseCase::new(cfg).execute().is_err());
    }

    #[test]
    fn test_class_count_must_match_source() {
        let cfg = TrainConfig { num_classes: 4, ..tiny() };
        let err = TrainUseCase::new(cfg).execute().unwrap_err();
        assert!(err.to_string().contains("classes"));
    }

    #[test]
    fn test_synthetic_end_to_end_run() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = TrainConfig { run_dir: Some(dir.path().display().to_string()), ..tiny() };

        let report = TrainUseCase::new(cfg).execute().unwrap();
        assert_eq!(report.steps, 3);
        assert!(report.final_loss.is_finite());
        assert_eq!(report.eval.total, 10);
        assert!((0.0..=100.0).contains(&report.eval.accuracy_pct));

        let csv = std::fs::read_to_string(dir.path().join("metrics.csv")).unwrap();
        assert_eq!(csv.lines().count(), 4);
        assert!(dir.path().join("train_config.json").exists());
        assert!(dir.path().join("eval.json").exists());
    }
}

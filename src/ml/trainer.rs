// ============================================================
// Layer 5 — Training Loop
// ============================================================
// Fixed-step training with Burn's DataLoader and AdamW.
//
//   - Training runs on TrainBackend (Autodiff<Inner>)
//   - Evaluation runs on model.valid(), i.e. the inner
//     backend with no autodiff bookkeeping
//   - The run seed is split into [dropout root, augment key];
//     the dropout root is split once per step into
//     [next_root, step_key]
//   - num_workers <= 1 keeps loading on the training thread so a
//     seeded run replays exactly; more workers trade that for
//     throughput (batch order then depends on thread timing)
//
// Every step replaces the model with the one returned by the
// optimizer; parameters are never updated in place.
//
// Reference: Burn Book §5, Loshchilov & Hutter (2019) AdamW

use anyhow::{bail, Result};
use burn::{
    data::dataloader::DataLoaderBuilder,
    module::AutodiffModule,
    optim::{AdamWConfig, GradientsParams, Optimizer},
    prelude::*,
    tensor::backend::AutodiffBackend,
};

use crate::application::train_use_case::TrainConfig;
use crate::data::{batcher::{ImageBatch, ImageBatcher}, dataset::ImageDataset};
use crate::infra::metrics::{EvalMetrics, MetricsLogger, StepMetrics};
use crate::ml::evaluator::evaluate;
use crate::ml::model::VisionTransformer;
use crate::ml::rng::PrngKey;

#[cfg(feature = "wgpu")]
pub type InnerBackend = burn::backend::Wgpu;
#[cfg(not(feature = "wgpu"))]
pub type InnerBackend = burn::backend::NdArray;

pub type TrainBackend = burn::backend::Autodiff<InnerBackend>;

/// What a finished run reports back to the application layer.
#[derive(Debug, Clone)]
pub struct TrainReport {
    pub steps:      usize,
    pub final_loss: f64,
    pub eval:       EvalMetrics,
}

/// One optimizer step on one batch.
///
/// Returns the updated model and the batch's mean cross-entropy
/// measured before the update.
pub fn train_step<B, O>(
    model: VisionTransformer<B>,
    optim: &mut O,
    batch: ImageBatch<B>,
    key:   PrngKey,
    lr:    f64,
) -> Result<(VisionTransformer<B>, f64)>
where
    B: AutodiffBackend,
    O: Optimizer<VisionTransformer<B>, B>,
{
    let [batch_size, _, _, _] = batch.images.dims();
    let keys = key.split(batch_size);

    let (loss, _) = model.forward_loss(batch.images, batch.labels, &keys, true)?;
    let loss_val: f64 = loss.clone().into_scalar().elem::<f64>();

    let grads = loss.backward();
    let grads = GradientsParams::from_grads(grads, &model);
    let model = optim.step(lr, model, grads);

    Ok((model, loss_val))
}

/// Advance `root` and return the key for the current step.
pub fn next_step_key(root: &mut PrngKey) -> PrngKey {
    let [next_root, step_key] = root.split2();
    *root = next_root;
    step_key
}

pub fn run_training(
    cfg:           &TrainConfig,
    train_dataset: ImageDataset,
    test_dataset:  ImageDataset,
    logger:        Option<&MetricsLogger>,
) -> Result<TrainReport> {
    let device = <InnerBackend as Backend>::Device::default();
    tracing::info!("Using device: {:?}", device);

    // parameter initialisation draws from the backend generator
    TrainBackend::seed(cfg.seed);

    // ── Build model ───────────────────────────────────────────────────────────
    let model_cfg = cfg.model_config();
    let mut model: VisionTransformer<TrainBackend> = model_cfg.init(&device)?;
    tracing::info!(
        "Model ready: {} layers, embed_dim={}, {} patches, {} parameters",
        model_cfg.num_layers,
        model_cfg.embed_dim,
        model_cfg.num_patches(),
        model.num_params(),
    );

    // ── AdamW optimiser ───────────────────────────────────────────────────────
    let optim_cfg = AdamWConfig::new()
        .with_beta_1(cfg.beta_1)
        .with_beta_2(cfg.beta_2)
        .with_weight_decay(cfg.weight_decay);
    let mut optim = optim_cfg.init();

    let [mut root, augment_key] = PrngKey::new(cfg.seed).split2();

    // ── Training data loader (augmented, AutodiffBackend) ─────────────────────
    let train_batcher = ImageBatcher::<TrainBackend>::new(device.clone(), model_cfg.image_height, model_cfg.image_width)
        .with_augmentation(augment_key);
    let mut train_builder = DataLoaderBuilder::new(train_batcher)
        .batch_size(cfg.batch_size)
        .shuffle(cfg.seed);
    if cfg.num_workers > 1 {
        train_builder = train_builder.num_workers(cfg.num_workers);
    }
    let train_loader = train_builder.build(train_dataset);

    // ── Test data loader (InnerBackend — no autodiff overhead) ────────────────
    let test_batcher = ImageBatcher::<InnerBackend>::new(device.clone(), model_cfg.image_height, model_cfg.image_width);
    let mut test_builder = DataLoaderBuilder::new(test_batcher).batch_size(cfg.batch_size);
    if cfg.num_workers > 1 {
        test_builder = test_builder.num_workers(cfg.num_workers);
    }
    let test_loader = test_builder.build(test_dataset);

    // ── Step loop ─────────────────────────────────────────────────────────────
    let mut step       = 0usize;
    let mut final_loss = f64::NAN;
    let log_every      = cfg.log_every.max(1);

    'steps: while step < cfg.num_steps {
        let mut batches_this_pass = 0usize;

        for batch in train_loader.iter() {
            batches_this_pass += 1;

            let step_key = next_step_key(&mut root);
            let (updated, loss) = train_step(model, &mut optim, batch, step_key, cfg.lr)?;
            model      = updated;
            final_loss = loss;
            step      += 1;

            if step % log_every == 0 || step == cfg.num_steps {
                tracing::info!("step {:>6} | loss {:.4}", step, loss);
                if let Some(logger) = logger {
                    logger.log(&StepMetrics::new(step, loss))?;
                }
            }
            if step >= cfg.num_steps {
                break 'steps;
            }
        }

        if batches_this_pass == 0 {
            bail!("training dataset produced no batches");
        }
    }

    // ── Evaluation (dropout disabled) ─────────────────────────────────────────
    let model_valid = model.valid();
    let eval = evaluate(&model_valid, test_loader.iter())?;
    tracing::info!(
        "Evaluation: {}/{} correct ({:.2}%)",
        eval.correct,
        eval.total,
        eval.accuracy_pct
    );
    if let Some(logger) = logger {
        logger.write_eval(&eval)?;
    }

    tracing::info!("Training complete!");
    Ok(TrainReport { steps: step, final_loss, eval })
}

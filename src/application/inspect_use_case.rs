// ============================================================
// Layer 2 — InspectUseCase
// ============================================================
// Builds the model for a configuration and pushes one blank
// image through it, reporting the shapes along the way. Used
// to sanity-check a configuration before a long run.

use anyhow::Result;
use burn::prelude::*;
use serde::Serialize;

use crate::application::train_use_case::TrainConfig;
use crate::ml::model::{predict, VisionTransformer};
use crate::ml::rng::PrngKey;
use crate::ml::trainer::InnerBackend;

#[derive(Debug, Clone, Serialize)]
pub struct ModelSummary {
    pub num_patches:     usize,
    pub position_table:  [usize; 2],
    pub num_blocks:      usize,
    pub num_params:      usize,
    pub logits_shape:    [usize; 1],
    pub predicted_class: usize,
}

pub struct InspectUseCase {
    config: TrainConfig,
}

impl InspectUseCase {
    pub fn new(config: TrainConfig) -> Self {
        Self { config }
    }

    pub fn execute(&self) -> Result<ModelSummary> {
        let device    = <InnerBackend as Backend>::Device::default();
        let model_cfg = self.config.model_config();
        let model: VisionTransformer<InnerBackend> = model_cfg.init(&device)?;

        let image = Tensor::<InnerBackend, 3>::zeros(
            [model_cfg.num_channels, model_cfg.image_height, model_cfg.image_width],
            &device,
        );
        let logits = model.forward_single(image, PrngKey::new(self.config.seed), false)?;
        let logits_shape = logits.dims();
        let predicted_class = predict(logits.reshape([1, model_cfg.num_classes]))[0];

        Ok(ModelSummary {
            num_patches:    model.patch_embedding.num_patches(model_cfg.image_height, model_cfg.image_width),
            position_table: model.position_embedding.dims(),
            num_blocks:     model.blocks.len(),
            num_params:     model.num_params(),
            logits_shape,
            predicted_class,
        })
    }
}

// ============================================================
// Layer 5 — Evaluation
// ============================================================
// Runs the model with dropout disabled over every batch and
// counts arg-max predictions that match the label.
//
// Why model.valid()?
//   The trained model lives on Autodiff<Inner>. Every op on it
//   records a node for the backward pass, which evaluation never
//   takes. valid() strips the autodiff wrapper and returns the
//   same weights on the inner backend.
//
// Why is train = false enough to disable dropout?
//   SeededDropout is an exact identity when train is false, so
//   the key slice can be empty and the logits depend only on the
//   weights and the image.

use anyhow::Result;
use burn::{nn::loss::CrossEntropyLossConfig, prelude::*};

use crate::data::batcher::ImageBatch;
use crate::infra::metrics::EvalMetrics;
use crate::ml::model::VisionTransformer;

pub fn evaluate<B, I>(model: &VisionTransformer<B>, batches: I) -> Result<EvalMetrics>
where
    B: Backend,
    I: IntoIterator<Item = ImageBatch<B>>,
{
    let mut correct  = 0usize;
    let mut total    = 0usize;
    let mut loss_sum = 0.0f64;
    let mut batches_seen = 0usize;

    for batch in batches {
        let logits = model.forward(batch.images, &[], false)?;
        let [batch_size, _] = logits.dims();

        let ce = CrossEntropyLossConfig::new().init(&logits.device());
        loss_sum += ce
            .forward(logits.clone(), batch.labels.clone())
            .into_scalar()
            .elem::<f64>();
        batches_seen += 1;

        // argmax(1) returns [batch, 1]; flatten before comparing with labels [batch]
        let hits: i64 = logits
            .argmax(1)
            .reshape([batch_size])
            .equal(batch.labels)
            .int()
            .sum()
            .into_scalar()
            .elem::<i64>();

        correct += hits as usize;
        total   += batch_size;
    }

    let mean_loss = if batches_seen > 0 { loss_sum / batches_seen as f64 } else { f64::NAN };
    tracing::debug!("Evaluated {} samples over {} batches", total, batches_seen);

    Ok(EvalMetrics::new(correct, total, mean_loss))
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::{backend::NdArray, tensor::Distribution};

    use crate::ml::model::{predict, VisionTransformerConfig};

    type TestBackend = NdArray;

    fn model() -> VisionTransformer<TestBackend> {
        VisionTransformerConfig::new()
            .with_image_height(8)
            .with_image_width(8)
            .with_embed_dim(8)
            .with_hidden_dim(16)
            .with_num_heads(2)
            .with_num_layers(1)
            .with_num_classes(4)
            .init(&Default::default())
            .unwrap()
    }

    #[test]
    fn test_accuracy_matches_predictions() {
        let device = Default::default();
        let model  = model();
        let images = Tensor::<TestBackend, 4>::random([6, 3, 8, 8], Distribution::Normal(0.0, 1.0), &device);

        // label every image with the model's own prediction, then corrupt two
        let logits = model.forward(images.clone(), &[], false).unwrap();
        let mut labels: Vec<i32> = predict(logits).into_iter().map(|c| c as i32).collect();
        labels[0] = (labels[0] + 1) % 4;
        labels[3] = (labels[3] + 1) % 4;

        let batch = ImageBatch {
            images,
            labels: Tensor::from_ints(labels.as_slice(), &device),
        };
        let metrics = evaluate(&model, vec![batch]).unwrap();

        assert_eq!(metrics.total, 6);
        assert_eq!(metrics.correct, 4);
        assert!((metrics.accuracy_pct - 400.0 / 6.0).abs() < 1e-9);
        assert!(metrics.mean_loss.is_finite());
    }

    #[test]
    fn test_no_batches() {
        let metrics = evaluate::<TestBackend, _>(&model(), Vec::new()).unwrap();
        assert_eq!(metrics.total, 0);
        assert_eq!(metrics.accuracy_pct, 0.0);
    }
}

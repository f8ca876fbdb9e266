// ============================================================
// Layer 4 — Image Batcher
// ============================================================
// Implements Burn's Batcher trait to turn a Vec<ImageSample>
// into model-ready tensors.
//
// How batching works here:
//   Input:  Vec of N samples, each a CHW image + label
//   Output: ImageBatch { images [N, C, H, W], labels [N] }
//
//   Every image goes through the transform pipeline first
//   (augmentation only for the training batcher), then all
//   CHW buffers are concatenated and reshaped in one go:
//   [img1_c0.., img1_c1.., img2_c0.., ...] → [N, C, H, W]
//
// Where does the augmentation randomness come from?
//   Not from thread_rng. The training batcher is given a
//   PrngKey derived from the run seed and counts the batches
//   it has produced; batch k draws its crops and flips from
//   key.fold_in(k). Two runs with the same seed therefore see
//   the same augmented images in the same order.
//
//   The counter is shared by every clone of the batcher. With
//   a single loader thread batches are built in order, so the
//   k-th batch always gets the k-th key. With several worker
//   threads the workers race for the counter and the pairing
//   between batches and keys is no longer fixed.
//
// Reference: Burn Book §4 (Batcher)

use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};

use burn::{
    data::dataloader::batcher::Batcher,
    prelude::*,
    tensor::TensorData,
};
use rand::Rng;

use crate::data::transform::{resize_nearest, Augment, Normalize};
use crate::domain::image::ImageSample;
use crate::ml::rng::PrngKey;

// ─── ImageBatch ───────────────────────────────────────────────────────────────
/// A batch of images ready for the model forward pass.
/// Both tensors have batch_size as their first dimension.
#[derive(Debug, Clone)]
pub struct ImageBatch<B: Backend> {
    /// Normalised pixels — shape: [batch_size, channels, height, width]
    pub images: Tensor<B, 4>,

    /// Class indices — shape: [batch_size]
    /// One integer in [0, num_classes) per image
    pub labels: Tensor<B, 1, Int>,
}

// ─── ImageBatcher ─────────────────────────────────────────────────────────────
#[derive(Clone, Debug)]
pub struct ImageBatcher<B: Backend> {
    pub device:    B::Device,
    pub height:    usize,
    pub width:     usize,
    pub normalize: Normalize,
    /// None for evaluation batches
    pub augment:   Option<Augment>,
    augment_key:   PrngKey,
    batches_built: Arc<AtomicU64>,
}

impl<B: Backend> ImageBatcher<B> {
    /// Evaluation batcher producing `height x width` images.
    pub fn new(device: B::Device, height: usize, width: usize) -> Self {
        Self {
            device,
            height,
            width,
            normalize:     Normalize::cifar10(),
            augment:       None,
            augment_key:   PrngKey::new(0),
            batches_built: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Turn on random crop + flip, drawing from `key`.
    pub fn with_augmentation(mut self, key: PrngKey) -> Self {
        self.augment     = Some(Augment::default());
        self.augment_key = key;
        self
    }

    /// Run the transform pipeline on one sample and return its CHW buffer.
    pub fn prepare<R: Rng + ?Sized>(&self, sample: &ImageSample, rng: &mut R) -> Vec<f32> {
        let image = match &self.augment {
            Some(augment) => augment.apply(&sample.image, rng),
            None          => sample.image.clone(),
        };
        let mut image = resize_nearest(&image, self.height, self.width);
        self.normalize.apply(&mut image);
        image.data
    }
}

// ─── Burn Batcher Trait Implementation ────────────────────────────────────────
impl<B: Backend> Batcher<ImageSample, ImageBatch<B>> for ImageBatcher<B> {
    fn batch(&self, items: Vec<ImageSample>) -> ImageBatch<B> {
        let batch_size = items.len();
        let channels   = items.first().map_or(0, |s| s.image.channels);
        let index      = self.batches_built.fetch_add(1, Ordering::Relaxed);
        let mut rng    = self.augment_key.fold_in(index).rng();

        let pixels: Vec<f32> = items
            .iter()
            .flat_map(|s| self.prepare(s, &mut rng))
            .collect();

        let labels: Vec<i32> = items.iter().map(|s| s.label as i32).collect();

        let images = Tensor::<B, 4>::from_data(
            TensorData::new(pixels, [batch_size, channels, self.height, self.width]),
            &self.device,
        );
        let labels = Tensor::<B, 1, Int>::from_ints(labels.as_slice(), &self.device);

        ImageBatch { images, labels }
    }
}

// ============================================================
// Layer 4 — Synthetic Image Source
// ============================================================
// Generates a small labelled dataset from a seed so the full
// pipeline can run without CIFAR-10 on disk.
//
// Class k is a stripe pattern: the stripe period, orientation
// and per-channel tint all depend on k, and every pixel gets
// uniform noise. The classes are separable but not trivially
// so, which makes the loss curve meaningful.
//
// The train and test splits use different sub-seeds of the
// same root seed, so they never contain identical images.

use anyhow::{ensure, Result};
use rand::Rng;

use crate::domain::image::{Image, ImageSample, Split};
use crate::domain::traits::ImageSource;
use crate::ml::rng::PrngKey;

#[derive(Debug, Clone)]
pub struct SyntheticSource {
    pub num_classes:     usize,
    pub channels:        usize,
    pub height:          usize,
    pub width:           usize,
    pub train_per_class: usize,
    pub test_per_class:  usize,
    pub noise:           f32,
    pub seed:            u64,
}

impl SyntheticSource {
    /// CIFAR-shaped images (3x32x32, 10 classes).
    pub fn cifar_like(train_per_class: usize, test_per_class: usize, seed: u64) -> Self {
        Self {
            num_classes: 10,
            channels: 3,
            height: 32,
            width: 32,
            train_per_class,
            test_per_class,
            noise: 0.15,
            seed,
        }
    }

    fn render<R: Rng>(&self, class: usize, rng: &mut R) -> Image {
        let period   = 2 + class % 4;
        let vertical = (class / 4) % 2 == 1;
        let phase    = rng.gen_range(0..period);

        let mut image = Image::zeros(self.channels, self.height, self.width);
        for c in 0..self.channels {
            let tint = ((class + 1) * (c + 3) % 7) as f32 / 7.0;
            for y in 0..self.height {
                for x in 0..self.width {
                    let along  = if vertical { x } else { y };
                    let stripe = if (along + phase) / period % 2 == 0 { 0.8 } else { 0.2 };
                    let noise  = rng.gen_range(-self.noise..=self.noise);
                    let value  = (0.5 * stripe + 0.5 * tint + noise).clamp(0.0, 1.0);
                    image.set(c, y, x, value);
                }
            }
        }
        image
    }
}

impl ImageSource for SyntheticSource {
    fn load(&self, split: Split) -> Result<Vec<ImageSample>> {
        ensure!(self.num_classes > 0, "synthetic source needs at least one class");

        let [train_key, test_key] = PrngKey::new(self.seed).split2();
        let (key, per_class) = match split {
            Split::Train => (train_key, self.train_per_class),
            Split::Test  => (test_key, self.test_per_class),
        };

        let mut rng = key.rng();
        let mut samples = Vec::with_capacity(per_class * self.num_classes);
        // interleave classes so any prefix stays balanced
        for _ in 0..per_class {
            for class in 0..self.num_classes {
                samples.push(ImageSample::new(self.render(class, &mut rng), class));
            }
        }

        tracing::info!("Generated {} synthetic {:?} samples", samples.len(), split);
        Ok(samples)
    }

    fn num_classes(&self) -> usize {
        self.num_classes
    }
}

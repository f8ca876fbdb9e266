// ============================================================
// Layer 4 — Image Transforms
// ============================================================
// Pixel-level preprocessing applied by the batcher before
// images become tensors.
//
// Training pipeline (applied in order):
//   1. Zero-pad by 4 pixels and take a random crop of the
//      original size
//   2. Flip horizontally with probability 0.5
//   3. Resize to the model's input size (nearest neighbour)
//   4. Normalise each channel with the CIFAR-10 statistics
//
// Evaluation pipeline: steps 3 and 4 only, so the same image
// always produces the same tensor.
//
// Reference: Krizhevsky (2009) Learning Multiple Layers of
//            Features from Tiny Images

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::domain::image::Image;

/// Per-channel mean of the CIFAR-10 training set.
pub const CIFAR10_MEAN: [f32; 3] = [0.4914, 0.4822, 0.4465];

/// Per-channel standard deviation of the CIFAR-10 training set.
pub const CIFAR10_STD: [f32; 3] = [0.2470, 0.2435, 0.2616];

// ─── Normalize ────────────────────────────────────────────────────────────────
/// `(x - mean[c]) / std[c]` for every pixel of channel c.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Normalize {
    pub mean: Vec<f32>,
    pub std:  Vec<f32>,
}

impl Normalize {
    pub fn new(mean: Vec<f32>, std: Vec<f32>) -> Self {
        Self { mean, std }
    }

    pub fn cifar10() -> Self {
        Self::new(CIFAR10_MEAN.to_vec(), CIFAR10_STD.to_vec())
    }

    /// Normalise `image` in place. Channels beyond the configured
    /// statistics reuse them cyclically.
    pub fn apply(&self, image: &mut Image) {
        let plane = image.height * image.width;
        for (c, values) in image.data.chunks_mut(plane).enumerate() {
            let mean = self.mean[c % self.mean.len()];
            let std  = self.std[c % self.std.len()];
            for v in values {
                *v = (*v - mean) / std;
            }
        }
    }
}

// ─── Augment ──────────────────────────────────────────────────────────────────
/// Random crop with zero padding followed by a random horizontal flip.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Augment {
    pub padding:   usize,
    pub flip_prob: f64,
}

impl Default for Augment {
    fn default() -> Self {
        Self { padding: 4, flip_prob: 0.5 }
    }
}

impl Augment {
    pub fn apply<R: Rng + ?Sized>(&self, image: &Image, rng: &mut R) -> Image {
        let span = 2 * self.padding + 1;
        let dy   = rng.gen_range(0..span);
        let dx   = rng.gen_range(0..span);
        let cropped = crop_padded(image, self.padding, dy, dx);

        if rng.gen_bool(self.flip_prob) {
            horizontal_flip(&cropped)
        } else {
            cropped
        }
    }
}

/// Crop an image-sized window at offset (dy, dx) out of the image
/// zero-padded by `padding` on every side.
///
/// (dy, dx) = (padding, padding) returns the image unchanged.
pub fn crop_padded(image: &Image, padding: usize, dy: usize, dx: usize) -> Image {
    let mut out = Image::zeros(image.channels, image.height, image.width);
    for c in 0..image.channels {
        for y in 0..image.height {
            // source row in unpadded coordinates
            let sy = y + dy;
            if sy < padding || sy - padding >= image.height {
                continue;
            }
            for x in 0..image.width {
                let sx = x + dx;
                if sx < padding || sx - padding >= image.width {
                    continue;
                }
                out.set(c, y, x, image.get(c, sy - padding, sx - padding));
            }
        }
    }
    out
}

/// Mirror the image left to right.
pub fn horizontal_flip(image: &Image) -> Image {
    let mut out = Image::zeros(image.channels, image.height, image.width);
    for c in 0..image.channels {
        for y in 0..image.height {
            for x in 0..image.width {
                out.set(c, y, image.width - 1 - x, image.get(c, y, x));
            }
        }
    }
    out
}

/// Nearest-neighbour resize; returns a clone when the size already matches.
pub fn resize_nearest(image: &Image, height: usize, width: usize) -> Image {
    if image.height == height && image.width == width {
        return image.clone();
    }
    let mut out = Image::zeros(image.channels, height, width);
    for c in 0..image.channels {
        for y in 0..height {
            let sy = y * image.height / height;
            for x in 0..width {
                let sx = x * image.width / width;
                out.set(c, y, x, image.get(c, sy, sx));
            }
        }
    }
    out
}

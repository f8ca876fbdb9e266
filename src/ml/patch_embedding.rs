// ============================================================
// Layer 5 — Patch Embedding
// ============================================================
// Cuts each image into non-overlapping patch_size x patch_size
// tiles and projects every flattened tile with one shared
// Linear layer.
//
//   [B, C, H, W]
//     → reshape  [B, C, H/p, p, W/p, p]
//     → permute  [B, H/p, W/p, p, p, C]
//     → reshape  [B, N, p*p*C]          N = (H/p) * (W/p)
//     → Linear   [B, N, embed_dim]
//
// Patches come out row-major (top row left to right, then
// the next row); inside a patch the vector is ordered by
// (row, column, channel).

use burn::{
    nn::{Linear, LinearConfig},
    prelude::*,
};

use crate::domain::error::{ensure_positive, VitError, VitResult};

#[derive(Config, Debug)]
pub struct PatchEmbeddingConfig {
    pub num_channels: usize,
    pub patch_size:   usize,
    pub embed_dim:    usize,
}

impl PatchEmbeddingConfig {
    /// Length of one flattened patch vector.
    pub fn patch_dim(&self) -> usize {
        self.patch_size * self.patch_size * self.num_channels
    }

    pub fn init<B: Backend>(&self, device: &B::Device) -> VitResult<PatchEmbedding<B>> {
        ensure_positive("patch_size", self.patch_size)?;
        ensure_positive("num_channels", self.num_channels)?;
        ensure_positive("embed_dim", self.embed_dim)?;

        Ok(PatchEmbedding {
            projection:   LinearConfig::new(self.patch_dim(), self.embed_dim).init(device),
            num_channels: self.num_channels,
            patch_size:   self.patch_size,
        })
    }
}

#[derive(Module, Debug)]
pub struct PatchEmbedding<B: Backend> {
    pub projection:   Linear<B>,
    pub num_channels: usize,
    pub patch_size:   usize,
}

impl<B: Backend> PatchEmbedding<B> {
    /// images: [batch, channels, height, width] → [batch, num_patches, embed_dim]
    pub fn forward(&self, images: Tensor<B, 4>) -> VitResult<Tensor<B, 3>> {
        let patches = self.patchify(images)?;
        Ok(self.projection.forward(patches))
    }

    /// Split images into flattened patches without projecting them.
    pub fn patchify(&self, images: Tensor<B, 4>) -> VitResult<Tensor<B, 3>> {
        let [batch, channels, height, width] = images.dims();
        let p = self.patch_size;

        if channels != self.num_channels {
            return Err(VitError::shape(format!(
                "expected {} image channels, got {}",
                self.num_channels, channels
            )));
        }
        if height == 0 || width == 0 || height % p != 0 || width % p != 0 {
            return Err(VitError::shape(format!(
                "image size {height}x{width} is not divisible by patch size {p}"
            )));
        }

        let rows = height / p;
        let cols = width / p;

        let patches = images
            .reshape([batch, channels, rows, p, cols, p])
            .permute([0, 2, 4, 3, 5, 1])
            .reshape([batch, rows * cols, p * p * channels]);

        Ok(patches)
    }

    /// Number of patches produced for an image of the given size.
    pub fn num_patches(&self, height: usize, width: usize) -> usize {
        (height / self.patch_size) * (width / self.patch_size)
    }
}

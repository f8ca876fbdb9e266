// ============================================================
// Layer 5 — Pre-Norm Transformer Block
// ============================================================
//   normed1 = LayerNorm1(x)
//   x       = x + MultiHeadAttention(normed1, normed1, normed1)
//   normed2 = LayerNorm2(x)
//   h       = Dropout1(GELU(Linear1(normed2)))
//   h       = Dropout2(Linear2(h))
//   out     = x + h
//
// Residuals carry the un-normalised signal, so the output has
// the same shape as the input and the block reduces to the
// identity when both sub-layers output zero.
//
// Reference: Vaswani et al. (2017) Attention Is All You Need
//            Xiong et al. (2020) On Layer Normalization in the
//            Transformer Architecture

use burn::{
    nn::{
        attention::{MhaInput, MultiHeadAttention, MultiHeadAttentionConfig},
        LayerNorm, LayerNormConfig,
        Linear, LinearConfig,
    },
    prelude::*,
};

use crate::domain::error::{ensure_positive, VitError, VitResult};
use crate::ml::dropout::{SeededDropout, SeededDropoutConfig};
use crate::ml::rng::{split_each, PrngKey};

/// Epsilon shared by every LayerNorm in the model.
pub const LAYER_NORM_EPS: f64 = 1e-6;

#[derive(Config, Debug)]
pub struct AttentionBlockConfig {
    /// Token embedding width; attention and residuals use it.
    pub embed_dim:  usize,
    /// Inner width of the feed-forward network.
    pub hidden_dim: usize,
    pub num_heads:  usize,
    #[config(default = 0.0)]
    pub dropout:    f64,
}

impl AttentionBlockConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> VitResult<AttentionBlock<B>> {
        ensure_positive("embed_dim", self.embed_dim)?;
        ensure_positive("hidden_dim", self.hidden_dim)?;
        ensure_positive("num_heads", self.num_heads)?;
        if self.embed_dim % self.num_heads != 0 {
            return Err(VitError::shape(format!(
                "embed_dim {} is not divisible by num_heads {}",
                self.embed_dim, self.num_heads
            )));
        }

        // attention itself is not regularised; only the MLP drops units
        let attention = MultiHeadAttentionConfig::new(self.embed_dim, self.num_heads)
            .with_dropout(0.0)
            .init(device);

        Ok(AttentionBlock {
            norm1:    LayerNormConfig::new(self.embed_dim).with_epsilon(LAYER_NORM_EPS).init(device),
            attention,
            norm2:    LayerNormConfig::new(self.embed_dim).with_epsilon(LAYER_NORM_EPS).init(device),
            fc1:      LinearConfig::new(self.embed_dim, self.hidden_dim).init(device),
            fc2:      LinearConfig::new(self.hidden_dim, self.embed_dim).init(device),
            dropout1: SeededDropoutConfig::new(self.dropout).init()?,
            dropout2: SeededDropoutConfig::new(self.dropout).init()?,
        })
    }
}

#[derive(Module, Debug)]
pub struct AttentionBlock<B: Backend> {
    pub norm1:     LayerNorm<B>,
    pub attention: MultiHeadAttention<B>,
    pub norm2:     LayerNorm<B>,
    pub fc1:       Linear<B>,
    pub fc2:       Linear<B>,
    pub dropout1:  SeededDropout,
    pub dropout2:  SeededDropout,
}

impl<B: Backend> AttentionBlock<B> {
    /// x: [batch, seq_len, embed_dim] → same shape.
    ///
    /// `keys` holds one key per batch element; each is split in
    /// two so the feed-forward dropouts draw independent masks.
    pub fn forward(&self, x: Tensor<B, 3>, keys: &[PrngKey], train: bool) -> VitResult<Tensor<B, 3>> {
        let normed1 = self.norm1.forward(x.clone());
        let attended = self.attention.forward(MhaInput::self_attn(normed1)).context;
        let x = x + attended;

        let normed2 = self.norm2.forward(x.clone());
        let h = burn::tensor::activation::gelu(self.fc1.forward(normed2));

        let streams = if train { split_each(keys, 2) } else { vec![Vec::new(), Vec::new()] };

        let h = self.dropout1.forward(h, &streams[0], train)?;
        let h = self.dropout2.forward(self.fc2.forward(h), &streams[1], train)?;

        Ok(x + h)
    }
}

use burn::{
    module::Param,
    nn::{
        loss::CrossEntropyLossConfig,
        Initializer,
        LayerNorm, LayerNormConfig,
        Linear, LinearConfig,
    },
    prelude::*,
};

use crate::domain::error::{ensure_positive, ensure_probability, VitError, VitResult};
use crate::ml::attention_block::{AttentionBlock, AttentionBlockConfig, LAYER_NORM_EPS};
use crate::ml::dropout::{SeededDropout, SeededDropoutConfig};
use crate::ml::patch_embedding::{PatchEmbedding, PatchEmbeddingConfig};
use crate::ml::rng::{split_each, PrngKey};

/// Hyperparameters of the whole classifier. Defaults are the CIFAR-10 setup.
#[derive(Config, Debug)]
pub struct VisionTransformerConfig {
    #[config(default = 3)]
    pub num_channels: usize,
    #[config(default = 32)]
    pub image_height: usize,
    #[config(default = 32)]
    pub image_width:  usize,
    #[config(default = 4)]
    pub patch_size:   usize,
    #[config(default = 512)]
    pub embed_dim:    usize,
    #[config(default = 1024)]
    pub hidden_dim:   usize,
    #[config(default = 8)]
    pub num_heads:    usize,
    #[config(default = 6)]
    pub num_layers:   usize,
    #[config(default = 10)]
    pub num_classes:  usize,
    #[config(default = 0.2)]
    pub dropout:      f64,
}

impl VisionTransformerConfig {
    /// (image_height / patch_size) * (image_width / patch_size)
    pub fn num_patches(&self) -> usize {
        if self.patch_size == 0 {
            return 0;
        }
        (self.image_height / self.patch_size) * (self.image_width / self.patch_size)
    }

    /// Patches plus the class token.
    pub fn sequence_len(&self) -> usize {
        self.num_patches() + 1
    }

    pub fn validate(&self) -> VitResult<()> {
        ensure_positive("num_channels", self.num_channels)?;
        ensure_positive("image_height", self.image_height)?;
        ensure_positive("image_width", self.image_width)?;
        ensure_positive("patch_size", self.patch_size)?;
        ensure_positive("embed_dim", self.embed_dim)?;
        ensure_positive("hidden_dim", self.hidden_dim)?;
        ensure_positive("num_heads", self.num_heads)?;
        ensure_positive("num_layers", self.num_layers)?;
        ensure_positive("num_classes", self.num_classes)?;
        ensure_probability("dropout", self.dropout)?;

        if self.image_height % self.patch_size != 0 || self.image_width % self.patch_size != 0 {
            return Err(VitError::shape(format!(
                "image size {}x{} is not divisible by patch size {}",
                self.image_height, self.image_width, self.patch_size
            )));
        }
        if self.embed_dim % self.num_heads != 0 {
            return Err(VitError::shape(format!(
                "embed_dim {} is not divisible by num_heads {}",
                self.embed_dim, self.num_heads
            )));
        }
        Ok(())
    }

    pub fn init<B: Backend>(&self, device: &B::Device) -> VitResult<VisionTransformer<B>> {
        self.validate()?;

        let patch_embedding =
            PatchEmbeddingConfig::new(self.num_channels, self.patch_size, self.embed_dim).init(device)?;

        let token_init = Initializer::Normal { mean: 0.0, std: 1.0 };
        let position_embedding = token_init.init([self.sequence_len(), self.embed_dim], device);
        let class_token        = token_init.init([1, self.embed_dim], device);

        // every block gets its own freshly initialised parameters
        let block_cfg = AttentionBlockConfig::new(self.embed_dim, self.hidden_dim, self.num_heads)
            .with_dropout(self.dropout);
        let blocks = (0..self.num_layers)
            .map(|_| block_cfg.init(device))
            .collect::<VitResult<Vec<_>>>()?;

        Ok(VisionTransformer {
            patch_embedding,
            position_embedding,
            class_token,
            blocks,
            dropout:     SeededDropoutConfig::new(self.dropout).init()?,
            head_norm:   LayerNormConfig::new(self.embed_dim).with_epsilon(LAYER_NORM_EPS).init(device),
            head:        LinearConfig::new(self.embed_dim, self.num_classes).init(device),
            num_classes: self.num_classes,
        })
    }
}

#[derive(Module, Debug)]
pub struct VisionTransformer<B: Backend> {
    pub patch_embedding:    PatchEmbedding<B>,
    /// [num_patches + 1, embed_dim]; sliced to the sequence length at use.
    pub position_embedding: Param<Tensor<B, 2>>,
    /// [1, embed_dim]
    pub class_token:        Param<Tensor<B, 2>>,
    pub blocks:             Vec<AttentionBlock<B>>,
    pub dropout:            SeededDropout,
    pub head_norm:          LayerNorm<B>,
    pub head:               Linear<B>,
    pub num_classes:        usize,
}

impl<B: Backend> VisionTransformer<B> {
    /// images: [batch, channels, height, width] → logits: [batch, num_classes]
    ///
    /// With `train == true`, `keys` must hold one key per image. Each key
    /// is split into `[embedding dropout, block_0, .., block_{L-1}]`.
    /// With `train == false` the keys are ignored and may be empty.
    pub fn forward(&self, images: Tensor<B, 4>, keys: &[PrngKey], train: bool) -> VitResult<Tensor<B, 2>> {
        let [batch, _, _, _] = images.dims();
        if train && keys.len() != batch {
            return Err(VitError::shape(format!(
                "got {} randomness keys for a batch of {}",
                keys.len(),
                batch
            )));
        }

        let patches = self.patch_embedding.forward(images)?;
        let [_, num_patches, embed_dim] = patches.dims();
        let seq_len = num_patches + 1;

        let [table_len, _] = self.position_embedding.dims();
        if table_len < seq_len {
            return Err(VitError::shape(format!(
                "positional table holds {table_len} positions, sequence needs {seq_len}"
            )));
        }

        // [CLS] patch_0 .. patch_{N-1}
        let cls = self
            .class_token
            .val()
            .reshape([1, 1, embed_dim])
            .expand([batch, 1, embed_dim]);
        let x = Tensor::cat(vec![cls, patches], 1);

        let positions = self
            .position_embedding
            .val()
            .slice([0..seq_len, 0..embed_dim])
            .reshape([1, seq_len, embed_dim])
            .expand([batch, seq_len, embed_dim]);
        let x = x + positions;

        let streams = if train {
            split_each(keys, self.blocks.len() + 1)
        } else {
            vec![Vec::new(); self.blocks.len() + 1]
        };

        let mut x = self.dropout.forward(x, &streams[0], train)?;
        for (block, block_keys) in self.blocks.iter().zip(&streams[1..]) {
            x = block.forward(x, block_keys, train)?;
        }

        // only the class token survives pooling
        let pooled = x.slice([0..batch, 0..1, 0..embed_dim]).reshape([batch, embed_dim]);
        Ok(self.head.forward(self.head_norm.forward(pooled)))
    }

    /// image: [channels, height, width] → logits: [num_classes]
    pub fn forward_single(&self, image: Tensor<B, 3>, key: PrngKey, train: bool) -> VitResult<Tensor<B, 1>> {
        let [channels, height, width] = image.dims();
        let logits = self.forward(image.reshape([1, channels, height, width]), &[key], train)?;
        Ok(logits.reshape([self.num_classes]))
    }

    /// Mean cross-entropy between the logits and integer labels.
    /// Returns (loss [1], logits [batch, num_classes]).
    pub fn forward_loss(
        &self,
        images: Tensor<B, 4>,
        labels: Tensor<B, 1, Int>,
        keys:   &[PrngKey],
        train:  bool,
    ) -> VitResult<(Tensor<B, 1>, Tensor<B, 2>)> {
        let logits = self.forward(images, keys, train)?;
        let ce = CrossEntropyLossConfig::new().init(&logits.device());
        let loss = ce.forward(logits.clone(), labels);
        Ok((loss, logits))
    }
}

/// Arg-max class index per row of `logits`.
pub fn predict<B: Backend>(logits: Tensor<B, 2>) -> Vec<usize> {
    let [batch, _] = logits.dims();
    logits
        .argmax(1)
        .reshape([batch])
        .into_data()
        .iter::<i64>()
        .map(|class| class as usize)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use burn::{backend::NdArray, tensor::Distribution};

    type TestBackend = NdArray;

    fn small_config() -> VisionTransformerConfig {
        VisionTransformerConfig::new()
            .with_image_height(8)
            .with_image_width(8)
            .with_patch_size(4)
            .with_embed_dim(16)
            .with_hidden_dim(32)
            .with_num_heads(4)
            .with_num_layers(2)
            .with_num_classes(3)
            .with_dropout(0.3)
    }

    fn small_model() -> VisionTransformer<TestBackend> {
        small_config().init(&Default::default()).unwrap()
    }

    fn images(batch: usize, side: usize) -> Tensor<TestBackend, 4> {
        Tensor::random([batch, 3, side, side], Distribution::Normal(0.0, 1.0), &Default::default())
    }

    fn values<const D: usize>(t: Tensor<TestBackend, D>) -> Vec<f32> {
        t.into_data().to_vec::<f32>().unwrap()
    }

    #[test]
    fn test_cifar_geometry() {
        let cfg = VisionTransformerConfig::new();
        assert_eq!(cfg.num_patches(), 64);

        let model: VisionTransformer<TestBackend> = cfg.init(&Default::default()).unwrap();
        assert_eq!(model.position_embedding.dims(), [65, 512]);
        assert_eq!(model.class_token.dims(), [1, 512]);
        assert_eq!(model.blocks.len(), 6);

        let logits = model.forward_single(images(1, 32).reshape([3, 32, 32]), PrngKey::new(0), false).unwrap();
        assert_eq!(logits.dims(), [10]);

        let class = predict(logits.reshape([1, 10]))[0];
        assert!(class < 10);
    }

    #[test]
    fn test_output_shape_for_any_batch() {
        let model = small_model();
        for batch in [1, 2, 5] {
            let keys = PrngKey::new(batch as u64).split(batch);
            let out  = model.forward(images(batch, 8), &keys, true).unwrap();
            assert_eq!(out.dims(), [batch, 3]);
        }
    }

    #[test]
    fn test_eval_ignores_randomness() {
        let model = small_model();
        let x     = images(2, 8);
        let a = values(model.forward(x.clone(), &PrngKey::new(1).split(2), false).unwrap());
        let b = values(model.forward(x.clone(), &PrngKey::new(2).split(2), false).unwrap());
        let c = values(model.forward(x, &[], false).unwrap());
        assert_eq!(a, b);
        assert_eq!(a, c);
    }

    #[test]
    fn test_train_reproducible_with_same_seed() {
        let model = small_model();
        let x     = images(2, 8);
        let keys  = PrngKey::new(17).split(2);

        let a = values(model.forward(x.clone(), &keys, true).unwrap());
        let b = values(model.forward(x.clone(), &keys, true).unwrap());
        let c = values(model.forward(x, &PrngKey::new(18).split(2), true).unwrap());
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_batch_matches_single_image() {
        let model = small_model();
        let x     = images(3, 8);
        let keys  = PrngKey::new(5).split(3);

        let batched = values(model.forward(x.clone(), &keys, true).unwrap());
        for i in 0..3 {
            let image  = x.clone().slice([i..i + 1, 0..3, 0..8, 0..8]).reshape([3, 8, 8]);
            let single = values(model.forward_single(image, keys[i], true).unwrap());
            for (a, b) in batched[i * 3..(i + 1) * 3].iter().zip(&single) {
                assert_relative_eq!(*a, *b, epsilon = 1e-4);
            }
        }
    }

    #[test]
    fn test_forward_key_layout() {
        // key i → split(L + 1): [embedding dropout, block_0, .., block_{L-1}]
        let model  = small_config().with_num_layers(3).with_dropout(0.5).init::<TestBackend>(&Default::default()).unwrap();
        let x      = images(2, 8);
        let keys   = PrngKey::new(31).split(2);
        let actual = values(model.forward(x.clone(), &keys, true).unwrap());

        let streams = split_each(&keys, model.blocks.len() + 1);
        let patches = model.patch_embedding.forward(x).unwrap();
        let [batch, n, d] = patches.dims();
        let cls = model.class_token.val().reshape([1, 1, d]).expand([batch, 1, d]);
        let pos = model
            .position_embedding
            .val()
            .slice([0..n + 1, 0..d])
            .reshape([1, n + 1, d])
            .expand([batch, n + 1, d]);

        let mut h = model.dropout.forward(Tensor::cat(vec![cls, patches], 1) + pos, &streams[0], true).unwrap();
        for (i, block) in model.blocks.iter().enumerate() {
            h = block.forward(h, &streams[i + 1], true).unwrap();
        }
        let pooled   = h.slice([0..batch, 0..1, 0..d]).reshape([batch, d]);
        let expected = values(model.head.forward(model.head_norm.forward(pooled)));

        assert_eq!(actual, expected);
    }

    #[test]
    fn test_blocks_do_not_share_weights() {
        let model = small_model();
        let first  = values(model.blocks[0].fc1.weight.val());
        let second = values(model.blocks[1].fc1.weight.val());
        assert_ne!(first, second);

        let first  = values(model.blocks[0].attention.query.weight.val());
        let second = values(model.blocks[1].attention.query.weight.val());
        assert_ne!(first, second);
    }

    #[test]
    fn test_larger_image_overruns_positional_table() {
        let model = small_model();
        let err   = model.forward(images(1, 12), &[], false).unwrap_err();
        assert!(matches!(err, VitError::ShapeMismatch(_)));
    }

    #[test]
    fn test_smaller_image_truncates_positional_table() {
        let model  = small_model();
        let logits = model.forward(images(1, 4), &[], false).unwrap();
        assert_eq!(logits.dims(), [1, 3]);
    }

    #[test]
    fn test_key_count_must_match_batch_in_train_mode() {
        let model = small_model();
        let err   = model.forward(images(2, 8), &PrngKey::new(0).split(1), true).unwrap_err();
        assert!(matches!(err, VitError::ShapeMismatch(_)));
    }

    #[test]
    fn test_invalid_configurations() {
        let device = Default::default();
        let cases = [
            small_config().with_num_layers(0),
            small_config().with_num_classes(0),
            small_config().with_patch_size(0),
            small_config().with_num_heads(0),
            small_config().with_dropout(1.0),
        ];
        for cfg in cases {
            let err = cfg.init::<TestBackend>(&device).unwrap_err();
            assert!(matches!(err, VitError::Configuration(_)), "{cfg:?}");
        }

        let err = small_config().with_patch_size(3).init::<TestBackend>(&device).unwrap_err();
        assert!(matches!(err, VitError::ShapeMismatch(_)));
        let err = small_config().with_num_heads(3).init::<TestBackend>(&device).unwrap_err();
        assert!(matches!(err, VitError::ShapeMismatch(_)));
    }

    #[test]
    fn test_forward_loss_is_finite() {
        let model  = small_model();
        let labels = Tensor::<TestBackend, 1, Int>::from_ints([0, 2], &Default::default());
        let (loss, logits) = model
            .forward_loss(images(2, 8), labels, &PrngKey::new(3).split(2), true)
            .unwrap();
        assert_eq!(logits.dims(), [2, 3]);
        let loss = loss.into_scalar().elem::<f32>();
        assert!(loss.is_finite() && loss > 0.0);
    }

    #[test]
    fn test_predict_picks_largest_logit() {
        let logits = Tensor::<TestBackend, 2>::from_floats(
            [[0.1, 2.0, -1.0], [3.0, 0.0, 0.5]],
            &Default::default(),
        );
        assert_eq!(predict(logits), vec![1, 0]);
    }
}

// ============================================================
// Layer 5 — Seeded Dropout
// ============================================================
// Same semantics as burn's nn::Dropout (zero with probability
// p, rescale survivors by 1/(1-p)) but with two differences:
//   - the train/eval switch is an explicit argument instead
//     of being inferred from the backend
//   - the mask for batch element i is drawn from keys[i], so
//     a given key always produces the same mask
//
// With `train == false` the input tensor is returned as is.

use burn::{prelude::*, tensor::TensorData};
use rand::Rng;

use crate::domain::error::{ensure_probability, VitError, VitResult};
use crate::ml::rng::PrngKey;

#[derive(Config, Debug)]
pub struct SeededDropoutConfig {
    /// Probability of zeroing each unit.
    pub prob: f64,
}

impl SeededDropoutConfig {
    pub fn init(&self) -> VitResult<SeededDropout> {
        ensure_probability("dropout probability", self.prob)?;
        Ok(SeededDropout { prob: self.prob })
    }
}

#[derive(Module, Clone, Debug)]
pub struct SeededDropout {
    pub prob: f64,
}

impl SeededDropout {
    /// Apply dropout to `input`, whose first dimension is the batch.
    /// `keys` must hold exactly one key per batch element.
    pub fn forward<B: Backend, const D: usize>(
        &self,
        input: Tensor<B, D>,
        keys:  &[PrngKey],
        train: bool,
    ) -> VitResult<Tensor<B, D>> {
        if !train || self.prob == 0.0 {
            return Ok(input);
        }

        let dims  = input.dims();
        let batch = dims[0];
        if keys.len() != batch {
            return Err(VitError::shape(format!(
                "dropout got {} randomness keys for a batch of {}",
                keys.len(),
                batch
            )));
        }

        let per_example: usize = dims[1..].iter().product();
        let keep_scale = (1.0 / (1.0 - self.prob)) as f32;

        let mut mask = Vec::with_capacity(batch * per_example);
        for key in keys {
            let mut rng = key.rng();
            for _ in 0..per_example {
                let u: f64 = rng.gen();
                mask.push(if u < self.prob { 0.0f32 } else { keep_scale });
            }
        }

        let mask = Tensor::<B, D>::from_data(TensorData::new(mask, dims), &input.device());
        Ok(input * mask)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type TestBackend = NdArray;

    fn ones(batch: usize) -> Tensor<TestBackend, 3> {
        Tensor::ones([batch, 4, 16], &Default::default())
    }

    fn values(t: Tensor<TestBackend, 3>) -> Vec<f32> {
        t.into_data().to_vec::<f32>().unwrap()
    }

    #[test]
    fn test_rejects_invalid_probability() {
        assert!(SeededDropoutConfig::new(1.0).init().is_err());
        assert!(SeededDropoutConfig::new(-0.5).init().is_err());
    }

    #[test]
    fn test_eval_mode_is_identity() {
        let dropout = SeededDropoutConfig::new(0.5).init().unwrap();
        let input   = ones(2);
        // no keys needed when disabled
        let out = dropout.forward(input.clone(), &[], false).unwrap();
        assert_eq!(values(out), values(input));
    }

    #[test]
    fn test_train_mode_zeroes_and_rescales() {
        let dropout = SeededDropoutConfig::new(0.5).init().unwrap();
        let keys    = PrngKey::new(11).split(2);
        let out     = values(dropout.forward(ones(2), &keys, true).unwrap());

        assert!(out.iter().all(|&v| v == 0.0 || v == 2.0));
        let zeros = out.iter().filter(|&&v| v == 0.0).count();
        // 128 units at p=0.5: both extremes are vanishingly unlikely
        assert!(zeros > 20 && zeros < 108, "zeros = {zeros}");
    }

    #[test]
    fn test_same_keys_same_mask() {
        let dropout = SeededDropoutConfig::new(0.3).init().unwrap();
        let keys    = PrngKey::new(5).split(2);
        let a = values(dropout.forward(ones(2), &keys, true).unwrap());
        let b = values(dropout.forward(ones(2), &keys, true).unwrap());
        assert_eq!(a, b);

        let other = PrngKey::new(6).split(2);
        let c = values(dropout.forward(ones(2), &other, true).unwrap());
        assert_ne!(a, c);
    }

    #[test]
    fn test_mask_depends_only_on_own_key() {
        let dropout = SeededDropoutConfig::new(0.5).init().unwrap();
        let keys    = PrngKey::new(8).split(3);

        let batched = values(dropout.forward(ones(3), &keys, true).unwrap());
        let single  = values(dropout.forward(ones(1), &keys[1..2], true).unwrap());
        assert_eq!(&batched[64..128], single.as_slice());
    }

    #[test]
    fn test_key_count_must_match_batch() {
        let dropout = SeededDropoutConfig::new(0.1).init().unwrap();
        let keys    = PrngKey::new(1).split(1);
        let err     = dropout.forward(ones(2), &keys, true).unwrap_err();
        assert!(matches!(err, VitError::ShapeMismatch(_)));
    }
}

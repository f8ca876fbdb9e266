// ============================================================
// Layer 5 — ML / Model Layer (Burn)
// ============================================================
// All model, training and evaluation code lives here.
//
//   rng.rs             — PrngKey and its deterministic split
//   dropout.rs         — dropout driven by explicit keys
//   patch_embedding.rs — image → sequence of patch embeddings
//   attention_block.rs — pre-norm transformer encoder block
//   model.rs           — VisionTransformer: patches, class
//                        token, positions, blocks, head
//   trainer.rs         — AdamW training loop
//   evaluator.rs       — accuracy with dropout disabled
//
// Reference: Dosovitskiy et al. (2021) An Image is Worth
//            16x16 Words
//            Burn Book §3 (Building Blocks), §5 (Training)

/// Deterministic randomness keys
pub mod rng;

/// Key-driven dropout
pub mod dropout;

/// Patch extraction and projection
pub mod patch_embedding;

/// Transformer encoder block
pub mod attention_block;

/// Vision Transformer architecture
pub mod model;

/// Fixed-step training loop
pub mod trainer;

/// Test-set accuracy
pub mod evaluator;

// ============================================================
// Layer 3 — Core Traits (Abstractions)
// ============================================================
// The training pipeline only sees ImageSource; where the
// pixels come from is an implementation detail.
//
// Implementations:
//   - Cifar10Loader   → reads the CIFAR-10 binary batches
//   - SyntheticSource → generates labelled images from a seed
//
// Reference: Rust Book §10 (Traits: Defining Shared Behaviour)

use anyhow::Result;

use crate::domain::image::{ImageSample, Split};

// ─── ImageSource ──────────────────────────────────────────────────────────────
/// Any component that can supply labelled images for a split.
pub trait ImageSource {
    /// Load every sample of the requested split.
    fn load(&self, split: Split) -> Result<Vec<ImageSample>>;

    /// Number of distinct labels this source produces.
    fn num_classes(&self) -> usize;
}

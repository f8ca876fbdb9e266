// ============================================================
// Layer 5 — Randomness Keys
// ============================================================
// Dropout randomness is never drawn from a global generator.
// A PrngKey is split explicitly at every component boundary
// that needs independent randomness:
//
//   step key    → split(batch_size)     one key per example
//   example key → split(num_layers + 1) [embedding, block_0..]
//   block key   → split(2)              [ffn dropout 1, 2]
//
// The run seed itself is split once into [dropout root, augment
// key]; the batcher folds its batch counter into the augment key.
//
// Splitting is a pure function of (key, n), so a run seeded
// with the same root key replays the same dropout masks and
// the same crops and flips.

use rand::{rngs::StdRng, RngCore, SeedableRng};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PrngKey(u64);

impl PrngKey {
    pub fn new(seed: u64) -> Self {
        Self(seed)
    }

    /// Derive `n` independent sub-keys.
    pub fn split(&self, n: usize) -> Vec<PrngKey> {
        let mut rng = self.rng();
        (0..n).map(|_| PrngKey(rng.next_u64())).collect()
    }

    /// Split into exactly two keys, e.g. `let [next, step] = key.split2();`
    pub fn split2(&self) -> [PrngKey; 2] {
        let mut rng = self.rng();
        [PrngKey(rng.next_u64()), PrngKey(rng.next_u64())]
    }

    /// Derive the key for the `index`-th item of a stream, without
    /// materialising the `index - 1` keys before it.
    pub fn fold_in(&self, index: u64) -> PrngKey {
        let mixed = self.0.rotate_left(23) ^ index.wrapping_mul(0x9E37_79B9_7F4A_7C15);
        PrngKey(StdRng::seed_from_u64(mixed).next_u64())
    }

    /// A generator whose stream is fully determined by this key.
    pub fn rng(&self) -> StdRng {
        StdRng::seed_from_u64(self.0)
    }
}

/// Split every key in `keys` into `n` parts and regroup them
/// by part: `result[j][i]` is the j-th sub-key of `keys[i]`.
///
/// Used to turn one key per example into one key slice per
/// component, each slice still holding one key per example.
pub fn split_each(keys: &[PrngKey], n: usize) -> Vec<Vec<PrngKey>> {
    let mut parts: Vec<Vec<PrngKey>> = (0..n).map(|_| Vec::with_capacity(keys.len())).collect();
    for key in keys {
        for (part, sub) in parts.iter_mut().zip(key.split(n)) {
            part.push(sub);
        }
    }
    parts
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_is_reproducible() {
        let a = PrngKey::new(42).split(8);
        let b = PrngKey::new(42).split(8);
        assert_eq!(a, b);
    }

    #[test]
    fn test_split_keys_are_distinct() {
        let keys = PrngKey::new(7).split(64);
        let mut seeds: Vec<u64> = keys.iter().map(|k| k.0).collect();
        seeds.sort_unstable();
        seeds.dedup();
        assert_eq!(seeds.len(), 64);
        assert!(!keys.contains(&PrngKey::new(7)));
    }

    #[test]
    fn test_different_roots_diverge() {
        assert_ne!(PrngKey::new(1).split(4), PrngKey::new(2).split(4));
    }

    #[test]
    fn test_split2_matches_split_prefix() {
        let key = PrngKey::new(99);
        let [a, b] = key.split2();
        assert_eq!(vec![a, b], key.split(2));
    }

    #[test]
    fn test_fold_in_is_stable_and_distinct() {
        let key = PrngKey::new(5);
        assert_eq!(key.fold_in(3), key.fold_in(3));

        let folded: Vec<PrngKey> = (0..32).map(|i| key.fold_in(i)).collect();
        for (i, a) in folded.iter().enumerate() {
            assert!(folded[i + 1..].iter().all(|b| a != b));
        }
        assert_ne!(key.fold_in(0), PrngKey::new(6).fold_in(0));
    }

    #[test]
    fn test_split_each_regroups_by_part() {
        let keys = PrngKey::new(3).split(3);
        let parts = split_each(&keys, 4);
        assert_eq!(parts.len(), 4);
        for (i, key) in keys.iter().enumerate() {
            let subs = key.split(4);
            for j in 0..4 {
                assert_eq!(parts[j][i], subs[j]);
            }
        }
    }
}

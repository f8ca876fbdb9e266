// ============================================================
// Layer 6 — Infrastructure Layer
// ============================================================
// File-system side effects of a training run:
//
//   config_store.rs — TrainConfig to and from JSON
//   metrics.rs      — step loss CSV and evaluation JSON
//
// Reference: Rust Book §7 (Modules)
//            Rust Book §9 (Error Handling with anyhow)

/// TrainConfig persistence
pub mod config_store;

/// Training metrics CSV logger
pub mod metrics;

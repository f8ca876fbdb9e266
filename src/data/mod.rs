// ============================================================
// Layer 4 — Data Pipeline
// ============================================================
// Everything between raw pixels and tensor batches:
//
//   CIFAR-10 .bin files      SyntheticSource
//           │                       │
//           ▼                       ▼
//   Cifar10Loader ──► Vec<ImageSample> ◄── (ImageSource trait)
//                           │
//                           ▼
//   ImageDataset      → implements Burn's Dataset trait
//                           │
//                           ▼
//   ImageBatcher      → augment / resize / normalise, stack
//                           │
//                           ▼
//   DataLoader        → feeds batches to the training loop
//
// Reference: Burn Book §4 (Datasets and Dataloaders)

/// Reads the CIFAR-10 binary batches
pub mod cifar;

/// Seeded stand-in dataset for offline runs
pub mod synthetic;

/// Normalisation, random crop, flip and resize
pub mod transform;

/// Implements Burn's Dataset trait for image samples
pub mod dataset;

/// Implements Burn's Batcher trait to create tensor batches
pub mod batcher;

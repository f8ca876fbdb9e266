// ============================================================
// Layer 4 — CIFAR-10 Binary Loader
// ============================================================
// Reads the "binary version" of CIFAR-10 from a directory:
//
//   data_batch_1.bin .. data_batch_5.bin   → training split
//   test_batch.bin                         → test split
//
// Each file is a sequence of 3073-byte records:
//   [label: u8][1024 red][1024 green][1024 blue]
// with every colour plane stored row-major (32 rows of 32).
// That is already CHW order, so decoding is a byte → [0, 1]
// conversion.
//
// Downloading the archive is left to the user.
//
// Reference: https://www.cs.toronto.edu/~kriz/cifar.html

use anyhow::{bail, Context, Result};
use std::{fs, path::PathBuf};

use crate::domain::image::{Image, ImageSample, Split};
use crate::domain::traits::ImageSource;

pub const IMAGE_SIDE:   usize = 32;
pub const CHANNELS:     usize = 3;
pub const NUM_CLASSES:  usize = 10;
pub const RECORD_BYTES: usize = 1 + CHANNELS * IMAGE_SIDE * IMAGE_SIDE;

pub const TRAIN_FILES: [&str; 5] = [
    "data_batch_1.bin",
    "data_batch_2.bin",
    "data_batch_3.bin",
    "data_batch_4.bin",
    "data_batch_5.bin",
];
pub const TEST_FILES: [&str; 1] = ["test_batch.bin"];

pub const CLASS_NAMES: [&str; NUM_CLASSES] = [
    "airplane", "automobile", "bird", "cat", "deer",
    "dog", "frog", "horse", "ship", "truck",
];

pub struct Cifar10Loader {
    dir:   PathBuf,
    limit: Option<usize>,
}

impl Cifar10Loader {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into(), limit: None }
    }

    /// Keep at most `limit` samples per split (first records first).
    pub fn with_limit(mut self, limit: Option<usize>) -> Self {
        self.limit = limit;
        self
    }
}

impl ImageSource for Cifar10Loader {
    fn load(&self, split: Split) -> Result<Vec<ImageSample>> {
        let files: &[&str] = match split {
            Split::Train => &TRAIN_FILES,
            Split::Test  => &TEST_FILES,
        };

        let mut samples = Vec::new();
        for name in files {
            if self.limit.is_some_and(|limit| samples.len() >= limit) {
                break;
            }
            let path  = self.dir.join(name);
            let bytes = fs::read(&path).with_context(|| {
                format!(
                    "Cannot read '{}'. Extract cifar-10-binary.tar.gz into '{}'",
                    path.display(),
                    self.dir.display()
                )
            })?;
            let decoded = decode_records(&bytes)
                .with_context(|| format!("Malformed CIFAR-10 file '{}'", path.display()))?;
            tracing::debug!("Read {} records from '{}'", decoded.len(), path.display());
            samples.extend(decoded);
        }

        if let Some(limit) = self.limit {
            samples.truncate(limit);
        }
        tracing::info!("Loaded {} CIFAR-10 {:?} samples", samples.len(), split);
        Ok(samples)
    }

    fn num_classes(&self) -> usize {
        NUM_CLASSES
    }
}

/// Decode a buffer of concatenated CIFAR-10 records.
pub fn decode_records(bytes: &[u8]) -> Result<Vec<ImageSample>> {
    if bytes.len() % RECORD_BYTES != 0 {
        bail!(
            "length {} is not a multiple of the {}-byte record size",
            bytes.len(),
            RECORD_BYTES
        );
    }

    bytes
        .chunks_exact(RECORD_BYTES)
        .enumerate()
        .map(|(i, record)| {
            let label = record[0] as usize;
            if label >= NUM_CLASSES {
                bail!("record {i} has label {label}, expected < {NUM_CLASSES}");
            }
            let data  = record[1..].iter().map(|&b| b as f32 / 255.0).collect();
            let image = Image { channels: CHANNELS, height: IMAGE_SIDE, width: IMAGE_SIDE, data };
            Ok(ImageSample::new(image, label))
        })
        .collect()
}

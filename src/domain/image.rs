// ============================================================
// Layer 3 — Image Domain Types
// ============================================================
// An Image is a dense CHW buffer of f32 values in [0, 1].
// Channel-major layout matches the tensor layout the model
// consumes ([channels, height, width]), so batching is a
// straight concatenation of buffers.
//
// Reference: Rust Book §5 (Structs and Methods)

use serde::{Deserialize, Serialize};

/// Which half of a dataset to load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Split {
    Train,
    Test,
}

/// A single image stored channel-major: `data[c * H * W + y * W + x]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Image {
    pub channels: usize,
    pub height:   usize,
    pub width:    usize,
    pub data:     Vec<f32>,
}

impl Image {
    /// Build an image, returning None when the buffer length
    /// does not equal channels * height * width.
    pub fn new(channels: usize, height: usize, width: usize, data: Vec<f32>) -> Option<Self> {
        if data.len() != channels * height * width {
            return None;
        }
        Some(Self { channels, height, width, data })
    }

    /// An all-zero (black) image.
    pub fn zeros(channels: usize, height: usize, width: usize) -> Self {
        Self { channels, height, width, data: vec![0.0; channels * height * width] }
    }

    #[inline]
    pub fn index(&self, c: usize, y: usize, x: usize) -> usize {
        (c * self.height + y) * self.width + x
    }

    #[inline]
    pub fn get(&self, c: usize, y: usize, x: usize) -> f32 {
        self.data[self.index(c, y, x)]
    }

    #[inline]
    pub fn set(&mut self, c: usize, y: usize, x: usize, value: f32) {
        let i = self.index(c, y, x);
        self.data[i] = value;
    }

    pub fn shape(&self) -> [usize; 3] {
        [self.channels, self.height, self.width]
    }
}

/// One labelled example: an image and its class index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageSample {
    pub image: Image,
    pub label: usize,
}

impl ImageSample {
    pub fn new(image: Image, label: usize) -> Self {
        Self { image, label }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_wrong_buffer_length() {
        assert!(Image::new(3, 2, 2, vec![0.0; 11]).is_none());
        assert!(Image::new(3, 2, 2, vec![0.0; 12]).is_some());
    }

    #[test]
    fn test_channel_major_indexing() {
        let data: Vec<f32> = (0..12).map(|v| v as f32).collect();
        let img = Image::new(3, 2, 2, data).unwrap();
        // channel 1 starts after the 4 values of channel 0
        assert_eq!(img.get(1, 0, 0), 4.0);
        assert_eq!(img.get(2, 1, 1), 11.0);
        assert_eq!(img.shape(), [3, 2, 2]);
    }
}

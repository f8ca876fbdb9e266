#![recursion_limit = "256"]

//! Vision Transformer image classification on CIFAR-10, built on burn.
//!
//! Layers, outermost first:
//!
//! - [`cli`]: argument parsing and printing
//! - [`application`]: train / inspect workflows
//! - [`domain`]: images, the `ImageSource` trait, model errors
//! - [`data`]: CIFAR-10 reader, transforms, Dataset and Batcher
//! - [`ml`]: patch embedding, transformer blocks, the model, training
//! - [`infra`]: config and metrics files

pub mod application;
pub mod cli;
pub mod data;
pub mod domain;
pub mod infra;
pub mod ml;

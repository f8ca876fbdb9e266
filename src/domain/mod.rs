// ============================================================
// Layer 3 — Domain Layer
// ============================================================
// Plain Rust types shared by every other layer:
//
//   image.rs  — an image in CHW layout plus its class label
//   traits.rs — the ImageSource abstraction implemented by
//               the CIFAR-10 reader and the synthetic source
//   error.rs  — typed configuration / shape errors raised
//               while building or running the model
//
// Rules for this layer:
//   - NO Burn framework types allowed here
//   - NO file I/O
//   - Only plain Rust structs, enums, and traits
//
// Reference: Rust Book §5 (Structs), §10 (Traits)

// A decoded image and its label
pub mod image;

// Core abstractions (traits) that other layers implement
pub mod traits;

// Shape and configuration errors
pub mod error;

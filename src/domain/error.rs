// ============================================================
// Layer 3 — Model Errors
// ============================================================
// Every error here is a configuration or programming defect.
// None of them are retried: they surface immediately through
// `?` and end up wrapped in an anyhow::Error by the caller.

use thiserror::Error;

/// Result alias for model construction and forward passes.
pub type VitResult<T> = std::result::Result<T, VitError>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VitError {
    /// A tensor or configured dimension does not line up,
    /// e.g. image side not divisible by the patch size.
    #[error("shape mismatch: {0}")]
    ShapeMismatch(String),

    /// A hyperparameter is outside its valid range.
    #[error("configuration error: {0}")]
    Configuration(String),
}

impl VitError {
    pub fn shape(msg: impl Into<String>) -> Self {
        Self::ShapeMismatch(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }
}

/// Fail with a ConfigurationError when `value` is zero.
pub fn ensure_positive(name: &str, value: usize) -> VitResult<()> {
    if value == 0 {
        return Err(VitError::config(format!("{name} must be positive, got 0")));
    }
    Ok(())
}

/// Fail with a ConfigurationError unless `prob` lies in [0, 1).
pub fn ensure_probability(name: &str, prob: f64) -> VitResult<()> {
    if !(0.0..1.0).contains(&prob) {
        return Err(VitError::config(format!("{name} must lie in [0, 1), got {prob}")));
    }
    Ok(())
}

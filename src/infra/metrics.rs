// ============================================================
// Layer 6 — Metrics Logger
// ============================================================
// Records the training curve to a CSV file and the final
// evaluation to JSON, inside the run directory.
//
// Output files:
//   <run_dir>/metrics.csv  — one row per reported step
//   <run_dir>/eval.json    — accuracy on the test split
//
// Why two formats?
//   - The loss curve grows one row at a time while training
//     runs, so it is appended to a CSV that can be tailed or
//     plotted mid-run
//   - The evaluation is written once at the end and read back
//     by scripts comparing runs, so it is a single JSON object
//
// Example CSV output:
//   step,loss
//   100,2.104512
//   200,1.873390
//
// How to read the curve:
//   - Ten balanced classes start near ln(10) ≈ 2.30
//   - Reported losses are single batches under dropout and
//     augmentation, so expect noise; look at the trend
//   - Test mean_loss far above the last training losses while
//     accuracy stalls points at overfitting
//
// Reference: Rust Book §9 (Error Handling)
//            Rust Book §12 (I/O and File Handling)

use anyhow::{Context, Result};
use std::{
    fs::{self, OpenOptions},
    io::Write,
    path::{Path, PathBuf},
};
use serde::{Deserialize, Serialize};

/// One reported training step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepMetrics {
    /// 1-based optimizer step index
    pub step: usize,

    /// Mean cross-entropy of the batch consumed at this step
    pub loss: f64,
}

impl StepMetrics {
    pub fn new(step: usize, loss: f64) -> Self {
        Self { step, loss }
    }
}

/// Result of one pass over the evaluation split.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvalMetrics {
    /// Images whose arg-max prediction equals the label
    pub correct:      usize,

    /// Images evaluated (the whole test split)
    pub total:        usize,

    /// Percentage in [0, 100]; 0 when nothing was evaluated
    pub accuracy_pct: f64,

    /// Cross-entropy averaged over batches; NaN when there were none
    pub mean_loss:    f64,
}

impl EvalMetrics {
    pub fn new(correct: usize, total: usize, mean_loss: f64) -> Self {
        let accuracy_pct = if total > 0 {
            correct as f64 * 100.0 / total as f64
        } else {
            0.0
        };
        Self { correct, total, accuracy_pct, mean_loss }
    }
}

/// Appends step metrics to `metrics.csv` and writes `eval.json`.
pub struct MetricsLogger {
    dir:      PathBuf,
    csv_path: PathBuf,
}

impl MetricsLogger {
    /// Create the run directory if needed and write the CSV
    /// header when the file does not exist yet.
    pub fn new(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)
            .with_context(|| format!("Cannot create run directory '{}'", dir.display()))?;

        let csv_path = dir.join("metrics.csv");
        if !csv_path.exists() {
            let mut f = fs::File::create(&csv_path)?;
            writeln!(f, "step,loss")?;
            tracing::debug!("Created metrics CSV: '{}'", csv_path.display());
        }

        Ok(Self { dir, csv_path })
    }

    /// Append one row to the CSV.
    pub fn log(&self, m: &StepMetrics) -> Result<()> {
        let mut f = OpenOptions::new()
            .append(true)
            .open(&self.csv_path)
            .with_context(|| format!("Cannot open '{}'", self.csv_path.display()))?;

        writeln!(f, "{},{:.6}", m.step, m.loss)?;
        tracing::debug!("Logged step {} loss={:.4}", m.step, m.loss);
        Ok(())
    }

    /// Write the evaluation summary as pretty JSON.
    pub fn write_eval(&self, m: &EvalMetrics) -> Result<()> {
        let path = self.dir.join("eval.json");
        fs::write(&path, serde_json::to_string_pretty(m)?)
            .with_context(|| format!("Cannot write '{}'", path.display()))?;
        Ok(())
    }

    pub fn csv_path(&self) -> &Path {
        &self.csv_path
    }
}

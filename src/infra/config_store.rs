// ============================================================
// Layer 6 — Config Store
// ============================================================
// Reads and writes TrainConfig as JSON.
//
//   save → <run_dir>/train_config.json  (the resolved config
//          of a run, whatever mix of flags produced it)
//   load → any JSON file passed with `train --config <path>`
//
// Reference: Rust Book §9 (Error Handling)

use anyhow::{Context, Result};
use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::application::train_use_case::TrainConfig;

pub const CONFIG_FILE: &str = "train_config.json";

pub struct ConfigStore {
    dir: PathBuf,
}

impl ConfigStore {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self { dir: dir.as_ref().to_path_buf() }
    }

    /// Write `cfg` to `<dir>/train_config.json`, creating the directory.
    pub fn save(&self, cfg: &TrainConfig) -> Result<PathBuf> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("Cannot create '{}'", self.dir.display()))?;

        let path = self.dir.join(CONFIG_FILE);
        let json = serde_json::to_string_pretty(cfg)?;
        fs::write(&path, json)
            .with_context(|| format!("Cannot write config to '{}'", path.display()))?;

        tracing::debug!("Saved training config to '{}'", path.display());
        Ok(path)
    }

    /// Read a TrainConfig from an explicit JSON file.
    pub fn load_file(path: impl AsRef<Path>) -> Result<TrainConfig> {
        let path = path.as_ref();
        let json = fs::read_to_string(path)
            .with_context(|| format!("Cannot read config from '{}'", path.display()))?;
        serde_json::from_str(&json)
            .with_context(|| format!("Invalid config JSON in '{}'", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_save_then_load() {
        let dir   = tempfile::tempdir().unwrap();
        let store = ConfigStore::new(dir.path().join("run"));

        let cfg = TrainConfig { num_steps: 7, embed_dim: 64, ..TrainConfig::default() };
        let path = store.save(&cfg).unwrap();
        assert!(path.ends_with(CONFIG_FILE));

        let back = ConfigStore::load_file(&path).unwrap();
        assert_eq!(back.num_steps, 7);
        assert_eq!(back.embed_dim, 64);
    }

    #[test]
    fn test_missing_file_has_context() {
        let err = ConfigStore::load_file("/definitely/not/here.json").unwrap_err();
        assert!(err.to_string().contains("Cannot read config"));
    }
}

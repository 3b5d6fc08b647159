// src/config.rs

use crate::classifier::transformer::DEFAULT_MAX_TOKENS;
use crate::error::{Error, Result};
use crate::window::WindowParams;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_FILE: &str = "ku-detect.toml";

/// Settings for a detection run, read from `ku-detect.toml` and then
/// overridden by command line flags.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub window: WindowParams,
    /// Directory holding one sub-directory per concept model
    pub models_dir: PathBuf,
    /// Concepts to load; empty loads every concept found
    pub models_to_load: Vec<String>,
    pub file_extension: String,
    /// Scan worker threads, 0 = one per core
    pub threads: usize,
    /// When set, scan with this multi-label transformer instead of the
    /// per-concept models in `models_dir`
    pub transformer: Option<TransformerConfig>,
}

/// `[transformer]` table: a directory with `tokenizer.json` and `model.onnx`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransformerConfig {
    pub dir: PathBuf,
    pub concepts: usize,
    /// Longer inputs are truncated
    pub max_tokens: usize,
}

impl Default for TransformerConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("models").join("codebert"),
            concepts: 27,
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            window: WindowParams::default(),
            models_dir: PathBuf::from("models").join("binary_classifiers"),
            models_to_load: Vec::new(),
            file_extension: "java".to_string(),
            threads: 0,
            transformer: None,
        }
    }
}

impl Config {
    pub fn from_toml_str(content: &str, path: &Path) -> Result<Self> {
        toml::from_str(content).map_err(|source| Error::Config {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_toml_str(&content, path)
    }

    /// An explicit path must exist. Without one, `ku-detect.toml` in the
    /// working directory is used when present, defaults otherwise.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => {
                let fallback = Path::new(DEFAULT_CONFIG_FILE);
                if fallback.is_file() {
                    Self::load(fallback)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }
}

// src/error.rs

use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by the detection engine and its collaborators.
///
/// Only configuration problems stop a scan. Anything that goes wrong inside a
/// single window is absorbed by the classifier adapters.
#[derive(Error, Debug)]
pub enum Error {
    #[error("invalid window parameters: {0}")]
    InvalidWindowParams(String),

    #[error("classifier `{name}` is misconfigured: {reason}")]
    InvalidClassifier { name: String, reason: String },

    #[error("classifier `{0}` was supplied more than once")]
    DuplicateClassifier(String),

    #[error("no classifiers could be loaded from {}", .0.display())]
    NoClassifiers(PathBuf),

    #[error("inference failed: {0}")]
    Inference(String),

    #[error("failed to load model artifact {}: {reason}", .path.display())]
    Artifact { path: PathBuf, reason: String },

    #[error("invalid config file {}: {source}", .path.display())]
    Config {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("failed to build worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    #[error(transparent)]
    Git(#[from] git2::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl Error {
    pub fn invalid_classifier(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidClassifier {
            name: name.into(),
            reason: reason.into(),
        }
    }

    pub fn inference(msg: impl Into<String>) -> Self {
        Self::Inference(msg.into())
    }

    pub fn artifact(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::Artifact {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

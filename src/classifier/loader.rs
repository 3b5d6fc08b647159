// src/classifier/loader.rs

//! Discovers per-concept classifiers on disk.
//!
//! Layout, one directory per concept:
//!
//! ```text
//! models/
//!   K2/
//!     K2_vectorizer.json
//!     K2_selector.json
//!     K2_model.json
//! ```
//!
//! A transformer export instead covers many concepts at once, see
//! [`load_transformer`].

use super::onnx::{HfTokenEncoder, OnnxSequenceModel, MODEL_FILE, TOKENIZER_FILE};
use super::transformer::TransformerClassifier;
use super::vectorizer::{IndexSelector, LinearModel, NgramVectorizer, VectorizerClassifier};
use super::Classifier;
use crate::error::{Error, Result};
use crate::normalize::Normalizer;
use serde::de::DeserializeOwned;
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Classifiers that loaded, and why the others did not.
#[derive(Debug, Default)]
pub struct LoadedClassifiers {
    pub classifiers: Vec<Classifier>,
    pub skipped: BTreeMap<String, String>,
}

/// Loads every concept directory under `dir`, or only those named in `only`
/// when it is non-empty. Incomplete or unreadable concepts are skipped and
/// reported; only an unreadable `dir` is an error.
pub fn load_classifiers_from_dir(
    dir: &Path,
    only: &[String],
    normalizer: Arc<dyn Normalizer>,
) -> Result<LoadedClassifiers> {
    let mut subdirs: Vec<(String, PathBuf)> = fs::read_dir(dir)?
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.path().is_dir())
        .filter_map(|entry| {
            let name = entry.file_name().to_str()?.to_string();
            Some((name, entry.path()))
        })
        .filter(|(name, _)| only.is_empty() || only.contains(name))
        .collect();
    subdirs.sort();

    let mut loaded = LoadedClassifiers::default();
    for (name, path) in &subdirs {
        match load_concept(name, path, Arc::clone(&normalizer)) {
            Ok(classifier) => {
                log::info!("Loaded {name} model");
                loaded.classifiers.push(classifier);
            }
            Err(e) => {
                log::warn!("Skipping {name}: {e}");
                loaded.skipped.insert(name.clone(), e.to_string());
            }
        }
    }

    for wanted in only {
        if !subdirs.iter().any(|(name, _)| name == wanted) {
            log::warn!("Skipping {wanted}: not found in {}", dir.display());
            loaded
                .skipped
                .insert(wanted.clone(), "not found in models directory".to_string());
        }
    }

    Ok(loaded)
}

pub const TRANSFORMER_NAME: &str = "codebert";

/// Loads a multi-label transformer from `dir/tokenizer.json` and
/// `dir/model.onnx`, reporting concepts `K1..=K<concept_count>`.
pub fn load_transformer(
    dir: &Path,
    concept_count: usize,
    max_tokens: usize,
    normalizer: Arc<dyn Normalizer>,
) -> Result<Classifier> {
    if concept_count == 0 {
        return Err(Error::invalid_classifier(TRANSFORMER_NAME, "concept count must be > 0"));
    }
    let tokenizer_path = dir.join(TOKENIZER_FILE);
    let model_path = dir.join(MODEL_FILE);
    for path in [&tokenizer_path, &model_path] {
        if !path.is_file() {
            return Err(Error::artifact(path, "file not found"));
        }
    }

    let encoder = HfTokenEncoder::from_file(&tokenizer_path, max_tokens)?;
    let model = OnnxSequenceModel::from_file(&model_path)?;
    log::info!(
        "Loaded {TRANSFORMER_NAME} with {concept_count} concepts from {}",
        dir.display()
    );

    Ok(Classifier::multi(
        TransformerClassifier::with_numbered_concepts(
            TRANSFORMER_NAME,
            concept_count,
            normalizer,
            Box::new(encoder),
            Box::new(model),
        )
        .max_tokens(max_tokens),
    ))
}

fn load_concept(name: &str, dir: &Path, normalizer: Arc<dyn Normalizer>) -> Result<Classifier> {
    let vectorizer_path = find_artifact(dir, |f| f.starts_with(&format!("{name}_vectorizer")))
        .ok_or_else(|| Error::artifact(dir, "vectorizer not found"))?;
    let selector_path = find_artifact(dir, |f| f.starts_with(&format!("{name}_selector")))
        .ok_or_else(|| Error::artifact(dir, "selector not found"))?;
    let model_path = find_artifact(dir, |f| f.ends_with("model.json"))
        .ok_or_else(|| Error::artifact(dir, "no suitable model found"))?;

    let vectorizer: NgramVectorizer = read_json(&vectorizer_path)?;
    vectorizer
        .validate()
        .map_err(|reason| Error::artifact(&vectorizer_path, reason))?;
    let selector: IndexSelector = read_json(&selector_path)?;
    let model: LinearModel = read_json(&model_path)?;

    Ok(Classifier::single(VectorizerClassifier::new(
        name,
        normalizer,
        Box::new(vectorizer),
        Box::new(selector),
        model.into_backend(),
    )))
}

fn find_artifact(dir: &Path, matches: impl Fn(&str) -> bool) -> Option<PathBuf> {
    let mut candidates: Vec<PathBuf> = fs::read_dir(dir)
        .ok()?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| {
            path.file_name()
                .and_then(|f| f.to_str())
                .is_some_and(|f| f.ends_with(".json") && matches(f))
        })
        .collect();
    candidates.sort();
    candidates.into_iter().next()
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let file = File::open(path)?;
    serde_json::from_reader(BufReader::new(file))
        .map_err(|e| Error::artifact(path, e.to_string()))
}

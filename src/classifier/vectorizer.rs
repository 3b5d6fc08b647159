// src/classifier/vectorizer.rs

//! Single-label classifiers built from a fitted feature extractor, a fitted
//! feature selector and a backend that maps the selected features to a label.
//!
//! The three stages are traits so that any trained artifact can be plugged
//! in. The JSON-backed implementations below are what the model loader reads
//! from disk.

use super::{above_threshold, sigmoid, BinaryClassifier, OutputKind, Prediction};
use crate::error::{Error, Result};
use crate::normalize::Normalizer;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

pub trait FeatureExtractor: Send + Sync {
    fn transform(&self, document: &str) -> Result<Vec<f32>>;
}

pub trait FeatureSelector: Send + Sync {
    fn transform(&self, features: &[f32]) -> Result<Vec<f32>>;
}

pub trait DiscreteBackend: Send + Sync {
    fn predict_label(&self, features: &[f32]) -> Result<i64>;
}

pub trait ProbabilityBackend: Send + Sync {
    fn predict_probability(&self, features: &[f32]) -> Result<f32>;
}

pub enum Backend {
    Discrete(Box<dyn DiscreteBackend>),
    Probability(Box<dyn ProbabilityBackend>),
}

impl Backend {
    pub fn kind(&self) -> OutputKind {
        match self {
            Backend::Discrete(_) => OutputKind::Discrete,
            Backend::Probability(_) => OutputKind::Probability,
        }
    }

    fn decide(&self, features: &[f32]) -> Result<Prediction> {
        match self {
            Backend::Discrete(model) => Ok(match model.predict_label(features)? {
                1 => Prediction::Positive,
                0 => Prediction::Negative,
                _ => Prediction::Abstain,
            }),
            Backend::Probability(model) => {
                Ok(above_threshold(model.predict_probability(features)?).into())
            }
        }
    }
}

pub struct VectorizerClassifier {
    name: String,
    normalizer: Arc<dyn Normalizer>,
    extractor: Box<dyn FeatureExtractor>,
    selector: Box<dyn FeatureSelector>,
    backend: Backend,
}

impl VectorizerClassifier {
    pub fn new(
        name: impl Into<String>,
        normalizer: Arc<dyn Normalizer>,
        extractor: Box<dyn FeatureExtractor>,
        selector: Box<dyn FeatureSelector>,
        backend: Backend,
    ) -> Self {
        Self {
            name: name.into(),
            normalizer,
            extractor,
            selector,
            backend,
        }
    }

    fn try_predict(&self, window: &[String]) -> Result<Prediction> {
        let text = self.normalizer.canonicalize(&window.join("\n"));
        let tokens = self.normalizer.tokenize(&text);
        if tokens.is_empty() {
            return Ok(Prediction::Negative);
        }

        let features = self.extractor.transform(&tokens.join(" "))?;
        let selected = self.selector.transform(&features)?;
        self.backend.decide(&selected)
    }
}

impl BinaryClassifier for VectorizerClassifier {
    fn name(&self) -> &str {
        &self.name
    }

    fn output_kind(&self) -> OutputKind {
        self.backend.kind()
    }

    fn predict(&self, window: &[String]) -> Prediction {
        match self.try_predict(window) {
            Ok(prediction) => prediction,
            Err(e) => {
                log::debug!("{}: window treated as negative: {e}", self.name);
                Prediction::Negative
            }
        }
    }
}

fn default_ngram_range() -> (usize, usize) {
    (1, 1)
}

/// Bag of word n-grams over space-separated tokens, optionally idf-weighted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NgramVectorizer {
    pub vocabulary: HashMap<String, usize>,
    #[serde(default = "default_ngram_range")]
    pub ngram_range: (usize, usize),
    #[serde(default)]
    pub lowercase: bool,
    #[serde(default)]
    pub idf: Option<Vec<f32>>,
    #[serde(default)]
    pub l2_normalize: bool,
}

impl NgramVectorizer {
    pub fn width(&self) -> usize {
        match &self.idf {
            Some(idf) => idf.len(),
            None => self.vocabulary.values().max().map_or(0, |max| max + 1),
        }
    }

    pub fn validate(&self) -> std::result::Result<(), String> {
        let (low, high) = self.ngram_range;
        if low == 0 || low > high {
            return Err(format!("invalid ngram_range ({low}, {high})"));
        }
        let width = self.width();
        if let Some((term, index)) = self.vocabulary.iter().find(|(_, &i)| i >= width) {
            return Err(format!("term `{term}` maps to {index}, beyond width {width}"));
        }
        Ok(())
    }
}

impl FeatureExtractor for NgramVectorizer {
    fn transform(&self, document: &str) -> Result<Vec<f32>> {
        let tokens: Vec<String> = document
            .split_whitespace()
            .map(|t| if self.lowercase { t.to_lowercase() } else { t.to_string() })
            .collect();

        let mut features = vec![0.0f32; self.width()];
        let (low, high) = self.ngram_range;
        for n in low..=high.min(tokens.len()) {
            for gram in tokens.windows(n) {
                if let Some(&index) = self.vocabulary.get(&gram.join(" ")) {
                    if let Some(slot) = features.get_mut(index) {
                        *slot += 1.0;
                    }
                }
            }
        }

        if let Some(idf) = &self.idf {
            for (value, weight) in features.iter_mut().zip(idf) {
                *value *= weight;
            }
        }
        if self.l2_normalize {
            let norm = features.iter().map(|v| v * v).sum::<f32>().sqrt();
            if norm > 0.0 {
                features.iter_mut().for_each(|v| *v /= norm);
            }
        }
        Ok(features)
    }
}

/// Keeps the feature columns a fitted selector retained, in order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexSelector {
    pub support: Vec<usize>,
}

impl FeatureSelector for IndexSelector {
    fn transform(&self, features: &[f32]) -> Result<Vec<f32>> {
        self.support
            .iter()
            .map(|&i| {
                features.get(i).copied().ok_or_else(|| {
                    Error::inference(format!(
                        "selector wants column {i}, extractor produced {}",
                        features.len()
                    ))
                })
            })
            .collect()
    }
}

/// Linear decision function `w·x + b`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinearModel {
    pub weights: Vec<f32>,
    #[serde(default)]
    pub bias: f32,
    pub output: OutputKind,
}

impl LinearModel {
    fn score(&self, features: &[f32]) -> Result<f32> {
        if features.len() != self.weights.len() {
            return Err(Error::inference(format!(
                "model expects {} features, got {}",
                self.weights.len(),
                features.len()
            )));
        }
        Ok(self
            .weights
            .iter()
            .zip(features)
            .map(|(w, x)| w * x)
            .sum::<f32>()
            + self.bias)
    }

    pub fn into_backend(self) -> Backend {
        match self.output {
            OutputKind::Discrete => Backend::Discrete(Box::new(self)),
            OutputKind::Probability => Backend::Probability(Box::new(self)),
        }
    }
}

impl DiscreteBackend for LinearModel {
    fn predict_label(&self, features: &[f32]) -> Result<i64> {
        Ok(i64::from(self.score(features)? > 0.0))
    }
}

impl ProbabilityBackend for LinearModel {
    fn predict_probability(&self, features: &[f32]) -> Result<f32> {
        Ok(sigmoid(self.score(features)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::JavaNormalizer;

    fn vocab(terms: &[&str]) -> HashMap<String, usize> {
        terms
            .iter()
            .enumerate()
            .map(|(i, t)| (t.to_string(), i))
            .collect()
    }

    fn classifier(output: OutputKind, weights: Vec<f32>, bias: f32) -> VectorizerClassifier {
        let extractor = NgramVectorizer {
            vocabulary: vocab(&["synchronized", "Thread", "new Thread"]),
            ngram_range: (1, 2),
            lowercase: false,
            idf: None,
            l2_normalize: false,
        };
        let selector = IndexSelector { support: vec![0, 2] };
        let model = LinearModel {
            weights,
            bias,
            output,
        };
        VectorizerClassifier::new(
            "K9",
            Arc::new(JavaNormalizer),
            Box::new(extractor),
            Box::new(selector),
            model.into_backend(),
        )
    }

    fn lines(text: &[&str]) -> Vec<String> {
        text.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn bigrams_are_counted() {
        let extractor = NgramVectorizer {
            vocabulary: vocab(&["new", "new Thread"]),
            ngram_range: (1, 2),
            lowercase: false,
            idf: None,
            l2_normalize: false,
        };
        let features = extractor.transform("t = new Thread new").unwrap();
        assert_eq!(features, vec![2.0, 1.0]);
    }

    #[test]
    fn probability_backend_thresholds_at_half() {
        let c = classifier(OutputKind::Probability, vec![1.0, 1.0], -1.5);
        assert_eq!(c.predict(&lines(&["Thread t = new Thread();"])), Prediction::Negative);
        assert_eq!(
            c.predict(&lines(&["synchronized (this) {", "Thread t = new Thread();"])),
            Prediction::Positive
        );
    }

    #[test]
    fn discrete_backend_uses_label() {
        let c = classifier(OutputKind::Discrete, vec![1.0, 0.0], -0.5);
        assert_eq!(c.output_kind(), OutputKind::Discrete);
        assert_eq!(c.predict(&lines(&["synchronized void run()"])), Prediction::Positive);
        assert_eq!(c.predict(&lines(&["void run()"])), Prediction::Negative);
    }

    #[test]
    fn degenerate_window_is_negative() {
        let c = classifier(OutputKind::Probability, vec![0.0, 0.0], 10.0);
        assert_eq!(c.predict(&lines(&["   ", "// ;"])), Prediction::Negative);
        assert_eq!(c.predict(&[]), Prediction::Negative);
    }

    #[test]
    fn shape_mismatch_is_negative_not_error() {
        let c = classifier(OutputKind::Probability, vec![1.0], 10.0);
        assert_eq!(c.predict(&lines(&["synchronized"])), Prediction::Negative);
    }

    #[test]
    fn vectorizer_validation_catches_bad_indices() {
        let extractor = NgramVectorizer {
            vocabulary: vocab(&["a", "b"]),
            ngram_range: (1, 1),
            lowercase: false,
            idf: Some(vec![1.0]),
            l2_normalize: false,
        };
        assert!(extractor.validate().is_err());
    }
}

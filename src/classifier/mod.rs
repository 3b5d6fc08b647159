// src/classifier/mod.rs

//! Classifier contract shared by every model backend.
//!
//! A classifier is either single-label (one concept, named after the
//! classifier) or multi-label (a fixed, ordered list of concepts). Both only
//! ever see the lines of one window and must not fail: adapters turn every
//! inference problem into a non-positive answer.

pub mod loader;
pub mod onnx;
pub mod transformer;
pub mod vectorizer;

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

pub use loader::{load_classifiers_from_dir, load_transformer, LoadedClassifiers};
pub use transformer::{SequenceModel, TokenEncoder, TransformerClassifier};
pub use vectorizer::VectorizerClassifier;

/// Answer of a single-label classifier for one window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Prediction {
    Positive,
    Negative,
    /// The backend produced no usable decision. Never counts as positive.
    Abstain,
}

impl Prediction {
    pub fn is_positive(self) -> bool {
        self == Prediction::Positive
    }
}

impl From<bool> for Prediction {
    fn from(value: bool) -> Self {
        if value {
            Prediction::Positive
        } else {
            Prediction::Negative
        }
    }
}

/// How a backend reports its decision
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputKind {
    /// Emits a class label directly
    Discrete,
    /// Emits a probability that is thresholded at 0.5
    Probability,
}

pub const DECISION_THRESHOLD: f32 = 0.5;

pub trait BinaryClassifier: Send + Sync {
    fn name(&self) -> &str;

    fn output_kind(&self) -> OutputKind;

    fn predict(&self, window: &[String]) -> Prediction;
}

pub trait MultiLabelClassifier: Send + Sync {
    fn name(&self) -> &str;

    /// Ordered concept names; `predict` returns one flag per entry.
    fn concepts(&self) -> &[String];

    fn predict(&self, window: &[String]) -> Vec<bool>;
}

/// A loaded classifier, tagged by the shape of its output.
#[derive(Clone)]
pub enum Classifier {
    SingleLabel(Arc<dyn BinaryClassifier>),
    MultiLabel(Arc<dyn MultiLabelClassifier>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassifierKind {
    SingleLabel,
    MultiLabel,
}

impl Classifier {
    pub fn single(classifier: impl BinaryClassifier + 'static) -> Self {
        Classifier::SingleLabel(Arc::new(classifier))
    }

    pub fn multi(classifier: impl MultiLabelClassifier + 'static) -> Self {
        Classifier::MultiLabel(Arc::new(classifier))
    }

    pub fn name(&self) -> &str {
        match self {
            Classifier::SingleLabel(c) => c.name(),
            Classifier::MultiLabel(c) => c.name(),
        }
    }

    pub fn kind(&self) -> ClassifierKind {
        match self {
            Classifier::SingleLabel(_) => ClassifierKind::SingleLabel,
            Classifier::MultiLabel(_) => ClassifierKind::MultiLabel,
        }
    }

    /// Concept keys this classifier writes into file records.
    pub fn concept_names(&self) -> Vec<String> {
        match self {
            Classifier::SingleLabel(c) => vec![c.name().to_string()],
            Classifier::MultiLabel(c) => c.concepts().to_vec(),
        }
    }

    /// Checks the loading contract before any scanning starts.
    pub fn validate(&self) -> Result<()> {
        if self.name().trim().is_empty() {
            return Err(Error::invalid_classifier("<unnamed>", "name is empty"));
        }
        if let Classifier::MultiLabel(c) = self {
            let concepts = c.concepts();
            if concepts.is_empty() {
                return Err(Error::invalid_classifier(c.name(), "declares no concepts"));
            }
            let mut seen = HashSet::new();
            for concept in concepts {
                if !seen.insert(concept.as_str()) {
                    return Err(Error::invalid_classifier(
                        c.name(),
                        format!("concept `{concept}` is declared twice"),
                    ));
                }
            }
        }
        Ok(())
    }
}

impl fmt::Debug for Classifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Classifier")
            .field("name", &self.name())
            .field("kind", &self.kind())
            .finish()
    }
}

impl fmt::Display for Classifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

pub(crate) fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}

/// NaN never crosses the threshold.
pub(crate) fn above_threshold(probability: f32) -> bool {
    probability > DECISION_THRESHOLD
}

/// Numbered concept names `K1..=Kn`, the naming multi-label models ship with.
pub fn numbered_concepts(count: usize) -> Vec<String> {
    (1..=count).map(|i| format!("K{i}")).collect()
}

// src/classifier/transformer.rs

use super::{above_threshold, numbered_concepts, sigmoid, MultiLabelClassifier};
use crate::error::{Error, Result};
use crate::normalize::Normalizer;
use std::sync::Arc;

pub const DEFAULT_MAX_TOKENS: usize = 512;

/// Model-specific tokenizer producing input ids.
pub trait TokenEncoder: Send + Sync {
    fn encode(&self, text: &str) -> Result<Vec<u32>>;
}

/// Forward pass of a sequence classification model, one logit per concept.
pub trait SequenceModel: Send + Sync {
    fn forward(&self, input_ids: &[u32]) -> Result<Vec<f32>>;
}

/// Multi-label classifier over a tokenizer and a sequence model.
///
/// Logits go through a sigmoid and are thresholded at 0.5 independently, so
/// any subset of concepts can fire for one window.
pub struct TransformerClassifier {
    name: String,
    concepts: Vec<String>,
    normalizer: Arc<dyn Normalizer>,
    encoder: Box<dyn TokenEncoder>,
    model: Box<dyn SequenceModel>,
    max_tokens: usize,
}

impl TransformerClassifier {
    pub fn new(
        name: impl Into<String>,
        concepts: Vec<String>,
        normalizer: Arc<dyn Normalizer>,
        encoder: Box<dyn TokenEncoder>,
        model: Box<dyn SequenceModel>,
    ) -> Self {
        Self {
            name: name.into(),
            concepts,
            normalizer,
            encoder,
            model,
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }

    /// Same as `new`, with concepts named `K1..=Kn`.
    pub fn with_numbered_concepts(
        name: impl Into<String>,
        concept_count: usize,
        normalizer: Arc<dyn Normalizer>,
        encoder: Box<dyn TokenEncoder>,
        model: Box<dyn SequenceModel>,
    ) -> Self {
        Self::new(name, numbered_concepts(concept_count), normalizer, encoder, model)
    }

    pub fn max_tokens(mut self, max_tokens: usize) -> Self {
        self.max_tokens = max_tokens.max(1);
        self
    }

    fn try_predict(&self, window: &[String]) -> Result<Vec<bool>> {
        let text = self.normalizer.canonicalize(&window.join("\n"));
        if text.trim().is_empty() {
            return Ok(vec![false; self.concepts.len()]);
        }

        let mut ids = self.encoder.encode(&text)?;
        if ids.is_empty() {
            return Ok(vec![false; self.concepts.len()]);
        }
        ids.truncate(self.max_tokens);

        let logits = self.model.forward(&ids)?;
        if logits.len() != self.concepts.len() {
            return Err(Error::inference(format!(
                "model returned {} logits for {} concepts",
                logits.len(),
                self.concepts.len()
            )));
        }
        Ok(logits.into_iter().map(|l| above_threshold(sigmoid(l))).collect())
    }
}

impl MultiLabelClassifier for TransformerClassifier {
    fn name(&self) -> &str {
        &self.name
    }

    fn concepts(&self) -> &[String] {
        &self.concepts
    }

    fn predict(&self, window: &[String]) -> Vec<bool> {
        self.try_predict(window).unwrap_or_else(|e| {
            log::debug!("{}: window treated as negative: {e}", self.name);
            vec![false; self.concepts.len()]
        })
    }
}

// src/classifier/onnx.rs

//! Concrete transformer backend: a Hugging Face `tokenizer.json` and an ONNX
//! sequence classification export living side by side in one directory.
//!
//! ```text
//! models/codebert/
//!   tokenizer.json
//!   model.onnx
//! ```

use super::transformer::{SequenceModel, TokenEncoder};
use crate::error::{Error, Result};
use ndarray::Array;
use ort::session::{builder::GraphOptimizationLevel, Session, SessionInputs};
use ort::value::{DynTensor, Tensor};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;
use tokenizers::{Tokenizer, TruncationParams};

pub const TOKENIZER_FILE: &str = "tokenizer.json";
pub const MODEL_FILE: &str = "model.onnx";

/// Tokenizer that truncates to the model's maximum input length.
pub struct HfTokenEncoder {
    tokenizer: Tokenizer,
}

impl HfTokenEncoder {
    pub fn from_file(path: &Path, max_tokens: usize) -> Result<Self> {
        // Scans already run on a rayon pool; keep tokenization on the calling thread.
        if !tokenizers::utils::parallelism::is_parallelism_configured() {
            tokenizers::utils::parallelism::set_parallelism(false);
        }

        let mut tokenizer = Tokenizer::from_file(path)
            .map_err(|e| Error::artifact(path, format!("tokenizer load failed: {e}")))?;
        tokenizer
            .with_truncation(Some(TruncationParams {
                max_length: max_tokens.max(1),
                ..TruncationParams::default()
            }))
            .map_err(|e| Error::artifact(path, format!("tokenizer truncation failed: {e}")))?;
        Ok(Self { tokenizer })
    }
}

impl TokenEncoder for HfTokenEncoder {
    fn encode(&self, text: &str) -> Result<Vec<u32>> {
        let encoding = self
            .tokenizer
            .encode(text, true)
            .map_err(|e| Error::inference(format!("tokenization failed: {e}")))?;
        Ok(encoding.get_ids().to_vec())
    }
}

/// ONNX session returning one logit per concept for a single sequence.
pub struct OnnxSequenceModel {
    session: Mutex<Session>,
}

impl OnnxSequenceModel {
    pub fn from_file(path: &Path) -> Result<Self> {
        // One unit per classifier already occupies a pool thread.
        let session = Session::builder()
            .map_err(|e| Error::artifact(path, format!("ONNX session builder failed: {e}")))?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(|e| Error::artifact(path, format!("ONNX optimization failed: {e}")))?
            .with_intra_threads(1)
            .map_err(|e| Error::artifact(path, format!("failed to set ONNX threads: {e}")))?
            .commit_from_file(path)
            .map_err(|e| Error::artifact(path, format!("failed to load ONNX model: {e}")))?;

        log::info!("Loaded ONNX model {}", path.display());
        Ok(Self {
            session: Mutex::new(session),
        })
    }
}

impl SequenceModel for OnnxSequenceModel {
    fn forward(&self, input_ids: &[u32]) -> Result<Vec<f32>> {
        let len = input_ids.len();
        let ids: Vec<i64> = input_ids.iter().map(|&id| i64::from(id)).collect();

        let mut available: HashMap<&str, DynTensor> = HashMap::new();
        available.insert("input_ids", tensor_2d(ids)?);
        available.insert("attention_mask", tensor_2d(vec![1; len])?);
        available.insert("token_type_ids", tensor_2d(vec![0; len])?);

        let mut session = self
            .session
            .lock()
            .map_err(|_| Error::inference("ONNX session lock poisoned"))?;

        let mut feed: HashMap<String, DynTensor> = HashMap::new();
        for input in &session.inputs {
            let value = available.get(input.name.as_str()).ok_or_else(|| {
                Error::inference(format!("unsupported ONNX input `{}`", input.name))
            })?;
            feed.insert(input.name.clone(), value.clone());
        }

        let outputs = session
            .run(SessionInputs::from(feed))
            .map_err(|e| Error::inference(format!("ONNX forward failed: {e}")))?;
        if outputs.len() == 0 {
            return Err(Error::inference("ONNX returned no outputs"));
        }

        let logits: Vec<f32> = outputs[0]
            .try_extract_array::<f32>()
            .map_err(|e| Error::inference(format!("failed to decode ONNX output: {e}")))?
            .iter()
            .copied()
            .collect();
        Ok(logits)
    }
}

fn tensor_2d(values: Vec<i64>) -> Result<DynTensor> {
    let array = Array::from_shape_vec((1, values.len()), values)
        .map_err(|e| Error::inference(format!("input shape error: {e}")))?;
    Ok(Tensor::from_array(array.into_dyn())
        .map_err(|e| Error::inference(format!("input tensor error: {e}")))?
        .upcast())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    const WORD_LEVEL: &str = r#"{
        "version": "1.0",
        "truncation": null,
        "padding": null,
        "added_tokens": [],
        "normalizer": null,
        "pre_tokenizer": {"type": "Whitespace"},
        "post_processor": null,
        "decoder": null,
        "model": {
            "type": "WordLevel",
            "vocab": {"[UNK]": 0, "int": 1, "x": 2, "synchronized": 3},
            "unk_token": "[UNK]"
        }
    }"#;

    fn tokenizer_file(dir: &TempDir) -> std::path::PathBuf {
        let path = dir.path().join(TOKENIZER_FILE);
        fs::write(&path, WORD_LEVEL).unwrap();
        path
    }

    #[test]
    fn encoder_maps_words_and_unknowns() {
        let tmp = TempDir::new().unwrap();
        let encoder = HfTokenEncoder::from_file(&tokenizer_file(&tmp), 16).unwrap();

        assert_eq!(encoder.encode("int x").unwrap(), vec![1, 2]);
        assert_eq!(encoder.encode("synchronized lock").unwrap(), vec![3, 0]);
    }

    #[test]
    fn encoder_truncates_to_max_tokens() {
        let tmp = TempDir::new().unwrap();
        let encoder = HfTokenEncoder::from_file(&tokenizer_file(&tmp), 3).unwrap();

        assert_eq!(encoder.encode("int x int x int x").unwrap(), vec![1, 2, 1]);
    }

    #[test]
    fn broken_tokenizer_file_is_an_artifact_error() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join(TOKENIZER_FILE);
        fs::write(&path, "{not json").unwrap();

        assert!(matches!(
            HfTokenEncoder::from_file(&path, 8),
            Err(Error::Artifact { .. })
        ));
    }
}

#![allow(dead_code)]

use ku_detect::{
    BinaryClassifier, FileBatch, FileRecord, MultiLabelClassifier, OutputKind, Prediction,
    Provenance,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Lines `L0`, `L1`, ... so a classifier can tell where its window sits.
pub fn numbered_lines(n: usize) -> Vec<String> {
    (0..n).map(|i| format!("L{i}")).collect()
}

/// Start offset and length of a window built from `numbered_lines`.
pub fn locate(window: &[String]) -> Option<(usize, usize)> {
    let start = window.first()?.trim_start_matches('L').parse().ok()?;
    Some((start, window.len()))
}

pub fn batch(files: &[(&str, Vec<String>)]) -> FileBatch {
    files
        .iter()
        .map(|(name, lines)| {
            (
                name.to_string(),
                FileRecord::new(*name, lines.clone(), Provenance::default()),
            )
        })
        .collect()
}

type BinaryFn = dyn Fn(&[String]) -> Prediction + Send + Sync;
type MultiFn = dyn Fn(&[String]) -> Vec<bool> + Send + Sync;

/// Single-label classifier driven by a closure, counting its calls.
pub struct FnBinary {
    name: String,
    predict: Box<BinaryFn>,
    pub calls: Arc<AtomicUsize>,
}

impl FnBinary {
    pub fn new(
        name: &str,
        predict: impl Fn(&[String]) -> Prediction + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: name.to_string(),
            predict: Box::new(predict),
            calls: Arc::default(),
        }
    }

    /// Positive for any window containing `marker` as a whole line.
    pub fn marker(name: &str, marker: &str) -> Self {
        let marker = marker.to_string();
        Self::new(name, move |window| {
            window.iter().any(|line| *line == marker).into()
        })
    }
}

impl BinaryClassifier for FnBinary {
    fn name(&self) -> &str {
        &self.name
    }

    fn output_kind(&self) -> OutputKind {
        OutputKind::Discrete
    }

    fn predict(&self, window: &[String]) -> Prediction {
        self.calls.fetch_add(1, Ordering::SeqCst);
        (self.predict)(window)
    }
}

/// Multi-label classifier driven by a closure, counting its calls.
pub struct FnMulti {
    name: String,
    concepts: Vec<String>,
    predict: Box<MultiFn>,
    pub calls: Arc<AtomicUsize>,
}

impl FnMulti {
    pub fn new(
        name: &str,
        concepts: &[&str],
        predict: impl Fn(&[String]) -> Vec<bool> + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: name.to_string(),
            concepts: concepts.iter().map(|c| c.to_string()).collect(),
            predict: Box::new(predict),
            calls: Arc::default(),
        }
    }
}

impl MultiLabelClassifier for FnMulti {
    fn name(&self) -> &str {
        &self.name
    }

    fn concepts(&self) -> &[String] {
        &self.concepts
    }

    fn predict(&self, window: &[String]) -> Vec<bool> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        (self.predict)(window)
    }
}

// src/model.rs

use crate::normalize::Normalizer;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

/// Uniquely identifies a file revision inside a batch
pub type FileId = String;

/// Name of a knowledge unit, e.g. "K7"
pub type ConceptName = String;

/// A batch of files awaiting (or holding) detection results
pub type FileBatch = BTreeMap<FileId, FileRecord>;

/// Outcome recorded for one concept on one file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Detection {
    /// Written by single-label classifiers
    Flag(bool),
    /// Written by multi-label classifiers (0 or 1 per concept)
    Count(u32),
}

impl Detection {
    pub fn is_positive(&self) -> bool {
        match *self {
            Detection::Flag(flag) => flag,
            Detection::Count(count) => count > 0,
        }
    }
}

/// Where a file revision came from
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Provenance {
    pub author: Option<String>,
    /// Unix seconds of the commit
    pub timestamp: Option<i64>,
    pub revision: Option<String>,
}

/// One source file at one revision, plus whatever has been detected in it so far.
///
/// Lines are private so the line count can never drift from them. The concept
/// map only ever grows: a missing key means the file has not been scanned by
/// the classifier owning that concept.
#[derive(Debug, Clone)]
pub struct FileRecord {
    pub filename: String,
    pub provenance: Provenance,
    lines: Vec<String>,
    results: BTreeMap<ConceptName, Detection>,
    elapsed: Duration,
}

impl FileRecord {
    pub fn new(filename: impl Into<String>, lines: Vec<String>, provenance: Provenance) -> Self {
        Self {
            filename: filename.into(),
            provenance,
            lines,
            results: BTreeMap::new(),
            elapsed: Duration::ZERO,
        }
    }

    /// Builds a record from raw source text, running it through the normalizer first.
    pub fn from_source(
        filename: impl Into<String>,
        raw: &str,
        provenance: Provenance,
        normalizer: &dyn Normalizer,
    ) -> Self {
        Self::new(filename, normalizer.normalize_source(raw), provenance)
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn total_lines(&self) -> usize {
        self.lines.len()
    }

    pub fn results(&self) -> &BTreeMap<ConceptName, Detection> {
        &self.results
    }

    pub fn result(&self, concept: &str) -> Option<Detection> {
        self.results.get(concept).copied()
    }

    pub fn record(&mut self, concept: impl Into<ConceptName>, detection: Detection) {
        self.results.insert(concept.into(), detection);
    }

    /// Total time classifiers have spent on this file, summed over every scan.
    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    pub fn add_elapsed(&mut self, elapsed: Duration) {
        self.elapsed += elapsed;
    }
}

/// What one classifier concluded about one file
#[derive(Debug, Clone, PartialEq)]
pub struct FileVerdict {
    pub detections: Vec<(ConceptName, Detection)>,
    pub windows_evaluated: usize,
    pub elapsed: Duration,
}

impl FileVerdict {
    /// Writes the verdict into the record. Callers own the record exclusively.
    pub fn apply_to(&self, record: &mut FileRecord) {
        for (concept, detection) in &self.detections {
            record.record(concept.clone(), *detection);
        }
        record.add_elapsed(self.elapsed);
    }
}

/// Verdicts of a single classifier, keyed by file
pub type ClassifierResults = BTreeMap<FileId, FileVerdict>;

// src/scan.rs

use crate::classifier::{BinaryClassifier, Classifier, MultiLabelClassifier};
use crate::error::Result;
use crate::model::{ClassifierResults, Detection, FileBatch, FileVerdict};
use crate::window::{generate, Window, WindowParams};
use std::time::Instant;

/// Result of scanning one file with a single-label classifier
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShortCircuitScan {
    pub positive: bool,
    pub windows_evaluated: usize,
    /// The window that ended the scan, if any did
    pub hit: Option<Window>,
}

/// Result of scanning one file with a multi-label classifier
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExhaustiveScan {
    pub flags: Vec<bool>,
    pub windows_evaluated: usize,
}

/// Stops at the first positive window. `Abstain` keeps the scan going.
pub fn scan_short_circuit(
    lines: &[String],
    classifier: &dyn BinaryClassifier,
    params: &WindowParams,
) -> ShortCircuitScan {
    let mut windows_evaluated = 0;
    for window in generate(lines.len(), params) {
        windows_evaluated += 1;
        if classifier.predict(window.slice(lines)).is_positive() {
            return ShortCircuitScan {
                positive: true,
                windows_evaluated,
                hit: Some(window),
            };
        }
    }
    ShortCircuitScan {
        positive: false,
        windows_evaluated,
        hit: None,
    }
}

/// Evaluates every window and ORs the per-concept flags together. Keeps
/// going after every concept is set so that per-file cost only depends on the
/// window count.
pub fn scan_exhaustive(
    lines: &[String],
    classifier: &dyn MultiLabelClassifier,
    params: &WindowParams,
) -> ExhaustiveScan {
    let mut flags = vec![false; classifier.concepts().len()];
    let mut windows_evaluated = 0;

    for window in generate(lines.len(), params) {
        windows_evaluated += 1;
        let result = classifier.predict(window.slice(lines));
        if result.len() != flags.len() {
            log::debug!(
                "{}: window {}..{} returned {} flags, expected {}",
                classifier.name(),
                window.start,
                window.end,
                result.len(),
                flags.len()
            );
        }
        for (flag, hit) in flags.iter_mut().zip(result) {
            if !*flag && hit {
                *flag = true;
            }
        }
    }

    ExhaustiveScan {
        flags,
        windows_evaluated,
    }
}

/// Scans one file with whichever policy the classifier's variant calls for.
pub fn scan_file(lines: &[String], classifier: &Classifier, params: &WindowParams) -> FileVerdict {
    let started = Instant::now();
    let (detections, windows_evaluated) = match classifier {
        Classifier::SingleLabel(c) => {
            let scan = scan_short_circuit(lines, c.as_ref(), params);
            (
                vec![(c.name().to_string(), Detection::Flag(scan.positive))],
                scan.windows_evaluated,
            )
        }
        Classifier::MultiLabel(c) => {
            let scan = scan_exhaustive(lines, c.as_ref(), params);
            let detections = c
                .concepts()
                .iter()
                .zip(&scan.flags)
                .map(|(concept, &flag)| (concept.clone(), Detection::Count(u32::from(flag))))
                .collect();
            (detections, scan.windows_evaluated)
        }
    };

    FileVerdict {
        detections,
        windows_evaluated,
        elapsed: started.elapsed(),
    }
}

/// Scans every file of the batch with one classifier on the calling thread,
/// writing each verdict into its record as soon as that file is done.
pub fn scan_batch(
    files: &mut FileBatch,
    classifier: &Classifier,
    params: &WindowParams,
) -> Result<ClassifierResults> {
    params.validate()?;
    classifier.validate()?;

    let mut results = ClassifierResults::new();
    for (file_id, record) in files.iter_mut() {
        let verdict = scan_file(record.lines(), classifier, params);
        log::debug!(
            "{}: {} windows on {} in {:.2?}",
            classifier.name(),
            verdict.windows_evaluated,
            file_id,
            verdict.elapsed
        );
        verdict.apply_to(record);
        results.insert(file_id.clone(), verdict);
    }

    log::info!("{} scanned {} files", classifier.name(), results.len());
    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::{OutputKind, Prediction};

    struct Never;

    impl BinaryClassifier for Never {
        fn name(&self) -> &str {
            "never"
        }

        fn output_kind(&self) -> OutputKind {
            OutputKind::Discrete
        }

        fn predict(&self, _window: &[String]) -> Prediction {
            Prediction::Abstain
        }
    }

    fn lines(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("line {i}")).collect()
    }

    #[test]
    fn abstain_never_stops_the_scan() {
        let params = WindowParams::new(2, 3, 1, 1);
        let scan = scan_short_circuit(&lines(5), &Never, &params);
        assert!(!scan.positive);
        assert_eq!(scan.windows_evaluated, 4 + 3);
        assert_eq!(scan.hit, None);
    }

    #[test]
    fn empty_file_is_negative_without_predicting() {
        let scan = scan_short_circuit(&[], &Never, &WindowParams::default());
        assert_eq!(scan.windows_evaluated, 0);
        assert!(!scan.positive);
    }

    #[test]
    fn batch_rejects_bad_params_before_scanning() {
        let mut files = FileBatch::new();
        let result = scan_batch(
            &mut files,
            &Classifier::single(Never),
            &WindowParams::new(3, 3, 1, 0),
        );
        assert!(result.is_err());
    }
}

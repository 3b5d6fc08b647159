// src/executor.rs

//! Runs one scan unit per classifier on a rayon pool.
//!
//! Units get a read-only snapshot of the batch's lines and hand their results
//! back by value over a channel. Only the calling thread touches the file
//! records, merging each unit's results in the order the units finish.

use crate::classifier::Classifier;
use crate::error::{Error, Result};
use crate::model::{ClassifierResults, FileBatch, FileId};
use crate::scan::scan_file;
use crate::window::WindowParams;
use indicatif::ProgressBar;
use rayon::{ThreadPool, ThreadPoolBuilder};
use std::any::Any;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::panic::{self, AssertUnwindSafe};
use std::sync::{mpsc, Arc};
use std::time::{Duration, Instant};

type Snapshot = Arc<Vec<(FileId, Vec<String>)>>;

/// Everything the executor learned in one run.
#[derive(Debug, Default)]
pub struct ExecutionReport {
    /// Classifier name -> per-file verdicts
    pub results: BTreeMap<String, ClassifierResults>,
    /// Classifier name -> why its unit produced nothing
    pub failures: BTreeMap<String, String>,
    pub elapsed: Duration,
}

impl ExecutionReport {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

pub struct Executor {
    pool: ThreadPool,
    show_progress: bool,
}

impl Executor {
    /// `threads == 0` lets rayon pick one thread per core.
    pub fn new(threads: usize) -> Result<Self> {
        let pool = ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("ku-scan-{i}"))
            .build()?;
        Ok(Self {
            pool,
            show_progress: false,
        })
    }

    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    pub fn threads(&self) -> usize {
        self.pool.current_num_threads()
    }

    /// Scans `files` with every classifier concurrently and merges the
    /// verdicts into the records.
    ///
    /// Configuration problems fail the whole call before any unit starts. A
    /// unit that panics only loses its own classifier's results, which shows up
    /// in `ExecutionReport::failures`.
    pub fn execute(
        &self,
        files: &mut FileBatch,
        classifiers: &[Classifier],
        params: &WindowParams,
    ) -> Result<ExecutionReport> {
        params.validate()?;
        check_classifiers(classifiers)?;

        let started = Instant::now();
        let snapshot: Snapshot = Arc::new(
            files
                .iter()
                .map(|(id, record)| (id.clone(), record.lines().to_vec()))
                .collect(),
        );

        let bar = if self.show_progress {
            ProgressBar::new(classifiers.len() as u64)
        } else {
            ProgressBar::hidden()
        };
        bar.set_message("Scanning with classifiers");

        let (tx, rx) = mpsc::channel();
        for classifier in classifiers {
            let tx = tx.clone();
            let classifier = classifier.clone();
            let snapshot = Arc::clone(&snapshot);
            let params = *params;

            self.pool.spawn(move || {
                let name = classifier.name().to_string();
                let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
                    run_unit(&classifier, &snapshot, &params)
                }));
                // A closed channel means the caller is gone; nothing left to report to.
                let _ = tx.send((name, outcome));
            });
        }
        drop(tx);

        let mut report = ExecutionReport::default();
        for (name, outcome) in rx {
            match outcome {
                Ok(results) => {
                    for (file_id, verdict) in &results {
                        if let Some(record) = files.get_mut(file_id) {
                            verdict.apply_to(record);
                        }
                    }
                    log::info!("{name}: merged results for {} files", results.len());
                    report.results.insert(name, results);
                }
                Err(payload) => {
                    let reason = panic_message(payload.as_ref());
                    log::error!("{name}: scan unit failed: {reason}");
                    report.failures.insert(name, reason);
                }
            }
            bar.inc(1);
        }
        bar.finish_with_message("Scan complete");

        report.elapsed = started.elapsed();
        Ok(report)
    }
}

fn run_unit(
    classifier: &Classifier,
    files: &[(FileId, Vec<String>)],
    params: &WindowParams,
) -> ClassifierResults {
    files
        .iter()
        .map(|(id, lines)| (id.clone(), scan_file(lines, classifier, params)))
        .collect()
}

/// Names must be unique and no two classifiers may write the same concept key,
/// otherwise the merge would depend on completion order.
fn check_classifiers(classifiers: &[Classifier]) -> Result<()> {
    let mut owners: HashMap<String, &str> = HashMap::new();
    let mut names = HashSet::new();

    for classifier in classifiers {
        classifier.validate()?;
        if !names.insert(classifier.name()) {
            return Err(Error::DuplicateClassifier(classifier.name().to_string()));
        }
        for concept in classifier.concept_names() {
            if let Some(owner) = owners.get(&concept) {
                return Err(Error::invalid_classifier(
                    classifier.name(),
                    format!("concept `{concept}` is already written by `{owner}`"),
                ));
            }
            owners.insert(concept, classifier.name());
        }
    }
    Ok(())
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "scan unit panicked".to_string()
    }
}

// src/lib.rs

//! Knowledge-unit detection over sliding windows of source lines.
//!
//! ```text
//! raw source ──normalize──> FileRecord lines
//!                               │
//!                    window::generate (sizes × offsets)
//!                               │
//!              classifier.predict(window) for each window
//!                               │
//!        scan: short-circuit (single-label) / exhaustive (multi-label)
//!                               │
//!     executor: one rayon unit per classifier, merged on the caller
//!                               │
//!                    export::ResultSink (JSON lines, CSV)
//! ```

pub mod classifier;
pub mod cli;
pub mod config;
pub mod error;
pub mod executor;
pub mod export;
pub mod history;
pub mod model;
pub mod normalize;
pub mod scan;
pub mod sources;
pub mod window;

pub use classifier::{
    BinaryClassifier, Classifier, ClassifierKind, MultiLabelClassifier, OutputKind, Prediction,
};
pub use config::Config;
pub use error::{Error, Result};
pub use executor::{ExecutionReport, Executor};
pub use model::{ClassifierResults, Detection, FileBatch, FileRecord, FileVerdict, Provenance};
pub use normalize::{JavaNormalizer, Normalizer};
pub use scan::{scan_batch, scan_exhaustive, scan_file, scan_short_circuit};
pub use window::{generate, window_count, Window, WindowParams};

// src/sources.rs

//! Builds file batches from the places code can come from.

use crate::error::Result;
use crate::history::Contribution;
use crate::model::{FileBatch, FileRecord, Provenance};
use crate::normalize::Normalizer;
use std::fs;
use std::path::Path;

/// Reads every `.<extension>` file directly inside `dir`. Provenance stays empty.
///
/// Files that are not valid UTF-8 are skipped with a warning.
pub fn read_source_dir(
    dir: &Path,
    extension: &str,
    normalizer: &dyn Normalizer,
) -> Result<FileBatch> {
    let suffix = format!(".{extension}");
    let mut batch = FileBatch::new();

    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        let Some(filename) = path.file_name().and_then(|f| f.to_str()) else {
            continue;
        };
        if !path.is_file() || !filename.ends_with(&suffix) {
            continue;
        }

        match fs::read_to_string(&path) {
            Ok(raw) => {
                let record =
                    FileRecord::from_source(filename, &raw, Provenance::default(), normalizer);
                batch.insert(filename.to_string(), record);
            }
            Err(e) => log::warn!("Skipping {}: {e}", path.display()),
        }
    }

    log::info!("Read {} files from {}", batch.len(), dir.display());
    Ok(batch)
}

/// Batch key for a contribution: the same path can appear at many revisions.
pub fn contribution_key(contribution: &Contribution) -> String {
    format!("{}:{}", contribution.revision, contribution.path)
}

pub fn batch_from_contributions(
    contributions: &[Contribution],
    normalizer: &dyn Normalizer,
) -> FileBatch {
    contributions
        .iter()
        .map(|c| {
            let provenance = Provenance {
                author: Some(c.author.clone()),
                timestamp: Some(c.timestamp),
                revision: Some(c.revision.clone()),
            };
            let record =
                FileRecord::from_source(c.path.clone(), &c.content, provenance, normalizer);
            (contribution_key(c), record)
        })
        .collect()
}

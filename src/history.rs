// src/history.rs

use crate::error::Result;
use crate::normalize::{strip_comments, strip_imports, strip_packages};
use git2::{Commit, Delta, DiffOptions, Oid, Repository};
use indicatif::ProgressBar;
use std::collections::{BTreeMap, HashSet};
use std::path::Path;

/// One file as it looked right after a commit touched it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Contribution {
    pub path: String,
    pub revision: String,
    pub author: String,
    /// Unix seconds of the commit
    pub timestamp: i64,
    pub content: String,
    /// 1-based line numbers the commit added, after discarding comment-only lines
    pub changed_lines: Vec<usize>,
}

#[derive(Debug, Clone)]
pub struct HistoryOptions {
    /// Only files ending in `.<extension>` are collected
    pub extension: String,
    pub limit: Option<usize>,
    pub skip: usize,
    /// Revisions that were already analyzed
    pub exclude: HashSet<String>,
    pub show_progress: bool,
}

impl Default for HistoryOptions {
    fn default() -> Self {
        Self {
            extension: "java".to_string(),
            limit: None,
            skip: 0,
            exclude: HashSet::new(),
            show_progress: false,
        }
    }
}

/// Walks the history from HEAD, newest first, and collects every file each
/// non-merge commit added or changed.
pub fn collect_contributions(
    repo_path: &Path,
    opts: &HistoryOptions,
) -> Result<Vec<Contribution>> {
    let repo = Repository::open(repo_path)?;
    log::info!("Collecting contributions from {}", repo_path.display());

    let mut revwalk = repo.revwalk()?;
    revwalk.push_head()?;
    revwalk.set_sorting(git2::Sort::TIME)?;

    let mut commits = Vec::new();
    for oid in revwalk.skip(opts.skip).take(opts.limit.unwrap_or(usize::MAX)) {
        commits.push(oid?);
    }

    let bar = if opts.show_progress {
        ProgressBar::new(commits.len() as u64)
    } else {
        ProgressBar::hidden()
    };
    bar.set_message("Reading commits");

    let suffix = format!(".{}", opts.extension);
    let mut contributions = Vec::new();
    for oid in commits {
        bar.inc(1);
        if opts.exclude.contains(&oid.to_string()) {
            continue;
        }
        let commit = repo.find_commit(oid)?;
        if commit.parent_count() > 1 {
            log::debug!("Skipping merge commit {oid}");
            continue;
        }
        contributions.extend(commit_contributions(&repo, &commit, &suffix)?);
    }
    bar.finish_with_message("History read");

    log::info!("Collected {} contributions", contributions.len());
    Ok(contributions)
}

fn commit_contributions(
    repo: &Repository,
    commit: &Commit,
    suffix: &str,
) -> Result<Vec<Contribution>> {
    let parent_tree = match commit.parent_count() {
        0 => None,
        _ => Some(commit.parent(0)?.tree()?),
    };
    let current_tree = commit.tree()?;

    let mut diff_opts = DiffOptions::new();
    diff_opts.ignore_filemode(true);
    let diff = repo.diff_tree_to_tree(
        parent_tree.as_ref(),
        Some(&current_tree),
        Some(&mut diff_opts),
    )?;

    let mut touched: Vec<(String, Oid)> = Vec::new();
    let mut added: BTreeMap<String, Vec<(usize, String)>> = BTreeMap::new();
    diff.foreach(
        &mut |delta, _| {
            let relevant = matches!(
                delta.status(),
                Delta::Added | Delta::Modified | Delta::Renamed | Delta::Copied
            );
            if let Some(path) = delta.new_file().path().and_then(|p| p.to_str()) {
                if relevant && path.ends_with(suffix) {
                    touched.push((path.to_string(), delta.new_file().id()));
                }
            }
            true
        },
        None,
        None,
        Some(&mut |delta, _hunk, line| {
            if line.origin() == '+' {
                let path = delta.new_file().path().and_then(|p| p.to_str());
                if let (Some(path), Some(line_no)) = (path, line.new_lineno()) {
                    let text = String::from_utf8_lossy(line.content())
                        .trim_end_matches(['\n', '\r'])
                        .to_string();
                    added
                        .entry(path.to_string())
                        .or_default()
                        .push((line_no as usize, text));
                }
            }
            true
        }),
    )?;

    let revision = commit.id().to_string();
    let author = commit.author().name().unwrap_or("Unknown").to_string();
    let timestamp = commit.time().seconds();
    let is_root = commit.parent_count() == 0;

    let mut contributions = Vec::new();
    for (path, blob_id) in touched {
        let blob = repo.find_blob(blob_id)?;
        let content = match std::str::from_utf8(blob.content()) {
            Ok(content) => content.to_string(),
            Err(_) => {
                log::warn!("{path} at {revision} is not UTF-8 encoded, skipping");
                continue;
            }
        };

        let changed_lines: Vec<usize> = if is_root {
            (1..=content.lines().count()).collect()
        } else {
            let cleaned = strip_packages(&strip_imports(&strip_comments(&content)));
            added
                .get(&path)
                .map(|lines| {
                    lines
                        .iter()
                        .filter(|(_, text)| line_is_accepted(text, &cleaned))
                        .map(|(line_no, _)| *line_no)
                        .collect()
                })
                .unwrap_or_default()
        };

        if changed_lines.is_empty() {
            log::debug!("{path} at {revision} has no accepted changes");
            continue;
        }

        contributions.push(Contribution {
            path,
            revision: revision.clone(),
            author: author.clone(),
            timestamp,
            content,
            changed_lines,
        });
    }
    Ok(contributions)
}

/// An added line counts unless it is trivial or disappears once comments,
/// imports and package declarations are stripped from the file.
fn line_is_accepted(line: &str, cleaned_content: &str) -> bool {
    if matches!(line.trim(), "" | "*" | "//") {
        return false;
    }
    cleaned_content.contains(line)
}

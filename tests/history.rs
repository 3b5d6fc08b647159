use git2::{Commit, Oid, Repository, Signature, Time};
use ku_detect::history::{collect_contributions, HistoryOptions};
use ku_detect::sources::batch_from_contributions;
use ku_detect::JavaNormalizer;
use pretty_assertions::assert_eq;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

const ROOT: &str = "class A {\n    int x;\n}\n";
const WITH_Y: &str = "class A {\n    int x;\n    // explain y\n    int y;\n}\n";
const WITH_NOTE: &str = "class A {\n    int x;\n    // explain y\n    int y;\n    // trailing note\n}\n";

fn commit(repo: &Repository, files: &[(&str, &str)], message: &str, seconds: i64) -> Oid {
    let workdir = repo.workdir().unwrap();
    let mut index = repo.index().unwrap();
    for (path, content) in files {
        fs::write(workdir.join(path), content).unwrap();
        index.add_path(Path::new(path)).unwrap();
    }
    index.write().unwrap();
    let tree = repo.find_tree(index.write_tree().unwrap()).unwrap();

    let sig = Signature::new("Ada", "ada@example.com", &Time::new(seconds, 0)).unwrap();
    let parents: Vec<Commit> = repo
        .head()
        .ok()
        .and_then(|head| head.peel_to_commit().ok())
        .into_iter()
        .collect();
    let parents: Vec<&Commit> = parents.iter().collect();
    repo.commit(Some("HEAD"), &sig, &sig, message, &tree, &parents)
        .unwrap()
}

struct Fixture {
    dir: TempDir,
    root: Oid,
    added_y: Oid,
    comment_only: Oid,
}

fn fixture() -> Fixture {
    let dir = TempDir::new().unwrap();
    let repo = Repository::init(dir.path()).unwrap();
    let root = commit(&repo, &[("A.java", ROOT), ("notes.txt", "a\n")], "init", 1_000);
    let added_y = commit(&repo, &[("A.java", WITH_Y)], "add y", 2_000);
    let comment_only = commit(
        &repo,
        &[("A.java", WITH_NOTE), ("notes.txt", "a\nb\n")],
        "document",
        3_000,
    );
    Fixture {
        dir,
        root,
        added_y,
        comment_only,
    }
}

#[test]
fn root_commit_counts_every_line_and_later_commits_only_code() {
    let fx = fixture();
    let contributions = collect_contributions(fx.dir.path(), &HistoryOptions::default()).unwrap();

    let seen: Vec<(String, String, Vec<usize>)> = contributions
        .iter()
        .map(|c| (c.revision.clone(), c.path.clone(), c.changed_lines.clone()))
        .collect();
    assert_eq!(
        seen,
        vec![
            (fx.added_y.to_string(), "A.java".to_string(), vec![4]),
            (fx.root.to_string(), "A.java".to_string(), vec![1, 2, 3]),
        ]
    );

    let root = &contributions[1];
    assert_eq!(root.author, "Ada");
    assert_eq!(root.timestamp, 1_000);
    assert_eq!(root.content, ROOT);
    assert!(contributions
        .iter()
        .all(|c| c.revision != fx.comment_only.to_string()));
}

#[test]
fn skip_and_limit_window_the_walk() {
    let fx = fixture();

    let opts = HistoryOptions {
        skip: 1,
        limit: Some(1),
        ..HistoryOptions::default()
    };
    let contributions = collect_contributions(fx.dir.path(), &opts).unwrap();
    assert_eq!(contributions.len(), 1);
    assert_eq!(contributions[0].revision, fx.added_y.to_string());

    let opts = HistoryOptions {
        limit: Some(1),
        ..HistoryOptions::default()
    };
    assert!(collect_contributions(fx.dir.path(), &opts).unwrap().is_empty());
}

#[test]
fn excluded_revisions_are_not_read() {
    let fx = fixture();
    let opts = HistoryOptions {
        exclude: [fx.added_y.to_string()].into_iter().collect(),
        ..HistoryOptions::default()
    };

    let contributions = collect_contributions(fx.dir.path(), &opts).unwrap();

    assert_eq!(contributions.len(), 1);
    assert_eq!(contributions[0].revision, fx.root.to_string());
}

#[test]
fn other_extensions_can_be_selected() {
    let fx = fixture();
    let opts = HistoryOptions {
        extension: "txt".to_string(),
        ..HistoryOptions::default()
    };

    let contributions = collect_contributions(fx.dir.path(), &opts).unwrap();

    let paths: Vec<(&str, &str)> = contributions
        .iter()
        .map(|c| (c.revision.as_str(), c.path.as_str()))
        .collect();
    let root = fx.root.to_string();
    let comment_only = fx.comment_only.to_string();
    assert_eq!(
        paths,
        vec![(comment_only.as_str(), "notes.txt"), (root.as_str(), "notes.txt")]
    );
}

#[test]
fn contributions_become_records_keyed_by_revision_and_path() {
    let fx = fixture();
    let contributions = collect_contributions(fx.dir.path(), &HistoryOptions::default()).unwrap();

    let batch = batch_from_contributions(&contributions, &JavaNormalizer);

    let key = format!("{}:A.java", fx.root);
    let record = &batch[&key];
    assert_eq!(record.filename, "A.java");
    assert_eq!(record.provenance.author.as_deref(), Some("Ada"));
    assert_eq!(record.provenance.timestamp, Some(1_000));
    assert_eq!(record.provenance.revision, Some(fx.root.to_string()));
    assert_eq!(record.lines(), ["class A {", "    int x;"]);
    assert_eq!(batch.len(), 2);
}

#[test]
fn missing_repository_is_an_error() {
    let dir = TempDir::new().unwrap();
    assert!(collect_contributions(dir.path(), &HistoryOptions::default()).is_err());
}

use ku_detect::classifier::load_classifiers_from_dir;
use ku_detect::export::{JsonLinesSink, ResultSink};
use ku_detect::sources::read_source_dir;
use ku_detect::{Detection, Executor, JavaNormalizer, Normalizer, WindowParams};
use pretty_assertions::assert_eq;
use serde_json::Value;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

fn write_model(root: &Path, name: &str, vocabulary: &str) {
    let dir = root.join(name);
    fs::create_dir_all(&dir).unwrap();
    fs::write(
        dir.join(format!("{name}_vectorizer.json")),
        format!(r#"{{"vocabulary": {vocabulary}}}"#),
    )
    .unwrap();
    fs::write(
        dir.join(format!("{name}_selector.json")),
        r#"{"support": [0, 1]}"#,
    )
    .unwrap();
    fs::write(
        dir.join(format!("{name}_model.json")),
        r#"{"weights": [2.0, 2.0], "bias": -1.0, "output": "probability"}"#,
    )
    .unwrap();
}

#[test]
fn directory_scan_end_to_end() {
    let models = TempDir::new().unwrap();
    write_model(models.path(), "K2", r#"{"synchronized": 0, "wait": 1}"#);
    write_model(models.path(), "K5", r#"{"Thread": 0, "start": 1}"#);

    let sources = TempDir::new().unwrap();
    fs::write(
        sources.path().join("Lock.java"),
        "import java.util.List;\nclass Lock {\n  void run() {\n    synchronized (this) { wait(); }\n  }\n}\n",
    )
    .unwrap();
    fs::write(
        sources.path().join("Plain.java"),
        "class Plain {\n  // synchronized\n  int f() { return 1; }\n}\n",
    )
    .unwrap();

    let normalizer: Arc<dyn Normalizer> = Arc::new(JavaNormalizer);
    let loaded = load_classifiers_from_dir(models.path(), &[], Arc::clone(&normalizer)).unwrap();
    assert_eq!(loaded.classifiers.len(), 2);

    let mut files = read_source_dir(sources.path(), "java", normalizer.as_ref()).unwrap();
    let report = Executor::new(2)
        .unwrap()
        .execute(&mut files, &loaded.classifiers, &WindowParams::new(1, 2, 1, 1))
        .unwrap();
    assert!(report.is_complete());

    assert_eq!(files["Lock.java"].result("K2"), Some(Detection::Flag(true)));
    assert_eq!(files["Lock.java"].result("K5"), Some(Detection::Flag(false)));
    // the only mention sits in a comment, which never reaches a window
    assert_eq!(files["Plain.java"].result("K2"), Some(Detection::Flag(false)));

    let mut sink = JsonLinesSink::new(Vec::new());
    for (id, record) in &files {
        sink.write_record(id, record).unwrap();
    }
    sink.finish().unwrap();
    let output = String::from_utf8(sink.into_inner()).unwrap();

    let lines: Vec<Value> = output
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0]["filename"], "Lock.java");
    assert_eq!(lines[0]["detected_kus"]["K2"], true);
    assert_eq!(lines[0]["detected_kus"]["K5"], false);
    assert_eq!(lines[1]["filename"], "Plain.java");
    assert_eq!(lines[1]["author"], Value::Null);
}

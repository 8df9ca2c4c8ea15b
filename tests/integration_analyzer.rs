use std::fs;
use std::path::Path;
use structura::core::{AnalyzerConfig, CancellationToken, FolderAnalyzer};
use structura::formatters::JsonFormatter;
use structura::{AnalysisError, DiagnosticKind};

fn write(root: &Path, relative_path: &str, code: &str) {
    let path = root.join(relative_path);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, code).unwrap();
}

fn sample_project(root: &Path) {
    write(
        root,
        "app/greet.py",
        "def greet(name: str) -> str:\n    return \"Hello, \" + name\n",
    );
    write(root, "app/__init__.py", "from .greet import greet\n");
    write(
        root,
        "zoo/Animal.java",
        "package zoo;\npublic class Animal {\n    public void speak() {}\n}\n",
    );
    write(
        root,
        "zoo/Dog.java",
        "package zoo;\npublic class Dog extends Animal {\n    @Override\n    public void speak() { bark(); }\n    void bark() {}\n}\n",
    );
    write(root, "native/util.h", "int add(int a, int b);\n");
    write(
        root,
        "native/util.c",
        "#include \"util.h\"\nint add(int a, int b) { return a + b; }\n",
    );
    write(root, "cmd/main.go", "package main\n\nfunc main() {}\n");
    write(root, ".venv/lib/site.py", "def hidden():\n    pass\n");
    write(root, "app/__pycache__/greet.py", "def cached():\n    pass\n");
    write(root, "README.md", "# sample\n");
}

#[test]
fn folder_report_covers_every_language() {
    let dir = tempfile::TempDir::new().unwrap();
    sample_project(dir.path());

    let config = AnalyzerConfig::default();
    let report = FolderAnalyzer::new(&config).analyze(dir.path()).unwrap();

    let paths: Vec<&str> = report
        .files
        .iter()
        .map(|f| f.file.relative_path.as_str())
        .collect();
    assert_eq!(
        paths,
        vec![
            "app/__init__.py",
            "app/greet.py",
            "cmd/main.go",
            "native/util.c",
            "native/util.h",
            "zoo/Animal.java",
            "zoo/Dog.java",
        ]
    );

    let greet = report.file("app/greet.py").unwrap().function("greet").unwrap();
    assert_eq!(greet.qualified_name, "app.greet.greet");
    assert_eq!(greet.return_type.as_deref(), Some("str"));

    let dog = report.file("zoo/Dog.java").unwrap().class("Dog").unwrap();
    assert_eq!(dog.parents, vec!["Animal"]);

    assert_eq!(report.excluded_paths, vec![".venv", "app/__pycache__"]);
    assert_eq!(report.errors.len(), 1);
    assert_eq!(report.errors[0].kind, DiagnosticKind::UnsupportedLanguage);
    assert_eq!(report.errors[0].path, "README.md");

    let counts = &report.summary_counts;
    assert_eq!(counts.files_analyzed, 7);
    assert_eq!(counts.files_skipped, 1);
    assert_eq!(counts.files_failed, 0);
    assert_eq!(counts.languages.get("java"), Some(&2));
    assert_eq!(counts.languages.get("c"), Some(&2));
    assert!(!report.cancelled);
}

#[test]
fn hidden_directories_never_reach_the_report() {
    let dir = tempfile::TempDir::new().unwrap();
    sample_project(dir.path());

    let config = AnalyzerConfig::default();
    let report = FolderAnalyzer::new(&config).analyze(dir.path()).unwrap();
    assert!(report
        .files
        .iter()
        .all(|f| !f.file.relative_path.starts_with(".venv")
            && !f.file.relative_path.contains("__pycache__")));
}

#[test]
fn repeated_runs_serialize_identically() {
    let dir = tempfile::TempDir::new().unwrap();
    sample_project(dir.path());

    let config = AnalyzerConfig::default().with_concurrency(4);
    let formatter = JsonFormatter::new();
    let first = formatter
        .format(&FolderAnalyzer::new(&config).analyze(dir.path()).unwrap())
        .unwrap();
    let second = formatter
        .format(&FolderAnalyzer::new(&config).analyze(dir.path()).unwrap())
        .unwrap();
    assert_eq!(first.as_bytes(), second.as_bytes());
}

#[test]
fn syntax_error_is_isolated_to_its_file() {
    let dir = tempfile::TempDir::new().unwrap();
    write(dir.path(), "good.py", "def ok():\n    return 1\n");
    write(dir.path(), "bad.py", "def broken(:\n    return\n");

    let config = AnalyzerConfig::default();
    let report = FolderAnalyzer::new(&config).analyze(dir.path()).unwrap();

    assert_eq!(report.files.len(), 1);
    assert_eq!(report.files[0].file.relative_path, "good.py");
    assert_eq!(report.errors.len(), 1);
    assert_eq!(report.errors[0].kind, DiagnosticKind::ParseError);
    assert_eq!(report.errors[0].path, "bad.py");
    assert!(report.errors[0].line.is_some());
    assert_eq!(report.summary_counts.files_failed, 1);
}

#[test]
fn tolerant_mode_keeps_broken_files() {
    let dir = tempfile::TempDir::new().unwrap();
    write(dir.path(), "bad.py", "def ok():\n    return 1\n\ndef broken(:\n");

    let config = AnalyzerConfig::default().with_tolerate_syntax_errors(true);
    let report = FolderAnalyzer::new(&config).analyze(dir.path()).unwrap();

    assert_eq!(report.files.len(), 1);
    assert!(report.errors.is_empty());
    let file = &report.files[0];
    assert!(file.function("ok").is_some());
    assert!(file
        .errors
        .iter()
        .any(|d| d.kind == DiagnosticKind::ParseError));
}

#[test]
fn cancelled_run_is_marked() {
    let dir = tempfile::TempDir::new().unwrap();
    sample_project(dir.path());

    let config = AnalyzerConfig::default();
    let token = CancellationToken::new();
    let analyzer = FolderAnalyzer::new(&config).with_cancellation(token.clone());
    token.cancel();
    let report = analyzer.analyze(dir.path()).unwrap();

    assert!(report.cancelled);
    assert!(report.files.is_empty());
}

#[test]
fn missing_root_is_fatal() {
    let dir = tempfile::TempDir::new().unwrap();
    let config = AnalyzerConfig::default();
    let err = FolderAnalyzer::new(&config)
        .analyze(&dir.path().join("nope"))
        .unwrap_err();
    assert!(matches!(err, AnalysisError::RootNotFound { .. }));
}

#[test]
fn file_as_root_is_rejected() {
    let dir = tempfile::TempDir::new().unwrap();
    write(dir.path(), "one.py", "x = 1\n");
    let config = AnalyzerConfig::default();
    let err = FolderAnalyzer::new(&config)
        .analyze(&dir.path().join("one.py"))
        .unwrap_err();
    assert!(err.is_fatal());
}

#[test]
fn multibyte_docstring_indent_does_not_abort_the_run() {
    let dir = tempfile::TempDir::new().unwrap();
    write(dir.path(), "ok.py", "def ok():\n    pass\n");
    write(
        dir.path(),
        "doc.py",
        "def documented():\n    \"\"\"\n a\n\u{a0}\u{a0}b\n\u{3000}c\n    \"\"\"\n",
    );

    let config = AnalyzerConfig::default();
    let report = FolderAnalyzer::new(&config).analyze(dir.path()).unwrap();
    assert_eq!(report.files.len(), 2);
    assert!(report.errors.is_empty());
    let doc = &report.files[0];
    assert_eq!(doc.file.relative_path, "doc.py");
    assert_eq!(doc.functions[0].docstring.as_deref(), Some("a\n\u{a0}b\nc"));
}

use rayon::prelude::*;
use std::borrow::Cow;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::builder::ModelBuilder;
use super::config::AnalyzerConfig;
use super::language::LanguageDetector;
use super::model::{FileReport, FolderReport, SourceFile, SummaryCounts};
use super::scanner::{relative_path, FileScanner, WalkEntry};
use crate::error::{AnalysisError, Diagnostic, DiagnosticKind, Result};
use crate::parsers::common::first_syntax_error;
use crate::parsers::{FrontEnd, LanguageParser};

/// Cooperative stop signal for a folder run. Checked before each file is
/// started; a parse in progress always finishes.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Analyzes single files against a fixed root.
pub struct FileAnalyzer<'a> {
    config: &'a AnalyzerConfig,
    root: PathBuf,
}

impl<'a> FileAnalyzer<'a> {
    pub fn new(config: &'a AnalyzerConfig, root: impl AsRef<Path>) -> Self {
        Self {
            config,
            root: absolute(root.as_ref()),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn analyze(&self, path: &Path) -> Result<FileReport> {
        let path = absolute(path);
        let relative = relative_path(&self.root, &path);
        let detector = LanguageDetector::new(self.config);

        let (language, bytes) = match detector.detect(&path) {
            Some(language) => (language, read(&path)?),
            None if path.extension().is_none() => {
                let bytes = read(&path)?;
                let language = detector
                    .detect_with_content(&path, &String::from_utf8_lossy(&bytes))
                    .ok_or_else(|| AnalysisError::UnsupportedLanguage { path: path.clone() })?;
                (language, bytes)
            }
            None => return Err(AnalysisError::UnsupportedLanguage { path }),
        };
        let source: Cow<str> = String::from_utf8_lossy(&bytes);

        let front_end = FrontEnd::for_language(language);
        let mut syntax_error = None;
        let tree = if self.config.tolerate_syntax_errors {
            let tree = front_end.parse_lenient(&path, &source)?;
            syntax_error = first_syntax_error(&tree, &path, source.as_bytes());
            tree
        } else {
            front_end.parse(&path, &source)?
        };

        let file = SourceFile::new(path.clone(), relative, language);
        let mut report = ModelBuilder::new(&file).build(front_end.extract(&tree, &source));
        if let Some(err) = syntax_error {
            report
                .errors
                .push(AnalysisError::Parse(err).to_diagnostic(&file.relative_path));
        }

        debug!(
            path = %file.relative_path,
            language = %language,
            functions = report.functions.len(),
            classes = report.classes.len(),
            imports = report.imports.len(),
            "analyzed file"
        );
        Ok(report)
    }
}

/// Walks a root directory and analyzes every candidate file on a bounded
/// rayon pool.
pub struct FolderAnalyzer<'a> {
    config: &'a AnalyzerConfig,
    cancel: CancellationToken,
}

enum Outcome {
    Analyzed(FileReport),
    Failed(Diagnostic),
    Excluded(String),
    Cancelled,
}

impl<'a> FolderAnalyzer<'a> {
    pub fn new(config: &'a AnalyzerConfig) -> Self {
        Self {
            config,
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn analyze(&self, root: &Path) -> Result<FolderReport> {
        let root = absolute(root);
        check_root(&root)?;
        info!(
            root = %root.display(),
            concurrency = self.config.concurrency,
            "analyzing folder"
        );

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.config.concurrency)
            .build()
            .map_err(|err| AnalysisError::io(&root, std::io::Error::other(err)))?;

        let files = FileAnalyzer::new(self.config, &root);
        let scanner = FileScanner::new(self.config);
        let outcomes: Vec<Outcome> = pool.install(|| {
            scanner
                .walk(&root)
                .take_while(|_| !self.cancel.is_cancelled())
                .par_bridge()
                .map(|entry| self.visit(&files, &root, entry))
                .collect()
        });

        let report = self.collect(root, outcomes);
        info!(
            files = report.summary_counts.files_analyzed,
            failed = report.summary_counts.files_failed,
            skipped = report.summary_counts.files_skipped,
            excluded = report.excluded_paths.len(),
            cancelled = report.cancelled,
            "folder analysis finished"
        );
        Ok(report)
    }

    fn visit(&self, files: &FileAnalyzer, root: &Path, entry: WalkEntry) -> Outcome {
        match entry {
            WalkEntry::Excluded(path) => Outcome::Excluded(relative_path(root, &path)),
            WalkEntry::Error { path, error } => {
                let relative = relative_path(root, &path);
                warn!(path = %relative, error = %error, "cannot read directory entry");
                Outcome::Failed(AnalysisError::io(&path, error.into()).to_diagnostic(&relative))
            }
            WalkEntry::File(_) if self.cancel.is_cancelled() => Outcome::Cancelled,
            WalkEntry::File(path) => match files.analyze(&path) {
                Ok(report) => Outcome::Analyzed(report),
                Err(err) => {
                    let relative = relative_path(root, &path);
                    if err.kind() == DiagnosticKind::UnsupportedLanguage {
                        debug!(path = %relative, "skipping file with unsupported language");
                    } else {
                        warn!(path = %relative, error = %err, "failed to analyze file");
                    }
                    Outcome::Failed(err.to_diagnostic(&relative))
                }
            },
        }
    }

    fn collect(&self, root: PathBuf, outcomes: Vec<Outcome>) -> FolderReport {
        let mut files = Vec::new();
        let mut errors = Vec::new();
        let mut excluded_paths = Vec::new();
        let mut summary = SummaryCounts::default();
        let mut cancelled = self.cancel.is_cancelled();

        for outcome in outcomes {
            match outcome {
                Outcome::Analyzed(report) => files.push(report),
                Outcome::Failed(diagnostic) => {
                    if diagnostic.kind == DiagnosticKind::UnsupportedLanguage {
                        summary.files_skipped += 1;
                    } else {
                        summary.files_failed += 1;
                    }
                    errors.push(diagnostic);
                }
                Outcome::Excluded(path) => excluded_paths.push(path),
                Outcome::Cancelled => cancelled = true,
            }
        }

        files.sort_by(|a, b| a.file.relative_path.cmp(&b.file.relative_path));
        errors.sort_by(|a, b| a.path.cmp(&b.path).then(a.kind.cmp(&b.kind)));
        excluded_paths.sort();
        for report in &files {
            summary.record(report);
        }

        FolderReport {
            root,
            files,
            errors,
            excluded_paths,
            summary_counts: summary,
            cancelled,
        }
    }
}

fn read(path: &Path) -> Result<Vec<u8>> {
    fs::read(path).map_err(|err| AnalysisError::io(path, err))
}

fn check_root(root: &Path) -> Result<()> {
    let missing = || AnalysisError::RootNotFound {
        path: root.to_path_buf(),
    };
    let denied = || AnalysisError::RootPermissionDenied {
        path: root.to_path_buf(),
    };
    let metadata = match fs::metadata(root) {
        Ok(metadata) => metadata,
        Err(err) if err.kind() == ErrorKind::NotFound => return Err(missing()),
        Err(err) if err.kind() == ErrorKind::PermissionDenied => return Err(denied()),
        Err(err) => return Err(AnalysisError::io(root, err)),
    };
    if !metadata.is_dir() {
        return Err(missing());
    }
    match fs::read_dir(root) {
        Ok(_) => Ok(()),
        Err(err) if err.kind() == ErrorKind::PermissionDenied => Err(denied()),
        Err(err) => Err(AnalysisError::io(root, err)),
    }
}

fn absolute(path: &Path) -> PathBuf {
    if path.is_absolute() {
        return path.to_path_buf();
    }
    std::env::current_dir()
        .map(|cwd| cwd.join(path))
        .unwrap_or_else(|_| path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn unsupported_extension_is_not_a_parse_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("notes.txt");
        fs::write(&path, "hello").unwrap();
        let config = AnalyzerConfig::default();
        let err = FileAnalyzer::new(&config, dir.path())
            .analyze(&path)
            .unwrap_err();
        assert!(matches!(err, AnalysisError::UnsupportedLanguage { .. }));
    }

    #[test]
    fn shebang_detects_extensionless_scripts() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("tool");
        fs::write(&path, "#!/usr/bin/env python3\ndef main():\n    pass\n").unwrap();
        let config = AnalyzerConfig::default();
        let report = FileAnalyzer::new(&config, dir.path()).analyze(&path).unwrap();
        assert_eq!(report.file.relative_path, "tool");
        assert_eq!(report.functions[0].name, "main");
    }

    #[test]
    fn tolerated_syntax_error_is_reported_on_the_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("broken.py");
        fs::write(&path, "def ok():\n    pass\n\ndef broken(:\n").unwrap();
        let config = AnalyzerConfig::default().with_tolerate_syntax_errors(true);
        let report = FileAnalyzer::new(&config, dir.path()).analyze(&path).unwrap();
        assert!(report
            .errors
            .iter()
            .any(|d| d.kind == DiagnosticKind::ParseError));
    }

    #[test]
    fn missing_root_is_fatal() {
        let dir = TempDir::new().unwrap();
        let config = AnalyzerConfig::default();
        let err = FolderAnalyzer::new(&config)
            .analyze(&dir.path().join("absent"))
            .unwrap_err();
        assert!(matches!(err, AnalysisError::RootNotFound { .. }));
        assert!(err.is_fatal());
    }

    #[test]
    fn cancelled_before_start_analyzes_nothing() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a.py"), "def a():\n    pass\n").unwrap();
        let config = AnalyzerConfig::default();
        let token = CancellationToken::new();
        token.cancel();
        let report = FolderAnalyzer::new(&config)
            .with_cancellation(token)
            .analyze(dir.path())
            .unwrap();
        assert!(report.cancelled);
        assert!(report.files.is_empty());
    }
}

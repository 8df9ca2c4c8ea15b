use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::language::Language;

/// Directory names skipped by default in addition to hidden ones.
pub const DEFAULT_IGNORED_DIRS: &[&str] = &["__pycache__", "node_modules"];

const DEFAULT_EXTENSIONS: &[(&str, Language)] = &[
    ("py", Language::Python),
    ("pyi", Language::Python),
    ("java", Language::Java),
    ("go", Language::Go),
    ("c", Language::C),
    ("h", Language::C),
    ("cpp", Language::Cpp),
    ("cc", Language::Cpp),
    ("cxx", Language::Cpp),
    ("hpp", Language::Cpp),
    ("hh", Language::Cpp),
    ("hxx", Language::Cpp),
];

/// Immutable settings shared by the detector, the file analyzer and the
/// folder analyzer. Built once per run and passed by reference.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, rename_all = "camelCase")]
pub struct AnalyzerConfig {
    /// Lower-case extension (without dot) to grammar.
    pub extensions: BTreeMap<String, Language>,
    /// Skip directories and files whose name starts with `.`.
    pub exclude_hidden: bool,
    /// Directory names skipped wherever they appear below the root.
    pub ignored_dirs: Vec<String>,
    /// Upper bound on files parsed concurrently.
    pub concurrency: usize,
    /// Keep extracting files with syntax errors and report the error on the file.
    pub tolerate_syntax_errors: bool,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            extensions: DEFAULT_EXTENSIONS
                .iter()
                .map(|(ext, language)| (ext.to_string(), *language))
                .collect(),
            exclude_hidden: true,
            ignored_dirs: DEFAULT_IGNORED_DIRS.iter().map(|d| d.to_string()).collect(),
            concurrency: default_concurrency(),
            tolerate_syntax_errors: false,
        }
    }
}

impl AnalyzerConfig {
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn with_ignored_dirs<I, S>(mut self, dirs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.ignored_dirs.extend(dirs.into_iter().map(Into::into));
        self.ignored_dirs.sort();
        self.ignored_dirs.dedup();
        self
    }

    pub fn with_hidden(mut self, include_hidden: bool) -> Self {
        self.exclude_hidden = !include_hidden;
        self
    }

    pub fn with_tolerate_syntax_errors(mut self, tolerate: bool) -> Self {
        self.tolerate_syntax_errors = tolerate;
        self
    }

    pub fn language_for_extension(&self, extension: &str) -> Option<Language> {
        if let Some(language) = self.extensions.get(extension) {
            return Some(*language);
        }
        self.extensions
            .get(extension.to_ascii_lowercase().as_str())
            .copied()
    }

    /// Whether an entry with this file name is skipped during the folder walk.
    pub fn is_excluded_name(&self, name: &str, is_dir: bool) -> bool {
        if self.exclude_hidden && name.starts_with('.') && name != "." && name != ".." {
            return true;
        }
        is_dir && self.ignored_dirs.iter().any(|ignored| ignored == name)
    }
}

fn default_concurrency() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
}

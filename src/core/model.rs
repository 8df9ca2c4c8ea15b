//! The unified, language-agnostic structural model and its JSON wire schema.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

use super::calls::CallSite;
use super::language::Language;
use crate::error::Diagnostic;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SourceFile {
    pub path: PathBuf,
    /// Path relative to the analysis root, always `/` separated.
    pub relative_path: String,
    pub language: Language,
}

impl SourceFile {
    pub fn new(path: PathBuf, relative_path: impl Into<String>, language: Language) -> Self {
        Self {
            path,
            relative_path: relative_path.into(),
            language,
        }
    }

    /// Root-relative path segments with the extension of the last one removed.
    pub fn module_parts(&self) -> Vec<&str> {
        let mut parts: Vec<&str> = self
            .relative_path
            .split('/')
            .filter(|part| !part.is_empty())
            .collect();
        if let Some(last) = parts.last_mut() {
            if let Some((stem, _)) = last.rsplit_once('.') {
                if !stem.is_empty() {
                    *last = stem;
                }
            }
        }
        parts
    }

    /// Root-relative directory of the file, empty at the root.
    pub fn relative_dir(&self) -> &str {
        self.relative_path
            .rsplit_once('/')
            .map(|(dir, _)| dir)
            .unwrap_or("")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Parameter {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub type_annotation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<String>,
}

impl Parameter {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_annotation: None,
            default_value: None,
        }
    }

    pub fn with_type(mut self, type_annotation: Option<String>) -> Self {
        self.type_annotation = type_annotation.filter(|t| !t.is_empty());
        self
    }

    pub fn with_default(mut self, default_value: Option<String>) -> Self {
        self.default_value = default_value.filter(|d| !d.is_empty());
        self
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum FunctionKind {
    Function,
    Method,
    Constructor,
    Destructor,
    Operator,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Function {
    pub name: String,
    pub qualified_name: String,
    /// `name(types) -> return`, built from the declared types.
    pub signature: String,
    pub kind: FunctionKind,
    pub parameters: Vec<Parameter>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub return_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub docstring: Option<String>,
    pub is_async: bool,
    pub is_declaration: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub type_parameters: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub decorators: Vec<String>,
    /// Receiver or owning type named by the definition when that type is not
    /// declared in the same file.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub receiver: Option<String>,
    pub line_start: usize,
    pub line_end: usize,
    pub calls: Vec<CallSite>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub accessed_attributes: Vec<String>,
}

impl Function {
    pub fn parameter_names(&self) -> Vec<&str> {
        self.parameters.iter().map(|p| p.name.as_str()).collect()
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ClassKind {
    Class,
    Struct,
    Interface,
    Enum,
    Union,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Attribute {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub type_annotation: Option<String>,
}

impl Attribute {
    pub fn new(name: impl Into<String>, type_annotation: Option<String>) -> Self {
        Self {
            name: name.into(),
            type_annotation: type_annotation.filter(|t| !t.is_empty()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Class {
    pub name: String,
    pub qualified_name: String,
    pub kind: ClassKind,
    pub attributes: Vec<Attribute>,
    pub methods: Vec<Function>,
    pub parents: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub interfaces: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub type_parameters: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub docstring: Option<String>,
    pub line_start: usize,
    pub line_end: usize,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<Diagnostic>,
}

impl Class {
    pub fn method(&self, name: &str) -> Option<&Function> {
        self.methods.iter().find(|m| m.name == name)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ImportKind {
    Absolute,
    Relative,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Import {
    pub raw: String,
    /// Absolute module, package or header path.
    pub target: String,
    pub kind: ImportKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
    pub line: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct FileReport {
    #[serde(flatten)]
    pub file: SourceFile,
    /// Top-level functions only; methods live on their class.
    pub functions: Vec<Function>,
    pub classes: Vec<Class>,
    pub imports: Vec<Import>,
    pub errors: Vec<Diagnostic>,
}

impl FileReport {
    pub fn new(file: SourceFile) -> Self {
        Self {
            file,
            functions: Vec::new(),
            classes: Vec::new(),
            imports: Vec::new(),
            errors: Vec::new(),
        }
    }

    pub fn function(&self, name: &str) -> Option<&Function> {
        self.functions.iter().find(|f| f.name == name)
    }

    pub fn class(&self, name: &str) -> Option<&Class> {
        self.classes.iter().find(|c| c.name == name)
    }

    /// Top-level functions followed by every class's methods.
    pub fn all_functions(&self) -> impl Iterator<Item = &Function> {
        self.functions
            .iter()
            .chain(self.classes.iter().flat_map(|c| c.methods.iter()))
    }

    pub fn method_count(&self) -> usize {
        self.classes.iter().map(|c| c.methods.len()).sum()
    }

    pub fn call_site_count(&self) -> usize {
        self.all_functions().map(|f| f.calls.len()).sum()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SummaryCounts {
    pub files_analyzed: usize,
    pub files_failed: usize,
    pub files_skipped: usize,
    pub functions: usize,
    pub classes: usize,
    pub methods: usize,
    pub imports: usize,
    pub call_sites: usize,
    /// Analyzed files per language tag.
    pub languages: BTreeMap<String, usize>,
}

impl SummaryCounts {
    pub fn record(&mut self, report: &FileReport) {
        self.files_analyzed += 1;
        self.functions += report.functions.len();
        self.classes += report.classes.len();
        self.methods += report.method_count();
        self.imports += report.imports.len();
        self.call_sites += report.call_site_count();
        *self
            .languages
            .entry(report.file.language.as_str().to_string())
            .or_default() += 1;
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct FolderReport {
    pub root: PathBuf,
    pub files: Vec<FileReport>,
    pub errors: Vec<Diagnostic>,
    pub excluded_paths: Vec<String>,
    pub summary_counts: SummaryCounts,
    pub cancelled: bool,
}

impl FolderReport {
    pub fn file(&self, relative_path: &str) -> Option<&FileReport> {
        self.files
            .iter()
            .find(|f| f.file.relative_path == relative_path)
    }
}

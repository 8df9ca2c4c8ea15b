//! Error types for the analysis pipeline.
//!
//! File-local failures ([`AnalysisError::UnsupportedLanguage`], [`AnalysisError::Parse`],
//! [`AnalysisError::Io`]) are caught by the folder analyzer and turned into
//! [`Diagnostic`] entries; only root-level failures abort a folder run.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// A grammar front-end could not build a clean syntax tree.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{}:{line}:{column}: {message}", path.display())]
pub struct ParseError {
    pub path: PathBuf,
    /// 1-based line of the first syntax error (0 when unknown).
    pub line: usize,
    /// 1-based column of the first syntax error (0 when unknown).
    pub column: usize,
    pub message: String,
}

impl ParseError {
    pub fn new(path: &Path, line: usize, column: usize, message: impl Into<String>) -> Self {
        Self {
            path: path.to_path_buf(),
            line,
            column,
            message: message.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("unsupported language for file {}", path.display())]
    UnsupportedLanguage { path: PathBuf },

    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("analysis root not found: {}", path.display())]
    RootNotFound { path: PathBuf },

    #[error("permission denied on analysis root: {}", path.display())]
    RootPermissionDenied { path: PathBuf },
}

impl AnalysisError {
    pub fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    /// Only root-level failures stop a folder analysis.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::RootNotFound { .. } | Self::RootPermissionDenied { .. }
        )
    }

    pub fn kind(&self) -> DiagnosticKind {
        match self {
            Self::UnsupportedLanguage { .. } => DiagnosticKind::UnsupportedLanguage,
            Self::Parse(_) => DiagnosticKind::ParseError,
            Self::Io { .. } | Self::RootNotFound { .. } | Self::RootPermissionDenied { .. } => {
                DiagnosticKind::IoError
            }
        }
    }

    /// Convert into a report entry keyed by the root-relative path.
    pub fn to_diagnostic(&self, relative_path: &str) -> Diagnostic {
        let line = match self {
            Self::Parse(err) if err.line > 0 => Some(err.line),
            _ => None,
        };
        let message = match self {
            Self::Parse(err) => err.message.clone(),
            Self::Io { source, .. } => source.to_string(),
            other => other.to_string(),
        };
        Diagnostic {
            kind: self.kind(),
            path: relative_path.to_string(),
            message,
            line,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "camelCase")]
pub enum DiagnosticKind {
    UnsupportedLanguage,
    ParseError,
    ResolutionAmbiguity,
    IoError,
}

/// Serializable error or warning entry carried by reports.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub path: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line: Option<usize>,
}

impl Diagnostic {
    pub fn ambiguity(path: &str, message: impl Into<String>, line: Option<usize>) -> Self {
        Self {
            kind: DiagnosticKind::ResolutionAmbiguity,
            path: path.to_string(),
            message: message.into(),
            line,
        }
    }
}

pub type Result<T> = std::result::Result<T, AnalysisError>;

//! # structura
//!
//! Structural code analysis for Python, Java, Go, C and C++.
//!
//! Every supported file is parsed with its tree-sitter grammar and reduced to
//! one language-agnostic model: functions, classes with their methods and
//! attributes, imports resolved to absolute targets, inheritance, and the call
//! sites inside each function body.
//!
//! - [`core::FileAnalyzer`] analyzes one file against an analysis root.
//! - [`core::FolderAnalyzer`] walks a directory tree and analyzes files in
//!   parallel, collecting per-file failures instead of aborting.
//! - [`core::StructureGraph`] links the entities of a folder report into a
//!   cross-file graph.
//! - [`formatters::JsonFormatter`] writes reports as JSON.

pub mod core;
pub mod error;
pub mod formatters;
pub mod parsers;

pub use crate::core::{AnalyzerConfig, FileAnalyzer, FolderAnalyzer};
pub use crate::error::{AnalysisError, Diagnostic, DiagnosticKind, ParseError};

//! Raw facts emitted by the grammar front-ends.
//!
//! Front-ends only report what is written in the file. Qualified names,
//! method ownership, parameter de-duplication and import resolution are the
//! model builder's job.

use crate::core::calls::CallType;
use crate::core::model::{Attribute, ClassKind, FunctionKind, Parameter};

/// Index of a class inside one file's event stream.
pub type ClassId = usize;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtractionEvent {
    /// Java `package` / Go `package` clause.
    Package(String),
    Import(RawImport),
    Class(RawClass),
    Function(RawFunction),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportOrigin {
    Absolute,
    /// Python `from ..x import y`, `level` counts the leading dots.
    PythonRelative { level: usize },
    /// C/C++ `#include "header.h"`.
    LocalInclude,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawImport {
    pub raw: String,
    /// Module path as written without the leading dots, or the header path.
    pub path: String,
    pub origin: ImportOrigin,
    pub alias: Option<String>,
    pub line: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawClass {
    pub id: ClassId,
    /// Enclosing namespaces and classes, outermost first.
    pub scope: Vec<String>,
    pub name: String,
    pub kind: ClassKind,
    pub parents: Vec<String>,
    pub interfaces: Vec<String>,
    pub type_parameters: Vec<String>,
    pub docstring: Option<String>,
    pub attributes: Vec<Attribute>,
    pub line_start: usize,
    pub line_end: usize,
}

impl RawClass {
    pub fn new(id: ClassId, scope: Vec<String>, name: impl Into<String>, kind: ClassKind) -> Self {
        Self {
            id,
            scope,
            name: name.into(),
            kind,
            parents: Vec::new(),
            interfaces: Vec::new(),
            type_parameters: Vec::new(),
            docstring: None,
            attributes: Vec::new(),
            line_start: 0,
            line_end: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Owner {
    /// Lexically nested inside the class with this id.
    Class(ClassId),
    /// Named owner: a Go receiver type or the `Foo` of `Foo::bar`.
    Type(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawCall {
    pub callee: String,
    pub name: String,
    pub call_type: CallType,
    pub line: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawFunction {
    pub scope: Vec<String>,
    pub owner: Option<Owner>,
    pub name: String,
    pub kind: FunctionKind,
    /// Unnamed parameters carry an empty name.
    pub parameters: Vec<Parameter>,
    pub return_type: Option<String>,
    pub docstring: Option<String>,
    pub is_async: bool,
    pub is_declaration: bool,
    pub type_parameters: Vec<String>,
    pub decorators: Vec<String>,
    pub calls: Vec<RawCall>,
    /// Members reached through the method's own receiver.
    pub accessed_attributes: Vec<String>,
    pub line_start: usize,
    pub line_end: usize,
}

impl RawFunction {
    pub fn new(scope: Vec<String>, name: impl Into<String>, kind: FunctionKind) -> Self {
        Self {
            scope,
            owner: None,
            name: name.into(),
            kind,
            parameters: Vec::new(),
            return_type: None,
            docstring: None,
            is_async: false,
            is_declaration: false,
            type_parameters: Vec::new(),
            decorators: Vec::new(),
            calls: Vec::new(),
            accessed_attributes: Vec::new(),
            line_start: 0,
            line_end: 0,
        }
    }

    pub fn owned_by(mut self, owner: Owner) -> Self {
        self.owner = Some(owner);
        self
    }
}

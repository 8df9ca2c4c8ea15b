pub mod c;
pub mod cfamily;
pub mod common;
pub mod cpp;
pub mod events;
pub mod go;
pub mod java;
pub mod python;

use std::path::Path;
use tree_sitter::Tree;

use crate::core::Language;
use crate::error::ParseError;
use common::{first_syntax_error, TreeSitterParser};
use events::ExtractionEvent;

/// One grammar front-end: source text in, raw extraction events out.
pub trait LanguageParser {
    fn language(&self) -> Language;

    fn grammar(&self) -> tree_sitter::Language;

    fn extract(&self, tree: &Tree, source: &str) -> Vec<ExtractionEvent>;

    /// Parse and reject trees containing ERROR or MISSING nodes.
    fn parse(&self, path: &Path, source: &str) -> Result<Tree, ParseError> {
        let tree = self.parse_lenient(path, source)?;
        match first_syntax_error(&tree, path, source.as_bytes()) {
            Some(err) => Err(err),
            None => Ok(tree),
        }
    }

    /// Parse, keeping whatever tree the grammar recovered.
    fn parse_lenient(&self, path: &Path, source: &str) -> Result<Tree, ParseError> {
        TreeSitterParser::new(self.grammar(), path)?.parse(path, source)
    }
}

/// The closed set of supported grammars.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrontEnd {
    Python(python::PythonParser),
    Java(java::JavaParser),
    Go(go::GoParser),
    C(c::CParser),
    Cpp(cpp::CppParser),
}

impl FrontEnd {
    pub fn for_language(language: Language) -> Self {
        match language {
            Language::Python => FrontEnd::Python(python::PythonParser),
            Language::Java => FrontEnd::Java(java::JavaParser),
            Language::Go => FrontEnd::Go(go::GoParser),
            Language::C => FrontEnd::C(c::CParser),
            Language::Cpp => FrontEnd::Cpp(cpp::CppParser),
        }
    }

    fn inner(&self) -> &dyn LanguageParser {
        match self {
            FrontEnd::Python(parser) => parser,
            FrontEnd::Java(parser) => parser,
            FrontEnd::Go(parser) => parser,
            FrontEnd::C(parser) => parser,
            FrontEnd::Cpp(parser) => parser,
        }
    }
}

impl LanguageParser for FrontEnd {
    fn language(&self) -> Language {
        self.inner().language()
    }

    fn grammar(&self) -> tree_sitter::Language {
        self.inner().grammar()
    }

    fn extract(&self, tree: &Tree, source: &str) -> Vec<ExtractionEvent> {
        self.inner().extract(tree, source)
    }
}

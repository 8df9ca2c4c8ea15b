use tree_sitter::Tree;

use super::cfamily::extract_translation_unit;
use super::events::ExtractionEvent;
use super::LanguageParser;
use crate::core::Language;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CppParser;

impl LanguageParser for CppParser {
    fn language(&self) -> Language {
        Language::Cpp
    }

    fn grammar(&self) -> tree_sitter::Language {
        tree_sitter_cpp::language()
    }

    fn extract(&self, tree: &Tree, source: &str) -> Vec<ExtractionEvent> {
        extract_translation_unit(Language::Cpp, &tree.root_node(), source.as_bytes())
    }
}

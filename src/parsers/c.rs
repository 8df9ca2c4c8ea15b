use tree_sitter::Tree;

use super::cfamily::extract_translation_unit;
use super::events::ExtractionEvent;
use super::LanguageParser;
use crate::core::Language;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CParser;

impl LanguageParser for CParser {
    fn language(&self) -> Language {
        Language::C
    }

    fn grammar(&self) -> tree_sitter::Language {
        tree_sitter_c::language()
    }

    fn extract(&self, tree: &Tree, source: &str) -> Vec<ExtractionEvent> {
        extract_translation_unit(Language::C, &tree.root_node(), source.as_bytes())
    }
}

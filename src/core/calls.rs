use serde::{Deserialize, Serialize};
use tree_sitter::Node as TSNode;

use super::language::Language;
use crate::parsers::common::{collapse_whitespace, extract_text};
use crate::parsers::events::RawCall;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CallType {
    Simple,      // function_name()
    Method,      // self.method(), obj->method()
    Qualified,   // module.function(), ns::function()
    Constructor, // new ClassName(), ClassName()
    Dynamic,     // handlers[i](), get_fn()()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallSite {
    /// Qualified name of the function containing the call.
    pub caller: String,
    /// Callee expression as written, whitespace collapsed.
    pub callee: String,
    /// Final segment of the callee.
    pub name: String,
    pub call_type: CallType,
    pub line: usize,
}

/// Collects call sites from one function body. Calls inside nested
/// functions and lambdas are attributed to the body being walked.
pub struct CallSiteExtractor {
    language: Language,
    call_sites: Vec<RawCall>,
}

impl CallSiteExtractor {
    pub fn new(language: Language) -> Self {
        Self {
            language,
            call_sites: Vec::new(),
        }
    }

    pub fn extract_from_body(&mut self, body: &TSNode, source: &[u8]) -> Vec<RawCall> {
        self.call_sites.clear();
        self.traverse(body, source);
        std::mem::take(&mut self.call_sites)
    }

    /// Names of members read or written through `receiver` (`self.x`,
    /// `this.x`, `this->x`, Go `s.x`) in first-use order. Member calls are
    /// call sites, not attribute accesses.
    pub fn extract_attribute_accesses(
        &self,
        body: &TSNode,
        source: &[u8],
        receiver: &str,
    ) -> Vec<String> {
        let mut accessed = Vec::new();
        collect_member_accesses(body, source, receiver, &mut accessed);
        accessed
    }

    fn traverse(&mut self, node: &TSNode, source: &[u8]) {
        if self.is_call_node(node) {
            if let Some(call) = self.extract_call_site(node, source) {
                self.call_sites.push(call);
            }
        }

        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            self.traverse(&child, source);
        }
    }

    fn is_call_node(&self, node: &TSNode) -> bool {
        matches!(
            node.kind(),
            "call" |                       // Python
            "call_expression" |            // Go/C/C++
            "method_invocation" |          // Java
            "object_creation_expression" | // Java `new`
            "new_expression" // C++ `new`
        )
    }

    fn extract_call_site(&self, node: &TSNode, source: &[u8]) -> Option<RawCall> {
        let (callee, call_type) = match node.kind() {
            "call" | "call_expression" => {
                let function_node = node.child_by_field_name("function")?;
                let callee = collapse_whitespace(extract_text(&function_node, source));
                let call_type = self.determine_call_type(&function_node, &callee, source);
                (callee, call_type)
            }
            "method_invocation" => self.java_invocation(node, source)?,
            "object_creation_expression" | "new_expression" => {
                let type_node = node.child_by_field_name("type")?;
                (
                    collapse_whitespace(extract_text(&type_node, source)),
                    CallType::Constructor,
                )
            }
            _ => return None,
        };

        if callee.is_empty() {
            return None;
        }

        Some(RawCall {
            name: final_segment(&callee),
            callee,
            call_type,
            line: node.start_position().row + 1,
        })
    }

    fn java_invocation(&self, node: &TSNode, source: &[u8]) -> Option<(String, CallType)> {
        let name = extract_text(&node.child_by_field_name("name")?, source);
        let Some(object) = node.child_by_field_name("object") else {
            return Some((name.to_string(), CallType::Simple));
        };

        let object_text = collapse_whitespace(extract_text(&object, source));
        let call_type = match object.kind() {
            "this" | "super" => CallType::Method,
            "identifier" | "field_access" | "scoped_identifier" => CallType::Qualified,
            _ => CallType::Method,
        };
        Some((format!("{object_text}.{name}"), call_type))
    }

    fn determine_call_type(&self, function_node: &TSNode, callee: &str, source: &[u8]) -> CallType {
        match function_node.kind() {
            "identifier" => {
                if self.language == Language::Python && looks_like_type_name(callee) {
                    CallType::Constructor
                } else {
                    CallType::Simple
                }
            }
            // Python obj.attr / Go pkg.Func
            "attribute" | "selector_expression" => {
                let receiver = function_node
                    .child_by_field_name("object")
                    .or_else(|| function_node.child_by_field_name("operand"));
                match receiver {
                    Some(receiver) => self.receiver_call_type(&receiver, source),
                    None => CallType::Method,
                }
            }
            "field_expression" => CallType::Method, // obj.method(), ptr->method()
            "qualified_identifier" => CallType::Qualified, // ns::func(), Class::method()
            "template_function" => match function_node.child_by_field_name("name") {
                Some(name) if name.kind() == "qualified_identifier" => CallType::Qualified,
                _ => CallType::Simple,
            },
            _ => CallType::Dynamic,
        }
    }

    fn receiver_call_type(&self, receiver: &TSNode, source: &[u8]) -> CallType {
        match dotted_root(receiver) {
            Some(root) => match extract_text(&root, source) {
                "self" | "cls" | "this" => CallType::Method,
                _ => CallType::Qualified,
            },
            None => CallType::Method, // super().x(), foo().bar(), items[0].run()
        }
    }
}

fn collect_member_accesses(node: &TSNode, source: &[u8], receiver: &str, out: &mut Vec<String>) {
    if let Some(member) = member_access(node, source, receiver) {
        if !out.iter().any(|existing| existing == member) {
            out.push(member.to_string());
        }
    }
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        collect_member_accesses(&child, source, receiver, out);
    }
}

fn member_access<'s>(node: &TSNode, source: &'s [u8], receiver: &str) -> Option<&'s str> {
    let (object, member) = match node.kind() {
        "attribute" => (
            node.child_by_field_name("object")?,
            node.child_by_field_name("attribute")?,
        ),
        "field_access" => (
            node.child_by_field_name("object")?,
            node.child_by_field_name("field")?,
        ),
        "field_expression" => (
            node.child_by_field_name("argument")?,
            node.child_by_field_name("field")?,
        ),
        "selector_expression" => (
            node.child_by_field_name("operand")?,
            node.child_by_field_name("field")?,
        ),
        _ => return None,
    };
    if extract_text(&object, source) != receiver {
        return None;
    }
    let called = node.parent().is_some_and(|parent| {
        matches!(parent.kind(), "call" | "call_expression")
            && parent
                .child_by_field_name("function")
                .is_some_and(|function| function.id() == node.id())
    });
    (!called).then(|| extract_text(&member, source))
}

/// Leftmost identifier of an `a.b.c` chain made only of identifiers.
fn dotted_root<'t>(node: &TSNode<'t>) -> Option<TSNode<'t>> {
    match node.kind() {
        "identifier" | "field_identifier" | "package_identifier" => Some(*node),
        "attribute" | "selector_expression" => {
            let receiver = node
                .child_by_field_name("object")
                .or_else(|| node.child_by_field_name("operand"))?;
            dotted_root(&receiver)
        }
        _ => None,
    }
}

fn looks_like_type_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_uppercase() => {
            !name.contains('_') && chars.any(|c| c.is_lowercase())
        }
        _ => false,
    }
}

/// Last `.`, `::` or `->` separated segment, template arguments removed.
pub fn final_segment(callee: &str) -> String {
    let mut depth = 0usize;
    let mut stripped = String::with_capacity(callee.len());
    for c in callee.chars() {
        match c {
            '<' => depth += 1,
            '>' if depth > 0 => depth -= 1,
            _ if depth == 0 => stripped.push(c),
            _ => {}
        }
    }

    let cut = [".", "::", "->"]
        .iter()
        .filter_map(|sep| stripped.rfind(sep).map(|idx| idx + sep.len()))
        .max()
        .unwrap_or(0);
    let segment = stripped[cut..].trim();
    if segment.is_empty() {
        stripped.trim().to_string()
    } else {
        segment.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn final_segment_handles_every_separator() {
        assert_eq!(final_segment("self.add"), "add");
        assert_eq!(final_segment("fmt.Println"), "Println");
        assert_eq!(final_segment("std::make_shared<Foo>"), "make_shared");
        assert_eq!(final_segment("node->next"), "next");
        assert_eq!(final_segment("super().__init__"), "__init__");
        assert_eq!(final_segment("greet"), "greet");
    }

    #[test]
    fn attribute_accesses_skip_member_calls() {
        let source = "def run(self):\n    self.count += self.step\n    self.flush()\n    other.count = 1\n    return self.count\n";
        let mut parser = tree_sitter::Parser::new();
        parser.set_language(tree_sitter_python::language()).unwrap();
        let tree = parser.parse(source, None).unwrap();
        let function = tree.root_node().named_child(0).unwrap();
        let body = function.child_by_field_name("body").unwrap();
        let extractor = CallSiteExtractor::new(Language::Python);
        assert_eq!(
            extractor.extract_attribute_accesses(&body, source.as_bytes(), "self"),
            vec!["count", "step"]
        );
    }

    #[test]
    fn type_name_heuristic() {
        assert!(looks_like_type_name("Calculator"));
        assert!(!looks_like_type_name("MAX_SIZE"));
        assert!(!looks_like_type_name("print"));
        assert!(!looks_like_type_name("X"));
    }
}

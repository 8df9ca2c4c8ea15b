use tree_sitter::{Node as TSNode, Tree};

use super::common::{
    children_by_field, collapse_whitespace, extract_text, find_child_by_kind, javadoc_above,
    line_span, named_children, node_text,
};
use super::events::{
    ClassId, ExtractionEvent, ImportOrigin, Owner, RawClass, RawFunction, RawImport,
};
use super::LanguageParser;
use crate::core::calls::CallSiteExtractor;
use crate::core::model::{Attribute, ClassKind, FunctionKind, Parameter};
use crate::core::Language;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct JavaParser;

impl LanguageParser for JavaParser {
    fn language(&self) -> Language {
        Language::Java
    }

    fn grammar(&self) -> tree_sitter::Language {
        tree_sitter_java::language()
    }

    fn extract(&self, tree: &Tree, source: &str) -> Vec<ExtractionEvent> {
        let mut extractor = JavaExtractor::new(source.as_bytes());
        extractor.extract_program(&tree.root_node());
        extractor.events
    }
}

struct JavaExtractor<'s> {
    source: &'s [u8],
    events: Vec<ExtractionEvent>,
    next_class_id: ClassId,
    calls: CallSiteExtractor,
}

impl<'s> JavaExtractor<'s> {
    fn new(source: &'s [u8]) -> Self {
        Self {
            source,
            events: Vec::new(),
            next_class_id: 0,
            calls: CallSiteExtractor::new(Language::Java),
        }
    }

    fn text(&self, node: &TSNode) -> &'s str {
        extract_text(node, self.source)
    }

    fn extract_program(&mut self, root: &TSNode) {
        for child in named_children(root) {
            match child.kind() {
                "package_declaration" => {
                    if let Some(name) = named_children(&child)
                        .into_iter()
                        .find(|n| matches!(n.kind(), "scoped_identifier" | "identifier"))
                    {
                        let package = self.text(&name).to_string();
                        self.events.push(ExtractionEvent::Package(package));
                    }
                }
                "import_declaration" => self.process_import(&child),
                _ => self.process_type(&child, &[]),
            }
        }
    }

    fn process_import(&mut self, node: &TSNode) {
        let raw = collapse_whitespace(self.text(node));
        let path: String = raw
            .trim_start_matches("import")
            .trim_start()
            .trim_start_matches("static ")
            .trim_end_matches(';')
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect();
        if path.is_empty() {
            return;
        }
        self.events.push(ExtractionEvent::Import(RawImport {
            raw,
            path,
            origin: ImportOrigin::Absolute,
            alias: None,
            line: node.start_position().row + 1,
        }));
    }

    fn process_type(&mut self, node: &TSNode, scope: &[String]) {
        let kind = match node.kind() {
            "class_declaration" | "record_declaration" => ClassKind::Class,
            "interface_declaration" | "annotation_type_declaration" => ClassKind::Interface,
            "enum_declaration" => ClassKind::Enum,
            _ => return,
        };
        let Some(name_node) = node.child_by_field_name("name") else {
            return;
        };
        let name = self.text(&name_node);
        let id = self.next_class_id;
        self.next_class_id += 1;

        let mut class = RawClass::new(id, scope.to_vec(), name, kind);
        (class.line_start, class.line_end) = line_span(node);
        class.docstring = javadoc_above(node, self.source);
        class.type_parameters = self.type_parameters(node);

        if let Some(superclass) = node.child_by_field_name("superclass") {
            if let Some(parent) = superclass.named_child(0) {
                class.parents.push(collapse_whitespace(self.text(&parent)));
            }
        }
        if let Some(interfaces) = node.child_by_field_name("interfaces") {
            class.interfaces = self.type_list(&interfaces);
        }
        if let Some(extends) = find_child_by_kind(node, "extends_interfaces") {
            class.parents.extend(self.type_list(&extends));
        }

        let body = node.child_by_field_name("body");
        let members = body.map(|b| self.members(&b)).unwrap_or_default();
        if let Some(body) = body.filter(|b| b.kind() == "enum_body") {
            class.attributes = named_children(&body)
                .into_iter()
                .filter(|c| c.kind() == "enum_constant")
                .filter_map(|c| c.child_by_field_name("name"))
                .map(|n| Attribute::new(self.text(&n), None))
                .collect();
        }
        class.attributes.extend(self.attributes(&members));
        self.events.push(ExtractionEvent::Class(class));

        let mut inner_scope = scope.to_vec();
        inner_scope.push(name.to_string());
        for member in members {
            match member.kind() {
                "method_declaration" => {
                    self.process_method(&member, &inner_scope, id, FunctionKind::Method)
                }
                "constructor_declaration" | "compact_constructor_declaration" => {
                    self.process_method(&member, &inner_scope, id, FunctionKind::Constructor)
                }
                _ => self.process_type(&member, &inner_scope),
            }
        }
    }

    /// Member declarations of a class, interface or enum body.
    fn members<'t>(&self, body: &TSNode<'t>) -> Vec<TSNode<'t>> {
        let mut members = Vec::new();
        for child in named_children(body) {
            if child.kind() == "enum_body_declarations" {
                members.extend(named_children(&child));
            } else {
                members.push(child);
            }
        }
        members
    }

    fn attributes(&self, members: &[TSNode]) -> Vec<Attribute> {
        let mut attributes = Vec::new();
        for member in members {
            if !matches!(member.kind(), "field_declaration" | "constant_declaration") {
                continue;
            }
            let field_type = node_text(member.child_by_field_name("type"), self.source);
            for declarator in children_by_field(member, "declarator") {
                if let Some(name) = declarator.child_by_field_name("name") {
                    attributes.push(Attribute::new(self.text(&name), field_type.clone()));
                }
            }
        }
        attributes
    }

    fn type_list(&self, node: &TSNode) -> Vec<String> {
        let mut types = Vec::new();
        for child in named_children(node) {
            if matches!(child.kind(), "type_list" | "interface_type_list") {
                types.extend(
                    named_children(&child)
                        .iter()
                        .map(|t| collapse_whitespace(self.text(t))),
                );
            } else {
                types.push(collapse_whitespace(self.text(&child)));
            }
        }
        types
    }

    fn type_parameters(&self, node: &TSNode) -> Vec<String> {
        let Some(params) = node.child_by_field_name("type_parameters") else {
            return Vec::new();
        };
        named_children(&params)
            .iter()
            .filter(|p| p.kind() == "type_parameter")
            .map(|p| {
                named_children(p)
                    .into_iter()
                    .find(|c| matches!(c.kind(), "type_identifier" | "identifier"))
                    .map(|c| self.text(&c).to_string())
                    .unwrap_or_else(|| collapse_whitespace(self.text(p)))
            })
            .collect()
    }

    fn process_method(&mut self, node: &TSNode, scope: &[String], owner: ClassId, kind: FunctionKind) {
        let Some(name_node) = node.child_by_field_name("name") else {
            return;
        };
        let mut function = RawFunction::new(scope.to_vec(), self.text(&name_node), kind)
            .owned_by(Owner::Class(owner));
        (function.line_start, function.line_end) = line_span(node);
        function.docstring = javadoc_above(node, self.source);
        function.type_parameters = self.type_parameters(node);
        function.return_type = node_text(node.child_by_field_name("type"), self.source);
        if let Some(params) = node.child_by_field_name("parameters") {
            function.parameters = self.extract_parameters(&params);
        }
        if let Some(modifiers) = find_child_by_kind(node, "modifiers") {
            function.decorators = named_children(&modifiers)
                .iter()
                .filter(|m| matches!(m.kind(), "marker_annotation" | "annotation"))
                .map(|m| collapse_whitespace(self.text(m).trim_start_matches('@')))
                .collect();
        }
        match node.child_by_field_name("body") {
            Some(body) => {
                function.calls = self.calls.extract_from_body(&body, self.source);
                function.accessed_attributes =
                    self.calls.extract_attribute_accesses(&body, self.source, "this");
            }
            None => function.is_declaration = true,
        }

        self.events.push(ExtractionEvent::Function(function));
    }

    fn extract_parameters(&self, params: &TSNode) -> Vec<Parameter> {
        let mut parameters = Vec::new();
        for param in named_children(params) {
            match param.kind() {
                "formal_parameter" => {
                    let name = node_text(param.child_by_field_name("name"), self.source);
                    let mut param_type = node_text(param.child_by_field_name("type"), self.source);
                    if let (Some(t), Some(dims)) = (
                        param_type.as_mut(),
                        node_text(param.child_by_field_name("dimensions"), self.source),
                    ) {
                        t.push_str(&dims);
                    }
                    parameters.push(Parameter::new(name.unwrap_or_default()).with_type(param_type));
                }
                "spread_parameter" => {
                    let children = named_children(&param);
                    let param_type = children
                        .iter()
                        .find(|c| !matches!(c.kind(), "modifiers" | "variable_declarator"))
                        .map(|t| format!("{}...", collapse_whitespace(self.text(t))));
                    let name = children
                        .iter()
                        .find(|c| c.kind() == "variable_declarator")
                        .and_then(|d| node_text(d.child_by_field_name("name"), self.source));
                    parameters.push(Parameter::new(name.unwrap_or_default()).with_type(param_type));
                }
                _ => {}
            }
        }
        parameters
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    fn extract(source: &str) -> Vec<ExtractionEvent> {
        let parser = JavaParser;
        let tree = parser.parse(Path::new("T.java"), source).unwrap();
        parser.extract(&tree, source)
    }

    #[test]
    fn class_with_superclass_and_interfaces() {
        let events = extract(
            "package zoo;\nimport java.util.List;\n/** A dog. */\npublic class Dog extends Animal implements Pet, Comparable<Dog> {\n  private String name;\n  public Dog(String name) { this.name = name; }\n  @Override\n  public void speak() { System.out.println(name); }\n}\n",
        );
        assert_eq!(events[0], ExtractionEvent::Package("zoo".to_string()));
        let class = events
            .iter()
            .find_map(|e| match e {
                ExtractionEvent::Class(c) => Some(c),
                _ => None,
            })
            .unwrap();
        assert_eq!(class.parents, vec!["Animal"]);
        assert_eq!(class.interfaces, vec!["Pet", "Comparable<Dog>"]);
        assert_eq!(class.docstring.as_deref(), Some("A dog."));
        assert_eq!(class.attributes[0].name, "name");
        assert_eq!(class.attributes[0].type_annotation.as_deref(), Some("String"));

        let methods: Vec<&RawFunction> = events
            .iter()
            .filter_map(|e| match e {
                ExtractionEvent::Function(f) => Some(f),
                _ => None,
            })
            .collect();
        assert_eq!(methods[0].kind, FunctionKind::Constructor);
        assert_eq!(methods[1].decorators, vec!["Override"]);
        assert_eq!(methods[1].return_type.as_deref(), Some("void"));
        assert_eq!(methods[1].calls[0].callee, "System.out.println");
    }

    #[test]
    fn interface_methods_are_declarations() {
        let events = extract("interface Shape extends Drawable {\n  double area();\n}\n");
        let method = events
            .iter()
            .find_map(|e| match e {
                ExtractionEvent::Function(f) => Some(f),
                _ => None,
            })
            .unwrap();
        assert!(method.is_declaration);
        let class = events
            .iter()
            .find_map(|e| match e {
                ExtractionEvent::Class(c) => Some(c),
                _ => None,
            })
            .unwrap();
        assert_eq!(class.kind, ClassKind::Interface);
        assert_eq!(class.parents, vec!["Drawable"]);
    }
}

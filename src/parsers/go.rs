use tree_sitter::{Node as TSNode, Tree};

use super::common::{
    children_by_field, collapse_whitespace, comment_block_above, extract_text, find_child_by_kind,
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
pub struct GoParser;

impl LanguageParser for GoParser {
    fn language(&self) -> Language {
        Language::Go
    }

    fn grammar(&self) -> tree_sitter::Language {
        tree_sitter_go::language()
    }

    fn extract(&self, tree: &Tree, source: &str) -> Vec<ExtractionEvent> {
        let mut extractor = GoExtractor::new(source.as_bytes());
        extractor.extract_source_file(&tree.root_node());
        extractor.events
    }
}

struct GoExtractor<'s> {
    source: &'s [u8],
    events: Vec<ExtractionEvent>,
    next_class_id: ClassId,
    calls: CallSiteExtractor,
}

impl<'s> GoExtractor<'s> {
    fn new(source: &'s [u8]) -> Self {
        Self {
            source,
            events: Vec::new(),
            next_class_id: 0,
            calls: CallSiteExtractor::new(Language::Go),
        }
    }

    fn text(&self, node: &TSNode) -> &'s str {
        extract_text(node, self.source)
    }

    fn extract_source_file(&mut self, root: &TSNode) {
        for child in named_children(root) {
            match child.kind() {
                "package_clause" => {
                    if let Some(name) = find_child_by_kind(&child, "package_identifier") {
                        let package = self.text(&name).to_string();
                        self.events.push(ExtractionEvent::Package(package));
                    }
                }
                "import_declaration" => self.process_imports(&child),
                "type_declaration" => {
                    for spec in named_children(&child) {
                        if spec.kind() == "type_spec" {
                            self.process_type_spec(&spec, &child);
                        }
                    }
                }
                "function_declaration" => self.process_function(&child, None),
                "method_declaration" => {
                    let receiver = child
                        .child_by_field_name("receiver")
                        .and_then(|r| self.receiver_type(&r));
                    self.process_function(&child, receiver.map(Owner::Type));
                }
                _ => {}
            }
        }
    }

    fn process_imports(&mut self, declaration: &TSNode) {
        let mut specs = Vec::new();
        for child in named_children(declaration) {
            match child.kind() {
                "import_spec" => specs.push(child),
                "import_spec_list" => specs.extend(
                    named_children(&child)
                        .into_iter()
                        .filter(|s| s.kind() == "import_spec"),
                ),
                _ => {}
            }
        }

        let grouped =
            specs.len() > 1 || find_child_by_kind(declaration, "import_spec_list").is_some();
        for spec in specs {
            let Some(path) = spec.child_by_field_name("path") else {
                continue;
            };
            let raw_node = if grouped { spec } else { *declaration };
            self.events.push(ExtractionEvent::Import(RawImport {
                raw: collapse_whitespace(self.text(&raw_node)),
                path: self.text(&path).trim_matches(|c| c == '"' || c == '`').to_string(),
                origin: ImportOrigin::Absolute,
                alias: node_text(spec.child_by_field_name("name"), self.source),
                line: spec.start_position().row + 1,
            }));
        }
    }

    /// `(u *User)` → `User`, `(l List[T])` → `List`.
    fn receiver_type(&self, receiver: &TSNode) -> Option<String> {
        let param = named_children(receiver)
            .into_iter()
            .find(|p| p.kind() == "parameter_declaration")?;
        let type_node = param.child_by_field_name("type")?;
        let text = self.text(&type_node).trim_start_matches('*').trim();
        let base = text.split('[').next().unwrap_or(text).trim();
        (!base.is_empty()).then(|| base.to_string())
    }

    fn process_type_spec(&mut self, spec: &TSNode, declaration: &TSNode) {
        let Some(type_node) = spec.child_by_field_name("type") else {
            return;
        };
        let kind = match type_node.kind() {
            "struct_type" => ClassKind::Struct,
            "interface_type" => ClassKind::Interface,
            _ => return,
        };
        let Some(name_node) = spec.child_by_field_name("name") else {
            return;
        };
        let id = self.next_class_id;
        self.next_class_id += 1;

        let name = self.text(&name_node);
        let mut class = RawClass::new(id, Vec::new(), name, kind);
        (class.line_start, class.line_end) = line_span(spec);
        class.docstring = comment_block_above(spec, self.source)
            .or_else(|| comment_block_above(declaration, self.source));
        class.type_parameters = self.type_parameters(spec);

        let mut methods = Vec::new();
        match kind {
            ClassKind::Struct => self.struct_fields(&type_node, &mut class),
            _ => methods = self.interface_elements(&type_node, &mut class),
        }
        self.events.push(ExtractionEvent::Class(class));

        for method in methods {
            self.process_method_spec(&method, name, id);
        }
    }

    fn struct_fields(&self, struct_type: &TSNode, class: &mut RawClass) {
        let Some(fields) = find_child_by_kind(struct_type, "field_declaration_list") else {
            return;
        };
        for field in named_children(&fields) {
            if field.kind() != "field_declaration" {
                continue;
            }
            let field_type = node_text(field.child_by_field_name("type"), self.source);
            let names = children_by_field(&field, "name");
            if names.is_empty() {
                if let Some(embedded) = field_type {
                    class
                        .parents
                        .push(embedded.trim_start_matches('*').to_string());
                }
                continue;
            }
            for name in names {
                class
                    .attributes
                    .push(Attribute::new(self.text(&name), field_type.clone()));
            }
        }
    }

    /// Embedded interfaces become parents; returns the method specs.
    fn interface_elements<'t>(
        &self,
        interface: &TSNode<'t>,
        class: &mut RawClass,
    ) -> Vec<TSNode<'t>> {
        let mut methods = Vec::new();
        for element in named_children(interface) {
            match element.kind() {
                "method_spec" | "method_elem" => methods.push(element),
                "method_spec_list" => methods.extend(
                    named_children(&element)
                        .into_iter()
                        .filter(|m| m.kind() == "method_spec"),
                ),
                "type_identifier" | "qualified_type" | "interface_type_name" | "generic_type" => {
                    class.parents.push(collapse_whitespace(self.text(&element)));
                }
                "type_elem" | "constraint_elem" => {
                    if let [single] = named_children(&element).as_slice() {
                        if matches!(
                            single.kind(),
                            "type_identifier" | "qualified_type" | "generic_type"
                        ) {
                            class.parents.push(collapse_whitespace(self.text(single)));
                        }
                    }
                }
                _ => {}
            }
        }
        methods
    }

    fn process_method_spec(&mut self, spec: &TSNode, interface: &str, owner: ClassId) {
        let Some(name_node) = spec.child_by_field_name("name") else {
            return;
        };
        let mut function = RawFunction::new(
            vec![interface.to_string()],
            self.text(&name_node),
            FunctionKind::Method,
        )
        .owned_by(Owner::Class(owner));
        (function.line_start, function.line_end) = line_span(spec);
        function.docstring = comment_block_above(spec, self.source);
        if let Some(params) = spec.child_by_field_name("parameters") {
            function.parameters = self.extract_parameters(&params);
        }
        function.return_type = node_text(spec.child_by_field_name("result"), self.source);
        function.is_declaration = true;
        self.events.push(ExtractionEvent::Function(function));
    }

    fn process_function(&mut self, node: &TSNode, owner: Option<Owner>) {
        let Some(name_node) = node.child_by_field_name("name") else {
            return;
        };
        let kind = if owner.is_some() {
            FunctionKind::Method
        } else {
            FunctionKind::Function
        };
        let mut function = RawFunction::new(Vec::new(), self.text(&name_node), kind);
        function.owner = owner;
        (function.line_start, function.line_end) = line_span(node);
        function.docstring = comment_block_above(node, self.source);
        function.type_parameters = self.type_parameters(node);
        if let Some(params) = node.child_by_field_name("parameters") {
            function.parameters = self.extract_parameters(&params);
        }
        function.return_type = node_text(node.child_by_field_name("result"), self.source);
        match node.child_by_field_name("body") {
            Some(body) => {
                function.calls = self.calls.extract_from_body(&body, self.source);
                if let Some(receiver) = self.receiver_name(node) {
                    function.accessed_attributes =
                        self.calls.extract_attribute_accesses(&body, self.source, receiver);
                }
            }
            None => function.is_declaration = true,
        }
        self.events.push(ExtractionEvent::Function(function));
    }

    /// `(u *User)` → `u`.
    fn receiver_name(&self, method: &TSNode) -> Option<&'s str> {
        let receiver = method.child_by_field_name("receiver")?;
        let param = named_children(&receiver)
            .into_iter()
            .find(|p| p.kind() == "parameter_declaration")?;
        let name = param.child_by_field_name("name")?;
        Some(self.text(&name))
    }

    fn type_parameters(&self, node: &TSNode) -> Vec<String> {
        let Some(params) = node.child_by_field_name("type_parameters") else {
            return Vec::new();
        };
        let mut names = Vec::new();
        for param in named_children(&params) {
            let param_names = children_by_field(&param, "name");
            if param_names.is_empty() {
                names.push(collapse_whitespace(self.text(&param)));
            } else {
                names.extend(param_names.iter().map(|n| self.text(n).to_string()));
            }
        }
        names
    }

    fn extract_parameters(&self, params: &TSNode) -> Vec<Parameter> {
        let mut parameters = Vec::new();
        for param in named_children(params) {
            let param_type = node_text(param.child_by_field_name("type"), self.source);
            match param.kind() {
                "parameter_declaration" => {
                    let names = children_by_field(&param, "name");
                    if names.is_empty() {
                        parameters.push(Parameter::new("").with_type(param_type));
                    } else {
                        for name in names {
                            parameters.push(
                                Parameter::new(self.text(&name)).with_type(param_type.clone()),
                            );
                        }
                    }
                }
                "variadic_parameter_declaration" => {
                    let name = node_text(param.child_by_field_name("name"), self.source);
                    parameters.push(
                        Parameter::new(name.unwrap_or_default())
                            .with_type(param_type.map(|t| format!("...{t}"))),
                    );
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
        let parser = GoParser;
        let tree = parser.parse(Path::new("t.go"), source).unwrap();
        parser.extract(&tree, source)
    }

    #[test]
    fn receiver_becomes_named_owner() {
        let events = extract(
            "package models\n\ntype User struct {\n\tName string\n\tAge, Score int\n}\n\n// GetName returns the name.\nfunc (u *User) GetName() string {\n\treturn u.Name\n}\n",
        );
        assert_eq!(events[0], ExtractionEvent::Package("models".to_string()));
        let user = match &events[1] {
            ExtractionEvent::Class(c) => c,
            other => panic!("unexpected {other:?}"),
        };
        let fields: Vec<_> = user.attributes.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(fields, vec!["Name", "Age", "Score"]);
        let method = match &events[2] {
            ExtractionEvent::Function(f) => f,
            other => panic!("unexpected {other:?}"),
        };
        assert_eq!(method.owner, Some(Owner::Type("User".to_string())));
        assert_eq!(method.docstring.as_deref(), Some("GetName returns the name."));
        assert_eq!(method.return_type.as_deref(), Some("string"));
    }

    #[test]
    fn grouped_imports_keep_aliases() {
        let events = extract("package main\n\nimport (\n\t\"fmt\"\n\tstr \"strings\"\n)\n");
        let imports: Vec<&RawImport> = events
            .iter()
            .filter_map(|e| match e {
                ExtractionEvent::Import(i) => Some(i),
                _ => None,
            })
            .collect();
        assert_eq!(imports.len(), 2);
        assert_eq!(imports[0].path, "fmt");
        assert_eq!(imports[1].path, "strings");
        assert_eq!(imports[1].alias.as_deref(), Some("str"));
    }

    #[test]
    fn grouped_parameter_names_share_type() {
        let events = extract("package m\n\nfunc Add(a, b int, rest ...int) int {\n\treturn a + b\n}\n");
        let add = events
            .iter()
            .find_map(|e| match e {
                ExtractionEvent::Function(f) => Some(f),
                _ => None,
            })
            .unwrap();
        let names: Vec<_> = add.parameters.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b", "rest"]);
        assert_eq!(add.parameters[1].type_annotation.as_deref(), Some("int"));
        assert_eq!(add.parameters[2].type_annotation.as_deref(), Some("...int"));
    }

    #[test]
    fn unnamed_parameters_keep_their_types() {
        let events = extract("package m\n\nfunc Use(func(int) bool, string) {}\n");
        let used = events
            .iter()
            .find_map(|e| match e {
                ExtractionEvent::Function(f) => Some(f),
                _ => None,
            })
            .unwrap();
        let types: Vec<_> = used
            .parameters
            .iter()
            .map(|p| (p.name.as_str(), p.type_annotation.as_deref()))
            .collect();
        assert_eq!(types, vec![("", Some("func(int) bool")), ("", Some("string"))]);
    }
}

use tree_sitter::{Node as TSNode, Tree};

use super::common::{
    children_by_field, collapse_whitespace, extract_docstring, extract_text, find_child_by_kind,
    find_children_by_kind, line_span, named_children, node_text,
};
use super::events::{
    ClassId, ExtractionEvent, ImportOrigin, Owner, RawClass, RawFunction, RawImport,
};
use super::LanguageParser;
use crate::core::calls::CallSiteExtractor;
use crate::core::model::{Attribute, ClassKind, FunctionKind, Parameter};
use crate::core::Language;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PythonParser;

impl LanguageParser for PythonParser {
    fn language(&self) -> Language {
        Language::Python
    }

    fn grammar(&self) -> tree_sitter::Language {
        tree_sitter_python::language()
    }

    fn extract(&self, tree: &Tree, source: &str) -> Vec<ExtractionEvent> {
        let mut extractor = PythonExtractor::new(source.as_bytes());
        let root = tree.root_node();
        extractor.extract_imports(&root);
        extractor.extract_block(&root, &[], None);
        extractor.events
    }
}

const INTERFACE_BASES: &[&str] = &["ABC", "abc.ABC", "Protocol", "typing.Protocol"];
const ENUM_BASES: &[&str] = &[
    "Enum",
    "IntEnum",
    "StrEnum",
    "Flag",
    "IntFlag",
    "enum.Enum",
    "enum.IntEnum",
];

struct PythonExtractor<'s> {
    source: &'s [u8],
    events: Vec<ExtractionEvent>,
    next_class_id: ClassId,
    calls: CallSiteExtractor,
}

impl<'s> PythonExtractor<'s> {
    fn new(source: &'s [u8]) -> Self {
        Self {
            source,
            events: Vec::new(),
            next_class_id: 0,
            calls: CallSiteExtractor::new(Language::Python),
        }
    }

    fn text(&self, node: &TSNode) -> &'s str {
        extract_text(node, self.source)
    }

    fn extract_imports(&mut self, node: &TSNode) {
        match node.kind() {
            "import_statement" => self.process_import(node),
            "import_from_statement" | "future_import_statement" => self.process_from_import(node),
            _ => {
                for child in named_children(node) {
                    self.extract_imports(&child);
                }
            }
        }
    }

    fn process_import(&mut self, node: &TSNode) {
        let raw = collapse_whitespace(self.text(node));
        let line = node.start_position().row + 1;
        for name in children_by_field(node, "name") {
            let (path, alias) = self.imported_name(&name);
            self.events.push(ExtractionEvent::Import(RawImport {
                raw: raw.clone(),
                path,
                origin: ImportOrigin::Absolute,
                alias,
                line,
            }));
        }
    }

    fn process_from_import(&mut self, node: &TSNode) {
        let raw = collapse_whitespace(self.text(node));
        let line = node.start_position().row + 1;

        let (level, module) = match node.child_by_field_name("module_name") {
            Some(module) if module.kind() == "relative_import" => {
                let level = find_child_by_kind(&module, "import_prefix")
                    .map(|prefix| self.text(&prefix).matches('.').count())
                    .unwrap_or(0);
                let dotted = find_child_by_kind(&module, "dotted_name")
                    .map(|name| self.text(&name).to_string())
                    .unwrap_or_default();
                (level, dotted)
            }
            Some(module) => (0, self.text(&module).to_string()),
            None => (0, "__future__".to_string()),
        };

        let mut names: Vec<(String, Option<String>)> = children_by_field(node, "name")
            .iter()
            .map(|name| self.imported_name(name))
            .collect();
        if find_child_by_kind(node, "wildcard_import").is_some() {
            names.push(("*".to_string(), None));
        }

        let origin = if level > 0 {
            ImportOrigin::PythonRelative { level }
        } else {
            ImportOrigin::Absolute
        };

        for (name, alias) in names {
            let path = [module.as_str(), name.as_str()]
                .iter()
                .filter(|part| !part.is_empty())
                .copied()
                .collect::<Vec<_>>()
                .join(".");
            self.events.push(ExtractionEvent::Import(RawImport {
                raw: raw.clone(),
                path,
                origin,
                alias,
                line,
            }));
        }
    }

    fn imported_name(&self, node: &TSNode) -> (String, Option<String>) {
        if node.kind() == "aliased_import" {
            let name = node
                .child_by_field_name("name")
                .map(|n| self.text(&n).to_string())
                .unwrap_or_default();
            let alias = node
                .child_by_field_name("alias")
                .map(|a| self.text(&a).to_string());
            (name, alias)
        } else {
            (self.text(node).to_string(), None)
        }
    }

    /// Module body or class body. Definitions under conditional, `try` and
    /// `with` statements belong to the same level; function bodies are not
    /// entered.
    fn extract_block(&mut self, block: &TSNode, scope: &[String], owner: Option<ClassId>) {
        for child in named_children(block) {
            match child.kind() {
                "if_statement" | "elif_clause" | "else_clause" | "try_statement"
                | "except_clause" | "except_group_clause" | "finally_clause"
                | "with_statement" | "block" => self.extract_block(&child, scope, owner),
                "function_definition" => self.process_function(&child, scope, owner, Vec::new()),
                "class_definition" => self.process_class(&child, scope),
                "decorated_definition" => {
                    let decorators = find_children_by_kind(&child, "decorator")
                        .iter()
                        .map(|d| collapse_whitespace(self.text(d).trim_start_matches('@')))
                        .collect();
                    if let Some(definition) = child.child_by_field_name("definition") {
                        match definition.kind() {
                            "function_definition" => {
                                self.process_function(&definition, scope, owner, decorators)
                            }
                            "class_definition" => self.process_class(&definition, scope),
                            _ => {}
                        }
                    }
                }
                _ => {}
            }
        }
    }

    fn process_function(
        &mut self,
        node: &TSNode,
        scope: &[String],
        owner: Option<ClassId>,
        decorators: Vec<String>,
    ) {
        let Some(name_node) = node.child_by_field_name("name") else {
            return;
        };
        let name = self.text(&name_node);
        let kind = match (owner, name) {
            (None, _) => FunctionKind::Function,
            (Some(_), "__init__") => FunctionKind::Constructor,
            (Some(_), _) => FunctionKind::Method,
        };

        let mut function = RawFunction::new(scope.to_vec(), name, kind);
        if let Some(id) = owner {
            function = function.owned_by(Owner::Class(id));
        }
        if let Some(params) = node.child_by_field_name("parameters") {
            function.parameters = self.extract_parameters(&params);
        }
        function.return_type = node_text(node.child_by_field_name("return_type"), self.source);
        function.is_async = find_child_by_kind(node, "async").is_some();
        if let Some(body) = node.child_by_field_name("body") {
            function.docstring = extract_docstring(&body, self.source);
            function.calls = self.calls.extract_from_body(&body, self.source);
            let is_static = decorators.iter().any(|d| d == "staticmethod");
            let receiver = function
                .parameters
                .first()
                .filter(|_| owner.is_some() && !is_static);
            if let Some(receiver) = receiver {
                function.accessed_attributes =
                    self.calls.extract_attribute_accesses(&body, self.source, &receiver.name);
            }
        }
        function.is_declaration = decorators
            .iter()
            .any(|d| d == "abstractmethod" || d.ends_with(".abstractmethod"));
        function.decorators = decorators;
        (function.line_start, function.line_end) = line_span(node);

        self.events.push(ExtractionEvent::Function(function));
    }

    fn extract_parameters(&self, params: &TSNode) -> Vec<Parameter> {
        let mut parameters = Vec::new();
        for param in named_children(params) {
            let field = |name: &str| node_text(param.child_by_field_name(name), self.source);
            let parameter = match param.kind() {
                "identifier" | "list_splat_pattern" | "dictionary_splat_pattern" => {
                    Parameter::new(self.text(&param))
                }
                "typed_parameter" => {
                    let name = param
                        .named_child(0)
                        .map(|n| self.text(&n).to_string())
                        .unwrap_or_default();
                    Parameter::new(name).with_type(field("type"))
                }
                "default_parameter" => Parameter::new(field("name").unwrap_or_default())
                    .with_default(field("value")),
                "typed_default_parameter" => Parameter::new(field("name").unwrap_or_default())
                    .with_type(field("type"))
                    .with_default(field("value")),
                _ => continue, // `*` and `/` separators
            };
            parameters.push(parameter);
        }
        parameters
    }

    fn process_class(&mut self, node: &TSNode, scope: &[String]) {
        let Some(name_node) = node.child_by_field_name("name") else {
            return;
        };
        let id = self.next_class_id;
        self.next_class_id += 1;

        let name = self.text(&name_node);
        let mut class = RawClass::new(id, scope.to_vec(), name, ClassKind::Class);
        (class.line_start, class.line_end) = line_span(node);

        if let Some(bases) = node.child_by_field_name("superclasses") {
            self.classify_bases(&bases, &mut class);
        }

        let body = node.child_by_field_name("body");
        if let Some(body) = body {
            class.docstring = extract_docstring(&body, self.source);
            class.attributes = self.extract_attributes(&body);
        }
        self.events.push(ExtractionEvent::Class(class));

        if let Some(body) = body {
            let mut inner_scope = scope.to_vec();
            inner_scope.push(name.to_string());
            self.extract_block(&body, &inner_scope, Some(id));
        }
    }

    fn classify_bases(&self, bases: &TSNode, class: &mut RawClass) {
        for base in named_children(bases) {
            if base.kind() == "keyword_argument" {
                let is_metaclass = base
                    .child_by_field_name("name")
                    .is_some_and(|n| self.text(&n) == "metaclass");
                let value = node_text(base.child_by_field_name("value"), self.source);
                if is_metaclass && value.is_some_and(|v| v.ends_with("ABCMeta")) {
                    class.kind = ClassKind::Interface;
                }
                continue;
            }
            if base.kind() == "comment" {
                continue;
            }

            let text = collapse_whitespace(self.text(&base));
            if text == "object" {
                continue;
            }
            if INTERFACE_BASES.contains(&text.as_str()) || text.starts_with("Protocol[") {
                class.kind = ClassKind::Interface;
                continue;
            }
            if let Some(params) = text
                .strip_prefix("Generic[")
                .and_then(|rest| rest.strip_suffix(']'))
            {
                class
                    .type_parameters
                    .extend(params.split(',').map(|p| p.trim().to_string()));
                continue;
            }
            if ENUM_BASES.contains(&text.as_str()) {
                class.kind = ClassKind::Enum;
            }
            class.parents.push(text);
        }
    }

    /// Class-level assignments plus `self.x = ...` inside `__init__`.
    fn extract_attributes(&self, body: &TSNode) -> Vec<Attribute> {
        let mut attributes: Vec<Attribute> = Vec::new();
        for statement in named_children(body) {
            if statement.kind() != "expression_statement" {
                continue;
            }
            let Some(assignment) = statement.named_child(0) else {
                continue;
            };
            if assignment.kind() != "assignment" {
                continue;
            }
            if let Some(left) = assignment.child_by_field_name("left") {
                if left.kind() == "identifier" {
                    push_attribute(
                        &mut attributes,
                        self.text(&left),
                        node_text(assignment.child_by_field_name("type"), self.source),
                    );
                }
            }
        }

        if let Some(init) = self.find_init(body) {
            if let Some(init_body) = init.child_by_field_name("body") {
                self.collect_self_assignments(&init_body, &mut attributes);
            }
        }
        attributes
    }

    fn find_init<'t>(&self, body: &TSNode<'t>) -> Option<TSNode<'t>> {
        named_children(body).into_iter().find_map(|child| {
            let function = match child.kind() {
                "function_definition" => child,
                "decorated_definition" => child.child_by_field_name("definition")?,
                _ => return None,
            };
            let name = function.child_by_field_name("name")?;
            (self.text(&name) == "__init__").then_some(function)
        })
    }

    fn collect_self_assignments(&self, node: &TSNode, attributes: &mut Vec<Attribute>) {
        for child in named_children(node) {
            match child.kind() {
                "function_definition" | "class_definition" | "lambda" => continue,
                "assignment" => {
                    if let Some(left) = child.child_by_field_name("left") {
                        if let Some(name) = self.self_attribute(&left) {
                            push_attribute(
                                attributes,
                                name,
                                node_text(child.child_by_field_name("type"), self.source),
                            );
                        }
                    }
                    if let Some(right) = child.child_by_field_name("right") {
                        self.collect_self_assignments(&right, attributes);
                    }
                }
                _ => self.collect_self_assignments(&child, attributes),
            }
        }
    }

    fn self_attribute(&self, target: &TSNode) -> Option<&'s str> {
        if target.kind() != "attribute" {
            return None;
        }
        let object = target.child_by_field_name("object")?;
        if self.text(&object) != "self" {
            return None;
        }
        let attribute = target.child_by_field_name("attribute")?;
        Some(self.text(&attribute))
    }
}

fn push_attribute(attributes: &mut Vec<Attribute>, name: &str, type_annotation: Option<String>) {
    if name.is_empty() || attributes.iter().any(|a| a.name == name) {
        return;
    }
    attributes.push(Attribute::new(name, type_annotation));
}

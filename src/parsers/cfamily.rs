//! Extraction shared by the C and C++ front-ends. The C grammar's node kinds
//! are a subset of the C++ ones, so one walker serves both; `language`
//! only decides whether record bodies may hold methods.

use tree_sitter::Node as TSNode;

use super::common::{
    children_by_field, collapse_whitespace, comment_block_above, extract_text, find_child_by_kind,
    line_span, named_children, node_text,
};
use super::events::{
    ClassId, ExtractionEvent, ImportOrigin, Owner, RawClass, RawFunction, RawImport,
};
use crate::core::calls::CallSiteExtractor;
use crate::core::model::{Attribute, ClassKind, FunctionKind, Parameter};
use crate::core::Language;

pub(crate) fn extract_translation_unit(
    language: Language,
    root: &TSNode,
    source: &[u8],
) -> Vec<ExtractionEvent> {
    let mut extractor = CFamilyExtractor::new(language, source);
    extractor.visit_items(root, &[]);
    extractor.events
}

/// Owning class of a member being extracted.
#[derive(Clone, Copy)]
struct Member<'a> {
    id: ClassId,
    class_name: &'a str,
}

struct CFamilyExtractor<'s> {
    language: Language,
    source: &'s [u8],
    events: Vec<ExtractionEvent>,
    next_class_id: ClassId,
    calls: CallSiteExtractor,
}

impl<'s> CFamilyExtractor<'s> {
    fn new(language: Language, source: &'s [u8]) -> Self {
        Self {
            language,
            source,
            events: Vec::new(),
            next_class_id: 0,
            calls: CallSiteExtractor::new(language),
        }
    }

    fn text(&self, node: &TSNode) -> &'s str {
        extract_text(node, self.source)
    }

    /// Translation unit, namespace body, or a transparent container.
    fn visit_items(&mut self, container: &TSNode, scope: &[String]) {
        for child in named_children(container) {
            match child.kind() {
                "preproc_include" => self.process_include(&child),
                "preproc_ifdef" | "preproc_if" | "preproc_else" | "preproc_elif"
                | "preproc_elifdef" | "declaration_list" => self.visit_items(&child, scope),
                "linkage_specification" => {
                    if let Some(body) = child.child_by_field_name("body") {
                        if body.kind() == "declaration_list" {
                            self.visit_items(&body, scope);
                        } else {
                            self.visit_item(&body, scope, Vec::new(), &body);
                        }
                    }
                }
                "namespace_definition" => {
                    let mut inner = scope.to_vec();
                    if let Some(name) = child.child_by_field_name("name") {
                        inner.extend(
                            self.text(&name)
                                .split("::")
                                .map(str::trim)
                                .filter(|s| !s.is_empty())
                                .map(String::from),
                        );
                    }
                    if let Some(body) = child.child_by_field_name("body") {
                        self.visit_items(&body, &inner);
                    }
                }
                "using_declaration" => self.process_using(&child),
                _ => self.visit_item(&child, scope, Vec::new(), &child),
            }
        }
    }

    fn visit_item(
        &mut self,
        node: &TSNode,
        scope: &[String],
        type_params: Vec<String>,
        anchor: &TSNode,
    ) {
        match node.kind() {
            "function_definition" => {
                self.process_function(node, scope, None, type_params, anchor);
            }
            "declaration" => {
                if let Some(spec) = node.child_by_field_name("type") {
                    self.process_record(&spec, scope, type_params.clone(), anchor, None);
                }
                for declarator in children_by_field(node, "declarator") {
                    if unwrap_function_declarator(&declarator).is_some() {
                        self.process_prototype(node, &declarator, scope, None, type_params.clone());
                    }
                }
            }
            "type_definition" => {
                if let Some(spec) = node.child_by_field_name("type") {
                    let alias = children_by_field(node, "declarator")
                        .into_iter()
                        .find(|d| d.kind() == "type_identifier")
                        .map(|d| self.text(&d).to_string());
                    self.process_record(&spec, scope, type_params, anchor, alias);
                }
            }
            "struct_specifier" | "union_specifier" | "enum_specifier" | "class_specifier" => {
                self.process_record(node, scope, type_params, anchor, None);
            }
            "template_declaration" => {
                let params = self.template_parameters(node);
                if let Some(inner) = template_body(node) {
                    self.visit_item(&inner, scope, params, anchor);
                }
            }
            _ => {}
        }
    }

    fn process_include(&mut self, node: &TSNode) {
        let Some(path_node) = node.child_by_field_name("path") else {
            return;
        };
        let text = self.text(&path_node);
        let (path, origin) = match path_node.kind() {
            "system_lib_string" => (
                text.trim_start_matches('<').trim_end_matches('>'),
                ImportOrigin::Absolute,
            ),
            _ => (text.trim_matches('"'), ImportOrigin::LocalInclude),
        };
        self.events.push(ExtractionEvent::Import(RawImport {
            raw: collapse_whitespace(self.text(node)),
            path: path.trim().to_string(),
            origin,
            alias: None,
            line: node.start_position().row + 1,
        }));
    }

    /// `using namespace std;` and `using std::string;`
    fn process_using(&mut self, node: &TSNode) {
        let Some(target) = named_children(node)
            .into_iter()
            .find(|c| matches!(c.kind(), "identifier" | "qualified_identifier"))
        else {
            return;
        };
        self.events.push(ExtractionEvent::Import(RawImport {
            raw: collapse_whitespace(self.text(node)),
            path: collapse_whitespace(self.text(&target)).replace(' ', ""),
            origin: ImportOrigin::Absolute,
            alias: None,
            line: node.start_position().row + 1,
        }));
    }

    fn process_record(
        &mut self,
        spec: &TSNode,
        scope: &[String],
        type_params: Vec<String>,
        anchor: &TSNode,
        alias: Option<String>,
    ) {
        let kind = match spec.kind() {
            "struct_specifier" => ClassKind::Struct,
            "union_specifier" => ClassKind::Union,
            "enum_specifier" => ClassKind::Enum,
            "class_specifier" => ClassKind::Class,
            _ => return,
        };
        let Some(body) = spec.child_by_field_name("body") else {
            return;
        };
        let name = spec
            .child_by_field_name("name")
            .map(|n| strip_template_args(&collapse_whitespace(self.text(&n))))
            .or(alias);
        let Some(name) = name.filter(|n| !n.is_empty()) else {
            return;
        };

        let id = self.next_class_id;
        self.next_class_id += 1;
        let mut class = RawClass::new(id, scope.to_vec(), name.clone(), kind);
        (class.line_start, class.line_end) = line_span(anchor);
        class.docstring = comment_block_above(anchor, self.source);
        class.type_parameters = type_params;
        if let Some(bases) = find_child_by_kind(spec, "base_class_clause") {
            class.parents = self.base_classes(&bases);
        }

        let members = named_children(&body);
        if kind == ClassKind::Enum {
            class.attributes = members
                .iter()
                .filter(|m| m.kind() == "enumerator")
                .filter_map(|m| m.child_by_field_name("name"))
                .map(|n| Attribute::new(self.text(&n), None))
                .collect();
        } else {
            class.attributes = self.record_attributes(&members);
        }
        self.events.push(ExtractionEvent::Class(class));

        if kind == ClassKind::Enum {
            return;
        }
        let mut inner_scope = scope.to_vec();
        inner_scope.push(name.clone());
        let owner = Member {
            id,
            class_name: &name,
        };
        for member in &members {
            self.visit_member(member, &inner_scope, owner, Vec::new(), member);
        }
    }

    fn base_classes(&self, clause: &TSNode) -> Vec<String> {
        let mut parents = Vec::new();
        for child in named_children(clause) {
            let base = match child.kind() {
                "type_identifier" | "qualified_identifier" | "template_type" => Some(child),
                // older grammars wrap each base
                "base_class" => named_children(&child).into_iter().find(|c| {
                    matches!(
                        c.kind(),
                        "type_identifier" | "qualified_identifier" | "template_type"
                    )
                }),
                _ => None,
            };
            if let Some(base) = base {
                parents.push(collapse_whitespace(self.text(&base)));
            }
        }
        parents
    }

    fn record_attributes(&self, members: &[TSNode]) -> Vec<Attribute> {
        let mut attributes = Vec::new();
        for member in members {
            if member.kind() != "field_declaration" {
                continue;
            }
            let type_node = member.child_by_field_name("type");
            for declarator in children_by_field(member, "declarator") {
                if self.language == Language::Cpp
                    && unwrap_function_declarator(&declarator).is_some()
                {
                    continue;
                }
                let Some(name) = declared_name(&declarator) else {
                    continue;
                };
                let field_type =
                    type_node.map(|t| self.declared_type(member, &t, &declarator, Some(&name)));
                attributes.push(Attribute::new(self.text(&name), field_type));
            }
        }
        attributes
    }

    fn visit_member(
        &mut self,
        member: &TSNode,
        scope: &[String],
        owner: Member,
        type_params: Vec<String>,
        anchor: &TSNode,
    ) {
        match member.kind() {
            "field_declaration" => {
                if let Some(spec) = member.child_by_field_name("type") {
                    self.process_record(&spec, scope, Vec::new(), anchor, None);
                }
                if self.language != Language::Cpp {
                    return;
                }
                for declarator in children_by_field(member, "declarator") {
                    if unwrap_function_declarator(&declarator).is_some() {
                        self.process_prototype(
                            member,
                            &declarator,
                            scope,
                            Some(owner),
                            type_params.clone(),
                        );
                    }
                }
            }
            "declaration" => {
                for declarator in children_by_field(member, "declarator") {
                    if unwrap_function_declarator(&declarator).is_some() {
                        self.process_prototype(
                            member,
                            &declarator,
                            scope,
                            Some(owner),
                            type_params.clone(),
                        );
                    }
                }
            }
            "function_definition" => {
                self.process_function(member, scope, Some(owner), type_params, anchor);
            }
            "template_declaration" => {
                let params = self.template_parameters(member);
                if let Some(inner) = template_body(member) {
                    self.visit_member(&inner, scope, owner, params, anchor);
                }
            }
            "struct_specifier" | "union_specifier" | "enum_specifier" | "class_specifier" => {
                self.process_record(member, scope, type_params, anchor, None);
            }
            _ => {}
        }
    }

    /// A declaration whose declarator is a function: prototype or in-class
    /// method declaration.
    fn process_prototype(
        &mut self,
        node: &TSNode,
        declarator: &TSNode,
        scope: &[String],
        owner: Option<Member>,
        type_params: Vec<String>,
    ) {
        let Some(function_declarator) = unwrap_function_declarator(declarator) else {
            return;
        };
        let Some(mut function) = self.build_function(
            node,
            declarator,
            &function_declarator,
            scope,
            owner,
            type_params,
            node,
        ) else {
            return;
        };
        function.is_declaration = true;
        self.events.push(ExtractionEvent::Function(function));
    }

    fn process_function(
        &mut self,
        node: &TSNode,
        scope: &[String],
        owner: Option<Member>,
        type_params: Vec<String>,
        anchor: &TSNode,
    ) {
        let Some(declarator) = node.child_by_field_name("declarator") else {
            return;
        };
        let Some(function_declarator) = unwrap_function_declarator(&declarator) else {
            return;
        };
        let Some(mut function) = self.build_function(
            node,
            &declarator,
            &function_declarator,
            scope,
            owner,
            type_params,
            anchor,
        ) else {
            return;
        };
        if let Some(body) = node.child_by_field_name("body") {
            function.calls = self.calls.extract_from_body(&body, self.source);
            if function.owner.is_some() {
                function.accessed_attributes =
                    self.calls.extract_attribute_accesses(&body, self.source, "this");
            }
        }
        self.events.push(ExtractionEvent::Function(function));
    }

    #[allow(clippy::too_many_arguments)]
    fn build_function(
        &self,
        node: &TSNode,
        declarator: &TSNode,
        function_declarator: &TSNode,
        scope: &[String],
        member: Option<Member>,
        type_params: Vec<String>,
        anchor: &TSNode,
    ) -> Option<RawFunction> {
        let name_node = function_declarator.child_by_field_name("declarator")?;
        let (qualifiers, name_node) = self.split_qualified(&name_node);

        let (name, mut kind) = match name_node.kind() {
            "destructor_name" => (
                self.text(&name_node).split_whitespace().collect::<String>(),
                FunctionKind::Destructor,
            ),
            "operator_name" => (
                normalize_operator(self.text(&name_node)),
                FunctionKind::Operator,
            ),
            "template_function" => {
                let base = name_node.child_by_field_name("name")?;
                (self.text(&base).to_string(), FunctionKind::Function)
            }
            _ => (self.text(&name_node).to_string(), FunctionKind::Function),
        };
        if name.is_empty() {
            return None;
        }

        let (owner, class_name) = match (member, qualifiers.is_empty()) {
            (Some(member), _) => (
                Some(Owner::Class(member.id)),
                Some(member.class_name.to_string()),
            ),
            (None, false) => {
                let owner_type = qualifiers.join("::");
                let class_name = qualifiers.last().cloned();
                (Some(Owner::Type(owner_type)), class_name)
            }
            (None, true) => (None, None),
        };
        if kind == FunctionKind::Function {
            kind = match (&owner, &class_name) {
                (Some(_), Some(class_name)) if *class_name == name => FunctionKind::Constructor,
                (Some(_), _) => FunctionKind::Method,
                (None, _) => FunctionKind::Function,
            };
        }

        let mut function = RawFunction::new(scope.to_vec(), name, kind);
        function.owner = owner;
        (function.line_start, function.line_end) = line_span(anchor);
        function.docstring = comment_block_above(anchor, self.source);
        function.type_parameters = type_params;
        function.return_type = node
            .child_by_field_name("type")
            .map(|t| self.declared_type(node, &t, declarator, Some(function_declarator)))
            .filter(|t| !t.is_empty());
        if let Some(params) = function_declarator.child_by_field_name("parameters") {
            function.parameters = self.extract_parameters(&params);
        }
        Some(function)
    }

    /// `a::Foo::bar` → (["a", "Foo"], bar). Template arguments are dropped
    /// from the scope segments.
    fn split_qualified<'t>(&self, node: &TSNode<'t>) -> (Vec<String>, TSNode<'t>) {
        let mut segments = Vec::new();
        let mut current = *node;
        while current.kind() == "qualified_identifier" {
            if let Some(scope) = current.child_by_field_name("scope") {
                let segment = strip_template_args(&collapse_whitespace(self.text(&scope)));
                segments.extend(
                    segment
                        .split("::")
                        .filter(|s| !s.is_empty())
                        .map(String::from),
                );
            }
            match current.child_by_field_name("name") {
                Some(name) => current = name,
                None => break,
            }
        }
        (segments, current)
    }

    /// Qualifiers and base type of `owner`, plus the pointer/reference/array
    /// decoration found in `declarator` outside of `name`.
    fn declared_type(
        &self,
        owner: &TSNode,
        type_node: &TSNode,
        declarator: &TSNode,
        name: Option<&TSNode>,
    ) -> String {
        let mut text = String::new();
        for child in named_children(owner) {
            if child.kind() == "type_qualifier" && child.start_byte() < type_node.start_byte() {
                text.push_str(self.text(&child));
                text.push(' ');
            }
        }
        text.push_str(self.text(type_node));

        let source = self.source;
        let slice = |from: usize, to: usize| {
            if from < to {
                std::str::from_utf8(&source[from..to]).unwrap_or("")
            } else {
                ""
            }
        };
        match name {
            Some(name) => {
                text.push_str(slice(declarator.start_byte(), name.start_byte()));
                if name.kind() != "function_declarator" {
                    text.push_str(slice(name.end_byte(), declarator.end_byte()));
                }
            }
            None => {
                text.push(' ');
                text.push_str(self.text(declarator));
            }
        }
        collapse_whitespace(&text)
            .replace(" *", "*")
            .replace(" &", "&")
            .replace(" [", "[")
    }

    fn extract_parameters(&self, params: &TSNode) -> Vec<Parameter> {
        let mut parameters = Vec::new();
        let children = named_children(params);
        for param in &children {
            match param.kind() {
                "parameter_declaration" | "optional_parameter_declaration" => {
                    let type_node = param.child_by_field_name("type");
                    let declarator = param.child_by_field_name("declarator");
                    let name = declarator.as_ref().and_then(declared_name);
                    if declarator.is_none()
                        && children.len() == 1
                        && type_node.is_some_and(|t| self.text(&t) == "void")
                    {
                        continue;
                    }
                    let param_type = type_node.map(|t| match declarator {
                        Some(d) => self.declared_type(param, &t, &d, name.as_ref()),
                        None => self.declared_type(param, &t, &t, Some(&t)),
                    });
                    let default =
                        node_text(param.child_by_field_name("default_value"), self.source);
                    let name = name.map(|n| self.text(&n)).unwrap_or("");
                    parameters.push(
                        Parameter::new(name)
                            .with_type(param_type)
                            .with_default(default),
                    );
                }
                "variadic_parameter" => parameters.push(Parameter::new("...")),
                "variadic_parameter_declaration" => {
                    let name = param
                        .child_by_field_name("declarator")
                        .as_ref()
                        .and_then(declared_name)
                        .map(|n| self.text(&n))
                        .unwrap_or("");
                    let param_type = node_text(param.child_by_field_name("type"), self.source)
                        .map(|t| format!("{t}..."));
                    parameters.push(Parameter::new(name).with_type(param_type));
                }
                _ => {}
            }
        }
        // some grammar versions leave a bare `...` token in the list
        if find_child_by_kind(params, "...").is_some() {
            parameters.push(Parameter::new("..."));
        }
        parameters
    }

    fn template_parameters(&self, template: &TSNode) -> Vec<String> {
        let Some(params) = template.child_by_field_name("parameters") else {
            return Vec::new();
        };
        named_children(&params)
            .iter()
            .map(|param| {
                let name = match param.kind() {
                    "type_parameter_declaration" | "variadic_type_parameter_declaration" => {
                        find_child_by_kind(param, "type_identifier")
                    }
                    "optional_type_parameter_declaration" => param.child_by_field_name("name"),
                    "parameter_declaration" | "optional_parameter_declaration" => param
                        .child_by_field_name("declarator")
                        .as_ref()
                        .and_then(declared_name),
                    _ => None,
                };
                name.map(|n| self.text(&n).to_string())
                    .unwrap_or_else(|| collapse_whitespace(self.text(param)))
            })
            .collect()
    }
}

/// The declaration wrapped by `template<...>`.
fn template_body<'t>(template: &TSNode<'t>) -> Option<TSNode<'t>> {
    named_children(template)
        .into_iter()
        .rev()
        .find(|c| c.kind() != "template_parameter_list" && !c.kind().contains("comment"))
}

/// Peel pointer/reference wrappers down to a function declarator. Function
/// pointer variables (`int (*cb)(int)`) are not functions.
fn unwrap_function_declarator<'t>(declarator: &TSNode<'t>) -> Option<TSNode<'t>> {
    let mut current = *declarator;
    loop {
        match current.kind() {
            "function_declarator" => {
                let inner = current.child_by_field_name("declarator")?;
                return (inner.kind() != "parenthesized_declarator").then_some(current);
            }
            "pointer_declarator" | "reference_declarator" | "attributed_declarator" => {
                let inner = current
                    .child_by_field_name("declarator")
                    .or_else(|| named_children(&current).last().copied())?;
                current = inner;
            }
            _ => return None,
        }
    }
}

/// Innermost identifier named by a (possibly decorated) declarator.
fn declared_name<'t>(declarator: &TSNode<'t>) -> Option<TSNode<'t>> {
    match declarator.kind() {
        "identifier" | "field_identifier" | "type_identifier" => Some(*declarator),
        "pointer_declarator"
        | "reference_declarator"
        | "array_declarator"
        | "parenthesized_declarator"
        | "function_declarator"
        | "attributed_declarator"
        | "init_declarator"
        | "variadic_declarator" => {
            let inner = declarator.child_by_field_name("declarator").or_else(|| {
                named_children(declarator)
                    .into_iter()
                    .find(|c| !c.kind().starts_with("type_qualifier"))
            })?;
            declared_name(&inner)
        }
        _ => None,
    }
}

/// `operator +` → `operator+`, `operator bool` keeps its space.
fn normalize_operator(text: &str) -> String {
    let rest = text.trim().trim_start_matches("operator").trim();
    if rest.chars().next().is_some_and(|c| c.is_alphabetic()) {
        format!("operator {}", collapse_whitespace(rest))
    } else {
        format!("operator{}", rest.split_whitespace().collect::<String>())
    }
}

fn strip_template_args(text: &str) -> String {
    let mut depth = 0usize;
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '<' => depth += 1,
            '>' if depth > 0 => depth -= 1,
            _ if depth == 0 => out.push(c),
            _ => {}
        }
    }
    out.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn operator_names_are_normalized() {
        assert_eq!(normalize_operator("operator +"), "operator+");
        assert_eq!(normalize_operator("operator[]"), "operator[]");
        assert_eq!(normalize_operator("operator ( )"), "operator()");
        assert_eq!(normalize_operator("operator  bool"), "operator bool");
    }

    #[test]
    fn template_arguments_are_dropped() {
        assert_eq!(strip_template_args("Vector<T>"), "Vector");
        assert_eq!(strip_template_args("Map<K, std::vector<V>>"), "Map");
    }
}

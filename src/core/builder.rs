//! Folds a front-end's event stream into one file's unified model.

use std::collections::{HashMap, HashSet};

use super::calls::CallSite;
use super::imports::{ImportResolver, Resolution};
use super::language::Language;
use super::model::{Class, FileReport, Function, Parameter, SourceFile};
use crate::error::Diagnostic;
use crate::parsers::events::{ClassId, ExtractionEvent, Owner, RawClass, RawFunction};

/// Builds a [`FileReport`] from extraction events. Depends only on the file's
/// root-relative path and the events; never touches the filesystem.
pub struct ModelBuilder<'a> {
    file: &'a SourceFile,
    separator: &'static str,
}

impl<'a> ModelBuilder<'a> {
    pub fn new(file: &'a SourceFile) -> Self {
        Self {
            file,
            separator: file.language.scope_separator(),
        }
    }

    pub fn build(&self, events: Vec<ExtractionEvent>) -> FileReport {
        let mut report = FileReport::new(self.file.clone());
        let resolver = ImportResolver::new(self.file);
        let mut package = None;
        let mut raw_classes = Vec::new();
        let mut raw_functions = Vec::new();

        for event in events {
            match event {
                ExtractionEvent::Package(name) => package = Some(name),
                ExtractionEvent::Import(raw) => match resolver.resolve(raw) {
                    Resolution::Resolved(import) => report.imports.push(import),
                    Resolution::Ambiguous(import, diagnostic) => {
                        report.imports.push(import);
                        report.errors.push(diagnostic);
                    }
                    Resolution::Dropped(diagnostic) => report.errors.push(diagnostic),
                },
                ExtractionEvent::Class(class) => raw_classes.push(class),
                ExtractionEvent::Function(function) => raw_functions.push(function),
            }
        }

        let prefix = self.prefix(package.as_deref());
        let mut class_index: HashMap<ClassId, usize> = HashMap::new();
        for raw in raw_classes {
            class_index.insert(raw.id, report.classes.len());
            report.classes.push(self.build_class(&prefix, raw));
        }
        for raw in raw_functions {
            self.place_function(&mut report, &prefix, &class_index, raw);
        }
        self.flag_builtin_parents(&mut report);
        report
    }

    /// Package, Go package or Python module path. C and C++ rely on
    /// namespaces, which arrive through each entity's scope.
    fn prefix(&self, package: Option<&str>) -> Vec<String> {
        match self.file.language {
            Language::Python => {
                let mut parts = self.file.module_parts();
                if parts.last() == Some(&"__init__") {
                    parts.pop();
                }
                parts.into_iter().map(String::from).collect()
            }
            Language::Java => package
                .map(|p| p.split('.').map(String::from).collect())
                .unwrap_or_default(),
            Language::Go => package.map(|p| vec![p.to_string()]).unwrap_or_default(),
            Language::C | Language::Cpp => Vec::new(),
        }
    }

    fn qualify<'s>(&self, parts: impl IntoIterator<Item = &'s str>) -> String {
        parts
            .into_iter()
            .filter(|p| !p.is_empty())
            .collect::<Vec<_>>()
            .join(self.separator)
    }

    fn build_class(&self, prefix: &[String], raw: RawClass) -> Class {
        let qualified_name = self.qualify(
            prefix
                .iter()
                .chain(raw.scope.iter())
                .map(String::as_str)
                .chain([raw.name.as_str()]),
        );
        let is_self = |parent: &String| *parent == raw.name || *parent == qualified_name;
        let parents = raw.parents.iter().filter(|p| !is_self(p)).cloned().collect();
        let interfaces = raw
            .interfaces
            .iter()
            .filter(|p| !is_self(p))
            .cloned()
            .collect();

        Class {
            name: raw.name,
            qualified_name,
            kind: raw.kind,
            attributes: raw.attributes,
            methods: Vec::new(),
            parents,
            interfaces,
            type_parameters: raw.type_parameters,
            docstring: raw.docstring,
            line_start: raw.line_start,
            line_end: raw.line_end,
            warnings: Vec::new(),
        }
    }

    fn place_function(
        &self,
        report: &mut FileReport,
        prefix: &[String],
        class_index: &HashMap<ClassId, usize>,
        raw: RawFunction,
    ) {
        let owner_index = match &raw.owner {
            Some(Owner::Class(id)) => class_index.get(id).copied(),
            Some(Owner::Type(owner)) => {
                self.find_owner(&report.classes, prefix, &raw.scope, owner)
            }
            None => None,
        };

        if let Some(index) = owner_index {
            let qualified = format!(
                "{}{}{}",
                report.classes[index].qualified_name, self.separator, raw.name
            );
            let method = self.build_function(raw, qualified, None);
            report.classes[index].methods.push(method);
            return;
        }

        let receiver = match &raw.owner {
            Some(Owner::Type(owner)) => Some(owner.clone()),
            _ => None,
        };
        let qualified = self.qualify(
            prefix
                .iter()
                .chain(raw.scope.iter())
                .map(String::as_str)
                .chain(receiver.as_deref())
                .chain([raw.name.as_str()]),
        );
        let function = self.build_function(raw, qualified, receiver);
        report.functions.push(function);
    }

    /// Class declared in this file that a receiver or `Foo::` qualifier names.
    /// Enclosing scopes are searched innermost first before any class whose
    /// name merely matches.
    fn find_owner(
        &self,
        classes: &[Class],
        prefix: &[String],
        scope: &[String],
        owner: &str,
    ) -> Option<usize> {
        for depth in (0..=scope.len()).rev() {
            let candidate = self.qualify(
                prefix
                    .iter()
                    .chain(&scope[..depth])
                    .map(String::as_str)
                    .chain([owner]),
            );
            if let Some(index) = classes.iter().position(|c| c.qualified_name == candidate) {
                return Some(index);
            }
        }

        let last = owner
            .rsplit(self.separator)
            .next()
            .unwrap_or(owner);
        let qualified_suffix = format!("{}{}", self.separator, owner);
        classes.iter().position(|class| {
            class.name == last
                && (owner == last
                    || class.qualified_name == owner
                    || class.qualified_name.ends_with(&qualified_suffix))
        })
    }

    fn build_function(
        &self,
        raw: RawFunction,
        qualified_name: String,
        receiver: Option<String>,
    ) -> Function {
        let calls = raw
            .calls
            .into_iter()
            .map(|call| CallSite {
                caller: qualified_name.clone(),
                callee: call.callee,
                name: call.name,
                call_type: call.call_type,
                line: call.line,
            })
            .collect();

        let parameters = unique_parameters(raw.parameters);
        let signature = self.signature(&raw.name, &parameters, raw.return_type.as_deref());

        Function {
            name: raw.name,
            qualified_name,
            signature,
            kind: raw.kind,
            parameters,
            return_type: raw.return_type,
            docstring: raw.docstring,
            is_async: raw.is_async,
            is_declaration: raw.is_declaration,
            type_parameters: raw.type_parameters,
            decorators: raw.decorators,
            receiver,
            line_start: raw.line_start,
            line_end: raw.line_end,
            calls,
            accessed_attributes: raw.accessed_attributes,
        }
    }

    /// Parameter types only, so overloads differing in names compare equal.
    /// Untyped Python slots read `Any`; elsewhere an untyped slot keeps its
    /// name (`...`) and a missing return type is left out.
    fn signature(
        &self,
        name: &str,
        parameters: &[Parameter],
        return_type: Option<&str>,
    ) -> String {
        let dynamic = self.file.language == Language::Python;
        let types = parameters
            .iter()
            .map(|p| match (&p.type_annotation, dynamic) {
                (Some(ty), _) => ty.as_str(),
                (None, true) => "Any",
                (None, false) => p.name.as_str(),
            })
            .collect::<Vec<_>>()
            .join(", ");
        match (return_type, dynamic) {
            (Some(ret), _) => format!("{name}({types}) -> {ret}"),
            (None, true) => format!("{name}({types}) -> Any"),
            (None, false) => format!("{name}({types})"),
        }
    }

    /// Warn when a parent named like a built-in type is also declared or
    /// imported by this file.
    fn flag_builtin_parents(&self, report: &mut FileReport) {
        let builtins = self.file.language.builtin_types();
        if builtins.is_empty() {
            return;
        }
        let mut local_names: HashSet<String> =
            report.classes.iter().map(|c| c.name.clone()).collect();
        for import in &report.imports {
            if let Some(alias) = &import.alias {
                local_names.insert(alias.clone());
            }
            if let Some(last) = import.target.rsplit(['.', '/', ':']).next() {
                local_names.insert(last.to_string());
            }
        }

        let path = &self.file.relative_path;
        for class in &mut report.classes {
            let shadowed: Vec<String> = class
                .parents
                .iter()
                .chain(class.interfaces.iter())
                .filter(|p| builtins.contains(&p.as_str()) && local_names.contains(p.as_str()))
                .cloned()
                .collect();
            for parent in shadowed {
                class.warnings.push(Diagnostic::ambiguity(
                    path,
                    format!(
                        "parent '{}' of class '{}' may refer to the built-in type or to a local definition",
                        parent, class.name
                    ),
                    Some(class.line_start),
                ));
            }
        }
    }
}

/// Unnamed parameters become `argN`; repeated names get a `_2`, `_3`... suffix.
fn unique_parameters(parameters: Vec<Parameter>) -> Vec<Parameter> {
    let mut seen = HashSet::new();
    let mut unique = Vec::with_capacity(parameters.len());
    for (index, mut parameter) in parameters.into_iter().enumerate() {
        if parameter.name.is_empty() {
            parameter.name = format!("arg{index}");
        }
        if !seen.insert(parameter.name.clone()) {
            let mut suffix = 2;
            loop {
                let candidate = format!("{}_{}", parameter.name, suffix);
                if seen.insert(candidate.clone()) {
                    parameter.name = candidate;
                    break;
                }
                suffix += 1;
            }
        }
        unique.push(parameter);
    }
    unique
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::model::{ClassKind, FunctionKind};
    use crate::error::DiagnosticKind;
    use crate::parsers::{FrontEnd, LanguageParser};
    use std::path::PathBuf;

    fn build(relative_path: &str, language: Language, source: &str) -> FileReport {
        let file = SourceFile::new(PathBuf::from("/root").join(relative_path), relative_path, language);
        let front_end = FrontEnd::for_language(language);
        let tree = front_end.parse(&file.path, source).unwrap();
        ModelBuilder::new(&file).build(front_end.extract(&tree, source))
    }

    #[test]
    fn python_names_carry_module_prefix() {
        let report = build(
            "pkg/shapes.py",
            Language::Python,
            "class Circle:\n    def area(self):\n        return self.r * helper()\n\ndef helper():\n    pass\n",
        );
        let circle = report.class("Circle").unwrap();
        assert_eq!(circle.qualified_name, "pkg.shapes.Circle");
        let area = circle.method("area").unwrap();
        assert_eq!(area.qualified_name, "pkg.shapes.Circle.area");
        assert_eq!(area.calls[0].caller, "pkg.shapes.Circle.area");
        assert_eq!(
            report.function("helper").unwrap().qualified_name,
            "pkg.shapes.helper"
        );
    }

    #[test]
    fn package_init_is_not_a_name_segment() {
        let report = build("pkg/__init__.py", Language::Python, "def setup():\n    pass\n");
        assert_eq!(report.functions[0].qualified_name, "pkg.setup");
    }

    #[test]
    fn go_methods_attach_to_local_receivers() {
        let report = build(
            "server.go",
            Language::Go,
            "package web\n\ntype Server struct {\n\tport int\n}\n\nfunc (s *Server) Start() error {\n\treturn nil\n}\n\nfunc (c *Client) Dial() {}\n",
        );
        let server = report.class("Server").unwrap();
        assert_eq!(server.qualified_name, "web.Server");
        assert_eq!(server.method("Start").unwrap().qualified_name, "web.Server.Start");

        let dial = report.function("Dial").unwrap();
        assert_eq!(dial.receiver.as_deref(), Some("Client"));
        assert_eq!(dial.qualified_name, "web.Client.Dial");
        assert_eq!(dial.kind, FunctionKind::Method);
    }

    #[test]
    fn cpp_out_of_class_definition_joins_its_class() {
        let report = build(
            "foo.cpp",
            Language::Cpp,
            "namespace ns {\nclass Foo {\n    void bar();\n};\nvoid Foo::bar() {}\n}\n",
        );
        let foo = report.class("Foo").unwrap();
        assert_eq!(foo.qualified_name, "ns::Foo");
        assert_eq!(foo.methods.len(), 2);
        assert!(foo.methods[0].is_declaration);
        assert_eq!(foo.methods[1].qualified_name, "ns::Foo::bar");
        assert!(report.functions.is_empty());
    }

    #[test]
    fn out_of_class_definition_prefers_the_enclosing_namespace() {
        let report = build(
            "foo.cpp",
            Language::Cpp,
            "namespace a { class Foo { void bar(); }; }\nnamespace b {\nclass Foo { void bar(); };\nvoid Foo::bar() {}\n}\nvoid a::Foo::bar() {}\n",
        );
        let a_foo = &report.classes[0];
        let b_foo = &report.classes[1];
        assert_eq!(a_foo.qualified_name, "a::Foo");
        assert_eq!(b_foo.qualified_name, "b::Foo");

        assert_eq!(b_foo.methods.len(), 2);
        assert!(!b_foo.methods[1].is_declaration);
        assert_eq!(b_foo.methods[1].qualified_name, "b::Foo::bar");
        assert_eq!(b_foo.methods[1].line_start, 4);

        assert_eq!(a_foo.methods.len(), 2);
        assert_eq!(a_foo.methods[1].line_start, 6);
        assert!(report.functions.is_empty());
    }

    #[test]
    fn java_package_prefixes_classes() {
        let report = build(
            "src/zoo/Dog.java",
            Language::Java,
            "package zoo;\npublic class Dog extends Animal {\n  public void bark() {}\n}\n",
        );
        let dog = report.class("Dog").unwrap();
        assert_eq!(dog.qualified_name, "zoo.Dog");
        assert_eq!(dog.method("bark").unwrap().qualified_name, "zoo.Dog.bark");
    }

    #[test]
    fn parameters_are_made_unique() {
        let params = unique_parameters(vec![
            Parameter::new(""),
            Parameter::new("x"),
            Parameter::new("x"),
            Parameter::new("x_2"),
        ]);
        let names: Vec<&str> = params.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["arg0", "x", "x_2", "x_2_2"]);
    }

    #[test]
    fn self_inheritance_is_stripped() {
        let file = SourceFile::new(PathBuf::from("/r/n.py"), "n.py", Language::Python);
        let mut raw = RawClass::new(0, Vec::new(), "Node", ClassKind::Class);
        raw.parents = vec!["Node".to_string(), "Base".to_string(), "n.Node".to_string()];
        let report = ModelBuilder::new(&file).build(vec![ExtractionEvent::Class(raw)]);
        assert_eq!(report.classes[0].parents, vec!["Base"]);
    }

    #[test]
    fn locally_declared_builtin_parent_is_flagged() {
        let report = build(
            "errors.py",
            Language::Python,
            "class Exception:\n    pass\n\nclass AppError(Exception):\n    pass\n\nclass Plain(ValueError):\n    pass\n",
        );
        let app = report.class("AppError").unwrap();
        assert_eq!(app.warnings.len(), 1);
        assert_eq!(app.warnings[0].kind, DiagnosticKind::ResolutionAmbiguity);
        assert!(report.class("Plain").unwrap().warnings.is_empty());
    }

    #[test]
    fn too_deep_relative_import_becomes_a_diagnostic() {
        let report = build("top.py", Language::Python, "from ... import x\n");
        assert!(report.imports.is_empty());
        assert_eq!(report.errors.len(), 1);
        assert_eq!(report.errors[0].kind, DiagnosticKind::ResolutionAmbiguity);
    }
}

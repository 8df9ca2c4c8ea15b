//! Cross-file structure graph built from a folder report.
//!
//! Node ids are the file's relative path for files and
//! `relative_path#qualified_name` for classes and functions. Imports,
//! inheritance and calls are linked only when the target name matches
//! exactly one node in the report.

use petgraph::graph::{EdgeIndex, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::{Directed, Graph};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

use super::calls::{final_segment, CallType};
use super::language::Language;
use super::model::{Class, FileReport, FolderReport, Function};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    File,
    Class,
    Function,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum EdgeKind {
    Contains,
    Imports,
    Inherits,
    Implements,
    Calls,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct GraphNode {
    pub id: String,
    pub name: String,
    pub kind: NodeKind,
    pub file: String,
    pub line: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct GraphEdge {
    pub kind: EdgeKind,
    /// Source line of the import or call, when the edge has one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line: Option<usize>,
}

pub type StructureGraphInner = Graph<GraphNode, GraphEdge, Directed>;

pub struct StructureGraph {
    graph: StructureGraphInner,
    node_map: HashMap<String, NodeIndex>,
    edge_set: HashSet<(NodeIndex, NodeIndex, EdgeKind)>,
}

/// Name → node ids sharing it. Lookups only succeed when the name is unique.
#[derive(Default)]
struct NameIndex(HashMap<String, Vec<String>>);

impl NameIndex {
    fn insert(&mut self, name: impl Into<String>, id: &str) {
        let ids = self.0.entry(name.into()).or_default();
        if !ids.iter().any(|existing| existing == id) {
            ids.push(id.to_string());
        }
    }

    fn unique(&self, name: &str) -> Option<&str> {
        match self.0.get(name).map(Vec::as_slice) {
            Some([only]) => Some(only.as_str()),
            _ => None,
        }
    }
}

fn entity_id(file: &FileReport, qualified_name: &str) -> String {
    format!("{}#{}", file.file.relative_path, qualified_name)
}

impl StructureGraph {
    fn new() -> Self {
        Self {
            graph: Graph::new(),
            node_map: HashMap::new(),
            edge_set: HashSet::new(),
        }
    }

    pub fn from_report(report: &FolderReport) -> Self {
        let mut builder = Self::new();
        let mut modules = NameIndex::default();
        let mut classes = NameIndex::default();
        let mut functions = NameIndex::default();

        for file in &report.files {
            builder.add_file(file, &mut modules, &mut classes, &mut functions);
        }
        for file in &report.files {
            builder.link_imports(file, &modules);
            for class in &file.classes {
                builder.link_parents(file, class, &classes);
            }
            for function in file.all_functions() {
                builder.link_calls(file, function, &classes, &functions);
            }
        }
        builder
    }

    fn add_file(
        &mut self,
        file: &FileReport,
        modules: &mut NameIndex,
        classes: &mut NameIndex,
        functions: &mut NameIndex,
    ) {
        let rel = &file.file.relative_path;
        let file_name = rel.rsplit('/').next().unwrap_or(rel);
        self.add_node(GraphNode {
            id: rel.clone(),
            name: file_name.to_string(),
            kind: NodeKind::File,
            file: rel.clone(),
            line: 1,
        });

        match file.file.language {
            Language::Python => {
                let mut parts = file.file.module_parts();
                if parts.last() == Some(&"__init__") {
                    parts.pop();
                }
                if !parts.is_empty() {
                    modules.insert(parts.join("."), rel);
                }
            }
            Language::C | Language::Cpp => modules.insert(rel.clone(), rel),
            Language::Java | Language::Go => {}
        }

        for function in &file.functions {
            let id = self.add_function(file, function);
            self.add_edge(rel, &id, EdgeKind::Contains, None);
            functions.insert(function.name.clone(), &id);
        }
        for class in &file.classes {
            let class_id = entity_id(file, &class.qualified_name);
            self.add_node(GraphNode {
                id: class_id.clone(),
                name: class.name.clone(),
                kind: NodeKind::Class,
                file: rel.clone(),
                line: class.line_start,
            });
            self.add_edge(rel, &class_id, EdgeKind::Contains, None);
            classes.insert(class.name.clone(), &class_id);
            if file.file.language == Language::Java {
                modules.insert(class.qualified_name.clone(), rel);
            }
            for method in &class.methods {
                let id = self.add_function(file, method);
                self.add_edge(&class_id, &id, EdgeKind::Contains, None);
                functions.insert(method.name.clone(), &id);
            }
        }
    }

    fn add_function(&mut self, file: &FileReport, function: &Function) -> String {
        let id = entity_id(file, &function.qualified_name);
        self.add_node(GraphNode {
            id: id.clone(),
            name: function.name.clone(),
            kind: NodeKind::Function,
            file: file.file.relative_path.clone(),
            line: function.line_start,
        });
        id
    }

    fn link_imports(&mut self, file: &FileReport, modules: &NameIndex) {
        let rel = &file.file.relative_path;
        for import in &file.imports {
            let target = modules.unique(&import.target).or_else(|| {
                // `from pkg import name` names a member of module `pkg`
                let (module, _) = import.target.rsplit_once('.')?;
                (file.file.language == Language::Python)
                    .then(|| modules.unique(module))
                    .flatten()
            });
            if let Some(target) = target.filter(|t| *t != rel.as_str()) {
                self.add_edge(rel, target, EdgeKind::Imports, Some(import.line));
            }
        }
    }

    fn link_parents(&mut self, file: &FileReport, class: &Class, classes: &NameIndex) {
        let id = entity_id(file, &class.qualified_name);
        let edges = class
            .parents
            .iter()
            .map(|p| (p, EdgeKind::Inherits))
            .chain(class.interfaces.iter().map(|i| (i, EdgeKind::Implements)));
        for (parent, kind) in edges {
            if let Some(target) = classes.unique(&final_segment(parent)) {
                self.add_edge(&id, target, kind, None);
            }
        }
    }

    fn link_calls(
        &mut self,
        file: &FileReport,
        function: &Function,
        classes: &NameIndex,
        functions: &NameIndex,
    ) {
        let id = entity_id(file, &function.qualified_name);
        for call in &function.calls {
            let target = match call.call_type {
                CallType::Constructor => classes.unique(&call.name),
                CallType::Dynamic => None,
                _ => functions.unique(&call.name),
            };
            if let Some(target) = target {
                self.add_edge(&id, target, EdgeKind::Calls, Some(call.line));
            }
        }
    }

    /// Adds a node, or returns the existing one with the same id (overloads
    /// share a qualified name).
    fn add_node(&mut self, node: GraphNode) -> NodeIndex {
        if let Some(index) = self.node_map.get(&node.id) {
            return *index;
        }
        let id = node.id.clone();
        let index = self.graph.add_node(node);
        self.node_map.insert(id, index);
        index
    }

    fn add_edge(
        &mut self,
        source_id: &str,
        target_id: &str,
        kind: EdgeKind,
        line: Option<usize>,
    ) -> Option<EdgeIndex> {
        let source = *self.node_map.get(source_id)?;
        let target = *self.node_map.get(target_id)?;
        if !self.edge_set.insert((source, target, kind)) {
            return None;
        }
        Some(self.graph.add_edge(source, target, GraphEdge { kind, line }))
    }

    pub fn graph(&self) -> &StructureGraphInner {
        &self.graph
    }

    pub fn node(&self, id: &str) -> Option<&GraphNode> {
        self.node_map.get(id).map(|index| &self.graph[*index])
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn has_edge(&self, source_id: &str, target_id: &str, kind: EdgeKind) -> bool {
        match (self.node_map.get(source_id), self.node_map.get(target_id)) {
            (Some(source), Some(target)) => self.edge_set.contains(&(*source, *target, kind)),
            _ => false,
        }
    }

    /// `(source id, target id)` of every edge of `kind`, in insertion order.
    pub fn edges_of_kind(&self, kind: EdgeKind) -> Vec<(&str, &str)> {
        self.graph
            .edge_references()
            .filter(|edge| edge.weight().kind == kind)
            .map(|edge| {
                (
                    self.graph[edge.source()].id.as_str(),
                    self.graph[edge.target()].id.as_str(),
                )
            })
            .collect()
    }
}

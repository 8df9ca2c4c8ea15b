pub mod analyzer;
pub mod builder;
pub mod calls;
pub mod config;
pub mod graph;
pub mod imports;
pub mod language;
pub mod model;
pub mod scanner;

pub use analyzer::{CancellationToken, FileAnalyzer, FolderAnalyzer};
pub use builder::ModelBuilder;
pub use calls::{CallSite, CallType};
pub use config::AnalyzerConfig;
pub use graph::{EdgeKind, GraphEdge, GraphNode, NodeKind, StructureGraph};
pub use language::{Language, LanguageDetector};
pub use model::{
    Attribute, Class, ClassKind, FileReport, FolderReport, Function, FunctionKind, Import,
    ImportKind, Parameter, SourceFile, SummaryCounts,
};
pub use scanner::FileScanner;

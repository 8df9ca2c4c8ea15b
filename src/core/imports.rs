use super::model::{Import, ImportKind, SourceFile};
use crate::error::Diagnostic;
use crate::parsers::events::{ImportOrigin, RawImport};

/// Outcome of resolving one raw import against its file's location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Resolved(Import),
    /// Stored, but with a warning for the file.
    Ambiguous(Import, Diagnostic),
    /// Not stored; only the warning survives.
    Dropped(Diagnostic),
}

/// Turns relative imports into absolute targets using only the file's
/// root-relative path. Never touches the filesystem.
pub struct ImportResolver<'a> {
    file: &'a SourceFile,
}

impl<'a> ImportResolver<'a> {
    pub fn new(file: &'a SourceFile) -> Self {
        Self { file }
    }

    pub fn resolve(&self, raw: RawImport) -> Resolution {
        match raw.origin {
            ImportOrigin::Absolute => Resolution::Resolved(Import {
                target: raw.path,
                kind: ImportKind::Absolute,
                raw: raw.raw,
                alias: raw.alias,
                line: raw.line,
            }),
            ImportOrigin::PythonRelative { level } => self.resolve_python(raw, level),
            ImportOrigin::LocalInclude => self.resolve_include(raw),
        }
    }

    fn resolve_python(&self, raw: RawImport, level: usize) -> Resolution {
        let module = self.file.module_parts();
        if level > module.len() {
            return Resolution::Dropped(Diagnostic::ambiguity(
                &self.file.relative_path,
                format!(
                    "relative import '{}' climbs {} levels above module '{}'",
                    raw.raw,
                    level,
                    module.join(".")
                ),
                Some(raw.line),
            ));
        }

        let base = &module[..module.len() - level];
        let target = base
            .iter()
            .copied()
            .chain(raw.path.split('.'))
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join(".");

        if target.is_empty() {
            return Resolution::Dropped(Diagnostic::ambiguity(
                &self.file.relative_path,
                format!("relative import '{}' names no module", raw.raw),
                Some(raw.line),
            ));
        }

        Resolution::Resolved(Import {
            target,
            kind: ImportKind::Relative,
            raw: raw.raw,
            alias: raw.alias,
            line: raw.line,
        })
    }

    fn resolve_include(&self, raw: RawImport) -> Resolution {
        if raw.path.starts_with('/') {
            return Resolution::Resolved(Import {
                target: raw.path,
                kind: ImportKind::Absolute,
                raw: raw.raw,
                alias: None,
                line: raw.line,
            });
        }

        match normalize_join(self.file.relative_dir(), &raw.path) {
            Some(target) => Resolution::Resolved(Import {
                target,
                kind: ImportKind::Relative,
                raw: raw.raw,
                alias: None,
                line: raw.line,
            }),
            None => {
                let diagnostic = Diagnostic::ambiguity(
                    &self.file.relative_path,
                    format!("include \"{}\" resolves outside the analysis root", raw.path),
                    Some(raw.line),
                );
                Resolution::Ambiguous(
                    Import {
                        target: raw.path,
                        kind: ImportKind::Absolute,
                        raw: raw.raw,
                        alias: None,
                        line: raw.line,
                    },
                    diagnostic,
                )
            }
        }
    }
}

/// Join `path` onto `dir` and fold `.`/`..` segments. `None` when the result
/// would leave the root.
fn normalize_join(dir: &str, path: &str) -> Option<String> {
    let mut segments: Vec<&str> = Vec::new();
    for segment in dir.split('/').chain(path.split('/')) {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop()?;
            }
            other => segments.push(other),
        }
    }
    Some(segments.join("/"))
}

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::sync::LazyLock;

use super::config::AnalyzerConfig;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Python,
    Java,
    Go,
    C,
    Cpp,
}

impl Language {
    pub const ALL: [Language; 5] = [
        Language::Python,
        Language::Java,
        Language::Go,
        Language::C,
        Language::Cpp,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Language::Python => "python",
            Language::Java => "java",
            Language::Go => "go",
            Language::C => "c",
            Language::Cpp => "cpp",
        }
    }

    /// Separator used when namespaces, packages or classes prefix an entity name.
    pub fn scope_separator(self) -> &'static str {
        match self {
            Language::C | Language::Cpp => "::",
            Language::Python | Language::Java | Language::Go => ".",
        }
    }

    /// Built-in type names a declared parent may collide with.
    pub fn builtin_types(self) -> &'static [&'static str] {
        match self {
            Language::Python => &[
                "object",
                "int",
                "str",
                "float",
                "bool",
                "bytes",
                "list",
                "dict",
                "set",
                "tuple",
                "type",
                "Exception",
                "BaseException",
                "ValueError",
                "TypeError",
                "KeyError",
                "RuntimeError",
            ],
            Language::Java => &[
                "Object",
                "String",
                "Exception",
                "RuntimeException",
                "Error",
                "Throwable",
                "Thread",
                "Record",
                "Enum",
            ],
            Language::Go => &["error", "any", "comparable"],
            Language::C | Language::Cpp => &[],
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Language {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "python" | "py" => Ok(Language::Python),
            "java" => Ok(Language::Java),
            "go" | "golang" => Ok(Language::Go),
            "c" => Ok(Language::C),
            "cpp" | "c++" | "cxx" => Ok(Language::Cpp),
            other => Err(format!("unsupported language: {other}")),
        }
    }
}

static SHEBANG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^#!\s*\S*?(?:/env(?:\s+-\S+)*\s+)?(?:\S*/)?(python)[0-9.]*(?:\s|$)")
        .expect("shebang pattern is a valid regex")
});

/// Maps file paths to grammars using the configured extension table.
#[derive(Debug, Clone, Copy)]
pub struct LanguageDetector<'a> {
    config: &'a AnalyzerConfig,
}

impl<'a> LanguageDetector<'a> {
    pub fn new(config: &'a AnalyzerConfig) -> Self {
        Self { config }
    }

    /// Extension-based detection. `None` means "skip", never an error.
    pub fn detect(&self, path: &Path) -> Option<Language> {
        let extension = path.extension()?.to_str()?;
        self.config.language_for_extension(extension)
    }

    /// Like [`detect`](Self::detect), falling back to a shebang line for files
    /// without an extension.
    pub fn detect_with_content(&self, path: &Path, content: &str) -> Option<Language> {
        if let Some(language) = self.detect(path) {
            return Some(language);
        }
        if path.extension().is_some() {
            return None;
        }
        Self::detect_from_shebang(content)
    }

    pub fn detect_from_shebang(content: &str) -> Option<Language> {
        let first_line = content.lines().next()?;
        SHEBANG
            .is_match(first_line.trim_end())
            .then_some(Language::Python)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_by_extension() {
        let config = AnalyzerConfig::default();
        let detector = LanguageDetector::new(&config);
        assert_eq!(detector.detect(Path::new("a/b.py")), Some(Language::Python));
        assert_eq!(detector.detect(Path::new("Main.java")), Some(Language::Java));
        assert_eq!(detector.detect(Path::new("main.go")), Some(Language::Go));
        assert_eq!(detector.detect(Path::new("x.c")), Some(Language::C));
        assert_eq!(detector.detect(Path::new("x.h")), Some(Language::C));
        assert_eq!(detector.detect(Path::new("x.cpp")), Some(Language::Cpp));
        assert_eq!(detector.detect(Path::new("x.hpp")), Some(Language::Cpp));
        assert_eq!(detector.detect(Path::new("x.cc")), Some(Language::Cpp));
        assert_eq!(detector.detect(Path::new("README.md")), None);
        assert_eq!(detector.detect(Path::new("Makefile")), None);
    }

    #[test]
    fn extension_match_is_case_insensitive() {
        let config = AnalyzerConfig::default();
        let detector = LanguageDetector::new(&config);
        assert_eq!(detector.detect(Path::new("LEGACY.PY")), Some(Language::Python));
    }

    #[test]
    fn shebang_only_applies_without_extension() {
        let config = AnalyzerConfig::default();
        let detector = LanguageDetector::new(&config);
        let script = "#!/usr/bin/env python3\nprint('hi')\n";
        assert_eq!(
            detector.detect_with_content(Path::new("bin/tool"), script),
            Some(Language::Python)
        );
        assert_eq!(
            detector.detect_with_content(Path::new("notes.txt"), script),
            None
        );
        assert_eq!(
            detector.detect_with_content(Path::new("bin/run"), "#!/bin/sh\necho hi\n"),
            None
        );
        assert_eq!(
            LanguageDetector::detect_from_shebang("#!/usr/bin/python\n"),
            Some(Language::Python)
        );
    }

    #[test]
    fn parses_language_tags() {
        assert_eq!("c++".parse::<Language>(), Ok(Language::Cpp));
        assert_eq!("Python".parse::<Language>(), Ok(Language::Python));
        assert!("ruby".parse::<Language>().is_err());
    }
}

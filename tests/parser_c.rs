use std::fs;
use structura::core::model::FileReport;
use structura::core::{AnalyzerConfig, ClassKind, FileAnalyzer, ImportKind};

fn analyze(relative_path: &str, code: &str) -> FileReport {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join(relative_path);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(&path, code).unwrap();
    let config = AnalyzerConfig::default();
    FileAnalyzer::new(&config, dir.path()).analyze(&path).unwrap()
}

const USER_C: &str = r#"#ifndef USER_H
#define USER_H

#include <stdlib.h>
#include "../util/str.h"

/* A registered user. */
struct User {
    int id;
    char *name;
};

union Value {
    int i;
    double d;
};

enum Role { ADMIN, MEMBER };

struct User* create_user(int id, const char* name) {
    struct User* u = malloc(sizeof(struct User));
    u->id = id;
    return u;
}

void free_user(struct User *u);

#endif
"#;

#[test]
fn structs_unions_enums_and_functions() {
    let report = analyze("src/user.c", USER_C);

    assert_eq!(report.imports.len(), 2);
    assert_eq!(report.imports[0].target, "stdlib.h");
    assert_eq!(report.imports[0].kind, ImportKind::Absolute);
    assert_eq!(report.imports[1].target, "util/str.h");
    assert_eq!(report.imports[1].kind, ImportKind::Relative);

    let user = report.class("User").unwrap();
    assert_eq!(user.kind, ClassKind::Struct);
    assert_eq!(user.docstring.as_deref(), Some("A registered user."));
    let fields: Vec<(&str, Option<&str>)> = user
        .attributes
        .iter()
        .map(|a| (a.name.as_str(), a.type_annotation.as_deref()))
        .collect();
    assert_eq!(fields, vec![("id", Some("int")), ("name", Some("char*"))]);
    assert!(user.methods.is_empty());

    assert_eq!(report.class("Value").unwrap().kind, ClassKind::Union);
    let role = report.class("Role").unwrap();
    assert_eq!(role.kind, ClassKind::Enum);
    assert_eq!(role.attributes.len(), 2);

    let create = report.function("create_user").unwrap();
    assert_eq!(create.qualified_name, "create_user");
    assert_eq!(create.return_type.as_deref(), Some("struct User*"));
    assert_eq!(create.parameter_names(), vec!["id", "name"]);
    assert_eq!(
        create.parameters[1].type_annotation.as_deref(),
        Some("const char*")
    );
    assert!(!create.is_declaration);

    let free_user = report.function("free_user").unwrap();
    assert!(free_user.is_declaration);
    assert_eq!(
        free_user.parameters[0].type_annotation.as_deref(),
        Some("struct User*")
    );
}

#[test]
fn unnamed_prototype_parameters_get_positional_names() {
    let report = analyze("api.h", "int add(int, int);\n");
    let add = report.function("add").unwrap();
    assert_eq!(add.parameter_names(), vec!["arg0", "arg1"]);
    assert_eq!(add.parameters[0].type_annotation.as_deref(), Some("int"));
}

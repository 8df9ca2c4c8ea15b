use std::fs;
use structura::core::model::FileReport;
use structura::core::{AnalyzerConfig, ClassKind, FileAnalyzer, FunctionKind};

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

#[test]
fn dog_extends_animal() {
    let code = r#"package zoo;

import java.util.List;

public class Dog extends Animal {
    private String name;

    public Dog(String name) {
        this.name = name;
    }

    @Override
    public String speak(int times) {
        return name.repeat(times);
    }
}
"#;
    let report = analyze("src/zoo/Dog.java", code);

    assert_eq!(report.imports.len(), 1);
    assert_eq!(report.imports[0].target, "java.util.List");

    let dog = report.class("Dog").unwrap();
    assert_eq!(dog.qualified_name, "zoo.Dog");
    assert_eq!(dog.kind, ClassKind::Class);
    assert_eq!(dog.parents, vec!["Animal"]);
    assert!(dog.interfaces.is_empty());
    assert_eq!(dog.attributes[0].name, "name");

    let ctor = dog.method("Dog").unwrap();
    assert_eq!(ctor.kind, FunctionKind::Constructor);
    assert_eq!(ctor.qualified_name, "zoo.Dog.Dog");

    let speak = dog.method("speak").unwrap();
    assert_eq!(speak.decorators, vec!["Override"]);
    assert_eq!(speak.return_type.as_deref(), Some("String"));
    assert_eq!(speak.parameters[0].name, "times");
    assert_eq!(speak.parameters[0].type_annotation.as_deref(), Some("int"));
}

#[test]
fn generics_interfaces_and_enums() {
    let code = r#"package util;

public class Box<T> implements Comparable<Box<T>> {
    private T value;

    public <U> U map(Function<T, U> fn) {
        return fn.apply(value);
    }
}

interface Shape {
    double area();
}

enum Color { RED, GREEN }
"#;
    let report = analyze("util/Box.java", code);

    let boxed = report.class("Box").unwrap();
    assert_eq!(boxed.type_parameters, vec!["T"]);
    assert_eq!(boxed.interfaces, vec!["Comparable<Box<T>>"]);
    let map = boxed.method("map").unwrap();
    assert_eq!(map.type_parameters, vec!["U"]);
    assert_eq!(
        map.parameters[0].type_annotation.as_deref(),
        Some("Function<T, U>")
    );
    assert_eq!(map.calls[0].callee, "fn.apply");

    let shape = report.class("Shape").unwrap();
    assert_eq!(shape.kind, ClassKind::Interface);
    assert!(shape.method("area").unwrap().is_declaration);

    let color = report.class("Color").unwrap();
    assert_eq!(color.kind, ClassKind::Enum);
    let constants: Vec<&str> = color.attributes.iter().map(|a| a.name.as_str()).collect();
    assert_eq!(constants, vec!["RED", "GREEN"]);
}

#[test]
fn signatures_and_field_access_through_this() {
    let code = r#"class Account {
    private int balance;

    Account(int start) { this.balance = start; }

    int deposit(int amount, String note) {
        this.balance += amount;
        this.audit(note);
        return this.balance;
    }
}
"#;
    let report = analyze("Account.java", code);
    let account = report.class("Account").unwrap();

    let constructor = account.method("Account").unwrap();
    assert_eq!(constructor.signature, "Account(int)");
    assert_eq!(constructor.accessed_attributes, vec!["balance"]);

    let deposit = account.method("deposit").unwrap();
    assert_eq!(deposit.signature, "deposit(int, String) -> int");
    assert_eq!(deposit.accessed_attributes, vec!["balance"]);
}

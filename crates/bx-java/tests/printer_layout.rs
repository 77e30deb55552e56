use bx_java::ast::*;
use bx_java::{compare, equivalent, JavaPrinter};
use pretty_assertions::assert_eq;

fn user_unit() -> CompilationUnit {
    let mut decl = TypeDecl::class("User");
    decl.doc = Some("A user record.".to_string());
    decl.extends = Some(JType::class("Base"));
    decl.implements = vec![JType::class("Serializable")];
    decl.members = vec![
        Member::Field(FieldDecl {
            doc: None,
            modifiers: vec![Modifier::Private],
            ty: JType::string(),
            name: "name".to_string(),
            init: Some(JExpr::string("guest")),
        }),
        Member::Constructor(ConstructorDecl {
            doc: None,
            modifiers: vec![Modifier::Public],
            name: "User".to_string(),
            params: Vec::new(),
            body: Block::new(vec![JStmt::Expr(JExpr::call(
                JExpr::field(JExpr::name("System"), "out"),
                "print",
                vec![JExpr::string("created")],
            ))]),
        }),
        Member::Method(MethodDecl {
            doc: Some("Greets.".to_string()),
            modifiers: vec![Modifier::Public],
            return_type: JType::object(),
            name: "greet".to_string(),
            params: vec![Param::new(JType::object(), "other")],
            body: Block::new(vec![JStmt::Return(Some(JExpr::binary(
                JBinaryOp::Add,
                JExpr::binary(
                    JBinaryOp::Add,
                    JExpr::string("Hello "),
                    JExpr::field(JExpr::This, "name"),
                ),
                JExpr::name("other"),
            )))]),
        }),
    ];
    CompilationUnit {
        package: Some("app.model".to_string()),
        imports: vec![
            Import::new("java.util.Map"),
            Import::new("bx.runtime.Runtime"),
            Import::new("java.util.Map"),
        ],
        types: vec![decl],
    }
}

#[test]
fn canonical_layout_of_a_full_unit() {
    let expected = r#"package app.model;

import bx.runtime.Runtime;
import java.util.Map;

public class User extends Base implements Serializable {

    private String name = "guest";

    public User() {
        System.out.print("created");
    }

    public Object greet(Object other) {
        return "Hello " + this.name + other;
    }
}
"#;
    assert_eq!(JavaPrinter::canonical().print(&user_unit()), expected);
}

#[test]
fn pretty_layout_adds_javadoc() {
    let printed = JavaPrinter::pretty().print(&user_unit());
    assert!(printed.contains("/**\n * A user record.\n */\npublic class User"));
    assert!(printed.contains("    /**\n     * Greets.\n     */\n    public Object greet"));
}

#[test]
fn statement_reordering_is_not_equivalent() {
    let unit = user_unit();
    let mut reordered = unit.clone();
    reordered.types[0].members.swap(1, 2);
    assert!(equivalent(&unit, &unit));
    assert!(!equivalent(&unit, &reordered));
    let mismatch = compare(&unit, &reordered).expect("members were swapped");
    assert_eq!(mismatch.line, 10);
}

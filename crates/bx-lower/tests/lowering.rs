use bx_core::source::SourceFile;
use bx_java::ast::*;
use bx_java::oracle::canonical;
use bx_lang::{parse, parse_file};
use bx_lower::{lower, lower_result, LowerError, LowerErrorKind, LowerOptions, ResolverKind};
use pretty_assertions::assert_eq;

fn lower_named(name: &str, text: &str, options: &LowerOptions) -> Result<CompilationUnit, LowerError> {
    let source = SourceFile::new(0, name, text);
    let parsed = parse_file(&source);
    assert!(parsed.is_correct(), "{:?}", parsed.diagnostics());
    lower_result(&parsed, options)
}

fn java(name: &str, text: &str) -> String {
    canonical(&lower_named(name, text, &LowerOptions::default()).expect("lowers"))
}

fn java_static(text: &str) -> String {
    let options = LowerOptions::default().with_resolver(ResolverKind::Static);
    canonical(&lower_named("page.cfm", text, &options).expect("lowers"))
}

fn error_kind(name: &str, text: &str, options: &LowerOptions) -> LowerErrorKind {
    lower_named(name, text, options).expect_err("lowering fails").kind
}

#[test]
fn component_method_matches_hand_built_unit() {
    let actual = lower_named(
        "Calc.cfc",
        "component { function int add(a, b) { return a + b; } }",
        &LowerOptions::default(),
    )
    .unwrap();

    let mut decl = TypeDecl::class("Calc");
    decl.members.push(Member::Method(MethodDecl {
        doc: None,
        modifiers: vec![Modifier::Public],
        return_type: JType::Primitive(Primitive::Int),
        name: "add".to_string(),
        params: vec![
            Param::new(JType::object(), "a"),
            Param::new(JType::object(), "b"),
        ],
        body: Block::new(vec![JStmt::Return(Some(JExpr::binary(
            JBinaryOp::Add,
            JExpr::name("a"),
            JExpr::name("b"),
        )))]),
    }));
    let expected = CompilationUnit {
        package: None,
        imports: Vec::new(),
        types: vec![decl],
    };
    assert!(bx_java::equivalent(&expected, &actual));
    assert_eq!(bx_java::compare(&expected, &actual), None);
}

#[test]
fn operand_order_is_significant() {
    let ab = lower_named("Calc.cfc", "component { function add(a, b) { return a + b; } }", &LowerOptions::default()).unwrap();
    let ba = lower_named("Calc.cfc", "component { function add(a, b) { return b + a; } }", &LowerOptions::default()).unwrap();
    assert!(bx_java::equivalent(&ab, &ab));
    assert!(!bx_java::equivalent(&ab, &ba));
}

#[test]
fn trailing_expression_is_returned() {
    let out = java("Math.cfc", "component { function twice(x) { x * 2; } void function touch(x) { x * 2; } }");
    assert!(out.contains("    public Object twice(Object x) {\n        return x * 2;\n    }\n"));
    assert!(out.contains("    public void touch(Object x) {\n    }\n"), "{}", out);
}

#[test]
fn templates_become_concatenation() {
    let out = java(
        "Hello.cfc",
        r##"component { function hi(name) { return "Hello #name#!"; } function pair(a, b) { return "#a##b#"; } }"##,
    );
    assert!(out.contains("        return \"Hello \" + name + \"!\";\n"));
    assert!(out.contains("        return \"\" + a + b;\n"));
}

#[test]
fn later_declaration_shadows_parameter() {
    let out = java(
        "Shadow.cfc",
        "component { function f(x) { y = x; var x = 2; return x; } }",
    );
    let expected = "    public Object f(Object x) {\n        Object y = x;\n        Object x1 = 2;\n        return x1;\n    }\n";
    assert!(out.contains(expected), "{}", out);
}

#[test]
fn scope_qualifiers_resolve() {
    let out = java(
        "Scoped.cfc",
        "component { function f(a) { local.b = arguments.a; this.name = local.b; return variables.name; } }",
    );
    assert!(out.contains("    public Object name;\n"));
    assert!(out.contains("        Object b = a;\n        this.name = b;\n        return this.name;\n"));
}

#[test]
fn scope_errors_are_reported() {
    let options = LowerOptions::default();
    assert_eq!(
        error_kind("A.cfc", "component { function f(a) { return arguments.z; } }", &options),
        LowerErrorKind::UnknownArgument { name: "z".to_string() }
    );
    assert_eq!(
        error_kind("A.cfc", "component { function f() { return local.q; } }", &options),
        LowerErrorKind::UndeclaredLocal { name: "q".to_string() }
    );
    assert_eq!(
        error_kind("A.cfc", "component { function a(x) {} function b() { a(y = 1); } }", &options),
        LowerErrorKind::UnknownArgument { name: "y".to_string() }
    );
}

#[test]
fn unsupported_constructs_name_the_node() {
    let options = LowerOptions::default();
    let kind = error_kind("A.cfc", "component { function f() { rethrow; } }", &options);
    assert!(matches!(kind, LowerErrorKind::Unsupported { node } if node.contains("rethrow")));

    let kind = error_kind("A.cfc", "component { function f(a) { a[1](); } }", &options);
    assert!(matches!(kind, LowerErrorKind::Unsupported { node } if node.contains("index access")));

    let kind = error_kind(
        "A.cfc",
        "component { function outer() { function inner() { return 1; } } }",
        &options,
    );
    assert!(matches!(kind, LowerErrorKind::Unsupported { node } if node.contains("inner")));
}

#[test]
fn member_calls_reorder_named_arguments() {
    let out = java(
        "Calls.cfc",
        "component { function show(first, second, third) { return first; } function run() { return show(third = 3, first = 1); } }",
    );
    assert!(out.contains("        return this.show(1, null, 3);\n"), "{}", out);
}

#[test]
fn strict_resolver_rejects_unbound_names() {
    let options = LowerOptions::default().with_resolver(ResolverKind::Strict);
    let err = lower_named("page.cfm", "x = 1;\ny = foo;", &options).unwrap_err();
    assert_eq!(err.kind, LowerErrorKind::Unresolved { name: "foo".to_string() });
    assert_eq!((err.span.start.line, err.span.start.column), (2, 5));
}

#[test]
fn operators_map_to_java_forms() {
    let out = java_static(
        "r = a ^ 2;\ns = a mod 3;\nt = a contains \"x\";\nu = a ?: \"d\";\nv = [1, 2];\nw = {k: 1};\nz = a & b;",
    );
    for line in [
        "        this.r = Math.pow(a, 2);",
        "        this.s = a % 3;",
        "        this.t = Runtime.contains(a, \"x\");",
        "        this.u = Objects.requireNonNullElse(a, \"d\");",
        "        this.v = List.of(1, 2);",
        "        this.w = Map.of(\"k\", 1);",
        "        this.z = \"\" + a + b;",
    ] {
        assert!(out.contains(line), "missing `{}` in\n{}", line, out);
    }
    assert!(out.starts_with(
        "import bx.runtime.Runtime;\nimport java.util.List;\nimport java.util.Map;\nimport java.util.Objects;\n\n"
    ));
}

#[test]
fn switch_cases_fall_through() {
    let out = java_static(
        "switch (x) { case 1: case 2: y = \"low\"; break; default: y = \"high\"; }",
    );
    let expected = [
        "        switch (x) {",
        "            case 1:",
        "            case 2:",
        "                this.y = \"low\";",
        "                break;",
        "            default:",
        "                this.y = \"high\";",
        "        }",
    ]
    .join("\n");
    assert!(out.contains(&expected), "{}", out);
}

#[test]
fn catch_and_rethrow() {
    let out = java_static("try { risky(); } catch (any e) { rethrow; } finally { done(); }");
    let expected = [
        "        try {",
        "            risky();",
        "        } catch (Exception e) {",
        "            throw e;",
        "        } finally {",
        "            done();",
        "        }",
    ]
    .join("\n");
    assert!(out.contains(&expected), "{}", out);
}

#[test]
fn throw_wraps_message_in_exception() {
    let out = java("T.cfc", r#"component { function f(x) { if (x) { throw "boom"; } throw x; } }"#);
    assert!(out.contains("            throw new RuntimeException(\"boom\");\n"));
    assert!(out.contains("        throw new RuntimeException(String.valueOf(x));\n"));
}

#[test]
fn query_output_iterates_rows() {
    let out = java("users.cfm", "<cfoutput query=\"users\">#name#</cfoutput>");
    assert!(out.contains(
        "        for (Object row : Runtime.queryRows(Runtime.lookup(\"users\"))) {\n            System.out.print(\"\" + Runtime.lookup(\"name\"));\n        }\n"
    ), "{}", out);
    assert!(out.contains("import bx.runtime.Runtime;\n"));
}

#[test]
fn script_template_shares_fields_with_functions() {
    let parsed = parse("count = 1;\nfunction bump() { count++; }\nbump();");
    let program = parsed.program().expect("parses");
    let out = canonical(&lower(program).unwrap());
    let expected = r#"public class Template {

    private Object count;

    public void run() {
        this.count = 1;
        this.bump();
    }

    public void bump() {
        this.count++;
    }
}
"#;
    assert_eq!(out, expected);
}

#[test]
fn class_name_and_package_options() {
    let options = LowerOptions::default()
        .with_package("app.models")
        .with_class_name("Fallback");
    let unit = lower_named("Acct.cfc", "component name=\"models.Account\" { }", &options).unwrap();
    assert_eq!(canonical(&unit), "package app.models;\n\npublic class Account {\n}\n");

    let program = parse("x = 1;").into_result().unwrap();
    let unit = bx_lower::lower_with(&program, &options).unwrap();
    assert_eq!(unit.types[0].name, "Fallback");
}

#[test]
fn failed_parse_is_not_lowered() {
    let parsed = parse("x = (1 + ;");
    let err = lower_result(&parsed, &LowerOptions::default()).unwrap_err();
    assert_eq!(err.kind, LowerErrorKind::NotCorrect);
}

#[test]
fn deep_nesting_is_bounded() {
    let text = format!("x = 1{};", " + 1".repeat(40));
    let program = parse(&text).into_result().unwrap();
    let options = LowerOptions {
        max_depth: 8,
        ..LowerOptions::default()
    };
    let err = bx_lower::lower_with(&program, &options).unwrap_err();
    assert_eq!(err.kind, LowerErrorKind::DepthExceeded);
}

#[test]
fn locals_declared_in_blocks_are_hoisted() {
    let out = java("H.cfc", "component { function f(c) { if (c) { x = 1; } return x; } }");
    let expected = [
        "    public Object f(Object c) {",
        "        Object x = null;",
        "        if (c) {",
        "            x = 1;",
        "        }",
        "        return x;",
        "    }",
    ]
    .join("\n");
    assert!(out.contains(&expected), "{}", out);
}

#[test]
fn loop_counters_outlive_their_loops() {
    let out = java(
        "L.cfc",
        "component { function f(n) { for (i = 0; i < n; i++) { } for (i = 0; i < n; i++) { } return i; } }",
    );
    assert!(out.contains("        Object i;\n        for (i = 0; i < n; i++) {"), "{}", out);
    assert_eq!(out.matches("for (i = 0; i < n; i++) {").count(), 2, "{}", out);
    assert_eq!(out.matches("Object i").count(), 1, "{}", out);
    assert!(out.contains("        return i;\n"), "{}", out);
}

#[test]
fn hoisted_names_avoid_ended_loop_variables() {
    let out = java(
        "E.cfc",
        "component { function f(xs) { for (item in xs) { } if (xs) { item = 1; } return item; } }",
    );
    assert!(out.contains("        Object item1 = null;\n"), "{}", out);
    assert!(out.contains("            item1 = 1;\n"), "{}", out);
    assert!(out.contains("        return item1;\n"), "{}", out);
}

#[test]
fn tag_bodies_share_the_enclosing_block() {
    let out = java(
        "T.cfc",
        r#"component { function f() { cfsavecontent(variable = "out") { y = 1; } y = 2; return y; } }"#,
    );
    assert_eq!(out.matches("Object y").count(), 1, "{}", out);
    assert!(out.contains("        Object y = 1;\n"), "{}", out);
    assert!(out.contains("        y = 2;\n        return y;\n"), "{}", out);
}

#[test]
fn query_columns_read_the_current_row() {
    let out = java("q.cfm", "<cfloop query=\"q\"><cfoutput>#q.name#</cfoutput></cfloop>");
    assert!(out.contains("for (Object row : Runtime.queryRows("), "{}", out);
    assert!(out.contains("System.out.print(\"\" + Runtime.get(row, \"name\"))"), "{}", out);
}

#[test]
fn closures_become_runtime_lambdas() {
    let out = java(
        "C.cfc",
        "component { function f() { add = function (a) { return a; }; return add(1); } }",
    );
    let expected = [
        "        Object add = Runtime.closure((Object a) -> {",
        "            return a;",
        "        });",
        "        return Runtime.invoke(add, 1);",
    ]
    .join("\n");
    assert!(out.contains(&expected), "{}", out);

    let out = java("C.cfc", "component { function f(cb) { cb(); } }");
    assert!(out.contains("        Runtime.invoke(cb);\n"), "{}", out);
}

#[test]
fn closures_only_capture_unchanging_locals() {
    let options = LowerOptions::default();
    let kind = error_kind(
        "C.cfc",
        "component { function f() { n = 0; g = function () { n = 1; }; return g; } }",
        &options,
    );
    assert!(matches!(kind, LowerErrorKind::Unsupported { node } if node.contains("`n`")));

    let kind = error_kind(
        "C.cfc",
        "component { function f() { n = 0; g = function () { return n; }; n = 2; return g; } }",
        &options,
    );
    assert!(matches!(kind, LowerErrorKind::Unsupported { node } if node.contains("reassigned")));
}

#[test]
fn effectful_expression_statements_are_kept() {
    let out = java(
        "D.cfc",
        "component { function g(a) { return a; } function f(x) { x + g(x); return x; } }",
    );
    assert!(out.contains("        Object discarded = x + this.g(x);\n"), "{}", out);
}

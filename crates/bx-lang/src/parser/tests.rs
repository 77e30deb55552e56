use bx_core::ast::*;
use pretty_assertions::assert_eq;

use crate::{parse, ParseResult};

fn parse_ok(src: &str) -> Program {
    match parse(src) {
        ParseResult::Correct(program) => program,
        ParseResult::Failed(diagnostics) => {
            let messages: Vec<String> = diagnostics.iter().map(|d| d.to_string()).collect();
            panic!("parse failed for `{src}`: {messages:#?}")
        }
    }
}

fn script_body(src: &str) -> Vec<Stmt> {
    match parse_ok(src).kind {
        ProgramKind::Script(script) => script.body,
        ProgramKind::Component(_) => panic!("expected a script"),
    }
}

fn component(src: &str) -> Component {
    match parse_ok(src).kind {
        ProgramKind::Component(component) => component,
        ProgramKind::Script(_) => panic!("expected a component"),
    }
}

fn expr_of(stmt: &Stmt) -> &Expr {
    match &stmt.kind {
        StmtKind::Expr(expr) => expr,
        other => panic!("expected expression statement, got {other:?}"),
    }
}

fn number(expr: &Expr) -> &str {
    match &expr.kind {
        ExprKind::Literal(Literal::Number(text)) => text,
        other => panic!("expected number, got {other:?}"),
    }
}

#[test]
fn multiplication_binds_tighter_than_addition() {
    let body = script_body("x = 1 + 2 * 3;");
    let ExprKind::Assign { op, target, value } = &expr_of(&body[0]).kind else {
        panic!("expected assignment");
    };
    assert_eq!(*op, AssignOp::Assign);
    assert_eq!(target.as_ident().map(Ident::as_str), Some("x"));
    let ExprKind::Binary { op, lhs, rhs } = &value.kind else {
        panic!("expected addition");
    };
    assert_eq!(*op, BinaryOp::Add);
    assert_eq!(number(lhs), "1");
    assert!(matches!(
        rhs.kind,
        ExprKind::Binary {
            op: BinaryOp::Mul,
            ..
        }
    ));
}

#[test]
fn word_operators_map_to_binary_ops() {
    let body = script_body("a = b is not c; d = e does not contain f; g = not h eq i;");
    let ops: Vec<_> = body
        .iter()
        .map(|stmt| match &expr_of(stmt).kind {
            ExprKind::Assign { value, .. } => match &value.kind {
                ExprKind::Binary { op, .. } => format!("{op:?}"),
                ExprKind::Unary { op, operand } => match &operand.kind {
                    ExprKind::Binary { op: inner, .. } => format!("{op:?}({inner:?})"),
                    _ => format!("{op:?}"),
                },
                other => panic!("unexpected {other:?}"),
            },
            other => panic!("unexpected {other:?}"),
        })
        .collect();
    assert_eq!(ops, vec!["Ne", "NotContains", "Not(Eq)"]);
}

#[test]
fn power_is_right_associative() {
    let body = script_body("x = 2 ^ 3 ^ 2;");
    let ExprKind::Assign { value, .. } = &expr_of(&body[0]).kind else {
        panic!("expected assignment");
    };
    let ExprKind::Binary { op, lhs, rhs } = &value.kind else {
        panic!("expected power");
    };
    assert_eq!(*op, BinaryOp::Pow);
    assert_eq!(number(lhs), "2");
    assert!(matches!(
        rhs.kind,
        ExprKind::Binary {
            op: BinaryOp::Pow,
            ..
        }
    ));
}

#[test]
fn interpolated_strings_become_templates() {
    let body = script_body(r#"msg = "Hello #name#!"; plain = 'it''s';"#);
    let ExprKind::Assign { value, .. } = &expr_of(&body[0]).kind else {
        panic!("expected assignment");
    };
    let ExprKind::Template(parts) = &value.kind else {
        panic!("expected template, got {:?}", value.kind);
    };
    assert_eq!(parts.len(), 3);
    assert_eq!(parts[0], TemplatePart::Text("Hello ".to_string()));
    assert!(matches!(&parts[1], TemplatePart::Hole(e) if e.as_ident().is_some_and(|i| i.is("NAME"))));
    assert_eq!(parts[2], TemplatePart::Text("!".to_string()));

    let ExprKind::Assign { value, .. } = &expr_of(&body[1]).kind else {
        panic!("expected assignment");
    };
    assert_eq!(value.as_str_literal(), Some("it's"));
}

#[test]
fn named_arguments_and_literals() {
    let body = script_body(r#"f(a = 1, b: [1, 2], c = {x: 1, "y" = 2});"#);
    let ExprKind::Call { args, .. } = &expr_of(&body[0]).kind else {
        panic!("expected call");
    };
    let names: Vec<_> = args
        .iter()
        .map(|arg| arg.name.as_ref().map(|n| n.name.clone()))
        .collect();
    assert_eq!(
        names,
        vec![Some("a".into()), Some("b".into()), Some("c".into())]
    );
    assert!(matches!(&args[1].value.kind, ExprKind::Array(items) if items.len() == 2));
    let ExprKind::Struct(entries) = &args[2].value.kind else {
        panic!("expected struct");
    };
    let keys: Vec<_> = entries.iter().map(|e| e.key.name.as_str()).collect();
    assert_eq!(keys, vec!["x", "y"]);
}

#[test]
fn for_loops_in_both_forms() {
    let body = script_body(
        "for (var i = 1; i <= 10; i++) { total += i; }\nfor (var item in items) { n++; }\nfor (k in s) {}",
    );
    assert!(matches!(
        &body[0].kind,
        StmtKind::For {
            init: Some(ForInit::Var { .. }),
            cond: Some(_),
            step: Some(_),
            ..
        }
    ));
    assert!(matches!(
        &body[1].kind,
        StmtKind::ForIn { var, declared: true, .. } if var.is("item")
    ));
    assert!(matches!(
        &body[2].kind,
        StmtKind::ForIn { declared: false, .. }
    ));
}

#[test]
fn switch_cases_keep_fallthrough_labels() {
    let body = script_body(
        r#"switch (x) { case 1: case 2: y = "low"; break; default: y = "high"; }"#,
    );
    let StmtKind::Switch { cases, .. } = &body[0].kind else {
        panic!("expected switch");
    };
    assert_eq!(cases.len(), 3);
    assert!(cases[0].body.is_empty());
    assert_eq!(cases[1].body.len(), 2);
    assert!(cases[2].is_default());
}

#[test]
fn try_catch_finally() {
    let body = script_body("try { a(); } catch (any e) { b(); } catch (e2) {} finally { c(); }");
    let StmtKind::Try {
        catches, finally, ..
    } = &body[0].kind
    else {
        panic!("expected try");
    };
    assert_eq!(catches.len(), 2);
    assert_eq!(
        catches[0].exception_type.as_ref().map(|t| t.name.as_str()),
        Some("any")
    );
    assert!(catches[1].exception_type.is_none());
    assert!(finally.is_some());
}

#[test]
fn script_component_members_are_sorted_out() {
    let component = component(
        r#"
        import java.util.List;
        component extends="models.Base" accessors=true {
            property name="count" type="numeric" default="0";
            property string label;

            variables.ready = true;

            public numeric function add(required numeric a, b = 2) output=false {
                return a + b;
            }

            private function helper() {}
        }
        "#,
    );
    assert_eq!(
        component.extends.as_ref().map(|e| e.text.as_str()),
        Some("models.Base")
    );
    assert_eq!(component.imports[0].path.text, "java.util.List");
    assert!(component.attribute("accessors").is_some());
    assert_eq!(component.properties.len(), 2);
    assert_eq!(component.properties[1].name.name, "label");
    assert_eq!(
        component.properties[1]
            .type_hint
            .as_ref()
            .map(|t| t.name.as_str()),
        Some("string")
    );
    assert_eq!(component.body.len(), 1);
    assert_eq!(component.functions.len(), 2);

    let add = &component.functions[0];
    assert_eq!(add.access, Some(Access::Public));
    assert_eq!(
        add.return_type.as_ref().map(|t| t.name.as_str()),
        Some("numeric")
    );
    assert!(add.params[0].required);
    assert_eq!(
        add.params[0].type_hint.as_ref().map(|t| t.name.as_str()),
        Some("numeric")
    );
    assert!(add.params[1].default.is_some());
    assert!(add.attribute("output").is_some());
    assert_eq!(component.functions[1].access, Some(Access::Private));
}

#[test]
fn return_type_may_follow_function_keyword() {
    let component = component(
        "component { function int add(a, b) { return a + b; } public function java.util.List names() {} }",
    );
    let types: Vec<_> = component
        .functions
        .iter()
        .map(|f| (f.name.as_str(), f.return_type.as_ref().map(|t| t.name.as_str())))
        .collect();
    assert_eq!(
        types,
        vec![("add", Some("int")), ("names", Some("java.util.List"))]
    );
    assert_eq!(component.functions[1].access, Some(Access::Public));

    let ParseResult::Failed(diagnostics) = parse("component { string function int f() {} }") else {
        panic!("expected failure");
    };
    assert!(diagnostics[0].message.contains("return type given twice"));
}

#[test]
fn template_if_chain_nests_else_if() {
    let body = script_body("<cfif a eq 1>one<cfelseif a eq 2>two<cfelse>other</cfif>");
    assert_eq!(body.len(), 1);
    let StmtKind::If {
        then_branch,
        else_branch: Some(ElseBranch::If(nested)),
        ..
    } = &body[0].kind
    else {
        panic!("expected if with else-if, got {:?}", body[0].kind);
    };
    assert!(matches!(then_branch.stmts[0].kind, StmtKind::Output(_)));
    assert!(matches!(
        &nested.kind,
        StmtKind::If {
            else_branch: Some(ElseBranch::Block(_)),
            ..
        }
    ));
}

#[test]
fn cfloop_from_to_becomes_counting_for() {
    let body = script_body(r##"<cfloop from="1" to="#n#" index="i"><cfset total += i></cfloop>"##);
    let StmtKind::For {
        init: Some(ForInit::Expr(init)),
        cond: Some(cond),
        step: Some(step),
        body,
    } = &body[0].kind
    else {
        panic!("expected for, got {:?}", body[0].kind);
    };
    let ExprKind::Assign { target, value, .. } = &init.kind else {
        panic!("expected init assignment");
    };
    assert!(target.as_ident().is_some_and(|i| i.is("i")));
    assert_eq!(number(value), "1");
    let ExprKind::Binary { op, rhs, .. } = &cond.kind else {
        panic!("expected comparison");
    };
    assert_eq!(*op, BinaryOp::Le);
    assert!(rhs.as_ident().is_some_and(|i| i.is("n")));
    assert!(matches!(
        step.kind,
        ExprKind::Unary {
            op: UnaryOp::PostInc,
            ..
        }
    ));
    assert_eq!(body.stmts.len(), 1);
}

#[test]
fn cfloop_condition_is_parsed_in_place() {
    let body = script_body(r#"<cfloop condition="i lt 10"><cfset i++></cfloop>"#);
    let StmtKind::While { cond, .. } = &body[0].kind else {
        panic!("expected while");
    };
    assert!(matches!(
        cond.kind,
        ExprKind::Binary {
            op: BinaryOp::Lt,
            ..
        }
    ));
    assert_eq!(cond.span.start.line, 1);
    assert_eq!(cond.span.start.column, 20);
}

#[test]
fn cfoutput_query_loops_and_plain_output_inlines() {
    let body = script_body(
        "<cfoutput query=\"users\">#name#\n</cfoutput><cfoutput>Total: #count#</cfoutput>",
    );
    assert_eq!(body.len(), 2);
    let StmtKind::QueryLoop { query, body: rows, .. } = &body[0].kind else {
        panic!("expected query loop");
    };
    assert!(query.as_ident().is_some_and(|i| i.is("users")));
    assert_eq!(rows.stmts.len(), 1);
    let StmtKind::Output(expr) = &body[1].kind else {
        panic!("expected output");
    };
    assert!(matches!(&expr.kind, ExprKind::Template(parts) if parts.len() == 2));
}

#[test]
fn generic_tags_take_a_body_only_when_closed() {
    let body = script_body(r#"<cfmail to="a@b.c"><p>hi</p></cfmail><cfheader name="X" value="1">"#);
    assert_eq!(body.len(), 2);
    let StmtKind::TagInvocation(mail) = &body[0].kind else {
        panic!("expected tag invocation");
    };
    assert!(mail.name.is("mail"));
    assert_eq!(mail.body.as_ref().map(|b| b.stmts.len()), Some(1));
    let StmtKind::TagInvocation(header) = &body[1].kind else {
        panic!("expected tag invocation");
    };
    assert!(header.body.is_none());
    assert_eq!(header.attributes.len(), 2);
}

#[test]
fn script_tag_calls_share_tag_semantics() {
    let body = script_body(r#"cfloop(array = items, item = "x") { y = x; } cfheader(name = "n");"#);
    assert!(matches!(&body[0].kind, StmtKind::ForIn { var, .. } if var.is("x")));
    assert!(matches!(&body[1].kind, StmtKind::TagInvocation(tag) if tag.name.is("header")));

    let body = script_body("cfFormat(value);");
    assert!(matches!(body[0].kind, StmtKind::Expr(_)));
}

#[test]
fn tag_component_with_functions() {
    let component = component(
        r#"<cfcomponent displayname="Greeter">
    <cfproperty name="greeting" type="string" default="Hello">
    <cffunction name="greet" access="public" returntype="string">
        <cfargument name="who" type="string" required="true">
        <cfreturn greeting & " " & who>
    </cffunction>
</cfcomponent>"#,
    );
    assert_eq!(component.properties.len(), 1);
    assert_eq!(component.functions.len(), 1);
    let greet = &component.functions[0];
    assert!(greet.params[0].required);
    assert!(matches!(greet.body.stmts[0].kind, StmtKind::Return(Some(_))));
    assert!(component.body.is_empty());
}

#[test]
fn cftry_uses_cfcatch_variable() {
    let body = script_body(
        r#"<cftry><cfset risky()><cfcatch type="any"><cfrethrow></cfcatch></cftry>"#,
    );
    let StmtKind::Try { catches, .. } = &body[0].kind else {
        panic!("expected try");
    };
    assert_eq!(catches[0].var.name, "cfcatch");
    assert!(matches!(catches[0].body.stmts[0].kind, StmtKind::Rethrow));
}

#[test]
fn independent_errors_are_all_reported() {
    let ParseResult::Failed(diagnostics) = parse("x = (1 + ;\ny = 2;\nz = * 3;") else {
        panic!("expected failure");
    };
    assert_eq!(diagnostics.len(), 2);
    let lines: Vec<_> = diagnostics
        .iter()
        .filter_map(|d| d.span.map(|s| s.start.line))
        .collect();
    assert_eq!(lines, vec![1, 3]);
}

#[test]
fn template_errors_recover_at_next_tag() {
    let ParseResult::Failed(diagnostics) = parse("<cfset x = >\n<cfset y = 1>\n<cfset = 2>") else {
        panic!("expected failure");
    };
    assert_eq!(diagnostics.len(), 2);
}

#[test]
fn excessive_nesting_is_an_error() {
    let src = format!("x = {}1{};", "(".repeat(1000), ")".repeat(1000));
    let ParseResult::Failed(diagnostics) = parse(&src) else {
        panic!("expected failure");
    };
    assert_eq!(diagnostics.len(), 1);
    assert!(diagnostics[0].message.contains("nesting too deep"));
}

fn on_small_stack<T: Send + 'static>(f: impl FnOnce() -> T + Send + 'static) -> T {
    std::thread::Builder::new()
        .stack_size(2 << 20)
        .spawn(f)
        .unwrap()
        .join()
        .unwrap()
}

#[test]
fn deep_nesting_fails_before_the_stack_does() {
    let inputs = vec![
        format!("{}x = 1;{}", "if (a) {".repeat(200), "}".repeat(200)),
        format!("{}x{}", "<cfif a>".repeat(200), "</cfif>".repeat(200)),
        format!("x = {}1{};", "[".repeat(300), "]".repeat(300)),
    ];
    let outcomes = on_small_stack(move || {
        inputs
            .iter()
            .map(|src| match parse(src) {
                ParseResult::Failed(diagnostics) => diagnostics
                    .iter()
                    .any(|d| d.message.contains("nesting too deep")),
                ParseResult::Correct(_) => false,
            })
            .collect::<Vec<_>>()
    });
    assert_eq!(outcomes, vec![true, true, true]);

    let shallow = format!("{}x = 1;{}", "if (a) {".repeat(10), "}".repeat(10));
    assert!(on_small_stack(move || parse(&shallow).is_correct()));
}

fn closure_of(stmt: &Stmt) -> &Closure {
    let ExprKind::Assign { value, .. } = &expr_of(stmt).kind else {
        panic!("expected an assignment");
    };
    let ExprKind::Closure(closure) = &value.kind else {
        panic!("expected a closure, got {:?}", value.kind);
    };
    closure
}

fn param_names(closure: &Closure) -> Vec<&str> {
    closure.params.iter().map(|param| param.name.as_str()).collect()
}

#[test]
fn function_expressions_are_closures() {
    let body = script_body("f = function(a, b = 2) { return a + b; };");
    let closure = closure_of(&body[0]);
    assert_eq!(param_names(closure), vec!["a", "b"]);
    assert!(closure.params[1].default.is_some());
    assert!(matches!(closure.body.stmts[0].kind, StmtKind::Return(Some(_))));
}

#[test]
fn arrow_functions_wrap_expression_bodies() {
    let body = script_body("g = (x, y) => x * y;\nh = n => { return n; };\nk = (a + b) * 2;");
    let closure = closure_of(&body[0]);
    assert_eq!(param_names(closure), vec!["x", "y"]);
    assert_eq!(closure.body.stmts.len(), 1);
    assert!(matches!(closure.body.stmts[0].kind, StmtKind::Return(Some(_))));

    assert_eq!(param_names(closure_of(&body[1])), vec!["n"]);

    let ExprKind::Assign { value, .. } = &expr_of(&body[2]).kind else {
        panic!("expected an assignment");
    };
    assert!(matches!(value.kind, ExprKind::Binary { .. }));
}

#[test]
fn closure_bodies_inside_tags_are_script() {
    let body = script_body("<cfset f = function(a) { return a; }>");
    let StmtKind::Expr(expr) = &body[0].kind else {
        panic!("expected an expression statement");
    };
    assert!(matches!(&expr.kind, ExprKind::Assign { value, .. } if matches!(value.kind, ExprKind::Closure(_))));
}

#[test]
fn second_component_is_rejected() {
    assert!(!parse("component {} component {}").is_correct());
    assert!(!parse("x = 1; component {}").is_correct());
}

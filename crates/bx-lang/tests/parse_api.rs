use bx_core::ast::{ProgramKind, StmtKind};
use bx_core::source::SourceFile;
use bx_lang::{parse, parse_file, CfmlFrontend, ParseResult, SourceFrontend};
use pretty_assertions::assert_eq;

#[test]
fn lexical_errors_fail_with_a_single_located_diagnostic() {
    let source = SourceFile::new(3, "broken.cfm", "<cfset x = \"open>\n");
    let result = parse_file(&source);
    let records = result.records(&source);
    assert_eq!(records.len(), 1);
    let span = records[0].span.as_ref().expect("lex errors carry a span");
    assert_eq!(span.file, "broken.cfm");
    assert_eq!((span.start_line, span.start_column), (1, 12));
}

#[test]
fn diagnostic_records_serialize_in_camel_case() {
    let source = SourceFile::new(0, "a.cfm", "<cfset x = >");
    let records = parse_file(&source).records(&source);
    let json = serde_json::to_value(&records).unwrap();
    let span = &json[0]["span"];
    assert_eq!(span["file"], "a.cfm");
    assert_eq!(span["startLine"], 1);
    assert!(span.get("startColumn").is_some());
    assert!(span.get("endColumn").is_some());
}

#[test]
fn empty_input_is_an_empty_script() {
    let ParseResult::Correct(program) = parse("") else {
        panic!("empty input should parse");
    };
    let ProgramKind::Script(script) = program.kind else {
        panic!("expected script");
    };
    assert!(script.body.is_empty());
    assert!(program.source_name.is_none());
}

#[test]
fn cfscript_blocks_splice_into_templates() {
    let ParseResult::Correct(program) =
        parse("<p>before</p>\n<cfscript>\n  x = 1;\n  if (x) { y = 2; }\n</cfscript>\n<p>after</p>")
    else {
        panic!("expected success");
    };
    let ProgramKind::Script(script) = program.kind else {
        panic!("expected script");
    };
    let kinds: Vec<_> = script.body.iter().map(|s| s.kind_name()).collect();
    assert_eq!(kinds, vec!["output", "expression statement", "if", "output"]);
}

#[test]
fn frontend_applies_file_conventions() {
    let frontend = CfmlFrontend::default();
    let component = SourceFile::new(
        0,
        "models/User.cfc",
        "component { function name() { return \"u\"; } }",
    );
    let ParseResult::Correct(program) = frontend.parse(&component) else {
        panic!("component should parse");
    };
    assert_eq!(program.source_name.as_deref(), Some("models/User.cfc"));

    let template = SourceFile::new(0, "index.cfm", "<cfcomponent></cfcomponent>");
    assert!(!frontend.parse(&template).is_correct());
}

#[test]
fn template_functions_stay_statements() {
    let ParseResult::Correct(program) = parse(
        "<cffunction name=\"twice\"><cfargument name=\"n\" type=\"numeric\" default=\"1\"><cfreturn n * 2></cffunction>",
    ) else {
        panic!("expected success");
    };
    let ProgramKind::Script(script) = program.kind else {
        panic!("expected script");
    };
    let StmtKind::Function(function) = &script.body[0].kind else {
        panic!("expected function");
    };
    assert_eq!(function.name.name, "twice");
    let default = function.params[0].default.as_ref().expect("default");
    assert!(matches!(
        &default.kind,
        bx_core::ast::ExprKind::Literal(bx_core::ast::Literal::Number(n)) if n == "1"
    ));
}

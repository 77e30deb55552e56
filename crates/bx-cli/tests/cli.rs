use std::fs;
use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;
use pretty_assertions::assert_eq;
use tempfile::TempDir;

const CALC: &str = "component {\n    function int add(a, b) {\n        return a + b;\n    }\n}\n";

const CALC_JAVA: &str = "public class Calc {

    public int add(Object a, Object b) {
        return a + b;
    }
}
";

/// `bxc` running inside `dir`, isolated from the user's config and logging.
fn bxc(dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("bxc").unwrap();
    cmd.current_dir(dir).env("HOME", dir).env_remove("RUST_LOG");
    cmd
}

fn workspace(files: &[(&str, &str)]) -> TempDir {
    let dir = TempDir::new().unwrap();
    for (name, text) in files {
        let path = dir.path().join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, text).unwrap();
    }
    dir
}

#[test]
fn transpile_prints_to_stdout() {
    let dir = workspace(&[("Calc.cfc", CALC)]);
    let output = bxc(dir.path()).args(["transpile", "Calc.cfc"]).output().unwrap();
    assert!(output.status.success());
    assert_eq!(String::from_utf8(output.stdout).unwrap(), CALC_JAVA);
}

#[test]
fn transpile_writes_class_files() {
    let dir = workspace(&[
        ("src/Calc.cfc", CALC),
        ("src/views/index.cfm", "<cfset greeting = \"hi\">\n"),
    ]);
    bxc(dir.path())
        .args(["transpile", "src", "-o", "out", "--package", "app"])
        .assert()
        .success()
        .stdout(predicate::str::is_empty());

    let calc = fs::read_to_string(dir.path().join("out/Calc.java")).unwrap();
    assert_eq!(calc, format!("package app;\n\n{}", CALC_JAVA));
    let index = fs::read_to_string(dir.path().join("out/index.java")).unwrap();
    assert!(index.contains("public class index {"));
    assert!(index.contains("this.greeting = \"hi\";"));
}

#[test]
fn strict_resolver_fails_on_unbound_names() {
    let dir = workspace(&[("page.cfm", "x = foo;\n")]);
    bxc(dir.path())
        .args(["transpile", "page.cfm", "--resolver", "strict"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unresolved reference `foo`"))
        .stderr(predicate::str::contains("1 of 1 files failed"));
}

#[test]
fn config_file_supplies_defaults() {
    let dir = workspace(&[
        ("Calc.cfc", CALC),
        ("bxc.toml", "[transpile]\npackage = \"from.config\"\n"),
    ]);
    bxc(dir.path())
        .args(["transpile", "Calc.cfc"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("package from.config;\n\n"));
}

#[test]
fn explicit_config_path_is_used() {
    let dir = workspace(&[
        ("Calc.cfc", CALC),
        ("conf/custom.toml", "[diagnostics]\nstyle = \"plain\"\n"),
        ("bad.cfm", "x = ;\n"),
    ]);
    bxc(dir.path())
        .args(["--config", "conf/custom.toml", "transpile", "bad.cfm"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("bad.cfm:1:5: error:"));
}

#[test]
fn parse_dumps_json_tree() {
    let dir = workspace(&[("Calc.cfc", CALC)]);
    let output = bxc(dir.path())
        .args(["parse", "Calc.cfc", "--format", "json"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let tree: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert!(tree.to_string().contains("\"add\""));
}

#[test]
fn parse_failure_dumps_diagnostic_records() {
    let dir = workspace(&[("bad.cfm", "x = ;\ny = ;\n")]);
    let output = bxc(dir.path())
        .args(["parse", "bad.cfm", "--format", "json"])
        .output()
        .unwrap();
    assert!(!output.status.success());
    let records: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let records = records.as_array().unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(records[1]["span"]["startLine"], 2);
}

#[test]
fn check_reports_every_failing_file() {
    let dir = workspace(&[
        ("app/Calc.cfc", CALC),
        ("app/one.cfm", "x = ;\n"),
        ("app/two.cfm", "<cfscript>function f() { rethrow; }</cfscript>\n"),
        ("app/README.md", "not a source"),
    ]);
    bxc(dir.path())
        .args(["check", "app"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("rethrow outside a catch"))
        .stderr(predicate::str::contains("2 of 3 files failed"));
}

#[test]
fn check_passes_clean_tree() {
    let dir = workspace(&[("app/Calc.cfc", CALC)]);
    bxc(dir.path())
        .args(["--quiet", "check", "app"])
        .assert()
        .success()
        .stderr(predicate::str::contains("checked 1 files"));
}

#[test]
fn missing_input_is_reported() {
    let dir = workspace(&[]);
    bxc(dir.path())
        .args(["check", "nowhere"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("does not exist"));
}

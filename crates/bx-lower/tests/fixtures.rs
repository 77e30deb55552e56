//! Every `tests/fixtures/<Name>.cfc|cfm` must lower to exactly the Java in
//! the sibling `<Name>.java`. All pairs are checked before reporting.

use std::fs;
use std::path::{Path, PathBuf};

use bx_core::source::SourceFile;
use bx_java::oracle::compare_text;
use bx_lang::parse_file;
use bx_lower::{lower_result, LowerOptions};

const SOURCE_EXTENSIONS: &[&str] = &["cfc", "cfm"];

fn fixture_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests").join("fixtures")
}

fn fixture_sources() -> Vec<PathBuf> {
    let mut sources: Vec<PathBuf> = fs::read_dir(fixture_dir())
        .expect("fixture directory is readable")
        .filter_map(|entry| entry.ok().map(|entry| entry.path()))
        .filter(|path| {
            path.extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| SOURCE_EXTENSIONS.contains(&ext))
        })
        .collect();
    sources.sort();
    sources
}

fn check_fixture(path: &Path) -> Result<(), String> {
    let name = path
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| format!("{}: bad file name", path.display()))?;
    let text = fs::read_to_string(path).map_err(|err| format!("{}: {}", name, err))?;
    let reference_path = path.with_extension("java");
    let reference = fs::read_to_string(&reference_path)
        .map_err(|err| format!("{}: missing reference {}: {}", name, reference_path.display(), err))?;

    let source = SourceFile::new(0, name, text);
    let parsed = parse_file(&source);
    if !parsed.is_correct() {
        let messages: Vec<String> = parsed
            .diagnostics()
            .iter()
            .map(|diagnostic| diagnostic.to_string())
            .collect();
        return Err(format!("{}: parse failed:\n  {}", name, messages.join("\n  ")));
    }
    let unit = lower_result(&parsed, &LowerOptions::default())
        .map_err(|err| format!("{}: lowering failed: {}", name, err))?;
    match compare_text(&reference, &unit) {
        None => Ok(()),
        Some(mismatch) => Err(format!("{}: {}", name, mismatch)),
    }
}

#[test]
fn fixtures_lower_to_reference_java() {
    let sources = fixture_sources();
    assert!(!sources.is_empty(), "no fixtures found");
    let failures: Vec<String> = sources
        .iter()
        .filter_map(|path| check_fixture(path).err())
        .collect();
    assert!(
        failures.is_empty(),
        "{} of {} fixtures failed:\n{}",
        failures.len(),
        sources.len(),
        failures.join("\n")
    );
}

#[test]
fn fixtures_lower_deterministically() {
    for path in fixture_sources() {
        let name = path.file_name().and_then(|n| n.to_str()).unwrap_or_default().to_string();
        let text = fs::read_to_string(&path).unwrap();
        let source = SourceFile::new(0, name, text);
        let parsed = parse_file(&source);
        let first = lower_result(&parsed, &LowerOptions::default()).unwrap();
        let second = lower_result(&parsed, &LowerOptions::default()).unwrap();
        assert!(bx_java::equivalent(&first, &second), "{}", path.display());
    }
}

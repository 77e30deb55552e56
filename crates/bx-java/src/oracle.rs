//! Tree equivalence by canonical rendering.
//!
//! Two units are equivalent iff their canonical printouts are identical.
//! Comments and layout are normalized by the printer; tokens, operators,
//! type names and statement order are not.

use std::fmt;

use itertools::{EitherOrBoth, Itertools};

use crate::ast::CompilationUnit;
use crate::printer::JavaPrinter;

/// Canonical text of a unit.
pub fn canonical(unit: &CompilationUnit) -> String {
    JavaPrinter::canonical().print(unit)
}

pub fn equivalent(a: &CompilationUnit, b: &CompilationUnit) -> bool {
    canonical(a) == canonical(b)
}

/// First line where two canonical renderings differ.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mismatch {
    /// 1-based line number.
    pub line: usize,
    /// `None` when the expected rendering ended first.
    pub expected: Option<String>,
    /// `None` when the actual rendering ended first.
    pub actual: Option<String>,
}

impl fmt::Display for Mismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "first difference at line {}", self.line)?;
        match &self.expected {
            Some(line) => writeln!(f, "  expected: {}", line)?,
            None => writeln!(f, "  expected: <end of output>")?,
        }
        match &self.actual {
            Some(line) => write!(f, "  actual:   {}", line),
            None => write!(f, "  actual:   <end of output>"),
        }
    }
}

/// `None` when the units are equivalent.
pub fn compare(expected: &CompilationUnit, actual: &CompilationUnit) -> Option<Mismatch> {
    compare_lines(&canonical(expected), &canonical(actual))
}

/// Compares reference text, as written in a fixture file, to a unit.
///
/// Line endings and a missing final newline in the reference are ignored.
pub fn compare_text(expected: &str, actual: &CompilationUnit) -> Option<Mismatch> {
    let mut normalized = expected.replace("\r\n", "\n");
    if !normalized.ends_with('\n') {
        normalized.push('\n');
    }
    compare_lines(&normalized, &canonical(actual))
}

fn compare_lines(expected: &str, actual: &str) -> Option<Mismatch> {
    if expected == actual {
        return None;
    }
    let found = expected
        .lines()
        .zip_longest(actual.lines())
        .enumerate()
        .find_map(|(index, pair)| {
            let (expected, actual) = match pair {
                EitherOrBoth::Both(e, a) if e == a => return None,
                EitherOrBoth::Both(e, a) => (Some(e), Some(a)),
                EitherOrBoth::Left(e) => (Some(e), None),
                EitherOrBoth::Right(a) => (None, Some(a)),
            };
            Some(Mismatch {
                line: index + 1,
                expected: expected.map(str::to_string),
                actual: actual.map(str::to_string),
            })
        });
    // Same lines but different trailing newlines.
    found.or_else(|| {
        Some(Mismatch {
            line: expected.lines().count() + 1,
            expected: None,
            actual: None,
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::*;
    use pretty_assertions::assert_eq;

    fn returning(value: JExpr) -> CompilationUnit {
        let mut decl = TypeDecl::class("Calc");
        decl.members.push(Member::Method(MethodDecl {
            doc: None,
            modifiers: vec![Modifier::Public],
            return_type: JType::object(),
            name: "value".to_string(),
            params: Vec::new(),
            body: Block::new(vec![JStmt::Return(Some(value))]),
        }));
        CompilationUnit {
            package: None,
            imports: Vec::new(),
            types: vec![decl],
        }
    }

    #[test]
    fn operand_order_matters() {
        let ab = returning(JExpr::binary(JBinaryOp::Add, JExpr::name("a"), JExpr::name("b")));
        let ba = returning(JExpr::binary(JBinaryOp::Add, JExpr::name("b"), JExpr::name("a")));
        assert!(equivalent(&ab, &ab.clone()));
        assert!(!equivalent(&ab, &ba));

        let mismatch = compare(&ab, &ba).expect("units differ");
        assert_eq!(mismatch.line, 4);
        assert_eq!(mismatch.expected.as_deref(), Some("        return a + b;"));
        assert_eq!(mismatch.actual.as_deref(), Some("        return b + a;"));
    }

    #[test]
    fn comments_do_not_affect_equivalence() {
        let plain = returning(JExpr::null());
        let mut documented = plain.clone();
        documented.types[0].doc = Some("Documented.".to_string());
        assert!(equivalent(&plain, &documented));
    }

    #[test]
    fn reference_text_tolerates_line_endings() {
        let unit = returning(JExpr::null());
        let reference = "public class Calc {\r\n\r\n    public Object value() {\r\n        return null;\r\n    }\r\n}";
        assert_eq!(compare_text(reference, &unit), None);
    }

    #[test]
    fn missing_lines_are_reported() {
        let unit = returning(JExpr::null());
        let mismatch = compare_text("public class Calc {\n}\n", &unit).expect("differs");
        assert_eq!(mismatch.line, 2);
        assert_eq!(mismatch.expected.as_deref(), Some("}"));
        assert_eq!(mismatch.actual.as_deref(), Some(""));
    }
}

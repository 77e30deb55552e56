//! Fixed lookup from source type hints to Java types.

use bx_core::ast::TypeHint;
use bx_java::ast::{JType, Primitive};

use crate::runtime::{RuntimeSupport, LIST, LOCAL_DATE_TIME, MAP};

/// Missing hints and `any` both become `Object`.
pub fn lower_type(hint: Option<&TypeHint>, support: &mut RuntimeSupport) -> JType {
    match hint {
        Some(hint) => lower_type_name(&hint.name, support),
        None => JType::object(),
    }
}

pub fn lower_type_name(name: &str, support: &mut RuntimeSupport) -> JType {
    match name.to_ascii_lowercase().as_str() {
        "any" => JType::object(),
        "string" => JType::string(),
        "numeric" | "number" | "double" => JType::Primitive(Primitive::Double),
        "integer" | "int" => JType::Primitive(Primitive::Int),
        "long" => JType::Primitive(Primitive::Long),
        "float" => JType::Primitive(Primitive::Float),
        "boolean" => JType::Primitive(Primitive::Boolean),
        "void" => JType::Void,
        "array" => JType::generic(support.java(LIST), vec![JType::object()]),
        "struct" => JType::generic(support.java(MAP), vec![JType::string(), JType::object()]),
        "query" => support.query_type(),
        "date" => JType::class(support.java(LOCAL_DATE_TIME)),
        _ => JType::class(name),
    }
}

/// Type of a parameter: optional parameters take the boxed form so they
/// can be compared against `null`.
pub fn param_type(hint: Option<&TypeHint>, has_default: bool, support: &mut RuntimeSupport) -> JType {
    let ty = lower_type(hint, support);
    if has_default {
        ty.boxed()
    } else {
        ty
    }
}

/// `catch` clauses: `any` (or no type) catches `Exception`.
pub fn catch_type(hint: Option<&TypeHint>, support: &mut RuntimeSupport) -> JType {
    match hint {
        None => JType::class("Exception"),
        Some(hint) if hint.is("any") => JType::class("Exception"),
        Some(hint) => lower_type_name(&hint.name, support),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bx_core::span::Span;
    use pretty_assertions::assert_eq;

    fn lowered(name: &str) -> String {
        let mut support = RuntimeSupport::new("bx.runtime", "Runtime");
        lower_type_name(name, &mut support).to_string()
    }

    #[test]
    fn lookup_table() {
        assert_eq!(lowered("Numeric"), "double");
        assert_eq!(lowered("integer"), "int");
        assert_eq!(lowered("struct"), "Map<String, Object>");
        assert_eq!(lowered("array"), "List<Object>");
        assert_eq!(lowered("query"), "Query");
        assert_eq!(lowered("models.User"), "models.User");
    }

    #[test]
    fn defaults_box_primitives() {
        let mut support = RuntimeSupport::new("bx.runtime", "Runtime");
        let hint = TypeHint::new("boolean", Span::null());
        assert_eq!(param_type(Some(&hint), true, &mut support).to_string(), "Boolean");
        assert_eq!(param_type(Some(&hint), false, &mut support).to_string(), "boolean");
        assert_eq!(param_type(None, true, &mut support).to_string(), "Object");
    }

    #[test]
    fn catch_any_is_exception() {
        let mut support = RuntimeSupport::new("bx.runtime", "Runtime");
        let any = TypeHint::new("Any", Span::null());
        assert_eq!(catch_type(Some(&any), &mut support).to_string(), "Exception");
        assert_eq!(catch_type(None, &mut support).to_string(), "Exception");
    }
}

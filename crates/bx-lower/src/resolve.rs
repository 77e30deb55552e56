//! Lowering of names that are neither locals, parameters nor members.
//!
//! Source programs freely reference built-in functions and variables from
//! enclosing request scopes, which have no static counterpart. What those
//! become is a policy choice, so it is pluggable.

use std::fmt::Debug;
use std::sync::Arc;

use bx_java::ast::JExpr;

use crate::error::LowerErrorKind;
use crate::runtime::RuntimeSupport;

/// Already-lowered arguments of an external call.
#[derive(Debug, Clone, PartialEq)]
pub enum CallArgs {
    Positional(Vec<JExpr>),
    /// Name as written, in source order.
    Named(Vec<(String, JExpr)>),
}

impl CallArgs {
    /// Values in source order, dropping names.
    pub fn into_values(self) -> Vec<JExpr> {
        match self {
            CallArgs::Positional(args) => args,
            CallArgs::Named(args) => args.into_iter().map(|(_, value)| value).collect(),
        }
    }
}

pub trait ExternalResolver: Debug + Send + Sync {
    fn name(&self) -> &'static str;

    /// Value of the unbound name `name`.
    fn read(&self, name: &str, support: &mut RuntimeSupport) -> Result<JExpr, LowerErrorKind>;

    /// Call of the unbound function `name`.
    fn call(
        &self,
        name: &str,
        args: CallArgs,
        support: &mut RuntimeSupport,
    ) -> Result<JExpr, LowerErrorKind>;
}

/// Defers to the runtime: `Runtime.lookup("x")`, `Runtime.call("f", ...)`.
#[derive(Debug, Clone, Copy, Default)]
pub struct DynamicLookup;

impl ExternalResolver for DynamicLookup {
    fn name(&self) -> &'static str {
        "dynamic"
    }

    fn read(&self, name: &str, support: &mut RuntimeSupport) -> Result<JExpr, LowerErrorKind> {
        tracing::warn!(name, "unbound name lowered to a runtime lookup");
        Ok(support.call("lookup", vec![JExpr::string(name)]))
    }

    fn call(
        &self,
        name: &str,
        args: CallArgs,
        support: &mut RuntimeSupport,
    ) -> Result<JExpr, LowerErrorKind> {
        tracing::warn!(name, "unbound function lowered to a runtime call");
        let mut call_args = vec![JExpr::string(name)];
        match args {
            CallArgs::Positional(args) => call_args.extend(args),
            CallArgs::Named(args) => call_args.push(support.map_of(args)),
        }
        Ok(support.call("call", call_args))
    }
}

/// Trusts that the name exists in the target environment as written.
#[derive(Debug, Clone, Copy, Default)]
pub struct StaticReference;

impl ExternalResolver for StaticReference {
    fn name(&self) -> &'static str {
        "static"
    }

    fn read(&self, name: &str, _support: &mut RuntimeSupport) -> Result<JExpr, LowerErrorKind> {
        Ok(JExpr::name(name))
    }

    fn call(
        &self,
        name: &str,
        args: CallArgs,
        _support: &mut RuntimeSupport,
    ) -> Result<JExpr, LowerErrorKind> {
        Ok(JExpr::MethodCall {
            target: None,
            name: name.to_string(),
            args: args.into_values(),
        })
    }
}

/// Rejects every unbound name.
#[derive(Debug, Clone, Copy, Default)]
pub struct Strict;

impl ExternalResolver for Strict {
    fn name(&self) -> &'static str {
        "strict"
    }

    fn read(&self, name: &str, _support: &mut RuntimeSupport) -> Result<JExpr, LowerErrorKind> {
        Err(LowerErrorKind::Unresolved {
            name: name.to_string(),
        })
    }

    fn call(
        &self,
        name: &str,
        _args: CallArgs,
        _support: &mut RuntimeSupport,
    ) -> Result<JExpr, LowerErrorKind> {
        Err(LowerErrorKind::Unresolved {
            name: name.to_string(),
        })
    }
}

/// Named choice of the built-in resolvers, for configuration surfaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResolverKind {
    #[default]
    Dynamic,
    Static,
    Strict,
}

impl ResolverKind {
    pub fn resolver(self) -> Arc<dyn ExternalResolver> {
        match self {
            ResolverKind::Dynamic => Arc::new(DynamicLookup),
            ResolverKind::Static => Arc::new(StaticReference),
            ResolverKind::Strict => Arc::new(Strict),
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "dynamic" => Some(ResolverKind::Dynamic),
            "static" => Some(ResolverKind::Static),
            "strict" => Some(ResolverKind::Strict),
            _ => None,
        }
    }
}

use std::sync::Arc;

use crate::resolve::{DynamicLookup, ExternalResolver, ResolverKind};

pub const DEFAULT_RUNTIME_PACKAGE: &str = "bx.runtime";
pub const DEFAULT_RUNTIME_CLASS: &str = "Runtime";
const DEFAULT_MAX_DEPTH: usize = 256;

/// Configuration for one lowering run.
#[derive(Debug, Clone)]
pub struct LowerOptions {
    /// Package declared by the compilation unit.
    pub package: Option<String>,
    /// Class name used when neither the source nor the file name gives one.
    pub class_name: Option<String>,
    /// Package holding the runtime-support classes.
    pub runtime_package: String,
    /// Class exposing the runtime-support static methods.
    pub runtime_class: String,
    /// Nesting bound for statements and expressions.
    pub max_depth: usize,
    /// How names that are not locals, parameters or members are lowered.
    pub resolver: Arc<dyn ExternalResolver>,
}

impl LowerOptions {
    pub fn with_package(mut self, package: impl Into<String>) -> Self {
        self.package = Some(package.into());
        self
    }

    pub fn with_class_name(mut self, name: impl Into<String>) -> Self {
        self.class_name = Some(name.into());
        self
    }

    pub fn with_resolver(mut self, kind: ResolverKind) -> Self {
        self.resolver = kind.resolver();
        self
    }
}

impl Default for LowerOptions {
    fn default() -> Self {
        Self {
            package: None,
            class_name: None,
            runtime_package: DEFAULT_RUNTIME_PACKAGE.to_string(),
            runtime_class: DEFAULT_RUNTIME_CLASS.to_string(),
            max_depth: DEFAULT_MAX_DEPTH,
            resolver: Arc::new(DynamicLookup),
        }
    }
}

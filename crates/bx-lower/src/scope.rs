//! Name binding during lowering.
//!
//! Source names are case-insensitive; every binding is keyed by the folded
//! name and remembers the Java spelling it was emitted with. Lookup order is
//! local (innermost block first), then parameter, then member.

use std::collections::HashSet;

use bx_core::ast::Ident;
use bx_core::span::Span;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Binding {
    Local(String),
    Param(String),
    /// Local or parameter of the body enclosing a closure.
    Captured(String),
    Field(String),
    Method(String),
}

#[derive(Debug, Clone)]
struct Entry {
    key: String,
    java: String,
}

impl Entry {
    fn new(key: String, java: String) -> Self {
        Self { key, java }
    }
}

/// Locals and parameters of the body being lowered.
///
/// Source locals live for the whole function. A declaration made inside a
/// nested block is therefore hoisted: it is bound in the body's own frame
/// under a name no other local of the body has used.
#[derive(Debug, Clone, Default)]
pub struct FunctionScope {
    params: Vec<Entry>,
    frames: Vec<Vec<Entry>>,
    /// Every Java name declared in the body so far, including ended blocks.
    used: Vec<String>,
    /// Java names written after their declaration.
    assigned: HashSet<String>,
    /// Java names read by a closure body, with the first capture site.
    captured: Vec<(String, Span)>,
    /// Scope of the body enclosing a closure.
    outer: Option<Box<FunctionScope>>,
}

impl FunctionScope {
    pub fn new() -> Self {
        Self {
            frames: vec![Vec::new()],
            ..Self::default()
        }
    }

    pub fn with_params<'a>(params: impl IntoIterator<Item = &'a Ident>) -> Self {
        let mut scope = Self::new();
        for param in params {
            scope.used.push(param.name.clone());
            scope
                .params
                .push(Entry::new(param.key(), param.name.clone()));
        }
        scope
    }

    /// Starts a closure body. The current scope becomes its enclosing one;
    /// parameters that collide with an enclosing name are renamed. Returns
    /// the Java parameter names.
    pub fn enter<'a>(&mut self, params: impl IntoIterator<Item = &'a Ident>) -> Vec<String> {
        let enclosing = std::mem::take(self);
        *self = Self::new();
        self.outer = Some(Box::new(enclosing));
        params
            .into_iter()
            .map(|param| {
                let java = self.fresh(&param.name);
                self.used.push(java.clone());
                self.params.push(Entry::new(param.key(), java.clone()));
                java
            })
            .collect()
    }

    /// Ends a closure body and returns to the enclosing scope, which
    /// inherits the names the closure used.
    pub fn leave(&mut self) {
        let Some(outer) = self.outer.take() else {
            return;
        };
        let inner = std::mem::replace(self, *outer);
        self.used.extend(inner.used);
    }

    pub fn push_frame(&mut self) {
        self.frames.push(Vec::new());
    }

    pub fn pop_frame(&mut self) {
        if self.frames.len() > 1 {
            self.frames.pop();
        }
    }

    /// Whether this body is a closure's.
    pub fn is_closure(&self) -> bool {
        self.outer.is_some()
    }

    /// Whether declarations are currently inside a block nested in the body.
    pub fn in_nested_block(&self) -> bool {
        self.frames.len() > 1
    }

    pub fn local(&self, key: &str) -> Option<&str> {
        self.frames
            .iter()
            .rev()
            .flat_map(|frame| frame.iter().rev())
            .find(|entry| entry.key == key)
            .map(|entry| entry.java.as_str())
    }

    pub fn param(&self, key: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|entry| entry.key == key)
            .map(|entry| entry.java.as_str())
    }

    /// Local or parameter of an enclosing body, as seen from a closure.
    pub fn enclosing(&self, key: &str) -> Option<&str> {
        let outer = self.outer.as_deref()?;
        outer
            .local(key)
            .or_else(|| outer.param(key))
            .or_else(|| outer.enclosing(key))
    }

    /// Declares a local in the innermost block and returns its Java name.
    ///
    /// A name already visible as a parameter or local is suffixed with the
    /// first free number, so earlier references keep their binding and the
    /// output never redeclares a visible name.
    pub fn declare(&mut self, ident: &Ident) -> String {
        let java = self.fresh(&ident.name);
        self.bind(ident.key(), java.clone(), false);
        java
    }

    /// Declares a body-wide local from inside a nested block. The name is
    /// also fresh against every local the body has already used, since the
    /// declaration moves to the top of the body.
    pub fn declare_hoisted(&mut self, ident: &Ident) -> String {
        let java = if self.is_taken(&ident.name) {
            (1..)
                .map(|n| format!("{}{}", ident.name, n))
                .find(|candidate| !self.is_taken(candidate))
                .unwrap_or_else(|| ident.name.clone())
        } else {
            ident.name.clone()
        };
        self.bind(ident.key(), java.clone(), true);
        java
    }

    /// Reserves a Java local that no source name can reach.
    pub fn declare_hidden(&mut self, base: &str) -> String {
        let java = self.fresh(base);
        self.bind(format!("#{}", base), java.clone(), false);
        java
    }

    pub fn note_assigned(&mut self, java: &str) {
        self.assigned.insert(java.to_string());
    }

    /// Records that a closure reads `java`, a local of the body owning `key`.
    pub fn note_captured(&mut self, key: &str, java: &str, span: Span) {
        let mut scope = self.outer.as_deref_mut();
        while let Some(outer) = scope {
            if outer.local(key).or_else(|| outer.param(key)) == Some(java) {
                if !outer.captured.iter().any(|(name, _)| name == java) {
                    outer.captured.push((java.to_string(), span));
                }
                return;
            }
            scope = outer.outer.as_deref_mut();
        }
    }

    /// First captured local that the body also reassigns; Java only lets
    /// lambdas read effectively final locals.
    pub fn reassigned_capture(&self) -> Option<(&str, Span)> {
        self.captured
            .iter()
            .find(|(name, _)| self.assigned.contains(name))
            .map(|(name, span)| (name.as_str(), *span))
    }

    fn bind(&mut self, key: String, java: String, hoisted: bool) {
        self.used.push(java.clone());
        let frame = if hoisted {
            self.frames.first_mut()
        } else {
            self.frames.last_mut()
        };
        if let Some(frame) = frame {
            frame.push(Entry::new(key, java));
        }
    }

    fn fresh(&self, name: &str) -> String {
        if !self.is_visible_java(name) {
            return name.to_string();
        }
        (1..)
            .map(|n| format!("{}{}", name, n))
            .find(|candidate| !self.is_visible_java(candidate))
            .unwrap_or_else(|| name.to_string())
    }

    fn visible(&self) -> impl Iterator<Item = &Entry> {
        self.params.iter().chain(self.frames.iter().flatten())
    }

    /// Visible here or in an enclosing body; lambdas may not shadow either.
    fn is_visible_java(&self, name: &str) -> bool {
        self.visible()
            .any(|entry| entry.java.eq_ignore_ascii_case(name) || entry.key == name.to_ascii_lowercase())
            || self
                .outer
                .as_deref()
                .is_some_and(|outer| outer.is_visible_java(name))
    }

    fn is_taken(&self, name: &str) -> bool {
        self.is_visible_java(name) || self.used.iter().any(|used| used.eq_ignore_ascii_case(name))
    }
}

#[derive(Debug, Clone)]
pub struct FieldInfo {
    pub name: String,
    pub public: bool,
}

#[derive(Debug, Clone)]
pub struct MethodSig {
    pub name: String,
    /// Parameter keys in declaration order.
    pub params: Vec<String>,
    pub returns_value: bool,
}

/// Fields and methods of the class being produced.
#[derive(Debug, Clone, Default)]
pub struct MemberTable {
    fields: Vec<FieldInfo>,
    methods: Vec<MethodSig>,
}

impl MemberTable {
    /// Adds a field unless one with the same folded name exists.
    pub fn add_field(&mut self, name: &str, public: bool) -> bool {
        if self.field(name).is_some() {
            return false;
        }
        self.fields.push(FieldInfo {
            name: name.to_string(),
            public,
        });
        true
    }

    pub fn add_method(&mut self, sig: MethodSig) {
        self.methods.push(sig);
    }

    pub fn field(&self, name: &str) -> Option<&FieldInfo> {
        self.fields
            .iter()
            .find(|field| field.name.eq_ignore_ascii_case(name))
    }

    pub fn method(&self, name: &str) -> Option<&MethodSig> {
        self.methods
            .iter()
            .find(|method| method.name.eq_ignore_ascii_case(name))
    }

    pub fn fields(&self) -> &[FieldInfo] {
        &self.fields
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn ident(name: &str) -> Ident {
        Ident::new(name, Span::null())
    }

    #[test]
    fn locals_shadow_params_with_fresh_names() {
        let params = [ident("x")];
        let mut scope = FunctionScope::with_params(params.iter());
        assert_eq!(scope.param("x"), Some("x"));
        assert_eq!(scope.declare(&ident("X")), "X1");
        assert_eq!(scope.local("x"), Some("X1"));
        assert_eq!(scope.declare(&ident("x")), "x2");
        assert_eq!(scope.local("x"), Some("x2"));
    }

    #[test]
    fn block_locals_end_with_their_block() {
        let mut scope = FunctionScope::new();
        scope.push_frame();
        assert_eq!(scope.declare(&ident("item")), "item");
        scope.pop_frame();
        assert_eq!(scope.local("item"), None);
        assert_eq!(scope.declare(&ident("item")), "item");
    }

    #[test]
    fn hoisted_locals_avoid_names_of_ended_blocks() {
        let mut scope = FunctionScope::new();
        scope.push_frame();
        assert_eq!(scope.declare(&ident("item")), "item");
        scope.pop_frame();
        scope.push_frame();
        assert!(scope.in_nested_block());
        assert_eq!(scope.declare_hoisted(&ident("item")), "item1");
        assert_eq!(scope.declare_hoisted(&ident("total")), "total");
        scope.pop_frame();
        assert_eq!(scope.local("item"), Some("item1"));
        assert_eq!(scope.local("total"), Some("total"));
    }

    #[test]
    fn hidden_locals_are_not_bound_to_source_names() {
        let mut scope = FunctionScope::new();
        assert_eq!(scope.declare_hidden("discarded"), "discarded");
        assert_eq!(scope.local("discarded"), None);
        assert_eq!(scope.declare(&ident("discarded")), "discarded1");
    }

    #[test]
    fn closures_see_and_capture_enclosing_locals() {
        let params = [ident("x")];
        let mut scope = FunctionScope::with_params(params.iter());
        scope.declare(&ident("total"));
        let closure_params = [ident("x"), ident("y")];
        assert_eq!(scope.enter(closure_params.iter()), vec!["x1", "y"]);
        assert_eq!(scope.param("x"), Some("x1"));
        assert_eq!(scope.enclosing("total"), Some("total"));
        scope.note_captured("total", "total", Span::null());
        scope.leave();

        assert_eq!(scope.reassigned_capture(), None);
        scope.note_assigned("total");
        assert_eq!(scope.reassigned_capture().map(|(name, _)| name), Some("total"));
        assert_eq!(scope.declare(&ident("y")), "y");
    }

    #[test]
    fn members_are_case_insensitive() {
        let mut members = MemberTable::default();
        assert!(members.add_field("userName", false));
        assert!(!members.add_field("USERNAME", true));
        assert_eq!(members.field("username").map(|f| f.name.as_str()), Some("userName"));
    }
}

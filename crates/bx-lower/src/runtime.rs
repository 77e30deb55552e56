//! Names the generated code relies on: the runtime-support class and the
//! JDK types it reaches for. Every use is recorded so the unit imports
//! exactly what it touches.

use std::collections::BTreeSet;

use bx_java::ast::{Import, JExpr, JType};

pub const LIST: &str = "java.util.List";
pub const MAP: &str = "java.util.Map";
pub const OBJECTS: &str = "java.util.Objects";
pub const LOCAL_DATE_TIME: &str = "java.time.LocalDateTime";

/// `Map.of` takes at most this many key/value pairs.
const MAP_OF_LIMIT: usize = 10;

#[derive(Debug, Clone)]
pub struct RuntimeSupport {
    package: String,
    class: String,
    imports: BTreeSet<String>,
}

impl RuntimeSupport {
    pub fn new(package: impl Into<String>, class: impl Into<String>) -> Self {
        Self {
            package: package.into(),
            class: class.into(),
            imports: BTreeSet::new(),
        }
    }

    /// Records an import by its fully qualified path.
    pub fn import(&mut self, path: impl Into<String>) {
        self.imports.insert(path.into());
    }

    /// Simple name of a JDK class, importing it.
    pub fn java(&mut self, path: &str) -> String {
        self.import(path);
        path.rsplit('.').next().unwrap_or(path).to_string()
    }

    /// `Runtime.method(args)`.
    pub fn call(&mut self, method: &str, args: Vec<JExpr>) -> JExpr {
        let class = self.runtime_class();
        JExpr::static_call(&class, method, args)
    }

    pub fn runtime_class(&mut self) -> String {
        self.import(format!("{}.{}", self.package, self.class));
        self.class.clone()
    }

    /// Row type of a query result.
    pub fn query_type(&mut self) -> JType {
        self.import(format!("{}.Query", self.package));
        JType::class("Query")
    }

    pub fn list_of(&mut self, items: Vec<JExpr>) -> JExpr {
        let list = self.java(LIST);
        JExpr::static_call(&list, "of", items)
    }

    /// `Map.of(k, v, ...)`, or `Map.ofEntries(Map.entry(k, v), ...)` past the
    /// `Map.of` arity limit.
    pub fn map_of(&mut self, entries: Vec<(String, JExpr)>) -> JExpr {
        let map = self.java(MAP);
        if entries.len() <= MAP_OF_LIMIT {
            let args = entries
                .into_iter()
                .flat_map(|(key, value)| [JExpr::string(key), value])
                .collect();
            JExpr::static_call(&map, "of", args)
        } else {
            let args = entries
                .into_iter()
                .map(|(key, value)| JExpr::static_call(&map, "entry", vec![JExpr::string(key), value]))
                .collect();
            JExpr::static_call(&map, "ofEntries", args)
        }
    }

    pub fn into_imports(self) -> Vec<Import> {
        self.imports.into_iter().map(Import::new).collect()
    }
}

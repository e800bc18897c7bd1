//! Definitions and Values
//!
//! A `Definition` is what loading a package produces: a table of named
//! members plus the three conventional export attributes read by the
//! Exporter (`EXPORT`, `EXPORT_OK`, `EXPORT_TAGS`). Any of the three may be
//! absent, which the Exporter treats as an empty category.

use std::collections::BTreeMap;
use std::sync::Arc;

/// A native callable exposed by a definition.
pub type NativeFn = Arc<dyn Fn(&[Value]) -> Value + Send + Sync>;

/// Named members of a definition or its prototype.
pub type Members = BTreeMap<String, Value>;

/// A value that can live in a definition, a namespace, or the destination scope.
#[derive(Clone)]
pub enum Value {
    Nil,
    Bool(bool),
    Long(i64),
    Float(f64),
    String(String),
    List(Vec<Value>),
    /// A native function.
    Function(NativeFn),
    /// A nested definition (e.g. a class exported from a package).
    Namespace(Arc<Definition>),
}

impl Value {
    /// Wrap a closure as a function value.
    pub fn function<F>(f: F) -> Self
    where
        F: Fn(&[Value]) -> Value + Send + Sync + 'static,
    {
        Value::Function(Arc::new(f))
    }

    /// Call a function value. Non-function values yield `None`.
    pub fn call(&self, args: &[Value]) -> Option<Value> {
        match self {
            Value::Function(f) => Some(f(args)),
            _ => None,
        }
    }

    pub fn as_definition(&self) -> Option<&Arc<Definition>> {
        match self {
            Value::Namespace(def) => Some(def),
            _ => None,
        }
    }

    /// Human-readable type name for log events.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Nil => "nil",
            Value::Bool(_) => "bool",
            Value::Long(_) => "long",
            Value::Float(_) => "float",
            Value::String(_) => "string",
            Value::List(_) => "list",
            Value::Function(_) => "function",
            Value::Namespace(_) => "namespace",
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Nil, Value::Nil) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Long(a), Value::Long(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::List(a), Value::List(b)) => a == b,
            // Functions and namespaces compare by identity
            (Value::Function(a), Value::Function(b)) => Arc::ptr_eq(a, b),
            (Value::Namespace(a), Value::Namespace(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl std::fmt::Debug for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Nil => write!(f, "Nil"),
            Value::Bool(b) => write!(f, "Bool({})", b),
            Value::Long(n) => write!(f, "Long({})", n),
            Value::Float(x) => write!(f, "Float({})", x),
            Value::String(s) => write!(f, "String({:?})", s),
            Value::List(items) => f.debug_tuple("List").field(items).finish(),
            Value::Function(_) => write!(f, "Function(<native>)"),
            Value::Namespace(def) => write!(f, "Namespace({})", def.name()),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Long(n)
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Value::Float(x)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<Arc<Definition>> for Value {
    fn from(def: Arc<Definition>) -> Self {
        Value::Namespace(def)
    }
}

/// The materialized result of loading a package.
#[derive(Clone, Debug, Default)]
pub struct Definition {
    /// Dotted package name this definition was produced for.
    name: String,

    /// Named members (functions and values).
    members: Members,

    /// Shared behaviour carried alongside the definition when it is installed.
    prototype: Option<Members>,

    /// Default export list (`EXPORT`).
    export: Option<Vec<String>>,

    /// Opt-in export list (`EXPORT_OK`).
    export_ok: Option<Vec<String>>,

    /// Tag name -> export names (`EXPORT_TAGS`).
    export_tags: Option<BTreeMap<String, Vec<String>>>,
}

impl Definition {
    /// Create an empty definition for `name`.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn members(&self) -> &Members {
        &self.members
    }

    /// Look up a member by name.
    pub fn member(&self, name: &str) -> Option<&Value> {
        self.members.get(name)
    }

    pub fn prototype(&self) -> Option<&Members> {
        self.prototype.as_ref()
    }

    /// The default export list, if declared.
    pub fn export(&self) -> Option<&[String]> {
        self.export.as_deref()
    }

    /// The opt-in export list, if declared.
    pub fn export_ok(&self) -> Option<&[String]> {
        self.export_ok.as_deref()
    }

    /// The tag mapping, if declared.
    pub fn export_tags(&self) -> Option<&BTreeMap<String, Vec<String>>> {
        self.export_tags.as_ref()
    }

    /// Names listed under `tag`, if the tag exists.
    pub fn tag(&self, tag: &str) -> Option<&[String]> {
        self.export_tags
            .as_ref()
            .and_then(|tags| tags.get(tag))
            .map(Vec::as_slice)
    }

    pub fn set_member(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.members.insert(name.into(), value.into());
    }

    pub fn with_member(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set_member(name, value);
        self
    }

    pub fn with_function<F>(self, name: impl Into<String>, f: F) -> Self
    where
        F: Fn(&[Value]) -> Value + Send + Sync + 'static,
    {
        self.with_member(name, Value::function(f))
    }

    pub fn with_prototype(mut self, prototype: Members) -> Self {
        self.prototype = Some(prototype);
        self
    }

    pub fn with_export<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.export = Some(names.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_export_ok<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.export_ok = Some(names.into_iter().map(Into::into).collect());
        self
    }

    /// Declare (or replace) a tag group.
    pub fn with_tag<I, S>(mut self, tag: impl Into<String>, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.export_tags
            .get_or_insert_with(BTreeMap::new)
            .insert(tag.into(), names.into_iter().map(Into::into).collect());
        self
    }
}

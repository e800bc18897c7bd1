//! Namespace Registry and Destination Scope
//!
//! `NamespaceTree` replaces the shared global object graph: each dotted name
//! maps to a slot that is either an intermediate namespace created while
//! walking a package name, or an installed definition. Installation is
//! insert-if-absent, so the first definition bound to a name stays bound.
//!
//! `Scope` is the flat destination for exported symbols and follows the same
//! first-writer-wins rule.

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::trace;

use super::path::PackageName;
use super::value::{Definition, Value};

/// A slot in the namespace tree.
#[derive(Clone, Debug)]
pub enum Slot {
    /// Intermediate namespace with nothing installed at this exact name.
    Placeholder,
    /// An installed definition.
    Bound(Arc<Definition>),
}

impl Slot {
    pub fn definition(&self) -> Option<&Arc<Definition>> {
        match self {
            Slot::Placeholder => None,
            Slot::Bound(def) => Some(def),
        }
    }
}

/// Registry of installed packages keyed by dotted name.
#[derive(Clone, Debug, Default)]
pub struct NamespaceTree {
    slots: BTreeMap<String, Slot>,
}

impl NamespaceTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install `def` at `name`, creating intermediate namespaces as needed.
    ///
    /// Intermediate segments are created once and reused. The final slot is
    /// only written when nothing is bound there yet; a placeholder left by a
    /// deeper package is filled in. Returns the definition bound at `name`
    /// after the call, which is `def` unless another definition got there first.
    pub fn install(&mut self, name: &PackageName, def: Arc<Definition>) -> Arc<Definition> {
        for ancestor in name.ancestors() {
            self.slots
                .entry(ancestor.to_string())
                .or_insert(Slot::Placeholder);
        }

        let slot = self
            .slots
            .entry(name.to_string())
            .or_insert(Slot::Placeholder);
        if let Slot::Bound(existing) = slot {
            return Arc::clone(existing);
        }
        *slot = Slot::Bound(Arc::clone(&def));
        def
    }

    /// Resolve a dotted name to an installed definition.
    ///
    /// A name with no binding of its own is looked up inside its nearest bound
    /// ancestor by following namespace members, so `HTTP.Request` is found
    /// once `HTTP` defines a `Request` namespace. Placeholders do not answer:
    /// an intermediate namespace is not a package.
    pub fn lookup(&self, name: &str) -> Option<Arc<Definition>> {
        if let Some(def) = self.slots.get(name).and_then(Slot::definition) {
            return Some(Arc::clone(def));
        }

        let name = PackageName::new(name);
        let segments = name.segments();
        let (depth, mut current) = name
            .ancestors()
            .iter()
            .enumerate()
            .rev()
            .find_map(|(i, ancestor)| {
                let def = self.slots.get(*ancestor).and_then(Slot::definition)?;
                Some((i + 1, Arc::clone(def)))
            })?;

        for segment in &segments[depth..] {
            let next = match current.member(segment) {
                Some(Value::Namespace(def)) => Arc::clone(def),
                Some(other) => {
                    trace!(target: "just::resolver", %name, segment = *segment, kind = other.type_name(), "Member is not a namespace");
                    return None;
                }
                None => return None,
            };
            current = next;
        }
        Some(current)
    }

    /// Get the raw slot for a dotted name.
    pub fn slot(&self, name: &str) -> Option<&Slot> {
        self.slots.get(name)
    }

    /// Whether anything, placeholder or definition, exists at `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.slots.contains_key(name)
    }

    /// Direct children of a namespace (`""` lists top-level names).
    pub fn children<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.slots.keys().filter_map(move |key| {
            let rest = if name.is_empty() {
                Some(key.as_str())
            } else {
                key.strip_prefix(name).and_then(|r| r.strip_prefix('.'))
            };
            rest.filter(|r| !r.is_empty() && !r.contains('.'))
        })
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

/// Destination scope for exported symbols.
#[derive(Clone, Debug, Default)]
pub struct Scope {
    bindings: BTreeMap<String, Value>,
}

impl Scope {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `name` only if the scope has no entry for it yet.
    ///
    /// Any existing entry blocks the write, including `Nil` and other falsy
    /// values. Returns `true` when the value was written.
    pub fn insert_if_absent(&mut self, name: &str, value: Value) -> bool {
        if self.bindings.contains_key(name) {
            return false;
        }
        self.bindings.insert(name.to_string(), value);
        true
    }

    /// Bind `name` unconditionally, replacing any previous value.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.bindings.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.bindings.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.bindings.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.bindings.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn def(name: &str) -> Arc<Definition> {
        Arc::new(Definition::new(name))
    }

    #[test]
    fn test_install_creates_intermediate_namespaces() {
        let mut tree = NamespaceTree::new();
        let installed = tree.install(&PackageName::new("Foo.Bar.Baz"), def("Foo.Bar.Baz"));

        assert_eq!(installed.name(), "Foo.Bar.Baz");
        assert!(matches!(tree.slot("Foo"), Some(Slot::Placeholder)));
        assert!(matches!(tree.slot("Foo.Bar"), Some(Slot::Placeholder)));
        assert!(tree.lookup("Foo.Bar.Baz").is_some());
        assert!(tree.lookup("Foo.Bar").is_none());
        assert_eq!(tree.len(), 3);
    }

    #[test]
    fn test_install_first_wins() {
        let mut tree = NamespaceTree::new();
        let first = def("Foo");
        let second = def("Foo");

        let bound = tree.install(&PackageName::new("Foo"), Arc::clone(&first));
        assert!(Arc::ptr_eq(&bound, &first));

        let bound = tree.install(&PackageName::new("Foo"), second);
        assert!(Arc::ptr_eq(&bound, &first));
        assert!(Arc::ptr_eq(&tree.lookup("Foo").unwrap(), &first));
    }

    #[test]
    fn test_install_fills_placeholder() {
        let mut tree = NamespaceTree::new();
        tree.install(&PackageName::new("Test.More"), def("Test.More"));
        assert!(tree.lookup("Test").is_none());

        tree.install(&PackageName::new("Test"), def("Test"));
        assert_eq!(tree.lookup("Test").unwrap().name(), "Test");
        assert!(tree.lookup("Test.More").is_some());
    }

    #[test]
    fn test_lookup_walks_namespace_members() {
        let mut tree = NamespaceTree::new();
        let request = Definition::new("HTTP.Request").with_member("method", "GET");
        let headers = Definition::new("HTTP.Request.Headers");
        let request = request.with_member("Headers", Arc::new(headers));
        let http = Definition::new("HTTP")
            .with_member("Request", Arc::new(request))
            .with_member("VERSION", "1.1");
        tree.install(&PackageName::new("HTTP"), Arc::new(http));

        let found = tree.lookup("HTTP.Request").unwrap();
        assert_eq!(found.name(), "HTTP.Request");
        assert_eq!(found.member("method"), Some(&Value::from("GET")));
        assert_eq!(tree.lookup("HTTP.Request.Headers").unwrap().name(), "HTTP.Request.Headers");

        assert!(tree.lookup("HTTP.VERSION").is_none());
        assert!(tree.lookup("HTTP.Response").is_none());
        assert!(tree.lookup("HTTP.Request.Missing").is_none());
    }

    #[test]
    fn test_lookup_prefers_own_binding() {
        let mut tree = NamespaceTree::new();
        let nested = Definition::new("Outer.Inner").with_member("from", "member");
        tree.install(
            &PackageName::new("Outer"),
            Arc::new(Definition::new("Outer").with_member("Inner", Arc::new(nested))),
        );
        tree.install(
            &PackageName::new("Outer.Inner"),
            Arc::new(Definition::new("Outer.Inner").with_member("from", "slot")),
        );

        let found = tree.lookup("Outer.Inner").unwrap();
        assert_eq!(found.member("from"), Some(&Value::from("slot")));
    }

    #[test]
    fn test_children() {
        let mut tree = NamespaceTree::new();
        tree.install(&PackageName::new("Test.More"), def("Test.More"));
        tree.install(&PackageName::new("Test.Simple"), def("Test.Simple"));
        tree.install(&PackageName::new("DOM.Display"), def("DOM.Display"));

        let top: Vec<_> = tree.children("").collect();
        assert_eq!(top, vec!["DOM", "Test"]);
        let test: Vec<_> = tree.children("Test").collect();
        assert_eq!(test, vec!["More", "Simple"]);
    }

    #[test]
    fn test_scope_insert_if_absent() {
        let mut scope = Scope::new();
        assert!(scope.insert_if_absent("plan", Value::Long(1)));
        assert!(!scope.insert_if_absent("plan", Value::Long(2)));
        assert_eq!(scope.get("plan"), Some(&Value::Long(1)));
    }

    #[test]
    fn test_scope_falsy_values_block() {
        let mut scope = Scope::new();
        scope.set("zero", Value::Long(0));
        scope.set("nothing", Value::Nil);
        scope.set("no", Value::Bool(false));

        assert!(!scope.insert_if_absent("zero", Value::Long(5)));
        assert!(!scope.insert_if_absent("nothing", Value::Long(5)));
        assert!(!scope.insert_if_absent("no", Value::Long(5)));
        assert_eq!(scope.get("nothing"), Some(&Value::Nil));
    }
}

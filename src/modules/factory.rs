//! Module Factories
//!
//! A `ModuleFactory` turns retrieved source text into a `Definition`. The
//! resolver never interprets source itself; it hands the text to whatever
//! factory it was built with.
//!
//! Factories receive the resolver, so evaluating one package may load others
//! (`require` / `use_package`) before its own definition is returned.
//!
//! Two factories are provided:
//! - `ManifestFactory` - reads TOML package manifests
//! - `FactoryRegistry` - dispatches to Rust closures registered per package
//!
//! ## Manifest Format
//!
//! ```toml
//! export = ["plan", "ok"]
//! export_ok = ["isDeeply"]
//! requires = ["Test.Builder"]
//! uses = ["Data.Dumper"]
//!
//! [export_tags]
//! ":all" = ["plan", "ok", "isDeeply"]
//!
//! [members]
//! plan = "Test.More.plan"
//! version = 1
//!
//! [prototype]
//! reset = "Test.More.reset"
//! ```
//!
//! Tables under `[members]` become nested namespaces.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use serde::Deserialize;
use tracing::debug;

use super::errors::EvalError;
use super::path::PackageName;
use super::resolver::PackageResolver;
use super::value::{Definition, Members, Value};

/// "Evaluate source text and yield a definition" capability.
pub trait ModuleFactory: Send + Sync {
    fn evaluate(
        &self,
        source: &str,
        package: &PackageName,
        resolver: &mut PackageResolver,
    ) -> Result<Definition, EvalError>;
}

/// Parsed TOML package manifest.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PackageManifest {
    /// Overrides the package name recorded on the definition.
    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub export: Option<Vec<String>>,

    #[serde(default)]
    pub export_ok: Option<Vec<String>>,

    #[serde(default)]
    pub export_tags: Option<BTreeMap<String, Vec<String>>>,

    /// Packages loaded (without exports) before the definition is built.
    #[serde(default)]
    pub requires: Vec<String>,

    /// Packages loaded and default-exported before the definition is built.
    #[serde(default)]
    pub uses: Vec<String>,

    #[serde(default)]
    pub members: BTreeMap<String, toml::Value>,

    #[serde(default)]
    pub prototype: Option<BTreeMap<String, toml::Value>>,
}

impl PackageManifest {
    pub fn parse(source: &str) -> Result<Self, EvalError> {
        toml::from_str(source).map_err(|e| EvalError::new(format!("invalid manifest: {}", e)))
    }

    /// Build the definition described by this manifest.
    pub fn into_definition(self, package: &PackageName) -> Definition {
        let name = self.name.unwrap_or_else(|| package.to_string());
        let mut def = Definition::new(name.clone());

        for (key, value) in self.members {
            let member_path = format!("{}.{}", name, key);
            def.set_member(key, toml_to_value(value, &member_path));
        }
        if let Some(prototype) = self.prototype {
            def = def.with_prototype(toml_table_to_members(prototype, &name));
        }
        if let Some(export) = self.export {
            def = def.with_export(export);
        }
        if let Some(export_ok) = self.export_ok {
            def = def.with_export_ok(export_ok);
        }
        for (tag, names) in self.export_tags.unwrap_or_default() {
            def = def.with_tag(tag, names);
        }
        def
    }
}

fn toml_table_to_members(table: BTreeMap<String, toml::Value>, owner: &str) -> Members {
    table
        .into_iter()
        .map(|(key, value)| {
            let path = format!("{}.{}", owner, key);
            (key, toml_to_value(value, &path))
        })
        .collect()
}

/// Convert a TOML value to a `Value`; tables become nested namespaces named `path`.
fn toml_to_value(value: toml::Value, path: &str) -> Value {
    match value {
        toml::Value::String(s) => Value::String(s),
        toml::Value::Integer(n) => Value::Long(n),
        toml::Value::Float(x) => Value::Float(x),
        toml::Value::Boolean(b) => Value::Bool(b),
        toml::Value::Datetime(dt) => Value::String(dt.to_string()),
        toml::Value::Array(items) => Value::List(
            items
                .into_iter()
                .map(|item| toml_to_value(item, path))
                .collect(),
        ),
        toml::Value::Table(table) => {
            let mut def = Definition::new(path);
            for (key, value) in table {
                let child = format!("{}.{}", path, key);
                def.set_member(key, toml_to_value(value, &child));
            }
            Value::Namespace(Arc::new(def))
        }
    }
}

/// Evaluates TOML package manifests.
#[derive(Debug, Clone, Copy, Default)]
pub struct ManifestFactory;

impl ModuleFactory for ManifestFactory {
    fn evaluate(
        &self,
        source: &str,
        package: &PackageName,
        resolver: &mut PackageResolver,
    ) -> Result<Definition, EvalError> {
        let manifest = PackageManifest::parse(source)?;

        for dependency in &manifest.requires {
            let loaded = resolver
                .require(dependency)
                .map_err(|e| EvalError::new(format!("requires {}: {}", dependency, e)))?;
            if loaded.is_none() {
                debug!(target: "just::factory", %package, %dependency, "Required package not loaded");
            }
        }
        for dependency in &manifest.uses {
            let loaded = resolver
                .use_package(dependency, &[])
                .map_err(|e| EvalError::new(format!("uses {}: {}", dependency, e)))?;
            if loaded.is_none() {
                debug!(target: "just::factory", %package, %dependency, "Used package not loaded");
            }
        }

        Ok(manifest.into_definition(package))
    }
}

/// A Rust closure standing in for a package's source.
pub type FactoryFn =
    Arc<dyn Fn(&str, &mut PackageResolver) -> Result<Definition, EvalError> + Send + Sync>;

/// Dispatches evaluation to closures registered per package name.
///
/// Packages without a registered closure go to the fallback factory, if any.
#[derive(Clone, Default)]
pub struct FactoryRegistry {
    factories: HashMap<String, FactoryFn>,
    fallback: Option<Arc<dyn ModuleFactory>>,
}

impl FactoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the closure that builds `package`. It receives the fetched source text.
    pub fn register<F>(&mut self, package: impl Into<String>, factory: F)
    where
        F: Fn(&str, &mut PackageResolver) -> Result<Definition, EvalError> + Send + Sync + 'static,
    {
        self.factories.insert(package.into(), Arc::new(factory));
    }

    pub fn with<F>(mut self, package: impl Into<String>, factory: F) -> Self
    where
        F: Fn(&str, &mut PackageResolver) -> Result<Definition, EvalError> + Send + Sync + 'static,
    {
        self.register(package, factory);
        self
    }

    /// Factory for packages with no registered closure.
    pub fn with_fallback(mut self, fallback: impl ModuleFactory + 'static) -> Self {
        self.fallback = Some(Arc::new(fallback));
        self
    }
}

impl ModuleFactory for FactoryRegistry {
    fn evaluate(
        &self,
        source: &str,
        package: &PackageName,
        resolver: &mut PackageResolver,
    ) -> Result<Definition, EvalError> {
        if let Some(factory) = self.factories.get(package.as_str()) {
            return factory(source, resolver);
        }
        match &self.fallback {
            Some(fallback) => fallback.evaluate(source, package, resolver),
            None => Err(EvalError::new(format!(
                "no factory registered for {}",
                package
            ))),
        }
    }
}

impl std::fmt::Debug for FactoryRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<_> = self.factories.keys().collect();
        names.sort();
        f.debug_struct("FactoryRegistry")
            .field("packages", &names)
            .field("fallback", &self.fallback.is_some())
            .finish()
    }
}

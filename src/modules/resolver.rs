//! Package Resolver
//!
//! Resolves dotted package names to definitions:
//!
//! 1. Derive the relative path (`Foo.Bar` -> `Foo/Bar.toml`)
//! 2. Return the cached definition if this path was loaded before
//! 3. Return the namespace binding if the package is already installed, or
//!    defined as a namespace member of an installed ancestor (the cache is
//!    not consulted or updated)
//! 4. Try each location in order; the first one that has the file wins
//! 5. Evaluate the source, install the definition in the namespace tree
//!    (first install wins) and cache it by path
//! 6. Otherwise report the package as not found and return `None`
//!
//! Transport failures on any location but the last are recorded and skipped.
//! A failure on the last location is returned as `LoadError::Fetch`.
//!
//! # Reentrancy
//!
//! Factories receive the resolver and may load further packages while a
//! package is being evaluated. Paths under evaluation are tracked; a nested
//! request for one of them is not fetched again and yields whatever is already
//! installed under its name, or `None`. Circular packages are not detected
//! beyond that.

use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, trace};

use super::cache::LoadCache;
use super::errors::{ErrorLevel, ErrorReporter, LoadError, LoadResult};
use super::exporter;
use super::factory::{ManifestFactory, ModuleFactory};
use super::fetch::{DefaultFetcher, Fetcher};
use super::namespace::{NamespaceTree, Scope};
use super::options::{LoadOptions, OptionsError};
use super::path::{flatten, package_to_path, path_to_address, Nested, PackageName};
use super::value::Definition;

/// Loads packages, installs them into a namespace tree and exports their symbols.
pub struct PackageResolver {
    /// Locations, file extension and error level.
    options: LoadOptions,

    /// Resolved path -> definition, plus in-progress loads.
    cache: LoadCache,

    /// Installed packages by dotted name.
    namespace: NamespaceTree,

    /// Destination for exported symbols.
    scope: Scope,

    /// Error-level policy and last error message.
    reporter: ErrorReporter,

    fetcher: Arc<dyn Fetcher>,
    factory: Arc<dyn ModuleFactory>,
}

impl PackageResolver {
    /// Create a resolver with explicit transport and evaluation capabilities.
    pub fn new(
        options: LoadOptions,
        fetcher: impl Fetcher + 'static,
        factory: impl ModuleFactory + 'static,
    ) -> Self {
        let reporter = ErrorReporter::new(options.error_level);
        Self {
            options,
            cache: LoadCache::new(),
            namespace: NamespaceTree::new(),
            scope: Scope::new(),
            reporter,
            fetcher: Arc::new(fetcher),
            factory: Arc::new(factory),
        }
    }

    /// File system / HTTP transport with TOML manifests.
    pub fn with_options(options: LoadOptions) -> Self {
        Self::new(options, DefaultFetcher::new(), ManifestFactory)
    }

    /// Like `with_options`, configured from the per-user configuration file.
    pub fn from_user_config() -> Result<Self, OptionsError> {
        LoadOptions::load_default().map(Self::with_options)
    }

    /// Resolve a package to its definition without exporting anything.
    ///
    /// Returns `Ok(None)` when the package could not be loaded and the error
    /// level is not `die`.
    pub fn resolve(&mut self, package: &str) -> LoadResult<Option<Arc<Definition>>> {
        let name = PackageName::new(package);
        let path = package_to_path(package, &self.options.extension);

        if let Some(def) = self.cache.get(&path) {
            trace!(target: "just::resolver", %name, %path, "Cache hit");
            return Ok(Some(def));
        }

        if let Some(def) = self.namespace.lookup(package) {
            trace!(target: "just::resolver", %name, "Already installed");
            return Ok(Some(def));
        }

        if self.cache.is_loading(&path) {
            debug!(target: "just::resolver", %name, %path, "Package requested while it is loading");
            return Ok(None);
        }

        let locations = self.options.locations.clone();
        let last = locations.len().saturating_sub(1);
        for (i, location) in locations.iter().enumerate() {
            let address = path_to_address(&path, location);
            match self.fetcher.fetch_text(&address) {
                Ok(Some(source)) => {
                    debug!(target: "just::resolver", %name, %address, "Fetched package source");
                    return self.materialize(&name, &path, &source);
                }
                Ok(None) => {
                    trace!(target: "just::resolver", %name, %address, "Not found at location");
                }
                Err(err) if i == last => {
                    self.reporter.report(err.to_string(), Some(ErrorLevel::None))?;
                    return Err(LoadError::Fetch(err));
                }
                Err(err) => {
                    debug!(target: "just::resolver", %name, %address, error = %err, "Fetch failed, trying next location");
                    self.reporter.report(err.to_string(), Some(ErrorLevel::None))?;
                }
            }
        }

        self.reporter
            .report(LoadError::NotFound(package.to_string()).to_string(), None)?;
        Ok(None)
    }

    /// Evaluate fetched source, install the result and cache it.
    fn materialize(
        &mut self,
        name: &PackageName,
        path: &str,
        source: &str,
    ) -> LoadResult<Option<Arc<Definition>>> {
        let factory = Arc::clone(&self.factory);

        self.cache.mark_loading(path);
        let evaluated = factory.evaluate(source, name, self);
        self.cache.unmark_loading(path);

        match evaluated {
            Ok(def) => {
                let bound = self.namespace.install(name, Arc::new(def));
                let def = self.cache.insert(path, bound);
                debug!(target: "just::resolver", %name, %path, "Loaded package");
                Ok(Some(def))
            }
            Err(err) => {
                let err = LoadError::Evaluation(name.to_string(), err);
                self.reporter.report(err.to_string(), None)?;
                Ok(None)
            }
        }
    }

    /// Load a package without exporting any symbols.
    pub fn require(&mut self, package: &str) -> LoadResult<Option<Arc<Definition>>> {
        self.resolve(package)
    }

    /// Load a package and export symbols from it into the scope.
    ///
    /// An empty `request` exports the package's default list.
    pub fn use_package(
        &mut self,
        package: &str,
        request: &[Nested],
    ) -> LoadResult<Option<Arc<Definition>>> {
        let Some(def) = self.require(package)? else {
            return Ok(None);
        };
        exporter::export(&def, request, &mut self.scope);
        Ok(Some(def))
    }

    /// Export symbols from an already loaded definition into the scope.
    ///
    /// Returns the names that were written.
    pub fn exporter(&mut self, def: &Definition, request: &[Nested]) -> Vec<String> {
        exporter::export(def, request, &mut self.scope)
    }

    /// Prepend locations, keeping their left-to-right order as precedence.
    pub fn add_repository(&mut self, locations: &[Nested]) -> &mut Self {
        let flat = flatten(locations);
        for location in flat.into_iter().rev() {
            self.options.locations.insert(0, location);
        }
        self
    }

    /// Prepend `location` unless it is already listed. Returns whether it was added.
    pub fn add_repository_unique(&mut self, location: &str) -> bool {
        if self.options.locations.iter().any(|l| l == location) {
            return false;
        }
        self.options.locations.insert(0, location.to_string());
        true
    }

    /// Look up an installed package by dotted name.
    pub fn lookup(&self, package: &str) -> Option<Arc<Definition>> {
        self.namespace.lookup(package)
    }

    pub fn locations(&self) -> &[String] {
        &self.options.locations
    }

    pub fn options(&self) -> &LoadOptions {
        &self.options
    }

    /// Path -> definition table of everything loaded through this resolver.
    pub fn loaded(&self) -> &LoadCache {
        &self.cache
    }

    pub fn namespace(&self) -> &NamespaceTree {
        &self.namespace
    }

    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    pub fn scope_mut(&mut self) -> &mut Scope {
        &mut self.scope
    }

    /// Text of the most recent error, whatever the error level.
    pub fn error_message(&self) -> &str {
        self.reporter.last_message()
    }

    pub fn error_level(&self) -> ErrorLevel {
        self.reporter.level()
    }

    pub fn set_error_level(&mut self, level: ErrorLevel) {
        self.options.error_level = level;
        self.reporter.set_level(level);
    }

    /// Hook called with the message of every `warn`-level report.
    pub fn set_notifier<F>(&mut self, notifier: F)
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        self.reporter.set_notifier(notifier);
    }
}

impl Default for PackageResolver {
    fn default() -> Self {
        Self::with_options(LoadOptions::default())
    }
}

impl std::fmt::Debug for PackageResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PackageResolver")
            .field("locations", &self.options.locations)
            .field("extension", &self.options.extension)
            .field("loaded", &self.cache.len())
            .field("installed", &self.namespace.len())
            .field("scope", &self.scope.len())
            .field("reporter", &self.reporter)
            .finish()
    }
}

/// Thread-safe wrapper for PackageResolver.
pub type SharedResolver = Arc<RwLock<PackageResolver>>;

/// Wrap a resolver for sharing across threads.
pub fn new_shared_resolver(resolver: PackageResolver) -> SharedResolver {
    Arc::new(RwLock::new(resolver))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::errors::EvalError;
    use crate::modules::factory::FactoryRegistry;
    use crate::modules::fetch::{FetchResult, MemoryFetcher};
    use crate::modules::value::Value;
    use crate::nested;
    use parking_lot::Mutex;

    /// A fetcher shared between the resolver and the test body.
    #[derive(Clone, Default)]
    struct Shared(Arc<MemoryFetcher>);

    impl Fetcher for Shared {
        fn fetch_text(&self, address: &str) -> FetchResult {
            self.0.fetch_text(address)
        }
    }

    fn options() -> LoadOptions {
        LoadOptions::default().with_locations(["L1", "L2"])
    }

    fn resolver_with(fetcher: &Shared) -> PackageResolver {
        PackageResolver::new(options(), fetcher.clone(), ManifestFactory)
    }

    const DIGEST: &str = r#"
        export_ok = ["md5", "md5Hex"]

        [export_tags]
        ":all" = ["md5", "md5Hex"]

        [members]
        md5 = "raw"
        md5Hex = "hex"
    "#;

    #[test]
    fn test_resolve_from_first_location() {
        let fetcher = Shared::default();
        fetcher.0.insert("L2/Digest/MD5.toml", DIGEST);
        let mut resolver = resolver_with(&fetcher);

        let def = resolver.resolve("Digest.MD5").unwrap().unwrap();
        assert_eq!(def.name(), "Digest.MD5");
        assert_eq!(fetcher.0.request_count("L1/Digest/MD5.toml"), 1);
        assert_eq!(fetcher.0.request_count("L2/Digest/MD5.toml"), 1);
        assert!(resolver.loaded().contains("Digest/MD5.toml"));
        assert!(resolver.lookup("Digest.MD5").is_some());
    }

    #[test]
    fn test_cache_single_fetch() {
        let fetcher = Shared::default();
        fetcher.0.insert("L1/Digest/MD5.toml", DIGEST);
        let mut resolver = resolver_with(&fetcher);

        let first = resolver.resolve("Digest.MD5").unwrap().unwrap();
        let second = resolver.resolve("Digest.MD5").unwrap().unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(fetcher.0.total_requests(), 1);
    }

    #[test]
    fn test_location_precedence() {
        let fetcher = Shared::default();
        fetcher.0.insert("L1/Foo.toml", "[members]\nfrom = \"L1\"");
        fetcher.0.insert("L2/Foo.toml", "[members]\nfrom = \"L2\"");
        let mut resolver = resolver_with(&fetcher);

        let def = resolver.resolve("Foo").unwrap().unwrap();
        assert_eq!(def.member("from"), Some(&Value::from("L1")));
        assert_eq!(fetcher.0.request_count("L2/Foo.toml"), 0);
    }

    #[test]
    fn test_not_found_returns_none() {
        let fetcher = Shared::default();
        let mut resolver = resolver_with(&fetcher);

        assert!(resolver.resolve("Missing.Package").unwrap().is_none());
        assert!(resolver.error_message().contains("Missing.Package"));
        assert!(resolver.loaded().is_empty());
    }

    #[test]
    fn test_not_found_dies() {
        let fetcher = Shared::default();
        let mut resolver = resolver_with(&fetcher);
        resolver.set_error_level(ErrorLevel::Die);

        let err = resolver.resolve("Missing").unwrap_err();
        assert!(matches!(err, LoadError::Reported(_)));
    }

    #[test]
    fn test_not_found_warns() {
        let fetcher = Shared::default();
        let mut resolver = resolver_with(&fetcher);
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        resolver.set_error_level(ErrorLevel::Warn);
        resolver.set_notifier(move |msg| sink.lock().push(msg.to_string()));

        assert!(resolver.resolve("Missing").unwrap().is_none());
        assert_eq!(seen.lock().len(), 1);
        assert!(seen.lock()[0].contains("Missing"));
    }

    #[test]
    fn test_fetch_failure_on_earlier_location_is_swallowed() {
        let fetcher = Shared::default();
        fetcher.0.insert_failure("L1/Foo.toml", "connection reset");
        fetcher.0.insert("L2/Foo.toml", "export = []");
        let mut resolver = resolver_with(&fetcher);

        assert!(resolver.resolve("Foo").unwrap().is_some());
    }

    #[test]
    fn test_fetch_failure_on_last_location_propagates() {
        let fetcher = Shared::default();
        fetcher.0.insert_failure("L2/Foo.toml", "connection reset");
        let mut resolver = resolver_with(&fetcher);

        let err = resolver.resolve("Foo").unwrap_err();
        match err {
            LoadError::Fetch(fetch) => assert_eq!(fetch.address, "L2/Foo.toml"),
            other => panic!("expected fetch error, got {:?}", other),
        }
        assert!(resolver.error_message().contains("connection reset"));
    }

    #[test]
    fn test_evaluation_failure_reports_and_returns_none() {
        let fetcher = Shared::default();
        fetcher.0.insert("L1/Broken.toml", "export = = [");
        let mut resolver = resolver_with(&fetcher);

        assert!(resolver.resolve("Broken").unwrap().is_none());
        assert!(resolver
            .error_message()
            .starts_with("Could not create namespace[Broken]"));
        assert!(resolver.lookup("Broken").is_none());
        assert!(!resolver.loaded().contains("Broken.toml"));
    }

    #[test]
    fn test_evaluation_failure_dies() {
        let fetcher = Shared::default();
        fetcher.0.insert("L1/Broken.toml", "export = = [");
        let mut resolver = resolver_with(&fetcher);
        resolver.set_error_level(ErrorLevel::Die);

        assert!(resolver.resolve("Broken").is_err());
    }

    #[test]
    fn test_installed_binding_shortcut() {
        let fetcher = Shared::default();
        fetcher.0.insert("L1/Test/More.toml", "export = []");
        let mut resolver = resolver_with(&fetcher);
        resolver.resolve("Test.More").unwrap();

        // Installed under its name, so a fresh extension lookup still finds it
        resolver.options.extension = "js".to_string();
        let def = resolver.resolve("Test.More").unwrap();
        assert!(def.is_some());
        assert_eq!(fetcher.0.total_requests(), 1);
        assert!(!resolver.loaded().contains("Test/More.js"));
    }

    #[test]
    fn test_namespace_member_of_loaded_package_shortcut() {
        let fetcher = Shared::default();
        fetcher
            .0
            .insert("L1/HTTP.toml", "[members.Request]\nmethod = \"GET\"");
        let mut resolver = resolver_with(&fetcher);
        resolver.resolve("HTTP").unwrap().unwrap();

        let request = resolver.require("HTTP.Request").unwrap().unwrap();
        assert_eq!(request.name(), "HTTP.Request");
        assert_eq!(request.member("method"), Some(&Value::from("GET")));
        assert_eq!(resolver.error_message(), "");
        assert_eq!(fetcher.0.total_requests(), 1);
        assert!(!resolver.loaded().contains("HTTP/Request.toml"));
    }

    #[test]
    fn test_use_package_exports_defaults() {
        let fetcher = Shared::default();
        fetcher.0.insert(
            "L1/Test/More.toml",
            r#"
            export = ["plan", "ok"]
            export_ok = ["isDeeply"]

            [members]
            plan = "plan"
            ok = "ok"
            isDeeply = "isDeeply"
            "#,
        );
        let mut resolver = resolver_with(&fetcher);

        resolver.use_package("Test.More", &[]).unwrap().unwrap();
        let names: Vec<_> = resolver.scope().names().collect();
        assert_eq!(names, vec!["ok", "plan"]);

        resolver
            .use_package("Test.More", &nested!["isDeeply"])
            .unwrap();
        assert!(resolver.scope().contains("isDeeply"));
        assert_eq!(fetcher.0.total_requests(), 1);
    }

    #[test]
    fn test_use_missing_package_exports_nothing() {
        let fetcher = Shared::default();
        let mut resolver = resolver_with(&fetcher);
        assert!(resolver.use_package("Nope", &nested![":all"]).unwrap().is_none());
        assert!(resolver.scope().is_empty());
    }

    #[test]
    fn test_exporter_on_held_definition() {
        let fetcher = Shared::default();
        let mut resolver = resolver_with(&fetcher);
        let def = Definition::new("Held")
            .with_export_ok(["x"])
            .with_member("x", 1i64);

        assert_eq!(resolver.exporter(&def, &nested!["x"]), vec!["x"]);
        assert_eq!(resolver.scope().get("x"), Some(&Value::Long(1)));
        assert_eq!(fetcher.0.total_requests(), 0);
    }

    #[test]
    fn test_add_repository_order() {
        let fetcher = Shared::default();
        let mut resolver = resolver_with(&fetcher);
        resolver.add_repository(&nested!["a", vec![Nested::from("b"), Nested::from(["c"])], "d"]);
        assert_eq!(resolver.locations(), &["a", "b", "c", "d", "L1", "L2"]);

        resolver.add_repository(&nested!["z"]);
        assert_eq!(resolver.locations()[0], "z");
    }

    #[test]
    fn test_add_repository_allows_duplicates() {
        let fetcher = Shared::default();
        let mut resolver = resolver_with(&fetcher);
        resolver.add_repository(&nested!["L2"]);
        assert_eq!(resolver.locations(), &["L2", "L1", "L2"]);
    }

    #[test]
    fn test_add_repository_unique() {
        let fetcher = Shared::default();
        let mut resolver = resolver_with(&fetcher);
        assert!(!resolver.add_repository_unique("L2"));
        assert!(resolver.add_repository_unique("js"));
        assert_eq!(resolver.locations(), &["js", "L1", "L2"]);
    }

    #[test]
    fn test_empty_location_list() {
        let fetcher = Shared::default();
        let mut resolver = PackageResolver::new(
            LoadOptions::default().with_locations(Vec::<String>::new()),
            fetcher.clone(),
            ManifestFactory,
        );
        assert!(resolver.resolve("Foo").unwrap().is_none());
        assert_eq!(fetcher.0.total_requests(), 0);
    }

    #[test]
    fn test_reentrant_load_during_evaluation() {
        let fetcher = Shared::default();
        fetcher.0.insert("L1/Outer.toml", "");
        fetcher.0.insert("L1/Inner.toml", "");

        let factory = FactoryRegistry::new()
            .with("Outer", |_source, resolver: &mut PackageResolver| {
                let inner = resolver
                    .require("Inner")
                    .map_err(|e| EvalError::new(e.to_string()))?
                    .ok_or_else(|| EvalError::new("Inner missing"))?;
                Ok(Definition::new("Outer").with_member("inner", Value::Namespace(inner)))
            })
            .with("Inner", |_source, _resolver| Ok(Definition::new("Inner")));
        let mut resolver = PackageResolver::new(options(), fetcher.clone(), factory);

        let outer = resolver.resolve("Outer").unwrap().unwrap();
        let inner = resolver.lookup("Inner").unwrap();
        assert!(Arc::ptr_eq(outer.member("inner").unwrap().as_definition().unwrap(), &inner));
        assert_eq!(resolver.loaded().len(), 2);
    }

    #[test]
    fn test_self_reference_during_evaluation_yields_none() {
        let fetcher = Shared::default();
        fetcher.0.insert("L1/Loop.toml", "");

        let factory = FactoryRegistry::new().with("Loop", |_source, resolver: &mut PackageResolver| {
            let again = resolver
                .require("Loop")
                .map_err(|e| EvalError::new(e.to_string()))?;
            Ok(Definition::new("Loop").with_member("sawSelf", again.is_some()))
        });
        let mut resolver = PackageResolver::new(options(), fetcher.clone(), factory);

        let def = resolver.resolve("Loop").unwrap().unwrap();
        assert_eq!(def.member("sawSelf"), Some(&Value::Bool(false)));
        assert_eq!(fetcher.0.request_count("L1/Loop.toml"), 1);
    }

    #[test]
    fn test_first_install_wins_under_reentrancy() {
        let fetcher = Shared::default();
        fetcher.0.insert("L1/Twice.toml", "");

        let factory = FactoryRegistry::new().with("Twice", |_source, resolver: &mut PackageResolver| {
            // Something else installs the same name while this package evaluates
            let early = Definition::new("Twice").with_member("who", "early");
            resolver
                .namespace
                .install(&PackageName::new("Twice"), Arc::new(early));
            Ok(Definition::new("Twice").with_member("who", "late"))
        });
        let mut resolver = PackageResolver::new(options(), fetcher.clone(), factory);

        let def = resolver.resolve("Twice").unwrap().unwrap();
        assert_eq!(def.member("who"), Some(&Value::from("early")));
        assert!(Arc::ptr_eq(&resolver.lookup("Twice").unwrap(), &def));
        assert!(Arc::ptr_eq(&resolver.loaded().get("Twice.toml").unwrap(), &def));
    }

    #[test]
    fn test_shared_resolver() {
        let fetcher = Shared::default();
        fetcher.0.insert("L1/Foo.toml", "export = []");
        let shared = new_shared_resolver(resolver_with(&fetcher));

        {
            let mut resolver = shared.write();
            resolver.resolve("Foo").unwrap();
        }
        assert_eq!(shared.read().loaded().len(), 1);
    }
}

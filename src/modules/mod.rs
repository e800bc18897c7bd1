//! Package Loading Infrastructure
//!
//! This module provides the core types for loading packages and importing
//! their symbols:
//! - `PackageResolver` - Resolves dotted package names through ordered locations
//! - `LoadCache` - Resolved path -> definition memo with in-progress tracking
//! - `NamespaceTree` / `Scope` - Installed packages and the export destination
//! - `export` / `export_list` - Exporter symbol selection (`EXPORT`, `EXPORT_OK`, `EXPORT_TAGS`)
//! - `Fetcher` / `ModuleFactory` - Injected transport and evaluation capabilities
//! - `LoadOptions` - TOML-configurable locations, extension and error level

mod cache;
mod errors;
mod exporter;
mod factory;
mod fetch;
#[cfg(feature = "async")]
mod fetch_async;
mod namespace;
mod options;
mod path;
mod resolver;
mod value;

pub use cache::LoadCache;
pub use errors::{
    ErrorLevel, ErrorReporter, EvalError, FetchError, LoadError, LoadResult, Notifier,
};
pub use exporter::{export, export_list};
pub use factory::{FactoryFn, FactoryRegistry, ManifestFactory, ModuleFactory, PackageManifest};
pub use fetch::{
    is_remote_address, DefaultFetcher, FetchResult, Fetcher, FsFetcher, HttpFetcher,
    MemoryFetcher,
};
#[cfg(feature = "async")]
pub use fetch_async::{AsyncFetcher, BlockingFetcher};
pub use namespace::{NamespaceTree, Scope, Slot};
pub use options::{LoadOptions, OptionsError, CONFIG_DIR_NAME, CONFIG_FILE_NAME, DEFAULT_EXTENSION};
pub use path::{
    flatten, package_to_path, path_to_address, Nested, PackageName, NAMESPACE_SEPARATOR,
    PATH_SEPARATOR,
};
pub use resolver::{new_shared_resolver, PackageResolver, SharedResolver};
pub use value::{Definition, Members, NativeFn, Value};

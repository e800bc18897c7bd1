//! Just - Package Loader Library
//!
//! This library loads packages addressed by dotted names, installs them into a
//! namespace registry and imports selected symbols into a destination scope,
//! in the style of Perl's Exporter.
//!
//! # Architecture
//!
//! Loading a package goes through two components:
//!
//! 1. **Package resolution** (`PackageResolver`)
//!    - Maps `Foo.Bar.Baz` to `Foo/Bar/Baz.toml`
//!    - Searches an ordered list of locations; the first hit wins
//!    - Caches definitions by resolved path (one fetch per path)
//!    - Installs each definition under its dotted name (first install wins)
//!
//! 2. **Symbol export** (`export`)
//!    - `EXPORT` - exported when nothing specific is requested
//!    - `EXPORT_OK` - exported only on request
//!    - `EXPORT_TAGS` - named groups such as `:all`
//!    - Never overwrites a name already present in the scope
//!
//! Transport (`Fetcher`) and evaluation (`ModuleFactory`) are injected.
//!
//! # Example
//!
//! ```rust
//! use just_loader::*;
//!
//! let fetcher = MemoryFetcher::new().with(
//!     "lib/Digest/MD5.toml",
//!     r#"
//!     export_ok = ["md5", "md5Hex"]
//!     export_tags = { ":all" = ["md5", "md5Hex"] }
//!     members = { md5 = "raw", md5Hex = "hex" }
//!     "#,
//! );
//! let mut just = PackageResolver::new(LoadOptions::default(), fetcher, ManifestFactory);
//!
//! let def = just.use_package("Digest.MD5", &nested![":all"]).unwrap().unwrap();
//! assert_eq!(def.name(), "Digest.MD5");
//! assert_eq!(just.scope().get("md5Hex"), Some(&Value::from("hex")));
//! ```
//!
//! # Error Levels
//!
//! - **none** (default): failures return `None`; `error_message()` keeps the text
//! - **warn**: as `none`, plus a `tracing` warning and the notifier hook
//! - **die**: failures are returned as `Err(LoadError)`

pub mod logging;
pub mod modules;

pub use modules::{
    export, export_list, flatten, new_shared_resolver, package_to_path, path_to_address,
    DefaultFetcher, Definition, ErrorLevel, EvalError, FactoryRegistry, FetchError, FetchResult,
    Fetcher, FsFetcher, HttpFetcher, LoadCache, LoadError, LoadOptions, LoadResult,
    ManifestFactory, MemoryFetcher, ModuleFactory, NamespaceTree, Nested, PackageName,
    PackageResolver, Scope, SharedResolver, Slot, Value,
};

#[cfg(feature = "async")]
pub use modules::{AsyncFetcher, BlockingFetcher};

/// Loader version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

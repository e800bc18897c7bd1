//! Package Name and Path Resolution
//!
//! Packages are addressed by dotted names. The loader maps a name onto a
//! relative path and then onto a full address under each registered location:
//!
//! - `Test.Simple` -> `Test/Simple.<ext>`
//! - `HTTP.Request` -> `HTTP/Request.<ext>`
//! - `Foo.Bar.Baz` -> `Foo/Bar/Baz.<ext>`
//!
//! Addresses are plain string concatenations (`location + "/" + path`) so the
//! same rules serve file system directories and URL prefixes.

use itertools::Itertools;
use smallvec::SmallVec;

/// Separator between namespace segments in a package name.
pub const NAMESPACE_SEPARATOR: char = '.';

/// Separator between path segments in a resolved path.
pub const PATH_SEPARATOR: char = '/';

/// A dotted package name such as `Digest.MD5`.
///
/// No validation beyond non-emptiness is applied; segments are whatever lies
/// between the separators.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PackageName(String);

impl PackageName {
    /// Create a package name from a dotted string.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Get the dotted name.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Split the name into its namespace segments.
    pub fn segments(&self) -> SmallVec<[&str; 4]> {
        self.0.split(NAMESPACE_SEPARATOR).collect()
    }

    /// Every enclosing namespace, shortest first.
    ///
    /// # Examples
    /// - `"Foo.Bar.Baz"` -> `["Foo", "Foo.Bar"]`
    /// - `"Foo"` -> `[]`
    pub fn ancestors(&self) -> SmallVec<[&str; 4]> {
        self.0
            .match_indices(NAMESPACE_SEPARATOR)
            .map(|(idx, _)| &self.0[..idx])
            .collect()
    }
}

impl std::fmt::Display for PackageName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PackageName {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for PackageName {
    fn from(name: String) -> Self {
        Self(name)
    }
}

impl AsRef<str> for PackageName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Convert a dotted package name into a relative path with `extension` appended.
pub fn package_to_path(package: &str, extension: &str) -> String {
    let joined = package
        .split(NAMESPACE_SEPARATOR)
        .join(&PATH_SEPARATOR.to_string());
    if extension.is_empty() {
        joined
    } else {
        format!("{}.{}", joined, extension)
    }
}

/// Prefix a relative path with a location to form a fetchable address.
pub fn path_to_address(path: &str, location: &str) -> String {
    format!("{}{}{}", location, PATH_SEPARATOR, path)
}

/// A possibly nested list of strings, as accepted by `add_repository` and import requests.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Nested {
    /// A single string token.
    Item(String),
    /// A nested list of tokens.
    List(Vec<Nested>),
}

impl From<&str> for Nested {
    fn from(item: &str) -> Self {
        Nested::Item(item.to_string())
    }
}

impl From<String> for Nested {
    fn from(item: String) -> Self {
        Nested::Item(item)
    }
}

impl<T: Into<Nested>> From<Vec<T>> for Nested {
    fn from(items: Vec<T>) -> Self {
        Nested::List(items.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Nested>, const N: usize> From<[T; N]> for Nested {
    fn from(items: [T; N]) -> Self {
        Nested::List(items.into_iter().map(Into::into).collect())
    }
}

/// Flatten nested tokens into a single ordered list, keeping duplicates.
pub fn flatten(tokens: &[Nested]) -> Vec<String> {
    let mut flat = Vec::new();
    flatten_into(tokens, &mut flat);
    flat
}

fn flatten_into(tokens: &[Nested], out: &mut Vec<String>) {
    for token in tokens {
        match token {
            Nested::Item(item) => out.push(item.clone()),
            Nested::List(items) => flatten_into(items, out),
        }
    }
}

/// Build a `Vec<Nested>` from heterogeneous items.
///
/// ```
/// use just_loader::nested;
/// let request = nested!["a", ["b", "c"], vec!["d"]];
/// assert_eq!(request.len(), 3);
/// ```
#[macro_export]
macro_rules! nested {
    () => { ::std::vec::Vec::<$crate::Nested>::new() };
    ($($item:expr),+ $(,)?) => {
        vec![$($crate::Nested::from($item)),+]
    };
}

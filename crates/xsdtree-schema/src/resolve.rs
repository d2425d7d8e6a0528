//! Locating schema and include files.

use std::path::{Path, PathBuf};

use indexmap::IndexMap;

use crate::error::ResolveError;

/// A resolved source file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Source {
    /// Canonical location, used to read each file at most once.
    pub location: String,
    pub content: String,
}

/// Resolves a location, possibly relative to the file that mentions it.
pub trait SourceResolver {
    fn resolve(&self, base: Option<&str>, location: &str) -> Result<Source, ResolveError>;
}

impl<R: SourceResolver + ?Sized> SourceResolver for &R {
    fn resolve(&self, base: Option<&str>, location: &str) -> Result<Source, ResolveError> {
        (**self).resolve(base, location)
    }
}

/// Folder part of a location including the trailing separator, or `""`.
pub fn folder(location: &str) -> &str {
    let a = location.rfind('\\');
    let b = location.rfind('/');
    match a.max(b) {
        Some(index) => &location[..=index],
        None => "",
    }
}

/// Joins `location` to the folder of `base` unless it is absolute.
pub fn relative_to(base: Option<&str>, location: &str) -> String {
    if location.starts_with('/') || location.contains("://") {
        return location.to_string();
    }
    match base {
        Some(base) => format!("{}{}", folder(base), location),
        None => location.to_string(),
    }
}

/// Reads files from disk.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileResolver;

impl SourceResolver for FileResolver {
    fn resolve(&self, base: Option<&str>, location: &str) -> Result<Source, ResolveError> {
        let path = PathBuf::from(relative_to(base, location));
        if !path.exists() {
            return Err(ResolveError::NotFound {
                location: path.display().to_string(),
            });
        }
        let canonical = canonical(&path);
        let content = std::fs::read_to_string(&path).map_err(|e| ResolveError::Io {
            location: canonical.clone(),
            message: e.to_string(),
        })?;
        Ok(Source {
            location: canonical,
            content,
        })
    }
}

fn canonical(path: &Path) -> String {
    std::fs::canonicalize(path)
        .unwrap_or_else(|_| path.to_path_buf())
        .display()
        .to_string()
}

/// Serves files from memory, keyed by location.
#[derive(Debug, Clone, Default)]
pub struct MemoryResolver {
    files: IndexMap<String, String>,
}

impl MemoryResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, location: impl Into<String>, content: impl Into<String>) -> Self {
        self.insert(location, content);
        self
    }

    pub fn insert(&mut self, location: impl Into<String>, content: impl Into<String>) {
        self.files.insert(location.into(), content.into());
    }
}

impl SourceResolver for MemoryResolver {
    fn resolve(&self, base: Option<&str>, location: &str) -> Result<Source, ResolveError> {
        let location = normalize_dots(&relative_to(base, location));
        match self.files.get(&location) {
            Some(content) => Ok(Source {
                location,
                content: content.clone(),
            }),
            None => Err(ResolveError::NotFound { location }),
        }
    }
}

/// Collapses `.` and `..` segments of a `/`-separated location.
fn normalize_dots(location: &str) -> String {
    let mut parts: Vec<&str> = Vec::new();
    for part in location.split('/') {
        match part {
            "." => {}
            ".." if parts.last().is_some_and(|last| *last != ".." && !last.is_empty()) => {
                parts.pop();
            }
            _ => parts.push(part),
        }
    }
    parts.join("/")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_folder() {
        assert_eq!(folder("a/b/c.xsd"), "a/b/");
        assert_eq!(folder("c:\\x\\y.xsd"), "c:\\x\\");
        assert_eq!(folder("c.xsd"), "");
    }

    #[test]
    fn test_memory_resolver_relative() {
        let resolver = MemoryResolver::new()
            .with("xsd/main.xsd", "<a/>")
            .with("xsd/types/t.xsd", "<b/>");
        let source = resolver
            .resolve(Some("xsd/main.xsd"), "types/t.xsd")
            .expect("resolve");
        assert_eq!(source.location, "xsd/types/t.xsd");
        let back = resolver
            .resolve(Some("xsd/types/t.xsd"), "../main.xsd")
            .expect("resolve");
        assert_eq!(back.location, "xsd/main.xsd");
    }

    #[test]
    fn test_memory_resolver_missing() {
        let resolver = MemoryResolver::new();
        assert_eq!(
            resolver.resolve(None, "nope.xsd"),
            Err(ResolveError::NotFound {
                location: "nope.xsd".to_string()
            })
        );
    }
}

use thiserror::Error;

/// Failure to locate or read a source file.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    #[error("resource not found: {location}")]
    NotFound { location: String },
    #[error("failed to read {location}: {message}")]
    Io { location: String, message: String },
}

/// Fatal schema errors.
///
/// Loading is permissive about forward references; the `Undefined*` variants
/// are raised by consumers when an unresolved target is actually used.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    #[error(transparent)]
    Resolve(#[from] ResolveError),
    #[error("XML syntax error in {location}: {message}")]
    Xml { location: String, message: String },
    #[error("{location} is too large ({size} bytes)")]
    TooLarge { location: String, size: usize },
    #[error("root element of {location} is not xsd:schema")]
    NotASchema { location: String },
    #[error("no top-level xsd:element found in {location}")]
    NoRootElement { location: String },
    #[error("root element '{name}' was not found in the schema")]
    RootNotFound { name: String },
    #[error("type '{name}' is referred to but was not found")]
    UndefinedType { name: String },
    #[error("element '{name}' is referred to but was not found")]
    UndefinedElement { name: String },
    #[error("base type '{name}' is extended but was not found")]
    UndefinedBase { name: String },
}

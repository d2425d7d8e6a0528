//! Loading and indexing of XSD schemas for schema-driven tree editing.
//!
//! [`SchemaLoader`] reads a schema and everything it includes into a
//! [`SchemaIndex`]: an arena of schema nodes plus lookup tables for named
//! types, elements by structural path, identity constraints and
//! documentation. The index is immutable once built and is shared by every
//! tree that is edited against it.
//!
//! ```
//! use xsdtree_schema::SchemaIndex;
//!
//! let xsd = r#"<xsd:schema xmlns:xsd="http://www.w3.org/2001/XMLSchema">
//!   <xsd:element name="Root">
//!     <xsd:complexType>
//!       <xsd:sequence><xsd:element name="Child" type="xsd:string"/></xsd:sequence>
//!     </xsd:complexType>
//!   </xsd:element>
//! </xsd:schema>"#;
//! let index: SchemaIndex = xsd.parse().unwrap();
//! assert!(index.element("Root.Child").is_some());
//! ```

pub mod diagnostics;
pub mod error;
pub mod index;
pub mod loader;
pub mod node;
pub mod parse;
pub mod path;
pub mod resolve;
pub mod restriction;

pub use diagnostics::SchemaDiagnostic;
pub use error::{ResolveError, SchemaError};
pub use index::{ConstraintCategory, ConstraintDef, SchemaIndex};
pub use loader::SchemaLoader;
pub use node::{Facet, NodeKind, SchemaNode, SchemaNodeId, SchemaNodes, SchemaRef};
pub use resolve::{FileResolver, MemoryResolver, Source, SourceResolver};
pub use restriction::{Restrictions, is_expression};

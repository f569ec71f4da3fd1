//! Shared data types for compiled listings: parsed assembly lines, their
//! source locations, and the document identities that tie a source file to
//! its virtual assembly view.

/// Parsed listing lines and source locations.
pub mod listing;
/// Source and assembly document identities.
pub mod uri;

pub use listing::{ParsedLine, SourceLocation};
pub use uri::{
	ASSEMBLY_EXTENSION, ASSEMBLY_SCHEME, UriError, assembly_uri, is_assembly_uri, normalize_path,
	source_of_assembly, source_uri,
};
pub use url::Url;

//! Document identities.
//!
//! A source file is identified by its normalized `file:` URI. The assembly
//! view of a source is a virtual document whose URI is derived from the
//! source URI: same path with an `.asm` extension, `assembly` scheme, and the
//! full source URI carried in the query so the mapping can be reversed.

use std::path::{Component, Path, PathBuf};

use thiserror::Error;
use url::Url;

/// URI scheme of virtual assembly documents.
pub const ASSEMBLY_SCHEME: &str = "assembly";

/// Extension substituted into the source path of an assembly URI.
pub const ASSEMBLY_EXTENSION: &str = "asm";

const SOURCE_QUERY_KEY: &str = "source";

/// Errors converting between paths and document identities.
#[derive(Debug, Error)]
pub enum UriError {
	/// Source paths must be absolute to form a `file:` URI.
	#[error("source path is not absolute: {0}")]
	RelativePath(PathBuf),
	/// The derived assembly URI could not be parsed.
	#[error("cannot derive assembly URI for {source_uri}: {error}")]
	Assembly {
		source_uri: Url,
		error: url::ParseError,
	},
}

/// Lexically normalizes a path, removing `.` and resolving `..` components.
///
/// Does not touch the filesystem, so symlinks are not resolved.
pub fn normalize_path(path: &Path) -> PathBuf {
	let mut out = PathBuf::new();
	for component in path.components() {
		match component {
			Component::CurDir => {}
			Component::ParentDir => {
				if matches!(out.components().next_back(), Some(Component::Normal(_))) {
					out.pop();
				} else if !out.has_root() {
					out.push(component);
				}
			}
			other => out.push(other),
		}
	}
	out
}

/// Converts an absolute source path into its normalized `file:` URI.
pub fn source_uri(path: &Path) -> Result<Url, UriError> {
	let normalized = normalize_path(path);
	Url::from_file_path(&normalized).map_err(|()| UriError::RelativePath(path.to_path_buf()))
}

/// Derives the virtual assembly URI for a source document.
pub fn assembly_uri(source: &Url) -> Result<Url, UriError> {
	let path = replace_extension(source.path(), ASSEMBLY_EXTENSION);
	let mut uri = Url::parse(&format!("{ASSEMBLY_SCHEME}:{path}")).map_err(|error| UriError::Assembly {
		source_uri: source.clone(),
		error,
	})?;
	uri.query_pairs_mut().append_pair(SOURCE_QUERY_KEY, source.as_str());
	Ok(uri)
}

/// Recovers the source URI embedded in an assembly URI.
///
/// Returns `None` for URIs that are not assembly documents.
pub fn source_of_assembly(assembly: &Url) -> Option<Url> {
	if !is_assembly_uri(assembly) {
		return None;
	}
	let (_, source) = assembly.query_pairs().find(|(key, _)| key == SOURCE_QUERY_KEY)?;
	Url::parse(&source).ok()
}

pub fn is_assembly_uri(uri: &Url) -> bool {
	uri.scheme() == ASSEMBLY_SCHEME
}

fn replace_extension(path: &str, extension: &str) -> String {
	let name_start = path.rfind('/').map_or(0, |i| i + 1);
	let stem_end = match path[name_start..].rfind('.') {
		Some(dot) if dot > 0 => name_start + dot,
		_ => path.len(),
	};
	format!("{}.{extension}", &path[..stem_end])
}

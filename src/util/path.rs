use std::path::{Component, Path, MAIN_SEPARATOR};

/// Canonicalizes a root-relative path for comparison.
///
/// The platform separator becomes '/', and leading slashes, empty segments
/// and "." segments are dropped. A backslash is only a separator where the
/// platform says so; on Unix it is an ordinary filename character.
/// ".." is kept as-is; the walker never produces it.
pub fn normalize_path(path: &str) -> String {
    let mut out = String::with_capacity(path.len());
    for segment in path.split(['/', MAIN_SEPARATOR]) {
        if segment.is_empty() || segment == "." {
            continue;
        }
        if !out.is_empty() {
            out.push('/');
        }
        out.push_str(segment);
    }
    out
}

/// Joins the components of a root-relative path with '/'
pub fn relative_path_string(rel: &Path) -> String {
    let parts: Vec<_> = rel
        .components()
        .filter_map(|c| match c {
            Component::Normal(name) => Some(name.to_string_lossy()),
            _ => None,
        })
        .collect();
    parts.join("/")
}

/// Guesses a MIME type from the file extension.
///
/// Returns None for files whose type is not recognizable.
pub fn guess_mime(path: &Path) -> Option<String> {
    mime_guess::from_path(path)
        .first()
        .map(|m| m.essence_str().to_string())
}

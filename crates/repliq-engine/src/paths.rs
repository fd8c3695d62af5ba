//! Directory path normalisation.
//!
//! Relationship roots are always absolute and end in `/`. Clusters are not
//! consistent about the trailing separator, so every path that crosses the
//! engine boundary goes through [`dir_path`] before comparison.

/// Normalise a directory path to the canonical `/a/b/` shape.
pub fn dir_path(path: &str) -> String {
    let trimmed = path.trim_matches('/');
    if trimmed.is_empty() {
        "/".to_string()
    } else {
        format!("/{}/", trimmed)
    }
}

/// Path of the immediate child `name` of `base`.
pub fn child_path(base: &str, name: &str) -> String {
    let base = dir_path(base);
    let name = name.trim_matches('/');
    if name.is_empty() {
        return base;
    }
    format!("{}{}/", base, name)
}

/// Last segment of a directory path, without separators.
pub fn leaf_name(path: &str) -> &str {
    path.trim_end_matches('/').rsplit('/').next().unwrap_or("")
}

/// True when `path` is `base` itself or lies anywhere beneath it.
pub fn is_under(path: &str, base: &str) -> bool {
    dir_path(path).starts_with(&dir_path(base))
}

/// Name of the immediate child of `base` that contains `path`.
///
/// Returns `None` when `path` is not strictly below `base`.
pub fn child_of<'a>(path: &'a str, base: &str) -> Option<&'a str> {
    let base = dir_path(base);
    let rest = path.trim_start_matches('/');
    let base_rest = base.trim_start_matches('/');
    let below = rest.strip_prefix(base_rest)?;
    below.split('/').find(|segment| !segment.is_empty())
}

/// Destination path for a source directory given an optional prefix.
///
/// An empty or root prefix mirrors the source path.
pub fn target_path(prefix: Option<&str>, source_path: &str) -> String {
    let source = dir_path(source_path);
    match prefix.map(|p| p.trim_matches('/')) {
        Some(p) if !p.is_empty() => format!("/{}{}", p, source),
        _ => source,
    }
}

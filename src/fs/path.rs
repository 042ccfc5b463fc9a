//! helpers for slash separated volume paths
use super::{CURRENT_NAME, PARENT_NAME, SEPARATOR};

/// split `path` at its final separator into (directory, leaf),
/// no separator gives an empty directory and a leading one gives `/`
pub fn split(path: &str) -> (&str, &str) {
    match path.rfind(SEPARATOR) {
        None => ("", path),
        Some(0) => ("/", &path[1..]),
        Some(idx) => (&path[..idx], &path[idx + 1..]),
    }
}

pub fn is_absolute(path: &str) -> bool {
    path.starts_with(SEPARATOR)
}

/// non-empty components of `path`
pub fn tokens(path: &str) -> impl Iterator<Item = &str> {
    path.split(SEPARATOR).filter(|t| !t.is_empty())
}

/// textual form of `rel` seen from the absolute path `base`
pub fn normalize(base: &str, rel: &str) -> String {
    let mut parts: Vec<&str> = if is_absolute(rel) {
        Vec::new()
    } else {
        tokens(base).collect()
    };
    for token in tokens(rel) {
        match token {
            CURRENT_NAME => {}
            PARENT_NAME => {
                parts.pop();
            }
            name => parts.push(name),
        }
    }
    format!("/{}", parts.join("/"))
}

use std::ffi::OsString;
use std::path::{Component, Path, PathBuf};

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{ResolveError, ResolveResult};
use crate::source::SourceLoader;

static IMPORT_STATEMENT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"\bimport\s+(?:type\s+)?([^;'"]+?)\s*\bfrom\s*['"]([^'"]+)['"]"#).unwrap()
});

/// Where an imported name comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportRef {
    /// Module specifier exactly as written, e.g. `./subfolder/ImportInput`.
    pub specifier: String,
    /// Name to look up in the imported module. Differs from the local name
    /// for `import { Original as Local }`.
    pub exported: String,
}

/// Find the import statement that brings `name` into scope, if any.
/// Statements may span several lines.
pub fn find_import(text: &str, name: &str) -> Option<ImportRef> {
    IMPORT_STATEMENT.captures_iter(text).find_map(|caps| {
        let clause = caps.get(1)?.as_str();
        let specifier = caps.get(2)?.as_str();
        imported_name(clause, name).map(|exported| ImportRef {
            specifier: specifier.to_string(),
            exported,
        })
    })
}

/// Match `name` against one import clause: `Default`, `{ A, B as C }`,
/// `Default, { A }` or `* as NS` (namespaces never bind a bare type name).
fn imported_name(clause: &str, name: &str) -> Option<String> {
    let (default_part, named_part) = match (clause.find('{'), clause.rfind('}')) {
        (Some(open), Some(close)) if open < close => (&clause[..open], Some(&clause[open + 1..close])),
        _ => (clause, None),
    };
    let default_name = default_part.trim().trim_end_matches(',').trim();
    if default_name == name {
        return Some(name.to_string());
    }
    for item in named_part.into_iter().flat_map(|s| s.split(',')) {
        let item = item.trim();
        let item = item.strip_prefix("type ").map(str::trim).unwrap_or(item);
        let mut parts = item.split_whitespace();
        match (parts.next(), parts.next(), parts.next()) {
            (Some(original), None, None) if original == name => return Some(name.to_string()),
            (Some(original), Some("as"), Some(local)) if local == name => return Some(original.to_string()),
            _ => {}
        }
    }
    None
}

/// Resolve an import specifier relative to the importing file, probing the
/// bare path first and then each extension in order.
pub fn resolve_module_path(
    loader: &dyn SourceLoader,
    importer: &Path,
    specifier: &str,
    extensions: &[String],
) -> ResolveResult<PathBuf> {
    let dir = importer.parent().unwrap_or_else(|| Path::new(""));
    let base = normalize_path(&dir.join(specifier));
    if loader.is_file(&base) {
        return Ok(base);
    }
    for ext in extensions {
        let mut candidate = OsString::from(base.as_os_str());
        candidate.push(ext);
        let candidate = PathBuf::from(candidate);
        if loader.is_file(&candidate) {
            return Ok(candidate);
        }
    }
    Err(ResolveError::FileNotFound { path: base })
}

/// Lexically fold `.` and `..` components.
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

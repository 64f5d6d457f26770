//! Lexical extraction of declarations and imports out of raw file text.
//!
//! None of this is a parser for the host language. Each routine locates one
//! declaration header with a regex and then walks forward with bracket
//! counting until the declaration ends:
//! - `alias`: `type Name = <expr>`, driven by an explicit state machine so a
//!   body may continue across lines through `&`/`|` operators.
//! - `record`: `interface Name (extends Parent)? { ... }`, brace matched.
//! - `import`: which module a bare name was imported from, and where that
//!   module lives on disk.
pub mod alias;
pub mod import;
pub mod record;

use regex::Regex;
use thiserror::Error;

pub use alias::{extract_alias, step, ScanState, Transition};
pub use import::{find_import, resolve_module_path, ImportRef};
pub use record::extract_record;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScanError {
    #[error("declaration runs to end of file without terminating")]
    Unterminated,
    #[error("mismatched braces")]
    Unbalanced,
}

/// Build a header regex around an escaped declaration name.
///
/// `template` contains a single `{name}` placeholder.
fn header_regex(template: &str, name: &str) -> Regex {
    let pattern = template.replace("{name}", &regex::escape(name));
    // the escaped name cannot break an otherwise valid pattern
    Regex::new(&pattern).unwrap()
}

//! Construction-time failures. These mean the declarations themselves could
//! not be turned into a validator; a value that does not conform is reported
//! through [`crate::ValidateResult`] instead.
use std::path::PathBuf;

use thiserror::Error;

pub type ResolveResult<T> = Result<T, ResolveError>;

#[derive(Error, Debug)]
pub enum ResolveError {
    #[error("type `{name}` is referenced without a file to resolve it from")]
    MissingFileHint { name: String },

    #[error("file not found: {}", path.display())]
    FileNotFound { path: PathBuf },

    #[error("cannot read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot find a declaration of `{name}` in {}", file.display())]
    DeclarationNotFound { name: String, file: PathBuf },

    #[error("mismatched braces while parsing {context}")]
    UnbalancedBraces { context: String },

    #[error("declaration of `{name}` in {} is not terminated", file.display())]
    UnterminatedDeclaration { name: String, file: PathBuf },

    #[error("empty operand in logic expression `{expr}`")]
    EmptyOperand { expr: String },

    #[error("cannot mix `&` and `|` at the same level after precedence merge: `{expr}`")]
    MixedLogic { expr: String },

    #[error("unrecognized field declaration `{def}` in {file}")]
    InvalidField { def: String, file: String },

    #[error("invalid type expression `{expr}`")]
    InvalidExpression { expr: String },

    #[error("`{child}` extends `{parent}`, which is not an interface")]
    ParentNotRecord { parent: String, child: String },

    #[error("`Partial<{name}>` requires an interface or object type")]
    PartialTarget { name: String },

    #[error("`{name}` refers to itself without an enclosing object or array")]
    RecursiveAlias { name: String },
}

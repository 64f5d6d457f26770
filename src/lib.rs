//! Runtime validation of JSON values against TypeScript-style `interface`
//! and `type` declarations.
//!
//! ```no_run
//! use tsguard::Manager;
//! use serde_json::json;
//!
//! let mut manager = Manager::new();
//! let validator = manager.resolve_named("ReqDemo", "protocol/Demo.ts")?;
//! let result = validator.validate(&json!({ "url": "/demo", "value": 1 }));
//! if result.is_error() {
//!     eprintln!("{result}");
//! }
//! # Ok::<(), tsguard::ResolveError>(())
//! ```
pub mod cli;
pub mod config;
pub mod error;
pub mod jq_exec;
pub mod manager;
pub mod result;
pub mod scan;
pub mod source;
pub mod text;
pub mod validator;

pub use config::{Config, ConfigError};
pub use error::{ResolveError, ResolveResult};
pub use manager::{CacheKey, Manager, ManagerOptions};
pub use result::{ErrorCode, ValidateResult};
pub use source::{DiskSource, MemorySource, SourceLoader};
pub use validator::Validator;

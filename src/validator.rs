//! The compiled validator tree.
//!
//! A [`Validator`] is built once by the [`crate::Manager`] and is immutable
//! afterwards; `validate` is a pure recursive walk over it and may run from
//! any number of threads at once.
pub mod array;
pub mod basic;
pub mod logic;
pub mod record;

use std::fmt;
use std::sync::{Arc, OnceLock};

use indexmap::IndexSet;
use serde_json::Value;

use crate::result::ValidateResult;

pub use array::ArrayValidator;
pub use basic::BasicValidator;
pub use logic::{Condition, LogicToken, LogicValidator};
pub use record::{FieldValidator, RecordValidator};

/// Declared field names of a record, in declaration order.
pub type FieldSet = IndexSet<String>;

// ------------------------------ Sum type ---------------------------------- //

#[derive(Debug, Clone)]
pub enum Validator {
    Basic(BasicValidator),
    Array(Arc<ArrayValidator>),
    Logic(Arc<LogicValidator>),
    Record(Arc<RecordValidator>),
    /// Stand-in for a recursive reference whose declaration was still being
    /// built when it was referenced.
    Deferred(DeferredValidator),
}

impl Validator {
    pub fn validate(&self, value: &Value) -> ValidateResult {
        self.validate_optional(Some(value))
    }

    /// `None` is the absent value: a missing key, or `undefined`.
    pub fn validate_optional(&self, value: Option<&Value>) -> ValidateResult {
        self.validate_scoped(value, None)
    }

    pub(crate) fn validate_scoped(&self, value: Option<&Value>, scope: Option<&FieldScope<'_>>) -> ValidateResult {
        match self {
            Validator::Basic(v) => v.validate(value),
            Validator::Array(v) => v.validate(value),
            Validator::Logic(v) => v.validate_scoped(value, scope),
            Validator::Record(v) => v.validate_scoped(value, scope),
            Validator::Deferred(v) => v.validate_scoped(value, scope),
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            Validator::Basic(_) => "basic",
            Validator::Array(_) => "array",
            Validator::Logic(_) => "logic",
            Validator::Record(_) => "record",
            Validator::Deferred(_) => "deferred",
        }
    }

    pub fn as_record(&self) -> Option<&Arc<RecordValidator>> {
        match self {
            Validator::Record(r) => Some(r),
            _ => None,
        }
    }

    pub fn as_logic(&self) -> Option<&Arc<LogicValidator>> {
        match self {
            Validator::Logic(l) => Some(l),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&Arc<ArrayValidator>> {
        match self {
            Validator::Array(a) => Some(a),
            _ => None,
        }
    }

    pub fn as_basic(&self) -> Option<&BasicValidator> {
        match self {
            Validator::Basic(b) => Some(b),
            _ => None,
        }
    }

    pub(crate) fn is_undefined(&self) -> bool {
        matches!(self, Validator::Basic(BasicValidator::Undefined))
    }

    /// Same underlying node. Basic validators are plain values and compare
    /// by kind.
    pub fn ptr_eq(&self, other: &Validator) -> bool {
        match (self, other) {
            (Validator::Basic(a), Validator::Basic(b)) => a == b,
            (Validator::Array(a), Validator::Array(b)) => Arc::ptr_eq(a, b),
            (Validator::Logic(a), Validator::Logic(b)) => Arc::ptr_eq(a, b),
            (Validator::Record(a), Validator::Record(b)) => Arc::ptr_eq(a, b),
            (Validator::Deferred(a), Validator::Deferred(b)) => Arc::ptr_eq(&a.cell, &b.cell),
            _ => false,
        }
    }
}

impl From<BasicValidator> for Validator {
    fn from(value: BasicValidator) -> Self {
        Validator::Basic(value)
    }
}

impl fmt::Display for Validator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Validator::Basic(v) => write!(f, "{v}"),
            Validator::Array(v) => write!(f, "{v}"),
            Validator::Logic(v) => write!(f, "{v}"),
            Validator::Record(v) => write!(f, "{v}"),
            Validator::Deferred(v) => f.write_str(&v.name),
        }
    }
}

// ------------------------------ Field scope -------------------------------- //

/// Extra field names a record must accept because they are declared by a
/// sibling in the same `&`/`|` group, or by a child record validating
/// through its parent. Scopes chain outward without copying.
#[derive(Debug, Clone, Copy)]
pub struct FieldScope<'a> {
    names: &'a FieldSet,
    outer: Option<&'a FieldScope<'a>>,
}

impl<'a> FieldScope<'a> {
    pub fn new(names: &'a FieldSet, outer: Option<&'a FieldScope<'a>>) -> Self {
        Self { names, outer }
    }

    pub fn contains(&self, key: &str) -> bool {
        self.names.contains(key) || self.outer.is_some_and(|o| o.contains(key))
    }
}

// ------------------------------- Deferred --------------------------------- //

/// Shares the slot of a declaration under construction; the manager fills it
/// once that declaration finishes building.
#[derive(Clone)]
pub struct DeferredValidator {
    name: String,
    cell: Arc<OnceLock<Validator>>,
}

impl DeferredValidator {
    pub(crate) fn new(name: impl Into<String>, cell: Arc<OnceLock<Validator>>) -> Self {
        Self { name: name.into(), cell }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn target(&self) -> Option<&Validator> {
        self.cell.get()
    }

    pub(crate) fn shares_cell(&self, cell: &Arc<OnceLock<Validator>>) -> bool {
        Arc::ptr_eq(&self.cell, cell)
    }

    fn validate_scoped(&self, value: Option<&Value>, scope: Option<&FieldScope<'_>>) -> ValidateResult {
        match self.cell.get() {
            Some(target) => target.validate_scoped(value, scope),
            // only reachable through a validator whose build failed, and the
            // manager never hands those out
            None => ValidateResult::new(crate::result::ErrorCode::LogicFalse),
        }
    }
}

// the target usually contains this very node
impl fmt::Debug for DeferredValidator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeferredValidator")
            .field("name", &self.name)
            .field("resolved", &self.cell.get().is_some())
            .finish()
    }
}

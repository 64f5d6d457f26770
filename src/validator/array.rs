use std::fmt;
use std::path::Path;

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

use super::Validator;
use crate::error::ResolveResult;
use crate::manager::Manager;
use crate::result::{ErrorCode, ValidateResult};

static SUFFIX_FORM: Lazy<Regex> = Lazy::new(|| Regex::new(r"^([\s\S]*)\[\]$").unwrap());
static GENERIC_FORM: Lazy<Regex> = Lazy::new(|| Regex::new(r"^Array\s*<([\s\S]*)>$").unwrap());

/// Element type of `X[]` or `Array<X>`, if `def` has either shape.
pub fn element_type(def: &str) -> Option<&str> {
    SUFFIX_FORM
        .captures(def)
        .or_else(|| GENERIC_FORM.captures(def))
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim())
        .filter(|s| !s.is_empty())
}

#[derive(Debug, Clone)]
pub struct ArrayValidator {
    element: Validator,
}

impl ArrayValidator {
    pub(crate) fn build(element_def: &str, manager: &mut Manager, file: Option<&Path>) -> ResolveResult<Self> {
        let element = manager.resolve_nested(element_def, file)?;
        Ok(Self { element })
    }

    pub fn new(element: Validator) -> Self {
        Self { element }
    }

    pub fn element(&self) -> &Validator {
        &self.element
    }

    /// First failing element, by index.
    pub fn validate(&self, value: Option<&Value>) -> ValidateResult {
        let Some(Value::Array(items)) = value else {
            return ValidateResult::new(ErrorCode::NotArray);
        };
        for (i, item) in items.iter().enumerate() {
            let result = self.element.validate(item);
            if result.is_error() {
                return ValidateResult::nested(ErrorCode::ArrayNotMatch, i.to_string(), result);
            }
        }
        ValidateResult::success()
    }
}

impl fmt::Display for ArrayValidator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.element {
            Validator::Logic(_) => write!(f, "({})[]", self.element),
            other => write!(f, "{other}[]"),
        }
    }
}

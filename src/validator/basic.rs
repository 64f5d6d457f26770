use std::fmt;

use serde_json::Value;

use crate::result::{ErrorCode, ValidateResult};
use crate::text::{is_string_literal, literal_text};

/// Leaf check for a primitive kind or a string literal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BasicValidator {
    Number,
    String,
    Boolean,
    /// Any object or array, never null.
    Object,
    Any,
    Null,
    Undefined,
    Literal(String),
}

impl BasicValidator {
    pub fn parse(def: &str) -> Option<Self> {
        let basic = match def {
            "number" => Self::Number,
            "string" => Self::String,
            "boolean" => Self::Boolean,
            "object" | "Object" => Self::Object,
            "any" => Self::Any,
            "null" => Self::Null,
            "undefined" => Self::Undefined,
            _ if is_string_literal(def) => Self::Literal(literal_text(def).to_string()),
            _ => return None,
        };
        Some(basic)
    }

    pub fn is_literal(&self) -> bool {
        matches!(self, Self::Literal(_))
    }

    pub fn validate(&self, value: Option<&Value>) -> ValidateResult {
        let ok = match self {
            Self::Any => return ValidateResult::success(),
            Self::Number => matches!(value, Some(Value::Number(_))),
            Self::String => matches!(value, Some(Value::String(_))),
            Self::Boolean => matches!(value, Some(Value::Bool(_))),
            Self::Object => matches!(value, Some(Value::Object(_) | Value::Array(_))),
            Self::Null => matches!(value, Some(Value::Null)),
            Self::Undefined => value.is_none(),
            Self::Literal(expected) => {
                return match value {
                    Some(Value::String(s)) if s == expected => ValidateResult::success(),
                    Some(Value::String(_)) => ValidateResult::new(ErrorCode::InvalidStrLiteral),
                    _ => ValidateResult::new(ErrorCode::NotString),
                };
            }
        };
        if ok { ValidateResult::success() } else { ValidateResult::new(self.failure_code()) }
    }

    fn failure_code(&self) -> ErrorCode {
        match self {
            Self::Number => ErrorCode::NotNumber,
            Self::String => ErrorCode::NotString,
            Self::Boolean => ErrorCode::NotBoolean,
            Self::Object => ErrorCode::NotObject,
            Self::Null => ErrorCode::NotNull,
            Self::Undefined => ErrorCode::NotUndefined,
            Self::Literal(_) => ErrorCode::InvalidStrLiteral,
            Self::Any => ErrorCode::Success,
        }
    }
}

impl fmt::Display for BasicValidator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number => f.write_str("number"),
            Self::String => f.write_str("string"),
            Self::Boolean => f.write_str("boolean"),
            Self::Object => f.write_str("object"),
            Self::Any => f.write_str("any"),
            Self::Null => f.write_str("null"),
            Self::Undefined => f.write_str("undefined"),
            Self::Literal(s) if s.contains('\'') => write!(f, "\"{s}\""),
            Self::Literal(s) => write!(f, "'{s}'"),
        }
    }
}

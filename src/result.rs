//! Validation outcomes: a closed error-code taxonomy and a chainable result
//! whose nested causes record where in the value a mismatch happened.
use std::fmt;

use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ErrorCode {
    Success = 0,
    NullOnRequired,
    LogicFalse,
    NotArray,
    NotNumber,
    NotString,
    NotBoolean,
    NotObject,
    NotNull,
    NotUndefined,
    InvalidStrLiteral,
    ArrayNotMatch,
    InterfaceNotMatch,
    FieldNotAllowed,
}

impl ErrorCode {
    pub fn code(self) -> u8 {
        self as u8
    }

    pub fn message(self) -> &'static str {
        match self {
            Self::Success => "Success",
            Self::NullOnRequired => "Required field cannot be null",
            Self::LogicFalse => "Logic conditions are not satisfied",
            Self::NotArray => "Field must be Array",
            Self::NotNumber => "Field must be number",
            Self::NotString => "Field must be string",
            Self::NotBoolean => "Field must be boolean",
            Self::NotObject => "Field must be object",
            Self::NotNull => "Field must be null",
            Self::NotUndefined => "Field must be undefined",
            Self::InvalidStrLiteral => "Invalid string literal value",
            Self::ArrayNotMatch => "Array elements not match",
            Self::InterfaceNotMatch => "Interface not match",
            Self::FieldNotAllowed => "Disallowed field",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

/// Outcome of `validate`. A wrapper result always carries both the field
/// segment and the nested cause; a leaf carries neither.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidateResult {
    code: ErrorCode,
    field: Option<String>,
    inner: Option<Box<ValidateResult>>,
}

impl ValidateResult {
    pub fn success() -> Self {
        Self::new(ErrorCode::Success)
    }

    pub fn new(code: ErrorCode) -> Self {
        Self { code, field: None, inner: None }
    }

    /// Wrap `inner` as the cause of `code`, occurring at `field`.
    pub fn nested(code: ErrorCode, field: impl Into<String>, inner: ValidateResult) -> Self {
        Self {
            code,
            field: Some(field.into()),
            inner: Some(Box::new(inner)),
        }
    }

    pub fn code(&self) -> ErrorCode {
        self.code
    }

    pub fn field_name(&self) -> Option<&str> {
        self.field.as_deref()
    }

    pub fn inner(&self) -> Option<&ValidateResult> {
        self.inner.as_deref()
    }

    pub fn is_success(&self) -> bool {
        self.code == ErrorCode::Success
    }

    pub fn is_error(&self) -> bool {
        !self.is_success()
    }

    pub fn message(&self) -> &'static str {
        self.code.message()
    }

    /// The innermost cause, with every field segment on the way joined by
    /// `.`. The returned result never has a nested cause; its field is the
    /// joined path (empty for a root-level failure).
    pub fn original_error(&self) -> ValidateResult {
        let mut segments: Vec<&str> = Vec::new();
        let mut current = self;
        while let (Some(field), Some(inner)) = (current.field.as_deref(), current.inner.as_deref()) {
            segments.push(field);
            current = inner;
        }
        ValidateResult {
            code: current.code,
            field: Some(segments.join(".")),
            inner: None,
        }
    }

    /// Dotted path to the innermost failure; empty when the root failed.
    pub fn path(&self) -> String {
        self.original_error().field.unwrap_or_default()
    }
}

impl Default for ValidateResult {
    fn default() -> Self {
        Self::success()
    }
}

impl fmt::Display for ValidateResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let flat = self.original_error();
        match flat.field.as_deref() {
            Some(path) if !path.is_empty() => write!(f, "{path}: {}", flat.code),
            _ => write!(f, "{}", flat.code),
        }
    }
}

impl Serialize for ValidateResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut st = serializer.serialize_struct("ValidateResult", 4)?;
        st.serialize_field("code", &self.code.code())?;
        st.serialize_field("message", self.code.message())?;
        st.serialize_field("field", &self.field)?;
        st.serialize_field("inner", &self.inner)?;
        st.end()
    }
}

// ------------------------------- Tests ------------------------------------ //

#[cfg(test)]
mod tests {
    use super::*;

    fn nested_sample() -> ValidateResult {
        ValidateResult::nested(
            ErrorCode::InterfaceNotMatch,
            "a",
            ValidateResult::nested(
                ErrorCode::InterfaceNotMatch,
                "b",
                ValidateResult::nested(
                    ErrorCode::InterfaceNotMatch,
                    "c",
                    ValidateResult::new(ErrorCode::NotNumber),
                ),
            ),
        )
    }

    #[test]
    fn codes_are_stable() {
        assert_eq!(ErrorCode::Success.code(), 0);
        assert_eq!(ErrorCode::NullOnRequired.code(), 1);
        assert_eq!(ErrorCode::InvalidStrLiteral.code(), 10);
        assert_eq!(ErrorCode::FieldNotAllowed.code(), 13);
    }

    #[test]
    fn original_error_joins_path() {
        let result = nested_sample();
        assert!(result.is_error());
        assert_eq!(result.code(), ErrorCode::InterfaceNotMatch);
        let flat = result.original_error();
        assert_eq!(flat.code(), ErrorCode::NotNumber);
        assert_eq!(flat.field_name(), Some("a.b.c"));
        assert!(flat.inner().is_none());
        assert_eq!(result.to_string(), "a.b.c: Field must be number");
    }

    #[test]
    fn leaf_result_has_empty_path() {
        let result = ValidateResult::new(ErrorCode::NotArray);
        assert_eq!(result.path(), "");
        assert_eq!(result.field_name(), None);
        assert_eq!(result.to_string(), "Field must be Array");
        assert!(ValidateResult::success().is_success());
    }

    #[test]
    fn serializes_nested_chain() {
        let json = serde_json::to_value(nested_sample()).unwrap();
        assert_eq!(json["code"], 12);
        assert_eq!(json["field"], "a");
        assert_eq!(json["inner"]["inner"]["inner"]["message"], "Field must be number");
        assert!(json["inner"]["inner"]["inner"]["inner"].is_null());
    }
}

//! Object shapes: `interface Name extends Parent { ... }` declarations and
//! inline `{ ... }` literals.
use std::fmt;
use std::path::Path;
use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

use super::{FieldScope, FieldSet, Validator};
use crate::error::{ResolveError, ResolveResult};
use crate::manager::Manager;
use crate::result::{ErrorCode, ValidateResult};
use crate::text::{is_string_literal, literal_text};

static RECORD_SHAPE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:interface\s+([\w$]+)\s*(?:extends\s+([\w$.]+)\s*)?)?\{([\s\S]*)\}$").unwrap()
});
static FIELD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"^(?:readonly\s+)?([A-Za-z_$][\w$]*|'[^']*'|"[^"]*")\s*(\?)?\s*:\s*([\s\S]+)$"#).unwrap()
});
static INDEX_SIGNATURE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:readonly\s+)?\[\s*[\w$]+\s*:[^\]]+\]\s*\??\s*:\s*([\s\S]+)$").unwrap()
});

pub fn is_record_def(def: &str) -> bool {
    RECORD_SHAPE.is_match(def)
}

// ------------------------------ Field split ------------------------------- //

/// Split a record body into raw member definitions at top-level `;`, `,` and
/// line breaks. A line break does not end a member whose type continues on
/// the next line (`a:` or a trailing/leading `|`/`&`).
pub fn split_members(body: &str) -> Vec<String> {
    let mut members = Vec::new();
    let mut depth = 0i32;
    let mut quote: Option<char> = None;
    let mut start = 0;
    for (offset, c) in body.char_indices() {
        if let Some(q) = quote {
            if c == q {
                quote = None;
            }
            continue;
        }
        let split = match c {
            '\'' | '"' => {
                quote = Some(c);
                false
            }
            '(' | '{' | '<' | '[' => {
                depth += 1;
                false
            }
            ')' | '}' | '>' | ']' => {
                depth -= 1;
                false
            }
            ';' | ',' => depth == 0,
            '\n' => depth == 0 && !continues_on_next_line(&body[start..offset], &body[offset..]),
            _ => false,
        };
        if split {
            push_member(&mut members, &body[start..offset]);
            start = offset + 1;
        }
    }
    push_member(&mut members, &body[start..]);
    members
}

fn continues_on_next_line(before: &str, after: &str) -> bool {
    let before = before.trim_end();
    let after = after.trim_start();
    before.ends_with([':', '|', '&']) || after.starts_with(['|', '&'])
}

fn push_member(members: &mut Vec<String>, raw: &str) {
    let raw = raw.trim();
    if !raw.is_empty() {
        members.push(raw.to_string());
    }
}

// ------------------------------- Fields ----------------------------------- //

#[derive(Debug, Clone)]
pub struct FieldValidator {
    name: String,
    required: bool,
    strict_null_checks: bool,
    validator: Validator,
}

impl FieldValidator {
    /// A bare `undefined` type, or a union with an `undefined` operand, makes
    /// the field optional; the operand itself is dropped from the union.
    pub fn new(name: impl Into<String>, optional: bool, validator: Validator, strict_null_checks: bool) -> Self {
        let stripped = validator.as_logic().filter(|l| l.has_undefined()).map(|l| l.without_undefined());
        let (required, validator) = match stripped {
            Some(stripped) => (false, stripped),
            None if validator.is_undefined() => (false, validator),
            None => (!optional, validator),
        };
        Self { name: name.into(), required, strict_null_checks, validator }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_required(&self) -> bool {
        self.required
    }

    pub fn validator(&self) -> &Validator {
        &self.validator
    }

    pub fn validate(&self, value: Option<&Value>) -> ValidateResult {
        if !self.required {
            match value {
                None => return ValidateResult::success(),
                Some(Value::Null) if !self.strict_null_checks => return ValidateResult::success(),
                _ => {}
            }
        }
        self.validator.validate_optional(value)
    }
}

// ------------------------------ Validator --------------------------------- //

#[derive(Debug, Clone)]
pub struct RecordValidator {
    name: Option<String>,
    fields: Vec<FieldValidator>,
    /// Own field names plus every ancestor's.
    field_names: FieldSet,
    index: Option<Validator>,
    parent: Option<Arc<RecordValidator>>,
}

impl RecordValidator {
    pub(crate) fn build(def: &str, manager: &mut Manager, file: Option<&Path>) -> ResolveResult<Self> {
        let caps = RECORD_SHAPE
            .captures(def)
            .ok_or_else(|| ResolveError::InvalidExpression { expr: def.to_string() })?;
        let name = caps.get(1).map(|m| m.as_str().to_string());
        let parent = match caps.get(2) {
            Some(parent_name) => {
                let parent = manager.resolve_built(parent_name.as_str(), file)?;
                match parent {
                    Validator::Record(record) => Some(record),
                    _ => {
                        return Err(ResolveError::ParentNotRecord {
                            parent: parent_name.as_str().to_string(),
                            child: name.clone().unwrap_or_default(),
                        });
                    }
                }
            }
            None => None,
        };
        let body = caps.get(3).map_or("", |m| m.as_str());
        let strict = manager.strict_null_checks();

        let mut fields = Vec::new();
        let mut index = None;
        for member in split_members(body) {
            if let Some(caps) = INDEX_SIGNATURE.captures(&member) {
                index = Some(manager.resolve_nested(&caps[1], file)?);
                continue;
            }
            let caps = FIELD.captures(&member).ok_or_else(|| ResolveError::InvalidField {
                def: member.clone(),
                file: file.map_or_else(|| "<inline>".to_string(), |f| f.display().to_string()),
            })?;
            let raw_name = &caps[1];
            let field_name = if is_string_literal(raw_name) { literal_text(raw_name) } else { raw_name };
            let field_name = field_name.to_string();
            let validator = manager.resolve_nested(&caps[3], file)?;
            fields.push(FieldValidator::new(field_name, caps.get(2).is_some(), validator, strict));
        }
        Ok(Self::from_parts(name, fields, index, parent))
    }

    pub fn from_parts(
        name: Option<String>,
        fields: Vec<FieldValidator>,
        index: Option<Validator>,
        parent: Option<Arc<RecordValidator>>,
    ) -> Self {
        let mut field_names: FieldSet = fields.iter().map(|f| f.name.clone()).collect();
        if let Some(parent) = &parent {
            field_names.extend(parent.field_names.iter().cloned());
        }
        Self { name, fields, field_names, index, parent }
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn fields(&self) -> &[FieldValidator] {
        &self.fields
    }

    pub fn field_names(&self) -> &FieldSet {
        &self.field_names
    }

    pub fn index_validator(&self) -> Option<&Validator> {
        self.index.as_ref()
    }

    pub fn parent(&self) -> Option<&Arc<RecordValidator>> {
        self.parent.as_ref()
    }

    /// Copy with every own field optional. Field validators are shared and
    /// the parent is left as is.
    pub fn partial(&self) -> Self {
        let mut copy = self.clone();
        for field in &mut copy.fields {
            field.required = false;
        }
        copy
    }

    pub(crate) fn validate_scoped(&self, value: Option<&Value>, scope: Option<&FieldScope<'_>>) -> ValidateResult {
        let Some(Value::Object(object)) = value else {
            return ValidateResult::new(ErrorCode::NotObject);
        };

        if let Some(parent) = &self.parent {
            let own = FieldScope::new(&self.field_names, scope);
            let result = parent.validate_scoped(value, Some(&own));
            if result.is_error() {
                return result;
            }
        }

        for field in &self.fields {
            let result = match object.get(&field.name) {
                None if field.required => ValidateResult::new(ErrorCode::NullOnRequired),
                entry => field.validate(entry),
            };
            if result.is_error() {
                return ValidateResult::nested(ErrorCode::InterfaceNotMatch, field.name.as_str(), result);
            }
        }

        for (key, entry) in object {
            if self.field_names.contains(key) || scope.is_some_and(|s| s.contains(key)) {
                continue;
            }
            let result = match &self.index {
                Some(index) => index.validate(entry),
                None => ValidateResult::new(ErrorCode::FieldNotAllowed),
            };
            if result.is_error() {
                return ValidateResult::nested(ErrorCode::InterfaceNotMatch, key.as_str(), result);
            }
        }
        ValidateResult::success()
    }
}

impl fmt::Display for RecordValidator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(name) = &self.name {
            write!(f, "{name} ")?;
        }
        if let Some(parent) = &self.parent {
            write!(f, "extends {} ", parent.name().unwrap_or("{..}"))?;
        }
        f.write_str("{")?;
        for (i, field) in self.fields.iter().enumerate() {
            let sep = if i == 0 { " " } else { "; " };
            let mark = if field.required { "" } else { "?" };
            write!(f, "{sep}{}{mark}: {}", field.name, field.validator)?;
        }
        if let Some(index) = &self.index {
            let sep = if self.fields.is_empty() { " " } else { "; " };
            write!(f, "{sep}[key: string]: {index}")?;
        }
        if self.fields.is_empty() && self.index.is_none() {
            f.write_str("}")
        } else {
            f.write_str(" }")
        }
    }
}

// ------------------------------- Tests ------------------------------------ //

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validator::{BasicValidator, LogicValidator, Condition};
    use serde_json::json;

    fn field(name: &str, optional: bool, v: BasicValidator) -> FieldValidator {
        FieldValidator::new(name, optional, v.into(), false)
    }

    fn record(fields: Vec<FieldValidator>) -> RecordValidator {
        RecordValidator::from_parts(None, fields, None, None)
    }

    #[test]
    fn member_split() {
        assert_eq!(split_members(" a: string; b: number, c: boolean "), ["a: string", "b: number", "c: boolean"]);
        assert_eq!(split_members("\n a: string\n\n b?: number\n"), ["a: string", "b?: number"]);
        assert_eq!(
            split_members("a: { x: string; y: number }; b: Array<{ c: string, d: string }>"),
            ["a: { x: string; y: number }", "b: Array<{ c: string, d: string }>"]
        );
        assert_eq!(split_members("kind:\n | 'a'\n | 'b'\nnext: string"), ["kind:\n | 'a'\n | 'b'", "next: string"]);
        assert_eq!(split_members("[key: string]: number; 'x-y': string"), ["[key: string]: number", "'x-y': string"]);
        assert!(split_members("  \n ; ").is_empty());
    }

    #[test]
    fn shape_recognition() {
        assert!(is_record_def("{}"));
        assert!(is_record_def("{ a: string }"));
        assert!(is_record_def("interface A extends B { a: string }"));
        assert!(!is_record_def("{ a: string }[]"));
        assert!(!is_record_def("Foo"));
    }

    #[test]
    fn undefined_in_type_makes_field_optional() {
        let bare = field("a", false, BasicValidator::Undefined);
        assert!(!bare.is_required());

        let union = LogicValidator::from_children(
            Condition::Or,
            vec![BasicValidator::String.into(), BasicValidator::Undefined.into()],
        );
        let f = FieldValidator::new("b", false, Validator::Logic(Arc::new(union)), false);
        assert!(!f.is_required());
        assert!(matches!(f.validator(), Validator::Basic(BasicValidator::String)));
        assert!(f.validate(None).is_success());
        assert_eq!(f.validate(Some(&json!(1))).code(), ErrorCode::NotString);
    }

    #[test]
    fn required_and_optional_fields() {
        let r = record(vec![field("a", false, BasicValidator::String), field("b", true, BasicValidator::Number)]);
        assert!(r.validate_scoped(Some(&json!({"a": "x"})), None).is_success());
        assert!(r.validate_scoped(Some(&json!({"a": "x", "b": null})), None).is_success());

        let missing = r.validate_scoped(Some(&json!({"b": 1})), None);
        assert_eq!(missing.code(), ErrorCode::InterfaceNotMatch);
        assert_eq!(missing.field_name(), Some("a"));
        assert_eq!(missing.inner().map(ValidateResult::code), Some(ErrorCode::NullOnRequired));

        let wrong = r.validate_scoped(Some(&json!({"a": "x", "b": "1"})), None);
        assert_eq!(wrong.original_error().code(), ErrorCode::NotNumber);
        assert_eq!(wrong.path(), "b");
    }

    #[test]
    fn strict_optional_rejects_null() {
        let f = FieldValidator::new("b", true, BasicValidator::Number.into(), true);
        let r = record(vec![f]);
        assert!(r.validate_scoped(Some(&json!({})), None).is_success());
        let result = r.validate_scoped(Some(&json!({"b": null})), None);
        assert_eq!(result.original_error().code(), ErrorCode::NotNumber);
    }

    #[test]
    fn excess_keys() {
        let r = record(vec![field("a", false, BasicValidator::String)]);
        let result = r.validate_scoped(Some(&json!({"a": "x", "zz": 1})), None);
        assert_eq!(result.field_name(), Some("zz"));
        assert_eq!(result.inner().map(ValidateResult::code), Some(ErrorCode::FieldNotAllowed));

        let names: FieldSet = ["zz".to_string()].into_iter().collect();
        let scope = FieldScope::new(&names, None);
        assert!(r.validate_scoped(Some(&json!({"a": "x", "zz": 1})), Some(&scope)).is_success());

        let indexed = RecordValidator::from_parts(None, vec![], Some(BasicValidator::Number.into()), None);
        assert!(indexed.validate_scoped(Some(&json!({"x": 1, "y": 2})), None).is_success());
        let result = indexed.validate_scoped(Some(&json!({"x": 1, "y": "2"})), None);
        assert_eq!(result.path(), "y");
        assert_eq!(result.original_error().code(), ErrorCode::NotNumber);
    }

    #[test]
    fn declared_fields_fail_before_excess_keys() {
        let r = record(vec![field("a", false, BasicValidator::String), field("b", true, BasicValidator::Number)]);
        let result = r.validate_scoped(Some(&json!({"zz": 1, "aa": 1, "a": "x"})), None);
        assert_eq!(result.field_name(), Some("zz"));

        let result = r.validate_scoped(Some(&json!({"extra": 1, "b": "2", "a": "x"})), None);
        assert_eq!(result.path(), "b");
        assert_eq!(result.original_error().code(), ErrorCode::NotNumber);
    }

    #[test]
    fn any_index_key_type() {
        let mut m = Manager::new();
        for def in ["{ [k: symbol]: number }", "{ [k: string | number]: number }", "{ readonly [k: `id-${string}`]: number }"] {
            let v = m.resolve(def, None).unwrap();
            let r = v.as_record().unwrap();
            assert!(r.fields().is_empty(), "{def}");
            assert!(v.validate(&json!({"x": 1})).is_success());
            assert_eq!(v.validate(&json!({"x": "1"})).original_error().code(), ErrorCode::NotNumber);
        }
    }

    #[test]
    fn non_objects_rejected() {
        let r = record(vec![]);
        for value in [Value::Null, json!([]), json!("x"), json!(1)] {
            assert_eq!(r.validate_scoped(Some(&value), None).code(), ErrorCode::NotObject);
        }
        assert_eq!(r.validate_scoped(None, None).code(), ErrorCode::NotObject);
    }

    #[test]
    fn parent_sees_child_fields() {
        let parent = Arc::new(RecordValidator::from_parts(
            Some("Parent".into()),
            vec![field("parentValue", false, BasicValidator::Number)],
            None,
            None,
        ));
        let child = RecordValidator::from_parts(
            Some("Child".into()),
            vec![field("childValue", false, BasicValidator::Number)],
            None,
            Some(parent),
        );
        assert_eq!(child.field_names().len(), 2);
        assert!(child.validate_scoped(Some(&json!({"parentValue": 1, "childValue": 2})), None).is_success());

        let missing_parent = child.validate_scoped(Some(&json!({"childValue": 2})), None);
        assert_eq!(missing_parent.path(), "parentValue");
        assert_eq!(missing_parent.original_error().code(), ErrorCode::NullOnRequired);
    }

    #[test]
    fn partial_relaxes_own_fields() {
        let r = record(vec![field("a", false, BasicValidator::String)]);
        let p = r.partial();
        assert!(p.validate_scoped(Some(&json!({})), None).is_success());
        assert_eq!(p.validate_scoped(Some(&json!({"a": 1})), None).original_error().code(), ErrorCode::NotString);
        assert!(r.fields()[0].is_required());
    }

    #[test]
    fn display_renders_shape() {
        let r = RecordValidator::from_parts(
            Some("A".into()),
            vec![field("a", false, BasicValidator::String), field("b", true, BasicValidator::Number)],
            None,
            None,
        );
        assert_eq!(r.to_string(), "A { a: string; b?: number }");
        assert_eq!(record(vec![]).to_string(), "{}");
    }
}

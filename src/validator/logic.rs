use std::fmt;
use std::path::Path;
use std::sync::Arc;

use serde_json::Value;

use super::{BasicValidator, FieldScope, FieldSet, Validator};
use crate::error::{ResolveError, ResolveResult};
use crate::manager::Manager;
use crate::result::{ErrorCode, ValidateResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Condition {
    And,
    Or,
}

impl Condition {
    pub fn symbol(self) -> char {
        match self {
            Condition::And => '&',
            Condition::Or => '|',
        }
    }

    fn from_char(c: char) -> Option<Self> {
        match c {
            '&' => Some(Condition::And),
            '|' => Some(Condition::Or),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogicToken {
    Operand(String),
    Op(Condition),
}

impl LogicToken {
    pub fn operand(text: impl Into<String>) -> Self {
        LogicToken::Operand(text.into())
    }
}

// ---------------------------- Top-level scan ------------------------------ //

/// Byte offsets of every `&`/`|` outside round, curly and angle brackets and
/// outside quoted literals. `None` if the brackets do not balance.
pub(crate) fn top_level_operators(expr: &str) -> Option<Vec<(usize, Condition)>> {
    let (mut round, mut curly, mut angle) = (0i32, 0i32, 0i32);
    let mut quote: Option<char> = None;
    let mut found = Vec::new();
    for (offset, c) in expr.char_indices() {
        if let Some(q) = quote {
            if c == q {
                quote = None;
            }
            continue;
        }
        match c {
            '\'' | '"' => quote = Some(c),
            '(' => round += 1,
            ')' => round -= 1,
            '{' => curly += 1,
            '}' => curly -= 1,
            '<' => angle += 1,
            '>' => angle -= 1,
            '&' | '|' if round == 0 && curly == 0 && angle == 0 => {
                if let Some(cond) = Condition::from_char(c) {
                    found.push((offset, cond));
                }
            }
            _ => {}
        }
        if round < 0 || curly < 0 || angle < 0 {
            return None;
        }
    }
    (round == 0 && curly == 0 && angle == 0 && quote.is_none()).then_some(found)
}

/// Split at top-level operators into alternating operands and operators.
pub fn split_by_logic(expr: &str) -> ResolveResult<Vec<LogicToken>> {
    let ops = top_level_operators(expr).ok_or_else(|| ResolveError::UnbalancedBraces {
        context: expr.to_string(),
    })?;
    let mut tokens = Vec::with_capacity(ops.len() * 2 + 1);
    let mut start = 0;
    for (offset, cond) in ops.into_iter().map(|(o, c)| (o, Some(c))).chain([(expr.len(), None)]) {
        let operand = expr[start..offset].trim();
        if operand.is_empty() {
            return Err(ResolveError::EmptyOperand { expr: expr.to_string() });
        }
        tokens.push(LogicToken::operand(operand));
        if let Some(cond) = cond {
            tokens.push(LogicToken::Op(cond));
            start = offset + 1;
        }
    }
    Ok(tokens)
}

/// When both operators occur, fuse every `&` with its neighbours so `&`
/// binds tighter than `|`. Operands are joined without spaces.
pub fn merge_and(mut tokens: Vec<LogicToken>) -> Vec<LogicToken> {
    let has = |cond: Condition, tokens: &[LogicToken]| tokens.iter().any(|t| *t == LogicToken::Op(cond));
    if !(has(Condition::And, &tokens) && has(Condition::Or, &tokens)) {
        return tokens;
    }
    let mut i = tokens.len().saturating_sub(2);
    while i > 0 {
        if tokens[i] == LogicToken::Op(Condition::And) {
            if let (LogicToken::Operand(left), LogicToken::Operand(right)) = (&tokens[i - 1], &tokens[i + 1]) {
                let fused = format!("{left}&{right}");
                tokens[i - 1] = LogicToken::Operand(fused);
                tokens.drain(i..=i + 1);
            }
            i = i.saturating_sub(1);
        }
        i = i.saturating_sub(1);
    }
    tokens
}

// ------------------------------- Validator --------------------------------- //

/// `A & B & ...` or `A | B | ...`, never both at one level.
#[derive(Debug, Clone)]
pub struct LogicValidator {
    condition: Condition,
    children: Vec<Validator>,
    /// Every operand is a string literal joined by `|`.
    is_enum_string: bool,
    /// Names declared by any record in this group, nested groups included.
    group_fields: FieldSet,
}

impl LogicValidator {
    pub(crate) fn build(def: &str, manager: &mut Manager, file: Option<&Path>) -> ResolveResult<Self> {
        let tokens = merge_and(split_by_logic(def)?);
        let mut condition = None;
        let mut operands = Vec::new();
        for token in tokens {
            match token {
                LogicToken::Operand(text) => operands.push(text),
                LogicToken::Op(op) => match condition {
                    Some(prev) if prev != op => {
                        return Err(ResolveError::MixedLogic { expr: def.to_string() });
                    }
                    _ => condition = Some(op),
                },
            }
        }
        let condition = condition.ok_or_else(|| ResolveError::InvalidExpression { expr: def.to_string() })?;
        let children = operands
            .iter()
            .map(|operand| manager.resolve_expr(operand, file))
            .collect::<ResolveResult<Vec<_>>>()?;
        Ok(Self::from_children(condition, children))
    }

    pub fn from_children(condition: Condition, children: Vec<Validator>) -> Self {
        let is_enum_string = condition == Condition::Or
            && !children.is_empty()
            && children.iter().all(|c| c.as_basic().is_some_and(BasicValidator::is_literal));
        let mut group_fields = FieldSet::new();
        for child in &children {
            match child {
                Validator::Record(r) => group_fields.extend(r.field_names().iter().cloned()),
                Validator::Logic(l) => group_fields.extend(l.group_fields.iter().cloned()),
                _ => {}
            }
        }
        Self { condition, children, is_enum_string, group_fields }
    }

    pub fn condition(&self) -> Condition {
        self.condition
    }

    pub fn children(&self) -> &[Validator] {
        &self.children
    }

    pub fn is_enum_string(&self) -> bool {
        self.is_enum_string
    }

    pub fn group_fields(&self) -> &FieldSet {
        &self.group_fields
    }

    pub(crate) fn has_undefined(&self) -> bool {
        self.condition == Condition::Or && self.children.iter().any(Validator::is_undefined)
    }

    /// The union minus its `undefined` operands, collapsed to the single
    /// remaining operand when only one is left.
    pub(crate) fn without_undefined(&self) -> Validator {
        let mut rest: Vec<Validator> = self.children.iter().filter(|c| !c.is_undefined()).cloned().collect();
        match rest.len() {
            0 => Validator::Basic(BasicValidator::Undefined),
            1 => rest.remove(0),
            _ => Validator::Logic(Arc::new(Self::from_children(self.condition, rest))),
        }
    }

    pub(crate) fn validate_scoped(&self, value: Option<&Value>, scope: Option<&FieldScope<'_>>) -> ValidateResult {
        if self.is_enum_string && !matches!(value, Some(Value::String(_))) {
            return ValidateResult::new(ErrorCode::NotString);
        }
        let group = FieldScope::new(&self.group_fields, scope);
        match self.condition {
            Condition::And => {
                for (i, child) in self.children.iter().enumerate() {
                    let result = child.validate_scoped(value, Some(&group));
                    if result.is_error() {
                        return ValidateResult::nested(ErrorCode::LogicFalse, format!("<Condition{i}>"), result);
                    }
                }
                ValidateResult::success()
            }
            Condition::Or => {
                if self.children.iter().any(|child| child.validate_scoped(value, Some(&group)).is_success()) {
                    ValidateResult::success()
                } else if self.is_enum_string {
                    ValidateResult::new(ErrorCode::InvalidStrLiteral)
                } else {
                    ValidateResult::new(ErrorCode::LogicFalse)
                }
            }
        }
    }
}

impl fmt::Display for LogicValidator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, child) in self.children.iter().enumerate() {
            if i > 0 {
                write!(f, " {} ", self.condition.symbol())?;
            }
            match child {
                Validator::Logic(_) => write!(f, "({child})")?,
                _ => write!(f, "{child}")?,
            }
        }
        Ok(())
    }
}

// ------------------------------- Tests ------------------------------------ //

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn words(tokens: &[LogicToken]) -> Vec<String> {
        tokens
            .iter()
            .map(|t| match t {
                LogicToken::Operand(s) => s.clone(),
                LogicToken::Op(c) => c.symbol().to_string(),
            })
            .collect()
    }

    fn split(expr: &str) -> Vec<String> {
        words(&split_by_logic(expr).unwrap())
    }

    #[test]
    fn splits_only_at_top_level() {
        assert_eq!(split("A|B"), ["A", "|", "B"]);
        assert_eq!(split("A & B"), ["A", "&", "B"]);
        assert_eq!(split("A|B&C"), ["A", "|", "B", "&", "C"]);
        assert_eq!(split("(A|B)&C"), ["(A|B)", "&", "C"]);
        assert_eq!(split("{ a: A | B } | Array<C|D>"), ["{ a: A | B }", "|", "Array<C|D>"]);
        assert_eq!(split("'a|b' | 'c'"), ["'a|b'", "|", "'c'"]);
    }

    #[test]
    fn split_rejects_empty_operands_and_bad_brackets() {
        assert!(matches!(split_by_logic("A | "), Err(ResolveError::EmptyOperand { .. })));
        assert!(matches!(split_by_logic("A || B"), Err(ResolveError::EmptyOperand { .. })));
        assert!(matches!(split_by_logic("(A | B"), Err(ResolveError::UnbalancedBraces { .. })));
        assert!(top_level_operators("A) | (B").is_none());
    }

    #[test]
    fn and_binds_tighter_than_or() {
        let merge = |expr: &str| words(&merge_and(split_by_logic(expr).unwrap()));
        assert_eq!(merge("A|B&C"), ["A", "|", "B&C"]);
        assert_eq!(merge("A&B|C&D"), ["A&B", "|", "C&D"]);
        assert_eq!(merge("A|B&C&D|E"), ["A", "|", "B&C&D", "|", "E"]);
        assert_eq!(merge("A|B&(C|D)|E&(F|G&H)"), ["A", "|", "B&(C|D)", "|", "E&(F|G&H)"]);
        assert_eq!(merge("A&B&C"), ["A", "&", "B", "&", "C"]);
    }

    fn literals(names: &[&str]) -> Vec<Validator> {
        names.iter().map(|n| Validator::Basic(BasicValidator::Literal(n.to_string()))).collect()
    }

    #[test]
    fn enum_string_union() {
        let v = LogicValidator::from_children(Condition::Or, literals(&["Apple", "Banana"]));
        assert!(v.is_enum_string());
        assert!(v.validate_scoped(Some(&json!("Apple")), None).is_success());
        assert_eq!(v.validate_scoped(Some(&json!("Cherry")), None).code(), ErrorCode::InvalidStrLiteral);
        assert_eq!(v.validate_scoped(Some(&json!(1)), None).code(), ErrorCode::NotString);
        assert_eq!(v.validate_scoped(None, None).code(), ErrorCode::NotString);
    }

    #[test]
    fn plain_union_and_intersection() {
        let or = LogicValidator::from_children(
            Condition::Or,
            vec![BasicValidator::Number.into(), BasicValidator::Null.into()],
        );
        assert!(!or.is_enum_string());
        assert!(or.validate_scoped(Some(&Value::Null), None).is_success());
        let failed = or.validate_scoped(Some(&json!("x")), None);
        assert_eq!(failed.code(), ErrorCode::LogicFalse);
        assert!(failed.inner().is_none());

        let and = LogicValidator::from_children(
            Condition::And,
            vec![BasicValidator::Any.into(), BasicValidator::String.into()],
        );
        let failed = and.validate_scoped(Some(&json!(1)), None);
        assert_eq!(failed.code(), ErrorCode::LogicFalse);
        assert_eq!(failed.field_name(), Some("<Condition1>"));
        assert_eq!(failed.inner().map(ValidateResult::code), Some(ErrorCode::NotString));
    }

    #[test]
    fn removing_undefined_collapses() {
        let v = LogicValidator::from_children(
            Condition::Or,
            vec![BasicValidator::String.into(), BasicValidator::Undefined.into()],
        );
        assert!(v.has_undefined());
        assert!(matches!(v.without_undefined(), Validator::Basic(BasicValidator::String)));

        let mut children = literals(&["a", "b"]);
        children.push(BasicValidator::Undefined.into());
        let v = LogicValidator::from_children(Condition::Or, children);
        assert!(!v.is_enum_string());
        let stripped = v.without_undefined();
        assert!(stripped.as_logic().is_some_and(|l| l.is_enum_string() && l.children().len() == 2));
    }
}

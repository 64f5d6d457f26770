use super::{header_regex, ScanError};

/// Scanner position relative to the alias body being read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanState {
    /// Between operands. `awaiting_operand` is set at the start of the body
    /// and after every top-level `&`/`|`.
    Outside { awaiting_operand: bool },
    /// Inside a bare token such as `string`, `Foo[]` or `Array<A | B>`;
    /// `angle` counts open generic brackets.
    Token { angle: usize },
    /// Inside a quoted literal opened by the given quote.
    Quoted(char),
    /// Inside a `{...}` or `(...)` group opened by `open`. `quote` is set
    /// while inside a literal in the group, where brackets do not count.
    Nested { open: char, depth: usize, quote: Option<char> },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Continue(ScanState),
    /// The current character is not part of the body.
    Stop,
}

impl ScanState {
    pub const START: ScanState = ScanState::Outside { awaiting_operand: true };
}

fn is_terminator(c: char) -> bool {
    matches!(c, ';' | ',' | ')' | '}')
}

/// One transition of the alias-body state machine.
pub fn step(state: ScanState, c: char) -> Transition {
    use ScanState::*;
    use Transition::*;
    match state {
        Outside { awaiting_operand } => {
            if c.is_whitespace() {
                Continue(state)
            } else if c == '&' || c == '|' {
                Continue(Outside { awaiting_operand: true })
            } else if !awaiting_operand || is_terminator(c) {
                Stop
            } else {
                Continue(open_operand(c))
            }
        }
        Token { angle } if angle > 0 => match c {
            '<' => Continue(Token { angle: angle + 1 }),
            '>' => Continue(Token { angle: angle - 1 }),
            _ => Continue(state),
        },
        Token { .. } => {
            if c.is_whitespace() {
                Continue(Outside { awaiting_operand: false })
            } else if c == '&' || c == '|' {
                Continue(Outside { awaiting_operand: true })
            } else if is_terminator(c) {
                Stop
            } else {
                Continue(open_operand(c))
            }
        }
        Quoted(q) => {
            if c == q { Continue(Token { angle: 0 }) } else { Continue(state) }
        }
        Nested { open, depth, quote: Some(q) } => {
            if c == q { Continue(Nested { open, depth, quote: None }) } else { Continue(state) }
        }
        Nested { open, depth, quote: None } => {
            let close = if open == '{' { '}' } else { ')' };
            if c == '\'' || c == '"' {
                Continue(Nested { open, depth, quote: Some(c) })
            } else if c == open {
                Continue(Nested { open, depth: depth + 1, quote: None })
            } else if c == close && depth == 1 {
                // a closed group may still carry a suffix such as `[]`
                Continue(Token { angle: 0 })
            } else if c == close {
                Continue(Nested { open, depth: depth - 1, quote: None })
            } else {
                Continue(state)
            }
        }
    }
}

fn open_operand(c: char) -> ScanState {
    match c {
        '{' | '(' => ScanState::Nested { open: c, depth: 1, quote: None },
        '\'' | '"' => ScanState::Quoted(c),
        '<' => ScanState::Token { angle: 1 },
        _ => ScanState::Token { angle: 0 },
    }
}

/// Body of `type <name> = <body>` in `text`, or `None` if no such alias is
/// declared. The body extends through any top-level `&`/`|` continuation,
/// even across lines, and stops at the first unrelated token.
pub fn extract_alias(text: &str, name: &str) -> Result<Option<String>, ScanError> {
    let header = header_regex(r"\btype\s+{name}\s*=", name);
    let Some(m) = header.find(text) else {
        return Ok(None);
    };
    let start = m.end();
    let mut state = ScanState::START;
    let mut end = text.len();
    for (offset, c) in text[start..].char_indices() {
        match step(state, c) {
            Transition::Continue(next) => state = next,
            Transition::Stop => {
                end = start + offset;
                break;
            }
        }
    }
    match state {
        ScanState::Quoted(_) | ScanState::Nested { .. } => return Err(ScanError::Unterminated),
        ScanState::Outside { awaiting_operand: true } => return Err(ScanError::Unterminated),
        ScanState::Token { angle } if angle > 0 => return Err(ScanError::Unterminated),
        _ => {}
    }
    let body = text[start..end].trim();
    if body.is_empty() {
        return Err(ScanError::Unterminated);
    }
    Ok(Some(body.to_string()))
}

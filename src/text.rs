//! Pure string transforms applied to declaration text before it is scanned.
use once_cell::sync::Lazy;
use regex::Regex;

static LINE_BREAKS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s*\n+\s*").unwrap());
static INLINE_SPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[ \t]+").unwrap());
static STRING_LITERAL: Lazy<Regex> = Lazy::new(|| Regex::new(r#"^(?:'[^']*'|"[^"]*")$"#).unwrap());

// ------------------------------- Comments -------------------------------- //

#[derive(Clone, Copy, PartialEq, Eq)]
enum CommentState {
    Code,
    Quoted(char),
    Line,
    Block,
}

/// Remove `//` and `/* */` comments, then squeeze whitespace: blank lines
/// collapse into a single `\n` and runs of spaces/tabs into one space.
///
/// Comment markers inside quoted literals are kept.
pub fn strip_comments(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut state = CommentState::Code;
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        match state {
            CommentState::Code => match c {
                '/' if chars.peek() == Some(&'/') => {
                    chars.next();
                    state = CommentState::Line;
                }
                '/' if chars.peek() == Some(&'*') => {
                    chars.next();
                    state = CommentState::Block;
                }
                '\'' | '"' | '`' => {
                    state = CommentState::Quoted(c);
                    out.push(c);
                }
                _ => out.push(c),
            },
            CommentState::Quoted(q) => {
                if c == q || c == '\n' {
                    state = CommentState::Code;
                }
                out.push(c);
            }
            CommentState::Line => {
                if c == '\n' {
                    state = CommentState::Code;
                    out.push(c);
                }
            }
            CommentState::Block => {
                if c == '*' && chars.peek() == Some(&'/') {
                    chars.next();
                    state = CommentState::Code;
                }
            }
        }
    }
    let out = out.replace('\r', "");
    let out = LINE_BREAKS.replace_all(&out, "\n");
    let out = INLINE_SPACE.replace_all(&out, " ");
    out.trim().to_string()
}

// ------------------------------- Brackets -------------------------------- //

/// Strip enclosing parentheses that wrap the whole expression, repeatedly.
///
/// `('a'|'b')` becomes `'a'|'b'`, while `('a')|('b')` is left as-is because
/// the first `(` closes before the end.
pub fn trim_brackets(expr: &str) -> &str {
    let mut current = expr.trim();
    while let Some(inner) = trim_outer_brackets(current) {
        current = inner.trim();
    }
    current
}

fn trim_outer_brackets(expr: &str) -> Option<&str> {
    if !expr.starts_with('(') || !expr.ends_with(')') || expr.len() < 2 {
        return None;
    }
    let last = expr.len() - 1;
    let mut level = 0i32;
    let mut quote: Option<char> = None;
    for (pos, c) in expr.char_indices() {
        if let Some(q) = quote {
            if c == q {
                quote = None;
            }
            continue;
        }
        match c {
            '\'' | '"' => quote = Some(c),
            '(' => level += 1,
            ')' => level -= 1,
            _ => {}
        }
        // the opening bracket closed before the end: not a global wrapper
        if level == 0 && pos < last {
            return None;
        }
    }
    if level == 0 { Some(&expr[1..last]) } else { None }
}

/// `'text'` or `"text"` with no embedded quote of the same kind.
pub fn is_string_literal(expr: &str) -> bool {
    STRING_LITERAL.is_match(expr)
}

/// The text between the quotes of a literal accepted by [`is_string_literal`].
pub fn literal_text(expr: &str) -> &str {
    &expr[1..expr.len() - 1]
}

// ------------------------------- Tests ------------------------------------ //

use super::{header_regex, ScanError};

/// Full `interface <name> ... { ... }` declaration in `text`, from the
/// `interface` keyword through the matching close brace. `None` if `text`
/// declares no such interface.
pub fn extract_record(text: &str, name: &str) -> Result<Option<String>, ScanError> {
    let header = header_regex(r"\binterface\s+{name}\b(?:\s+extends\s+[\w$.]+)?[^{};]*\{", name);
    let Some(m) = header.find(text) else {
        return Ok(None);
    };
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    for (offset, c) in text[m.start()..].char_indices() {
        if let Some(q) = quote {
            if c == q {
                quote = None;
            }
            continue;
        }
        match c {
            '\'' | '"' => quote = Some(c),
            '{' => depth += 1,
            '}' if depth == 0 => return Err(ScanError::Unbalanced),
            '}' => {
                depth -= 1;
                if depth == 0 {
                    let end = m.start() + offset + c.len_utf8();
                    return Ok(Some(text[m.start()..end].to_string()));
                }
            }
            _ => {}
        }
    }
    Err(ScanError::Unbalanced)
}

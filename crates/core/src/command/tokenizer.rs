//! Shell-style word splitting for curl command lines
//!
//! Handles single quotes (fully literal), double quotes (with the POSIX
//! backslash escapes), unquoted backslash escapes and line continuations
//! from both Unix shells (`\` + newline) and `cmd.exe` (`^` + newline).

use curlkit_domain::{CurlError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Quote {
    None,
    Single,
    Double,
}

/// Remove line continuations so a continued command reads as one line
fn join_continuations(input: &str) -> String {
    input.replace("\\\r\n", "").replace("\\\n", "").replace("^\r\n", "").replace("^\n", "")
}

/// Split `input` into shell words
///
/// Empty quoted strings (`''`, `""`) produce empty tokens. An unterminated
/// quote fails with [`CurlError::MalformedCommand`] pointing at the text
/// from the opening quote onwards.
pub fn tokenize(input: &str) -> Result<Vec<String>> {
    let joined = join_continuations(input);
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_token = false;
    let mut quote = Quote::None;
    let mut quote_start = 0;
    let mut chars = joined.char_indices().peekable();

    while let Some((index, c)) = chars.next() {
        match quote {
            Quote::Single => {
                if c == '\'' {
                    quote = Quote::None;
                } else {
                    current.push(c);
                }
            }
            Quote::Double => match c {
                '"' => quote = Quote::None,
                '\\' => match chars.peek() {
                    Some(&(_, next)) if matches!(next, '"' | '\\' | '`' | '$') => {
                        current.push(next);
                        chars.next();
                    }
                    _ => current.push('\\'),
                },
                _ => current.push(c),
            },
            Quote::None => match c {
                '\'' => {
                    quote = Quote::Single;
                    quote_start = index;
                    in_token = true;
                }
                '"' => {
                    quote = Quote::Double;
                    quote_start = index;
                    in_token = true;
                }
                '\\' => {
                    in_token = true;
                    match chars.next() {
                        Some((_, escaped)) => current.push(escaped),
                        None => current.push('\\'),
                    }
                }
                c if c.is_whitespace() => {
                    if in_token {
                        tokens.push(std::mem::take(&mut current));
                        in_token = false;
                    }
                }
                _ => {
                    current.push(c);
                    in_token = true;
                }
            },
        }
    }

    if quote != Quote::None {
        return Err(CurlError::malformed(&joined[quote_start..], "unterminated quote"));
    }
    if in_token {
        tokens.push(current);
    }

    Ok(tokens)
}

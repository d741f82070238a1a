//! Classification of object-like macro bodies.
//!
//! A macro becomes a D manifest constant only if its body is a single literal, optionally
//! negated and wrapped in parentheses: `100`, `(-1)`, `0x10UL`, `1.5f`, `'a'`, `"text"`.
//! Anything else (expressions, casts, references to other macros) is reported instead.

use regex::Regex;
use std::sync::LazyLock;

/// What a macro body translates to.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum MacroBody {
    /// No tokens at all (include guards, feature flags).
    Empty,
    /// A literal, already spelled the way D expects it.
    Literal(String),
    NotLiteral,
}

static INTEGER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(0[xX][0-9a-fA-F]+|0[bB][01]+|[0-9]+)([uUlL]*)$").expect("valid pattern")
});

static FLOAT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"^([0-9]*\.[0-9]*([eE][+-]?[0-9]+)?",
        r"|[0-9]+[eE][+-]?[0-9]+",
        r"|0[xX][0-9a-fA-F]*\.?[0-9a-fA-F]*[pP][+-]?[0-9]+)",
        r"([fFlL]?)$",
    ))
    .expect("valid pattern")
});

static CHARACTER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^'(\\.[0-9a-fA-F]*|[^\\'])'$").expect("valid pattern"));

static STRING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"^"(\\.|[^\\"])*"$"#).expect("valid pattern"));

pub fn classify(body: &str) -> MacroBody {
    let mut body = body.trim();
    if body.is_empty() {
        return MacroBody::Empty;
    }
    while let Some(inner) = strip_parens(body) {
        body = inner.trim();
    }

    let (sign, unsigned) = match body.chars().next() {
        Some(c @ ('-' | '+')) => (Some(c), body[1..].trim_start()),
        _ => (None, body),
    };
    let literal = match number(unsigned) {
        Some(number) => number,
        None if sign.is_some() => return MacroBody::NotLiteral,
        None if CHARACTER.is_match(unsigned) || STRING.is_match(unsigned) => unsigned.to_string(),
        None => return MacroBody::NotLiteral,
    };
    match sign {
        Some(sign) => MacroBody::Literal(format!("{sign}{literal}")),
        None => MacroBody::Literal(literal),
    }
}

/// Returns the text inside `body` if `body` is one parenthesized group.
fn strip_parens(body: &str) -> Option<&str> {
    let inner = body.strip_prefix('(')?.strip_suffix(')')?;
    let mut depth = 0usize;
    for c in inner.chars() {
        match c {
            '(' => depth += 1,
            ')' => depth = depth.checked_sub(1)?,
            _ => {}
        }
    }
    (depth == 0).then_some(inner)
}

/// Rewrites a C numeric literal in D syntax.
fn number(text: &str) -> Option<String> {
    if let Some(captures) = INTEGER.captures(text) {
        let digits = &captures[1];
        let suffix = integer_suffix(&captures[2])?;
        // D has no octal literals.
        let octal = digits.len() > 1 && digits.bytes().all(|b| b.is_ascii_digit());
        let digits = match octal && digits.starts_with('0') {
            true => u64::from_str_radix(&digits[1..], 8).ok()?.to_string(),
            false => digits.to_string(),
        };
        return Some(format!("{digits}{suffix}"));
    }
    let captures = FLOAT.captures(text)?;
    let mantissa = &captures[1];
    if mantissa == "." {
        return None;
    }
    let mut value = mantissa.to_string();
    if value.starts_with('.') {
        value.insert(0, '0');
    }
    let hex = value.starts_with("0x") || value.starts_with("0X");
    if let Some(dot) = value.find('.') {
        if !hex && !value[dot + 1..].starts_with(|c: char| c.is_ascii_digit()) {
            value.insert(dot + 1, '0');
        }
    }
    match &captures[3] {
        "f" | "F" => value.push('f'),
        "l" | "L" => value.push('L'),
        _ => {}
    }
    Some(value)
}

/// Maps a C integer suffix to D. C's `long` and `long long` both become D's 64-bit `L`.
fn integer_suffix(suffix: &str) -> Option<&'static str> {
    let unsigned = suffix.chars().filter(|c| matches!(c, 'u' | 'U')).count();
    let longs = suffix.chars().filter(|c| matches!(c, 'l' | 'L')).count();
    match (unsigned, longs) {
        (0, 0) => Some(""),
        (1, 0) => Some("U"),
        (0, 1 | 2) => Some("L"),
        (1, 1 | 2) => Some("UL"),
        _ => None,
    }
}

//! Recovers macro definitions from preprocessor output produced with `-E -dD`, which keeps
//! every `#define` / `#undef` in place and marks file changes with line markers
//! (`# 12 "foo.h" 2`).

use crate::raw::RawMacro;
use h2d_core::Location;

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct MacroDefinition {
    pub definition: RawMacro,
    pub location: Location,
}

/// Returns the macros defined in `main_file` that are still defined at its end, in definition
/// order.
pub fn scan_macros(preprocessed: &str, main_file: &str) -> Vec<MacroDefinition> {
    let mut macros: Vec<MacroDefinition> = Vec::new();
    let mut file = String::new();
    let mut next_line = 1u32;

    for line in preprocessed.lines() {
        if let Some((number, marker_file)) = line_marker(line) {
            file = marker_file;
            next_line = number;
            continue;
        }
        let current = next_line;
        next_line += 1;
        if file != main_file {
            continue;
        }
        let Some(directive) = line.trim_start().strip_prefix('#') else {
            continue;
        };
        let directive = directive.trim_start();
        if let Some(rest) = directive.strip_prefix("define ") {
            if let Some(definition) = parse_define(rest) {
                macros.retain(|m| m.definition.name != definition.name);
                macros.push(MacroDefinition {
                    definition,
                    location: Location::new(file.clone(), current, 1),
                });
            }
        } else if let Some(rest) = directive.strip_prefix("undef ") {
            let name = rest.trim();
            macros.retain(|m| m.definition.name != name);
        }
    }
    macros
}

/// Parses `# 12 "file" flags` and `#line 12 "file"`.
fn line_marker(line: &str) -> Option<(u32, String)> {
    let rest = line.strip_prefix('#')?;
    let rest = rest.strip_prefix("line").unwrap_or(rest).trim_start();
    let digits = rest.find(|c: char| !c.is_ascii_digit()).unwrap_or(rest.len());
    if digits == 0 {
        return None;
    }
    let number = rest[..digits].parse().ok()?;
    let quoted = rest[digits..].trim_start().strip_prefix('"')?;
    let end = quoted.find('"')?;
    Some((number, quoted[..end].to_string()))
}

/// Parses the part of a `#define` after the keyword.
fn parse_define(rest: &str) -> Option<RawMacro> {
    let rest = rest.trim_start();
    let name_end = rest
        .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
        .unwrap_or(rest.len());
    if name_end == 0 {
        return None;
    }
    let name = rest[..name_end].to_string();
    let after = &rest[name_end..];
    // A function-like macro has its parameter list immediately after the name.
    if let Some(list) = after.strip_prefix('(') {
        let (list, body) = list.split_at(list.find(')')?);
        let params = list
            .split(',')
            .map(|p| p.trim().to_string())
            .filter(|p| !p.is_empty())
            .collect();
        return Some(RawMacro {
            name,
            params: Some(params),
            body: body[1..].trim().to_string(),
        });
    }
    Some(RawMacro {
        name,
        params: None,
        body: after.trim().to_string(),
    })
}

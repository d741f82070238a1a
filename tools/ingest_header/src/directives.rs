//! Line-level scan of the include directives in a header.

/// One `#include`, `#include_next` or `#import` directive.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct IncludeDirective {
    /// The header name as written, without quotes or angle brackets.
    pub target: String,
    /// `<target>` rather than `"target"`.
    pub angled: bool,
    /// 1-based line of the directive.
    pub line: u32,
    /// True if the directive sits inside a conditional block other than the include guard,
    /// so the front end may never actually read it.
    pub conditional: bool,
}

/// Finds the include directives in `text`, skipping those inside block comments.
pub fn scan_includes(text: &str) -> Vec<IncludeDirective> {
    let mut includes = Vec::new();
    let mut in_comment = false;
    // Open conditional blocks; `true` marks the include guard.
    let mut conditionals: Vec<bool> = Vec::new();
    let mut guard_candidate: Option<String> = None;
    let mut seen_code = false;

    for (index, raw_line) in text.lines().enumerate() {
        let line = strip_comments(raw_line, &mut in_comment);
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        let Some(directive) = trimmed.strip_prefix('#') else {
            seen_code = true;
            guard_candidate = None;
            continue;
        };
        let directive = directive.trim_start();
        let (keyword, rest) = split_word(directive);
        match keyword {
            "ifndef" if !seen_code && conditionals.is_empty() => {
                guard_candidate = Some(split_word(rest.trim()).0.to_string());
                conditionals.push(false);
            }
            "define" => {
                let name = split_word(rest.trim()).0;
                if guard_candidate.take().is_some_and(|g| g == name) {
                    if let Some(last) = conditionals.last_mut() {
                        *last = true;
                    }
                }
                seen_code = true;
            }
            "if" | "ifdef" | "ifndef" => {
                guard_candidate = None;
                seen_code = true;
                conditionals.push(false);
            }
            "endif" => {
                conditionals.pop();
            }
            "include" | "include_next" | "import" => {
                guard_candidate = None;
                seen_code = true;
                if let Some((target, angled)) = header_name(rest.trim()) {
                    includes.push(IncludeDirective {
                        target,
                        angled,
                        line: index as u32 + 1,
                        conditional: conditionals.iter().any(|&guard| !guard),
                    });
                }
            }
            _ => {
                guard_candidate = None;
                seen_code = true;
            }
        }
    }
    includes
}

/// Removes `//` and `/* */` comments from one line, carrying block-comment state across lines.
fn strip_comments(line: &str, in_comment: &mut bool) -> String {
    let mut out = String::with_capacity(line.len());
    let mut chars = line.chars().peekable();
    while let Some(c) = chars.next() {
        if *in_comment {
            if c == '*' && chars.peek() == Some(&'/') {
                chars.next();
                *in_comment = false;
                out.push(' ');
            }
            continue;
        }
        match (c, chars.peek()) {
            ('/', Some('*')) => {
                chars.next();
                *in_comment = true;
            }
            ('/', Some('/')) => break,
            _ => out.push(c),
        }
    }
    out
}

fn split_word(s: &str) -> (&str, &str) {
    let end = s
        .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
        .unwrap_or(s.len());
    s.split_at(end)
}

fn header_name(s: &str) -> Option<(String, bool)> {
    let (close, angled) = match s.chars().next()? {
        '"' => ('"', false),
        '<' => ('>', true),
        _ => return None,
    };
    let rest = &s[1..];
    let end = rest.find(close)?;
    Some((rest[..end].to_string(), angled))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quoted_and_angled() {
        let includes = scan_includes(
            "#include \"local.h\"\n  #  import <Foundation/NSObject.h>\n#include_next <stdio.h>\n",
        );
        assert_eq!(
            includes
                .iter()
                .map(|i| (i.target.as_str(), i.angled, i.line))
                .collect::<Vec<_>>(),
            [
                ("local.h", false, 1),
                ("Foundation/NSObject.h", true, 2),
                ("stdio.h", true, 3)
            ]
        );
    }

    #[test]
    fn commented_out_includes_are_ignored() {
        let includes = scan_includes(
            "// #include \"a.h\"\n/*\n#include \"b.h\"\n*/\n#include \"c.h\" // trailing\n",
        );
        assert_eq!(includes.len(), 1);
        assert_eq!(includes[0].target, "c.h");
        assert_eq!(includes[0].line, 5);
    }

    #[test]
    fn include_guard_is_not_conditional() {
        let text = "#ifndef FOO_H\n#define FOO_H\n#include \"a.h\"\n#ifdef _WIN32\n#include \"win.h\"\n#endif\n#endif\n";
        let includes = scan_includes(text);
        assert_eq!(includes.len(), 2);
        assert!(!includes[0].conditional);
        assert!(includes[1].conditional);
    }

    #[test]
    fn ifndef_after_code_is_conditional() {
        let text = "int x;\n#ifndef NO_EXTRA\n#include \"extra.h\"\n#endif\n";
        let includes = scan_includes(text);
        assert!(includes[0].conditional);
    }
}

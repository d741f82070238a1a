//! Comment extraction for the entry header, so that comments can be carried into the output.

/// Consecutive comments separated only by whitespace containing at most one newline.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CommentRun {
    /// Source text from the start of the first comment to the end of the last.
    pub text: String,
    pub first_line: u32,
    pub last_line: u32,
}

struct Comment {
    start: usize,
    end: usize,
    first_line: u32,
    last_line: u32,
}

/// Returns the comment runs of `text`. Comments that follow code on the same line are skipped.
pub fn comment_runs(text: &str) -> Vec<CommentRun> {
    // Each run as (start offset, end offset, first line, last line).
    let mut spans: Vec<(usize, usize, u32, u32)> = Vec::new();
    for comment in leading_comments(text) {
        match spans.last_mut() {
            Some(span) if joins(&text[span.1..comment.start]) => {
                span.1 = comment.end;
                span.3 = comment.last_line;
            }
            _ => spans.push((
                comment.start,
                comment.end,
                comment.first_line,
                comment.last_line,
            )),
        }
    }
    spans
        .into_iter()
        .map(|(start, end, first_line, last_line)| CommentRun {
            text: text[start..end].to_string(),
            first_line,
            last_line,
        })
        .collect()
}

fn joins(gap: &str) -> bool {
    gap.trim().is_empty() && gap.matches('\n').count() <= 1
}

#[derive(Clone, Copy, PartialEq)]
enum State {
    Code,
    Str(char),
    LineComment,
    BlockComment,
}

/// Scans `text` for comments that begin a line (only whitespace or other comments before them).
fn leading_comments(text: &str) -> Vec<Comment> {
    let mut comments = Vec::new();
    let mut state = State::Code;
    let mut line = 1u32;
    let mut line_has_code = false;
    let mut current: Option<(usize, u32, bool)> = None;
    let mut chars = text.char_indices().peekable();

    while let Some((i, c)) = chars.next() {
        match state {
            State::Code => match c {
                '/' if chars.peek().is_some_and(|&(_, n)| n == '/' || n == '*') => {
                    let (_, n) = chars.next().unwrap_or((i, '/'));
                    state = match n {
                        '*' => State::BlockComment,
                        _ => State::LineComment,
                    };
                    current = Some((i, line, !line_has_code));
                }
                '"' | '\'' => {
                    line_has_code = true;
                    state = State::Str(c);
                }
                '\n' => {
                    line += 1;
                    line_has_code = false;
                }
                c if c.is_whitespace() => {}
                _ => line_has_code = true,
            },
            State::Str(quote) => match c {
                '\\' => {
                    chars.next();
                }
                '\n' => {
                    line += 1;
                    line_has_code = false;
                    state = State::Code;
                }
                c if c == quote => state = State::Code,
                _ => {}
            },
            State::LineComment => {
                if c == '\n' {
                    finish(&mut comments, current.take(), i, line);
                    line += 1;
                    line_has_code = false;
                    state = State::Code;
                }
            }
            State::BlockComment => match c {
                '*' if chars.peek().is_some_and(|&(_, n)| n == '/') => {
                    chars.next();
                    finish(&mut comments, current.take(), i + 2, line);
                    state = State::Code;
                }
                '\n' => line += 1,
                _ => {}
            },
        }
    }
    if state == State::LineComment {
        finish(&mut comments, current.take(), text.len(), line);
    }
    comments
}

fn finish(comments: &mut Vec<Comment>, current: Option<(usize, u32, bool)>, end: usize, line: u32) {
    if let Some((start, first_line, leading)) = current {
        if leading {
            comments.push(Comment {
                start,
                end,
                first_line,
                last_line: line,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn runs_split_on_blank_lines() {
        let text = "/* a */ /* b */\n\n/*\n  c\n*/ /* d */\n// e\nint x;\n";
        let runs = comment_runs(text);
        assert_eq!(
            runs,
            [
                CommentRun {
                    text: "/* a */ /* b */".into(),
                    first_line: 1,
                    last_line: 1
                },
                CommentRun {
                    text: "/*\n  c\n*/ /* d */\n// e".into(),
                    first_line: 3,
                    last_line: 6
                },
            ]
        );
    }

    #[test]
    fn trailing_comments_are_skipped() {
        let runs = comment_runs("int x; /* trailing */\n#endif // guard\n/* kept */\n");
        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0].text, "/* kept */");
        assert_eq!(runs[0].first_line, 3);
    }

    #[test]
    fn comment_markers_in_strings_are_code() {
        let runs = comment_runs("#define URL \"http://example.com\"\n/* real */\n");
        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0].text, "/* real */");
    }
}

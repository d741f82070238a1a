//! Assembly of the rendered declarations and the header's comments into one D module.

use c_ast::CommentRun;
use std::collections::BTreeSet;

/// A rendered declaration and the source lines it spans.
pub struct Block {
    /// First line, which comes before the declared name's line when the declaration is split
    /// over several lines.
    pub line: u32,
    pub end_line: u32,
    pub text: String,
}

/// Everything that goes into the module besides the declarations' text.
pub struct Preamble<'a> {
    /// `<package>.<stem>`, when a package is configured.
    pub module: Option<String>,
    pub imports: &'a BTreeSet<String>,
    pub objc: bool,
}

/// Lays out the module text.
///
/// `blocks` must be in source order. Each comment run either becomes the header comment (if it
/// comes before the first declaration without touching it), is attached to the declaration
/// on the line right after it, is dropped (if it is inside a declaration), or becomes a block
/// of its own.
pub fn layout(preamble: &Preamble, blocks: Vec<Block>, comments: &[CommentRun]) -> String {
    let first_line = blocks.first().map(|b| b.line);
    let mut comments = comments.iter().peekable();
    let header = comments.next_if(|run| {
        first_line.is_none_or(|line| run.last_line < line && run.last_line + 1 != line)
    });

    let mut attached: Vec<Option<&CommentRun>> = vec![None; blocks.len()];
    // Standalone runs, with the line they are positioned at.
    let mut loose: Vec<(u32, &str)> = Vec::new();
    for run in comments {
        if blocks
            .iter()
            .any(|b| b.line <= run.first_line && run.last_line <= b.end_line)
        {
            continue;
        }
        match blocks.iter().position(|b| b.line == run.last_line + 1) {
            Some(i) => attached[i] = Some(run),
            None => loose.push((run.first_line, &run.text)),
        }
    }

    let mut sections = Vec::new();
    if let Some(header) = header {
        sections.push(header.text.clone());
    }
    if let Some(module) = &preamble.module {
        sections.push(format!("module {module};"));
    }
    if !preamble.imports.is_empty() {
        let imports: Vec<_> = preamble
            .imports
            .iter()
            .map(|import| format!("import {import};"))
            .collect();
        sections.push(imports.join("\n"));
    }
    sections.push(
        match preamble.objc {
            true => "extern (Objective-C):",
            false => "extern (C):",
        }
        .into(),
    );

    let mut loose = loose.into_iter().peekable();
    for (block, comment) in blocks.into_iter().zip(attached) {
        while let Some((_, text)) = loose.next_if(|(line, _)| *line < block.line) {
            sections.push(text.to_string());
        }
        sections.push(match comment {
            Some(run) => format!("{}\n{}", run.text, block.text),
            None => block.text,
        });
    }
    sections.extend(loose.map(|(_, text)| text.to_string()));

    let mut text = sections.join("\n\n");
    text.push('\n');
    text
}

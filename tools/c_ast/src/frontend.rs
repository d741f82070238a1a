//! The [FrontEnd] seam and its clang implementation.

use crate::comments::comment_runs;
use crate::convert::{Conversion, convert};
use crate::macros::{MacroDefinition, scan_macros};
use crate::raw::{Origin, ParseError, RawKind, RawNode};
use crate::{Clang, ParsedUnit};
use h2d_core::Location;
use h2d_core::config::{Config, Language, unknown_field_warning};
use ingest_header::HeaderSet;
use regex::Regex;
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use std::io::{self, BufReader, Read, Seek};
use std::process::{Command, ExitStatus, Stdio};
use std::sync::LazyLock;
use thiserror::Error;
use tracing::{debug, info};

/// A C/Objective-C parser that can turn a [HeaderSet] into a [ParsedUnit].
pub trait FrontEnd: Send {
    /// Parses the entry header of `headers`. Syntax errors are returned in
    /// [ParsedUnit::errors]; an `Err` means no usable result was produced at all.
    fn parse(&self, headers: &HeaderSet, language: Language) -> Result<ParsedUnit, FrontEndError>;
}

#[derive(Debug, Error)]
pub enum FrontEndError {
    #[error("failed to run {program}: {source}")]
    Spawn { program: String, source: io::Error },

    #[error("{program} produced no AST ({status}): {stderr}")]
    NoAst {
        program: String,
        status: ExitStatus,
        stderr: String,
    },

    #[error("malformed AST dump: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid [tools.c_ast] configuration: {0}")]
    Config(serde_json::Error),

    #[error(transparent)]
    Io(#[from] io::Error),
}

/// The `[tools.c_ast]` configuration table.
#[derive(Debug, Deserialize)]
pub struct ClangConfig {
    /// The clang binary to run.
    #[serde(default = "default_clang")]
    pub clang: String,

    /// Arguments added to every clang invocation, before the entry header.
    #[serde(default)]
    pub extra_args: Vec<String>,

    #[serde(flatten)]
    pub unknown: HashMap<String, Value>,
}

fn default_clang() -> String {
    "clang".into()
}

impl Default for ClangConfig {
    fn default() -> Self {
        ClangConfig {
            clang: default_clang(),
            extra_args: Vec::new(),
            unknown: HashMap::new(),
        }
    }
}

impl ClangConfig {
    pub fn from_value(value: &Value) -> Result<ClangConfig, FrontEndError> {
        if value.is_null() {
            return Ok(ClangConfig::default());
        }
        let config: ClangConfig =
            serde_json::from_value(value.clone()).map_err(FrontEndError::Config)?;
        unknown_field_warning("tools.c_ast", &config.unknown);
        Ok(config)
    }
}

/// Runs the `clang` binary twice: once for the JSON AST dump and once with `-E -dD` for the
/// macro definitions.
pub struct ClangFrontEnd {
    config: ClangConfig,
}

impl ClangFrontEnd {
    pub fn new(config: ClangConfig) -> ClangFrontEnd {
        ClangFrontEnd { config }
    }

    pub fn from_config(config: &Config) -> Result<ClangFrontEnd, FrontEndError> {
        Ok(ClangFrontEnd::new(ClangConfig::from_value(
            config.tool("c_ast"),
        )?))
    }

    fn command(&self, headers: &HeaderSet, language: Language) -> Command {
        let mut command = Command::new(&self.config.clang);
        command.args(["-x", language_arg(language)]);
        command.args(headers.include_paths.iter().map(|p| format!("-I{}", p.display())));
        command.args(headers.defines.iter().map(|d| format!("-D{d}")));
        command.args(&self.config.extra_args);
        command
    }

    fn spawn_error(&self, source: io::Error) -> FrontEndError {
        FrontEndError::Spawn {
            program: self.config.clang.clone(),
            source,
        }
    }

    /// Runs the AST dump. Returns the AST (if any) and clang's diagnostics output.
    fn dump_ast(
        &self,
        headers: &HeaderSet,
        language: Language,
    ) -> Result<(Option<clang_ast::Node<Clang>>, ExitStatus, String), FrontEndError> {
        // stderr goes to a file so that a chatty clang cannot block on a full pipe while we
        // are reading stdout.
        let mut stderr_file = tempfile::tempfile()?;
        let mut command = self.command(headers, language);
        command
            .args(["-fsyntax-only", "-Xclang", "-ast-dump=json"])
            .arg(&headers.entry().path)
            .stdout(Stdio::piped())
            .stderr(stderr_file.try_clone()?);
        debug!("Running {command:?}");
        let mut clang = command.spawn().map_err(|e| self.spawn_error(e))?;
        let ast = match clang.stdout.take() {
            Some(stdout) => serde_json::from_reader(BufReader::new(stdout)),
            None => return Err(io::Error::other("clang stdout was not captured").into()),
        };
        let status = clang.wait()?;
        let mut stderr = String::new();
        stderr_file.rewind()?;
        stderr_file.read_to_string(&mut stderr)?;
        match ast {
            Ok(ast) => Ok((Some(ast), status, stderr)),
            Err(_) if !status.success() => Ok((None, status, stderr)),
            Err(e) => Err(e.into()),
        }
    }

    fn preprocess(&self, headers: &HeaderSet, language: Language) -> Result<String, FrontEndError> {
        let mut command = self.command(headers, language);
        command
            .args(["-E", "-dD"])
            .arg(&headers.entry().path)
            .stderr(Stdio::null());
        debug!("Running {command:?}");
        let output = command.output().map_err(|e| self.spawn_error(e))?;
        if !output.status.success() {
            debug!("Preprocessor exited with {}", output.status);
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

impl FrontEnd for ClangFrontEnd {
    fn parse(&self, headers: &HeaderSet, language: Language) -> Result<ParsedUnit, FrontEndError> {
        let main_file = headers.entry().path.display().to_string();
        let (ast, status, stderr) = self.dump_ast(headers, language)?;
        let Some(ast) = ast else {
            return Err(FrontEndError::NoAst {
                program: self.config.clang.clone(),
                status,
                stderr: stderr.trim().to_string(),
            });
        };
        let conversion = convert(&ast, &main_file, headers);
        let macros = scan_macros(&self.preprocess(headers, language)?, &main_file);
        info!(
            "clang produced {} declarations and {} macros",
            conversion.nodes.len(),
            macros.len()
        );
        let mut unit = assemble(main_file, conversion, macros, diagnostics(&stderr));
        unit.comments = comment_runs(&headers.entry().text);
        Ok(unit)
    }
}

fn language_arg(language: Language) -> &'static str {
    match language {
        Language::C => "c-header",
        Language::ObjectiveC => "objective-c-header",
    }
}

static DIAGNOSTIC: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(.+?):(\d+):(\d+): (fatal error|error|warning|note): (.*)$")
        .expect("diagnostic pattern is valid")
});

/// Extracts the errors from clang's diagnostic output. Warnings and notes are only logged.
pub(crate) fn diagnostics(stderr: &str) -> Vec<ParseError> {
    stderr
        .lines()
        .filter_map(|line| {
            let captures = DIAGNOSTIC.captures(line)?;
            let location = Location::new(
                &captures[1],
                captures[2].parse().ok()?,
                captures[3].parse().ok()?,
            );
            match &captures[4] {
                "error" | "fatal error" => Some(ParseError {
                    location,
                    message: captures[5].to_string(),
                }),
                severity => {
                    debug!("clang {severity} at {location}: {}", &captures[5]);
                    None
                }
            }
        })
        .collect()
}

/// Combines the front end's outputs into one [ParsedUnit]. Included declarations keep the
/// front end's order and come first; the entry header's declarations and macros follow, sorted
/// by position.
pub(crate) fn assemble(
    main_file: String,
    conversion: Conversion,
    macros: Vec<MacroDefinition>,
    mut errors: Vec<ParseError>,
) -> ParsedUnit {
    for invalid in conversion.invalid {
        let reported = errors.iter().any(|e| {
            e.location.file == invalid.location.file && e.location.line == invalid.location.line
        });
        if !reported {
            errors.push(invalid);
        }
    }

    let (mut nodes, mut main): (Vec<_>, Vec<_>) = conversion
        .nodes
        .into_iter()
        .partition(|n| n.origin == Origin::Included);
    main.extend(macros.into_iter().map(|m| RawNode {
        begin_line: m.location.line,
        end_line: m.location.line,
        location: m.location,
        kind: RawKind::Macro(m.definition),
        origin: Origin::Main,
    }));
    main.sort_by_key(|n| (n.location.line, n.location.column));
    nodes.extend(main);

    ParsedUnit {
        main_file,
        nodes,
        comments: Vec::new(),
        errors,
    }
}

//! Translates a C or Objective-C header into a D module. This is normally used through the
//! `h2d` binary, but is exposed as a library crate as well.
//!
//! A run is a fixed pipeline of tools, executed by the [scheduler] in dependency order on the
//! calling thread: `ingest_header` loads the headers, `parse_to_ast` runs the front end,
//! `build_model` builds the declaration model and `emit_d` renders the module, which is then
//! written to the output path.

pub mod cli;
mod runner;
mod scheduler;

use c_ast::{ClangFrontEnd, FrontEnd, FrontEndError, ParseToAst};
use decl_model::BuildModel;
use emit_d::{DModule, EmitD};
use h2d_core::config::Config;
use h2d_core::diagnostics::{Collector, Warning};
use h2d_core::{Representation, TranslationIR};
use ingest_header::{IngestHeader, SearchPath};
use runner::ToolRunner;
use scheduler::Scheduler;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info, warn};

/// Fatal errors of a run. Nothing is written when one occurs.
#[derive(Debug, Error)]
pub enum TranslateError {
    #[error(transparent)]
    FrontEnd(#[from] FrontEndError),

    #[error("{tool} failed: {error}")]
    ToolFailed {
        tool: &'static str,
        error: Box<dyn std::error::Error>,
    },

    #[error("{tool} panicked: {message}")]
    ToolPanicked { tool: &'static str, message: String },

    #[error("tools {0:?} are waiting on inputs that are never produced")]
    Unschedulable(Vec<&'static str>),

    #[error("no D module was produced")]
    NoOutput,

    #[error("failed to write {}: {source}", path.display())]
    Write { path: PathBuf, source: io::Error },
}

impl TranslateError {
    /// The error returned by the failing tool, if a tool failed.
    pub fn tool_error(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            TranslateError::ToolFailed { error, .. } => Some(&**error),
            _ => None,
        }
    }
}

/// The result of a successful run.
#[derive(Debug)]
pub struct Translation {
    /// Where the D module was written.
    pub output: PathBuf,
    /// Everything non-fatal reported during the run, in the order it was reported.
    pub warnings: Vec<Warning>,
}

/// Translates `config.input` with the clang front end.
pub fn transpile(config: Arc<Config>) -> Result<Translation, TranslateError> {
    let front_end = ClangFrontEnd::from_config(&config)?;
    transpile_with(config, Box::new(front_end))
}

/// Translates `config.input` with the given front end.
pub fn transpile_with(
    config: Arc<Config>,
    front_end: Box<dyn FrontEnd>,
) -> Result<Translation, TranslateError> {
    // Basic tool setup
    let collector = Collector::default();
    let mut ir = TranslationIR::default();
    let mut runner = ToolRunner::new(collector.reporter());
    let mut scheduler = Scheduler::default();

    // Setup a schedule for the translation.
    let search = SearchPath {
        include_paths: config.include_paths.clone(),
        defines: config.defines.clone(),
        language: config.language(),
    };
    let headers = scheduler.queue(IngestHeader::new(&config.input, search));
    let ast = scheduler.queue_after(ParseToAst::new(front_end), &[headers]);
    let model = scheduler.queue_after(BuildModel, &[ast]);
    let module = scheduler.queue_after(EmitD, &[model]);

    // Run until all tasks are complete, respecting the dependencies declared in `queue_after`
    if let Err(e) = scheduler.run_all(&mut runner, &mut ir, config.clone()) {
        error!("Error during translation: {e}");
        return Err(e);
    }
    let module = ir.get::<DModule>(module).ok_or(TranslateError::NoOutput)?;
    module
        .materialize(&module.path)
        .map_err(|source| TranslateError::Write {
            path: module.path.clone(),
            source,
        })?;

    let warnings = collector.diagnostics().warnings;
    for warning in &warnings {
        warn!("{warning}");
    }
    info!(
        "Wrote {} with {} warning(s)",
        module.path.display(),
        warnings.len()
    );
    Ok(Translation {
        output: module.path.clone(),
        warnings,
    })
}

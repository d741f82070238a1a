//! Diagnostics for a translation run.
//!
//! Fatal problems are returned as errors by the tool that hit them. Everything else (a
//! declaration that failed to parse, a construct D cannot express, an unresolved type) is a
//! [Warning]: tools report it through their [ToolReporter], the [Collector] accumulates it,
//! and the run continues. The caller retrieves the warnings once the run is complete.

#[cfg(test)]
mod tests;

use crate::tools::Tool;
use crate::{Location, TranslationIR};
use std::fmt::{self, Display};
use std::sync::{Arc, Mutex, MutexGuard};
use thiserror::Error;
use tracing::{debug, error, trace};
use tracing_subscriber::EnvFilter;

/// A non-fatal problem found while translating. The declaration it concerns is either omitted
/// from the output or emitted in a degraded form.
#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub enum Warning {
    /// The front end could not parse a declaration. The declaration is omitted.
    #[error("{location}: parse error: {message}")]
    ParseError { location: Location, message: String },

    /// A declaration uses a construct that has no D translation. The declaration is omitted.
    #[error("{location}: cannot translate {name}: {reason}")]
    UnsupportedConstruct {
        location: Location,
        name: String,
        reason: String,
    },

    /// A macro whose body is not a literal constant. The macro is omitted.
    #[error("{location}: macro {name} is not a literal constant")]
    UnsupportedMacro { location: Location, name: String },

    /// A type name that does not resolve to any declaration. It is emitted as an external
    /// reference.
    #[error("{location}: unresolved type reference {name}")]
    UnresolvedTypeReference { location: Location, name: String },
}

impl Warning {
    pub fn location(&self) -> &Location {
        match self {
            Warning::ParseError { location, .. }
            | Warning::UnsupportedConstruct { location, .. }
            | Warning::UnsupportedMacro { location, .. }
            | Warning::UnresolvedTypeReference { location, .. } => location,
        }
    }
}

/// Everything reported during a run, in the order it was reported.
#[derive(Debug, Default)]
pub struct Diagnostics {
    pub warnings: Vec<Warning>,
}

/// Accumulates warnings reported by every tool in a run.
#[derive(Default)]
pub struct Collector {
    warnings: Arc<Mutex<Vec<Warning>>>,
}

impl Collector {
    /// Returns a new handle through which diagnostics can be reported to this collector.
    pub fn reporter(&self) -> Reporter {
        Reporter {
            warnings: self.warnings.clone(),
        }
    }

    /// Returns what has been reported so far.
    pub fn diagnostics(&self) -> Diagnostics {
        Diagnostics {
            warnings: lock(&self.warnings).clone(),
        }
    }
}

/// Handle used by the runner to report on tool runs.
#[derive(Clone)]
pub struct Reporter {
    warnings: Arc<Mutex<Vec<Warning>>>,
}

impl Reporter {
    /// Called when a tool is about to run. Returns the reporter handed to that tool.
    pub fn start_tool_run(&self, tool: &dyn Tool) -> ToolReporter {
        debug!("Starting tool {}", tool.name());
        ToolReporter {
            tool: tool.name(),
            warnings: self.warnings.clone(),
        }
    }

    /// Called every time a representation is added to the IR.
    pub fn report_ir_version(&self, version: u64, ir: &TranslationIR) {
        trace!(
            "IR version {version}: {:?}",
            ir.iter()
                .map(|(id, r)| format!("{id} {}", r.name()))
                .collect::<Vec<_>>()
        );
    }
}

/// Handle through which a running tool reports warnings.
#[derive(Clone)]
pub struct ToolReporter {
    tool: &'static str,
    warnings: Arc<Mutex<Vec<Warning>>>,
}

impl ToolReporter {
    /// Records a non-fatal problem.
    pub fn warn(&self, warning: Warning) {
        debug!("{}: {warning}", self.tool);
        lock(&self.warnings).push(warning);
    }

    /// Identifies this tool run in log messages.
    pub fn tool_run(&self) -> ToolRun {
        ToolRun { tool: self.tool }
    }
}

/// Display adapter naming a tool run.
pub struct ToolRun {
    tool: &'static str,
}

impl Display for ToolRun {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.tool)
    }
}

fn lock(warnings: &Mutex<Vec<Warning>>) -> MutexGuard<'_, Vec<Warning>> {
    warnings.lock().unwrap_or_else(|e| {
        error!("diagnostics warnings poisoned");
        warnings.clear_poison();
        e.into_inner()
    })
}

/// Installs the global `tracing` subscriber. Logs go to stderr so they never mix with
/// generated output. `RUST_LOG` takes precedence over `verbose`.
pub fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

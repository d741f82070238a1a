//! Individual tools (and their interfaces) used by h2d to translate headers to D.

use crate::config::Config;
use crate::diagnostics::ToolReporter;
use crate::{Id, Representation, TranslationIR};
use std::sync::Arc;

/// Trait implemented by each pipeline stage. Used by the scheduler to decide what tools to run
/// and to manage those tools.
///
/// An instance of Tool represents a particular invocation of that tool (i.e. certain arguments
/// and a certain initial IR state). The tool's constructor does not appear in the Tool trait,
/// because at the time the scheduler constructs the tool it is aware of the tool's concrete
/// type.
pub trait Tool: Send + 'static {
    /// This tool's name. Should be snake case, as it is also the key of the tool's
    /// configuration table (`[tools.<name>]`).
    fn name(&self) -> &'static str;

    /// Runs the tool logic. `inputs` are the ids of the representations this invocation was
    /// queued after, in the order they were given.
    ///
    /// If `Ok` is returned the representation is added to the IR. An `Err` is fatal for the
    /// whole run.
    fn run(
        self: Box<Self>,
        context: RunContext,
        inputs: Vec<Id>,
    ) -> Result<Box<dyn Representation>, Box<dyn std::error::Error>>;
}

/// Context a tool is provided when it is running. The tool uses this context to read the IR,
/// read its configuration and report warnings.
#[non_exhaustive]
pub struct RunContext {
    /// Read access to the IR.
    pub ir_snapshot: Arc<TranslationIR>,

    /// Configuration for the current run.
    pub config: Arc<Config>,

    /// Handle through which to report non-fatal diagnostics.
    pub reporter: ToolReporter,
}

impl RunContext {
    /// Creates a new RunContext.
    pub fn new(
        ir_snapshot: Arc<TranslationIR>,
        config: Arc<Config>,
        reporter: ToolReporter,
    ) -> RunContext {
        RunContext {
            ir_snapshot,
            config,
            reporter,
        }
    }

    /// Returns the representation of type `R` produced by the invocation `id`, or an error
    /// naming the missing representation.
    pub fn input<R: Representation>(
        &self,
        id: Id,
        what: &str,
    ) -> Result<&R, Box<dyn std::error::Error>> {
        self.ir_snapshot
            .get::<R>(id)
            .ok_or_else(|| format!("No {what} representation found in IR").into())
    }
}

use crate::TranslateError;
use h2d_core::config::Config;
use h2d_core::diagnostics::Reporter;
use h2d_core::tools::{RunContext, Tool};
use h2d_core::{Id, TranslationIR};
use std::any::Any;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use tracing::{error, info, trace};

/// Runs tools one at a time on the calling thread and stores their results in the IR.
pub struct ToolRunner {
    // IR version number. The version start at 0 and increments by 1 every time a
    // representation is added.
    ir_version: u64,
    reporter: Reporter,
}

impl ToolRunner {
    /// Creates a new ToolRunner.
    pub fn new(reporter: Reporter) -> ToolRunner {
        ToolRunner {
            ir_version: 0,
            reporter,
        }
    }

    /// Runs `tool` against a snapshot of `ir` and adds its result under `id`. A tool that
    /// fails or panics leaves the IR unchanged and ends the run.
    pub fn run_tool(
        &mut self,
        tool: Box<dyn Tool>,
        ir: &mut TranslationIR,
        config: Arc<Config>,
        tool_inputs: Vec<Id>,
        id: Id,
    ) -> Result<(), TranslateError> {
        let name = tool.name();
        let tool_reporter = self.reporter.start_tool_run(&*tool);
        let tool_run = tool_reporter.tool_run();
        let context = RunContext::new(Arc::new(ir.clone()), config, tool_reporter);
        // Tool::run is not necessarily unwind safe. Nothing the tool can reach outlives this
        // call except the diagnostics, which recover from poisoning.
        let result = catch_unwind(AssertUnwindSafe(|| tool.run(context, tool_inputs)));
        let representation = match result {
            Err(payload) => {
                let message = panic_message(&*payload);
                error!("Tool run {tool_run} panicked: {message}");
                return Err(TranslateError::ToolPanicked {
                    tool: name,
                    message,
                });
            }
            Ok(Err(tool_error)) => {
                error!("Tool run {tool_run} failed: {tool_error}");
                return Err(TranslateError::ToolFailed {
                    tool: name,
                    error: tool_error,
                });
            }
            Ok(Ok(representation)) => representation,
        };
        info!("Tool run {tool_run} succeeded");
        self.ir_version += 1;
        // Need to add new representation before reporting IR version, so that reporter can see
        // it.
        ir.insert_representation(id, representation);
        self.reporter.report_ir_version(self.ir_version, ir);
        trace!("IR keys: {:?}", ir.iter().map(|(id, _)| id).collect::<Vec<_>>());
        Ok(())
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        return message.to_string();
    }
    match payload.downcast_ref::<String>() {
        Some(message) => message.clone(),
        None => "unknown panic payload".into(),
    }
}

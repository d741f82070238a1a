//! # h2d_translate scheduler
//!
//! The scheduler is responsible for determining which tools to invoke and also
//! for invoking them.

use crate::TranslateError;
use crate::runner::ToolRunner;
use h2d_core::config::Config;
use h2d_core::tools::Tool;
use h2d_core::{Id, TranslationIR};
use std::mem::take;
use std::sync::Arc;
use tracing::{debug, info};

#[derive(Default)]
pub struct Scheduler {
    queued_invocations: Vec<(Id, Vec<Id>, Box<dyn Tool>)>,
}

impl Scheduler {
    /// Runs all queued tool invocations, one at a time, until the queue is empty.
    ///
    /// Each pass over the queue runs every invocation whose inputs are in the IR, in queue
    /// order, and defers the rest. Because a tool invocation can only name inputs that were
    /// queued before it, the order of `queue_after` calls is a topological order and a single
    /// pass normally suffices. The first failing tool ends the run; later invocations are
    /// dropped.
    pub fn run_all(
        &mut self,
        runner: &mut ToolRunner,
        ir: &mut TranslationIR,
        config: Arc<Config>,
    ) -> Result<(), TranslateError> {
        while !self.queued_invocations.is_empty() {
            let mut progressed = false;
            for (id, inputs, tool) in take(&mut self.queued_invocations) {
                // Inputs are ready when they are all in the IR.
                // If this is not true, return it to queue and try later.
                let inputs_ready = inputs.iter().all(|&input_id| ir.contains_id(input_id));
                if !inputs_ready {
                    debug!(
                        "Deferring tool {} because inputs {:?} are not ready",
                        tool.name(),
                        inputs
                    );
                    self.queued_invocations.push((id, inputs, tool));
                    continue;
                }
                let name = tool.name();
                info!("Running tool {name}");
                if let Err(e) = runner.run_tool(tool, ir, config.clone(), inputs, id) {
                    self.queued_invocations.clear();
                    return Err(e);
                }
                progressed = true;
            }
            if !progressed {
                let stuck = take(&mut self.queued_invocations)
                    .into_iter()
                    .map(|(_, _, tool)| tool.name())
                    .collect();
                return Err(TranslateError::Unschedulable(stuck));
            }
        }
        Ok(())
    }

    /// Add a tool invocation (with no dependencies) to the scheduler's queue.
    pub fn queue<T: Tool>(&mut self, invocation: T) -> Id {
        self.queue_after(invocation, &[])
    }

    /// Add a tool invocation to the scheduler's queue.
    /// Only run this tool after the given inputs are available in the IR.
    pub fn queue_after<T: Tool>(&mut self, invocation: T, inputs: &[Id]) -> Id {
        let id = Id::new(); // Reserve an ID for this tool's result
        self.queued_invocations
            .push((id, inputs.to_vec(), Box::new(invocation)));
        id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use h2d_core::diagnostics::Collector;
    use h2d_core::test_util::{MockRepresentation, MockTool};
    use std::sync::Mutex;

    fn setup() -> (Arc<Config>, Collector, TranslationIR) {
        (
            Arc::new(Config::mock()),
            Collector::default(),
            TranslationIR::default(),
        )
    }

    #[test]
    fn run_to_completion() -> Result<(), Box<dyn std::error::Error>> {
        let (config, collector, mut ir) = setup();
        let mut runner = ToolRunner::new(collector.reporter());
        let order = Arc::new(Mutex::new(Vec::new()));
        let recorder = |name: &'static str| {
            let order = order.clone();
            MockTool::new().name(name).run(move |_, inputs| {
                order.lock().unwrap().push((name, inputs.len()));
                Ok(Box::new(MockRepresentation))
            })
        };

        let mut scheduler = Scheduler::default();
        let a_id = scheduler.queue(recorder("a"));
        let b_id = scheduler.queue_after(recorder("b"), &[a_id]);
        let _c_id = scheduler.queue_after(recorder("c"), &[a_id, b_id]);
        scheduler.run_all(&mut runner, &mut ir, config.clone())?;

        // Ensure every tool ran, in dependency order, with its inputs.
        assert!(scheduler.queued_invocations.is_empty());
        assert_eq!(*order.lock().unwrap(), [("a", 0), ("b", 1), ("c", 2)]);
        let representations = ir
            .get_by_representation::<MockRepresentation>()
            .map(|(_, r)| r)
            .collect::<Vec<_>>();
        assert!(representations.len() == 3);
        Ok(())
    }

    #[test]
    fn first_failure_stops_the_run() {
        let (config, collector, mut ir) = setup();
        let mut runner = ToolRunner::new(collector.reporter());
        let mut scheduler = Scheduler::default();
        let a_id = scheduler.queue(
            MockTool::new()
                .name("a")
                .run(|_, _| Err("input missing".into())),
        );
        scheduler.queue_after(
            MockTool::new()
                .name("b")
                .run(|_, _| panic!("b must not run")),
            &[a_id],
        );
        let result = scheduler.run_all(&mut runner, &mut ir, config);
        assert!(matches!(
            result,
            Err(TranslateError::ToolFailed { tool: "a", .. })
        ));
        assert_eq!(ir.iter().count(), 0);
        assert!(scheduler.queued_invocations.is_empty());
    }

    #[test]
    fn missing_input_is_unschedulable() {
        let (config, collector, mut ir) = setup();
        let mut runner = ToolRunner::new(collector.reporter());
        let mut scheduler = Scheduler::default();
        scheduler.queue_after(MockTool::new().name("orphan"), &[Id::new()]);
        let result = scheduler.run_all(&mut runner, &mut ir, config);
        assert!(matches!(
            result,
            Err(TranslateError::Unschedulable(tools)) if tools == ["orphan"]
        ));
    }
}

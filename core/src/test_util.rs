//! Helpers shared by the tests of every crate in the workspace.

use crate::config::Config;
use crate::diagnostics::Collector;
use crate::tools::{RunContext, Tool};
use crate::{Id, Representation, TranslationIR};
use std::error::Error;
use std::fmt::{self, Display};
use std::sync::Arc;

/// Returns a new temporary directory that only the current user can access.
#[cfg(not(miri))]
pub fn tempdir() -> std::io::Result<tempfile::TempDir> {
    let mut builder = tempfile::Builder::new();
    #[cfg(unix)]
    {
        use std::fs::Permissions;
        use std::os::unix::fs::PermissionsExt;
        builder.permissions(Permissions::from_mode(0o700));
    }
    builder.tempdir()
}

/// Builds the context a tool sees when the scheduler runs it against `ir`. The returned
/// collector receives whatever the tool warns about.
pub fn run_context(ir: TranslationIR, config: Config) -> (RunContext, Collector) {
    let collector = Collector::default();
    let reporter = collector.reporter().start_tool_run(&MockTool::new());
    let context = RunContext::new(Arc::new(ir), Arc::new(config), reporter);
    (context, collector)
}

type RunFn =
    Box<dyn FnOnce(RunContext, Vec<Id>) -> Result<Box<dyn Representation>, Box<dyn Error>> + Send>;

/// A tool whose name and behavior are set by the test. By default it is named `mock_tool` and
/// returns a [MockRepresentation].
///
/// # Example
/// ```
/// use h2d_core::test_util::{MockTool, MockRepresentation};
/// let tool = MockTool::new()
///     .name("loader")
///     .run(|_, _| Ok(Box::new(MockRepresentation)));
/// ```
pub struct MockTool {
    name: &'static str,
    run: Option<RunFn>,
}

impl Default for MockTool {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg_attr(miri, allow(unused))]
impl MockTool {
    pub fn new() -> MockTool {
        MockTool {
            name: "mock_tool",
            run: None,
        }
    }

    /// Returns this MockTool in a box. For use when a `Box<dyn Tool>` is needed.
    pub fn boxed(self) -> Box<MockTool> {
        self.into()
    }

    pub fn name(self, name: &'static str) -> MockTool {
        MockTool { name, ..self }
    }

    /// Replaces the body of `Tool::run`.
    pub fn run<F>(self, f: F) -> MockTool
    where
        F: FnOnce(RunContext, Vec<Id>) -> Result<Box<dyn Representation>, Box<dyn Error>>
            + Send
            + 'static,
    {
        MockTool {
            run: Some(Box::new(f)),
            ..self
        }
    }
}

impl Tool for MockTool {
    fn name(&self) -> &'static str {
        self.name
    }

    fn run(
        self: Box<Self>,
        context: RunContext,
        inputs: Vec<Id>,
    ) -> Result<Box<dyn Representation>, Box<dyn Error>> {
        match self.run {
            Some(run) => run(context, inputs),
            None => Ok(Box::new(MockRepresentation)),
        }
    }
}

/// A representation with no content.
pub struct MockRepresentation;

impl Representation for MockRepresentation {
    fn name(&self) -> &'static str {
        "mock_representation"
    }
}

impl Display for MockRepresentation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MockRepresentation")
    }
}

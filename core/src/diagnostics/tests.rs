use super::*;
use crate::test_util::MockTool;

fn macro_warning(name: &str) -> Warning {
    Warning::UnsupportedMacro {
        location: Location::new("a.h", 2, 9),
        name: name.into(),
    }
}

#[test]
fn warnings_are_collected_in_order() {
    let collector = Collector::default();
    let reporter = collector.reporter();
    let tool = MockTool::new().name("first");
    let first = reporter.start_tool_run(&tool);
    let second = reporter.start_tool_run(&MockTool::new().name("second"));
    first.warn(macro_warning("A"));
    second.warn(macro_warning("B"));
    first.warn(macro_warning("C"));
    let names: Vec<_> = collector
        .diagnostics()
        .warnings
        .into_iter()
        .map(|w| match w {
            Warning::UnsupportedMacro { name, .. } => name,
            other => panic!("unexpected warning {other:?}"),
        })
        .collect();
    assert_eq!(names, ["A", "B", "C"]);
}

#[test]
fn warning_display_includes_location() {
    assert_eq!(
        macro_warning("SQUARE").to_string(),
        "a.h:2:9: macro SQUARE is not a literal constant"
    );
    let warning = Warning::UnresolvedTypeReference {
        location: Location::new("b.h", 7, 1),
        name: "Bar".into(),
    };
    assert_eq!(warning.location(), &Location::new("b.h", 7, 1));
}

#[test]
fn tool_run_names_the_tool() {
    let collector = Collector::default();
    let tool_reporter = collector
        .reporter()
        .start_tool_run(&MockTool::new().name("emit_d"));
    assert_eq!(tool_reporter.tool_run().to_string(), "emit_d");
}

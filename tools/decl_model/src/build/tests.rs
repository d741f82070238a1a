use super::*;
use crate::types::Primitive;
use c_ast::{RawEnumConstant, RawField, RawProperty, RawVariable, RecordTag};

fn at(line: u32, column: u32) -> Location {
    Location::new("a.h", line, column)
}

fn node(kind: RawKind, location: Location) -> RawNode {
    RawNode {
        kind,
        begin_line: location.line,
        end_line: location.line,
        location,
        origin: Origin::Main,
    }
}

fn included(kind: RawKind, file: &str) -> RawNode {
    RawNode {
        kind,
        location: Location::new(file, 1, 1),
        begin_line: 1,
        end_line: 1,
        origin: Origin::Included,
    }
}

fn field(name: Option<&str>, ty: &str, location: Location) -> RawMember {
    RawMember::Field(RawField {
        name: name.map(Into::into),
        ty: ty.into(),
        bit_width: None,
        location,
    })
}

fn bitfield(name: &str, width: u32) -> RawMember {
    RawMember::Field(RawField {
        name: Some(name.into()),
        ty: "unsigned int".into(),
        bit_width: Some(width),
        location: at(1, 1),
    })
}

fn record(name: Option<&str>, tag: RecordTag, members: Vec<RawMember>) -> RawKind {
    RawKind::Record(RawRecord {
        name: name.map(Into::into),
        tag,
        complete: true,
        members,
    })
}

fn forward(name: &str) -> RawKind {
    RawKind::Record(RawRecord {
        name: Some(name.into()),
        tag: RecordTag::Struct,
        complete: false,
        members: Vec::new(),
    })
}

fn typedef(name: &str, ty: &str) -> RawKind {
    RawKind::Typedef {
        name: name.into(),
        ty: ty.into(),
    }
}

fn variable(name: &str, ty: &str, storage: Storage) -> RawKind {
    RawKind::Variable(RawVariable {
        name: name.into(),
        ty: ty.into(),
        storage,
    })
}

fn function(name: &str, ty: &str, params: &[(&str, &str)], storage: Storage) -> RawKind {
    RawKind::Function(RawFunction {
        name: name.into(),
        ty: ty.into(),
        params: params
            .iter()
            .map(|(name, ty)| RawParam {
                name: Some(name.to_string()),
                ty: ty.to_string(),
            })
            .collect(),
        variadic: false,
        storage,
    })
}

fn define(name: &str, params: Option<&[&str]>, body: &str) -> RawKind {
    RawKind::Macro(RawMacro {
        name: name.into(),
        params: params.map(|p| p.iter().map(|s| s.to_string()).collect()),
        body: body.into(),
    })
}

fn build(nodes: Vec<RawNode>) -> Model {
    build_model(&ParsedUnit {
        main_file: "a.h".into(),
        nodes,
        ..Default::default()
    })
}

fn names(model: &Model) -> Vec<Option<&str>> {
    model
        .declarations
        .iter()
        .map(|d| d.name.as_deref())
        .collect()
}

fn local(namespace: Namespace, name: &str) -> TypeRef {
    TypeRef::Reference(Reference {
        namespace,
        name: name.into(),
        target: Target::Local,
    })
}

fn int() -> TypeRef {
    TypeRef::Primitive(Primitive::Int)
}

#[test]
fn typedef_names_anonymous_struct() {
    let model = build(vec![
        node(
            record(None, RecordTag::Struct, vec![field(Some("x"), "int", at(1, 20))]),
            at(1, 9),
        ),
        node(typedef("Point", "struct (unnamed struct at a.h:1:9)"), at(1, 27)),
        node(variable("origin", "Point", Storage::Extern), at(2, 14)),
    ]);
    assert!(model.warnings.is_empty(), "{:?}", model.warnings);
    assert_eq!(names(&model), [Some("Point"), Some("origin")]);
    assert_eq!(
        model.declarations[0].kind,
        DeclKind::Struct(Record {
            tag: RecordTag::Struct,
            members: Some(vec![Member::Field {
                name: "x".into(),
                ty: int(),
            }]),
        })
    );
    assert_eq!(
        model.declarations[1].kind,
        DeclKind::Variable(local(Namespace::Ordinary, "Point"))
    );
}

#[test]
fn typedef_names_anonymous_enum_with_its_own_name() {
    let model = build(vec![
        node(
            RawKind::Enum(RawEnum {
                name: None,
                constants: vec![RawEnumConstant {
                    name: "ON".into(),
                    value: Some("1".into()),
                }],
            }),
            at(1, 9),
        ),
        node(typedef("Mode", "enum Mode"), at(1, 30)),
    ]);
    assert_eq!(names(&model), [Some("Mode")]);
    assert!(model.warnings.is_empty());
}

#[test]
fn nested_anonymous_records() {
    let model = build(vec![node(
        record(
            Some("Outer"),
            RecordTag::Struct,
            vec![
                RawMember::Record(node(
                    record(None, RecordTag::Struct, vec![field(Some("a"), "int", at(2, 18))]),
                    at(2, 5),
                )),
                field(
                    Some("inner"),
                    "struct (unnamed struct at a.h:2:5)",
                    at(2, 25),
                ),
                RawMember::Record(node(
                    record(
                        None,
                        RecordTag::Union,
                        vec![
                            field(Some("i"), "int", at(3, 17)),
                            field(Some("f"), "float", at(3, 26)),
                        ],
                    ),
                    at(3, 5),
                )),
                field(None, "union (unnamed union at a.h:3:5)", at(3, 5)),
            ],
        ),
        at(1, 8),
    )]);
    assert!(model.warnings.is_empty(), "{:?}", model.warnings);
    let DeclKind::Struct(Record {
        members: Some(members),
        ..
    }) = &model.declarations[0].kind
    else {
        panic!("expected a struct");
    };
    assert_eq!(
        members,
        &[
            Member::Record {
                name: Some("_Inner".into()),
                record: Record {
                    tag: RecordTag::Struct,
                    members: Some(vec![Member::Field {
                        name: "a".into(),
                        ty: int(),
                    }]),
                },
            },
            Member::Field {
                name: "inner".into(),
                ty: local(Namespace::Tag, "_Inner"),
            },
            Member::Record {
                name: None,
                record: Record {
                    tag: RecordTag::Union,
                    members: Some(vec![
                        Member::Field {
                            name: "i".into(),
                            ty: int(),
                        },
                        Member::Field {
                            name: "f".into(),
                            ty: TypeRef::Primitive(Primitive::Float),
                        },
                    ]),
                },
            },
        ]
    );
}

#[test]
fn anonymous_names_from_variables_and_counters() {
    let model = build(vec![
        node(
            record(None, RecordTag::Struct, vec![field(Some("a"), "int", at(1, 16))]),
            at(1, 1),
        ),
        node(
            variable("config", "struct (unnamed struct at a.h:1:1)", Storage::None),
            at(1, 24),
        ),
        node(
            record(None, RecordTag::Struct, vec![field(Some("b"), "int", at(2, 16))]),
            at(2, 1),
        ),
        node(
            record(None, RecordTag::Union, vec![field(Some("c"), "int", at(3, 16))]),
            at(3, 1),
        ),
        node(
            RawKind::Enum(RawEnum {
                name: None,
                constants: vec![RawEnumConstant {
                    name: "A".into(),
                    value: None,
                }],
            }),
            at(4, 1),
        ),
    ]);
    assert_eq!(
        names(&model),
        [
            Some("_Config"),
            Some("config"),
            Some("_Anonymous_0"),
            Some("_Anonymous_1"),
            None
        ]
    );
    assert_eq!(
        model.declarations[1].kind,
        DeclKind::Variable(local(Namespace::Tag, "_Config"))
    );
}

#[test]
fn macros_and_their_warnings() {
    let model = build(vec![
        node(define("HEADER_H", None, ""), at(1, 1)),
        node(define("MAX", None, "100"), at(2, 1)),
        node(define("SQUARE", Some(&["x"]), "((x)*(x))"), at(3, 1)),
        node(define("SUM", None, "MAX + 1"), at(4, 1)),
    ]);
    assert_eq!(names(&model), [Some("MAX")]);
    assert_eq!(
        model.declarations[0].kind,
        DeclKind::MacroConstant("100".into())
    );
    assert_eq!(
        model.warnings,
        [
            Warning::UnsupportedMacro {
                location: at(3, 1),
                name: "SQUARE".into()
            },
            Warning::UnsupportedMacro {
                location: at(4, 1),
                name: "SUM".into()
            },
        ]
    );
}

#[test]
fn forward_declarations_and_same_name_typedefs() {
    let model = build(vec![
        node(forward("Foo"), at(1, 8)),
        node(typedef("Foo", "struct Foo"), at(2, 20)),
        node(
            record(Some("Foo"), RecordTag::Struct, vec![field(Some("x"), "int", at(3, 20))]),
            at(3, 8),
        ),
        node(forward("Handle"), at(4, 8)),
        node(forward("Handle"), at(5, 8)),
        node(typedef("HandleRef", "struct Handle *"), at(6, 23)),
    ]);
    assert!(model.warnings.is_empty(), "{:?}", model.warnings);
    assert_eq!(
        names(&model),
        [Some("Foo"), Some("Handle"), Some("HandleRef")]
    );
    assert_eq!(
        model.declarations[1].kind,
        DeclKind::Struct(Record {
            tag: RecordTag::Struct,
            members: None,
        })
    );
    assert_eq!(
        model.declarations[2].kind,
        DeclKind::Typedef(TypeRef::pointer(local(Namespace::Tag, "Handle")))
    );
}

#[test]
fn functions_variables_and_resolution() {
    let model = build(vec![
        included(typedef("Bar", "int"), "/usr/include/bar.h"),
        node(
            function(
                "use_bar",
                "Bar *(Bar, int *)",
                &[("bar", "Bar"), ("values", "int [4]")],
                Storage::None,
            ),
            at(1, 6),
        ),
        node(
            function("helper", "int (void)", &[], Storage::Static),
            at(2, 12),
        ),
        node(variable("hidden", "int", Storage::Static), at(3, 12)),
        node(variable("missing", "Missing *", Storage::Extern), at(4, 17)),
    ]);
    assert_eq!(names(&model), [Some("use_bar"), Some("missing")]);
    let bar = TypeRef::Reference(Reference {
        namespace: Namespace::Ordinary,
        name: "Bar".into(),
        target: Target::External {
            origin: "/usr/include/bar.h".into(),
        },
    });
    assert_eq!(
        model.declarations[0].kind,
        DeclKind::Function(Function {
            result: TypeRef::pointer(bar.clone()),
            params: vec![
                Param {
                    name: Some("bar".into()),
                    ty: bar,
                },
                Param {
                    name: Some("values".into()),
                    ty: TypeRef::pointer(int()),
                },
            ],
            variadic: false,
        })
    );
    assert_eq!(
        model.warnings,
        [Warning::UnresolvedTypeReference {
            location: at(4, 17),
            name: "Missing".into()
        }]
    );
}

#[test]
fn bitfields_are_grouped() {
    let model = build(vec![node(
        record(
            Some("Flags"),
            RecordTag::Struct,
            vec![
                bitfield("a", 1),
                bitfield("b", 2),
                field(Some("plain"), "int", at(4, 9)),
                bitfield("c", 3),
            ],
        ),
        at(1, 8),
    )]);
    let DeclKind::Struct(Record {
        members: Some(members),
        ..
    }) = &model.declarations[0].kind
    else {
        panic!("expected a struct");
    };
    let widths: Vec<Vec<u32>> = members
        .iter()
        .filter_map(|m| match m {
            Member::Bitfields(group) => Some(group.iter().map(|b| b.width).collect()),
            _ => None,
        })
        .collect();
    assert_eq!(widths, [vec![1, 2], vec![3]]);
    assert_eq!(members.len(), 3);
}

#[test]
fn unsupported_constructs_are_reported_and_omitted() {
    let model = build(vec![
        node(
            function(
                "on_done",
                "void (void (^)(int))",
                &[("block", "void (^)(int)")],
                Storage::None,
            ),
            at(1, 6),
        ),
        node(
            RawKind::Unsupported {
                what: "ObjCCategoryDecl".into(),
                name: Some("Extras".into()),
            },
            at(2, 12),
        ),
        node(variable("kept", "int", Storage::None), at(3, 5)),
    ]);
    assert_eq!(names(&model), [Some("kept")]);
    assert_eq!(
        model.warnings,
        [
            Warning::UnsupportedConstruct {
                location: at(1, 6),
                name: "on_done".into(),
                reason: "block types are not supported".into(),
            },
            Warning::UnsupportedConstruct {
                location: at(2, 12),
                name: "Extras".into(),
                reason: "ObjCCategoryDecl has no D translation".into(),
            },
        ]
    );
}

fn method(
    selector: &str,
    result: &str,
    params: &[(&str, &str)],
    instance: bool,
    line: u32,
) -> RawMethod {
    RawMethod {
        selector: selector.into(),
        result: result.into(),
        params: params
            .iter()
            .map(|(name, ty)| RawParam {
                name: Some(name.to_string()),
                ty: ty.to_string(),
            })
            .collect(),
        instance,
        variadic: false,
        location: at(line, 1),
    }
}

#[test]
fn objective_c_classes() {
    let ns_object = RawObjCContainer {
        name: "NSObject".into(),
        superclass: None,
        protocols: Vec::new(),
        methods: Vec::new(),
        properties: Vec::new(),
        is_definition: true,
    };
    let foo = RawObjCContainer {
        name: "Foo".into(),
        superclass: Some("NSObject".into()),
        protocols: Vec::new(),
        methods: vec![
            method("new", "instancetype", &[], false, 3),
            method(
                "performSelector:withObject:",
                "id",
                &[("aSelector", "SEL"), ("object", "id")],
                true,
                4,
            ),
            method("count", "int", &[], true, 6),
            method("new", "instancetype", &[], false, 7),
        ],
        properties: vec![
            RawProperty {
                name: "name".into(),
                ty: "const char *".into(),
                readonly: false,
                location: at(5, 1),
            },
            RawProperty {
                name: "count".into(),
                ty: "int".into(),
                readonly: true,
                location: at(6, 1),
            },
        ],
        is_definition: true,
    };
    let later = RawObjCContainer {
        name: "Later".into(),
        is_definition: false,
        ..foo.clone()
    };
    let model = build(vec![
        included(RawKind::ObjCInterface(ns_object), "/System/NSObject.h"),
        node(RawKind::ObjCInterface(later), at(1, 8)),
        node(RawKind::ObjCInterface(foo), at(2, 12)),
    ]);
    assert!(model.warnings.is_empty(), "{:?}", model.warnings);
    assert_eq!(names(&model), [Some("Foo")]);
    let DeclKind::ObjCInterface(class) = &model.declarations[0].kind else {
        panic!("expected a class");
    };
    assert_eq!(
        class.superclass.as_ref().map(|s| &s.target),
        Some(&Target::External {
            origin: "/System/NSObject.h".into()
        })
    );
    let selectors: Vec<_> = class
        .methods
        .iter()
        .map(|m| (m.selector.as_str(), m.instance))
        .collect();
    assert_eq!(
        selectors,
        [
            ("new", false),
            ("performSelector:withObject:", true),
            ("name", true),
            ("setName:", true),
            ("count", true),
        ]
    );
    assert_eq!(class.methods[0].result, local(Namespace::Ordinary, "Foo"));
    assert_eq!(class.methods[1].base_name(), "performSelector");
    assert_eq!(class.methods[3].result, TypeRef::Void);
    assert_eq!(class.methods[3].params[0].name.as_deref(), Some("name"));
}

#[test]
fn tool_reports_warnings_and_carries_the_run_settings() {
    use crate::{BuildModel, TranslationUnit};
    use h2d_core::config::{Config, Language};
    use h2d_core::test_util::run_context;
    use h2d_core::tools::Tool;
    use h2d_core::{AsAny, Id, TranslationIR};

    let id = Id::new();
    let mut ir = TranslationIR::default();
    ir.insert_representation(
        id,
        Box::new(ParsedUnit {
            main_file: "a.h".into(),
            nodes: vec![
                node(define("SQUARE", Some(&["x"]), "((x)*(x))"), at(1, 9)),
                node(define("MAX", None, "100"), at(2, 9)),
            ],
            ..Default::default()
        }),
    );
    let mut config = Config::mock();
    config.objc = true;
    config.import_prefix = Some("deps.".into());
    let (context, collector) = run_context(ir, config);
    let unit = Box::new(BuildModel).run(context, vec![id]).unwrap();
    let unit = (*unit).as_any().downcast_ref::<TranslationUnit>().unwrap();
    assert_eq!(unit.declarations.len(), 1);
    assert_eq!(unit.language, Language::ObjectiveC);
    assert_eq!(unit.import_prefix.as_deref(), Some("deps."));
    assert!(matches!(
        collector.diagnostics().warnings.as_slice(),
        [Warning::UnsupportedMacro { name, .. }] if name == "SQUARE"
    ));
}

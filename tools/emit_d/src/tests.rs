use super::*;
use c_ast::comment_runs;
use decl_model::{
    DeclKind, Declaration, Function, Method, ObjCContainer, Param, Primitive, SymbolTable,
    TypeRef,
};
use h2d_core::Location;
use h2d_core::config::Config;
use h2d_core::test_util::{run_context, tempdir};
use h2d_core::{AsAny, Id, TranslationIR};

const COMMENTS_H: &str = r#"/**
 * Header comment should keep to be header comment.
 */

/* Comment before a variable. */
int variable;

/* Loose comment */ /* Loose comment */

/*
    Multi-line loose comment.
    Multi-line loose comment.
*/ /* Loose comment */

/* Comment before a function declaration. */
int func(int a, int b);

/* Comment in some distance to the function declaration. */

int cnuf(int d, int s);

#define CINDEX_VERSION_MAJOR 0
#define CINDEX_VERSION_MINOR 34

#ifdef __cplusplus
extern "C" {
#endif

/* Comment before a typedef. */
typedef void* Typedef;

#ifdef __cplusplus
}
#endif
"#;

fn unit(declarations: Vec<Declaration>, language: Language) -> TranslationUnit {
    TranslationUnit {
        main_file: "test.h".into(),
        declarations,
        symbols: SymbolTable::default(),
        comments: Vec::new(),
        language,
        import_filter: None,
        import_prefix: None,
        include_paths: Vec::new(),
    }
}

fn at(line: u32, kind: DeclKind, name: &str) -> Declaration {
    Declaration {
        name: Some(name.into()),
        kind,
        location: Location::new("test.h", line, 1),
        begin_line: line,
        end_line: line,
    }
}

fn int() -> TypeRef {
    TypeRef::Primitive(Primitive::Int)
}

fn int_function(params: &[&str]) -> DeclKind {
    DeclKind::Function(Function {
        result: int(),
        params: params
            .iter()
            .map(|name| Param {
                name: Some(name.to_string()),
                ty: int(),
            })
            .collect(),
        variadic: false,
    })
}

#[test]
fn comments_are_preserved() {
    let mut unit = unit(
        vec![
            at(6, DeclKind::Variable(int()), "variable"),
            at(16, int_function(&["a", "b"]), "func"),
            at(20, int_function(&["d", "s"]), "cnuf"),
            at(22, DeclKind::MacroConstant("0".into()), "CINDEX_VERSION_MAJOR"),
            at(23, DeclKind::MacroConstant("34".into()), "CINDEX_VERSION_MINOR"),
            at(
                30,
                DeclKind::Typedef(TypeRef::pointer(TypeRef::Void)),
                "Typedef",
            ),
        ],
        Language::C,
    );
    unit.comments = comment_runs(COMMENTS_H);
    let text = emit(&unit, &EmitConfig::default(), Path::new("comments.d")).unwrap();
    assert_eq!(
        text,
        r#"/**
 * Header comment should keep to be header comment.
 */

extern (C):

/* Comment before a variable. */
extern __gshared int variable;

/* Loose comment */ /* Loose comment */

/*
    Multi-line loose comment.
    Multi-line loose comment.
*/ /* Loose comment */

/* Comment before a function declaration. */
int func (int a, int b);

/* Comment in some distance to the function declaration. */

int cnuf (int d, int s);

enum CINDEX_VERSION_MAJOR = 0;

enum CINDEX_VERSION_MINOR = 34;

/* Comment before a typedef. */
alias Typedef = void*;
"#
    );
}

fn class_method(selector: &str, result: TypeRef, params: Vec<Param>) -> Method {
    Method {
        selector: selector.into(),
        instance: false,
        result,
        params,
        variadic: false,
    }
}

fn instance_method(selector: &str, result: TypeRef, params: Vec<Param>) -> Method {
    Method {
        instance: true,
        ..class_method(selector, result, params)
    }
}

#[test]
fn objc_methods() {
    let id = || TypeRef::ObjCId { protocols: vec![] };
    let param = |name: &str, ty| Param {
        name: Some(name.into()),
        ty,
    };
    let foo = at(
        4,
        DeclKind::ObjCInterface(ObjCContainer {
            superclass: None,
            protocols: vec![],
            methods: vec![
                class_method("classMethod", TypeRef::Void, vec![]),
                instance_method("instanceMethod", TypeRef::Void, vec![]),
                class_method("initialize", TypeRef::Void, vec![]),
                class_method("new", id(), vec![]),
                class_method("class", TypeRef::ObjCClass, vec![]),
                instance_method("init", id(), vec![]),
                instance_method(
                    "performSelector:withObject:",
                    id(),
                    vec![param("aSelector", TypeRef::Selector), param("object", id())],
                ),
            ],
        }),
        "Foo",
    );
    let text = emit(
        &unit(vec![foo], Language::ObjectiveC),
        &EmitConfig::default(),
        Path::new("methods.d"),
    )
    .unwrap();
    assert_eq!(
        text,
        r#"extern (Objective-C):

extern class Foo
{
    static void classMethod () @selector("classMethod");
    void instanceMethod () @selector("instanceMethod");
    static void initialize () @selector("initialize");
    static id new_ () @selector("new");
    static Class class_ () @selector("class");
    id init_ () @selector("init");
    id performSelector (SEL aSelector, id object) @selector("performSelector:withObject:");
}
"#
    );
}

#[test]
fn package_names_the_module() {
    let config = EmitConfig::from_value(&serde_json::json!({
        "package": "bindings",
        "alias_enum_members": true,
    }))
    .unwrap();
    assert!(config.alias_enum_members);
    let unit = unit(vec![at(1, DeclKind::Variable(int()), "x")], Language::C);
    let text = emit(&unit, &config, Path::new("out/my-lib.d")).unwrap();
    assert!(text.starts_with("module bindings.my_lib;\n\nextern (C):\n\n"));
}

#[test]
fn bad_import_filter_is_an_error() {
    let mut unit = unit(vec![], Language::C);
    unit.import_filter = Some("(".into());
    assert!(matches!(
        emit(&unit, &EmitConfig::default(), Path::new("a.d")),
        Err(EmitError::ImportFilter(_))
    ));
    assert!(EmitConfig::from_value(&serde_json::json!({"package": 3})).is_err());
}

#[test]
fn materialize_replaces_the_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("out.d");
    std::fs::write(&path, "old").unwrap();
    let module = DModule {
        path: path.clone(),
        text: "extern (C):\n".into(),
    };
    module.materialize(&path).unwrap();
    assert_eq!(std::fs::read_to_string(&path).unwrap(), "extern (C):\n");
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
}

#[test]
fn tool_renders_the_translation_unit() {
    let id = Id::new();
    let mut ir = TranslationIR::default();
    ir.insert_representation(
        id,
        Box::new(unit(vec![at(1, DeclKind::Variable(int()), "x")], Language::C)),
    );
    let mut config = Config::mock();
    config.input = "include/x.h".into();
    config
        .tools
        .insert("emit_d".into(), serde_json::json!({"package": "c"}));
    let (context, collector) = run_context(ir, config);
    let module = Box::new(EmitD).run(context, vec![id]).unwrap();
    let module = (*module).as_any().downcast_ref::<DModule>().unwrap();
    assert_eq!(module.path, PathBuf::from("include/x.d"));
    assert_eq!(module.text, "module c.x;\n\nextern (C):\n\nextern __gshared int x;\n");
    assert!(collector.diagnostics().warnings.is_empty());
}

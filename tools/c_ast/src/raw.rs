//! Front-end-neutral declaration nodes. Types are carried as C type spellings (`const char *`,
//! `int (*)(int)`, `struct (unnamed struct at a.h:3:9)`), which every C front end can print.

use h2d_core::Location;

/// Where a node was declared.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Origin {
    /// The entry header.
    Main,
    /// A header included (directly or not) by the entry header.
    Included,
}

/// A problem the front end reported for a declaration.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ParseError {
    pub location: Location,
    pub message: String,
}

#[derive(Clone, Debug, PartialEq)]
pub struct RawNode {
    pub kind: RawKind,
    /// Where the declared name is.
    pub location: Location,
    /// First line of the declaration, for attaching comments.
    pub begin_line: u32,
    /// Last line of the declaration.
    pub end_line: u32,
    pub origin: Origin,
}

#[derive(Clone, Debug, PartialEq)]
pub enum RawKind {
    Record(RawRecord),
    Enum(RawEnum),
    Function(RawFunction),
    Typedef { name: String, ty: String },
    Variable(RawVariable),
    Macro(RawMacro),
    ObjCInterface(RawObjCContainer),
    ObjCProtocol(RawObjCContainer),
    /// A declaration kind with no counterpart in the declaration model.
    Unsupported { what: String, name: Option<String> },
}

impl RawKind {
    /// The declared name, if the declaration has one.
    pub fn name(&self) -> Option<&str> {
        match self {
            RawKind::Record(r) => r.name.as_deref(),
            RawKind::Enum(e) => e.name.as_deref(),
            RawKind::Function(f) => Some(&f.name),
            RawKind::Typedef { name, .. } => Some(name),
            RawKind::Variable(v) => Some(&v.name),
            RawKind::Macro(m) => Some(&m.name),
            RawKind::ObjCInterface(c) | RawKind::ObjCProtocol(c) => Some(&c.name),
            RawKind::Unsupported { name, .. } => name.as_deref(),
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum RecordTag {
    Struct,
    Union,
}

#[derive(Clone, Debug, PartialEq)]
pub struct RawRecord {
    pub name: Option<String>,
    pub tag: RecordTag,
    /// False for forward declarations (`struct Foo;`).
    pub complete: bool,
    pub members: Vec<RawMember>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum RawMember {
    Field(RawField),
    /// A record declared inside this one. Its RawNode kind is always `RawKind::Record`.
    Record(RawNode),
}

#[derive(Clone, Debug, PartialEq)]
pub struct RawField {
    /// `None` for anonymous struct/union members.
    pub name: Option<String>,
    pub ty: String,
    pub bit_width: Option<u32>,
    pub location: Location,
}

#[derive(Clone, Debug, PartialEq)]
pub struct RawEnum {
    pub name: Option<String>,
    pub constants: Vec<RawEnumConstant>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct RawEnumConstant {
    pub name: String,
    /// The explicit initializer's value, if the constant has one.
    pub value: Option<String>,
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum Storage {
    #[default]
    None,
    Extern,
    Static,
}

impl Storage {
    pub fn from_clang(storage_class: Option<&str>) -> Storage {
        match storage_class {
            Some("extern") => Storage::Extern,
            Some("static") => Storage::Static,
            _ => Storage::None,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct RawParam {
    pub name: Option<String>,
    pub ty: String,
}

#[derive(Clone, Debug, PartialEq)]
pub struct RawFunction {
    pub name: String,
    /// Spelling of the function type, e.g. `int (int, char *)`.
    pub ty: String,
    pub params: Vec<RawParam>,
    pub variadic: bool,
    pub storage: Storage,
}

#[derive(Clone, Debug, PartialEq)]
pub struct RawVariable {
    pub name: String,
    pub ty: String,
    pub storage: Storage,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RawMacro {
    pub name: String,
    /// Parameter names of a function-like macro; `None` for object-like macros.
    pub params: Option<Vec<String>>,
    pub body: String,
}

#[derive(Clone, Debug, PartialEq)]
pub struct RawObjCContainer {
    pub name: String,
    pub superclass: Option<String>,
    pub protocols: Vec<String>,
    pub methods: Vec<RawMethod>,
    pub properties: Vec<RawProperty>,
    /// False for `@class Foo;` / `@protocol Foo;` forward declarations.
    pub is_definition: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub struct RawMethod {
    pub selector: String,
    pub result: String,
    pub params: Vec<RawParam>,
    pub instance: bool,
    pub variadic: bool,
    pub location: Location,
}

#[derive(Clone, Debug, PartialEq)]
pub struct RawProperty {
    pub name: String,
    pub ty: String,
    pub readonly: bool,
    pub location: Location,
}

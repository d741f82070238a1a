//! The declaration model: the entry header's declarations, normalized and with every type
//! reference bound to a symbol.
//!
//! [BuildModel] turns a [ParsedUnit] into a [TranslationUnit] in two passes. The first declares
//! every type name the front end saw (from the entry header and from included headers) and
//! names anonymous types; the second builds a [Declaration] for each entry header node, in
//! source order, and resolves its type references.

mod build;
mod literal;
mod symbols;
mod types;

pub use build::{Model, build_model};
pub use c_ast::RecordTag;
pub use literal::{MacroBody, classify};
pub use symbols::{Symbol, SymbolTable};
pub use types::{
    FunctionType, Namespace, Primitive, Reference, Target, TypeError, TypeRef, parse_type,
};

use c_ast::{CommentRun, ParsedUnit};
use h2d_core::config::Language;
use h2d_core::tools::{RunContext, Tool};
use h2d_core::{Id, Location, Representation};
use std::fmt::{self, Display};
use std::path::PathBuf;
use tracing::info;

#[derive(Clone, Debug, PartialEq)]
pub struct Declaration {
    /// The D-visible name. `None` only for anonymous enums.
    pub name: Option<String>,
    pub kind: DeclKind,
    pub location: Location,
    /// First and last source line of the declaration.
    pub begin_line: u32,
    pub end_line: u32,
}

#[derive(Clone, Debug, PartialEq)]
pub enum DeclKind {
    Struct(Record),
    Enum(Enum),
    Function(Function),
    Typedef(TypeRef),
    /// An object-like macro with a literal body, spelled for D.
    MacroConstant(String),
    Variable(TypeRef),
    ObjCInterface(ObjCContainer),
    ObjCProtocol(ObjCContainer),
}

#[derive(Clone, Debug, PartialEq)]
pub struct Record {
    pub tag: RecordTag,
    /// `None` for an opaque (forward declared only) record.
    pub members: Option<Vec<Member>>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Member {
    Field {
        name: String,
        ty: TypeRef,
    },
    /// Consecutive bitfields, stored together.
    Bitfields(Vec<Bitfield>),
    /// A record defined inside this one. Unnamed records are anonymous members.
    Record {
        name: Option<String>,
        record: Record,
    },
}

#[derive(Clone, Debug, PartialEq)]
pub struct Bitfield {
    /// `None` for unnamed padding.
    pub name: Option<String>,
    pub ty: TypeRef,
    pub width: u32,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Enum {
    pub constants: Vec<EnumConstant>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct EnumConstant {
    pub name: String,
    /// The initializer as written, if there is one.
    pub value: Option<String>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Param {
    pub name: Option<String>,
    pub ty: TypeRef,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Function {
    pub result: TypeRef,
    pub params: Vec<Param>,
    pub variadic: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ObjCContainer {
    pub superclass: Option<Reference>,
    /// Adopted (for classes) or inherited (for protocols) protocols.
    pub protocols: Vec<Reference>,
    pub methods: Vec<Method>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Method {
    /// The full selector, e.g. `performSelector:withObject:`.
    pub selector: String,
    pub instance: bool,
    pub result: TypeRef,
    pub params: Vec<Param>,
    pub variadic: bool,
}

impl Method {
    /// The part of the selector before the first colon.
    pub fn base_name(&self) -> &str {
        self.selector.split(':').next().unwrap_or(&self.selector)
    }
}

/// The declaration model of one invocation.
#[derive(Debug)]
pub struct TranslationUnit {
    /// The entry header, as the front end spelled it.
    pub main_file: String,
    /// The entry header's declarations, in source order.
    pub declarations: Vec<Declaration>,
    pub symbols: SymbolTable,
    /// Comment runs of the entry header.
    pub comments: Vec<CommentRun>,
    pub language: Language,
    pub import_filter: Option<String>,
    pub import_prefix: Option<String>,
    pub include_paths: Vec<PathBuf>,
}

impl Display for TranslationUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "TranslationUnit {} ({}):", self.main_file, self.language)?;
        for declaration in &self.declarations {
            writeln!(
                f,
                "  {} {}",
                declaration.location,
                declaration.name.as_deref().unwrap_or("<anonymous>")
            )?;
        }
        Ok(())
    }
}

impl Representation for TranslationUnit {
    fn name(&self) -> &'static str {
        "translation_unit"
    }
}

/// Builds the [TranslationUnit] from the output of `parse_to_ast`.
pub struct BuildModel;

impl Tool for BuildModel {
    fn name(&self) -> &'static str {
        "build_model"
    }

    fn run(
        self: Box<Self>,
        context: RunContext,
        inputs: Vec<Id>,
    ) -> Result<Box<dyn Representation>, Box<dyn std::error::Error>> {
        let unit = context.input::<ParsedUnit>(inputs[0], "ParsedUnit")?;
        let model = build_model(unit);
        for warning in model.warnings {
            context.reporter.warn(warning);
        }
        info!(
            "Built {} declarations ({} symbols known)",
            model.declarations.len(),
            model.symbols.len()
        );
        let config = &context.config;
        Ok(Box::new(TranslationUnit {
            main_file: unit.main_file.clone(),
            declarations: model.declarations,
            symbols: model.symbols,
            comments: unit.comments.clone(),
            language: config.language(),
            import_filter: config.import_filter.clone(),
            import_prefix: config.import_prefix.clone(),
            include_paths: config.include_paths.clone(),
        }))
    }
}

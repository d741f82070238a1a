//! Front-end parse adapter. Runs a C/Objective-C front end over a [HeaderSet] and turns its
//! output into front-end-neutral [RawNode]s, collected in a [ParsedUnit] representation.
//!
//! The default front end is the `clang` binary: its JSON AST dump is deserialized with
//! `clang-ast` into the [Clang] node type below, and its `-dD` preprocessor output supplies the
//! macro definitions the AST does not contain.

mod comments;
mod convert;
mod frontend;
mod macros;
mod raw;

pub use comments::{CommentRun, comment_runs};
pub use convert::convert;
pub use frontend::{ClangConfig, ClangFrontEnd, FrontEnd, FrontEndError};
pub use macros::{MacroDefinition, scan_macros};
pub use raw::*;

use h2d_core::diagnostics::Warning;
use h2d_core::tools::{RunContext, Tool};
use h2d_core::{Id, Representation};
use ingest_header::HeaderSet;
use serde::Deserialize;
use std::fmt::{self, Display};
use tracing::info;

/// Represents a (possibly) qualified type in the Clang AST, such as `int`, `const int`, or
/// `const volatile int`.
/// Clang Docs on QualType: https://clang.llvm.org/doxygen/classclang_1_1QualType.html
#[derive(Deserialize, Debug, Clone)]
pub struct QualType {
    /// String representation of the desugared type, i.e., it will have `typedefs` and
    /// `typeofs` resolved.
    #[serde(rename = "desugaredQualType")]
    pub desugared_qual_type: Option<String>,
    /// String representation of the type as written in the source code, i.e., it may include
    /// `typedefs` and `typeofs`.
    #[serde(rename = "qualType")]
    pub qual_type: String,
}

/// Reference to another declaration, as clang embeds it in a node (`"super"`, `"protocols"`).
#[derive(Deserialize, Debug, Clone)]
pub struct DeclRef {
    pub name: Option<String>,
}

/// Represents a node in the Clang AST.
/// It only encodes the subset of Clang AST nodes that can appear in a header's declarations.
#[derive(Deserialize, Debug)]
pub enum Clang {
    TranslationUnitDecl,
    /// Clang Docs: https://clang.llvm.org/doxygen/classclang_1_1TypedefDecl.html
    TypedefDecl {
        loc: Option<clang_ast::SourceLocation>,
        range: Option<clang_ast::SourceRange>,
        name: String,
        #[serde(rename = "type")]
        qtype: QualType,
        #[serde(default, rename = "isImplicit")]
        is_implicit: bool,
        #[serde(default, rename = "isInvalid")]
        is_invalid: bool,
    },
    /// Clang Docs: https://clang.llvm.org/doxygen/classclang_1_1FunctionDecl.html
    FunctionDecl {
        loc: Option<clang_ast::SourceLocation>,
        range: Option<clang_ast::SourceRange>,
        name: String,
        #[serde(rename = "storageClass")]
        storage_class: Option<String>,
        #[serde(rename = "type")]
        qtype: QualType,
        #[serde(default)]
        variadic: bool,
        #[serde(default, rename = "isImplicit")]
        is_implicit: bool,
        #[serde(default, rename = "isInvalid")]
        is_invalid: bool,
    },
    /// Clang Docs: https://clang.llvm.org/doxygen/classclang_1_1ParmVarDecl.html
    ParmVarDecl {
        loc: Option<clang_ast::SourceLocation>,
        name: Option<String>,
        #[serde(rename = "type")]
        qtype: QualType,
    },
    /// Clang Docs: https://clang.llvm.org/doxygen/classclang_1_1RecordDecl.html
    RecordDecl {
        loc: Option<clang_ast::SourceLocation>,
        range: Option<clang_ast::SourceRange>,
        name: Option<String>,
        #[serde(rename = "tagUsed")]
        tag_used: Option<String>,
        #[serde(default, rename = "completeDefinition")]
        complete_definition: bool,
        #[serde(default, rename = "isImplicit")]
        is_implicit: bool,
        #[serde(default, rename = "isInvalid")]
        is_invalid: bool,
    },
    /// Clang Docs: https://clang.llvm.org/doxygen/classclang_1_1FieldDecl.html
    FieldDecl {
        loc: Option<clang_ast::SourceLocation>,
        name: Option<String>,
        #[serde(rename = "type")]
        qtype: QualType,
        #[serde(default, rename = "isBitfield")]
        is_bitfield: bool,
        #[serde(default, rename = "isImplicit")]
        is_implicit: bool,
    },
    /// Clang Docs: https://clang.llvm.org/doxygen/classclang_1_1EnumDecl.html
    EnumDecl {
        loc: Option<clang_ast::SourceLocation>,
        range: Option<clang_ast::SourceRange>,
        name: Option<String>,
        #[serde(default, rename = "isImplicit")]
        is_implicit: bool,
        #[serde(default, rename = "isInvalid")]
        is_invalid: bool,
    },
    /// Clang Docs: https://clang.llvm.org/doxygen/classclang_1_1EnumConstantDecl.html
    EnumConstantDecl {
        loc: Option<clang_ast::SourceLocation>,
        range: Option<clang_ast::SourceRange>,
        name: String,
    },
    /// Holds the evaluated value of enumerator initializers and bitfield widths.
    ConstantExpr { value: Option<serde_json::Value> },
    IntegerLiteral { value: Option<serde_json::Value> },
    /// Clang Docs: https://clang.llvm.org/doxygen/classclang_1_1VarDecl.html
    VarDecl {
        loc: Option<clang_ast::SourceLocation>,
        range: Option<clang_ast::SourceRange>,
        name: String,
        #[serde(rename = "type")]
        qtype: QualType,
        #[serde(rename = "storageClass")]
        storage_class: Option<String>,
        #[serde(default, rename = "isImplicit")]
        is_implicit: bool,
        #[serde(default, rename = "isInvalid")]
        is_invalid: bool,
    },
    /// Clang Docs: https://clang.llvm.org/doxygen/classclang_1_1ObjCInterfaceDecl.html
    ObjCInterfaceDecl {
        loc: Option<clang_ast::SourceLocation>,
        range: Option<clang_ast::SourceRange>,
        name: String,
        #[serde(rename = "super")]
        superclass: Option<DeclRef>,
        #[serde(default)]
        protocols: Vec<DeclRef>,
        #[serde(default, rename = "isImplicit")]
        is_implicit: bool,
        #[serde(default, rename = "isInvalid")]
        is_invalid: bool,
    },
    /// Clang Docs: https://clang.llvm.org/doxygen/classclang_1_1ObjCProtocolDecl.html
    ObjCProtocolDecl {
        loc: Option<clang_ast::SourceLocation>,
        range: Option<clang_ast::SourceRange>,
        name: String,
        #[serde(default)]
        protocols: Vec<DeclRef>,
        #[serde(default, rename = "isImplicit")]
        is_implicit: bool,
        #[serde(default, rename = "isInvalid")]
        is_invalid: bool,
    },
    /// Clang Docs: https://clang.llvm.org/doxygen/classclang_1_1ObjCMethodDecl.html
    ObjCMethodDecl {
        loc: Option<clang_ast::SourceLocation>,
        name: String,
        #[serde(rename = "returnType")]
        return_type: QualType,
        #[serde(default)]
        instance: bool,
        #[serde(default)]
        variadic: bool,
        #[serde(default, rename = "isImplicit")]
        is_implicit: bool,
    },
    /// Clang Docs: https://clang.llvm.org/doxygen/classclang_1_1ObjCPropertyDecl.html
    ObjCPropertyDecl {
        loc: Option<clang_ast::SourceLocation>,
        name: String,
        #[serde(rename = "type")]
        qtype: QualType,
        #[serde(default)]
        readonly: bool,
    },
    /// Every other node.
    Other {
        kind: Option<String>,
        name: Option<String>,
        loc: Option<clang_ast::SourceLocation>,
        range: Option<clang_ast::SourceRange>,
        #[serde(default, rename = "isImplicit")]
        is_implicit: bool,
    },
}

impl Clang {
    /// Returns the source location of this AST node, if available.
    pub fn loc(&self) -> Option<&clang_ast::SourceLocation> {
        match self {
            Clang::TranslationUnitDecl
            | Clang::ConstantExpr { .. }
            | Clang::IntegerLiteral { .. } => None,
            Clang::TypedefDecl { loc, .. }
            | Clang::FunctionDecl { loc, .. }
            | Clang::ParmVarDecl { loc, .. }
            | Clang::RecordDecl { loc, .. }
            | Clang::FieldDecl { loc, .. }
            | Clang::EnumDecl { loc, .. }
            | Clang::EnumConstantDecl { loc, .. }
            | Clang::VarDecl { loc, .. }
            | Clang::ObjCInterfaceDecl { loc, .. }
            | Clang::ObjCProtocolDecl { loc, .. }
            | Clang::ObjCMethodDecl { loc, .. }
            | Clang::ObjCPropertyDecl { loc, .. }
            | Clang::Other { loc, .. } => loc.as_ref(),
        }
    }

    /// Returns the source range of this AST node, if available.
    pub fn range(&self) -> Option<&clang_ast::SourceRange> {
        match self {
            Clang::TypedefDecl { range, .. }
            | Clang::FunctionDecl { range, .. }
            | Clang::RecordDecl { range, .. }
            | Clang::EnumDecl { range, .. }
            | Clang::EnumConstantDecl { range, .. }
            | Clang::VarDecl { range, .. }
            | Clang::ObjCInterfaceDecl { range, .. }
            | Clang::ObjCProtocolDecl { range, .. }
            | Clang::Other { range, .. } => range.as_ref(),
            _ => None,
        }
    }

    /// Returns the name of this declaration, if available.
    pub fn name(&self) -> Option<&str> {
        match self {
            Clang::TypedefDecl { name, .. }
            | Clang::FunctionDecl { name, .. }
            | Clang::EnumConstantDecl { name, .. }
            | Clang::VarDecl { name, .. }
            | Clang::ObjCInterfaceDecl { name, .. }
            | Clang::ObjCProtocolDecl { name, .. }
            | Clang::ObjCMethodDecl { name, .. }
            | Clang::ObjCPropertyDecl { name, .. } => Some(name),
            Clang::ParmVarDecl { name, .. }
            | Clang::RecordDecl { name, .. }
            | Clang::FieldDecl { name, .. }
            | Clang::EnumDecl { name, .. }
            | Clang::Other { name, .. } => name.as_deref(),
            _ => None,
        }
    }

    /// Returns true for declarations the compiler created rather than the header author.
    pub fn is_implicit(&self) -> bool {
        match self {
            Clang::TypedefDecl { is_implicit, .. }
            | Clang::FunctionDecl { is_implicit, .. }
            | Clang::RecordDecl { is_implicit, .. }
            | Clang::FieldDecl { is_implicit, .. }
            | Clang::EnumDecl { is_implicit, .. }
            | Clang::VarDecl { is_implicit, .. }
            | Clang::ObjCInterfaceDecl { is_implicit, .. }
            | Clang::ObjCProtocolDecl { is_implicit, .. }
            | Clang::ObjCMethodDecl { is_implicit, .. }
            | Clang::Other { is_implicit, .. } => *is_implicit,
            _ => false,
        }
    }

    /// Returns true for declarations the front end could not parse.
    pub fn is_invalid(&self) -> bool {
        match self {
            Clang::TypedefDecl { is_invalid, .. }
            | Clang::FunctionDecl { is_invalid, .. }
            | Clang::RecordDecl { is_invalid, .. }
            | Clang::EnumDecl { is_invalid, .. }
            | Clang::VarDecl { is_invalid, .. }
            | Clang::ObjCInterfaceDecl { is_invalid, .. }
            | Clang::ObjCProtocolDecl { is_invalid, .. } => *is_invalid,
            _ => false,
        }
    }
}

/// Everything the front end produced for one translation unit.
#[derive(Debug, Default)]
pub struct ParsedUnit {
    /// Path of the entry header, spelled the way the front end reports it in locations.
    pub main_file: String,
    /// Declarations from included headers (in front end order), followed by the entry
    /// header's declarations and macros in source order.
    pub nodes: Vec<RawNode>,
    /// Comment runs of the entry header.
    pub comments: Vec<CommentRun>,
    /// Errors reported by the front end. Each one cost at most the declaration it is in.
    pub errors: Vec<ParseError>,
}

impl ParsedUnit {
    /// Iterates over the nodes that come from the entry header, in source order.
    pub fn main_nodes(&self) -> impl Iterator<Item = &RawNode> {
        self.nodes.iter().filter(|n| n.origin == Origin::Main)
    }
}

impl Display for ParsedUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Parsed {}: {} nodes, {} errors",
            self.main_file,
            self.nodes.len(),
            self.errors.len()
        )
    }
}

impl Representation for ParsedUnit {
    fn name(&self) -> &'static str {
        "parsed_unit"
    }
}

/// Runs a [FrontEnd] over the headers loaded by `ingest_header`.
pub struct ParseToAst {
    front_end: Box<dyn FrontEnd>,
}

impl ParseToAst {
    pub fn new(front_end: Box<dyn FrontEnd>) -> ParseToAst {
        ParseToAst { front_end }
    }
}

impl Tool for ParseToAst {
    fn name(&self) -> &'static str {
        "parse_to_ast"
    }

    fn run(
        self: Box<Self>,
        context: RunContext,
        inputs: Vec<Id>,
    ) -> Result<Box<dyn Representation>, Box<dyn std::error::Error>> {
        let headers = context.input::<HeaderSet>(inputs[0], "HeaderSet")?;
        let unit = self.front_end.parse(headers, headers.language)?;
        for error in &unit.errors {
            context.reporter.warn(Warning::ParseError {
                location: error.location.clone(),
                message: error.message.clone(),
            });
        }
        info!(
            "Parsed {}: {} declarations and macros from the entry header",
            unit.main_file,
            unit.main_nodes().count()
        );
        Ok(Box::new(unit))
    }
}

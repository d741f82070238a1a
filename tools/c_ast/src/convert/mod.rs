//! Conversion from clang's AST to [RawNode]s.

use crate::raw::*;
use crate::{Clang, DeclRef};
use clang_ast::Node;
use h2d_core::Location;
use ingest_header::HeaderSet;
use std::path::Path;
use tracing::{debug, trace};

/// Top-level declaration kinds that carry nothing to bind and are dropped without a warning.
const IGNORED_KINDS: &[&str] = &[
    "EmptyDecl",
    "StaticAssertDecl",
    "PragmaCommentDecl",
    "PragmaDetectMismatchDecl",
    "ImportDecl",
    "ObjCCompatibleAliasDecl",
];

/// The result of converting a translation unit's AST.
#[derive(Debug, Default)]
pub struct Conversion {
    /// Converted top-level declarations in AST order.
    pub nodes: Vec<RawNode>,
    /// Declarations the front end marked invalid. They are not in `nodes`.
    pub invalid: Vec<ParseError>,
}

/// Converts the top-level declarations under `root` (a `TranslationUnitDecl`).
///
/// `main_file` is the entry header path as it was passed to the front end; `headers` supplies
/// source text for the few facts the JSON dump does not carry.
pub fn convert(root: &Node<Clang>, main_file: &str, headers: &HeaderSet) -> Conversion {
    let converter = Converter {
        main_file,
        main_canonical: Path::new(main_file).canonicalize().ok(),
        headers,
    };
    let mut conversion = Conversion::default();
    for child in &root.inner {
        if child.kind.is_implicit() {
            continue;
        }
        let Some((location, origin)) = converter.position(&child.kind) else {
            trace!("Skipping {:?} without a location", child.kind.name());
            continue;
        };
        if child.kind.is_invalid() {
            debug!("Dropping invalid declaration at {location}");
            conversion.invalid.push(ParseError {
                message: format!(
                    "invalid declaration of {}",
                    child.kind.name().unwrap_or("<unnamed>")
                ),
                location,
            });
            continue;
        }
        let Some(kind) = converter.kind(child) else {
            continue;
        };
        let (begin_line, end_line) = converter.lines(&child.kind, &location);
        conversion.nodes.push(RawNode {
            kind,
            begin_line,
            end_line,
            location,
            origin,
        });
    }
    conversion
}

struct Converter<'a> {
    main_file: &'a str,
    main_canonical: Option<std::path::PathBuf>,
    headers: &'a HeaderSet,
}

impl Converter<'_> {
    fn position(&self, kind: &Clang) -> Option<(Location, Origin)> {
        let location = location(kind.loc()?)?;
        let origin = match self.is_main(&location.file) {
            true => Origin::Main,
            false => Origin::Included,
        };
        Some((location, origin))
    }

    fn is_main(&self, file: &str) -> bool {
        file == self.main_file
            || self
                .main_canonical
                .as_ref()
                .is_some_and(|main| Path::new(file).canonicalize().ok().as_ref() == Some(main))
    }

    /// First and last line of the declaration. `location` is where its name is, which for
    /// `extern int\nadd(int a);` is not the line it starts on.
    fn lines(&self, kind: &Clang, location: &Location) -> (u32, u32) {
        let line = |loc: &clang_ast::SourceLocation| {
            let bare = loc.expansion_loc.as_ref().or(loc.spelling_loc.as_ref())?;
            Some(bare.line as u32)
        };
        let Some(range) = kind.range() else {
            return (location.line, location.line);
        };
        let begin = line(&range.begin).unwrap_or(location.line);
        let end = line(&range.end).unwrap_or(location.line);
        (begin.min(location.line), end.max(location.line))
    }

    fn kind(&self, node: &Node<Clang>) -> Option<RawKind> {
        Some(match &node.kind {
            Clang::TypedefDecl { name, qtype, .. } => RawKind::Typedef {
                name: name.clone(),
                ty: qtype.qual_type.clone(),
            },
            Clang::FunctionDecl {
                name,
                storage_class,
                qtype,
                variadic,
                ..
            } => RawKind::Function(RawFunction {
                name: name.clone(),
                ty: qtype.qual_type.clone(),
                params: params(node),
                variadic: *variadic,
                storage: Storage::from_clang(storage_class.as_deref()),
            }),
            Clang::RecordDecl { .. } => RawKind::Record(self.record(node)?),
            Clang::EnumDecl { name, .. } => RawKind::Enum(RawEnum {
                name: name.clone(),
                constants: node
                    .inner
                    .iter()
                    .filter_map(|c| self.enum_constant(c))
                    .collect(),
            }),
            Clang::VarDecl {
                name,
                qtype,
                storage_class,
                ..
            } => RawKind::Variable(RawVariable {
                name: name.clone(),
                ty: qtype.qual_type.clone(),
                storage: Storage::from_clang(storage_class.as_deref()),
            }),
            Clang::ObjCInterfaceDecl {
                name,
                superclass,
                protocols,
                ..
            } => RawKind::ObjCInterface(self.container(
                node,
                name,
                superclass.as_ref(),
                protocols,
                "@class",
            )),
            Clang::ObjCProtocolDecl {
                name, protocols, ..
            } => RawKind::ObjCProtocol(self.container(node, name, None, protocols, "@protocol")),
            Clang::Other {
                kind: Some(kind), ..
            } if IGNORED_KINDS.contains(&kind.as_str()) => return None,
            Clang::Other { kind, name, .. } => RawKind::Unsupported {
                what: kind.clone().unwrap_or_else(|| "declaration".into()),
                name: name.clone(),
            },
            other => {
                debug!("Unexpected top-level node {:?}", other.name());
                return None;
            }
        })
    }

    fn record(&self, node: &Node<Clang>) -> Option<RawRecord> {
        let Clang::RecordDecl {
            name,
            tag_used,
            complete_definition,
            ..
        } = &node.kind
        else {
            return None;
        };
        let tag = match tag_used.as_deref() {
            Some("union") => RecordTag::Union,
            _ => RecordTag::Struct,
        };
        let mut members = Vec::new();
        for child in &node.inner {
            match &child.kind {
                Clang::FieldDecl { name, qtype, .. } => {
                    let Some(location) = child.kind.loc().and_then(location) else {
                        continue;
                    };
                    members.push(RawMember::Field(RawField {
                        name: name.clone().filter(|n| !n.is_empty()),
                        ty: qtype.qual_type.clone(),
                        bit_width: bit_width(child),
                        location,
                    }));
                }
                Clang::RecordDecl { .. } => {
                    let Some((location, origin)) = self.position(&child.kind) else {
                        continue;
                    };
                    let Some(record) = self.record(child) else {
                        continue;
                    };
                    let (begin_line, end_line) = self.lines(&child.kind, &location);
                    members.push(RawMember::Record(RawNode {
                        kind: RawKind::Record(record),
                        begin_line,
                        end_line,
                        location,
                        origin,
                    }));
                }
                _ => {}
            }
        }
        Some(RawRecord {
            name: name.clone().filter(|n| !n.is_empty()),
            tag,
            complete: *complete_definition,
            members,
        })
    }

    fn enum_constant(&self, node: &Node<Clang>) -> Option<RawEnumConstant> {
        let Clang::EnumConstantDecl { name, range, .. } = &node.kind else {
            return None;
        };
        // Initializers are kept as written; the evaluated value is the fallback when the
        // source text is unavailable (e.g. the constant comes from a macro expansion).
        let value = match node.inner.is_empty() {
            true => None,
            false => range
                .as_ref()
                .and_then(|range| self.initializer_text(range))
                .or_else(|| constant_value(node)),
        };
        Some(RawEnumConstant {
            name: name.clone(),
            value,
        })
    }

    /// Reads `name = initializer` from the source and returns the initializer.
    fn initializer_text(&self, range: &clang_ast::SourceRange) -> Option<String> {
        let begin = range.begin.spelling_loc.as_ref()?;
        let end = range.end.spelling_loc.as_ref()?;
        if begin.file != end.file {
            return None;
        }
        let header = self.headers.get(Path::new(&*begin.file))?;
        let text = header.text.get(begin.offset..end.offset + end.tok_len)?;
        let (_, init) = text.split_once('=')?;
        Some(init.trim().to_string())
    }

    fn container(
        &self,
        node: &Node<Clang>,
        name: &str,
        superclass: Option<&DeclRef>,
        protocols: &[DeclRef],
        forward_keyword: &str,
    ) -> RawObjCContainer {
        let mut methods = Vec::new();
        let mut properties = Vec::new();
        for child in &node.inner {
            match &child.kind {
                Clang::ObjCMethodDecl {
                    name,
                    return_type,
                    instance,
                    variadic,
                    is_implicit: false,
                    ..
                } => {
                    let Some(location) = child.kind.loc().and_then(location) else {
                        continue;
                    };
                    methods.push(RawMethod {
                        selector: name.clone(),
                        result: return_type.qual_type.clone(),
                        params: params(child),
                        instance: *instance,
                        variadic: *variadic,
                        location,
                    });
                }
                Clang::ObjCPropertyDecl {
                    name,
                    qtype,
                    readonly,
                    ..
                } => {
                    let Some(location) = child.kind.loc().and_then(location) else {
                        continue;
                    };
                    properties.push(RawProperty {
                        name: name.clone(),
                        ty: qtype.qual_type.clone(),
                        readonly: *readonly,
                        location,
                    });
                }
                _ => {}
            }
        }
        let has_content = superclass.is_some() || !protocols.is_empty() || !node.inner.is_empty();
        let is_definition = has_content || !self.is_forward(node, forward_keyword);
        RawObjCContainer {
            name: name.to_string(),
            superclass: superclass.and_then(|s| s.name.clone()),
            protocols: protocols.iter().filter_map(|p| p.name.clone()).collect(),
            methods,
            properties,
            is_definition,
        }
    }

    /// Checks the source line of `node` for a forward declaration (`@class Foo;`,
    /// `@protocol Foo;`).
    fn is_forward(&self, node: &Node<Clang>, keyword: &str) -> bool {
        let Some(location) = node.kind.loc().and_then(location) else {
            return false;
        };
        let Some(header) = self.headers.get(Path::new(&location.file)) else {
            return false;
        };
        let Some(line) = header.text.lines().nth(location.line.saturating_sub(1) as usize) else {
            return false;
        };
        let line = line.trim_start();
        if !line.starts_with(keyword) {
            return false;
        }
        match line.split_once(';') {
            Some((head, _)) => !head.contains('<') && !head.contains("@end"),
            None => false,
        }
    }
}

/// Converts a clang location, preferring where a macro was expanded over where it was spelled.
fn location(loc: &clang_ast::SourceLocation) -> Option<Location> {
    let bare = loc.expansion_loc.as_ref().or(loc.spelling_loc.as_ref())?;
    Some(Location::new(
        bare.file.to_string(),
        bare.line as u32,
        bare.col as u32,
    ))
}

fn params(node: &Node<Clang>) -> Vec<RawParam> {
    node.inner
        .iter()
        .filter_map(|child| match &child.kind {
            Clang::ParmVarDecl { name, qtype, .. } => Some(RawParam {
                name: name.clone().filter(|n| !n.is_empty()),
                ty: qtype.qual_type.clone(),
            }),
            _ => None,
        })
        .collect()
}

/// Evaluated value of the constant expression directly under `node`.
fn constant_value(node: &Node<Clang>) -> Option<String> {
    node.inner.iter().find_map(|child| match &child.kind {
        Clang::ConstantExpr { value: Some(value) } | Clang::IntegerLiteral { value: Some(value) } => {
            Some(match value {
                serde_json::Value::String(s) => s.clone(),
                other => other.to_string(),
            })
        }
        _ => None,
    })
}

fn bit_width(field: &Node<Clang>) -> Option<u32> {
    match &field.kind {
        Clang::FieldDecl {
            is_bitfield: true, ..
        } => constant_value(field)?.parse().ok(),
        _ => None,
    }
}

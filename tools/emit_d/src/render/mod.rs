//! Renders declarations and types as D source.


use crate::keywords::{escape, escape_member};
use crate::policy::ImportPolicy;
use decl_model::{
    Bitfield, DeclKind, Declaration, Enum, Function, FunctionType, Member, Method,
    ObjCContainer, Param, Primitive, Record, RecordTag, Reference, TypeRef,
};
use std::collections::BTreeSet;
use tracing::debug;

const INDENT: &str = "    ";

/// Widths `std.bitmanip.bitfields` accepts for a group.
const BITFIELD_WIDTHS: [u32; 4] = [8, 16, 32, 64];

/// Renders declarations one at a time, remembering which modules the rendered text needs.
pub struct Renderer<'a> {
    policy: &'a ImportPolicy,
    alias_enum_members: bool,
    imports: BTreeSet<String>,
}

impl<'a> Renderer<'a> {
    pub fn new(policy: &'a ImportPolicy, alias_enum_members: bool) -> Renderer<'a> {
        Renderer {
            policy,
            alias_enum_members,
            imports: BTreeSet::new(),
        }
    }

    /// The imports needed by everything rendered so far, sorted.
    pub fn into_imports(self) -> BTreeSet<String> {
        self.imports
    }

    pub fn declaration(&mut self, declaration: &Declaration) -> String {
        let name = declaration.name.as_deref();
        debug!(
            "Rendering {} at {}",
            name.unwrap_or("<anonymous>"),
            declaration.location
        );
        match (&declaration.kind, name) {
            (DeclKind::Struct(record), name) => self.record(record, name, 0),
            (DeclKind::Enum(e), name) => self.enumeration(e, name),
            (DeclKind::Function(function), Some(name)) => self.function(function, name),
            (DeclKind::Typedef(ty), Some(name)) => {
                format!("alias {} = {};", escape(name), self.ty(ty))
            }
            (DeclKind::MacroConstant(value), Some(name)) => {
                format!("enum {} = {value};", escape(name))
            }
            (DeclKind::Variable(ty), Some(name)) => {
                let escaped = escape(name);
                format!(
                    "{}extern __gshared {} {escaped};",
                    mangle(name, &escaped),
                    self.ty(ty)
                )
            }
            (DeclKind::ObjCInterface(class), Some(name)) => {
                self.container("class", class, name)
            }
            (DeclKind::ObjCProtocol(protocol), Some(name)) => {
                self.container("interface", protocol, name)
            }
            // Only enums are left unnamed by the model.
            (_, None) => String::new(),
        }
    }

    fn record(&mut self, record: &Record, name: Option<&str>, depth: usize) -> String {
        let indent = INDENT.repeat(depth);
        let keyword = match record.tag {
            RecordTag::Struct => "struct",
            RecordTag::Union => "union",
        };
        let head = match name {
            Some(name) => format!("{indent}{keyword} {}", escape(name)),
            None => format!("{indent}{keyword}"),
        };
        let Some(members) = &record.members else {
            return format!("{head};");
        };
        let mut body = Vec::new();
        for member in members {
            let nested = matches!(member, Member::Record { .. });
            let text = match member {
                Member::Field { name, ty } => format!(
                    "{indent}{INDENT}{} {};",
                    self.ty(ty),
                    escape_member(name)
                ),
                // Only zero-width fields: nothing to lay out.
                Member::Bitfields(group) if group.iter().all(|b| b.width == 0) => continue,
                Member::Bitfields(group) => self.bitfields(group, depth + 1),
                Member::Record { name, record } => {
                    self.record(record, name.as_deref(), depth + 1)
                }
            };
            body.push((nested, text));
        }
        let mut text = format!("{head}\n{indent}{{\n");
        for (i, (nested, member)) in body.iter().enumerate() {
            // Nested records are set off by blank lines.
            if i > 0 && (*nested || body[i - 1].0) {
                text.push('\n');
            }
            text.push_str(member);
            text.push('\n');
        }
        text.push_str(&indent);
        text.push('}');
        text
    }

    fn bitfields(&mut self, group: &[Bitfield], depth: usize) -> String {
        self.imports.insert("std.bitmanip : bitfields".into());
        let indent = INDENT.repeat(depth);
        let mut chunks: Vec<Vec<(String, String, u32)>> = vec![Vec::new()];
        let mut used = 0;
        for bitfield in group.iter().filter(|b| b.width > 0) {
            if used + bitfield.width > 64 {
                chunks.push(Vec::new());
                used = 0;
            }
            used += bitfield.width;
            let name = bitfield.name.as_deref().map(escape_member).unwrap_or_default();
            let ty = self.ty(&bitfield.ty);
            if let Some(chunk) = chunks.last_mut() {
                chunk.push((ty, name, bitfield.width));
            }
        }
        chunks
            .into_iter()
            .filter(|chunk| !chunk.is_empty())
            .map(|mut chunk| {
                let total: u32 = chunk.iter().map(|field| field.2).sum();
                if let Some(&width) = BITFIELD_WIDTHS.iter().find(|&&w| w >= total) {
                    if width > total {
                        chunk.push(("uint".into(), String::new(), width - total));
                    }
                }
                let fields: Vec<_> = chunk
                    .iter()
                    .map(|(ty, name, width)| format!("{indent}{INDENT}{ty}, \"{name}\", {width}"))
                    .collect();
                format!("{indent}mixin(bitfields!(\n{}));", fields.join(",\n"))
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn enumeration(&self, e: &Enum, name: Option<&str>) -> String {
        let name = name.map(escape);
        let head = match &name {
            Some(name) => format!("enum {name}"),
            None => "enum".to_string(),
        };
        if e.constants.is_empty() {
            return match name {
                Some(_) => format!("{head};"),
                None => format!("{head}\n{{\n}}"),
            };
        }
        let constants: Vec<_> = e
            .constants
            .iter()
            .map(|constant| match &constant.value {
                Some(value) => format!("{INDENT}{} = {value}", escape(&constant.name)),
                None => format!("{INDENT}{}", escape(&constant.name)),
            })
            .collect();
        let mut text = format!("{head}\n{{\n{}\n}}", constants.join(",\n"));
        if let (true, Some(name)) = (self.alias_enum_members, &name) {
            text.push('\n');
            for constant in &e.constants {
                let constant = escape(&constant.name);
                text.push_str(&format!("\nalias {constant} = {name}.{constant};"));
            }
        }
        text
    }

    fn function(&mut self, function: &Function, name: &str) -> String {
        let escaped = escape(name);
        format!(
            "{}{} {escaped} ({});",
            mangle(name, &escaped),
            self.ty(&function.result),
            self.params(&function.params, function.variadic)
        )
    }

    fn params(&mut self, params: &[Param], variadic: bool) -> String {
        let mut rendered: Vec<_> = params
            .iter()
            .map(|param| match &param.name {
                Some(name) => format!("{} {}", self.ty(&param.ty), escape(name)),
                None => self.ty(&param.ty),
            })
            .collect();
        if variadic {
            rendered.push("...".into());
        }
        rendered.join(", ")
    }

    fn container(&mut self, keyword: &str, container: &ObjCContainer, name: &str) -> String {
        let bases: Vec<_> = container
            .superclass
            .iter()
            .chain(&container.protocols)
            .map(|base| self.reference(base))
            .collect();
        let mut text = format!("extern {keyword} {}", escape(name));
        if !bases.is_empty() {
            text.push_str(" : ");
            text.push_str(&bases.join(", "));
        }
        text.push_str("\n{\n");
        for method in &container.methods {
            text.push_str(&self.method(method));
            text.push('\n');
        }
        text.push('}');
        text
    }

    fn method(&mut self, method: &Method) -> String {
        format!(
            "{INDENT}{}{} {} ({}) @selector(\"{}\");",
            if method.instance { "" } else { "static " },
            self.ty(&method.result),
            escape_member(method.base_name()),
            self.params(&method.params, method.variadic),
            method.selector
        )
    }

    /// Spells a type in D.
    pub fn ty(&mut self, ty: &TypeRef) -> String {
        match ty {
            TypeRef::Void => "void".into(),
            TypeRef::Primitive(primitive) => self.primitive(*primitive).into(),
            TypeRef::Pointer(inner) => match &**inner {
                TypeRef::Function(function) => self.function_pointer(function),
                inner => format!("{}*", self.ty(inner)),
            },
            TypeRef::Const(inner) => format!("const({})", self.ty(inner)),
            TypeRef::Array { element, size } => {
                format!("{}[{}]", self.ty(element), size.unwrap_or(0))
            }
            // D has no function types; a function typedef is used through pointers anyway.
            TypeRef::Function(function) => self.function_pointer(function),
            TypeRef::Reference(reference) => self.reference(reference),
            // Unnamed types never reach a declaration; see `decl_model::build_model`.
            TypeRef::Anonymous { .. } => "void".into(),
            TypeRef::ObjCId { .. } | TypeRef::InstanceType => "id".into(),
            TypeRef::ObjCClass => "Class".into(),
            TypeRef::Selector => "SEL".into(),
        }
    }

    fn function_pointer(&mut self, function: &FunctionType) -> String {
        let mut params: Vec<_> = function.params.iter().map(|p| self.ty(p)).collect();
        if function.variadic {
            params.push("...".into());
        }
        format!(
            "{} function ({})",
            self.ty(&function.result),
            params.join(", ")
        )
    }

    fn reference(&mut self, reference: &Reference) -> String {
        let qualified = self.policy.qualify(reference, &escape(&reference.name));
        if let Some(import) = qualified.import {
            self.imports.insert(import);
        }
        qualified.name
    }

    fn primitive(&mut self, primitive: Primitive) -> &'static str {
        let (name, import) = match primitive {
            Primitive::Char => ("char", None),
            Primitive::SChar | Primitive::Int8 => ("byte", None),
            Primitive::UChar | Primitive::UInt8 => ("ubyte", None),
            Primitive::Short | Primitive::Int16 => ("short", None),
            Primitive::UShort | Primitive::UInt16 => ("ushort", None),
            Primitive::Int | Primitive::Int32 => ("int", None),
            Primitive::UInt | Primitive::UInt32 => ("uint", None),
            Primitive::Long => ("c_long", Some("core.stdc.config")),
            Primitive::ULong => ("c_ulong", Some("core.stdc.config")),
            Primitive::LongLong | Primitive::Int64 => ("long", None),
            Primitive::ULongLong | Primitive::UInt64 => ("ulong", None),
            Primitive::Float => ("float", None),
            Primitive::Double => ("double", None),
            Primitive::LongDouble => ("real", None),
            Primitive::Bool => ("bool", None),
            Primitive::WChar => ("wchar_t", Some("core.stdc.stddef")),
            Primitive::SizeT => ("size_t", None),
            Primitive::PtrdiffT => ("ptrdiff_t", None),
            Primitive::VaList => ("va_list", Some("core.stdc.stdarg")),
        };
        if let Some(import) = import {
            self.imports.insert(import.into());
        }
        name
    }
}

/// Keeps the C symbol name of a function or variable whose D name had to be changed.
fn mangle(name: &str, escaped: &str) -> String {
    match name == escaped {
        true => String::new(),
        false => format!("pragma(mangle, \"{name}\") "),
    }
}

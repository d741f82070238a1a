//! Two-pass construction of the declaration model.

use crate::literal::{MacroBody, classify};
use crate::symbols::SymbolTable;
use crate::types::{Namespace, Reference, Target, TypeRef, parse_type};
use crate::{
    Bitfield, DeclKind, Declaration, Enum, EnumConstant, Function, Member, Method, ObjCContainer,
    Param, Record,
};
use c_ast::{
    Origin, ParsedUnit, RawEnum, RawFunction, RawKind, RawMacro, RawMember, RawMethod, RawNode,
    RawObjCContainer, RawParam, RawRecord, Storage,
};
use h2d_core::Location;
use h2d_core::diagnostics::Warning;
use std::collections::{HashMap, HashSet};
use tracing::debug;

/// The result of [build_model].
#[derive(Debug)]
pub struct Model {
    pub declarations: Vec<Declaration>,
    pub symbols: SymbolTable,
    pub warnings: Vec<Warning>,
}

/// Builds the declarations of the entry header's nodes in `unit`.
pub fn build_model(unit: &ParsedUnit) -> Model {
    let mut builder = Builder::default();
    builder.name_anonymous(&unit.nodes);
    builder.declare(&unit.nodes);
    let declarations = unit
        .nodes
        .iter()
        .enumerate()
        .filter(|(_, node)| node.origin == Origin::Main)
        .filter_map(|(index, node)| builder.declaration(index, node))
        .collect();
    Model {
        declarations,
        symbols: builder.symbols,
        warnings: builder.warnings,
    }
}

/// Why a declaration cannot be modeled.
type Unsupported = String;

#[derive(Default)]
struct Builder {
    symbols: SymbolTable,
    /// Names given to anonymous records and enums, keyed by declaration location.
    anonymous: HashMap<String, String>,
    /// Indices of typedefs that only named an anonymous type.
    dropped: HashSet<usize>,
    /// Records and enums defined in the entry header.
    defined: HashSet<String>,
    /// Opaque records already emitted.
    opaque: HashSet<String>,
    warnings: Vec<Warning>,
}

impl Builder {
    /// Names anonymous types from their context: a typedef, a field or a variable of that type.
    /// Unnamed entry header records that are left over are numbered.
    fn name_anonymous(&mut self, nodes: &[RawNode]) {
        // Location of the anonymous record or enum immediately before the current node.
        let mut previous: Option<String> = None;
        for (index, node) in nodes.iter().enumerate() {
            let location = node.location.to_string();
            match &node.kind {
                RawKind::Record(record) => {
                    self.name_nested(record);
                    previous = record.name.is_none().then_some(location);
                    continue;
                }
                RawKind::Enum(e) => {
                    previous = e.name.is_none().then_some(location);
                    continue;
                }
                RawKind::Typedef { name, ty } => {
                    // Older clang spells the type `struct (unnamed struct at ...)`, newer clang
                    // gives the anonymous type the typedef's name.
                    let named = match parse_type(ty) {
                        Ok(TypeRef::Anonymous { location }) => Some(location),
                        Ok(TypeRef::Reference(reference)) if reference.name == *name => {
                            previous.clone()
                        }
                        _ => None,
                    };
                    if let Some(anonymous) = named {
                        if !self.anonymous.contains_key(&anonymous) {
                            debug!("{anonymous} is named {name} by its typedef");
                            self.anonymous.insert(anonymous, name.clone());
                            self.dropped.insert(index);
                        }
                    }
                }
                RawKind::Variable(variable) => {
                    if let Some(anonymous) = anonymous_in(&variable.ty) {
                        self.anonymous
                            .entry(anonymous)
                            .or_insert_with(|| format!("_{}", upper_first(&variable.name)));
                    }
                }
                _ => {}
            }
            previous = None;
        }

        let mut count = 0;
        for node in nodes.iter().filter(|n| n.origin == Origin::Main) {
            if let RawKind::Record(RawRecord { name: None, .. }) = node.kind {
                let location = node.location.to_string();
                if !self.anonymous.contains_key(&location) {
                    self.anonymous
                        .insert(location, format!("_Anonymous_{count}"));
                    count += 1;
                }
            }
        }
    }

    /// Names anonymous records nested in `record` after the first named field of their type.
    fn name_nested(&mut self, record: &RawRecord) {
        for member in &record.members {
            let RawMember::Record(node) = member else {
                continue;
            };
            let RawKind::Record(nested) = &node.kind else {
                continue;
            };
            self.name_nested(nested);
            if nested.name.is_some() {
                continue;
            }
            let location = node.location.to_string();
            let field = record.members.iter().find_map(|m| match m {
                RawMember::Field(field) => field
                    .name
                    .as_ref()
                    .filter(|_| anonymous_in(&field.ty).as_ref() == Some(&location)),
                RawMember::Record(_) => None,
            });
            if let Some(field) = field {
                self.anonymous
                    .insert(location, format!("_{}", upper_first(field)));
            }
        }
    }

    /// Pass 1: enters every type name into the symbol table.
    fn declare(&mut self, nodes: &[RawNode]) {
        for node in nodes {
            let origin = match node.origin {
                Origin::Main => None,
                Origin::Included => Some(node.location.file.as_str()),
            };
            match &node.kind {
                RawKind::Record(record) => {
                    if let Some(name) = self.record_name(record, &node.location) {
                        if origin.is_none() && record.complete {
                            self.defined.insert(name.clone());
                        }
                        self.declare_name(Namespace::Tag, &name, origin);
                    }
                    self.declare_nested(record, origin);
                }
                RawKind::Enum(e) => {
                    if let Some(name) = self.enum_name(e, &node.location) {
                        if origin.is_none() && !e.constants.is_empty() {
                            self.defined.insert(name.clone());
                        }
                        self.declare_name(Namespace::Tag, &name, origin);
                    }
                }
                RawKind::Typedef { name, .. } => self.declare_name(Namespace::Ordinary, name, origin),
                RawKind::ObjCInterface(class) if class.is_definition => {
                    self.declare_name(Namespace::Ordinary, &class.name, origin)
                }
                RawKind::ObjCProtocol(protocol) if protocol.is_definition => {
                    self.declare_name(Namespace::Protocol, &protocol.name, origin)
                }
                _ => {}
            }
        }
    }

    fn declare_nested(&mut self, record: &RawRecord, origin: Option<&str>) {
        for member in &record.members {
            if let RawMember::Record(node) = member {
                if let RawKind::Record(nested) = &node.kind {
                    if !nested.complete {
                        continue;
                    }
                    if let Some(name) = self.record_name(nested, &node.location) {
                        self.declare_name(Namespace::Tag, &name, origin);
                    }
                    self.declare_nested(nested, origin);
                }
            }
        }
    }

    fn declare_name(&mut self, namespace: Namespace, name: &str, origin: Option<&str>) {
        match origin {
            None => self.symbols.declare_local(namespace, name),
            Some(origin) => self.symbols.declare_external(namespace, name, origin),
        }
    }

    fn record_name(&self, record: &RawRecord, location: &Location) -> Option<String> {
        record
            .name
            .clone()
            .or_else(|| self.anonymous.get(&location.to_string()).cloned())
    }

    fn enum_name(&self, e: &RawEnum, location: &Location) -> Option<String> {
        e.name
            .clone()
            .or_else(|| self.anonymous.get(&location.to_string()).cloned())
    }

    /// Pass 2: builds the declaration for one entry header node.
    fn declaration(&mut self, index: usize, node: &RawNode) -> Option<Declaration> {
        if self.dropped.contains(&index) {
            debug!("Dropping typedef at {}, it names a record", node.location);
            return None;
        }
        let name = match &node.kind {
            RawKind::Record(record) => self.record_name(record, &node.location),
            RawKind::Enum(e) => self.enum_name(e, &node.location),
            other => other.name().map(str::to_string),
        };
        match self.kind(node, name.as_deref()) {
            Ok(Some(kind)) => {
                debug!(
                    "Modeled {} at {}",
                    name.as_deref().unwrap_or("<anonymous>"),
                    node.location
                );
                Some(Declaration {
                    name,
                    kind,
                    location: node.location.clone(),
                    begin_line: node.begin_line,
                    end_line: node.end_line,
                })
            }
            Ok(None) => None,
            Err(reason) => {
                self.warnings.push(Warning::UnsupportedConstruct {
                    location: node.location.clone(),
                    name: name.unwrap_or_else(|| "<anonymous>".into()),
                    reason,
                });
                None
            }
        }
    }

    fn kind(
        &mut self,
        node: &RawNode,
        name: Option<&str>,
    ) -> Result<Option<DeclKind>, Unsupported> {
        let location = &node.location;
        match &node.kind {
            RawKind::Record(record) => self.record_decl(record, name.unwrap_or_default(), location),
            RawKind::Enum(e) => {
                if e.constants.is_empty() && name.is_some_and(|n| self.defined.contains(n)) {
                    return Ok(None);
                }
                Ok(Some(DeclKind::Enum(Enum {
                    constants: e
                        .constants
                        .iter()
                        .map(|c| EnumConstant {
                            name: c.name.clone(),
                            value: c.value.clone(),
                        })
                        .collect(),
                })))
            }
            RawKind::Function(function) => self.function(function, location),
            RawKind::Typedef { name, ty } => {
                let ty = self.type_of(ty, location)?;
                // `typedef struct Foo Foo;` declares nothing new in D.
                let same_name = matches!(
                    &ty,
                    TypeRef::Reference(Reference {
                        namespace: Namespace::Tag,
                        name: tag,
                        target: Target::Local,
                    }) if tag == name
                );
                Ok((!same_name).then_some(DeclKind::Typedef(ty)))
            }
            RawKind::Variable(variable) => {
                if variable.storage == Storage::Static {
                    debug!("Skipping static variable {}", variable.name);
                    return Ok(None);
                }
                Ok(Some(DeclKind::Variable(
                    self.type_of(&variable.ty, location)?,
                )))
            }
            RawKind::Macro(definition) => Ok(self.macro_constant(definition, location)),
            RawKind::ObjCInterface(class) => Ok(self
                .container(class, location, true)?
                .map(DeclKind::ObjCInterface)),
            RawKind::ObjCProtocol(protocol) => Ok(self
                .container(protocol, location, false)?
                .map(DeclKind::ObjCProtocol)),
            RawKind::Unsupported { what, .. } => Err(format!("{what} has no D translation")),
        }
    }

    fn record_decl(
        &mut self,
        record: &RawRecord,
        name: &str,
        location: &Location,
    ) -> Result<Option<DeclKind>, Unsupported> {
        if !record.complete {
            if self.defined.contains(name) || !self.opaque.insert(name.to_string()) {
                debug!("Dropping forward declaration of {name}");
                return Ok(None);
            }
            return Ok(Some(DeclKind::Struct(Record {
                tag: record.tag,
                members: None,
            })));
        }
        Ok(Some(DeclKind::Struct(Record {
            tag: record.tag,
            members: Some(self.members(record, location)?),
        })))
    }

    fn members(
        &mut self,
        record: &RawRecord,
        location: &Location,
    ) -> Result<Vec<Member>, Unsupported> {
        let mut members = Vec::new();
        for member in &record.members {
            match member {
                RawMember::Record(node) => {
                    let RawKind::Record(nested) = &node.kind else {
                        continue;
                    };
                    if !nested.complete {
                        continue;
                    }
                    members.push(Member::Record {
                        name: self.record_name(nested, &node.location),
                        record: Record {
                            tag: nested.tag,
                            members: Some(self.members(nested, &node.location)?),
                        },
                    });
                }
                RawMember::Field(field) => {
                    if field.name.is_none() && field.bit_width.is_none() {
                        // The implicit field of an anonymous member.
                        continue;
                    }
                    let ty = self.type_of(&field.ty, &field.location)?;
                    match (field.name.clone(), field.bit_width) {
                        (name, Some(width)) => {
                            let bitfield = Bitfield { name, ty, width };
                            match members.last_mut() {
                                Some(Member::Bitfields(group)) => group.push(bitfield),
                                _ => members.push(Member::Bitfields(vec![bitfield])),
                            }
                        }
                        (Some(name), None) => members.push(Member::Field { name, ty }),
                        (None, None) => {}
                    }
                }
            }
        }
        debug!("{} members in record at {location}", members.len());
        Ok(members)
    }

    fn function(
        &mut self,
        function: &RawFunction,
        location: &Location,
    ) -> Result<Option<DeclKind>, Unsupported> {
        if function.storage == Storage::Static {
            debug!("Skipping static function {}", function.name);
            return Ok(None);
        }
        let TypeRef::Function(ty) = self.type_of(&function.ty, location)? else {
            return Err(format!("`{}` is not a function type", function.ty));
        };
        Ok(Some(DeclKind::Function(Function {
            result: ty.result,
            params: self.params(&function.params, location)?,
            variadic: function.variadic || ty.variadic,
        })))
    }

    fn params(
        &mut self,
        params: &[RawParam],
        location: &Location,
    ) -> Result<Vec<Param>, Unsupported> {
        params
            .iter()
            .map(|param| {
                Ok(Param {
                    name: param.name.clone(),
                    ty: self.type_of(&param.ty, location)?.decay(),
                })
            })
            .collect()
    }

    fn macro_constant(&mut self, definition: &RawMacro, location: &Location) -> Option<DeclKind> {
        let unsupported = || Warning::UnsupportedMacro {
            location: location.clone(),
            name: definition.name.clone(),
        };
        if definition.params.is_some() {
            self.warnings.push(unsupported());
            return None;
        }
        match classify(&definition.body) {
            MacroBody::Literal(value) => Some(DeclKind::MacroConstant(value)),
            MacroBody::Empty => {
                debug!("Skipping empty macro {}", definition.name);
                None
            }
            MacroBody::NotLiteral => {
                self.warnings.push(unsupported());
                None
            }
        }
    }

    fn container(
        &mut self,
        raw: &RawObjCContainer,
        location: &Location,
        is_class: bool,
    ) -> Result<Option<ObjCContainer>, Unsupported> {
        if !raw.is_definition {
            debug!("Dropping forward declaration of {}", raw.name);
            return Ok(None);
        }
        let superclass = raw
            .superclass
            .as_ref()
            .map(|name| self.reference(Namespace::Ordinary, name, location));
        let protocols = raw
            .protocols
            .iter()
            .map(|name| self.reference(Namespace::Protocol, name, location))
            .collect();

        let owner = is_class.then_some(raw.name.as_str());
        let mut methods: Vec<(&Location, Method)> = Vec::new();
        for method in &raw.methods {
            match self.method(method, owner) {
                Ok(built) => methods.push((&method.location, built)),
                Err(reason) => self.warnings.push(Warning::UnsupportedConstruct {
                    location: method.location.clone(),
                    name: format!("{}.{}", raw.name, method.selector),
                    reason,
                }),
            }
        }
        for property in &raw.properties {
            let ty = match self.type_of(&property.ty, &property.location) {
                Ok(ty) => ty,
                Err(reason) => {
                    self.warnings.push(Warning::UnsupportedConstruct {
                        location: property.location.clone(),
                        name: format!("{}.{}", raw.name, property.name),
                        reason,
                    });
                    continue;
                }
            };
            let setter = format!("set{}:", upper_first(&property.name));
            let declared = |selector: &str| {
                raw.methods
                    .iter()
                    .any(|m| m.instance && m.selector == selector)
            };
            if !declared(&property.name) {
                methods.push((
                    &property.location,
                    Method {
                        selector: property.name.clone(),
                        instance: true,
                        result: ty.clone(),
                        params: Vec::new(),
                        variadic: false,
                    },
                ));
            }
            if !property.readonly && !declared(&setter) {
                methods.push((
                    &property.location,
                    Method {
                        selector: setter,
                        instance: true,
                        result: TypeRef::Void,
                        params: vec![Param {
                            name: Some(property.name.clone()),
                            ty,
                        }],
                        variadic: false,
                    },
                ));
            }
        }
        methods.sort_by_key(|(location, _)| (location.line, location.column));

        let mut seen = HashSet::new();
        let methods = methods
            .into_iter()
            .map(|(_, method)| method)
            .filter(|m| seen.insert((m.selector.clone(), m.instance)))
            .collect();
        Ok(Some(ObjCContainer {
            superclass,
            protocols,
            methods,
        }))
    }

    fn method(&mut self, method: &RawMethod, owner: Option<&str>) -> Result<Method, Unsupported> {
        let mut result = self.type_of(&method.result, &method.location)?;
        if result == TypeRef::InstanceType {
            result = match owner {
                Some(class) => TypeRef::Reference(Reference {
                    namespace: Namespace::Ordinary,
                    name: class.to_string(),
                    target: Target::Local,
                }),
                None => TypeRef::ObjCId {
                    protocols: Vec::new(),
                },
            };
        }
        Ok(Method {
            selector: method.selector.clone(),
            instance: method.instance,
            result,
            params: self.params(&method.params, &method.location)?,
            variadic: method.variadic,
        })
    }

    fn reference(&mut self, namespace: Namespace, name: &str, location: &Location) -> Reference {
        let mut reference = Reference::new(namespace, name);
        if !self.symbols.resolve(&mut reference) {
            self.unresolved(name, location);
        }
        reference
    }

    /// Parses `spelling` and binds its named types.
    fn type_of(&mut self, spelling: &str, location: &Location) -> Result<TypeRef, Unsupported> {
        let mut ty = parse_type(spelling).map_err(|e| e.to_string())?;
        let mut unresolved = Vec::new();
        let mut undeclared = None;
        let anonymous = &self.anonymous;
        let symbols = &self.symbols;
        ty.visit_mut(&mut |t| {
            if let TypeRef::Anonymous { location } = t {
                match anonymous.get(location.as_str()) {
                    Some(name) => *t = TypeRef::Reference(Reference::new(Namespace::Tag, name)),
                    None => {
                        undeclared = Some(location.clone());
                        return;
                    }
                }
            }
            if let TypeRef::Reference(reference) = t {
                if !symbols.resolve(reference) {
                    unresolved.push(reference.name.clone());
                }
            }
        });
        if let Some(at) = undeclared {
            return Err(format!("anonymous type declared at {at} cannot be named"));
        }
        for name in unresolved {
            self.unresolved(&name, location);
        }
        Ok(ty)
    }

    fn unresolved(&mut self, name: &str, location: &Location) {
        let warning = Warning::UnresolvedTypeReference {
            location: location.clone(),
            name: name.to_string(),
        };
        if !self.warnings.contains(&warning) {
            self.warnings.push(warning);
        }
    }
}

/// The location of the first anonymous type in the type spelled `spelling`.
fn anonymous_in(spelling: &str) -> Option<String> {
    let mut ty = parse_type(spelling).ok()?;
    let mut found = None;
    ty.visit_mut(&mut |t| {
        if let TypeRef::Anonymous { location } = t {
            found.get_or_insert_with(|| location.clone());
        }
    });
    found
}

fn upper_first(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests;

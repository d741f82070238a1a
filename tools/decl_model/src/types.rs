//! Type references and the parser that builds them from C type spellings.
//!
//! Clang prints every type as a C abstract declarator (`const char *`, `int (*)(int, ...)`,
//! `struct (unnamed struct at a.h:3:9) [4]`). [parse_type] turns such a spelling into a
//! [TypeRef] tree; named types come out unresolved and are bound to the symbol table later.

use thiserror::Error;

/// The C namespaces a type name can live in. Objective-C protocols get their own, since a
/// class and a protocol commonly share a name (`NSObject`).
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum Namespace {
    /// struct, union and enum tags.
    Tag,
    /// typedef names and Objective-C classes.
    Ordinary,
    Protocol,
}

/// What a named reference resolved to.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Target {
    /// A declaration emitted into the same D module.
    Local,
    /// A declaration from an included header.
    External { origin: String },
    /// Nothing the front end saw.
    Unresolved,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Reference {
    pub namespace: Namespace,
    pub name: String,
    pub target: Target,
}

impl Reference {
    pub fn new(namespace: Namespace, name: impl Into<String>) -> Reference {
        Reference {
            namespace,
            name: name.into(),
            target: Target::Unresolved,
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Primitive {
    Char,
    SChar,
    UChar,
    Short,
    UShort,
    Int,
    UInt,
    Long,
    ULong,
    LongLong,
    ULongLong,
    Float,
    Double,
    LongDouble,
    Bool,
    WChar,
    SizeT,
    PtrdiffT,
    Int8,
    UInt8,
    Int16,
    UInt16,
    Int32,
    UInt32,
    Int64,
    UInt64,
    VaList,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct FunctionType {
    pub result: TypeRef,
    pub params: Vec<TypeRef>,
    pub variadic: bool,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum TypeRef {
    Void,
    Primitive(Primitive),
    Pointer(Box<TypeRef>),
    Const(Box<TypeRef>),
    Array {
        element: Box<TypeRef>,
        size: Option<u64>,
    },
    Function(Box<FunctionType>),
    Reference(Reference),
    /// An unnamed struct, union or enum, identified by the location of its declaration
    /// (`file:line:col`). Replaced by a [TypeRef::Reference] once the declaration is named.
    Anonymous {
        location: String,
    },
    /// Objective-C `id`, optionally restricted to a protocol list.
    ObjCId {
        protocols: Vec<String>,
    },
    ObjCClass,
    Selector,
    InstanceType,
}

impl TypeRef {
    pub fn pointer(to: TypeRef) -> TypeRef {
        TypeRef::Pointer(Box::new(to))
    }

    pub fn constant(ty: TypeRef) -> TypeRef {
        TypeRef::Const(Box::new(ty))
    }

    /// Applies C's parameter adjustment: arrays and functions become pointers.
    pub fn decay(self) -> TypeRef {
        match self {
            TypeRef::Array { element, .. } => TypeRef::Pointer(element),
            TypeRef::Function(_) => TypeRef::pointer(self),
            TypeRef::Const(inner) if matches!(*inner, TypeRef::Array { .. }) => inner.decay(),
            other => other,
        }
    }

    /// Calls `f` on every node of this type, children before parents.
    pub fn visit_mut(&mut self, f: &mut dyn FnMut(&mut TypeRef)) {
        match self {
            TypeRef::Pointer(inner) | TypeRef::Const(inner) => inner.visit_mut(f),
            TypeRef::Array { element, .. } => element.visit_mut(f),
            TypeRef::Function(function) => {
                function.result.visit_mut(f);
                function.params.iter_mut().for_each(|p| p.visit_mut(f));
            }
            _ => {}
        }
        f(self)
    }
}

#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub enum TypeError {
    #[error("{0} types are not supported")]
    Unsupported(&'static str),

    #[error("cannot parse type `{0}`")]
    Malformed(String),
}

#[derive(Clone, Debug, PartialEq)]
enum Token {
    Ident(String),
    Number(u64),
    Anonymous(String),
    Punct(char),
    Ellipsis,
}

/// Parses a C type spelling as printed by clang.
pub fn parse_type(spelling: &str) -> Result<TypeRef, TypeError> {
    let tokens = tokenize(spelling)?;
    let mut parser = Parser {
        tokens: &tokens,
        pos: 0,
        spelling,
    };
    let ty = parser.type_name()?;
    match parser.pos == tokens.len() {
        true => Ok(ty),
        false => Err(parser.malformed()),
    }
}

fn tokenize(spelling: &str) -> Result<Vec<Token>, TypeError> {
    let mut tokens = Vec::new();
    let mut rest = spelling;
    while let Some(c) = rest.chars().next() {
        if c.is_whitespace() {
            rest = &rest[c.len_utf8()..];
        } else if c.is_ascii_alphabetic() || c == '_' || c == '$' {
            let end = rest
                .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_' || c == '$'))
                .unwrap_or(rest.len());
            tokens.push(Token::Ident(rest[..end].to_string()));
            rest = &rest[end..];
        } else if c.is_ascii_digit() {
            let end = rest
                .find(|c: char| !c.is_ascii_alphanumeric())
                .unwrap_or(rest.len());
            let number = rest[..end]
                .trim_end_matches(['u', 'U', 'l', 'L'])
                .parse()
                .map_err(|_| TypeError::Malformed(spelling.into()))?;
            tokens.push(Token::Number(number));
            rest = &rest[end..];
        } else if rest.starts_with("(unnamed ") || rest.starts_with("(anonymous ") {
            // `(unnamed struct at file.h:3:9)`; older clang says `anonymous`.
            let end = rest
                .find(')')
                .ok_or_else(|| TypeError::Malformed(spelling.into()))?;
            let location = rest[..end]
                .split_once(" at ")
                .map(|(_, location)| location.to_string())
                .ok_or_else(|| TypeError::Malformed(spelling.into()))?;
            tokens.push(Token::Anonymous(location));
            rest = &rest[end + 1..];
        } else if rest.starts_with("...") {
            tokens.push(Token::Ellipsis);
            rest = &rest[3..];
        } else if "*^()[],<>".contains(c) {
            tokens.push(Token::Punct(c));
            rest = &rest[1..];
        } else {
            return Err(TypeError::Malformed(spelling.into()));
        }
    }
    Ok(tokens)
}

/// Qualifiers and annotations that have no D counterpart and are dropped.
const IGNORED_QUALIFIERS: &[&str] = &[
    "volatile",
    "restrict",
    "__restrict",
    "__restrict__",
    "_Nullable",
    "_Nonnull",
    "_Null_unspecified",
    "_Nullable_result",
    "__nullable",
    "__nonnull",
    "__kindof",
    "__strong",
    "__weak",
    "__unsafe_unretained",
    "__autoreleasing",
    "__unaligned",
];

struct Parser<'a> {
    tokens: &'a [Token],
    pos: usize,
    spelling: &'a str,
}

/// Accumulates the keywords of a declaration specifier list.
#[derive(Default)]
struct Specifiers {
    is_const: bool,
    signed: Option<bool>,
    short: bool,
    longs: u32,
    keyword: Option<&'static str>,
    named: Option<TypeRef>,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Option<&'a Token> {
        self.tokens.get(self.pos)
    }

    fn peek_punct(&self, punct: char) -> bool {
        self.peek() == Some(&Token::Punct(punct))
    }

    fn expect_punct(&mut self, punct: char) -> Result<(), TypeError> {
        match self.peek_punct(punct) {
            true => {
                self.pos += 1;
                Ok(())
            }
            false => Err(self.malformed()),
        }
    }

    fn malformed(&self) -> TypeError {
        TypeError::Malformed(self.spelling.into())
    }

    fn type_name(&mut self) -> Result<TypeRef, TypeError> {
        let base = self.specifiers()?;
        self.declarator(base)
    }

    fn specifiers(&mut self) -> Result<TypeRef, TypeError> {
        let mut spec = Specifiers::default();
        while let Some(Token::Ident(word)) = self.peek() {
            let word = word.as_str();
            let complete = spec.keyword.is_some() || spec.named.is_some();
            match word {
                "const" => spec.is_const = true,
                w if IGNORED_QUALIFIERS.contains(&w) => {}
                "signed" | "__signed" | "__signed__" => spec.signed = Some(true),
                "unsigned" => spec.signed = Some(false),
                "short" => spec.short = true,
                "long" => spec.longs += 1,
                "_Complex" | "__complex__" => return Err(TypeError::Unsupported("complex")),
                "_Imaginary" => return Err(TypeError::Unsupported("imaginary")),
                "_Atomic" => return Err(TypeError::Unsupported("atomic")),
                "__attribute__" => return Err(TypeError::Unsupported("attributed")),
                "typeof" | "__typeof" | "__typeof__" => {
                    return Err(TypeError::Unsupported("typeof"));
                }
                "__int128" | "__int128_t" | "__uint128_t" => {
                    return Err(TypeError::Unsupported("128-bit integer"));
                }
                _ if complete => break,
                "void" => spec.keyword = Some("void"),
                "char" => spec.keyword = Some("char"),
                "int" => spec.keyword = Some("int"),
                "float" => spec.keyword = Some("float"),
                "double" => spec.keyword = Some("double"),
                "_Bool" | "bool" => spec.keyword = Some("bool"),
                "_Float16" | "__fp16" | "__bf16" => {
                    return Err(TypeError::Unsupported("half precision"));
                }
                "struct" | "union" | "enum" => {
                    self.pos += 1;
                    spec.named = Some(match self.peek() {
                        Some(Token::Ident(name)) => {
                            TypeRef::Reference(Reference::new(Namespace::Tag, name.clone()))
                        }
                        Some(Token::Anonymous(location)) => TypeRef::Anonymous {
                            location: location.clone(),
                        },
                        _ => return Err(self.malformed()),
                    });
                }
                _ if spec.signed.is_some() || spec.short || spec.longs > 0 => break,
                "id" => {
                    self.pos += 1;
                    let protocols = self.protocol_list()?;
                    spec.named = Some(TypeRef::ObjCId { protocols });
                    continue;
                }
                "Class" => {
                    self.pos += 1;
                    self.protocol_list()?;
                    spec.named = Some(TypeRef::ObjCClass);
                    continue;
                }
                "SEL" => spec.named = Some(TypeRef::Selector),
                "instancetype" => spec.named = Some(TypeRef::InstanceType),
                name => {
                    let ty = builtin_typedef(name).unwrap_or_else(|| {
                        TypeRef::Reference(Reference::new(Namespace::Ordinary, name))
                    });
                    self.pos += 1;
                    // `NSObject<NSCopying> *`: the protocol list does not change the D type.
                    self.protocol_list()?;
                    spec.named = Some(ty);
                    continue;
                }
            }
            self.pos += 1;
        }
        let base = self.base_type(&spec)?;
        Ok(match spec.is_const {
            true => TypeRef::constant(base),
            false => base,
        })
    }

    fn base_type(&self, spec: &Specifiers) -> Result<TypeRef, TypeError> {
        use Primitive::*;
        if let Some(named) = &spec.named {
            return Ok(named.clone());
        }
        let unsigned = spec.signed == Some(false);
        let primitive = match spec.keyword {
            Some("void") => return Ok(TypeRef::Void),
            Some("bool") => Bool,
            Some("float") => Float,
            Some("double") if spec.longs > 0 => LongDouble,
            Some("double") => Double,
            Some("char") => match spec.signed {
                None => Char,
                Some(true) => SChar,
                Some(false) => UChar,
            },
            Some("int") | None => {
                if spec.keyword.is_none() && spec.signed.is_none() && !spec.short && spec.longs == 0
                {
                    return Err(self.malformed());
                }
                match (spec.short, spec.longs, unsigned) {
                    (true, _, false) => Short,
                    (true, _, true) => UShort,
                    (false, 0, false) => Int,
                    (false, 0, true) => UInt,
                    (false, 1, false) => Long,
                    (false, 1, true) => ULong,
                    (false, _, false) => LongLong,
                    (false, _, true) => ULongLong,
                }
            }
            Some(_) => return Err(self.malformed()),
        };
        Ok(TypeRef::Primitive(primitive))
    }

    /// Skips over an optional `<A, B>` list and returns its names.
    fn protocol_list(&mut self) -> Result<Vec<String>, TypeError> {
        let mut protocols = Vec::new();
        if !self.peek_punct('<') {
            return Ok(protocols);
        }
        self.pos += 1;
        loop {
            match self.peek() {
                Some(Token::Ident(name)) => protocols.push(name.clone()),
                Some(Token::Punct(',')) => {}
                Some(Token::Punct('>')) => break,
                _ => return Err(self.malformed()),
            }
            self.pos += 1;
        }
        self.pos += 1;
        Ok(protocols)
    }

    /// Parses an abstract declarator applied to `base`.
    fn declarator(&mut self, mut base: TypeRef) -> Result<TypeRef, TypeError> {
        loop {
            match self.peek() {
                Some(Token::Punct('*')) => {
                    self.pos += 1;
                    base = TypeRef::pointer(base);
                    base = self.pointer_qualifiers(base)?;
                }
                Some(Token::Punct('^')) => return Err(TypeError::Unsupported("block")),
                _ => break,
            }
        }

        if self.peek_punct('(') && self.nested_declarator_follows() {
            // `R (*)(P)`: the suffixes after the parenthesized declarator apply first.
            let open = self.pos;
            let close = self.matching_paren(open)?;
            self.pos = close + 1;
            let outer = self.suffixes(base)?;
            let end = self.pos;
            let mut inner = Parser {
                tokens: &self.tokens[open + 1..close],
                pos: 0,
                spelling: self.spelling,
            };
            let ty = inner.declarator(outer)?;
            if inner.pos != inner.tokens.len() {
                return Err(self.malformed());
            }
            self.pos = end;
            return Ok(ty);
        }
        self.suffixes(base)
    }

    fn pointer_qualifiers(&mut self, mut ty: TypeRef) -> Result<TypeRef, TypeError> {
        while let Some(Token::Ident(word)) = self.peek() {
            match word.as_str() {
                "const" => ty = TypeRef::constant(ty),
                w if IGNORED_QUALIFIERS.contains(&w) => {}
                "__attribute__" => return Err(TypeError::Unsupported("attributed")),
                _ => return Err(self.malformed()),
            }
            self.pos += 1;
        }
        Ok(ty)
    }

    fn nested_declarator_follows(&self) -> bool {
        matches!(
            self.tokens.get(self.pos + 1),
            Some(Token::Punct('*' | '^' | '(' | '['))
        )
    }

    fn matching_paren(&self, open: usize) -> Result<usize, TypeError> {
        let mut depth = 0usize;
        for (i, token) in self.tokens.iter().enumerate().skip(open) {
            match token {
                Token::Punct('(') => depth += 1,
                Token::Punct(')') => {
                    depth -= 1;
                    if depth == 0 {
                        return Ok(i);
                    }
                }
                _ => {}
            }
        }
        Err(self.malformed())
    }

    /// Parses array and function suffixes and applies them to `base`, innermost last.
    fn suffixes(&mut self, base: TypeRef) -> Result<TypeRef, TypeError> {
        enum Suffix {
            Array(Option<u64>),
            Function(Vec<TypeRef>, bool),
        }
        let mut suffixes = Vec::new();
        loop {
            if self.peek_punct('[') {
                self.pos += 1;
                let size = match self.peek() {
                    Some(Token::Number(n)) => {
                        let n = *n;
                        self.pos += 1;
                        Some(n)
                    }
                    Some(Token::Punct(']')) => None,
                    _ => return Err(TypeError::Unsupported("variable length array")),
                };
                self.expect_punct(']')?;
                suffixes.push(Suffix::Array(size));
            } else if self.peek_punct('(') {
                self.pos += 1;
                let (params, variadic) = self.params()?;
                suffixes.push(Suffix::Function(params, variadic));
            } else {
                break;
            }
        }
        Ok(suffixes
            .into_iter()
            .rev()
            .fold(base, |ty, suffix| match suffix {
                Suffix::Array(size) => TypeRef::Array {
                    element: Box::new(ty),
                    size,
                },
                Suffix::Function(params, variadic) => TypeRef::Function(Box::new(FunctionType {
                    result: ty,
                    params,
                    variadic,
                })),
            }))
    }

    /// Parses a parameter list after its opening parenthesis, through the closing one.
    fn params(&mut self) -> Result<(Vec<TypeRef>, bool), TypeError> {
        let mut params = Vec::new();
        let mut variadic = false;
        if self.peek_punct(')') {
            self.pos += 1;
            return Ok((params, variadic));
        }
        loop {
            if self.peek() == Some(&Token::Ellipsis) {
                self.pos += 1;
                variadic = true;
            } else {
                params.push(self.type_name()?.decay());
            }
            match self.peek() {
                Some(Token::Punct(',')) if !variadic => self.pos += 1,
                Some(Token::Punct(')')) => {
                    self.pos += 1;
                    break;
                }
                _ => return Err(self.malformed()),
            }
        }
        if params == [TypeRef::Void] {
            params.clear();
        }
        Ok((params, variadic))
    }
}

/// Standard typedefs that map to D builtins (or `core.stdc` types) instead of references.
fn builtin_typedef(name: &str) -> Option<TypeRef> {
    use Primitive::*;
    let primitive = match name {
        "size_t" | "uintptr_t" => SizeT,
        "ptrdiff_t" | "intptr_t" => PtrdiffT,
        "wchar_t" => WChar,
        "int8_t" => Int8,
        "uint8_t" => UInt8,
        "int16_t" => Int16,
        "uint16_t" => UInt16,
        "int32_t" => Int32,
        "uint32_t" => UInt32,
        "int64_t" => Int64,
        "uint64_t" => UInt64,
        "va_list" | "__builtin_va_list" | "__va_list_tag" => VaList,
        _ => return None,
    };
    Some(TypeRef::Primitive(primitive))
}

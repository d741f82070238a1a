//! Renaming of C identifiers that D reserves.

const KEYWORDS: &[&str] = &[
    "__FILE_FULL_PATH__",
    "__FILE__",
    "__FUNCTION__",
    "__LINE__",
    "__MODULE__",
    "__PRETTY_FUNCTION__",
    "__gshared",
    "__parameters",
    "__traits",
    "__vector",
    "abstract",
    "alias",
    "align",
    "asm",
    "assert",
    "auto",
    "body",
    "bool",
    "break",
    "byte",
    "case",
    "cast",
    "catch",
    "cdouble",
    "cent",
    "cfloat",
    "char",
    "class",
    "const",
    "continue",
    "creal",
    "dchar",
    "debug",
    "default",
    "delegate",
    "delete",
    "deprecated",
    "do",
    "double",
    "else",
    "enum",
    "export",
    "extern",
    "false",
    "final",
    "finally",
    "float",
    "for",
    "foreach",
    "foreach_reverse",
    "function",
    "goto",
    "idouble",
    "if",
    "ifloat",
    "immutable",
    "import",
    "in",
    "inout",
    "int",
    "interface",
    "invariant",
    "ireal",
    "is",
    "lazy",
    "long",
    "macro",
    "mixin",
    "module",
    "new",
    "nothrow",
    "null",
    "out",
    "override",
    "package",
    "pragma",
    "private",
    "protected",
    "public",
    "pure",
    "real",
    "ref",
    "return",
    "scope",
    "shared",
    "short",
    "static",
    "struct",
    "super",
    "switch",
    "synchronized",
    "template",
    "this",
    "throw",
    "true",
    "try",
    "typeid",
    "typeof",
    "ubyte",
    "ucent",
    "uint",
    "ulong",
    "union",
    "unittest",
    "ushort",
    "version",
    "void",
    "wchar",
    "while",
    "with",
];

/// Type properties that cannot be redefined by members.
const MEMBER_PROPERTIES: &[&str] = &[
    "alignof", "init", "mangleof", "sizeof", "stringof", "tupleof",
];

/// Returns `name`, with a trailing `_` if it is a D keyword.
pub fn escape(name: &str) -> String {
    match KEYWORDS.binary_search(&name) {
        Ok(_) => format!("{name}_"),
        Err(_) => name.to_string(),
    }
}

/// Like [escape], for names of fields and methods.
pub fn escape_member(name: &str) -> String {
    match MEMBER_PROPERTIES.contains(&name) {
        true => format!("{name}_"),
        false => escape(name),
    }
}

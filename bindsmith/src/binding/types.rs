// SPDX-FileCopyrightText: Copyright © 2020-2025 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0

use binding_config::TypeDef;

use super::Error;

/// A builtin C type and its `ctypes` / Python counterparts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Builtin {
    pub name: &'static str,
    pub ctype: &'static str,
    pub hint: &'static str,
}

macro_rules! builtins {
    ($( $name:literal => $ctype:literal, $hint:literal; )+) => {
        &[ $( Builtin { name: $name, ctype: $ctype, hint: $hint } ),+ ]
    };
}

/// Emitted verbatim as `TYPE_MAPPING` / `PYTHON_TYPE_HINTS`, in this order
pub const BUILTINS: &[Builtin] = builtins! {
    "void" => "None", "None";
    "bool" => "ctypes.c_bool", "bool";
    "char" => "ctypes.c_char", "bytes";
    "short" => "ctypes.c_short", "int";
    "unsigned short" => "ctypes.c_ushort", "int";
    "int" => "ctypes.c_int", "int";
    "unsigned int" => "ctypes.c_uint", "int";
    "long" => "ctypes.c_long", "int";
    "unsigned long" => "ctypes.c_ulong", "int";
    "long long" => "ctypes.c_longlong", "int";
    "unsigned long long" => "ctypes.c_ulonglong", "int";
    "int8_t" => "ctypes.c_int8", "int";
    "uint8_t" => "ctypes.c_uint8", "int";
    "int16_t" => "ctypes.c_int16", "int";
    "uint16_t" => "ctypes.c_uint16", "int";
    "int32_t" => "ctypes.c_int32", "int";
    "uint32_t" => "ctypes.c_uint32", "int";
    "int64_t" => "ctypes.c_int64", "int";
    "uint64_t" => "ctypes.c_uint64", "int";
    "size_t" => "ctypes.c_size_t", "int";
    "float" => "ctypes.c_float", "float";
    "double" => "ctypes.c_double", "float";
    "char*" => "ctypes.c_char_p", "bytes";
    "const char*" => "ctypes.c_char_p", "bytes";
    "void*" => "ctypes.c_void_p", "Optional[int]";
};

pub fn builtin(name: &str) -> Option<&'static Builtin> {
    let name = normalize(name);
    BUILTINS.iter().find(|builtin| builtin.name == name)
}

/// Collapses whitespace and binds `*` to the type, so `const  char *`
/// and `const char*` are the same type
fn normalize(name: &str) -> String {
    name.split_whitespace().collect::<Vec<_>>().join(" ").replace(" *", "*")
}

/// How a C type name is spelled in the generated module
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved {
    /// Expression evaluating to the `ctypes` type
    pub ctype: String,
    /// Annotation used in function signatures
    pub hint: String,
}

/// Resolves type names against the builtin table and the
/// structured types declared so far
pub struct Resolver<'a> {
    declared: &'a [TypeDef],
}

impl<'a> Resolver<'a> {
    pub fn new(declared: &'a [TypeDef]) -> Self {
        Self { declared }
    }

    pub fn resolve(&self, name: &str, context: impl FnOnce() -> String) -> Result<Resolved, Error> {
        if let Some(builtin) = builtin(name) {
            return Ok(Resolved {
                ctype: format!("TYPE_MAPPING[\"{}\"]", builtin.name),
                hint: builtin.hint.to_owned(),
            });
        }

        let name = name.trim();
        if self.declared.iter().any(|def| def.name == name) {
            return Ok(Resolved {
                ctype: name.to_owned(),
                hint: name.to_owned(),
            });
        }

        Err(Error::UnknownType {
            type_name: name.to_owned(),
            context: context(),
        })
    }
}

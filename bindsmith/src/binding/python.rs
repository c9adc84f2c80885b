// SPDX-FileCopyrightText: Copyright © 2020-2025 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0

//! Python `ctypes` wrapper rendering

use std::fmt::Write;

use binding_config::{Config, Field, Function, Param, TypeDef, TypeKind};
use itertools::Itertools;

use super::{
    Error,
    types::{BUILTINS, Resolved, Resolver, builtin},
};
use crate::platform::{self, Platform};

const INDENT: &str = "    ";

/// Reserved words that can't name a function, class or parameter
const KEYWORDS: &[&str] = &[
    "False", "None", "True", "and", "as", "assert", "async", "await", "break", "class", "continue", "def", "del",
    "elif", "else", "except", "finally", "for", "from", "global", "if", "import", "in", "is", "lambda",
    "nonlocal", "not", "or", "pass", "raise", "return", "try", "while", "with", "yield",
];

/// A resolved parameter, under the name it takes in the Python signature
struct Arg<'a> {
    param: &'a Param,
    name: String,
    ty: Resolved,
}

pub fn render(library: &str, config: &Config) -> Result<String, Error> {
    let mut out = String::new();

    header(&mut out, library)?;
    type_tables(&mut out)?;

    for (index, def) in config.types.iter().enumerate() {
        // Earlier declarations only, a class body can't reference a later one
        let resolver = Resolver::new(&config.types[..index]);

        match def.kind {
            TypeKind::Struct => aggregate(&mut out, def, "ctypes.Structure", &resolver)?,
            TypeKind::Union => aggregate(&mut out, def, "ctypes.Union", &resolver)?,
            TypeKind::Enum => enumeration(&mut out, def)?,
        }
    }

    loader(&mut out, library)?;

    let resolver = Resolver::new(&config.types);
    for function in &config.functions {
        wrapper(&mut out, function, &resolver)?;
    }

    writeln!(
        out,
        "\n__all__ = [{}]",
        config.functions.iter().map(|f| quote(&f.name)).join(", ")
    )?;

    Ok(out)
}

fn header(out: &mut String, library: &str) -> Result<(), Error> {
    writeln!(out, r#""""ctypes bindings for {}"#, escape_doc(library))?;
    writeln!(out)?;
    writeln!(out, "Generated by bindsmith, do not edit.")?;
    writeln!(out, r#"""""#)?;
    writeln!(out)?;
    writeln!(out, "import ctypes")?;
    writeln!(out, "import os")?;
    writeln!(out, "import sys")?;
    writeln!(out, "from typing import Any, Dict, List, Optional, Tuple, Union")?;
    Ok(())
}

fn type_tables(out: &mut String) -> Result<(), Error> {
    writeln!(out, "\n# C type to ctypes type")?;
    writeln!(out, "TYPE_MAPPING = {{")?;
    for entry in BUILTINS {
        writeln!(out, "{INDENT}{}: {},", quote(entry.name), entry.ctype)?;
    }
    writeln!(out, "}}")?;

    writeln!(out, "\n# C type to Python type hint")?;
    writeln!(out, "PYTHON_TYPE_HINTS = {{")?;
    for entry in BUILTINS {
        writeln!(out, "{INDENT}{}: {},", quote(entry.name), quote(entry.hint))?;
    }
    writeln!(out, "}}")?;
    Ok(())
}

fn aggregate(out: &mut String, def: &TypeDef, base: &str, resolver: &Resolver<'_>) -> Result<(), Error> {
    identifier(&def.name, || format!("{} name", def.kind))?;

    let fields = def
        .fields
        .iter()
        .map(|field| -> Result<_, Error> {
            if !is_identifier(&field.name) {
                return Err(Error::InvalidIdentifier {
                    name: field.name.clone(),
                    context: field_context(def, field),
                });
            }
            Ok((field, resolver.resolve(&field.ty, || field_context(def, field))?))
        })
        .collect::<Result<Vec<_>, _>>()?;

    writeln!(out, "\n\nclass {}({base}):", def.name)?;
    class_doc(out, def)?;

    if fields.is_empty() {
        writeln!(out, "{INDENT}_fields_ = []")?;
        return Ok(());
    }

    writeln!(out, "{INDENT}_fields_ = [")?;
    for (field, resolved) in fields {
        write!(out, "{INDENT}{INDENT}({}, {}),", quote(&field.name), resolved.ctype)?;
        match comment(&field.description) {
            Some(comment) => writeln!(out, "  # {comment}")?,
            None => writeln!(out)?,
        }
    }
    writeln!(out, "{INDENT}]")?;
    Ok(())
}

fn enumeration(out: &mut String, def: &TypeDef) -> Result<(), Error> {
    identifier(&def.name, || format!("{} name", def.kind))?;

    let base = if def.base_type.trim().is_empty() { "int" } else { def.base_type.as_str() };
    let base = builtin(base)
        .filter(|entry| entry.hint == "int")
        .ok_or_else(|| Error::InvalidEnumBase {
            type_name: def.name.clone(),
            base: base.to_owned(),
        })?;
    let constants = enum_constants(def)?;

    writeln!(out, "\n\nclass {}({}):", def.name, base.ctype)?;
    class_doc(out, def)?;

    if constants.is_empty() {
        writeln!(out, "{INDENT}pass")?;
    }
    for (name, value) in constants {
        writeln!(out, "{INDENT}{name} = {value}")?;
    }
    Ok(())
}

/// Values count up from zero. `NAME = k` takes the value `k` and the
/// names after it continue from `k + 1`.
pub fn enum_constants(def: &TypeDef) -> Result<Vec<(&str, i64)>, Error> {
    let mut next = Some(0_i64);

    def.values
        .iter()
        .map(|entry| {
            let invalid = || Error::InvalidEnumValue {
                type_name: def.name.clone(),
                value: entry.clone(),
            };

            let (name, value) = match entry.split_once('=') {
                Some((name, value)) => (name.trim(), value.trim().parse::<i64>().map_err(|_| invalid())?),
                None => (entry.trim(), next.ok_or_else(invalid)?),
            };

            if !is_identifier(name) || is_keyword(name) {
                return Err(invalid());
            }

            next = value.checked_add(1);
            Ok((name, value))
        })
        .collect()
}

fn loader(out: &mut String, library: &str) -> Result<(), Error> {
    let file_name = |platform: Platform| match platform::library_stem(library) {
        Some(stem) => platform.library_name(stem),
        None => library.to_owned(),
    };

    writeln!(out, "\n\n# Load the shared library for the running platform")?;
    writeln!(out, "_here = os.path.dirname(os.path.abspath(__file__))")?;
    writeln!(out, r#"if sys.platform.startswith("win"):"#)?;
    writeln!(
        out,
        "{INDENT}_lib = ctypes.CDLL(os.path.join(_here, {}))",
        quote(&file_name(Platform::Windows))
    )?;
    writeln!(out, r#"elif sys.platform == "darwin":"#)?;
    writeln!(
        out,
        "{INDENT}_lib = ctypes.CDLL(os.path.join(_here, {}))",
        quote(&file_name(Platform::MacOs))
    )?;
    writeln!(out, "else:")?;
    writeln!(
        out,
        "{INDENT}_lib = ctypes.CDLL(os.path.join(_here, {}))",
        quote(&file_name(Platform::Linux))
    )?;
    Ok(())
}

fn wrapper(out: &mut String, function: &Function, resolver: &Resolver<'_>) -> Result<(), Error> {
    let name = identifier(&function.name, || "function name".to_owned())?;
    let params = function
        .parameters
        .iter()
        .map(|param| -> Result<_, Error> {
            let context = || format!("parameter {} of function {name}", param.name);
            Ok(Arg {
                param,
                name: parameter_name(&param.name, context)?,
                ty: resolver.resolve(&param.ty, context)?,
            })
        })
        .collect::<Result<Vec<_>, _>>()?;
    let ret = resolver.resolve(&function.return_type, || format!("return type of function {name}"))?;

    writeln!(out, "\n\n# Signature of {name}")?;
    writeln!(
        out,
        "_lib.{name}.argtypes = [{}]",
        params.iter().map(|arg| &arg.ty.ctype).join(", ")
    )?;
    writeln!(out, "_lib.{name}.restype = {}", ret.ctype)?;

    writeln!(out, "\n\ndef {name}({}) -> {}:", signature(&params), ret.hint)?;
    function_doc(out, function, &params, &ret)?;
    writeln!(
        out,
        "{INDENT}return _lib.{name}({})",
        params.iter().map(|arg| &arg.name).join(", ")
    )?;
    Ok(())
}

fn signature(params: &[Arg<'_>]) -> String {
    params
        .iter()
        .map(|arg| format!("{}: {}", arg.name, arg.ty.hint))
        .join(", ")
}

fn function_doc(
    out: &mut String,
    function: &Function,
    params: &[Arg<'_>],
    ret: &Resolved,
) -> Result<(), Error> {
    let summary = if function.description.trim().is_empty() {
        format!("Call the native `{}` function.", function.name)
    } else {
        function.description.trim().to_owned()
    };

    writeln!(out, r#"{INDENT}"""{}"#, escape_doc(&summary))?;

    if !function.docstring.trim().is_empty() {
        writeln!(out)?;
        for line in function.docstring.trim().lines() {
            doc_line(out, INDENT, line)?;
        }
    }

    if !params.is_empty() {
        writeln!(out)?;
        writeln!(out, "{INDENT}Args:")?;
        for arg in params {
            let line = format!("{} ({}): {}", arg.name, arg.ty.hint, arg.param.description.trim());
            doc_line(out, &INDENT.repeat(2), line.trim_end())?;
        }
    }

    if !is_void(&function.return_type) {
        writeln!(out)?;
        writeln!(out, "{INDENT}Returns:")?;
        doc_line(out, &INDENT.repeat(2), &format!("{}: {summary}", ret.hint))?;
    }

    writeln!(out, r#"{INDENT}""""#)?;
    Ok(())
}

fn class_doc(out: &mut String, def: &TypeDef) -> Result<(), Error> {
    let description = def.description.trim();
    let summary = if description.is_empty() {
        format!("Native {} `{}`.", def.kind, def.name)
    } else {
        description.to_owned()
    };

    writeln!(out, r#"{INDENT}"""{}""""#, escape_doc(&summary))?;
    writeln!(out)?;
    Ok(())
}

fn doc_line(out: &mut String, indent: &str, line: &str) -> Result<(), Error> {
    if line.trim().is_empty() {
        writeln!(out)?;
    } else {
        writeln!(out, "{indent}{}", escape_doc(line.trim_end()))?;
    }
    Ok(())
}

fn field_context(def: &TypeDef, field: &Field) -> String {
    format!("field {} of {} {}", field.name, def.kind, def.name)
}

fn is_void(ty: &str) -> bool {
    builtin(ty).is_some_and(|entry| entry.name == "void")
}

/// `name` if it can be emitted verbatim as a Python identifier
fn identifier<'a>(name: &'a str, context: impl FnOnce() -> String) -> Result<&'a str, Error> {
    if is_identifier(name) && !is_keyword(name) {
        Ok(name)
    } else {
        Err(Error::InvalidIdentifier {
            name: name.to_owned(),
            context: context(),
        })
    }
}

/// Keywords are still fine as C parameter names, they get a trailing `_`
fn parameter_name(name: &str, context: impl FnOnce() -> String) -> Result<String, Error> {
    if is_keyword(name) {
        Ok(format!("{name}_"))
    } else {
        identifier(name, context).map(str::to_owned)
    }
}

fn is_keyword(name: &str) -> bool {
    KEYWORDS.contains(&name)
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    chars
        .next()
        .is_some_and(|first| first == '_' || first.is_ascii_alphabetic())
        && chars.all(|c| c == '_' || c.is_ascii_alphanumeric())
}

/// Double quoted Python string literal
fn quote(s: &str) -> String {
    let mut quoted = String::with_capacity(s.len() + 2);
    quoted.push('"');
    for c in s.chars() {
        match c {
            '\\' => quoted.push_str(r"\\"),
            '"' => quoted.push_str(r#"\""#),
            '\n' => quoted.push_str(r"\n"),
            '\r' => quoted.push_str(r"\r"),
            '\t' => quoted.push_str(r"\t"),
            c => quoted.push(c),
        }
    }
    quoted.push('"');
    quoted
}

/// Text safe to place inside a triple quoted docstring
fn escape_doc(s: &str) -> String {
    s.replace('\\', r"\\").replace('"', r#"\""#)
}

/// Single line comment text, if there's anything to say
fn comment(s: &str) -> Option<String> {
    let comment = s.split_whitespace().join(" ");
    (!comment.is_empty()).then_some(comment)
}

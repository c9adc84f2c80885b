// SPDX-FileCopyrightText: Copyright © 2020-2026 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0

//! Binding descriptor schema shared by the annotation scanner, the JSON
//! configuration loader and the wrapper emitter.

use std::io;
use std::path::{Path, PathBuf};

use fs_err as fs;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::serde_util::null_as_default;

mod serde_util;

pub fn from_slice(bytes: &[u8]) -> Result<Config, serde_json::Error> {
    serde_json::from_slice(bytes)
}

pub fn from_str(s: &str) -> Result<Config, serde_json::Error> {
    serde_json::from_str(s)
}

/// Read, parse and validate the JSON descriptor at `path`
pub fn load(path: impl AsRef<Path>) -> Result<Config, Error> {
    let path = path.as_ref();

    let bytes = fs::read(path).map_err(|source| Error::Read {
        path: path.to_owned(),
        source,
    })?;
    let config = from_slice(&bytes).map_err(|source| Error::Parse {
        path: path.to_owned(),
        source,
    })?;
    config.validate().map_err(|source| Error::Invalid {
        path: path.to_owned(),
        source,
    })?;

    Ok(config)
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct Config {
    #[serde(default, deserialize_with = "null_as_default")]
    pub functions: Vec<Function>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub includes: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub libraries: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub types: Vec<TypeDef>,
}

impl Config {
    /// Config carrying only `functions`, as produced by source scanning
    pub fn with_functions(functions: Vec<Function>) -> Self {
        Self {
            functions,
            ..Self::default()
        }
    }

    pub fn function(&self, name: &str) -> Option<&Function> {
        self.functions.iter().find(|function| function.name == name)
    }

    pub fn type_def(&self, name: &str) -> Option<&TypeDef> {
        self.types.iter().find(|def| def.name == name)
    }

    /// Ensures at least one function is declared and every function
    /// has both a name and a return type
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.functions.is_empty() {
            return Err(ValidationError::NoFunctions);
        }

        for (index, function) in self.functions.iter().enumerate() {
            if function.name.is_empty() {
                return Err(ValidationError::UnnamedFunction { index });
            }
            if function.return_type.is_empty() {
                return Err(ValidationError::MissingReturnType {
                    name: function.name.clone(),
                });
            }
        }

        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct Function {
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub description: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub parameters: Vec<Param>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub return_type: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub docstring: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct Param {
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(rename = "type", default, deserialize_with = "null_as_default")]
    pub ty: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub description: String,
}

/// A structured foreign type declared ahead of the function wrappers
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct TypeDef {
    pub name: String,
    pub kind: TypeKind,
    #[serde(default, deserialize_with = "null_as_default")]
    pub fields: Vec<Field>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub values: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub base_type: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub description: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct Field {
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(rename = "type", default, deserialize_with = "null_as_default")]
    pub ty: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub description: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, strum::Display, strum::EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum TypeKind {
    Struct,
    Enum,
    Union,
}

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("no functions specified in config")]
    NoFunctions,
    #[error("function at index {index} has no name")]
    UnnamedFunction { index: usize },
    #[error("function {name} has no return type")]
    MissingReturnType { name: String },
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("read config {path:?}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("parse JSON config {path:?}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid config {path:?}")]
    Invalid {
        path: PathBuf,
        #[source]
        source: ValidationError,
    },
}

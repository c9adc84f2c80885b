// SPDX-FileCopyrightText: Copyright © 2020-2025 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0

//! Emits a Python `ctypes` wrapper module for a compiled shared library

use std::{
    fmt, io,
    path::{Path, PathBuf},
};

use binding_config::Config;
use fs_err as fs;
use thiserror::Error;
use tracing::{debug, info};

pub use self::python::render;

mod python;
mod types;

/// File extension of generated wrapper modules
pub const EXTENSION: &str = "py";

/// Renders the wrapper for `library` and writes it to
/// `<output_dir>/<module_name>.py`. Nothing is written if rendering fails.
pub fn generate(module_name: &str, library: &str, output_dir: &Path, config: &Config) -> Result<PathBuf, Error> {
    let module = render(library, config)?;

    let path = output_dir.join(format!("{module_name}.{EXTENSION}"));
    debug!(path = %path.display(), bytes = module.len(), "Rendered wrapper module");

    fs::create_dir_all(output_dir)
        .and_then(|_| fs::write(&path, module))
        .map_err(|source| Error::Write {
            path: path.clone(),
            source,
        })?;

    info!(
        path = %path.display(),
        functions = config.functions.len(),
        types = config.types.len(),
        "Generated Python bindings"
    );

    Ok(path)
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("unknown type `{type_name}` in {context}")]
    UnknownType { type_name: String, context: String },
    #[error("`{name}` is not a valid Python identifier for {context}")]
    InvalidIdentifier { name: String, context: String },
    #[error("invalid value `{value}` for enum {type_name}")]
    InvalidEnumValue { type_name: String, value: String },
    #[error("enum {type_name} needs an integral base type, got `{base}`")]
    InvalidEnumBase { type_name: String, base: String },
    #[error("format wrapper module")]
    Format(#[from] fmt::Error),
    #[error("write wrapper module {path:?}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

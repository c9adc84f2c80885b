// SPDX-FileCopyrightText: Copyright © 2020-2025 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0

//! Extraction of `// EXPORT:` annotation comments from C/C++ sources
//!
//! This is a lexical, line based scan. Each annotation must fit on a
//! single line:
//!
//! ```text
//! // EXPORT: int add(int a, int b) -> "Adds two integers."
//! ```

use std::{
    io,
    path::{Path, PathBuf},
    sync::LazyLock,
};

use binding_config::{Config, Function, Param};
use fs_err as fs;
use regex::Regex;
use thiserror::Error;
use tracing::debug;

static EXPORT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"//\s*EXPORT:\s*(\w+)\s+(\w+)\s*\((.*?)\)\s*->\s*"([^"]*)""#).expect("valid export regex")
});

/// Reads `path` and collects every exported function it annotates.
/// Invalid UTF-8 is replaced, it can only sit on lines that don't match.
pub fn scan(path: &Path) -> Result<Config, Error> {
    let bytes = fs::read(path).map_err(|source| Error::Read {
        path: path.to_owned(),
        source,
    })?;

    let functions = extract(&String::from_utf8_lossy(&bytes));
    debug!(path = %path.display(), count = functions.len(), "Scanned export annotations");

    Ok(Config::with_functions(functions))
}

/// Function descriptors for all annotated lines in `source`, in order.
/// Lines that don't match are skipped.
pub fn extract(source: &str) -> Vec<Function> {
    source.lines().filter_map(parse_line).collect()
}

fn parse_line(line: &str) -> Option<Function> {
    let captures = EXPORT.captures(line)?;

    Some(Function {
        return_type: captures.get(1)?.as_str().to_owned(),
        name: captures.get(2)?.as_str().to_owned(),
        parameters: parse_parameters(captures.get(3)?.as_str()),
        description: captures.get(4)?.as_str().to_owned(),
        docstring: String::new(),
    })
}

/// Each comma separated fragment must be exactly `<type> <name>`,
/// anything else is dropped
fn parse_parameters(params: &str) -> Vec<Param> {
    params
        .split(',')
        .filter_map(|fragment| {
            let mut tokens = fragment.split_whitespace();
            let (Some(ty), Some(name), None) = (tokens.next(), tokens.next(), tokens.next()) else {
                return None;
            };

            Some(Param {
                name: name.trim_end_matches(';').to_owned(),
                ty: ty.to_owned(),
                description: String::new(),
            })
        })
        .collect()
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("failed to read source file {path:?}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

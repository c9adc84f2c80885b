// SPDX-FileCopyrightText: Copyright © 2020-2025 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0

use std::path::Path;

/// Host platform family, as far as toolchain selection and
/// shared library naming are concerned
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display, strum::EnumIter)]
#[strum(serialize_all = "lowercase")]
pub enum Platform {
    Windows,
    MacOs,
    /// Linux and every other unix-like target
    Linux,
}

impl Platform {
    pub const fn current() -> Self {
        if cfg!(windows) {
            Self::Windows
        } else if cfg!(target_os = "macos") {
            Self::MacOs
        } else {
            Self::Linux
        }
    }

    /// Shared library file name for a library called `name`
    pub fn library_name(&self, name: &str) -> String {
        match self {
            Platform::Windows => format!("{name}.dll"),
            Platform::MacOs => format!("lib{name}.dylib"),
            Platform::Linux => format!("lib{name}.so"),
        }
    }

    /// Inverse of [`Platform::library_name`]
    pub fn library_stem<'a>(&self, file_name: &'a str) -> Option<&'a str> {
        let stem = match self {
            Platform::Windows => file_name.strip_suffix(".dll"),
            Platform::MacOs => file_name.strip_prefix("lib")?.strip_suffix(".dylib"),
            Platform::Linux => file_name.strip_prefix("lib")?.strip_suffix(".so"),
        }?;

        (!stem.is_empty()).then_some(stem)
    }

    pub fn executable_suffix(&self) -> &'static str {
        match self {
            Platform::Windows => ".exe",
            Platform::MacOs | Platform::Linux => "",
        }
    }
}

/// Base name of `source` without its extension
pub fn source_stem(source: &Path) -> String {
    source
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Platform conventional shared library name for the given source file
pub fn library_file_name(source: &Path, platform: Platform) -> String {
    platform.library_name(&source_stem(source))
}

/// Recovers the library name from an artifact file name produced
/// for any platform
pub fn library_stem(file_name: &str) -> Option<&str> {
    [Platform::Windows, Platform::MacOs, Platform::Linux]
        .into_iter()
        .find_map(|platform| platform.library_stem(file_name))
}

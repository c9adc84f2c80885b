// SPDX-FileCopyrightText: Copyright © 2020-2025 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0

//! Native compiler discovery
//!
//! A [`Locator`] walks the executable search path looking for one of the
//! known binary names of each toolchain [`Kind`], rejects anything that
//! doesn't resolve to an absolute path and then runs a version probe before
//! handing back a [`Compiler`] descriptor.

use std::{
    env,
    ffi::OsString,
    fmt, io,
    path::{Path, PathBuf},
    process::{self, ExitStatus, Stdio},
    str::FromStr,
};

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::{platform::Platform, util};

mod msvc;

/// Supported toolchain families
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, strum::EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum Kind {
    Gcc,
    Clang,
    Msvc,
}

impl Kind {
    /// Executable names to search for, in order of preference
    pub fn executable_names(&self, platform: Platform) -> Vec<&'static str> {
        let windows = platform == Platform::Windows;

        match self {
            Kind::Gcc if windows => vec!["g++", "gcc", "mingw32-g++", "x86_64-w64-mingw32-g++"],
            Kind::Gcc => vec!["g++", "gcc"],
            Kind::Clang if windows => vec!["clang++", "clang", "llvm-clang++"],
            Kind::Clang => vec!["clang++", "clang"],
            Kind::Msvc => vec!["cl.exe"],
        }
    }

    pub fn is_supported_on(&self, platform: Platform) -> bool {
        match self {
            Kind::Msvc => platform == Platform::Windows,
            Kind::Gcc | Kind::Clang => true,
        }
    }

    /// `cl.exe` has no version flag, it prints its banner when run bare
    fn version_args(&self) -> &'static [&'static str] {
        match self {
            Kind::Gcc | Kind::Clang => &["--version"],
            Kind::Msvc => &[],
        }
    }
}

/// Which toolchain the caller asked for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Preference {
    /// Try the platform's candidates in order
    #[default]
    Auto,
    Only(Kind),
}

impl Preference {
    /// Toolchains attempted for this preference on `platform`, in order
    pub fn candidates(&self, platform: Platform) -> Vec<Kind> {
        match self {
            Preference::Only(kind) => vec![*kind],
            Preference::Auto if platform == Platform::Windows => vec![Kind::Msvc, Kind::Gcc],
            Preference::Auto => vec![Kind::Clang, Kind::Gcc],
        }
    }
}

impl FromStr for Preference {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("auto") {
            return Ok(Preference::Auto);
        }

        s.to_lowercase()
            .parse::<Kind>()
            .map(Preference::Only)
            .map_err(|_| Error::UnsupportedToolchain(s.to_owned()))
    }
}

impl fmt::Display for Preference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Preference::Auto => f.write_str("auto"),
            Preference::Only(kind) => kind.fmt(f),
        }
    }
}

/// A detected toolchain
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Compiler {
    pub kind: Kind,
    /// Absolute path of the compiler driver
    pub path: PathBuf,
    pub version: String,
    pub include_paths: Vec<PathBuf>,
    /// Environment initialisation that must run before the compiler
    pub env_setup: Option<EnvSetup>,
}

/// A script that prepares the process environment for a toolchain,
/// e.g. `vcvarsall.bat x64` run through `cmd.exe /C`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvSetup {
    pub shell: PathBuf,
    pub shell_args: Vec<String>,
    pub script: PathBuf,
    pub script_args: Vec<String>,
}

/// Process environment consulted while locating toolchains
#[derive(Debug, Clone, Default)]
pub struct HostEnv {
    /// `INCLUDE`, set once a developer prompt has been initialised
    pub include: Option<OsString>,
    /// `ComSpec`, the command interpreter
    pub shell: Option<PathBuf>,
}

impl HostEnv {
    pub fn capture() -> Self {
        Self {
            include: env::var_os("INCLUDE"),
            shell: env::var_os("ComSpec").map(PathBuf::from),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Locator {
    search_path: Vec<PathBuf>,
    platform: Platform,
    host: HostEnv,
}

impl Locator {
    pub fn new(search_path: Vec<PathBuf>, platform: Platform, host: HostEnv) -> Self {
        Self {
            search_path,
            platform,
            host,
        }
    }

    /// Locator over the current `PATH` for the host platform
    pub fn from_env() -> Self {
        let search_path = env::var_os("PATH")
            .map(|path| env::split_paths(&path).collect())
            .unwrap_or_default();

        Self::new(search_path, Platform::current(), HostEnv::capture())
    }

    pub fn locate(&self, preference: Preference) -> Result<Compiler, Error> {
        match preference {
            Preference::Only(kind) if !kind.is_supported_on(self.platform) => Err(Error::UnsupportedOnPlatform {
                kind,
                platform: self.platform,
            }),
            Preference::Only(kind) => self.probe(kind),
            Preference::Auto => {
                for kind in preference.candidates(self.platform) {
                    match self.probe(kind) {
                        Ok(compiler) => return Ok(compiler),
                        Err(error @ Error::UnsafePath(_)) => warn!(%kind, %error, "Skipping toolchain"),
                        Err(error) => debug!(%kind, %error, "Toolchain unavailable"),
                    }
                }

                Err(Error::NoToolchain { platform: self.platform })
            }
        }
    }

    /// Detect a single toolchain kind
    pub fn probe(&self, kind: Kind) -> Result<Compiler, Error> {
        let names = kind.executable_names(self.platform);

        let path = names
            .iter()
            .find_map(|name| self.lookup(name))
            .ok_or_else(|| Error::NotFound {
                kind,
                names: names.join(", "),
            })?;

        if !path.is_absolute() {
            return Err(Error::UnsafePath(path));
        }

        let version = probe_version(&path, kind.version_args()).map_err(|source| Error::VersionProbe {
            path: path.clone(),
            source,
        })?;

        let (include_paths, env_setup) = match kind {
            Kind::Msvc => msvc::discover(&path, &self.host),
            Kind::Gcc | Kind::Clang => (vec![], None),
        };

        info!(
            %kind,
            path = %path.display(),
            version = version.lines().next().unwrap_or_default(),
            "Found compiler"
        );

        Ok(Compiler {
            kind,
            path,
            version,
            include_paths,
            env_setup,
        })
    }

    /// First search path entry holding an executable called `name`
    fn lookup(&self, name: &str) -> Option<PathBuf> {
        let suffix = self.platform.executable_suffix();
        let mut file_names = vec![name.to_owned()];
        if !suffix.is_empty() && !name.ends_with(suffix) {
            file_names.insert(0, format!("{name}{suffix}"));
        }

        self.search_path.iter().find_map(|dir| {
            file_names
                .iter()
                .map(|file_name| dir.join(file_name))
                .find(|candidate| util::is_executable(candidate))
        })
    }
}

/// Runs the compiler's version probe and returns its trimmed output
fn probe_version(path: &Path, args: &[&str]) -> Result<String, ProbeError> {
    let output = process::Command::new(path)
        .args(args)
        .stdin(Stdio::null())
        .output()?;

    if !output.status.success() {
        return Err(ProbeError::Exit(output.status));
    }

    let stream = if output.stdout.iter().all(u8::is_ascii_whitespace) {
        output.stderr
    } else {
        output.stdout
    };

    Ok(String::from_utf8_lossy(&stream).trim().to_owned())
}

#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("spawn")]
    Spawn(#[from] io::Error),
    #[error("exited with {0}")]
    Exit(ExitStatus),
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("{kind} compiler not found, tried: {names}")]
    NotFound { kind: Kind, names: String },
    #[error("no supported compiler found on {platform}")]
    NoToolchain { platform: Platform },
    #[error("refusing to run compiler from non-absolute path {0:?}")]
    UnsafePath(PathBuf),
    #[error("failed to get compiler version from {path:?}")]
    VersionProbe {
        path: PathBuf,
        #[source]
        source: ProbeError,
    },
    #[error("{kind} compiler is not supported on {platform}")]
    UnsupportedOnPlatform { kind: Kind, platform: Platform },
    #[error("unsupported compiler type: {0}")]
    UnsupportedToolchain(String),
}

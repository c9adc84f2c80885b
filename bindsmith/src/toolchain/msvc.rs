// SPDX-FileCopyrightText: Copyright © 2020-2025 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0

use std::path::{Path, PathBuf};

use tracing::debug;

use super::{EnvSetup, HostEnv};

const DEFAULT_SHELL: &str = r"C:\Windows\System32\cmd.exe";

/// Best effort discovery of header directories and the developer
/// environment script for the `cl.exe` at `exe`
pub(super) fn discover(exe: &Path, host: &HostEnv) -> (Vec<PathBuf>, Option<EnvSetup>) {
    (include_paths(exe), env_setup(exe, host))
}

/// `include` next to the compiler and in its parent directory
fn include_paths(exe: &Path) -> Vec<PathBuf> {
    let Some(dir) = exe.parent() else {
        return vec![];
    };

    [Some(dir), dir.parent()]
        .into_iter()
        .flatten()
        .map(|dir| dir.join("include"))
        .filter(|include| include.is_dir())
        .collect()
}

/// `vcvarsall.bat` only needs to run if the current process wasn't
/// started from an initialised developer prompt
fn env_setup(exe: &Path, host: &HostEnv) -> Option<EnvSetup> {
    if host.include.is_some() {
        debug!("INCLUDE already set, skipping vcvarsall");
        return None;
    }

    let script = exe
        .ancestors()
        .skip(1)
        .map(|dir| dir.join("Auxiliary").join("Build").join("vcvarsall.bat"))
        .find(|candidate| candidate.is_file())?;

    debug!(script = %script.display(), "Found MSVC environment script");

    Some(EnvSetup {
        shell: host.shell.clone().unwrap_or_else(|| PathBuf::from(DEFAULT_SHELL)),
        shell_args: vec!["/C".to_owned()],
        script,
        script_args: vec![host_arch().to_owned()],
    })
}

fn host_arch() -> &'static str {
    if cfg!(target_pointer_width = "64") { "x64" } else { "x86" }
}

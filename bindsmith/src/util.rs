// SPDX-FileCopyrightText: Copyright © 2020-2025 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0

use std::{io, path::Path};

use fs_err as fs;

pub fn ensure_dir_exists(path: &Path) -> io::Result<()> {
    if !path.exists() {
        fs::create_dir_all(path)?;
    }
    Ok(())
}

/// Regular file that the current user may execute
pub fn is_executable(path: &Path) -> bool {
    std::fs::metadata(path).is_ok_and(|meta| meta.is_file() && has_execute_bit(&meta))
}

#[cfg(unix)]
fn has_execute_bit(meta: &std::fs::Metadata) -> bool {
    use std::os::unix::fs::PermissionsExt;

    meta.permissions().mode() & 0o111 != 0
}

#[cfg(not(unix))]
fn has_execute_bit(_meta: &std::fs::Metadata) -> bool {
    true
}

/// Quote `arg` for a `cmd.exe` batch script line. `%` is doubled
/// so variable references are passed through literally.
pub fn batch_quote(arg: &str) -> String {
    let arg = arg.replace('%', "%%");

    if !arg.is_empty() && !arg.contains([' ', '\t', '"', '&', '|', '<', '>', '^', '(', ')']) {
        return arg;
    }

    format!("\"{}\"", arg.replace('"', "\"\""))
}

#[cfg(test)]
mod test {
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn ensure_dir_exists_is_idempotent() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("a/b/c");

        ensure_dir_exists(&dir).unwrap();
        ensure_dir_exists(&dir).unwrap();

        assert!(dir.is_dir());
    }

    #[test]
    fn missing_and_directories_are_not_executable() {
        let temp = TempDir::new().unwrap();

        assert!(!is_executable(&temp.path().join("nothing")));
        assert!(!is_executable(temp.path()));
    }

    #[cfg(unix)]
    #[test]
    fn execute_bit_is_required() {
        use std::os::unix::fs::PermissionsExt;

        let temp = TempDir::new().unwrap();
        let file = temp.path().join("tool");
        fs::write(&file, "#!/bin/sh\n").unwrap();

        fs::set_permissions(&file, std::fs::Permissions::from_mode(0o644)).unwrap();
        assert!(!is_executable(&file));

        fs::set_permissions(&file, std::fs::Permissions::from_mode(0o755)).unwrap();
        assert!(is_executable(&file));
    }

    #[test]
    fn batch_quoting() {
        assert_eq!(batch_quote("/LD"), "/LD");
        assert_eq!(batch_quote(r"C:\Program Files\include"), r#""C:\Program Files\include""#);
        assert_eq!(batch_quote(""), r#""""#);
        assert_eq!(batch_quote(r#"a"b"#), r#""a""b""#);
        assert_eq!(batch_quote(r"C:\%USERPROFILE%\lib"), r"C:\%%USERPROFILE%%\lib");
        assert_eq!(batch_quote(r"C:\My %TEMP%\out.dll"), r#""C:\My %%TEMP%%\out.dll""#);
    }
}

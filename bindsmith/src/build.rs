// SPDX-FileCopyrightText: Copyright © 2020-2025 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0

//! Shared library compilation

use std::{
    io, iter,
    path::{Path, PathBuf},
    process::{self, ExitStatus, Stdio},
};

use fs_err as fs;
use itertools::Itertools;
use thiserror::Error;
use tracing::{debug, info};

use crate::{
    platform::{self, Platform},
    toolchain::{Compiler, EnvSetup, Kind},
    util,
};

/// Name of the generated script used when a toolchain needs
/// its environment initialised first
pub const BOOTSTRAP_SCRIPT: &str = "compile.bat";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, strum::Display, strum::EnumString)]
pub enum OptLevel {
    #[strum(to_string = "-O0", serialize = "0", serialize = "O0")]
    O0,
    #[strum(to_string = "-O1", serialize = "1", serialize = "O1")]
    O1,
    #[default]
    #[strum(to_string = "-O2", serialize = "2", serialize = "O2")]
    O2,
    #[strum(to_string = "-O3", serialize = "3", serialize = "O3")]
    O3,
}

impl OptLevel {
    fn msvc_flag(&self) -> &'static str {
        match self {
            OptLevel::O0 => "/Od",
            OptLevel::O1 => "/O1",
            // cl.exe has nothing above /O2
            OptLevel::O2 | OptLevel::O3 => "/O2",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Options {
    pub optimization: OptLevel,
    pub debug: bool,
    pub include_paths: Vec<PathBuf>,
    pub library_paths: Vec<PathBuf>,
}

impl Options {
    /// Default options seeded with the toolchain's own header directories
    pub fn for_compiler(compiler: &Compiler) -> Self {
        Self {
            include_paths: compiler.include_paths.clone(),
            ..Self::default()
        }
    }
}

/// Compiles `source` into a shared library inside `output_dir` and
/// returns the library path
pub fn compile(source: &Path, output_dir: &Path, compiler: &Compiler, options: &Options) -> Result<PathBuf, Error> {
    let output_dir = std::path::absolute(output_dir)
        .and_then(|dir| util::ensure_dir_exists(&dir).map(|_| dir))
        .map_err(|source| Error::CreateOutputDir {
            path: output_dir.to_owned(),
            source,
        })?;

    let output = output_dir.join(platform::library_file_name(source, Platform::current()));
    let args = arguments(compiler.kind, source, &output, options);

    let mut command = match &compiler.env_setup {
        Some(setup) => bootstrap_command(setup, &compiler.path, &args, &output_dir)?,
        None => {
            ensure_absolute(&compiler.path)?;

            let mut command = process::Command::new(&compiler.path);
            command.args(&args);
            command
        }
    };

    info!(
        kind = %compiler.kind,
        source = %source.display(),
        output = %output.display(),
        "Compiling shared library"
    );
    debug!(args = %args.join(" "), "Compiler arguments");

    let status = command
        .stdin(Stdio::null())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .status()
        .map_err(|source| {
            Error::CompilationFailed(Failure::Spawn {
                program: PathBuf::from(command.get_program()),
                source,
            })
        })?;

    if !status.success() {
        return Err(Error::CompilationFailed(Failure::Exit(status)));
    }

    Ok(output)
}

/// Compiler specific argument vector producing `output` from `source`
pub fn arguments(kind: Kind, source: &Path, output: &Path, options: &Options) -> Vec<String> {
    match kind {
        Kind::Gcc | Kind::Clang => gnu_arguments(source, output, options),
        Kind::Msvc => msvc_arguments(source, output, options),
    }
}

fn gnu_arguments(source: &Path, output: &Path, options: &Options) -> Vec<String> {
    let mut args = vec!["-shared".to_owned(), "-fPIC".to_owned(), options.optimization.to_string()];

    if options.debug {
        args.push("-g".to_owned());
    }

    args.extend(options.include_paths.iter().map(|dir| format!("-I{}", dir.display())));
    args.extend(options.library_paths.iter().map(|dir| format!("-L{}", dir.display())));
    args.extend(["-o".to_owned(), output.display().to_string(), source.display().to_string()]);

    args
}

fn msvc_arguments(source: &Path, output: &Path, options: &Options) -> Vec<String> {
    let mut args = vec![
        // Create a DLL against the multithreaded DLL runtime
        "/LD".to_owned(),
        "/MD".to_owned(),
        format!("/Fe:{}", output.display()),
        options.optimization.msvc_flag().to_owned(),
    ];

    if options.debug {
        args.push("/Zi".to_owned());
    }

    args.extend(options.include_paths.iter().map(|dir| format!("/I{}", dir.display())));
    args.push(source.display().to_string());

    // Linker options must follow /link
    if !options.library_paths.is_empty() {
        args.push("/link".to_owned());
        args.extend(
            options
                .library_paths
                .iter()
                .map(|dir| format!("/LIBPATH:{}", dir.display())),
        );
    }

    args
}

/// Writes the bootstrap script into `output_dir` and returns the
/// command that runs it
fn bootstrap_command(
    setup: &EnvSetup,
    compiler: &Path,
    args: &[String],
    output_dir: &Path,
) -> Result<process::Command, Error> {
    let script_path = output_dir.join(BOOTSTRAP_SCRIPT);

    ensure_absolute(&setup.shell)?;
    ensure_absolute(&script_path)?;
    ensure_absolute(compiler)?;

    fs::write(&script_path, bootstrap_script(setup, compiler, args)).map_err(|source| Error::WriteScript {
        path: script_path.clone(),
        source,
    })?;

    debug!(script = %script_path.display(), shell = %setup.shell.display(), "Running compiler through environment setup");

    let mut command = process::Command::new(&setup.shell);
    command.args(&setup.shell_args).arg(&script_path);
    Ok(command)
}

/// Batch script initialising the toolchain environment before
/// invoking the compiler
pub fn bootstrap_script(setup: &EnvSetup, compiler: &Path, args: &[String]) -> String {
    let setup_line = iter::once(setup.script.display().to_string())
        .chain(setup.script_args.iter().cloned())
        .map(|arg| util::batch_quote(&arg))
        .join(" ");
    let compile_line = iter::once(compiler.display().to_string())
        .chain(args.iter().cloned())
        .map(|arg| util::batch_quote(&arg))
        .join(" ");

    format!("@echo off\r\ncall {setup_line}\r\nif errorlevel 1 exit /b 1\r\n{compile_line}\r\nexit /b %ERRORLEVEL%\r\n")
}

fn ensure_absolute(path: &Path) -> Result<(), Error> {
    if path.is_absolute() {
        Ok(())
    } else {
        Err(Error::UnsafePath(path.to_owned()))
    }
}

#[derive(Debug, Error)]
pub enum Failure {
    #[error("failed to run {program:?}")]
    Spawn {
        program: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("compiler exited with {0}")]
    Exit(ExitStatus),
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("failed to create output directory {path:?}")]
    CreateOutputDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to write build script {path:?}")]
    WriteScript {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("refusing to run non-absolute path {0:?}")]
    UnsafePath(PathBuf),
    #[error("compilation failed")]
    CompilationFailed(#[source] Failure),
}

#[cfg(test)]
mod test {
    use tempfile::TempDir;

    use super::*;

    fn options() -> Options {
        Options {
            optimization: OptLevel::O3,
            debug: true,
            include_paths: vec!["/opt/include".into()],
            library_paths: vec!["/opt/lib".into()],
        }
    }

    fn compiler(kind: Kind, path: impl Into<PathBuf>) -> Compiler {
        Compiler {
            kind,
            path: path.into(),
            version: "test".to_owned(),
            include_paths: vec![],
            env_setup: None,
        }
    }

    #[test]
    fn parse_opt_level() {
        assert_eq!("3".parse::<OptLevel>().unwrap(), OptLevel::O3);
        assert_eq!("O0".parse::<OptLevel>().unwrap(), OptLevel::O0);
        assert_eq!("-O1".parse::<OptLevel>().unwrap(), OptLevel::O1);
        assert!("fast".parse::<OptLevel>().is_err());
        assert_eq!(OptLevel::default().to_string(), "-O2");
    }

    #[test]
    fn default_options_carry_compiler_includes() {
        let mut compiler = compiler(Kind::Msvc, r"C:\VC\bin\cl.exe");
        compiler.include_paths = vec![r"C:\VC\include".into()];

        let options = Options::for_compiler(&compiler);

        assert_eq!(options.optimization, OptLevel::O2);
        assert!(!options.debug);
        assert_eq!(options.include_paths, compiler.include_paths);
        assert!(options.library_paths.is_empty());
    }

    #[test]
    fn gnu_argument_vector() {
        let args = arguments(
            Kind::Gcc,
            Path::new("math.cpp"),
            Path::new("/out/libmath.so"),
            &options(),
        );

        assert_eq!(
            args,
            [
                "-shared",
                "-fPIC",
                "-O3",
                "-g",
                "-I/opt/include",
                "-L/opt/lib",
                "-o",
                "/out/libmath.so",
                "math.cpp"
            ]
        );
        assert_eq!(
            arguments(Kind::Clang, Path::new("math.cpp"), Path::new("/out/libmath.so"), &options()),
            args
        );
    }

    #[test]
    fn gnu_defaults() {
        let args = arguments(
            Kind::Gcc,
            Path::new("math.cpp"),
            Path::new("libmath.so"),
            &Options::default(),
        );

        assert_eq!(args, ["-shared", "-fPIC", "-O2", "-o", "libmath.so", "math.cpp"]);
    }

    #[test]
    fn msvc_argument_vector() {
        let args = arguments(
            Kind::Msvc,
            Path::new("math.cpp"),
            Path::new("out/math.dll"),
            &options(),
        );

        assert_eq!(
            args,
            [
                "/LD",
                "/MD",
                "/Fe:out/math.dll",
                "/O2",
                "/Zi",
                "/I/opt/include",
                "math.cpp",
                "/link",
                "/LIBPATH:/opt/lib"
            ]
        );
    }

    #[test]
    fn msvc_optimization_mapping() {
        let flag = |optimization| {
            let options = Options {
                optimization,
                ..Options::default()
            };
            arguments(Kind::Msvc, Path::new("a.cpp"), Path::new("a.dll"), &options)[3].clone()
        };

        assert_eq!(flag(OptLevel::O0), "/Od");
        assert_eq!(flag(OptLevel::O1), "/O1");
        assert_eq!(flag(OptLevel::O2), "/O2");
        assert_eq!(flag(OptLevel::O3), "/O2");
    }

    #[test]
    fn bootstrap_script_contents() {
        let setup = EnvSetup {
            shell: r"C:\Windows\System32\cmd.exe".into(),
            shell_args: vec!["/C".to_owned()],
            script: r"C:\Program Files\VC\Auxiliary\Build\vcvarsall.bat".into(),
            script_args: vec!["x64".to_owned()],
        };

        let script = bootstrap_script(
            &setup,
            Path::new(r"C:\VC\bin\cl.exe"),
            &["/LD".to_owned(), r"/IC:\My Headers".to_owned()],
        );

        assert_eq!(
            script,
            "@echo off\r\n\
             call \"C:\\Program Files\\VC\\Auxiliary\\Build\\vcvarsall.bat\" x64\r\n\
             if errorlevel 1 exit /b 1\r\n\
             C:\\VC\\bin\\cl.exe /LD \"/IC:\\My Headers\"\r\n\
             exit /b %ERRORLEVEL%\r\n"
        );
    }

    #[test]
    fn bootstrap_script_keeps_percent_literal() {
        let setup = EnvSetup {
            shell: r"C:\Windows\System32\cmd.exe".into(),
            shell_args: vec!["/C".to_owned()],
            script: r"C:\VC\vcvarsall.bat".into(),
            script_args: vec!["x64".to_owned()],
        };

        let script = bootstrap_script(&setup, Path::new(r"C:\VC\bin\cl.exe"), &[r"/IC:\%PROJECT%\include".to_owned()]);

        assert!(script.contains(r"C:\VC\bin\cl.exe /IC:\%%PROJECT%%\include"));
        assert!(script.ends_with("exit /b %ERRORLEVEL%\r\n"));
    }

    #[test]
    fn relative_compiler_is_rejected() {
        let temp = TempDir::new().unwrap();
        let source = temp.path().join("math.cpp");
        fs::write(&source, "").unwrap();

        let err = compile(
            &source,
            temp.path(),
            &compiler(Kind::Gcc, "bin/g++"),
            &Options::default(),
        )
        .unwrap_err();

        assert!(matches!(err, Error::UnsafePath(ref path) if path == Path::new("bin/g++")));
    }

    #[test]
    fn relative_bootstrap_shell_is_rejected_before_writing() {
        let temp = TempDir::new().unwrap();
        let source = temp.path().join("math.cpp");
        fs::write(&source, "").unwrap();

        let mut compiler = compiler(Kind::Msvc, temp.path().join("cl.exe"));
        compiler.env_setup = Some(EnvSetup {
            shell: "cmd.exe".into(),
            shell_args: vec!["/C".to_owned()],
            script: temp.path().join("vcvarsall.bat"),
            script_args: vec![],
        });

        let err = compile(&source, temp.path(), &compiler, &Options::default()).unwrap_err();

        assert!(matches!(err, Error::UnsafePath(ref path) if path == Path::new("cmd.exe")));
        assert!(!temp.path().join(BOOTSTRAP_SCRIPT).exists());
    }

    #[test]
    fn spawn_failure_is_a_compilation_failure() {
        let temp = TempDir::new().unwrap();
        let source = temp.path().join("math.cpp");
        fs::write(&source, "").unwrap();

        let err = compile(
            &source,
            &temp.path().join("out"),
            &compiler(Kind::Gcc, temp.path().join("missing-g++")),
            &Options::default(),
        )
        .unwrap_err();

        assert!(matches!(err, Error::CompilationFailed(Failure::Spawn { .. })));
        assert_eq!(err.to_string(), "compilation failed");
        // The output directory is still created up front
        assert!(temp.path().join("out").is_dir());
    }

    #[cfg(unix)]
    mod fake {
        use std::os::unix::fs::PermissionsExt;

        use super::*;

        /// Records its arguments and creates whatever follows `-o`
        const RECORDING_COMPILER: &str = r#"#!/bin/sh
echo "$@" > "$(dirname "$0")/args"
while [ $# -gt 0 ]; do
    if [ "$1" = "-o" ]; then
        shift
        touch "$1"
    fi
    shift
done
"#;

        fn install(dir: &Path, body: &str) -> PathBuf {
            let path = dir.join("g++");
            fs::write(&path, body).unwrap();
            fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
            path
        }

        #[test]
        fn builds_platform_named_library() {
            let temp = TempDir::new().unwrap();
            let source = temp.path().join("math.cpp");
            fs::write(&source, "int add(int a, int b) { return a + b; }\n").unwrap();
            let path = install(temp.path(), RECORDING_COMPILER);
            let output_dir = temp.path().join("nested/bindings");

            let library = compile(&source, &output_dir, &compiler(Kind::Gcc, path), &Options::default()).unwrap();

            assert_eq!(library, output_dir.join(Platform::current().library_name("math")));
            assert!(library.is_file());

            let args = fs::read_to_string(temp.path().join("args")).unwrap();
            assert!(args.starts_with("-shared -fPIC -O2 -o "));
            assert!(args.trim_end().ends_with("math.cpp"));
        }

        #[test]
        fn non_zero_exit_is_a_compilation_failure() {
            let temp = TempDir::new().unwrap();
            let source = temp.path().join("broken.cpp");
            fs::write(&source, "this is not c++").unwrap();
            let path = install(temp.path(), "#!/bin/sh\necho 'error: expected unqualified-id' >&2\nexit 1\n");

            let err = compile(&source, temp.path(), &compiler(Kind::Gcc, path), &Options::default()).unwrap_err();

            assert!(matches!(
                err,
                Error::CompilationFailed(Failure::Exit(status)) if status.code() == Some(1)
            ));
        }
    }
}

// SPDX-FileCopyrightText: Copyright © 2020-2025 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0

use std::{
    io,
    path::{Path, PathBuf},
};

use bindsmith::{
    annotation, binding,
    build::{self, OptLevel},
    platform, toolchain,
};
use binding_config::Config;
use clap::{CommandFactory, Parser, error::ErrorKind};
use clap_complete::{
    generate_to,
    shells::{Bash, Fish, Zsh},
};
use clap_mangen::Man;
use crossterm::style::Stylize;
use fs_err::{self as fs, File};
use thiserror::Error;
use tracing::{debug, info, level_filters::LevelFilter, warn};
use tracing_common::{LogConfig, stage::Stage};

const NAME: &str = "bindsmith";

/// Compile a C/C++ source file into a shared library and generate
/// Python ctypes bindings for it
#[derive(Debug, Parser)]
#[command(name = NAME, version, about)]
pub struct Command {
    #[arg(long, value_name = "PATH", required_unless_present_any = ["generate_manpages", "generate_completions"])]
    pub input: Option<PathBuf>,
    #[arg(long, value_name = "DIR", default_value = "./bindings")]
    pub output: PathBuf,
    #[arg(
        long,
        value_name = "TOOLCHAIN",
        default_value = "auto",
        help = "Compiler to use: gcc, clang, msvc or auto"
    )]
    pub compiler: toolchain::Preference,
    #[arg(
        long,
        value_name = "PATH",
        help = "JSON binding descriptor, scans `// EXPORT:` annotations in the input when absent"
    )]
    pub config: Option<PathBuf>,
    #[arg(short = 'O', long, value_name = "LEVEL", default_value = "2")]
    pub optimization: OptLevel,
    #[arg(short = 'g', long, help = "Emit debug symbols")]
    pub debug: bool,
    #[arg(short = 'I', long = "include", value_name = "DIR", help = "Additional include directory")]
    pub include_paths: Vec<PathBuf>,
    #[arg(short = 'L', long = "library", value_name = "DIR", help = "Additional library directory")]
    pub library_paths: Vec<PathBuf>,
    #[arg(long, value_name = "NAME", help = "Name of the generated Python module, defaults to the input file stem")]
    pub module_name: Option<String>,
    #[arg(
        short,
        long,
        help = "Prints additional information about what bindsmith is doing",
        default_value = "false"
    )]
    pub verbose: bool,
    #[arg(long, value_name = "LEVEL[:FORMAT[:DEST]]", help = "Logging configuration, overrides --verbose")]
    pub log: Option<LogConfig>,
    #[arg(long, hide = true)]
    pub generate_manpages: Option<PathBuf>,
    #[arg(long, hide = true)]
    pub generate_completions: Option<PathBuf>,
}

pub fn process() -> Result<(), Error> {
    let mut command = match Command::try_parse() {
        Ok(command) => command,
        Err(err) if matches!(err.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => err.exit(),
        Err(err) => {
            let _ = err.print();
            std::process::exit(1);
        }
    };

    if let Some(dir) = command.generate_manpages.take() {
        fs::create_dir_all(&dir)?;
        let mut buffer = File::create(dir.join(format!("{NAME}.1")))?;
        Man::new(Command::command()).render(&mut buffer)?;
        return Ok(());
    }

    if let Some(dir) = command.generate_completions.take() {
        fs::create_dir_all(&dir)?;
        let mut cmd = Command::command();
        generate_to(Bash, &mut cmd, NAME, &dir)?;
        generate_to(Fish, &mut cmd, NAME, &dir)?;
        generate_to(Zsh, &mut cmd, NAME, &dir)?;
        return Ok(());
    }

    let log = command.log.take().unwrap_or_else(|| {
        LogConfig::with_level(if command.verbose {
            LevelFilter::DEBUG
        } else {
            LevelFilter::INFO
        })
    });
    tracing_common::init(log).map_err(Error::Logging)?;

    let output = run(command)?;

    println!("{} {}", "Bindings generated in".green(), output.display());

    Ok(())
}

/// Runs the whole pipeline, returning the output directory
fn run(command: Command) -> Result<PathBuf, Error> {
    let input = command.input.ok_or(Error::MissingInput)?;
    let module_name = command
        .module_name
        .unwrap_or_else(|| platform::source_stem(&input));

    debug!(
        input = %input.display(),
        output = %command.output.display(),
        compiler = %command.compiler,
        module = %module_name,
        "Starting pipeline"
    );

    let stage = Stage::begin("locate");
    let compiler = toolchain::Locator::from_env().locate(command.compiler)?;
    info!(
        kind = %compiler.kind,
        path = %compiler.path.display(),
        version = %compiler.version,
        "Using compiler"
    );
    stage.finish();

    let stage = Stage::begin("describe");
    let config = describe(&input, command.config.as_deref())?;
    stage.finish();

    let stage = Stage::begin("compile");
    let config_dir = command
        .config
        .as_deref()
        .and_then(Path::parent)
        .map(Path::to_path_buf)
        .unwrap_or_default();
    let mut options = build::Options::for_compiler(&compiler);
    options.optimization = command.optimization;
    options.debug = command.debug;
    options.include_paths.extend(command.include_paths);
    options.include_paths.extend(config.includes.iter().map(|dir| config_dir.join(dir)));
    options.library_paths.extend(command.library_paths);
    options.library_paths.extend(config.libraries.iter().map(|dir| config_dir.join(dir)));

    let library = build::compile(&input, &command.output, &compiler, &options)?;
    stage.finish();

    let stage = Stage::begin("generate");
    let library_name = library
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    binding::generate(&module_name, &library_name, &command.output, &config)?;
    stage.finish();

    Ok(command.output)
}

/// Function and type descriptors from the JSON config when given,
/// otherwise from the input's annotations
fn describe(input: &Path, config: Option<&Path>) -> Result<Config, Error> {
    let config = match config {
        Some(path) => binding_config::load(path)?,
        None => annotation::scan(input)?,
    };

    if config.functions.is_empty() {
        warn!(input = %input.display(), "No exported functions found");
    }

    Ok(config)
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("--input is required")]
    MissingInput,
    #[error("toolchain")]
    Toolchain(#[from] toolchain::Error),
    #[error("config")]
    Config(#[from] binding_config::Error),
    #[error("annotations")]
    Annotation(#[from] annotation::Error),
    #[error("build")]
    Build(#[from] build::Error),
    #[error("bindings")]
    Binding(#[from] binding::Error),
    #[error("initialise logging")]
    Logging(#[source] io::Error),
    #[error("io error")]
    Io(#[from] io::Error),
}

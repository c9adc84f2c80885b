// SPDX-FileCopyrightText: Copyright © 2020-2025 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0

pub mod stage;

use std::{fs::OpenOptions, io, path::PathBuf, str::FromStr};

use tracing::level_filters::LevelFilter;
use tracing_subscriber::{
    fmt::{self, writer::BoxMakeWriter},
    layer::SubscriberExt as _,
    util::SubscriberInitExt as _,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputDestination {
    Stderr,
    File(PathBuf),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogConfig {
    pub level: LevelFilter,
    pub format: OutputFormat,
    pub destination: OutputDestination,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: LevelFilter::INFO,
            format: OutputFormat::Text,
            destination: OutputDestination::Stderr,
        }
    }
}

impl LogConfig {
    pub fn with_level(level: LevelFilter) -> Self {
        Self {
            level,
            ..Self::default()
        }
    }
}

/// Initialize the global tracing subscriber
///
/// Compiler diagnostics are forwarded on stdout / stderr directly, so
/// log output defaults to stderr to stay out of the way of generated paths
/// printed on stdout.
pub fn init(config: LogConfig) -> io::Result<()> {
    let LogConfig {
        level,
        format,
        destination,
    } = config;

    let (writer, ansi) = match destination {
        OutputDestination::Stderr => (BoxMakeWriter::new(io::stderr), true),
        OutputDestination::File(path) => {
            let file = OpenOptions::new().create(true).append(true).open(&path)?;
            (BoxMakeWriter::new(file), false)
        }
    };

    let filter = tracing_subscriber::filter::Targets::new().with_default(level);
    let registry = tracing_subscriber::registry().with(filter);

    match format {
        OutputFormat::Text => registry
            .with(fmt::layer().with_ansi(ansi).with_target(false).with_writer(writer))
            .init(),
        OutputFormat::Json => registry.with(fmt::layer().json().with_writer(writer)).init(),
    }

    Ok(())
}

impl FromStr for LogConfig {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split(':').collect();

        if parts.is_empty() || parts.len() > 3 {
            return Err("Invalid log format. Expected: <level>[:<format>][:<destination>]".to_owned());
        }

        let level = match parts[0].to_lowercase().as_str() {
            "off" => LevelFilter::OFF,
            "trace" => LevelFilter::TRACE,
            "debug" => LevelFilter::DEBUG,
            "info" => LevelFilter::INFO,
            "warn" => LevelFilter::WARN,
            "error" => LevelFilter::ERROR,
            _ => {
                return Err(format!(
                    "Invalid log level: {}. Valid levels: off, trace, debug, info, warn, error",
                    parts[0]
                ));
            }
        };

        let format = match parts.get(1).map(|format| format.to_lowercase()) {
            None => OutputFormat::Text,
            Some(format) if format == "text" => OutputFormat::Text,
            Some(format) if format == "json" => OutputFormat::Json,
            Some(_) => return Err(format!("Invalid log format: {}. Valid formats: text, json", parts[1])),
        };

        let destination = match parts.get(2) {
            None | Some(&"stderr") => OutputDestination::Stderr,
            Some(path) => OutputDestination::File(PathBuf::from(path)),
        };

        Ok(LogConfig {
            level,
            format,
            destination,
        })
    }
}

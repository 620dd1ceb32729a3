//! Drives the command-line program.

use crate::commands::{self, Context};
use crate::conf;
use crate::data;
use crate::markup::Renderer;
use crate::store;
use crate::template;
use clap::{Args, Parser, Subcommand};
use clap_verbosity_flag::Verbosity;
use colored::Colorize;
use log::info;
use std::fmt;
use std::fs::File;
use std::io::{self, BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::process;
use thiserror::Error;

pub fn die(error_code: i32, message: &str) -> ! {
    eprintln!("{}", message);
    process::exit(error_code);
}

/// Formats a fatal error for display, with a red `error:` prefix if `color`
/// is set.
pub fn error_message(err: &impl fmt::Display, color: bool) -> String {
    if color {
        format!("{} {err}", "error:".red())
    } else {
        format!("error: {err}")
    }
}

/// An error running the program.
#[derive(Debug, Error)]
pub enum Error {
    /// The data directory could not be loaded.
    #[error(transparent)]
    Data(#[from] data::Error),

    /// A data file could not be rewritten.
    #[error("{}: {source}", path.display())]
    Store {
        path: PathBuf,
        #[source]
        source: store::Error,
    },

    /// The template could not be processed.
    #[error(transparent)]
    Template(#[from] template::Error),

    /// The template was not found in any template directory.
    #[error("no such template: {0}")]
    TemplateNotFound(String),

    /// Output could not be written, or the template could not be opened.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Program configuration.
#[derive(Debug, Parser)]
#[command(version)]
#[command(about = "Renders CVs and publication lists from plain-text records", long_about = None)]
pub struct Config {
    #[command(flatten)]
    verbosity: Verbosity,

    #[command(subcommand)]
    command: Command,
}

impl Config {
    pub fn verbosity(&self) -> Verbosity {
        self.verbosity
    }
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Render a template as LaTeX
    Latex(RenderConfig),

    /// Render a template as HTML
    Html(RenderConfig),

    /// Set a field in matching records of a data file, in place
    Set {
        /// Data file to change
        file: PathBuf,

        /// Only change records where FIELD has VALUE (may be repeated)
        #[arg(long = "where", value_name = "FIELD=VALUE", value_parser = parse_condition)]
        conditions: Vec<(String, String)>,

        /// Field to set
        field: String,

        /// New value of the field
        value: String,
    },
}

#[derive(Args, Debug)]
struct RenderConfig {
    /// Look for templates in DIR before $VITAE_TEMPLATES and ./templates
    #[arg(long = "templates", value_name = "DIR")]
    templates: Vec<PathBuf>,

    /// Template to render
    template: String,

    /// Directory of data files
    #[arg(default_value = ".")]
    datadir: PathBuf,
}

fn parse_condition(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((field, value)) if !field.trim().is_empty() => {
            Ok((field.trim().to_string(), value.trim().to_string()))
        }
        _ => Err(format!("expected FIELD=VALUE, got {s:?}")),
    }
}

/// Runs the command-line program.
#[derive(Debug)]
pub struct Runner {
    config: Config,
}

impl Runner {
    /// Create a new program runner using the given `config`.
    pub fn new(config: Config) -> Runner {
        Self { config }
    }

    /// Run the command-line program using its stored configuration options,
    /// writing to standard output.
    pub fn run(&self) -> Result<(), Error> {
        let stdout = io::stdout();
        let mut out = stdout.lock();
        self.run_to(&mut out)
    }

    /// Like [`Runner::run()`], but writes to `out`.
    pub fn run_to(&self, out: &mut impl Write) -> Result<(), Error> {
        match &self.config.command {
            Command::Latex(config) => self.run_render(Renderer::Latex, config, out),
            Command::Html(config) => self.run_render(Renderer::Html, config, out),
            Command::Set {
                file,
                conditions,
                field,
                value,
            } => self.run_set(file, conditions, field, value, out),
        }
    }

    fn run_render(
        &self,
        renderer: Renderer,
        config: &RenderConfig,
        out: &mut impl Write,
    ) -> Result<(), Error> {
        let mut dirs = config.templates.clone();
        dirs.extend(conf::template_dirs());

        let path = conf::find_template(&dirs, &config.template)
            .ok_or_else(|| Error::TemplateNotFound(config.template.clone()))?;
        info!("Rendering {} as {renderer}", path.display());

        let items = data::load(&config.datadir)?;
        let mut context = Context::new(renderer, items, dirs);
        let commands = commands::commands();
        let input = BufReader::new(File::open(&path)?).lines();

        for line in template::process(&commands, &mut context, input) {
            writeln!(out, "{}", line?)?;
        }
        out.flush()?;
        Ok(())
    }

    fn run_set(
        &self,
        file: &Path,
        conditions: &[(String, String)],
        field: &str,
        value: &str,
        out: &mut impl Write,
    ) -> Result<(), Error> {
        let changed = store::set_in_place(file, field, value, |record| {
            conditions
                .iter()
                .all(|(key, expected)| record.get(key) == Some(expected.as_str()))
        })
        .map_err(|source| Error::Store {
            path: file.to_path_buf(),
            source,
        })?;

        info!("Set {field} in {changed} records of {}", file.display());
        writeln!(
            out,
            "{changed} record{} changed",
            if changed == 1 { "" } else { "s" }
        )?;
        Ok(())
    }
}

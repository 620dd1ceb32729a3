// SPDX-License-Identifier: Apache-2.0
// Copyright (C) 2025 Michael Dippery <michael@monkey-robot.com>

//! A line-oriented template interpreter.
//!
//! Templates are ordinary LaTeX or HTML files. A line whose first word is
//! the name of a registered command is replaced by that command's output;
//! every other line is copied through. A command can also open a *span*,
//! in which case the following lines, up to a line reading `END`, are handed
//! to the command instead of being copied:
//!
//! ```text
//! <h2>Refereed</h2>
//! FORMAT <li>|full_authors|, |lcite|</li>
//! PUBLIST refereed
//! MARKUP
//! <i>Last updated by hand.</i>
//! END
//! ```
//!
//! Commands share a context object, so a command can change how later
//! commands behave (`FORMAT` above sets the line format `PUBLIST` uses).

use crate::format;
use crate::markup::html;
use log::{debug, trace};
use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::io;
use thiserror::Error;

/// The line that ends a span.
///
/// Trailing whitespace is ignored when matching, so `END  ` also closes a
/// span. Leading whitespace is not: `  END` is span content.
pub const END: &str = "END";

/// An error raised by a command.
#[derive(Debug, Error)]
pub enum CommandError {
    /// The command was used before something it depends on was set up.
    #[error("{0}")]
    Precondition(String),

    /// The command was given arguments it cannot use.
    #[error("{0}")]
    Usage(String),

    /// A record could not be formatted.
    #[error(transparent)]
    Format(#[from] format::Error),

    /// A span's markup could not be parsed.
    #[error(transparent)]
    Html(#[from] html::Error),

    /// Reading a supporting file failed.
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// An error processing a template.
#[derive(Debug, Error)]
pub enum Error {
    /// The template ended while a span was still open.
    #[error("line {line}: {command} span is never closed with END")]
    UnterminatedSpan { command: String, line: usize },

    /// A command failed.
    #[error("line {line}: {command}: {source}")]
    Command {
        command: String,
        line: usize,
        #[source]
        source: CommandError,
    },

    /// The template could not be read.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// The result of processing a template.
pub type Result<T> = std::result::Result<T, Error>;

/// A command that consumes the lines of a span.
pub trait Span<C> {
    /// Receives one line of the span, without its line terminator.
    fn accumulate(&mut self, line: &str);

    /// Called when the span is closed. Returns the lines to emit.
    fn finish(self: Box<Self>, context: &mut C)
    -> std::result::Result<Vec<String>, CommandError>;
}

/// What a command produces.
pub enum Output<C> {
    /// A single line.
    Line(String),

    /// Any number of lines.
    Lines(Vec<String>),

    /// A span handler that takes over until the next `END` line.
    Span(Box<dyn Span<C>>),
}

impl<C> Output<C> {
    /// Opens a span handled by `span`.
    pub fn span(span: impl Span<C> + 'static) -> Self {
        Output::Span(Box::new(span))
    }
}

impl<C> From<String> for Output<C> {
    fn from(line: String) -> Self {
        Output::Line(line)
    }
}

impl<C> From<Vec<String>> for Output<C> {
    fn from(lines: Vec<String>) -> Self {
        Output::Lines(lines)
    }
}

impl<C> fmt::Debug for Output<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Output::Line(line) => f.debug_tuple("Line").field(line).finish(),
            Output::Lines(lines) => f.debug_tuple("Lines").field(lines).finish(),
            Output::Span(_) => f.write_str("Span(..)"),
        }
    }
}

/// The result of running a command.
pub type CommandResult<C> = std::result::Result<Output<C>, CommandError>;

type Command<C> = Box<dyn Fn(&mut C, &[&str]) -> CommandResult<C>>;

/// A table of commands, looked up by exact name.
pub struct Commands<C> {
    table: HashMap<String, Command<C>>,
}

impl<C> Commands<C> {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self {
            table: HashMap::new(),
        }
    }

    /// Registers `command` under `name`, replacing any command already
    /// registered under that name.
    pub fn register<F>(&mut self, name: impl Into<String>, command: F)
    where
        F: Fn(&mut C, &[&str]) -> CommandResult<C> + 'static,
    {
        self.table.insert(name.into(), Box::new(command));
    }

    /// Builder-style version of [`Commands::register()`].
    pub fn with<F>(mut self, name: impl Into<String>, command: F) -> Self
    where
        F: Fn(&mut C, &[&str]) -> CommandResult<C> + 'static,
    {
        self.register(name, command);
        self
    }

    /// True if a command called `name` exists.
    pub fn contains(&self, name: &str) -> bool {
        self.table.contains_key(name)
    }

    /// The names of all registered commands, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.table.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    fn get(&self, name: &str) -> Option<&Command<C>> {
        self.table.get(name)
    }
}

impl<C> Default for Commands<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C> fmt::Debug for Commands<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Commands")
            .field("names", &self.names())
            .finish()
    }
}

struct ActiveSpan<C> {
    command: String,
    line: usize,
    handler: Box<dyn Span<C>>,
}

/// Lazily processes a template, yielding output lines.
///
/// Created by [`process()`]. Iteration stops after the first error.
pub struct Interpreter<'a, C, I> {
    commands: &'a Commands<C>,
    context: &'a mut C,
    input: I,
    line: usize,
    span: Option<ActiveSpan<C>>,
    pending: VecDeque<String>,
    done: bool,
}

impl<C, I> Interpreter<'_, C, I>
where
    I: Iterator<Item = io::Result<String>>,
{
    fn step(&mut self, raw: String) -> Result<()> {
        if let Some(active) = self.span.as_mut() {
            if raw.trim_end() != END {
                active.handler.accumulate(&raw);
                return Ok(());
            }

            if let Some(active) = self.span.take() {
                trace!("line {}: closing {} span", self.line, active.command);
                let lines = active
                    .handler
                    .finish(&mut *self.context)
                    .map_err(|source| Error::Command {
                        command: active.command,
                        line: self.line,
                        source,
                    })?;
                self.pending.extend(lines);
            }
            return Ok(());
        }

        let text = raw.trim_end();
        let mut words = text.split_whitespace();
        let commands = self.commands;
        let Some((name, command)) = words
            .next()
            .and_then(|name| commands.get(name).map(|command| (name, command)))
        else {
            self.pending.push_back(text.to_string());
            return Ok(());
        };

        let args: Vec<&str> = words.collect();
        debug!("line {}: {name} {}", self.line, args.join(" "));

        let output = command(&mut *self.context, &args).map_err(|source| Error::Command {
            command: name.to_string(),
            line: self.line,
            source,
        })?;

        match output {
            Output::Line(line) => self.pending.push_back(line),
            Output::Lines(lines) => self.pending.extend(lines),
            Output::Span(handler) => {
                self.span = Some(ActiveSpan {
                    command: name.to_string(),
                    line: self.line,
                    handler,
                })
            }
        }

        Ok(())
    }
}

impl<C, I> Iterator for Interpreter<'_, C, I>
where
    I: Iterator<Item = io::Result<String>>,
{
    type Item = Result<String>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(line) = self.pending.pop_front() {
                return Some(Ok(line));
            }

            if self.done {
                return None;
            }

            let raw = match self.input.next() {
                Some(Ok(raw)) => raw,
                Some(Err(err)) => {
                    self.done = true;
                    return Some(Err(err.into()));
                }
                None => {
                    self.done = true;
                    return self.span.take().map(|active| {
                        Err(Error::UnterminatedSpan {
                            command: active.command,
                            line: active.line,
                        })
                    });
                }
            };

            self.line += 1;
            if let Err(err) = self.step(raw) {
                self.done = true;
                self.pending.clear();
                return Some(Err(err));
            }
        }
    }
}

/// Processes the template read from `input`.
///
/// Each input line should have its line terminator removed already, as
/// [`BufRead::lines()`](std::io::BufRead::lines) does.
pub fn process<'a, C, I>(
    commands: &'a Commands<C>,
    context: &'a mut C,
    input: I,
) -> Interpreter<'a, C, I::IntoIter>
where
    I: IntoIterator<Item = io::Result<String>>,
{
    Interpreter {
        commands,
        context,
        input: input.into_iter(),
        line: 0,
        span: None,
        pending: VecDeque::new(),
        done: false,
    }
}

/// Processes a template held in memory, collecting all output lines.
pub fn process_str<C>(
    commands: &Commands<C>,
    context: &mut C,
    template: &str,
) -> Result<Vec<String>> {
    process(
        commands,
        context,
        template.lines().map(|line| Ok(line.to_string())),
    )
    .collect()
}

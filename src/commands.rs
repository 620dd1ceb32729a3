// SPDX-License-Identifier: Apache-2.0
// Copyright (C) 2025 Michael Dippery <michael@monkey-robot.com>

//! The commands available to CV templates.
//!
//! | Command            | Arguments          | Output                                        |
//! |--------------------|--------------------|-----------------------------------------------|
//! | `CITESTATS`        | template file      | citation statistics, formatted by the file    |
//! | `FORMAT`           | inline template    | nothing; sets the format for later lists      |
//! | `MYABBREVNAME`     | text               | nothing; sets my name in `short_authors`      |
//! | `PUBLIST`          | group              | one line per publication in the group         |
//! | `RMISCLIST`        | sections           | one line per record, newest first             |
//! | `RMISCLIST_IF`     | sections, field    | as `RMISCLIST`, records with `field = y` only |
//! | `RMISCLIST_IF_NOT` | sections, field    | as `RMISCLIST`, all other records             |
//! | `TODAY.`           |                    | today's date, e.g. "May 23, 2025."            |
//! | `MARKUP`           | span               | the span's HTML, rendered for the target      |
//!
//! Sections are separated by commas, without spaces: `RMISCLIST talk,poster`.

use crate::clock::{Clock, SystemClock};
use crate::conf;
use crate::format::{Formatter, Literals};
use crate::markup::{Renderer, html};
use crate::pubs::{self, CiteStats, PubGroups};
use crate::record::Record;
use crate::template::{CommandError, CommandResult, Commands, Output, Span};
use crate::text::{NBSP, month_abbrev};
use chrono::Datelike;
use log::debug;
use std::collections::HashSet;
use std::fs;
use std::path::PathBuf;

/// The state shared by the commands in one template.
pub struct Context {
    /// The output format.
    pub renderer: Renderer,

    /// Every record in the data directory, in file order.
    pub items: Vec<Record>,

    /// The `[pub]` records, grouped.
    pub groups: PubGroups,

    /// The format set by the last `FORMAT` command.
    pub formatter: Option<Formatter>,

    /// Replaces my surname in short author lists.
    pub my_abbrev_name: Option<String>,

    /// Directories searched for `CITESTATS` templates.
    pub templates: Vec<PathBuf>,

    clock: Box<dyn Clock>,
}

impl Context {
    /// Creates a context for rendering `items`.
    pub fn new(renderer: Renderer, items: Vec<Record>, templates: Vec<PathBuf>) -> Self {
        let groups = PubGroups::partition(items.iter().filter(|item| item.section() == "pub"));
        debug!(
            "{} records, {} publications",
            items.len(),
            groups.all().len()
        );
        Self {
            renderer,
            items,
            groups,
            formatter: None,
            my_abbrev_name: None,
            templates,
            clock: Box::new(SystemClock),
        }
    }

    /// Uses `clock` to tell the date.
    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    fn formatter(&self, command: &str) -> Result<&Formatter, CommandError> {
        self.formatter.as_ref().ok_or_else(|| {
            CommandError::Precondition(format!("cannot use {command} before using FORMAT"))
        })
    }
}

/// All the template commands.
pub fn commands() -> Commands<Context> {
    Commands::new()
        .with("CITESTATS", cite_stats)
        .with("FORMAT", format)
        .with("MYABBREVNAME", my_abbrev_name)
        .with("PUBLIST", pub_list)
        .with("RMISCLIST", rev_misc_list)
        .with("RMISCLIST_IF", rev_misc_list_if)
        .with("RMISCLIST_IF_NOT", rev_misc_list_if_not)
        .with("TODAY.", today)
        .with("MARKUP", markup)
}

fn expect_args<'a, const N: usize>(
    args: &[&'a str],
    usage: &str,
) -> Result<[&'a str; N], CommandError> {
    <[&str; N]>::try_from(args).map_err(|_| {
        CommandError::Usage(format!(
            "expected {N} argument{} ({usage}), got {}",
            if N == 1 { "" } else { "s" },
            args.len()
        ))
    })
}

fn usage(err: pubs::Error) -> CommandError {
    CommandError::Usage(err.to_string())
}

fn cite_stats(ctx: &mut Context, args: &[&str]) -> CommandResult<Context> {
    let [name] = expect_args::<1>(args, "TEMPLATE")?;
    let path = conf::find_template(&ctx.templates, name)
        .ok_or_else(|| CommandError::Usage(format!("no such template: {name}")))?;
    debug!("Formatting citation statistics with {}", path.display());

    let text = fs::read_to_string(&path)?;
    let text = text.strip_suffix('\n').unwrap_or(&text);
    let text = text.strip_suffix('\r').unwrap_or(text);

    let stats = CiteStats::compute(ctx.groups.all_formal());
    let formatter = Formatter::new(ctx.renderer, Literals::Escaped, text);
    Ok(formatter.apply(&stats)?.into())
}

fn format(ctx: &mut Context, args: &[&str]) -> CommandResult<Context> {
    ctx.formatter = Some(Formatter::new(
        ctx.renderer,
        Literals::Verbatim,
        &args.join(" "),
    ));
    Ok(String::new().into())
}

fn my_abbrev_name(ctx: &mut Context, args: &[&str]) -> CommandResult<Context> {
    ctx.my_abbrev_name = Some(args.join(" "));
    Ok(String::new().into())
}

fn pub_list(ctx: &mut Context, args: &[&str]) -> CommandResult<Context> {
    let [group] = expect_args::<1>(args, "GROUP")?;
    let formatter = ctx.formatter("PUBLIST")?;
    let pubs = ctx.groups.get(group).map_err(usage)?;
    let count = pubs.len();

    let mut lines = Vec::with_capacity(count);
    for (i, publication) in pubs.into_iter().enumerate() {
        let mut info =
            pubs::cite_info(publication, ctx.my_abbrev_name.as_deref()).map_err(usage)?;
        info.set("number", i + 1);
        info.set("rev_number", count - i);
        lines.push(formatter.apply(&info)?);
    }

    Ok(lines.into())
}

fn misc_list(
    ctx: &Context,
    command: &str,
    sections: &str,
    gate: impl Fn(&Record) -> bool,
) -> CommandResult<Context> {
    let formatter = ctx.formatter(command)?;
    let sections: HashSet<&str> = sections.split(',').collect();

    let lines = ctx
        .items
        .iter()
        .rev()
        .filter(|item| sections.contains(item.section()) && gate(*item))
        .map(|item| formatter.apply(item))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(lines.into())
}

fn rev_misc_list(ctx: &mut Context, args: &[&str]) -> CommandResult<Context> {
    let [sections] = expect_args::<1>(args, "SECTIONS")?;
    misc_list(ctx, "RMISCLIST", sections, |_| true)
}

fn rev_misc_list_if(ctx: &mut Context, args: &[&str]) -> CommandResult<Context> {
    let [sections, gate] = expect_args::<2>(args, "SECTIONS GATEFIELD")?;
    misc_list(ctx, "RMISCLIST_IF", sections, |item| item.is_yes(gate))
}

fn rev_misc_list_if_not(ctx: &mut Context, args: &[&str]) -> CommandResult<Context> {
    let [sections, gate] = expect_args::<2>(args, "SECTIONS GATEFIELD")?;
    misc_list(ctx, "RMISCLIST_IF_NOT", sections, |item| !item.is_yes(gate))
}

fn today(ctx: &mut Context, args: &[&str]) -> CommandResult<Context> {
    let [] = expect_args::<0>(args, "no arguments")?;
    let today = ctx.clock.today();
    let text = format!(
        "{}{NBSP}{},{NBSP}{}.",
        month_abbrev(today.month()).unwrap_or_default(),
        today.day(),
        today.year()
    );
    Ok(ctx.renderer.escape(&text).into())
}

fn markup(_ctx: &mut Context, args: &[&str]) -> CommandResult<Context> {
    let [] = expect_args::<0>(args, "no arguments")?;
    Ok(Output::span(MarkupSpan::default()))
}

/// Collects restricted HTML up to `END` and renders it for the target.
#[derive(Debug, Default)]
struct MarkupSpan {
    lines: Vec<String>,
}

impl Span<Context> for MarkupSpan {
    fn accumulate(&mut self, line: &str) {
        self.lines.push(line.to_string());
    }

    fn finish(self: Box<Self>, ctx: &mut Context) -> Result<Vec<String>, CommandError> {
        let tree = html::parse(&self.lines.join("\n"))?;
        let rendered = ctx.renderer.markup(&tree);
        Ok(rendered.lines().map(String::from).collect())
    }
}

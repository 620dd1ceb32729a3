// SPDX-License-Identifier: Apache-2.0
// Copyright (C) 2025 Michael Dippery <michael@monkey-robot.com>

//! Reading and writing data files.
//!
//! Data files are a simple ini-like format:
//!
//! ```text
//! # Comments run to the end of the line.
//! [pub]
//! title = A long title that wraps
//!   onto an indented continuation line
//! authors = A. Person; B. Person
//! note = "quoted values may contain \"escapes\"\nand # signs"
//! ```
//!
//! Each bracketed header starts a new [`Record`]. A field's value runs until
//! a blank line, another field, or another header. The quoted form is
//! complete on its own line and cannot be continued.
//!
//! [`parse()`] streams records out of a reader. [`write()`] produces a fresh
//! file from records. To change fields while keeping everything else in a
//! file exactly as it was, see the [`mutate`] module.

pub mod mutate;

pub use mutate::{Chunk, Mutator, mutate_in_place, set_in_place};

use crate::record::Record;
use log::trace;
use once_cell::sync::Lazy;
use regex::Regex;
use std::fs::File;
use std::io::{self, BufRead, BufReader, Write};
use std::path::Path;
use thiserror::Error;

static SECTION_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\[(.*)\]\s*$").expect("section regex should compile"));

static QUOTED_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"^(\S+)\s*=\s*"(.*)"\s*$"#).expect("quoted field regex should compile")
});

static FIELD_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\S+)\s*=(.*)$").expect("field regex should compile"));

/// An error reading or rewriting a data file.
#[derive(Debug, Error)]
pub enum Error {
    /// A line that fits none of the grammar's line forms.
    #[error("line {line}: cannot parse line: {text:?}")]
    MalformedLine { line: usize, text: String },

    /// A field appeared before the first `[section]` header.
    #[error("line {line}: field {key:?} appears before any [section] header")]
    KeyWithoutSection { line: usize, key: String },

    /// A field name that cannot be written back to a data file.
    #[error("invalid field name: {0:?}")]
    InvalidKey(String),

    /// An error reading or writing the underlying file.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// The result of a data file operation.
pub type Result<T> = std::result::Result<T, Error>;

/// The shape of a single physical line.
#[derive(Debug, PartialEq)]
enum LineKind {
    Section(String),
    Blank,
    Quoted { key: String, value: String },
    Field { key: String, data: String },
    Indented(String),
    Malformed,
}

fn strip_comment(line: &str) -> &str {
    line.find('#').map_or(line, |i| &line[..i])
}

fn classify(line: &str) -> LineKind {
    let bare = strip_comment(line);

    if let Some(caps) = SECTION_RE.captures(bare) {
        return LineKind::Section(caps[1].to_string());
    }

    if bare.trim().is_empty() {
        return LineKind::Blank;
    }

    // Quoted values may legitimately contain '#', so match the full line.
    if let Some(caps) = QUOTED_RE.captures(line) {
        return LineKind::Quoted {
            key: caps[1].to_string(),
            value: unescape(&caps[2]),
        };
    }

    if let Some(caps) = FIELD_RE.captures(bare) {
        let mut data = caps[2].trim_end().to_string();
        data.push(' ');
        return LineKind::Field {
            key: caps[1].to_string(),
            data,
        };
    }

    if bare.starts_with(char::is_whitespace) {
        return LineKind::Indented(bare.trim().to_string());
    }

    LineKind::Malformed
}

fn unescape(quoted: &str) -> String {
    let mut value = String::with_capacity(quoted.len());
    let mut chars = quoted.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            value.push(c);
            continue;
        }
        match chars.next() {
            Some('"') => value.push('"'),
            Some('n') => value.push('\n'),
            Some('\\') => value.push('\\'),
            Some(other) => {
                value.push('\\');
                value.push(other);
            }
            None => value.push('\\'),
        }
    }
    value
}

fn escape(value: &str) -> String {
    value
        .replace('\\', r"\\")
        .replace('"', r#"\""#)
        .replace('\n', r"\n")
}

/// Splits a raw line into its content and its line terminator.
pub(crate) fn split_terminator(raw: &str) -> (&str, &str) {
    let body = match raw.strip_suffix('\n') {
        Some(body) => body.strip_suffix('\r').unwrap_or(body),
        None => raw,
    };
    (body, &raw[body.len()..])
}

/// True if `key` can be written as a field name.
pub fn is_valid_key(key: &str) -> bool {
    !key.is_empty()
        && key != "section"
        && !key.contains('=')
        && !key.contains('#')
        && !key.starts_with('[')
        && !key.contains(char::is_whitespace)
}

/// Formats a field as a single physical line, without a line terminator.
///
/// Values that would not survive the plain `key = value` form are written
/// in the quoted form instead.
pub fn format_field(key: &str, value: &str) -> String {
    let needs_quotes = value.contains(['\n', '#'])
        || value != value.trim()
        || (value.len() >= 2 && value.starts_with('"') && value.ends_with('"'));

    if needs_quotes {
        format!("{key} = \"{}\"", escape(value))
    } else {
        format!("{key} = {value}")
    }
}

/// What one physical line contributed to the record being built.
#[derive(Debug, PartialEq)]
pub(crate) enum Step {
    /// The line is a section header. Carries the previous record, now complete.
    Started(Option<Record>),

    /// The line holds (part of) the named field.
    Field(String),

    /// A blank or comment-only line.
    Other,
}

/// The line-by-line state machine shared by reading and rewriting.
#[derive(Debug, Default)]
pub(crate) struct Scanner {
    line: usize,
    current: Option<Record>,
    pending: Option<(String, String)>,
}

impl Scanner {
    /// Feeds one line, without its terminator.
    pub(crate) fn feed(&mut self, text: &str) -> Result<Step> {
        self.line += 1;

        match classify(text) {
            LineKind::Section(section) => {
                self.flush();
                trace!("line {}: new [{section}] record", self.line);
                Ok(Step::Started(self.current.replace(Record::new(section))))
            }
            LineKind::Blank => {
                self.flush();
                Ok(Step::Other)
            }
            LineKind::Quoted { key, value } => {
                self.require_section(&key)?;
                self.flush();
                if let Some(record) = self.current.as_mut() {
                    record.set(key.as_str(), value);
                }
                Ok(Step::Field(key))
            }
            LineKind::Field { key, data } => {
                self.require_section(&key)?;
                self.flush();
                self.pending = Some((key.clone(), data));
                Ok(Step::Field(key))
            }
            LineKind::Indented(content) => match self.pending.as_mut() {
                Some((key, data)) => {
                    data.push_str(&content);
                    data.push(' ');
                    Ok(Step::Field(key.clone()))
                }
                None => Err(self.malformed(text)),
            },
            LineKind::Malformed => Err(self.malformed(text)),
        }
    }

    /// Completes and returns the last record, if any.
    pub(crate) fn finish(&mut self) -> Option<Record> {
        self.flush();
        self.current.take()
    }

    fn flush(&mut self) {
        if let Some((key, data)) = self.pending.take() {
            if let Some(record) = self.current.as_mut() {
                record.set(key, data.trim());
            }
        }
    }

    fn require_section(&self, key: &str) -> Result<()> {
        if self.current.is_none() {
            Err(Error::KeyWithoutSection {
                line: self.line,
                key: key.to_string(),
            })
        } else {
            Ok(())
        }
    }

    fn malformed(&self, text: &str) -> Error {
        Error::MalformedLine {
            line: self.line,
            text: text.to_string(),
        }
    }
}

/// A lazy, single-pass stream of records.
///
/// Created by [`parse()`]. Iteration stops after the first error.
#[derive(Debug)]
pub struct Records<R> {
    reader: R,
    scanner: Scanner,
    buf: String,
    done: bool,
}

impl<R: BufRead> Iterator for Records<R> {
    type Item = Result<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        loop {
            self.buf.clear();
            match self.reader.read_line(&mut self.buf) {
                Err(err) => {
                    self.done = true;
                    return Some(Err(err.into()));
                }
                Ok(0) => {
                    self.done = true;
                    return self.scanner.finish().map(Ok);
                }
                Ok(_) => {
                    let (text, _) = split_terminator(&self.buf);
                    match self.scanner.feed(text) {
                        Err(err) => {
                            self.done = true;
                            return Some(Err(err));
                        }
                        Ok(Step::Started(Some(record))) => return Some(Ok(record)),
                        Ok(_) => {}
                    }
                }
            }
        }
    }
}

/// Streams records out of `reader` in file order.
pub fn parse<R: BufRead>(reader: R) -> Records<R> {
    Records {
        reader,
        scanner: Scanner::default(),
        buf: String::new(),
        done: false,
    }
}

/// Parses all records in `text`.
pub fn parse_str(text: &str) -> Result<Vec<Record>> {
    parse(text.as_bytes()).collect()
}

/// Opens a data file and streams its records.
pub fn read(path: impl AsRef<Path>) -> Result<Records<BufReader<File>>> {
    let file = File::open(path)?;
    Ok(parse(BufReader::new(file)))
}

/// Writes records as a fresh data file.
///
/// Records are separated by a blank line and fields are written in
/// lexicographic order.
pub fn write<'a, W: Write>(
    mut out: W,
    records: impl IntoIterator<Item = &'a Record>,
) -> io::Result<()> {
    for (i, record) in records.into_iter().enumerate() {
        if i > 0 {
            writeln!(out)?;
        }
        writeln!(out, "[{}]", record.section())?;
        for (key, value) in record.fields() {
            writeln!(out, "{}", format_field(key, value))?;
        }
    }
    out.flush()
}

/// Serializes records to a string; see [`write()`].
pub fn to_string<'a>(records: impl IntoIterator<Item = &'a Record>) -> String {
    let mut buf = Vec::new();
    // Writing into a Vec cannot fail.
    let _ = write(&mut buf, records);
    String::from_utf8_lossy(&buf).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;
    use pretty_assertions::assert_eq;

    #[test]
    fn it_joins_continuation_lines() {
        let text = indoc! {"
            [pub]
            title = Hello
              World
            authors = A; B
        "};
        let records = parse_str(text).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].section(), "pub");
        assert_eq!(records[0].get("title"), Some("Hello World"));
        assert_eq!(records[0].get("authors"), Some("A; B"));
    }

    #[test]
    fn it_joins_continuations_with_a_single_space() {
        let records = parse_str("[pub]\ntitle = Hello\t \n  World\nnote =\n").unwrap();
        assert_eq!(records[0].get("title"), Some("Hello World"));
        assert_eq!(records[0].get("note"), Some(""));
    }

    #[test]
    fn it_reads_records_in_file_order() {
        let text = indoc! {"
            [pub]
            title = One

            [talk]
            title = Two
            [prop]
            title = Three
        "};
        let sections: Vec<String> = parse(text.as_bytes())
            .map(|r| r.unwrap().section().to_string())
            .collect();
        assert_eq!(sections, vec!["pub", "talk", "prop"]);
    }

    #[test]
    fn it_strips_comments() {
        let text = indoc! {"
            # leading comment
            [pub] # trailing comment
            title = Hello # not part of the title
            # a comment line ends the field too
            year = 2014
        "};
        let records = parse_str(text).unwrap();
        assert_eq!(records[0].get("title"), Some("Hello"));
        assert_eq!(records[0].get("year"), Some("2014"));
    }

    #[test]
    fn it_unescapes_quoted_values() {
        let text = indoc! {r#"
            [pub]
            note = "say \"hi\"\nnow # not a comment \\ ok"
        "#};
        let records = parse_str(text).unwrap();
        assert_eq!(
            records[0].get("note"),
            Some("say \"hi\"\nnow # not a comment \\ ok")
        );
    }

    #[test]
    fn it_accepts_fields_without_spaces_around_the_equals_sign() {
        let records = parse_str("[pub]\ntitle=Hello\nempty =\n").unwrap();
        assert_eq!(records[0].get("title"), Some("Hello"));
        assert_eq!(records[0].get("empty"), Some(""));
    }

    #[test]
    fn it_flushes_the_last_field_without_a_trailing_newline() {
        let records = parse_str("[pub]\ntitle = Hello\n  there").unwrap();
        assert_eq!(records[0].get("title"), Some("Hello there"));
    }

    #[test]
    fn it_handles_windows_line_endings() {
        let records = parse_str("[pub]\r\ntitle = Hello\r\n  World\r\n").unwrap();
        assert_eq!(records[0].get("title"), Some("Hello World"));
    }

    #[test]
    fn it_returns_nothing_for_a_file_of_comments() {
        let records = parse_str("# nothing here\n\n# at all\n").unwrap();
        assert!(records.is_empty());
    }

    #[test]
    fn it_rejects_fields_before_any_section() {
        let err = parse_str("title = Hello\n[pub]\n").unwrap_err();
        assert!(
            matches!(err, Error::KeyWithoutSection { line: 1, ref key } if key == "title"),
            "{err:?}"
        );
    }

    #[test]
    fn it_rejects_unparsable_lines() {
        let err = parse_str("[pub]\ntitle = Hello\nwhat is this\n").unwrap_err();
        assert!(
            matches!(err, Error::MalformedLine { line: 3, ref text } if text == "what is this"),
            "{err:?}"
        );
    }

    #[test]
    fn it_rejects_indented_lines_without_a_pending_field() {
        let err = parse_str("[pub]\n\n  orphan\n").unwrap_err();
        assert!(matches!(err, Error::MalformedLine { line: 3, .. }), "{err:?}");
    }

    #[test]
    fn it_yields_records_before_a_later_error() {
        let mut records = parse("[a]\nx = 1\n[b]\n!!!\n".as_bytes());
        assert_eq!(records.next().unwrap().unwrap().section(), "a");
        assert!(records.next().unwrap().is_err());
        assert!(records.next().is_none());
    }

    #[test]
    fn it_serializes_fields_in_order() {
        let records = vec![
            Record::new("pub").with("title", "T").with("authors", "A"),
            Record::new("talk").with("where", "Here"),
        ];
        let expected = indoc! {"
            [pub]
            authors = A
            title = T

            [talk]
            where = Here
        "};
        assert_eq!(to_string(&records), expected);
    }

    #[test]
    fn it_reparses_what_it_serializes() {
        let text = indoc! {r##"
            # header comment
            [pub]
            title = Wrapped
                over two lines
            note = "has # and\nnewline"
            quoted = "\"already quoted\""
            path = C:\temp

            [repo]
            name = thing
            empty =
        "##};
        let first = parse_str(text).unwrap();
        let second = parse_str(&to_string(&first)).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn it_quotes_values_that_need_it() {
        assert_eq!(format_field("a", "plain"), "a = plain");
        assert_eq!(format_field("a", "x # y"), r#"a = "x # y""#);
        assert_eq!(format_field("a", "two\nlines"), r#"a = "two\nlines""#);
        assert_eq!(format_field("a", " padded"), r#"a = " padded""#);
        assert_eq!(format_field("a", r#""q""#), r#"a = "\"q\"""#);
    }

    #[test]
    fn it_validates_field_names() {
        assert!(is_valid_key("adscites"));
        assert!(!is_valid_key(""));
        assert!(!is_valid_key("section"));
        assert!(!is_valid_key("two words"));
        assert!(!is_valid_key("a=b"));
    }

    #[test]
    fn it_splits_line_terminators() {
        assert_eq!(split_terminator("abc\r\n"), ("abc", "\r\n"));
        assert_eq!(split_terminator("abc\n"), ("abc", "\n"));
        assert_eq!(split_terminator("abc"), ("abc", ""));
    }
}

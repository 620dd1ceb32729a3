// SPDX-License-Identifier: Apache-2.0
// Copyright (C) 2025 Michael Dippery <michael@monkey-robot.com>

//! Rewriting data files in place.
//!
//! Data files are edited by hand, so a program that updates a field (say,
//! a citation count) must not disturb anything else: comments, blank lines,
//! field order, and line wrapping all survive untouched. Only the physical
//! lines of a field that is explicitly set are rewritten.
//!
//! The file is read one record at a time. Each record's physical lines are
//! collected into a [`Chunk`], each line tagged with the field it belongs to.
//! The caller inspects the chunk's [`Record`], optionally sets fields, and
//! the chunk is written out before the next one is read.

use super::{Error, Result, Scanner, Step, format_field, is_valid_key, split_terminator};
use crate::record::Record;
use log::{debug, trace};
use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::mem;
use std::path::Path;
use tempfile::NamedTempFile;

/// A physical line and the field it belongs to, if any.
#[derive(Clone, Debug, PartialEq, Eq)]
struct Line {
    raw: String,
    tag: Option<String>,
}

/// The physical lines making up one record.
#[derive(Debug)]
pub struct Chunk {
    record: Record,
    lines: Vec<Line>,
    header: usize,
}

impl Chunk {
    fn new(leading: Vec<Line>, header: String) -> Self {
        let mut lines = leading;
        let header_index = lines.len();
        lines.push(Line {
            raw: header,
            tag: None,
        });
        Self {
            record: Record::default(),
            lines,
            header: header_index,
        }
    }

    /// The record as it currently stands, including any fields set so far.
    pub fn record(&self) -> &Record {
        &self.record
    }

    /// Sets a field's value.
    ///
    /// The first physical line of the field is replaced with a freshly
    /// formatted line, and any continuation lines are removed. A field that
    /// does not exist yet is added after the record's last field.
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        if !is_valid_key(key) {
            return Err(Error::InvalidKey(key.to_string()));
        }

        let formatted = format_field(key, value);
        let positions: Vec<usize> = self
            .lines
            .iter()
            .enumerate()
            .filter(|(_, line)| line.tag.as_deref() == Some(key))
            .map(|(i, _)| i)
            .collect();

        match positions.split_first() {
            Some((&first, rest)) => {
                let line = &mut self.lines[first];
                let (_, terminator) = split_terminator(&line.raw);
                line.raw = formatted + terminator;
                for &i in rest.iter().rev() {
                    self.lines.remove(i);
                }
                trace!("rewrote {key} in [{}]", self.record.section());
            }
            None => {
                let at = self
                    .lines
                    .iter()
                    .rposition(|line| line.tag.is_some())
                    .unwrap_or(self.header);
                let newline = self.newline();
                let previous = &mut self.lines[at];
                if split_terminator(&previous.raw).1.is_empty() {
                    previous.raw.push_str(&newline);
                }
                self.lines.insert(
                    at + 1,
                    Line {
                        raw: formatted + &newline,
                        tag: Some(key.to_string()),
                    },
                );
                trace!("added {key} to [{}]", self.record.section());
            }
        }

        self.record.set(key, value);
        Ok(())
    }

    fn newline(&self) -> String {
        match split_terminator(&self.lines[self.header].raw).1 {
            "" => String::from("\n"),
            terminator => terminator.to_string(),
        }
    }

    fn write_to<W: Write>(&self, out: &mut W) -> Result<()> {
        for line in &self.lines {
            out.write_all(line.raw.as_bytes())?;
        }
        Ok(())
    }
}

/// Streams a data file from `reader` to `output` one [`Chunk`] at a time.
///
/// ```
/// # use vitae::store::Mutator;
/// let input = "[pub]\ntitle = Old # keep me?\n\n[pub]\ntitle = Other\n";
/// let mut output = Vec::new();
/// let mut mutator = Mutator::new(input.as_bytes(), &mut output);
/// while let Some(chunk) = mutator.next_chunk()? {
///     if chunk.record().get("title") == Some("Old") {
///         chunk.set("title", "New")?;
///     }
/// }
/// mutator.finish()?;
/// assert_eq!(String::from_utf8(output).unwrap(), "[pub]\ntitle = New\n\n[pub]\ntitle = Other\n");
/// # Ok::<(), vitae::store::Error>(())
/// ```
#[derive(Debug)]
pub struct Mutator<R, W> {
    reader: R,
    output: W,
    scanner: Scanner,
    leading: Vec<Line>,
    building: Option<Chunk>,
    yielded: Option<Chunk>,
    eof: bool,
}

impl<R: BufRead, W: Write> Mutator<R, W> {
    /// Creates a mutator reading from `reader` and writing to `output`.
    pub fn new(reader: R, output: W) -> Self {
        Self {
            reader,
            output,
            scanner: Scanner::default(),
            leading: vec![],
            building: None,
            yielded: None,
            eof: false,
        }
    }

    /// Writes out the previous chunk and returns the next one, or `None`
    /// once the input is exhausted.
    pub fn next_chunk(&mut self) -> Result<Option<&mut Chunk>> {
        if let Some(chunk) = self.yielded.take() {
            chunk.write_to(&mut self.output)?;
        }

        if self.eof {
            return Ok(None);
        }

        let mut buf = String::new();
        loop {
            buf.clear();
            if self.reader.read_line(&mut buf)? == 0 {
                self.eof = true;
                let Some(mut chunk) = self.building.take() else {
                    return Ok(None);
                };
                if let Some(record) = self.scanner.finish() {
                    chunk.record = record;
                }
                return Ok(Some(self.yielded.insert(chunk)));
            }

            let (text, _) = split_terminator(&buf);
            match self.scanner.feed(text)? {
                Step::Started(done) => {
                    let next = Chunk::new(mem::take(&mut self.leading), buf.clone());
                    if let (Some(mut chunk), Some(record)) = (self.building.replace(next), done) {
                        chunk.record = record;
                        return Ok(Some(self.yielded.insert(chunk)));
                    }
                }
                Step::Field(key) => self.push(buf.clone(), Some(key)),
                Step::Other => self.push(buf.clone(), None),
            }
        }
    }

    /// Writes out everything not yet written and returns the output.
    pub fn finish(mut self) -> Result<W> {
        while self.next_chunk()?.is_some() {}

        // Only non-empty if the file had no records at all.
        for line in mem::take(&mut self.leading) {
            self.output.write_all(line.raw.as_bytes())?;
        }

        self.output.flush()?;
        Ok(self.output)
    }

    fn push(&mut self, raw: String, tag: Option<String>) {
        let line = Line { raw, tag };
        match self.building.as_mut() {
            Some(chunk) => chunk.lines.push(line),
            None => self.leading.push(line),
        }
    }
}

/// Rewrites the data file at `path`, calling `edit` once for every record.
///
/// The new contents are written to a temporary file in the same directory,
/// which then atomically replaces the original. If anything fails, including
/// `edit` itself, the temporary file is removed and the original is left
/// exactly as it was.
pub fn mutate_in_place<P, F>(path: P, mut edit: F) -> Result<()>
where
    P: AsRef<Path>,
    F: FnMut(&mut Chunk) -> Result<()>,
{
    let path = path.as_ref();
    let input = BufReader::new(File::open(path)?);
    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };

    let temp = NamedTempFile::new_in(dir)?;
    debug!("rewriting {} via {}", path.display(), temp.path().display());

    let mut mutator = Mutator::new(input, BufWriter::new(temp));
    while let Some(chunk) = mutator.next_chunk()? {
        edit(chunk)?;
    }

    let temp = mutator
        .finish()?
        .into_inner()
        .map_err(|err| err.into_error())?;
    temp.as_file().set_permissions(fs::metadata(path)?.permissions())?;
    temp.persist(path).map_err(|err| err.error)?;
    Ok(())
}

/// Sets `key` to `value` in every record of the file at `path` for which
/// `select` returns true.
///
/// Returns the number of records that were changed.
pub fn set_in_place<P, S>(path: P, key: &str, value: &str, select: S) -> Result<usize>
where
    P: AsRef<Path>,
    S: Fn(&Record) -> bool,
{
    let mut changed = 0;
    mutate_in_place(path, |chunk| {
        if select(chunk.record()) {
            chunk.set(key, value)?;
            changed += 1;
        }
        Ok(())
    })?;
    Ok(changed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::parse_str;
    use indoc::indoc;
    use pretty_assertions::assert_eq;

    const SAMPLE: &str = indoc! {"
        # My publications.
        # Keep these sorted by date.

        [pub]
        title = The First
          Paper # wrapped
        authors = A; B
        refereed = y

        # an aside between records
        [pub]
        title = The Second Paper
        authors = C;
          D;
          E
        adscites = 2014/01/02 3
    "};

    fn rewrite<F>(input: &str, mut edit: F) -> String
    where
        F: FnMut(usize, &mut Chunk) -> Result<()>,
    {
        let mut output = Vec::new();
        let mut mutator = Mutator::new(input.as_bytes(), &mut output);
        let mut index = 0;
        while let Some(chunk) = mutator.next_chunk().unwrap() {
            edit(index, chunk).unwrap();
            index += 1;
        }
        mutator.finish().unwrap();
        String::from_utf8(output).unwrap()
    }

    fn set_field(input: &str, target: usize, key: &str, value: &str) -> String {
        rewrite(input, |i, chunk| {
            if i == target {
                chunk.set(key, value)?;
            }
            Ok(())
        })
    }

    #[test]
    fn it_reproduces_an_untouched_file_exactly() {
        assert_eq!(rewrite(SAMPLE, |_, _| Ok(())), SAMPLE);
    }

    #[test]
    fn it_reproduces_files_without_a_trailing_newline() {
        let text = "[pub]\ntitle = x";
        assert_eq!(rewrite(text, |_, _| Ok(())), text);
    }

    #[test]
    fn it_reproduces_files_without_records() {
        let text = "# nothing\n\n# here\n";
        assert_eq!(rewrite(text, |_, _| Ok(())), text);
    }

    #[test]
    fn it_exposes_each_record() {
        let mut titles = vec![];
        rewrite(SAMPLE, |_, chunk| {
            titles.push(chunk.record().get("title").unwrap().to_string());
            Ok(())
        });
        assert_eq!(titles, vec!["The First Paper", "The Second Paper"]);
    }

    #[test]
    fn it_rewrites_a_single_line_field_in_place() {
        let expected = SAMPLE.replace("adscites = 2014/01/02 3", "adscites = 2015/06/07 10");
        assert_eq!(set_field(SAMPLE, 1, "adscites", "2015/06/07 10"), expected);
    }

    #[test]
    fn it_collapses_a_rewritten_multi_line_field() {
        let expected = SAMPLE.replace("authors = C;\n  D;\n  E\n", "authors = C; D; E; F\n");
        assert_eq!(set_field(SAMPLE, 1, "authors", "C; D; E; F"), expected);
    }

    #[test]
    fn it_leaves_other_multi_line_fields_wrapped() {
        let actual = set_field(SAMPLE, 0, "refereed", "n");
        assert!(actual.contains("title = The First\n  Paper # wrapped\n"));
        assert!(actual.contains("authors = C;\n  D;\n  E\n"));
        assert!(actual.contains("refereed = n\n"));
    }

    #[test]
    fn it_adds_a_new_field_after_the_last_field() {
        let expected = SAMPLE.replace("refereed = y\n", "refereed = y\nadscites = 2015/06/07 1\n");
        assert_eq!(set_field(SAMPLE, 0, "adscites", "2015/06/07 1"), expected);
    }

    #[test]
    fn it_adds_a_field_to_an_empty_record_after_its_header() {
        let actual = set_field("# top\n[pub]\n\n[talk]\n", 0, "title", "T");
        assert_eq!(actual, "# top\n[pub]\ntitle = T\n\n[talk]\n");
    }

    #[test]
    fn it_terminates_an_unterminated_last_line_before_adding() {
        let actual = set_field("[pub]\ntitle = x", 0, "year", "2014");
        assert_eq!(actual, "[pub]\ntitle = x\nyear = 2014\n");
    }

    #[test]
    fn it_keeps_windows_line_endings() {
        let actual = set_field("[pub]\r\ntitle = x\r\n", 0, "year", "2014");
        assert_eq!(actual, "[pub]\r\ntitle = x\r\nyear = 2014\r\n");
    }

    #[test]
    fn it_is_idempotent() {
        let once = set_field(SAMPLE, 1, "authors", "C; D");
        let twice = set_field(&once, 1, "authors", "C; D");
        assert_eq!(once, twice);
    }

    #[test]
    fn it_touches_nothing_else() {
        let actual = set_field(SAMPLE, 0, "title", "Renamed");
        let before = parse_str(SAMPLE).unwrap();
        let after = parse_str(&actual).unwrap();

        assert_eq!(after[1], before[1]);
        assert_eq!(after[0].get("authors"), before[0].get("authors"));
        assert_eq!(after[0].get("refereed"), before[0].get("refereed"));
        assert_eq!(after[0].get("title"), Some("Renamed"));

        for line in SAMPLE.lines().filter(|l| l.starts_with('#') || l.is_empty()) {
            assert!(actual.contains(line), "lost line {line:?}");
        }
    }

    #[test]
    fn it_keeps_the_record_view_current() {
        rewrite(SAMPLE, |_, chunk| {
            chunk.set("seen", "y")?;
            assert_eq!(chunk.record().get("seen"), Some("y"));
            Ok(())
        });
    }

    #[test]
    fn it_rejects_invalid_field_names() {
        let mut output = Vec::new();
        let mut mutator = Mutator::new(SAMPLE.as_bytes(), &mut output);
        let chunk = mutator.next_chunk().unwrap().unwrap();
        assert!(matches!(chunk.set("bad key", "x"), Err(Error::InvalidKey(_))));
        assert!(matches!(chunk.set("section", "x"), Err(Error::InvalidKey(_))));
    }

    #[test]
    fn it_replaces_a_file_in_place() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pubs.txt");
        fs::write(&path, SAMPLE).unwrap();

        let changed = set_in_place(&path, "adscites", "2015/06/07 10", |r| r.has("adscites")).unwrap();

        assert_eq!(changed, 1);
        let expected = SAMPLE.replace("2014/01/02 3", "2015/06/07 10");
        assert_eq!(fs::read_to_string(&path).unwrap(), expected);
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn it_leaves_the_original_alone_when_editing_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pubs.txt");
        fs::write(&path, SAMPLE).unwrap();

        let result = mutate_in_place(&path, |chunk| {
            chunk.set("title", "Changed")?;
            chunk.set("not valid", "x")
        });

        assert!(matches!(result, Err(Error::InvalidKey(_))));
        assert_eq!(fs::read_to_string(&path).unwrap(), SAMPLE);
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn it_leaves_the_original_alone_when_parsing_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.txt");
        let text = "[pub]\ntitle = x\nnonsense\n";
        fs::write(&path, text).unwrap();

        let result = mutate_in_place(&path, |chunk| chunk.set("title", "y"));

        assert!(matches!(result, Err(Error::MalformedLine { line: 3, .. })));
        assert_eq!(fs::read_to_string(&path).unwrap(), text);
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
    }
}

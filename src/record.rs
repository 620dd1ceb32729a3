// SPDX-License-Identifier: Apache-2.0
// Copyright (C) 2025 Michael Dippery <michael@monkey-robot.com>

//! Records read from data files.
//!
//! A [`Record`] is one bracketed block of a data file: a mandatory section
//! name plus any number of string fields. Downstream code never edits a
//! record directly; instead it layers computed values over it with an
//! [`Augmented`] record.

use crate::markup::Value;
use std::collections::{BTreeMap, HashMap};
use std::fmt;

/// Something that fields can be looked up in.
///
/// This is what a [`Formatter`](crate::format::Formatter) fills its
/// placeholders from.
pub trait Fields {
    /// The value of the field called `name`, if present.
    fn lookup(&self, name: &str) -> Option<Value>;

    /// A short human-readable identification, used in error messages.
    fn describe(&self) -> String;
}

/// One record from a data file.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Record {
    section: String,
    fields: BTreeMap<String, String>,
}

impl Record {
    /// Creates an empty record of the given section.
    pub fn new(section: impl Into<String>) -> Self {
        Self {
            section: section.into(),
            fields: BTreeMap::new(),
        }
    }

    /// The record type, e.g. `pub` or `talk`.
    pub fn section(&self) -> &str {
        &self.section
    }

    /// The value of a field.
    ///
    /// `section` is always present and returns the record type.
    pub fn get(&self, name: &str) -> Option<&str> {
        if name == "section" {
            Some(&self.section)
        } else {
            self.fields.get(name).map(String::as_str)
        }
    }

    /// True if the record has a field called `name`.
    pub fn has(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// True if the field is present and set to `y`.
    pub fn is_yes(&self, name: &str) -> bool {
        self.get(name) == Some("y")
    }

    /// Sets a field, replacing any previous value.
    ///
    /// Setting `section` changes the record type.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        if name == "section" {
            self.section = value.into();
        } else {
            self.fields.insert(name, value.into());
        }
    }

    /// Builder-style version of [`Record::set()`].
    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set(name, value);
        self
    }

    /// All fields other than `section`, in lexicographic order.
    pub fn fields(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.section)?;
        for key in ["title", "cite", "bibcode", "name"] {
            if let Some(value) = self.fields.get(key) {
                return write!(f, " {key} = {value:?}");
            }
        }
        Ok(())
    }
}

impl Fields for Record {
    fn lookup(&self, name: &str) -> Option<Value> {
        self.get(name).map(Value::from)
    }

    fn describe(&self) -> String {
        self.to_string()
    }
}

/// A record plus computed values, leaving the original untouched.
#[derive(Clone, Debug)]
pub struct Augmented<'a> {
    base: &'a Record,
    extra: HashMap<String, Value>,
}

impl<'a> Augmented<'a> {
    /// Starts augmenting `base` with no extra values.
    pub fn new(base: &'a Record) -> Self {
        Self {
            base,
            extra: HashMap::new(),
        }
    }

    /// The record being augmented.
    pub fn base(&self) -> &Record {
        self.base
    }

    /// Adds or replaces a computed value.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.extra.insert(name.into(), value.into());
    }
}

impl Fields for Augmented<'_> {
    fn lookup(&self, name: &str) -> Option<Value> {
        self.extra
            .get(name)
            .cloned()
            .or_else(|| self.base.lookup(name))
    }

    fn describe(&self) -> String {
        self.base.describe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::markup::Markup;

    #[test]
    fn it_always_has_a_section() {
        let record = Record::new("pub");
        assert_eq!(record.get("section"), Some("pub"));
        assert!(record.has("section"));
    }

    #[test]
    fn it_does_not_list_section_among_its_fields() {
        let record = Record::new("pub").with("title", "A").with("authors", "B");
        let fields: Vec<_> = record.fields().collect();
        assert_eq!(fields, vec![("authors", "B"), ("title", "A")]);
    }

    #[test]
    fn it_changes_its_type_when_section_is_set() {
        let mut record = Record::new("pub");
        record.set("section", "talk");
        assert_eq!(record.section(), "talk");
        assert_eq!(record.fields().count(), 0);
    }

    #[test]
    fn it_recognizes_yes_flags() {
        let record = Record::new("pub").with("refereed", "y").with("informal", "n");
        assert!(record.is_yes("refereed"));
        assert!(!record.is_yes("informal"));
        assert!(!record.is_yes("missing"));
    }

    #[test]
    fn it_describes_itself_by_title() {
        let record = Record::new("pub").with("title", "On Things");
        assert_eq!(record.describe(), "[pub] title = \"On Things\"");
    }

    #[test]
    fn augmented_values_shadow_the_base_record() {
        let record = Record::new("pub").with("title", "Plain").with("year", "x");
        let mut aug = Augmented::new(&record);
        aug.set("title", Markup::bold("Plain"));
        aug.set("year", 2014);

        assert_eq!(aug.lookup("title"), Some(Value::Markup(Markup::bold("Plain"))));
        assert_eq!(aug.lookup("year"), Some(Value::Integer(2014)));
        assert_eq!(aug.lookup("section"), Some(Value::from("pub")));
        assert_eq!(aug.lookup("nope"), None);
        assert_eq!(record.get("title"), Some("Plain"));
    }
}

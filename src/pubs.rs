// SPDX-License-Identifier: Apache-2.0
// Copyright (C) 2025 Michael Dippery <michael@monkey-robot.com>

//! Publication records and citation statistics.
//!
//! Publications are `[pub]` records with at least these fields:
//!
//! | Field      | Meaning                                          |
//! |------------|--------------------------------------------------|
//! | `authors`  | Full author names separated by `;`               |
//! | `mypos`    | My 1-based position in the author list           |
//! | `title`    | The title                                        |
//! | `pubdate`  | `YYYY/MM`                                        |
//!
//! Optional fields include `cite` (the short citation text), `refereed` and
//! `informal` (`y` or `n`), the identifiers `bibcode`, `doi`, `arxiv` and
//! `url`, and `adscites`, a citation count as `YYYY/MM/DD COUNT` where the
//! date is when the count was last updated.

use crate::markup::{Markup, Value};
use crate::record::{Augmented, Fields, Record};
use crate::text::{NBSP, month_abbrev};
use chrono::{Datelike, NaiveDate};
use itertools::Itertools;
use log::warn;
use thiserror::Error;
use url::Url;

const ADS_ABSTRACT: &str = "http://adsabs.harvard.edu/abs/";
const DOI_RESOLVER: &str = "http://dx.doi.org/";
const ARXIV_ABSTRACT: &str = "http://arxiv.org/abs/";

/// An error deriving information from a publication.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum Error {
    /// A required field is absent.
    #[error("{record} has no {field:?} field")]
    MissingField { field: String, record: String },

    /// A field's value cannot be understood.
    #[error("{record} has an invalid {field:?} field: {value:?}")]
    InvalidField {
        field: String,
        value: String,
        record: String,
    },

    /// A publication group name that does not exist.
    #[error("no such publication group: {0:?}")]
    UnknownGroup(String),
}

/// The result of deriving publication information.
pub type Result<T> = std::result::Result<T, Error>;

/// A citation count and when it was last updated.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AdsCites {
    /// When the count was last checked.
    pub updated: NaiveDate,

    /// The number of citations.
    pub cites: u32,
}

/// Reads the `adscites` field of a publication.
///
/// A malformed value is logged and treated as absent.
pub fn parse_ads_cites(record: &Record) -> Option<AdsCites> {
    let raw = record.get("adscites")?;
    let mut words = raw.split_whitespace();

    let parsed = words.next().zip(words.next()).and_then(|(date, cites)| {
        let updated = NaiveDate::parse_from_str(date, "%Y/%m/%d").ok()?;
        let cites = cites.parse().ok()?;
        Some(AdsCites { updated, cites })
    });

    if parsed.is_none() {
        warn!("cannot parse adscites entry {raw:?} of {record}");
    }
    parsed
}

/// Converts a full name into a compact form, e.g., "Peter K. G. Williams"
/// into "PKG Williams".
///
/// The initials are the capital letters (and hyphens) of every name but the
/// last, and they are separated from the surname by a non-breaking space.
/// Surnames containing spaces are written with underscores in data files.
///
/// # Examples
///
/// ```
/// use vitae::pubs::canonicalize_name;
/// assert_eq!(canonicalize_name("Peter K. G. Williams"), "PKG\u{a0}Williams");
/// assert_eq!(canonicalize_name("Jean-Luc van_der_Berg"), "J-L\u{a0}van der Berg");
/// ```
pub fn canonicalize_name(name: &str) -> String {
    let words: Vec<&str> = name.split_whitespace().collect();
    let Some((last, rest)) = words.split_last() else {
        return String::new();
    };

    let initials: String = rest
        .iter()
        .flat_map(|word| word.chars())
        .filter(|c| c.is_uppercase() || *c == '-')
        .collect();

    format!("{initials}{NBSP}{}", last.replace('_', " "))
}

/// The surname of a full name, with underscores turned into spaces.
pub fn surname(name: &str) -> String {
    name.split_whitespace()
        .last()
        .unwrap_or_default()
        .replace('_', " ")
}

fn identifier_url(base: &str, id: &str) -> Option<String> {
    let mut url = Url::parse(base).ok()?;
    url.path_segments_mut()
        .ok()?
        .pop_if_empty()
        .extend(id.split('/'));
    Some(url.to_string())
}

/// The ADS abstract page for a bibcode.
pub fn ads_url(bibcode: &str) -> Option<String> {
    identifier_url(ADS_ABSTRACT, bibcode)
}

/// The resolver URL for a DOI.
pub fn doi_url(doi: &str) -> Option<String> {
    identifier_url(DOI_RESOLVER, doi)
}

/// The arXiv abstract page for a preprint identifier.
pub fn arxiv_url(arxiv: &str) -> Option<String> {
    identifier_url(ARXIV_ABSTRACT, arxiv)
}

/// The most authoritative URL for an item: its ADS abstract, DOI, explicit
/// `url`, or arXiv preprint, in that order of preference.
pub fn best_url(record: &Record) -> Option<String> {
    if let Some(bibcode) = record.get("bibcode") {
        ads_url(bibcode)
    } else if let Some(doi) = record.get("doi") {
        doi_url(doi)
    } else if let Some(url) = record.get("url") {
        Some(url.to_string())
    } else {
        record.get("arxiv").and_then(arxiv_url)
    }
}

fn require<'a>(record: &'a Record, field: &str) -> Result<&'a str> {
    record.get(field).ok_or_else(|| Error::MissingField {
        field: field.to_string(),
        record: record.describe(),
    })
}

fn invalid(record: &Record, field: &str, value: &str) -> Error {
    Error::InvalidField {
        field: field.to_string(),
        value: value.to_string(),
        record: record.describe(),
    }
}

/// Parses a 1-based position, checked against the number of authors.
fn my_position(record: &Record, count: usize) -> Result<usize> {
    let raw = require(record, "mypos")?;
    match raw.trim().parse::<usize>() {
        Ok(pos) if (1..=count).contains(&pos) => Ok(pos - 1),
        _ => Err(invalid(record, "mypos", raw)),
    }
}

fn publication_date(record: &Record) -> Result<(i64, u32)> {
    let raw = require(record, "pubdate")?;
    let (year, month) = raw
        .split_once('/')
        .ok_or_else(|| invalid(record, "pubdate", raw))?;
    let year = year.trim().parse().map_err(|_| invalid(record, "pubdate", raw))?;
    let month: u32 = month.trim().parse().map_err(|_| invalid(record, "pubdate", raw))?;
    if month_abbrev(month).is_none() {
        return Err(invalid(record, "pubdate", raw));
    }
    Ok((year, month))
}

fn short_authors(surnames: &[String]) -> String {
    match surnames {
        [] => String::new(),
        [only] => only.clone(),
        [first, second] => format!("{first} & {second}"),
        [_, _, _] => surnames.join(", "),
        [first, ..] => format!("{first} et{NBSP}al."),
    }
}

/// Derives the fields that publication-list templates use from a
/// publication record.
///
/// | Field                 | Value                                                  |
/// |-----------------------|--------------------------------------------------------|
/// | `full_authors`        | Compact author names, mine in bold                     |
/// | `short_authors`       | Surnames, or the first surname and "et al."            |
/// | `refereed_mark`       | `»` if refereed                                        |
/// | `quotable_title`      | The title with double quotes turned to single quotes   |
/// | `bold_if_first_title` | The title, in bold if I am the first author            |
/// | `year`, `month`       | From `pubdate`                                         |
/// | `pubdate`             | e.g. "2014 Mar"                                        |
/// | `citecountnote`       | e.g. " [12]" if the citation count is known            |
/// | `lcite`               | `cite`, linked to the [best URL](best_url)             |
/// | `abstract_link` etc.  | Links to the ADS abstract, preprint, official version  |
///
/// If `my_abbrev_name` is given, it replaces my surname in `short_authors`.
pub fn cite_info<'a>(record: &'a Record, my_abbrev_name: Option<&str>) -> Result<Augmented<'a>> {
    let mut info = Augmented::new(record);

    let authors: Vec<&str> = require(record, "authors")?.split(';').collect();
    let me = my_position(record, authors.len())?;

    let full_authors = authors.iter().enumerate().map(|(i, name)| {
        let name = Markup::text(canonicalize_name(name));
        if i == me { Markup::bold(name) } else { name }
    });
    info.set("full_authors", Markup::join(", ", full_authors));

    let mut surnames: Vec<String> = authors.iter().map(|name| surname(name)).collect();
    if let Some(abbrev) = my_abbrev_name {
        surnames[me] = abbrev.to_string();
    }
    info.set("short_authors", short_authors(&surnames));

    info.set(
        "refereed_mark",
        if record.is_yes("refereed") { "»" } else { "" },
    );

    let title = require(record, "title")?;
    info.set(
        "quotable_title",
        title.replace('\u{201c}', "\u{2018}").replace('\u{201d}', "\u{2019}"),
    );
    info.set(
        "bold_if_first_title",
        if me == 0 {
            Value::from(Markup::bold(title))
        } else {
            Value::from(title)
        },
    );

    let (year, month) = publication_date(record)?;
    info.set("year", year);
    info.set("month", month);
    info.set(
        "pubdate",
        format!("{year}{NBSP}{}", month_abbrev(month).unwrap_or_default()),
    );

    let note = match parse_ads_cites(record) {
        Some(AdsCites { cites, .. }) if cites > 0 => format!(" [{cites}]"),
        _ => String::new(),
    };
    info.set("citecountnote", note);

    if let Some(cite) = record.get("cite") {
        match best_url(record) {
            Some(url) => info.set("lcite", Markup::link(url, cite)),
            None => info.set("lcite", cite),
        }
    }

    let link = |url: Option<String>, text: &str| match url {
        Some(url) => Value::from(Markup::link(url, text)),
        None => Value::from(""),
    };
    info.set(
        "abstract_link",
        link(record.get("bibcode").and_then(ads_url), "abstract"),
    );
    info.set(
        "preprint_link",
        link(record.get("arxiv").and_then(arxiv_url), "preprint"),
    );
    info.set(
        "official_link",
        link(record.get("doi").and_then(doi_url), "official"),
    );
    let other = record
        .get("url")
        .filter(|_| !record.has("doi"))
        .map(String::from);
    info.set(
        "other_link",
        link(other, record.get("kind").unwrap_or("link")),
    );

    Ok(info)
}

/// Publications sorted into the groups that templates can list.
///
/// Refereed publications are assumed to be formal.
#[derive(Clone, Debug, Default)]
pub struct PubGroups {
    all: Vec<Record>,
    all_formal: Vec<Record>,
    refereed: Vec<Record>,
    non_refereed: Vec<Record>,
    all_non_refereed: Vec<Record>,
    informal: Vec<Record>,
}

impl PubGroups {
    /// The names [`PubGroups::get()`] accepts.
    pub const NAMES: [&str; 10] = [
        "all",
        "all_formal",
        "refereed",
        "non_refereed",
        "all_non_refereed",
        "informal",
        "all_rev",
        "refereed_rev",
        "non_refereed_rev",
        "informal_rev",
    ];

    /// Sorts publications into groups, keeping their order.
    pub fn partition<'a>(pubs: impl IntoIterator<Item = &'a Record>) -> Self {
        let mut groups = Self::default();

        for publication in pubs {
            let formal = publication.get("informal").unwrap_or("n") == "n";

            groups.all.push(publication.clone());
            if formal {
                groups.all_formal.push(publication.clone());
            }

            if publication.is_yes("refereed") {
                groups.refereed.push(publication.clone());
            } else {
                groups.all_non_refereed.push(publication.clone());
                if formal {
                    groups.non_refereed.push(publication.clone());
                } else {
                    groups.informal.push(publication.clone());
                }
            }
        }

        groups
    }

    /// All publications, in file order.
    pub fn all(&self) -> &[Record] {
        &self.all
    }

    /// All publications not marked informal.
    pub fn all_formal(&self) -> &[Record] {
        &self.all_formal
    }

    /// A group by name. Names ending in `_rev` list a group in reverse.
    pub fn get(&self, name: &str) -> Result<Vec<&Record>> {
        let (base, reversed) = match name.strip_suffix("_rev") {
            Some(base @ ("all" | "refereed" | "non_refereed" | "informal")) => (base, true),
            Some(_) => return Err(Error::UnknownGroup(name.to_string())),
            None => (name, false),
        };

        let group = match base {
            "all" => &self.all,
            "all_formal" => &self.all_formal,
            "refereed" => &self.refereed,
            "non_refereed" => &self.non_refereed,
            "all_non_refereed" => &self.all_non_refereed,
            "informal" => &self.informal,
            _ => return Err(Error::UnknownGroup(name.to_string())),
        };

        Ok(if reversed {
            group.iter().rev().collect()
        } else {
            group.iter().collect()
        })
    }
}

/// The h-index of a set of citation counts: the largest `h` such that `h`
/// of the counts are at least `h`.
///
/// # Examples
///
/// ```
/// use vitae::pubs::h_index;
/// assert_eq!(h_index(&[10, 8, 5, 4, 3]), 4);
/// assert_eq!(h_index(&[]), 0);
/// ```
pub fn h_index(cites: &[u32]) -> usize {
    cites
        .iter()
        .sorted_unstable_by(|a, b| b.cmp(a))
        .enumerate()
        .take_while(|&(i, &count)| count as usize > i)
        .count()
}

/// Summary citation statistics over a set of publications.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CiteStats {
    /// Number of refereed publications.
    pub refpubs: usize,

    /// Total citations to refereed publications.
    pub refcites: u64,

    /// Number of refereed publications with me as first author.
    pub reffirstauth: usize,

    /// The h-index over all cited publications.
    pub hindex: usize,

    /// The median date on which the citation counts were updated.
    pub median_update: NaiveDate,
}

impl CiteStats {
    /// Computes statistics over `pubs`.
    ///
    /// Publications without a positive citation count are left out of the
    /// h-index and the median date. If none have one, the date is the Unix
    /// epoch.
    pub fn compute<'a>(pubs: impl IntoIterator<Item = &'a Record>) -> Self {
        let mut refpubs = 0;
        let mut refcites = 0;
        let mut reffirstauth = 0;
        let mut cites = vec![];
        let mut dates = vec![];

        for publication in pubs {
            let refereed = publication.is_yes("refereed");
            if refereed {
                refpubs += 1;
                if publication.get("mypos").map(str::trim) == Some("1") {
                    reffirstauth += 1;
                }
            }

            let Some(AdsCites { updated, cites: count }) = parse_ads_cites(publication) else {
                continue;
            };
            if count < 1 {
                continue;
            }

            cites.push(count);
            dates.push(updated);
            if refereed {
                refcites += u64::from(count);
            }
        }

        dates.sort_unstable();
        let median_update = dates
            .get(dates.len() / 2)
            .copied()
            .unwrap_or_default();

        Self {
            refpubs,
            refcites,
            reffirstauth,
            hindex: h_index(&cites),
            median_update,
        }
    }
}

impl Fields for CiteStats {
    fn lookup(&self, name: &str) -> Option<Value> {
        let date = self.median_update;
        Some(match name {
            "refpubs" => self.refpubs.into(),
            "refcites" => Value::Integer(i64::try_from(self.refcites).unwrap_or(i64::MAX)),
            "reffirstauth" => self.reffirstauth.into(),
            "hindex" => self.hindex.into(),
            "year" => date.year().into(),
            "month" => date.month().into(),
            "day" => date.day().into(),
            "monthstr" => month_abbrev(date.month()).unwrap_or_default().into(),
            "italich" => Markup::italic("h").into(),
            _ => return None,
        })
    }

    fn describe(&self) -> String {
        String::from("citation statistics")
    }
}

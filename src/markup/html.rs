// SPDX-License-Identifier: Apache-2.0
// Copyright (C) 2025 Michael Dippery <michael@monkey-robot.com>

//! Parses a restricted subset of HTML into a [`Markup`] tree.
//!
//! Only the tags that a tree can itself render are understood: `<i>`, `<b>`,
//! `<a href="...">`, `<ol>`, `<ul>`, and `<li>`. Anything else is an error
//! rather than being silently dropped, so mistakes in hand-written markup
//! are caught instead of quietly disappearing from a CV.

use crate::markup::Markup;
use crate::text;
use log::trace;
use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

static HREF_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)(?:^|\s)href\s*=\s*"([^"]*)""#).expect("href regex should compile")
});

/// An error parsing restricted HTML.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum Error {
    /// A close tag that does not match the innermost open tag.
    #[error("found </{found}> where {expected} was expected")]
    TagMismatch { expected: String, found: String },

    /// An `<li>` outside of an `<ol>` or `<ul>`.
    #[error("<li> must appear directly inside <ol> or <ul>")]
    MisplacedListItem,

    /// A tag outside the supported set.
    #[error("unsupported tag: <{0}>")]
    UnsupportedTag(String),

    /// An `<a>` tag with no `href` attribute.
    #[error("link has no href: <{0}>")]
    MissingHref(String),

    /// Input that ends inside a tag or with tags still open.
    #[error("unterminated markup: {0}")]
    UnterminatedMarkup(String),

    /// Content directly inside a list but outside any `<li>`.
    #[error("list content outside of <li>: {0:?}")]
    StrayListContent(String),
}

/// The result of parsing restricted HTML.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug)]
enum Tag {
    Italic,
    Bold,
    Link(String),
    List { ordered: bool },
    Item,
}

impl Tag {
    fn name(&self) -> &'static str {
        match self {
            Tag::Italic => "i",
            Tag::Bold => "b",
            Tag::Link(_) => "a",
            Tag::List { ordered: true } => "ol",
            Tag::List { ordered: false } => "ul",
            Tag::Item => "li",
        }
    }

    fn is_list(&self) -> bool {
        matches!(self, Tag::List { .. })
    }
}

#[derive(Debug)]
struct Frame {
    tag: Tag,
    children: Vec<Markup>,
}

#[derive(Debug, Default)]
struct Parser {
    root: Vec<Markup>,
    stack: Vec<Frame>,
    after_list_tag: bool,
}

impl Parser {
    fn parse(mut self, html: &str) -> Result<Markup> {
        let mut rest = html;

        while let Some(start) = rest.find('<') {
            let tag = &rest[start..];
            let end = tag
                .find('>')
                .ok_or_else(|| Error::UnterminatedMarkup(tag.to_string()))?;
            let source = &tag[1..end];
            self.text(&rest[..start], is_list_tag(source))?;
            self.tag(source)?;
            self.after_list_tag = is_list_tag(source);
            rest = &tag[end + 1..];
        }
        self.text(rest, false)?;

        if let Some(frame) = self.stack.last() {
            return Err(Error::UnterminatedMarkup(format!(
                "<{}> is never closed",
                frame.tag.name()
            )));
        }

        Ok(wrap(self.root))
    }

    fn parent(&self) -> Option<&Tag> {
        self.stack.last().map(|frame| &frame.tag)
    }

    fn children(&mut self) -> &mut Vec<Markup> {
        match self.stack.last_mut() {
            Some(frame) => &mut frame.children,
            None => &mut self.root,
        }
    }

    /// Handles the text between two tags. Whitespace next to list tags is
    /// layout, not content, and is dropped.
    fn text(&mut self, text: &str, before_list_tag: bool) -> Result<()> {
        if text.is_empty() {
            return Ok(());
        }
        let in_list = self.parent().is_some_and(Tag::is_list);
        if text.trim().is_empty() && (in_list || before_list_tag || self.after_list_tag) {
            return Ok(());
        }
        if in_list {
            return Err(Error::StrayListContent(text.to_string()));
        }
        let decoded = text::convert_html_entities(text);
        self.children().push(Markup::Text(decoded));
        Ok(())
    }

    fn tag(&mut self, source: &str) -> Result<()> {
        match source.strip_prefix('/') {
            Some(name) => self.close(&name.trim().to_ascii_lowercase()),
            None => self.open(source),
        }
    }

    fn open(&mut self, source: &str) -> Result<()> {
        let name = source
            .split_whitespace()
            .next()
            .unwrap_or_default()
            .to_ascii_lowercase();

        let tag = match name.as_str() {
            "i" => Tag::Italic,
            "b" => Tag::Bold,
            "a" => {
                let caps = HREF_RE
                    .captures(source)
                    .ok_or_else(|| Error::MissingHref(source.to_string()))?;
                Tag::Link(text::convert_html_entities(&caps[1]))
            }
            "ol" => Tag::List { ordered: true },
            "ul" => Tag::List { ordered: false },
            "li" => Tag::Item,
            _ => return Err(Error::UnsupportedTag(name)),
        };

        let in_list = self.parent().is_some_and(Tag::is_list);
        match tag {
            Tag::Item if !in_list => return Err(Error::MisplacedListItem),
            Tag::Item => {}
            _ if in_list => return Err(Error::StrayListContent(format!("<{source}>"))),
            _ => {}
        }

        trace!("opening <{}>", tag.name());
        self.stack.push(Frame {
            tag,
            children: vec![],
        });
        Ok(())
    }

    fn close(&mut self, name: &str) -> Result<()> {
        if !matches!(name, "i" | "b" | "a" | "ol" | "ul" | "li") {
            return Err(Error::UnsupportedTag(format!("/{name}")));
        }

        let frame = match self.stack.pop() {
            Some(frame) if frame.tag.name() == name => frame,
            Some(frame) => {
                return Err(Error::TagMismatch {
                    expected: format!("</{}>", frame.tag.name()),
                    found: name.to_string(),
                });
            }
            None => {
                return Err(Error::TagMismatch {
                    expected: String::from("no close tag"),
                    found: name.to_string(),
                });
            }
        };

        let node = match frame.tag {
            Tag::Italic => Markup::Italic(Box::new(wrap(frame.children))),
            Tag::Bold => Markup::Bold(Box::new(wrap(frame.children))),
            Tag::Link(url) => Markup::Link {
                url,
                inner: Box::new(wrap(frame.children)),
            },
            Tag::List { ordered } => Markup::List {
                ordered,
                items: frame.children,
            },
            Tag::Item => wrap(frame.children),
        };
        self.children().push(node);
        Ok(())
    }
}

fn is_list_tag(source: &str) -> bool {
    let name = source
        .trim_start_matches('/')
        .split_whitespace()
        .next()
        .unwrap_or_default();
    ["ol", "ul", "li"]
        .iter()
        .any(|tag| name.eq_ignore_ascii_case(tag))
}

fn wrap(mut children: Vec<Markup>) -> Markup {
    match children.len() {
        0 => Markup::text(""),
        1 => children.remove(0),
        _ => Markup::join("", children),
    }
}

/// Parses restricted HTML into a markup tree.
///
/// Several top-level nodes are wrapped in a [`Markup::Join`] with an empty
/// separator. Whitespace-only runs inside lists or next to a list tag are
/// dropped; elsewhere they are kept as text.
///
/// # Examples
///
/// ```
/// use vitae::markup::{Markup, html};
/// let tree = html::parse(r#"See <a href="http://x.org/">this</a>"#)?;
/// assert_eq!(
///     tree,
///     Markup::join("", [Markup::text("See "), Markup::link("http://x.org/", "this")])
/// );
/// # Ok::<(), html::Error>(())
/// ```
pub fn parse(html: &str) -> Result<Markup> {
    Parser::default().parse(html)
}

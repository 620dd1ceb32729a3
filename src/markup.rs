// SPDX-License-Identifier: Apache-2.0
// Copyright (C) 2025 Michael Dippery <michael@monkey-robot.com>

//! A tiny markup tree that renders to LaTeX or HTML.
//!
//! Templates for both targets are filled from the same records, so computed
//! values such as author lists are built as [`Markup`] trees and only turned
//! into target syntax at the very end. The set of node types is deliberately
//! small and closed.
//!
//! # See also
//!
//! - [`html`], which parses the HTML rendering back into a tree.

pub mod html;

use crate::latex;
use crate::text;
use std::fmt;
use thiserror::Error;

/// A node in a markup tree.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Markup {
    /// Plain text, escaped for the target.
    Text(String),

    /// Italicized content.
    Italic(Box<Markup>),

    /// Bold content.
    Bold(Box<Markup>),

    /// Underlined content.
    Underline(Box<Markup>),

    /// A hyperlink around some content.
    Link { url: String, inner: Box<Markup> },

    /// A sequence of nodes with a separator between each pair.
    Join {
        separator: Box<Markup>,
        items: Vec<Markup>,
    },

    /// A bulleted or numbered list.
    List { ordered: bool, items: Vec<Markup> },
}

impl Markup {
    /// Plain text.
    pub fn text(text: impl Into<String>) -> Self {
        Markup::Text(text.into())
    }

    /// Italicizes `inner`.
    pub fn italic(inner: impl Into<Markup>) -> Self {
        Markup::Italic(Box::new(inner.into()))
    }

    /// Emboldens `inner`.
    pub fn bold(inner: impl Into<Markup>) -> Self {
        Markup::Bold(Box::new(inner.into()))
    }

    /// Underlines `inner`.
    pub fn underline(inner: impl Into<Markup>) -> Self {
        Markup::Underline(Box::new(inner.into()))
    }

    /// Links `inner` to `url`.
    pub fn link(url: impl Into<String>, inner: impl Into<Markup>) -> Self {
        Markup::Link {
            url: url.into(),
            inner: Box::new(inner.into()),
        }
    }

    /// Joins `items` with `separator` between each pair.
    pub fn join<I, T>(separator: impl Into<Markup>, items: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<Markup>,
    {
        Markup::Join {
            separator: Box::new(separator.into()),
            items: items.into_iter().map(Into::into).collect(),
        }
    }

    /// A list of `items`, numbered if `ordered` is true.
    pub fn list<I, T>(ordered: bool, items: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<Markup>,
    {
        Markup::List {
            ordered,
            items: items.into_iter().map(Into::into).collect(),
        }
    }

    /// Renders the tree as LaTeX.
    pub fn latex(&self) -> String {
        let mut visitor = LatexVisitor::default();
        self.accept(&mut visitor);
        visitor.text()
    }

    /// Renders the tree as HTML.
    pub fn html(&self) -> String {
        let mut visitor = HtmlVisitor::default();
        self.accept(&mut visitor);
        visitor.text()
    }

    /// Passes this node to `visitor`.
    pub fn accept<V: Visitor>(&self, visitor: &mut V) {
        visitor.visit(self);
    }
}

impl From<&str> for Markup {
    fn from(text: &str) -> Self {
        Markup::text(text)
    }
}

impl From<String> for Markup {
    fn from(text: String) -> Self {
        Markup::Text(text)
    }
}

impl From<i64> for Markup {
    fn from(n: i64) -> Self {
        Markup::Text(n.to_string())
    }
}

/// "Visit" a markup node and emit code for it.
pub trait Visitor {
    /// The generated text.
    fn text(self) -> String;

    /// "Visit" a particular node in the tree.
    fn visit(&mut self, node: &Markup);

    /// Visits each of `items`, visiting `separator` between each pair.
    fn visit_joined(&mut self, separator: &Markup, items: &[Markup]) {
        for (i, item) in items.iter().enumerate() {
            if i > 0 {
                self.visit(separator);
            }
            self.visit(item);
        }
    }
}

#[derive(Debug, Default)]
struct LatexVisitor {
    text: String,
}

impl Visitor for LatexVisitor {
    fn text(self) -> String {
        self.text
    }

    fn visit(&mut self, node: &Markup) {
        match node {
            Markup::Text(text) => self.text.push_str(&latex::transliterate(text)),
            Markup::Italic(inner) => self.wrap(r"\textit{", inner, "}"),
            Markup::Bold(inner) => self.wrap(r"\textbf{", inner, "}"),
            Markup::Underline(inner) => self.wrap(r"\underline{", inner, "}"),
            Markup::Link { url, inner } => {
                let open = format!(r"\href{{{}}}{{", url.replace('%', r"\%"));
                self.wrap(&open, inner, "}");
            }
            Markup::Join { separator, items } => self.visit_joined(separator, items),
            Markup::List { ordered, items } => {
                let env = if *ordered { "enumerate" } else { "itemize" };
                self.text.push_str(&format!(r"\begin{{{env}}}"));
                for item in items {
                    self.text.push_str("\n\\item ");
                    self.visit(item);
                }
                self.text.push_str(&format!("\n\\end{{{env}}}\n"));
            }
        }
    }
}

impl LatexVisitor {
    fn wrap(&mut self, open: &str, inner: &Markup, close: &str) {
        self.text.push_str(open);
        self.visit(inner);
        self.text.push_str(close);
    }
}

#[derive(Debug, Default)]
struct HtmlVisitor {
    text: String,
}

impl Visitor for HtmlVisitor {
    fn text(self) -> String {
        self.text
    }

    fn visit(&mut self, node: &Markup) {
        match node {
            Markup::Text(text) => self.text.push_str(&text::escape_html(text)),
            Markup::Italic(inner) => self.wrap("<i>", inner, "</i>"),
            Markup::Bold(inner) => self.wrap("<b>", inner, "</b>"),
            Markup::Underline(inner) => self.wrap("<u>", inner, "</u>"),
            Markup::Link { url, inner } => {
                let open = format!(r#"<a href="{}">"#, text::escape_html(url));
                self.wrap(&open, inner, "</a>");
            }
            Markup::Join { separator, items } => self.visit_joined(separator, items),
            Markup::List { ordered, items } => {
                let tag = if *ordered { "ol" } else { "ul" };
                self.text.push_str(&format!("<{tag}>"));
                for item in items {
                    self.wrap("\n<li>", item, "</li>");
                }
                self.text.push_str(&format!("\n</{tag}>\n"));
            }
        }
    }
}

impl HtmlVisitor {
    fn wrap(&mut self, open: &str, inner: &Markup, close: &str) {
        self.text.push_str(open);
        self.visit(inner);
        self.text.push_str(close);
    }
}

/// A value that can be substituted into a template.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Value {
    /// A number, rendered in decimal by every target.
    Integer(i64),

    /// Plain text, escaped for the target.
    Text(String),

    /// A markup tree, rendered by the target.
    Markup(Markup),
}

impl From<&str> for Value {
    fn from(text: &str) -> Self {
        Value::Text(text.to_string())
    }
}

impl From<String> for Value {
    fn from(text: String) -> Self {
        Value::Text(text)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Integer(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Integer(n.into())
    }
}

impl From<u32> for Value {
    fn from(n: u32) -> Self {
        Value::Integer(n.into())
    }
}

impl From<usize> for Value {
    fn from(n: usize) -> Self {
        Value::Integer(i64::try_from(n).unwrap_or(i64::MAX))
    }
}

impl From<Markup> for Value {
    fn from(markup: Markup) -> Self {
        Value::Markup(markup)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Integer(n) => write!(f, "{n}"),
            Value::Text(text) => write!(f, "{text:?}"),
            Value::Markup(markup) => write!(f, "{markup:?}"),
        }
    }
}

/// A renderer could not render a value.
#[derive(Debug, Error)]
#[error("cannot render {value} as {target}")]
pub struct Unrenderable {
    /// The value that could not be rendered.
    pub value: String,

    /// The name of the output format.
    pub target: String,
}

/// Turns values into text for a particular output format.
pub trait Render {
    /// Renders `value`. A missing value is passed as `None`.
    fn render(&self, value: Option<&Value>) -> Result<String, Unrenderable>;
}

/// The output formats vitae supports.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Renderer {
    /// LaTeX source.
    Latex,

    /// An HTML fragment.
    Html,
}

impl Renderer {
    /// Renders a markup tree.
    pub fn markup(&self, markup: &Markup) -> String {
        match self {
            Renderer::Latex => markup.latex(),
            Renderer::Html => markup.html(),
        }
    }

    /// Escapes plain text.
    pub fn escape(&self, text: &str) -> String {
        match self {
            Renderer::Latex => latex::transliterate(text),
            Renderer::Html => text::escape_html(text),
        }
    }
}

impl Render for Renderer {
    fn render(&self, value: Option<&Value>) -> Result<String, Unrenderable> {
        Ok(match value {
            None => String::new(),
            Some(Value::Integer(n)) => n.to_string(),
            Some(Value::Text(text)) => self.escape(text),
            Some(Value::Markup(markup)) => self.markup(markup),
        })
    }
}

impl fmt::Display for Renderer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Renderer::Latex => write!(f, "LaTeX"),
            Renderer::Html => write!(f, "HTML"),
        }
    }
}

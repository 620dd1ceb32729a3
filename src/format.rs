// SPDX-License-Identifier: Apache-2.0
// Copyright (C) 2025 Michael Dippery <michael@monkey-robot.com>

//! Fills `|field|` placeholders from records.
//!
//! Pipes work equally well in LaTeX and HTML templates, so the same syntax
//! serves both. There is no way to escape a literal pipe.
//!
//! A placeholder of the form `|texturl:field|` renders the field as a link
//! whose text is the URL itself.

use crate::markup::{Markup, Render, Renderer, Unrenderable, Value};
use crate::record::Fields;
use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

static PLACEHOLDER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\|[^|]+\|").expect("placeholder regex should compile"));

const TEXTURL: &str = "texturl:";

/// An error filling in a template.
#[derive(Debug, Error)]
pub enum Error {
    /// A field's value could not be rendered.
    #[error("while rendering field {field:?} of {record}: {source}")]
    Field {
        field: String,
        record: String,
        #[source]
        source: Unrenderable,
    },

    /// The literal template text could not be rendered.
    #[error("while rendering template text {text:?}: {source}")]
    Literal {
        text: String,
        #[source]
        source: Unrenderable,
    },
}

/// The result of filling in a template.
pub type Result<T> = std::result::Result<T, Error>;

/// How the text around placeholders is treated.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Literals {
    /// Copied to the output as is, for templates already written in the
    /// target format.
    #[default]
    Verbatim,

    /// Escaped for the target format like any other text.
    Escaped,
}

#[derive(Clone, Debug, PartialEq, Eq)]
enum Piece {
    Literal(String),
    Field(String),
    TextUrl(String),
}

/// A parsed template that can be applied to many records.
///
/// # Examples
///
/// ```
/// use vitae::format::{Formatter, Literals};
/// use vitae::markup::Renderer;
/// use vitae::record::Record;
///
/// let formatter = Formatter::new(Renderer::Html, Literals::Verbatim, "Hello |name|!");
/// let record = Record::new("person").with("name", "World");
/// assert_eq!(formatter.apply(&record)?, "Hello World!");
/// assert_eq!(formatter.apply(&Record::new("person"))?, "Hello !");
/// # Ok::<(), vitae::format::Error>(())
/// ```
#[derive(Clone, Debug)]
pub struct Formatter<R = Renderer> {
    renderer: R,
    literals: Literals,
    pieces: Vec<Piece>,
}

impl<R: Render> Formatter<R> {
    /// Parses `template` for rendering through `renderer`.
    pub fn new(renderer: R, literals: Literals, template: &str) -> Self {
        let mut pieces = vec![];
        let mut last = 0;

        for placeholder in PLACEHOLDER_RE.find_iter(template) {
            if placeholder.start() > last {
                pieces.push(Piece::Literal(
                    template[last..placeholder.start()].to_string(),
                ));
            }
            let name = &template[placeholder.start() + 1..placeholder.end() - 1];
            pieces.push(match name.strip_prefix(TEXTURL) {
                Some(field) => Piece::TextUrl(field.to_string()),
                None => Piece::Field(name.to_string()),
            });
            last = placeholder.end();
        }

        if last < template.len() {
            pieces.push(Piece::Literal(template[last..].to_string()));
        }

        Self {
            renderer,
            literals,
            pieces,
        }
    }

    /// The names of the fields the template refers to, in order.
    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.pieces.iter().filter_map(|piece| match piece {
            Piece::Field(name) | Piece::TextUrl(name) => Some(name.as_str()),
            Piece::Literal(_) => None,
        })
    }

    /// Fills in the template from `record`.
    ///
    /// Missing fields are handed to the renderer as absent values.
    pub fn apply<F: Fields + ?Sized>(&self, record: &F) -> Result<String> {
        let mut output = String::new();

        for piece in &self.pieces {
            match piece {
                Piece::Literal(text) => match self.literals {
                    Literals::Verbatim => output.push_str(text),
                    Literals::Escaped => {
                        let value = Value::from(text.as_str());
                        let rendered = self.renderer.render(Some(&value)).map_err(|source| {
                            Error::Literal {
                                text: text.clone(),
                                source,
                            }
                        })?;
                        output.push_str(&rendered);
                    }
                },
                Piece::Field(name) => {
                    let value = record.lookup(name);
                    let rendered = self
                        .renderer
                        .render(value.as_ref())
                        .map_err(|source| field_error(name, record, source))?;
                    output.push_str(&rendered);
                }
                Piece::TextUrl(name) => {
                    let value = record
                        .lookup(name)
                        .map(as_url_link)
                        .transpose()
                        .map_err(|source| field_error(name, record, source))?;
                    let rendered = self
                        .renderer
                        .render(value.as_ref())
                        .map_err(|source| field_error(name, record, source))?;
                    output.push_str(&rendered);
                }
            }
        }

        Ok(output)
    }
}

fn as_url_link(value: Value) -> std::result::Result<Value, Unrenderable> {
    let url = match value {
        Value::Text(url) => url,
        Value::Integer(n) => n.to_string(),
        Value::Markup(_) => {
            return Err(Unrenderable {
                value: value.to_string(),
                target: String::from("a URL"),
            });
        }
    };
    Ok(Value::Markup(Markup::link(url.clone(), url)))
}

fn field_error<F: Fields + ?Sized>(name: &str, record: &F, source: Unrenderable) -> Error {
    Error::Field {
        field: name.to_string(),
        record: record.describe(),
        source,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{Augmented, Record};
    use pretty_assertions::assert_eq;

    struct Refuses;

    impl Render for Refuses {
        fn render(&self, value: Option<&Value>) -> std::result::Result<String, Unrenderable> {
            match value {
                Some(Value::Integer(_)) => Err(Unrenderable {
                    value: String::from("an integer"),
                    target: String::from("nothing"),
                }),
                Some(Value::Text(text)) => Ok(text.clone()),
                _ => Ok(String::new()),
            }
        }
    }

    #[test]
    fn it_substitutes_fields() {
        let formatter = Formatter::new(Renderer::Html, Literals::Verbatim, "Hello |name|!");
        let record = Record::new("x").with("name", "World");
        assert_eq!(formatter.apply(&record).unwrap(), "Hello World!");
    }

    #[test]
    fn it_renders_missing_fields_as_nothing() {
        let formatter = Formatter::new(Renderer::Html, Literals::Verbatim, "Hello |name|!");
        assert_eq!(formatter.apply(&Record::new("x")).unwrap(), "Hello !");
    }

    #[test]
    fn it_escapes_field_values_but_not_verbatim_literals() {
        let formatter = Formatter::new(Renderer::Latex, Literals::Verbatim, r"\item |title| 100%");
        let record = Record::new("pub").with("title", "R&D");
        assert_eq!(formatter.apply(&record).unwrap(), r"\item R\&D 100%");
    }

    #[test]
    fn it_escapes_literals_when_asked() {
        let formatter = Formatter::new(Renderer::Latex, Literals::Escaped, "|n|% & more");
        let record = Record::new("x").with("n", "5");
        assert_eq!(formatter.apply(&record).unwrap(), r"5\% \& more");
    }

    #[test]
    fn it_renders_computed_values() {
        let record = Record::new("pub").with("title", "T");
        let mut aug = Augmented::new(&record);
        aug.set("number", 3);
        aug.set("title", Markup::bold("T"));

        let formatter = Formatter::new(Renderer::Html, Literals::Verbatim, "|number|. |title|");
        assert_eq!(formatter.apply(&aug).unwrap(), "3. <b>T</b>");
    }

    #[test]
    fn it_links_urls_to_themselves() {
        let record = Record::new("repo").with("url", "http://x.org/a_b");
        let html = Formatter::new(Renderer::Html, Literals::Verbatim, "<|texturl:url|>");
        let latex = Formatter::new(Renderer::Latex, Literals::Verbatim, "|texturl:url|");

        assert_eq!(
            html.apply(&record).unwrap(),
            r#"<<a href="http://x.org/a_b">http://x.org/a_b</a>>"#
        );
        assert_eq!(
            latex.apply(&record).unwrap(),
            r"\href{http://x.org/a_b}{http://x.org/a\_b}"
        );
    }

    #[test]
    fn it_renders_missing_text_urls_as_nothing() {
        let formatter = Formatter::new(Renderer::Html, Literals::Verbatim, "[|texturl:url|]");
        assert_eq!(formatter.apply(&Record::new("repo")).unwrap(), "[]");
    }

    #[test]
    fn it_refuses_markup_as_a_url() {
        let record = Record::new("pub");
        let mut aug = Augmented::new(&record);
        aug.set("url", Markup::italic("nope"));

        let formatter = Formatter::new(Renderer::Html, Literals::Verbatim, "|texturl:url|");
        let err = formatter.apply(&aug).unwrap_err();
        assert!(matches!(err, Error::Field { ref field, .. } if field == "url"), "{err}");
    }

    #[test]
    fn it_leaves_empty_and_unpaired_pipes_alone() {
        let formatter = Formatter::new(Renderer::Html, Literals::Verbatim, "a || b |c");
        assert_eq!(formatter.fields().count(), 0);
        assert_eq!(formatter.apply(&Record::new("x")).unwrap(), "a || b |c");
    }

    #[test]
    fn it_lists_the_fields_it_uses() {
        let formatter = Formatter::new(Renderer::Html, Literals::Verbatim, "|a| and |texturl:b|");
        assert_eq!(formatter.fields().collect::<Vec<_>>(), vec!["a", "b"]);
    }

    #[test]
    fn it_names_the_field_and_record_when_rendering_fails() {
        let record = Record::new("pub").with("title", "On Things");
        let mut aug = Augmented::new(&record);
        aug.set("year", 2014);

        let formatter = Formatter::new(Refuses, Literals::Verbatim, "|title| (|year|)");
        let err = formatter.apply(&aug).unwrap_err();
        assert_eq!(
            err.to_string(),
            "while rendering field \"year\" of [pub] title = \"On Things\": \
             cannot render an integer as nothing"
        );
    }
}

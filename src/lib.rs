// SPDX-License-Identifier: Apache-2.0
// Copyright (C) 2025 Michael Dippery <michael@monkey-robot.com>

//! vitae renders a CV, a publication list, or any other document built from
//! lists of things, out of a directory of plain-text records. The same data
//! can produce a LaTeX CV for print and an HTML version for the web.
//!
//! # Data
//!
//! Records live in `.txt` files in a data directory, in a simple ini-like
//! format described in the [`store`] module:
//!
//! ```text
//! [pub]
//! title = Radio Emission from Ultracool Dwarfs
//! authors = Peter K. G. Williams; Edo Berger
//! mypos = 1
//! pubdate = 2014/03
//! refereed = y
//! ```
//!
//! # Templates
//!
//! Templates are ordinary LaTeX or HTML files with a few extra commands,
//! described in the [`commands`] module:
//!
//! ```text
//! <ol>
//! FORMAT <li>|full_authors|, |bold_if_first_title|, |lcite|</li>
//! PUBLIST refereed
//! </ol>
//! ```
//!
//! # Examples
//!
//! Render `cv.tex` from the `templates` directory, with data from the
//! current directory:
//!
//! ```bash
//! vitae latex cv.tex > cv-rendered.tex
//! ```
//!
//! Render an HTML publication list with data from `~/cv`:
//!
//! ```bash
//! vitae html pubs.html ~/cv > pubs.html
//! ```
//!
//! Mark a talk as invited, changing nothing else in the file:
//!
//! ```bash
//! vitae set talks.txt --where "title=Lunch Seminar" invited y
//! ```
//!
//! Additional template directories may be listed in `$VITAE_TEMPLATES`,
//! separated like `$PATH`.
//!
//! # License
//!
//! vitae is licensed under the terms of the [Apache License 2.0]. Please
//! see the LICENSE file accompanying this source code or visit the previous
//! link for more information on licensing.
//!
//! [Apache License 2.0]: https://www.apache.org/licenses/LICENSE-2.0

pub mod cli;
pub mod clock;
pub mod commands;
pub mod conf;
pub mod data;
pub mod format;
pub mod latex;
pub mod markup;
pub mod pubs;
pub mod record;
pub mod store;
pub mod template;
pub mod text;

#[cfg(test)]
mod test_utils;

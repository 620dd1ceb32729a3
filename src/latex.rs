// SPDX-License-Identifier: Apache-2.0
// Copyright (C) 2025 Michael Dippery <michael@monkey-robot.com>

//! Unicode to LaTeX transliteration.
//!
//! Only as much of Unicode is covered as bibliographic names and titles
//! need: LaTeX's special characters, typographic punctuation, and accented
//! Latin letters. Anything else passes through unchanged and is left for a
//! Unicode-aware TeX engine to deal with.

use once_cell::sync::Lazy;
use std::collections::HashMap;

/// Accent commands and the precomposed letters they produce, paired with
/// the base letter each is built from.
const ACCENTS: &[(&str, &str, &str)] = &[
    (r"\'", "áéíóúýćńśźĺŕÁÉÍÓÚÝĆŃŚŹĹŔ", "aeiouycnszlrAEIOUYCNSZLR"),
    (r"\`", "àèìòùÀÈÌÒÙ", "aeiouAEIOU"),
    (r"\^", "âêîôûĉĝĥĵŝŵŷÂÊÎÔÛĈĜĤĴŜŴŶ", "aeioucghjswyAEIOUCGHJSWY"),
    (r#"\""#, "äëïöüÿÄËÏÖÜŸ", "aeiouyAEIOUY"),
    (r"\~", "ãñõÃÑÕ", "anoANO"),
    (r"\=", "āēīōūĀĒĪŌŪ", "aeiouAEIOU"),
    (r"\.", "żėŻĖİ", "zeZEI"),
    (r"\c", "çşţÇŞŢ", "cstCST"),
    (r"\v", "čďěňřšťžČĎĚŇŘŠŤŽ", "cdenrstzCDENRSTZ"),
    (r"\r", "åůÅŮ", "auAU"),
    (r"\u", "ăğŭĂĞŬ", "aguAGU"),
    (r"\H", "őűŐŰ", "ouOU"),
    (r"\k", "ąęĄĘ", "aeAE"),
];

/// Characters that are replaced outright.
const SYMBOLS: &[(char, &str)] = &[
    ('\\', r"\textbackslash{}"),
    ('{', r"\{"),
    ('}', r"\}"),
    ('$', r"\$"),
    ('&', r"\&"),
    ('#', r"\#"),
    ('_', r"\_"),
    ('%', r"\%"),
    ('~', r"\textasciitilde{}"),
    ('^', r"\textasciicircum{}"),
    ('<', r"\textless{}"),
    ('>', r"\textgreater{}"),
    ('\u{a0}', "~"),
    ('\u{2013}', "--"),
    ('\u{2014}', "---"),
    ('\u{2018}', "`"),
    ('\u{2019}', "'"),
    ('\u{201c}', "``"),
    ('\u{201d}', "''"),
    ('\u{2026}', r"\ldots{}"),
    ('«', r"\guillemotleft{}"),
    ('»', r"\guillemotright{}"),
    ('ß', r"{\ss}"),
    ('æ', r"{\ae}"),
    ('Æ', r"{\AE}"),
    ('œ', r"{\oe}"),
    ('Œ', r"{\OE}"),
    ('ø', r"{\o}"),
    ('Ø', r"{\O}"),
    ('ł', r"{\l}"),
    ('Ł', r"{\L}"),
    ('ı', r"{\i}"),
    ('°', r"\textdegree{}"),
];

static TABLE: Lazy<HashMap<char, String>> = Lazy::new(|| {
    let mut table: HashMap<char, String> = SYMBOLS
        .iter()
        .map(|&(c, latex)| (c, latex.to_string()))
        .collect();

    for &(command, letters, bases) in ACCENTS {
        for (letter, base) in letters.chars().zip(bases.chars()) {
            table.insert(letter, format!("{command}{{{base}}}"));
        }
    }

    table
});

/// Transliterates `text` into LaTeX source.
///
/// # Examples
///
/// ```
/// use vitae::latex::transliterate;
/// assert_eq!(transliterate("Pérez & Co."), r"P\'{e}rez \& Co.");
/// assert_eq!(transliterate("100%"), r"100\%");
/// ```
pub fn transliterate(text: &str) -> String {
    let mut latex = String::with_capacity(text.len());
    for c in text.chars() {
        match TABLE.get(&c) {
            Some(replacement) => latex.push_str(replacement),
            None => latex.push(c),
        }
    }
    latex
}

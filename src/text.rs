//! Helpful utilities for working with text.

use htmlentity::entity::{self, CharacterSet, EncodeType, ICodedDataTrait};

/// The non-breaking space, used between initials and surnames and inside dates.
pub const NBSP: char = '\u{a0}';

/// Abbreviated month names, January first.
pub const MONTHS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

/// The abbreviated name of a month, where January is 1.
///
/// # Examples
///
/// ```
/// use vitae::text::month_abbrev;
/// assert_eq!(month_abbrev(1), Some("Jan"));
/// assert_eq!(month_abbrev(12), Some("Dec"));
/// assert_eq!(month_abbrev(13), None);
/// ```
pub fn month_abbrev(month: u32) -> Option<&'static str> {
    let index = usize::try_from(month).ok()?.checked_sub(1)?;
    MONTHS.get(index).copied()
}

/// Escapes the characters that are special in HTML: `&`, `<`, `>`, `"`,
/// and `'`.
///
/// # Examples
///
/// ```
/// use vitae::text::escape_html;
/// assert_eq!(escape_html("<This & That>"), "&lt;This &amp; That&gt;");
/// assert_eq!(escape_html("A Plaintext Title"), "A Plaintext Title");
/// ```
pub fn escape_html(text: &str) -> String {
    entity::encode(
        text.as_bytes(),
        &EncodeType::Named,
        &CharacterSet::SpecialChars,
    )
    .to_string()
    .unwrap_or(text.to_string())
}

/// Converts HTML entities into their single-character equivalents.
///
/// Unlike HTML itself, whitespace is significant and left alone.
///
/// # Examples
///
/// ```
/// use vitae::text::convert_html_entities;
/// let raw = "&lt;This &amp; That&gt;";
/// let converted = convert_html_entities(raw);
/// assert_eq!(converted, "<This & That>");
/// ```
///
/// ```
/// use vitae::text::convert_html_entities;
/// let raw = "  A Plaintext Title ";
/// let converted = convert_html_entities(raw);
/// assert_eq!(converted, raw);
/// ```
pub fn convert_html_entities(text: &str) -> String {
    entity::decode(text.as_bytes())
        .to_string()
        .unwrap_or(text.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn it_escapes_quotes() {
        let escaped = escape_html(r#"say "hi" it's"#);
        assert!(!escaped.contains('"'), "{escaped}");
        assert!(!escaped.contains('\''), "{escaped}");
        assert_eq!(convert_html_entities(&escaped), r#"say "hi" it's"#);
    }

    #[test]
    fn it_leaves_non_breaking_spaces_alone_when_escaping() {
        let text = format!("PKG{NBSP}Williams");
        assert_eq!(escape_html(&text), text);
    }

    #[test]
    fn it_decodes_non_breaking_spaces() {
        assert_eq!(convert_html_entities("a&nbsp;b"), format!("a{NBSP}b"));
    }

    #[test]
    fn it_rejects_month_zero() {
        assert_eq!(month_abbrev(0), None);
    }
}

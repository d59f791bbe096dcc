//! Lucene escape sequence handling.
//!
//! Terms accept `\x` for any character `x`. Phrases only recognize `\"` and
//! `\\`; any other backslash is a literal character.

use std::borrow::Cow;

/// Resolve `\x` escape sequences in a raw term.
pub fn unescape_term(raw: &str) -> Cow<'_, str> {
    if !raw.contains('\\') {
        return Cow::Borrowed(raw);
    }
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.next() {
                Some(escaped) => out.push(escaped),
                // trailing backslash stays literal
                None => out.push('\\'),
            }
        } else {
            out.push(c);
        }
    }
    Cow::Owned(out)
}

/// Escape the Lucene special characters in a term value.
///
/// `*` and `?` are left alone so wildcard terms survive a round trip through
/// [`unescape_term`] and re-parsing.
pub fn escape_term(value: &str) -> Cow<'_, str> {
    if !value.chars().any(needs_term_escape) {
        return Cow::Borrowed(value);
    }
    let mut out = String::with_capacity(value.len() + 2);
    for c in value.chars() {
        if needs_term_escape(c) {
            out.push('\\');
        }
        out.push(c);
    }
    Cow::Owned(out)
}

fn needs_term_escape(c: char) -> bool {
    matches!(
        c,
        '\\' | '+' | '-' | '&' | '|' | '!' | '(' | ')' | '{' | '}' | '[' | ']' | '^' | '"' | '~'
            | ':' | '/'
    )
}

/// Resolve the `\"` and `\\` escapes recognized inside a quoted phrase.
pub fn unescape_phrase(raw: &str) -> Cow<'_, str> {
    if !raw.contains('\\') {
        return Cow::Borrowed(raw);
    }
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\\' && matches!(chars.peek(), Some('"') | Some('\\')) {
            out.push(chars.next().unwrap_or('\\'));
        } else {
            out.push(c);
        }
    }
    Cow::Owned(out)
}

/// Escape `"` and `\` for emission inside a quoted phrase.
pub fn escape_phrase(value: &str) -> Cow<'_, str> {
    if !value.contains(['"', '\\']) {
        return Cow::Borrowed(value);
    }
    let mut out = String::with_capacity(value.len() + 2);
    for c in value.chars() {
        if matches!(c, '"' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    Cow::Owned(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn term_escapes_resolve() {
        assert_eq!(unescape_term(r"foo\:bar"), "foo:bar");
        assert_eq!(unescape_term(r"a\\b"), r"a\b");
        assert_eq!(unescape_term("plain"), "plain");
    }

    #[test]
    fn term_escape_round_trips() {
        let raw = r"foo\:bar\(1\)";
        let unescaped = unescape_term(raw);
        assert_eq!(escape_term(&unescaped), raw);
    }

    #[test]
    fn wildcards_stay_unescaped() {
        assert_eq!(escape_term("he*llo?"), "he*llo?");
    }

    #[test]
    fn phrase_escapes() {
        assert_eq!(unescape_phrase(r#"say \"hi\""#), r#"say "hi""#);
        // only `\"` and `\\` are escapes inside a phrase
        assert_eq!(unescape_phrase(r"a\nb"), r"a\nb");
        assert_eq!(escape_phrase(r#"say "hi""#), r#"say \"hi\""#);
    }
}

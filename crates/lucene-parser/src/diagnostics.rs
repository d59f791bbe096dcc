use crate::text::SourceSpan;
use std::fmt;

/// Classification of a parse diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// A byte sequence the lexer does not recognize, or an unterminated
    /// phrase or regex literal.
    Lexical,
    /// Input that does not follow the query grammar.
    Syntax,
    /// The input ended where more was expected.
    UnexpectedEof,
    /// A configured parse limit cut the work short.
    Limit,
}

/// A diagnostic produced while lexing or parsing.
///
/// Diagnostics are collected next to the resulting document — malformed
/// input never aborts parsing. Each one records what went wrong, the byte
/// span of the offending input (zero-length when it points at a position,
/// such as the end of input), and the offending fragment itself when there
/// is one.
///
/// ```rust
/// use lucene_parser::parse;
///
/// let result = parse("title:");
/// assert!(!result.is_success());
/// let error = result.errors().next().unwrap();
/// assert_eq!(error.message(), "expected value after ':'");
/// assert_eq!(error.offset(), 6);
/// assert!(error.is_empty());
/// ```
#[derive(Clone, PartialEq, Eq)]
pub struct Error {
    kind: ErrorKind,
    message: String,
    found: String,
    offset: usize,
    length: usize,
}

impl Error {
    /// A lexical diagnostic covering the unrecognized fragment.
    pub fn lexical(message: impl Into<String>, found: impl Into<String>, offset: usize) -> Self {
        Self::spanning(ErrorKind::Lexical, message, found.into(), offset)
    }

    /// A grammar diagnostic at the token that violated it.
    pub fn syntax(message: impl Into<String>, found: impl Into<String>, offset: usize) -> Self {
        Self::spanning(ErrorKind::Syntax, message, found.into(), offset)
    }

    /// A diagnostic for input that ended too early; a zero-length span at
    /// `offset`.
    pub fn unexpected_eof(message: impl Into<String>, offset: usize) -> Self {
        Self {
            kind: ErrorKind::UnexpectedEof,
            message: message.into(),
            found: String::new(),
            offset,
            length: 0,
        }
    }

    /// A diagnostic recording that a parse limit was hit at `offset`.
    pub fn limit(message: impl Into<String>, offset: usize) -> Self {
        Self {
            kind: ErrorKind::Limit,
            message: message.into(),
            found: String::new(),
            offset,
            length: 0,
        }
    }

    fn spanning(kind: ErrorKind, message: impl Into<String>, found: String, offset: usize) -> Self {
        let length = found.len();
        Self {
            kind,
            message: message.into(),
            found,
            offset,
            length,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// The error's message.
    pub fn message(&self) -> &str {
        self.message.as_ref()
    }

    /// The offending input fragment. Empty for end-of-input and limit
    /// diagnostics, which point at a position rather than a fragment.
    pub fn found(&self) -> &str {
        self.found.as_ref()
    }

    /// Byte offset into the input where the diagnostic begins.
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Length in bytes of the offending fragment.
    pub fn len(&self) -> usize {
        self.length
    }

    /// Whether the diagnostic points at a position rather than covering a
    /// fragment of the input.
    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    /// The diagnostic's position as a span into the original input.
    pub fn span(&self) -> SourceSpan {
        SourceSpan::new(self.offset, self.length)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.found.is_empty() {
            write!(f, "{} at offset {}", self.message, self.offset)
        } else {
            write!(
                f,
                "{} (found `{}` at offset {})",
                self.message, self.found, self.offset
            )
        }
    }
}

impl fmt::Debug for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self.kind {
            ErrorKind::Lexical => "LEX",
            ErrorKind::Syntax => "SYNTAX",
            ErrorKind::UnexpectedEof => "EOF",
            ErrorKind::Limit => "LIMIT",
        };
        write!(f, "{label}@{:?} {:?}", self.span(), self.message)?;
        if !self.found.is_empty() {
            write!(f, " (found {:?})", self.found)?;
        }
        Ok(())
    }
}

/// Usage meter for a bounded parsing resource: recursion depth, token
/// count, or group nesting. Remembers the high-water mark so callers can
/// see how close to a cap a document came.
///
/// ```rust
/// use lucene_parser::Parser;
///
/// let result = Parser::new("((a OR b))").recursion_limit(10).parse();
/// assert!(result.is_success());
/// assert_eq!(result.recursion_budget().high_water(), 2);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Budget {
    limit: Option<usize>,
    used: usize,
    high: usize,
}

impl Budget {
    /// A meter with no cap; it only records the high-water mark.
    pub fn unlimited() -> Self {
        Self {
            limit: None,
            used: 0,
            high: 0,
        }
    }

    /// A meter that refuses consumption past `limit` units.
    pub fn limited(limit: usize) -> Self {
        Self {
            limit: Some(limit),
            used: 0,
            high: 0,
        }
    }

    /// Take one unit. Returns false, without consuming, once the cap is
    /// reached.
    pub fn try_consume(&mut self) -> bool {
        if self.limit.is_some_and(|limit| self.used >= limit) {
            return false;
        }
        self.used += 1;
        if self.used > self.high {
            self.high = self.used;
        }
        true
    }

    /// Give one unit back, e.g. when leaving a nesting level.
    pub fn release(&mut self) {
        self.used = self.used.saturating_sub(1);
    }

    /// The configured cap, if any.
    pub fn limit(&self) -> Option<usize> {
        self.limit
    }

    /// The most units simultaneously in use over this meter's lifetime.
    pub fn high_water(&self) -> usize {
        self.high
    }
}

impl Default for Budget {
    fn default() -> Self {
        Self::unlimited()
    }
}

use triomphe::ThinArc;

/// Byte range into the original query input.
///
/// Spans recorded by the parser are non-decreasing in a depth-first,
/// left-to-right traversal of the resulting tree.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct SourceSpan {
    start: usize,
    len: usize,
}

impl SourceSpan {
    pub fn new(start: usize, len: usize) -> Self {
        Self { start, len }
    }

    /// Byte offset where the span begins.
    pub fn start(&self) -> usize {
        self.start
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Byte offset one past the end of the span.
    pub fn end(&self) -> usize {
        self.start + self.len
    }

    /// The smallest span covering both `self` and `other`.
    pub fn cover(&self, other: SourceSpan) -> SourceSpan {
        let start = self.start.min(other.start);
        let end = self.end().max(other.end());
        SourceSpan::new(start, end - start)
    }
}

impl std::fmt::Debug for SourceSpan {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}..{}", self.start, self.end())
    }
}

/// The shared, immutable buffer holding the original query input.
///
/// This is similar to `Arc<str>` except with thin pointers (the length is
/// stored in the heap allocation) and without support for weak references.
/// Every node of a parsed document holds views into one of these, so cloning
/// a `SourceText` is a reference-count bump.
#[derive(Clone)]
pub struct SourceText {
    // Invariant: must be well-formed UTF-8
    bytes: ThinArc<(), u8>,
}

impl SourceText {
    pub fn new(value: &str) -> Self {
        Self {
            bytes: ThinArc::from_header_and_slice((), value.as_bytes()),
        }
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        // Safety: constructed from a `&str` and immutable since
        unsafe { std::str::from_utf8_unchecked(&self.bytes.slice) }
    }

    pub fn len(&self) -> usize {
        self.bytes.slice.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.slice.is_empty()
    }

    /// The substring covered by `span`, or `None` if the span is out of
    /// bounds or not on a character boundary.
    pub fn slice(&self, span: SourceSpan) -> Option<&str> {
        self.as_str().get(span.start()..span.end())
    }
}

impl std::ops::Deref for SourceText {
    type Target = str;

    #[inline]
    fn deref(&self) -> &Self::Target {
        self.as_str()
    }
}

impl AsRef<str> for SourceText {
    #[inline]
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl std::fmt::Debug for SourceText {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.as_str().fmt(f)
    }
}

impl std::fmt::Display for SourceText {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.as_str().fmt(f)
    }
}

impl Default for SourceText {
    fn default() -> Self {
        Self::new("")
    }
}

impl Eq for SourceText {}

impl<Other: AsRef<str>> PartialEq<Other> for SourceText {
    fn eq(&self, other: &Other) -> bool {
        self.as_str() == other.as_ref()
    }
}

impl From<&'_ str> for SourceText {
    fn from(value: &'_ str) -> Self {
        Self::new(value)
    }
}

/// A textual attribute of a query node.
///
/// Text parsed from the input is a `(start, length)` view into the shared
/// [`SourceText`]; it only becomes an owned string when a transformation
/// writes a value that is not a substring of the input ([`QueryText::set`]).
/// Equality and hashing compare the resolved string, not the representation.
#[derive(Clone)]
pub struct QueryText {
    repr: Repr,
}

#[derive(Clone)]
enum Repr {
    Parsed { source: SourceText, span: SourceSpan },
    Owned(String),
}

impl QueryText {
    /// A view into `source` covering `span`.
    pub fn parsed(source: SourceText, span: SourceSpan) -> Self {
        debug_assert!(source.slice(span).is_some(), "span out of bounds");
        Self {
            repr: Repr::Parsed { source, span },
        }
    }

    /// An owned value that did not come from the parsed input.
    pub fn synthetic(value: impl Into<String>) -> Self {
        Self {
            repr: Repr::Owned(value.into()),
        }
    }

    pub fn as_str(&self) -> &str {
        match &self.repr {
            Repr::Parsed { source, span } => source.slice(*span).unwrap_or(""),
            Repr::Owned(value) => value,
        }
    }

    /// The position of this text in the original input, if it is still a
    /// parsed view.
    pub fn span(&self) -> Option<SourceSpan> {
        match &self.repr {
            Repr::Parsed { span, .. } => Some(*span),
            Repr::Owned(_) => None,
        }
    }

    /// Whether the text has been overwritten since parsing (or never came
    /// from parsed input).
    pub fn is_synthetic(&self) -> bool {
        matches!(self.repr, Repr::Owned(_))
    }

    /// Overwrite the text, materializing it as an owned string.
    pub fn set(&mut self, value: impl Into<String>) {
        self.repr = Repr::Owned(value.into());
    }

    pub fn len(&self) -> usize {
        self.as_str().len()
    }

    pub fn is_empty(&self) -> bool {
        self.as_str().is_empty()
    }
}

impl Default for QueryText {
    fn default() -> Self {
        Self::synthetic("")
    }
}

impl std::ops::Deref for QueryText {
    type Target = str;

    #[inline]
    fn deref(&self) -> &Self::Target {
        self.as_str()
    }
}

impl AsRef<str> for QueryText {
    #[inline]
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl std::fmt::Debug for QueryText {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.as_str().fmt(f)
    }
}

impl std::fmt::Display for QueryText {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.as_str().fmt(f)
    }
}

impl Eq for QueryText {}

impl<Other: AsRef<str> + ?Sized> PartialEq<Other> for QueryText {
    fn eq(&self, other: &Other) -> bool {
        self.as_str() == other.as_ref()
    }
}

impl std::hash::Hash for QueryText {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.as_str().hash(state);
    }
}

impl From<&'_ str> for QueryText {
    fn from(value: &'_ str) -> Self {
        Self::synthetic(value)
    }
}

impl From<String> for QueryText {
    fn from(value: String) -> Self {
        Self::synthetic(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parsed_view_reads_from_source() {
        let source = SourceText::new("title:hello");
        let text = QueryText::parsed(source, SourceSpan::new(6, 5));
        assert_eq!(text.as_str(), "hello");
        assert!(!text.is_synthetic());
        assert_eq!(text.span(), Some(SourceSpan::new(6, 5)));
    }

    #[test]
    fn set_materializes_as_owned() {
        let source = SourceText::new("title:hello");
        let mut text = QueryText::parsed(source, SourceSpan::new(6, 5));
        text.set("world");
        assert_eq!(text.as_str(), "world");
        assert!(text.is_synthetic());
        assert_eq!(text.span(), None);
    }

    #[test]
    fn equality_ignores_representation() {
        let source = SourceText::new("hello");
        let parsed = QueryText::parsed(source, SourceSpan::new(0, 5));
        let owned = QueryText::synthetic("hello");
        assert_eq!(parsed, owned);
    }

    #[test]
    fn span_cover() {
        let a = SourceSpan::new(2, 3);
        let b = SourceSpan::new(8, 4);
        assert_eq!(a.cover(b), SourceSpan::new(2, 10));
    }
}

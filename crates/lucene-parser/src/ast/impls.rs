use super::*;
use crate::escape::{unescape_phrase, unescape_term};
use std::borrow::Cow;
use std::fmt;

impl QueryDocument {
    /// An empty document over a blank source.
    pub fn empty() -> Self {
        Self {
            source: SourceText::default(),
            query: None,
        }
    }
}

impl fmt::Debug for QueryDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryDocument")
            .field("query", &self.query)
            .finish()
    }
}

impl Eq for QueryDocument {}

// Structural comparison only; two documents over different source buffers
// are equal when their trees are.
impl PartialEq for QueryDocument {
    fn eq(&self, other: &Self) -> bool {
        self.query == other.query
    }
}

impl QueryNode {
    /// The node's position in the input it was parsed from.
    pub fn span(&self) -> Option<SourceSpan> {
        match self {
            QueryNode::Group(node) => node.span(),
            QueryNode::Boolean(node) => node.span(),
            QueryNode::Not(node) => node.span(),
            QueryNode::Field(node) => node.span(),
            QueryNode::Term(node) => node.span(),
            QueryNode::Phrase(node) => node.span(),
            QueryNode::Regex(node) => node.span(),
            QueryNode::Range(node) => node.span(),
            QueryNode::MultiTerm(node) => node.span(),
            QueryNode::Exists(node) => node.span(),
            QueryNode::Missing(node) => node.span(),
            QueryNode::MatchAll(node) => node.span(),
        }
    }
}

impl From<Node<GroupNode>> for QueryNode {
    fn from(node: Node<GroupNode>) -> Self {
        QueryNode::Group(node)
    }
}

impl From<Node<BooleanQueryNode>> for QueryNode {
    fn from(node: Node<BooleanQueryNode>) -> Self {
        QueryNode::Boolean(node)
    }
}

impl From<Node<NotNode>> for QueryNode {
    fn from(node: Node<NotNode>) -> Self {
        QueryNode::Not(node)
    }
}

impl From<Node<FieldQueryNode>> for QueryNode {
    fn from(node: Node<FieldQueryNode>) -> Self {
        QueryNode::Field(node)
    }
}

impl From<Node<TermNode>> for QueryNode {
    fn from(node: Node<TermNode>) -> Self {
        QueryNode::Term(node)
    }
}

impl From<Node<PhraseNode>> for QueryNode {
    fn from(node: Node<PhraseNode>) -> Self {
        QueryNode::Phrase(node)
    }
}

impl From<Node<RegexNode>> for QueryNode {
    fn from(node: Node<RegexNode>) -> Self {
        QueryNode::Regex(node)
    }
}

impl From<Node<RangeNode>> for QueryNode {
    fn from(node: Node<RangeNode>) -> Self {
        QueryNode::Range(node)
    }
}

impl From<Node<MultiTermNode>> for QueryNode {
    fn from(node: Node<MultiTermNode>) -> Self {
        QueryNode::MultiTerm(node)
    }
}

impl From<Node<ExistsNode>> for QueryNode {
    fn from(node: Node<ExistsNode>) -> Self {
        QueryNode::Exists(node)
    }
}

impl From<Node<MissingNode>> for QueryNode {
    fn from(node: Node<MissingNode>) -> Self {
        QueryNode::Missing(node)
    }
}

impl From<Node<MatchAllNode>> for QueryNode {
    fn from(node: Node<MatchAllNode>) -> Self {
        QueryNode::MatchAll(node)
    }
}

impl TermNode {
    /// A synthetic term that did not come from parsed input.
    pub fn synthetic(term: impl Into<String>) -> Self {
        Self {
            term: QueryText::synthetic(term),
            prefix: None,
            boost: None,
            fuzzy: None,
        }
    }

    /// The term with `\x` escape sequences resolved.
    pub fn unescaped_term(&self) -> Cow<'_, str> {
        unescape_term(self.term.as_str())
    }

    /// Overwrite the term with a synthetic (already unescaped) value.
    pub fn set_term(&mut self, value: impl Into<String>) {
        self.term.set(value);
    }

    /// Whether the term starts with an unescaped `*` or `?`.
    pub fn has_leading_wildcard(&self) -> bool {
        matches!(self.term.as_str().as_bytes().first(), Some(b'*') | Some(b'?'))
    }
}

impl PhraseNode {
    /// The phrase content with `\"` and `\\` escapes resolved.
    pub fn text(&self) -> Cow<'_, str> {
        unescape_phrase(self.phrase.as_str())
    }
}

impl BooleanOperator {
    pub fn as_str(self) -> &'static str {
        match self {
            BooleanOperator::And => "AND",
            BooleanOperator::Or => "OR",
        }
    }
}

impl RangeOperator {
    pub fn as_str(self) -> &'static str {
        match self {
            RangeOperator::Gt => ">",
            RangeOperator::Ge => ">=",
            RangeOperator::Lt => "<",
            RangeOperator::Le => "<=",
        }
    }

    /// Whether a bound qualified by this operator includes the bound value.
    pub fn is_inclusive(self) -> bool {
        matches!(self, RangeOperator::Ge | RangeOperator::Le)
    }
}

impl Prefix {
    pub fn as_str(self) -> &'static str {
        match self {
            Prefix::Must => "+",
            Prefix::MustNot => "-",
            Prefix::Not => "NOT ",
        }
    }
}

impl fmt::Display for BooleanOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for RangeOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

//! Typed abstract syntax tree for Lucene-style queries.
//!
//! The tree is a closed set of node variants. Nodes are wrapped in
//! [`Node`], a reference-counted smart pointer carrying the node's source
//! span; text attributes are [`QueryText`] views into the shared input
//! buffer. Parsing an input that does not conform to the grammar produces
//! parse errors together with a partial tree.
//!
//! Structural equality ([`PartialEq`]) ignores source spans and text
//! representation, so a document re-parsed from its own rendering compares
//! equal to the original.

use crate::node::Node;
use crate::text::{QueryText, SourceSpan, SourceText};
use ordered_float::OrderedFloat;

mod impls;
mod serialize;

pub use self::serialize::{to_query_string, QueryStringBuilder};

/// The root of a parsed query. Holds the shared input buffer and the
/// top-level query, `None` for blank input.
#[derive(Clone)]
pub struct QueryDocument {
    pub source: SourceText,
    pub query: Option<QueryNode>,
}

/// Any query node. A closed enum: adapters and visitors dispatch
/// exhaustively on the variant.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub enum QueryNode {
    Group(Node<GroupNode>),
    Boolean(Node<BooleanQueryNode>),
    Not(Node<NotNode>),
    Field(Node<FieldQueryNode>),
    Term(Node<TermNode>),
    Phrase(Node<PhraseNode>),
    Regex(Node<RegexNode>),
    Range(Node<RangeNode>),
    MultiTerm(Node<MultiTermNode>),
    Exists(Node<ExistsNode>),
    Missing(Node<MissingNode>),
    MatchAll(Node<MatchAllNode>),
}

/// `+` (must), `-` (must not) or a prefixed `NOT` on the node it qualifies.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum Prefix {
    Must,
    MustNot,
    Not,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum BooleanOperator {
    And,
    Or,
}

/// Short-form range comparator: `field:>value` and friends.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum RangeOperator {
    Gt,
    Ge,
    Lt,
    Le,
}

/// A numeric boost weight (`^2.5`).
pub type Boost = OrderedFloat<f32>;

/// A parenthesized subquery.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct GroupNode {
    /// Populated when a transformation attaches a field to a group it
    /// builds; the parser itself wraps `field:(…)` in a [`FieldQueryNode`].
    pub field: Option<QueryText>,
    pub query: Option<QueryNode>,
    pub boost: Option<Boost>,
    pub prefix: Option<Prefix>,
}

/// A binary `AND`/`OR`. Always has exactly two children; an implicit
/// conjunction (`a b`) sets `implicit` so rendering can omit the keyword.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct BooleanQueryNode {
    pub left: QueryNode,
    pub right: QueryNode,
    pub operator: BooleanOperator,
    pub implicit: bool,
}

/// A `NOT` applied to a single child.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct NotNode {
    pub query: QueryNode,
}

/// `field:` applied to a term, phrase, regex, range, group or multi-term.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct FieldQueryNode {
    pub field: QueryText,
    pub query: QueryNode,
    pub prefix: Option<Prefix>,
    pub boost: Option<Boost>,
}

/// A bare term. `term` is the raw input text with escape sequences intact;
/// [`TermNode::unescaped_term`] resolves them lazily from the same view.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct TermNode {
    pub term: QueryText,
    pub prefix: Option<Prefix>,
    pub boost: Option<Boost>,
    pub fuzzy: Option<Fuzzy>,
}

/// Fuzzy modifier on a term: `term~` or `term~0.8`.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash)]
pub struct Fuzzy {
    pub slop: Option<OrderedFloat<f32>>,
}

/// A quoted phrase. `phrase` is the raw text between the quotes;
/// [`PhraseNode::text`] resolves the `\"` and `\\` escapes.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct PhraseNode {
    pub phrase: QueryText,
    pub proximity: Option<u32>,
    pub boost: Option<Boost>,
    pub prefix: Option<Prefix>,
}

/// A `/pattern/` regular expression literal; `regex` is the source between
/// the delimiters.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct RegexNode {
    pub regex: QueryText,
}

/// A range query, bracketed (`[a TO b]`, `{a TO b}`, mixed) or short-form
/// (`>n`). `None` bounds are unbounded (`*`). When `operator` is set exactly
/// one bound is populated and its inclusivity follows the operator.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct RangeNode {
    /// Populated when a transformation builds a standalone ranged node; the
    /// parser wraps `field:[…]` in a [`FieldQueryNode`].
    pub field: Option<QueryText>,
    pub min: Option<QueryText>,
    pub max: Option<QueryText>,
    pub min_inclusive: bool,
    pub max_inclusive: bool,
    pub operator: Option<RangeOperator>,
}

/// The body of a `field:(t1 t2 t3)` expansion.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct MultiTermNode {
    pub terms: Vec<Node<TermNode>>,
}

/// `_exists_:field`.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct ExistsNode {
    pub field: QueryText,
}

/// `_missing_:field`.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct MissingNode {
    pub field: QueryText,
}

/// `*:*`, matching every document.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash)]
pub struct MatchAllNode;

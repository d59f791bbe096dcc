use crate::context::VisitorContext;
use crate::validation::ValidationError;
use lucene_parser::ast::{
    BooleanQueryNode, ExistsNode, FieldQueryNode, GroupNode, MatchAllNode, MissingNode,
    MultiTermNode, NotNode, PhraseNode, QueryDocument, QueryNode, RangeNode, RegexNode, TermNode,
};
use lucene_parser::Node;

/// Error surfaced out of a traversal.
///
/// Resolver callback failures do not end up here — they are converted to
/// validation messages at the visitor boundary. A traversal only errors when
/// it is cancelled or when a throwing validator rejects the document.
#[derive(Debug, thiserror::Error)]
pub enum VisitError {
    /// The traversal's cancellation token was triggered.
    #[error("traversal was cancelled")]
    Cancelled,
    /// A validator with `should_throw` rejected the document.
    #[error(transparent)]
    Validation(#[from] ValidationError),
}

/// A bundle of per-variant handlers over the query tree.
///
/// Each handler receives the node and the traversal context, and returns an
/// optional replacement. A handler may:
///
/// - mutate the node in place (via [`Node::make_mut`]) and return `Ok(None)`,
/// - return `Ok(Some(node))` to substitute a different node — of any
///   variant — into the parent's slot,
/// - call the matching [`walk`] function to run the default child traversal
///   before or after its own work.
///
/// Default handlers walk children and replace nothing.
#[allow(unused_variables)]
pub trait Visitor {
    /// Entry point: visit a whole document.
    fn visit_document(
        &mut self,
        document: &mut QueryDocument,
        ctx: &mut VisitorContext,
    ) -> Result<(), VisitError> {
        walk::walk_document(self, document, ctx)
    }

    fn visit_group(
        &mut self,
        group: &mut Node<GroupNode>,
        ctx: &mut VisitorContext,
    ) -> Result<Option<QueryNode>, VisitError> {
        walk::walk_group(self, group, ctx)?;
        Ok(None)
    }

    fn visit_boolean(
        &mut self,
        boolean: &mut Node<BooleanQueryNode>,
        ctx: &mut VisitorContext,
    ) -> Result<Option<QueryNode>, VisitError> {
        walk::walk_boolean(self, boolean, ctx)?;
        Ok(None)
    }

    fn visit_not(
        &mut self,
        not: &mut Node<NotNode>,
        ctx: &mut VisitorContext,
    ) -> Result<Option<QueryNode>, VisitError> {
        walk::walk_not(self, not, ctx)?;
        Ok(None)
    }

    fn visit_field(
        &mut self,
        field: &mut Node<FieldQueryNode>,
        ctx: &mut VisitorContext,
    ) -> Result<Option<QueryNode>, VisitError> {
        walk::walk_field(self, field, ctx)?;
        Ok(None)
    }

    fn visit_term(
        &mut self,
        term: &mut Node<TermNode>,
        ctx: &mut VisitorContext,
    ) -> Result<Option<QueryNode>, VisitError> {
        Ok(None)
    }

    fn visit_phrase(
        &mut self,
        phrase: &mut Node<PhraseNode>,
        ctx: &mut VisitorContext,
    ) -> Result<Option<QueryNode>, VisitError> {
        Ok(None)
    }

    fn visit_regex(
        &mut self,
        regex: &mut Node<RegexNode>,
        ctx: &mut VisitorContext,
    ) -> Result<Option<QueryNode>, VisitError> {
        Ok(None)
    }

    fn visit_range(
        &mut self,
        range: &mut Node<RangeNode>,
        ctx: &mut VisitorContext,
    ) -> Result<Option<QueryNode>, VisitError> {
        Ok(None)
    }

    fn visit_multi_term(
        &mut self,
        multi_term: &mut Node<MultiTermNode>,
        ctx: &mut VisitorContext,
    ) -> Result<Option<QueryNode>, VisitError> {
        walk::walk_multi_term(self, multi_term, ctx)?;
        Ok(None)
    }

    fn visit_exists(
        &mut self,
        exists: &mut Node<ExistsNode>,
        ctx: &mut VisitorContext,
    ) -> Result<Option<QueryNode>, VisitError> {
        Ok(None)
    }

    fn visit_missing(
        &mut self,
        missing: &mut Node<MissingNode>,
        ctx: &mut VisitorContext,
    ) -> Result<Option<QueryNode>, VisitError> {
        Ok(None)
    }

    fn visit_match_all(
        &mut self,
        match_all: &mut Node<MatchAllNode>,
        ctx: &mut VisitorContext,
    ) -> Result<Option<QueryNode>, VisitError> {
        Ok(None)
    }
}

/// The default traversal, exposed as free functions so handler overrides can
/// run it before or after their own logic.
pub mod walk {
    use super::*;

    pub fn walk_document<V: Visitor + ?Sized>(
        visitor: &mut V,
        document: &mut QueryDocument,
        ctx: &mut VisitorContext,
    ) -> Result<(), VisitError> {
        if let Some(query) = document.query.as_mut() {
            walk_node(visitor, query, ctx)?;
        }
        Ok(())
    }

    /// Dispatch on the node variant and re-link any replacement the handler
    /// returns into `node`'s slot.
    pub fn walk_node<V: Visitor + ?Sized>(
        visitor: &mut V,
        node: &mut QueryNode,
        ctx: &mut VisitorContext,
    ) -> Result<(), VisitError> {
        let replacement = match node {
            QueryNode::Group(group) => visitor.visit_group(group, ctx)?,
            QueryNode::Boolean(boolean) => visitor.visit_boolean(boolean, ctx)?,
            QueryNode::Not(not) => visitor.visit_not(not, ctx)?,
            QueryNode::Field(field) => visitor.visit_field(field, ctx)?,
            QueryNode::Term(term) => visitor.visit_term(term, ctx)?,
            QueryNode::Phrase(phrase) => visitor.visit_phrase(phrase, ctx)?,
            QueryNode::Regex(regex) => visitor.visit_regex(regex, ctx)?,
            QueryNode::Range(range) => visitor.visit_range(range, ctx)?,
            QueryNode::MultiTerm(multi_term) => visitor.visit_multi_term(multi_term, ctx)?,
            QueryNode::Exists(exists) => visitor.visit_exists(exists, ctx)?,
            QueryNode::Missing(missing) => visitor.visit_missing(missing, ctx)?,
            QueryNode::MatchAll(match_all) => visitor.visit_match_all(match_all, ctx)?,
        };
        if let Some(replacement) = replacement {
            *node = replacement;
        }
        Ok(())
    }

    pub fn walk_group<V: Visitor + ?Sized>(
        visitor: &mut V,
        group: &mut Node<GroupNode>,
        ctx: &mut VisitorContext,
    ) -> Result<(), VisitError> {
        if let Some(query) = group.make_mut().query.as_mut() {
            walk_node(visitor, query, ctx)?;
        }
        Ok(())
    }

    pub fn walk_boolean<V: Visitor + ?Sized>(
        visitor: &mut V,
        boolean: &mut Node<BooleanQueryNode>,
        ctx: &mut VisitorContext,
    ) -> Result<(), VisitError> {
        let inner = boolean.make_mut();
        walk_node(visitor, &mut inner.left, ctx)?;
        walk_node(visitor, &mut inner.right, ctx)
    }

    pub fn walk_not<V: Visitor + ?Sized>(
        visitor: &mut V,
        not: &mut Node<NotNode>,
        ctx: &mut VisitorContext,
    ) -> Result<(), VisitError> {
        walk_node(visitor, &mut not.make_mut().query, ctx)
    }

    pub fn walk_field<V: Visitor + ?Sized>(
        visitor: &mut V,
        field: &mut Node<FieldQueryNode>,
        ctx: &mut VisitorContext,
    ) -> Result<(), VisitError> {
        walk_node(visitor, &mut field.make_mut().query, ctx)
    }

    /// Multi-term bodies hold bare terms; a term handler may substitute
    /// another term, other replacements are ignored.
    pub fn walk_multi_term<V: Visitor + ?Sized>(
        visitor: &mut V,
        multi_term: &mut Node<MultiTermNode>,
        ctx: &mut VisitorContext,
    ) -> Result<(), VisitError> {
        for term in multi_term.make_mut().terms.iter_mut() {
            if let Some(QueryNode::Term(replacement)) = visitor.visit_term(term, ctx)? {
                *term = replacement;
            }
        }
        Ok(())
    }
}

use crate::context::VisitorContext;
use crate::visitor::{VisitError, Visitor};
use lucene_parser::ast::QueryDocument;

pub use lucene_parser::ast::{to_query_string, QueryStringBuilder};

/// The builder as a chainable visitor: each `visit_document` replaces the
/// accumulated output with the document's rendering, and the handlers never
/// mutate the tree. Chain it after transformation visitors to capture the
/// final query string alongside their context state.
impl Visitor for QueryStringBuilder {
    fn visit_document(
        &mut self,
        document: &mut QueryDocument,
        _ctx: &mut VisitorContext,
    ) -> Result<(), VisitError> {
        self.clear();
        self.append_document(document);
        Ok(())
    }
}

use crate::ast::QueryDocument;
use crate::parser::grammar::query;
use crate::parser::Parser;

/// ```txt
/// Document := OrExpr? EOF
/// ```
pub(crate) fn document(p: &mut Parser<'_>) -> QueryDocument {
    let mut query_node = if p.at_end() { None } else { query::or_expr(p) };

    // Recovery: report stray tokens and join any further expression to the
    // document with an implicit AND, so no input is silently dropped.
    while !p.at_end() {
        p.err_and_pop("unexpected token");
        if !p.at_end() {
            if let Some(next) = query::or_expr(p) {
                query_node = Some(match query_node {
                    Some(left) => query::implicit_and(left, next),
                    None => next,
                });
            }
        }
    }

    QueryDocument {
        source: p.source_text(),
        query: query_node,
    }
}

#[cfg(test)]
mod tests {
    use crate::ast::QueryNode;
    use crate::parser::parse;

    #[test]
    fn blank_input_parses_to_empty_document() {
        let result = parse("   ");
        assert!(result.is_success());
        assert!(result.document.query.is_none());
    }

    #[test]
    fn stray_closing_paren_is_reported_not_dropped() {
        let result = parse(") hello");
        assert!(!result.is_success());
        assert!(matches!(result.document.query, Some(QueryNode::Term(_))));
    }
}

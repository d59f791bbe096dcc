use crate::ast::{QueryNode, RangeNode, RangeOperator};
use crate::node::Node;
use crate::parser::grammar::atom;
use crate::parser::Parser;
use crate::text::{QueryText, SourceSpan};
use crate::TokenKind;

/// ```txt
/// Range := ('[' | '{') Bound 'TO' Bound (']' | '}')
/// ```
///
/// Mixed brackets are allowed; `[` / `]` are inclusive, `{` / `}` exclusive.
/// A malformed range terminates at the best guess and is flagged incomplete.
pub(crate) fn bracket_range(p: &mut Parser<'_>) -> Option<QueryNode> {
    let open = p.pop();
    let min_inclusive = open.kind() == TokenKind::LBracket;
    let mut incomplete = false;

    let min = match bound(p) {
        Some(bound) => bound,
        None => {
            p.err("expected a value or `*` in range");
            incomplete = true;
            None
        }
    };

    let has_to = p.eat(TokenKind::To).is_some();
    if !has_to && !incomplete {
        p.err("expected `TO` in range");
        incomplete = true;
    }

    let max = match bound(p) {
        Some(bound) => bound,
        None => {
            if has_to {
                p.err("expected a value or `*` after `TO`");
                incomplete = true;
            }
            None
        }
    };

    // drain anything else inside the brackets so no token goes unrecorded
    while !matches!(
        p.peek(),
        None | Some(TokenKind::RBracket | TokenKind::RBrace | TokenKind::Eof)
    ) {
        p.err_and_pop("unexpected token in range");
        incomplete = true;
    }

    let (max_inclusive, end) = match p.peek() {
        Some(TokenKind::RBracket) => (true, p.pop().end()),
        Some(TokenKind::RBrace) => (false, p.pop().end()),
        _ => {
            if !incomplete {
                p.err("expected closing `]` or `}`");
            }
            let best = max
                .as_ref()
                .or(min.as_ref())
                .and_then(|text| text.span())
                .map(|span| span.end())
                .unwrap_or_else(|| open.end());
            (true, best)
        }
    };

    let span = SourceSpan::new(open.index(), end - open.index());
    Some(QueryNode::Range(Node::new_parsed(
        RangeNode {
            field: None,
            min,
            max,
            min_inclusive,
            max_inclusive,
            operator: None,
        },
        span,
    )))
}

/// ```txt
/// ShortRange := ('>' | '>=' | '<' | '<=') Value
/// ```
pub(crate) fn short_range(p: &mut Parser<'_>) -> Option<QueryNode> {
    let op_token = p.pop();
    let operator = match op_token.kind() {
        TokenKind::Gt => RangeOperator::Gt,
        TokenKind::Ge => RangeOperator::Ge,
        TokenKind::Lt => RangeOperator::Lt,
        TokenKind::Le => RangeOperator::Le,
        _ => return None,
    };

    let value = match bound(p) {
        Some(Some(value)) => Some(value),
        Some(None) | None => {
            p.err("expected a value after the range operator");
            None
        }
    };

    let end = value
        .as_ref()
        .and_then(|text| text.span())
        .map(|span| span.end())
        .unwrap_or_else(|| op_token.end());
    let span = SourceSpan::new(op_token.index(), end - op_token.index());

    let inclusive = operator.is_inclusive();
    let (min, max, min_inclusive, max_inclusive) = match operator {
        RangeOperator::Gt | RangeOperator::Ge => (value, None, inclusive, false),
        RangeOperator::Lt | RangeOperator::Le => (None, value, false, inclusive),
    };

    Some(QueryNode::Range(Node::new_parsed(
        RangeNode {
            field: None,
            min,
            max,
            min_inclusive,
            max_inclusive,
            operator: Some(operator),
        },
        span,
    )))
}

/// A range bound: `*` for unbounded (`Some(None)`), a term or quoted value
/// (`Some(Some(text))`), or `None` when nothing bound-like is next.
fn bound(p: &mut Parser<'_>) -> Option<Option<QueryText>> {
    match p.peek() {
        Some(TokenKind::Star) => {
            p.pop();
            Some(None)
        }
        Some(TokenKind::Ident | TokenKind::Number) => {
            let token = p.pop();
            Some(Some(atom::date_fold(p, token)))
        }
        Some(TokenKind::Phrase) => {
            let token = p.pop();
            Some(Some(p.text_span(atom::phrase_inner_span(&token))))
        }
        Some(TokenKind::Minus) => {
            let minus = p.pop();
            let adjacent = matches!(p.peek(), Some(TokenKind::Ident | TokenKind::Number))
                && p.peek_token().map(|t| t.index()) == Some(minus.end());
            if adjacent {
                let value = p.pop();
                let span = SourceSpan::new(minus.index(), value.end() - minus.index());
                Some(Some(p.text_span(span)))
            } else {
                p.err("expected a value after `-`");
                Some(None)
            }
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use crate::ast::{QueryNode, RangeOperator};
    use crate::parser::parse;

    fn range_of(input: &str) -> crate::node::Node<crate::ast::RangeNode> {
        let result = parse(input);
        match result.document.query {
            Some(QueryNode::Field(field)) => match &field.query {
                QueryNode::Range(range) => range.clone(),
                other => panic!("expected a range, got {other:?}"),
            },
            Some(QueryNode::Range(range)) => range,
            other => panic!("expected a range, got {other:?}"),
        }
    }

    #[test]
    fn inclusive_range() {
        let range = range_of("price:[100 TO 500]");
        assert_eq!(range.min.as_ref().unwrap(), "100");
        assert_eq!(range.max.as_ref().unwrap(), "500");
        assert!(range.min_inclusive);
        assert!(range.max_inclusive);
        assert!(range.operator.is_none());
    }

    #[test]
    fn mixed_brackets() {
        let range = range_of("price:{100 TO 500]");
        assert!(!range.min_inclusive);
        assert!(range.max_inclusive);
    }

    #[test]
    fn unbounded_sides() {
        let range = range_of("price:[* TO 500}");
        assert!(range.min.is_none());
        assert_eq!(range.max.as_ref().unwrap(), "500");
        assert!(!range.max_inclusive);
    }

    #[test]
    fn short_form() {
        let range = range_of("price:>=100");
        assert_eq!(range.operator, Some(RangeOperator::Ge));
        assert_eq!(range.min.as_ref().unwrap(), "100");
        assert!(range.min_inclusive);
        assert!(range.max.is_none());
    }

    #[test]
    fn negative_bound() {
        let range = range_of("delta:[-10 TO 10]");
        assert_eq!(range.min.as_ref().unwrap(), "-10");
    }

    #[test]
    fn date_math_bounds() {
        let range = range_of("created:[now-7d TO now]");
        assert_eq!(range.min.as_ref().unwrap(), "now-7d");
        assert_eq!(range.max.as_ref().unwrap(), "now");
    }

    #[test]
    fn missing_to_is_recovered() {
        let result = parse("price:[100 500]");
        assert!(!result.is_success());
        let messages: Vec<_> = result.errors().map(|e| e.message().to_string()).collect();
        assert!(messages.iter().any(|m| m.contains("expected `TO`")));
    }

    #[test]
    fn unclosed_range_is_recovered() {
        let result = parse("price:[100 TO");
        assert!(!result.is_success());
        // the partial range is still in the tree
        let Some(QueryNode::Field(field)) = result.document.query else {
            panic!("expected a field query");
        };
        assert!(matches!(field.query, QueryNode::Range(_)));
    }
}

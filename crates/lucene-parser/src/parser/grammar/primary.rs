use crate::ast::{GroupNode, MatchAllNode, QueryNode};
use crate::node::Node;
use crate::parser::grammar::{atom, field, query, range};
use crate::parser::Parser;
use crate::text::SourceSpan;
use crate::TokenKind;

/// ```txt
/// PrimaryExpr := Group | FieldExpr | Range | Atom
/// ```
pub(crate) fn primary(p: &mut Parser<'_>) -> Option<QueryNode> {
    match p.peek()? {
        TokenKind::LParen => group(p),
        TokenKind::LBracket | TokenKind::LBrace => range::bracket_range(p),
        TokenKind::Gt | TokenKind::Ge | TokenKind::Lt | TokenKind::Le => range::short_range(p),
        TokenKind::Star
            if p.peek_n(2) == Some(TokenKind::Colon) && p.peek_n(3) == Some(TokenKind::Star) =>
        {
            let open = p.pop();
            p.pop();
            let close = p.pop();
            let span = SourceSpan::new(open.index(), close.end() - open.index());
            Some(QueryNode::MatchAll(Node::new_parsed(MatchAllNode, span)))
        }
        TokenKind::Ident | TokenKind::Number | TokenKind::Star | TokenKind::Question => {
            if p.peek_n(2) == Some(TokenKind::Colon) {
                field::field_expr(p)
            } else {
                atom::atom(p)
            }
        }
        TokenKind::Phrase | TokenKind::Regex => atom::atom(p),
        _ => None,
    }
}

/// ```txt
/// Group := '(' OrExpr? ')'
/// ```
pub(crate) fn group(p: &mut Parser<'_>) -> Option<QueryNode> {
    let open = p.pop();
    if !p.enter_recursion() {
        return None;
    }
    let inner = if p.at(TokenKind::RParen) {
        None
    } else {
        query::or_expr(p)
    };
    p.exit_recursion();

    let end = match p.eat(TokenKind::RParen) {
        Some(close) => close.end(),
        None => {
            p.err("expected closing `)`");
            inner
                .as_ref()
                .and_then(|q| q.span())
                .map(|span| span.end())
                .unwrap_or_else(|| open.end())
        }
    };

    let span = SourceSpan::new(open.index(), end - open.index());
    Some(QueryNode::Group(Node::new_parsed(
        GroupNode {
            field: None,
            query: inner,
            boost: None,
            prefix: None,
        },
        span,
    )))
}

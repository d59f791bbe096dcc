use crate::ast::{ExistsNode, FieldQueryNode, MissingNode, MultiTermNode, QueryNode, TermNode};
use crate::lexer::Token;
use crate::node::Node;
use crate::parser::grammar::{atom, primary, range};
use crate::parser::Parser;
use crate::text::SourceSpan;
use crate::TokenKind;

/// ```txt
/// FieldExpr := IDENT ':' (Group | Range | Atom | MultiTerm)
/// ```
///
/// `_exists_:f` and `_missing_:f` are recognized here; `@include:name` takes
/// the ordinary field path (`@` is an identifier character) and is expanded
/// later by the include visitor.
pub(crate) fn field_expr(p: &mut Parser<'_>) -> Option<QueryNode> {
    let field_token = p.pop();
    let colon = p.pop();

    if field_token.data() == "_exists_" || field_token.data() == "_missing_" {
        return special_field(p, &field_token, &colon);
    }

    let field = p.text(&field_token);

    let child = match p.peek() {
        Some(TokenKind::LParen) => {
            if multi_term_ahead(p) {
                multi_term(p)
            } else {
                primary::group(p)
            }
        }
        Some(TokenKind::LBracket | TokenKind::LBrace) => range::bracket_range(p),
        Some(TokenKind::Gt | TokenKind::Ge | TokenKind::Lt | TokenKind::Le) => {
            range::short_range(p)
        }
        Some(
            TokenKind::Ident
            | TokenKind::Number
            | TokenKind::Star
            | TokenKind::Question
            | TokenKind::Phrase
            | TokenKind::Regex,
        ) => atom::atom(p),
        Some(TokenKind::Minus) => atom::negative_term(p),
        _ => None,
    };

    let child = child.unwrap_or_else(|| {
        // missing value: keep the field, pair it with an empty term
        p.err("expected value after ':'");
        QueryNode::Term(Node::new_parsed(
            TermNode {
                term: p.empty_text_at(colon.end()),
                prefix: None,
                boost: None,
                fuzzy: None,
            },
            SourceSpan::new(colon.end(), 0),
        ))
    });

    let end = child
        .span()
        .map(|span| span.end())
        .unwrap_or_else(|| colon.end());
    let span = SourceSpan::new(field_token.index(), end - field_token.index());
    Some(QueryNode::Field(Node::new_parsed(
        FieldQueryNode {
            field,
            query: child,
            prefix: None,
            boost: None,
        },
        span,
    )))
}

fn special_field(
    p: &mut Parser<'_>,
    field_token: &Token<'_>,
    colon: &Token<'_>,
) -> Option<QueryNode> {
    let (field, end) = match p.peek() {
        Some(TokenKind::Ident | TokenKind::Number) => {
            let value = p.pop();
            (p.text(&value), value.end())
        }
        _ => {
            p.err("expected a field after ':'");
            (p.empty_text_at(colon.end()), colon.end())
        }
    };
    let span = SourceSpan::new(field_token.index(), end - field_token.index());
    Some(if field_token.data() == "_exists_" {
        QueryNode::Exists(Node::new_parsed(ExistsNode { field }, span))
    } else {
        QueryNode::Missing(Node::new_parsed(MissingNode { field }, span))
    })
}

/// Bounded lookahead deciding between `field:(t1 t2 t3)` (a multi-term) and
/// `field:(a OR b)` (a grouped subquery): a multi-term holds nothing but
/// bare terms up to the closing paren.
fn multi_term_ahead(p: &mut Parser<'_>) -> bool {
    let mut n = 2; // token 1 is the `(`
    let mut seen_term = false;
    loop {
        match p.peek_n(n) {
            Some(TokenKind::Ident | TokenKind::Number) => {
                seen_term = true;
                n += 1;
            }
            Some(TokenKind::RParen) => return seen_term,
            _ => return false,
        }
        if n > 64 {
            return false;
        }
    }
}

fn multi_term(p: &mut Parser<'_>) -> Option<QueryNode> {
    let open = p.pop();
    let mut terms = Vec::new();
    while matches!(p.peek(), Some(TokenKind::Ident | TokenKind::Number)) {
        let token = p.pop();
        let span = SourceSpan::new(token.index(), token.len());
        terms.push(Node::new_parsed(
            TermNode {
                term: p.text(&token),
                prefix: None,
                boost: None,
                fuzzy: None,
            },
            span,
        ));
    }
    let end = match p.eat(TokenKind::RParen) {
        Some(close) => close.end(),
        None => {
            p.err("expected closing `)`");
            terms
                .last()
                .and_then(|term| term.span())
                .map(|span| span.end())
                .unwrap_or_else(|| open.end())
        }
    };
    let span = SourceSpan::new(open.index(), end - open.index());
    Some(QueryNode::MultiTerm(Node::new_parsed(
        MultiTermNode { terms },
        span,
    )))
}

use crate::ast::{
    BooleanOperator, BooleanQueryNode, Fuzzy, GroupNode, NotNode, Prefix, QueryNode,
};
use crate::lexer::Token;
use crate::node::Node;
use crate::parser::grammar::primary;
use crate::parser::Parser;
use crate::text::SourceSpan;
use crate::TokenKind;

/// ```txt
/// OrExpr := AndExpr ((OR | '||') AndExpr)*
/// ```
pub(crate) fn or_expr(p: &mut Parser<'_>) -> Option<QueryNode> {
    let mut left = and_expr(p)?;
    while p.at(TokenKind::Or) || p.at(TokenKind::PipePipe) {
        p.pop();
        match and_expr(p) {
            Some(right) => left = boolean(left, right, BooleanOperator::Or, false),
            None => {
                p.err("expected a query after `OR`");
                break;
            }
        }
    }
    Some(left)
}

/// ```txt
/// AndExpr := UnaryExpr ((AND | <adjacency>) UnaryExpr)*
/// ```
///
/// Adjacent primaries separated only by whitespace conjoin with an implicit
/// AND, which binds exactly like the written keyword.
pub(crate) fn and_expr(p: &mut Parser<'_>) -> Option<QueryNode> {
    let mut left = unary_expr(p)?;
    loop {
        if p.at(TokenKind::And) {
            p.pop();
            match unary_expr(p) {
                Some(right) => left = boolean(left, right, BooleanOperator::And, false),
                None => {
                    p.err("expected a query after `AND`");
                    break;
                }
            }
        } else if starts_primary(p) {
            match unary_expr(p) {
                Some(right) => left = implicit_and(left, right),
                // the failed expression already reported and consumed
                None => break,
            }
        } else {
            break;
        }
    }
    Some(left)
}

/// ```txt
/// UnaryExpr := (NOT | '!' | '+' | '-')? PrimaryExpr Boost? Fuzzy?
/// ```
pub(crate) fn unary_expr(p: &mut Parser<'_>) -> Option<QueryNode> {
    if p.at(TokenKind::Not) || p.at(TokenKind::Bang) {
        let token = p.pop();
        if !p.enter_recursion() {
            return None;
        }
        let child = unary_expr(p);
        p.exit_recursion();
        return match child {
            Some(child) => {
                let span = prefixed_span(&token, &child);
                Some(QueryNode::Not(Node::new_parsed(NotNode { query: child }, span)))
            }
            None => {
                p.err("expected a query after `NOT`");
                None
            }
        };
    }

    if p.at(TokenKind::Plus) || p.at(TokenKind::Minus) {
        let token = p.pop();
        let prefix = if token.kind() == TokenKind::Plus {
            Prefix::Must
        } else {
            Prefix::MustNot
        };
        return match primary_with_suffixes(p) {
            Some(node) => Some(apply_prefix(node, prefix)),
            None => {
                p.err(if prefix == Prefix::Must {
                    "expected a query after `+`"
                } else {
                    "expected a query after `-`"
                });
                None
            }
        };
    }

    primary_with_suffixes(p)
}

fn primary_with_suffixes(p: &mut Parser<'_>) -> Option<QueryNode> {
    let mut node = primary::primary(p)?;
    loop {
        if p.at(TokenKind::Caret) {
            p.pop();
            match p.eat(TokenKind::Number) {
                Some(value) => {
                    if let Ok(boost) = value.data().parse::<f32>() {
                        node = apply_boost(node, boost);
                    }
                }
                None => p.err("expected a number after `^`"),
            }
        } else if p.at(TokenKind::Tilde) {
            let tilde = p.pop();
            // the slop value must directly follow the tilde
            let value = if p.at(TokenKind::Number)
                && p.peek_token().map(|t| t.index()) == Some(tilde.end())
            {
                Some(p.pop())
            } else {
                None
            };
            node = apply_fuzzy(p, node, value.as_ref());
        } else {
            break;
        }
    }
    Some(node)
}

fn starts_primary(p: &mut Parser<'_>) -> bool {
    matches!(
        p.peek(),
        Some(
            TokenKind::Ident
                | TokenKind::Number
                | TokenKind::Phrase
                | TokenKind::Regex
                | TokenKind::Star
                | TokenKind::Question
                | TokenKind::LParen
                | TokenKind::LBracket
                | TokenKind::LBrace
                | TokenKind::Gt
                | TokenKind::Ge
                | TokenKind::Lt
                | TokenKind::Le
                | TokenKind::Plus
                | TokenKind::Minus
                | TokenKind::Not
                | TokenKind::Bang
        )
    )
}

pub(crate) fn implicit_and(left: QueryNode, right: QueryNode) -> QueryNode {
    boolean(left, right, BooleanOperator::And, true)
}

fn boolean(
    left: QueryNode,
    right: QueryNode,
    operator: BooleanOperator,
    implicit: bool,
) -> QueryNode {
    let span = cover(left.span(), right.span());
    let inner = BooleanQueryNode {
        left,
        right,
        operator,
        implicit,
    };
    match span {
        Some(span) => QueryNode::Boolean(Node::new_parsed(inner, span)),
        None => QueryNode::Boolean(Node::new_synthetic(inner)),
    }
}

fn cover(a: Option<SourceSpan>, b: Option<SourceSpan>) -> Option<SourceSpan> {
    match (a, b) {
        (Some(a), Some(b)) => Some(a.cover(b)),
        (Some(a), None) => Some(a),
        (None, Some(b)) => Some(b),
        (None, None) => None,
    }
}

fn prefixed_span(token: &Token<'_>, child: &QueryNode) -> SourceSpan {
    let start = SourceSpan::new(token.index(), token.len());
    match child.span() {
        Some(span) => start.cover(span),
        None => start,
    }
}

/// Attach `+`/`-` to a node that carries a prefix; anything else is wrapped
/// in a prefixed group.
fn apply_prefix(node: QueryNode, prefix: Prefix) -> QueryNode {
    match node {
        QueryNode::Term(mut node) => {
            node.make_mut().prefix = Some(prefix);
            QueryNode::Term(node)
        }
        QueryNode::Phrase(mut node) => {
            node.make_mut().prefix = Some(prefix);
            QueryNode::Phrase(node)
        }
        QueryNode::Group(mut node) => {
            node.make_mut().prefix = Some(prefix);
            QueryNode::Group(node)
        }
        QueryNode::Field(mut node) => {
            node.make_mut().prefix = Some(prefix);
            QueryNode::Field(node)
        }
        other => {
            let span = other.span();
            let inner = GroupNode {
                field: None,
                query: Some(other),
                boost: None,
                prefix: Some(prefix),
            };
            match span {
                Some(span) => QueryNode::Group(Node::new_parsed(inner, span)),
                None => QueryNode::Group(Node::new_synthetic(inner)),
            }
        }
    }
}

fn apply_boost(node: QueryNode, boost: f32) -> QueryNode {
    let boost = Some(boost.into());
    match node {
        QueryNode::Term(mut node) => {
            node.make_mut().boost = boost;
            QueryNode::Term(node)
        }
        QueryNode::Phrase(mut node) => {
            node.make_mut().boost = boost;
            QueryNode::Phrase(node)
        }
        QueryNode::Group(mut node) => {
            node.make_mut().boost = boost;
            QueryNode::Group(node)
        }
        QueryNode::Field(mut node) => {
            node.make_mut().boost = boost;
            QueryNode::Field(node)
        }
        other => {
            let span = other.span();
            let inner = GroupNode {
                field: None,
                query: Some(other),
                boost,
                prefix: None,
            };
            match span {
                Some(span) => QueryNode::Group(Node::new_parsed(inner, span)),
                None => QueryNode::Group(Node::new_synthetic(inner)),
            }
        }
    }
}

/// Attach `~`/`~n` to the node it modifies: fuzzy slop on terms, proximity
/// on phrases. On a field query the modifier reaches through to the child.
fn apply_fuzzy(p: &mut Parser<'_>, node: QueryNode, value: Option<&Token<'_>>) -> QueryNode {
    match node {
        QueryNode::Term(mut node) => {
            let slop = value.and_then(|token| token.data().parse::<f32>().ok());
            node.make_mut().fuzzy = Some(Fuzzy {
                slop: slop.map(Into::into),
            });
            QueryNode::Term(node)
        }
        QueryNode::Phrase(mut node) => {
            match value {
                Some(token) => match token.data().parse::<u32>() {
                    Ok(proximity) => node.make_mut().proximity = Some(proximity),
                    Err(_) => p.err("proximity must be an integer"),
                },
                None => p.err("expected a proximity value after `~`"),
            }
            QueryNode::Phrase(node)
        }
        QueryNode::Field(mut node) => {
            let inner = node.make_mut();
            inner.query = apply_fuzzy(p, inner.query.clone(), value);
            QueryNode::Field(node)
        }
        other => {
            p.err("unexpected fuzzy modifier");
            other
        }
    }
}

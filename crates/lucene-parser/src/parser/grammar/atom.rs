use crate::ast::{PhraseNode, QueryNode, RegexNode, TermNode};
use crate::lexer::Token;
use crate::node::Node;
use crate::parser::Parser;
use crate::text::{QueryText, SourceSpan};
use crate::TokenKind;

/// ```txt
/// Atom := Phrase | Regex | Term
/// ```
pub(crate) fn atom(p: &mut Parser<'_>) -> Option<QueryNode> {
    match p.peek()? {
        TokenKind::Ident | TokenKind::Number | TokenKind::Star | TokenKind::Question => {
            let token = p.pop();
            let term = date_fold(p, token);
            let span = term.span().unwrap_or_else(|| SourceSpan::new(0, 0));
            Some(QueryNode::Term(Node::new_parsed(
                TermNode {
                    term,
                    prefix: None,
                    boost: None,
                    fuzzy: None,
                },
                span,
            )))
        }
        TokenKind::Phrase => {
            let token = p.pop();
            let inner = phrase_inner_span(&token);
            Some(QueryNode::Phrase(Node::new_parsed(
                PhraseNode {
                    phrase: p.text_span(inner),
                    proximity: None,
                    boost: None,
                    prefix: None,
                },
                SourceSpan::new(token.index(), token.len()),
            )))
        }
        TokenKind::Regex => {
            let token = p.pop();
            let inner = regex_inner_span(&token);
            Some(QueryNode::Regex(Node::new_parsed(
                RegexNode {
                    regex: p.text_span(inner),
                },
                SourceSpan::new(token.index(), token.len()),
            )))
        }
        _ => None,
    }
}

/// A `-` directly attached to a value, e.g. the `-5` in `price:-5` or
/// `[-10 TO 10]`. Returns `None` (after consuming the `-`) when nothing
/// foldable follows; the caller reports.
pub(crate) fn negative_term(p: &mut Parser<'_>) -> Option<QueryNode> {
    let minus = p.pop();
    let adjacent = matches!(p.peek(), Some(TokenKind::Ident | TokenKind::Number))
        && p.peek_token().map(|t| t.index()) == Some(minus.end());
    if !adjacent {
        return None;
    }
    let value = p.pop();
    let span = SourceSpan::new(minus.index(), value.end() - minus.index());
    Some(QueryNode::Term(Node::new_parsed(
        TermNode {
            term: p.text_span(span),
            prefix: None,
            boost: None,
            fuzzy: None,
        },
        span,
    )))
}

/// Fold a date-math expression split across tokens back into one term:
/// an anchor identifier, a directly adjacent `||`, and a directly adjacent
/// operations tail (`2024-01-01` + `||` + `+1M/d`).
pub(crate) fn date_fold<'input>(p: &mut Parser<'input>, first: Token<'input>) -> QueryText {
    let mut end = first.end();
    if p.at(TokenKind::PipePipe) && p.peek_token().map(|t| t.index()) == Some(end) {
        let pipes = p.pop();
        end = pipes.end();
        if p.at(TokenKind::Ident) && p.peek_token().map(|t| t.index()) == Some(end) {
            let tail = p.pop();
            end = tail.end();
        }
    }
    p.text_span(SourceSpan::new(first.index(), end - first.index()))
}

pub(crate) fn phrase_inner_span(token: &Token<'_>) -> SourceSpan {
    inner_span(token, '"')
}

pub(crate) fn regex_inner_span(token: &Token<'_>) -> SourceSpan {
    inner_span(token, '/')
}

// Strip the opening delimiter and, when the literal was terminated, the
// closing one. A trailing delimiter preceded by an odd number of
// backslashes is escaped content, not a terminator.
fn inner_span(token: &Token<'_>, delimiter: char) -> SourceSpan {
    let data = token.data();
    let terminated = data.len() >= 2 && data.ends_with(delimiter) && {
        let body = &data.as_bytes()[..data.len() - 1];
        body.iter().rev().take_while(|b| **b == b'\\').count() % 2 == 0
    };
    let len = if terminated {
        data.len() - 2
    } else {
        data.len() - 1
    };
    SourceSpan::new(token.index() + 1, len)
}

#[cfg(test)]
mod tests {
    use crate::ast::QueryNode;
    use crate::parser::parse;

    #[test]
    fn date_math_folds_into_one_term() {
        let result = parse("2024-01-01||+1M/d");
        assert!(result.is_success());
        match result.document.query {
            Some(QueryNode::Term(term)) => assert_eq!(term.term, "2024-01-01||+1M/d"),
            other => panic!("expected a term, got {other:?}"),
        }
    }

    #[test]
    fn phrase_content_excludes_quotes() {
        let result = parse("\"hello world\"");
        match result.document.query {
            Some(QueryNode::Phrase(phrase)) => assert_eq!(phrase.phrase, "hello world"),
            other => panic!("expected a phrase, got {other:?}"),
        }
    }

    #[test]
    fn unterminated_phrase_still_produces_a_node() {
        let result = parse("\"hello");
        assert!(!result.is_success());
        match result.document.query {
            Some(QueryNode::Phrase(phrase)) => assert_eq!(phrase.phrase, "hello"),
            other => panic!("expected a phrase, got {other:?}"),
        }
    }

    #[test]
    fn regex_content_excludes_slashes() {
        let result = parse("/lu.ene/");
        match result.document.query {
            Some(QueryNode::Regex(regex)) => assert_eq!(regex.regex, "lu.ene"),
            other => panic!("expected a regex, got {other:?}"),
        }
    }
}

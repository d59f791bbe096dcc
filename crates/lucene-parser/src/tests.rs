use crate::ast::*;
use crate::{parse, ErrorKind, Parser, SourceSpan};
use expect_test::expect;
use pretty_assertions::assert_eq;

fn query(input: &str) -> QueryNode {
    let result = parse(input);
    assert!(
        result.is_success(),
        "unexpected errors for {input:?}: {:?}",
        result.errors().collect::<Vec<_>>()
    );
    result.document.query.expect("expected a query")
}

#[test]
fn single_term() {
    match query("hello") {
        QueryNode::Term(term) => {
            assert_eq!(term.term, "hello");
            assert_eq!(term.prefix, None);
            assert_eq!(term.span(), Some(SourceSpan::new(0, 5)));
        }
        other => panic!("expected a term, got {other:?}"),
    }
}

#[test]
fn and_binds_tighter_than_or() {
    let QueryNode::Boolean(or) = query("a AND b OR c") else {
        panic!("expected a boolean");
    };
    assert_eq!(or.operator, BooleanOperator::Or);
    let QueryNode::Boolean(ref and) = or.left else {
        panic!("expected `a AND b` on the left, got {:?}", or.left);
    };
    assert_eq!(and.operator, BooleanOperator::And);
    assert!(!and.implicit);
}

#[test]
fn adjacent_primaries_conjoin_implicitly() {
    let QueryNode::Boolean(boolean) = query("a b") else {
        panic!("expected a boolean");
    };
    assert_eq!(boolean.operator, BooleanOperator::And);
    assert!(boolean.implicit);
}

#[test]
fn ampersand_and_pipe_synonyms() {
    assert_eq!(query("a && b"), query("a AND b"));
    assert_eq!(query("a || b"), query("a OR b"));
}

#[test]
fn prefixed_atoms() {
    let QueryNode::Boolean(boolean) = query("+req -excl") else {
        panic!("expected a boolean");
    };
    assert!(boolean.implicit);
    let QueryNode::Term(ref left) = boolean.left else {
        panic!("expected a term");
    };
    let QueryNode::Term(ref right) = boolean.right else {
        panic!("expected a term");
    };
    assert_eq!(left.prefix, Some(Prefix::Must));
    assert_eq!(right.prefix, Some(Prefix::MustNot));
}

#[test]
fn not_wraps_its_operand() {
    let QueryNode::Not(not) = query("NOT deleted:true") else {
        panic!("expected NOT");
    };
    assert!(matches!(not.query, QueryNode::Field(_)));
}

#[test]
fn bang_is_not() {
    assert_eq!(query("!deleted"), query("NOT deleted"));
}

#[test]
fn lowercase_keywords_are_terms() {
    let QueryNode::Boolean(boolean) = query("a and b") else {
        panic!("expected an implicit conjunction of three terms");
    };
    // `and` is just a term, so this is (a and) b with implicit operators
    assert!(boolean.implicit);
}

#[test]
fn field_with_term() {
    let QueryNode::Field(field) = query("title:hello") else {
        panic!("expected a field query");
    };
    assert_eq!(field.field, "title");
    let QueryNode::Term(ref term) = field.query else {
        panic!("expected a term child");
    };
    assert_eq!(term.term, "hello");
}

#[test]
fn field_with_phrase_and_proximity() {
    let QueryNode::Field(field) = query("title:\"hello world\"~3") else {
        panic!("expected a field query");
    };
    let QueryNode::Phrase(ref phrase) = field.query else {
        panic!("expected a phrase child");
    };
    assert_eq!(phrase.phrase, "hello world");
    assert_eq!(phrase.proximity, Some(3));
}

#[test]
fn boost_lands_on_the_field_query() {
    let QueryNode::Field(field) = query("title:hello^2.5") else {
        panic!("expected a field query");
    };
    assert_eq!(field.boost, Some(2.5.into()));
}

#[test]
fn fuzzy_term() {
    let QueryNode::Term(term) = query("roam~0.8") else {
        panic!("expected a term");
    };
    assert_eq!(term.fuzzy, Some(Fuzzy { slop: Some(0.8.into()) }));

    let QueryNode::Term(term) = query("roam~") else {
        panic!("expected a term");
    };
    assert_eq!(term.fuzzy, Some(Fuzzy { slop: None }));
}

#[test]
fn match_all() {
    assert!(matches!(query("*:*"), QueryNode::MatchAll(_)));
}

#[test]
fn include_reference_is_an_ordinary_field() {
    let QueryNode::Field(field) = query("@include:recent") else {
        panic!("expected a field query");
    };
    assert_eq!(field.field, "@include");
    let QueryNode::Term(ref term) = field.query else {
        panic!("expected a term child");
    };
    assert_eq!(term.term, "recent");
}

#[test]
fn escapes_are_kept_raw_and_unescaped_lazily() {
    let QueryNode::Term(term) = query(r"foo\:bar") else {
        panic!("expected a term");
    };
    assert_eq!(term.term, r"foo\:bar");
    assert_eq!(term.unescaped_term(), "foo:bar");
}

#[test]
fn grouped_subquery() {
    let QueryNode::Boolean(boolean) = query("(a OR b) AND c") else {
        panic!("expected a boolean");
    };
    assert_eq!(boolean.operator, BooleanOperator::And);
    let QueryNode::Group(ref group) = boolean.left else {
        panic!("expected a group on the left");
    };
    assert!(matches!(group.query, Some(QueryNode::Boolean(_))));
}

#[test]
fn complex_query_parses_cleanly() {
    // end-to-end shape check over a realistic query
    let node = query(
        "title:\"hello world\" AND (status:active OR status:pending) \
         AND price:[100 TO 500] AND NOT deleted:true",
    );
    let QueryNode::Boolean(outer) = node else {
        panic!("expected a boolean");
    };
    assert!(matches!(outer.right, QueryNode::Not(_)));
}

#[test]
fn missing_value_after_colon_keeps_the_field() {
    let result = parse("title:");
    assert!(!result.is_success());
    let errors = format!("{:?}", result.errors().collect::<Vec<_>>());
    expect![[r#"[EOF@6..6 "expected value after ':'"]"#]].assert_eq(&errors);

    let Some(QueryNode::Field(field)) = result.document.query else {
        panic!("expected a field query");
    };
    assert_eq!(field.field, "title");
    let QueryNode::Term(ref term) = field.query else {
        panic!("expected an empty term child");
    };
    assert_eq!(term.term, "");
}

#[test]
fn dangling_operator_keeps_the_left_side() {
    let result = parse("a AND");
    assert!(!result.is_success());
    assert!(matches!(result.document.query, Some(QueryNode::Term(_))));
    let errors = format!("{:?}", result.errors().collect::<Vec<_>>());
    expect![[r#"[EOF@5..5 "expected a query after `AND`"]"#]].assert_eq(&errors);
}

#[test]
fn unbalanced_paren_is_recovered() {
    let result = parse("(a AND b");
    assert!(!result.is_success());
    let Some(QueryNode::Group(group)) = result.document.query else {
        panic!("expected a group");
    };
    assert!(matches!(group.query, Some(QueryNode::Boolean(_))));
}

#[test]
fn invalid_token_between_primaries_becomes_implicit_and() {
    let result = parse("a # b");
    assert!(!result.is_success());
    let Some(QueryNode::Boolean(boolean)) = result.document.query else {
        panic!("expected a boolean");
    };
    assert!(boolean.implicit);
}

#[test]
fn two_parses_are_structurally_equal() {
    assert_eq!(
        parse("title:hello AND x:[1 TO 2]").document,
        parse("title:hello  AND  x:[1 TO 2]").document
    );
}

#[test]
fn offsets_are_monotone_in_depth_first_order() {
    let inputs = [
        "a AND b OR c",
        "title:\"hello world\" AND (status:active OR status:pending) AND price:[100 TO 500]",
        "+req -excl NOT deleted:true",
        "tags:(a b c) _exists_:x",
    ];
    for input in inputs {
        let result = parse(input);
        let mut offsets = Vec::new();
        if let Some(query) = &result.document.query {
            collect_offsets(query, &mut offsets);
        }
        let mut sorted = offsets.clone();
        sorted.sort_unstable();
        assert_eq!(offsets, sorted, "offsets out of order for {input:?}");
    }
}

fn collect_offsets(node: &QueryNode, out: &mut Vec<usize>) {
    if let Some(span) = node.span() {
        out.push(span.start());
    }
    match node {
        QueryNode::Group(group) => {
            if let Some(query) = &group.query {
                collect_offsets(query, out);
            }
        }
        QueryNode::Boolean(boolean) => {
            collect_offsets(&boolean.left, out);
            collect_offsets(&boolean.right, out);
        }
        QueryNode::Not(not) => collect_offsets(&not.query, out),
        QueryNode::Field(field) => collect_offsets(&field.query, out),
        QueryNode::MultiTerm(multi) => {
            for term in &multi.terms {
                if let Some(span) = term.span() {
                    out.push(span.start());
                }
            }
        }
        _ => {}
    }
}

#[test]
fn error_count_is_bounded_by_input_length() {
    let input = "###((([[[";
    let result = parse(input);
    assert!(result.errors().count() <= input.len());
}

#[test]
fn recursion_limit_is_enforced() {
    let deep = format!("{}a{}", "(".repeat(200), ")".repeat(200));
    let result = Parser::new(&deep).recursion_limit(10).parse();
    let mut errors = result.errors();
    assert!(errors.any(|e| e.kind() == ErrorKind::Limit));
    assert_eq!(result.recursion_budget().high_water(), 10);
}

#[test]
fn token_limit_is_enforced() {
    let result = Parser::new("a b c d e f g").token_limit(4).parse();
    assert!(result.errors().any(|e| e.kind() == ErrorKind::Limit));
    assert_eq!(result.token_budget().high_water(), 4);
}

#[test]
fn parser_never_panics_on_garbage() {
    for input in [")", "]", "}", ":", "^", "~", "AND", "OR OR", "a:b:c", "\\", "[{", "-", "+"] {
        let _ = parse(input);
    }
}

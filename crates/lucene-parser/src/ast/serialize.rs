use super::*;
use crate::escape::{escape_phrase, escape_term};
use std::fmt;

/// Renders a query tree back to query-string syntax.
///
/// Re-parsing the output yields a tree structurally equal to the input
/// (inter-token whitespace is normalized to single spaces). Text still
/// backed by a parsed view is emitted verbatim, byte for byte; synthetic
/// values written by transformations are re-escaped on the way out.
///
/// [`QueryDocument`] implements [`Display`][fmt::Display] by delegating
/// here, so `document.to_string()` renders with the default configuration.
///
/// ```rust
/// use lucene_parser::parse;
///
/// let document = parse("title:\"hello world\"   AND  price:[100 TO 500]").document;
/// assert_eq!(
///     document.to_string(),
///     "title:\"hello world\" AND price:[100 TO 500]"
/// );
/// ```
#[derive(Debug, Clone, Default)]
pub struct QueryStringBuilder {
    buffer: String,
}

impl QueryStringBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Render `document` to a query string.
    pub fn build(document: &QueryDocument) -> String {
        let mut builder = Self::new();
        builder.append_document(document);
        builder.buffer
    }

    /// The accumulated output.
    pub fn into_string(self) -> String {
        self.buffer
    }

    /// Discard the accumulated output.
    pub fn clear(&mut self) {
        self.buffer.clear();
    }

    /// Append `document`'s rendering to the accumulated output.
    pub fn append_document(&mut self, document: &QueryDocument) {
        if let Some(query) = &document.query {
            self.append_node(query);
        }
    }

    /// Append a single node's rendering (and its children's) to the
    /// accumulated output.
    pub fn append_node(&mut self, node: &QueryNode) {
        match node {
            QueryNode::Group(group) => self.append_group(group),
            QueryNode::Boolean(boolean) => self.append_boolean(boolean),
            QueryNode::Not(not) => self.append_not(not),
            QueryNode::Field(field) => self.append_field(field),
            QueryNode::Term(term) => self.append_term(term),
            QueryNode::Phrase(phrase) => self.append_phrase(phrase),
            QueryNode::Regex(regex) => self.append_regex(regex),
            QueryNode::Range(range) => self.append_range(range),
            QueryNode::MultiTerm(multi_term) => self.append_multi_term(multi_term),
            QueryNode::Exists(exists) => self.append_exists(exists),
            QueryNode::Missing(missing) => self.append_missing(missing),
            QueryNode::MatchAll(_) => self.buffer.push_str("*:*"),
        }
    }

    fn append_group(&mut self, group: &GroupNode) {
        if let Some(prefix) = group.prefix {
            self.buffer.push_str(prefix.as_str());
        }
        if let Some(field) = &group.field {
            self.append_text(field);
            self.buffer.push(':');
        }
        self.buffer.push('(');
        if let Some(query) = &group.query {
            self.append_node(query);
        }
        self.buffer.push(')');
        self.append_boost(group.boost);
    }

    fn append_boolean(&mut self, boolean: &BooleanQueryNode) {
        self.append_node(&boolean.left);
        if boolean.implicit {
            self.buffer.push(' ');
        } else {
            self.buffer.push(' ');
            self.buffer.push_str(boolean.operator.as_str());
            self.buffer.push(' ');
        }
        self.append_node(&boolean.right);
    }

    fn append_not(&mut self, not: &NotNode) {
        self.buffer.push_str("NOT ");
        self.append_node(&not.query);
    }

    fn append_field(&mut self, field: &FieldQueryNode) {
        if let Some(prefix) = field.prefix {
            self.buffer.push_str(prefix.as_str());
        }
        self.append_text(&field.field);
        self.buffer.push(':');
        self.append_node(&field.query);
        self.append_boost(field.boost);
    }

    fn append_term(&mut self, term: &TermNode) {
        if let Some(prefix) = term.prefix {
            self.buffer.push_str(prefix.as_str());
        }
        if term.term.is_synthetic() {
            self.buffer.push_str(&escape_term(term.term.as_str()));
        } else {
            self.buffer.push_str(term.term.as_str());
        }
        self.append_boost(term.boost);
        if let Some(fuzzy) = term.fuzzy {
            self.buffer.push('~');
            if let Some(slop) = fuzzy.slop {
                self.buffer.push_str(&slop.to_string());
            }
        }
    }

    fn append_phrase(&mut self, phrase: &PhraseNode) {
        if let Some(prefix) = phrase.prefix {
            self.buffer.push_str(prefix.as_str());
        }
        self.buffer.push('"');
        if phrase.phrase.is_synthetic() {
            self.buffer.push_str(&escape_phrase(phrase.phrase.as_str()));
        } else {
            self.buffer.push_str(phrase.phrase.as_str());
        }
        self.buffer.push('"');
        if let Some(proximity) = phrase.proximity {
            self.buffer.push('~');
            self.buffer.push_str(&proximity.to_string());
        }
        self.append_boost(phrase.boost);
    }

    fn append_regex(&mut self, regex: &RegexNode) {
        self.buffer.push('/');
        self.buffer.push_str(regex.regex.as_str());
        self.buffer.push('/');
    }

    fn append_range(&mut self, range: &RangeNode) {
        if let Some(field) = &range.field {
            self.append_text(field);
            self.buffer.push(':');
        }
        if let Some(operator) = range.operator {
            self.buffer.push_str(operator.as_str());
            if let Some(value) = range.min.as_ref().or(range.max.as_ref()) {
                self.append_text(value);
            }
            return;
        }
        self.buffer.push(if range.min_inclusive { '[' } else { '{' });
        match &range.min {
            Some(min) => self.append_text(min),
            None => self.buffer.push('*'),
        }
        self.buffer.push_str(" TO ");
        match &range.max {
            Some(max) => self.append_text(max),
            None => self.buffer.push('*'),
        }
        self.buffer.push(if range.max_inclusive { ']' } else { '}' });
    }

    fn append_multi_term(&mut self, multi_term: &MultiTermNode) {
        self.buffer.push('(');
        for (position, term) in multi_term.terms.iter().enumerate() {
            if position > 0 {
                self.buffer.push(' ');
            }
            self.append_term(term);
        }
        self.buffer.push(')');
    }

    fn append_exists(&mut self, exists: &ExistsNode) {
        self.buffer.push_str("_exists_:");
        self.append_text(&exists.field);
    }

    fn append_missing(&mut self, missing: &MissingNode) {
        self.buffer.push_str("_missing_:");
        self.append_text(&missing.field);
    }

    fn append_text(&mut self, text: &QueryText) {
        self.buffer.push_str(text.as_str());
    }

    fn append_boost(&mut self, boost: Option<Boost>) {
        if let Some(boost) = boost {
            self.buffer.push('^');
            self.buffer.push_str(&boost.to_string());
        }
    }
}

impl fmt::Display for QueryDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&QueryStringBuilder::build(self))
    }
}

/// Render `document` with a default [`QueryStringBuilder`].
pub fn to_query_string(document: &QueryDocument) -> String {
    QueryStringBuilder::build(document)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse;
    use expect_test::expect;

    fn round_trip(input: &str) -> String {
        QueryStringBuilder::build(&parse(input).document)
    }

    #[test]
    fn renders_structural_variety() {
        expect![[r#"title:hello"#]].assert_eq(&round_trip("title:hello"));
        expect![[r#"a AND b OR c"#]].assert_eq(&round_trip("a AND b OR c"));
        expect![[r#"a b"#]].assert_eq(&round_trip("a   b"));
        expect![[r#"+req -excl"#]].assert_eq(&round_trip("+req -excl"));
        expect![[r#"NOT deleted:true"#]].assert_eq(&round_trip("NOT   deleted:true"));
        expect![[r#"(a OR b) AND c"#]].assert_eq(&round_trip("( a OR b ) AND c"));
        expect![[r#"price:[100 TO 500]"#]].assert_eq(&round_trip("price:[ 100 TO 500 ]"));
        expect![[r#"price:{* TO 10}"#]].assert_eq(&round_trip("price:{* TO 10}"));
        expect![[r#"price:>=100"#]].assert_eq(&round_trip("price:>=100"));
        expect![[r#"name:/jo.n/"#]].assert_eq(&round_trip("name:/jo.n/"));
        expect![[r#"tags:(a b c)"#]].assert_eq(&round_trip("tags:( a b c )"));
        expect![[r#"_exists_:title"#]].assert_eq(&round_trip("_exists_:title"));
        expect![[r#"_missing_:title"#]].assert_eq(&round_trip("_missing_:title"));
        expect![[r#"*:*"#]].assert_eq(&round_trip("*:*"));
        expect![[r#"title:hello^2"#]].assert_eq(&round_trip("title:hello^2"));
        expect![[r#"roam~0.8"#]].assert_eq(&round_trip("roam~0.8"));
        expect![[r#""hello world"~3"#]].assert_eq(&round_trip("\"hello world\"~3"));
    }

    #[test]
    fn display_delegates_to_the_builder() {
        let document = parse("title:hello   AND x:[1 TO 2]").document;
        assert_eq!(document.to_string(), "title:hello AND x:[1 TO 2]");
        assert_eq!(document.to_string(), QueryStringBuilder::build(&document));
    }

    #[test]
    fn parsed_escapes_render_verbatim() {
        assert_eq!(round_trip(r"foo\:bar"), r"foo\:bar");
        assert_eq!(round_trip(r#""say \"hi\"""#), r#""say \"hi\"""#);
    }

    #[test]
    fn synthetic_terms_are_escaped() {
        let mut document = parse("placeholder").document;
        let Some(QueryNode::Term(ref mut term)) = document.query else {
            panic!("expected a term");
        };
        term.make_mut().set_term("a:b(c)");
        assert_eq!(QueryStringBuilder::build(&document), r"a\:b\(c\)");
    }

    #[test]
    fn round_trip_is_a_fixpoint() {
        let corpus = [
            "hello",
            "title:\"hello world\" AND (status:active OR status:pending) AND price:[100 TO 500] AND NOT deleted:true",
            "+req -excl",
            "a b c",
            "tags:(a b c)",
            "_exists_:x OR _missing_:y",
            "*:* AND name:/jo.n/",
            "price:>=100 AND price:<200",
            r"foo\:bar",
            "created:[now-7d TO now]",
            "title:hello^2 OR roam~0.8",
        ];
        for input in corpus {
            let first = parse(input);
            assert!(first.is_success(), "corpus entry failed to parse: {input:?}");
            let rendered = QueryStringBuilder::build(&first.document);
            let second = parse(&rendered);
            assert!(
                second.is_success(),
                "rendered output failed to parse: {rendered:?}"
            );
            assert_eq!(
                first.document, second.document,
                "round trip changed structure for {input:?} (rendered as {rendered:?})"
            );
        }
    }
}

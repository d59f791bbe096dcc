use crate::context::{IncludeResolver, VisitorContext};
use crate::visitor::{walk, VisitError, Visitor};
use lucene_parser::ast::{FieldQueryNode, GroupNode, QueryNode};
use lucene_parser::Node;
use std::fmt;

/// Hard cap on nested include expansion.
pub const MAX_INCLUDE_DEPTH: usize = 50;

const INCLUDE_FIELD: &str = "@include";

/// Expands `@include:name` references into the parsed body of another saved
/// query.
///
/// For every reference the visitor records the name, consults the skip
/// predicate, guards against cycles and the depth cap, resolves the name to
/// query text, parses it, recursively expands includes inside it, and
/// substitutes the result wrapped in a group so operator precedence at the
/// reference site is preserved. Failures never abort the traversal: the
/// reference is left unexpanded and a message or `unresolved_includes` entry
/// records why.
#[derive(Default)]
pub struct IncludeVisitor {
    resolver: Option<IncludeResolver>,
}

impl IncludeVisitor {
    /// A visitor that only uses the resolver from the context.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_resolver(resolver: IncludeResolver) -> Self {
        Self {
            resolver: Some(resolver),
        }
    }

    fn expand(
        &mut self,
        node: &Node<FieldQueryNode>,
        name: String,
        ctx: &mut VisitorContext,
    ) -> Result<Option<QueryNode>, VisitError> {
        ctx.validation_result_mut()
            .referenced_includes
            .insert(name.clone());

        ctx.ensure_not_cancelled()?;
        if let Some(skip) = ctx.skip_include() {
            if skip(&name) {
                return Ok(None);
            }
        }

        if ctx.include_stack().iter().any(|entry| entry == &name) {
            ctx.validation_result_mut()
                .add_message(format!("circular include of `{name}`"));
            return Ok(None);
        }

        if ctx.include_stack().len() >= MAX_INCLUDE_DEPTH {
            ctx.validation_result_mut().add_message(format!(
                "max include depth of {MAX_INCLUDE_DEPTH} exceeded at `{name}`"
            ));
            return Ok(None);
        }

        let resolver = match ctx.include_resolver().cloned().or_else(|| self.resolver.clone()) {
            Some(resolver) => resolver,
            None => {
                ctx.validation_result_mut()
                    .unresolved_includes
                    .insert(name);
                return Ok(None);
            }
        };

        let text = match resolver(&name) {
            Ok(Some(text)) => text,
            Ok(None) => {
                ctx.validation_result_mut()
                    .unresolved_includes
                    .insert(name);
                return Ok(None);
            }
            Err(err) => {
                ctx.validation_result_mut()
                    .add_message(format!("include resolver failed for `{name}`: {err}"));
                return Ok(None);
            }
        };

        let parsed = lucene_parser::parse(&text);
        if !parsed.is_success() {
            let detail = parsed
                .errors()
                .next()
                .map(|error| error.message().to_string())
                .unwrap_or_default();
            ctx.validation_result_mut()
                .add_message(format!("invalid query in include `{name}`: {detail}"));
            return Ok(None);
        }

        let Some(mut body) = parsed.document.query else {
            return Ok(None);
        };

        ctx.push_include(name);
        let walked = walk::walk_node(self, &mut body, ctx);
        ctx.pop_include();
        walked?;

        // keep the reference site's modifiers on the wrapping group
        Ok(Some(QueryNode::Group(Node::new_synthetic(GroupNode {
            field: None,
            query: Some(body),
            boost: node.boost,
            prefix: node.prefix,
        }))))
    }
}

impl Visitor for IncludeVisitor {
    fn visit_field(
        &mut self,
        field: &mut Node<FieldQueryNode>,
        ctx: &mut VisitorContext,
    ) -> Result<Option<QueryNode>, VisitError> {
        if !field.field.as_str().eq_ignore_ascii_case(INCLUDE_FIELD) {
            walk::walk_field(self, field, ctx)?;
            return Ok(None);
        }

        let name = match &field.query {
            QueryNode::Term(term) => term.unescaped_term().into_owned(),
            QueryNode::Phrase(phrase) => phrase.text().into_owned(),
            _ => {
                ctx.validation_result_mut()
                    .add_message("invalid include reference".to_string());
                return Ok(None);
            }
        };

        self.expand(&field.clone(), name, ctx)
    }
}

impl fmt::Debug for IncludeVisitor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IncludeVisitor")
            .field("has_resolver", &self.resolver.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lucene_parser::parse;
    use std::collections::HashMap;
    use std::sync::Arc;

    fn saved(entries: &[(&str, &str)]) -> IncludeResolver {
        let map: HashMap<String, String> = entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Arc::new(move |name| Ok(map.get(name).cloned()))
    }

    fn expand(input: &str, resolver: IncludeResolver) -> (Option<QueryNode>, VisitorContext) {
        let mut document = parse(input).document;
        let mut ctx = VisitorContext::new();
        let mut visitor = IncludeVisitor::with_resolver(resolver);
        visitor.visit_document(&mut document, &mut ctx).unwrap();
        (document.query, ctx)
    }

    #[test]
    fn expands_a_reference_into_a_group() {
        let (query, ctx) = expand(
            "@include:recent AND user:1",
            saved(&[("recent", "created:[now-7d TO now]")]),
        );
        assert!(ctx.validation_result().referenced_includes.contains("recent"));
        let Some(QueryNode::Boolean(boolean)) = query else {
            panic!("expected a boolean");
        };
        let QueryNode::Group(ref group) = boolean.left else {
            panic!("expected the include site to become a group, got {:?}", boolean.left);
        };
        assert!(matches!(group.query, Some(QueryNode::Field(_))));
    }

    #[test]
    fn nested_includes_expand() {
        let (query, _) = expand(
            "@include:outer",
            saved(&[("outer", "@include:inner AND a"), ("inner", "b")]),
        );
        let Some(QueryNode::Group(outer)) = query else {
            panic!("expected a group");
        };
        let Some(QueryNode::Boolean(ref boolean)) = outer.query else {
            panic!("expected a boolean inside the outer include");
        };
        assert!(matches!(boolean.left, QueryNode::Group(_)));
    }

    #[test]
    fn cycles_are_detected_and_terminate() {
        let (query, ctx) = expand(
            "@include:a",
            saved(&[("a", "@include:b"), ("b", "@include:a")]),
        );
        let messages = &ctx.validation_result().messages;
        assert!(messages.iter().any(|m| m.contains("circular include")));
        // the cyclic tail is left as an unexpanded reference
        assert!(query.is_some());
    }

    #[test]
    fn self_reference_is_a_cycle() {
        let (_, ctx) = expand("@include:me", saved(&[("me", "@include:me")]));
        assert!(ctx
            .validation_result()
            .messages
            .iter()
            .any(|m| m.contains("circular include of `me`")));
    }

    #[test]
    fn unknown_includes_are_recorded() {
        let (query, ctx) = expand("@include:nope", saved(&[]));
        assert!(ctx.validation_result().unresolved_includes.contains("nope"));
        assert!(matches!(query, Some(QueryNode::Field(_))));
    }

    #[test]
    fn depth_cap_stops_runaway_nesting() {
        let entries: Vec<(String, String)> = (0..60)
            .map(|i| (format!("q{i}"), format!("@include:q{}", i + 1)))
            .collect();
        let map: HashMap<String, String> = entries.into_iter().collect();
        let resolver: IncludeResolver = Arc::new(move |name| Ok(map.get(name).cloned()));
        let (_, ctx) = expand("@include:q0", resolver);
        assert!(ctx
            .validation_result()
            .messages
            .iter()
            .any(|m| m.contains("max include depth")));
    }

    #[test]
    fn skip_predicate_leaves_reference_untouched() {
        let mut document = parse("@include:recent").document;
        let mut ctx = VisitorContext::new();
        ctx.set_skip_include(Arc::new(|name| name == "recent"));
        let mut visitor = IncludeVisitor::with_resolver(saved(&[("recent", "a")]));
        visitor.visit_document(&mut document, &mut ctx).unwrap();
        assert!(matches!(document.query, Some(QueryNode::Field(_))));
        assert!(ctx.validation_result().referenced_includes.contains("recent"));
    }

    #[test]
    fn broken_include_text_is_reported() {
        let (query, ctx) = expand("@include:broken", saved(&[("broken", "title:")]));
        assert!(ctx
            .validation_result()
            .messages
            .iter()
            .any(|m| m.contains("invalid query in include `broken`")));
        assert!(matches!(query, Some(QueryNode::Field(_))));
    }

    #[test]
    fn include_site_prefix_is_preserved_on_the_group() {
        let (query, _) = expand("-@include:recent", saved(&[("recent", "a")]));
        let Some(QueryNode::Group(group)) = query else {
            panic!("expected a group, got something else");
        };
        assert_eq!(group.prefix, Some(lucene_parser::ast::Prefix::MustNot));
    }
}

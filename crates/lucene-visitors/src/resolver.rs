use crate::context::{FieldResolver, VisitorContext};
use crate::visitor::{walk, VisitError, Visitor};
use indexmap::IndexMap;
use lucene_parser::ast::{
    ExistsNode, FieldQueryNode, GroupNode, MissingNode, QueryNode, RangeNode,
};
use lucene_parser::{Node, QueryText};
use std::fmt;
use std::sync::Arc;

/// A case-insensitive alias-to-canonical-field mapping.
///
/// Converted to a resolver it applies hierarchically to dotted paths,
/// longest prefix first: with `a.b -> x.y`, the input `a.b.c` resolves to
/// `x.y.c`.
#[derive(Clone, Debug, Default)]
pub struct FieldMap {
    // keys stored lowercased
    entries: IndexMap<String, String>,
}

impl FieldMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, alias: impl AsRef<str>, field: impl Into<String>) -> &mut Self {
        self.entries
            .insert(alias.as_ref().to_ascii_lowercase(), field.into());
        self
    }

    /// Exact lookup, ignoring ASCII case.
    pub fn get(&self, alias: &str) -> Option<&str> {
        self.entries
            .get(&alias.to_ascii_lowercase())
            .map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate the configured mappings as `(alias, field)` pairs, in
    /// insertion order. Aliases are reported in their stored,
    /// ASCII-lowercased form.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> + '_ {
        self.entries
            .iter()
            .map(|(alias, field)| (alias.as_str(), field.as_str()))
    }

    /// Resolve `path`, trying the full name first and then successively
    /// shorter dotted prefixes, re-attaching the unmatched remainder.
    pub fn resolve(&self, path: &str) -> Option<String> {
        if let Some(field) = self.get(path) {
            return Some(field.to_string());
        }
        let mut prefix = path;
        while let Some(dot) = prefix.rfind('.') {
            prefix = &path[..dot];
            if let Some(field) = self.get(prefix) {
                return Some(format!("{field}{}", &path[dot..]));
            }
        }
        None
    }

    /// The map as a [`FieldResolver`] callback.
    pub fn into_resolver(self) -> FieldResolver {
        Arc::new(move |field| Ok(self.resolve(field)))
    }
}

impl<A: AsRef<str>, F: Into<String>> FromIterator<(A, F)> for FieldMap {
    fn from_iter<I: IntoIterator<Item = (A, F)>>(iter: I) -> Self {
        let mut map = FieldMap::new();
        for (alias, field) in iter {
            map.insert(alias, field);
        }
        map
    }
}

/// Rewrites field names on every node that carries one (`field:`, ranges,
/// `_exists_:`, `_missing_:`, fielded groups).
///
/// For each field the per-traversal resolver on the context runs first; if
/// it has no mapping the resolver captured at construction runs. A name
/// neither resolves is recorded in the result's `unresolved_fields` and left
/// unchanged. When the resolved name differs from the original, the original
/// is stashed on the context ([`VisitorContext::record_renamed_field`]) and
/// the node's field is overwritten. Resolver failures become validation
/// messages naming the field.
#[derive(Default)]
pub struct FieldResolverVisitor {
    resolver: Option<FieldResolver>,
}

impl FieldResolverVisitor {
    /// A visitor that only uses the resolver from the context.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_resolver(resolver: FieldResolver) -> Self {
        Self {
            resolver: Some(resolver),
        }
    }

    pub fn from_map(map: FieldMap) -> Self {
        Self::with_resolver(map.into_resolver())
    }

    fn resolve_field(
        &self,
        field: &mut QueryText,
        ctx: &mut VisitorContext,
    ) -> Result<(), VisitError> {
        let name = field.as_str().to_string();
        if name.is_empty() {
            return Ok(());
        }
        ctx.ensure_not_cancelled()?;

        let mut resolved = None;
        for resolver in [ctx.field_resolver().cloned(), self.resolver.clone()]
            .into_iter()
            .flatten()
        {
            match resolver(&name) {
                Ok(Some(mapping)) => {
                    resolved = Some(mapping);
                    break;
                }
                Ok(None) => {}
                Err(err) => {
                    ctx.validation_result_mut()
                        .add_message(format!("field resolver failed for `{name}`: {err}"));
                    return Ok(());
                }
            }
        }

        match resolved {
            Some(new_name) => {
                if new_name != name {
                    ctx.record_renamed_field(name, new_name.clone());
                    field.set(new_name);
                }
            }
            None => {
                ctx.validation_result_mut()
                    .unresolved_fields
                    .insert(name);
            }
        }
        Ok(())
    }
}

impl Visitor for FieldResolverVisitor {
    fn visit_group(
        &mut self,
        group: &mut Node<GroupNode>,
        ctx: &mut VisitorContext,
    ) -> Result<Option<QueryNode>, VisitError> {
        if group.field.is_some() {
            let inner = group.make_mut();
            if let Some(field) = inner.field.as_mut() {
                self.resolve_field(field, ctx)?;
            }
        }
        walk::walk_group(self, group, ctx)?;
        Ok(None)
    }

    fn visit_field(
        &mut self,
        field: &mut Node<FieldQueryNode>,
        ctx: &mut VisitorContext,
    ) -> Result<Option<QueryNode>, VisitError> {
        self.resolve_field(&mut field.make_mut().field, ctx)?;
        walk::walk_field(self, field, ctx)?;
        Ok(None)
    }

    fn visit_range(
        &mut self,
        range: &mut Node<RangeNode>,
        ctx: &mut VisitorContext,
    ) -> Result<Option<QueryNode>, VisitError> {
        if range.field.is_some() {
            let inner = range.make_mut();
            if let Some(field) = inner.field.as_mut() {
                self.resolve_field(field, ctx)?;
            }
        }
        Ok(None)
    }

    fn visit_exists(
        &mut self,
        exists: &mut Node<ExistsNode>,
        ctx: &mut VisitorContext,
    ) -> Result<Option<QueryNode>, VisitError> {
        self.resolve_field(&mut exists.make_mut().field, ctx)?;
        Ok(None)
    }

    fn visit_missing(
        &mut self,
        missing: &mut Node<MissingNode>,
        ctx: &mut VisitorContext,
    ) -> Result<Option<QueryNode>, VisitError> {
        self.resolve_field(&mut missing.make_mut().field, ctx)?;
        Ok(None)
    }
}

impl fmt::Debug for FieldResolverVisitor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldResolverVisitor")
            .field("has_resolver", &self.resolver.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lucene_parser::parse;
    use pretty_assertions::assert_eq;

    fn resolve(input: &str, map: FieldMap) -> (lucene_parser::ast::QueryDocument, VisitorContext) {
        let mut document = parse(input).document;
        let mut ctx = VisitorContext::new();
        let mut visitor = FieldResolverVisitor::from_map(map);
        visitor.visit_document(&mut document, &mut ctx).unwrap();
        (document, ctx)
    }

    #[test]
    fn rewrites_mapped_fields() {
        let map: FieldMap = [("title", "doc.title")].into_iter().collect();
        let (document, ctx) = resolve("title:hello", map);
        let Some(QueryNode::Field(field)) = document.query else {
            panic!("expected a field query");
        };
        assert_eq!(field.field, "doc.title");
        assert_eq!(ctx.original_field("doc.title"), Some("title"));
    }

    #[test]
    fn lookup_is_case_insensitive() {
        let map: FieldMap = [("Title", "doc.title")].into_iter().collect();
        let (document, _) = resolve("TITLE:hello", map);
        let Some(QueryNode::Field(field)) = document.query else {
            panic!("expected a field query");
        };
        assert_eq!(field.field, "doc.title");
    }

    #[test]
    fn iteration_preserves_insertion_order() {
        let mut map = FieldMap::new();
        map.insert("Title", "doc.title");
        map.insert("body", "doc.body");
        let entries: Vec<_> = map.iter().collect();
        assert_eq!(entries, vec![("title", "doc.title"), ("body", "doc.body")]);
    }

    #[test]
    fn hierarchical_prefix_resolution() {
        let mut map = FieldMap::new();
        map.insert("a.b", "x.y");
        assert_eq!(map.resolve("a.b.c").as_deref(), Some("x.y.c"));
        assert_eq!(map.resolve("a.b").as_deref(), Some("x.y"));
        assert_eq!(map.resolve("a.z"), None);
    }

    #[test]
    fn unresolved_fields_are_collected_and_left_alone() {
        let map: FieldMap = [("title", "doc.title")].into_iter().collect();
        let (document, ctx) = resolve("title:a AND status:b", map);
        assert!(ctx
            .validation_result()
            .unresolved_fields
            .contains("status"));
        let Some(QueryNode::Boolean(boolean)) = document.query else {
            panic!("expected a boolean");
        };
        let QueryNode::Field(ref right) = boolean.right else {
            panic!("expected a field query");
        };
        assert_eq!(right.field, "status");
    }

    #[test]
    fn context_resolver_wins_over_captured() {
        let mut document = parse("title:a").document;
        let mut ctx = VisitorContext::new();
        ctx.set_field_resolver(Arc::new(|_| Ok(Some("from.context".to_string()))));
        let captured: FieldMap = [("title", "from.captured")].into_iter().collect();
        let mut visitor = FieldResolverVisitor::from_map(captured);
        visitor.visit_document(&mut document, &mut ctx).unwrap();
        let Some(QueryNode::Field(field)) = document.query else {
            panic!("expected a field query");
        };
        assert_eq!(field.field, "from.context");
    }

    #[test]
    fn resolver_failure_becomes_a_validation_message() {
        let mut document = parse("title:a").document;
        let mut ctx = VisitorContext::new();
        ctx.set_field_resolver(Arc::new(|_| Err("backing store offline".into())));
        let mut visitor = FieldResolverVisitor::new();
        visitor.visit_document(&mut document, &mut ctx).unwrap();
        let messages = &ctx.validation_result().messages;
        assert_eq!(messages.len(), 1);
        assert!(messages[0].contains("title"));
        assert!(messages[0].contains("backing store offline"));
    }

    #[test]
    fn resolution_is_idempotent() {
        let map: FieldMap = [("title", "doc.title")].into_iter().collect();
        let (first, _) = resolve("title:a OR body:b", map.clone());
        let mut second = first.clone();
        let mut ctx = VisitorContext::new();
        let mut visitor = FieldResolverVisitor::from_map(map);
        visitor.visit_document(&mut second, &mut ctx).unwrap();
        assert_eq!(first, second);
    }
}

use crate::context::VisitorContext;
use crate::visitor::{walk, VisitError, Visitor};
use indexmap::{IndexMap, IndexSet};
use lucene_parser::ast::{
    BooleanQueryNode, ExistsNode, FieldQueryNode, GroupNode, MissingNode, NotNode, PhraseNode,
    QueryDocument, QueryNode, RangeNode, RegexNode, TermNode,
};
use lucene_parser::{Budget, Node};

/// Rules a query must satisfy.
///
/// Empty lists impose nothing. `allowed_max_node_depth` of zero means
/// unlimited depth.
#[derive(Debug, Clone)]
pub struct ValidationOptions {
    /// When non-empty, every referenced field must appear here.
    pub allowed_fields: Vec<String>,
    /// Fields that must not be referenced.
    pub restricted_fields: Vec<String>,
    /// When non-empty, every operation kind used must appear here.
    pub allowed_operations: Vec<String>,
    /// Operation kinds that must not be used.
    pub restricted_operations: Vec<String>,
    pub allow_leading_wildcards: bool,
    pub allowed_max_node_depth: usize,
    /// Surface a [`ValidationError`] out of the traversal instead of only
    /// recording messages on the result.
    pub should_throw: bool,
}

impl Default for ValidationOptions {
    fn default() -> Self {
        Self {
            allowed_fields: Vec::new(),
            restricted_fields: Vec::new(),
            allowed_operations: Vec::new(),
            restricted_operations: Vec::new(),
            allow_leading_wildcards: true,
            allowed_max_node_depth: 0,
            should_throw: false,
        }
    }
}

/// Everything collected about a document across a traversal: the fields and
/// includes it references, per-operation counts, nesting depth, and any
/// validation messages recorded by visitors.
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    /// Distinct fields literally written in the input, before resolution.
    pub referenced_fields: IndexSet<String>,
    /// Fields no resolver had a mapping for.
    pub unresolved_fields: IndexSet<String>,
    /// Include names seen during expansion.
    pub referenced_includes: IndexSet<String>,
    /// Include names no resolver had a query for.
    pub unresolved_includes: IndexSet<String>,
    /// Operation kind (`term`, `phrase`, `range`, `regex`, `field`, `not`,
    /// `exists`, `missing`) to number of occurrences.
    pub operations: IndexMap<String, usize>,
    /// High-water mark of group nesting.
    pub max_node_depth: usize,
    /// Validation failures, in the order they were found.
    pub messages: Vec<String>,
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn add_message(&mut self, message: impl Into<String>) {
        self.messages.push(message.into());
    }

    pub(crate) fn record_operation(&mut self, kind: &str) {
        *self.operations.entry(kind.to_string()).or_insert(0) += 1;
    }

    pub(crate) fn record_field(&mut self, field: &str) {
        if !field.is_empty() {
            self.referenced_fields.insert(field.to_string());
        }
    }
}

/// The error raised by a throwing validator.
#[derive(Debug, Clone, thiserror::Error)]
#[error("query validation failed: {}", .messages.join("; "))]
pub struct ValidationError {
    pub messages: Vec<String>,
}

/// Collects referenced fields, operation counts and nesting depth, then
/// applies the configured restrictions in a post-pass.
///
/// Options set on the context take precedence over the options the visitor
/// was constructed with.
#[derive(Debug, Clone)]
pub struct ValidationVisitor {
    options: ValidationOptions,
    depth: Budget,
}

impl ValidationVisitor {
    pub fn new(options: ValidationOptions) -> Self {
        Self {
            options,
            depth: Budget::unlimited(),
        }
    }

    fn post_pass(&self, ctx: &mut VisitorContext) {
        let options = &self.options;
        let result = ctx.validation_result_mut();
        result.max_node_depth = self.depth.high_water();

        let restricted: Vec<_> = result
            .referenced_fields
            .iter()
            .filter(|field| options.restricted_fields.contains(field))
            .cloned()
            .collect();
        if !restricted.is_empty() {
            result.add_message(format!(
                "restricted fields were referenced: {}",
                restricted.join(", ")
            ));
        }

        if !options.allowed_fields.is_empty() {
            let disallowed: Vec<_> = result
                .referenced_fields
                .iter()
                .filter(|field| !options.allowed_fields.contains(field))
                .cloned()
                .collect();
            if !disallowed.is_empty() {
                result.add_message(format!(
                    "fields are not allowed: {}",
                    disallowed.join(", ")
                ));
            }
        }

        let bad_operations: Vec<_> = result
            .operations
            .keys()
            .filter(|kind| {
                options.restricted_operations.contains(kind)
                    || (!options.allowed_operations.is_empty()
                        && !options.allowed_operations.contains(kind))
            })
            .cloned()
            .collect();
        if !bad_operations.is_empty() {
            result.add_message(format!(
                "operations are not allowed: {}",
                bad_operations.join(", ")
            ));
        }

        if options.allowed_max_node_depth > 0 && result.max_node_depth > options.allowed_max_node_depth
        {
            result.add_message(format!(
                "query exceeds maximum node depth of {}",
                options.allowed_max_node_depth
            ));
        }
    }
}

impl Visitor for ValidationVisitor {
    fn visit_document(
        &mut self,
        document: &mut QueryDocument,
        ctx: &mut VisitorContext,
    ) -> Result<(), VisitError> {
        if let Some(options) = ctx.validation_options() {
            self.options = options.clone();
        }
        self.depth = Budget::unlimited();

        walk::walk_document(self, document, ctx)?;
        self.post_pass(ctx);

        let result = ctx.validation_result();
        if self.options.should_throw && !result.is_valid() {
            return Err(VisitError::Validation(ValidationError {
                messages: result.messages.clone(),
            }));
        }
        Ok(())
    }

    fn visit_group(
        &mut self,
        group: &mut Node<GroupNode>,
        ctx: &mut VisitorContext,
    ) -> Result<Option<QueryNode>, VisitError> {
        if let Some(field) = &group.field {
            ctx.validation_result_mut().record_field(field.as_str());
        }
        self.depth.try_consume();
        let walked = walk::walk_group(self, group, ctx);
        self.depth.release();
        walked?;
        Ok(None)
    }

    fn visit_boolean(
        &mut self,
        boolean: &mut Node<BooleanQueryNode>,
        ctx: &mut VisitorContext,
    ) -> Result<Option<QueryNode>, VisitError> {
        walk::walk_boolean(self, boolean, ctx)?;
        Ok(None)
    }

    fn visit_not(
        &mut self,
        not: &mut Node<NotNode>,
        ctx: &mut VisitorContext,
    ) -> Result<Option<QueryNode>, VisitError> {
        ctx.validation_result_mut().record_operation("not");
        walk::walk_not(self, not, ctx)?;
        Ok(None)
    }

    fn visit_field(
        &mut self,
        field: &mut Node<FieldQueryNode>,
        ctx: &mut VisitorContext,
    ) -> Result<Option<QueryNode>, VisitError> {
        let result = ctx.validation_result_mut();
        result.record_field(field.field.as_str());
        result.record_operation("field");
        walk::walk_field(self, field, ctx)?;
        Ok(None)
    }

    fn visit_term(
        &mut self,
        term: &mut Node<TermNode>,
        ctx: &mut VisitorContext,
    ) -> Result<Option<QueryNode>, VisitError> {
        ctx.validation_result_mut().record_operation("term");
        if !self.options.allow_leading_wildcards && term.has_leading_wildcard() {
            ctx.validation_result_mut().add_message(format!(
                "leading wildcards are not allowed: `{}`",
                term.term.as_str()
            ));
        }
        Ok(None)
    }

    fn visit_phrase(
        &mut self,
        _phrase: &mut Node<PhraseNode>,
        ctx: &mut VisitorContext,
    ) -> Result<Option<QueryNode>, VisitError> {
        ctx.validation_result_mut().record_operation("phrase");
        Ok(None)
    }

    fn visit_regex(
        &mut self,
        _regex: &mut Node<RegexNode>,
        ctx: &mut VisitorContext,
    ) -> Result<Option<QueryNode>, VisitError> {
        ctx.validation_result_mut().record_operation("regex");
        Ok(None)
    }

    fn visit_range(
        &mut self,
        range: &mut Node<RangeNode>,
        ctx: &mut VisitorContext,
    ) -> Result<Option<QueryNode>, VisitError> {
        let result = ctx.validation_result_mut();
        if let Some(field) = &range.field {
            result.record_field(field.as_str());
        }
        result.record_operation("range");
        Ok(None)
    }

    fn visit_exists(
        &mut self,
        exists: &mut Node<ExistsNode>,
        ctx: &mut VisitorContext,
    ) -> Result<Option<QueryNode>, VisitError> {
        let result = ctx.validation_result_mut();
        result.record_field(exists.field.as_str());
        result.record_operation("exists");
        Ok(None)
    }

    fn visit_missing(
        &mut self,
        missing: &mut Node<MissingNode>,
        ctx: &mut VisitorContext,
    ) -> Result<Option<QueryNode>, VisitError> {
        let result = ctx.validation_result_mut();
        result.record_field(missing.field.as_str());
        result.record_operation("missing");
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lucene_parser::parse;

    fn validate(input: &str, options: ValidationOptions) -> (ValidationResult, bool) {
        let mut document = parse(input).document;
        let mut ctx = VisitorContext::new();
        let mut visitor = ValidationVisitor::new(options);
        let outcome = visitor.visit_document(&mut document, &mut ctx);
        (ctx.validation_result().clone(), outcome.is_ok())
    }

    #[test]
    fn collects_fields_and_operations() {
        let (result, _) = validate(
            "title:hello AND NOT status:active AND price:[1 TO 2]",
            ValidationOptions::default(),
        );
        let fields: Vec<_> = result.referenced_fields.iter().cloned().collect();
        assert_eq!(fields, vec!["title", "status", "price"]);
        assert_eq!(result.operations.get("field"), Some(&3));
        assert_eq!(result.operations.get("term"), Some(&2));
        assert_eq!(result.operations.get("range"), Some(&1));
        assert_eq!(result.operations.get("not"), Some(&1));
    }

    #[test]
    fn leading_wildcard_is_rejected_when_disallowed() {
        let options = ValidationOptions {
            allow_leading_wildcards: false,
            ..Default::default()
        };
        let (result, _) = validate("title:*hello", options);
        assert!(!result.is_valid());
        assert!(result.messages[0].contains("wildcard"));
    }

    #[test]
    fn leading_wildcard_is_fine_by_default() {
        let (result, _) = validate("title:*hello", ValidationOptions::default());
        assert!(result.is_valid());
    }

    #[test]
    fn allow_list_rejects_other_fields() {
        let options = ValidationOptions {
            allowed_fields: vec!["title".to_string()],
            ..Default::default()
        };
        let (result, _) = validate("title:hello AND status:active", options);
        assert!(!result.is_valid());
        assert!(result.messages[0].contains("status"));
        assert!(result.referenced_fields.contains("title"));
        assert!(result.referenced_fields.contains("status"));
    }

    #[test]
    fn restricted_operations_are_rejected() {
        let options = ValidationOptions {
            restricted_operations: vec!["regex".to_string()],
            ..Default::default()
        };
        let (result, _) = validate("name:/jo.n/", options);
        assert!(!result.is_valid());
        assert!(result.messages[0].contains("regex"));
    }

    #[test]
    fn depth_limit() {
        let options = ValidationOptions {
            allowed_max_node_depth: 2,
            ..Default::default()
        };
        let (result, _) = validate("(a AND (b OR (c AND d)))", options);
        assert_eq!(result.max_node_depth, 3);
        assert!(!result.is_valid());
    }

    #[test]
    fn should_throw_surfaces_an_error() {
        let options = ValidationOptions {
            restricted_fields: vec!["secret".to_string()],
            should_throw: true,
            ..Default::default()
        };
        let mut document = parse("secret:x").document;
        let mut ctx = VisitorContext::new();
        let mut visitor = ValidationVisitor::new(options);
        let outcome = visitor.visit_document(&mut document, &mut ctx);
        assert!(matches!(outcome, Err(VisitError::Validation(_))));
    }
}

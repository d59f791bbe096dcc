use crate::validation::{ValidationOptions, ValidationResult};
use crate::visitor::VisitError;
use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Error type for user-supplied resolver callbacks.
pub type ResolverError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Maps an input field name to an output field name. `Ok(None)` means the
/// resolver has no mapping for the name.
pub type FieldResolver = Arc<dyn Fn(&str) -> Result<Option<String>, ResolverError> + Send + Sync>;

/// Resolves an include name to the saved query text it stands for.
pub type IncludeResolver = Arc<dyn Fn(&str) -> Result<Option<String>, ResolverError> + Send + Sync>;

/// Predicate deciding whether an include reference should be left unexpanded.
pub type SkipInclude = Arc<dyn Fn(&str) -> bool + Send + Sync>;

/// A shared flag that cancels an in-flight traversal.
///
/// The parser and the traversal itself never suspend; cancellation is
/// observed at the resolver boundaries, where user callbacks may perform
/// I/O. Partial context state and partial tree mutations made before the
/// cancellation are retained.
#[derive(Clone, Debug, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }
}

/// State travelling with a traversal.
///
/// One context serves one traversal (or one [`ChainedVisitor`] run, whose
/// children share it in priority order); it is not meant for concurrent use.
/// Alongside the typed state — validation result and options, resolvers, the
/// include stack, the cancellation token — it carries a string-keyed map of
/// arbitrary values that visitors use to hand data to later visitors in the
/// same chain.
///
/// [`ChainedVisitor`]: crate::ChainedVisitor
#[derive(Default)]
pub struct VisitorContext {
    values: HashMap<String, Box<dyn Any>>,
    validation_result: ValidationResult,
    validation_options: Option<ValidationOptions>,
    field_resolver: Option<FieldResolver>,
    include_resolver: Option<IncludeResolver>,
    skip_include: Option<SkipInclude>,
    include_stack: Vec<String>,
    renamed_fields: Vec<(String, String)>,
    cancellation: CancellationToken,
}

impl VisitorContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store an arbitrary value under a string key for later visitors.
    pub fn set_value<T: Any>(&mut self, key: impl Into<String>, value: T) {
        self.values.insert(key.into(), Box::new(value));
    }

    /// Read back a value stored by an earlier visitor. `None` when the key is
    /// absent or holds a different type.
    pub fn get_value<T: Any>(&self, key: &str) -> Option<&T> {
        self.values.get(key)?.downcast_ref()
    }

    pub fn remove_value(&mut self, key: &str) -> bool {
        self.values.remove(key).is_some()
    }

    pub fn validation_result(&self) -> &ValidationResult {
        &self.validation_result
    }

    pub fn validation_result_mut(&mut self) -> &mut ValidationResult {
        &mut self.validation_result
    }

    pub fn validation_options(&self) -> Option<&ValidationOptions> {
        self.validation_options.as_ref()
    }

    pub fn set_validation_options(&mut self, options: ValidationOptions) {
        self.validation_options = Some(options);
    }

    /// The per-traversal field resolver, consulted before any resolver the
    /// visitor itself was constructed with.
    pub fn field_resolver(&self) -> Option<&FieldResolver> {
        self.field_resolver.as_ref()
    }

    pub fn set_field_resolver(&mut self, resolver: FieldResolver) {
        self.field_resolver = Some(resolver);
    }

    pub fn include_resolver(&self) -> Option<&IncludeResolver> {
        self.include_resolver.as_ref()
    }

    pub fn set_include_resolver(&mut self, resolver: IncludeResolver) {
        self.include_resolver = Some(resolver);
    }

    pub fn skip_include(&self) -> Option<&SkipInclude> {
        self.skip_include.as_ref()
    }

    pub fn set_skip_include(&mut self, predicate: SkipInclude) {
        self.skip_include = Some(predicate);
    }

    /// The names of includes currently being expanded, outermost first.
    pub fn include_stack(&self) -> &[String] {
        &self.include_stack
    }

    pub(crate) fn push_include(&mut self, name: String) {
        self.include_stack.push(name);
    }

    pub(crate) fn pop_include(&mut self) {
        self.include_stack.pop();
    }

    /// Record that the resolver renamed a field, keeping the original name
    /// out-of-band so later visitors can still see it.
    pub fn record_renamed_field(
        &mut self,
        original: impl Into<String>,
        resolved: impl Into<String>,
    ) {
        self.renamed_fields.push((original.into(), resolved.into()));
    }

    /// The original name a resolved field had in the input, if it was
    /// renamed during this traversal.
    pub fn original_field(&self, resolved: &str) -> Option<&str> {
        self.renamed_fields
            .iter()
            .find(|(_, new)| new == resolved)
            .map(|(original, _)| original.as_str())
    }

    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancellation
    }

    pub fn set_cancellation(&mut self, token: CancellationToken) {
        self.cancellation = token;
    }

    /// Bail out of the traversal if cancellation was requested. Called at
    /// each resolver boundary.
    pub fn ensure_not_cancelled(&self) -> Result<(), VisitError> {
        if self.cancellation.is_cancelled() {
            Err(VisitError::Cancelled)
        } else {
            Ok(())
        }
    }
}

impl fmt::Debug for VisitorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VisitorContext")
            .field("values", &self.values.keys().collect::<Vec<_>>())
            .field("validation_result", &self.validation_result)
            .field("include_stack", &self.include_stack)
            .field("renamed_fields", &self.renamed_fields)
            .field("cancelled", &self.cancellation.is_cancelled())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn values_round_trip_by_type() {
        let mut ctx = VisitorContext::new();
        ctx.set_value("count", 3_usize);
        assert_eq!(ctx.get_value::<usize>("count"), Some(&3));
        assert_eq!(ctx.get_value::<String>("count"), None);
        assert!(ctx.remove_value("count"));
        assert_eq!(ctx.get_value::<usize>("count"), None);
    }

    #[test]
    fn cancellation_is_observable() {
        let ctx = VisitorContext::new();
        assert!(ctx.ensure_not_cancelled().is_ok());
        ctx.cancellation().cancel();
        assert!(matches!(
            ctx.ensure_not_cancelled(),
            Err(VisitError::Cancelled)
        ));
    }

    #[test]
    fn renamed_fields_keep_originals() {
        let mut ctx = VisitorContext::new();
        ctx.record_renamed_field("alias", "canonical.name");
        assert_eq!(ctx.original_field("canonical.name"), Some("alias"));
        assert_eq!(ctx.original_field("other"), None);
    }
}

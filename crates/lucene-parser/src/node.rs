use crate::text::SourceSpan;
use std::fmt;
use std::hash;
use triomphe::Arc;

/// Smart pointer to a query node.
///
/// Thread-safe and reference-counted, and additionally carries the node's
/// optional source span so diagnostics and tooling can point back into the
/// original input. Mutation goes through [`make_mut`][Node::make_mut], which
/// provides copy-on-write semantics: visitors holding the only reference
/// mutate in place, shared nodes are cloned first.
///
/// Equality and hashing compare the wrapped node only; the span is ignored,
/// so a re-parsed rendering of a document compares structurally equal to the
/// original.
#[derive(Eq, PartialEq, Hash)]
pub struct Node<T>(Arc<NodeInner<T>>);

#[derive(Clone)]
struct NodeInner<T> {
    span: Option<SourceSpan>,
    node: T,
}

impl<T> Node<T> {
    /// Create a node for something parsed from the given span of the input.
    pub fn new_parsed(node: T, span: SourceSpan) -> Self {
        Self(Arc::new(NodeInner {
            span: Some(span),
            node,
        }))
    }

    /// Create a node built programmatically, not parsed from input.
    pub fn new_synthetic(node: T) -> Self {
        Self(Arc::new(NodeInner { span: None, node }))
    }

    /// Where this node came from in the original input, if parsed.
    pub fn span(&self) -> Option<SourceSpan> {
        self.0.span
    }

    /// Whether two `Node`s point to the same allocation.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    /// Mutable access to the node, cloning the allocation if it is shared.
    pub fn make_mut(&mut self) -> &mut T
    where
        T: Clone,
    {
        &mut Arc::make_mut(&mut self.0).node
    }

    /// Mutable access without cloning, if this `Node` is uniquely owned.
    pub fn get_mut(&mut self) -> Option<&mut T> {
        Arc::get_mut(&mut self.0).map(|inner| &mut inner.node)
    }
}

impl<T> std::ops::Deref for Node<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.0.node
    }
}

impl<T> AsRef<T> for Node<T> {
    fn as_ref(&self) -> &T {
        self
    }
}

impl<T> Clone for Node<T> {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

impl<T: fmt::Debug> fmt::Debug for Node<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(span) = self.span() {
            write!(f, "@{:?} ", span)?;
        }
        self.0.node.fmt(f)
    }
}

impl<T: Eq> Eq for NodeInner<T> {}

impl<T: PartialEq> PartialEq for NodeInner<T> {
    fn eq(&self, other: &Self) -> bool {
        self.node == other.node // span not included
    }
}

impl<T: hash::Hash> hash::Hash for NodeInner<T> {
    fn hash<H: hash::Hasher>(&self, state: &mut H) {
        self.node.hash(state) // span not included
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equality_ignores_span() {
        let parsed = Node::new_parsed(42, SourceSpan::new(3, 2));
        let synthetic = Node::new_synthetic(42);
        assert_eq!(parsed, synthetic);
    }

    #[test]
    fn make_mut_copies_on_write() {
        let mut a = Node::new_synthetic(vec![1, 2]);
        let b = a.clone();
        a.make_mut().push(3);
        assert_eq!(*a, vec![1, 2, 3]);
        assert_eq!(*b, vec![1, 2]);
    }
}

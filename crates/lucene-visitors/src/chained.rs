use crate::context::VisitorContext;
use crate::visitor::{VisitError, Visitor};
use lucene_parser::ast::QueryDocument;
use std::any::TypeId;
use std::fmt;

struct Entry {
    priority: i32,
    type_id: TypeId,
    name: &'static str,
    visitor: Box<dyn Visitor>,
}

/// A priority-ordered collection of visitors sharing one context.
///
/// Applying the chain runs each child visitor over the entire document in
/// ascending priority; children with equal priority run in insertion order.
/// Values written to the context by an earlier child are visible to later
/// ones.
///
/// Children are addressed by their concrete type for the positional
/// operations (`add_before`, `add_after`, `remove`, `replace`).
#[derive(Default)]
pub struct ChainedVisitor {
    entries: Vec<Entry>,
}

impl ChainedVisitor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `visitor` at `priority`, after any existing entry with the same
    /// or lower priority.
    pub fn add<V: Visitor + 'static>(&mut self, visitor: V, priority: i32) -> &mut Self {
        let at = self
            .entries
            .iter()
            .position(|entry| entry.priority > priority)
            .unwrap_or(self.entries.len());
        self.entries.insert(at, Self::entry(visitor, priority));
        self
    }

    /// Insert `visitor` directly before the child of type `T`, at the same
    /// priority. Returns false when no such child exists.
    pub fn add_before<T: 'static, V: Visitor + 'static>(&mut self, visitor: V) -> bool {
        match self.position_of::<T>() {
            Some(at) => {
                let priority = self.entries[at].priority;
                self.entries.insert(at, Self::entry(visitor, priority));
                true
            }
            None => false,
        }
    }

    /// Insert `visitor` directly after the child of type `T`, at the same
    /// priority. Returns false when no such child exists.
    pub fn add_after<T: 'static, V: Visitor + 'static>(&mut self, visitor: V) -> bool {
        match self.position_of::<T>() {
            Some(at) => {
                let priority = self.entries[at].priority;
                self.entries.insert(at + 1, Self::entry(visitor, priority));
                true
            }
            None => false,
        }
    }

    /// Remove the child of type `T`. Returns false when no such child exists.
    pub fn remove<T: 'static>(&mut self) -> bool {
        match self.position_of::<T>() {
            Some(at) => {
                self.entries.remove(at);
                true
            }
            None => false,
        }
    }

    /// Swap the child of type `T` for `visitor`, keeping its position and
    /// priority. Returns false when no such child exists.
    pub fn replace<T: 'static, V: Visitor + 'static>(&mut self, visitor: V) -> bool {
        match self.position_of::<T>() {
            Some(at) => {
                let priority = self.entries[at].priority;
                self.entries[at] = Self::entry(visitor, priority);
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn entry<V: Visitor + 'static>(visitor: V, priority: i32) -> Entry {
        Entry {
            priority,
            type_id: TypeId::of::<V>(),
            name: std::any::type_name::<V>(),
            visitor: Box::new(visitor),
        }
    }

    fn position_of<T: 'static>(&self) -> Option<usize> {
        let id = TypeId::of::<T>();
        self.entries.iter().position(|entry| entry.type_id == id)
    }
}

impl Visitor for ChainedVisitor {
    fn visit_document(
        &mut self,
        document: &mut QueryDocument,
        ctx: &mut VisitorContext,
    ) -> Result<(), VisitError> {
        for entry in self.entries.iter_mut() {
            entry.visitor.visit_document(document, ctx)?;
        }
        Ok(())
    }
}

impl fmt::Debug for ChainedVisitor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut list = f.debug_list();
        for entry in &self.entries {
            list.entry(&format_args!("{} @ {}", entry.name, entry.priority));
        }
        list.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lucene_parser::ast::TermNode;
    use lucene_parser::{parse, Node};

    struct Tag(&'static str);

    impl Visitor for Tag {
        fn visit_term(
            &mut self,
            term: &mut Node<TermNode>,
            _ctx: &mut VisitorContext,
        ) -> Result<Option<lucene_parser::ast::QueryNode>, VisitError> {
            let tagged = format!("{}{}", term.term.as_str(), self.0);
            term.make_mut().set_term(tagged);
            Ok(None)
        }
    }

    fn rendered_term(chain: &mut ChainedVisitor) -> String {
        let mut document = parse("x").document;
        let mut ctx = VisitorContext::new();
        chain.visit_document(&mut document, &mut ctx).unwrap();
        match document.query {
            Some(lucene_parser::ast::QueryNode::Term(term)) => term.term.as_str().to_string(),
            other => panic!("expected a term, got {other:?}"),
        }
    }

    struct A;
    struct B;
    impl Visitor for A {}
    impl Visitor for B {}

    #[test]
    fn children_run_in_priority_order() {
        let mut chain = ChainedVisitor::new();
        chain.add(Tag(".second"), 10);
        struct First;
        impl Visitor for First {
            fn visit_term(
                &mut self,
                term: &mut Node<TermNode>,
                _ctx: &mut VisitorContext,
            ) -> Result<Option<lucene_parser::ast::QueryNode>, VisitError> {
                let tagged = format!("{}.first", term.term.as_str());
                term.make_mut().set_term(tagged);
                Ok(None)
            }
        }
        chain.add(First, 1);
        assert_eq!(rendered_term(&mut chain), "x.first.second");
    }

    #[test]
    fn equal_priorities_preserve_insertion_order() {
        let mut chain = ChainedVisitor::new();
        chain.add(A, 5);
        chain.add(B, 5);
        assert_eq!(chain.len(), 2);
        assert!(chain.remove::<A>());
        assert!(chain.remove::<B>());
        assert!(!chain.remove::<B>());
    }

    #[test]
    fn positional_operations() {
        let mut chain = ChainedVisitor::new();
        chain.add(A, 5);
        assert!(chain.add_before::<A, _>(B));
        assert!(chain.remove::<B>());
        assert!(chain.add_after::<A, _>(B));
        assert!(chain.replace::<B, _>(Tag("!")));
        assert!(!chain.replace::<B, _>(A));
        assert_eq!(chain.len(), 2);
    }
}

//! Tree traversal: a mutating visitor that sees the message each node is
//! evaluated against, and a plain pre-order iterator.

use crate::condition::{Condition, Eval};

/// What a [`Visitor`] wants after seeing a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visit {
    Continue,
    Stop,
}

/// Callback for [`Condition::visit`].
///
/// `message` is the one the node would be verified against, so children
/// of a prefix node see the prefixed message.
pub trait Visitor {
    fn visit(&mut self, node: &mut Condition, message: &[u8]) -> Visit;
}

impl<F> Visitor for F
where
    F: FnMut(&mut Condition, &[u8]) -> Visit,
{
    fn visit(&mut self, node: &mut Condition, message: &[u8]) -> Visit {
        self(node, message)
    }
}

impl Condition {
    /// Walks the tree depth-first, parents before children.
    ///
    /// Returns `false` if the visitor stopped the walk early.
    pub fn visit<V>(&mut self, visitor: &mut V, message: &[u8]) -> bool
    where
        V: Visitor + ?Sized,
    {
        if visitor.visit(self, message) == Visit::Stop {
            return false;
        }
        match self {
            Self::Prefix(prefix) => {
                let prefixed = prefix.prefixed(message);
                prefix.subcondition.visit(visitor, &prefixed)
            }
            Self::Threshold(threshold) => threshold
                .subconditions
                .iter_mut()
                .all(|child| child.visit(visitor, message)),
            _ => true,
        }
    }

    /// Pre-order iterator over every node, the root included.
    pub fn iter(&self) -> Iter<'_> {
        Iter { stack: vec![self] }
    }

    pub fn count_evals(&self) -> usize {
        self.iter()
            .filter(|node| matches!(node, Self::Eval(_)))
            .count()
    }

    /// Runs `resolve` on every eval node and stores the answer in its
    /// `fulfilled` flag. Returns how many were marked fulfilled.
    pub fn resolve_evals<F>(&mut self, message: &[u8], mut resolve: F) -> usize
    where
        F: FnMut(&Eval, &[u8]) -> bool,
    {
        let mut fulfilled = 0;
        self.visit(
            &mut |node: &mut Condition, message: &[u8]| {
                if let Condition::Eval(eval) = node {
                    eval.fulfilled = resolve(eval, message);
                    fulfilled += usize::from(eval.fulfilled);
                }
                Visit::Continue
            },
            message,
        );
        fulfilled
    }
}

/// See [`Condition::iter`].
#[derive(Debug, Clone)]
pub struct Iter<'a> {
    stack: Vec<&'a Condition>,
}

impl<'a> Iterator for Iter<'a> {
    type Item = &'a Condition;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        self.stack.extend(node.children().iter().rev());
        Some(node)
    }
}

impl<'a> IntoIterator for &'a Condition {
    type Item = &'a Condition;
    type IntoIter = Iter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

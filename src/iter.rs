//! Unordered traversal of a queue's elements

use crate::element::{ElemRef, Element};
use std::iter::FusedIterator;
use std::marker::PhantomData;

/// Iterator over every element of a [`PriQueue`](crate::PriQueue)
///
/// Walks the root list and each tree depth-first. The order is unspecified
/// and says nothing about priority. Created by [`PriQueue::iter`](crate::PriQueue::iter).
pub struct Iter<'a, T> {
    next_root: Option<ElemRef<T>>,
    stack: Vec<ElemRef<T>>,
    remaining: usize,
    _queue: PhantomData<&'a Element<T>>,
}

impl<'a, T> Iter<'a, T> {
    pub(crate) fn new(head: Option<ElemRef<T>>, len: usize) -> Self {
        Iter {
            next_root: head,
            stack: Vec::new(),
            remaining: len,
            _queue: PhantomData,
        }
    }
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = ElemRef<T>;

    fn next(&mut self) -> Option<Self::Item> {
        let node = match self.stack.pop() {
            Some(node) => node,
            None => {
                let root = self.next_root.take()?;
                self.next_root = root.link.borrow().next.clone();
                root
            }
        };

        self.stack
            .extend(node.link.borrow().children.iter().rev().cloned());
        self.remaining = self.remaining.saturating_sub(1);
        Some(node)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<T> ExactSizeIterator for Iter<'_, T> {}

impl<T> FusedIterator for Iter<'_, T> {}

#[cfg(test)]
mod tests {
    use crate::{Element, PriQueue};
    use std::collections::HashSet;
    use std::rc::Rc;

    #[test]
    fn test_empty_queue_yields_nothing() {
        let queue: PriQueue<i32, _> = PriQueue::default();
        assert_eq!(queue.iter().count(), 0);
        assert!(queue.iter().next().is_none());
    }

    #[test]
    fn test_visits_each_element_once() {
        let mut queue = PriQueue::default();
        let elems: Vec<_> = (0..37).map(Element::new).collect();
        for e in &elems {
            queue.insert(e);
        }
        // Mix of consolidated trees and fresh roots
        queue.pop_min();
        for e in (100..105).map(Element::new) {
            queue.insert(&e);
        }

        let iter = queue.iter();
        assert_eq!(iter.len(), 41);

        let seen: HashSet<i32> = queue.iter().map(|e| e.get()).collect();
        assert_eq!(seen.len(), 41);
        assert!(!seen.contains(&0));
        for e in &elems[1..] {
            assert!(seen.contains(&*e.borrow()));
        }
    }

    #[test]
    fn test_into_iterator_for_reference() {
        let mut queue = PriQueue::default();
        let a = Element::new(1);
        queue.insert(&a);

        let mut count = 0;
        for e in &queue {
            assert!(Rc::ptr_eq(&e, &a));
            count += 1;
        }
        assert_eq!(count, 1);
    }
}

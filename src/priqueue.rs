//! Intrusive mergeable priority queue (lazy binomial heap)
//!
//! The queue links caller-owned [`Element`]s into a forest of binomial trees:
//! - O(1) insert, find-min and meld
//! - O(log n) amortized pop-min
//! - O(log n) remove and update of an arbitrary element, plus the root-list
//!   consolidation they trigger (amortized)
//!
//! # Algorithm Overview
//!
//! **Binomial Tree Bₖ**: B₀ is a single node; Bₖ is two B_{k-1} trees linked
//! so that the root with the smaller key keeps the other as its last child.
//! A Bₖ root has exactly k children, of orders 0, 1, ..., k-1, stored in
//! that order. A node's order is therefore also its index in its parent's
//! child list, which makes structural swaps O(1) to locate.
//!
//! **Lazy root list**: Unlike an eager binomial heap, roots are kept in an
//! unordered doubly-linked list and may repeat orders. Insert appends a B₀,
//! meld splices two lists. Only pop-min and remove pay for the laziness:
//! they consolidate the list (link equal orders like binary carry
//! propagation) so that at most one tree per order remains.
//!
//! **Re-keying**: The queue holds no copy of the key. After the caller
//! changes a record, [`PriQueue::update`] either moves the element up its
//! tree by swapping it structurally with its parent, or rebuilds the
//! element's own subtree in place (increase). Elements are never copied or
//! swapped by value: every record keeps its identity.
//!
//! **Ownership**: A queue owns a tag. Roots carry the tag of the queue they
//! belong to; meld forwards the consumed queue's tag to the survivor. An
//! element belongs to a queue iff the tag of its tree root resolves to that
//! queue's tag, which is how foreign elements are rejected.

use crate::element::{ElemRef, Element, QueueTag, WeakElem};
use crate::iter::Iter;
use crate::traits::{Comparator, NaturalOrder, QueueError, WithContext};
use smallvec::SmallVec;
use std::cmp::Ordering;
use std::fmt;
use std::mem;
use std::rc::{Rc, Weak};
use tracing::{debug, trace};

/// Intrusive mergeable priority queue
///
/// # Example
///
/// ```rust
/// use intrusive_priqueue::{Element, PriQueue};
///
/// let mut queue = PriQueue::new(|a: &i32, b: &i32| a.cmp(b));
/// let elems: Vec<_> = [5, 3, 8, 1, 9].into_iter().map(Element::new).collect();
/// for e in &elems {
///     queue.insert(e);
/// }
/// assert_eq!(*queue.get_min().unwrap().borrow(), 1);
///
/// queue.remove(&elems[2]);
/// let popped: Vec<i32> = std::iter::from_fn(|| queue.pop_min())
///     .map(|e| e.get())
///     .collect();
/// assert_eq!(popped, vec![1, 3, 5, 9]);
/// ```
pub struct PriQueue<T, C> {
    /// First root in the root list
    pub(crate) head: Option<ElemRef<T>>,
    /// Last root in the root list
    tail: WeakElem<T>,
    /// A minimal root
    min: WeakElem<T>,
    /// Number of attached elements
    len: usize,
    cmp: C,
    tag: Rc<QueueTag>,
}

impl<T: Ord> Default for PriQueue<T, NaturalOrder> {
    fn default() -> Self {
        Self::new(NaturalOrder)
    }
}

impl<T, X, F> PriQueue<T, WithContext<X, F>>
where
    X: PartialEq,
    F: Fn(&X, &T, &T) -> Ordering,
{
    /// Creates an empty queue ordered by `func`, which receives `context`
    /// unmodified on every call
    pub fn with_context(context: X, func: F) -> Self {
        Self::new(WithContext::new(context, func))
    }
}

impl<T, C: Comparator<T>> PriQueue<T, C> {
    /// Creates an empty queue ordered by `cmp`
    pub fn new(cmp: C) -> Self {
        PriQueue {
            head: None,
            tail: Weak::new(),
            min: Weak::new(),
            len: 0,
            cmp,
            tag: QueueTag::new(),
        }
    }

    /// Returns the comparator
    pub fn comparator(&self) -> &C {
        &self.cmp
    }

    /// Inserts an unattached element
    ///
    /// **Time Complexity**: O(1)
    ///
    /// The element becomes a B₀ tree at the end of the root list; the
    /// minimum pointer moves only if it compares strictly less than the
    /// current minimum, so equal keys keep their insertion precedence.
    ///
    /// # Panics
    ///
    /// Panics if the element is already attached to a queue.
    pub fn insert(&mut self, elem: &ElemRef<T>) {
        if let Err(err) = self.try_insert(elem) {
            panic!("PriQueue::insert: {err}");
        }
    }

    /// Inserts an element, or returns [`QueueError::AlreadyAttached`]
    pub fn try_insert(&mut self, elem: &ElemRef<T>) -> Result<(), QueueError> {
        if elem.is_attached() {
            return Err(QueueError::AlreadyAttached);
        }

        {
            let mut link = elem.link.borrow_mut();
            link.reset();
            link.attached = true;
        }
        self.push_root(Rc::clone(elem));
        self.len += 1;
        Ok(())
    }

    /// Returns a minimal element without removing it
    ///
    /// **Time Complexity**: O(1)
    ///
    /// If several elements compare equal to the minimum, one of them is
    /// returned. Two calls without an intervening mutation return the same
    /// element.
    pub fn get_min(&self) -> Option<ElemRef<T>> {
        self.min.upgrade()
    }

    /// Removes and returns a minimal element
    ///
    /// **Time Complexity**: O(log n) amortized
    ///
    /// **Algorithm**:
    /// 1. Unlink the minimum root from the root list
    /// 2. Append its children (B₀, ..., B_{k-1}) to the root list
    /// 3. Consolidate the root list and find the new minimum
    ///
    /// The returned element is unattached.
    pub fn pop_min(&mut self) -> Option<ElemRef<T>> {
        let root = self.min.upgrade()?;

        self.detach_root(&root);
        self.len -= 1;
        self.consolidate();
        Some(root)
    }

    /// Removes an arbitrary element
    ///
    /// **Time Complexity**: O(log n) levels, plus consolidation (amortized)
    ///
    /// **Algorithm**: The element is moved to the root of its tree as if its
    /// key were -∞ (structural swaps with its ancestors), then removed like
    /// a minimum root. No comparisons are made on the way up.
    ///
    /// # Panics
    ///
    /// Panics if the element is not attached to this queue.
    pub fn remove(&mut self, elem: &ElemRef<T>) {
        if let Err(err) = self.try_remove(elem) {
            panic!("PriQueue::remove: {err}");
        }
    }

    /// Removes an element, or returns why it cannot be removed from this queue
    pub fn try_remove(&mut self, elem: &ElemRef<T>) -> Result<(), QueueError> {
        self.check_owned(elem)?;

        self.sift_up(elem, true);
        self.detach_root(elem);
        self.len -= 1;
        self.consolidate();
        Ok(())
    }

    /// Restores heap order after the caller changed an element's key
    ///
    /// **Time Complexity**: O(log n) levels
    ///
    /// **Algorithm**:
    /// - If the element now compares less than its parent, swap it upward
    ///   (node identity is preserved; its parent takes its old position)
    ///   until the heap property holds.
    /// - Otherwise rebuild the element's subtree: detach its k children
    ///   (orders 0..k-1), treat it as a B₀ and link it with each child in
    ///   turn. The carries produce a single Bₖ, which takes the element's
    ///   old position. This is cheaper than remove + insert and handles
    ///   both an increased key and a decreased key at a root.
    ///
    /// # Panics
    ///
    /// Panics if the element is not attached to this queue.
    pub fn update(&mut self, elem: &ElemRef<T>) {
        if let Err(err) = self.try_update(elem) {
            panic!("PriQueue::update: {err}");
        }
    }

    /// Updates an element, or returns why it cannot be updated in this queue
    pub fn try_update(&mut self, elem: &ElemRef<T>) -> Result<(), QueueError> {
        self.check_owned(elem)?;

        let parent = elem.link.borrow().parent.upgrade();
        let moves_up = parent.is_some_and(|parent| self.less(elem, &parent));
        if moves_up {
            self.sift_up(elem, false);
        } else {
            self.rebuild_subtree(elem);
        }
        Ok(())
    }

    /// Moves every element of `other` into this queue
    ///
    /// **Time Complexity**: O(1)
    ///
    /// The two root lists are spliced and the minimum pointers compared.
    /// `other` is consumed, so it cannot be used afterwards; this queue's
    /// comparator is kept.
    ///
    /// # Panics
    ///
    /// Panics if the comparators are not compatible
    /// (see [`Comparator::is_compatible`]).
    pub fn meld(&mut self, other: Self) {
        if self.try_meld(other).is_err() {
            panic!("PriQueue::meld: {}", QueueError::IncompatibleComparator);
        }
    }

    /// Melds `other` into this queue, or hands it back untouched if the
    /// comparators are incompatible ([`QueueError::IncompatibleComparator`])
    pub fn try_meld(&mut self, mut other: Self) -> Result<(), Self> {
        if !self.cmp.is_compatible(&other.cmp) {
            return Err(other);
        }

        let other_len = mem::replace(&mut other.len, 0);
        let other_head = other.head.take();
        let other_tail = mem::take(&mut other.tail);
        let other_min = mem::take(&mut other.min);
        other.tag.forward_to(&self.tag);

        trace!(
            into_len = self.len,
            from_len = other_len,
            "melding priority queues"
        );

        if let Some(other_head) = other_head {
            match self.tail.upgrade() {
                Some(tail) => {
                    other_head.link.borrow_mut().prev = Rc::downgrade(&tail);
                    tail.link.borrow_mut().next = Some(other_head);
                }
                None => self.head = Some(other_head),
            }
            self.tail = other_tail;

            if let Some(other_min) = other_min.upgrade() {
                let new_min = match self.min.upgrade() {
                    Some(min) => self.less(&other_min, &min),
                    None => true,
                };
                if new_min {
                    self.min = Rc::downgrade(&other_min);
                }
            }
        }

        self.len += other_len;
        Ok(())
    }

    /// Returns true if `elem` is attached to this queue
    ///
    /// **Time Complexity**: O(log n)
    pub fn contains(&self, elem: &ElemRef<T>) -> bool {
        self.check_owned(elem).is_ok()
    }

    /// Checks every structural invariant
    ///
    /// **Time Complexity**: O(n)
    ///
    /// Verifies heap order at every node, binomial shape (the child at
    /// index i has order i), parent links, root-list links, ownership tags,
    /// the minimum pointer, and that `len()` equals the number of reachable
    /// elements. Never panics; the first violation found is logged at
    /// debug level. Intended for tests and debugging.
    pub fn is_valid(&self) -> bool {
        let mut count = 0usize;
        let mut roots = 0usize;
        let mut prev: Option<ElemRef<T>> = None;
        let mut current = self.head.clone();

        while let Some(root) = current {
            roots += 1;
            if roots > self.len {
                debug!(len = self.len, "root list is longer than the queue");
                return false;
            }

            {
                let link = root.link.borrow();
                if !link.attached || link.parent.upgrade().is_some() {
                    debug!("root is unattached or has a parent");
                    return false;
                }
                let owned = link
                    .owner
                    .as_ref()
                    .is_some_and(|tag| Rc::ptr_eq(&QueueTag::resolve(tag), &self.tag));
                if !owned {
                    debug!("root is not owned by this queue");
                    return false;
                }
                if !ptr_eq_opt(link.prev.upgrade().as_ref(), prev.as_ref()) {
                    debug!("root list prev link is inconsistent");
                    return false;
                }
            }

            match self.tree_size(&root) {
                Some(size) => count += size,
                None => return false,
            }

            current = root.link.borrow().next.clone();
            prev = Some(root);
        }

        if !ptr_eq_opt(self.tail.upgrade().as_ref(), prev.as_ref()) {
            debug!("tail does not point at the last root");
            return false;
        }

        if count != self.len {
            debug!(count, len = self.len, "size counter does not match");
            return false;
        }

        match self.min.upgrade() {
            None => {
                if self.len != 0 {
                    debug!("non-empty queue has no minimum");
                    return false;
                }
            }
            Some(min) => {
                if !min.link.borrow().is_root() {
                    debug!("minimum is not a root");
                    return false;
                }
                let mut current = self.head.clone();
                while let Some(root) = current {
                    match self.try_less(&root, &min) {
                        Some(false) => {}
                        Some(true) => {
                            debug!("a root compares less than the minimum");
                            return false;
                        }
                        None => return false,
                    }
                    current = root.link.borrow().next.clone();
                }
            }
        }

        true
    }

    /// Returns the size of a binomial tree, or None if it breaks an invariant
    fn tree_size(&self, node: &ElemRef<T>) -> Option<usize> {
        let link = node.link.borrow();
        let mut size = 1;

        for (index, child) in link.children.iter().enumerate() {
            {
                let child_link = child.link.borrow();
                if child_link.order() != index {
                    debug!(index, order = child_link.order(), "child order mismatch");
                    return None;
                }
                if !child_link.attached || child_link.is_root() {
                    debug!("child is unattached or marked as a root");
                    return None;
                }
                let parent_ok = child_link
                    .parent
                    .upgrade()
                    .is_some_and(|parent| Rc::ptr_eq(&parent, node));
                if !parent_ok {
                    debug!("child parent link does not point back");
                    return None;
                }
            }
            if self.try_less(child, node)? {
                debug!("heap order violated");
                return None;
            }
            size += self.tree_size(child)?;
        }

        if size != 1 << link.order() {
            debug!(size, order = link.order(), "binomial tree has the wrong size");
            return None;
        }
        Some(size)
    }

    #[inline]
    fn less(&self, a: &Element<T>, b: &Element<T>) -> bool {
        self.cmp.compare(&a.borrow(), &b.borrow()) == Ordering::Less
    }

    /// Comparison used while validating; None if either record is
    /// currently mutably borrowed
    fn try_less(&self, a: &Element<T>, b: &Element<T>) -> Option<bool> {
        let (Ok(a), Ok(b)) = (a.try_borrow(), b.try_borrow()) else {
            debug!("record is mutably borrowed, cannot compare");
            return None;
        };
        Some(self.cmp.compare(&a, &b) == Ordering::Less)
    }

    /// Verifies that an element belongs to this queue
    fn check_owned(&self, elem: &ElemRef<T>) -> Result<(), QueueError> {
        if !elem.is_attached() {
            return Err(QueueError::NotAttached);
        }

        let root = Element::tree_root(elem);
        let tag = root.link.borrow().owner.clone();
        let Some(tag) = tag else {
            return Err(QueueError::ForeignElement);
        };

        let resolved = QueueTag::resolve(&tag);
        if !Rc::ptr_eq(&resolved, &self.tag) {
            return Err(QueueError::ForeignElement);
        }
        if !Rc::ptr_eq(&tag, &resolved) {
            root.link.borrow_mut().owner = Some(resolved);
        }
        Ok(())
    }

    /// Appends a tree to the root list, updating the minimum on a strict win
    fn push_root(&mut self, node: ElemRef<T>) {
        {
            let mut link = node.link.borrow_mut();
            link.parent = Weak::new();
            link.next = None;
            link.prev = self.tail.clone();
            link.owner = Some(Rc::clone(&self.tag));
        }

        let new_min = match self.min.upgrade() {
            Some(min) => self.less(&node, &min),
            None => true,
        };
        if new_min {
            self.min = Rc::downgrade(&node);
        }

        match self.tail.upgrade() {
            Some(tail) => tail.link.borrow_mut().next = Some(Rc::clone(&node)),
            None => self.head = Some(Rc::clone(&node)),
        }
        self.tail = Rc::downgrade(&node);
    }

    /// Removes a root from the root list, promotes its children to roots,
    /// and leaves it unattached
    fn detach_root(&mut self, root: &ElemRef<T>) {
        self.unlink_root(root);
        let children = mem::take(&mut root.link.borrow_mut().children);
        for child in children {
            self.push_root(child);
        }
        root.link.borrow_mut().reset();
    }

    fn unlink_root(&mut self, node: &ElemRef<T>) {
        let (prev, next) = {
            let mut link = node.link.borrow_mut();
            link.owner = None;
            (mem::take(&mut link.prev), link.next.take())
        };

        match prev.upgrade() {
            Some(prev) => prev.link.borrow_mut().next = next.clone(),
            None => self.head = next.clone(),
        }
        match next {
            Some(next) => next.link.borrow_mut().prev = prev,
            None => self.tail = prev,
        }
    }

    /// Puts `new` in `old`'s place in the root list
    fn replace_root(&mut self, old: &ElemRef<T>, new: ElemRef<T>) {
        let (prev, next) = {
            let mut link = old.link.borrow_mut();
            link.owner = None;
            (mem::take(&mut link.prev), link.next.take())
        };

        {
            let mut link = new.link.borrow_mut();
            link.parent = Weak::new();
            link.prev = prev.clone();
            link.next = next.clone();
            link.owner = Some(Rc::clone(&self.tag));
        }

        match prev.upgrade() {
            Some(prev) => prev.link.borrow_mut().next = Some(Rc::clone(&new)),
            None => self.head = Some(Rc::clone(&new)),
        }
        match next {
            Some(next) => next.link.borrow_mut().prev = Rc::downgrade(&new),
            None => self.tail = Rc::downgrade(&new),
        }
    }

    /// Links two trees of the same order, returning the new root
    ///
    /// The loser becomes the last child of the winner. On a tie `a` wins.
    /// The loser's root-list links must already be cleared.
    fn link_trees(&self, a: ElemRef<T>, b: ElemRef<T>) -> ElemRef<T> {
        let (parent, child) = if self.less(&b, &a) { (b, a) } else { (a, b) };

        {
            let mut link = child.link.borrow_mut();
            link.parent = Rc::downgrade(&parent);
            link.owner = None;
        }
        parent.link.borrow_mut().children.push(child);
        parent
    }

    /// Links roots of equal order until every order appears at most once,
    /// then rebuilds the root list and the minimum pointer
    ///
    /// **Time Complexity**: O(r + log n) for r roots. Each link removes a
    /// root for good, so the cost is paid for by the inserts and melds that
    /// created the roots.
    fn consolidate(&mut self) {
        let mut buckets: SmallVec<[Option<ElemRef<T>>; 32]> = SmallVec::new();
        let mut current = self.head.take();
        let mut roots = 0usize;
        self.tail = Weak::new();
        self.min = Weak::new();

        while let Some(node) = current {
            roots += 1;
            {
                let mut link = node.link.borrow_mut();
                current = link.next.take();
                link.prev = Weak::new();
            }

            let mut tree = node;
            loop {
                let order = tree.link.borrow().order();
                if buckets.len() <= order {
                    buckets.resize(order + 1, None);
                }
                match buckets[order].take() {
                    Some(other) => tree = self.link_trees(other, tree),
                    None => {
                        buckets[order] = Some(tree);
                        break;
                    }
                }
            }
        }

        for tree in buckets.into_iter().flatten() {
            self.push_root(tree);
        }

        trace!(roots, len = self.len, "consolidated root list");
    }

    /// Swaps `node` upward while it compares less than its parent, or all the
    /// way to the root when `to_root` is set
    fn sift_up(&mut self, node: &ElemRef<T>, to_root: bool) {
        loop {
            let parent = node.link.borrow().parent.upgrade();
            let Some(parent) = parent else {
                break;
            };
            if !to_root && !self.less(node, &parent) {
                break;
            }
            self.swap_with_parent(node, &parent);
        }

        if !to_root && node.link.borrow().is_root() {
            // The root that `node` displaced may have been the minimum
            let new_min = match self.min.upgrade() {
                Some(min) => !min.link.borrow().is_root() || self.less(node, &min),
                None => true,
            };
            if new_min {
                self.min = Rc::downgrade(node);
            }
        }
    }

    /// Exchanges the tree positions of `node` and its parent
    ///
    /// `node` (order j) takes its parent's place and order k, adopting the
    /// parent's children with the parent itself at index j. The parent takes
    /// `node`'s old children and becomes a node of order j.
    fn swap_with_parent(&mut self, node: &ElemRef<T>, parent: &ElemRef<T>) {
        let grandparent = parent.link.borrow().parent.upgrade();
        let index = node.link.borrow().order();

        let node_children = mem::take(&mut node.link.borrow_mut().children);
        let mut parent_children = mem::take(&mut parent.link.borrow_mut().children);
        debug_assert!(Rc::ptr_eq(&parent_children[index], node));
        parent_children[index] = Rc::clone(parent);

        for child in &node_children {
            child.link.borrow_mut().parent = Rc::downgrade(parent);
        }
        for child in &parent_children {
            child.link.borrow_mut().parent = Rc::downgrade(node);
        }

        let order = parent_children.len();
        node.link.borrow_mut().children = parent_children;
        parent.link.borrow_mut().children = node_children;

        match grandparent {
            Some(grandparent) => {
                grandparent.link.borrow_mut().children[order] = Rc::clone(node);
                node.link.borrow_mut().parent = Rc::downgrade(&grandparent);
            }
            None => self.replace_root(parent, Rc::clone(node)),
        }
    }

    /// Re-heapifies the subtree rooted at `node` in place
    fn rebuild_subtree(&mut self, node: &ElemRef<T>) {
        let (parent, was_root, order) = {
            let link = node.link.borrow();
            (link.parent.upgrade(), link.is_root(), link.order())
        };
        let was_min = self.min.upgrade().is_some_and(|min| Rc::ptr_eq(&min, node));

        let children = mem::take(&mut node.link.borrow_mut().children);
        let mut tree = Rc::clone(node);
        for child in children {
            tree = self.link_trees(tree, child);
        }
        debug_assert_eq!(tree.link.borrow().order(), order);

        if let Some(parent) = parent {
            parent.link.borrow_mut().children[order] = Rc::clone(&tree);
            tree.link.borrow_mut().parent = Rc::downgrade(&parent);
            return;
        }

        debug_assert!(was_root);
        if !Rc::ptr_eq(&tree, node) {
            self.replace_root(node, Rc::clone(&tree));
        }

        if was_min {
            // The old minimum may have grown past another root
            self.consolidate();
        } else {
            let new_min = match self.min.upgrade() {
                Some(min) => self.less(&tree, &min),
                None => true,
            };
            if new_min {
                self.min = Rc::downgrade(&tree);
            }
        }
    }
}

impl<T, C> PriQueue<T, C> {
    /// Returns the number of attached elements
    ///
    /// **Time Complexity**: O(1)
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns true if the queue has no elements
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Iterates over every attached element exactly once, in no particular
    /// order
    ///
    /// The iterator borrows the queue, so the queue cannot be modified while
    /// an iteration is in progress. A new iterator can be created at any time.
    pub fn iter(&self) -> Iter<'_, T> {
        Iter::new(self.head.clone(), self.len)
    }

    /// Detaches every element, leaving the queue empty
    pub fn clear(&mut self) {
        self.detach_all(|_| {});
    }

    /// Tears the queue down, detaching every element
    ///
    /// Element records are not touched beyond their link fields. Dropping
    /// the queue has the same effect.
    pub fn destroy(self) {}

    /// Tears the queue down, calling `f` exactly once for every element that
    /// was attached, after its links have been cleared
    ///
    /// The order of the calls is unspecified.
    pub fn destroy_with<F>(mut self, f: F)
    where
        F: FnMut(ElemRef<T>),
    {
        self.detach_all(f);
    }

    fn detach_all<F>(&mut self, mut f: F)
    where
        F: FnMut(ElemRef<T>),
    {
        let len = mem::replace(&mut self.len, 0);
        let mut current = self.head.take();
        self.tail = Weak::new();
        self.min = Weak::new();

        if len > 0 {
            trace!(len, "detaching all elements");
        }

        // Iterative so that long root lists or deep trees cannot overflow the
        // stack through recursive Rc drops
        let mut stack: Vec<ElemRef<T>> = Vec::new();
        while let Some(root) = current {
            current = root.link.borrow_mut().next.take();
            stack.push(root);

            while let Some(node) = stack.pop() {
                let children = mem::take(&mut node.link.borrow_mut().children);
                stack.extend(children);
                node.link.borrow_mut().reset();
                f(node);
            }
        }
    }
}

impl<T, C> Drop for PriQueue<T, C> {
    fn drop(&mut self) {
        self.detach_all(|_| {});
    }
}

impl<'a, T, C> IntoIterator for &'a PriQueue<T, C> {
    type Item = ElemRef<T>;
    type IntoIter = Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<T, C> fmt::Debug for PriQueue<T, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut roots = 0usize;
        let mut current = self.head.clone();
        while let Some(root) = current {
            roots += 1;
            current = root.link.borrow().next.clone();
        }
        f.debug_struct("PriQueue")
            .field("len", &self.len)
            .field("roots", &roots)
            .finish_non_exhaustive()
    }
}

fn ptr_eq_opt<T>(a: Option<&Rc<T>>, b: Option<&Rc<T>>) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => Rc::ptr_eq(a, b),
        (None, None) => true,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn int_queue() -> PriQueue<i32, NaturalOrder> {
        PriQueue::default()
    }

    fn root_count<T, C>(queue: &PriQueue<T, C>) -> usize {
        let mut roots = 0;
        let mut current = queue.head.clone();
        while let Some(root) = current {
            roots += 1;
            current = root.link.borrow().next.clone();
        }
        roots
    }

    #[test]
    fn test_basic_operations() {
        let mut queue = int_queue();
        assert!(queue.is_empty());
        assert!(queue.get_min().is_none());

        let a = Element::new(5);
        let b = Element::new(3);
        let c = Element::new(7);
        queue.insert(&a);
        queue.insert(&b);
        queue.insert(&c);

        assert_eq!(queue.len(), 3);
        assert!(Rc::ptr_eq(&queue.get_min().unwrap(), &b));

        let min = queue.pop_min().unwrap();
        assert!(Rc::ptr_eq(&min, &b));
        assert!(!b.is_attached());
        assert!(Rc::ptr_eq(&queue.get_min().unwrap(), &a));
        assert!(queue.is_valid());
    }

    #[test]
    fn test_insert_is_lazy() {
        let mut queue = int_queue();
        let elems: Vec<_> = (0..8).map(Element::new).collect();
        for e in &elems {
            queue.insert(e);
        }
        assert_eq!(root_count(&queue), 8);

        queue.pop_min();
        // 7 elements consolidate into B₂ + B₁ + B₀
        assert_eq!(root_count(&queue), 3);
        assert!(queue.is_valid());
    }

    #[test]
    fn test_update_decrease_moves_to_root() {
        let mut queue = int_queue();
        let elems: Vec<_> = (10..26).map(Element::new).collect();
        for e in &elems {
            queue.insert(e);
        }
        // Force a single B₄
        queue.insert(&Element::new(0));
        queue.pop_min();
        assert_eq!(root_count(&queue), 1);

        let deepest = elems.last().unwrap();
        *deepest.borrow_mut() = 1;
        queue.update(deepest);
        assert!(queue.is_valid());
        assert!(Rc::ptr_eq(&queue.get_min().unwrap(), deepest));
        assert!(deepest.link.borrow().is_root());
    }

    #[test]
    fn test_update_increase_of_minimum() {
        let mut queue = int_queue();
        let elems: Vec<_> = [1, 2, 3, 4].into_iter().map(Element::new).collect();
        for e in &elems {
            queue.insert(e);
        }
        queue.insert(&Element::new(0));
        queue.pop_min();

        *elems[0].borrow_mut() = 100;
        queue.update(&elems[0]);
        assert!(queue.is_valid());
        assert_eq!(*queue.get_min().unwrap().borrow(), 2);

        let order: Vec<i32> = std::iter::from_fn(|| queue.pop_min())
            .map(|e| e.get())
            .collect();
        assert_eq!(order, vec![2, 3, 4, 100]);
    }

    #[test]
    fn test_remove_interior_node() {
        let mut queue = int_queue();
        let elems: Vec<_> = (0..16).map(Element::new).collect();
        for e in &elems {
            queue.insert(e);
        }
        queue.insert(&Element::new(-1));
        queue.pop_min();

        queue.remove(&elems[9]);
        assert!(!elems[9].is_attached());
        assert_eq!(queue.len(), 15);
        assert!(queue.is_valid());
        assert!(!queue.contains(&elems[9]));
        assert!(queue.contains(&elems[8]));
    }

    #[test]
    fn test_meld_forwards_ownership() {
        let mut a = int_queue();
        let mut b = int_queue();
        let x = Element::new(1);
        let y = Element::new(2);
        a.insert(&x);
        b.insert(&y);

        a.meld(b);
        assert_eq!(a.len(), 2);
        assert!(a.contains(&y));
        assert!(a.is_valid());

        a.remove(&y);
        assert_eq!(a.len(), 1);
        assert!(a.is_valid());
    }

    #[test]
    fn test_foreign_element_is_rejected() {
        let mut a = int_queue();
        let mut b = int_queue();
        let x = Element::new(1);
        b.insert(&x);

        assert_eq!(a.try_remove(&x), Err(QueueError::ForeignElement));
        assert_eq!(a.try_update(&x), Err(QueueError::ForeignElement));
        assert_eq!(a.try_insert(&x), Err(QueueError::AlreadyAttached));
        assert_eq!(a.try_remove(&Element::new(2)), Err(QueueError::NotAttached));
        assert!(b.is_valid());
        assert_eq!(b.len(), 1);
    }

    #[test]
    #[should_panic(expected = "already attached")]
    fn test_double_insert_panics() {
        let mut queue = int_queue();
        let x = Element::new(1);
        queue.insert(&x);
        queue.insert(&x);
    }

    #[test]
    fn test_drop_detaches_elements() {
        let x = Element::new(1);
        let y = Element::new(2);
        {
            let mut queue = int_queue();
            queue.insert(&x);
            queue.insert(&y);
        }
        assert!(!x.is_attached());
        assert!(!y.is_attached());
        assert_eq!(Rc::strong_count(&x), 1);
        assert_eq!(Rc::strong_count(&y), 1);
    }

    #[test]
    fn test_debug_output() {
        let mut queue = int_queue();
        queue.insert(&Element::new(1));
        let out = format!("{:?}", queue);
        assert!(out.contains("len: 1"));
        assert!(out.contains("roots: 1"));
    }

    /// Builds a queue holding a single B₄ rooted at key 10
    fn single_tree() -> (PriQueue<i32, NaturalOrder>, Vec<ElemRef<i32>>) {
        let mut queue = int_queue();
        let elems: Vec<_> = (10..26).map(Element::new).collect();
        for e in &elems {
            queue.insert(e);
        }
        queue.insert(&Element::new(0));
        queue.pop_min();
        assert_eq!(root_count(&queue), 1);
        assert!(queue.is_valid());
        (queue, elems)
    }

    #[test]
    fn test_is_valid_rejects_heap_order_violation() {
        let (queue, elems) = single_tree();

        // Re-keyed without calling update
        *elems[15].borrow_mut() = -100;
        assert!(!queue.is_valid());

        *elems[15].borrow_mut() = 25;
        assert!(queue.is_valid());
    }

    #[test]
    fn test_is_valid_rejects_wrong_len() {
        let (mut queue, _elems) = single_tree();

        queue.len += 1;
        assert!(!queue.is_valid());
        queue.len -= 2;
        assert!(!queue.is_valid());
        queue.len += 1;
        assert!(queue.is_valid());
    }

    #[test]
    fn test_is_valid_rejects_broken_parent_link() {
        let (queue, elems) = single_tree();
        let child = elems
            .iter()
            .find(|e| !e.link.borrow().is_root())
            .unwrap();

        let parent = mem::take(&mut child.link.borrow_mut().parent);
        assert!(!queue.is_valid());

        child.link.borrow_mut().parent = parent;
        assert!(queue.is_valid());
    }

    #[test]
    fn test_is_valid_rejects_broken_prev_link() {
        let mut queue = int_queue();
        let a = Element::new(1);
        let b = Element::new(2);
        queue.insert(&a);
        queue.insert(&b);
        assert!(queue.is_valid());

        let prev = mem::take(&mut b.link.borrow_mut().prev);
        assert!(!queue.is_valid());

        b.link.borrow_mut().prev = prev;
        assert!(queue.is_valid());
    }

    #[test]
    fn test_is_valid_rejects_minimum_off_the_root_list() {
        let (mut queue, elems) = single_tree();

        queue.min = Rc::downgrade(&elems[15]);
        assert!(!elems[15].link.borrow().is_root());
        assert!(!queue.is_valid());

        queue.min = Rc::downgrade(&elems[0]);
        assert!(queue.is_valid());
    }

    #[test]
    fn test_is_valid_with_outstanding_mutable_borrow() {
        let mut queue = int_queue();
        let a = Element::new(1);
        let b = Element::new(2);
        queue.insert(&a);
        queue.insert(&b);

        // Root-list comparison against the minimum
        {
            let _guard = b.borrow_mut();
            assert!(!queue.is_valid());
        }
        assert!(queue.is_valid());

        // Parent/child comparison inside a tree
        let (queue, elems) = single_tree();
        {
            let _guard = elems[15].borrow_mut();
            assert!(!queue.is_valid());
        }
        assert!(queue.is_valid());
    }
}

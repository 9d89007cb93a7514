//! Caller-owned queue elements
//!
//! An [`Element`] is the caller's record together with the link fields the
//! queue needs to thread it into its forest. The queue never allocates or
//! drops records: the caller creates them with [`Element::new`], keeps an
//! [`ElemRef`] for as long as it likes, and hands references to the queue.
//! While attached, the queue holds extra strong references through the link
//! fields; detaching clears every link and gives the record back untouched.
//!
//! **Memory Model**: Strong references flow from roots downward (children)
//! and forward along the root list (next). Weak references flow upward
//! (parent) and backward (prev), so an attached forest never forms a cycle.

use std::cell::{BorrowError, Ref, RefCell, RefMut};
use std::fmt;
use std::rc::{Rc, Weak};

/// Shared handle to a caller-owned element
pub type ElemRef<T> = Rc<Element<T>>;

/// Weak element reference, used for upward and backward links
pub(crate) type WeakElem<T> = Weak<Element<T>>;

/// Identity of a queue, shared by the roots it owns
///
/// Melding forwards the consumed queue's tag to the survivor, so a root
/// that still carries the old tag resolves to the right queue without any
/// per-element relabelling.
#[derive(Default)]
pub(crate) struct QueueTag {
    merged_into: RefCell<Option<Rc<QueueTag>>>,
}

impl QueueTag {
    pub(crate) fn new() -> Rc<QueueTag> {
        Rc::new(QueueTag::default())
    }

    /// Follows meld forwarding to the queue that currently owns this tag
    pub(crate) fn resolve(tag: &Rc<QueueTag>) -> Rc<QueueTag> {
        let mut current = Rc::clone(tag);
        loop {
            let next = current.merged_into.borrow().clone();
            match next {
                Some(next) => current = next,
                None => return current,
            }
        }
    }

    pub(crate) fn forward_to(&self, survivor: &Rc<QueueTag>) {
        *self.merged_into.borrow_mut() = Some(Rc::clone(survivor));
    }
}

/// Link fields embedded in every element
///
/// A node of order `k` has exactly `k` children, and `children[i]` is the
/// root of a binomial tree of order `i`. A node's order is therefore also
/// its index in its parent's child list.
pub(crate) struct Link<T> {
    pub(crate) attached: bool,
    /// Parent node (empty for roots and unattached elements)
    pub(crate) parent: WeakElem<T>,
    /// Children ordered by increasing order
    pub(crate) children: Vec<ElemRef<T>>,
    /// Next root in the root list (roots only)
    pub(crate) next: Option<ElemRef<T>>,
    /// Previous root in the root list (roots only)
    pub(crate) prev: WeakElem<T>,
    /// Owning queue (roots only)
    pub(crate) owner: Option<Rc<QueueTag>>,
}

impl<T> Link<T> {
    fn new() -> Self {
        Link {
            attached: false,
            parent: Weak::new(),
            children: Vec::new(),
            next: None,
            prev: Weak::new(),
            owner: None,
        }
    }

    #[inline]
    pub(crate) fn order(&self) -> usize {
        self.children.len()
    }

    #[inline]
    pub(crate) fn is_root(&self) -> bool {
        self.owner.is_some()
    }

    /// Clears every link field, returning the element to the unattached state
    pub(crate) fn reset(&mut self) {
        *self = Link::new();
    }
}

/// A caller-owned record that can be linked into a [`PriQueue`](crate::PriQueue)
///
/// # Example
///
/// ```rust
/// use intrusive_priqueue::{Element, PriQueue};
///
/// struct Timer {
///     deadline: u64,
///     name: &'static str,
/// }
///
/// let mut queue = PriQueue::new(|a: &Timer, b: &Timer| a.deadline.cmp(&b.deadline));
/// let t = Element::new(Timer { deadline: 30, name: "flush" });
/// queue.insert(&t);
/// assert!(t.is_attached());
///
/// // Re-key in place, then tell the queue
/// t.borrow_mut().deadline = 10;
/// queue.update(&t);
///
/// let next = queue.pop_min().unwrap();
/// assert_eq!(next.borrow().name, "flush");
/// assert!(!t.is_attached());
/// ```
pub struct Element<T> {
    value: RefCell<T>,
    pub(crate) link: RefCell<Link<T>>,
}

impl<T> Element<T> {
    /// Creates a new, unattached element
    pub fn new(value: T) -> ElemRef<T> {
        Rc::new(Element {
            value: RefCell::new(value),
            link: RefCell::new(Link::new()),
        })
    }

    /// Borrows the record immutably
    #[inline]
    pub fn borrow(&self) -> Ref<'_, T> {
        self.value.borrow()
    }

    /// Borrows the record immutably, failing if it is mutably borrowed
    #[inline]
    pub fn try_borrow(&self) -> Result<Ref<'_, T>, BorrowError> {
        self.value.try_borrow()
    }

    /// Borrows the record mutably
    ///
    /// Changing the ordering key of an attached element must be followed by
    /// `PriQueue::update` before any other operation on its queue.
    #[inline]
    pub fn borrow_mut(&self) -> RefMut<'_, T> {
        self.value.borrow_mut()
    }

    /// Returns a copy of the record
    #[inline]
    pub fn get(&self) -> T
    where
        T: Copy,
    {
        *self.value.borrow()
    }

    /// Replaces the record, returning the old one
    pub fn replace(&self, value: T) -> T {
        self.value.replace(value)
    }

    /// Returns true if the element is currently a member of some queue
    #[inline]
    pub fn is_attached(&self) -> bool {
        self.link.borrow().attached
    }

    /// Unwraps the record if this is the last reference to an unattached element
    ///
    /// Attached elements are also referenced by their queue, so this returns
    /// the handle back unchanged for them.
    pub fn try_unwrap(this: ElemRef<T>) -> Result<T, ElemRef<T>> {
        Rc::try_unwrap(this).map(|elem| elem.value.into_inner())
    }

    /// Walks parent links up to the root of this element's tree
    pub(crate) fn tree_root(this: &ElemRef<T>) -> ElemRef<T> {
        let mut current = Rc::clone(this);
        loop {
            let parent = current.link.borrow().parent.upgrade();
            match parent {
                Some(parent) => current = parent,
                None => return current,
            }
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Element<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let link = self.link.borrow();
        let mut s = f.debug_struct("Element");
        match self.value.try_borrow() {
            Ok(value) => s.field("value", &*value),
            Err(_) => s.field("value", &"<borrowed>"),
        };
        s.field("attached", &link.attached)
            .field("order", &link.order())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_element_is_unattached() {
        let e = Element::new(42);
        assert!(!e.is_attached());
        assert_eq!(*e.borrow(), 42);
        assert_eq!(e.link.borrow().order(), 0);
        assert!(!e.link.borrow().is_root());
    }

    #[test]
    fn test_borrow_mut_and_replace() {
        let e = Element::new(String::from("a"));
        e.borrow_mut().push('b');
        assert_eq!(*e.borrow(), "ab");
        assert_eq!(e.replace(String::from("c")), "ab");
        assert_eq!(*e.borrow(), "c");
    }

    #[test]
    fn test_get_copies_record() {
        let e = Element::new(3u64);
        *e.borrow_mut() += 4;
        assert_eq!(e.get(), 7);
    }

    #[test]
    fn test_try_unwrap() {
        let e = Element::new(7);
        let extra = Rc::clone(&e);
        let e = Element::try_unwrap(e).unwrap_err();
        drop(extra);
        assert_eq!(Element::try_unwrap(e).ok(), Some(7));
    }

    #[test]
    fn test_tag_resolution_follows_forwarding() {
        let a = QueueTag::new();
        let b = QueueTag::new();
        let c = QueueTag::new();
        assert!(Rc::ptr_eq(&QueueTag::resolve(&a), &a));

        a.forward_to(&b);
        b.forward_to(&c);
        assert!(Rc::ptr_eq(&QueueTag::resolve(&a), &c));
        assert!(Rc::ptr_eq(&QueueTag::resolve(&b), &c));
    }

    #[test]
    fn test_tree_root_of_lone_element() {
        let e = Element::new(1);
        assert!(Rc::ptr_eq(&Element::tree_root(&e), &e));
    }

    #[test]
    fn test_debug_output() {
        let e = Element::new(5);
        let out = format!("{:?}", e);
        assert!(out.contains("value: 5"));
        assert!(out.contains("attached: false"));
    }
}

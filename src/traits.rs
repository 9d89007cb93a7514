//! Comparator trait and error type for the priority queue
//!
//! The queue never stores keys. Ordering is delegated to a [`Comparator`],
//! which sees the caller's records directly and returns a total preorder.
//! Any `Fn(&T, &T) -> Ordering` closure is a comparator; [`NaturalOrder`]
//! uses `T: Ord`, and [`WithContext`] carries an explicit context value that
//! is handed to every comparison.

use std::cmp::Ordering;
use std::fmt;

/// Error type for queue operations
///
/// Every variant is a precondition violation. The panicking operations
/// (`insert`, `remove`, `update`, `meld`) turn these into panics; the
/// `try_*` variants hand them back before anything is mutated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueError {
    /// The element is already attached to a queue
    AlreadyAttached,
    /// The element is not attached to any queue
    NotAttached,
    /// The element is attached, but to a different queue
    ForeignElement,
    /// The comparators of two queues being melded are not compatible
    IncompatibleComparator,
}

impl fmt::Display for QueueError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueueError::AlreadyAttached => write!(f, "element is already attached to a queue"),
            QueueError::NotAttached => write!(f, "element is not attached to any queue"),
            QueueError::ForeignElement => {
                write!(f, "element is attached to a different queue")
            }
            QueueError::IncompatibleComparator => {
                write!(f, "cannot meld queues with incompatible comparators")
            }
        }
    }
}

impl std::error::Error for QueueError {}

/// A total preorder over queue records
///
/// `compare(a, b)` returns `Less` if `a` should be dequeued before `b`.
/// Ties are allowed. The relative order of two attached records must not
/// change except through an explicit `PriQueue::update`.
pub trait Comparator<T> {
    /// Compares two records
    fn compare(&self, a: &T, b: &T) -> Ordering;

    /// Returns true if queues ordered by `self` and `other` may be melded
    ///
    /// The surviving queue keeps its own comparator, so the two must agree
    /// on every pair of records. The default accepts any comparator of the
    /// same type.
    fn is_compatible(&self, _other: &Self) -> bool {
        true
    }
}

impl<T, F> Comparator<T> for F
where
    F: Fn(&T, &T) -> Ordering,
{
    #[inline]
    fn compare(&self, a: &T, b: &T) -> Ordering {
        self(a, b)
    }
}

/// Orders records by their `Ord` implementation (smallest first)
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct NaturalOrder;

impl<T: Ord> Comparator<T> for NaturalOrder {
    #[inline]
    fn compare(&self, a: &T, b: &T) -> Ordering {
        a.cmp(b)
    }
}

/// A comparison function paired with an opaque context value
///
/// The context is passed unmodified to every call. Two `WithContext`
/// comparators are compatible for melding only if their contexts are equal.
///
/// # Example
///
/// ```rust
/// use intrusive_priqueue::traits::{Comparator, WithContext};
///
/// // Context flips the ordering direction
/// let cmp = WithContext::new(true, |desc: &bool, a: &i32, b: &i32| {
///     if *desc { b.cmp(a) } else { a.cmp(b) }
/// });
/// assert!(cmp.compare(&3i32, &1i32).is_lt());
/// ```
#[derive(Clone)]
pub struct WithContext<X, F> {
    context: X,
    func: F,
}

impl<X, F> WithContext<X, F> {
    /// Creates a comparator from a context value and a comparison function
    pub fn new(context: X, func: F) -> Self {
        WithContext { context, func }
    }

    /// Returns the context value
    pub fn context(&self) -> &X {
        &self.context
    }
}

impl<X: fmt::Debug, F> fmt::Debug for WithContext<X, F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WithContext")
            .field("context", &self.context)
            .finish_non_exhaustive()
    }
}

impl<T, X, F> Comparator<T> for WithContext<X, F>
where
    X: PartialEq,
    F: Fn(&X, &T, &T) -> Ordering,
{
    #[inline]
    fn compare(&self, a: &T, b: &T) -> Ordering {
        (self.func)(&self.context, a, b)
    }

    fn is_compatible(&self, other: &Self) -> bool {
        self.context == other.context
    }
}

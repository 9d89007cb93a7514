//! Intrusive Mergeable Priority Queue for Rust
//!
//! This crate provides an intrusive priority queue intended as the ordering
//! primitive of schedulers: timers, jobs, pending events. The caller owns the
//! records; the queue only links them, so an element can be removed or
//! re-prioritized in place at any time without searching for it.
//!
//! # Features
//!
//! - **Intrusive**: records are caller-owned [`Element`]s with embedded links;
//!   the queue never allocates or drops them
//! - **Mergeable**: [`PriQueue::meld`] moves all elements of one queue into
//!   another in O(1)
//! - **Lazy Binomial Heap**: O(1) insert and find-min; O(log n) amortized
//!   pop-min, remove and update
//! - **Caller-defined ordering**: any [`Comparator`], including closures and
//!   comparators carrying an explicit context ([`WithContext`])
//!
//! # Example
//!
//! ```rust
//! use intrusive_priqueue::{Element, PriQueue};
//!
//! struct Job {
//!     priority: u32,
//!     name: &'static str,
//! }
//!
//! let mut queue = PriQueue::new(|a: &Job, b: &Job| a.priority.cmp(&b.priority));
//! let build = Element::new(Job { priority: 5, name: "build" });
//! let test = Element::new(Job { priority: 7, name: "test" });
//! queue.insert(&build);
//! queue.insert(&test);
//!
//! // Re-prioritize in place
//! test.borrow_mut().priority = 1;
//! queue.update(&test);
//!
//! assert_eq!(queue.pop_min().unwrap().borrow().name, "test");
//! assert_eq!(queue.len(), 1);
//! ```
//!
//! Queues are single-threaded: [`PriQueue`] and [`Element`] are neither
//! `Send` nor `Sync`.

pub mod dot;
pub mod element;
pub mod iter;
pub mod priqueue;
pub mod traits;

// Re-export the main types for convenience
pub use element::{ElemRef, Element};
pub use iter::Iter;
pub use priqueue::PriQueue;
pub use traits::{Comparator, NaturalOrder, QueueError, WithContext};

//! Seen-key deduplication.
//!
//! Both sets expose a single test-and-set, `check_and_mark`, that answers
//! "have I already processed this key?" and records the key in one step.
//! Keys are only ever added; there is no removal.
//!
//! - [`SeenSet`] is single-owner and mutated through `&mut self`.
//! - [`SharedSeenSet`] is a cloneable handle that can be shared across threads.

pub mod seen_set;
pub mod shared;

pub use seen_set::SeenSet;
pub use shared::SharedSeenSet;

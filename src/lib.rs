//! Dependency-aware memoizing selectors.
//!
//! A [`Selector`] wraps a pure computation over application state. On every
//! call it derives the computation's _dependents_ (named, shared values
//! pulled out of the state), and reuses the memoized result as long as the
//! dependents are the very same allocations and the arguments coerce to the
//! same signature.
//!
//! Results are stored in a tree of layers keyed by dependent identity. The
//! tree only holds dependents weakly, and everything memoized for a
//! dependent that was dropped is pruned lazily. There is no invalidation API.
//!
//! This only works if results do not hold strong references to their own
//! dependents. Such a result keeps its dependent alive through the cache
//! until the selector is dropped. Return derived data or a
//! [`Weak`](std::rc::Weak) instead.
//!
//! # Warnings
//! Usage problems are reported to a [`Sink`]. The default emits a `tracing`
//! event, which is only visible if the host installed a subscriber. Use
//! [`diagnostics::stderr`] to print them without one.
//!
//! # Signatures
//! Arguments are keyed by their comma-joined string coercion. This means
//! that differently typed arguments with the same coercion share a cache
//! entry: `(1, 2)`, `("1", "2")` and `(vec![1, 2],)` are the same call.
//! Sequences and maps are accepted but reported as complex arguments.

mod args;
mod dependent;
pub mod diagnostics;
mod error;
mod selector;
mod shape;
mod signature;
#[cfg(feature = "testing")]
mod testing;
mod tree;

pub use crate::args::{Argument, Arguments};
pub use crate::dependent::{Dependent, Dependents, Identity, Iter};
pub use crate::diagnostics::{Sink, Warning};
pub use crate::error::{InvalidArgumentError, Result};
pub use crate::selector::{Selector, SelectorBuilder, create};
pub use crate::shape::Shape;
pub use crate::signature::Signature;

#[cfg(feature = "macros")]
pub use memoselect_macros::Dependents;

/// These are implementation details. Do not rely on them!
#[doc(hidden)]
pub mod internal {
    #[cfg(feature = "testing")]
    pub use crate::testing::last_was_hit;
}

//! Trait definitions for extensible components
//!
//! These traits allow users to swap the storage backend behind the
//! anti-flood limiter or provide their own.

pub mod counter;

pub use counter::CounterStore;

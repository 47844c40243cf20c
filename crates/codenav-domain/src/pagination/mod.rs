//! Dual-source pagination over uploads and indexes.
//!
//! The "precise index" feed is the union of two record kinds that live in
//! separate stores with their own ordering and state vocabulary. A page is
//! built by fetching one window from each store, merging the two windows by
//! timestamp, and recording in the cursor how far each store has been read.

mod cursor;
mod cursor_proptest;
mod paginator;
mod states;

pub use cursor::{DualCursor, OffsetCursor};
pub use paginator::{DualSourcePaginator, PreciseIndexFilter, PreciseIndexPage, PreciseIndexRow};
pub use states::{backing_state, logical_state, Source, StateSplit};

#[cfg(test)]
mod tests;

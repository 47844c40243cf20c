//! Request scope and the resolvers built on it.
//!
//! A [`RequestScope`] owns the per-request caches. Resolvers created from a
//! scope share those caches, so sibling resolvers batch their backing calls.

mod precise_index;
mod scope;

pub use precise_index::{PageInfo, PreciseIndexConnection, PreciseIndexResolver};
pub use scope::{Backends, RequestScope};

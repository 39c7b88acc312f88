//! Remote versioned store.
//!
//! GitHub is the source of truth for the site config: every version is a
//! commit, and the file's blob sha is the optimistic concurrency token.

mod github;

#[cfg(test)]
pub mod fake;

pub use github::*;

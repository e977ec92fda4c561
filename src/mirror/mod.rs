//! # Mirrors
//!
//! A generic client-side cache of one remote collection, kept consistent
//! with the collection's change feed.
//!
//! - **Cache**: insertion-ordered records and change application
//! - **Mirror**: lifecycle, the feed pump and delegated mutations
//! - **Mutation**: write requests, never applied optimistically

mod cache;
mod config;
mod errors;
#[allow(clippy::module_inception)]
mod mirror;
mod mutation;
mod state;

pub use cache::{Applied, MirrorCache};
pub use config::MirrorConfig;
pub use errors::{MirrorError, MirrorResult};
pub use mirror::{OnChange, RealtimeMirror};
pub use mutation::{Mutation, MutationKind, MutationOutcome};
pub use state::MirrorState;

//! rtmirror - A live client-side mirror of a remote collection
//!
//! A [`RealtimeMirror`] loads a collection from a [`RemoteStore`], follows
//! its change feed, and hands the full snapshot to a callback after every
//! change. Writes are delegated to the store and become visible locally
//! only through the feed.
//!
//! - `record`: the `Record` trait, ids, timestamp coercion, `JsonRecord`
//! - `realtime`: change events, feeds and the in-process `ChangeHub`
//! - `remote`: the `RemoteStore` seam with in-memory and file-backed stores
//! - `mirror`: the mirror itself
//! - `observability`: structured logging and counters
//! - `cli`: the `rtmirror` command line

pub mod cli;
pub mod mirror;
pub mod observability;
pub mod realtime;
pub mod record;
pub mod remote;

pub use mirror::{MirrorConfig, MirrorError, MirrorResult, MirrorState, Mutation, MutationOutcome, RealtimeMirror};
pub use realtime::{Change, ChangeEvent, ChangeFeed, ChangeHub};
pub use record::{JsonRecord, Record, RecordId};
pub use remote::{FetchedCollection, LocalStore, MemoryStore, RemoteError, RemoteStore};

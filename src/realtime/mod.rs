//! # Change Feed
//!
//! Server-to-client change notifications and the in-process hub that
//! sequences and fans them out.
//!
//! ## Architecture
//!
//! - **Event**: `{type: insert|update|delete, record|id}` plus a commit sequence
//! - **Hub**: sequencing and per-collection delivery over unbounded channels
//! - **Feed**: the receiving end handed to a subscriber

pub mod errors;
pub mod event;
pub mod hub;

pub use errors::{RealtimeError, RealtimeResult};
pub use event::{Change, ChangeEvent, EventType};
pub use hub::{ChangeFeed, ChangeHub, DispatchResult, HubConfig};

//! # Records
//!
//! Record identity and the ingestion boundary for mirrored rows.
//!
//! Every row that enters a mirror, whether from the initial fetch or from a
//! change event, passes through [`Record::decode`]. Schema-specific coercion
//! (timestamps in particular) lives there and nowhere else.

pub mod codec;
mod errors;
mod id;
mod json;

pub use errors::{RecordError, RecordResult};
pub use id::RecordId;
pub use json::JsonRecord;

use serde_json::Value;

/// Schema of one mirrored record.
pub trait Record: Clone + Send + Sync + 'static {
    /// Identifier of this record. Unique within a collection.
    fn id(&self) -> RecordId;

    /// Decode a raw row into a typed record.
    fn decode(row: Value) -> RecordResult<Self>;

    /// Encode back into a raw row. Used to merge partial updates.
    fn encode(&self) -> RecordResult<Value>;
}

//! Core data model shared by the tblload crates.
//!
//! - [`Schema`] / [`Column`] / [`ColumnType`]: the ordered, typed description of
//!   one dataset row, derived from the header line.
//! - [`codec`]: fixed-width big-endian integer codecs and the length-prefixed
//!   string codec that together define the on-page record format.
//! - [`record`]: schema-driven record encoding into a bounded [`RecordBuffer`]
//!   and the matching left-to-right decoder.
//! - [`RecordId`]: the opaque locator handed out by the primary store.

#![forbid(unsafe_code)]

pub mod codec;
pub mod ids;
pub mod record;
pub mod schema;

pub use ids::RecordId;
pub use record::{
    DEFAULT_RECORD_CAPACITY, MAX_RECORD_CAPACITY, RecordBuffer, Value, decode_record,
    encode_fixed_field, encode_record,
};
pub use schema::{Column, ColumnType, Schema};

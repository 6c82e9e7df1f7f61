//! Error types and result definitions for the tblload bulk loader.
//!
//! Every crate in the workspace returns [`Result<T>`] and reports failures
//! through the single [`Error`] enum. Nothing below the binary terminates the
//! process; the loader decides whether an error aborts the whole load or only
//! discards the offending row.
//!
//! # Error Categories
//!
//! - **Dataset errors** ([`Error::DatasetUnreadable`], [`Error::LineTooLong`]):
//!   the input file cannot be opened, has no header, or violates line limits
//! - **Row errors** ([`Error::SchemaMismatch`], [`Error::InvalidFieldValue`],
//!   [`Error::EncodingOverflow`]): one data row cannot become a record
//! - **Schema errors** ([`Error::UnknownColumnType`]): the header names a type
//!   outside VARCHAR/INT/LONG
//! - **Collaborator errors** ([`Error::StorageFailure`], [`Error::IndexFailure`]):
//!   the primary store or the secondary index rejected an operation
//! - **Internal errors** ([`Error::Corrupt`], [`Error::Internal`]): on-disk data
//!   or internal state violates an invariant

pub mod error;
pub mod result;

pub use error::Error;
pub use result::Result;

//! Page storage for the tblload record store and index.
//!
//! A [`pager::Pager`] hands out opaque [`types::PhysicalKey`]s and reads or
//! writes whole page payloads in batches. Higher layers decide what a page
//! means; the pager only guarantees that a payload written under a key comes
//! back unchanged until the key is freed.

#![forbid(unsafe_code)]

pub mod constants;
pub mod pager;
pub mod types;

pub use pager::{BatchGet, BatchPut, GetResult, MemPager, Pager, SimdRDrivePager};
pub use types::PhysicalKey;

use crate::types::PhysicalKey;

/// Well-known key for the root (meta) page of every pager.
pub const ROOT_PAGE_PKEY: PhysicalKey = 0;

/// Largest payload a single page can hold.
pub const PAGE_CAPACITY: usize = 4096;

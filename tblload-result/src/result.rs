use crate::error::Error;

/// Result type alias used throughout tblload.
pub type Result<T> = std::result::Result<T, Error>;

//! Crate-wide error type.
//!
//! Only *fatal* errors cross the [`crate::pipeline::build_booklet`] boundary:
//! malformed metadata and serialization failures. Asset-level errors (a bad
//! background, a question image that will not embed, a watermark that will
//! not decode) are caught where they occur and converted into visual
//! fallbacks, so they appear here only as intermediate values.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// The caller handed over metadata missing required structure.
    #[error("invalid metadata: {0}")]
    InvalidMetadata(String),

    /// An asset could not be fetched from its source.
    #[error("asset fetch failed for '{path}': {reason}")]
    AssetFetch { path: String, reason: String },

    /// Image bytes could not be decoded or embedded.
    #[error("image decode failed: {0}")]
    ImageDecode(String),

    /// An asset source string is not a fetchable URL or a base64 data URI.
    #[error("unsupported asset source: {0}")]
    UnsupportedSource(String),
}

pub type Result<T> = std::result::Result<T, Error>;

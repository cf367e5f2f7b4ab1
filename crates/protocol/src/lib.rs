//! Wire types for the cloud storage open API.
//!
//! Every JSON response carries a status header ([`Envelope`]); payload
//! types live in [`messages`] and the small enumerations used as request
//! parameters live in [`types`].

pub mod endpoints;
pub mod envelope;
pub mod messages;
pub mod types;

pub use envelope::{ApiStatus, Envelope};
pub use types::{ConflictPolicy, FileOperation, OnDuplicate, UploadMode};

/// Length of the leading slice hashed for duplicate detection (256 KiB).
pub const SLICE_HASH_LEN: u64 = 256 * 1024;

//! Integrity model: which bytes of a local file still need fetching.
//!
//! - `range`: inclusive byte ranges
//! - `checksum`: MD5 / SHA-256 digests of files and buffers
//! - `container`: zip and gzip self-checks
//! - `record`: [`ValidationRecord`] and the signature it is keyed on
//! - `validator`: [`validate`], the comparison itself

pub mod checksum;
pub mod container;
mod error;
pub mod range;
mod record;
mod validator;

pub use error::{IntegrityError, IntegrityResult};
pub use range::ByteRange;
pub use record::{FileKey, Signature, ValidationRecord};
pub use validator::{validate, FileStatus, Inconsistency, Validation};

//! Common utilities and types shared across the picbed crates.
//!
//! This module provides the error taxonomy every upload strategy reports
//! through, the immutable request types handed to a strategy, and the clock
//! and secret wrappers used by the signing code.

pub mod clock;
pub mod error;
pub mod types;

pub use clock::{Clock, FixedClock, SystemClock};
pub use error::{Error, Result};
pub use types::{Secret, UploadFile, UploadRequest};

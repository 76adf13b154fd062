//! Domain model for the pre-flight gate: worker identity, version buckets,
//! and the error taxonomy shared by every check stage.

pub mod error;
pub mod version;
pub mod worker;

pub use error::{GateError, Result, SessionError};
pub use version::{SubsystemKind, VersionId, VersionMap};
pub use worker::Worker;

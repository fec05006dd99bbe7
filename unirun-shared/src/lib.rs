//! Types shared between the unirun library and its binaries.

pub mod errors;

pub use errors::{UnirunError, UnirunResult};

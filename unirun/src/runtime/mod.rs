//! Runner configuration: well-known paths and command-line options.

pub mod constants;
pub mod options;

pub use options::RunnerOptions;

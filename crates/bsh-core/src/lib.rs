#![deny(missing_docs)]
#![doc = "Core data types and the error surface shared by the bsh benchmark sweep harness."]

pub mod errors;
mod types;

pub use errors::{BshError, ErrorInfo};
pub use types::{ConfigurationPoint, RunResult};

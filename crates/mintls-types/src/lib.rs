#![forbid(unsafe_code)]
#![doc = "Error types and alert codes shared by the mintls crates."]

pub mod alert;
pub mod error;

pub use alert::*;
pub use error::*;

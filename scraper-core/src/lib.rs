//! Types and errors shared by the scraper crates.

pub mod error;
pub mod error_utils;
pub mod types;

pub use error::*;
pub use error_utils::*;
pub use types::*;

//! Types shared by the TrendMiner notebook launcher crates

mod error;
mod secret;

pub use error::{Error, Result};
pub use secret::Secret;

//! Common types for oauth2token

mod secret;
mod error;

pub use secret::Secret;
pub use error::{Error, Result};

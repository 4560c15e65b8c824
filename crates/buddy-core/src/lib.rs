pub mod config;
pub mod error;
pub mod personality;
pub mod source;
pub mod traits;
pub mod types;

pub use error::{Error, Result};
pub use personality::Personality;

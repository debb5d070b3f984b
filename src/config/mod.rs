//! Configuration loading and validation
//!
//! Settings are sourced from the environment (see `load`) and validated at
//! startup; configuration problems are the only fatal errors in the crate.

mod load;
mod types;
mod validation;

pub use load::load_settings;
pub use types::{DelayBand, Settings};
pub use validation::validate;

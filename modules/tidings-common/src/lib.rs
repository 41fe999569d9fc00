pub mod config;
pub mod engagement;
pub mod error;
pub mod types;

pub use config::Config;
pub use engagement::*;
pub use error::{FaultKind, StageFault, TidingsError};
pub use types::*;

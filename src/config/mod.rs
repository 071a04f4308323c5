pub mod defaults;
pub mod loader;
pub mod types;

pub use defaults::{default_environment_rules, DEFAULT_REGION};
pub use loader::ConfigLoader;
pub use types::*;

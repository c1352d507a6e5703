//! Configuration loading for restart policies

mod loader;

pub use loader::{ConfigLoader, CONFIG_FILE_NAME, ENV_DELAY_MS, ENV_MAX_ATTEMPTS};

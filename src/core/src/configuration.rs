pub mod config;
pub mod types;

pub use config::{Config, ConfigOverrides, DEFAULT_CONFIG_PATH};
pub use types::FileConfig;

//! Property handler chain: environment, configuration store, vault
//! references and the TTL cache decorator.

pub mod app_config;
pub mod cache_handler;
pub mod env_handler;
pub mod env_vault_handler;
pub mod handler;
pub mod vault;

pub use app_config::{AppConfigPropertyHandler, AppConfigSettings};
pub use cache_handler::CachePropertyHandler;
pub use env_handler::EnvPropertyHandler;
pub use env_vault_handler::VaultEnvPropertyHandler;
pub use handler::PropertyHandler;
pub use vault::Vault;

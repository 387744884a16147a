pub mod builder;
pub mod proc_loader;
pub mod proc_validator;
pub mod settings;
pub mod types;

pub use builder::build_configuration;
pub use proc_loader::file_to_config;
pub use types::ServiceConfig;

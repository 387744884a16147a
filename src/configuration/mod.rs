pub mod configuration;
pub mod environment;
pub mod lifecycle;

pub use configuration::Configuration;
pub use environment::{build_client, Environment};
pub use lifecycle::{Lifecycle, LifecycleState};

use anyhow::{anyhow, Result};
use std::path::Path;

use crate::config::proc_loader::file_to_config;
use crate::config::types::ServiceConfig;

pub fn run(config_path: &str) -> Result<ServiceConfig> {
    let path = Path::new(config_path);
    file_to_config(path).map_err(|e| anyhow!("Invalid config format: {}", e))
}

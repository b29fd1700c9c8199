use crate::app::context::StartupContext;
use crate::core::config_manager::ConfigManager;
use crate::core::pipeline::BlockingTask;
use anyhow::{Error, anyhow};
use std::sync::Arc;

/// Loads and validates the local config file. Runs before logging is
/// configured, so progress goes to stdout.
pub struct ConfigLoadTask {
    manager: Arc<ConfigManager>,
}

impl ConfigLoadTask {
    pub fn new(manager: Arc<ConfigManager>) -> Self {
        Self { manager }
    }
}

impl BlockingTask<StartupContext, Error> for ConfigLoadTask {
    fn run(&self, context: &StartupContext) -> Result<(), Error> {
        self.manager.start()?;

        println!("Config loaded");

        context
            .config_manager
            .set(self.manager.clone())
            .map_err(|_| anyhow!("Config manager already set on startup context"))
    }
}

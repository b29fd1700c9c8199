use crate::app::context::StartupContext;
use crate::core::observability;
use crate::core::pipeline::BlockingTask;
use anyhow::{Error, anyhow};
use tracing::info;

pub struct ConfigureObservabilityTask;

impl BlockingTask<StartupContext, Error> for ConfigureObservabilityTask {
    fn run(&self, context: &StartupContext) -> Result<(), Error> {
        let config = context.config()?;

        // a provider is returned if otel export is configured
        // but observability may still have valid logging etc
        if let Some(providers) = observability::init(&config.logging)? {
            context
                .observability
                .set(providers)
                .map_err(|_| anyhow!("Observability context already initialized"))?
        }

        info!("Hello world! Observability configured");

        Ok(())
    }
}

mod app;
mod core;

use crate::app::context::StartupContext;
use crate::app::shutdown::build_shutdown_pipeline;
use crate::app::startup::build_start_pipeline;
use actix_web::rt::signal;
use mimalloc::MiMalloc;
use std::path::PathBuf;
use tracing::info;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    let cfg_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("rdsp.yaml"));

    let startup_pipeline = build_start_pipeline(cfg_path)?;
    let startup_ctx = StartupContext::default();

    match startup_pipeline.run(&startup_ctx).await {
        Ok(_) => info!("Startup successful"),
        Err(e) => {
            eprintln!("Startup failed: {:#}", e);
            return Err(e);
        }
    }

    let shutdown_pipeline = build_shutdown_pipeline()?;

    signal::ctrl_c().await?;

    shutdown_pipeline.run(&startup_ctx).await?;
    info!("Shutdown successful");

    Ok(())
}

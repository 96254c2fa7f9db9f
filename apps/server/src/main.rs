use mines_server::prelude::*;
use mines_telemetry::init_tracing;
use tracing::{error, info};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    init_tracing("mines-server");

    let runtime = tokio::runtime::Builder::new_multi_thread().enable_all().build()?;

    runtime.block_on(async {
        let config = ServerConfig::from_env().unwrap_or_else(|source| {
            error!(%source, "invalid startup configuration");
            std::process::exit(1);
        });

        info!(bind_addr = %config.bind_addr, "starting");

        let kernel = ServerKernel::ignite(&config).await;
        kernel.serve().await;
    });

    Ok(())
}

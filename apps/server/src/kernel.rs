//! Composition root: wires configuration, persistence, and the HTTP
//! transport together, then serves until the process is asked to stop.

use std::net::SocketAddr;

use mines_db::{CellRepository, DbClient, PlayerRepository};
use tracing::{error, info, instrument};

use crate::config::ServerConfig;
use crate::routes::build_router;
use crate::services::spawn_reaper;
use crate::state::AppState;

pub struct ServerKernel {
    bind_addr: SocketAddr,
    state: AppState,
}

impl ServerKernel {
    #[instrument(skip(config))]
    pub async fn ignite(config: &ServerConfig) -> Self {
        let client = DbClient::connect(&config.database_url, config.database_auth_token.clone())
            .await
            .expect("FATAL: could not establish the persistence layer. Aborting ignition.");

        let cells = CellRepository::new(client.clone());
        let players = PlayerRepository::new(client);

        let bind_addr: SocketAddr = config
            .bind_addr
            .parse()
            .unwrap_or_else(|_| panic!("invalid BIND_ADDR: {}", config.bind_addr));

        Self {
            bind_addr,
            state: AppState::new(config, cells, players),
        }
    }

    pub async fn serve(self) {
        spawn_reaper(self.state.clone());

        let router = build_router(self.state);

        info!(bind_addr = %self.bind_addr, "listening");

        let listener = tokio::net::TcpListener::bind(self.bind_addr)
            .await
            .expect("failed to bind the configured address");

        if let Err(source) = axum::serve(listener, router).await {
            error!(%source, "server loop terminated unexpectedly");
            std::process::exit(1);
        }
    }
}

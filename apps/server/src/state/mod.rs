//! Process-wide shared state: an explicit handle created at startup
//! and passed by reference to every component that needs it — no
//! ambient singletons.

pub mod registry;

pub use registry::{SessionHandle, SessionRegistry, TransportId};

use std::sync::Arc;

use mines_db::{CellRepository, PlayerRepository};
use mines_oracle::{MapDimensions, Oracle};

use crate::config::ServerConfig;
use crate::engine::CellStateEngine;

#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<SessionRegistry>,
    pub engine: Arc<CellStateEngine>,
    pub cells: CellRepository,
    pub players: PlayerRepository,
}

impl AppState {
    pub fn new(config: &ServerConfig, cells: CellRepository, players: PlayerRepository) -> Self {
        let oracle = Oracle::new(
            config.map_seed.clone(),
            MapDimensions::new(mines_models::MAP_WIDTH, mines_models::MAP_HEIGHT),
        );
        let engine = CellStateEngine::new(oracle, cells.clone());

        Self {
            registry: Arc::new(SessionRegistry::new()),
            engine: Arc::new(engine),
            cells,
            players,
        }
    }
}

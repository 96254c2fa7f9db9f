//! Connection Lifecycle: on-connect snapshot assembly and join
//! announcement, on-disconnect cleanup and leave announcement. Depends
//! on the registry, the repositories, and a broadcaster — never the
//! dispatcher, so connection bookkeeping never needs to know about
//! in-session action routing.

use mines_db::{CellRepository, DbError, PlayerRepository};
use mines_models::{
    MapChunk, PlayerRef, Region, SelfPosition, ServerMessage, VIEWPORT_RADIUS_X, VIEWPORT_RADIUS_Y,
};
use tracing::{info, instrument};

use crate::services::broadcaster::RegionBroadcaster;
use crate::state::{SessionRegistry, TransportId};

pub struct ConnectionLifecycle<'a> {
    registry: &'a SessionRegistry,
    cells: &'a CellRepository,
    players: &'a PlayerRepository,
}

impl<'a> ConnectionLifecycle<'a> {
    pub fn new(registry: &'a SessionRegistry, cells: &'a CellRepository, players: &'a PlayerRepository) -> Self {
        Self { registry, cells, players }
    }

    /// Mints a session, assembles the initial snapshot, sends it to
    /// the new connection, then announces the join to nearby sessions.
    #[instrument(skip(self, sender))]
    pub async fn on_connect(
        &self,
        transport_id: TransportId,
        player_id: String,
        sender: tokio::sync::mpsc::Sender<ServerMessage>,
    ) -> Result<(), DbError> {
        let player = self.players.find_or_create(&player_id).await?;
        let (x, y) = self.registry.add(transport_id, player_id.clone(), sender.clone());

        let region = Region::viewport(x, y, VIEWPORT_RADIUS_X, VIEWPORT_RADIUS_Y, mines_models::MAP_WIDTH, mines_models::MAP_HEIGHT);

        let cells = self
            .cells
            .get_cells_in_region(region)
            .await?
            .into_iter()
            .map(mines_models::CellRecord::to_wire)
            .collect();

        let players = self
            .registry
            .sessions_in_region(region, Some(&player_id))
            .into_iter()
            .map(|session| PlayerRef { id: session.player_id, x: session.x, y: session.y })
            .collect();

        let initial_state = ServerMessage::InitialState {
            player_id: player_id.clone(),
            score: player.score,
            map_chunk: MapChunk { cells },
            players,
            self_position: SelfPosition { x, y },
        };

        let _ = sender.try_send(initial_state);

        info!(player_id, x, y, "player joined");

        let broadcaster = RegionBroadcaster::new(self.registry);
        broadcaster
            .broadcast(region, ServerMessage::PlayerJoined { id: player_id.clone(), x, y }, Some(&player_id))
            .await;

        Ok(())
    }

    /// Captures the last cursor, detaches the session, refreshes
    /// `lastSeen`, and announces the departure centred on that cursor.
    #[instrument(skip(self))]
    pub async fn on_disconnect(&self, transport_id: TransportId) -> Result<(), DbError> {
        let Some((player_id, x, y)) = self.registry.remove(transport_id) else {
            return Ok(());
        };

        self.players.touch(&player_id).await?;

        let region = Region::viewport(x, y, VIEWPORT_RADIUS_X, VIEWPORT_RADIUS_Y, mines_models::MAP_WIDTH, mines_models::MAP_HEIGHT);
        let broadcaster = RegionBroadcaster::new(self.registry);
        broadcaster.broadcast(region, ServerMessage::PlayerLeft { id: player_id.clone() }, None).await;

        info!(player_id, "player left");
        Ok(())
    }
}

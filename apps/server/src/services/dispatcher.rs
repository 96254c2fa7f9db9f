//! Action Dispatcher: the single entry point for every inbound client
//! message. Validates bounds, drives the engine, updates the registry's
//! cached score, and sends the right mix of direct replies and region
//! broadcasts. Never touches the socket directly — the handler owns
//! the wire.

use std::time::Duration;

use mines_db::{DbError, PlayerRepository};
use mines_models::{
    ClientMessage, PlayerRef, Region, ServerMessage, MAP_HEIGHT, MAP_WIDTH, VIEWPORT_RADIUS_X,
    VIEWPORT_RADIUS_Y,
};
use tracing::{error, instrument, warn};

use crate::engine::{CellStateEngine, FlagOutcome, RevealOutcome};
use crate::services::broadcaster::RegionBroadcaster;
use crate::state::SessionRegistry;

const MAX_DB_RETRIES: u32 = 3;
const DB_RETRY_DELAY: Duration = Duration::from_millis(25);

pub struct ActionDispatcher<'a> {
    registry: &'a SessionRegistry,
    engine: &'a CellStateEngine,
    players: &'a PlayerRepository,
}

impl<'a> ActionDispatcher<'a> {
    pub fn new(registry: &'a SessionRegistry, engine: &'a CellStateEngine, players: &'a PlayerRepository) -> Self {
        Self { registry, engine, players }
    }

    /// Routes one decoded message for `player_id`. Out-of-bounds
    /// coordinates on `clickCell`/`flagCell` get a single `error` reply
    /// rather than a dropped connection — a client bug shouldn't cost
    /// the player their session. `lastSeen` is refreshed on every
    /// inbound message, not just the ones that mutate the map.
    #[instrument(skip(self, message))]
    pub async fn dispatch(&self, player_id: &str, message: ClientMessage) {
        if let Err(source) = self.players.touch(player_id).await {
            self.handle_db_failure(player_id, &source);
        }

        let broadcaster = RegionBroadcaster::new(self.registry);

        match message {
            ClientMessage::ClickCell { x, y } => {
                if !in_bounds(x, y) {
                    broadcaster.send_to(player_id, out_of_bounds_error()).await;
                    return;
                }
                self.handle_reveal(player_id, x, y, &broadcaster).await;
            }
            ClientMessage::FlagCell { x, y } => {
                if !in_bounds(x, y) {
                    broadcaster.send_to(player_id, out_of_bounds_error()).await;
                    return;
                }
                self.handle_flag(player_id, x, y, &broadcaster).await;
            }
            ClientMessage::UpdatePosition { x, y } => {
                self.handle_update_position(player_id, x, y, &broadcaster).await;
            }
        }
    }

    /// A database error ends the session outright when it's `Fatal` —
    /// evicting the player drops the registry's clone of their outbound
    /// sender, which is the connection's only live sender, so the
    /// socket's downstream task observes a closed channel and the
    /// connection unwinds on its own. Anything else is logged and left
    /// to the caller to report to the player.
    fn handle_db_failure(&self, player_id: &str, source: &DbError) {
        if matches!(source, DbError::Fatal(_)) {
            error!(player_id, %source, "fatal persistence failure, terminating session");
            self.registry.evict(player_id);
        } else {
            warn!(player_id, %source, "persistence operation failed");
        }
    }

    async fn reveal_with_retry(&self, player_id: &str, x: i64, y: i64) -> Result<RevealOutcome, DbError> {
        let mut attempt = 0;
        loop {
            match self.engine.reveal(player_id, x, y).await {
                Ok(outcome) => return Ok(outcome),
                Err(source) if source.is_retryable() && attempt < MAX_DB_RETRIES => {
                    attempt += 1;
                    warn!(player_id, attempt, %source, "retrying reveal after transient persistence failure");
                    tokio::time::sleep(DB_RETRY_DELAY * attempt).await;
                }
                Err(source) => return Err(source),
            }
        }
    }

    async fn toggle_flag_with_retry(&self, player_id: &str, x: i64, y: i64) -> Result<FlagOutcome, DbError> {
        let mut attempt = 0;
        loop {
            match self.engine.toggle_flag(x, y).await {
                Ok(outcome) => return Ok(outcome),
                Err(source) if source.is_retryable() && attempt < MAX_DB_RETRIES => {
                    attempt += 1;
                    warn!(player_id, attempt, %source, "retrying flag toggle after transient persistence failure");
                    tokio::time::sleep(DB_RETRY_DELAY * attempt).await;
                }
                Err(source) => return Err(source),
            }
        }
    }

    async fn add_to_score_with_retry(&self, player_id: &str, delta: i64) -> Result<i64, DbError> {
        let mut attempt = 0;
        loop {
            match self.players.add_to_score(player_id, delta).await {
                Ok(score) => return Ok(score),
                Err(source) if source.is_retryable() && attempt < MAX_DB_RETRIES => {
                    attempt += 1;
                    warn!(player_id, attempt, %source, "retrying score update after transient persistence failure");
                    tokio::time::sleep(DB_RETRY_DELAY * attempt).await;
                }
                Err(source) => return Err(source),
            }
        }
    }

    async fn handle_reveal(&self, player_id: &str, x: i64, y: i64, broadcaster: &RegionBroadcaster<'_>) {
        let outcome = match self.reveal_with_retry(player_id, x, y).await {
            Ok(outcome) => outcome,
            Err(source) => {
                self.handle_db_failure(player_id, &source);
                broadcaster.send_to(player_id, server_error()).await;
                return;
            }
        };

        let (score_delta, cells, penalty) = match outcome {
            RevealOutcome::Ignored => return,
            RevealOutcome::Safe { score_delta, cells } => (score_delta, cells, None),
            RevealOutcome::MineHit { score_delta, stun_ms, cells } => (score_delta, cells, Some(stun_ms)),
        };

        let score = match self.add_to_score_with_retry(player_id, score_delta).await {
            Ok(score) => score,
            Err(source) => {
                self.handle_db_failure(player_id, &source);
                return;
            }
        };
        self.registry.update_cached_score(player_id, score);

        if let Some(stun_ms) = penalty {
            broadcaster.send_to(player_id, ServerMessage::PlayerPenalty { score, stun_duration_ms: stun_ms }).await;
        } else {
            broadcaster.send_to(player_id, ServerMessage::ScoreUpdate { score }).await;
        }

        let region = event_viewport(x, y);
        broadcaster.broadcast(region, ServerMessage::MapUpdate { cells }, None).await;
    }

    async fn handle_flag(&self, player_id: &str, x: i64, y: i64, broadcaster: &RegionBroadcaster<'_>) {
        let outcome = match self.toggle_flag_with_retry(player_id, x, y).await {
            Ok(outcome) => outcome,
            Err(source) => {
                self.handle_db_failure(player_id, &source);
                broadcaster.send_to(player_id, server_error()).await;
                return;
            }
        };

        let cell = match outcome {
            FlagOutcome::Ignored => return,
            FlagOutcome::Flagged { cell } | FlagOutcome::Unflagged { cell } => cell,
        };

        let region = event_viewport(x, y);
        broadcaster.broadcast(region, ServerMessage::MapUpdate { cells: vec![cell] }, None).await;
    }

    async fn handle_update_position(&self, player_id: &str, x: f64, y: f64, broadcaster: &RegionBroadcaster<'_>) {
        self.registry.update_cursor(player_id, x, y);
        let Some((cx, cy)) = self.registry.cursor(player_id) else {
            return;
        };

        let region = Region::viewport(cx, cy, VIEWPORT_RADIUS_X, VIEWPORT_RADIUS_Y, MAP_WIDTH, MAP_HEIGHT);
        let players = vec![PlayerRef { id: player_id.to_string(), x: cx, y: cy }];
        broadcaster
            .broadcast(region, ServerMessage::PlayerPositionUpdate { players }, Some(player_id))
            .await;
    }
}

fn in_bounds(x: i64, y: i64) -> bool {
    (0..MAP_WIDTH).contains(&x) && (0..MAP_HEIGHT).contains(&y)
}

fn out_of_bounds_error() -> ServerMessage {
    ServerMessage::Error { message: "coordinates out of bounds".to_string() }
}

fn server_error() -> ServerMessage {
    ServerMessage::Error { message: "internal error processing request".to_string() }
}

/// Scopes a map mutation broadcast to the viewport radius around the
/// affected cell, not the acting player's own cursor — flood fill can
/// reach well past where the click originated.
fn event_viewport(x: i64, y: i64) -> Region {
    Region::viewport(x, y, VIEWPORT_RADIUS_X, VIEWPORT_RADIUS_Y, MAP_WIDTH, MAP_HEIGHT)
}

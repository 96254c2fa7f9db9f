//! In-memory tracking of connected players: the only shared mutable
//! state in the process. Two maps kept in lockstep under one
//! `RwLock` each, queried with a linear scan — acceptable at the
//! hundreds-to-low-thousands scale this server targets; an index
//! would only earn its complexity past that.

use mines_models::{Region, ServerMessage, MAP_HEIGHT, MAP_WIDTH};
use std::collections::HashMap;
use std::sync::RwLock;
use tokio::sync::mpsc;
use tracing::{debug, warn};
use uuid::Uuid;

/// Identifies one physical connection, independent of the player id it
/// is currently bound to. There is no reconnection yet, so the two
/// stay paired for the connection's whole lifetime, but keeping them
/// distinct leaves room for that later without reshaping the registry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TransportId(Uuid);

impl TransportId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for TransportId {
    fn default() -> Self {
        Self::new()
    }
}

struct Session {
    transport_id: TransportId,
    sender: mpsc::Sender<ServerMessage>,
    x: i64,
    y: i64,
    cached_score: i64,
}

/// A read-only projection of a session, safe to hand out beyond the
/// registry's locks.
#[derive(Clone, Debug)]
pub struct SessionHandle {
    pub player_id: String,
    pub x: i64,
    pub y: i64,
    pub sender: mpsc::Sender<ServerMessage>,
}

pub struct SessionRegistry {
    sessions: RwLock<HashMap<String, Session>>,
    transports: RwLock<HashMap<TransportId, String>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            transports: RwLock::new(HashMap::new()),
        }
    }

    /// Registers a new session at the map centre, the fixed initial
    /// cursor every connection starts at. Returns the session's
    /// starting position so the caller can assemble the initial
    /// snapshot around it.
    pub fn add(&self, transport_id: TransportId, player_id: String, sender: mpsc::Sender<ServerMessage>) -> (i64, i64) {
        let x = MAP_WIDTH / 2;
        let y = MAP_HEIGHT / 2;

        let session = Session {
            transport_id,
            sender,
            x,
            y,
            cached_score: 0,
        };

        self.sessions.write().expect("session registry poisoned").insert(player_id.clone(), session);
        self.transports.write().expect("transport registry poisoned").insert(transport_id, player_id);

        (x, y)
    }

    /// Detaches both mappings and returns the departing player's last
    /// known cursor, used to centre the `playerLeft` broadcast.
    pub fn remove(&self, transport_id: TransportId) -> Option<(String, i64, i64)> {
        let player_id = self
            .transports
            .write()
            .expect("transport registry poisoned")
            .remove(&transport_id)?;

        let session = self.sessions.write().expect("session registry poisoned").remove(&player_id);
        session.map(|session| (player_id, session.x, session.y))
    }

    pub fn update_cursor(&self, player_id: &str, x: f64, y: f64) {
        let clamped_x = clamp_wrapping(x, MAP_WIDTH);
        let clamped_y = clamp_wrapping(y, MAP_HEIGHT);

        if let Some(session) = self.sessions.write().expect("session registry poisoned").get_mut(player_id) {
            session.x = clamped_x;
            session.y = clamped_y;
        } else {
            warn!(player_id, "update_cursor on unknown session");
        }
    }

    pub fn update_cached_score(&self, player_id: &str, score: i64) {
        if let Some(session) = self.sessions.write().expect("session registry poisoned").get_mut(player_id) {
            session.cached_score = score;
        }
    }

    pub fn cursor(&self, player_id: &str) -> Option<(i64, i64)> {
        self.sessions
            .read()
            .expect("session registry poisoned")
            .get(player_id)
            .map(|session| (session.x, session.y))
    }

    pub fn lookup(&self, transport_id: TransportId) -> Option<String> {
        self.transports.read().expect("transport registry poisoned").get(&transport_id).cloned()
    }

    pub fn sender_for(&self, player_id: &str) -> Option<mpsc::Sender<ServerMessage>> {
        self.sessions
            .read()
            .expect("session registry poisoned")
            .get(player_id)
            .map(|session| session.sender.clone())
    }

    /// Every session whose cursor falls inside `region`, wrap-aware,
    /// excluding `exclude` (typically the originating player) when set.
    pub fn sessions_in_region(&self, region: Region, exclude: Option<&str>) -> Vec<SessionHandle> {
        self.sessions
            .read()
            .expect("session registry poisoned")
            .iter()
            .filter(|(player_id, session)| {
                exclude != Some(player_id.as_str()) && region.contains(session.x, session.y)
            })
            .map(|(player_id, session)| SessionHandle {
                player_id: player_id.clone(),
                x: session.x,
                y: session.y,
                sender: session.sender.clone(),
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.sessions.read().expect("session registry poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Belt-and-braces sweep for sessions whose outbound receiver has
    /// already been dropped but that never hit a `try_send` to trigger
    /// the immediate eviction path — e.g. a connection that closed
    /// without ever receiving another broadcast. Returns the count
    /// purged.
    pub fn purge_dead(&self) -> usize {
        let dead: Vec<String> = self
            .sessions
            .read()
            .expect("session registry poisoned")
            .iter()
            .filter(|(_, session)| session.sender.is_closed())
            .map(|(player_id, _)| player_id.clone())
            .collect();

        for player_id in &dead {
            self.evict(player_id);
        }
        dead.len()
    }

    /// Drops a session whose outbound channel has been found dead,
    /// without waiting for the connection's own read loop to notice.
    pub fn evict(&self, player_id: &str) {
        let transport_id = self
            .sessions
            .read()
            .expect("session registry poisoned")
            .get(player_id)
            .map(|session| session.transport_id);

        if let Some(transport_id) = transport_id {
            self.transports.write().expect("transport registry poisoned").remove(&transport_id);
        }
        self.sessions.write().expect("session registry poisoned").remove(player_id);
        debug!(player_id, "evicted session with a saturated outbound channel");
    }
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// `updatePosition` accepts any numeric input; this is the one place
/// that clamps it onto the torus. Non-finite input (NaN, ±inf) is
/// folded to 0 rather than propagated into modular arithmetic.
fn clamp_wrapping(value: f64, modulus: i64) -> i64 {
    if !value.is_finite() {
        return 0;
    }
    let truncated = value.trunc() as i64;
    ((truncated % modulus) + modulus) % modulus
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sender() -> mpsc::Sender<ServerMessage> {
        mpsc::channel(8).0
    }

    #[test]
    fn add_places_session_at_map_centre() {
        let registry = SessionRegistry::new();
        let (x, y) = registry.add(TransportId::new(), "p1".into(), sender());
        assert_eq!((x, y), (MAP_WIDTH / 2, MAP_HEIGHT / 2));
    }

    #[test]
    fn remove_detaches_both_maps() {
        let registry = SessionRegistry::new();
        let transport = TransportId::new();
        registry.add(transport, "p1".into(), sender());
        let (player_id, ..) = registry.remove(transport).unwrap();
        assert_eq!(player_id, "p1");
        assert!(registry.lookup(transport).is_none());
        assert!(registry.is_empty());
    }

    #[test]
    fn cursor_clamps_with_wraparound() {
        let registry = SessionRegistry::new();
        registry.add(TransportId::new(), "p1".into(), sender());
        registry.update_cursor("p1", -1.0, MAP_HEIGHT as f64 + 5.0);
        assert_eq!(registry.cursor("p1"), Some((MAP_WIDTH - 1, 5)));
    }

    #[test]
    fn sessions_in_region_excludes_requested_id() {
        let registry = SessionRegistry::new();
        registry.add(TransportId::new(), "a".into(), sender());
        registry.add(TransportId::new(), "b".into(), sender());
        registry.update_cursor("a", 100.0, 100.0);
        registry.update_cursor("b", 101.0, 101.0);

        let region = Region::new(90, 110, 90, 110);
        let found = registry.sessions_in_region(region, Some("a"));
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].player_id, "b");
    }
}

//! Region Broadcaster: fans a single message out to every session whose
//! cursor intersects a region. Delivery failure on one recipient is
//! recorded and the session is scheduled for eviction; it never aborts
//! the rest of the fan-out.

use mines_models::{Region, ServerMessage};
use tracing::{debug, warn};

use crate::state::SessionRegistry;

pub struct RegionBroadcaster<'a> {
    registry: &'a SessionRegistry,
}

impl<'a> RegionBroadcaster<'a> {
    pub fn new(registry: &'a SessionRegistry) -> Self {
        Self { registry }
    }

    /// Serialises intent once (the message is cloned per recipient,
    /// cheap relative to the socket write it feeds) then delivers to
    /// every session whose cursor lies inside `region`.
    pub async fn broadcast(&self, region: Region, message: ServerMessage, exclude: Option<&str>) {
        let recipients = self.registry.sessions_in_region(region, exclude);
        if recipients.is_empty() {
            return;
        }

        debug!(recipients = recipients.len(), "broadcasting to region");

        for recipient in recipients {
            // A bounded channel that's full means the recipient's own
            // task is backed up; dropping it rather than awaiting keeps
            // one slow client from stalling everyone else's broadcast.
            if recipient.sender.try_send(message.clone()).is_err() {
                warn!(player_id = %recipient.player_id, "outbound channel saturated or closed, evicting");
                self.registry.evict(&recipient.player_id);
            }
        }
    }

    /// Delivers to exactly one player by id, used for originator-only
    /// replies (`scoreUpdate`, `playerPenalty`, `error`).
    pub async fn send_to(&self, player_id: &str, message: ServerMessage) {
        let Some(sender) = self.registry.sender_for(player_id) else {
            return;
        };
        if sender.try_send(message).is_err() {
            warn!(player_id, "outbound channel saturated or closed, evicting");
            self.registry.evict(player_id);
        }
    }
}

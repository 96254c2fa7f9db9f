use chrono::{DateTime, Utc};

/// A persisted player: opaque server-minted id, signed score, last-seen
/// timestamp.
#[derive(Clone, Debug, PartialEq)]
pub struct Player {
    pub id: String,
    pub score: i64,
    pub last_seen: DateTime<Utc>,
}

impl Player {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            score: 0,
            last_seen: Utc::now(),
        }
    }
}

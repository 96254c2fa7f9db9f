//! Durable CRUD over `players`: score and last-seen bookkeeping.

use crate::client::DbClient;
use crate::errors::DbError;
use chrono::{DateTime, Utc};
use libsql::params;
use mines_models::Player;
use tracing::instrument;

#[derive(Clone)]
pub struct PlayerRepository {
    client: DbClient,
}

impl PlayerRepository {
    pub fn new(client: DbClient) -> Self {
        Self { client }
    }

    /// Idempotent: inserts a fresh zero-score player on first sight,
    /// otherwise refreshes `last_seen` and returns the existing row.
    #[instrument(skip(self))]
    pub async fn find_or_create(&self, player_id: &str) -> Result<Player, DbError> {
        let connection = self.client.get_connection()?;
        connection
            .execute(
                "INSERT INTO players (player_id, score, last_seen)
                 VALUES (?1, 0, CURRENT_TIMESTAMP)
                 ON CONFLICT(player_id) DO UPDATE SET last_seen = CURRENT_TIMESTAMP",
                params![player_id],
            )
            .await?;

        let mut rows = connection
            .query(
                "SELECT player_id, score, last_seen FROM players WHERE player_id = ?1",
                params![player_id],
            )
            .await?;

        let row = rows
            .next()
            .await?
            .ok_or_else(|| DbError::Fatal(format!("player {player_id} vanished after upsert")))?;
        row_to_player(row)
    }

    /// Atomic arithmetic increment; returns the new total so callers
    /// can refresh a cached score from the source of truth instead of
    /// guessing at the pre-action value.
    #[instrument(skip(self))]
    pub async fn add_to_score(&self, player_id: &str, delta: i64) -> Result<i64, DbError> {
        let connection = self.client.get_connection()?;
        connection
            .execute(
                "UPDATE players SET score = score + ?2 WHERE player_id = ?1",
                params![player_id, delta],
            )
            .await?;

        let mut rows = connection
            .query("SELECT score FROM players WHERE player_id = ?1", params![player_id])
            .await?;
        let row = rows
            .next()
            .await?
            .ok_or_else(|| DbError::Fatal(format!("player {player_id} missing after score update")))?;
        let score: i64 = row.get(0)?;
        Ok(score)
    }

    #[instrument(skip(self))]
    pub async fn touch(&self, player_id: &str) -> Result<(), DbError> {
        let connection = self.client.get_connection()?;
        connection
            .execute(
                "UPDATE players SET last_seen = CURRENT_TIMESTAMP WHERE player_id = ?1",
                params![player_id],
            )
            .await?;
        Ok(())
    }
}

fn row_to_player(row: libsql::Row) -> Result<Player, DbError> {
    let id: String = row.get(0)?;
    let score: i64 = row.get(1)?;
    let last_seen_raw: String = row.get(2)?;
    let last_seen = parse_timestamp(&last_seen_raw)?;
    Ok(Player { id, score, last_seen })
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, DbError> {
    for format in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S%.fZ"] {
        if let Ok(naive) = chrono::NaiveDateTime::parse_from_str(raw, format) {
            return Ok(DateTime::from_naive_utc_and_offset(naive, Utc));
        }
    }
    raw.parse::<DateTime<Utc>>()
        .map_err(|source| DbError::Fatal(format!("unparseable timestamp {raw}: {source}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn repo() -> PlayerRepository {
        let client = DbClient::connect(":memory:?cache=shared", None).await.unwrap();
        PlayerRepository::new(client)
    }

    #[tokio::test]
    async fn find_or_create_is_idempotent() {
        let repo = repo().await;
        let first = repo.find_or_create("player-a").await.unwrap();
        assert_eq!(first.score, 0);
        let second = repo.find_or_create("player-a").await.unwrap();
        assert_eq!(second.id, first.id);
    }

    #[tokio::test]
    async fn score_increments_are_exact() {
        let repo = repo().await;
        repo.find_or_create("player-b").await.unwrap();
        let after_safe = repo.add_to_score("player-b", 5).await.unwrap();
        assert_eq!(after_safe, 5);
        let after_mine = repo.add_to_score("player-b", -50).await.unwrap();
        assert_eq!(after_mine, -45);
    }
}

//! Durable CRUD over `map_state`: the only table the Cell State Engine
//! touches. A missing row is "default hidden"; a row exists only once
//! a cell has been revealed or flagged — storage stays sparse across
//! the full 640x640 map.

use crate::client::DbClient;
use crate::errors::DbError;
use libsql::params;
use mines_models::{CellRecord, Region};
use tracing::instrument;

#[derive(Clone)]
pub struct CellRepository {
    client: DbClient,
}

impl CellRepository {
    pub fn new(client: DbClient) -> Self {
        Self { client }
    }

    #[instrument(skip(self))]
    pub async fn get_cell(&self, x: i64, y: i64) -> Result<Option<CellRecord>, DbError> {
        let connection = self.client.get_connection()?;
        let mut rows = connection
            .query(
                "SELECT x, y, revealed, is_mine, adjacent_mines, flag_state FROM map_state WHERE x = ?1 AND y = ?2",
                params![x, y],
            )
            .await?;

        match rows.next().await? {
            Some(row) => Ok(Some(row_to_cell(row)?)),
            None => Ok(None),
        }
    }

    /// Wrap-aware region scan: the X and Y predicates are each either a
    /// contiguous `BETWEEN` or, when the interval wraps the map edge,
    /// an `OR` of the two half-open ends.
    #[instrument(skip(self))]
    pub async fn get_cells_in_region(&self, region: Region) -> Result<Vec<CellRecord>, DbError> {
        let x_clause = interval_clause("x", region.x_min, region.x_max, 1, 2);
        let y_clause = interval_clause("y", region.y_min, region.y_max, 3, 4);
        let sql = format!(
            "SELECT x, y, revealed, is_mine, adjacent_mines, flag_state FROM map_state WHERE ({x_clause}) AND ({y_clause})"
        );

        let connection = self.client.get_connection()?;
        let mut rows = connection
            .query(
                &sql,
                params![region.x_min, region.x_max, region.y_min, region.y_max],
            )
            .await?;

        let mut cells = Vec::new();
        while let Some(row) = rows.next().await? {
            cells.push(row_to_cell(row)?);
        }
        Ok(cells)
    }

    /// `revealed=true, flagged=false, is_mine, adjacent_mines`. Overrides
    /// any prior record; a revealed cell is never un-revealed, so this
    /// is the only writer the row will ever see again.
    #[instrument(skip(self))]
    pub async fn upsert_revealed(
        &self,
        x: i64,
        y: i64,
        is_mine: bool,
        adjacent_mines: Option<u8>,
    ) -> Result<(), DbError> {
        let connection = self.client.get_connection()?;
        connection
            .execute(
                "INSERT INTO map_state (x, y, revealed, is_mine, adjacent_mines, flag_state)
                 VALUES (?1, ?2, 1, ?3, ?4, 0)
                 ON CONFLICT(x, y) DO UPDATE SET
                     revealed = 1,
                     is_mine = excluded.is_mine,
                     adjacent_mines = excluded.adjacent_mines,
                     flag_state = 0",
                params![x, y, is_mine as i64, adjacent_mines.map(i64::from)],
            )
            .await?;
        Ok(())
    }

    /// Setting the flag inserts a hidden-flagged row only if the cell
    /// isn't already revealed; clearing it deletes the row only if the
    /// cell isn't revealed, restoring "default hidden".
    #[instrument(skip(self))]
    pub async fn set_flag(&self, x: i64, y: i64, flagged: bool) -> Result<(), DbError> {
        let connection = self.client.get_connection()?;
        if flagged {
            connection
                .execute(
                    "INSERT INTO map_state (x, y, revealed, is_mine, adjacent_mines, flag_state)
                     VALUES (?1, ?2, 0, 0, NULL, 1)
                     ON CONFLICT(x, y) DO UPDATE SET flag_state = 1
                     WHERE map_state.revealed = 0",
                    params![x, y],
                )
                .await?;
        } else {
            connection
                .execute(
                    "DELETE FROM map_state WHERE x = ?1 AND y = ?2 AND revealed = 0",
                    params![x, y],
                )
                .await?;
        }
        Ok(())
    }
}

fn interval_clause(column: &str, min: i64, max: i64, min_idx: u8, max_idx: u8) -> String {
    if min <= max {
        format!("{column} BETWEEN ?{min_idx} AND ?{max_idx}")
    } else {
        format!("({column} >= ?{min_idx} OR {column} <= ?{max_idx})")
    }
}

fn row_to_cell(row: libsql::Row) -> Result<CellRecord, DbError> {
    let x: i64 = row.get(0)?;
    let y: i64 = row.get(1)?;
    let revealed: i64 = row.get(2)?;
    let is_mine: i64 = row.get(3)?;
    let adjacent_mines: Option<i64> = row.get(4)?;
    let flag_state: i64 = row.get(5)?;

    Ok(CellRecord {
        x,
        y,
        revealed: revealed != 0,
        is_mine: is_mine != 0,
        adjacent_mines: adjacent_mines.map(|value| value as u8),
        flagged: flag_state != 0,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn repo() -> CellRepository {
        let client = DbClient::connect(":memory:?cache=shared", None).await.unwrap();
        CellRepository::new(client)
    }

    #[tokio::test]
    async fn absent_cell_is_none() {
        let repo = repo().await;
        assert!(repo.get_cell(5, 5).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn round_trips_a_revealed_safe_cell() {
        let repo = repo().await;
        repo.upsert_revealed(10, 10, false, Some(3)).await.unwrap();
        let cell = repo.get_cell(10, 10).await.unwrap().unwrap();
        assert!(cell.revealed);
        assert!(!cell.is_mine);
        assert_eq!(cell.adjacent_mines, Some(3));
        assert!(!cell.flagged);
    }

    #[tokio::test]
    async fn flag_then_unflag_removes_the_record() {
        let repo = repo().await;
        repo.set_flag(50, 50, true).await.unwrap();
        let cell = repo.get_cell(50, 50).await.unwrap().unwrap();
        assert!(cell.flagged);
        assert!(!cell.revealed);

        repo.set_flag(50, 50, false).await.unwrap();
        assert!(repo.get_cell(50, 50).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn flagging_a_revealed_cell_is_a_no_op() {
        let repo = repo().await;
        repo.upsert_revealed(7, 7, true, None).await.unwrap();
        repo.set_flag(7, 7, true).await.unwrap();
        let cell = repo.get_cell(7, 7).await.unwrap().unwrap();
        assert!(cell.revealed);
        assert!(!cell.flagged);
    }

    #[tokio::test]
    async fn wrapped_region_query_returns_both_corners() {
        let repo = repo().await;
        repo.upsert_revealed(1, 1, false, Some(0)).await.unwrap();
        repo.upsert_revealed(639, 639, false, Some(0)).await.unwrap();

        let region = Region::new(638, 2, 638, 2);
        let cells = repo.get_cells_in_region(region).await.unwrap();
        assert_eq!(cells.len(), 2);
    }
}

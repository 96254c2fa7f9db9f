//! Cell State Engine: reveal (with flood fill) and flag toggling,
//! orchestrating the map oracle and the cell repository. The two
//! public operations here are the semantic backbone of the game —
//! every data model invariant is upheld by this module alone.

use std::collections::{HashSet, VecDeque};

use mines_db::CellRepository;
use mines_db::DbError;
use mines_models::{CellRecord, WireCell, MAP_HEIGHT, MAP_WIDTH, MINE_PENALTY, STUN_MS};
use mines_oracle::Oracle;
use tracing::{debug, info, instrument};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RevealOutcome {
    /// Already revealed or already flagged: no state change, no broadcast.
    Ignored,
    MineHit { score_delta: i64, stun_ms: u64, cells: Vec<WireCell> },
    Safe { score_delta: i64, cells: Vec<WireCell> },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FlagOutcome {
    Ignored,
    Flagged { cell: WireCell },
    Unflagged { cell: WireCell },
}

pub struct CellStateEngine {
    oracle: Oracle,
    cells: CellRepository,
}

impl CellStateEngine {
    pub fn new(oracle: Oracle, cells: CellRepository) -> Self {
        Self { oracle, cells }
    }

    #[instrument(skip(self))]
    pub async fn reveal(&self, player_id: &str, x: i64, y: i64) -> Result<RevealOutcome, DbError> {
        let current = self.cells.get_cell(x, y).await?;
        if matches!(current, Some(cell) if cell.revealed || cell.flagged) {
            return Ok(RevealOutcome::Ignored);
        }

        if self.oracle.is_mine(x, y) {
            self.cells.upsert_revealed(x, y, true, None).await?;
            info!(player_id, x, y, "mine hit");
            return Ok(RevealOutcome::MineHit {
                score_delta: MINE_PENALTY,
                stun_ms: STUN_MS,
                cells: vec![CellRecord::revealed_mine(x, y).to_wire()],
            });
        }

        let revealed = self.flood_fill(x, y).await?;
        if revealed.is_empty() {
            debug!(player_id, x, y, "flood fill found nothing new, lost the race");
            return Ok(RevealOutcome::Ignored);
        }

        for cell in &revealed {
            self.cells.upsert_revealed(cell.x, cell.y, false, cell.adjacent_mines).await?;
        }

        let score_delta = revealed.len() as i64;
        info!(player_id, x, y, revealed = revealed.len(), "safe reveal");

        Ok(RevealOutcome::Safe {
            score_delta,
            cells: revealed.into_iter().map(CellRecord::to_wire).collect(),
        })
    }

    /// Bounded BFS from `(x, y)`. A cell only enqueues its neighbours
    /// when its own adjacency is zero; flagged or already-revealed
    /// neighbours are never enqueued, so the flood stops dead at a
    /// flag or a prior reveal without needing a shared lock across the
    /// whole fill. Racy by design: another actor may reveal or flag a
    /// frontier cell between this fill's peek and its own, in which
    /// case this fill simply skips it.
    async fn flood_fill(&self, start_x: i64, start_y: i64) -> Result<Vec<CellRecord>, DbError> {
        let mut queue = VecDeque::new();
        let mut visited = HashSet::new();
        queue.push_back((start_x, start_y));
        visited.insert((start_x, start_y));

        let mut result = Vec::new();

        while let Some((cx, cy)) = queue.pop_front() {
            if let Some(existing) = self.cells.get_cell(cx, cy).await? {
                if existing.revealed || existing.flagged {
                    continue;
                }
            }

            let adjacent = self.oracle.adjacent_mines(cx, cy);
            result.push(CellRecord::revealed_safe(cx, cy, adjacent));

            if adjacent == 0 {
                for (nx, ny) in neighbours(cx, cy) {
                    if visited.contains(&(nx, ny)) {
                        continue;
                    }
                    let blocked = matches!(
                        self.cells.get_cell(nx, ny).await?,
                        Some(peek) if peek.revealed || peek.flagged
                    );
                    visited.insert((nx, ny));
                    if !blocked {
                        queue.push_back((nx, ny));
                    }
                }
            }
        }

        Ok(result)
    }

    #[instrument(skip(self))]
    pub async fn toggle_flag(&self, x: i64, y: i64) -> Result<FlagOutcome, DbError> {
        let current = self.cells.get_cell(x, y).await?;
        if matches!(current, Some(cell) if cell.revealed) {
            return Ok(FlagOutcome::Ignored);
        }

        let already_flagged = matches!(current, Some(cell) if cell.flagged);

        if already_flagged {
            self.cells.set_flag(x, y, false).await?;
            Ok(FlagOutcome::Unflagged {
                cell: CellRecord::hidden(x, y).to_wire(),
            })
        } else {
            self.cells.set_flag(x, y, true).await?;
            Ok(FlagOutcome::Flagged {
                cell: CellRecord::flagged(x, y).to_wire(),
            })
        }
    }
}

fn neighbours(x: i64, y: i64) -> [(i64, i64); 8] {
    let wrap_x = |v: i64| ((v % MAP_WIDTH) + MAP_WIDTH) % MAP_WIDTH;
    let wrap_y = |v: i64| ((v % MAP_HEIGHT) + MAP_HEIGHT) % MAP_HEIGHT;
    [
        (wrap_x(x - 1), wrap_y(y - 1)),
        (wrap_x(x), wrap_y(y - 1)),
        (wrap_x(x + 1), wrap_y(y - 1)),
        (wrap_x(x - 1), wrap_y(y)),
        (wrap_x(x + 1), wrap_y(y)),
        (wrap_x(x - 1), wrap_y(y + 1)),
        (wrap_x(x), wrap_y(y + 1)),
        (wrap_x(x + 1), wrap_y(y + 1)),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use mines_db::DbClient;
    use mines_models::CellState;
    use mines_oracle::MapDimensions;

    async fn engine(seed: &str) -> CellStateEngine {
        let client = DbClient::connect(":memory:?cache=shared", None).await.unwrap();
        let cells = CellRepository::new(client);
        let oracle = Oracle::new(seed, MapDimensions::new(MAP_WIDTH, MAP_HEIGHT));
        CellStateEngine::new(oracle, cells)
    }

    #[tokio::test]
    async fn revealing_twice_is_ignored_the_second_time() {
        let engine = engine("TEST_SEED_A1B2C3D4").await;
        let first = engine.reveal("p1", 5, 5).await.unwrap();
        assert!(!matches!(first, RevealOutcome::Ignored));
        let second = engine.reveal("p1", 5, 5).await.unwrap();
        assert_eq!(second, RevealOutcome::Ignored);
    }

    #[tokio::test]
    async fn toggle_flag_twice_returns_to_hidden() {
        let engine = engine("TEST_SEED_A1B2C3D4").await;
        let flagged = engine.toggle_flag(50, 50).await.unwrap();
        assert!(matches!(flagged, FlagOutcome::Flagged { .. }));
        let unflagged = engine.toggle_flag(50, 50).await.unwrap();
        match unflagged {
            FlagOutcome::Unflagged { cell } => assert_eq!(cell.state, CellState::Hidden),
            other => panic!("expected Unflagged, got {other:?}"),
        }
        assert!(engine.cells.get_cell(50, 50).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn flag_blocks_reveal_on_a_flooded_neighbour() {
        let engine = engine("FLOOD_BLOCK_SEED_99").await;

        // Find a zero-adjacency cell to flood from.
        let mut origin = None;
        'search: for x in 0..50 {
            for y in 0..50 {
                if !engine.oracle.is_mine(x, y) && engine.oracle.adjacent_mines(x, y) == 0 {
                    origin = Some((x, y));
                    break 'search;
                }
            }
        }
        let (ox, oy) = origin.expect("fixture seed should have a zero-adjacency cell nearby");
        let (nx, ny) = neighbours(ox, oy)[0];

        engine.toggle_flag(nx, ny).await.unwrap();
        engine.reveal("p1", ox, oy).await.unwrap();

        let neighbour = engine.cells.get_cell(nx, ny).await.unwrap().unwrap();
        assert!(neighbour.flagged);
        assert!(!neighbour.revealed);
    }

    #[tokio::test]
    async fn mine_hit_reports_penalty_and_stun() {
        let engine = engine("MINE_HIT_FIXTURE_SEED").await;
        let mut mine = None;
        for x in 0..200 {
            if engine.oracle.is_mine(x, 0) {
                mine = Some(x);
                break;
            }
        }
        let x = mine.expect("fixture seed should have a mine in the first row");
        let outcome = engine.reveal("p1", x, 0).await.unwrap();
        match outcome {
            RevealOutcome::MineHit { score_delta, stun_ms, cells } => {
                assert_eq!(score_delta, MINE_PENALTY);
                assert_eq!(stun_ms, STUN_MS);
                assert_eq!(cells.len(), 1);
                assert_eq!(cells[0].state, CellState::Mine);
            }
            other => panic!("expected MineHit, got {other:?}"),
        }
    }
}

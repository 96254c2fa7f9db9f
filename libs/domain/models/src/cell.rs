use serde::{Deserialize, Serialize};

/// A persisted cell record. Absence of a record is equivalent to
/// `revealed = false, flagged = false` ("default hidden").
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CellRecord {
    pub x: i64,
    pub y: i64,
    pub revealed: bool,
    pub is_mine: bool,
    pub adjacent_mines: Option<u8>,
    pub flagged: bool,
}

impl CellRecord {
    pub fn hidden(x: i64, y: i64) -> Self {
        Self {
            x,
            y,
            revealed: false,
            is_mine: false,
            adjacent_mines: None,
            flagged: false,
        }
    }

    pub fn revealed_mine(x: i64, y: i64) -> Self {
        Self {
            x,
            y,
            revealed: true,
            is_mine: true,
            adjacent_mines: None,
            flagged: false,
        }
    }

    pub fn revealed_safe(x: i64, y: i64, adjacent_mines: u8) -> Self {
        Self {
            x,
            y,
            revealed: true,
            is_mine: false,
            adjacent_mines: Some(adjacent_mines),
            flagged: false,
        }
    }

    pub fn flagged(x: i64, y: i64) -> Self {
        Self {
            x,
            y,
            revealed: false,
            is_mine: false,
            adjacent_mines: None,
            flagged: true,
        }
    }

    pub fn to_wire(self) -> WireCell {
        let (state, value) = if self.revealed && self.is_mine {
            (CellState::Mine, Some(-1))
        } else if self.revealed {
            (CellState::Revealed, self.adjacent_mines.map(i32::from))
        } else if self.flagged {
            (CellState::Flagged, None)
        } else {
            (CellState::Hidden, None)
        };

        WireCell {
            x: self.x,
            y: self.y,
            state,
            value,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CellState {
    Hidden,
    Revealed,
    Flagged,
    Mine,
}

/// The client-facing projection of a cell: `{x, y, state, value}`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireCell {
    pub x: i64,
    pub y: i64,
    pub state: CellState,
    pub value: Option<i32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mine_projects_to_value_minus_one() {
        let wire = CellRecord::revealed_mine(1, 2).to_wire();
        assert_eq!(wire.state, CellState::Mine);
        assert_eq!(wire.value, Some(-1));
    }

    #[test]
    fn safe_projects_adjacency() {
        let wire = CellRecord::revealed_safe(1, 2, 3).to_wire();
        assert_eq!(wire.state, CellState::Revealed);
        assert_eq!(wire.value, Some(3));
    }

    #[test]
    fn flagged_has_no_value() {
        let wire = CellRecord::flagged(1, 2).to_wire();
        assert_eq!(wire.state, CellState::Flagged);
        assert_eq!(wire.value, None);
    }
}

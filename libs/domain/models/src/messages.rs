use serde::{Deserialize, Serialize};

use crate::cell::WireCell;

/// The closed set of inbound messages. Decoded in one place, with a
/// typed handler per variant — no string-keyed dispatch table.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "camelCase")]
pub enum ClientMessage {
    ClickCell { x: i64, y: i64 },
    FlagCell { x: i64, y: i64 },
    UpdatePosition { x: f64, y: f64 },
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PlayerRef {
    pub id: String,
    pub x: i64,
    pub y: i64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MapChunk {
    pub cells: Vec<WireCell>,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct SelfPosition {
    pub x: i64,
    pub y: i64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "camelCase")]
pub enum ServerMessage {
    InitialState {
        #[serde(rename = "playerId")]
        player_id: String,
        score: i64,
        #[serde(rename = "mapChunk")]
        map_chunk: MapChunk,
        players: Vec<PlayerRef>,
        #[serde(rename = "self")]
        self_position: SelfPosition,
    },
    MapUpdate {
        cells: Vec<WireCell>,
    },
    PlayerJoined {
        id: String,
        x: i64,
        y: i64,
    },
    PlayerLeft {
        id: String,
    },
    PlayerPositionUpdate {
        players: Vec<PlayerRef>,
    },
    ScoreUpdate {
        score: i64,
    },
    PlayerPenalty {
        score: i64,
        #[serde(rename = "stunDurationMs")]
        stun_duration_ms: u64,
    },
    Error {
        message: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn click_cell_decodes_from_spec_wire_shape() {
        let raw = r#"{"type":"clickCell","data":{"x":100,"y":100}}"#;
        let msg: ClientMessage = serde_json::from_str(raw).unwrap();
        match msg {
            ClientMessage::ClickCell { x, y } => {
                assert_eq!(x, 100);
                assert_eq!(y, 100);
            }
            _ => panic!("wrong variant"),
        }
    }

    #[test]
    fn player_penalty_encodes_stun_field_name() {
        let msg = ServerMessage::PlayerPenalty {
            score: -50,
            stun_duration_ms: 3000,
        };
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["type"], "playerPenalty");
        assert_eq!(json["data"]["stunDurationMs"], 3000);
    }
}

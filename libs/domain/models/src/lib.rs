pub mod cell;
pub mod messages;
pub mod player;
pub mod region;

pub use cell::{CellRecord, CellState, WireCell};
pub use messages::{ClientMessage, MapChunk, PlayerRef, SelfPosition, ServerMessage};
pub use player::Player;
pub use region::Region;

pub const MAP_WIDTH: i64 = 640;
pub const MAP_HEIGHT: i64 = 640;
pub const VIEWPORT_RADIUS_X: i64 = 30;
pub const VIEWPORT_RADIUS_Y: i64 = 20;
pub const MINE_PENALTY: i64 = -50;
pub const STUN_MS: u64 = 3000;

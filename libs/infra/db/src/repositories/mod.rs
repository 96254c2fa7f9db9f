pub mod cell_repository;
pub mod player_repository;

pub use cell_repository::CellRepository;
pub use player_repository::PlayerRepository;

pub mod broadcaster;
pub mod dispatcher;
pub mod lifecycle;
pub mod reaper;

pub use reaper::spawn_reaper;

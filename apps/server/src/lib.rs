//! Crate root: declares the module tree and re-exports the minimum
//! surface `main.rs` needs to ignite the server.

pub mod config;
pub mod engine;
pub mod handlers;
pub mod kernel;
pub mod routes;
pub mod services;
pub mod state;

pub mod prelude {
    pub use crate::config::ServerConfig;
    pub use crate::kernel::ServerKernel;
    pub use crate::state::AppState;
}

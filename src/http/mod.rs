//! Owner-facing HTTP/WebSocket surface. Every handler crosses into the
//! engine exclusively through its command channel and the shared
//! `WorldSummary` -- this module never touches the simulation `World`.

pub mod error;
pub mod handlers;
pub mod router;
pub mod state;
pub mod ws;

pub use router::build_router;
pub use state::AppState;

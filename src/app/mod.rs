//! Application orchestration: shared state and the pipeline engine.

pub mod engine;
pub mod state;

pub use engine::Engine;
pub use state::AppState;

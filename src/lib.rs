//! Diffscope - Main application library
//!
//! This is the main binary crate that wires the engine together

mod app;

pub use app::{AppHandle, create_app};
pub use diffscope_core::{Config, init_tracing};
pub use diffscope_engine::presentation::EngineState;

// Re-export for convenience
pub use diffscope_core;
pub use diffscope_engine;

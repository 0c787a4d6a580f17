//! HTTP presentation layer

pub mod controllers;
pub mod models;
pub mod routes;

pub use controllers::EngineState;
pub use routes::create_router;

//! Diffscope Core - Foundation crate for the Diffscope scan service
//!
//! This crate provides shared functionality used by the engine and the
//! application binary:
//!
//! # Modules
//!
//! - [`config`] — Strongly-typed configuration with TOML and environment variable support
//! - [`domain`] — Core domain models: scan state, findings, and the stage contract
//! - [`logging`] — Structured logging with tracing
//!
//! # Configuration
//!
//! Load configuration from files and environment:
//!
//! ```rust,ignore
//! use diffscope_core::Config;
//!
//! let config = Config::load()?;
//! ```
//!
//! Environment variables use the `DIFFSCOPE__` prefix with double underscore
//! separators:
//!
//! ```bash
//! DIFFSCOPE__SERVER__PORT=3000
//! DIFFSCOPE__ENGINE__MAX_CONCURRENT_JOBS=8
//! ```
//!
//! # Logging
//!
//! Initialize structured logging:
//!
//! ```rust,ignore
//! use diffscope_core::init_tracing;
//!
//! init_tracing(&config.logging)?;
//! ```

pub mod config;
pub mod domain;
pub mod logging;

pub use config::Config;
pub use logging::init_tracing;

//! Diffscope Engine - Workflow engine and job queue for code scans
//!
//! This crate drives one scan through the fixed stage pipeline and manages
//! many concurrent scans behind an asynchronous job queue.
//!
//! # Features
//!
//! - **Workflow Engine** — Sequential stage execution with per-stage timeouts,
//!   panic containment, and deterministic rerouting to an error-handling sink
//! - **Transition Table** — Declarative routing validated exhaustively at startup
//! - **Job Queue** — Bounded worker pool with cooperative cancellation and
//!   periodic cleanup of terminal jobs
//! - **Pipeline Stages** — Built-in fetch/parse/static-analysis/impact/
//!   project-scan/llm/reporting stages behind the [`diffscope_core::domain::stage::Stage`] seam
//! - **HTTP API** — Scan submission and job polling with OpenAPI/Swagger docs
//!
//! # Architecture
//!
//! ```text
//! diffscope-engine/
//! ├── presentation/     # HTTP layer
//! │   ├── controllers   # Request handlers
//! │   ├── models        # DTOs with OpenAPI schemas
//! │   └── routes        # API route definitions
//! ├── application/      # Engine core
//! │   ├── engine.rs     # Workflow engine run loop
//! │   ├── transitions.rs# Declarative transition table
//! │   ├── progress.rs   # Stage → percentage mapping
//! │   └── lifecycle.rs  # Job status transition controller
//! ├── infrastructure/   # Queue, registry, and store
//! │   ├── job_service.rs# Submit/status/cancel/list + worker pool
//! │   ├── job_store/    # Snapshot store (in-memory by default)
//! │   └── stage_registry.rs
//! ├── stages/           # Built-in pipeline stages
//! └── domain/           # Job entity and status state machine
//! ```
//!
//! # Pipeline
//!
//! ```text
//! fetch ─► parse ─► static-analysis ─┬─► impact-analysis ──┬─► llm-analysis ─► reporting ─► end
//!                                    └─► project-scan ─────┘
//!     (any stage failure) ──────────────► error-handler ─────────────────────────────────► end
//! ```

pub mod application;
pub mod domain;
pub mod infrastructure;
pub mod presentation;
pub mod stages;

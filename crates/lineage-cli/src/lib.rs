//! lineage-cli: Command-line lineage walker
//!
//! This crate provides the `lineage-walk` binary and its building blocks:
//! - Layered configuration (YAML file, `LINEAGE_` environment variables)
//! - Logging setup and a progress observer
//! - Storage-to-domain adapter
//! - Text rendering of the flattened tree
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │                lineage-cli                   │
//! ├─────────────────────────────────────────────┤
//! │  config.rs      - Layered configuration     │
//! │  observability/ - Logging & progress        │
//! │  adapters.rs    - Store -> RelationReader   │
//! │  render.rs      - Tree text output          │
//! │  app.rs         - Walk orchestration        │
//! └─────────────────────────────────────────────┘
//! ```

pub mod adapters;
pub mod app;
pub mod config;
pub mod observability;
pub mod render;

pub use app::{run_walk, WalkRequest};
pub use config::{CliConfig, ConfigLoadError};

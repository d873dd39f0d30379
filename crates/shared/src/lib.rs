//! Shared types, errors, and configuration for Coatbook.
//!
//! This crate provides common types used across all other crates:
//! - Typed IDs for tenant-scoped entity references
//! - Currencies and the fixed amount encodings used by exports
//! - Pagination for chunked reads
//! - Application-wide error types
//! - Configuration management

pub mod config;
pub mod error;
pub mod types;

pub use config::AppConfig;
pub use error::AppError;

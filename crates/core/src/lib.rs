//! Core types and configuration for the gridcast forecasting pipeline.
//!
//! This crate provides shared types used across all other crates:
//! - Weather, energy, merged and submission record types
//! - Configuration structures
//! - Common error types

pub mod config;
pub mod error;
pub mod types;

pub use config::PipelineConfig;
pub use error::{Error, Result};
pub use types::*;

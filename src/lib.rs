//! runtime-forge: Dockerfile generator for Databricks-style runtime images.
//!
//! This library resolves runtime releases and image types into build
//! targets, renders their Dockerfiles from templates, and writes the build
//! summary consumed by CI.

// Core modules
pub mod catalog;
pub mod cli;
pub mod config;
pub mod dockerfile;
pub mod error;
pub mod image;
pub mod pipeline;
pub mod render;
pub mod resolver;
pub mod summary;
pub mod template;

// Re-export commonly used error types
pub use error::{BuildError, CatalogError, ConfigError, RenderError, ResolveError, SummaryError};

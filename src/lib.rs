//! bddtrack - Manual BDD test management for Gherkin feature files.
//!
//! This library provides the core functionality for the `bdt` CLI tool:
//! feature file parsing, test run tracking across environments and versions,
//! living documentation, and version comparison reports.

pub mod action_log;
pub mod cli;
pub mod commands;
pub mod config;
pub mod docs;
pub mod fingerprint;
pub mod ids;
pub mod lifecycle;
pub mod models;
pub mod parser;
pub mod report;
pub mod storage;


/// Library-level error type for bddtrack operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("{0}")]
    Other(String),
}

/// Result type alias for bddtrack operations.
pub type Result<T> = std::result::Result<T, Error>;

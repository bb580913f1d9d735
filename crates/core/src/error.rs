//! Core error types

use thiserror::Error;

use crate::geo::GeoError;

/// Core error type for fleetcore
#[derive(Debug, Error)]
pub enum CoreError {
    /// Configuration could not be parsed
    #[error("Config parse error: {0}")]
    Parse(String),

    /// Configuration parsed but violates a constraint
    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    /// Coordinate validation failure
    #[error(transparent)]
    Geo(#[from] GeoError),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result alias for core operations
pub type Result<T> = std::result::Result<T, CoreError>;

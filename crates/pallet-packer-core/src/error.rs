use thiserror::Error;

#[derive(Debug, Error)]
pub enum PalletPackerError {
    #[error("Invalid pallet dimensions: all extents must be greater than 0 (got {length}x{width}x{height})")]
    InvalidDimensions {
        length: f64,
        width: f64,
        height: f64,
    },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

pub type Result<T> = std::result::Result<T, PalletPackerError>;

//! Error types for the pinlink protocol library.

use thiserror::Error;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur when encoding, decoding or interpreting messages.
#[derive(Error, Debug)]
pub enum Error {
    /// Action code outside the protocol table.
    #[error("Unknown action code: {0}")]
    UnknownAction(i64),

    /// Action name that matches no action.
    #[error("Unknown action: {0}")]
    InvalidActionName(String),

    /// Pin mode code outside the protocol table.
    #[error("Invalid pin mode: {0}")]
    InvalidPinMode(i64),

    /// Pin mode name that matches no mode.
    #[error("Invalid pin mode name: {0}")]
    InvalidPinModeName(String),

    /// Pixel type name that matches no layout.
    #[error("Invalid pixel type: {0}")]
    InvalidPixelType(String),

    /// Colour string that is not `#RRGGBB` or `#RRGGBBWW`.
    #[error("Invalid color: {0}")]
    InvalidColor(String),

    /// Command addressed to the reserved ID range.
    #[error("Device ID {0} is reserved")]
    ReservedDevice(u16),

    /// Command addressed to an extension nobody implements.
    #[error("Unknown device ID: {0}")]
    UnknownDevice(i64),

    /// Action that the addressed device does not handle.
    #[error("Action {action} is not valid for device {id}")]
    ActionNotSupported { id: i64, action: i64 },

    /// Required parameter is absent.
    #[error("Action {action} is missing parameter {index}")]
    MissingParam { action: i64, index: usize },

    /// Parameter outside the range the action accepts.
    #[error("Parameter {index} of action {action} out of range: {value}")]
    ParamOutOfRange { action: i64, index: usize, value: i64 },

    /// JSON encoding or decoding error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

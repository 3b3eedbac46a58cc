// ABOUTME: Modem error types covering the serial channel, AT command outcomes and initialization failures
// ABOUTME: Codec errors convert in so callers can use ? across encoding and sending

use crate::codec::EncodeError;
use std::io;
use std::time::Duration;
use thiserror::Error;

/// Error type for modem operations
#[derive(Debug, Error)]
pub enum ModemError {
    /// The serial channel could not be opened, read or written
    #[error("Serial port unavailable: {0}")]
    PortUnavailable(#[from] io::Error),

    /// No success or error keyword arrived before the command's deadline
    #[error("Command {command:?} timed out after {timeout:?}")]
    Timeout { command: String, timeout: Duration },

    /// The stream ended while a command was outstanding
    #[error("Serial connection closed unexpectedly")]
    UnexpectedClose,

    /// The modem answered with an error keyword such as `ERROR` or `+CMS ERROR: 500`
    #[error("Command {command:?} rejected: {response:?}")]
    Rejected { command: String, response: String },

    /// A successful response that could not be interpreted
    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    #[error("SIM not ready: {0:?}")]
    SimNotReady(String),

    /// The module still reported detached after the configured number of polls
    #[error("Network not attached after {attempts} attempt(s)")]
    NotAttached { attempts: u32 },

    #[error("Encoding failed: {0}")]
    Encode(#[from] EncodeError),
}

impl ModemError {
    /// True for failures after which the serial connection has been dropped
    pub fn is_connection_lost(&self) -> bool {
        matches!(
            self,
            ModemError::PortUnavailable(_) | ModemError::UnexpectedClose
        )
    }
}

/// Result type alias for modem operations
pub type ModemResult<T> = Result<T, ModemError>;

// ABOUTME: Crate root for sending and receiving SMS through a serial cellular modem in PDU mode
// ABOUTME: Wires together the PDU codec, wire datatypes, serial connection and the modem client

pub mod client;
pub mod codec;
pub mod connection;
pub mod datatypes;
pub mod pdu;

#[cfg(test)]
mod tests;

// Re-export codec types for direct access
pub use codec::{DecodeError, EncodeError};

// Re-export the main client API for easy access
pub use client::{
    AtCommand, CommandSession, ListenerConfig, MessageListener, Modem, ModemConfig, ModemControl,
    ModemError, ModemResult, Notifier, SerialSettings, SmsTransmitter,
};
pub use pdu::{InboundSms, OutboundSms, PduDecoder, PduEncoder, PduPart};

/// Error returned by the demo and other top-level glue.
///
/// Library functions return `ModemError`, `EncodeError` or `DecodeError`;
/// this boxed form is for callers that only need to report a failure.
pub type Error = Box<dyn std::error::Error + Send + Sync>;

/// A specialized `Result` type for top-level glue.
///
/// # Examples
///
/// ## Sending
///
/// ```rust,no_run
/// use airlink::{CommandSession, Modem, ModemConfig, ModemControl, OutboundSms, SerialSettings, SmsTransmitter};
/// use std::sync::Arc;
///
/// #[tokio::main]
/// async fn main() -> airlink::Result<()> {
///     let session = Arc::new(CommandSession::new(SerialSettings::new("/dev/ttyUSB2")));
///     let modem = Modem::new(session, ModemConfig::default());
///     modem.initialize().await?;
///
///     // Long or non-GSM text is split and encoded automatically
///     let references = modem
///         .send_sms(&OutboundSms::new("+8613800138000", "你好，世界"))
///         .await?;
///     println!("Sent as {:?}", references);
///     Ok(())
/// }
/// ```
///
/// ## Decoding a listed PDU
///
/// ```rust
/// use airlink::PduDecoder;
///
/// let sms = PduDecoder::decode(
///     "07911326040000F0040B911346610089F60000208062917314080CC8F71D14969741F977FD07",
/// )
/// .unwrap();
/// assert_eq!(sms.sender.to_string(), "+31641600986");
/// assert_eq!(sms.text, "How are you?");
/// ```
pub type Result<T> = std::result::Result<T, Error>;

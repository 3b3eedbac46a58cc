// ABOUTME: Modem client module: command session, AT command set, modem operations, listener and notifications
// ABOUTME: Exports the types needed to drive a cellular module over a serial port

//! Modem Client Module
//!
//! This module drives a cellular module over a serial link with AT commands
//! in PDU mode:
//!
//! * **Command session** - One command in flight at a time over a shared serial connection
//! * **Native async traits** - `ModemControl` and `SmsTransmitter` use async fn in traits
//! * **Inbox listener** - Polls the SIM, decodes PDUs and joins concatenated messages
//! * **Notifications** - Pluggable `Notifier` channels selected by id
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use airlink::client::{CommandSession, Modem, ModemConfig, ModemControl, SerialSettings, SmsTransmitter};
//! use airlink::pdu::OutboundSms;
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let session = Arc::new(CommandSession::new(SerialSettings::new("/dev/ttyUSB2")));
//! let modem = Modem::new(session, ModemConfig::default());
//! modem.initialize().await?;
//! modem.send_sms(&OutboundSms::new("+8613800138000", "Hello!")).await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Receiving
//!
//! ```rust,no_run
//! use airlink::client::{CommandSession, ListenerConfig, Modem, ModemConfig, SerialSettings};
//! use std::sync::Arc;
//!
//! # async fn example() {
//! let session = Arc::new(CommandSession::new(SerialSettings::new("/dev/ttyUSB2")));
//! let modem = Modem::new(session, ModemConfig::default());
//! let mut listener = modem.listener(ListenerConfig::default(), None);
//! let stop = listener.stop_handle();
//! tokio::spawn(async move { listener.run().await });
//! // ...
//! stop.stop();
//! # }
//! ```

pub mod command;
pub mod config;
pub mod error;
pub mod listener;
pub mod modem;
pub mod notify;
pub mod session;
pub mod traits;

#[cfg(test)]
pub(crate) mod testing;

// Re-export the main types for easy access
pub use command::{AtCommand, DeleteFlag, MessageStatus, ResponseMatch};
pub use config::{ListenerConfig, ModemConfig, SerialSettings};
pub use error::{ModemError, ModemResult};
pub use listener::{ListedMessage, MessageListener, PollReport, StopHandle, parse_listing};
pub use modem::Modem;
pub use notify::{
    Dispatcher, ForwardNotifier, LogNotifier, Notification, NotificationChannel, Notifier,
    NotifyError,
};
pub use session::{CommandSession, SessionGuard};
pub use traits::{ModemControl, SmsTransmitter};

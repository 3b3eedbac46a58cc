// ABOUTME: Modem capability traits using native async functions
// ABOUTME: Separates module control (bring-up, restart, raw commands) from SMS transmission

use crate::client::error::ModemResult;
use crate::pdu::OutboundSms;
use std::time::Duration;

/// Module lifecycle and direct command access
pub trait ModemControl {
    /// Bring the module into PDU mode with SIM storage and new-message
    /// indications, then wait for network attach.
    async fn initialize(&self) -> ModemResult<()>;

    /// Reset the module, wait for it to settle, reopen the port and
    /// initialize again.
    async fn restart(&self) -> ModemResult<()>;

    /// Send arbitrary command text. Empty `keywords` means `OK`.
    async fn raw_command(
        &self,
        text: &str,
        keywords: &[&str],
        timeout: Duration,
    ) -> ModemResult<String>;
}

/// SMS sending
pub trait SmsTransmitter: ModemControl {
    /// Send an SMS, splitting it into concatenated parts as needed.
    ///
    /// Returns the message reference the network assigned to each part.
    async fn send_sms(&self, sms: &OutboundSms) -> ModemResult<Vec<u8>>;
}

// ABOUTME: AT command values carrying their payload, terminating keywords and deadline
// ABOUTME: Also the fixed command set used for SIM checks, PDU mode setup, listing, deleting and sending

use bytes::{BufMut, Bytes, BytesMut};
use num_enum::TryFromPrimitive;
use std::time::Duration;

/// Deadline used when a command does not set its own
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(3);

/// Ends the PDU body after an `AT+CMGS` prompt
pub const CTRL_Z: u8 = 0x1A;

/// How an accumulated response relates to a command's keywords
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResponseMatch {
    Success,
    Error,
}

/// One request to the modem.
///
/// The command finishes when any success keyword appears in the accumulated
/// response, fails when an error keyword appears instead, and times out
/// otherwise. Values are immutable; the builder methods return a new command.
///
/// # Example
///
/// ```rust
/// use airlink::client::AtCommand;
/// use std::time::Duration;
///
/// let command = AtCommand::new("AT+CGATT?")
///     .expect("+CGATT: 1")
///     .with_timeout(Duration::from_secs(1));
/// assert_eq!(command.payload(), b"AT+CGATT?\r");
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AtCommand {
    payload: Bytes,
    success: Vec<String>,
    errors: Vec<String>,
    timeout: Duration,
}

impl AtCommand {
    /// A text command; the trailing carriage return is added here
    pub fn new(text: &str) -> Self {
        let mut payload = BytesMut::with_capacity(text.len() + 1);
        payload.put_slice(text.as_bytes());
        payload.put_u8(b'\r');
        Self::raw(payload.freeze())
    }

    /// A payload sent exactly as given
    pub fn raw(payload: impl Into<Bytes>) -> Self {
        Self {
            payload: payload.into(),
            success: vec!["OK".to_string()],
            errors: vec!["ERROR".to_string()],
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Replace the success keywords with a single keyword
    pub fn expect(self, keyword: impl Into<String>) -> Self {
        self.expect_any([keyword])
    }

    /// Replace the success keywords; any one of them completes the command
    pub fn expect_any<I, S>(mut self, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.success = keywords.into_iter().map(Into::into).collect();
        self
    }

    /// Replace the error keywords
    pub fn with_errors<I, S>(mut self, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.errors = keywords.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    pub fn success_keywords(&self) -> &[String] {
        &self.success
    }

    pub fn error_keywords(&self) -> &[String] {
        &self.errors
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Printable form for logs and errors, without terminators. Long PDU
    /// bodies are shortened.
    pub fn label(&self) -> String {
        let text = String::from_utf8_lossy(&self.payload);
        let text = text.trim_end_matches(['\r', '\n', CTRL_Z as char]);
        if text.chars().count() > 48 {
            let head: String = text.chars().take(40).collect();
            format!("{head}...")
        } else {
            text.to_string()
        }
    }

    /// Success keywords are checked first, so a listing whose body happens
    /// to contain "ERROR" still completes on its final "OK".
    pub fn match_response(&self, response: &str) -> Option<ResponseMatch> {
        if self.success.iter().any(|k| response.contains(k.as_str())) {
            Some(ResponseMatch::Success)
        } else if self.errors.iter().any(|k| response.contains(k.as_str())) {
            Some(ResponseMatch::Error)
        } else {
            None
        }
    }
}

/// `<stat>` values of `AT+CMGL` in PDU mode
#[derive(TryFromPrimitive, Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum MessageStatus {
    ReceivedUnread = 0,
    ReceivedRead = 1,
    StoredUnsent = 2,
    StoredSent = 3,
    All = 4,
}

/// `<delflag>` values of `AT+CMGD`
#[derive(TryFromPrimitive, Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum DeleteFlag {
    /// Only the message at the given index
    Index = 0,
    /// All read messages
    Read = 1,
    /// All read and sent messages
    ReadAndSent = 2,
    /// All read, sent and unsent messages
    ReadSentUnsent = 3,
    All = 4,
}

/// Liveness check
pub fn attention() -> AtCommand {
    AtCommand::new("AT")
}

/// SIM status; the response must also contain `READY`
pub fn sim_status() -> AtCommand {
    AtCommand::new("AT+CPIN?")
}

pub fn pdu_mode() -> AtCommand {
    AtCommand::new("AT+CMGF=0")
}

pub fn ucs2_character_set() -> AtCommand {
    AtCommand::new("AT+CSCS=\"UCS2\"")
}

/// Read, write and receive storage all on the SIM
pub fn sim_storage() -> AtCommand {
    AtCommand::new("AT+CPMS=\"SM\",\"SM\",\"SM\"")
}

/// Store new messages and announce them with `+CMTI`
pub fn new_message_indication() -> AtCommand {
    AtCommand::new("AT+CNMI=2,1,0,0,0")
}

/// Packet domain attach state. Completes on the final `OK`; the caller reads
/// the `+CGATT: <state>` line from the response.
pub fn attach_status() -> AtCommand {
    AtCommand::new("AT+CGATT?")
}

pub fn delete(index: u16, flag: DeleteFlag) -> AtCommand {
    AtCommand::new(&format!("AT+CMGD={},{}", index, flag as u8))
}

pub fn list(status: MessageStatus) -> AtCommand {
    AtCommand::new(&format!("AT+CMGL={}", status as u8))
}

/// First half of a send: announces the TPDU length and waits for the prompt
pub fn send_length(tpdu_len: usize) -> AtCommand {
    AtCommand::new(&format!("AT+CMGS={tpdu_len}")).expect(">")
}

/// Second half of a send: the hex PDU terminated by Ctrl-Z. Waits for the
/// final `OK` so the `+CMGS: <mr>` line is complete in the response.
pub fn send_pdu(hex: &str) -> AtCommand {
    let mut payload = BytesMut::with_capacity(hex.len() + 1);
    payload.put_slice(hex.as_bytes());
    payload.put_u8(CTRL_Z);
    AtCommand::raw(payload.freeze()).with_timeout(Duration::from_secs(5))
}

/// Full functionality with a module reset
pub fn restart() -> AtCommand {
    AtCommand::new("AT+CFUN=1,1")
}

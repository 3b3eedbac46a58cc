// ABOUTME: SMS TPDUs handled by the crate: SMS-SUBMIT for sending, SMS-DELIVER for receiving
// ABOUTME: Both sides are built on the shared datatypes and the codec helpers

mod deliver;
mod submit;

pub use deliver::{InboundSms, PduDecoder};
pub use submit::{DEFAULT_VALIDITY_PERIOD, OutboundSms, PduEncoder, PduPart};

#[cfg(test)]
pub(crate) use deliver::fixture;

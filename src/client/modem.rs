// ABOUTME: High-level modem operations built on the command session: bring-up, SMS sending, restart
// ABOUTME: Sleeps between attach polls without holding the session so the listener keeps running

use crate::client::command::{self, AtCommand, DeleteFlag};
use crate::client::config::{ListenerConfig, ModemConfig};
use crate::client::error::{ModemError, ModemResult};
use crate::client::listener::MessageListener;
use crate::client::notify::{Dispatcher, Notification};
use crate::client::session::{CommandSession, SessionGuard};
use crate::client::traits::{ModemControl, SmsTransmitter};
use crate::pdu::{OutboundSms, PduEncoder, PduPart};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// A cellular module driven over one `CommandSession`
///
/// # Example
///
/// ```rust,no_run
/// use airlink::client::{CommandSession, Modem, ModemConfig, SerialSettings, SmsTransmitter, ModemControl};
/// use airlink::pdu::OutboundSms;
/// use std::sync::Arc;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let session = Arc::new(CommandSession::new(SerialSettings::new("/dev/ttyUSB2")));
/// let modem = Modem::new(session, ModemConfig::default());
/// modem.initialize().await?;
///
/// let references = modem
///     .send_sms(&OutboundSms::new("+8613800138000", "Hello from the modem"))
///     .await?;
/// println!("sent as {references:?}");
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct Modem {
    session: Arc<CommandSession>,
    config: ModemConfig,
    encoder: PduEncoder,
}

impl Modem {
    pub fn new(session: Arc<CommandSession>, config: ModemConfig) -> Self {
        Self {
            session,
            config,
            encoder: PduEncoder::new(),
        }
    }

    pub fn with_encoder(mut self, encoder: PduEncoder) -> Self {
        self.encoder = encoder;
        self
    }

    pub fn session(&self) -> &Arc<CommandSession> {
        &self.session
    }

    pub fn config(&self) -> &ModemConfig {
        &self.config
    }

    /// A listener sharing this modem's session, notifying through the
    /// channels enabled in `config`
    pub fn listener(
        &self,
        config: ListenerConfig,
        forward: Option<mpsc::Sender<Notification>>,
    ) -> MessageListener<Dispatcher> {
        let dispatcher = Dispatcher::from_enabled(&config.channels, forward);
        MessageListener::new(self.session.clone(), dispatcher, config)
    }

    /// Poll `AT+CGATT?` until the module reports attach.
    ///
    /// The session is free between polls. A detached answer, a rejection or
    /// a timeout is retried; any other failure is returned immediately.
    pub async fn wait_for_attach(&self) -> ModemResult<()> {
        let mut attempts = 0u32;
        loop {
            attempts += 1;
            match self.session.send(&command::attach_status()).await {
                Ok(response) if attach_state(&response) == Some(1) => {
                    info!("Network attached after {} attempt(s)", attempts);
                    return Ok(());
                }
                Ok(response) => debug!("Not attached yet: {:?}", response.trim()),
                Err(e @ (ModemError::Rejected { .. } | ModemError::Timeout { .. })) => {
                    debug!("Attach query failed: {}", e);
                }
                Err(e) => return Err(e),
            }

            if self.config.attach_attempts.is_some_and(|limit| attempts >= limit) {
                warn!("Network not attached after {} attempts", attempts);
                return Err(ModemError::NotAttached { attempts });
            }
            debug!(
                "Retrying attach query in {:?}",
                self.config.attach_retry_interval
            );
            tokio::time::sleep(self.config.attach_retry_interval).await;
        }
    }
}

impl ModemControl for Modem {
    async fn initialize(&self) -> ModemResult<()> {
        self.session.send(&command::attention()).await?;

        let response = self.session.send(&command::sim_status()).await?;
        if !response.contains("READY") {
            return Err(ModemError::SimNotReady(response.trim().to_string()));
        }
        info!("SIM ready");

        self.session.send(&command::pdu_mode()).await?;
        self.session.send(&command::ucs2_character_set()).await?;
        self.session.send(&command::sim_storage()).await?;
        self.session.send(&command::new_message_indication()).await?;

        self.wait_for_attach().await?;

        let cleanup = command::delete(1, DeleteFlag::ReadAndSent);
        if let Err(e) = self.session.send(&cleanup).await {
            warn!("Could not delete read and sent messages: {}", e);
        }

        info!("Modem initialized");
        Ok(())
    }

    async fn restart(&self) -> ModemResult<()> {
        self.session.send(&command::restart()).await?;
        info!(
            "Module restarting, waiting {:?} before reopening",
            self.config.restart_settle
        );
        tokio::time::sleep(self.config.restart_settle).await;
        self.session.close().await;
        self.initialize().await
    }

    async fn raw_command(
        &self,
        text: &str,
        keywords: &[&str],
        timeout: Duration,
    ) -> ModemResult<String> {
        let mut command = AtCommand::new(text).with_timeout(timeout);
        if !keywords.is_empty() {
            command = command.expect_any(keywords.iter().copied());
        }
        self.session.send(&command).await
    }
}

impl SmsTransmitter for Modem {
    async fn send_sms(&self, sms: &OutboundSms) -> ModemResult<Vec<u8>> {
        let parts = self.encoder.encode_sms(sms)?;
        self.session.send(&command::pdu_mode()).await?;

        let mut references = Vec::with_capacity(parts.len());
        let mut guard = self.session.lock().await;
        for part in &parts {
            match send_part(&mut guard, part).await {
                Ok(reference) => {
                    info!(
                        "Sent part {}/{} to {} as reference {}",
                        part.sequence, part.total, sms.to, reference
                    );
                    references.push(reference);
                }
                Err(e) => {
                    if !references.is_empty() {
                        warn!(
                            "Part {}/{} to {} failed, parts already sent as references {:?}",
                            part.sequence, part.total, sms.to, references
                        );
                    }
                    return Err(e);
                }
            }
        }

        Ok(references)
    }
}

/// Prompt, PDU, then the reference from the completed response
async fn send_part(guard: &mut SessionGuard<'_>, part: &PduPart) -> ModemResult<u8> {
    guard.send(&command::send_length(part.tpdu_len())).await?;
    let response = guard.send(&command::send_pdu(&part.hex())).await?;
    parse_message_reference(&response)
}

/// Reads `<state>` from a `+CGATT: <state>` line
fn attach_state(response: &str) -> Option<u8> {
    let (_, rest) = response.split_once("+CGATT:")?;
    rest.trim_start().chars().next()?.to_digit(10).map(|d| d as u8)
}

/// Extracts `<mr>` from a `+CMGS: <mr>` answer
fn parse_message_reference(response: &str) -> ModemResult<u8> {
    response
        .split_once("+CMGS:")
        .and_then(|(_, rest)| {
            let rest = rest.trim_start();
            let end = rest
                .find(|c: char| !c.is_ascii_digit())
                .unwrap_or(rest.len());
            rest[..end].parse().ok()
        })
        .ok_or_else(|| ModemError::MalformedResponse(response.trim().to_string()))
}

// ABOUTME: Inbox polling loop: lists unread messages, decodes them, joins concatenated parts and notifies
// ABOUTME: Malformed listings and PDUs are logged and skipped so one bad entry never stalls the inbox

use crate::client::command::{self, DeleteFlag, MessageStatus};
use crate::client::config::ListenerConfig;
use crate::client::error::ModemResult;
use crate::client::notify::{Notification, Notifier};
use crate::client::session::CommandSession;
use crate::pdu::{InboundSms, PduDecoder};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

/// Stops a running listener at its next iteration
#[derive(Clone, Debug, Default)]
pub struct StopHandle {
    stopped: Arc<AtomicBool>,
}

impl StopHandle {
    pub fn stop(&self) {
        self.stopped.store(true, Ordering::Release);
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::Acquire)
    }
}

/// One `+CMGL` entry
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ListedMessage {
    /// Storage index on the SIM
    pub index: u16,
    /// `None` when the modem reports a status outside 0-4
    pub status: Option<MessageStatus>,
    /// TPDU length announced in the header
    pub length: Option<usize>,
    pub pdu: String,
}

impl ListedMessage {
    /// Parse `+CMGL: <index>,<stat>,[<alpha>],<length>` and its PDU line
    fn parse(header: &str, pdu: &str) -> Option<Self> {
        let fields: Vec<&str> = header
            .strip_prefix("+CMGL:")?
            .split(',')
            .map(str::trim)
            .collect();
        let index = fields.first()?.parse().ok()?;
        let status = fields
            .get(1)
            .and_then(|s| s.parse::<u8>().ok())
            .and_then(|s| MessageStatus::try_from(s).ok());
        let length = fields.last().and_then(|s| s.parse().ok());

        Some(Self {
            index,
            status,
            length,
            pdu: pdu.to_string(),
        })
    }
}

/// Outcome of one poll
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PollReport {
    /// Header and PDU pairs found in the listing
    pub listed: usize,
    pub decoded: usize,
    /// PDUs that failed to decode
    pub failed: usize,
    /// Headers without a PDU line, or that could not be parsed
    pub skipped_headers: usize,
    /// Notifications delivered
    pub dispatched: usize,
}

/// Parses an `AT+CMGL` response into its entries. Returns the entries and
/// the number of headers that had to be skipped.
pub fn parse_listing(response: &str) -> (Vec<ListedMessage>, usize) {
    let lines: Vec<&str> = response
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect();

    let mut messages = Vec::new();
    let mut skipped = 0;
    let mut i = 0;
    while i < lines.len() {
        let line = lines[i];
        if !line.starts_with("+CMGL:") {
            i += 1;
            continue;
        }

        match lines.get(i + 1) {
            Some(next) if !next.starts_with("+CMGL:") && !is_final_result(next) => {
                match ListedMessage::parse(line, next) {
                    Some(message) => messages.push(message),
                    None => {
                        warn!("Unparseable listing header {:?}, skipping", line);
                        skipped += 1;
                    }
                }
                i += 2;
            }
            _ => {
                warn!("Listing header {:?} has no PDU line, skipping", line);
                skipped += 1;
                i += 1;
            }
        }
    }

    (messages, skipped)
}

fn is_final_result(line: &str) -> bool {
    line == "OK"
        || line == "ERROR"
        || line.starts_with("+CMS ERROR")
        || line.starts_with("+CME ERROR")
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
struct ReassemblyKey {
    sender: String,
    reference: u16,
    total: u8,
}

#[derive(Debug)]
struct PendingMessage {
    first_seen: Instant,
    parts: BTreeMap<u8, InboundSms>,
}

/// Joins parts in sequence order on top of the first part's metadata
fn join_parts(parts: BTreeMap<u8, InboundSms>) -> Option<InboundSms> {
    let mut parts = parts.into_values();
    let mut joined = parts.next()?;
    for part in parts {
        joined.text.push_str(&part.text);
    }
    Some(joined)
}

/// Polls the SIM inbox and hands every received message to a notifier.
///
/// # Example
///
/// ```rust,no_run
/// use airlink::client::{CommandSession, Dispatcher, ListenerConfig, MessageListener, SerialSettings};
/// use std::sync::Arc;
///
/// # async fn example() {
/// let session = Arc::new(CommandSession::new(SerialSettings::new("/dev/ttyUSB2")));
/// let config = ListenerConfig::default();
/// let dispatcher = Dispatcher::from_enabled(&config.channels, None);
/// let mut listener = MessageListener::new(session, dispatcher, config);
///
/// let stop = listener.stop_handle();
/// let task = tokio::spawn(async move { listener.run().await });
/// // later
/// stop.stop();
/// task.await.unwrap();
/// # }
/// ```
#[derive(Debug)]
pub struct MessageListener<N: Notifier> {
    session: Arc<CommandSession>,
    notifier: N,
    config: ListenerConfig,
    stop: StopHandle,
    pending: HashMap<ReassemblyKey, PendingMessage>,
}

impl<N: Notifier> MessageListener<N> {
    pub fn new(session: Arc<CommandSession>, notifier: N, config: ListenerConfig) -> Self {
        Self {
            session,
            notifier,
            config,
            stop: StopHandle::default(),
            pending: HashMap::new(),
        }
    }

    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    /// Concatenated messages still waiting for parts
    pub fn pending_messages(&self) -> usize {
        self.pending.len()
    }

    /// Poll until stopped. Errors are logged and never end the loop.
    pub async fn run(&mut self) {
        info!(
            "Listening for messages every {:?} via {}",
            self.config.poll_interval,
            self.notifier.name()
        );
        while !self.stop.is_stopped() {
            match self.poll_once().await {
                Ok(report) if report.listed > 0 || report.skipped_headers > 0 => {
                    info!(
                        "Polled inbox: {} listed, {} decoded, {} failed, {} skipped, {} dispatched",
                        report.listed,
                        report.decoded,
                        report.failed,
                        report.skipped_headers,
                        report.dispatched
                    );
                }
                Ok(_) => {}
                Err(e) => error!("Inbox poll failed: {}", e),
            }
            tokio::time::sleep(self.config.poll_interval).await;
        }
        info!("Listener stopped");
    }

    /// One iteration: list unread, decode, dispatch, delete read messages
    pub async fn poll_once(&mut self) -> ModemResult<PollReport> {
        let response = self
            .session
            .send(&command::list(MessageStatus::ReceivedUnread))
            .await?;
        let (listed, skipped_headers) = parse_listing(&response);
        let mut report = PollReport {
            listed: listed.len(),
            skipped_headers,
            ..Default::default()
        };

        for message in &listed {
            match PduDecoder::decode(&message.pdu) {
                Ok(sms) => {
                    debug!(
                        "Decoded message {} from {} ({})",
                        message.index, sms.sender, sms.data_coding
                    );
                    report.decoded += 1;
                    report.dispatched += self.accept(sms).await;
                }
                Err(e) => {
                    warn!(
                        "Skipping message {}: {} in {:?}",
                        message.index, e, message.pdu
                    );
                    report.failed += 1;
                }
            }
        }

        report.dispatched += self.flush_expired().await;

        if report.listed > 0 {
            let cleanup = command::delete(1, DeleteFlag::Read);
            if let Err(e) = self.session.send(&cleanup).await {
                warn!("Could not delete read messages: {}", e);
            }
        }

        Ok(report)
    }

    /// Dispatch now, or buffer until every part is in. Returns the number
    /// of notifications delivered.
    async fn accept(&mut self, sms: InboundSms) -> usize {
        let concatenation = match sms.concatenation {
            Some(c) if self.config.reassemble && c.total > 1 => c,
            _ => return self.dispatch(&sms).await,
        };

        let key = ReassemblyKey {
            sender: sms.sender.to_string(),
            reference: concatenation.reference,
            total: concatenation.total,
        };
        let entry = self.pending.entry(key.clone()).or_insert_with(|| PendingMessage {
            first_seen: Instant::now(),
            parts: BTreeMap::new(),
        });
        entry.parts.insert(concatenation.sequence, sms);
        debug!(
            "Buffered part {}/{} of reference {} from {}",
            concatenation.sequence, concatenation.total, key.reference, key.sender
        );

        if entry.parts.len() < usize::from(concatenation.total) {
            return 0;
        }
        match self.pending.remove(&key).and_then(|p| join_parts(p.parts)) {
            Some(joined) => self.dispatch(&joined).await,
            None => 0,
        }
    }

    /// Dispatch incomplete messages that waited longer than the reassembly timeout
    async fn flush_expired(&mut self) -> usize {
        let timeout = self.config.reassembly_timeout;
        let expired: Vec<ReassemblyKey> = self
            .pending
            .iter()
            .filter(|(_, p)| p.first_seen.elapsed() >= timeout)
            .map(|(k, _)| k.clone())
            .collect();

        let mut dispatched = 0;
        for key in expired {
            let Some(pending) = self.pending.remove(&key) else {
                continue;
            };
            warn!(
                "Reference {} from {} incomplete after {:?}: {}/{} parts, dispatching what arrived",
                key.reference,
                key.sender,
                timeout,
                pending.parts.len(),
                key.total
            );
            if let Some(joined) = join_parts(pending.parts) {
                dispatched += self.dispatch(&joined).await;
            }
        }
        dispatched
    }

    async fn dispatch(&self, sms: &InboundSms) -> usize {
        let notification = Notification::from_sms(sms, self.config.display_offset);
        match self
            .notifier
            .notify(&notification.title, &notification.body)
            .await
        {
            Ok(()) => 1,
            Err(e) => {
                warn!("Notification for message from {} failed: {}", sms.sender, e);
                0
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::notify::ForwardNotifier;
    use crate::client::testing::fake_modem;
    use crate::datatypes::Concatenation;
    use crate::pdu::fixture::deliver_pdu;
    use std::time::Duration;
    use tokio::sync::mpsc;

    fn listing(entries: &[String]) -> String {
        let mut response = String::from("\r\n");
        for entry in entries {
            response.push_str(entry);
            response.push_str("\r\n");
        }
        response.push_str("\r\nOK\r\n");
        response
    }

    fn listener_for(
        listing: String,
        config: ListenerConfig,
    ) -> (
        MessageListener<ForwardNotifier>,
        mpsc::Receiver<Notification>,
        tokio::task::JoinHandle<Vec<String>>,
    ) {
        let (stream, modem) = fake_modem(move |command| {
            if command.starts_with("AT+CMGL=0") {
                Some(listing.clone())
            } else {
                Some("\r\nOK\r\n".to_string())
            }
        });
        let (sender, receiver) = mpsc::channel(16);
        let listener = MessageListener::new(
            Arc::new(CommandSession::from_stream(stream)),
            ForwardNotifier::new(sender),
            config,
        );
        (listener, receiver, modem)
    }

    #[test]
    fn test_parse_listing_pairs() {
        let response = "\r\n+CMGL: 1,0,,24\r\n0791AB\r\n+CMGL: 2,1,\"\",30\r\n0791CD\r\n\r\nOK\r\n";
        let (messages, skipped) = parse_listing(response);
        assert_eq!(skipped, 0);
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].index, 1);
        assert_eq!(messages[0].status, Some(MessageStatus::ReceivedUnread));
        assert_eq!(messages[0].length, Some(24));
        assert_eq!(messages[1].status, Some(MessageStatus::ReceivedRead));
        assert_eq!(messages[1].pdu, "0791CD");
    }

    #[test]
    fn test_header_without_pdu_is_skipped() {
        // header followed by another header, then a header followed by OK
        let response = "+CMGL: 1,0,,24\r\n+CMGL: 2,0,,24\r\n0791AB\r\n+CMGL: 3,0,,24\r\nOK\r\n";
        let (messages, skipped) = parse_listing(response);
        assert_eq!(skipped, 2);
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].index, 2);
    }

    #[test]
    fn test_empty_listing() {
        assert_eq!(parse_listing("\r\nOK\r\n"), (Vec::new(), 0));
    }

    #[tokio::test]
    async fn test_poll_skips_bad_entries_and_deletes() {
        let entries = vec![
            "+CMGL: 0,0,,24".to_string(),
            deliver_pdu("+8613800138000", "first", None),
            "+CMGL: 1,0,,24".to_string(),
            "+CMGL: 2,0,,24".to_string(),
            "0791ABC".to_string(),
            "+CMGL: 3,0,,24".to_string(),
            deliver_pdu("10086", "second", None),
        ];
        let (mut listener, mut notifications, modem) =
            listener_for(listing(&entries), ListenerConfig::default());

        let report = listener.poll_once().await.unwrap();
        assert_eq!(
            report,
            PollReport {
                listed: 3,
                decoded: 2,
                failed: 1,
                skipped_headers: 1,
                dispatched: 2,
            }
        );

        let first = notifications.recv().await.unwrap();
        assert_eq!(first.title, "new sms from +8613800138000");
        assert!(first.body.starts_with("first,\nreceive time: "));
        let second = notifications.recv().await.unwrap();
        assert_eq!(second.title, "new sms from 10086");

        drop(listener);
        let commands = modem.await.unwrap();
        assert_eq!(commands, vec!["AT+CMGL=0\r", "AT+CMGD=1,1\r"]);
    }

    #[tokio::test]
    async fn test_empty_inbox_does_not_delete() {
        let (mut listener, _notifications, modem) =
            listener_for(listing(&[]), ListenerConfig::default());

        let report = listener.poll_once().await.unwrap();
        assert_eq!(report, PollReport::default());

        drop(listener);
        assert_eq!(modem.await.unwrap(), vec!["AT+CMGL=0\r"]);
    }

    #[tokio::test]
    async fn test_parts_are_joined_in_sequence() {
        let entries = vec![
            "+CMGL: 4,0,,40".to_string(),
            deliver_pdu("+8613800138000", "world!", Concatenation::new(9, 2, 2)),
            "+CMGL: 5,0,,40".to_string(),
            deliver_pdu("+8613800138000", "Hello, ", Concatenation::new(9, 2, 1)),
        ];
        let (mut listener, mut notifications, _modem) =
            listener_for(listing(&entries), ListenerConfig::default());

        let report = listener.poll_once().await.unwrap();
        assert_eq!(report.decoded, 2);
        assert_eq!(report.dispatched, 1);
        assert_eq!(listener.pending_messages(), 0);

        let joined = notifications.recv().await.unwrap();
        assert!(joined.body.starts_with("Hello, world!,\n"));
    }

    #[tokio::test]
    async fn test_incomplete_message_waits_then_flushes() {
        let entries = vec![
            "+CMGL: 4,0,,40".to_string(),
            deliver_pdu("+8613800138000", "only part", Concatenation::new(3, 2, 1)),
        ];

        let (mut waiting, _notifications, _modem) =
            listener_for(listing(&entries), ListenerConfig::default());
        let report = waiting.poll_once().await.unwrap();
        assert_eq!(report.dispatched, 0);
        assert_eq!(waiting.pending_messages(), 1);

        let config = ListenerConfig::default().with_reassembly_timeout(Duration::ZERO);
        let (mut flushing, mut notifications, _modem) = listener_for(listing(&entries), config);
        let report = flushing.poll_once().await.unwrap();
        assert_eq!(report.dispatched, 1);
        assert_eq!(flushing.pending_messages(), 0);
        assert!(notifications.recv().await.unwrap().body.starts_with("only part,"));
    }

    #[tokio::test]
    async fn test_reassembly_disabled_dispatches_each_part() {
        let entries = vec![
            "+CMGL: 4,0,,40".to_string(),
            deliver_pdu("10086", "part one", Concatenation::new(1, 2, 1)),
            "+CMGL: 5,0,,40".to_string(),
            deliver_pdu("10086", "part two", Concatenation::new(1, 2, 2)),
        ];
        let config = ListenerConfig::default().with_reassembly(false);
        let (mut listener, _notifications, _modem) = listener_for(listing(&entries), config);

        let report = listener.poll_once().await.unwrap();
        assert_eq!(report.dispatched, 2);
    }

    #[tokio::test]
    async fn test_run_stops_on_handle() {
        let (mut listener, _notifications, _modem) = listener_for(
            listing(&[]),
            ListenerConfig::default().with_poll_interval(Duration::from_millis(5)),
        );
        let stop = listener.stop_handle();
        let task = tokio::spawn(async move { listener.run().await });

        tokio::time::sleep(Duration::from_millis(20)).await;
        stop.stop();
        tokio::time::timeout(Duration::from_secs(1), task)
            .await
            .unwrap()
            .unwrap();
    }
}

// ABOUTME: Notification boundary: the Notifier capability, built-in channels and the fan-out dispatcher
// ABOUTME: Turns received SMS into title/body pairs and hands them to every enabled channel

use crate::pdu::InboundSms;
use chrono::FixedOffset;
use std::future::Future;
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{info, warn};

/// Error type for notification delivery
#[derive(Debug, Error)]
pub enum NotifyError {
    /// The receiving end of a forward channel has gone away
    #[error("Notification channel {0} is closed")]
    ChannelClosed(String),

    /// A channel reported a delivery failure
    #[error("Notification via {channel} failed: {reason}")]
    Failed { channel: String, reason: String },

    /// Every enabled channel failed
    #[error("All {0} notification channels failed")]
    AllFailed(usize),
}

/// Something that can deliver a notification.
///
/// Implementations outside the crate (HTTP push services, mail) plug in
/// here; the listener only ever sees this trait.
pub trait Notifier: Send + Sync {
    /// Identifier used in logs and in the enabled-channel list
    fn name(&self) -> &str;

    fn notify(
        &self,
        title: &str,
        body: &str,
    ) -> impl Future<Output = Result<(), NotifyError>> + Send;
}

/// A rendered notification
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Notification {
    pub title: String,
    pub body: String,
}

impl Notification {
    pub fn new(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            body: body.into(),
        }
    }

    /// Renders the receive time in `display_offset`
    pub fn from_sms(sms: &InboundSms, display_offset: FixedOffset) -> Self {
        let received = sms.timestamp.with_timezone(&display_offset);
        Self {
            title: format!("new sms from {}", sms.sender),
            body: format!(
                "{},\nreceive time: {}",
                sms.text,
                received.format("%Y-%m-%d %H:%M:%S%:z")
            ),
        }
    }
}

/// Writes notifications to the log at `info`
#[derive(Debug, Default, Clone)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn name(&self) -> &str {
        "log"
    }

    async fn notify(&self, title: &str, body: &str) -> Result<(), NotifyError> {
        info!("{}: {}", title, body);
        Ok(())
    }
}

/// Pushes notifications onto a channel drained by an external sender
#[derive(Debug, Clone)]
pub struct ForwardNotifier {
    sender: mpsc::Sender<Notification>,
}

impl ForwardNotifier {
    pub fn new(sender: mpsc::Sender<Notification>) -> Self {
        Self { sender }
    }
}

impl Notifier for ForwardNotifier {
    fn name(&self) -> &str {
        "forward"
    }

    async fn notify(&self, title: &str, body: &str) -> Result<(), NotifyError> {
        self.sender
            .send(Notification::new(title, body))
            .await
            .map_err(|_| NotifyError::ChannelClosed(self.name().to_string()))
    }
}

/// The built-in channels, selectable by id
#[derive(Debug, Clone)]
pub enum NotificationChannel {
    Log(LogNotifier),
    Forward(ForwardNotifier),
}

impl Notifier for NotificationChannel {
    fn name(&self) -> &str {
        match self {
            NotificationChannel::Log(n) => n.name(),
            NotificationChannel::Forward(n) => n.name(),
        }
    }

    async fn notify(&self, title: &str, body: &str) -> Result<(), NotifyError> {
        match self {
            NotificationChannel::Log(n) => n.notify(title, body).await,
            NotificationChannel::Forward(n) => n.notify(title, body).await,
        }
    }
}

/// Fans a notification out to every enabled channel
#[derive(Debug, Clone, Default)]
pub struct Dispatcher {
    channels: Vec<NotificationChannel>,
}

impl Dispatcher {
    pub fn new(channels: Vec<NotificationChannel>) -> Self {
        Self { channels }
    }

    /// Build the channel list from enabled ids, keeping their order.
    /// Unknown ids, and `forward` without a sender, are logged and skipped.
    pub fn from_enabled<I, S>(ids: I, forward: Option<mpsc::Sender<Notification>>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut channels = Vec::new();
        for id in ids {
            match (id.as_ref().trim(), &forward) {
                ("log", _) => channels.push(NotificationChannel::Log(LogNotifier)),
                ("forward", Some(sender)) => channels.push(NotificationChannel::Forward(
                    ForwardNotifier::new(sender.clone()),
                )),
                ("forward", None) => warn!("Channel forward enabled without a receiver, skipping"),
                ("", _) => {}
                (other, _) => warn!("Unknown notification channel {:?}, skipping", other),
            }
        }
        Self { channels }
    }

    pub fn channels(&self) -> &[NotificationChannel] {
        &self.channels
    }
}

impl Notifier for Dispatcher {
    fn name(&self) -> &str {
        "dispatcher"
    }

    /// Succeeds when any channel succeeds, or when there are none
    async fn notify(&self, title: &str, body: &str) -> Result<(), NotifyError> {
        let mut failures = 0;
        for channel in &self.channels {
            if let Err(e) = channel.notify(title, body).await {
                warn!("Notification via {} failed: {}", channel.name(), e);
                failures += 1;
            }
        }

        if failures > 0 && failures == self.channels.len() {
            Err(NotifyError::AllFailed(failures))
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pdu::{PduDecoder, fixture};

    #[test]
    fn test_notification_from_sms() {
        let line = fixture::deliver_pdu("+8613800138000", "Your code is 1234", None);
        let sms = PduDecoder::decode(&line).unwrap();

        let local = Notification::from_sms(&sms, FixedOffset::east_opt(8 * 3600).unwrap());
        assert_eq!(local.title, "new sms from +8613800138000");
        assert_eq!(
            local.body,
            "Your code is 1234,\nreceive time: 2024-05-21 14:30:05+08:00"
        );

        let utc = Notification::from_sms(&sms, FixedOffset::east_opt(0).unwrap());
        assert!(utc.body.ends_with("2024-05-21 06:30:05+00:00"));
    }

    #[test]
    fn test_from_enabled_skips_unknown() {
        let (sender, _receiver) = mpsc::channel(4);
        let dispatcher = Dispatcher::from_enabled(["forward", "bark", "log"], Some(sender));
        let names: Vec<&str> = dispatcher.channels().iter().map(|c| c.name()).collect();
        assert_eq!(names, vec!["forward", "log"]);

        let dispatcher = Dispatcher::from_enabled(["forward"], None);
        assert!(dispatcher.channels().is_empty());
    }

    #[tokio::test]
    async fn test_forward_delivers() {
        let (sender, mut receiver) = mpsc::channel(4);
        let dispatcher = Dispatcher::from_enabled(["log", "forward"], Some(sender));
        dispatcher.notify("title", "body").await.unwrap();
        assert_eq!(
            receiver.recv().await,
            Some(Notification::new("title", "body"))
        );
    }

    #[tokio::test]
    async fn test_dispatch_succeeds_if_any_channel_does() {
        let (sender, receiver) = mpsc::channel(4);
        drop(receiver);

        let partial = Dispatcher::from_enabled(["forward", "log"], Some(sender.clone()));
        assert!(partial.notify("t", "b").await.is_ok());

        let failing = Dispatcher::from_enabled(["forward"], Some(sender));
        assert!(matches!(
            failing.notify("t", "b").await,
            Err(NotifyError::AllFailed(1))
        ));

        assert!(Dispatcher::default().notify("t", "b").await.is_ok());
    }
}

// ABOUTME: Typed configuration for the serial link, modem bring-up and the inbox listener
// ABOUTME: Plain structs with defaults and consuming builders, passed in at construction

use chrono::{FixedOffset, Offset, Utc};
use std::time::Duration;

/// Serial device parameters
///
/// # Example
///
/// ```rust
/// use airlink::client::SerialSettings;
/// use std::time::Duration;
///
/// let settings = SerialSettings::new("/dev/ttyUSB2")
///     .with_baud_rate(9600)
///     .with_timeout(Duration::from_millis(500));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SerialSettings {
    /// Device path, e.g. `/dev/ttyUSB2` or `COM3`
    pub path: String,
    /// Line speed (default: 115200)
    pub baud_rate: u32,
    /// Driver-level read timeout (default: 1 second). Command deadlines are
    /// set per `AtCommand`, not here.
    pub timeout: Duration,
}

impl Default for SerialSettings {
    fn default() -> Self {
        Self {
            path: "/dev/ttyUSB2".to_string(),
            baud_rate: 115_200,
            timeout: Duration::from_secs(1),
        }
    }
}

impl SerialSettings {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            ..Default::default()
        }
    }

    pub fn with_baud_rate(mut self, baud_rate: u32) -> Self {
        self.baud_rate = baud_rate;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Modem bring-up and restart behaviour
#[derive(Debug, Clone)]
pub struct ModemConfig {
    /// Pause between `AT+CGATT?` polls while waiting for network attach
    /// (default: 5 seconds)
    pub attach_retry_interval: Duration,

    /// Give up waiting for attach after this many polls. `None` (the
    /// default) waits indefinitely.
    pub attach_attempts: Option<u32>,

    /// Time the module needs after `AT+CFUN=1,1` before the port is usable
    /// again (default: 3 seconds)
    pub restart_settle: Duration,
}

impl Default for ModemConfig {
    fn default() -> Self {
        Self {
            attach_retry_interval: Duration::from_secs(5),
            attach_attempts: None,
            restart_settle: Duration::from_secs(3),
        }
    }
}

impl ModemConfig {
    pub fn with_attach_retry_interval(mut self, interval: Duration) -> Self {
        self.attach_retry_interval = interval;
        self
    }

    pub fn with_attach_attempts(mut self, attempts: u32) -> Self {
        self.attach_attempts = Some(attempts);
        self
    }

    pub fn with_restart_settle(mut self, settle: Duration) -> Self {
        self.restart_settle = settle;
        self
    }
}

/// Inbox polling, reassembly and notification settings
///
/// # Example
///
/// ```rust
/// use airlink::client::ListenerConfig;
/// use chrono::FixedOffset;
/// use std::time::Duration;
///
/// let config = ListenerConfig::default()
///     .with_poll_interval(Duration::from_secs(2))
///     .with_display_offset(FixedOffset::east_opt(0).unwrap())
///     .with_channels(["log", "forward"]);
/// ```
#[derive(Debug, Clone)]
pub struct ListenerConfig {
    /// Sleep between inbox polls (default: 1 second)
    pub poll_interval: Duration,

    /// Join concatenated parts before notifying (default: true). When
    /// false every part is dispatched on its own.
    pub reassemble: bool,

    /// Incomplete concatenated messages older than this are dispatched with
    /// the parts received so far (default: 10 minutes)
    pub reassembly_timeout: Duration,

    /// Offset used to render receive times in notifications (default: +08:00)
    pub display_offset: FixedOffset,

    /// Enabled notification channel ids, in dispatch order (default: `log`)
    pub channels: Vec<String>,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(1),
            reassemble: true,
            reassembly_timeout: Duration::from_secs(600),
            display_offset: china_standard_time(),
            channels: vec!["log".to_string()],
        }
    }
}

impl ListenerConfig {
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_reassembly(mut self, enabled: bool) -> Self {
        self.reassemble = enabled;
        self
    }

    pub fn with_reassembly_timeout(mut self, timeout: Duration) -> Self {
        self.reassembly_timeout = timeout;
        self
    }

    pub fn with_display_offset(mut self, offset: FixedOffset) -> Self {
        self.display_offset = offset;
        self
    }

    pub fn with_channels<I, S>(mut self, channels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.channels = channels.into_iter().map(Into::into).collect();
        self
    }
}

fn china_standard_time() -> FixedOffset {
    FixedOffset::east_opt(8 * 3600).unwrap_or_else(|| Utc.fix())
}

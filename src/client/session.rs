// ABOUTME: Serializes AT commands over the single serial connection and classifies the modem's answers
// ABOUTME: Opens the port lazily, holds an async mutex per exchange and drops the link on channel failures

use crate::client::command::{AtCommand, ResponseMatch};
use crate::client::config::SerialSettings;
use crate::client::error::{ModemError, ModemResult};
use crate::connection::{Connection, Transport};
use std::io;
use tokio::sync::{Mutex, MutexGuard};
use tokio::time::{Instant, timeout_at};
use tracing::{debug, error, info, warn};

/// Exclusive access to the modem's command channel.
///
/// At most one command is outstanding at a time: every exchange holds the
/// session's async mutex from write until the response is classified, so
/// the foreground `Modem` and a background listener can share one session
/// through an `Arc`.
///
/// # Example
///
/// ```rust,no_run
/// use airlink::client::{AtCommand, CommandSession, SerialSettings};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let session = CommandSession::new(SerialSettings::new("/dev/ttyUSB2"));
/// let response = session.send(&AtCommand::new("AT")).await?;
/// println!("{response}");
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct CommandSession {
    connection: Mutex<Option<Connection>>,
    // None for sessions built around an existing stream; those cannot reopen
    settings: Option<SerialSettings>,
}

impl CommandSession {
    /// A session that opens the serial port on first use
    pub fn new(settings: SerialSettings) -> Self {
        Self {
            connection: Mutex::new(None),
            settings: Some(settings),
        }
    }

    /// A session whose port is opened immediately
    pub fn open(settings: SerialSettings) -> ModemResult<Self> {
        let connection = Connection::open(&settings)?;
        info!("Serial session opened on {}", settings.path);
        Ok(Self {
            connection: Mutex::new(Some(connection)),
            settings: Some(settings),
        })
    }

    /// A session over an already-connected stream
    pub fn from_stream<T>(stream: T) -> Self
    where
        T: Transport + 'static,
    {
        Self {
            connection: Mutex::new(Some(Connection::new(stream))),
            settings: None,
        }
    }

    pub fn settings(&self) -> Option<&SerialSettings> {
        self.settings.as_ref()
    }

    /// Wait for exclusive use of the channel, for exchanges that span
    /// several commands
    pub async fn lock(&self) -> SessionGuard<'_> {
        SessionGuard {
            connection: self.connection.lock().await,
            settings: self.settings.as_ref(),
        }
    }

    /// Send one command and wait for its outcome
    pub async fn send(&self, command: &AtCommand) -> ModemResult<String> {
        self.lock().await.send(command).await
    }

    /// Release the port. A session with settings reopens on the next send.
    pub async fn close(&self) {
        if self.connection.lock().await.take().is_some() {
            info!("Serial session closed");
        }
    }

    pub async fn is_open(&self) -> bool {
        self.connection.lock().await.is_some()
    }
}

/// Holds the session lock; dropping it lets the next caller in
#[derive(Debug)]
pub struct SessionGuard<'a> {
    connection: MutexGuard<'a, Option<Connection>>,
    settings: Option<&'a SerialSettings>,
}

impl SessionGuard<'_> {
    /// Send one command while holding the lock.
    ///
    /// Returns the accumulated response once a success keyword appears,
    /// `Rejected` if an error keyword appears first, `Timeout` if neither
    /// arrives in time. End of stream and I/O failures drop the connection.
    pub async fn send(&mut self, command: &AtCommand) -> ModemResult<String> {
        let label = command.label();
        let connection = self.connection_mut()?;

        let result = exchange(connection, command, &label).await;
        if let Err(e) = &result {
            if e.is_connection_lost() {
                error!("Command {:?} lost the serial connection: {}", label, e);
                *self.connection = None;
            }
        }
        result
    }

    fn connection_mut(&mut self) -> ModemResult<&mut Connection> {
        if self.connection.is_none() {
            let settings = self.settings.ok_or_else(closed)?;
            *self.connection = Some(Connection::open(settings)?);
            info!("Serial session opened on {}", settings.path);
        }
        self.connection.as_mut().ok_or_else(closed)
    }
}

fn closed() -> ModemError {
    ModemError::PortUnavailable(io::Error::new(
        io::ErrorKind::NotConnected,
        "serial session is closed",
    ))
}

async fn exchange(
    connection: &mut Connection,
    command: &AtCommand,
    label: &str,
) -> ModemResult<String> {
    connection.discard_pending().await?;
    debug!(">> {:?}", label);
    connection.write_payload(command.payload()).await?;

    let deadline = Instant::now() + command.timeout();
    loop {
        let outcome = command.match_response(&String::from_utf8_lossy(connection.buffered()));
        if let Some(outcome) = outcome {
            let response = String::from_utf8_lossy(&connection.take_buffered()).into_owned();
            debug!("<< {:?}", response);
            return match outcome {
                ResponseMatch::Success => {
                    info!("Command {:?} succeeded", label);
                    Ok(response)
                }
                ResponseMatch::Error => {
                    warn!("Command {:?} rejected: {:?}", label, response.trim());
                    Err(ModemError::Rejected {
                        command: label.to_string(),
                        response,
                    })
                }
            };
        }

        match timeout_at(deadline, connection.read_more()).await {
            Ok(Ok(0)) => return Err(ModemError::UnexpectedClose),
            Ok(Ok(_)) => {}
            Ok(Err(e)) => return Err(ModemError::PortUnavailable(e)),
            Err(_) => {
                let partial = connection.take_buffered();
                warn!(
                    "Command {:?} timed out after {:?}, discarding {} bytes",
                    label,
                    command.timeout(),
                    partial.len()
                );
                return Err(ModemError::Timeout {
                    command: label.to_string(),
                    timeout: command.timeout(),
                });
            }
        }
    }
}

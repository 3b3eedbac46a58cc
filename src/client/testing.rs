// ABOUTME: Scripted in-memory modem used by the session, modem and listener tests
// ABOUTME: Reads commands off a duplex stream and answers each one through a closure

use tokio::io::{AsyncReadExt, AsyncWriteExt, DuplexStream, duplex};
use tokio::task::JoinHandle;

/// Reads one command, ending at `\r` or Ctrl-Z and returned with its
/// terminator. `None` once the near end is dropped.
pub(crate) async fn read_command(stream: &mut DuplexStream) -> Option<String> {
    let mut current = Vec::new();
    loop {
        let byte = stream.read_u8().await.ok()?;
        current.push(byte);
        if byte == b'\r' || byte == 0x1A {
            return Some(String::from_utf8_lossy(&current).into_owned());
        }
    }
}

/// Spawns a modem on the far end of a duplex stream.
///
/// `respond` sees each command with its terminator and returns the bytes to
/// answer with, or `None` to stay silent. The task finishes when the near
/// end is dropped and yields every command received.
pub(crate) fn fake_modem<F>(mut respond: F) -> (DuplexStream, JoinHandle<Vec<String>>)
where
    F: FnMut(&str) -> Option<String> + Send + 'static,
{
    let (near, mut far) = duplex(16 * 1024);
    let handle = tokio::spawn(async move {
        let mut received = Vec::new();
        while let Some(command) = read_command(&mut far).await {
            let reply = respond(&command);
            received.push(command);
            if let Some(reply) = reply {
                if far.write_all(reply.as_bytes()).await.is_err() {
                    break;
                }
            }
        }
        received
    });
    (near, handle)
}

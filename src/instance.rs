//! Single-instance guard.
//!
//! The first process binds `instance.sock` in the data directory. Later
//! invocations connect, forward their argv as one JSON line and exit; the
//! primary receives the argv on a channel.

use std::path::{Path, PathBuf};
#[cfg(unix)]
use std::time::Duration;

use thiserror::Error;
use tokio::sync::mpsc;

pub const SOCKET_FILE: &str = "instance.sock";

#[derive(Debug, Error)]
pub enum InstanceError {
    #[error("instance socket I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to encode arguments: {0}")]
    Encode(#[from] serde_json::Error),
}

/// How long a connecting instance gets to deliver its arguments.
#[cfg(unix)]
const READ_TIMEOUT: Duration = Duration::from_secs(5);
#[cfg(unix)]
const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);
/// Upper bound on one forwarded argv line.
#[cfg(unix)]
const MAX_LINE: u64 = 64 * 1024;

pub enum Acquired {
    /// This process is the primary; `None` where forwarding is unsupported.
    Primary(Option<InstanceListener>),
    /// Another instance is running and received our arguments.
    Forwarded,
}

fn is_not_running(err: &std::io::Error) -> bool {
    matches!(
        err.kind(),
        std::io::ErrorKind::NotFound | std::io::ErrorKind::ConnectionRefused
    )
}

#[cfg(unix)]
pub async fn acquire(data_dir: &Path, argv: &[String]) -> Result<Acquired, InstanceError> {
    use tokio::io::AsyncWriteExt;
    use tokio::net::{UnixListener, UnixStream};

    let path = data_dir.join(SOCKET_FILE);
    match UnixStream::connect(&path).await {
        Ok(mut stream) => {
            let payload = serde_json::to_string(argv)?;
            stream.write_all(format!("{}\n", payload).as_bytes()).await?;
            stream.flush().await?;
            tracing::info!(socket = %path.display(), "Forwarded arguments to running instance");
            Ok(Acquired::Forwarded)
        }
        Err(e) if is_not_running(&e) => {
            // Left behind by a crashed primary.
            match std::fs::remove_file(&path) {
                Ok(()) => tracing::debug!(socket = %path.display(), "Removed stale instance socket"),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
            let listener = UnixListener::bind(&path)?;
            Ok(Acquired::Primary(Some(InstanceListener { listener, path })))
        }
        Err(e) => Err(e.into()),
    }
}

#[cfg(not(unix))]
pub async fn acquire(_data_dir: &Path, _argv: &[String]) -> Result<Acquired, InstanceError> {
    Ok(Acquired::Primary(None))
}

pub struct InstanceListener {
    #[cfg(unix)]
    listener: tokio::net::UnixListener,
    path: PathBuf,
}

impl InstanceListener {
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Accept forwarded argv lists until `tx` closes.
    ///
    /// Each connection is read on its own task, so a client that never
    /// finishes its line cannot hold up the next one.
    #[cfg(unix)]
    pub async fn serve(self, tx: mpsc::UnboundedSender<Vec<String>>) {
        loop {
            let accepted = tokio::select! {
                biased;
                _ = tx.closed() => break,
                accepted = self.listener.accept() => accepted,
            };
            let stream = match accepted {
                Ok((stream, _)) => stream,
                Err(e) => {
                    tracing::warn!(error = %e, "Instance socket accept failed");
                    tokio::time::sleep(ACCEPT_BACKOFF).await;
                    continue;
                }
            };

            let tx = tx.clone();
            tokio::spawn(async move {
                if let Some(argv) = read_forwarded(stream).await {
                    let _ = tx.send(argv);
                }
            });
        }
    }

    #[cfg(not(unix))]
    pub async fn serve(self, _tx: mpsc::UnboundedSender<Vec<String>>) {}
}

/// One JSON argv line from a connecting instance, or `None` if it is late,
/// oversized or malformed.
#[cfg(unix)]
async fn read_forwarded(stream: tokio::net::UnixStream) -> Option<Vec<String>> {
    use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};

    let mut line = String::new();
    let mut reader = BufReader::new(stream.take(MAX_LINE));
    match tokio::time::timeout(READ_TIMEOUT, reader.read_line(&mut line)).await {
        Ok(Ok(_)) => {}
        Ok(Err(e)) => {
            tracing::warn!(error = %e, "Failed reading forwarded arguments");
            return None;
        }
        Err(_) => {
            tracing::warn!("Instance connection sent no arguments in time");
            return None;
        }
    }

    match serde_json::from_str(line.trim_end()) {
        Ok(argv) => Some(argv),
        Err(e) => {
            tracing::warn!(error = %e, "Ignoring malformed forwarded arguments");
            None
        }
    }
}

impl Drop for InstanceListener {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.path);
    }
}

//! Relay transport - newline-framed text over TCP
//!
//! Inbound lines are rate limited, parsed and queued for the match loop;
//! malformed lines are logged and dropped. Outbound messages are written
//! one per line in the order the match loop produced them.

use std::net::SocketAddr;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::util::rate_limit::RemoteRateLimiter;

use super::protocol::RemoteMessage;

/// Transport errors
#[derive(Debug, thiserror::Error)]
pub enum NetError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Inbound channel closed")]
    ChannelClosed,
}

/// Connect to the relay
pub async fn connect(addr: SocketAddr) -> Result<TcpStream, NetError> {
    let stream = TcpStream::connect(addr).await?;
    stream.set_nodelay(true)?;
    info!(%addr, "Connected to relay");
    Ok(stream)
}

/// Run a connected session until the peer closes or the match loop goes away
pub async fn run_tcp_session(
    stream: TcpStream,
    inbound_tx: mpsc::Sender<RemoteMessage>,
    outbound_rx: mpsc::Receiver<RemoteMessage>,
) -> Result<(), NetError> {
    let (reader, writer) = stream.into_split();
    run_session(reader, writer, inbound_tx, outbound_rx).await
}

/// Session over any byte stream pair
pub async fn run_session<R, W>(
    reader: R,
    mut writer: W,
    inbound_tx: mpsc::Sender<RemoteMessage>,
    mut outbound_rx: mpsc::Receiver<RemoteMessage>,
) -> Result<(), NetError>
where
    R: AsyncRead + Unpin + Send + 'static,
    W: AsyncWrite + Unpin + Send + 'static,
{
    let rate_limiter = RemoteRateLimiter::new();

    // Writer task: match loop -> relay
    let writer_handle = tokio::spawn(async move {
        while let Some(msg) = outbound_rx.recv().await {
            let line = format!("{msg}\n");
            if let Err(e) = writer.write_all(line.as_bytes()).await {
                debug!(error = %e, "Relay write failed");
                break;
            }
        }
        let _ = writer.flush().await;
    });

    // Reader loop: relay -> match loop
    let mut reader = BufReader::new(reader);
    let mut buf = Vec::new();
    let result = loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf).await {
            Ok(0) => {
                info!("Relay closed connection");
                break Ok(());
            }
            Ok(_) => {}
            Err(e) => break Err(NetError::Io(e)),
        }
        let line = match std::str::from_utf8(&buf) {
            Ok(line) => line,
            Err(e) => {
                warn!(error = %e, "Discarding non-UTF-8 remote message");
                continue;
            }
        };
        if line.trim().is_empty() {
            continue;
        }
        if !rate_limiter.check() {
            warn!("Rate limited remote message");
            continue;
        }

        match RemoteMessage::parse(line) {
            Ok(msg) => {
                if inbound_tx.send(msg).await.is_err() {
                    debug!("Inbound channel closed");
                    break Err(NetError::ChannelClosed);
                }
            }
            Err(e) => {
                warn!(error = %e, line = %line.trim_end(), "Discarding malformed remote message");
            }
        }
    };

    writer_handle.abort();
    result
}

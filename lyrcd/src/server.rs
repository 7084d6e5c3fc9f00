//! TCP front end
//!
//! One task per client. Incoming bytes are framed into lines, each non-empty
//! line becomes a [`Request`] for the engine, and the rendered response is
//! written back before the next line is read. A client holds the engine for
//! as long as it is connected plus the keep-alive delay.

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use lyrc_engine::EngineLifecycle;
use lyrc_protocol::Request;
use tokio::io::AsyncWriteExt;
use tokio::net::{TcpListener, TcpStream};
use tokio_util::codec::{FramedRead, LinesCodec, LinesCodecError};
use tracing::{debug, info, warn};

/// Longest accepted request line
pub const MAX_LINE_LENGTH: usize = 1024;

/// Accepts clients and serves them against one engine lifecycle
pub struct Server {
    listener: TcpListener,
    lifecycle: Arc<EngineLifecycle>,
    keep_alive: Duration,
}

impl Server {
    /// Bind the listening socket
    pub async fn bind(
        address: &str,
        lifecycle: Arc<EngineLifecycle>,
        keep_alive: Duration,
    ) -> io::Result<Self> {
        let listener = TcpListener::bind(address).await?;
        Ok(Self {
            listener,
            lifecycle,
            keep_alive,
        })
    }

    /// Address actually bound
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Accept clients until the listener fails
    pub async fn run(self) -> io::Result<()> {
        info!("Listening on {}", self.local_addr()?);
        loop {
            let (stream, peer) = self.listener.accept().await?;
            let lifecycle = self.lifecycle.clone();
            let keep_alive = self.keep_alive;
            tokio::spawn(async move {
                serve_client(stream, peer, lifecycle, keep_alive).await;
            });
        }
    }
}

async fn serve_client(
    stream: TcpStream,
    peer: SocketAddr,
    lifecycle: Arc<EngineLifecycle>,
    keep_alive: Duration,
) {
    info!("Client {} connected", peer);
    let handle = lifecycle.acquire().await;

    let (reader, mut writer) = stream.into_split();
    let mut lines = FramedRead::new(reader, LinesCodec::new_with_max_length(MAX_LINE_LENGTH));

    while let Some(line) = lines.next().await {
        let line = match line {
            Ok(line) => line,
            Err(LinesCodecError::MaxLineLengthExceeded) => {
                warn!("Client {} sent an overlong line, closing", peer);
                break;
            }
            Err(LinesCodecError::Io(e)) => {
                debug!("Client {} read error: {}", peer, e);
                break;
            }
        };

        let request = match Request::parse(&line) {
            Ok(request) => request,
            // Blank lines get no reply
            Err(_) => continue,
        };
        debug!("Client {} -> '{}'", peer, request.raw());

        let response = handle.submit(&request).await;
        if let Err(e) = writer.write_all(response.render().as_bytes()).await {
            debug!("Client {} write error: {}", peer, e);
            break;
        }
    }

    info!("Client {} disconnected", peer);
    drop(handle);
    if !keep_alive.is_zero() {
        tokio::time::sleep(keep_alive).await;
    }
    lifecycle.release().await;
}

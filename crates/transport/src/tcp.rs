//! Newline-delimited JSON over TCP.
//!
//! The first line sent on a new connection carries the authentication
//! metadata; every line after that is one frame in either direction:
//!
//! ```text
//! -> {"authorization":"Bearer <token>","source":"42"}
//! <- {"id":1,"request":{"kind":"ping"}}
//! -> {"id":1,"response":{"kind":"ping"}}
//! ```
//!
//! Only plaintext is supported.

use async_trait::async_trait;
use protocol::{
    AuthMetadata, Channel, Endpoint, FrameReceiver, FrameSender, InboundMessage, OutboundMessage,
    SessionStream, Transport, TransportError, TransportSecurity,
};
use serde::Serialize;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWriteExt, BufReader, BufWriter};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tracing::debug;

/// Port used when the endpoint address has none.
pub const DEFAULT_PORT: u16 = 443;

/// Longest inbound line accepted, newline excluded.
pub const MAX_FRAME_LEN: usize = 16 * 1024 * 1024;

/// NDJSON-over-TCP transport.
#[derive(Debug, Clone, Copy, Default)]
pub struct TcpTransport;

#[async_trait]
impl Transport for TcpTransport {
    async fn connect(&self, endpoint: &Endpoint) -> Result<Box<dyn Channel>, TransportError> {
        if endpoint.security == TransportSecurity::Tls {
            return Err(TransportError::Unsupported(
                "the tcp transport has no TLS support; enable insecure mode".to_string(),
            ));
        }
        let (host, port) = split_host_port(&endpoint.address)?;
        Ok(Box::new(TcpChannel { host, port }))
    }
}

/// Splits `host[:port]` or `[v6]:port`, defaulting the port to
/// [`DEFAULT_PORT`].
fn split_host_port(address: &str) -> Result<(String, u16), TransportError> {
    let invalid = |reason: &str| TransportError::InvalidAddress {
        address: address.to_string(),
        reason: reason.to_string(),
    };
    let parse_port = |port: &str| port.parse::<u16>().map_err(|_| invalid("invalid port"));

    if address.is_empty() {
        return Err(invalid("empty address"));
    }

    if let Some(rest) = address.strip_prefix('[') {
        let (host, tail) = rest
            .split_once(']')
            .ok_or_else(|| invalid("unterminated '['"))?;
        let port = match tail {
            "" => DEFAULT_PORT,
            tail => parse_port(
                tail.strip_prefix(':')
                    .ok_or_else(|| invalid("expected ':' after ']'"))?,
            )?,
        };
        return Ok((host.to_string(), port));
    }

    match address.rsplit_once(':') {
        // More than one colon without brackets: a bare IPv6 address.
        Some((host, _)) if host.contains(':') => Ok((address.to_string(), DEFAULT_PORT)),
        Some(("", _)) => Err(invalid("missing host")),
        Some((host, port)) => Ok((host.to_string(), parse_port(port)?)),
        None => Ok((address.to_string(), DEFAULT_PORT)),
    }
}

struct TcpChannel {
    host: String,
    port: u16,
}

#[derive(Serialize)]
struct Handshake {
    authorization: String,
    source: String,
}

#[async_trait]
impl Channel for TcpChannel {
    async fn open(&self, metadata: &AuthMetadata) -> Result<SessionStream, TransportError> {
        let stream = TcpStream::connect((self.host.as_str(), self.port))
            .await
            .map_err(|err| {
                TransportError::Unavailable(format!("{}:{}: {err}", self.host, self.port))
            })?;
        stream.set_nodelay(true)?;

        let (read, write) = stream.into_split();
        let mut sender = TcpSender {
            writer: BufWriter::new(write),
        };
        sender
            .write_line(&Handshake {
                authorization: metadata.authorization(),
                source: metadata.source().to_string(),
            })
            .await?;
        debug!(host = %self.host, port = self.port, "tcp stream opened");

        Ok(SessionStream {
            sender: Box::new(sender),
            receiver: Box::new(TcpReceiver::new(read, MAX_FRAME_LEN)),
        })
    }
}

struct TcpSender {
    writer: BufWriter<OwnedWriteHalf>,
}

impl TcpSender {
    async fn write_line<T: Serialize>(&mut self, frame: &T) -> Result<(), TransportError> {
        let mut line = serde_json::to_vec(frame)?;
        line.push(b'\n');
        self.writer.write_all(&line).await?;
        self.writer.flush().await?;
        Ok(())
    }
}

#[async_trait]
impl FrameSender for TcpSender {
    async fn send(&mut self, message: OutboundMessage) -> Result<(), TransportError> {
        self.write_line(&message).await
    }
}

struct TcpReceiver<R> {
    reader: BufReader<R>,
    // Partial line kept across cancelled reads.
    buf: Vec<u8>,
    max_len: usize,
}

impl<R: AsyncRead + Unpin> TcpReceiver<R> {
    fn new(read: R, max_len: usize) -> Self {
        Self {
            reader: BufReader::new(read),
            buf: Vec::new(),
            max_len,
        }
    }
}

#[async_trait]
impl<R: AsyncRead + Unpin + Send> FrameReceiver for TcpReceiver<R> {
    async fn recv(&mut self) -> Result<Option<InboundMessage>, TransportError> {
        loop {
            // One byte of headroom for the newline.
            let limit = (self.max_len + 1).saturating_sub(self.buf.len());
            let read = (&mut self.reader)
                .take(limit as u64)
                .read_until(b'\n', &mut self.buf)
                .await?;
            if self.buf.len() > self.max_len && self.buf.last() != Some(&b'\n') {
                self.buf.clear();
                return Err(TransportError::Io(std::io::Error::new(
                    std::io::ErrorKind::InvalidData,
                    format!("inbound frame exceeds {} bytes", self.max_len),
                )));
            }

            let line = std::mem::take(&mut self.buf);
            let frame = line.trim_ascii();
            if frame.is_empty() {
                if read == 0 {
                    return Ok(None);
                }
                continue;
            }
            return Ok(Some(serde_json::from_slice(frame)?));
        }
    }
}

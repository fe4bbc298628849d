//! In-process transport.
//!
//! [`pair`] returns a [`MemoryTransport`] to hand to the connector and a
//! [`MemoryServer`] that plays Stargate: it accepts each session the
//! connector opens, sees the authentication metadata, pushes requests (or
//! stream failures) and reads the responses.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use protocol::{
    AuthMetadata, Channel, Endpoint, FrameReceiver, FrameSender, InboundMessage, OutboundMessage,
    SessionStream, Transport, TransportError,
};
use tokio::sync::mpsc;

type InboundFrame = Result<InboundMessage, TransportError>;

/// Creates a connected transport/server pair.
pub fn pair() -> (MemoryTransport, MemoryServer) {
    let (sessions_tx, sessions_rx) = mpsc::unbounded_channel();
    let refusing = Arc::new(AtomicBool::new(false));
    let transport = MemoryTransport {
        sessions: sessions_tx,
        refusing: refusing.clone(),
    };
    let server = MemoryServer {
        sessions: sessions_rx,
        refusing,
    };
    (transport, server)
}

/// Client side of an in-process transport.
#[derive(Debug, Clone)]
pub struct MemoryTransport {
    sessions: mpsc::UnboundedSender<MemorySession>,
    refusing: Arc<AtomicBool>,
}

#[async_trait]
impl Transport for MemoryTransport {
    async fn connect(&self, _endpoint: &Endpoint) -> Result<Box<dyn Channel>, TransportError> {
        Ok(Box::new(self.clone()))
    }
}

#[async_trait]
impl Channel for MemoryTransport {
    async fn open(&self, metadata: &AuthMetadata) -> Result<SessionStream, TransportError> {
        if self.refusing.load(Ordering::Acquire) {
            return Err(TransportError::Unauthenticated(
                "memory server is refusing sessions".to_string(),
            ));
        }

        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let session = MemorySession {
            metadata: metadata.clone(),
            inbound: Some(inbound_tx),
            outbound: outbound_rx,
        };
        self.sessions
            .send(session)
            .map_err(|_| TransportError::Unavailable("memory server dropped".to_string()))?;

        Ok(SessionStream {
            sender: Box::new(MemorySender { tx: outbound_tx }),
            receiver: Box::new(MemoryReceiver { rx: inbound_rx }),
        })
    }
}

struct MemorySender {
    tx: mpsc::UnboundedSender<OutboundMessage>,
}

#[async_trait]
impl FrameSender for MemorySender {
    async fn send(&mut self, message: OutboundMessage) -> Result<(), TransportError> {
        self.tx.send(message).map_err(|_| TransportError::Closed)
    }
}

struct MemoryReceiver {
    rx: mpsc::UnboundedReceiver<InboundFrame>,
}

#[async_trait]
impl FrameReceiver for MemoryReceiver {
    async fn recv(&mut self) -> Result<Option<InboundMessage>, TransportError> {
        self.rx.recv().await.transpose()
    }
}

// ---------------------------------------------------------------------------
// Server side
// ---------------------------------------------------------------------------

/// Server side of an in-process transport.
#[derive(Debug)]
pub struct MemoryServer {
    sessions: mpsc::UnboundedReceiver<MemorySession>,
    refusing: Arc<AtomicBool>,
}

impl MemoryServer {
    /// Waits for the connector to open its next session. Returns `None` once
    /// every [`MemoryTransport`] clone is gone.
    pub async fn accept(&mut self) -> Option<MemorySession> {
        self.sessions.recv().await
    }

    /// While set, every open attempt fails with
    /// [`TransportError::Unauthenticated`].
    pub fn refuse_sessions(&self, refuse: bool) {
        self.refusing.store(refuse, Ordering::Release);
    }
}

/// One session as seen by the server.
#[derive(Debug)]
pub struct MemorySession {
    metadata: AuthMetadata,
    inbound: Option<mpsc::UnboundedSender<InboundFrame>>,
    outbound: mpsc::UnboundedReceiver<OutboundMessage>,
}

impl MemorySession {
    /// Metadata the connector attached when opening the session.
    pub fn metadata(&self) -> &AuthMetadata {
        &self.metadata
    }

    /// Delivers a request. Returns `false` if the connector's side is gone.
    pub fn send(&self, message: InboundMessage) -> bool {
        self.push(Ok(message))
    }

    /// Makes the connector's next receive fail with `error`.
    pub fn fail(&self, error: TransportError) -> bool {
        self.push(Err(error))
    }

    fn push(&self, frame: InboundFrame) -> bool {
        self.inbound
            .as_ref()
            .is_some_and(|inbound| inbound.send(frame).is_ok())
    }

    /// Closes the request direction; the connector sees a clean end of stream.
    pub fn close(&mut self) {
        self.inbound = None;
    }

    /// Next response, or `None` once the connector dropped its side.
    pub async fn recv(&mut self) -> Option<OutboundMessage> {
        self.outbound.recv().await
    }
}

#[cfg(test)]
mod tests {
    use protocol::{MessageId, Response, SecretToken, SourceId, TransportSecurity};

    use super::*;

    fn endpoint() -> Endpoint {
        Endpoint {
            address: "memory".to_string(),
            security: TransportSecurity::Plaintext,
        }
    }

    fn metadata() -> AuthMetadata {
        AuthMetadata::new(SecretToken::new("t"), SourceId::new(9))
    }

    #[tokio::test]
    async fn test_frames_flow_both_ways() {
        let (transport, mut server) = pair();
        let channel = transport.connect(&endpoint()).await.unwrap();
        let mut stream = channel.open(&metadata()).await.unwrap();

        let mut session = server.accept().await.unwrap();
        assert_eq!(session.metadata().source(), SourceId::new(9));

        assert!(session.send(InboundMessage::ping(MessageId::new(1))));
        let inbound = stream.receiver.recv().await.unwrap().unwrap();
        assert_eq!(inbound.id, MessageId::new(1));

        stream
            .sender
            .send(OutboundMessage {
                id: MessageId::new(1),
                response: Response::ping(None),
            })
            .await
            .unwrap();
        assert_eq!(session.recv().await.unwrap().id, MessageId::new(1));

        session.close();
        assert!(stream.receiver.recv().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_injected_failure_surfaces_on_receive() {
        let (transport, mut server) = pair();
        let channel = transport.connect(&endpoint()).await.unwrap();
        let mut stream = channel.open(&metadata()).await.unwrap();
        let session = server.accept().await.unwrap();

        session.fail(TransportError::Unavailable("reset".to_string()));
        assert!(matches!(
            stream.receiver.recv().await,
            Err(TransportError::Unavailable(_))
        ));
    }

    #[tokio::test]
    async fn test_refused_and_dropped_server() {
        let (transport, server) = pair();
        let channel = transport.connect(&endpoint()).await.unwrap();

        server.refuse_sessions(true);
        assert!(matches!(
            channel.open(&metadata()).await,
            Err(TransportError::Unauthenticated(_))
        ));

        server.refuse_sessions(false);
        drop(server);
        assert!(matches!(
            channel.open(&metadata()).await,
            Err(TransportError::Unavailable(_))
        ));
    }
}

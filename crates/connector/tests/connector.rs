//! End-to-end behaviour of the connector against an in-memory Stargate.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use connector::{CancellationToken, Connector, ConnectorConfigBuilder, ConnectorError};
use protocol::{
    ErrorInfo, FetchError, Handler, HandlerError, InboundMessage, MessageId, Plan, Request,
    RequestContext, Response, RowWriter, Table, TransportError, Value,
};
use tokio::task::JoinHandle;
use tokio::time::{sleep, timeout, Instant};
use transport::memory::{pair, MemoryServer, MemorySession};
use transport::TcpTransport;

const HEARTBEAT: Duration = Duration::from_secs(5);

/// Scan never returns; counts its own cancellation.
const PLAN_HANG: u8 = 0xF0;
/// Scan writes a row holding a value with no wire encoding.
const PLAN_UNENCODABLE: u8 = 0xF1;

// ---------------------------------------------------------------------------
// Test handler
// ---------------------------------------------------------------------------

#[derive(Default)]
struct TestHandler {
    ping_error: Option<&'static str>,
    fetch_error: Option<&'static str>,
    cancelled_scans: Arc<AtomicUsize>,
}

struct CountOnDrop(Arc<AtomicUsize>);

impl Drop for CountOnDrop {
    fn drop(&mut self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl Handler for TestHandler {
    async fn ping(&self, _ctx: &RequestContext) -> Result<(), HandlerError> {
        match self.ping_error {
            Some(message) => Err(message.into()),
            None => Ok(()),
        }
    }

    async fn fetch(&self, _ctx: &RequestContext) -> Result<Vec<Table>, FetchError> {
        match self.fetch_error {
            Some(message) => Err(FetchError::new(message)),
            None => Ok(vec![Table::new("lunodb", "public", "numbers")]),
        }
    }

    /// Plan `[n]` writes `n` rows; `[n, 1]` writes `n` rows then fails.
    async fn scan(
        &self,
        _ctx: &RequestContext,
        plan: &Plan,
        writer: &dyn RowWriter,
    ) -> Result<(), HandlerError> {
        match plan.as_bytes() {
            [PLAN_HANG] => {
                let _guard = CountOnDrop(self.cancelled_scans.clone());
                std::future::pending::<()>().await;
                Ok(())
            }
            [PLAN_UNENCODABLE] => {
                writer
                    .write(vec![Value::Timestamp(chrono::Utc::now())])
                    .await?;
                Ok(())
            }
            [rows, rest @ ..] => {
                for n in 0..*rows {
                    writer.write(vec![Value::from(i64::from(n))]).await?;
                }
                match rest {
                    [1] => Err("scan failed".into()),
                    _ => Ok(()),
                }
            }
            [] => Ok(()),
        }
    }
}

// ---------------------------------------------------------------------------
// Harness
// ---------------------------------------------------------------------------

struct Harness {
    connector: Arc<Connector>,
    server: MemoryServer,
    shutdown: CancellationToken,
    serving: JoinHandle<Result<(), ConnectorError>>,
}

fn start(handler: TestHandler) -> Harness {
    let (transport, server) = pair();
    let config = ConnectorConfigBuilder::from_lookup(|_| None)
        .source("42")
        .token("tok")
        .insecure(true)
        .heartbeat(HEARTBEAT)
        .build()
        .unwrap();
    let connector = Arc::new(Connector::new(config, transport));
    let shutdown = CancellationToken::new();

    let serving = tokio::spawn({
        let connector = connector.clone();
        let shutdown = shutdown.clone();
        async move { connector.serve(shutdown, Arc::new(handler)).await }
    });

    Harness {
        connector,
        server,
        shutdown,
        serving,
    }
}

fn execute(id: u32, plan: &[u8]) -> InboundMessage {
    InboundMessage::execute(MessageId::new(id), Plan::new(plan.to_vec()))
}

/// Reads frames until every id in `ids` has seen its terminal frame.
async fn collect(session: &mut MemorySession, ids: &[u32]) -> HashMap<u32, Vec<Response>> {
    let mut frames: HashMap<u32, Vec<Response>> = HashMap::new();
    let done = |frames: &HashMap<u32, Vec<Response>>| {
        ids.iter().all(|id| {
            frames
                .get(id)
                .and_then(|responses| responses.last())
                .is_some_and(Response::is_terminal)
        })
    };

    while !done(&frames) {
        let frame = session.recv().await.expect("session ended early");
        let id = frame.id.as_u32();
        assert!(ids.contains(&id), "response for unknown id {id}");
        let responses = frames.entry(id).or_default();
        assert!(
            !responses.last().is_some_and(Response::is_terminal),
            "frame after terminal for id {id}"
        );
        responses.push(frame.response);
    }
    frames
}

async fn wait_until(mut condition: impl FnMut() -> bool) {
    for _ in 0..1000 {
        if condition() {
            return;
        }
        sleep(Duration::from_millis(1)).await;
    }
    panic!("condition not reached");
}

fn data(value: i64) -> Response {
    Response::row(vec![value.to_be_bytes().to_vec()])
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn test_session_carries_auth_metadata() {
    let mut harness = start(TestHandler::default());
    let session = harness.server.accept().await.unwrap();

    assert_eq!(
        session.metadata().entries(),
        [
            ("authorization", "Bearer tok".to_string()),
            ("source", "42".to_string()),
        ]
    );
    harness.shutdown.cancel();
    harness.serving.await.unwrap().unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_responses_correlate_with_requests() {
    let mut harness = start(TestHandler::default());
    let mut session = harness.server.accept().await.unwrap();

    session.send(InboundMessage::ping(MessageId::new(1)));
    session.send(InboundMessage::fetch(MessageId::new(2)));
    session.send(execute(3, &[3]));

    let frames = collect(&mut session, &[1, 2, 3]).await;
    assert_eq!(frames[&1], vec![Response::ping(None)]);
    assert_eq!(
        frames[&2],
        vec![Response::fetch(
            vec![Table::new("lunodb", "public", "numbers")],
            None
        )]
    );
    assert_eq!(
        frames[&3],
        vec![data(0), data(1), data(2), Response::end_of_execution()]
    );
}

#[tokio::test(start_paused = true)]
async fn test_handler_errors_are_in_band() {
    let mut harness = start(TestHandler {
        ping_error: Some("warming up"),
        fetch_error: Some("catalog unavailable"),
        ..TestHandler::default()
    });
    let mut session = harness.server.accept().await.unwrap();

    session.send(InboundMessage::ping(MessageId::new(1)));
    session.send(InboundMessage::fetch(MessageId::new(2)));
    session.send(execute(3, &[2, 1]));

    let frames = collect(&mut session, &[1, 2, 3]).await;
    assert_eq!(
        frames[&1],
        vec![Response::ping(Some(ErrorInfo::new("warming up")))]
    );
    assert_eq!(
        frames[&2],
        vec![Response::fetch(
            Vec::new(),
            Some(ErrorInfo::new("catalog unavailable"))
        )]
    );
    assert_eq!(
        frames[&3],
        vec![
            data(0),
            data(1),
            Response::execute_error(ErrorInfo::new("scan failed")),
        ]
    );

    // The session survives application errors.
    session.send(InboundMessage::ping(MessageId::new(4)));
    assert_eq!(session.recv().await.unwrap().id, MessageId::new(4));
    assert!(harness.connector.healthy());
}

#[tokio::test(start_paused = true)]
async fn test_unknown_request_kind_is_ignored() {
    let mut harness = start(TestHandler::default());
    let mut session = harness.server.accept().await.unwrap();

    session.send(InboundMessage {
        id: MessageId::new(1),
        request: Request::Unknown,
    });
    session.send(InboundMessage::ping(MessageId::new(2)));

    let reply = session.recv().await.unwrap();
    assert_eq!(reply.id, MessageId::new(2));
    assert!(timeout(HEARTBEAT, session.recv()).await.is_err());
}

#[tokio::test(start_paused = true)]
async fn test_encoding_failure_ends_session_and_cancels_siblings() {
    let handler = TestHandler::default();
    let cancelled = handler.cancelled_scans.clone();
    let mut harness = start(handler);
    let mut session = harness.server.accept().await.unwrap();

    session.send(execute(1, &[PLAN_HANG]));
    session.send(execute(2, &[PLAN_UNENCODABLE]));

    // Neither request gets a terminal frame; the session just ends.
    assert!(session.recv().await.is_none());
    assert_eq!(cancelled.load(Ordering::SeqCst), 1);
    assert!(!harness.connector.healthy());

    // And the supervisor opens a fresh one.
    let mut next = harness.server.accept().await.unwrap();
    next.send(InboundMessage::ping(MessageId::new(3)));
    assert_eq!(next.recv().await.unwrap().id, MessageId::new(3));
}

#[tokio::test(start_paused = true)]
async fn test_receive_error_reconnects_within_one_heartbeat() {
    let mut harness = start(TestHandler::default());
    let session = harness.server.accept().await.unwrap();

    let failed_at = Instant::now();
    session.fail(TransportError::Unavailable("reset by peer".to_string()));

    let _next = harness.server.accept().await.unwrap();
    assert!(failed_at.elapsed() <= HEARTBEAT);

    // Exactly one new session while it stays open.
    assert!(timeout(HEARTBEAT * 3, harness.server.accept())
        .await
        .is_err());
}

#[tokio::test(start_paused = true)]
async fn test_remote_close_reconnects() {
    let mut harness = start(TestHandler::default());
    let mut session = harness.server.accept().await.unwrap();
    session.close();

    let mut next = harness.server.accept().await.unwrap();
    next.send(InboundMessage::ping(MessageId::new(1)));
    assert_eq!(next.recv().await.unwrap().id, MessageId::new(1));
}

#[tokio::test(start_paused = true)]
async fn test_refused_open_is_retried() {
    let (transport, mut server) = pair();
    server.refuse_sessions(true);

    let config = ConnectorConfigBuilder::from_lookup(|_| None)
        .heartbeat(HEARTBEAT)
        .build()
        .unwrap();
    let connector = Arc::new(Connector::new(config, transport));
    let shutdown = CancellationToken::new();
    let serving = tokio::spawn({
        let connector = connector.clone();
        let shutdown = shutdown.clone();
        async move {
            connector
                .serve(shutdown, Arc::new(TestHandler::default()))
                .await
        }
    });

    sleep(HEARTBEAT * 2).await;
    assert!(!connector.healthy());

    server.refuse_sessions(false);
    let _session = timeout(HEARTBEAT + Duration::from_millis(1), server.accept())
        .await
        .unwrap()
        .unwrap();

    shutdown.cancel();
    serving.await.unwrap().unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_liveness_follows_session() {
    let mut harness = start(TestHandler::default());
    assert!(!harness.connector.healthy());

    let mut session = harness.server.accept().await.unwrap();
    session.send(InboundMessage::ping(MessageId::new(1)));
    session.recv().await.unwrap();
    assert!(harness.connector.healthy());

    session.close();
    let connector = harness.connector.clone();
    wait_until(move || !connector.healthy()).await;
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_stops_supervisor_without_new_session() {
    let mut harness = start(TestHandler::default());
    let mut session = harness.server.accept().await.unwrap();

    harness.shutdown.cancel();
    harness.serving.await.unwrap().unwrap();

    assert!(!harness.connector.healthy());
    assert!(session.recv().await.is_none());
    assert!(timeout(HEARTBEAT * 3, harness.server.accept())
        .await
        .is_err());
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_during_heartbeat_wait_opens_no_session() {
    let mut harness = start(TestHandler::default());
    let session = harness.server.accept().await.unwrap();
    session.fail(TransportError::Unavailable("reset by peer".to_string()));

    let connector = harness.connector.clone();
    wait_until(move || !connector.healthy()).await;

    harness.shutdown.cancel();
    harness.serving.await.unwrap().unwrap();
    assert!(timeout(HEARTBEAT * 3, harness.server.accept())
        .await
        .is_err());
}

#[tokio::test]
async fn test_unusable_endpoint_is_fatal() {
    let config = ConnectorConfigBuilder::from_lookup(|_| None)
        .address("localhost:7000")
        .insecure(false)
        .build()
        .unwrap();
    let connector = Connector::new(config, TcpTransport);

    let err = connector
        .serve(CancellationToken::new(), Arc::new(TestHandler::default()))
        .await
        .unwrap_err();
    assert!(matches!(err, ConnectorError::Dial { ref address, .. } if address == "localhost:7000"));
}

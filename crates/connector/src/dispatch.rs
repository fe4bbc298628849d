//! Message dispatch for one open session.
//!
//! [`Session::run`] reads inbound frames in order and spawns one request task
//! per frame into the session's [`TaskGroup`]. Responses go out through the
//! shared [`Outbound`] half; every frame is written whole under its mutex so
//! concurrent tasks never interleave.

use std::sync::Arc;

use protocol::{
    FrameReceiver, FrameSender, Handler, InboundMessage, MessageId, OutboundMessage, Request,
    RequestContext, Response, SessionStream, SourceId, TransportError,
};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::errors::DispatchError;
use crate::requests;
use crate::task_group::TaskGroup;

// ---------------------------------------------------------------------------
// Outbound half
// ---------------------------------------------------------------------------

/// Sending half of a session, shared by all of its request tasks.
#[derive(Clone)]
pub(crate) struct Outbound {
    sender: Arc<Mutex<Box<dyn FrameSender>>>,
}

impl Outbound {
    pub(crate) fn new(sender: Box<dyn FrameSender>) -> Self {
        Self {
            sender: Arc::new(Mutex::new(sender)),
        }
    }

    async fn send(&self, message: OutboundMessage) -> Result<(), DispatchError> {
        let mut sender = self.sender.lock().await;
        sender.send(message).await.map_err(DispatchError::Send)
    }
}

/// Sends responses for one request, always tagged with that request's id.
#[derive(Clone)]
pub(crate) struct Responder {
    id: MessageId,
    outbound: Outbound,
}

impl Responder {
    pub(crate) fn new(id: MessageId, outbound: Outbound) -> Self {
        Self { id, outbound }
    }

    pub(crate) fn id(&self) -> MessageId {
        self.id
    }

    pub(crate) async fn send(&self, response: Response) -> Result<(), DispatchError> {
        self.outbound
            .send(OutboundMessage {
                id: self.id,
                response,
            })
            .await
    }
}

// ---------------------------------------------------------------------------
// Receive loop
// ---------------------------------------------------------------------------

enum Event {
    Cancelled,
    Finished(Result<(), DispatchError>),
    Received(Result<Option<InboundMessage>, TransportError>),
}

pub(crate) struct Session {
    receiver: Box<dyn FrameReceiver>,
    outbound: Outbound,
    handler: Arc<dyn Handler>,
    source: SourceId,
}

impl Session {
    pub(crate) fn new(stream: SessionStream, handler: Arc<dyn Handler>, source: SourceId) -> Self {
        Self {
            receiver: stream.receiver,
            outbound: Outbound::new(stream.sender),
            handler,
            source,
        }
    }

    /// Serves the session until the remote end closes it, `shutdown` is
    /// cancelled, a receive fails or a request task fails.
    ///
    /// Returns `Ok(())` for the first two and for cancellation errors
    /// reported by the transport. Request tasks still running when the
    /// session ends are cancelled and joined before this returns.
    pub(crate) async fn run(mut self, shutdown: &CancellationToken) -> Result<(), DispatchError> {
        info!("starting message receive loop");

        let mut group = TaskGroup::new(shutdown);
        let scope = group.scope().clone();

        let outcome = loop {
            let event = tokio::select! {
                biased;
                _ = scope.cancelled() => Event::Cancelled,
                Some(result) = group.join_next() => Event::Finished(result),
                received = self.receiver.recv() => Event::Received(received),
            };

            match event {
                Event::Cancelled => break Ok(()),
                Event::Finished(Ok(())) => {}
                Event::Finished(Err(err)) => break Err(err),
                Event::Received(Ok(Some(message))) => self.dispatch(&mut group, message),
                Event::Received(Ok(None)) => {
                    debug!("stream closed by stargate");
                    break Ok(());
                }
                Event::Received(Err(err)) if err.is_cancellation() => break Ok(()),
                Event::Received(Err(err)) => break Err(DispatchError::Receive(err)),
            }
        };

        group.shutdown().await;
        outcome
    }

    fn dispatch(&self, group: &mut TaskGroup, message: InboundMessage) {
        let id = message.id;
        debug!(id = id.as_u32(), kind = message.request.kind_name(), "received message");

        let ctx = RequestContext::new(id, self.source);
        let responder = Responder::new(id, self.outbound.clone());
        let handler = self.handler.clone();

        match message.request {
            Request::Ping => group.spawn(async move {
                requests::ping(ctx, handler, responder)
                    .await
                    .inspect_err(|err| error!(id = id.as_u32(), error = %err, "failed to ping"))
            }),
            Request::Fetch => group.spawn(async move {
                requests::fetch(ctx, handler, responder)
                    .await
                    .inspect_err(|err| {
                        error!(id = id.as_u32(), error = %err, "failed to fetch tables")
                    })
            }),
            Request::ExecuteStatement { plan } => group.spawn(async move {
                requests::execute(ctx, plan, handler, responder)
                    .await
                    .inspect_err(|err| {
                        error!(id = id.as_u32(), error = %err, "failed to execute statement")
                    })
            }),
            Request::Unknown => debug!(id = id.as_u32(), "ignoring request of unknown kind"),
        }
    }
}

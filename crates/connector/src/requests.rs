//! Request adapters: one async function per request kind.
//!
//! Handler errors are application data and travel back in-band. Only a
//! failure to encode or send a frame is returned as an error, which fails the
//! task and with it the session.

use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use protocol::value::encode_row;
use protocol::{ErrorInfo, Handler, Plan, RequestContext, Response, RowWriter, Value, WriteError};
use tracing::{debug, error};

use crate::dispatch::Responder;
use crate::errors::DispatchError;

pub(crate) async fn ping(
    ctx: RequestContext,
    handler: Arc<dyn Handler>,
    responder: Responder,
) -> Result<(), DispatchError> {
    let id = ctx.id().as_u32();
    debug!(id, "ping connector");

    let error = match handler.ping(&ctx).await {
        Ok(()) => None,
        Err(err) => {
            error!(id, error = %err, "unexpected error while pinging");
            Some(ErrorInfo::new(err.to_string()))
        }
    };

    debug!(id, "ping complete");
    responder.send(Response::ping(error)).await
}

pub(crate) async fn fetch(
    ctx: RequestContext,
    handler: Arc<dyn Handler>,
    responder: Responder,
) -> Result<(), DispatchError> {
    let id = ctx.id().as_u32();
    debug!(id, "fetching tables");

    let (tables, error) = match handler.fetch(&ctx).await {
        Ok(tables) => (tables, None),
        Err(err) => {
            error!(
                id,
                error = %err,
                partial = err.tables.len(),
                "unexpected error while fetching tables"
            );
            let error = ErrorInfo::new(err.to_string());
            (err.tables, Some(error))
        }
    };

    debug!(id, count = tables.len(), "tables fetched");
    responder.send(Response::fetch(tables, error)).await
}

pub(crate) async fn execute(
    ctx: RequestContext,
    plan: Plan,
    handler: Arc<dyn Handler>,
    responder: Responder,
) -> Result<(), DispatchError> {
    let id = ctx.id().as_u32();
    debug!(id, plan_len = plan.as_bytes().len(), "executing statement");

    let writer = ExecuteWriter::new(responder.clone());
    let scanned = handler.scan(&ctx, &plan, &writer).await;

    // A rejected row poisons the whole request, whatever the scan returned.
    if let Some(failure) = writer.into_failure() {
        return Err(failure);
    }

    match scanned {
        Ok(()) => {
            debug!(id, "statement executed successfully");
            responder.send(Response::end_of_execution()).await
        }
        Err(err) => {
            error!(id, error = %err, "unexpected error while scanning");
            responder
                .send(Response::execute_error(ErrorInfo::new(err.to_string())))
                .await
        }
    }
}

// ---------------------------------------------------------------------------
// Row sink
// ---------------------------------------------------------------------------

/// Encodes rows and streams each one as a data frame as soon as it is
/// written. After the first failure every further write is refused.
struct ExecuteWriter {
    responder: Responder,
    failure: Mutex<Option<DispatchError>>,
}

impl ExecuteWriter {
    fn new(responder: Responder) -> Self {
        Self {
            responder,
            failure: Mutex::new(None),
        }
    }

    fn failed(&self) -> bool {
        self.failure
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    fn record(&self, failure: DispatchError) {
        self.failure
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get_or_insert(failure);
    }

    fn into_failure(self) -> Option<DispatchError> {
        self.failure
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl RowWriter for ExecuteWriter {
    async fn write(&self, values: Vec<Value>) -> Result<(), WriteError> {
        if self.failed() {
            return Err(WriteError::Closed);
        }

        let row = match encode_row(&values) {
            Ok(row) => row,
            Err(err) => {
                self.record(DispatchError::Encode(err.clone()));
                return Err(WriteError::Encode(err));
            }
        };

        debug!(id = self.responder.id().as_u32(), "writing row");
        if let Err(err) = self.responder.send(Response::row(row)).await {
            self.record(err);
            return Err(WriteError::Closed);
        }
        Ok(())
    }
}

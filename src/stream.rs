// Copyright 2024 Zinc Labs Inc.
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <http://www.gnu.org/licenses/>.

//! Streaming Adapter (spec component F) — drives a handler-owned channel
//! of record batches into the `DoGet` RPC send stream.

use std::collections::VecDeque;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use arrow::datatypes::SchemaRef;
use arrow::ipc::writer::{DictionaryTracker, IpcDataGenerator, IpcWriteOptions};
use arrow::record_batch::RecordBatch;
use arrow_flight::utils::flight_data_from_arrow_schema;
use arrow_flight::{FlightData, FlightDescriptor};
use bytes::Bytes;
use futures::Stream;
use tokio::sync::mpsc;
use tonic::Status;

use crate::context::CallContext;
use crate::errors::FlightSqlError;

/// One unit of a `DoGet` response, as a handler's producer hands it off
/// (spec.md §3). `data` is owned by the chunk until the adapter consumes
/// it; dropping the chunk (which the adapter does immediately after
/// encoding it) is the release.
pub struct StreamChunk {
    pub data: RecordBatch,
    pub descriptor: Option<FlightDescriptor>,
    pub app_metadata: Option<Bytes>,
    pub err: Option<Status>,
}

impl StreamChunk {
    pub fn new(data: RecordBatch) -> Self {
        Self {
            data,
            descriptor: None,
            app_metadata: None,
            err: None,
        }
    }

    pub fn with_app_metadata(mut self, app_metadata: Bytes) -> Self {
        self.app_metadata = Some(app_metadata);
        self
    }

    pub fn with_descriptor(mut self, descriptor: FlightDescriptor) -> Self {
        self.descriptor = Some(descriptor);
        self
    }

    pub fn error(err: Status) -> Self {
        Self {
            data: RecordBatch::new_empty(Arc::new(arrow::datatypes::Schema::empty())),
            descriptor: None,
            app_metadata: None,
            err: Some(err),
        }
    }
}

pub type ChunkSender = mpsc::Sender<StreamChunk>;
pub type ChunkReceiver = mpsc::Receiver<StreamChunk>;

/// Capacity 1 is the closest rendezvous-style approximation `tokio::sync::mpsc`
/// offers to the unbuffered handoff spec.md §5 requires: the producer's
/// `send` only resolves once the adapter has taken the previous chunk.
pub fn chunk_channel() -> (ChunkSender, ChunkReceiver) {
    mpsc::channel(1)
}

pub type FlightDataStream = Pin<Box<dyn Stream<Item = Result<FlightData, Status>> + Send + 'static>>;

struct AdapterState {
    schema_sent: bool,
    schema: SchemaRef,
    options: IpcWriteOptions,
    pending: VecDeque<FlightData>,
    receiver: ChunkReceiver,
    ctx: CallContext,
    finished: bool,
}

/// Builds the `DoGet` response stream: one schema message, then one
/// `FlightData` message per chunk (preceded by any dictionary batches arrow
/// chose to emit), in the exact order the producer sent them. Stops and
/// releases the receiver as soon as a chunk carries an error, the channel
/// closes, or the call context is cancelled.
pub fn adapt_do_get(schema: SchemaRef, receiver: ChunkReceiver, ctx: CallContext) -> FlightDataStream {
    let state = AdapterState {
        schema_sent: false,
        schema,
        options: IpcWriteOptions::default(),
        pending: VecDeque::new(),
        receiver,
        ctx,
        finished: false,
    };
    Box::pin(futures::stream::unfold(state, next_item))
}

async fn next_item(mut state: AdapterState) -> Option<(Result<FlightData, Status>, AdapterState)> {
    if state.finished {
        return None;
    }
    if !state.schema_sent {
        state.schema_sent = true;
        let schema_message = flight_data_from_arrow_schema(&state.schema, &state.options);
        return Some((Ok(schema_message), state));
    }
    if let Some(item) = state.pending.pop_front() {
        return Some((Ok(item), state));
    }

    let next_chunk = tokio::select! {
        biased;
        _ = state.ctx.cancelled() => {
            log::warn!("do_get cancelled by client, releasing outstanding chunks");
            None
        }
        chunk = state.receiver.recv() => chunk,
    };
    let Some(chunk) = next_chunk else {
        state.finished = true;
        return None;
    };

    if let Some(err) = chunk.err {
        state.finished = true;
        return Some((Err(err), state));
    }

    let data_gen = IpcDataGenerator::default();
    let mut dict_tracker = DictionaryTracker::new(false);
    let (encoded_dictionaries, encoded_batch) =
        match data_gen.encoded_batch(&chunk.data, &mut dict_tracker, &state.options) {
            Ok(encoded) => encoded,
            Err(e) => {
                state.finished = true;
                let status: Status =
                    FlightSqlError::Internal(format!("encoding record batch: {e}")).into();
                return Some((Err(status), state));
            }
        };
    let mut flight_data: FlightData = encoded_batch.into();
    if let Some(app_metadata) = chunk.app_metadata {
        flight_data.app_metadata = app_metadata;
    }
    if let Some(descriptor) = chunk.descriptor {
        flight_data.flight_descriptor = Some(descriptor);
    }
    state
        .pending
        .extend(encoded_dictionaries.into_iter().map(FlightData::from));
    state.pending.push_back(flight_data);

    let item = state
        .pending
        .pop_front()
        .expect("just pushed at least the batch message");
    Some((Ok(item), state))
}

/// Wraps a `DoGet` stream so that whenever tonic drops it — client
/// disconnect, call cancellation, or any other reason the gRPC runtime stops
/// polling — `ctx` is cancelled. This is what lets a handler's producer task
/// (racing `ctx.cancelled()` against its own sends) learn about client-side
/// cancellation without the adapter having to poll anything beyond what the
/// `Stream` trait already gives it.
struct CancelGuardStream {
    inner: FlightDataStream,
    ctx: CallContext,
}

impl Stream for CancelGuardStream {
    type Item = Result<FlightData, Status>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        this.inner.as_mut().poll_next(cx)
    }
}

impl Drop for CancelGuardStream {
    fn drop(&mut self) {
        self.ctx.cancel();
    }
}

pub fn with_cancel_on_drop(ctx: CallContext, inner: FlightDataStream) -> FlightDataStream {
    Box::pin(CancelGuardStream { inner, ctx })
}

#[cfg(test)]
mod test {
    use arrow::array::Int32Array;
    use arrow::datatypes::{DataType, Field, Schema};
    use futures::StreamExt;

    use super::*;

    fn sample_schema() -> SchemaRef {
        Arc::new(Schema::new(vec![Field::new("n", DataType::Int32, false)]))
    }

    fn sample_batch() -> RecordBatch {
        RecordBatch::try_new(sample_schema(), vec![Arc::new(Int32Array::from(vec![1, 2, 3]))])
            .unwrap()
    }

    #[tokio::test]
    async fn delivers_schema_then_chunks_in_order() {
        let (sender, receiver) = chunk_channel();
        let ctx = CallContext::new();
        tokio::spawn(async move {
            sender.send(StreamChunk::new(sample_batch())).await.unwrap();
            sender.send(StreamChunk::new(sample_batch())).await.unwrap();
        });
        let items: Vec<_> = adapt_do_get(sample_schema(), receiver, ctx)
            .collect()
            .await;
        // one schema message + two batch messages, none of them errors
        assert_eq!(items.len(), 3);
        assert!(items.iter().all(|item| item.is_ok()));
    }

    #[tokio::test]
    async fn chunk_error_is_the_terminal_stream_result() {
        let (sender, receiver) = chunk_channel();
        let ctx = CallContext::new();
        tokio::spawn(async move {
            sender.send(StreamChunk::new(sample_batch())).await.unwrap();
            sender
                .send(StreamChunk::error(Status::internal("boom")))
                .await
                .unwrap();
            // this chunk must never be observed on the wire
            let _ = sender.send(StreamChunk::new(sample_batch())).await;
        });
        let items: Vec<_> = adapt_do_get(sample_schema(), receiver, ctx)
            .collect()
            .await;
        assert_eq!(items.len(), 3); // schema + one good batch + the error
        assert!(items[0].is_ok());
        assert!(items[1].is_ok());
        match &items[2] {
            Err(status) => assert_eq!(status.message(), "boom"),
            Ok(_) => panic!("expected the chunk error to terminate the stream"),
        }
    }

    #[tokio::test]
    async fn cancellation_stops_the_stream_without_further_chunks() {
        let (sender, receiver) = chunk_channel();
        let ctx = CallContext::new();
        let cancel_ctx = ctx.clone();
        sender.send(StreamChunk::new(sample_batch())).await.unwrap();
        cancel_ctx.cancel();
        let items: Vec<_> = adapt_do_get(sample_schema(), receiver, ctx)
            .collect()
            .await;
        // schema message is always sent; the cancellation is observed the
        // next time the adapter would otherwise block on the channel
        assert!(items.len() <= 2);
        assert!(items.iter().all(|item| item.is_ok()));
    }

    #[tokio::test]
    async fn dropping_the_wrapped_stream_cancels_the_context() {
        let (_sender, receiver) = chunk_channel();
        let ctx = CallContext::new();
        let guarded = with_cancel_on_drop(ctx.clone(), adapt_do_get(sample_schema(), receiver, ctx.clone()));
        assert!(!ctx.is_cancelled());
        drop(guarded);
        assert!(ctx.is_cancelled());
    }
}

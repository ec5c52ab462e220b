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

//! RPC Verb Router (spec component E).
//!
//! [`FlightSqlRouter`] is this crate's `arrow_flight::flight_service_server::FlightService`
//! implementation. It owns nothing but a handler; every verb decodes the
//! command envelope carried by its descriptor/ticket/action and dispatches
//! to the one matching [`FlightSqlHandler`] method. Trait methods with no
//! counterpart in the spec (`handshake`, `list_flights`, `get_schema`,
//! `poll_flight_info`, `do_exchange`) return `Unimplemented` so the
//! generated server remains fully constructible without expanding the
//! command set this crate understands.

use std::pin::Pin;
use std::sync::Arc;

use arrow_flight::flight_service_server::{FlightService, FlightServiceServer};
use arrow_flight::{
    Action, ActionType, Criteria, Empty, FlightData, FlightDescriptor, FlightInfo,
    HandshakeRequest, HandshakeResponse, PollInfo, PutResult, SchemaResult, Ticket,
};
use bytes::Bytes;
use futures::{stream, Stream, StreamExt};
use prost::Message;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tonic::{Request, Response, Status, Streaming};

use flight_sql_proto::DoPutUpdateResult;

use crate::action::{self, ACTION_CLOSE_PREPARED_STATEMENT, ACTION_CREATE_PREPARED_STATEMENT};
use crate::command::{decode_envelope, Command};
use crate::context::CallContext;
use crate::errors::FlightSqlError;
use crate::handler::FlightSqlHandler;
use crate::stream::{adapt_do_get, with_cancel_on_drop, FlightDataStream};

type BoxedFlightStream<T> = Pin<Box<dyn Stream<Item = Result<T, Status>> + Send + 'static>>;

/// Wraps any [`FlightSqlHandler`] into a `FlightService`. Stateless beyond
/// the handler itself — every per-call state lives in the [`CallContext`]
/// the router creates fresh for each RPC.
pub struct FlightSqlRouter<H> {
    handler: Arc<H>,
}

impl<H> FlightSqlRouter<H>
where
    H: FlightSqlHandler + 'static,
{
    pub fn new(handler: Arc<H>) -> Self {
        Self { handler }
    }

    /// Convenience constructor matching this crate's usual
    /// `tonic::transport::Server::builder().add_service(..)` call site.
    pub fn into_server(self) -> FlightServiceServer<Self> {
        FlightServiceServer::new(self)
    }
}

fn update_result(record_count: i64) -> PutResult {
    let app_metadata = DoPutUpdateResult { record_count }.encode_to_vec();
    PutResult {
        app_metadata: app_metadata.into(),
    }
}

fn invalid_command(verb: &str, command: &Command) -> Status {
    FlightSqlError::InvalidArgument(format!("unexpected command for {verb}: {command:?}")).into()
}

#[tonic::async_trait]
impl<H> FlightService for FlightSqlRouter<H>
where
    H: FlightSqlHandler + 'static,
{
    type HandshakeStream = BoxedFlightStream<HandshakeResponse>;
    type ListFlightsStream = BoxedFlightStream<FlightInfo>;
    type DoGetStream = FlightDataStream;
    type DoPutStream = BoxedFlightStream<PutResult>;
    type DoActionStream = BoxedFlightStream<arrow_flight::Result>;
    type ListActionsStream = BoxedFlightStream<ActionType>;
    type DoExchangeStream = BoxedFlightStream<FlightData>;

    async fn handshake(
        &self,
        _request: Request<Streaming<HandshakeRequest>>,
    ) -> Result<Response<Self::HandshakeStream>, Status> {
        Err(Status::unimplemented("handshake is outside this service's command set"))
    }

    async fn list_flights(
        &self,
        _request: Request<Criteria>,
    ) -> Result<Response<Self::ListFlightsStream>, Status> {
        Err(Status::unimplemented("list_flights is outside this service's command set"))
    }

    #[tracing::instrument(skip_all)]
    async fn get_flight_info(
        &self,
        request: Request<FlightDescriptor>,
    ) -> Result<Response<FlightInfo>, Status> {
        let descriptor = request.into_inner();
        let command = decode_envelope(&descriptor.cmd).map_err(Status::from)?;
        let ctx = CallContext::new();
        log::info!("get_flight_info: {command:?}");

        let info = match command {
            Command::StatementQuery(cmd) => {
                self.handler
                    .get_flight_info_statement(ctx, cmd, descriptor)
                    .await?
            }
            Command::PreparedStatementQuery(cmd) => {
                self.handler
                    .get_flight_info_prepared_statement(ctx, cmd, descriptor)
                    .await?
            }
            Command::GetCatalogs(cmd) => {
                self.handler
                    .get_flight_info_catalogs(ctx, cmd, descriptor)
                    .await?
            }
            Command::GetDbSchemas(cmd) => {
                self.handler
                    .get_flight_info_db_schemas(ctx, cmd, descriptor)
                    .await?
            }
            Command::GetTables(cmd) => {
                self.handler
                    .get_flight_info_tables(ctx, cmd, descriptor)
                    .await?
            }
            Command::GetTableTypes(cmd) => {
                self.handler
                    .get_flight_info_table_types(ctx, cmd, descriptor)
                    .await?
            }
            Command::GetPrimaryKeys(cmd) => {
                self.handler
                    .get_flight_info_primary_keys(ctx, cmd.into(), descriptor)
                    .await?
            }
            Command::GetExportedKeys(cmd) => {
                self.handler
                    .get_flight_info_exported_keys(ctx, cmd.into(), descriptor)
                    .await?
            }
            Command::GetImportedKeys(cmd) => {
                self.handler
                    .get_flight_info_imported_keys(ctx, cmd.into(), descriptor)
                    .await?
            }
            Command::GetCrossReference(cmd) => {
                self.handler
                    .get_flight_info_cross_reference(ctx, cmd.into(), descriptor)
                    .await?
            }
            Command::GetXdbcTypeInfo(cmd) => {
                self.handler
                    .get_flight_info_xdbc_type_info(ctx, cmd, descriptor)
                    .await?
            }
            Command::GetSqlInfo(cmd) => {
                self.handler
                    .get_flight_info_sql_info(ctx, cmd, descriptor)
                    .await?
            }
            other => return Err(invalid_command("GetFlightInfo", &other)),
        };
        Ok(Response::new(info))
    }

    async fn poll_flight_info(
        &self,
        _request: Request<FlightDescriptor>,
    ) -> Result<Response<PollInfo>, Status> {
        Err(Status::unimplemented("poll_flight_info is outside this service's command set"))
    }

    async fn get_schema(
        &self,
        _request: Request<FlightDescriptor>,
    ) -> Result<Response<SchemaResult>, Status> {
        Err(Status::unimplemented("get_schema is outside this service's command set"))
    }

    #[tracing::instrument(skip_all)]
    async fn do_get(
        &self,
        request: Request<Ticket>,
    ) -> Result<Response<Self::DoGetStream>, Status> {
        let ticket = request.into_inner();
        let command = decode_envelope(&ticket.ticket).map_err(Status::from)?;
        let ctx = CallContext::new();
        log::info!("do_get: {command:?}");

        let (schema, receiver) = match command {
            Command::TicketStatementQuery(cmd) => {
                self.handler.do_get_statement(ctx.clone(), cmd).await?
            }
            Command::PreparedStatementQuery(cmd) => {
                self.handler
                    .do_get_prepared_statement(ctx.clone(), cmd)
                    .await?
            }
            Command::GetCatalogs(cmd) => self.handler.do_get_catalogs(ctx.clone(), cmd).await?,
            Command::GetDbSchemas(cmd) => {
                self.handler.do_get_db_schemas(ctx.clone(), cmd).await?
            }
            Command::GetTables(cmd) => self.handler.do_get_tables(ctx.clone(), cmd).await?,
            Command::GetTableTypes(cmd) => {
                self.handler.do_get_table_types(ctx.clone(), cmd).await?
            }
            Command::GetPrimaryKeys(cmd) => {
                self.handler
                    .do_get_primary_keys(ctx.clone(), cmd.into())
                    .await?
            }
            Command::GetExportedKeys(cmd) => {
                self.handler
                    .do_get_exported_keys(ctx.clone(), cmd.into())
                    .await?
            }
            Command::GetImportedKeys(cmd) => {
                self.handler
                    .do_get_imported_keys(ctx.clone(), cmd.into())
                    .await?
            }
            Command::GetCrossReference(cmd) => {
                self.handler
                    .do_get_cross_reference(ctx.clone(), cmd.into())
                    .await?
            }
            Command::GetXdbcTypeInfo(cmd) => {
                self.handler
                    .do_get_xdbc_type_info(ctx.clone(), cmd)
                    .await?
            }
            Command::GetSqlInfo(cmd) => self.handler.do_get_sql_info(ctx.clone(), cmd).await?,
            other => return Err(invalid_command("DoGet", &other)),
        };

        let stream = with_cancel_on_drop(ctx.clone(), adapt_do_get(schema, receiver, ctx));
        Ok(Response::new(stream))
    }

    #[tracing::instrument(skip_all)]
    async fn do_put(
        &self,
        request: Request<Streaming<FlightData>>,
    ) -> Result<Response<Self::DoPutStream>, Status> {
        let mut stream = request.into_inner();
        let first = stream
            .message()
            .await?
            .ok_or_else(|| Status::invalid_argument("DoPut stream carried no messages"))?;
        let descriptor = first.flight_descriptor.clone().ok_or_else(|| {
            Status::invalid_argument("first DoPut message carried no FlightDescriptor")
        })?;
        let command = decode_envelope(&descriptor.cmd).map_err(Status::from)?;
        let ctx = CallContext::new();
        log::info!("do_put: {command:?}");

        match command {
            Command::StatementUpdate(cmd) => {
                let record_count = self.handler.do_put_statement_update(ctx, cmd).await?;
                let reply = update_result(record_count);
                Ok(Response::new(
                    Box::pin(stream::once(async move { Ok(reply) })) as Self::DoPutStream,
                ))
            }
            Command::PreparedStatementUpdate(cmd) => {
                let record_count = self
                    .handler
                    .do_put_prepared_statement_update(ctx, cmd)
                    .await?;
                let reply = update_result(record_count);
                Ok(Response::new(
                    Box::pin(stream::once(async move { Ok(reply) })) as Self::DoPutStream,
                ))
            }
            Command::PreparedStatementQuery(cmd) => {
                // The schema message we already read to recover the
                // descriptor belongs to the reader the handler expects, so
                // it goes back on the front of the stream it is handed.
                let reader: FlightDataStream =
                    Box::pin(stream::once(async move { Ok(first) }).chain(stream));
                let (tx, rx) = mpsc::channel(1);
                let handler = self.handler.clone();
                tokio::spawn(async move {
                    if let Err(status) = handler
                        .do_put_prepared_statement_query(ctx, cmd, reader, tx.clone())
                        .await
                    {
                        let _ = tx.send(Err(status)).await;
                    }
                });
                let replies = ReceiverStream::new(rx);
                Ok(Response::new(Box::pin(replies) as Self::DoPutStream))
            }
            other => Err(invalid_command("DoPut", &other)),
        }
    }

    async fn do_exchange(
        &self,
        _request: Request<Streaming<FlightData>>,
    ) -> Result<Response<Self::DoExchangeStream>, Status> {
        Err(Status::unimplemented("do_exchange is outside this service's command set"))
    }

    #[tracing::instrument(skip_all)]
    async fn do_action(
        &self,
        request: Request<Action>,
    ) -> Result<Response<Self::DoActionStream>, Status> {
        let action = request.into_inner();
        let ctx = CallContext::new();
        log::info!("do_action: {}", action.r#type);

        let result = match action.r#type.as_str() {
            ACTION_CREATE_PREPARED_STATEMENT => {
                action::create_prepared_statement(self.handler.as_ref(), ctx, action.body).await?
            }
            ACTION_CLOSE_PREPARED_STATEMENT => {
                action::close_prepared_statement(self.handler.as_ref(), ctx, action.body).await?
            }
            other => {
                return Err(FlightSqlError::InvalidArgument(format!(
                    "unknown action type: {other}"
                ))
                .into())
            }
        };
        Ok(Response::new(
            Box::pin(stream::once(async move { Ok(result) })) as Self::DoActionStream
        ))
    }

    async fn list_actions(
        &self,
        _request: Request<Empty>,
    ) -> Result<Response<Self::ListActionsStream>, Status> {
        let actions = action::list_actions();
        Ok(Response::new(Box::pin(stream::iter(
            actions.into_iter().map(Ok),
        ))))
    }
}

#[cfg(test)]
mod test {
    use std::sync::Arc;

    use arrow::array::Int64Array;
    use arrow::datatypes::{DataType, Field, Schema};
    use arrow::record_batch::RecordBatch;
    use async_trait::async_trait;
    use flight_sql_proto::{CommandGetCatalogs, CommandStatementUpdate, TypeUrl};

    use super::*;
    use crate::capability::CapabilityValue;
    use crate::command::pack;
    use crate::handler::{FlightSqlBase, HasFlightSqlBase};
    use crate::stream::{chunk_channel, StreamChunk};

    struct StubServer {
        base: FlightSqlBase,
    }

    impl HasFlightSqlBase for StubServer {
        fn flight_sql_base(&self) -> &FlightSqlBase {
            &self.base
        }
    }

    #[async_trait]
    impl FlightSqlHandler for StubServer {
        async fn do_put_statement_update(
            &self,
            _ctx: CallContext,
            cmd: CommandStatementUpdate,
        ) -> Result<i64, Status> {
            assert_eq!(cmd.query, "DELETE FROM t");
            Ok(7)
        }

        async fn do_get_catalogs(
            &self,
            _ctx: CallContext,
            _cmd: CommandGetCatalogs,
        ) -> Result<(arrow::datatypes::SchemaRef, crate::stream::ChunkReceiver), Status> {
            let schema = Arc::new(Schema::new(vec![Field::new("n", DataType::Int64, false)]));
            let batch = RecordBatch::try_new(
                schema.clone(),
                vec![Arc::new(Int64Array::from(vec![1, 2]))],
            )
            .unwrap();
            let (sender, receiver) = chunk_channel();
            tokio::spawn(async move {
                let _ = sender.send(StreamChunk::new(batch)).await;
            });
            Ok((schema, receiver))
        }
    }

    fn router() -> FlightSqlRouter<StubServer> {
        FlightSqlRouter::new(Arc::new(StubServer {
            base: FlightSqlBase::new(),
        }))
    }

    #[tokio::test]
    async fn get_flight_info_rejects_unknown_command() {
        let envelope = prost_types::Any {
            type_url: "type.flightsql.example.com/NotARealCommand".into(),
            value: vec![],
        };
        let descriptor = FlightDescriptor {
            r#type: 1,
            cmd: envelope.encode_to_vec().into(),
            path: vec![],
        };
        let err = router()
            .get_flight_info(Request::new(descriptor))
            .await
            .unwrap_err();
        assert_eq!(err.code(), tonic::Code::InvalidArgument);
    }

    #[tokio::test]
    async fn get_flight_info_dispatches_sql_info_to_the_default_base() {
        let server = StubServer {
            base: FlightSqlBase::new(),
        };
        server
            .base
            .register_sql_info(1, CapabilityValue::String("v1.0".into()));
        let router = FlightSqlRouter::new(Arc::new(server));

        let any = pack(&flight_sql_proto::CommandGetSqlInfo { info: vec![1] });
        let descriptor = FlightDescriptor {
            r#type: 1,
            cmd: any.encode_to_vec().into(),
            path: vec![],
        };
        let info = router
            .get_flight_info(Request::new(descriptor.clone()))
            .await
            .unwrap()
            .into_inner();
        assert_eq!(info.endpoint[0].ticket.as_ref().unwrap().ticket, descriptor.cmd);
    }

    #[tokio::test]
    async fn do_get_streams_catalogs_batch() {
        let any = pack(&flight_sql_proto::CommandGetCatalogs {});
        let ticket = Ticket {
            ticket: any.encode_to_vec().into(),
        };
        let mut stream = router()
            .do_get(Request::new(ticket))
            .await
            .unwrap()
            .into_inner();
        let mut count = 0;
        while let Some(item) = stream.next().await {
            item.unwrap();
            count += 1;
        }
        assert_eq!(count, 2); // one schema message + one batch message
    }

    #[tokio::test]
    async fn do_action_rejects_unknown_type() {
        let action = Action {
            r#type: "SomethingElse".into(),
            body: Bytes::new(),
        };
        let err = router().do_action(Request::new(action)).await.unwrap_err();
        assert_eq!(err.code(), tonic::Code::InvalidArgument);
    }

    #[tokio::test]
    async fn list_actions_advertises_the_two_prepared_statement_actions() {
        let mut stream = router()
            .list_actions(Request::new(Empty {}))
            .await
            .unwrap()
            .into_inner();
        let mut types = Vec::new();
        while let Some(item) = stream.next().await {
            types.push(item.unwrap().r#type);
        }
        assert_eq!(types.len(), 2);
    }
}

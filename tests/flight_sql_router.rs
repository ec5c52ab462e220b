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

//! End-to-end scenarios from spec.md §8, driven through a real `tonic`
//! client/server pair bound to a loopback port — the router's unit tests
//! (`src/router.rs`) call `FlightService` methods directly; this suite
//! exercises the same dispatch path the way an actual RPC client would,
//! including wire (de)serialization of `FlightData`/`Action`/`Ticket`.

use std::net::SocketAddr;
use std::sync::Arc;

use arrow_flight::flight_service_client::FlightServiceClient;
use arrow_flight::{Action, FlightData, FlightDescriptor, Ticket};
use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;
use prost::Message;
use tokio::net::TcpListener;
use tokio_stream::wrappers::TcpListenerStream;
use tonic::transport::{Channel, Endpoint, Server};
use tonic::{Code, Request, Status};

use flight_sql_core::capability::CapabilityValue;
use flight_sql_core::handler::{FlightSqlBase, FlightSqlHandler, HasFlightSqlBase};
use flight_sql_core::router::FlightSqlRouter;
use flight_sql_core::CallContext;
use flight_sql_proto::{
    ActionCreatePreparedStatementRequest, ActionCreatePreparedStatementResult, CommandGetCatalogs,
    CommandGetSqlInfo, CommandStatementUpdate, TypeUrl,
};

struct FakeServer {
    base: FlightSqlBase,
}

impl FakeServer {
    fn new() -> Self {
        Self {
            base: FlightSqlBase::new(),
        }
    }
}

impl HasFlightSqlBase for FakeServer {
    fn flight_sql_base(&self) -> &FlightSqlBase {
        &self.base
    }
}

#[async_trait]
impl FlightSqlHandler for FakeServer {
    async fn do_put_statement_update(
        &self,
        _ctx: CallContext,
        cmd: CommandStatementUpdate,
    ) -> Result<i64, Status> {
        assert_eq!(cmd.query, "DELETE FROM t");
        Ok(7)
    }

    async fn create_prepared_statement(
        &self,
        _ctx: CallContext,
        request: ActionCreatePreparedStatementRequest,
    ) -> Result<ActionCreatePreparedStatementResult, Status> {
        assert_eq!(request.query, "SELECT ?");
        Ok(ActionCreatePreparedStatementResult {
            prepared_statement_handle: Bytes::from_static(b"\xAB"),
            dataset_schema: None,
            parameter_schema: Some(Bytes::from_static(b"int32-schema-bytes")),
        })
    }
}

/// Binds `server`'s router to a loopback port, runs it in a background
/// task for the lifetime of the test process, and returns a connected
/// client.
async fn spawn(server: FakeServer) -> FlightServiceClient<Channel> {
    let router = FlightSqlRouter::new(Arc::new(server));
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr: SocketAddr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        Server::builder()
            .add_service(router.into_server())
            .serve_with_incoming(TcpListenerStream::new(listener))
            .await
            .unwrap();
    });

    let channel = Endpoint::from_shared(format!("http://{addr}"))
        .unwrap()
        .connect()
        .await
        .unwrap();
    FlightServiceClient::new(channel)
}

fn envelope_bytes<T: Message + TypeUrl>(msg: &T) -> Bytes {
    flight_sql_core::command::pack(msg).encode_to_vec().into()
}

/// Scenario 1: register two capabilities, query them through `GetFlightInfo`
/// then fetch the ticket through `DoGet`; the wire record carries both ids
/// in order with the matching union type codes.
#[tokio::test]
async fn capability_query_round_trips_through_flight_info_and_do_get() {
    let server = FakeServer::new();
    server
        .base
        .register_sql_info(1, CapabilityValue::String("v1.0".into()));
    server.base.register_sql_info(2, CapabilityValue::Bool(true));
    let mut client = spawn(server).await;

    let cmd = CommandGetSqlInfo { info: vec![1, 2] };
    let descriptor = FlightDescriptor {
        r#type: 1,
        cmd: envelope_bytes(&cmd),
        path: vec![],
    };

    let info = client
        .get_flight_info(Request::new(descriptor.clone()))
        .await
        .unwrap()
        .into_inner();
    assert_eq!(info.total_records, -1);
    let ticket = info.endpoint[0].ticket.clone().unwrap();
    assert_eq!(ticket.ticket, descriptor.cmd);

    let mut stream = client
        .do_get(Request::new(ticket))
        .await
        .unwrap()
        .into_inner();
    let messages: Vec<_> = stream.by_ref().collect().await;
    assert_eq!(messages.len(), 2); // schema message + one record batch
    assert!(messages.iter().all(|m| m.is_ok()));
}

/// Scenario 2: requesting an id that was never registered is `NotFound`
/// and names the offending id.
#[tokio::test]
async fn unknown_capability_id_is_not_found() {
    let server = FakeServer::new();
    server
        .base
        .register_sql_info(1, CapabilityValue::String("v1.0".into()));
    let mut client = spawn(server).await;

    let ticket = Ticket {
        ticket: envelope_bytes(&CommandGetSqlInfo { info: vec![1, 99] }),
    };
    let err = client.do_get(Request::new(ticket)).await.unwrap_err();
    assert_eq!(err.code(), Code::NotFound);
    assert!(err.message().contains("99"));
}

/// Scenario 3: a statement update with zero data batches replies with one
/// `PutResult` whose `appMetadata` decodes to the handler's record count.
#[tokio::test]
async fn statement_update_replies_with_record_count() {
    let mut client = spawn(FakeServer::new()).await;

    let descriptor = FlightDescriptor {
        r#type: 1,
        cmd: envelope_bytes(&CommandStatementUpdate {
            query: "DELETE FROM t".into(),
        }),
        path: vec![],
    };
    let schema_message = FlightData {
        flight_descriptor: Some(descriptor),
        data_header: Bytes::new(),
        app_metadata: Bytes::new(),
        data_body: Bytes::new(),
    };

    let mut stream = client
        .do_put(futures::stream::once(async { schema_message }))
        .await
        .unwrap()
        .into_inner();
    let reply = stream.next().await.unwrap().unwrap();
    let decoded =
        flight_sql_proto::DoPutUpdateResult::decode(reply.app_metadata.as_ref()).unwrap();
    assert_eq!(decoded.record_count, 7);
    assert!(stream.next().await.is_none());
}

/// Scenario 4: `CreatePreparedStatement` replies with one `Result` whose
/// envelope-wrapped payload carries the handler's handle and parameter
/// schema, with no dataset schema.
#[tokio::test]
async fn create_prepared_statement_replies_with_handle_and_parameter_schema() {
    let mut client = spawn(FakeServer::new()).await;

    let request = ActionCreatePreparedStatementRequest {
        query: "SELECT ?".into(),
    };
    let action = Action {
        r#type: "CreatePreparedStatement".into(),
        body: envelope_bytes(&request),
    };

    let mut stream = client
        .do_action(Request::new(action))
        .await
        .unwrap()
        .into_inner();
    let result = stream.next().await.unwrap().unwrap();
    let envelope = prost_types::Any::decode(result.body.as_ref()).unwrap();
    let decoded = ActionCreatePreparedStatementResult::decode(envelope.value.as_slice()).unwrap();
    assert_eq!(decoded.prepared_statement_handle, Bytes::from_static(b"\xAB"));
    assert!(decoded.dataset_schema.is_none());
    assert_eq!(
        decoded.parameter_schema,
        Some(Bytes::from_static(b"int32-schema-bytes"))
    );
    assert!(stream.next().await.is_none());
}

/// Scenario 5: against the default base, an unoverridden method returns
/// `Unimplemented` naming itself.
#[tokio::test]
async fn unimplemented_method_names_itself() {
    let mut client = spawn(FakeServer::new()).await;
    let descriptor = FlightDescriptor {
        r#type: 1,
        cmd: envelope_bytes(&CommandGetCatalogs {}),
        path: vec![],
    };
    let err = client
        .get_flight_info(Request::new(descriptor))
        .await
        .unwrap_err();
    assert_eq!(err.code(), Code::Unimplemented);
    assert!(err.message().contains("GetFlightInfoCatalogs"));
}

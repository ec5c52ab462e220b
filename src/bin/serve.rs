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

//! Minimal server binary demonstrating how a concrete handler is wired into
//! [`flight_sql_core::router::FlightSqlRouter`]. This is not a SQL engine —
//! every metadata query answers from the capability registry or an empty
//! in-memory table list, since a real backend is out of this crate's scope
//! (spec.md §1).

use std::net::SocketAddr;
use std::sync::Arc;

use arrow::array::StringArray;
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use async_trait::async_trait;
use tonic::transport::Server;
use tonic::Status;

use flight_sql_core::capability::CapabilityValue;
use flight_sql_core::handler::{FlightSqlBase, FlightSqlHandler, HasFlightSqlBase};
use flight_sql_core::stream::{chunk_channel, ChunkReceiver, StreamChunk};
use flight_sql_core::{CallContext, FlightSqlRouter};
use flight_sql_proto::CommandGetTableTypes;

/// The smallest possible concrete server: embeds the default base (so
/// `GetSqlInfo` works out of the box) and additionally answers
/// `GetTableTypes` with the two types every SQL database supports.
struct DemoServer {
    base: FlightSqlBase,
}

impl HasFlightSqlBase for DemoServer {
    fn flight_sql_base(&self) -> &FlightSqlBase {
        &self.base
    }
}

#[async_trait]
impl FlightSqlHandler for DemoServer {
    async fn do_get_table_types(
        &self,
        _ctx: CallContext,
        _cmd: CommandGetTableTypes,
    ) -> Result<(arrow::datatypes::SchemaRef, ChunkReceiver), Status> {
        let schema = Arc::new(Schema::new(vec![Field::new(
            "table_type",
            DataType::Utf8,
            false,
        )]));
        let batch = RecordBatch::try_new(
            schema.clone(),
            vec![Arc::new(StringArray::from(vec!["TABLE", "VIEW"]))],
        )
        .map_err(|e| Status::internal(format!("building table types batch: {e}")))?;

        let (sender, receiver) = chunk_channel();
        tokio::spawn(async move {
            let _ = sender.send(StreamChunk::new(batch)).await;
        });
        Ok((schema, receiver))
    }
}

impl DemoServer {
    fn new() -> Self {
        let base = FlightSqlBase::new();
        base.register_sql_info(0, CapabilityValue::String("flight-sql-core demo".into()));
        base.register_sql_info(1, CapabilityValue::String(env!("CARGO_PKG_VERSION").into()));
        Self { base }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let addr: SocketAddr = std::env::var("FLIGHT_SQL_ADDR")
        .unwrap_or_else(|_| "0.0.0.0:32010".to_string())
        .parse()?;

    let router = FlightSqlRouter::new(Arc::new(DemoServer::new()));
    log::info!("flight-sql-serve listening on {addr}");

    Server::builder()
        .add_service(router.into_server())
        .serve(addr)
        .await?;
    Ok(())
}

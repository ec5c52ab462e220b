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

//! Handler Interface & Default Base (spec component D).
//!
//! [`FlightSqlHandler`] declares every SQL-shaped operation the router
//! (component E) dispatches to. [`FlightSqlBase`] pre-implements all of them
//! as `Unimplemented`, except the two capability-registry-backed SqlInfo
//! methods, so a concrete server only has to override what it actually
//! supports.

use arrow::datatypes::SchemaRef;
use arrow_flight::{FlightDescriptor, FlightEndpoint, FlightInfo, IpcMessage, SchemaAsIpc, Ticket};
use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::mpsc;
use tonic::Status;

use flight_sql_proto::{
    ActionClosePreparedStatementRequest, ActionCreatePreparedStatementRequest,
    ActionCreatePreparedStatementResult, CommandGetCatalogs, CommandGetDbSchemas,
    CommandGetSqlInfo, CommandGetTableTypes, CommandGetTables, CommandGetXdbcTypeInfo,
    CommandPreparedStatementQuery, CommandPreparedStatementUpdate, CommandStatementQuery,
    CommandStatementUpdate, TicketStatementQuery,
};

use crate::capability::CapabilityRegistry;
pub use crate::capability::CapabilityValue;
use crate::context::CallContext;
use crate::errors::FlightSqlError;
use crate::stream::{ChunkReceiver, FlightDataStream};
use crate::table_ref::{CrossTableRef, TableRef};

/// The reply channel a `DoPutPreparedStatementQuery` handler writes
/// acknowledgements to while it is still reading parameter batches from
/// `reader`. A plain `mpsc::Sender` plays the metadata-writer-adapter role
/// spec.md §4.E describes; it carries `Result` so a handler error that
/// surfaces after the response stream has already started can still
/// terminate it with a status instead of silently dropping the channel.
pub type PutResultSender = mpsc::Sender<Result<arrow_flight::PutResult, Status>>;

mod sealed {
    pub trait Sealed {}
    impl<T: super::HasFlightSqlBase> Sealed for T {}
}

/// Implemented by anything that embeds a [`FlightSqlBase`]. This is the
/// "extend the base" requirement from spec.md §4.D made into a type-level
/// fact: [`FlightSqlHandler`] can only be implemented by types that satisfy
/// this trait, since `sealed::Sealed` is blanket-implemented over it and is
/// otherwise unreachable from outside this crate.
pub trait HasFlightSqlBase {
    fn flight_sql_base(&self) -> &FlightSqlBase;
}

impl HasFlightSqlBase for FlightSqlBase {
    fn flight_sql_base(&self) -> &FlightSqlBase {
        self
    }
}

/// Declares the ~25 SQL-shaped operations (spec.md §4.D) the router dispatches
/// to. Every method defaults to `Unimplemented`, except the two SqlInfo
/// methods, which the default base answers straight from the capability
/// registry.
#[async_trait]
pub trait FlightSqlHandler: HasFlightSqlBase + sealed::Sealed + Send + Sync {
    async fn get_flight_info_statement(
        &self,
        _ctx: CallContext,
        _cmd: CommandStatementQuery,
        _descriptor: FlightDescriptor,
    ) -> Result<FlightInfo, Status> {
        Err(FlightSqlError::unimplemented("GetFlightInfoStatement").into())
    }

    async fn get_flight_info_prepared_statement(
        &self,
        _ctx: CallContext,
        _cmd: CommandPreparedStatementQuery,
        _descriptor: FlightDescriptor,
    ) -> Result<FlightInfo, Status> {
        Err(FlightSqlError::unimplemented("GetFlightInfoPreparedStatement").into())
    }

    async fn get_flight_info_catalogs(
        &self,
        _ctx: CallContext,
        _cmd: CommandGetCatalogs,
        _descriptor: FlightDescriptor,
    ) -> Result<FlightInfo, Status> {
        Err(FlightSqlError::unimplemented("GetFlightInfoCatalogs").into())
    }

    async fn get_flight_info_db_schemas(
        &self,
        _ctx: CallContext,
        _cmd: CommandGetDbSchemas,
        _descriptor: FlightDescriptor,
    ) -> Result<FlightInfo, Status> {
        Err(FlightSqlError::unimplemented("GetFlightInfoDbSchemas").into())
    }

    async fn get_flight_info_tables(
        &self,
        _ctx: CallContext,
        _cmd: CommandGetTables,
        _descriptor: FlightDescriptor,
    ) -> Result<FlightInfo, Status> {
        Err(FlightSqlError::unimplemented("GetFlightInfoTables").into())
    }

    async fn get_flight_info_table_types(
        &self,
        _ctx: CallContext,
        _cmd: CommandGetTableTypes,
        _descriptor: FlightDescriptor,
    ) -> Result<FlightInfo, Status> {
        Err(FlightSqlError::unimplemented("GetFlightInfoTableTypes").into())
    }

    async fn get_flight_info_primary_keys(
        &self,
        _ctx: CallContext,
        _table: TableRef,
        _descriptor: FlightDescriptor,
    ) -> Result<FlightInfo, Status> {
        Err(FlightSqlError::unimplemented("GetFlightInfoPrimaryKeys").into())
    }

    async fn get_flight_info_exported_keys(
        &self,
        _ctx: CallContext,
        _table: TableRef,
        _descriptor: FlightDescriptor,
    ) -> Result<FlightInfo, Status> {
        Err(FlightSqlError::unimplemented("GetFlightInfoExportedKeys").into())
    }

    async fn get_flight_info_imported_keys(
        &self,
        _ctx: CallContext,
        _table: TableRef,
        _descriptor: FlightDescriptor,
    ) -> Result<FlightInfo, Status> {
        Err(FlightSqlError::unimplemented("GetFlightInfoImportedKeys").into())
    }

    async fn get_flight_info_cross_reference(
        &self,
        _ctx: CallContext,
        _cross: CrossTableRef,
        _descriptor: FlightDescriptor,
    ) -> Result<FlightInfo, Status> {
        Err(FlightSqlError::unimplemented("GetFlightInfoCrossReference").into())
    }

    async fn get_flight_info_xdbc_type_info(
        &self,
        _ctx: CallContext,
        _cmd: CommandGetXdbcTypeInfo,
        _descriptor: FlightDescriptor,
    ) -> Result<FlightInfo, Status> {
        Err(FlightSqlError::unimplemented("GetFlightInfoXdbcTypeInfo").into())
    }

    /// Backed by the capability registry; see [`FlightSqlBase::sql_info_flight_info`].
    async fn get_flight_info_sql_info(
        &self,
        _ctx: CallContext,
        cmd: CommandGetSqlInfo,
        descriptor: FlightDescriptor,
    ) -> Result<FlightInfo, Status> {
        self.flight_sql_base().sql_info_flight_info(cmd, descriptor)
    }

    async fn do_get_statement(
        &self,
        _ctx: CallContext,
        _ticket: TicketStatementQuery,
    ) -> Result<(SchemaRef, ChunkReceiver), Status> {
        Err(FlightSqlError::unimplemented("DoGetStatement").into())
    }

    async fn do_get_prepared_statement(
        &self,
        _ctx: CallContext,
        _cmd: CommandPreparedStatementQuery,
    ) -> Result<(SchemaRef, ChunkReceiver), Status> {
        Err(FlightSqlError::unimplemented("DoGetPreparedStatement").into())
    }

    async fn do_get_catalogs(
        &self,
        _ctx: CallContext,
        _cmd: CommandGetCatalogs,
    ) -> Result<(SchemaRef, ChunkReceiver), Status> {
        Err(FlightSqlError::unimplemented("DoGetCatalogs").into())
    }

    async fn do_get_db_schemas(
        &self,
        _ctx: CallContext,
        _cmd: CommandGetDbSchemas,
    ) -> Result<(SchemaRef, ChunkReceiver), Status> {
        Err(FlightSqlError::unimplemented("DoGetDbSchemas").into())
    }

    async fn do_get_tables(
        &self,
        _ctx: CallContext,
        _cmd: CommandGetTables,
    ) -> Result<(SchemaRef, ChunkReceiver), Status> {
        Err(FlightSqlError::unimplemented("DoGetTables").into())
    }

    async fn do_get_table_types(
        &self,
        _ctx: CallContext,
        _cmd: CommandGetTableTypes,
    ) -> Result<(SchemaRef, ChunkReceiver), Status> {
        Err(FlightSqlError::unimplemented("DoGetTableTypes").into())
    }

    async fn do_get_primary_keys(
        &self,
        _ctx: CallContext,
        _table: TableRef,
    ) -> Result<(SchemaRef, ChunkReceiver), Status> {
        Err(FlightSqlError::unimplemented("DoGetPrimaryKeys").into())
    }

    async fn do_get_exported_keys(
        &self,
        _ctx: CallContext,
        _table: TableRef,
    ) -> Result<(SchemaRef, ChunkReceiver), Status> {
        Err(FlightSqlError::unimplemented("DoGetExportedKeys").into())
    }

    async fn do_get_imported_keys(
        &self,
        _ctx: CallContext,
        _table: TableRef,
    ) -> Result<(SchemaRef, ChunkReceiver), Status> {
        Err(FlightSqlError::unimplemented("DoGetImportedKeys").into())
    }

    async fn do_get_cross_reference(
        &self,
        _ctx: CallContext,
        _cross: CrossTableRef,
    ) -> Result<(SchemaRef, ChunkReceiver), Status> {
        Err(FlightSqlError::unimplemented("DoGetCrossReference").into())
    }

    async fn do_get_xdbc_type_info(
        &self,
        _ctx: CallContext,
        _cmd: CommandGetXdbcTypeInfo,
    ) -> Result<(SchemaRef, ChunkReceiver), Status> {
        Err(FlightSqlError::unimplemented("DoGetXdbcTypeInfo").into())
    }

    /// Backed by the capability registry; see [`FlightSqlBase::sql_info_chunks`].
    async fn do_get_sql_info(
        &self,
        _ctx: CallContext,
        cmd: CommandGetSqlInfo,
    ) -> Result<(SchemaRef, ChunkReceiver), Status> {
        self.flight_sql_base().sql_info_chunks(cmd)
    }

    async fn do_put_statement_update(
        &self,
        _ctx: CallContext,
        _cmd: CommandStatementUpdate,
    ) -> Result<i64, Status> {
        Err(FlightSqlError::unimplemented("DoPutCommandStatementUpdate").into())
    }

    async fn do_put_prepared_statement_update(
        &self,
        _ctx: CallContext,
        _cmd: CommandPreparedStatementUpdate,
    ) -> Result<i64, Status> {
        Err(FlightSqlError::unimplemented("DoPutPreparedStatementUpdate").into())
    }

    async fn do_put_prepared_statement_query(
        &self,
        _ctx: CallContext,
        _cmd: CommandPreparedStatementQuery,
        _reader: FlightDataStream,
        _writer: PutResultSender,
    ) -> Result<(), Status> {
        Err(FlightSqlError::unimplemented("DoPutPreparedStatementQuery").into())
    }

    async fn create_prepared_statement(
        &self,
        _ctx: CallContext,
        _request: ActionCreatePreparedStatementRequest,
    ) -> Result<ActionCreatePreparedStatementResult, Status> {
        Err(FlightSqlError::unimplemented("CreatePreparedStatement").into())
    }

    async fn close_prepared_statement(
        &self,
        _ctx: CallContext,
        _request: ActionClosePreparedStatementRequest,
    ) -> Result<(), Status> {
        Err(FlightSqlError::unimplemented("ClosePreparedStatement").into())
    }
}

/// The default base every concrete server embeds. Holds the capability
/// registry and answers the two SqlInfo methods from it; every other method
/// it offers (via the blanket [`FlightSqlHandler`] impl below) returns
/// `Unimplemented`.
#[derive(Default)]
pub struct FlightSqlBase {
    registry: CapabilityRegistry,
}

impl FlightSqlBase {
    pub fn new() -> Self {
        Self::default()
    }

    /// Forwards to the capability registry's `Register` (spec.md §4.D).
    pub fn register_sql_info(&self, id: u32, value: CapabilityValue) {
        self.registry.register(id, value);
    }

    pub fn registry(&self) -> &CapabilityRegistry {
        &self.registry
    }

    fn sql_info_flight_info(
        &self,
        _cmd: CommandGetSqlInfo,
        descriptor: FlightDescriptor,
    ) -> Result<FlightInfo, Status> {
        if self.registry.size() == 0 {
            return Err(
                FlightSqlError::NotFound("no sql info capabilities are registered".into()).into(),
            );
        }
        // Only the fixed schema is needed here — whether every requested id
        // is actually registered is validated when `DoGet` builds the rows,
        // not at `GetFlightInfo` time (spec.md §8 boundary cases).
        let schema = crate::capability::sql_info_schema();

        let options = arrow::ipc::writer::IpcWriteOptions::default();
        let IpcMessage(schema_bytes) = SchemaAsIpc::new(schema.as_ref(), &options)
            .try_into()
            .map_err(|e: arrow_schema::ArrowError| {
                Status::internal(format!("serializing sql info schema: {e}"))
            })?;

        let endpoint = FlightEndpoint {
            ticket: Some(Ticket {
                ticket: descriptor.cmd.clone(),
            }),
            location: vec![],
            expiration_time: None,
            app_metadata: Bytes::new(),
        };

        Ok(FlightInfo {
            schema: schema_bytes,
            flight_descriptor: Some(descriptor),
            endpoint: vec![endpoint],
            total_records: -1,
            total_bytes: -1,
            ordered: false,
            app_metadata: Bytes::new(),
        })
    }

    fn sql_info_chunks(&self, cmd: CommandGetSqlInfo) -> Result<(SchemaRef, ChunkReceiver), Status> {
        if self.registry.size() == 0 {
            return Err(
                FlightSqlError::NotFound("no sql info capabilities are registered".into()).into(),
            );
        }
        let record = self
            .registry
            .build_record(&cmd.info)
            .map_err(Status::from)?;
        let schema = record.schema();
        let (sender, receiver) = crate::stream::chunk_channel();
        tokio::spawn(async move {
            let _ = sender.send(crate::stream::StreamChunk::new(record)).await;
        });
        Ok((schema, receiver))
    }
}

impl FlightSqlHandler for FlightSqlBase {}

#[cfg(test)]
mod test {
    use super::*;
    use crate::capability::CapabilityValue as CV;

    #[tokio::test]
    async fn unoverridden_method_is_unimplemented_and_names_itself() {
        let base = FlightSqlBase::new();
        let err = base
            .get_flight_info_catalogs(
                CallContext::new(),
                CommandGetCatalogs {},
                FlightDescriptor {
                    r#type: 1,
                    cmd: Bytes::new(),
                    path: vec![],
                },
            )
            .await
            .unwrap_err();
        assert_eq!(err.code(), tonic::Code::Unimplemented);
        assert!(err.message().contains("GetFlightInfoCatalogs"));
    }

    #[tokio::test]
    async fn sql_info_is_answered_from_the_registry() {
        let base = FlightSqlBase::new();
        base.register_sql_info(1, CV::String("v1.0".into()));
        let descriptor = FlightDescriptor {
            r#type: 1,
            cmd: Bytes::from_static(b"original-command-bytes"),
            path: vec![],
        };
        let info = base
            .get_flight_info_sql_info(
                CallContext::new(),
                CommandGetSqlInfo { info: vec![1] },
                descriptor.clone(),
            )
            .await
            .unwrap();
        assert_eq!(info.endpoint.len(), 1);
        let ticket = info.endpoint[0].ticket.as_ref().unwrap();
        assert_eq!(ticket.ticket, descriptor.cmd);

        let (schema, mut receiver) = base
            .do_get_sql_info(CallContext::new(), CommandGetSqlInfo { info: vec![1] })
            .await
            .unwrap();
        assert_eq!(schema.fields().len(), 2);
        let chunk = receiver.recv().await.unwrap();
        assert_eq!(chunk.data.num_rows(), 1);
    }

    #[tokio::test]
    async fn sql_info_with_empty_registry_is_not_found() {
        let base = FlightSqlBase::new();
        let err = base
            .do_get_sql_info(CallContext::new(), CommandGetSqlInfo { info: vec![] })
            .await
            .unwrap_err();
        assert_eq!(err.code(), tonic::Code::NotFound);
    }

    /// An unregistered id is only a `DoGet`-time failure (spec.md §8
    /// boundary cases): `GetFlightInfo` just returns the locator, since it
    /// never has to materialize the rows to know the fixed schema.
    #[tokio::test]
    async fn get_flight_info_sql_info_succeeds_even_with_an_unregistered_id() {
        let base = FlightSqlBase::new();
        base.register_sql_info(1, CV::String("v1.0".into()));
        let descriptor = FlightDescriptor {
            r#type: 1,
            cmd: Bytes::from_static(b"original-command-bytes"),
            path: vec![],
        };
        let info = base
            .get_flight_info_sql_info(
                CallContext::new(),
                CommandGetSqlInfo { info: vec![1, 99] },
                descriptor.clone(),
            )
            .await
            .unwrap();
        assert_eq!(info.endpoint[0].ticket.as_ref().unwrap().ticket, descriptor.cmd);

        let err = base
            .do_get_sql_info(CallContext::new(), CommandGetSqlInfo { info: vec![1, 99] })
            .await
            .unwrap_err();
        assert_eq!(err.code(), tonic::Code::NotFound);
        assert!(err.message().contains("99"));
    }
}

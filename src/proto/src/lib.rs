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

//! Wire message definitions for the SQL-over-columnar-RPC command set.
//!
//! These are hand-authored `prost::Message` structs rather than
//! build.rs-generated code, but they are wire-compatible protobuf messages
//! like any other: every `FlightDescriptor.cmd`, `Ticket.ticket` and
//! `Action.body` carries one of these, wrapped in a `prost_types::Any`
//! envelope keyed by [`TypeUrl::TYPE_URL`].

use bytes::Bytes;

/// Associates a wire message with the type URL used to select it out of an
/// `Any` envelope. Kept as a trait (rather than a loose constant per type)
/// so the envelope codec and the dispatch table read off the same name.
pub trait TypeUrl {
    const TYPE_URL: &'static str;
}

macro_rules! type_url {
    ($ty:ty, $name:literal) => {
        impl TypeUrl for $ty {
            const TYPE_URL: &'static str = concat!("type.flightsql.example.com/", $name);
        }
    };
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct CommandStatementQuery {
    #[prost(string, tag = "1")]
    pub query: ::prost::alloc::string::String,
}
type_url!(CommandStatementQuery, "CommandStatementQuery");

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct CommandPreparedStatementQuery {
    #[prost(bytes = "bytes", tag = "1")]
    pub prepared_statement_handle: Bytes,
}
type_url!(
    CommandPreparedStatementQuery,
    "CommandPreparedStatementQuery"
);

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct CommandStatementUpdate {
    #[prost(string, tag = "1")]
    pub query: ::prost::alloc::string::String,
}
type_url!(CommandStatementUpdate, "CommandStatementUpdate");

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct CommandPreparedStatementUpdate {
    #[prost(bytes = "bytes", tag = "1")]
    pub prepared_statement_handle: Bytes,
}
type_url!(
    CommandPreparedStatementUpdate,
    "CommandPreparedStatementUpdate"
);

#[derive(Clone, Copy, PartialEq, ::prost::Message)]
pub struct CommandGetCatalogs {}
type_url!(CommandGetCatalogs, "CommandGetCatalogs");

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct CommandGetDbSchemas {
    #[prost(string, optional, tag = "1")]
    pub catalog: ::core::option::Option<::prost::alloc::string::String>,
    #[prost(string, optional, tag = "2")]
    pub db_schema_filter_pattern: ::core::option::Option<::prost::alloc::string::String>,
}
type_url!(CommandGetDbSchemas, "CommandGetDbSchemas");

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct CommandGetTables {
    #[prost(string, optional, tag = "1")]
    pub catalog: ::core::option::Option<::prost::alloc::string::String>,
    #[prost(string, optional, tag = "2")]
    pub db_schema_filter_pattern: ::core::option::Option<::prost::alloc::string::String>,
    #[prost(string, optional, tag = "3")]
    pub table_name_filter_pattern: ::core::option::Option<::prost::alloc::string::String>,
    #[prost(string, repeated, tag = "4")]
    pub table_types: ::prost::alloc::vec::Vec<::prost::alloc::string::String>,
    #[prost(bool, tag = "5")]
    pub include_schema: bool,
}
type_url!(CommandGetTables, "CommandGetTables");

#[derive(Clone, Copy, PartialEq, ::prost::Message)]
pub struct CommandGetTableTypes {}
type_url!(CommandGetTableTypes, "CommandGetTableTypes");

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct CommandGetPrimaryKeys {
    #[prost(string, optional, tag = "1")]
    pub catalog: ::core::option::Option<::prost::alloc::string::String>,
    #[prost(string, optional, tag = "2")]
    pub db_schema: ::core::option::Option<::prost::alloc::string::String>,
    #[prost(string, tag = "3")]
    pub table: ::prost::alloc::string::String,
}
type_url!(CommandGetPrimaryKeys, "CommandGetPrimaryKeys");

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct CommandGetExportedKeys {
    #[prost(string, optional, tag = "1")]
    pub catalog: ::core::option::Option<::prost::alloc::string::String>,
    #[prost(string, optional, tag = "2")]
    pub db_schema: ::core::option::Option<::prost::alloc::string::String>,
    #[prost(string, tag = "3")]
    pub table: ::prost::alloc::string::String,
}
type_url!(CommandGetExportedKeys, "CommandGetExportedKeys");

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct CommandGetImportedKeys {
    #[prost(string, optional, tag = "1")]
    pub catalog: ::core::option::Option<::prost::alloc::string::String>,
    #[prost(string, optional, tag = "2")]
    pub db_schema: ::core::option::Option<::prost::alloc::string::String>,
    #[prost(string, tag = "3")]
    pub table: ::prost::alloc::string::String,
}
type_url!(CommandGetImportedKeys, "CommandGetImportedKeys");

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct CommandGetCrossReference {
    #[prost(string, optional, tag = "1")]
    pub pk_catalog: ::core::option::Option<::prost::alloc::string::String>,
    #[prost(string, optional, tag = "2")]
    pub pk_db_schema: ::core::option::Option<::prost::alloc::string::String>,
    #[prost(string, tag = "3")]
    pub pk_table: ::prost::alloc::string::String,
    #[prost(string, optional, tag = "4")]
    pub fk_catalog: ::core::option::Option<::prost::alloc::string::String>,
    #[prost(string, optional, tag = "5")]
    pub fk_db_schema: ::core::option::Option<::prost::alloc::string::String>,
    #[prost(string, tag = "6")]
    pub fk_table: ::prost::alloc::string::String,
}
type_url!(CommandGetCrossReference, "CommandGetCrossReference");

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct CommandGetXdbcTypeInfo {
    #[prost(int32, optional, tag = "1")]
    pub data_type: ::core::option::Option<i32>,
}
type_url!(CommandGetXdbcTypeInfo, "CommandGetXdbcTypeInfo");

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct CommandGetSqlInfo {
    #[prost(uint32, repeated, tag = "1")]
    pub info: ::prost::alloc::vec::Vec<u32>,
}
type_url!(CommandGetSqlInfo, "CommandGetSqlInfo");

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct TicketStatementQuery {
    #[prost(bytes = "bytes", tag = "1")]
    pub statement_handle: Bytes,
}
type_url!(TicketStatementQuery, "TicketStatementQuery");

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ActionCreatePreparedStatementRequest {
    #[prost(string, tag = "1")]
    pub query: ::prost::alloc::string::String,
}
type_url!(
    ActionCreatePreparedStatementRequest,
    "ActionCreatePreparedStatementRequest"
);

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ActionClosePreparedStatementRequest {
    #[prost(bytes = "bytes", tag = "1")]
    pub prepared_statement_handle: Bytes,
}
type_url!(
    ActionClosePreparedStatementRequest,
    "ActionClosePreparedStatementRequest"
);

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ActionCreatePreparedStatementResult {
    #[prost(bytes = "bytes", tag = "1")]
    pub prepared_statement_handle: Bytes,
    #[prost(bytes = "bytes", optional, tag = "2")]
    pub dataset_schema: ::core::option::Option<Bytes>,
    #[prost(bytes = "bytes", optional, tag = "3")]
    pub parameter_schema: ::core::option::Option<Bytes>,
}
type_url!(
    ActionCreatePreparedStatementResult,
    "ActionCreatePreparedStatementResult"
);

/// Body of the `PutResult.app_metadata` reply to a `DoPut` update command.
#[derive(Clone, Copy, PartialEq, ::prost::Message)]
pub struct DoPutUpdateResult {
    #[prost(int64, tag = "1")]
    pub record_count: i64,
}
type_url!(DoPutUpdateResult, "DoPutUpdateResult");

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

//! Command Envelope Codec (spec component A).
//!
//! Every `FlightDescriptor.cmd`, `Ticket.ticket` and `Action.body` carries a
//! two-level wrapper: an outer `prost_types::Any` (`type_url`, `value`) and
//! an inner protocol-specific message selected by `type_url`. This module
//! owns turning that pair of bytes into one of the closed set of [`Command`]
//! variants, and back.

use bytes::Bytes;
use prost::Message;
use prost_types::Any;

use crate::errors::FlightSqlError;
use flight_sql_proto::{
    ActionClosePreparedStatementRequest, ActionCreatePreparedStatementRequest,
    CommandGetCatalogs, CommandGetCrossReference, CommandGetDbSchemas, CommandGetExportedKeys,
    CommandGetImportedKeys, CommandGetPrimaryKeys, CommandGetSqlInfo, CommandGetTableTypes,
    CommandGetTables, CommandGetXdbcTypeInfo, CommandPreparedStatementQuery,
    CommandPreparedStatementUpdate, CommandStatementQuery, CommandStatementUpdate,
    TicketStatementQuery, TypeUrl,
};

/// The closed set of commands this service understands, plus a catch-all
/// for envelopes whose `type_url` isn't one of them. Whether an `Unknown`
/// command is an error is a dispatch (router) decision, not a decode one —
/// this module's job stops at "the envelope parsed".
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    StatementQuery(CommandStatementQuery),
    PreparedStatementQuery(CommandPreparedStatementQuery),
    StatementUpdate(CommandStatementUpdate),
    PreparedStatementUpdate(CommandPreparedStatementUpdate),
    GetCatalogs(CommandGetCatalogs),
    GetDbSchemas(CommandGetDbSchemas),
    GetTables(CommandGetTables),
    GetTableTypes(CommandGetTableTypes),
    GetPrimaryKeys(CommandGetPrimaryKeys),
    GetExportedKeys(CommandGetExportedKeys),
    GetImportedKeys(CommandGetImportedKeys),
    GetCrossReference(CommandGetCrossReference),
    GetXdbcTypeInfo(CommandGetXdbcTypeInfo),
    GetSqlInfo(CommandGetSqlInfo),
    TicketStatementQuery(TicketStatementQuery),
    ActionCreatePreparedStatementRequest(ActionCreatePreparedStatementRequest),
    ActionClosePreparedStatementRequest(ActionClosePreparedStatementRequest),
    /// A structurally valid envelope whose `type_url` is not one of the
    /// above. The router turns this into `InvalidArgument`.
    Unknown(String),
}

/// Wraps a wire message in its `Any` envelope.
pub fn pack<T>(msg: &T) -> Any
where
    T: Message + TypeUrl,
{
    Any {
        type_url: T::TYPE_URL.to_string(),
        value: msg.encode_to_vec(),
    }
}

/// Decodes the two-level wrapper from raw `descriptor.cmd` / `ticket.bytes`
/// bytes. Fails with `InvalidArgument` only when the bytes are not even a
/// well-formed `Any` envelope or the inner payload doesn't decode as the
/// message its own `type_url` claims.
pub fn decode_envelope(bytes: &Bytes) -> Result<Command, FlightSqlError> {
    let any = Any::decode(bytes.clone())
        .map_err(|e| FlightSqlError::InvalidArgument(format!("decoding command envelope: {e}")))?;
    decode_any(&any)
}

fn unpack<T>(any: &Any) -> Result<T, FlightSqlError>
where
    T: Message + Default + TypeUrl,
{
    T::decode(any.value.as_slice()).map_err(|e| {
        FlightSqlError::InvalidArgument(format!("decoding {}: {e}", T::TYPE_URL))
    })
}

fn decode_any(any: &Any) -> Result<Command, FlightSqlError> {
    Ok(match any.type_url.as_str() {
        CommandStatementQuery::TYPE_URL => Command::StatementQuery(unpack(any)?),
        CommandPreparedStatementQuery::TYPE_URL => {
            Command::PreparedStatementQuery(unpack(any)?)
        }
        CommandStatementUpdate::TYPE_URL => Command::StatementUpdate(unpack(any)?),
        CommandPreparedStatementUpdate::TYPE_URL => {
            Command::PreparedStatementUpdate(unpack(any)?)
        }
        CommandGetCatalogs::TYPE_URL => Command::GetCatalogs(unpack(any)?),
        CommandGetDbSchemas::TYPE_URL => Command::GetDbSchemas(unpack(any)?),
        CommandGetTables::TYPE_URL => Command::GetTables(unpack(any)?),
        CommandGetTableTypes::TYPE_URL => Command::GetTableTypes(unpack(any)?),
        CommandGetPrimaryKeys::TYPE_URL => Command::GetPrimaryKeys(unpack(any)?),
        CommandGetExportedKeys::TYPE_URL => Command::GetExportedKeys(unpack(any)?),
        CommandGetImportedKeys::TYPE_URL => Command::GetImportedKeys(unpack(any)?),
        CommandGetCrossReference::TYPE_URL => Command::GetCrossReference(unpack(any)?),
        CommandGetXdbcTypeInfo::TYPE_URL => Command::GetXdbcTypeInfo(unpack(any)?),
        CommandGetSqlInfo::TYPE_URL => Command::GetSqlInfo(unpack(any)?),
        TicketStatementQuery::TYPE_URL => Command::TicketStatementQuery(unpack(any)?),
        ActionCreatePreparedStatementRequest::TYPE_URL => {
            Command::ActionCreatePreparedStatementRequest(unpack(any)?)
        }
        ActionClosePreparedStatementRequest::TYPE_URL => {
            Command::ActionClosePreparedStatementRequest(unpack(any)?)
        }
        other => Command::Unknown(other.to_string()),
    })
}

/// Re-encodes a decoded command back into its envelope bytes. Used by
/// `GetFlightInfo` handlers that echo the original command as a ticket
/// (e.g. the SqlInfo case in spec.md §3) and exercised directly by the
/// round-trip property in spec.md §8.
pub fn encode_envelope(command: &Command) -> Result<Bytes, FlightSqlError> {
    let any = match command {
        Command::StatementQuery(m) => pack(m),
        Command::PreparedStatementQuery(m) => pack(m),
        Command::StatementUpdate(m) => pack(m),
        Command::PreparedStatementUpdate(m) => pack(m),
        Command::GetCatalogs(m) => pack(m),
        Command::GetDbSchemas(m) => pack(m),
        Command::GetTables(m) => pack(m),
        Command::GetTableTypes(m) => pack(m),
        Command::GetPrimaryKeys(m) => pack(m),
        Command::GetExportedKeys(m) => pack(m),
        Command::GetImportedKeys(m) => pack(m),
        Command::GetCrossReference(m) => pack(m),
        Command::GetXdbcTypeInfo(m) => pack(m),
        Command::GetSqlInfo(m) => pack(m),
        Command::TicketStatementQuery(m) => pack(m),
        Command::ActionCreatePreparedStatementRequest(m) => pack(m),
        Command::ActionClosePreparedStatementRequest(m) => pack(m),
        Command::Unknown(type_url) => {
            return Err(FlightSqlError::Internal(format!(
                "cannot re-encode unknown command {type_url}"
            )))
        }
    };
    Ok(any.encode_to_vec().into())
}

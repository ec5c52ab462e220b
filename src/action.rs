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

//! Action Protocol (spec component G): `CreatePreparedStatement` and
//! `ClosePreparedStatement` request/response (de)serialization, plus the
//! `ListActions` advertisement built from the same two string constants
//! `DoAction` dispatches on.

use arrow_flight::{ActionType, Result as FlightResult};
use bytes::Bytes;
use prost::Message;
use tonic::Status;

use flight_sql_proto::{
    ActionClosePreparedStatementRequest, ActionCreatePreparedStatementRequest,
    ActionCreatePreparedStatementResult,
};

use crate::command::{decode_envelope, pack, Command};
use crate::context::CallContext;
use crate::errors::FlightSqlError;
use crate::handler::FlightSqlHandler;

/// Part of the external interface (spec.md §6): these strings are what
/// clients put in `Action.r#type` and are what `ListActions` advertises.
pub const ACTION_CREATE_PREPARED_STATEMENT: &str = "CreatePreparedStatement";
pub const ACTION_CLOSE_PREPARED_STATEMENT: &str = "ClosePreparedStatement";

/// The two action descriptors `ListActions` always advertises, independent
/// of which methods a concrete handler has actually overridden — a client
/// discovers *capability to attempt* the action here, and an `Unimplemented`
/// status from the action call itself if the server has not wired it up.
pub fn list_actions() -> Vec<ActionType> {
    vec![
        ActionType {
            r#type: ACTION_CREATE_PREPARED_STATEMENT.to_string(),
            description: "Create a prepared statement for a SQL query".to_string(),
        },
        ActionType {
            r#type: ACTION_CLOSE_PREPARED_STATEMENT.to_string(),
            description: "Close a prepared statement, releasing server resources".to_string(),
        },
    ]
}

pub async fn create_prepared_statement<H: FlightSqlHandler + ?Sized>(
    handler: &H,
    ctx: CallContext,
    body: Bytes,
) -> Result<FlightResult, Status> {
    let request = match decode_envelope(&body).map_err(Status::from)? {
        Command::ActionCreatePreparedStatementRequest(request) => request,
        other => {
            return Err(FlightSqlError::InvalidArgument(format!(
                "expected ActionCreatePreparedStatementRequest, got {other:?}"
            ))
            .into())
        }
    };
    let result = handler.create_prepared_statement(ctx, request).await?;
    let envelope = pack(&result);
    Ok(FlightResult {
        body: envelope.encode_to_vec().into(),
    })
}

pub async fn close_prepared_statement<H: FlightSqlHandler + ?Sized>(
    handler: &H,
    ctx: CallContext,
    body: Bytes,
) -> Result<FlightResult, Status> {
    let request = match decode_envelope(&body).map_err(Status::from)? {
        Command::ActionClosePreparedStatementRequest(request) => request,
        other => {
            return Err(FlightSqlError::InvalidArgument(format!(
                "expected ActionClosePreparedStatementRequest, got {other:?}"
            ))
            .into())
        }
    };
    handler.close_prepared_statement(ctx, request).await?;
    Ok(FlightResult { body: Bytes::new() })
}

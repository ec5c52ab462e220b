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

//! Dispatch and streaming core for a SQL-over-columnar-RPC service.
//!
//! This crate sits between the generic four-verb columnar-RPC surface
//! (`GetFlightInfo`, `DoGet`, `DoPut`, `DoAction`, plus `ListActions`) and a
//! SQL-shaped handler interface a concrete server implements. It owns:
//! decoding the self-describing command envelope every descriptor, ticket
//! and action body carries ([`command`]), normalizing the table-ref-shaped
//! commands ([`table_ref`]), the capability registry backing `GetSqlInfo`
//! ([`capability`]), the handler trait and its unimplemented-by-default base
//! ([`handler`]), the verb router tying it all to `FlightService`
//! ([`router`]), the streaming adapter driving `DoGet` ([`stream`]), and the
//! prepared-statement action protocol ([`action`]).
//!
//! A concrete server embeds [`handler::FlightSqlBase`], overrides the
//! methods of [`handler::FlightSqlHandler`] it supports, and wraps itself in
//! [`router::FlightSqlRouter`] to get a `tonic` service ready to register
//! with a `Server::builder()`.

pub mod action;
pub mod capability;
pub mod command;
pub mod context;
pub mod errors;
pub mod handler;
pub mod router;
pub mod stream;
pub mod table_ref;

pub use context::CallContext;
pub use errors::FlightSqlError;
pub use handler::{FlightSqlBase, FlightSqlHandler, HasFlightSqlBase};
pub use router::FlightSqlRouter;
pub use stream::{ChunkReceiver, ChunkSender, StreamChunk};

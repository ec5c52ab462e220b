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

//! The error taxonomy every other module in this crate reports through.
//!
//! This is the only place a [`tonic::Status`] code is chosen from scratch;
//! every other module either returns a [`FlightSqlError`] or forwards a
//! `Status` a handler already produced.

use tonic::Status;

#[derive(Debug, thiserror::Error)]
pub enum FlightSqlError {
    /// A malformed envelope, an unknown command, or an unknown `DoAction`
    /// type. Maps to `InvalidArgument`.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// An unknown capability id, or no capabilities registered at all.
    /// Maps to `NotFound`.
    #[error("not found: {0}")]
    NotFound(String),

    /// A default-base method the concrete server did not override.
    /// Maps to `Unimplemented`.
    #[error("{0} not implemented")]
    Unimplemented(String),

    /// Serialization failures and invariant violations internal to this
    /// crate. Maps to `Internal`.
    #[error("internal error: {0}")]
    Internal(String),

    /// A handler-returned error, surfaced verbatim.
    #[error(transparent)]
    Handler(#[from] Status),
}

impl From<FlightSqlError> for Status {
    fn from(err: FlightSqlError) -> Status {
        match err {
            FlightSqlError::InvalidArgument(msg) => Status::invalid_argument(msg),
            FlightSqlError::NotFound(msg) => Status::not_found(msg),
            FlightSqlError::Unimplemented(msg) => Status::unimplemented(msg),
            FlightSqlError::Internal(msg) => Status::internal(msg),
            FlightSqlError::Handler(status) => status,
        }
    }
}

impl FlightSqlError {
    pub fn unimplemented(method: &str) -> Self {
        FlightSqlError::Unimplemented(method.to_string())
    }
}

#[cfg(test)]
mod test {
    use tonic::Code;

    use super::*;

    #[test]
    fn maps_to_expected_status_codes() {
        let cases: Vec<(FlightSqlError, Code)> = vec![
            (FlightSqlError::InvalidArgument("x".into()), Code::InvalidArgument),
            (FlightSqlError::NotFound("x".into()), Code::NotFound),
            (FlightSqlError::unimplemented("GetFlightInfoCatalogs"), Code::Unimplemented),
            (FlightSqlError::Internal("x".into()), Code::Internal),
            (FlightSqlError::Handler(Status::already_exists("x")), Code::AlreadyExists),
        ];
        for (err, code) in cases {
            let status: Status = err.into();
            assert_eq!(status.code(), code);
        }
    }

    #[test]
    fn unimplemented_message_names_the_method() {
        let status: Status = FlightSqlError::unimplemented("GetFlightInfoCatalogs").into();
        assert!(status.message().contains("GetFlightInfoCatalogs"));
    }
}

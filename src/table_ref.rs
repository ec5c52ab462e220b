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

//! Normalizes the four table-ref-shaped wire commands onto two common
//! shapes so handlers never see `CommandGetPrimaryKeys` vs.
//! `CommandGetExportedKeys` as meaningfully different types.

use flight_sql_proto::{
    CommandGetCrossReference, CommandGetExportedKeys, CommandGetImportedKeys,
    CommandGetPrimaryKeys,
};

/// `{catalog?, dbSchema?, table}` as spec.md §3 defines it.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TableRef {
    pub catalog: Option<String>,
    pub db_schema: Option<String>,
    pub table: String,
}

/// `{pk: TableRef, fk: TableRef}` as spec.md §3 defines it.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CrossTableRef {
    pub pk: TableRef,
    pub fk: TableRef,
}

impl From<CommandGetPrimaryKeys> for TableRef {
    fn from(cmd: CommandGetPrimaryKeys) -> Self {
        TableRef {
            catalog: cmd.catalog,
            db_schema: cmd.db_schema,
            table: cmd.table,
        }
    }
}

impl From<CommandGetExportedKeys> for TableRef {
    fn from(cmd: CommandGetExportedKeys) -> Self {
        TableRef {
            catalog: cmd.catalog,
            db_schema: cmd.db_schema,
            table: cmd.table,
        }
    }
}

impl From<CommandGetImportedKeys> for TableRef {
    fn from(cmd: CommandGetImportedKeys) -> Self {
        TableRef {
            catalog: cmd.catalog,
            db_schema: cmd.db_schema,
            table: cmd.table,
        }
    }
}

impl From<CommandGetCrossReference> for CrossTableRef {
    fn from(cmd: CommandGetCrossReference) -> Self {
        CrossTableRef {
            pk: TableRef {
                catalog: cmd.pk_catalog,
                db_schema: cmd.pk_db_schema,
                table: cmd.pk_table,
            },
            fk: TableRef {
                catalog: cmd.fk_catalog,
                db_schema: cmd.fk_db_schema,
                table: cmd.fk_table,
            },
        }
    }
}

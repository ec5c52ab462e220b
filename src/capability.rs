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

//! Capability Registry (spec component C) — a thread-safe map from
//! capability id to a typed value, and the dense-union record builder used
//! to answer `GetSqlInfo` queries.

use std::collections::HashMap;
use std::sync::Arc;

use arrow::array::{
    Array, ArrayRef, BooleanBuilder, Int32Builder, Int64Builder, ListBuilder, MapBuilder,
    StringBuilder, UInt32Array, UnionArray,
};
use arrow::datatypes::{DataType, Field, Fields, Schema, SchemaRef, UnionFields, UnionMode};
use arrow::record_batch::RecordBatch;
use dashmap::DashMap;

use crate::errors::FlightSqlError;

/// The six shapes a capability value may take (spec.md §3). The type-code
/// assignment below is part of the wire contract (spec.md §4.C) and must
/// never change once clients depend on it.
#[derive(Debug, Clone, PartialEq)]
pub enum CapabilityValue {
    String(String),
    Bool(bool),
    Int64(i64),
    Int32(i32),
    StringList(Vec<String>),
    Int32ToInt32ListMap(HashMap<i32, Vec<i32>>),
}

impl CapabilityValue {
    const TYPE_CODE_STRING: i8 = 0;
    const TYPE_CODE_BOOL: i8 = 1;
    const TYPE_CODE_INT64: i8 = 2;
    const TYPE_CODE_INT32: i8 = 3;
    const TYPE_CODE_STRING_LIST: i8 = 4;
    const TYPE_CODE_MAP: i8 = 5;

    fn type_code(&self) -> i8 {
        match self {
            CapabilityValue::String(_) => Self::TYPE_CODE_STRING,
            CapabilityValue::Bool(_) => Self::TYPE_CODE_BOOL,
            CapabilityValue::Int64(_) => Self::TYPE_CODE_INT64,
            CapabilityValue::Int32(_) => Self::TYPE_CODE_INT32,
            CapabilityValue::StringList(_) => Self::TYPE_CODE_STRING_LIST,
            CapabilityValue::Int32ToInt32ListMap(_) => Self::TYPE_CODE_MAP,
        }
    }
}

/// Thread-safe id -> value map. Backed by [`DashMap`] so concurrent readers
/// are never blocked behind each other, matching spec.md §5's requirement
/// for implementations that allow registration after server startup.
#[derive(Debug, Default)]
pub struct CapabilityRegistry {
    values: DashMap<u32, CapabilityValue>,
}

impl CapabilityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers (or overwrites) the value for `id`. The six permitted
    /// shapes are enforced by `CapabilityValue`'s own type, so this never
    /// actually rejects anything at the type level — it exists as the one
    /// place future non-enum callers (e.g. an FFI boundary) would validate
    /// shape before constructing a `CapabilityValue`.
    pub fn register(&self, id: u32, value: CapabilityValue) {
        self.values.insert(id, value);
    }

    pub fn size(&self) -> usize {
        self.values.len()
    }

    /// Builds the two-column `{info_name: uint32, value: dense_union<...>}`
    /// record for the requested ids, in order. Fails with `NotFound` naming
    /// the first unregistered id encountered.
    pub fn build_record(&self, ids: &[u32]) -> Result<RecordBatch, FlightSqlError> {
        let mut type_ids: Vec<i8> = Vec::with_capacity(ids.len());
        let mut offsets: Vec<i32> = Vec::with_capacity(ids.len());

        let mut string_values = StringBuilder::new();
        let mut bool_values = BooleanBuilder::new();
        let mut int64_values = Int64Builder::new();
        let mut int32_values = Int32Builder::new();
        let mut string_list_values = ListBuilder::new(StringBuilder::new());
        let mut map_values =
            MapBuilder::new(None, Int32Builder::new(), ListBuilder::new(Int32Builder::new()));

        for &id in ids {
            let value = self
                .values
                .get(&id)
                .ok_or_else(|| {
                    FlightSqlError::NotFound(format!("no information for sql info number {id}"))
                })?;
            type_ids.push(value.type_code());
            match &*value {
                CapabilityValue::String(s) => {
                    offsets.push(string_values.len() as i32);
                    string_values.append_value(s);
                }
                CapabilityValue::Bool(b) => {
                    offsets.push(bool_values.len() as i32);
                    bool_values.append_value(*b);
                }
                CapabilityValue::Int64(n) => {
                    offsets.push(int64_values.len() as i32);
                    int64_values.append_value(*n);
                }
                CapabilityValue::Int32(n) => {
                    offsets.push(int32_values.len() as i32);
                    int32_values.append_value(*n);
                }
                CapabilityValue::StringList(items) => {
                    offsets.push(string_list_values.len() as i32);
                    string_list_values.append_value(items.iter().map(Some));
                }
                CapabilityValue::Int32ToInt32ListMap(map) => {
                    offsets.push(map_values.len() as i32);
                    for (k, vs) in map {
                        map_values.keys().append_value(*k);
                        map_values.values().append_value(vs.iter().map(|v| Some(*v)));
                    }
                    map_values
                        .append(true)
                        .map_err(|e| FlightSqlError::Internal(format!("building sql info map: {e}")))?;
                }
            }
        }

        let string_array: ArrayRef = Arc::new(string_values.finish());
        let bool_array: ArrayRef = Arc::new(bool_values.finish());
        let int64_array: ArrayRef = Arc::new(int64_values.finish());
        let int32_array: ArrayRef = Arc::new(int32_values.finish());
        let string_list_array: ArrayRef = Arc::new(string_list_values.finish());
        let map_array: ArrayRef = Arc::new(map_values.finish());

        let fields = sql_info_union_fields();

        let union = UnionArray::try_new(
            fields.clone(),
            type_ids.into(),
            Some(offsets.into()),
            vec![
                string_array,
                bool_array,
                int64_array,
                int32_array,
                string_list_array,
                map_array,
            ],
        )
        .map_err(|e| FlightSqlError::Internal(format!("building sql info union array: {e}")))?;

        let schema = capability_record_schema(fields);
        RecordBatch::try_new(
            schema,
            vec![
                Arc::new(UInt32Array::from(ids.to_vec())),
                Arc::new(union),
            ],
        )
        .map_err(|e| FlightSqlError::Internal(format!("building sql info record batch: {e}")))
    }
}

/// The six-shape dense-union field set from spec.md §4.C, fixed and
/// independent of any registered value — building it needs nothing but
/// empty builders to read off the list/map child types, not a populated
/// record. Shared by [`CapabilityRegistry::build_record`] and
/// [`sql_info_schema`] so both always agree on the exact same `DataType::Union`.
fn sql_info_union_fields() -> UnionFields {
    let string_list_type = ListBuilder::new(StringBuilder::new())
        .finish()
        .data_type()
        .clone();
    let map_type = MapBuilder::new(None, Int32Builder::new(), ListBuilder::new(Int32Builder::new()))
        .finish()
        .data_type()
        .clone();
    UnionFields::new(
        vec![
            CapabilityValue::TYPE_CODE_STRING,
            CapabilityValue::TYPE_CODE_BOOL,
            CapabilityValue::TYPE_CODE_INT64,
            CapabilityValue::TYPE_CODE_INT32,
            CapabilityValue::TYPE_CODE_STRING_LIST,
            CapabilityValue::TYPE_CODE_MAP,
        ],
        vec![
            Arc::new(Field::new("string_value", DataType::Utf8, false)),
            Arc::new(Field::new("bool_value", DataType::Boolean, false)),
            Arc::new(Field::new("bigint_value", DataType::Int64, false)),
            Arc::new(Field::new("int_value", DataType::Int32, false)),
            Arc::new(Field::new("string_list", string_list_type, false)),
            Arc::new(Field::new("int32_to_int32_list_map", map_type, false)),
        ],
    )
}

/// The wire-observable schema from spec.md §6, parameterized over the
/// `UnionFields` so callers constructing an empty registry's schema (e.g.
/// to build a `FlightInfo` before any rows exist) get the exact same
/// `DataType::Union` shape the record itself will carry.
pub fn capability_record_schema(fields: UnionFields) -> SchemaRef {
    Arc::new(Schema::new(Fields::from(vec![
        Field::new("info_name", DataType::UInt32, false),
        Field::new("value", DataType::Union(fields, UnionMode::Dense), false),
    ])))
}

/// The fixed `GetSqlInfo` record schema, built without materializing any
/// record. `GetFlightInfo{GetSqlInfo}` needs only this to build its
/// `FlightInfo` locator — the ids are not validated against the registry
/// until `DoGet` actually streams the rows (spec.md §8 boundary cases).
pub fn sql_info_schema() -> SchemaRef {
    capability_record_schema(sql_info_union_fields())
}

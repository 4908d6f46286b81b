//! Tuple representation and serialization.
//!
//! Tuple format:
//! `| fixed-size value or varlen offset, per column | varlen payloads |`
//!
//! Each column either holds its value inline at the schema-declared offset,
//! or holds a `u32` offset to its payload in the trailing area (with
//! `VARLEN_NULL` standing in for a null value). The page layer never looks
//! inside: it sees the payload as an opaque byte run plus a length.

use crate::schema::Schema;
use crate::value::{Value, VARLEN_NULL};
use bytes::{BufMut, Bytes, BytesMut};
use loam_common::rid::Rid;

/// An in-memory record.
///
/// The payload is immutable once built, so clones share it; the rid is set
/// when the tuple is read from a page or after a successful insert.
#[derive(Debug, Clone)]
pub struct Tuple {
    /// Location of this tuple, if it came from (or went into) a page.
    rid: Option<Rid>,
    /// Payload bytes. Never includes the standalone form's length prefix.
    data: Bytes,
}

impl Tuple {
    /// Creates a tuple from raw payload bytes.
    pub fn new(data: impl Into<Bytes>) -> Self {
        Self {
            rid: None,
            data: data.into(),
        }
    }

    /// Builds a tuple from column values and their schema.
    ///
    /// Fixed-size values land at their column offsets; variable-length
    /// values get a `u32` pointer there and their payload appended to the
    /// trailing area. Null variable-length columns store only the
    /// `VARLEN_NULL` marker.
    pub fn from_values(values: &[Value], schema: &Schema) -> Self {
        assert_eq!(
            values.len(),
            schema.column_count(),
            "value count does not match schema"
        );

        let mut size = schema.length() as usize;
        for &idx in schema.uninlined_columns() {
            if !values[idx].is_null() {
                size += values[idx].serialized_length();
            }
        }

        let mut data = vec![0u8; size];
        let mut offset = schema.length() as usize;
        for (idx, value) in values.iter().enumerate() {
            let column = schema.column(idx);
            let col_offset = column.offset() as usize;
            if column.is_inlined() {
                value.serialize_into(&mut data[col_offset..]);
            } else if value.is_null() {
                data[col_offset..col_offset + 4].copy_from_slice(&VARLEN_NULL.to_le_bytes());
            } else {
                data[col_offset..col_offset + 4]
                    .copy_from_slice(&(offset as u32).to_le_bytes());
                value.serialize_into(&mut data[offset..]);
                offset += value.serialized_length();
            }
        }

        Self {
            rid: None,
            data: Bytes::from(data),
        }
    }

    /// Creates a tuple by copying a payload out of a page buffer.
    ///
    /// The in-page form has no framing; the slot directory carries the
    /// length, so the caller passes the exact payload slice.
    pub fn from_payload(payload: &[u8]) -> Self {
        Self {
            rid: None,
            data: Bytes::copy_from_slice(payload),
        }
    }

    /// Returns the payload bytes.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Returns a shared handle on the payload, for log images.
    pub fn payload(&self) -> Bytes {
        self.data.clone()
    }

    /// Returns the payload length in bytes.
    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// Returns true if this tuple carries a payload.
    pub fn is_allocated(&self) -> bool {
        !self.data.is_empty()
    }

    /// Returns the tuple's rid, if it has one.
    pub fn rid(&self) -> Option<Rid> {
        self.rid
    }

    /// Sets the tuple's rid.
    pub fn set_rid(&mut self, rid: Rid) {
        self.rid = Some(rid);
    }

    /// Reads the value of one column back out of the payload.
    pub fn value(&self, schema: &Schema, column_idx: usize) -> Value {
        let column = schema.column(column_idx);
        let col_offset = column.offset() as usize;

        if column.is_inlined() {
            return Value::deserialize_from(&self.data[col_offset..], column.type_id());
        }

        let payload_offset = u32::from_le_bytes([
            self.data[col_offset],
            self.data[col_offset + 1],
            self.data[col_offset + 2],
            self.data[col_offset + 3],
        ]);
        if payload_offset == VARLEN_NULL {
            return Value::Null;
        }
        Value::deserialize_from(&self.data[payload_offset as usize..], column.type_id())
    }

    /// Returns true if the column's value is null.
    pub fn is_null(&self, schema: &Schema, column_idx: usize) -> bool {
        self.value(schema, column_idx).is_null()
    }

    /// Projects the key columns of this tuple into a new tuple.
    ///
    /// `key_attrs` names the columns of `schema` that constitute
    /// `key_schema`, in key order.
    pub fn key_from_tuple(
        &self,
        schema: &Schema,
        key_schema: &Schema,
        key_attrs: &[usize],
    ) -> Tuple {
        let values: Vec<Value> = key_attrs
            .iter()
            .map(|&idx| self.value(schema, idx))
            .collect();
        Tuple::from_values(&values, key_schema)
    }

    /// Serializes the tuple standalone: `u32 size || payload`.
    pub fn serialize(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(4 + self.data.len());
        buf.put_u32_le(self.data.len() as u32);
        buf.put_slice(&self.data);
        buf.freeze()
    }

    /// Deserializes a standalone-form tuple.
    pub fn deserialize(buf: &[u8]) -> Option<Self> {
        if buf.len() < 4 {
            return None;
        }
        let size = u32::from_le_bytes([buf[0], buf[1], buf[2], buf[3]]) as usize;
        if buf.len() < 4 + size {
            return None;
        }
        Some(Self::from_payload(&buf[4..4 + size]))
    }
}

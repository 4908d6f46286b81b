//! Column layouts driving tuple construction.

use loam_common::TypeId;

/// A single column in a schema.
///
/// The offset locates the column inside a tuple's fixed region: the value
/// itself for fixed-size types, or a `u32` pointer into the trailing
/// variable-length area otherwise.
#[derive(Debug, Clone)]
pub struct Column {
    name: String,
    type_id: TypeId,
    offset: u32,
}

impl Column {
    /// Creates a column; its offset is assigned by `Schema::new`.
    pub fn new(name: impl Into<String>, type_id: TypeId) -> Self {
        Self {
            name: name.into(),
            type_id,
            offset: 0,
        }
    }

    /// Returns the column name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the column type.
    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    /// Returns the column's offset in the tuple's fixed region.
    pub fn offset(&self) -> u32 {
        self.offset
    }

    /// Returns true if the value is stored inline in the fixed region.
    pub fn is_inlined(&self) -> bool {
        self.type_id.is_fixed_size()
    }
}

/// Column layout of a table.
///
/// Fixed-size columns occupy their declared width in the fixed region;
/// variable-length columns occupy 4 bytes there (a payload pointer) with
/// their payloads appended after the fixed region.
#[derive(Debug, Clone)]
pub struct Schema {
    columns: Vec<Column>,
    /// Byte length of the fixed region.
    length: u32,
    /// Indices of the variable-length columns.
    uninlined: Vec<usize>,
}

impl Schema {
    /// Builds a schema, assigning each column its fixed-region offset.
    pub fn new(mut columns: Vec<Column>) -> Self {
        let mut offset = 0u32;
        let mut uninlined = Vec::new();

        for (idx, column) in columns.iter_mut().enumerate() {
            column.offset = offset;
            match column.type_id.fixed_size() {
                Some(size) => offset += size as u32,
                None => {
                    // Pointer into the trailing payload area
                    offset += 4;
                    uninlined.push(idx);
                }
            }
        }

        Self {
            columns,
            length: offset,
            uninlined,
        }
    }

    /// Returns the column at the given index.
    pub fn column(&self, idx: usize) -> &Column {
        &self.columns[idx]
    }

    /// Returns the number of columns.
    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// Returns the byte length of the fixed region.
    pub fn length(&self) -> u32 {
        self.length
    }

    /// Returns the indices of the variable-length columns.
    pub fn uninlined_columns(&self) -> &[usize] {
        &self.uninlined
    }
}

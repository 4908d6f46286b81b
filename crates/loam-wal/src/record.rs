//! WAL log record format.

use bytes::{Buf, BufMut, Bytes, BytesMut};
use loam_common::page::{PageId, PAGE_SIZE};
use loam_common::rid::Rid;
use loam_common::{LoamError, Result};
use serde::{Deserialize, Serialize};

/// Log Sequence Number - unique identifier for each log record.
///
/// LSNs are assigned by the log manager in strictly increasing order and
/// fit the 4-byte slot reserved for them in every page header.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
pub struct Lsn(pub u32);

impl Lsn {
    /// Invalid/uninitialized LSN.
    pub const INVALID: Lsn = Lsn(0);

    /// First valid LSN.
    pub const FIRST: Lsn = Lsn(1);

    /// Returns true if this is a valid LSN.
    pub fn is_valid(&self) -> bool {
        self.0 > 0
    }
}

impl std::fmt::Display for Lsn {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Types of log records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum LogRecordKind {
    /// Transaction begin.
    Begin = 1,
    /// Transaction commit.
    Commit = 2,
    /// Transaction abort/rollback.
    Abort = 3,
    /// Tuple inserted into a page.
    Insert = 10,
    /// Tuple logically deleted (delete bit set).
    MarkDelete = 11,
    /// Tuple updated in place.
    Update = 12,
    /// Tuple physically deleted, slot freed.
    ApplyDelete = 13,
    /// Logical deletion rolled back (delete bit cleared).
    RollbackDelete = 14,
}

impl TryFrom<u8> for LogRecordKind {
    type Error = LoamError;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            1 => Ok(LogRecordKind::Begin),
            2 => Ok(LogRecordKind::Commit),
            3 => Ok(LogRecordKind::Abort),
            10 => Ok(LogRecordKind::Insert),
            11 => Ok(LogRecordKind::MarkDelete),
            12 => Ok(LogRecordKind::Update),
            13 => Ok(LogRecordKind::ApplyDelete),
            14 => Ok(LogRecordKind::RollbackDelete),
            _ => Err(LoamError::WalCorrupted {
                offset: 0,
                reason: format!("invalid record kind: {}", value),
            }),
        }
    }
}

/// A single log record in the WAL.
///
/// Every record carries its transaction id, the previous LSN of that
/// transaction (forming the undo chain), and the rid it concerns. Insert
/// carries the new tuple image, ApplyDelete the deleted image, Update both;
/// MarkDelete and RollbackDelete carry only the rid.
///
/// Record format on disk:
/// - header (29 bytes):
///   - lsn: 4 bytes
///   - prev_lsn: 4 bytes
///   - txn_id: 4 bytes
///   - kind: 1 byte
///   - rid: 8 bytes (page_id: 4, slot_id: 4)
///   - old_image_len: 4 bytes
///   - new_image_len: 4 bytes
/// - old image, new image: variable length
/// - checksum: 4 bytes (CRC32 of header + images)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogRecord {
    /// LSN of this record, assigned on append.
    pub lsn: Lsn,
    /// LSN of the previous record in this transaction.
    pub prev_lsn: Lsn,
    /// Transaction ID.
    pub txn_id: u32,
    /// Kind of this record.
    pub kind: LogRecordKind,
    /// Record the operation concerns (invalid for transaction records).
    pub rid: Rid,
    /// Pre-image of the tuple, for undo.
    pub old_image: Option<Bytes>,
    /// Post-image of the tuple, for redo.
    pub new_image: Option<Bytes>,
}

impl LogRecord {
    /// Size of the record header in bytes.
    pub const HEADER_SIZE: usize = 29;
    /// Size of the checksum in bytes.
    pub const CHECKSUM_SIZE: usize = 4;
    /// Maximum image size: a tuple image never exceeds one page.
    pub const MAX_IMAGE_SIZE: usize = PAGE_SIZE;

    fn new(
        txn_id: u32,
        prev_lsn: Lsn,
        kind: LogRecordKind,
        rid: Rid,
        old_image: Option<Bytes>,
        new_image: Option<Bytes>,
    ) -> Self {
        Self {
            lsn: Lsn::INVALID,
            prev_lsn,
            txn_id,
            kind,
            rid,
            old_image,
            new_image,
        }
    }

    /// Creates a transaction begin record.
    pub fn begin(txn_id: u32) -> Self {
        Self::new(txn_id, Lsn::INVALID, LogRecordKind::Begin, Rid::INVALID, None, None)
    }

    /// Creates a transaction commit record.
    pub fn commit(txn_id: u32, prev_lsn: Lsn) -> Self {
        Self::new(txn_id, prev_lsn, LogRecordKind::Commit, Rid::INVALID, None, None)
    }

    /// Creates a transaction abort record.
    pub fn abort(txn_id: u32, prev_lsn: Lsn) -> Self {
        Self::new(txn_id, prev_lsn, LogRecordKind::Abort, Rid::INVALID, None, None)
    }

    /// Creates an insert record carrying the inserted tuple image.
    pub fn insert(txn_id: u32, prev_lsn: Lsn, rid: Rid, image: Bytes) -> Self {
        Self::new(txn_id, prev_lsn, LogRecordKind::Insert, rid, None, Some(image))
    }

    /// Creates a mark-delete record.
    pub fn mark_delete(txn_id: u32, prev_lsn: Lsn, rid: Rid) -> Self {
        Self::new(txn_id, prev_lsn, LogRecordKind::MarkDelete, rid, None, None)
    }

    /// Creates an update record carrying both tuple images.
    pub fn update(txn_id: u32, prev_lsn: Lsn, rid: Rid, old_image: Bytes, new_image: Bytes) -> Self {
        Self::new(
            txn_id,
            prev_lsn,
            LogRecordKind::Update,
            rid,
            Some(old_image),
            Some(new_image),
        )
    }

    /// Creates an apply-delete record carrying the deleted tuple image.
    pub fn apply_delete(txn_id: u32, prev_lsn: Lsn, rid: Rid, image: Bytes) -> Self {
        Self::new(
            txn_id,
            prev_lsn,
            LogRecordKind::ApplyDelete,
            rid,
            Some(image),
            None,
        )
    }

    /// Creates a rollback-delete record.
    pub fn rollback_delete(txn_id: u32, prev_lsn: Lsn, rid: Rid) -> Self {
        Self::new(txn_id, prev_lsn, LogRecordKind::RollbackDelete, rid, None, None)
    }

    /// Returns the total size of this record on disk.
    pub fn size_on_disk(&self) -> usize {
        Self::HEADER_SIZE
            + self.old_image.as_ref().map_or(0, |b| b.len())
            + self.new_image.as_ref().map_or(0, |b| b.len())
            + Self::CHECKSUM_SIZE
    }

    /// Serializes this record to bytes.
    pub fn serialize(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(self.size_on_disk());

        buf.put_u32_le(self.lsn.0);
        buf.put_u32_le(self.prev_lsn.0);
        buf.put_u32_le(self.txn_id);
        buf.put_u8(self.kind as u8);
        buf.put_u32_le(self.rid.page_id.0);
        buf.put_u32_le(self.rid.slot_id);
        buf.put_u32_le(self.old_image.as_ref().map_or(0, |b| b.len()) as u32);
        buf.put_u32_le(self.new_image.as_ref().map_or(0, |b| b.len()) as u32);

        if let Some(ref old) = self.old_image {
            buf.put_slice(old);
        }
        if let Some(ref new) = self.new_image {
            buf.put_slice(new);
        }

        let checksum = crc32fast::hash(&buf);
        buf.put_u32_le(checksum);

        buf.freeze()
    }

    /// Deserializes a record from the front of a buffer.
    ///
    /// Trailing bytes are ignored; use `size_on_disk` on the result to
    /// advance through a stream of records.
    pub fn deserialize(data: &[u8]) -> Result<Self> {
        if data.len() < Self::HEADER_SIZE + Self::CHECKSUM_SIZE {
            return Err(LoamError::WalCorrupted {
                offset: 0,
                reason: "record too short".to_string(),
            });
        }

        let mut cursor = data;
        let lsn = Lsn(cursor.get_u32_le());
        let prev_lsn = Lsn(cursor.get_u32_le());
        let txn_id = cursor.get_u32_le();
        let kind = LogRecordKind::try_from(cursor.get_u8())?;
        let rid = Rid::new(PageId(cursor.get_u32_le()), cursor.get_u32_le());
        let old_len = cursor.get_u32_le() as usize;
        let new_len = cursor.get_u32_le() as usize;

        if old_len > Self::MAX_IMAGE_SIZE || new_len > Self::MAX_IMAGE_SIZE {
            return Err(LoamError::WalCorrupted {
                offset: 0,
                reason: format!("image too large: {}/{}", old_len, new_len),
            });
        }

        if cursor.len() < old_len + new_len + Self::CHECKSUM_SIZE {
            return Err(LoamError::WalCorrupted {
                offset: 0,
                reason: "truncated record".to_string(),
            });
        }

        let old_image = if old_len > 0 {
            let image = Bytes::copy_from_slice(&cursor[..old_len]);
            cursor.advance(old_len);
            Some(image)
        } else {
            None
        };

        let new_image = if new_len > 0 {
            let image = Bytes::copy_from_slice(&cursor[..new_len]);
            cursor.advance(new_len);
            Some(image)
        } else {
            None
        };

        let stored_checksum = cursor.get_u32_le();
        let body_len = Self::HEADER_SIZE + old_len + new_len;
        let computed_checksum = crc32fast::hash(&data[..body_len]);

        if stored_checksum != computed_checksum {
            return Err(LoamError::WalCorrupted {
                offset: 0,
                reason: format!(
                    "checksum mismatch: stored={}, computed={}",
                    stored_checksum, computed_checksum
                ),
            });
        }

        Ok(Self {
            lsn,
            prev_lsn,
            txn_id,
            kind,
            rid,
            old_image,
            new_image,
        })
    }
}

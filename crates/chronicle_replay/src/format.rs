//! # Log File Format
//!
//! One file per recording, `<dir>/<name>.aarlog`. No header; the first entry
//! starts at offset 0.
//!
//! ```text
//! Entry (repeated):
//! [8 bytes: timestamp, simulation microseconds]
//! [4 bytes: payload length]
//! [N bytes: encoded message]
//!
//! Index section (written once, when recording stops):
//! [2 bytes: index version]
//! [8 bytes: record start us] [8 bytes: record end us]
//! [baseline snapshot]
//! [4 bytes: keyframe count]  { name, description, ts us, offset, snapshot }
//! [4 bytes: tag count]       { name, description, ts us, [keyframe ts us] }
//! [4 bytes: CRC32 of the index section]
//!
//! Footer:
//! [8 bytes: index offset]
//! [4 bytes: magic "AARX"]
//! ```
//!
//! Snapshots are `[4 bytes: count]` followed by
//! `{ actor id, ownership, category, type, name, properties }`.
//! All integers are little endian.

use chronicle_core::message::codec::{PayloadReader, PayloadWriter};
use chronicle_core::{ActorSnapshot, ActorType, CodecError, CodecResult, Ownership};

use crate::error::{ReplayError, ReplayResult};

/// File extension of recordings.
pub const LOG_EXTENSION: &str = "aarlog";

/// Magic closing every completed recording.
pub const FOOTER_MAGIC: &[u8; 4] = b"AARX";

/// Footer size in bytes.
pub const FOOTER_LEN: u64 = 12;

/// Entry header size in bytes.
pub const ENTRY_HEADER_LEN: u64 = 12;

/// Largest payload a reader accepts. Anything bigger is corruption.
pub const MAX_ENTRY_LEN: u32 = 16 * 1024 * 1024;

/// Current index section version.
pub const INDEX_VERSION: u16 = 1;

/// Seconds to whole microseconds. Negative times clamp to zero.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
#[must_use]
pub fn to_micros(seconds: f64) -> u64 {
    (seconds.max(0.0) * 1_000_000.0).round() as u64
}

/// Microseconds to seconds.
#[allow(clippy::cast_precision_loss)]
#[must_use]
pub fn from_micros(micros: u64) -> f64 {
    micros as f64 / 1_000_000.0
}

// =============================================================================
// Records
// =============================================================================

/// One recorded message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LogEntry {
    /// Simulation time of recording, microseconds.
    pub timestamp_micros: u64,
    /// Encoded message.
    pub payload: Vec<u8>,
}

/// A full world snapshot at a point in the stream.
#[derive(Clone, Debug, PartialEq)]
pub struct Keyframe {
    /// Unique name.
    pub name: String,
    /// Free text.
    pub description: String,
    /// Simulation time, microseconds.
    pub timestamp_micros: u64,
    /// Byte offset of the first entry after the keyframe.
    pub offset: u64,
    /// Actor state at capture.
    pub snapshot: Vec<ActorSnapshot>,
}

impl Keyframe {
    /// Simulation time in seconds.
    #[must_use]
    pub fn timestamp(&self) -> f64 {
        from_micros(self.timestamp_micros)
    }
}

/// A named bookmark.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Tag {
    /// Name, unique within a log.
    pub name: String,
    /// Free text.
    pub description: String,
    /// Simulation time, microseconds.
    pub timestamp_micros: u64,
    /// Timestamp of the keyframe at or before the tag, if one existed.
    pub keyframe_micros: Option<u64>,
}

/// Everything stored after the entries.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct LogIndex {
    /// Simulation time recording started, microseconds.
    pub record_start_micros: u64,
    /// Simulation time recording stopped, microseconds.
    pub record_end_micros: u64,
    /// World state when recording started.
    pub baseline: Vec<ActorSnapshot>,
    /// Keyframes in timestamp order.
    pub keyframes: Vec<Keyframe>,
    /// Tags in insertion order.
    pub tags: Vec<Tag>,
}

impl LogIndex {
    /// Encodes the index section, CRC included.
    ///
    /// # Errors
    ///
    /// Returns `Codec` if a string or list is oversized.
    pub fn encode(&self) -> ReplayResult<Vec<u8>> {
        let mut w = PayloadWriter::with_capacity(256);
        w.put_u16(INDEX_VERSION);
        w.put_u64(self.record_start_micros);
        w.put_u64(self.record_end_micros);
        put_snapshots(&mut w, &self.baseline)?;

        w.put_u32(count_u32("keyframe list", self.keyframes.len())?);
        for kf in &self.keyframes {
            w.put_short_str("keyframe name", &kf.name)?;
            w.put_short_str("keyframe description", &kf.description)?;
            w.put_u64(kf.timestamp_micros);
            w.put_u64(kf.offset);
            put_snapshots(&mut w, &kf.snapshot)?;
        }

        w.put_u32(count_u32("tag list", self.tags.len())?);
        for tag in &self.tags {
            w.put_short_str("tag name", &tag.name)?;
            w.put_short_str("tag description", &tag.description)?;
            w.put_u64(tag.timestamp_micros);
            match tag.keyframe_micros {
                Some(ts) => {
                    w.put_u8(1);
                    w.put_u64(ts);
                }
                None => w.put_u8(0),
            }
        }

        let mut bytes = w.into_inner();
        let crc = crc32fast::hash(&bytes);
        bytes.extend_from_slice(&crc.to_le_bytes());
        Ok(bytes)
    }

    /// Decodes an index section read from `offset`.
    ///
    /// # Errors
    ///
    /// Returns `LogCorruption` on a CRC mismatch, version mismatch or
    /// malformed content.
    pub fn decode(bytes: &[u8], offset: u64) -> ReplayResult<Self> {
        if bytes.len() < 4 {
            return Err(ReplayError::corrupt(offset, "index section too short"));
        }
        let (body, crc_bytes) = bytes.split_at(bytes.len() - 4);
        let stored = u32::from_le_bytes([crc_bytes[0], crc_bytes[1], crc_bytes[2], crc_bytes[3]]);
        let computed = crc32fast::hash(body);
        if stored != computed {
            return Err(ReplayError::corrupt(
                offset,
                format!("index CRC mismatch: expected {stored:08x}, got {computed:08x}"),
            ));
        }

        let corrupt = |e: CodecError| ReplayError::corrupt(offset, e.to_string());
        let mut r = PayloadReader::new(body);

        let version = r.u16().map_err(corrupt)?;
        if version != INDEX_VERSION {
            return Err(ReplayError::corrupt(
                offset,
                format!("unsupported index version {version}"),
            ));
        }
        let record_start_micros = r.u64().map_err(corrupt)?;
        let record_end_micros = r.u64().map_err(corrupt)?;
        let baseline = read_snapshots(&mut r, offset)?;

        let kf_count = r.u32().map_err(corrupt)?;
        let mut keyframes = Vec::new();
        for _ in 0..kf_count {
            keyframes.push(Keyframe {
                name: r.short_str("keyframe name").map_err(corrupt)?,
                description: r.short_str("keyframe description").map_err(corrupt)?,
                timestamp_micros: r.u64().map_err(corrupt)?,
                offset: r.u64().map_err(corrupt)?,
                snapshot: read_snapshots(&mut r, offset)?,
            });
        }

        let tag_count = r.u32().map_err(corrupt)?;
        let mut tags = Vec::new();
        for _ in 0..tag_count {
            let name = r.short_str("tag name").map_err(corrupt)?;
            let description = r.short_str("tag description").map_err(corrupt)?;
            let timestamp_micros = r.u64().map_err(corrupt)?;
            let keyframe_micros = match r.u8().map_err(corrupt)? {
                0 => None,
                _ => Some(r.u64().map_err(corrupt)?),
            };
            tags.push(Tag {
                name,
                description,
                timestamp_micros,
                keyframe_micros,
            });
        }

        if r.remaining() != 0 {
            return Err(ReplayError::corrupt(
                offset,
                format!("{} trailing bytes in index", r.remaining()),
            ));
        }

        Ok(Self {
            record_start_micros,
            record_end_micros,
            baseline,
            keyframes,
            tags,
        })
    }
}

// =============================================================================
// Fixed-size pieces
// =============================================================================

/// Encodes an entry header.
#[must_use]
pub fn entry_header(timestamp_micros: u64, len: u32) -> [u8; 12] {
    let mut header = [0u8; 12];
    header[..8].copy_from_slice(&timestamp_micros.to_le_bytes());
    header[8..].copy_from_slice(&len.to_le_bytes());
    header
}

/// Decodes an entry header into `(timestamp_micros, len)`.
#[must_use]
pub fn parse_entry_header(header: &[u8; 12]) -> (u64, u32) {
    let mut ts = [0u8; 8];
    ts.copy_from_slice(&header[..8]);
    let mut len = [0u8; 4];
    len.copy_from_slice(&header[8..]);
    (u64::from_le_bytes(ts), u32::from_le_bytes(len))
}

/// Encodes the footer.
#[must_use]
pub fn footer(index_offset: u64) -> [u8; 12] {
    let mut out = [0u8; 12];
    out[..8].copy_from_slice(&index_offset.to_le_bytes());
    out[8..].copy_from_slice(FOOTER_MAGIC);
    out
}

/// Decodes a footer. `None` if the magic does not match.
#[must_use]
pub fn parse_footer(bytes: &[u8; 12]) -> Option<u64> {
    if &bytes[8..] != FOOTER_MAGIC {
        return None;
    }
    let mut offset = [0u8; 8];
    offset.copy_from_slice(&bytes[..8]);
    Some(u64::from_le_bytes(offset))
}

// =============================================================================
// Snapshots
// =============================================================================

/// Writes a counted snapshot list.
///
/// # Errors
///
/// Returns `TooLong` for oversized names, properties or list.
pub fn put_snapshots(w: &mut PayloadWriter, snapshots: &[ActorSnapshot]) -> CodecResult<()> {
    w.put_u32(count_u32("snapshot", snapshots.len())?);
    for snap in snapshots {
        w.put_actor_id(snap.id);
        w.put_u8(snap.ownership as u8);
        w.put_short_str("actor category", &snap.actor_type.category)?;
        w.put_short_str("actor type", &snap.actor_type.name)?;
        w.put_short_str("actor name", &snap.name)?;
        w.put_properties(&snap.properties)?;
    }
    Ok(())
}

/// Reads a counted snapshot list.
///
/// # Errors
///
/// Returns `LogCorruption` (reporting `offset`) on malformed input.
pub fn read_snapshots(r: &mut PayloadReader<'_>, offset: u64) -> ReplayResult<Vec<ActorSnapshot>> {
    let corrupt = |e: CodecError| ReplayError::corrupt(offset, e.to_string());
    let count = r.u32().map_err(corrupt)?;
    let mut snapshots = Vec::new();
    for _ in 0..count {
        let id = r.actor_id().map_err(corrupt)?;
        let raw = r.u8().map_err(corrupt)?;
        let ownership = Ownership::from_u8(raw)
            .ok_or_else(|| ReplayError::corrupt(offset, format!("unknown ownership {raw}")))?;
        let category = r.short_str("actor category").map_err(corrupt)?;
        let type_name = r.short_str("actor type").map_err(corrupt)?;
        let name = r.short_str("actor name").map_err(corrupt)?;
        let properties = r.properties().map_err(corrupt)?;
        snapshots.push(ActorSnapshot {
            id,
            actor_type: ActorType::new(category, type_name),
            ownership,
            name,
            properties,
        });
    }
    Ok(snapshots)
}

fn count_u32(field: &'static str, len: usize) -> CodecResult<u32> {
    u32::try_from(len).map_err(|_| CodecError::TooLong { field, len })
}

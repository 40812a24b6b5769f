//! # Log Streams
//!
//! [`LogStreamWriter`] appends entries while recording and writes the index
//! and footer when closed. [`LogStreamReader`] reads entries back in order
//! and seeks to keyframe offsets.
//!
//! A log without a valid footer (the recorder died, or the tail was cut off)
//! is still readable: the reader scans entry headers from offset 0 and
//! stops at the last complete entry. Keyframes and tags are lost in that
//! case; the entries are not.

use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Read, Seek, SeekFrom, Write};
use std::path::Path;

use chronicle_core::ActorSnapshot;

use crate::catalog::log_path;
use crate::error::{ReplayError, ReplayResult};
use crate::format::{
    entry_header, footer, parse_entry_header, parse_footer, Keyframe, LogEntry, LogIndex, Tag,
    ENTRY_HEADER_LEN, FOOTER_LEN, MAX_ENTRY_LEN,
};
use crate::index::{KeyframeIndex, TagIndex};

/// Destination of a log stream.
pub trait LogSink: Write + Send {
    /// Pushes written bytes to durable storage.
    ///
    /// # Errors
    ///
    /// Propagates the underlying I/O failure.
    fn sync(&mut self) -> io::Result<()>;
}

impl LogSink for BufWriter<File> {
    fn sync(&mut self) -> io::Result<()> {
        self.flush()?;
        self.get_ref().sync_all()
    }
}

impl LogSink for Vec<u8> {
    fn sync(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl LogSink for Box<dyn LogSink> {
    fn sync(&mut self) -> io::Result<()> {
        (**self).sync()
    }
}

impl<S: LogSink + ?Sized> LogSink for &mut S {
    fn sync(&mut self) -> io::Result<()> {
        (**self).sync()
    }
}

// =============================================================================
// Writer
// =============================================================================

/// Appends entries to a log.
pub struct LogStreamWriter<W: LogSink> {
    sink: W,
    name: String,
    position: u64,
    entries: u64,
    record_start_micros: u64,
    last_micros: u64,
    baseline: Vec<ActorSnapshot>,
    keyframes: KeyframeIndex,
    tags: TagIndex,
}

/// Creates (or truncates) `<dir>/<name>.aarlog` for writing.
///
/// # Errors
///
/// `InvalidLogName`, or `LogWrite` if the file cannot be created.
pub fn create_log_file(dir: &Path, name: &str) -> ReplayResult<BufWriter<File>> {
    let path = log_path(dir, name)?;
    let file = fs::create_dir_all(dir)
        .and_then(|()| File::create(&path))
        .map_err(|source| ReplayError::LogWrite {
            log: name.to_owned(),
            source,
        })?;
    tracing::info!(log = %name, path = %path.display(), "Log file created");
    Ok(BufWriter::new(file))
}

impl LogStreamWriter<BufWriter<File>> {
    /// Creates (or truncates) `<dir>/<name>.aarlog`.
    ///
    /// # Errors
    ///
    /// `InvalidLogName`, or `LogWrite` if the file cannot be created.
    pub fn create(dir: &Path, name: &str) -> ReplayResult<Self> {
        Ok(Self::from_sink(create_log_file(dir, name)?, name))
    }
}

impl<W: LogSink> LogStreamWriter<W> {
    /// Wraps an arbitrary sink. Entries start at offset 0.
    pub fn from_sink(sink: W, name: &str) -> Self {
        Self {
            sink,
            name: name.to_owned(),
            position: 0,
            entries: 0,
            record_start_micros: 0,
            last_micros: 0,
            baseline: Vec::new(),
            keyframes: KeyframeIndex::new(),
            tags: TagIndex::new(),
        }
    }

    /// Log name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Byte offset the next entry will be written at.
    #[inline]
    #[must_use]
    pub const fn position(&self) -> u64 {
        self.position
    }

    /// Entries appended so far.
    #[inline]
    #[must_use]
    pub const fn entries(&self) -> u64 {
        self.entries
    }

    /// Keyframes captured so far.
    #[must_use]
    pub const fn keyframes(&self) -> &KeyframeIndex {
        &self.keyframes
    }

    /// Tags inserted so far.
    #[must_use]
    pub const fn tags(&self) -> &TagIndex {
        &self.tags
    }

    /// Sets when recording started and the world state at that moment.
    pub fn set_baseline(&mut self, record_start_micros: u64, baseline: Vec<ActorSnapshot>) {
        self.record_start_micros = record_start_micros;
        self.last_micros = self.last_micros.max(record_start_micros);
        self.baseline = baseline;
    }

    /// Appends one entry and returns its offset.
    ///
    /// # Errors
    ///
    /// `LogCorruption` for payloads over the entry limit, `LogWrite` if the
    /// sink fails.
    pub fn append(&mut self, timestamp_micros: u64, payload: &[u8]) -> ReplayResult<u64> {
        let len = u32::try_from(payload.len())
            .ok()
            .filter(|l| *l <= MAX_ENTRY_LEN)
            .ok_or_else(|| {
                ReplayError::corrupt(
                    self.position,
                    format!("entry of {} bytes exceeds limit", payload.len()),
                )
            })?;

        let offset = self.position;
        let header = entry_header(timestamp_micros, len);
        self.write(&header)?;
        self.write(payload)?;

        self.position += ENTRY_HEADER_LEN + u64::from(len);
        self.entries += 1;
        self.last_micros = self.last_micros.max(timestamp_micros);
        Ok(offset)
    }

    /// Adds a keyframe to the index.
    ///
    /// # Errors
    ///
    /// `DuplicateKeyframe` if one exists at the same timestamp.
    pub fn insert_keyframe(&mut self, keyframe: Keyframe) -> ReplayResult<()> {
        self.keyframes.insert(keyframe)?;
        Ok(())
    }

    /// Adds (or replaces) a tag.
    pub fn insert_tag(&mut self, tag: Tag) {
        if let Some(old) = self.tags.insert(tag) {
            tracing::debug!(tag = %old.name, "Tag replaced");
        }
    }

    /// Flushes buffered entries to the sink.
    ///
    /// # Errors
    ///
    /// `LogWrite` if the sink fails.
    pub fn flush(&mut self) -> ReplayResult<()> {
        let result = self.sink.flush();
        result.map_err(|source| self.write_error(source))
    }

    /// Writes the index and footer, syncs, and returns what was indexed.
    ///
    /// # Errors
    ///
    /// `LogWrite` if the sink fails, `Codec` if the index cannot be encoded.
    pub fn close(mut self, record_end_micros: u64) -> ReplayResult<LogIndex> {
        let index = LogIndex {
            record_start_micros: self.record_start_micros,
            record_end_micros: record_end_micros.max(self.last_micros),
            baseline: std::mem::take(&mut self.baseline),
            keyframes: std::mem::take(&mut self.keyframes).into_vec(),
            tags: std::mem::take(&mut self.tags).into_vec(),
        };
        let bytes = index.encode()?;
        let index_offset = self.position;
        self.write(&bytes)?;
        self.write(&footer(index_offset))?;
        let synced = self.sink.sync();
        synced.map_err(|source| self.write_error(source))?;

        tracing::info!(
            log = %self.name,
            entries = self.entries,
            keyframes = index.keyframes.len(),
            tags = index.tags.len(),
            bytes = index_offset + bytes.len() as u64 + FOOTER_LEN,
            "Log stream closed"
        );
        Ok(index)
    }

    fn write(&mut self, bytes: &[u8]) -> ReplayResult<()> {
        let result = self.sink.write_all(bytes);
        result.map_err(|source| self.write_error(source))
    }

    fn write_error(&self, source: io::Error) -> ReplayError {
        ReplayError::LogWrite {
            log: self.name.clone(),
            source,
        }
    }
}

// =============================================================================
// Reader
// =============================================================================

/// Reads entries from a log.
pub struct LogStreamReader<R: Read + Seek> {
    source: R,
    name: String,
    position: u64,
    data_end: u64,
    indexed: bool,
    record_start_micros: u64,
    record_end_micros: u64,
    baseline: Vec<ActorSnapshot>,
    keyframes: KeyframeIndex,
    tags: TagIndex,
}

impl LogStreamReader<BufReader<File>> {
    /// Opens `<dir>/<name>.aarlog`.
    ///
    /// # Errors
    ///
    /// `NotFound` if the log does not exist, `Io` if it cannot be read.
    pub fn open(dir: &Path, name: &str) -> ReplayResult<Self> {
        let path = log_path(dir, name)?;
        if !path.is_file() {
            return Err(ReplayError::not_found("log", name));
        }
        let file = File::open(&path)?;
        Self::from_source(BufReader::new(file), name)
    }
}

impl<R: Read + Seek> LogStreamReader<R> {
    /// Wraps an arbitrary source and loads its index, falling back to a
    /// sequential scan if the footer or index is damaged.
    ///
    /// # Errors
    ///
    /// `Io` if the source cannot be read at all.
    pub fn from_source(mut source: R, name: &str) -> ReplayResult<Self> {
        let len = source.seek(SeekFrom::End(0))?;
        let mut reader = Self {
            source,
            name: name.to_owned(),
            position: 0,
            data_end: len,
            indexed: false,
            record_start_micros: 0,
            record_end_micros: 0,
            baseline: Vec::new(),
            keyframes: KeyframeIndex::new(),
            tags: TagIndex::new(),
        };

        match reader.read_index(len) {
            Ok(Some((offset, index))) => {
                reader.data_end = offset;
                reader.indexed = true;
                reader.record_start_micros = index.record_start_micros;
                reader.record_end_micros = index.record_end_micros;
                reader.baseline = index.baseline;
                reader.keyframes = KeyframeIndex::from_vec(index.keyframes);
                reader.tags = TagIndex::from_vec(index.tags);
            }
            Ok(None) => {
                tracing::warn!(log = %name, "Log has no index footer, scanning entries");
                reader.scan(len)?;
            }
            Err(e) => {
                tracing::warn!(log = %name, error = %e, "Log index unreadable, scanning entries");
                reader.scan(len)?;
            }
        }

        reader.source.seek(SeekFrom::Start(0))?;
        tracing::info!(
            log = %name,
            indexed = reader.indexed,
            data_bytes = reader.data_end,
            keyframes = reader.keyframes.len(),
            tags = reader.tags.len(),
            "Log stream opened"
        );
        Ok(reader)
    }

    fn read_index(&mut self, len: u64) -> ReplayResult<Option<(u64, LogIndex)>> {
        if len < FOOTER_LEN {
            return Ok(None);
        }
        let footer_at = len - FOOTER_LEN;
        self.source.seek(SeekFrom::Start(footer_at))?;
        let mut raw = [0u8; 12];
        self.source.read_exact(&mut raw)?;
        let Some(index_offset) = parse_footer(&raw) else {
            return Ok(None);
        };
        if index_offset > footer_at {
            return Err(ReplayError::corrupt(
                footer_at,
                format!("index offset {index_offset} past footer"),
            ));
        }

        let index_len = usize::try_from(footer_at - index_offset)
            .map_err(|_| ReplayError::corrupt(index_offset, "index too large"))?;
        let mut bytes = vec![0u8; index_len];
        self.source.seek(SeekFrom::Start(index_offset))?;
        self.source.read_exact(&mut bytes)?;
        LogIndex::decode(&bytes, index_offset).map(|index| Some((index_offset, index)))
    }

    /// Walks entry headers from offset 0; the data ends after the last
    /// complete entry.
    fn scan(&mut self, len: u64) -> ReplayResult<()> {
        let mut pos = 0u64;
        let mut first = None;
        let mut last = 0u64;
        let mut count = 0u64;
        self.source.seek(SeekFrom::Start(0))?;

        while pos + ENTRY_HEADER_LEN <= len {
            let mut raw = [0u8; 12];
            self.source.read_exact(&mut raw)?;
            let (ts, entry_len) = parse_entry_header(&raw);
            let end = pos + ENTRY_HEADER_LEN + u64::from(entry_len);
            if entry_len > MAX_ENTRY_LEN || end > len {
                break;
            }
            self.source.seek(SeekFrom::Current(i64::from(entry_len)))?;
            first.get_or_insert(ts);
            last = last.max(ts);
            count += 1;
            pos = end;
        }

        if pos < len {
            tracing::warn!(
                log = %self.name,
                offset = pos,
                dropped_bytes = len - pos,
                "Log tail is incomplete"
            );
        }
        self.data_end = pos;
        self.record_start_micros = first.unwrap_or(0);
        self.record_end_micros = last;
        tracing::debug!(log = %self.name, entries = count, "Log scan complete");
        Ok(())
    }

    /// Reads the next entry; `Ok(None)` at end of data.
    ///
    /// # Errors
    ///
    /// `LogCorruption` if the entry is malformed or cut short.
    pub fn next_entry(&mut self) -> ReplayResult<Option<LogEntry>> {
        if self.position + ENTRY_HEADER_LEN > self.data_end {
            if self.position < self.data_end {
                return Err(ReplayError::corrupt(self.position, "partial entry header"));
            }
            return Ok(None);
        }

        let at = self.position;
        let mut raw = [0u8; 12];
        self.source
            .read_exact(&mut raw)
            .map_err(|e| ReplayError::corrupt(at, e.to_string()))?;
        let (timestamp_micros, len) = parse_entry_header(&raw);
        let end = at + ENTRY_HEADER_LEN + u64::from(len);
        if len > MAX_ENTRY_LEN || end > self.data_end {
            return Err(ReplayError::corrupt(
                at,
                format!("entry length {len} runs past end of data"),
            ));
        }

        let mut payload = vec![0u8; len as usize];
        self.source
            .read_exact(&mut payload)
            .map_err(|e| ReplayError::corrupt(at, e.to_string()))?;
        self.position = end;
        Ok(Some(LogEntry {
            timestamp_micros,
            payload,
        }))
    }

    /// Moves to an entry offset (as stored in a keyframe).
    ///
    /// # Errors
    ///
    /// `LogCorruption` if `offset` lies past the data.
    pub fn seek_to(&mut self, offset: u64) -> ReplayResult<()> {
        if offset > self.data_end {
            return Err(ReplayError::corrupt(
                offset,
                format!("seek past end of data ({})", self.data_end),
            ));
        }
        self.source.seek(SeekFrom::Start(offset))?;
        self.position = offset;
        Ok(())
    }

    /// Log name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Offset of the next entry.
    #[inline]
    #[must_use]
    pub const fn position(&self) -> u64 {
        self.position
    }

    /// End of the entry data.
    #[inline]
    #[must_use]
    pub const fn data_end(&self) -> u64 {
        self.data_end
    }

    /// Whether the index was loaded (false after a fallback scan).
    #[must_use]
    pub const fn is_indexed(&self) -> bool {
        self.indexed
    }

    /// Simulation time recording started, microseconds.
    #[must_use]
    pub const fn record_start_micros(&self) -> u64 {
        self.record_start_micros
    }

    /// Simulation time recording stopped, microseconds.
    #[must_use]
    pub const fn record_end_micros(&self) -> u64 {
        self.record_end_micros
    }

    /// World state when recording started.
    #[must_use]
    pub fn baseline(&self) -> &[ActorSnapshot] {
        &self.baseline
    }

    /// Keyframes.
    #[must_use]
    pub const fn keyframes(&self) -> &KeyframeIndex {
        &self.keyframes
    }

    /// Tags.
    #[must_use]
    pub const fn tags(&self) -> &TagIndex {
        &self.tags
    }
}

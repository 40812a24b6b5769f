//! # Payload Codec
//!
//! Binary form of a [`Message`], as stored in recordings.
//!
//! ## Format
//!
//! ```text
//! [2 bytes: message type id]
//! [1 byte: flags (bit0 source, bit1 about, bit2 destination)]
//! [16 bytes per present id, in flag order]
//! [8 bytes: simulation time (f64 bits)]
//! [8 bytes: real time micros]
//! [2 bytes: parameter count]
//! per parameter:
//!   [1 byte: value tag]
//!   [2 bytes: name length][N bytes: name]
//!   [value bytes - fixed width, or 4-byte length + bytes for String/Bytes]
//! ```
//!
//! All integers little endian. Encoding the result of a decode yields the
//! original bytes.

use crate::actor::ActorId;
use crate::error::{CodecError, CodecResult};
use crate::message::types::MessageTypeRegistry;
use crate::message::Message;
use crate::value::{ParamValue, PropertySet, ValueTag};

const FLAG_SOURCE: u8 = 0b001;
const FLAG_ABOUT: u8 = 0b010;
const FLAG_DESTINATION: u8 = 0b100;

/// Serializes a message.
///
/// # Errors
///
/// Returns `TooLong` if a name, string or the parameter list exceeds its
/// length prefix.
pub fn encode_message(message: &Message) -> CodecResult<Vec<u8>> {
    let mut out = PayloadWriter::with_capacity(64 + message.params.len() * 16);
    out.put_u16(message.message_type().id());

    let mut flags = 0u8;
    if message.source.is_some() {
        flags |= FLAG_SOURCE;
    }
    if message.about_actor.is_some() {
        flags |= FLAG_ABOUT;
    }
    if message.destination.is_some() {
        flags |= FLAG_DESTINATION;
    }
    out.put_u8(flags);
    for id in [message.source, message.about_actor, message.destination]
        .into_iter()
        .flatten()
    {
        out.put_actor_id(id);
    }

    out.put_f64(message.sim_time);
    out.put_u64(message.real_time_micros);
    out.put_properties(&message.params)?;
    Ok(out.into_inner())
}

/// Deserializes a message, resolving its type through `registry`.
///
/// # Errors
///
/// Fails on truncated input, unknown type ids or value tags, bad UTF-8, or
/// bytes left over after the parameter list.
pub fn decode_message(bytes: &[u8], registry: &MessageTypeRegistry) -> CodecResult<Message> {
    let mut input = PayloadReader::new(bytes);
    let type_id = input.u16()?;
    let msg_type = registry
        .by_id(type_id)
        .ok_or(CodecError::UnknownMessageType(type_id))?;

    let mut message = Message::new(msg_type);
    let flags = input.u8()?;
    if flags & FLAG_SOURCE != 0 {
        message.source = Some(input.actor_id()?);
    }
    if flags & FLAG_ABOUT != 0 {
        message.about_actor = Some(input.actor_id()?);
    }
    if flags & FLAG_DESTINATION != 0 {
        message.destination = Some(input.actor_id()?);
    }

    message.sim_time = input.f64()?;
    message.real_time_micros = input.u64()?;
    message.params = input.properties()?;

    if input.remaining() != 0 {
        return Err(CodecError::TrailingBytes(input.remaining()));
    }
    Ok(message)
}

// =============================================================================
// Primitive writer / reader
// =============================================================================

/// Little-endian byte sink shared by the message and snapshot encodings.
#[derive(Debug, Default)]
pub struct PayloadWriter {
    buf: Vec<u8>,
}

impl PayloadWriter {
    /// Creates an empty writer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a writer with reserved capacity.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: Vec::with_capacity(capacity),
        }
    }

    /// Returns the bytes written.
    #[must_use]
    pub fn into_inner(self) -> Vec<u8> {
        self.buf
    }

    /// Bytes written so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// Whether nothing was written.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Writes one byte.
    pub fn put_u8(&mut self, v: u8) {
        self.buf.push(v);
    }

    /// Writes a u16.
    pub fn put_u16(&mut self, v: u16) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    /// Writes a u32.
    pub fn put_u32(&mut self, v: u32) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    /// Writes a u64.
    pub fn put_u64(&mut self, v: u64) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    /// Writes an f64 by its bit pattern.
    pub fn put_f64(&mut self, v: f64) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    /// Writes an actor id.
    pub fn put_actor_id(&mut self, id: ActorId) {
        self.buf.extend_from_slice(&id.to_le_bytes());
    }

    /// Writes a string with a u16 length prefix.
    ///
    /// # Errors
    ///
    /// Returns `TooLong` past 65535 bytes.
    pub fn put_short_str(&mut self, field: &'static str, s: &str) -> CodecResult<()> {
        let len = u16::try_from(s.len()).map_err(|_| CodecError::TooLong {
            field,
            len: s.len(),
        })?;
        self.put_u16(len);
        self.buf.extend_from_slice(s.as_bytes());
        Ok(())
    }

    /// Writes bytes with a u32 length prefix.
    ///
    /// # Errors
    ///
    /// Returns `TooLong` past `u32::MAX` bytes.
    pub fn put_long_bytes(&mut self, field: &'static str, bytes: &[u8]) -> CodecResult<()> {
        let len = u32::try_from(bytes.len()).map_err(|_| CodecError::TooLong {
            field,
            len: bytes.len(),
        })?;
        self.put_u32(len);
        self.buf.extend_from_slice(bytes);
        Ok(())
    }

    /// Writes one tagged value.
    ///
    /// # Errors
    ///
    /// Returns `TooLong` for oversized strings or byte blobs.
    pub fn put_value(&mut self, value: &ParamValue) -> CodecResult<()> {
        match value {
            ParamValue::Bool(b) => self.put_u8(u8::from(*b)),
            ParamValue::Int32(v) => self.buf.extend_from_slice(&v.to_le_bytes()),
            ParamValue::Int64(v) => self.buf.extend_from_slice(&v.to_le_bytes()),
            ParamValue::Float(v) => self.buf.extend_from_slice(&v.to_le_bytes()),
            ParamValue::Double(v) => self.put_f64(*v),
            ParamValue::String(s) => self.put_long_bytes("string value", s.as_bytes())?,
            ParamValue::Vec3(v) => {
                for c in v {
                    self.buf.extend_from_slice(&c.to_le_bytes());
                }
            }
            ParamValue::ActorId(id) => self.put_actor_id(*id),
            ParamValue::Bytes(b) => self.put_long_bytes("bytes value", b)?,
        }
        Ok(())
    }

    /// Writes a counted, ordered property list.
    ///
    /// # Errors
    ///
    /// Returns `TooLong` if the list, a name or a value is oversized.
    pub fn put_properties(&mut self, props: &PropertySet) -> CodecResult<()> {
        let count = u16::try_from(props.len()).map_err(|_| CodecError::TooLong {
            field: "parameter list",
            len: props.len(),
        })?;
        self.put_u16(count);
        for (name, value) in props.iter() {
            self.put_u8(value.tag() as u8);
            self.put_short_str("parameter name", name)?;
            self.put_value(value)?;
        }
        Ok(())
    }
}

/// Cursor over little-endian bytes.
#[derive(Debug)]
pub struct PayloadReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> PayloadReader<'a> {
    /// Starts reading at offset 0.
    #[must_use]
    pub const fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Current offset.
    #[must_use]
    pub const fn position(&self) -> usize {
        self.pos
    }

    /// Bytes left.
    #[must_use]
    pub const fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    /// Takes the next `n` bytes.
    ///
    /// # Errors
    ///
    /// Returns `Truncated` if fewer remain.
    pub fn take(&mut self, n: usize) -> CodecResult<&'a [u8]> {
        if self.remaining() < n {
            return Err(CodecError::Truncated {
                offset: self.pos,
                needed: n,
                available: self.remaining(),
            });
        }
        let data = self.data;
        let slice = &data[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    fn array<const N: usize>(&mut self) -> CodecResult<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    /// Reads one byte.
    ///
    /// # Errors
    ///
    /// Returns `Truncated` at end of input.
    pub fn u8(&mut self) -> CodecResult<u8> {
        Ok(self.take(1)?[0])
    }

    /// Reads a u16.
    ///
    /// # Errors
    ///
    /// Returns `Truncated` at end of input.
    pub fn u16(&mut self) -> CodecResult<u16> {
        self.array().map(u16::from_le_bytes)
    }

    /// Reads a u32.
    ///
    /// # Errors
    ///
    /// Returns `Truncated` at end of input.
    pub fn u32(&mut self) -> CodecResult<u32> {
        self.array().map(u32::from_le_bytes)
    }

    /// Reads a u64.
    ///
    /// # Errors
    ///
    /// Returns `Truncated` at end of input.
    pub fn u64(&mut self) -> CodecResult<u64> {
        self.array().map(u64::from_le_bytes)
    }

    /// Reads an f64.
    ///
    /// # Errors
    ///
    /// Returns `Truncated` at end of input.
    pub fn f64(&mut self) -> CodecResult<f64> {
        self.array().map(f64::from_le_bytes)
    }

    /// Reads an actor id.
    ///
    /// # Errors
    ///
    /// Returns `Truncated` at end of input.
    pub fn actor_id(&mut self) -> CodecResult<ActorId> {
        self.array().map(ActorId::from_le_bytes)
    }

    /// Reads a u16-prefixed string.
    ///
    /// # Errors
    ///
    /// Returns `Truncated` or `InvalidUtf8`.
    pub fn short_str(&mut self, field: &'static str) -> CodecResult<String> {
        let len = usize::from(self.u16()?);
        let bytes = self.take(len)?;
        String::from_utf8(bytes.to_vec()).map_err(|_| CodecError::InvalidUtf8 { field })
    }

    /// Reads u32-prefixed bytes.
    ///
    /// # Errors
    ///
    /// Returns `Truncated` at end of input.
    pub fn long_bytes(&mut self) -> CodecResult<&'a [u8]> {
        let len = self.u32()? as usize;
        self.take(len)
    }

    /// Reads one value of the given tag.
    ///
    /// # Errors
    ///
    /// Returns `Truncated` or `InvalidUtf8`.
    pub fn value(&mut self, tag: ValueTag) -> CodecResult<ParamValue> {
        Ok(match tag {
            ValueTag::Bool => ParamValue::Bool(self.u8()? != 0),
            ValueTag::Int32 => ParamValue::Int32(self.array().map(i32::from_le_bytes)?),
            ValueTag::Int64 => ParamValue::Int64(self.array().map(i64::from_le_bytes)?),
            ValueTag::Float => ParamValue::Float(self.array().map(f32::from_le_bytes)?),
            ValueTag::Double => ParamValue::Double(self.f64()?),
            ValueTag::String => {
                let bytes = self.long_bytes()?;
                ParamValue::String(String::from_utf8(bytes.to_vec()).map_err(|_| {
                    CodecError::InvalidUtf8 {
                        field: "string value",
                    }
                })?)
            }
            ValueTag::Vec3 => {
                let x = self.array().map(f32::from_le_bytes)?;
                let y = self.array().map(f32::from_le_bytes)?;
                let z = self.array().map(f32::from_le_bytes)?;
                ParamValue::Vec3([x, y, z])
            }
            ValueTag::ActorId => ParamValue::ActorId(self.actor_id()?),
            ValueTag::Bytes => ParamValue::Bytes(self.long_bytes()?.to_vec()),
        })
    }

    /// Reads a counted property list, preserving wire order.
    ///
    /// # Errors
    ///
    /// Returns `Truncated`, `UnknownValueTag` or `InvalidUtf8`.
    pub fn properties(&mut self) -> CodecResult<PropertySet> {
        let count = self.u16()?;
        let mut props = PropertySet::new();
        for _ in 0..count {
            let raw = self.u8()?;
            let tag = ValueTag::from_u8(raw).ok_or(CodecError::UnknownValueTag(raw))?;
            let name = self.short_str("parameter name")?;
            let value = self.value(tag)?;
            props.push(name, value);
        }
        Ok(props)
    }
}

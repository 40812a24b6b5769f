//! # Typed Values
//!
//! Message parameters and actor properties share one value type. Each
//! variant has a stable one-byte tag used by the payload codec.

use crate::actor::ActorId;

/// Wire tag identifying a [`ParamValue`] variant.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ValueTag {
    /// Boolean.
    Bool = 1,
    /// Signed 32-bit integer.
    Int32 = 2,
    /// Signed 64-bit integer.
    Int64 = 3,
    /// 32-bit float.
    Float = 4,
    /// 64-bit float.
    Double = 5,
    /// UTF-8 string.
    String = 6,
    /// Three 32-bit floats.
    Vec3 = 7,
    /// Actor reference.
    ActorId = 8,
    /// Opaque bytes.
    Bytes = 9,
}

impl ValueTag {
    /// Converts from u8.
    #[must_use]
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            1 => Some(Self::Bool),
            2 => Some(Self::Int32),
            3 => Some(Self::Int64),
            4 => Some(Self::Float),
            5 => Some(Self::Double),
            6 => Some(Self::String),
            7 => Some(Self::Vec3),
            8 => Some(Self::ActorId),
            9 => Some(Self::Bytes),
            _ => None,
        }
    }
}

/// A typed parameter or property value.
#[derive(Clone, Debug, PartialEq)]
pub enum ParamValue {
    /// Boolean.
    Bool(bool),
    /// Signed 32-bit integer.
    Int32(i32),
    /// Signed 64-bit integer.
    Int64(i64),
    /// 32-bit float.
    Float(f32),
    /// 64-bit float.
    Double(f64),
    /// UTF-8 string.
    String(String),
    /// Position, velocity, orientation.
    Vec3([f32; 3]),
    /// Reference to another actor.
    ActorId(ActorId),
    /// Opaque bytes.
    Bytes(Vec<u8>),
}

impl ParamValue {
    /// Returns the wire tag for this value.
    #[must_use]
    pub const fn tag(&self) -> ValueTag {
        match self {
            Self::Bool(_) => ValueTag::Bool,
            Self::Int32(_) => ValueTag::Int32,
            Self::Int64(_) => ValueTag::Int64,
            Self::Float(_) => ValueTag::Float,
            Self::Double(_) => ValueTag::Double,
            Self::String(_) => ValueTag::String,
            Self::Vec3(_) => ValueTag::Vec3,
            Self::ActorId(_) => ValueTag::ActorId,
            Self::Bytes(_) => ValueTag::Bytes,
        }
    }

    /// Integer view, widening `Int32`.
    #[must_use]
    pub const fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int32(v) => Some(*v as i64),
            Self::Int64(v) => Some(*v),
            _ => None,
        }
    }

    /// Float view, widening `Float` and integers.
    #[allow(clippy::cast_precision_loss)]
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Float(v) => Some(f64::from(*v)),
            Self::Double(v) => Some(*v),
            Self::Int32(v) => Some(f64::from(*v)),
            Self::Int64(v) => Some(*v as f64),
            _ => None,
        }
    }

    /// String view.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Boolean view.
    #[must_use]
    pub const fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Actor reference view.
    #[must_use]
    pub const fn as_actor_id(&self) -> Option<ActorId> {
        match self {
            Self::ActorId(id) => Some(*id),
            _ => None,
        }
    }
}

impl From<bool> for ParamValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i32> for ParamValue {
    fn from(v: i32) -> Self {
        Self::Int32(v)
    }
}

impl From<i64> for ParamValue {
    fn from(v: i64) -> Self {
        Self::Int64(v)
    }
}

impl From<f32> for ParamValue {
    fn from(v: f32) -> Self {
        Self::Float(v)
    }
}

impl From<f64> for ParamValue {
    fn from(v: f64) -> Self {
        Self::Double(v)
    }
}

impl From<&str> for ParamValue {
    fn from(v: &str) -> Self {
        Self::String(v.to_owned())
    }
}

impl From<String> for ParamValue {
    fn from(v: String) -> Self {
        Self::String(v)
    }
}

impl From<[f32; 3]> for ParamValue {
    fn from(v: [f32; 3]) -> Self {
        Self::Vec3(v)
    }
}

impl From<ActorId> for ParamValue {
    fn from(v: ActorId) -> Self {
        Self::ActorId(v)
    }
}

impl From<Vec<u8>> for ParamValue {
    fn from(v: Vec<u8>) -> Self {
        Self::Bytes(v)
    }
}

/// Ordered list of named values.
///
/// Used both as a message's parameter list and as an actor's property bag.
/// Insertion order is preserved so encodings are deterministic; setting an
/// existing name replaces the value in place.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PropertySet {
    entries: Vec<(String, ParamValue)>,
}

impl PropertySet {
    /// Creates an empty set.
    #[must_use]
    pub const fn new() -> Self {
        Self { entries: Vec::new() }
    }

    /// Sets `name` to `value`, replacing any previous value.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<ParamValue>) {
        let name = name.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some((_, slot)) => *slot = value,
            None => self.entries.push((name, value)),
        }
    }

    /// Appends without checking for an existing name.
    ///
    /// Decoders use this to keep the wire order exactly.
    pub fn push(&mut self, name: String, value: ParamValue) {
        self.entries.push((name, value));
    }

    /// Looks up a value by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&ParamValue> {
        self.entries.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    /// Removes a value by name.
    pub fn remove(&mut self, name: &str) -> Option<ParamValue> {
        let pos = self.entries.iter().position(|(n, _)| n == name)?;
        Some(self.entries.remove(pos).1)
    }

    /// Copies every entry of `other` into this set.
    pub fn merge(&mut self, other: &Self) {
        for (name, value) in &other.entries {
            self.set(name.clone(), value.clone());
        }
    }

    /// Iterates entries in order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParamValue)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v))
    }

    /// Number of entries.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the set is empty.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Removes every entry, keeping the allocation.
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

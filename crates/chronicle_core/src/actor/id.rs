//! # Actor Identity
//!
//! A 128-bit identifier generated once per actor (and once per kernel, to
//! identify the machine a message originated from).

use std::fmt;

use uuid::Uuid;

/// Globally unique identifier of an actor or a machine.
///
/// Immutable for the lifetime of the thing it names.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct ActorId(u128);

impl ActorId {
    /// Null/invalid actor ID.
    pub const NULL: Self = Self(0);

    /// Generates a fresh random ID.
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4().as_u128())
    }

    /// Wraps a raw 128-bit value.
    #[inline]
    #[must_use]
    pub const fn from_u128(raw: u128) -> Self {
        Self(raw)
    }

    /// Returns the raw 128-bit value.
    #[inline]
    #[must_use]
    pub const fn as_u128(self) -> u128 {
        self.0
    }

    /// Little-endian wire form.
    #[inline]
    #[must_use]
    pub const fn to_le_bytes(self) -> [u8; 16] {
        self.0.to_le_bytes()
    }

    /// Reads the little-endian wire form.
    #[inline]
    #[must_use]
    pub const fn from_le_bytes(bytes: [u8; 16]) -> Self {
        Self(u128::from_le_bytes(bytes))
    }

    /// Checks if this ID is null.
    #[inline]
    #[must_use]
    pub const fn is_null(self) -> bool {
        self.0 == 0
    }
}

impl Default for ActorId {
    fn default() -> Self {
        Self::NULL
    }
}

impl fmt::Display for ActorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", Uuid::from_u128(self.0).hyphenated())
    }
}

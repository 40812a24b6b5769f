//! Keyframe and tag indices.

use crate::error::{ReplayError, ReplayResult};
use crate::format::{Keyframe, Tag};

/// Keyframes ordered by timestamp. Timestamps are unique.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct KeyframeIndex {
    keyframes: Vec<Keyframe>,
}

impl KeyframeIndex {
    /// Creates an empty index.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds an index from stored keyframes, dropping later duplicates of a
    /// timestamp.
    #[must_use]
    pub fn from_vec(mut keyframes: Vec<Keyframe>) -> Self {
        keyframes.sort_by_key(|k| k.timestamp_micros);
        let before = keyframes.len();
        keyframes.dedup_by_key(|k| k.timestamp_micros);
        if keyframes.len() != before {
            tracing::warn!(
                dropped = before - keyframes.len(),
                "Duplicate keyframe timestamps in log index"
            );
        }
        Self { keyframes }
    }

    /// Inserts a keyframe in timestamp order.
    ///
    /// # Errors
    ///
    /// Returns `DuplicateKeyframe` if one exists at the same timestamp.
    pub fn insert(&mut self, keyframe: Keyframe) -> ReplayResult<usize> {
        match self
            .keyframes
            .binary_search_by_key(&keyframe.timestamp_micros, |k| k.timestamp_micros)
        {
            Ok(_) => Err(ReplayError::DuplicateKeyframe(keyframe.timestamp_micros)),
            Err(pos) => {
                self.keyframes.insert(pos, keyframe);
                Ok(pos)
            }
        }
    }

    /// Keyframe at `index`.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Keyframe> {
        self.keyframes.get(index)
    }

    /// First keyframe called `name`, with its position.
    #[must_use]
    pub fn by_name(&self, name: &str) -> Option<(usize, &Keyframe)> {
        self.keyframes.iter().enumerate().find(|(_, k)| k.name == name)
    }

    /// Keyframe at exactly `timestamp_micros`.
    #[must_use]
    pub fn at(&self, timestamp_micros: u64) -> Option<&Keyframe> {
        self.keyframes
            .binary_search_by_key(&timestamp_micros, |k| k.timestamp_micros)
            .ok()
            .map(|i| &self.keyframes[i])
    }

    /// Latest keyframe at or before `timestamp_micros`.
    #[must_use]
    pub fn nearest_at_or_before(&self, timestamp_micros: u64) -> Option<&Keyframe> {
        let after = self
            .keyframes
            .partition_point(|k| k.timestamp_micros <= timestamp_micros);
        after.checked_sub(1).map(|i| &self.keyframes[i])
    }

    /// Iterates in timestamp order.
    pub fn iter(&self) -> std::slice::Iter<'_, Keyframe> {
        self.keyframes.iter()
    }

    /// Keyframes in timestamp order.
    #[must_use]
    pub fn as_slice(&self) -> &[Keyframe] {
        &self.keyframes
    }

    /// Number of keyframes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.keyframes.len()
    }

    /// Whether there are none.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.keyframes.is_empty()
    }

    /// Takes the keyframes out.
    #[must_use]
    pub fn into_vec(self) -> Vec<Keyframe> {
        self.keyframes
    }
}

/// Tags keyed by name, kept in insertion order. Re-inserting a name
/// replaces the old tag.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TagIndex {
    tags: Vec<Tag>,
}

impl TagIndex {
    /// Creates an empty index.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds an index from stored tags.
    #[must_use]
    pub fn from_vec(tags: Vec<Tag>) -> Self {
        let mut index = Self::new();
        for tag in tags {
            index.insert(tag);
        }
        index
    }

    /// Inserts a tag. Returns the tag it replaced, if any.
    pub fn insert(&mut self, tag: Tag) -> Option<Tag> {
        match self.tags.iter_mut().find(|t| t.name == tag.name) {
            Some(slot) => Some(std::mem::replace(slot, tag)),
            None => {
                self.tags.push(tag);
                None
            }
        }
    }

    /// Tag called `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Tag> {
        self.tags.iter().find(|t| t.name == name)
    }

    /// Iterates in insertion order.
    pub fn iter(&self) -> std::slice::Iter<'_, Tag> {
        self.tags.iter()
    }

    /// Number of tags.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tags.len()
    }

    /// Whether there are none.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    /// Takes the tags out.
    #[must_use]
    pub fn into_vec(self) -> Vec<Tag> {
        self.tags
    }
}

//! Hierarchical gameplay tags.
//!
//! Tags are dotted names such as `State.Burning`. A tag matches a query when
//! it is equal to it or nested beneath it, so `State.Burning` satisfies a
//! requirement for `State`.

use std::collections::BTreeMap;
use std::fmt;

/// A dotted, hierarchical tag name.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct GameplayTag(String);

impl GameplayTag {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns true if `self` equals `query` or is a child of it.
    pub fn matches(&self, query: &GameplayTag) -> bool {
        match self.0.strip_prefix(query.as_str()) {
            Some("") => true,
            Some(rest) => rest.starts_with('.'),
            None => false,
        }
    }
}

impl fmt::Display for GameplayTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for GameplayTag {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Reference-counted set of tags owned by an entity.
///
/// Two active effects granting the same tag keep it present until both are
/// gone.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TagContainer {
    counts: BTreeMap<GameplayTag, u32>,
}

impl TagContainer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds one reference. Returns true if the tag was not present before.
    pub fn add(&mut self, tag: &GameplayTag) -> bool {
        let count = self.counts.entry(tag.clone()).or_insert(0);
        *count += 1;
        *count == 1
    }

    /// Drops one reference. Returns true if the tag is now absent.
    pub fn remove(&mut self, tag: &GameplayTag) -> bool {
        let Some(count) = self.counts.get_mut(tag) else {
            return false;
        };
        *count -= 1;
        if *count == 0 {
            self.counts.remove(tag);
            true
        } else {
            false
        }
    }

    /// Returns true if any owned tag matches `query` hierarchically.
    pub fn has_tag(&self, query: &GameplayTag) -> bool {
        self.counts.keys().any(|tag| tag.matches(query))
    }

    pub fn has_exact(&self, tag: &GameplayTag) -> bool {
        self.counts.contains_key(tag)
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &GameplayTag> {
        self.counts.keys()
    }
}

/// Tag conditions gating a modifier.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct TagRequirements {
    /// Every one of these must be present.
    pub require: Vec<GameplayTag>,
    /// None of these may be present.
    pub ignore: Vec<GameplayTag>,
}

impl TagRequirements {
    pub fn is_empty(&self) -> bool {
        self.require.is_empty() && self.ignore.is_empty()
    }

    pub fn is_satisfied_by(&self, tags: &TagContainer) -> bool {
        self.require.iter().all(|tag| tags.has_tag(tag))
            && !self.ignore.iter().any(|tag| tags.has_tag(tag))
    }

    pub fn require(mut self, tag: impl Into<GameplayTag>) -> Self {
        self.require.push(tag.into());
        self
    }

    pub fn ignore(mut self, tag: impl Into<GameplayTag>) -> Self {
        self.ignore.push(tag.into());
        self
    }
}

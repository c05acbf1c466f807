//! Bidirectional current/max pairing.

use crate::attribute::Attribute;

/// Maps current-valued attributes to their paired maximum and back.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PairRegistry {
    max_of: [Option<Attribute>; Attribute::COUNT],
    current_of: [Option<Attribute>; Attribute::COUNT],
}

impl Default for PairRegistry {
    fn default() -> Self {
        Self {
            max_of: [None; Attribute::COUNT],
            current_of: [None; Attribute::COUNT],
        }
    }
}

impl PairRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `current ≤ max`. Re-registering the same pair is a no-op.
    ///
    /// Re-pairing either side drops its previous partner so lookups stay
    /// symmetric. Returns false for no-ops and for self-pairs.
    pub fn register(&mut self, current: Attribute, max: Attribute) -> bool {
        if current == max || self.max_of[current.index()] == Some(max) {
            return false;
        }

        if let Some(old_max) = self.max_of[current.index()].take() {
            self.current_of[old_max.index()] = None;
        }
        if let Some(old_current) = self.current_of[max.index()].take() {
            self.max_of[old_current.index()] = None;
        }

        self.max_of[current.index()] = Some(max);
        self.current_of[max.index()] = Some(current);
        true
    }

    /// The maximum bounding `current`, if paired.
    pub fn max_of(&self, current: Attribute) -> Option<Attribute> {
        self.max_of[current.index()]
    }

    /// The current bounded by `max`, if paired.
    pub fn current_of(&self, max: Attribute) -> Option<Attribute> {
        self.current_of[max.index()]
    }

    pub fn is_max(&self, attribute: Attribute) -> bool {
        self.current_of(attribute).is_some()
    }

    /// Iterates `(current, max)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (Attribute, Attribute)> + '_ {
        use strum::IntoEnumIterator;
        Attribute::iter().filter_map(|current| self.max_of(current).map(|max| (current, max)))
    }
}

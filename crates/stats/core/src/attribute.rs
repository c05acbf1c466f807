//! Attribute identifiers and the per-attribute value pair.
//!
//! Every attribute has a persistent `base` and an effective `current` value:
//!
//! ```text
//! current = preChange( aggregate(base, active Duration/Infinite modifiers) )
//! ```
//!
//! Attributes are plain enum variants so a store can index its values by
//! discriminant. There is no accessor generation; [`crate::AttributeStore`]
//! exposes `base`/`current` reads, checkpointed writes and a raw `init`.

use strum::EnumCount;

/// Stable identifier of a numeric character attribute.
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    strum::Display,
    strum::EnumString,
    strum::AsRefStr,
    strum::EnumIter,
    strum::EnumCount,
)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[strum(ascii_case_insensitive)]
pub enum Attribute {
    // ========================================================================
    // Primary
    // ========================================================================
    Strength,
    Dexterity,
    Intelligence,
    Endurance,
    Vigor,

    // ========================================================================
    // Secondary (usually derived from primaries by Infinite effects)
    // ========================================================================
    Armor,
    ArmorPenetration,
    BlockChance,
    CriticalHitChance,
    CriticalHitDamage,
    CriticalHitResistance,
    HealthRegeneration,
    ManaRegeneration,
    StaminaRegeneration,
    MaxHealth,
    MaxMana,
    MaxStamina,

    // ========================================================================
    // Vital (bounded by a paired maximum)
    // ========================================================================
    Health,
    Mana,
    Stamina,
}

impl Attribute {
    /// Number of attribute identifiers.
    pub const COUNT: usize = <Self as EnumCount>::COUNT;

    /// Dense index used by per-attribute tables.
    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Grouping used by initialization order and UI sections.
    pub const fn group(self) -> AttributeGroup {
        match self {
            Self::Strength | Self::Dexterity | Self::Intelligence | Self::Endurance | Self::Vigor => {
                AttributeGroup::Primary
            }
            Self::Health | Self::Mana | Self::Stamina => AttributeGroup::Vital,
            _ => AttributeGroup::Secondary,
        }
    }

    /// The standard current/max pairs of a character stat block.
    pub const STANDARD_PAIRS: [(Attribute, Attribute); 3] = [
        (Attribute::Health, Attribute::MaxHealth),
        (Attribute::Mana, Attribute::MaxMana),
        (Attribute::Stamina, Attribute::MaxStamina),
    ];
}

/// Coarse attribute grouping.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, strum::Display)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum AttributeGroup {
    /// Base stats set directly (Strength, Vigor, ...).
    Primary,
    /// Values derived from primaries (Armor, MaxHealth, ...).
    Secondary,
    /// Pools bounded by a maximum (Health, Mana, Stamina).
    Vital,
}

/// Rounding applied on every write path of an attribute.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, strum::Display)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum RoundingPolicy {
    /// Keep the raw float.
    None,
    /// Banker's rounding: 112.5 -> 112, 113.5 -> 114.
    #[default]
    RoundHalfToEven,
    Floor,
    Ceil,
}

impl RoundingPolicy {
    /// Apply this policy to a value.
    pub fn apply(self, value: f32) -> f32 {
        match self {
            Self::None => value,
            Self::RoundHalfToEven => value.round_ties_even(),
            Self::Floor => value.floor(),
            Self::Ceil => value.ceil(),
        }
    }
}

/// Base and current value of one attribute.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AttributeData {
    pub base: f32,
    pub current: f32,
}

impl AttributeData {
    pub const fn new(value: f32) -> Self {
        Self {
            base: value,
            current: value,
        }
    }
}

/// Tolerance used when deciding whether a write actually changed a value.
pub const VALUE_TOLERANCE: f32 = 1.0e-4;

/// Returns true if two attribute values are equal within [`VALUE_TOLERANCE`].
#[inline]
pub fn nearly_equal(a: f32, b: f32) -> bool {
    (a - b).abs() <= VALUE_TOLERANCE
}

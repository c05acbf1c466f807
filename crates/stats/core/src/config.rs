use crate::attribute::RoundingPolicy;

/// Engine configuration constants and tunable parameters.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct EngineConfig {
    /// Rounding applied to every attribute that has no explicit policy.
    pub default_rounding: RoundingPolicy,

    /// Upper bound on how many times a single attribute may be re-evaluated
    /// while propagating one mutation. Guards against capture cycles such as
    /// an Override on A capturing B while an Override on B captures A.
    pub max_recompute_depth: u32,
}

impl EngineConfig {
    // ===== runtime-tunable defaults =====
    pub const DEFAULT_ROUNDING: RoundingPolicy = RoundingPolicy::RoundHalfToEven;
    pub const DEFAULT_MAX_RECOMPUTE_DEPTH: u32 = 16;

    pub const fn new() -> Self {
        Self {
            default_rounding: Self::DEFAULT_ROUNDING,
            max_recompute_depth: Self::DEFAULT_MAX_RECOMPUTE_DEPTH,
        }
    }

    pub const fn with_default_rounding(mut self, rounding: RoundingPolicy) -> Self {
        self.default_rounding = rounding;
        self
    }

    pub const fn with_max_recompute_depth(mut self, depth: u32) -> Self {
        self.max_recompute_depth = depth;
        self
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::new()
    }
}

//! Closed enums shared across the engine. Each maps to/from the exact
//! strings persisted in SQLite.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::errors::{MemoryError, MemoryResult};

/// The three entity kinds addressable through the tool surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Episode,
    Fact,
    Rule,
}

impl EntityKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Episode => "episode",
            Self::Fact => "fact",
            Self::Rule => "rule",
        }
    }

    /// Parse a caller-supplied kind string. Unknown values are a
    /// validation error, not a guess.
    pub fn parse(s: &str) -> MemoryResult<Self> {
        match s {
            "episode" => Ok(Self::Episode),
            "fact" => Ok(Self::Fact),
            "rule" => Ok(Self::Rule),
            other => Err(MemoryError::validation(format!(
                "unknown entity kind '{other}'"
            ))),
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Named decay-rate bucket for facts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Permanence {
    Permanent,
    Stable,
    Standard,
    Volatile,
    Ephemeral,
}

impl Permanence {
    pub const ALL: [Permanence; 5] = [
        Self::Permanent,
        Self::Stable,
        Self::Standard,
        Self::Volatile,
        Self::Ephemeral,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Permanent => "permanent",
            Self::Stable => "stable",
            Self::Standard => "standard",
            Self::Volatile => "volatile",
            Self::Ephemeral => "ephemeral",
        }
    }

    /// Parse a caller-supplied permanence. Anything outside the fixed
    /// five is rejected.
    pub fn parse(s: &str) -> MemoryResult<Self> {
        match s {
            "permanent" => Ok(Self::Permanent),
            "stable" => Ok(Self::Stable),
            "standard" => Ok(Self::Standard),
            "volatile" => Ok(Self::Volatile),
            "ephemeral" => Ok(Self::Ephemeral),
            other => Err(MemoryError::validation(format!(
                "unknown permanence '{other}'"
            ))),
        }
    }

    /// Decay rate λ in units of 1/day. `Permanent` never decays.
    pub fn decay_rate(self) -> f64 {
        match self {
            Self::Permanent => 0.0,
            Self::Stable => 0.002,
            Self::Standard => 0.01,
            Self::Volatile => 0.05,
            Self::Ephemeral => 0.2,
        }
    }

    /// Relative importance weight used by the composite recall scorer.
    pub fn importance_weight(self) -> f64 {
        match self {
            Self::Permanent => 1.0,
            Self::Stable => 0.8,
            Self::Standard => 0.6,
            Self::Volatile => 0.4,
            Self::Ephemeral => 0.2,
        }
    }
}

impl fmt::Display for Permanence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle state for facts and rules.
///
/// The decay sweep only ever moves rows forward
/// (active → fading → expired); `superseded` and `forgotten` are set
/// by explicit operations and are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Validity {
    Active,
    Fading,
    Expired,
    Superseded,
    Forgotten,
}

impl Validity {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Fading => "fading",
            Self::Expired => "expired",
            Self::Superseded => "superseded",
            Self::Forgotten => "forgotten",
        }
    }

    pub fn parse(s: &str) -> MemoryResult<Self> {
        match s {
            "active" => Ok(Self::Active),
            "fading" => Ok(Self::Fading),
            "expired" => Ok(Self::Expired),
            "superseded" => Ok(Self::Superseded),
            "forgotten" => Ok(Self::Forgotten),
            other => Err(MemoryError::validation(format!(
                "unknown validity '{other}'"
            ))),
        }
    }

    /// Rows in a terminal state are skipped by the decay sweep and are
    /// never retrievable.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Expired | Self::Superseded | Self::Forgotten)
    }

    /// Active and fading rows are the retrievable ones.
    pub fn is_live(self) -> bool {
        matches!(self, Self::Active | Self::Fading)
    }
}

impl fmt::Display for Validity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Earned trust level of a rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Maturity {
    Candidate,
    Established,
    Proven,
    AntiPattern,
}

impl Maturity {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Candidate => "candidate",
            Self::Established => "established",
            Self::Proven => "proven",
            Self::AntiPattern => "anti_pattern",
        }
    }

    pub fn parse(s: &str) -> MemoryResult<Self> {
        match s {
            "candidate" => Ok(Self::Candidate),
            "established" => Ok(Self::Established),
            "proven" => Ok(Self::Proven),
            "anti_pattern" => Ok(Self::AntiPattern),
            other => Err(MemoryError::validation(format!(
                "unknown maturity '{other}'"
            ))),
        }
    }

    /// Relative importance weight used by the composite recall scorer.
    /// Anti-patterns rank high: a warning is worth surfacing.
    pub fn importance_weight(self) -> f64 {
        match self {
            Self::Candidate => 0.5,
            Self::Established => 0.75,
            Self::Proven => 1.0,
            Self::AntiPattern => 0.9,
        }
    }
}

impl fmt::Display for Maturity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Relation carried by a provenance link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkRelation {
    DerivedFrom,
    Supports,
    Contradicts,
    Supersedes,
}

impl LinkRelation {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::DerivedFrom => "derived_from",
            Self::Supports => "supports",
            Self::Contradicts => "contradicts",
            Self::Supersedes => "supersedes",
        }
    }

    pub fn parse(s: &str) -> MemoryResult<Self> {
        match s {
            "derived_from" => Ok(Self::DerivedFrom),
            "supports" => Ok(Self::Supports),
            "contradicts" => Ok(Self::Contradicts),
            "supersedes" => Ok(Self::Supersedes),
            other => Err(MemoryError::validation(format!(
                "unknown link relation '{other}'"
            ))),
        }
    }
}

impl fmt::Display for LinkRelation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

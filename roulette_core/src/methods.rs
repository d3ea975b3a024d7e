//! Kill method taxonomy: standard and firearm methods, method classes, kill
//! types and complications.

use std::fmt;

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use crate::catalog::MapMethodId;

bitflags! {
    /// Difficulty tier and eligibility tags carried by every kill method.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct MethodTags: u8 {
        const MEDIUM = 1 << 0;
        const HARD = 1 << 1;
        const EXTREME = 1 << 2;
        const BUGGY = 1 << 3;
        const IMPOSSIBLE = 1 << 4;
        const GENERIC_ELIMINATION = 1 << 5;
    }
}

/// Single tag as written in catalog data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MethodTag {
    Medium,
    Hard,
    Extreme,
    Buggy,
    Impossible,
    GenericElimination,
}

impl MethodTag {
    pub fn flag(self) -> MethodTags {
        match self {
            MethodTag::Medium => MethodTags::MEDIUM,
            MethodTag::Hard => MethodTags::HARD,
            MethodTag::Extreme => MethodTags::EXTREME,
            MethodTag::Buggy => MethodTags::BUGGY,
            MethodTag::Impossible => MethodTags::IMPOSSIBLE,
            MethodTag::GenericElimination => MethodTags::GENERIC_ELIMINATION,
        }
    }
}

impl MethodTags {
    pub fn from_tags(tags: &[MethodTag]) -> Self {
        tags.iter()
            .fold(MethodTags::empty(), |acc, tag| acc | tag.flag())
    }
}

/// Variant of a kill. `Any` means the condition does not constrain it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum KillType {
    #[default]
    Any,
    Silenced,
    Loud,
    LoudRemote,
    Remote,
    Melee,
    Thrown,
    Impact,
}

impl KillType {
    /// Kill types that render with a prefix, longest code first so
    /// "Ld Remote" is tried before "Ld".
    pub const PREFIXED: [KillType; 7] = [
        KillType::LoudRemote,
        KillType::Silenced,
        KillType::Loud,
        KillType::Remote,
        KillType::Melee,
        KillType::Thrown,
        KillType::Impact,
    ];

    pub fn short_code(self) -> &'static str {
        match self {
            KillType::Any => "",
            KillType::Silenced => "Sil",
            KillType::Loud => "Ld",
            KillType::LoudRemote => "Ld Remote",
            KillType::Remote => "Remote",
            KillType::Melee => "Melee",
            KillType::Thrown => "Thrown",
            KillType::Impact => "Impact",
        }
    }

    /// Parse a kill type from its short code or a spelled-out name.
    pub fn from_code(code: &str) -> Option<Self> {
        let normalized: String = code
            .chars()
            .filter(|c| !matches!(c, ' ' | '_' | '-'))
            .collect::<String>()
            .to_ascii_lowercase();
        match normalized.as_str() {
            "" | "any" | "*" => Some(KillType::Any),
            "sil" | "silenced" => Some(KillType::Silenced),
            "ld" | "loud" => Some(KillType::Loud),
            "ldremote" | "loudremote" => Some(KillType::LoudRemote),
            "remote" => Some(KillType::Remote),
            "melee" => Some(KillType::Melee),
            "thrown" => Some(KillType::Thrown),
            "impact" => Some(KillType::Impact),
            _ => None,
        }
    }
}

impl fmt::Display for KillType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KillType::Any => f.write_str("Any"),
            other => f.write_str(other.short_code()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum KillComplication {
    #[default]
    None,
    Live,
}

/// Class of a kill method; decides which kill types are legal for it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MethodClass {
    Standard,
    Gun,
    Melee,
    Explosive,
}

impl MethodClass {
    pub fn kill_types(self) -> &'static [KillType] {
        match self {
            MethodClass::Standard => &[],
            MethodClass::Gun => &[
                KillType::Silenced,
                KillType::Loud,
                KillType::LoudRemote,
                KillType::Remote,
            ],
            MethodClass::Melee => &[KillType::Melee, KillType::Thrown, KillType::Impact],
            MethodClass::Explosive => &[KillType::Remote, KillType::LoudRemote, KillType::Impact],
        }
    }

    pub fn has_variance(self) -> bool {
        !self.kill_types().is_empty()
    }

    /// Whether `kill_type` may appear on a condition of this class.
    pub fn allows(self, kill_type: KillType) -> bool {
        if self.has_variance() {
            self.kill_types().contains(&kill_type)
        } else {
            kill_type == KillType::Any
        }
    }
}

/// Accident and close-quarters methods available on every ordinary target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum StandardMethod {
    Drowning,
    FallingObject,
    Fall,
    Fire,
    Electrocution,
    Explosion,
    ConsumedPoison,
    InjectedPoison,
    FiberWire,
    NeckSnap,
    Elimination,
}

impl StandardMethod {
    pub const ALL: [StandardMethod; 11] = [
        StandardMethod::Drowning,
        StandardMethod::FallingObject,
        StandardMethod::Fall,
        StandardMethod::Fire,
        StandardMethod::Electrocution,
        StandardMethod::Explosion,
        StandardMethod::ConsumedPoison,
        StandardMethod::InjectedPoison,
        StandardMethod::FiberWire,
        StandardMethod::NeckSnap,
        StandardMethod::Elimination,
    ];

    pub fn name(self) -> &'static str {
        match self {
            StandardMethod::Drowning => "Drowning",
            StandardMethod::FallingObject => "Falling Object",
            StandardMethod::Fall => "Fall",
            StandardMethod::Fire => "Fire",
            StandardMethod::Electrocution => "Electrocution",
            StandardMethod::Explosion => "Explosion (Accident)",
            StandardMethod::ConsumedPoison => "Consumed Poison",
            StandardMethod::InjectedPoison => "Injected Poison",
            StandardMethod::FiberWire => "Fiber Wire",
            StandardMethod::NeckSnap => "Neck Snap",
            StandardMethod::Elimination => "Elimination",
        }
    }

    pub fn default_tags(self) -> MethodTags {
        match self {
            StandardMethod::Drowning => MethodTags::MEDIUM,
            StandardMethod::FallingObject => MethodTags::HARD,
            StandardMethod::Fall => MethodTags::MEDIUM,
            StandardMethod::Fire => MethodTags::HARD,
            StandardMethod::Electrocution => MethodTags::HARD,
            StandardMethod::Explosion => MethodTags::HARD,
            StandardMethod::ConsumedPoison => MethodTags::MEDIUM,
            StandardMethod::InjectedPoison
            | StandardMethod::FiberWire
            | StandardMethod::NeckSnap => MethodTags::empty(),
            StandardMethod::Elimination => MethodTags::GENERIC_ELIMINATION,
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|method| method.name().eq_ignore_ascii_case(name.trim()))
    }
}

/// Weapon-based methods available on every ordinary target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FirearmMethod {
    Pistol,
    Smg,
    Shotgun,
    AssaultRifle,
    Sniper,
    Explosive,
    PistolElimination,
    SmgElimination,
}

impl FirearmMethod {
    pub const ALL: [FirearmMethod; 8] = [
        FirearmMethod::Pistol,
        FirearmMethod::Smg,
        FirearmMethod::Shotgun,
        FirearmMethod::AssaultRifle,
        FirearmMethod::Sniper,
        FirearmMethod::Explosive,
        FirearmMethod::PistolElimination,
        FirearmMethod::SmgElimination,
    ];

    pub fn name(self) -> &'static str {
        match self {
            FirearmMethod::Pistol => "Pistol",
            FirearmMethod::Smg => "SMG",
            FirearmMethod::Shotgun => "Shotgun",
            FirearmMethod::AssaultRifle => "Assault Rifle",
            FirearmMethod::Sniper => "Sniper Rifle",
            FirearmMethod::Explosive => "Explosive",
            FirearmMethod::PistolElimination => "Pistol Elimination",
            FirearmMethod::SmgElimination => "SMG Elimination",
        }
    }

    /// Generic eliminations only constrain the weapon family, so they carry
    /// no kill-type variance.
    pub fn class(self) -> MethodClass {
        match self {
            FirearmMethod::Explosive => MethodClass::Explosive,
            FirearmMethod::PistolElimination | FirearmMethod::SmgElimination => {
                MethodClass::Standard
            }
            _ => MethodClass::Gun,
        }
    }

    pub fn default_tags(self) -> MethodTags {
        match self {
            FirearmMethod::Pistol | FirearmMethod::Smg => MethodTags::empty(),
            FirearmMethod::Shotgun | FirearmMethod::AssaultRifle => MethodTags::MEDIUM,
            FirearmMethod::Sniper => MethodTags::HARD,
            FirearmMethod::Explosive => MethodTags::MEDIUM,
            FirearmMethod::PistolElimination | FirearmMethod::SmgElimination => {
                MethodTags::GENERIC_ELIMINATION
            }
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|method| method.name().eq_ignore_ascii_case(name.trim()))
    }
}

/// A method assigned to a condition. Map methods are catalog references.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RouletteMethod {
    Standard(StandardMethod),
    Firearm(FirearmMethod),
    Map(MapMethodId),
}

impl RouletteMethod {
    /// Does an observed kill with `observed` satisfy a requirement for `self`?
    ///
    /// Generic eliminations accept any kill in their weapon family.
    pub fn accepts(self, observed: RouletteMethod) -> bool {
        if self == observed {
            return true;
        }
        match self {
            RouletteMethod::Standard(StandardMethod::Elimination) => true,
            RouletteMethod::Firearm(FirearmMethod::PistolElimination) => {
                observed == RouletteMethod::Firearm(FirearmMethod::Pistol)
            }
            RouletteMethod::Firearm(FirearmMethod::SmgElimination) => {
                observed == RouletteMethod::Firearm(FirearmMethod::Smg)
            }
            _ => false,
        }
    }

    pub fn is_generic_elimination(self) -> bool {
        matches!(
            self,
            RouletteMethod::Standard(StandardMethod::Elimination)
                | RouletteMethod::Firearm(FirearmMethod::PistolElimination)
                | RouletteMethod::Firearm(FirearmMethod::SmgElimination)
        )
    }
}

//! Ruleset toggles and the named presets they are compared against.

use std::{
    collections::HashMap,
    env, fs, io,
    path::{Path, PathBuf},
    sync::Arc,
};

use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

use crate::methods::MethodTags;

pub const BUILTIN_RULESETS: &str = include_str!("data/rulesets.json");

/// Label used for a ruleset that matches no preset.
pub const CUSTOM_RULESET: &str = "Custom";

/// Gates and weights controlling which condition features the generator may
/// produce. Toggles only affect the next generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Ruleset {
    pub enable_medium: bool,
    pub enable_hard: bool,
    pub enable_extreme: bool,
    pub enable_buggy: bool,
    pub enable_impossible: bool,
    pub generic_eliminations: bool,
    pub live_complications: bool,
    pub live_complications_exclude_standard: bool,
    #[serde(deserialize_with = "deserialize_chance")]
    pub live_complication_chance: u8,
    pub melee_kill_types: bool,
    pub thrown_kill_types: bool,
}

impl Default for Ruleset {
    fn default() -> Self {
        Self {
            enable_medium: true,
            enable_hard: true,
            enable_extreme: false,
            enable_buggy: false,
            enable_impossible: false,
            generic_eliminations: false,
            live_complications: true,
            live_complications_exclude_standard: true,
            live_complication_chance: 25,
            melee_kill_types: true,
            thrown_kill_types: true,
        }
    }
}

fn deserialize_chance<'de, D>(deserializer: D) -> Result<u8, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = i64::deserialize(deserializer)?;
    Ok(raw.clamp(0, 100) as u8)
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown ruleset toggle `{0}`")]
pub struct UnknownToggle(pub String);

impl Ruleset {
    /// Toggle keys accepted by [`Ruleset::set_toggle`].
    pub const TOGGLE_KEYS: [&'static str; 10] = [
        "enable_medium",
        "enable_hard",
        "enable_extreme",
        "enable_buggy",
        "enable_impossible",
        "generic_eliminations",
        "live_complications",
        "live_complications_exclude_standard",
        "melee_kill_types",
        "thrown_kill_types",
    ];

    pub fn with_live_chance(mut self, chance: u8) -> Self {
        self.set_live_complication_chance(chance);
        self
    }

    pub fn set_live_complication_chance(&mut self, chance: u8) {
        self.live_complication_chance = chance.min(100);
    }

    /// Whether a method carrying `tags` survives the tier and generic filters.
    pub fn allows_tags(&self, tags: MethodTags) -> bool {
        let gates = [
            (MethodTags::MEDIUM, self.enable_medium),
            (MethodTags::HARD, self.enable_hard),
            (MethodTags::EXTREME, self.enable_extreme),
            (MethodTags::BUGGY, self.enable_buggy),
            (MethodTags::IMPOSSIBLE, self.enable_impossible),
            (MethodTags::GENERIC_ELIMINATION, self.generic_eliminations),
        ];
        gates
            .iter()
            .all(|(flag, enabled)| *enabled || !tags.contains(*flag))
    }

    pub fn toggle(&self, key: &str) -> Option<bool> {
        match normalize_key(key).as_str() {
            "enable_medium" | "medium" => Some(self.enable_medium),
            "enable_hard" | "hard" => Some(self.enable_hard),
            "enable_extreme" | "extreme" => Some(self.enable_extreme),
            "enable_buggy" | "buggy" => Some(self.enable_buggy),
            "enable_impossible" | "impossible" => Some(self.enable_impossible),
            "generic_eliminations" => Some(self.generic_eliminations),
            "live_complications" => Some(self.live_complications),
            "live_complications_exclude_standard" => {
                Some(self.live_complications_exclude_standard)
            }
            "melee_kill_types" => Some(self.melee_kill_types),
            "thrown_kill_types" => Some(self.thrown_kill_types),
            _ => None,
        }
    }

    pub fn set_toggle(&mut self, key: &str, enabled: bool) -> Result<(), UnknownToggle> {
        let slot = match normalize_key(key).as_str() {
            "enable_medium" | "medium" => &mut self.enable_medium,
            "enable_hard" | "hard" => &mut self.enable_hard,
            "enable_extreme" | "extreme" => &mut self.enable_extreme,
            "enable_buggy" | "buggy" => &mut self.enable_buggy,
            "enable_impossible" | "impossible" => &mut self.enable_impossible,
            "generic_eliminations" => &mut self.generic_eliminations,
            "live_complications" => &mut self.live_complications,
            "live_complications_exclude_standard" => {
                &mut self.live_complications_exclude_standard
            }
            "melee_kill_types" => &mut self.melee_kill_types,
            "thrown_kill_types" => &mut self.thrown_kill_types,
            _ => return Err(UnknownToggle(key.to_string())),
        };
        *slot = enabled;
        Ok(())
    }
}

fn normalize_key(key: &str) -> String {
    key.trim().to_ascii_lowercase().replace('-', "_")
}

#[derive(Debug, Clone, Deserialize)]
pub struct RulesetPreset {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub rules: Ruleset,
}

#[derive(Debug, Clone, Deserialize)]
struct RulesetPresetsData {
    presets: Vec<RulesetPreset>,
}

#[derive(Debug, Error)]
pub enum RulesetPresetsError {
    #[error("failed to parse ruleset presets: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("failed to read ruleset presets from {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("duplicate ruleset preset id `{0}`")]
    DuplicateId(String),
}

/// Named presets in declaration order.
#[derive(Debug, Clone)]
pub struct RulesetPresets {
    presets: Vec<RulesetPreset>,
    by_id: HashMap<String, usize>,
}

impl RulesetPresets {
    pub fn builtin() -> Arc<Self> {
        Arc::new(
            Self::from_json_str(BUILTIN_RULESETS).expect("builtin ruleset presets should parse"),
        )
    }

    pub fn from_json_str(input: &str) -> Result<Self, RulesetPresetsError> {
        let parsed: RulesetPresetsData = serde_json::from_str(input)?;
        let mut by_id = HashMap::with_capacity(parsed.presets.len());
        for (index, preset) in parsed.presets.iter().enumerate() {
            if by_id
                .insert(preset.id.to_ascii_lowercase(), index)
                .is_some()
            {
                return Err(RulesetPresetsError::DuplicateId(preset.id.clone()));
            }
        }
        Ok(Self {
            presets: parsed.presets,
            by_id,
        })
    }

    pub fn from_file(path: &Path) -> Result<Self, RulesetPresetsError> {
        let contents = fs::read_to_string(path).map_err(|source| RulesetPresetsError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&contents)
    }

    pub fn get(&self, id: &str) -> Option<&RulesetPreset> {
        self.by_id
            .get(&id.trim().to_ascii_lowercase())
            .and_then(|index| self.presets.get(*index))
    }

    pub fn iter(&self) -> impl Iterator<Item = &RulesetPreset> {
        self.presets.iter()
    }

    pub fn len(&self) -> usize {
        self.presets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.presets.is_empty()
    }

    /// First preset structurally equal to `ruleset`.
    pub fn classify(&self, ruleset: &Ruleset) -> Option<&RulesetPreset> {
        self.presets.iter().find(|preset| preset.rules == *ruleset)
    }

    /// Preset id for `ruleset`, or [`CUSTOM_RULESET`] when it matches none.
    pub fn label_for(&self, ruleset: &Ruleset) -> &str {
        self.classify(ruleset)
            .map(|preset| preset.id.as_str())
            .unwrap_or(CUSTOM_RULESET)
    }
}

#[derive(Debug, Clone)]
pub struct RulesetPresetsMetadata {
    path: Option<PathBuf>,
}

impl RulesetPresetsMetadata {
    pub fn new(path: Option<PathBuf>) -> Self {
        Self { path }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }
}

pub fn load_ruleset_presets_from_env() -> (Arc<RulesetPresets>, RulesetPresetsMetadata) {
    let override_path = env::var("ROULETTE_RULESETS_PATH").ok().map(PathBuf::from);
    let default_path = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("src/data/rulesets.json");

    let candidates: Vec<PathBuf> = match override_path {
        Some(ref path) => vec![path.clone()],
        None => vec![default_path.clone()],
    };

    for path in candidates {
        match RulesetPresets::from_file(&path) {
            Ok(presets) => {
                tracing::info!(
                    target: "roulette::ruleset",
                    path = %path.display(),
                    presets = presets.len(),
                    "ruleset_presets.loaded=file"
                );
                return (Arc::new(presets), RulesetPresetsMetadata::new(Some(path)));
            }
            Err(err) => {
                tracing::warn!(
                    target: "roulette::ruleset",
                    path = %path.display(),
                    error = %err,
                    "ruleset_presets.load_failed"
                );
            }
        }
    }

    let presets = RulesetPresets::builtin();
    tracing::info!(target: "roulette::ruleset", "ruleset_presets.loaded=builtin");
    (presets, RulesetPresetsMetadata::new(None))
}

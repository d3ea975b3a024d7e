//! Static mission catalog: targets, disguises and mission-specific kill
//! methods.
//!
//! Loaded from `catalog.json` (embedded at build time) with support for an
//! environment variable override. Immutable once loaded; spins refer to its
//! entries through the typed ids below.

use std::{
    collections::{BTreeMap, HashMap},
    env, fmt, fs, io,
    path::{Path, PathBuf},
    sync::Arc,
};

use serde::Deserialize;
use thiserror::Error;

use crate::methods::{
    FirearmMethod, MethodClass, MethodTag, MethodTags, RouletteMethod, StandardMethod,
};

pub const BUILTIN_CATALOG: &str = include_str!("data/catalog.json");

/// Index of a target inside its mission, in catalog order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TargetId(pub u16);

/// Index of a disguise inside its mission's disguise list.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DisguiseId(pub u16);

/// Index of a mission-specific kill method.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MapMethodId(pub u16);

impl fmt::Display for TargetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for DisguiseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for MapMethodId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Disguise {
    pub name: String,
    #[serde(default)]
    pub suit: bool,
}

/// How the generator builds a target's method pool.
#[derive(Debug, Clone, Copy, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TargetRouting {
    /// Standard, firearm and the target's own map methods.
    #[default]
    Normal,
    /// Only the target's scripted map methods.
    Unique,
}

#[derive(Debug, Clone)]
pub struct Target {
    pub name: String,
    pub keyword: String,
    pub routing: TargetRouting,
    /// Any agent of the mission roster can fill this slot.
    pub interchangeable: bool,
    map_methods: Vec<MapMethodId>,
    tag_overrides: HashMap<RouletteMethod, MethodTags>,
}

impl Target {
    pub fn map_methods(&self) -> &[MapMethodId] {
        &self.map_methods
    }

    pub fn is_unique(&self) -> bool {
        self.routing == TargetRouting::Unique
    }

    fn matches(&self, name: &str) -> bool {
        let name = name.trim();
        self.keyword.eq_ignore_ascii_case(name) || self.name.eq_ignore_ascii_case(name)
    }
}

#[derive(Debug, Clone)]
pub struct MapKillMethod {
    pub name: String,
    pub class: MethodClass,
    pub tags: MethodTags,
    /// Target keywords this method is restricted to; empty means every
    /// ordinary target of the mission.
    pub targets: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct Mission {
    pub codename: String,
    pub title: String,
    pub location: String,
    disguises: Vec<Disguise>,
    targets: Vec<Target>,
    map_methods: Vec<MapKillMethod>,
    agent_roster: Vec<String>,
}

impl Mission {
    pub fn targets(&self) -> &[Target] {
        &self.targets
    }

    pub fn target(&self, id: TargetId) -> Option<&Target> {
        self.targets.get(id.0 as usize)
    }

    pub fn target_ids(&self) -> impl Iterator<Item = TargetId> + '_ {
        (0..self.targets.len()).map(|index| TargetId(index as u16))
    }

    /// Look a target up by keyword or full name.
    pub fn find_target(&self, name: &str) -> Option<TargetId> {
        self.targets
            .iter()
            .position(|target| target.matches(name))
            .map(|index| TargetId(index as u16))
    }

    pub fn disguises(&self) -> &[Disguise] {
        &self.disguises
    }

    pub fn disguise(&self, id: DisguiseId) -> Option<&Disguise> {
        self.disguises.get(id.0 as usize)
    }

    pub fn find_disguise(&self, name: &str) -> Option<DisguiseId> {
        let name = name.trim();
        self.disguises
            .iter()
            .position(|disguise| disguise.name.eq_ignore_ascii_case(name))
            .map(|index| DisguiseId(index as u16))
    }

    pub fn map_method(&self, id: MapMethodId) -> Option<&MapKillMethod> {
        self.map_methods.get(id.0 as usize)
    }

    pub fn map_methods(&self) -> &[MapKillMethod] {
        &self.map_methods
    }

    pub fn agent_roster(&self) -> &[String] {
        &self.agent_roster
    }

    pub fn is_roster_agent(&self, keyword: &str) -> bool {
        let keyword = keyword.trim();
        self.agent_roster
            .iter()
            .any(|agent| agent.eq_ignore_ascii_case(keyword))
    }

    /// Every method a target may be assigned, before ruleset filtering.
    pub fn candidate_methods(&self, target: TargetId) -> Vec<RouletteMethod> {
        match self.target(target) {
            Some(target) => candidate_methods_for(target.routing, &target.map_methods),
            None => Vec::new(),
        }
    }

    pub fn method_name(&self, method: RouletteMethod) -> &str {
        match method {
            RouletteMethod::Standard(standard) => standard.name(),
            RouletteMethod::Firearm(firearm) => firearm.name(),
            RouletteMethod::Map(id) => self
                .map_method(id)
                .map(|method| method.name.as_str())
                .unwrap_or("Unknown Method"),
        }
    }

    pub fn method_class(&self, method: RouletteMethod) -> MethodClass {
        match method {
            RouletteMethod::Standard(_) => MethodClass::Standard,
            RouletteMethod::Firearm(firearm) => firearm.class(),
            RouletteMethod::Map(id) => self
                .map_method(id)
                .map(|method| method.class)
                .unwrap_or(MethodClass::Standard),
        }
    }

    /// Tags of `method` as seen for `target`, honouring per-target overrides.
    pub fn method_tags(&self, target: TargetId, method: RouletteMethod) -> MethodTags {
        if let Some(tags) = self
            .target(target)
            .and_then(|target| target.tag_overrides.get(&method))
        {
            return *tags;
        }
        match method {
            RouletteMethod::Standard(standard) => standard.default_tags(),
            RouletteMethod::Firearm(firearm) => firearm.default_tags(),
            RouletteMethod::Map(id) => self
                .map_method(id)
                .map(|method| method.tags)
                .unwrap_or_default(),
        }
    }

    /// Resolve a method name within the target's own candidate list.
    pub fn find_method(&self, target: TargetId, name: &str) -> Option<RouletteMethod> {
        let name = name.trim();
        self.candidate_methods(target)
            .into_iter()
            .find(|method| self.method_name(*method).eq_ignore_ascii_case(name))
    }

    /// Resolve a method name across every method known to the mission.
    ///
    /// Used for classifying observed kills, which may use a method that the
    /// victim could never have been assigned.
    pub fn find_any_method(&self, name: &str) -> Option<RouletteMethod> {
        let name = name.trim();
        if let Some(standard) = StandardMethod::from_name(name) {
            return Some(RouletteMethod::Standard(standard));
        }
        if let Some(firearm) = FirearmMethod::from_name(name) {
            return Some(RouletteMethod::Firearm(firearm));
        }
        self.map_methods
            .iter()
            .position(|method| method.name.eq_ignore_ascii_case(name))
            .map(|index| RouletteMethod::Map(MapMethodId(index as u16)))
    }

    fn from_record(record: MissionRecord) -> Result<Self, CatalogError> {
        if record.targets.is_empty() {
            return Err(CatalogError::EmptyMission(record.codename));
        }

        let codename = record.codename;
        for (index, target) in record.targets.iter().enumerate() {
            let duplicate = record.targets[..index]
                .iter()
                .any(|other| other.keyword.eq_ignore_ascii_case(&target.keyword));
            if duplicate {
                return Err(CatalogError::DuplicateTarget {
                    mission: codename,
                    target: target.keyword.clone(),
                });
            }
        }

        let map_methods: Vec<MapKillMethod> = record
            .map_methods
            .into_iter()
            .map(|method| MapKillMethod {
                name: method.name,
                class: method.class,
                tags: MethodTags::from_tags(&method.tags),
                targets: method.targets,
            })
            .collect();

        for method in &map_methods {
            for restriction in &method.targets {
                let known = record
                    .targets
                    .iter()
                    .any(|target| target.keyword.eq_ignore_ascii_case(restriction));
                if !known {
                    return Err(CatalogError::UnknownRestriction {
                        mission: codename,
                        method: method.name.clone(),
                        target: restriction.clone(),
                    });
                }
            }
        }

        let mut targets = Vec::with_capacity(record.targets.len());
        for target in record.targets {
            let own_methods: Vec<MapMethodId> = map_methods
                .iter()
                .enumerate()
                .filter(|(_, method)| {
                    let named = method
                        .targets
                        .iter()
                        .any(|keyword| keyword.eq_ignore_ascii_case(&target.keyword));
                    match target.routing {
                        TargetRouting::Unique => named,
                        TargetRouting::Normal => method.targets.is_empty() || named,
                    }
                })
                .map(|(index, _)| MapMethodId(index as u16))
                .collect();

            let candidates = candidate_methods_for(target.routing, &own_methods);
            let mut tag_overrides = HashMap::with_capacity(target.method_tags.len());
            for (method_name, tags) in &target.method_tags {
                let method = candidates
                    .iter()
                    .copied()
                    .find(|method| {
                        method_display_name(*method, &map_methods)
                            .eq_ignore_ascii_case(method_name)
                    })
                    .ok_or_else(|| CatalogError::UnknownOverride {
                        mission: codename.clone(),
                        target: target.keyword.clone(),
                        method: method_name.clone(),
                    })?;
                tag_overrides.insert(method, MethodTags::from_tags(tags));
            }

            targets.push(Target {
                name: target.name,
                keyword: target.keyword,
                routing: target.routing,
                interchangeable: target.interchangeable,
                map_methods: own_methods,
                tag_overrides,
            });
        }

        Ok(Self {
            codename,
            title: record.title,
            location: record.location,
            disguises: record.disguises,
            targets,
            map_methods,
            agent_roster: record.agent_roster,
        })
    }
}

fn candidate_methods_for(routing: TargetRouting, map_methods: &[MapMethodId]) -> Vec<RouletteMethod> {
    let map = map_methods.iter().map(|id| RouletteMethod::Map(*id));
    match routing {
        TargetRouting::Unique => map.collect(),
        TargetRouting::Normal => StandardMethod::ALL
            .iter()
            .map(|method| RouletteMethod::Standard(*method))
            .chain(
                FirearmMethod::ALL
                    .iter()
                    .map(|method| RouletteMethod::Firearm(*method)),
            )
            .chain(map)
            .collect(),
    }
}

fn method_display_name(method: RouletteMethod, map_methods: &[MapKillMethod]) -> &str {
    match method {
        RouletteMethod::Standard(standard) => standard.name(),
        RouletteMethod::Firearm(firearm) => firearm.name(),
        RouletteMethod::Map(id) => map_methods
            .get(id.0 as usize)
            .map(|method| method.name.as_str())
            .unwrap_or(""),
    }
}

#[derive(Debug, Clone, Deserialize)]
struct CatalogData {
    missions: Vec<MissionRecord>,
}

#[derive(Debug, Clone, Deserialize)]
struct MissionRecord {
    codename: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    location: String,
    #[serde(default)]
    disguises: Vec<Disguise>,
    targets: Vec<TargetRecord>,
    #[serde(default)]
    map_methods: Vec<MapMethodRecord>,
    #[serde(default)]
    agent_roster: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct TargetRecord {
    name: String,
    keyword: String,
    #[serde(default)]
    routing: TargetRouting,
    #[serde(default)]
    interchangeable: bool,
    #[serde(default)]
    method_tags: BTreeMap<String, Vec<MethodTag>>,
}

#[derive(Debug, Clone, Deserialize)]
struct MapMethodRecord {
    name: String,
    class: MethodClass,
    #[serde(default)]
    tags: Vec<MethodTag>,
    #[serde(default)]
    targets: Vec<String>,
}

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("failed to parse mission catalog: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("failed to read mission catalog from {path:?}: {source}")]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("duplicate mission codename `{0}`")]
    DuplicateMission(String),
    #[error("mission `{0}` has no targets")]
    EmptyMission(String),
    #[error("duplicate target keyword `{target}` in mission `{mission}`")]
    DuplicateTarget { mission: String, target: String },
    #[error("map method `{method}` in `{mission}` is restricted to unknown target `{target}`")]
    UnknownRestriction {
        mission: String,
        method: String,
        target: String,
    },
    #[error("tag override for `{method}` on `{target}` in `{mission}` names no available method")]
    UnknownOverride {
        mission: String,
        target: String,
        method: String,
    },
}

#[derive(Debug, Clone)]
pub struct Catalog {
    missions: Vec<Arc<Mission>>,
    index: HashMap<String, usize>,
}

impl Catalog {
    pub fn builtin() -> Arc<Self> {
        Self::from_json_str(BUILTIN_CATALOG)
            .map(Arc::new)
            .expect("builtin mission catalog should parse")
    }

    pub fn from_json_str(input: &str) -> Result<Self, CatalogError> {
        let data: CatalogData = serde_json::from_str(input)?;
        Self::from_data(data)
    }

    pub fn from_file(path: &Path) -> Result<Self, CatalogError> {
        let contents = fs::read_to_string(path).map_err(|source| CatalogError::ReadFailed {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&contents)
    }

    fn from_data(data: CatalogData) -> Result<Self, CatalogError> {
        let mut missions = Vec::with_capacity(data.missions.len());
        let mut index = HashMap::new();
        for record in data.missions {
            let key = record.codename.to_ascii_lowercase();
            if index.contains_key(&key) {
                return Err(CatalogError::DuplicateMission(record.codename));
            }
            index.insert(key, missions.len());
            missions.push(Arc::new(Mission::from_record(record)?));
        }
        Ok(Self { missions, index })
    }

    /// Case-insensitive lookup by codename.
    pub fn get(&self, codename: &str) -> Option<&Arc<Mission>> {
        self.index
            .get(&codename.trim().to_ascii_lowercase())
            .and_then(|idx| self.missions.get(*idx))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<Mission>> {
        self.missions.iter()
    }

    pub fn codenames(&self) -> Vec<String> {
        self.missions
            .iter()
            .map(|mission| mission.codename.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.missions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.missions.is_empty()
    }
}

/// Where the active catalog came from; `None` means the embedded copy.
#[derive(Debug, Clone)]
pub struct CatalogMetadata {
    path: Option<PathBuf>,
}

impl CatalogMetadata {
    pub fn new(path: Option<PathBuf>) -> Self {
        Self { path }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }
}

pub fn load_catalog_from_env() -> (Arc<Catalog>, CatalogMetadata) {
    let override_path = env::var("ROULETTE_CATALOG_PATH").ok().map(PathBuf::from);
    let default_path = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("src/data/catalog.json");

    let candidates: Vec<PathBuf> = match override_path {
        Some(ref path) => vec![path.clone()],
        None => vec![default_path.clone()],
    };

    for path in candidates {
        match Catalog::from_file(&path) {
            Ok(catalog) => {
                tracing::info!(
                    target: "roulette::catalog",
                    path = %path.display(),
                    missions = catalog.len(),
                    "catalog.loaded=file"
                );
                return (Arc::new(catalog), CatalogMetadata::new(Some(path)));
            }
            Err(err) => {
                tracing::warn!(
                    target: "roulette::catalog",
                    path = %path.display(),
                    error = %err,
                    "catalog.load_failed"
                );
            }
        }
    }

    let catalog = Catalog::builtin();
    tracing::info!(target: "roulette::catalog", "catalog.loaded=builtin");
    (catalog, CatalogMetadata::new(None))
}

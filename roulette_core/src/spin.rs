//! The live set of per-target conditions for one mission.

use std::{fmt, sync::Arc};

use roulette_schema::{SerializedCondition, SerializedSpin};

use crate::catalog::{Catalog, DisguiseId, Mission, TargetId};
use crate::methods::{KillComplication, KillType, RouletteMethod};

const LIVE_PREFIX: &str = "(Live)";

/// What one target must die to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Condition {
    pub target: TargetId,
    pub method: RouletteMethod,
    pub kill_type: KillType,
    pub complication: KillComplication,
    pub disguise: DisguiseId,
}

impl Condition {
    /// Same method, kill type and disguise. Target and complication are
    /// ignored.
    pub fn same_assignment(&self, other: &Condition) -> bool {
        self.method == other.method
            && self.kill_type == other.kill_type
            && self.disguise == other.disguise
    }

    pub fn requires_live(&self) -> bool {
        self.complication == KillComplication::Live
    }
}

/// Conditions for a mission, in catalog target order.
#[derive(Debug, Clone)]
pub struct Spin {
    mission: Arc<Mission>,
    conditions: Vec<Condition>,
}

impl PartialEq for Spin {
    fn eq(&self, other: &Self) -> bool {
        (Arc::ptr_eq(&self.mission, &other.mission)
            || self.mission.codename == other.mission.codename)
            && self.conditions == other.conditions
    }
}

impl Eq for Spin {}

impl Spin {
    pub(crate) fn new(mission: Arc<Mission>, conditions: Vec<Condition>) -> Self {
        Self {
            mission,
            conditions,
        }
    }

    pub fn mission(&self) -> &Arc<Mission> {
        &self.mission
    }

    pub fn conditions(&self) -> &[Condition] {
        &self.conditions
    }

    pub fn len(&self) -> usize {
        self.conditions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    /// Slot index of the condition for `target`.
    pub fn position(&self, target: TargetId) -> Option<usize> {
        self.conditions
            .iter()
            .position(|condition| condition.target == target)
    }

    pub fn condition(&self, target: TargetId) -> Option<&Condition> {
        self.conditions
            .iter()
            .find(|condition| condition.target == target)
    }

    pub(crate) fn condition_mut(&mut self, target: TargetId) -> Option<&mut Condition> {
        self.conditions
            .iter_mut()
            .find(|condition| condition.target == target)
    }

    pub fn target_keyword(&self, target: TargetId) -> &str {
        self.mission
            .target(target)
            .map(|target| target.keyword.as_str())
            .unwrap_or("")
    }

    /// Method text with its complication and kill type prefixes, e.g.
    /// `(Live) Sil Pistol`.
    pub fn method_label(&self, condition: &Condition) -> String {
        let mut label = String::new();
        if condition.requires_live() {
            label.push_str(LIVE_PREFIX);
            label.push(' ');
        }
        if condition.kill_type != KillType::Any {
            label.push_str(condition.kill_type.short_code());
            label.push(' ');
        }
        label.push_str(self.mission.method_name(condition.method));
        label
    }

    pub fn disguise_name(&self, condition: &Condition) -> &str {
        self.mission
            .disguise(condition.disguise)
            .map(|disguise| disguise.name.as_str())
            .unwrap_or("")
    }

    /// `<keyword>: <method label> / <disguise>`
    pub fn describe(&self, condition: &Condition) -> String {
        format!(
            "{}: {} / {}",
            self.target_keyword(condition.target),
            self.method_label(condition),
            self.disguise_name(condition)
        )
    }

    /// Comma-joined condition entries, the `SpinData` payload.
    pub fn spin_data_text(&self) -> String {
        self.conditions
            .iter()
            .map(|condition| self.describe(condition))
            .collect::<Vec<_>>()
            .join(",")
    }

    pub fn to_serialized(&self) -> SerializedSpin {
        let conditions = self
            .conditions
            .iter()
            .map(|condition| {
                let target = self
                    .mission
                    .target(condition.target)
                    .map(|target| target.name.clone())
                    .unwrap_or_default();
                SerializedCondition::new(
                    target,
                    self.method_label(condition),
                    self.disguise_name(condition),
                )
            })
            .collect();
        SerializedSpin {
            mission: self.mission.codename.clone(),
            conditions,
        }
    }

    /// Rebuild a spin from its persisted name triples.
    ///
    /// Entries that no longer resolve against `catalog` are dropped; the
    /// second value is how many were. Returns `None` when the mission itself
    /// is gone or nothing resolved.
    pub fn from_serialized(catalog: &Catalog, serialized: &SerializedSpin) -> Option<(Self, usize)> {
        let mission = catalog.get(&serialized.mission)?.clone();
        let mut conditions: Vec<Condition> = Vec::with_capacity(serialized.conditions.len());
        let mut dropped = 0;
        for entry in &serialized.conditions {
            let resolved = resolve_condition(&mission, entry)
                .filter(|condition| conditions.iter().all(|c| c.target != condition.target));
            match resolved {
                Some(condition) => conditions.push(condition),
                None => dropped += 1,
            }
        }
        if conditions.is_empty() {
            return None;
        }
        Some((Self::new(mission, conditions), dropped))
    }
}

impl fmt::Display for Spin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.spin_data_text())
    }
}

fn resolve_condition(mission: &Mission, entry: &SerializedCondition) -> Option<Condition> {
    let target = mission.find_target(entry.target())?;
    let disguise = mission.find_disguise(entry.disguise())?;
    let (method, kill_type, complication) = parse_method_label(mission, target, entry.method())?;
    Some(Condition {
        target,
        method,
        kill_type,
        complication,
        disguise,
    })
}

/// Split a method label back into complication, kill type and method.
///
/// Every kill type prefix is tried; the first reading that names a method
/// of the target whose class allows that kill type wins. A bare method name
/// reads as kill type `Any`.
pub(crate) fn parse_method_label(
    mission: &Mission,
    target: TargetId,
    label: &str,
) -> Option<(RouletteMethod, KillType, KillComplication)> {
    let mut rest = label.trim();
    let mut complication = KillComplication::None;
    if let Some(stripped) = strip_prefix_ignore_case(rest, LIVE_PREFIX) {
        complication = KillComplication::Live;
        rest = stripped.trim_start();
    }

    for kill_type in KillType::PREFIXED {
        let Some(remainder) = strip_prefix_ignore_case(rest, kill_type.short_code()) else {
            continue;
        };
        if !remainder.starts_with(' ') {
            continue;
        }
        if let Some(method) = mission.find_method(target, remainder) {
            if mission.method_class(method).allows(kill_type) {
                return Some((method, kill_type, complication));
            }
        }
    }

    mission
        .find_method(target, rest)
        .map(|method| (method, KillType::Any, complication))
}

fn strip_prefix_ignore_case<'a>(value: &'a str, prefix: &str) -> Option<&'a str> {
    if value.len() >= prefix.len()
        && value.is_char_boundary(prefix.len())
        && value[..prefix.len()].eq_ignore_ascii_case(prefix)
    {
        Some(&value[prefix.len()..])
    } else {
        None
    }
}

//! Constrained random spin generation.

use std::sync::Arc;

use rand::{rngs::SmallRng, seq::SliceRandom, Rng, SeedableRng};
use thiserror::Error;

use crate::catalog::{DisguiseId, Mission, TargetId};
use crate::methods::{KillComplication, KillType, MethodClass, RouletteMethod};
use crate::ruleset::Ruleset;
use crate::spin::{Condition, Spin};

pub const DEFAULT_REROLL_LIMIT: u32 = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GeneratorOptions {
    /// Reroll conditions that repeat another target's method, kill type and
    /// disguise.
    pub distinct_conditions: bool,
    pub reroll_limit: u32,
}

impl Default for GeneratorOptions {
    fn default() -> Self {
        Self {
            distinct_conditions: false,
            reroll_limit: DEFAULT_REROLL_LIMIT,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum GenerationFailure {
    #[error("no kill method survives the ruleset")]
    EmptyMethodPool,
    #[error("mission has no disguises")]
    EmptyDisguisePool,
    #[error("no distinct condition found within the reroll limit")]
    NoDistinctCondition,
    #[error("target is not part of the spin")]
    NotInSpin,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GenerationError {
    #[error("no mission selected")]
    NoMission,
    #[error("cannot generate a condition for `{target_name}`: {reason}")]
    Target {
        target: TargetId,
        target_name: String,
        reason: GenerationFailure,
    },
}

impl GenerationError {
    fn target(mission: &Mission, target: TargetId, reason: GenerationFailure) -> Self {
        let target_name = mission
            .target(target)
            .map(|target| target.name.clone())
            .unwrap_or_else(|| format!("target #{target}"));
        GenerationError::Target {
            target,
            target_name,
            reason,
        }
    }

    /// The target generation failed on, if any.
    pub fn target_id(&self) -> Option<TargetId> {
        match self {
            GenerationError::NoMission => None,
            GenerationError::Target { target, .. } => Some(*target),
        }
    }
}

/// Builds spins for a mission under the active ruleset.
#[derive(Debug, Clone)]
pub struct SpinGenerator {
    rng: SmallRng,
    ruleset: Ruleset,
    mission: Option<Arc<Mission>>,
    options: GeneratorOptions,
}

impl Default for SpinGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl SpinGenerator {
    pub fn new() -> Self {
        Self::with_rng(SmallRng::from_entropy())
    }

    pub fn with_seed(seed: u64) -> Self {
        Self::with_rng(SmallRng::seed_from_u64(seed))
    }

    fn with_rng(rng: SmallRng) -> Self {
        Self {
            rng,
            ruleset: Ruleset::default(),
            mission: None,
            options: GeneratorOptions::default(),
        }
    }

    pub fn set_ruleset(&mut self, ruleset: Ruleset) {
        self.ruleset = ruleset;
    }

    pub fn ruleset(&self) -> &Ruleset {
        &self.ruleset
    }

    pub fn ruleset_mut(&mut self) -> &mut Ruleset {
        &mut self.ruleset
    }

    pub fn set_mission(&mut self, mission: Arc<Mission>) {
        self.mission = Some(mission);
    }

    pub fn mission(&self) -> Option<&Arc<Mission>> {
        self.mission.as_ref()
    }

    pub fn set_options(&mut self, options: GeneratorOptions) {
        self.options = options;
    }

    pub fn options(&self) -> GeneratorOptions {
        self.options
    }

    /// Pick one entry uniformly.
    pub fn choose<'a, T>(&mut self, items: &'a [T]) -> Option<&'a T> {
        items.choose(&mut self.rng)
    }

    /// Roll a full spin for the selected mission. All or nothing: on error no
    /// spin is produced.
    pub fn generate(&mut self) -> Result<Spin, GenerationError> {
        let mission = self.mission.clone().ok_or(GenerationError::NoMission)?;
        let mut conditions: Vec<Condition> = Vec::with_capacity(mission.targets().len());
        for target in mission.target_ids() {
            match self.roll_condition(&mission, target, &conditions) {
                Ok(condition) => conditions.push(condition),
                Err(err) => {
                    tracing::warn!(
                        target: "roulette::generator",
                        mission = %mission.codename,
                        error = %err,
                        "spin.generation_failed"
                    );
                    return Err(err);
                }
            }
        }
        let spin = Spin::new(mission, conditions);
        tracing::debug!(
            target: "roulette::generator",
            mission = %spin.mission().codename,
            conditions = spin.len(),
            "spin.generated"
        );
        Ok(spin)
    }

    /// Reroll one target's condition in place. Other conditions are left
    /// alone, and so is `spin` when the roll fails.
    pub fn regenerate_target(
        &mut self,
        spin: &mut Spin,
        target: TargetId,
    ) -> Result<(), GenerationError> {
        let mission = spin.mission().clone();
        if spin.condition(target).is_none() {
            return Err(GenerationError::target(
                &mission,
                target,
                GenerationFailure::NotInSpin,
            ));
        }
        let others: Vec<Condition> = spin
            .conditions()
            .iter()
            .filter(|condition| condition.target != target)
            .copied()
            .collect();
        let rolled = self.roll_condition(&mission, target, &others)?;
        if let Some(slot) = spin.condition_mut(target) {
            *slot = rolled;
        }
        tracing::debug!(
            target: "roulette::generator",
            mission = %mission.codename,
            target_id = %target,
            "spin.target_rerolled"
        );
        Ok(())
    }

    /// Method pool for `target` after ruleset filtering.
    pub fn method_pool(&self, mission: &Mission, target: TargetId) -> Vec<RouletteMethod> {
        mission
            .candidate_methods(target)
            .into_iter()
            .filter(|method| self.ruleset.allows_tags(mission.method_tags(target, *method)))
            .collect()
    }

    fn roll_condition(
        &mut self,
        mission: &Mission,
        target: TargetId,
        accepted: &[Condition],
    ) -> Result<Condition, GenerationError> {
        let pool = self.method_pool(mission, target);
        if pool.is_empty() {
            return Err(GenerationError::target(
                mission,
                target,
                GenerationFailure::EmptyMethodPool,
            ));
        }
        let disguise_count = mission.disguises().len();
        if disguise_count == 0 {
            return Err(GenerationError::target(
                mission,
                target,
                GenerationFailure::EmptyDisguisePool,
            ));
        }

        let attempts = if self.options.distinct_conditions {
            self.options.reroll_limit.max(1)
        } else {
            1
        };
        for _ in 0..attempts {
            let method = pool[self.rng.gen_range(0..pool.len())];
            let class = mission.method_class(method);
            let kill_type = self.roll_kill_type(class);
            let complication = self.roll_complication(class);
            let disguise = DisguiseId(self.rng.gen_range(0..disguise_count) as u16);
            let condition = Condition {
                target,
                method,
                kill_type,
                complication,
                disguise,
            };
            if !self.options.distinct_conditions
                || !accepted.iter().any(|other| other.same_assignment(&condition))
            {
                return Ok(condition);
            }
        }
        Err(GenerationError::target(
            mission,
            target,
            GenerationFailure::NoDistinctCondition,
        ))
    }

    fn roll_kill_type(&mut self, class: MethodClass) -> KillType {
        if !class.has_variance() {
            return KillType::Any;
        }
        let ruleset = self.ruleset;
        let legal: Vec<KillType> = class
            .kill_types()
            .iter()
            .copied()
            .filter(|kill_type| match kill_type {
                KillType::Melee => ruleset.melee_kill_types,
                KillType::Thrown => ruleset.thrown_kill_types,
                _ => true,
            })
            .collect();
        legal.choose(&mut self.rng).copied().unwrap_or(KillType::Any)
    }

    fn roll_complication(&mut self, class: MethodClass) -> KillComplication {
        let ruleset = &self.ruleset;
        let eligible = ruleset.live_complications
            && (!ruleset.live_complications_exclude_standard || class != MethodClass::Standard);
        if !eligible {
            return KillComplication::None;
        }
        let chance = ruleset.live_complication_chance;
        if self.rng.gen_range(0..100u8) < chance {
            KillComplication::Live
        } else {
            KillComplication::None
        }
    }
}

//! Kill validation: reconciles observed kills against the active spin.

use std::fmt;

use crate::catalog::{DisguiseId, TargetId};
use crate::methods::{KillType, RouletteMethod};
use crate::spin::{Condition, Spin};

/// Verdict on the method part of a condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum MethodConfirmation {
    #[default]
    Incomplete = 0,
    Unknown = 1,
    Invalid = 2,
    Valid = 3,
}

impl MethodConfirmation {
    pub fn as_int(self) -> u8 {
        self as u8
    }

    /// Valid and Invalid stick until the next spin.
    pub fn is_terminal(self) -> bool {
        matches!(self, MethodConfirmation::Valid | MethodConfirmation::Invalid)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct KillConfirmation {
    pub correct_method: MethodConfirmation,
    pub correct_disguise: bool,
    /// Roster agent that filled an interchangeable slot.
    pub specific_target: Option<String>,
}

/// A classified kill: the method the engine saw and how it was dealt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObservedKill {
    pub method: RouletteMethod,
    pub kill_type: KillType,
}

impl ObservedKill {
    pub fn new(method: RouletteMethod, kill_type: KillType) -> Self {
        Self { method, kill_type }
    }
}

/// Who died.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KillSubject {
    Target(TargetId),
    /// A specific agent keyword from the mission roster.
    Agent(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KillOutcome {
    /// Confirmation at this slot index was written.
    Recorded(usize),
    /// The slot already held a terminal verdict; nothing changed.
    AlreadyFinal(usize),
    /// No slot matches the subject.
    Ignored,
}

/// One confirmation per spin condition, in spin order.
#[derive(Debug, Clone, Default)]
pub struct KillValidator {
    confirmations: Vec<KillConfirmation>,
    last_disguise: Option<DisguiseId>,
}

impl KillValidator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clear every confirmation and size the set for `len` conditions.
    pub fn reset(&mut self, len: usize) {
        self.confirmations.clear();
        self.confirmations.resize(len, KillConfirmation::default());
    }

    /// Reallocate only when the condition count changed.
    pub fn sync_shape(&mut self, spin: &Spin) {
        if self.confirmations.len() != spin.len() {
            self.reset(spin.len());
        }
    }

    /// Back to Incomplete for one slot, e.g. after its condition was rerolled.
    pub fn clear_slot(&mut self, index: usize) {
        if let Some(slot) = self.confirmations.get_mut(index) {
            *slot = KillConfirmation::default();
        }
    }

    pub fn confirmations(&self) -> &[KillConfirmation] {
        &self.confirmations
    }

    /// Current verdict for `target`; Incomplete until a kill is recorded.
    pub fn confirmation(&self, spin: &Spin, target: TargetId) -> KillConfirmation {
        spin.position(target)
            .and_then(|index| self.confirmations.get(index))
            .cloned()
            .unwrap_or_default()
    }

    pub fn on_disguise_change(&mut self, disguise: Option<DisguiseId>) {
        self.last_disguise = disguise;
    }

    pub fn last_disguise(&self) -> Option<DisguiseId> {
        self.last_disguise
    }

    /// Judge one kill. `disguise` falls back to the last reported disguise;
    /// `live_ok` is false when the victim was pacified first.
    pub fn record_kill(
        &mut self,
        spin: &Spin,
        subject: &KillSubject,
        observed: Option<ObservedKill>,
        disguise: Option<DisguiseId>,
        live_ok: bool,
    ) -> KillOutcome {
        self.sync_shape(spin);

        let Some((index, specific)) = self.locate(spin, subject) else {
            tracing::warn!(
                target: "roulette::validation",
                mission = %spin.mission().codename,
                subject = ?subject,
                "kill.ignored"
            );
            return KillOutcome::Ignored;
        };
        let condition = spin.conditions()[index];
        let slot = &mut self.confirmations[index];
        if slot.correct_method.is_terminal() {
            return KillOutcome::AlreadyFinal(index);
        }

        let disguise = disguise.or(self.last_disguise);
        slot.correct_method = judge(&condition, observed, live_ok);
        slot.correct_disguise = disguise == Some(condition.disguise);
        if specific.is_some() {
            slot.specific_target = specific;
        }

        tracing::debug!(
            target: "roulette::validation",
            target_keyword = spin.target_keyword(condition.target),
            verdict = ?slot.correct_method,
            correct_disguise = slot.correct_disguise,
            "kill.recorded"
        );
        KillOutcome::Recorded(index)
    }

    fn locate(&self, spin: &Spin, subject: &KillSubject) -> Option<(usize, Option<String>)> {
        match subject {
            KillSubject::Target(target) => spin.position(*target).map(|index| (index, None)),
            KillSubject::Agent(keyword) => {
                let mission = spin.mission();
                if !mission.is_roster_agent(keyword) {
                    return None;
                }
                let keyword = mission
                    .agent_roster()
                    .iter()
                    .find(|agent| agent.eq_ignore_ascii_case(keyword.trim()))?
                    .clone();

                let already = self.confirmations.iter().position(|slot| {
                    slot.specific_target
                        .as_deref()
                        .is_some_and(|agent| agent.eq_ignore_ascii_case(&keyword))
                });
                if let Some(index) = already {
                    return Some((index, Some(keyword)));
                }

                spin.conditions()
                    .iter()
                    .enumerate()
                    .find(|(index, condition)| {
                        let interchangeable = mission
                            .target(condition.target)
                            .is_some_and(|target| target.interchangeable);
                        let open = self
                            .confirmations
                            .get(*index)
                            .is_some_and(|slot| {
                                !slot.correct_method.is_terminal() && slot.specific_target.is_none()
                            });
                        interchangeable && open
                    })
                    .map(|(index, _)| (index, Some(keyword)))
            }
        }
    }

    /// `<keyword>:<method>:<disguise>:<specific>` per condition, comma-joined.
    pub fn kill_validation_text(&self, spin: &Spin) -> String {
        spin.conditions()
            .iter()
            .enumerate()
            .map(|(index, condition)| {
                let confirmation = self.confirmations.get(index).cloned().unwrap_or_default();
                format!(
                    "{}:{}:{}:{}",
                    spin.target_keyword(condition.target),
                    confirmation.correct_method.as_int(),
                    u8::from(confirmation.correct_disguise),
                    confirmation.specific_target.as_deref().unwrap_or("")
                )
            })
            .collect::<Vec<_>>()
            .join(",")
    }
}

fn judge(condition: &Condition, observed: Option<ObservedKill>, live_ok: bool) -> MethodConfirmation {
    if condition.requires_live() && !live_ok {
        return MethodConfirmation::Invalid;
    }
    let Some(observed) = observed else {
        return MethodConfirmation::Unknown;
    };
    if !condition.method.accepts(observed.method) {
        return MethodConfirmation::Invalid;
    }
    if condition.method != observed.method || condition.kill_type == KillType::Any {
        return MethodConfirmation::Valid;
    }
    if observed.kill_type == KillType::Any {
        return MethodConfirmation::Unknown;
    }
    if observed.kill_type == condition.kill_type {
        MethodConfirmation::Valid
    } else {
        MethodConfirmation::Invalid
    }
}

impl fmt::Display for MethodConfirmation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            MethodConfirmation::Incomplete => "Incomplete",
            MethodConfirmation::Unknown => "Unknown",
            MethodConfirmation::Invalid => "Invalid",
            MethodConfirmation::Valid => "Valid",
        };
        f.write_str(label)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Catalog;
    use crate::methods::{FirearmMethod, KillComplication, StandardMethod};

    fn paris_spin() -> Spin {
        let catalog = Catalog::builtin();
        let paris = catalog.get("Paris").expect("paris").clone();
        let conditions = vec![
            Condition {
                target: TargetId(0),
                method: RouletteMethod::Firearm(FirearmMethod::Pistol),
                kill_type: KillType::Silenced,
                complication: KillComplication::Live,
                disguise: DisguiseId(0),
            },
            Condition {
                target: TargetId(1),
                method: RouletteMethod::Standard(StandardMethod::Drowning),
                kill_type: KillType::Any,
                complication: KillComplication::None,
                disguise: DisguiseId(2),
            },
        ];
        Spin::new(paris, conditions)
    }

    fn pistol(kill_type: KillType) -> Option<ObservedKill> {
        Some(ObservedKill::new(
            RouletteMethod::Firearm(FirearmMethod::Pistol),
            kill_type,
        ))
    }

    #[test]
    fn untouched_targets_read_incomplete() {
        let spin = paris_spin();
        let validator = KillValidator::new();
        assert_eq!(
            validator.confirmation(&spin, TargetId(1)),
            KillConfirmation::default()
        );
        assert_eq!(MethodConfirmation::default().as_int(), 0);
    }

    #[test]
    fn exact_kill_is_valid_with_correct_disguise() {
        let spin = paris_spin();
        let mut validator = KillValidator::new();
        let outcome = validator.record_kill(
            &spin,
            &KillSubject::Target(TargetId(0)),
            pistol(KillType::Silenced),
            Some(DisguiseId(0)),
            true,
        );
        assert_eq!(outcome, KillOutcome::Recorded(0));
        let confirmation = validator.confirmation(&spin, TargetId(0));
        assert_eq!(confirmation.correct_method, MethodConfirmation::Valid);
        assert!(confirmation.correct_disguise);
    }

    #[test]
    fn wrong_kill_type_or_method_is_invalid() {
        let spin = paris_spin();
        let mut validator = KillValidator::new();
        validator.record_kill(
            &spin,
            &KillSubject::Target(TargetId(0)),
            pistol(KillType::Loud),
            None,
            true,
        );
        assert_eq!(
            validator.confirmation(&spin, TargetId(0)).correct_method,
            MethodConfirmation::Invalid
        );

        validator.record_kill(
            &spin,
            &KillSubject::Target(TargetId(1)),
            Some(ObservedKill::new(
                RouletteMethod::Standard(StandardMethod::Fall),
                KillType::Any,
            )),
            None,
            true,
        );
        assert_eq!(
            validator.confirmation(&spin, TargetId(1)).correct_method,
            MethodConfirmation::Invalid
        );
    }

    #[test]
    fn pacified_live_target_is_invalid() {
        let spin = paris_spin();
        let mut validator = KillValidator::new();
        validator.record_kill(
            &spin,
            &KillSubject::Target(TargetId(0)),
            pistol(KillType::Silenced),
            Some(DisguiseId(0)),
            false,
        );
        assert_eq!(
            validator.confirmation(&spin, TargetId(0)).correct_method,
            MethodConfirmation::Invalid
        );
    }

    #[test]
    fn unknown_is_replaced_by_a_later_classification() {
        let spin = paris_spin();
        let mut validator = KillValidator::new();
        let subject = KillSubject::Target(TargetId(0));
        validator.record_kill(&spin, &subject, None, None, true);
        assert_eq!(
            validator.confirmation(&spin, TargetId(0)).correct_method,
            MethodConfirmation::Unknown
        );
        validator.record_kill(&spin, &subject, pistol(KillType::Any), None, true);
        assert_eq!(
            validator.confirmation(&spin, TargetId(0)).correct_method,
            MethodConfirmation::Unknown
        );
        validator.record_kill(&spin, &subject, pistol(KillType::Silenced), None, true);
        assert_eq!(
            validator.confirmation(&spin, TargetId(0)).correct_method,
            MethodConfirmation::Valid
        );
    }

    #[test]
    fn clearing_a_slot_leaves_the_others() {
        let spin = paris_spin();
        let mut validator = KillValidator::new();
        validator.reset(spin.len());
        let novikov = spin.conditions()[0].target;
        let dalia = spin.conditions()[1].target;
        validator.record_kill(&spin, &KillSubject::Target(novikov), None, None, true);
        validator.record_kill(&spin, &KillSubject::Target(dalia), None, None, true);

        validator.clear_slot(0);
        validator.clear_slot(7);
        assert_eq!(validator.confirmation(&spin, novikov), KillConfirmation::default());
        assert_eq!(
            validator.confirmation(&spin, dalia).correct_method,
            MethodConfirmation::Unknown
        );
    }

    #[test]
    fn terminal_verdicts_are_idempotent() {
        let spin = paris_spin();
        let mut validator = KillValidator::new();
        let subject = KillSubject::Target(TargetId(1));
        let drowning = Some(ObservedKill::new(
            RouletteMethod::Standard(StandardMethod::Drowning),
            KillType::Any,
        ));
        validator.record_kill(&spin, &subject, drowning, Some(DisguiseId(2)), true);
        let settled = validator.confirmation(&spin, TargetId(1));

        let outcome = validator.record_kill(&spin, &subject, pistol(KillType::Loud), None, false);
        assert_eq!(outcome, KillOutcome::AlreadyFinal(1));
        assert_eq!(validator.confirmation(&spin, TargetId(1)), settled);
    }

    #[test]
    fn disguise_falls_back_to_last_change() {
        let spin = paris_spin();
        let mut validator = KillValidator::new();
        validator.on_disguise_change(Some(DisguiseId(2)));
        validator.record_kill(
            &spin,
            &KillSubject::Target(TargetId(1)),
            Some(ObservedKill::new(
                RouletteMethod::Standard(StandardMethod::Drowning),
                KillType::Any,
            )),
            None,
            true,
        );
        assert!(validator.confirmation(&spin, TargetId(1)).correct_disguise);
    }

    #[test]
    fn generic_elimination_accepts_family() {
        let catalog = Catalog::builtin();
        let paris = catalog.get("Paris").expect("paris").clone();
        let spin = Spin::new(
            paris,
            vec![Condition {
                target: TargetId(0),
                method: RouletteMethod::Firearm(FirearmMethod::PistolElimination),
                kill_type: KillType::Any,
                complication: KillComplication::None,
                disguise: DisguiseId(0),
            }],
        );
        let mut validator = KillValidator::new();
        validator.record_kill(
            &spin,
            &KillSubject::Target(TargetId(0)),
            pistol(KillType::Loud),
            None,
            true,
        );
        assert_eq!(
            validator.confirmation(&spin, TargetId(0)).correct_method,
            MethodConfirmation::Valid
        );
    }

    #[test]
    fn kills_outside_the_spin_are_ignored() {
        let spin = paris_spin();
        let mut validator = KillValidator::new();
        let outcome = validator.record_kill(
            &spin,
            &KillSubject::Agent("Davenport".to_string()),
            pistol(KillType::Silenced),
            None,
            true,
        );
        assert_eq!(outcome, KillOutcome::Ignored);
        assert!(validator
            .confirmations()
            .iter()
            .all(|slot| *slot == KillConfirmation::default()));
    }

    #[test]
    fn roster_agents_fill_interchangeable_slots() {
        let catalog = Catalog::builtin();
        let berlin = catalog.get("Berlin").expect("berlin").clone();
        let conditions = berlin
            .target_ids()
            .map(|target| Condition {
                target,
                method: RouletteMethod::Standard(StandardMethod::FiberWire),
                kill_type: KillType::Any,
                complication: KillComplication::None,
                disguise: DisguiseId(0),
            })
            .collect();
        let spin = Spin::new(berlin, conditions);
        let mut validator = KillValidator::new();
        let wire = Some(ObservedKill::new(
            RouletteMethod::Standard(StandardMethod::FiberWire),
            KillType::Any,
        ));

        let first = validator.record_kill(
            &spin,
            &KillSubject::Agent("davenport".to_string()),
            wire,
            Some(DisguiseId(0)),
            true,
        );
        assert_eq!(first, KillOutcome::Recorded(0));
        let second = validator.record_kill(
            &spin,
            &KillSubject::Agent("Rhodes".to_string()),
            wire,
            Some(DisguiseId(0)),
            true,
        );
        assert_eq!(second, KillOutcome::Recorded(1));
        let again = validator.record_kill(
            &spin,
            &KillSubject::Agent("Davenport".to_string()),
            None,
            None,
            true,
        );
        assert_eq!(again, KillOutcome::AlreadyFinal(0));

        insta::assert_snapshot!(
            validator.kill_validation_text(&spin),
            @"Agent1:3:1:Davenport,Agent2:3:1:Rhodes,Agent3:0:0:,Agent4:0:0:,Agent5:0:0:"
        );
    }

    #[test]
    fn kill_validation_text_encodes_verdicts() {
        let spin = paris_spin();
        let mut validator = KillValidator::new();
        validator.sync_shape(&spin);
        validator.record_kill(
            &spin,
            &KillSubject::Target(TargetId(0)),
            pistol(KillType::Loud),
            Some(DisguiseId(0)),
            true,
        );
        insta::assert_snapshot!(
            validator.kill_validation_text(&spin),
            @"Novikov:2:1:,Dalia:0:0:"
        );
    }
}

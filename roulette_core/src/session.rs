//! Shared roulette state behind one reader/writer lock.
//!
//! Every mutation takes the write guard, builds its outbound messages while
//! holding it, and sends them only after the guard is dropped.

use std::sync::Arc;

use parking_lot::RwLock;
use roulette_runtime::{CommandPayload, MissionNavigation, OutboundMessage};
use thiserror::Error;

use crate::catalog::{Catalog, Mission};
use crate::edit::EditError;
use crate::generator::{GenerationError, GeneratorOptions, SpinGenerator};
use crate::history::{SpinHistory, DEFAULT_HISTORY_CAPACITY};
use crate::ingest::{GameplayIngest, KillEvent, MissionBoundary};
use crate::methods::KillComplication;
use crate::outbound::{
    auto_spin_message, kill_validation_message, mission_complete_message, mission_start_message,
    missions_message, spin_data_message, OutboundSender,
};
use crate::ruleset::{Ruleset, RulesetPresets, UnknownToggle};
use crate::settings::RouletteSettings;
use crate::spin::Spin;
use crate::validation::{KillConfirmation, KillOutcome, KillSubject, KillValidator, ObservedKill};

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("unknown mission `{0}`")]
    UnknownMission(String),
    #[error("no mission selected")]
    NoMission,
    #[error("no active spin")]
    NoActiveSpin,
    #[error("spin history is empty")]
    HistoryEmpty,
    #[error("mission pool is empty")]
    EmptyMissionPool,
    #[error("unknown ruleset preset `{0}`")]
    UnknownPreset(String),
    #[error(transparent)]
    Generation(#[from] GenerationError),
    #[error(transparent)]
    Edit(#[from] EditError),
    #[error(transparent)]
    Toggle(#[from] UnknownToggle),
}

#[derive(Debug)]
struct SessionState {
    generator: SpinGenerator,
    mission: Option<Arc<Mission>>,
    spin: Option<Spin>,
    /// The active spin already sits on top of the history stack.
    spin_archived: bool,
    validator: KillValidator,
    history: SpinHistory,
    history_enabled: bool,
    mission_pool: Vec<String>,
    auto_spin: bool,
    in_mission: bool,
}

impl SessionState {
    fn install_spin(&mut self, spin: Spin) -> Vec<OutboundMessage> {
        self.mission = Some(spin.mission().clone());
        self.generator.set_mission(spin.mission().clone());
        self.validator.reset(spin.len());
        self.spin_archived = false;
        let messages = vec![
            spin_data_message(&spin),
            kill_validation_message(&spin, &self.validator),
        ];
        self.spin = Some(spin);
        messages
    }

    fn archive_current(&mut self) {
        if self.spin_archived {
            return;
        }
        if let Some(spin) = &self.spin {
            self.history.push(spin.clone());
            self.spin_archived = true;
        }
    }

    /// Roll a spin for `mission` without touching the active one.
    fn generate_for(&mut self, mission: Arc<Mission>) -> Result<Spin, GenerationError> {
        let previous = self.generator.mission().cloned();
        self.generator.set_mission(mission);
        let rolled = self.generator.generate();
        if rolled.is_err() {
            if let Some(previous) = previous {
                self.generator.set_mission(previous);
            }
        }
        rolled
    }

    /// Generate, archive the old spin if history is on, then install.
    fn replace_spin(&mut self, mission: Arc<Mission>) -> Result<Vec<OutboundMessage>, GenerationError> {
        let spin = self.generate_for(mission)?;
        if self.history_enabled {
            self.archive_current();
        }
        Ok(self.install_spin(spin))
    }

    fn validation_message(&self) -> Option<OutboundMessage> {
        self.spin
            .as_ref()
            .map(|spin| kill_validation_message(spin, &self.validator))
    }

    fn spin_mut(&mut self) -> Result<&mut Spin, SessionError> {
        self.spin.as_mut().ok_or(SessionError::NoActiveSpin)
    }
}

/// The roulette state object: catalog, ruleset, mission, spin,
/// confirmations, history and mission pool.
#[derive(Debug)]
pub struct RouletteSession {
    catalog: Arc<Catalog>,
    presets: Arc<RulesetPresets>,
    state: RwLock<SessionState>,
    outbound: OutboundSender,
}

impl RouletteSession {
    pub fn new(catalog: Arc<Catalog>, presets: Arc<RulesetPresets>, outbound: OutboundSender) -> Self {
        let mission_pool = catalog.codenames();
        Self {
            catalog,
            presets,
            state: RwLock::new(SessionState {
                generator: SpinGenerator::new(),
                mission: None,
                spin: None,
                spin_archived: false,
                validator: KillValidator::new(),
                history: SpinHistory::with_capacity(DEFAULT_HISTORY_CAPACITY),
                history_enabled: true,
                mission_pool,
                auto_spin: false,
                in_mission: false,
            }),
            outbound,
        }
    }

    /// Replace the generator, keeping the current ruleset.
    pub fn with_generator(self, mut generator: SpinGenerator) -> Self {
        {
            let mut state = self.state.write();
            generator.set_ruleset(*state.generator.ruleset());
            state.generator = generator;
        }
        self
    }

    pub fn with_history_capacity(self, capacity: usize) -> Self {
        {
            let mut state = self.state.write();
            let mut history = SpinHistory::with_capacity(capacity);
            for spin in state.history.iter() {
                history.push(spin.clone());
            }
            state.history = history;
        }
        self
    }

    pub fn catalog(&self) -> &Arc<Catalog> {
        &self.catalog
    }

    pub fn presets(&self) -> &Arc<RulesetPresets> {
        &self.presets
    }

    fn emit(&self, messages: Vec<OutboundMessage>) {
        self.outbound.send_all(messages);
    }

    fn mission_by_codename(&self, codename: &str) -> Result<Arc<Mission>, SessionError> {
        self.catalog
            .get(codename)
            .cloned()
            .ok_or_else(|| SessionError::UnknownMission(codename.trim().to_string()))
    }

    // Spin lifecycle

    pub fn select_mission(&self, codename: &str) -> Result<(), SessionError> {
        let mission = self.mission_by_codename(codename)?;
        let messages = {
            let mut state = self.state.write();
            state.replace_spin(mission.clone())?
        };
        tracing::info!(
            target: "roulette::session",
            mission = %mission.codename,
            "session.mission_selected"
        );
        self.emit(messages);
        Ok(())
    }

    /// Roll a new spin for the current mission.
    pub fn respin(&self) -> Result<(), SessionError> {
        let messages = {
            let mut state = self.state.write();
            let mission = state.mission.clone().ok_or(SessionError::NoMission)?;
            state.replace_spin(mission)?
        };
        tracing::debug!(target: "roulette::session", "session.respun");
        self.emit(messages);
        Ok(())
    }

    pub fn navigate(&self, navigation: MissionNavigation) -> Result<(), SessionError> {
        if navigation == MissionNavigation::Respin {
            return self.respin();
        }
        let codename = {
            let mut state = self.state.write();
            if state.mission_pool.is_empty() {
                return Err(SessionError::EmptyMissionPool);
            }
            let pool = state.mission_pool.clone();
            let current = state.mission.as_ref().and_then(|mission| {
                pool.iter()
                    .position(|codename| codename.eq_ignore_ascii_case(&mission.codename))
            });
            let len = pool.len();
            let index = match (navigation, current) {
                (MissionNavigation::Next, Some(index)) => (index + 1) % len,
                (MissionNavigation::Next, None) => 0,
                (MissionNavigation::Prev, Some(index)) => (index + len - 1) % len,
                (MissionNavigation::Prev, None) => len - 1,
                _ => {
                    let indices: Vec<usize> = (0..len).collect();
                    state.generator.choose(&indices).copied().unwrap_or(0)
                }
            };
            pool[index].clone()
        };
        tracing::debug!(
            target: "roulette::session",
            navigation = %navigation.message_kind(),
            mission = %codename,
            "session.navigated"
        );
        self.select_mission(&codename)
    }

    /// Pop the last archived spin and make it active again.
    pub fn previous_spin(&self) -> Result<(), SessionError> {
        let messages = {
            let mut state = self.state.write();
            let spin = state.history.pop().ok_or(SessionError::HistoryEmpty)?;
            tracing::info!(
                target: "roulette::session",
                mission = %spin.mission().codename,
                remaining = state.history.len(),
                "session.previous_spin"
            );
            state.install_spin(spin)
        };
        self.emit(messages);
        Ok(())
    }

    pub fn reroll(&self, target: &str) -> Result<(), SessionError> {
        let messages = {
            let mut state = self.state.write();
            let state = &mut *state;
            let spin = state.spin.as_mut().ok_or(SessionError::NoActiveSpin)?;
            let target = spin.resolve_target(target)?;
            state.generator.regenerate_target(spin, target)?;
            state.validator.sync_shape(spin);
            if let Some(index) = spin.position(target) {
                state.validator.clear_slot(index);
            }
            vec![
                spin_data_message(spin),
                kill_validation_message(spin, &state.validator),
            ]
        };
        self.emit(messages);
        Ok(())
    }

    // Manual edits

    fn edit_spin<F>(&self, target: &str, edit: F) -> Result<(), SessionError>
    where
        F: FnOnce(&mut Spin, crate::catalog::TargetId) -> Result<(), EditError>,
    {
        let message = {
            let mut state = self.state.write();
            let spin = state.spin_mut()?;
            let target_id = spin.resolve_target(target)?;
            if let Err(err) = edit(spin, target_id) {
                tracing::debug!(
                    target: "roulette::session",
                    target_name = target,
                    error = %err,
                    "session.edit_rejected"
                );
                return Err(err.into());
            }
            spin_data_message(spin)
        };
        self.emit(vec![message]);
        Ok(())
    }

    pub fn set_method(&self, target: &str, method: &str) -> Result<(), SessionError> {
        self.edit_spin(target, |spin, id| spin.set_method_by_name(id, method))
    }

    pub fn set_kill_type(&self, target: &str, kill_type: &str) -> Result<(), SessionError> {
        self.edit_spin(target, |spin, id| spin.set_kill_type_by_code(id, kill_type))
    }

    pub fn set_disguise(&self, target: &str, disguise: &str) -> Result<(), SessionError> {
        self.edit_spin(target, |spin, id| spin.set_disguise_by_name(id, disguise))
    }

    pub fn set_complication(
        &self,
        target: &str,
        complication: KillComplication,
    ) -> Result<(), SessionError> {
        self.edit_spin(target, |spin, id| spin.set_complication(id, complication))
    }

    // Ruleset

    pub fn ruleset(&self) -> Ruleset {
        *self.state.read().generator.ruleset()
    }

    /// Preset id the active ruleset matches, or `Custom`.
    pub fn ruleset_label(&self) -> String {
        let ruleset = self.ruleset();
        self.presets.label_for(&ruleset).to_string()
    }

    pub fn set_ruleset(&self, ruleset: Ruleset) {
        let ruleset = ruleset.with_live_chance(ruleset.live_complication_chance);
        self.state.write().generator.set_ruleset(ruleset);
        tracing::info!(
            target: "roulette::session",
            ruleset = %self.ruleset_label(),
            "session.ruleset_changed"
        );
    }

    pub fn select_ruleset(&self, preset: &str) -> Result<(), SessionError> {
        let rules = self
            .presets
            .get(preset)
            .map(|preset| preset.rules)
            .ok_or_else(|| SessionError::UnknownPreset(preset.trim().to_string()))?;
        self.set_ruleset(rules);
        Ok(())
    }

    pub fn set_toggle(&self, key: &str, enabled: bool) -> Result<(), SessionError> {
        self.state
            .write()
            .generator
            .ruleset_mut()
            .set_toggle(key, enabled)?;
        Ok(())
    }

    pub fn set_live_chance(&self, chance: u8) {
        self.state
            .write()
            .generator
            .ruleset_mut()
            .set_live_complication_chance(chance);
    }

    pub fn set_generator_options(&self, options: GeneratorOptions) {
        self.state.write().generator.set_options(options);
    }

    // Mission pool and toggles

    pub fn mission_pool(&self) -> Vec<String> {
        self.state.read().mission_pool.clone()
    }

    /// Replace the pool. Unknown codenames are dropped; an empty result is an
    /// error and leaves the pool unchanged.
    pub fn set_mission_pool(&self, missions: &[String]) -> Result<(), SessionError> {
        let pool = self.resolve_pool(missions);
        if pool.is_empty() {
            return Err(SessionError::EmptyMissionPool);
        }
        let message = {
            let mut state = self.state.write();
            state.mission_pool = pool;
            missions_message(&state.mission_pool)
        };
        self.emit(vec![message]);
        Ok(())
    }

    fn resolve_pool(&self, missions: &[String]) -> Vec<String> {
        let mut pool: Vec<String> = Vec::with_capacity(missions.len());
        for name in missions {
            match self.catalog.get(name) {
                Some(mission) => {
                    if !pool.contains(&mission.codename) {
                        pool.push(mission.codename.clone());
                    }
                }
                None => tracing::warn!(
                    target: "roulette::session",
                    mission = %name,
                    "session.pool_entry_unknown"
                ),
            }
        }
        pool
    }

    pub fn auto_spin(&self) -> bool {
        self.state.read().auto_spin
    }

    /// Set auto spin, or flip it when `enabled` is `None`. Returns the new
    /// value.
    pub fn set_auto_spin(&self, enabled: Option<bool>) -> bool {
        let value = {
            let mut state = self.state.write();
            state.auto_spin = enabled.unwrap_or(!state.auto_spin);
            state.auto_spin
        };
        self.emit(vec![auto_spin_message(value)]);
        value
    }

    pub fn set_history_enabled(&self, enabled: bool) {
        self.state.write().history_enabled = enabled;
    }

    // Reads

    pub fn current_spin(&self) -> Option<Spin> {
        self.state.read().spin.clone()
    }

    pub fn current_mission(&self) -> Option<String> {
        self.state
            .read()
            .mission
            .as_ref()
            .map(|mission| mission.codename.clone())
    }

    pub fn confirmations(&self) -> Vec<KillConfirmation> {
        self.state.read().validator.confirmations().to_vec()
    }

    /// Confirmation for a target named by keyword or full name.
    pub fn confirmation(&self, target: &str) -> Option<KillConfirmation> {
        let state = self.state.read();
        let spin = state.spin.as_ref()?;
        let target = spin.mission().find_target(target)?;
        spin.condition(target)?;
        Some(state.validator.confirmation(spin, target))
    }

    pub fn history_len(&self) -> usize {
        self.state.read().history.len()
    }

    pub fn in_mission(&self) -> bool {
        self.state.read().in_mission
    }

    pub fn spin_data_text(&self) -> Option<String> {
        self.state.read().spin.as_ref().map(Spin::spin_data_text)
    }

    pub fn kill_validation_text(&self) -> Option<String> {
        let state = self.state.read();
        state
            .spin
            .as_ref()
            .map(|spin| state.validator.kill_validation_text(spin))
    }

    /// Messages describing the full current state, for a newly connected
    /// companion.
    pub fn state_messages(&self) -> Vec<OutboundMessage> {
        let state = self.state.read();
        let mut messages = vec![
            missions_message(&state.mission_pool),
            auto_spin_message(state.auto_spin),
        ];
        if let Some(spin) = &state.spin {
            messages.push(spin_data_message(spin));
            messages.push(kill_validation_message(spin, &state.validator));
        }
        messages
    }

    // Persistence

    pub fn settings(&self) -> RouletteSettings {
        let state = self.state.read();
        RouletteSettings {
            ruleset: *state.generator.ruleset(),
            mission_pool: state.mission_pool.clone(),
            spin_history: state.history.to_serialized(),
            history_enabled: state.history_enabled,
            distinct_conditions: state.generator.options().distinct_conditions,
            auto_spin: state.auto_spin,
            current_spin: state.spin.as_ref().map(Spin::to_serialized),
        }
    }

    /// Apply persisted settings. Stale entries are dropped; returns how many.
    pub fn apply_settings(&self, settings: &RouletteSettings) -> usize {
        let mut pool = self.resolve_pool(&settings.mission_pool);
        if pool.is_empty() {
            pool = self.catalog.codenames();
        }
        let current = settings
            .current_spin
            .as_ref()
            .and_then(|serialized| Spin::from_serialized(&self.catalog, serialized));

        let (messages, dropped) = {
            let mut state = self.state.write();
            let capacity = state.history.capacity();
            let (history, mut dropped) =
                SpinHistory::from_serialized(&self.catalog, &settings.spin_history, capacity);
            state.history = history;
            state.history_enabled = settings.history_enabled;
            state.auto_spin = settings.auto_spin;
            let ruleset = settings
                .ruleset
                .with_live_chance(settings.ruleset.live_complication_chance);
            state.generator.set_ruleset(ruleset);
            let options = GeneratorOptions {
                distinct_conditions: settings.distinct_conditions,
                ..state.generator.options()
            };
            state.generator.set_options(options);
            state.mission_pool = pool;

            let mut messages = vec![missions_message(&state.mission_pool)];
            if let Some((spin, lost)) = current {
                dropped += lost;
                messages.extend(state.install_spin(spin));
                // A completed spin is saved both on top of history and as current.
                state.spin_archived = state.spin.is_some() && state.history.peek() == state.spin.as_ref();
            }
            (messages, dropped)
        };

        tracing::info!(
            target: "roulette::session",
            ruleset = %self.ruleset_label(),
            history = self.history_len(),
            dropped,
            "session.settings_applied"
        );
        self.emit(messages);
        dropped
    }

    // Commands

    /// Apply one parsed text command.
    pub fn apply_command(&self, command: CommandPayload) -> Result<(), SessionError> {
        match command {
            CommandPayload::Navigate(navigation) => self.navigate(navigation),
            CommandPayload::AutoSpin { enabled } => {
                self.set_auto_spin(enabled);
                Ok(())
            }
            CommandPayload::PreviousSpin => self.previous_spin(),
            CommandPayload::SelectMission { codename } => self.select_mission(&codename),
            CommandPayload::SelectRuleset { preset } => self.select_ruleset(&preset),
            CommandPayload::SetToggle { key, enabled } => self.set_toggle(&key, enabled),
            CommandPayload::SetLiveChance { chance } => {
                self.set_live_chance(chance);
                Ok(())
            }
            CommandPayload::SetMissionPool { missions } => self.set_mission_pool(&missions),
            CommandPayload::Reroll { target } => self.reroll(&target),
            CommandPayload::SetMethod { target, method } => self.set_method(&target, &method),
            CommandPayload::SetKillType { target, kill_type } => {
                self.set_kill_type(&target, &kill_type)
            }
            CommandPayload::SetDisguise { target, disguise } => {
                self.set_disguise(&target, &disguise)
            }
            CommandPayload::SetComplication { target, live } => {
                let complication = if live {
                    KillComplication::Live
                } else {
                    KillComplication::None
                };
                self.set_complication(&target, complication)
            }
            CommandPayload::Kill(report) => {
                self.on_kill_event(KillEvent::from(report));
                Ok(())
            }
            CommandPayload::Disguise { name } => {
                self.on_disguise_change(&name);
                Ok(())
            }
            CommandPayload::MissionStart { codename } => {
                self.on_mission_boundary(MissionBoundary::Start { codename });
                Ok(())
            }
            CommandPayload::MissionComplete {
                silent_assassin,
                elapsed_seconds,
            } => {
                self.on_mission_boundary(MissionBoundary::Complete {
                    silent_assassin,
                    elapsed_seconds,
                });
                Ok(())
            }
            CommandPayload::MissionRestart => {
                self.on_mission_boundary(MissionBoundary::Restart);
                Ok(())
            }
            CommandPayload::MissionLoad => {
                self.on_mission_boundary(MissionBoundary::Load);
                Ok(())
            }
        }
    }
}

impl GameplayIngest for RouletteSession {
    fn on_kill_event(&self, event: KillEvent) -> KillOutcome {
        let (outcome, message) = {
            let mut state = self.state.write();
            let state = &mut *state;
            let Some(spin) = state.spin.as_ref() else {
                tracing::warn!(
                    target: "roulette::session",
                    target_name = %event.target,
                    "kill.ignored=no_spin"
                );
                return KillOutcome::Ignored;
            };
            let mission = spin.mission();
            let subject = match mission.find_target(&event.target) {
                Some(target) => KillSubject::Target(target),
                None => KillSubject::Agent(event.target.trim().to_string()),
            };
            let observed = event
                .method
                .as_deref()
                .and_then(|name| mission.find_any_method(name))
                .map(|method| ObservedKill::new(method, event.kill_type));
            let disguise = match event.disguise.as_deref() {
                Some(name) => {
                    let resolved = mission.find_disguise(name);
                    state.validator.on_disguise_change(resolved);
                    resolved
                }
                None => None,
            };
            let outcome = state
                .validator
                .record_kill(spin, &subject, observed, disguise, event.live);
            let message = match outcome {
                KillOutcome::Recorded(_) => Some(kill_validation_message(spin, &state.validator)),
                _ => None,
            };
            (outcome, message)
        };
        if let Some(message) = message {
            self.emit(vec![message]);
        }
        outcome
    }

    fn on_disguise_change(&self, disguise: &str) {
        let mut state = self.state.write();
        let resolved = state
            .spin
            .as_ref()
            .and_then(|spin| spin.mission().find_disguise(disguise));
        if resolved.is_none() {
            tracing::debug!(
                target: "roulette::session",
                disguise,
                "disguise.unresolved"
            );
        }
        state.validator.on_disguise_change(resolved);
    }

    fn on_mission_boundary(&self, boundary: MissionBoundary) {
        tracing::info!(
            target: "roulette::session",
            boundary = ?boundary.kind(),
            "mission.boundary"
        );
        match boundary {
            MissionBoundary::Start { codename } => {
                let needs_spin = match self.current_mission() {
                    Some(current) => !current.eq_ignore_ascii_case(codename.trim()),
                    None => true,
                };
                if needs_spin {
                    if let Err(err) = self.select_mission(&codename) {
                        tracing::warn!(
                            target: "roulette::session",
                            mission = %codename,
                            error = %err,
                            "mission.start_without_spin"
                        );
                    }
                }
                let messages = {
                    let mut state = self.state.write();
                    state.in_mission = true;
                    let len = state.spin.as_ref().map(Spin::len).unwrap_or(0);
                    state.validator.reset(len);
                    state.validator.on_disguise_change(None);
                    let mut messages = vec![mission_start_message(
                        state
                            .mission
                            .as_ref()
                            .map(|mission| mission.codename.as_str())
                            .unwrap_or(codename.trim()),
                    )];
                    messages.extend(state.validation_message());
                    messages
                };
                self.emit(messages);
            }
            MissionBoundary::Complete {
                silent_assassin,
                elapsed_seconds,
            } => {
                let auto_spin = {
                    let mut state = self.state.write();
                    state.in_mission = false;
                    state.archive_current();
                    state.auto_spin
                };
                self.emit(vec![mission_complete_message(
                    silent_assassin,
                    elapsed_seconds,
                )]);
                if auto_spin {
                    if let Err(err) = self.respin() {
                        tracing::warn!(
                            target: "roulette::session",
                            error = %err,
                            "mission.auto_spin_failed"
                        );
                    }
                }
            }
            MissionBoundary::Restart | MissionBoundary::Load => {
                let message = {
                    let mut state = self.state.write();
                    let len = state.spin.as_ref().map(Spin::len).unwrap_or(0);
                    state.validator.reset(len);
                    state.validation_message()
                };
                self.emit(message.into_iter().collect());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::methods::KillType;
    use crate::outbound::OutboundQueue;
    use crate::validation::MethodConfirmation;
    use roulette_runtime::MessageKind;

    fn seeded_session(seed: u64) -> (RouletteSession, OutboundQueue) {
        let queue = OutboundQueue::new();
        let session = RouletteSession::new(
            Catalog::builtin(),
            RulesetPresets::builtin(),
            queue.sender(),
        )
        .with_generator(SpinGenerator::with_seed(seed));
        (session, queue)
    }

    #[test]
    fn selecting_a_mission_emits_spin_and_validation() {
        let (session, queue) = seeded_session(1);
        session.select_mission("paris").expect("select");
        let messages = queue.drain();
        let kinds: Vec<MessageKind> = messages.iter().map(|m| m.kind).collect();
        assert_eq!(kinds, [MessageKind::SpinData, MessageKind::KillValidation]);
        assert!(messages[0].first_arg().starts_with("Novikov: "));
        assert_eq!(messages[1].first_arg(), "Novikov:0:0:,Dalia:0:0:");
        assert_eq!(session.current_mission().as_deref(), Some("Paris"));
    }

    #[test]
    fn unknown_mission_leaves_state_alone() {
        let (session, _queue) = seeded_session(2);
        session.select_mission("Paris").expect("select");
        let before = session.current_spin();
        assert!(matches!(
            session.select_mission("Atlantis"),
            Err(SessionError::UnknownMission(_))
        ));
        assert_eq!(session.current_spin(), before);
    }

    #[test]
    fn failed_generation_keeps_previous_spin() {
        let catalog = Arc::new(
            Catalog::from_json_str(
                r#"{"missions":[
                    {"codename":"Easy","disguises":[{"name":"Suit"}],
                     "targets":[{"name":"Mark","keyword":"Mark"}]},
                    {"codename":"Tiny","disguises":[{"name":"Suit"}],
                     "targets":[{"name":"Only","keyword":"Only","routing":"unique"}],
                     "map_methods":[{"name":"Trap","class":"standard","tags":["hard"],"targets":["Only"]}]}]}"#,
            )
            .expect("catalog"),
        );
        let queue = OutboundQueue::new();
        let session = RouletteSession::new(catalog, RulesetPresets::builtin(), queue.sender())
            .with_generator(SpinGenerator::with_seed(3));
        session.select_mission("Easy").expect("easy");
        let before = session.current_spin();
        let history = session.history_len();

        session.set_toggle("enable_hard", false).expect("toggle");
        assert!(matches!(
            session.select_mission("Tiny"),
            Err(SessionError::Generation(_))
        ));
        assert_eq!(session.current_spin(), before);
        assert_eq!(session.current_mission().as_deref(), Some("Easy"));
        assert_eq!(session.history_len(), history);
        session.respin().expect("easy still rolls");
    }

    #[test]
    fn respin_archives_and_previous_spin_restores() {
        let (session, _queue) = seeded_session(4);
        session.select_mission("Paris").expect("select");
        let first = session.current_spin().expect("spin");
        session.respin().expect("respin");
        assert_eq!(session.history_len(), 1);

        session.previous_spin().expect("previous");
        assert_eq!(session.current_spin(), Some(first));
        assert_eq!(session.history_len(), 0);
        assert!(matches!(
            session.previous_spin(),
            Err(SessionError::HistoryEmpty)
        ));
    }

    #[test]
    fn previous_spin_switches_mission() {
        let (session, _queue) = seeded_session(5);
        session.select_mission("Paris").expect("paris");
        session.select_mission("Berlin").expect("berlin");
        assert_eq!(session.current_mission().as_deref(), Some("Berlin"));
        session.previous_spin().expect("previous");
        assert_eq!(session.current_mission().as_deref(), Some("Paris"));
    }

    #[test]
    fn disabled_history_does_not_archive_respins() {
        let (session, _queue) = seeded_session(6);
        session.set_history_enabled(false);
        session.select_mission("Paris").expect("select");
        session.respin().expect("respin");
        assert_eq!(session.history_len(), 0);
    }

    #[test]
    fn navigation_walks_the_pool() {
        let (session, _queue) = seeded_session(7);
        session
            .set_mission_pool(&["Paris".to_string(), "sapienza".to_string(), "Nowhere".to_string()])
            .expect("pool");
        assert_eq!(session.mission_pool(), ["Paris", "Sapienza"]);

        session.navigate(MissionNavigation::Next).expect("next");
        assert_eq!(session.current_mission().as_deref(), Some("Paris"));
        session.navigate(MissionNavigation::Next).expect("next");
        assert_eq!(session.current_mission().as_deref(), Some("Sapienza"));
        session.navigate(MissionNavigation::Next).expect("wrap");
        assert_eq!(session.current_mission().as_deref(), Some("Paris"));
        session.navigate(MissionNavigation::Prev).expect("prev");
        assert_eq!(session.current_mission().as_deref(), Some("Sapienza"));

        session.navigate(MissionNavigation::Random).expect("random");
        let current = session.current_mission().expect("mission");
        assert!(session.mission_pool().contains(&current));
    }

    #[test]
    fn empty_pool_is_rejected() {
        let (session, _queue) = seeded_session(8);
        let before = session.mission_pool();
        assert!(matches!(
            session.set_mission_pool(&["Atlantis".to_string()]),
            Err(SessionError::EmptyMissionPool)
        ));
        assert_eq!(session.mission_pool(), before);
    }

    #[test]
    fn ruleset_changes_relabel() {
        let (session, _queue) = seeded_session(9);
        assert_eq!(session.ruleset_label(), "Default");
        session.set_toggle("thrown_kill_types", false).expect("toggle");
        assert_eq!(session.ruleset_label(), "RR11");
        session.set_live_chance(20);
        assert_eq!(session.ruleset_label(), "RR12");
        session.set_live_chance(21);
        assert_eq!(session.ruleset_label(), "Custom");
        session.select_ruleset("rrwc2023").expect("preset");
        assert_eq!(session.ruleset_label(), "RRWC2023");
        assert!(matches!(
            session.select_ruleset("RR99"),
            Err(SessionError::UnknownPreset(_))
        ));
    }

    #[test]
    fn ruleset_changes_do_not_touch_the_active_spin() {
        let (session, _queue) = seeded_session(10);
        session.select_mission("Paris").expect("select");
        let before = session.current_spin();
        session.set_toggle("enable_medium", false).expect("toggle");
        session.set_toggle("enable_hard", false).expect("toggle");
        assert_eq!(session.current_spin(), before);
    }

    #[test]
    fn kill_events_validate_against_the_spin() {
        let (session, queue) = seeded_session(11);
        session.select_mission("Paris").expect("select");
        let spin = session.current_spin().expect("spin");
        let condition = spin.conditions()[0];
        let method = spin.mission().method_name(condition.method).to_string();
        let disguise = spin.disguise_name(&condition).to_string();
        queue.drain();

        let event = KillEvent::new("Novikov", Some(method.as_str()), condition.kill_type).in_disguise(disguise);
        assert_eq!(session.on_kill_event(event), KillOutcome::Recorded(0));
        let confirmation = session.confirmation("Viktor Novikov").expect("confirmation");
        assert_eq!(
            confirmation.correct_method,
            MethodConfirmation::Valid
        );
        assert!(confirmation.correct_disguise);

        let messages = queue.drain();
        assert_eq!(messages.len(), 1);
        assert!(messages[0].first_arg().starts_with("Novikov:3:1:"));
    }

    #[test]
    fn unresolvable_method_is_unknown() {
        let (session, _queue) = seeded_session(12);
        session.select_mission("Paris").expect("select");
        session.on_kill_event(KillEvent::new("Dalia", Some("Banana Peel"), KillType::Any));
        assert_eq!(
            session.confirmation("Dalia").expect("confirmation").correct_method,
            MethodConfirmation::Unknown
        );
    }

    #[test]
    fn manual_edits_emit_spin_data() {
        let (session, queue) = seeded_session(13);
        session.select_mission("Paris").expect("select");
        queue.drain();
        session.set_method("Novikov", "Fiber Wire").expect("method");
        session.set_disguise("Novikov", "Chef").expect("disguise");
        session
            .set_complication("Novikov", KillComplication::None)
            .expect("complication");
        let messages = queue.drain();
        assert_eq!(messages.len(), 3);
        assert!(messages[2]
            .first_arg()
            .starts_with("Novikov: Fiber Wire / Chef,"));

        assert!(matches!(
            session.set_kill_type("Novikov", "sil"),
            Err(SessionError::Edit(EditError::IllegalKillType { .. }))
        ));
        assert!(matches!(
            session.set_method("Nobody", "Pistol"),
            Err(SessionError::Edit(EditError::UnknownTarget(_)))
        ));
    }

    #[test]
    fn edits_without_a_spin_fail() {
        let (session, _queue) = seeded_session(14);
        assert!(matches!(
            session.set_method("Novikov", "Pistol"),
            Err(SessionError::NoActiveSpin)
        ));
        assert!(matches!(session.respin(), Err(SessionError::NoMission)));
    }

    #[test]
    fn mission_boundaries_reset_and_archive() {
        let (session, queue) = seeded_session(15);
        session.on_mission_boundary(MissionBoundary::Start {
            codename: "Paris".to_string(),
        });
        assert!(session.in_mission());
        assert!(session.current_spin().is_some());
        session.on_kill_event(KillEvent::new("Novikov", None, KillType::Any));
        assert_eq!(
            session.confirmation("Novikov").expect("c").correct_method,
            MethodConfirmation::Unknown
        );

        session.on_mission_boundary(MissionBoundary::Restart);
        assert_eq!(
            session.confirmation("Novikov").expect("c"),
            KillConfirmation::default()
        );

        queue.drain();
        session.on_mission_boundary(MissionBoundary::Complete {
            silent_assassin: true,
            elapsed_seconds: 300.5,
        });
        assert!(!session.in_mission());
        assert_eq!(session.history_len(), 1);
        let messages = queue.drain();
        assert_eq!(messages[0].kind, MessageKind::MissionComplete);
        assert_eq!(messages[0].args, ["1", "300.500"]);

        // Already archived; a respin must not push it twice.
        session.respin().expect("respin");
        assert_eq!(session.history_len(), 1);
    }

    #[test]
    fn auto_spin_rolls_after_completion() {
        let (session, queue) = seeded_session(16);
        session.select_mission("Paris").expect("select");
        let first = session.current_spin().expect("spin");
        assert!(session.set_auto_spin(None));
        queue.drain();
        session.on_mission_boundary(MissionBoundary::Complete {
            silent_assassin: false,
            elapsed_seconds: 10.0,
        });
        let kinds: Vec<MessageKind> = queue.drain().iter().map(|m| m.kind).collect();
        assert_eq!(
            kinds,
            [
                MessageKind::MissionComplete,
                MessageKind::SpinData,
                MessageKind::KillValidation
            ]
        );
        assert_eq!(session.history_len(), 1);
        assert_eq!(session.current_spin().map(|spin| spin.mission().codename.clone()), Some(first.mission().codename.clone()));
    }

    #[test]
    fn settings_round_trip_through_a_fresh_session() {
        let (session, _queue) = seeded_session(17);
        session.select_mission("Paris").expect("paris");
        session.select_mission("Sapienza").expect("sapienza");
        session.select_ruleset("RR11").expect("preset");
        session
            .set_mission_pool(&["Paris".to_string(), "Sapienza".to_string()])
            .expect("pool");
        let settings = session.settings();

        let (restored, _queue) = seeded_session(18);
        let dropped = restored.apply_settings(&settings);
        assert_eq!(dropped, 0);
        assert_eq!(restored.ruleset_label(), "RR11");
        assert_eq!(restored.mission_pool(), ["Paris", "Sapienza"]);
        assert_eq!(restored.history_len(), 1);
        assert_eq!(restored.current_spin(), session.current_spin());
    }

    #[test]
    fn restored_completed_spin_is_not_archived_twice() {
        let (session, _queue) = seeded_session(31);
        session.select_mission("Paris").expect("paris");
        session.on_mission_boundary(MissionBoundary::Complete {
            silent_assassin: false,
            elapsed_seconds: 60.0,
        });
        assert_eq!(session.history_len(), 1);
        let settings = session.settings();

        let (restored, _queue) = seeded_session(32);
        restored.apply_settings(&settings);
        assert_eq!(restored.history_len(), 1);

        session.respin().expect("respin");
        restored.respin().expect("respin");
        assert_eq!(restored.history_len(), session.history_len());
        assert_eq!(restored.history_len(), 1);
    }

    #[test]
    fn rerolled_target_loses_its_verdict() {
        let (session, _queue) = seeded_session(33);
        session.select_mission("Paris").expect("paris");
        session.on_kill_event(KillEvent::new("Novikov", Some("Banana Peel"), KillType::Any).pacified());
        session.on_kill_event(KillEvent::new("Dalia", Some("Pistol"), KillType::Loud).pacified());
        let dalia_before = session.confirmation("Dalia").expect("dalia");
        assert_ne!(
            session.confirmation("Novikov").expect("novikov").correct_method,
            MethodConfirmation::Incomplete
        );

        session.reroll("Novikov").expect("reroll");
        assert_eq!(
            session.confirmation("Novikov").expect("novikov"),
            KillConfirmation::default()
        );
        assert_eq!(session.confirmation("Dalia").expect("dalia"), dalia_before);
    }

    #[test]
    fn commands_dispatch_to_the_session() {
        let (session, _queue) = seeded_session(19);
        session
            .apply_command(CommandPayload::SelectMission {
                codename: "Paris".to_string(),
            })
            .expect("mission");
        session
            .apply_command(CommandPayload::SetMethod {
                target: "Dalia".to_string(),
                method: "Neck Snap".to_string(),
            })
            .expect("method");
        session
            .apply_command(CommandPayload::Disguise {
                name: "Suit".to_string(),
            })
            .expect("disguise");
        let text = session.spin_data_text().expect("spin");
        assert!(text.contains("Dalia: ") && text.contains("Neck Snap / "));
        assert!(session
            .apply_command(CommandPayload::Navigate(MissionNavigation::Respin))
            .is_ok());
    }
}

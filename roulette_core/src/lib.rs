//! Core crate for the mission roulette engine.
//!
//! Generates randomized kill contracts for a mission's targets under a
//! ruleset, and judges streamed gameplay telemetry against the active
//! contract. [`build_session`] wires the pieces together the way the
//! reference server runs them.

pub mod catalog;
pub mod config;
mod edit;
pub mod generator;
pub mod history;
pub mod ingest;
pub mod methods;
pub mod network;
pub mod outbound;
pub mod ruleset;
pub mod session;
pub mod settings;
pub mod spin;
pub mod validation;

pub use catalog::{
    load_catalog_from_env, Catalog, CatalogError, CatalogMetadata, DisguiseId, MapMethodId,
    Mission, Target, TargetId,
};
pub use config::RouletteConfig;
pub use edit::EditError;
pub use generator::{GenerationError, GenerationFailure, GeneratorOptions, SpinGenerator};
pub use history::SpinHistory;
pub use ingest::{GameplayIngest, KillEvent, MissionBoundary};
pub use methods::{
    FirearmMethod, KillComplication, KillType, MethodClass, MethodTags, RouletteMethod,
    StandardMethod,
};
pub use outbound::{MessageSink, OutboundQueue, OutboundSender};
pub use ruleset::{
    load_ruleset_presets_from_env, Ruleset, RulesetPreset, RulesetPresets, RulesetPresetsError,
};
pub use session::{RouletteSession, SessionError};
pub use settings::{RouletteSettings, SettingsError, SettingsStore};
pub use spin::{Condition, Spin};
pub use validation::{
    KillConfirmation, KillOutcome, KillSubject, KillValidator, MethodConfirmation, ObservedKill,
};

/// Build a session from environment-driven catalog and presets.
///
/// The generator is seeded from `config.seed` when set. Messages go to
/// `outbound`; persisted settings are not applied here.
pub fn build_session(config: &RouletteConfig, outbound: OutboundSender) -> RouletteSession {
    let (catalog, catalog_meta) = load_catalog_from_env();
    let (presets, presets_meta) = load_ruleset_presets_from_env();
    tracing::debug!(
        target: "roulette::session",
        catalog = ?catalog_meta.path(),
        presets = ?presets_meta.path(),
        "session.data_sources"
    );

    let mut generator = match config.seed {
        Some(seed) => SpinGenerator::with_seed(seed),
        None => SpinGenerator::new(),
    };
    generator.set_options(GeneratorOptions {
        reroll_limit: config.reroll_limit,
        ..GeneratorOptions::default()
    });

    RouletteSession::new(catalog, presets, outbound)
        .with_generator(generator)
        .with_history_capacity(config.history_capacity)
}

/// Builtin catalog and presets with a seeded generator.
pub fn build_seeded_session(seed: u64, outbound: OutboundSender) -> RouletteSession {
    RouletteSession::new(Catalog::builtin(), RulesetPresets::builtin(), outbound)
        .with_generator(SpinGenerator::with_seed(seed))
}

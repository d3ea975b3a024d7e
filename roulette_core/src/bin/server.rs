use tracing::{info, warn};

use roulette_core::network::{start_message_server, CommandListener};
use roulette_core::outbound::encode_line;
use roulette_core::{build_session, OutboundQueue, RouletteConfig, SettingsStore};
use roulette_runtime::{CommandPayload, OutboundMessage};

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config = RouletteConfig::from_env();
    let store = SettingsStore::from_env();

    let queue = OutboundQueue::new();
    let (outbound, _drain) = match start_message_server(config.message_bind) {
        Ok(server) => queue.spawn_drain(server),
        Err(err) => {
            warn!(
                target: "roulette::server",
                bind = %config.message_bind,
                error = %err,
                "message_server.bind_failed=logging_only"
            );
            queue.spawn_drain(|message: &OutboundMessage| {
                info!(target: "roulette::server", line = %encode_line(message), "message.local");
            })
        }
    };

    let session = build_session(&config, outbound);
    let dropped = session.apply_settings(&store.load());
    if dropped > 0 {
        warn!(
            target: "roulette::server",
            dropped,
            "settings.conditions_dropped"
        );
    }

    let commands = match CommandListener::bind(config.command_bind) {
        Ok(listener) => listener,
        Err(err) => {
            warn!(
                target: "roulette::server",
                bind = %config.command_bind,
                error = %err,
                "command_listener.bind_failed"
            );
            return;
        }
    };

    info!(
        target: "roulette::server",
        command_bind = %config.command_bind,
        message_bind = %config.message_bind,
        settings = %store.path().display(),
        ruleset = %session.ruleset_label(),
        "Roulette server ready"
    );

    while let Ok(command) = commands.receiver().recv() {
        let persist = persists(&command);
        let label = command_label(&command);
        match session.apply_command(command) {
            Ok(()) => {
                info!(
                    target: "roulette::server",
                    command = label,
                    mission = ?session.current_mission(),
                    "command.applied"
                );
                if persist {
                    if let Err(err) = store.save(&session.settings()) {
                        warn!(
                            target: "roulette::server",
                            error = %err,
                            "settings.save_failed"
                        );
                    }
                }
            }
            Err(err) => warn!(
                target: "roulette::server",
                command = label,
                error = %err,
                "command.rejected"
            ),
        }
    }
}

/// Telemetry alone does not change what gets persisted.
fn persists(command: &CommandPayload) -> bool {
    !matches!(
        command,
        CommandPayload::Kill(_) | CommandPayload::Disguise { .. } | CommandPayload::MissionLoad
    )
}

fn command_label(command: &CommandPayload) -> &'static str {
    match command {
        CommandPayload::Navigate(_) => "navigate",
        CommandPayload::AutoSpin { .. } => "autospin",
        CommandPayload::PreviousSpin => "previous_spin",
        CommandPayload::SelectMission { .. } => "mission",
        CommandPayload::SelectRuleset { .. } => "ruleset",
        CommandPayload::SetToggle { .. } => "toggle",
        CommandPayload::SetLiveChance { .. } => "live_chance",
        CommandPayload::SetMissionPool { .. } => "pool",
        CommandPayload::Reroll { .. } => "reroll",
        CommandPayload::SetMethod { .. } => "set_method",
        CommandPayload::SetKillType { .. } => "set_kill_type",
        CommandPayload::SetDisguise { .. } => "set_disguise",
        CommandPayload::SetComplication { .. } => "set_complication",
        CommandPayload::Kill(_) => "kill",
        CommandPayload::Disguise { .. } => "disguise",
        CommandPayload::MissionStart { .. } => "mission_start",
        CommandPayload::MissionComplete { .. } => "mission_complete",
        CommandPayload::MissionRestart => "mission_restart",
        CommandPayload::MissionLoad => "mission_load",
    }
}

//! Gameplay telemetry as delivered by a host adapter.

use roulette_runtime::KillReport;

use crate::methods::KillType;
use crate::validation::KillOutcome;

/// A raw kill, already translated from engine ids to catalog names.
#[derive(Debug, Clone, PartialEq)]
pub struct KillEvent {
    /// Target keyword or full name, or a roster agent keyword.
    pub target: String,
    /// `None` when the engine could not classify the kill.
    pub method: Option<String>,
    pub kill_type: KillType,
    /// `false` when the victim was pacified before dying.
    pub live: bool,
    /// `None` falls back to the last reported disguise.
    pub disguise: Option<String>,
}

impl KillEvent {
    pub fn new(target: impl Into<String>, method: Option<&str>, kill_type: KillType) -> Self {
        Self {
            target: target.into(),
            method: method.map(str::to_string),
            kill_type,
            live: true,
            disguise: None,
        }
    }

    pub fn pacified(mut self) -> Self {
        self.live = false;
        self
    }

    pub fn in_disguise(mut self, disguise: impl Into<String>) -> Self {
        self.disguise = Some(disguise.into());
        self
    }
}

impl From<KillReport> for KillEvent {
    fn from(report: KillReport) -> Self {
        let kill_type = KillType::from_code(&report.kill_type).unwrap_or_else(|| {
            tracing::debug!(
                target: "roulette::ingest",
                kill_type = %report.kill_type,
                "kill.kill_type_unclassified"
            );
            KillType::Any
        });
        Self {
            target: report.target,
            method: report.method,
            kill_type,
            live: report.live,
            disguise: report.disguise,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MissionBoundaryKind {
    Start,
    Complete,
    Restart,
    Load,
}

#[derive(Debug, Clone, PartialEq)]
pub enum MissionBoundary {
    Start {
        codename: String,
    },
    Complete {
        silent_assassin: bool,
        elapsed_seconds: f64,
    },
    Restart,
    Load,
}

impl MissionBoundary {
    pub fn kind(&self) -> MissionBoundaryKind {
        match self {
            MissionBoundary::Start { .. } => MissionBoundaryKind::Start,
            MissionBoundary::Complete { .. } => MissionBoundaryKind::Complete,
            MissionBoundary::Restart => MissionBoundaryKind::Restart,
            MissionBoundary::Load => MissionBoundaryKind::Load,
        }
    }
}

/// Calls a host adapter makes into the core. Implementations take their own
/// locks and never fail; unclassifiable input is recorded as such.
pub trait GameplayIngest {
    fn on_kill_event(&self, event: KillEvent) -> KillOutcome;
    fn on_disguise_change(&self, disguise: &str);
    fn on_mission_boundary(&self, boundary: MissionBoundary);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reports_convert_with_parsed_kill_type() {
        let report = KillReport {
            target: "Novikov".to_string(),
            method: Some("Pistol".to_string()),
            kill_type: "ld".to_string(),
            live: false,
            disguise: Some("Chef".to_string()),
        };
        let event = KillEvent::from(report);
        assert_eq!(event.kill_type, KillType::Loud);
        assert!(!event.live);
        assert_eq!(event.disguise.as_deref(), Some("Chef"));
    }

    #[test]
    fn unreadable_kill_type_becomes_any() {
        let report = KillReport {
            target: "Dalia".to_string(),
            method: None,
            kill_type: "sideways".to_string(),
            live: true,
            disguise: None,
        };
        assert_eq!(KillEvent::from(report).kill_type, KillType::Any);
    }

    #[test]
    fn builder_helpers() {
        let event = KillEvent::new("Novikov", Some("Fiber Wire"), KillType::Any)
            .pacified()
            .in_disguise("Suit");
        assert!(!event.live);
        assert_eq!(event.method.as_deref(), Some("Fiber Wire"));
        assert_eq!(event.disguise.as_deref(), Some("Suit"));
    }
}

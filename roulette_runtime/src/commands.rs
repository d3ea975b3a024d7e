use roulette_schema::MessageKind;

/// Spin-navigation directive shared by the companion and the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissionNavigation {
    Next,
    Prev,
    Random,
    Respin,
}

impl MissionNavigation {
    pub fn message_kind(&self) -> MessageKind {
        match self {
            MissionNavigation::Next => MessageKind::Next,
            MissionNavigation::Prev => MessageKind::Prev,
            MissionNavigation::Random => MessageKind::Random,
            MissionNavigation::Respin => MessageKind::Respin,
        }
    }
}

/// A kill as reported in text form; names are resolved by the core.
#[derive(Debug, Clone, PartialEq)]
pub struct KillReport {
    /// Target keyword, full name, or a specific agent keyword.
    pub target: String,
    /// Method name, or `None` when the reporter could not classify it.
    pub method: Option<String>,
    /// Kill type short code (`sil`, `ld`, `any`, ...), unparsed.
    pub kill_type: String,
    /// `false` when the target was pacified before dying.
    pub live: bool,
    pub disguise: Option<String>,
}

/// Supported text commands.
#[derive(Debug, Clone, PartialEq)]
pub enum CommandPayload {
    Navigate(MissionNavigation),
    AutoSpin {
        enabled: Option<bool>,
    },
    PreviousSpin,
    SelectMission {
        codename: String,
    },
    SelectRuleset {
        preset: String,
    },
    SetToggle {
        key: String,
        enabled: bool,
    },
    SetLiveChance {
        chance: u8,
    },
    SetMissionPool {
        missions: Vec<String>,
    },
    Reroll {
        target: String,
    },
    SetMethod {
        target: String,
        method: String,
    },
    SetKillType {
        target: String,
        kill_type: String,
    },
    SetDisguise {
        target: String,
        disguise: String,
    },
    SetComplication {
        target: String,
        live: bool,
    },
    Kill(KillReport),
    Disguise {
        name: String,
    },
    MissionStart {
        codename: String,
    },
    MissionComplete {
        silent_assassin: bool,
        elapsed_seconds: f64,
    },
    MissionRestart,
    MissionLoad,
}

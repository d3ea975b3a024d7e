//! Data contracts shared between the roulette core and its host adapters.
//!
//! Nothing in here knows about the catalog or the generator; these are the
//! plain shapes that cross the boundary: outbound companion messages and the
//! human-readable form spins take when they are persisted.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of a message pushed to the companion process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MessageKind {
    SpinData,
    KillValidation,
    Missions,
    MissionStart,
    MissionComplete,
    Next,
    Prev,
    Random,
    Respin,
    AutoSpin,
}

impl MessageKind {
    pub const ALL: [MessageKind; 10] = [
        MessageKind::SpinData,
        MessageKind::KillValidation,
        MessageKind::Missions,
        MessageKind::MissionStart,
        MessageKind::MissionComplete,
        MessageKind::Next,
        MessageKind::Prev,
        MessageKind::Random,
        MessageKind::Respin,
        MessageKind::AutoSpin,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MessageKind::SpinData => "SpinData",
            MessageKind::KillValidation => "KillValidation",
            MessageKind::Missions => "Missions",
            MessageKind::MissionStart => "MissionStart",
            MessageKind::MissionComplete => "MissionComplete",
            MessageKind::Next => "Next",
            MessageKind::Prev => "Prev",
            MessageKind::Random => "Random",
            MessageKind::Respin => "Respin",
            MessageKind::AutoSpin => "AutoSpin",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(value))
    }
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One externally relevant change: a kind plus its ordered string arguments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutboundMessage {
    pub kind: MessageKind,
    #[serde(default)]
    pub args: Vec<String>,
}

impl OutboundMessage {
    pub fn new(kind: MessageKind, args: Vec<String>) -> Self {
        Self { kind, args }
    }

    pub fn single(kind: MessageKind, arg: impl Into<String>) -> Self {
        Self {
            kind,
            args: vec![arg.into()],
        }
    }

    pub fn bare(kind: MessageKind) -> Self {
        Self {
            kind,
            args: Vec::new(),
        }
    }

    /// First argument, or an empty string for argument-less messages.
    pub fn first_arg(&self) -> &str {
        self.args.first().map(String::as_str).unwrap_or("")
    }

    pub fn encode_json(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }

    pub fn decode_json(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }
}

/// `(target-name, method-name, disguise-name)` as persisted in spin history.
///
/// Serialized as a three element JSON array so hand edits stay readable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SerializedCondition(pub String, pub String, pub String);

impl SerializedCondition {
    pub fn new(
        target: impl Into<String>,
        method: impl Into<String>,
        disguise: impl Into<String>,
    ) -> Self {
        Self(target.into(), method.into(), disguise.into())
    }

    pub fn target(&self) -> &str {
        &self.0
    }

    pub fn method(&self) -> &str {
        &self.1
    }

    pub fn disguise(&self) -> &str {
        &self.2
    }
}

/// A persisted spin: the mission codename plus its ordered condition triples.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SerializedSpin {
    pub mission: String,
    #[serde(default)]
    pub conditions: Vec<SerializedCondition>,
}

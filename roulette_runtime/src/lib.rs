//! Shared runtime utilities for the roulette engine.
//!
//! Re-exports the data contracts from `roulette_schema` and adds the text
//! command surface used by companion processes and host adapters, without
//! depending on the generator or validation code in `roulette_core`.

pub mod command_text;
mod commands;

pub use command_text::{parse_command_line, CommandParseError};
pub use commands::{CommandPayload, KillReport, MissionNavigation};
pub use roulette_schema::*;

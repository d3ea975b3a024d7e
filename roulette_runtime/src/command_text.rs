use std::num::{ParseFloatError, ParseIntError};

use thiserror::Error;

use crate::{CommandPayload, KillReport, MissionNavigation};

#[derive(Debug, Error)]
pub enum CommandParseError {
    #[error("empty command")]
    Empty,
    #[error("unknown command: {0}")]
    UnknownCommand(String),
    #[error("missing argument: {0}")]
    MissingArgument(&'static str),
    #[error("invalid integer '{value}' for {context}: {source}")]
    InvalidInteger {
        value: String,
        context: &'static str,
        source: ParseIntError,
    },
    #[error("invalid float '{value}' for {context}: {source}")]
    InvalidFloat {
        value: String,
        context: &'static str,
        source: ParseFloatError,
    },
    #[error("invalid switch '{value}' for {context}")]
    InvalidSwitch {
        value: String,
        context: &'static str,
    },
    #[error("invalid kill outcome '{0}' (expected live or pacified)")]
    InvalidKillOutcome(String),
    #[error("invalid complication '{0}' (expected none or live)")]
    InvalidComplication(String),
    #[error("live complication chance {0} is above 100")]
    ChanceOutOfRange(u8),
}

/// Parse one line of companion/host text into a [`CommandPayload`].
///
/// The verb is case-insensitive; names that may contain spaces (methods,
/// disguises) always come last and swallow the rest of the line.
pub fn parse_command_line(input: &str) -> Result<CommandPayload, CommandParseError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(CommandParseError::Empty);
    }

    let mut parts = trimmed.split_whitespace();
    let verb = parts
        .next()
        .map(|v| v.to_ascii_lowercase())
        .ok_or(CommandParseError::Empty)?;

    match verb.as_str() {
        "next" => Ok(CommandPayload::Navigate(MissionNavigation::Next)),
        "prev" => Ok(CommandPayload::Navigate(MissionNavigation::Prev)),
        "random" => Ok(CommandPayload::Navigate(MissionNavigation::Random)),
        "respin" | "spin" => Ok(CommandPayload::Navigate(MissionNavigation::Respin)),
        "autospin" => {
            let enabled = match parts.next() {
                Some(token) => Some(parse_switch(token, "autospin")?),
                None => None,
            };
            Ok(CommandPayload::AutoSpin { enabled })
        }
        "previous_spin" | "prev_spin" | "undo" => Ok(CommandPayload::PreviousSpin),
        "mission" => {
            let codename = parts
                .next()
                .ok_or(CommandParseError::MissingArgument("mission codename"))?;
            Ok(CommandPayload::SelectMission {
                codename: codename.to_string(),
            })
        }
        "ruleset" => {
            let preset = parts
                .next()
                .ok_or(CommandParseError::MissingArgument("ruleset preset"))?;
            Ok(CommandPayload::SelectRuleset {
                preset: preset.to_string(),
            })
        }
        "toggle" => {
            let key = parts
                .next()
                .ok_or(CommandParseError::MissingArgument("toggle key"))?;
            let value = parts
                .next()
                .ok_or(CommandParseError::MissingArgument("toggle value"))?;
            let enabled = parse_switch(value, "toggle value")?;
            Ok(CommandPayload::SetToggle {
                key: key.to_ascii_lowercase(),
                enabled,
            })
        }
        "live_chance" => {
            let value = parts
                .next()
                .ok_or(CommandParseError::MissingArgument("chance"))?;
            let chance = parse_u8(value, "live complication chance")?;
            if chance > 100 {
                return Err(CommandParseError::ChanceOutOfRange(chance));
            }
            Ok(CommandPayload::SetLiveChance { chance })
        }
        "pool" => {
            let missions: Vec<String> = parts
                .flat_map(|token| token.split(','))
                .map(str::trim)
                .filter(|name| !name.is_empty())
                .map(str::to_string)
                .collect();
            if missions.is_empty() {
                return Err(CommandParseError::MissingArgument("mission codenames"));
            }
            Ok(CommandPayload::SetMissionPool { missions })
        }
        "reroll" => {
            let target = next_target(&mut parts)?;
            Ok(CommandPayload::Reroll { target })
        }
        "set_method" => {
            let target = next_target(&mut parts)?;
            let method = rest_of_line(parts, "method name")?;
            Ok(CommandPayload::SetMethod { target, method })
        }
        "set_kill_type" => {
            let target = next_target(&mut parts)?;
            let kill_type = parts
                .next()
                .ok_or(CommandParseError::MissingArgument("kill type"))?;
            Ok(CommandPayload::SetKillType {
                target,
                kill_type: kill_type.to_string(),
            })
        }
        "set_disguise" => {
            let target = next_target(&mut parts)?;
            let disguise = rest_of_line(parts, "disguise name")?;
            Ok(CommandPayload::SetDisguise { target, disguise })
        }
        "set_complication" => {
            let target = next_target(&mut parts)?;
            let value = parts
                .next()
                .ok_or(CommandParseError::MissingArgument("complication"))?;
            let live = match value.to_ascii_lowercase().as_str() {
                "live" => true,
                "none" | "off" => false,
                other => return Err(CommandParseError::InvalidComplication(other.to_string())),
            };
            Ok(CommandPayload::SetComplication { target, live })
        }
        "kill" => parse_kill(parts).map(CommandPayload::Kill),
        "disguise" => {
            let name = rest_of_line(parts, "disguise name")?;
            Ok(CommandPayload::Disguise { name })
        }
        "mission_start" => {
            let codename = parts
                .next()
                .ok_or(CommandParseError::MissingArgument("mission codename"))?;
            Ok(CommandPayload::MissionStart {
                codename: codename.to_string(),
            })
        }
        "mission_complete" => {
            let sa = parts.next().unwrap_or("0");
            let elapsed = parts.next().unwrap_or("0");
            let silent_assassin = parse_switch(sa, "silent assassin flag")?;
            let elapsed_seconds = parse_f64(elapsed, "elapsed seconds")?;
            Ok(CommandPayload::MissionComplete {
                silent_assassin,
                elapsed_seconds,
            })
        }
        "mission_restart" => Ok(CommandPayload::MissionRestart),
        "mission_load" => Ok(CommandPayload::MissionLoad),
        other => Err(CommandParseError::UnknownCommand(other.to_string())),
    }
}

/// `kill <target> <type> <live|pacified> <method…|?> [/ <disguise…>]`
fn parse_kill<'a>(
    mut parts: impl Iterator<Item = &'a str>,
) -> Result<KillReport, CommandParseError> {
    let target = parts
        .next()
        .ok_or(CommandParseError::MissingArgument("target"))?
        .to_string();
    let kill_type = parts
        .next()
        .ok_or(CommandParseError::MissingArgument("kill type"))?
        .to_string();
    let outcome = parts
        .next()
        .ok_or(CommandParseError::MissingArgument("kill outcome"))?;
    let live = match outcome.to_ascii_lowercase().as_str() {
        "live" | "alive" => true,
        "pacified" | "ko" => false,
        other => return Err(CommandParseError::InvalidKillOutcome(other.to_string())),
    };

    let remainder: Vec<&str> = parts.collect();
    let (method_tokens, disguise_tokens) = match remainder.iter().position(|token| *token == "/")
    {
        Some(index) => (&remainder[..index], Some(&remainder[index + 1..])),
        None => (&remainder[..], None),
    };

    let method = match method_tokens.join(" ").as_str() {
        "" => return Err(CommandParseError::MissingArgument("method name")),
        "?" => None,
        name => Some(name.to_string()),
    };
    let disguise = disguise_tokens
        .map(|tokens| tokens.join(" "))
        .filter(|name| !name.is_empty());

    Ok(KillReport {
        target,
        method,
        kill_type,
        live,
        disguise,
    })
}

fn next_target<'a>(parts: &mut impl Iterator<Item = &'a str>) -> Result<String, CommandParseError> {
    parts
        .next()
        .map(str::to_string)
        .ok_or(CommandParseError::MissingArgument("target"))
}

fn rest_of_line<'a>(
    parts: impl Iterator<Item = &'a str>,
    context: &'static str,
) -> Result<String, CommandParseError> {
    let joined = parts.collect::<Vec<_>>().join(" ");
    if joined.is_empty() {
        Err(CommandParseError::MissingArgument(context))
    } else {
        Ok(joined)
    }
}

fn parse_switch(value: &str, context: &'static str) -> Result<bool, CommandParseError> {
    match value.to_ascii_lowercase().as_str() {
        "on" | "true" | "1" | "yes" => Ok(true),
        "off" | "false" | "0" | "no" => Ok(false),
        _ => Err(CommandParseError::InvalidSwitch {
            value: value.to_string(),
            context,
        }),
    }
}

fn parse_u8(value: &str, context: &'static str) -> Result<u8, CommandParseError> {
    value
        .parse::<u8>()
        .map_err(|source| CommandParseError::InvalidInteger {
            value: value.to_string(),
            context,
            source,
        })
}

fn parse_f64(value: &str, context: &'static str) -> Result<f64, CommandParseError> {
    value
        .parse::<f64>()
        .map_err(|source| CommandParseError::InvalidFloat {
            value: value.to_string(),
            context,
            source,
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn navigation_verbs() {
        assert_eq!(
            parse_command_line("Next").unwrap(),
            CommandPayload::Navigate(MissionNavigation::Next)
        );
        assert_eq!(
            parse_command_line("  respin ").unwrap(),
            CommandPayload::Navigate(MissionNavigation::Respin)
        );
        assert_eq!(
            parse_command_line("autospin off").unwrap(),
            CommandPayload::AutoSpin {
                enabled: Some(false)
            }
        );
        assert_eq!(
            parse_command_line("autospin").unwrap(),
            CommandPayload::AutoSpin { enabled: None }
        );
    }

    #[test]
    fn multi_word_names_swallow_rest_of_line() {
        assert_eq!(
            parse_command_line("set_method Novikov Falling Object").unwrap(),
            CommandPayload::SetMethod {
                target: "Novikov".into(),
                method: "Falling Object".into(),
            }
        );
        assert_eq!(
            parse_command_line("set_disguise Dalia Sheikh Al-Ghazali").unwrap(),
            CommandPayload::SetDisguise {
                target: "Dalia".into(),
                disguise: "Sheikh Al-Ghazali".into(),
            }
        );
    }

    #[test]
    fn kill_with_disguise() {
        let payload = parse_command_line("kill Novikov sil live Pistol / Helmut Kruger").unwrap();
        assert_eq!(
            payload,
            CommandPayload::Kill(KillReport {
                target: "Novikov".into(),
                method: Some("Pistol".into()),
                kill_type: "sil".into(),
                live: true,
                disguise: Some("Helmut Kruger".into()),
            })
        );
    }

    #[test]
    fn kill_unclassified_without_disguise() {
        let payload = parse_command_line("kill Dalia any pacified ?").unwrap();
        let CommandPayload::Kill(report) = payload else {
            panic!("expected kill payload");
        };
        assert_eq!(report.method, None);
        assert!(!report.live);
        assert_eq!(report.disguise, None);
    }

    #[test]
    fn kill_requires_method_token() {
        assert!(matches!(
            parse_command_line("kill Dalia any live"),
            Err(CommandParseError::MissingArgument("method name"))
        ));
        assert!(matches!(
            parse_command_line("kill Dalia any asleep Pistol"),
            Err(CommandParseError::InvalidKillOutcome(_))
        ));
    }

    #[test]
    fn pool_accepts_commas_and_spaces() {
        assert_eq!(
            parse_command_line("pool Paris,Sapienza  Bangkok").unwrap(),
            CommandPayload::SetMissionPool {
                missions: vec!["Paris".into(), "Sapienza".into(), "Bangkok".into()],
            }
        );
    }

    #[test]
    fn live_chance_bounds() {
        assert_eq!(
            parse_command_line("live_chance 40").unwrap(),
            CommandPayload::SetLiveChance { chance: 40 }
        );
        assert!(matches!(
            parse_command_line("live_chance 101"),
            Err(CommandParseError::ChanceOutOfRange(101))
        ));
        assert!(matches!(
            parse_command_line("live_chance lots"),
            Err(CommandParseError::InvalidInteger { .. })
        ));
    }

    #[test]
    fn mission_complete_defaults() {
        assert_eq!(
            parse_command_line("mission_complete 1 312.5").unwrap(),
            CommandPayload::MissionComplete {
                silent_assassin: true,
                elapsed_seconds: 312.5,
            }
        );
        assert!(matches!(
            parse_command_line("mission_complete maybe"),
            Err(CommandParseError::InvalidSwitch { .. })
        ));
    }

    #[test]
    fn unknown_and_empty() {
        assert!(matches!(
            parse_command_line("   "),
            Err(CommandParseError::Empty)
        ));
        assert!(matches!(
            parse_command_line("dance"),
            Err(CommandParseError::UnknownCommand(_))
        ));
    }
}

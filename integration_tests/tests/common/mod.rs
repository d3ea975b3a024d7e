use roulette_core::{build_seeded_session, OutboundQueue, RouletteSession};
use roulette_runtime::{parse_command_line, MessageKind, OutboundMessage};

pub fn session(seed: u64) -> (RouletteSession, OutboundQueue) {
    let queue = OutboundQueue::new();
    let session = build_seeded_session(seed, queue.sender());
    (session, queue)
}

/// Feed one text command through the parser into the session.
pub fn run(session: &RouletteSession, line: &str) -> anyhow::Result<()> {
    let command = parse_command_line(line)?;
    session.apply_command(command)?;
    Ok(())
}

pub fn last_of(messages: &[OutboundMessage], kind: MessageKind) -> Option<&OutboundMessage> {
    messages.iter().rev().find(|message| message.kind == kind)
}

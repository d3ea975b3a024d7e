//! Outbound companion messages: builders plus a producer/drain queue.
//!
//! Producers enqueue without blocking; a drain thread (or an explicit
//! [`OutboundQueue::drain`]) hands messages to a [`MessageSink`] that does
//! the actual I/O.

use std::thread::{self, JoinHandle};

use crossbeam_channel::{unbounded, Receiver, Sender};
use roulette_schema::{MessageKind, OutboundMessage};

use crate::spin::Spin;
use crate::validation::KillValidator;

/// Transport end of the outbound channel.
pub trait MessageSink: Send + 'static {
    fn deliver(&mut self, message: &OutboundMessage);
}

impl<F> MessageSink for F
where
    F: FnMut(&OutboundMessage) + Send + 'static,
{
    fn deliver(&mut self, message: &OutboundMessage) {
        self(message)
    }
}

/// Cloneable producer handle.
#[derive(Debug, Clone)]
pub struct OutboundSender {
    sender: Sender<OutboundMessage>,
}

impl OutboundSender {
    pub fn send(&self, message: OutboundMessage) {
        if let Err(err) = self.sender.send(message) {
            tracing::warn!(
                target: "roulette::outbound",
                kind = %err.0.kind,
                "outbound.dropped=disconnected"
            );
        }
    }

    pub fn send_all(&self, messages: impl IntoIterator<Item = OutboundMessage>) {
        for message in messages {
            self.send(message);
        }
    }
}

#[derive(Debug)]
pub struct OutboundQueue {
    sender: Sender<OutboundMessage>,
    receiver: Receiver<OutboundMessage>,
}

impl Default for OutboundQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl OutboundQueue {
    pub fn new() -> Self {
        let (sender, receiver) = unbounded();
        Self { sender, receiver }
    }

    pub fn sender(&self) -> OutboundSender {
        OutboundSender {
            sender: self.sender.clone(),
        }
    }

    /// Everything queued so far, oldest first.
    pub fn drain(&self) -> Vec<OutboundMessage> {
        self.receiver.try_iter().collect()
    }

    pub fn len(&self) -> usize {
        self.receiver.len()
    }

    pub fn is_empty(&self) -> bool {
        self.receiver.is_empty()
    }

    /// Hand the receiving end to a thread that forwards every message to
    /// `sink`. The thread exits once every sender is gone.
    pub fn spawn_drain<S: MessageSink>(self, mut sink: S) -> (OutboundSender, JoinHandle<()>) {
        let sender = OutboundSender {
            sender: self.sender,
        };
        let receiver = self.receiver;
        let handle = thread::spawn(move || {
            while let Ok(message) = receiver.recv() {
                sink.deliver(&message);
            }
            tracing::debug!(target: "roulette::outbound", "outbound.drain_stopped");
        });
        (sender, handle)
    }
}

pub fn spin_data_message(spin: &Spin) -> OutboundMessage {
    OutboundMessage::single(MessageKind::SpinData, spin.spin_data_text())
}

pub fn kill_validation_message(spin: &Spin, validator: &KillValidator) -> OutboundMessage {
    OutboundMessage::single(
        MessageKind::KillValidation,
        validator.kill_validation_text(spin),
    )
}

pub fn missions_message(pool: &[String]) -> OutboundMessage {
    OutboundMessage::single(MessageKind::Missions, pool.join(","))
}

pub fn mission_start_message(codename: &str) -> OutboundMessage {
    OutboundMessage::single(MessageKind::MissionStart, codename)
}

/// Silent assassin flag as `0`/`1`, elapsed in-game seconds with three
/// decimals.
pub fn mission_complete_message(silent_assassin: bool, elapsed_seconds: f64) -> OutboundMessage {
    OutboundMessage::new(
        MessageKind::MissionComplete,
        vec![
            u8::from(silent_assassin).to_string(),
            format!("{elapsed_seconds:.3}"),
        ],
    )
}

pub fn auto_spin_message(enabled: bool) -> OutboundMessage {
    OutboundMessage::single(MessageKind::AutoSpin, u8::from(enabled).to_string())
}

/// Text line form: kind followed by tab-separated arguments.
pub fn encode_line(message: &OutboundMessage) -> String {
    let mut line = String::from(message.kind.as_str());
    for arg in &message.args {
        line.push('\t');
        line.push_str(arg);
    }
    line
}

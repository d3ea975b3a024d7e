use std::collections::BTreeMap;
use std::io::{self, BufRead, BufReader, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::thread;
use std::time::Duration;

use crossbeam_channel::{unbounded, Receiver, Sender};
use roulette_runtime::{parse_command_line, CommandPayload};
use roulette_schema::{MessageKind, OutboundMessage};

use crate::outbound::MessageSink;

/// Encoded frame plus the replay slot it refreshes, if any.
struct QueuedFrame {
    replay_key: Option<&'static str>,
    bytes: Vec<u8>,
}

/// Broadcasts outbound messages to companion clients as length-prefixed
/// JSON frames. New clients first receive the latest frame of every state
/// kind.
pub struct MessageServer {
    sender: Sender<QueuedFrame>,
    local_addr: SocketAddr,
}

impl MessageServer {
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn broadcast(&self, message: &OutboundMessage) {
        let bytes = match message.encode_json() {
            Ok(bytes) => bytes,
            Err(err) => {
                tracing::error!(
                    target: "roulette::network",
                    kind = %message.kind,
                    error = %err,
                    "message.encode_failed"
                );
                return;
            }
        };
        let replay_key = is_state_kind(message.kind).then(|| message.kind.as_str());
        if self.sender.send(QueuedFrame { replay_key, bytes }).is_err() {
            tracing::error!(target: "roulette::network", "message.queue_failed=server_stopped");
        }
    }
}

impl MessageSink for MessageServer {
    fn deliver(&mut self, message: &OutboundMessage) {
        self.broadcast(message);
    }
}

/// Kinds that describe current state rather than a one-off event.
fn is_state_kind(kind: MessageKind) -> bool {
    matches!(
        kind,
        MessageKind::SpinData
            | MessageKind::KillValidation
            | MessageKind::Missions
            | MessageKind::AutoSpin
    )
}

/// Connected clients and the replay frames, owned by the server thread.
///
/// Replay state only changes when a frame is actually written out, so a
/// client attached between queueing and publishing sees each frame once.
struct FrameHub<W> {
    clients: Vec<W>,
    latest: BTreeMap<&'static str, Vec<u8>>,
}

impl<W: Write> FrameHub<W> {
    fn new() -> Self {
        Self {
            clients: Vec::new(),
            latest: BTreeMap::new(),
        }
    }

    fn attach(&mut self, mut client: W) -> io::Result<()> {
        for frame in self.latest.values() {
            write_frame(&mut client, frame)?;
        }
        self.clients.push(client);
        Ok(())
    }

    fn publish(&mut self, frame: QueuedFrame) {
        self.clients
            .retain_mut(|client| match write_frame(client, &frame.bytes) {
                Ok(()) => true,
                Err(err) => {
                    tracing::warn!(target: "roulette::network", error = %err, "client.dropped");
                    false
                }
            });
        if let Some(key) = frame.replay_key {
            self.latest.insert(key, frame.bytes);
        }
    }
}

pub fn start_message_server(bind_addr: SocketAddr) -> io::Result<MessageServer> {
    let listener = TcpListener::bind(bind_addr)?;
    listener.set_nonblocking(true)?;
    let local_addr = listener.local_addr()?;

    let (sender, receiver) = unbounded::<QueuedFrame>();
    thread::spawn(move || {
        let mut hub = FrameHub::new();
        loop {
            match listener.accept() {
                Ok((stream, addr)) => match prepare_client(&stream) {
                    Ok(()) => match hub.attach(stream) {
                        Ok(()) => {
                            tracing::info!(target: "roulette::network", %addr, "client.connected")
                        }
                        Err(err) => tracing::warn!(
                            target: "roulette::network",
                            %addr,
                            error = %err,
                            "client.replay_failed"
                        ),
                    },
                    Err(err) => tracing::warn!(
                        target: "roulette::network",
                        %addr,
                        error = %err,
                        "client.setup_failed"
                    ),
                },
                Err(ref err) if err.kind() == io::ErrorKind::WouldBlock => {
                    thread::sleep(Duration::from_millis(50));
                }
                Err(err) => {
                    tracing::error!(target: "roulette::network", error = %err, "client.accept_failed");
                    thread::sleep(Duration::from_millis(200));
                }
            }

            loop {
                match receiver.try_recv() {
                    Ok(frame) => hub.publish(frame),
                    Err(crossbeam_channel::TryRecvError::Empty) => break,
                    Err(crossbeam_channel::TryRecvError::Disconnected) => {
                        tracing::debug!(target: "roulette::network", "message_server.stopped");
                        return;
                    }
                }
            }
        }
    });

    Ok(MessageServer { sender, local_addr })
}

fn prepare_client(stream: &TcpStream) -> io::Result<()> {
    stream.set_nonblocking(false)?;
    stream.set_nodelay(true)
}

pub(crate) fn write_frame(stream: &mut impl Write, frame: &[u8]) -> io::Result<()> {
    let len = frame.len() as u32;
    let mut buffer = Vec::with_capacity(4 + frame.len());
    buffer.extend_from_slice(&len.to_le_bytes());
    buffer.extend_from_slice(frame);
    stream.write_all(&buffer)
}

/// Line-oriented command intake: every client connection gets a reader
/// thread, parsed commands arrive on one channel.
pub struct CommandListener {
    local_addr: SocketAddr,
    receiver: Receiver<CommandPayload>,
}

impl CommandListener {
    pub fn bind(bind_addr: SocketAddr) -> io::Result<Self> {
        let listener = TcpListener::bind(bind_addr)?;
        let local_addr = listener.local_addr()?;
        let (sender, receiver) = unbounded::<CommandPayload>();
        thread::spawn(move || {
            for stream in listener.incoming() {
                match stream {
                    Ok(stream) => {
                        let sender = sender.clone();
                        thread::spawn(move || read_commands(stream, sender));
                    }
                    Err(err) => {
                        tracing::warn!(
                            target: "roulette::network",
                            error = %err,
                            "command_client.accept_failed"
                        );
                    }
                }
            }
        });
        Ok(Self {
            local_addr,
            receiver,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn receiver(&self) -> &Receiver<CommandPayload> {
        &self.receiver
    }
}

fn read_commands(stream: TcpStream, sender: Sender<CommandPayload>) {
    let peer = stream.peer_addr().ok();
    tracing::info!(target: "roulette::network", peer = ?peer, "command_client.connected");
    for line in BufReader::new(stream).lines() {
        let line = match line {
            Ok(line) => line,
            Err(err) => {
                tracing::warn!(target: "roulette::network", error = %err, "command_client.read_failed");
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }
        match parse_command_line(&line) {
            Ok(command) => {
                if sender.send(command).is_err() {
                    break;
                }
            }
            Err(err) => tracing::warn!(
                target: "roulette::network",
                input = line.trim(),
                error = %err,
                "command.invalid"
            ),
        }
    }
    tracing::debug!(target: "roulette::network", peer = ?peer, "command_client.closed");
}

#[cfg(test)]
mod tests {
    use super::*;
    use roulette_runtime::MissionNavigation;
    use std::net::{IpAddr, Ipv4Addr};

    fn frame(kind: MessageKind, arg: &str) -> QueuedFrame {
        QueuedFrame {
            replay_key: is_state_kind(kind).then(|| kind.as_str()),
            bytes: arg.as_bytes().to_vec(),
        }
    }

    fn prefixed(payload: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        write_frame(&mut out, payload).expect("write");
        out
    }

    #[test]
    fn frames_are_length_prefixed() {
        assert_eq!(prefixed(b"abc"), [3, 0, 0, 0, b'a', b'b', b'c']);
    }

    #[test]
    fn only_state_kinds_are_replayed() {
        assert!(is_state_kind(MessageKind::SpinData));
        assert!(is_state_kind(MessageKind::Missions));
        assert!(!is_state_kind(MessageKind::MissionComplete));
        assert!(!is_state_kind(MessageKind::Next));
    }

    #[test]
    fn late_clients_get_each_state_frame_once() {
        let mut hub: FrameHub<Vec<u8>> = FrameHub::new();
        hub.publish(frame(MessageKind::SpinData, "one"));
        hub.publish(frame(MessageKind::MissionComplete, "done"));

        hub.attach(Vec::new()).expect("attach");
        assert_eq!(hub.clients[0], prefixed(b"one"));

        hub.publish(frame(MessageKind::SpinData, "two"));
        let mut expected = prefixed(b"one");
        expected.extend(prefixed(b"two"));
        assert_eq!(hub.clients[0], expected);

        hub.attach(Vec::new()).expect("attach");
        assert_eq!(hub.clients[1], prefixed(b"two"));
    }

    #[test]
    fn command_lines_arrive_parsed() {
        let listener =
            CommandListener::bind(SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 0)).expect("bind");
        let mut client = TcpStream::connect(listener.local_addr()).expect("connect");
        client
            .write_all(b"next\n\nnot_a_command\nmission Paris\n")
            .expect("send");

        let timeout = Duration::from_secs(5);
        let first = listener.receiver().recv_timeout(timeout).expect("first");
        let second = listener.receiver().recv_timeout(timeout).expect("second");
        assert_eq!(first, CommandPayload::Navigate(MissionNavigation::Next));
        assert_eq!(
            second,
            CommandPayload::SelectMission {
                codename: "Paris".to_string()
            }
        );
    }
}

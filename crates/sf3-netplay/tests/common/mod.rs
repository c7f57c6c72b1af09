#![allow(dead_code)]

use std::collections::BTreeMap;
use std::net::SocketAddr;

use sf3_netplay::{
    NetplayConfig, NetplaySession, PLAYER_COUNT, Simulation,
    transport::{MemoryChannel, MemoryNetwork, PacketChannel},
};
use sf3_netproto::{
    codec::{decode_datagram, encode_message},
    messages::{
        Message,
        handshake::{Bye, ByeReason, Hello, HelloAck},
        input::InputWindow,
    },
    msg_id::MsgId,
};

pub const LEFT: u16 = 1 << 0;
pub const RIGHT: u16 = 1 << 1;
pub const PUNCH: u16 = 1 << 2;

pub fn addr(last: u8) -> SocketAddr {
    SocketAddr::from(([10, 0, 0, last], 50_000))
}

/// Restorable part of the duel.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DuelState {
    pub frame: u32,
    pub pos: [i32; PLAYER_COUNT],
    pub health: [i32; PLAYER_COUNT],
    pub seed: u32,
}

impl Default for DuelState {
    fn default() -> Self {
        Self {
            frame: 0,
            pos: [-40, 40],
            health: [100, 100],
            seed: 0x1234_5678,
        }
    }
}

/// Tiny deterministic fighting game.
///
/// Per-frame checksums live outside the snapshot so that a resimulated frame
/// overwrites its earlier, mispredicted checksum.
#[derive(Debug, Default)]
pub struct Duel {
    pub state: DuelState,
    pub checksums: BTreeMap<u32, u64>,
    pub restores: u32,
}

impl Duel {
    pub fn checksum(&self) -> u64 {
        let s = &self.state;
        let mut h: u64 = 0xcbf2_9ce4_8422_2325;
        for v in [
            s.frame as i64,
            s.pos[0] as i64,
            s.pos[1] as i64,
            s.health[0] as i64,
            s.health[1] as i64,
            s.seed as i64,
        ] {
            h ^= v as u64;
            h = h.wrapping_mul(0x0100_0000_01b3);
        }
        h
    }
}

impl Simulation for Duel {
    type Snapshot = DuelState;

    fn advance_frame(&mut self, inputs: [u16; PLAYER_COUNT]) {
        let s = &mut self.state;
        for (p, &buttons) in inputs.iter().enumerate() {
            if buttons & LEFT != 0 {
                s.pos[p] -= 2;
            }
            if buttons & RIGHT != 0 {
                s.pos[p] += 2;
            }
            s.pos[p] = s.pos[p].clamp(-100, 100);
        }
        for (p, &buttons) in inputs.iter().enumerate() {
            let other = PLAYER_COUNT - 1 - p;
            if buttons & PUNCH != 0 && (s.pos[p] - s.pos[other]).abs() < 12 {
                s.seed ^= s.seed << 13;
                s.seed ^= s.seed >> 17;
                s.seed ^= s.seed << 5;
                s.health[other] -= 1 + (s.seed % 3) as i32;
            }
        }
        let frame = s.frame;
        s.frame += 1;
        let sum = self.checksum();
        self.checksums.insert(frame, sum);
    }

    fn snapshot(&self) -> DuelState {
        self.state.clone()
    }

    fn restore(&mut self, snapshot: &DuelState) {
        self.state = snapshot.clone();
        self.restores += 1;
    }
}

/// Deterministic button pattern for player `slot` at tick `tick`.
pub fn scripted_input(slot: u8, tick: u32) -> u16 {
    let phase = (tick / 7 + slot as u32 * 3) % 5;
    match phase {
        0 => RIGHT,
        1 => RIGHT | PUNCH,
        2 => 0,
        3 => LEFT,
        _ => PUNCH,
    }
}

/// A session plus the game it drives.
pub struct Peer {
    pub slot: u8,
    pub session: NetplaySession<Duel>,
    pub sim: Duel,
    pub ticks: u32,
}

impl Peer {
    pub fn new(net: &MemoryNetwork, me: SocketAddr, peer: SocketAddr, slot: u8, config: NetplayConfig) -> Self {
        let mut session = NetplaySession::new(config, net.opener(me));
        session.set_params(slot, &peer.to_string());
        Self {
            slot,
            session,
            sim: Duel::default(),
            ticks: 0,
        }
    }

    pub fn tick(&mut self) {
        let input = scripted_input(self.slot, self.ticks);
        self.session.run(&mut self.sim, input);
        self.ticks += 1;
    }
}

/// Hand-driven remote end speaking the wire protocol directly.
pub struct ScriptedPeer {
    pub channel: MemoryChannel,
    pub target: SocketAddr,
    pub nonce: u32,
    pub session_nonce: Option<u32>,
    seq: u32,
}

impl ScriptedPeer {
    pub fn bind(net: &MemoryNetwork, me: SocketAddr, target: SocketAddr) -> Self {
        Self {
            channel: net.bind(me).unwrap(),
            target,
            nonce: 0xC0FF_EE01,
            session_nonce: None,
            seq: 0,
        }
    }

    pub fn send<T: Message>(&mut self, msg: &T) {
        let bytes = encode_message(self.nonce, self.seq, msg).unwrap();
        self.seq += 1;
        self.channel.send(&bytes, self.target).unwrap();
    }

    /// Drain everything and return the ids received, remembering the
    /// session's nonce from its `Hello`.
    pub fn drain(&mut self) -> Vec<(MsgId, Vec<u8>)> {
        let mut out = Vec::new();
        for datagram in self.channel.poll_received() {
            let view = decode_datagram(&datagram.bytes).unwrap();
            if view.msg_id == MsgId::Hello {
                self.session_nonce = Some(view.header.session);
            }
            out.push((view.msg_id, datagram.bytes.clone()));
        }
        out
    }

    /// Answer the session's `Hello` and announce ourselves.
    pub fn complete_handshake(&mut self, slot: u8, input_delay: u8) {
        self.drain();
        let nonce = self.session_nonce.expect("session has not said Hello yet");
        self.send(&HelloAck { echo_nonce: nonce });
        self.send(&Hello {
            player_slot: slot,
            input_delay,
            max_rollback: 12,
        });
    }

    pub fn send_inputs(&mut self, base_frame: u32, buttons: Vec<u16>) {
        self.send(&InputWindow {
            base_frame,
            ack_frame: 0,
            buttons,
        });
    }

    pub fn bye(&mut self) {
        self.send(&Bye {
            reason: ByeReason::MenuExit,
        });
    }

    pub fn received_byes(&mut self) -> Vec<ByeReason> {
        self.drain()
            .into_iter()
            .filter(|(id, _)| *id == MsgId::Bye)
            .map(|(_, bytes)| decode_datagram(&bytes).unwrap().decode::<Bye>().unwrap().reason)
            .collect()
    }
}

//! Demo fighting game driven by the headless peer.

use std::collections::BTreeMap;

use rand::{Rng, SeedableRng, rngs::StdRng};
use sf3_netplay::{PLAYER_COUNT, Simulation};

pub const LEFT: u16 = 1 << 0;
pub const RIGHT: u16 = 1 << 1;
pub const JUMP: u16 = 1 << 2;
pub const LIGHT: u16 = 1 << 4;
pub const HEAVY: u16 = 1 << 5;
const BUTTON_MASK: u16 = LEFT | RIGHT | JUMP | LIGHT | HEAVY;

const STAGE_HALF_WIDTH: i32 = 256;
const GRAVITY: i32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Fighter {
    pub x: i32,
    pub y: i32,
    pub vy: i32,
    pub health: i32,
    pub stun: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Round {
    pub frame: u32,
    pub fighters: [Fighter; PLAYER_COUNT],
    pub rng: u32,
}

impl Default for Round {
    fn default() -> Self {
        let fighter = |x| Fighter {
            x,
            y: 0,
            vy: 0,
            health: 1000,
            stun: 0,
        };
        Self {
            frame: 0,
            fighters: [fighter(-64), fighter(64)],
            rng: 0x9E37_79B9,
        }
    }
}

impl Round {
    fn next_rng(&mut self) -> u32 {
        self.rng ^= self.rng << 13;
        self.rng ^= self.rng >> 17;
        self.rng ^= self.rng << 5;
        self.rng
    }

    fn checksum(&self) -> u64 {
        let mut h: u64 = 0xcbf2_9ce4_8422_2325;
        let mut mix = |v: i64| {
            h ^= v as u64;
            h = h.wrapping_mul(0x0100_0000_01b3);
        };
        mix(self.frame as i64);
        mix(self.rng as i64);
        for f in &self.fighters {
            mix(f.x as i64);
            mix(f.y as i64);
            mix(f.vy as i64);
            mix(f.health as i64);
            mix(f.stun as i64);
        }
        h
    }
}

/// The round plus a rolling record of per-frame checksums.
///
/// Checksums are not part of the snapshot, so a resimulated frame replaces the
/// value computed from mispredicted input.
#[derive(Debug)]
pub struct DemoGame {
    round: Round,
    checksums: BTreeMap<u32, u64>,
    keep_frames: u32,
}

impl DemoGame {
    pub fn new(keep_frames: u32) -> Self {
        Self {
            round: Round::default(),
            checksums: BTreeMap::new(),
            keep_frames: keep_frames.max(1),
        }
    }

    pub fn frame(&self) -> u32 {
        self.round.frame
    }

    pub fn health(&self) -> [i32; PLAYER_COUNT] {
        self.round.fighters.map(|f| f.health)
    }

    pub fn checksum_at(&self, frame: u32) -> Option<u64> {
        self.checksums.get(&frame).copied()
    }
}

impl Simulation for DemoGame {
    type Snapshot = Round;

    fn advance_frame(&mut self, inputs: [u16; PLAYER_COUNT]) {
        let r = &mut self.round;
        for (f, &buttons) in r.fighters.iter_mut().zip(&inputs) {
            if f.stun > 0 {
                f.stun -= 1;
                continue;
            }
            if buttons & LEFT != 0 {
                f.x -= 3;
            }
            if buttons & RIGHT != 0 {
                f.x += 3;
            }
            if buttons & JUMP != 0 && f.y == 0 {
                f.vy = 12;
            }
            f.x = f.x.clamp(-STAGE_HALF_WIDTH, STAGE_HALF_WIDTH);
        }
        for f in r.fighters.iter_mut() {
            f.y = (f.y + f.vy).max(0);
            f.vy = if f.y == 0 { 0 } else { f.vy - GRAVITY };
        }

        for attacker in 0..PLAYER_COUNT {
            let defender = PLAYER_COUNT - 1 - attacker;
            let buttons = inputs[attacker];
            let (a, d) = (r.fighters[attacker], r.fighters[defender]);
            if a.stun > 0 || (a.x - d.x).abs() > 40 || (a.y - d.y).abs() > 24 {
                continue;
            }
            let damage = if buttons & HEAVY != 0 {
                40 + (r.next_rng() % 20) as i32
            } else if buttons & LIGHT != 0 {
                10 + (r.next_rng() % 5) as i32
            } else {
                continue;
            };
            let d = &mut r.fighters[defender];
            d.health -= damage;
            d.stun = 8;
        }

        let frame = r.frame;
        r.frame += 1;
        let sum = r.checksum();
        self.checksums.insert(frame, sum);
        if let Some(cutoff) = frame.checked_sub(self.keep_frames) {
            self.checksums = self.checksums.split_off(&cutoff);
        }
    }

    fn snapshot(&self) -> Round {
        self.round.clone()
    }

    fn restore(&mut self, snapshot: &Round) {
        self.round = snapshot.clone();
    }
}

/// Button masher that holds each random combination for a few frames.
pub struct Bot {
    rng: StdRng,
    held: u16,
    hold: u32,
}

impl Bot {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            held: 0,
            hold: 0,
        }
    }

    pub fn next_input(&mut self) -> u16 {
        if self.hold == 0 {
            self.held = self.rng.random::<u16>() & BUTTON_MASK;
            self.hold = self.rng.random_range(4..20);
        }
        self.hold -= 1;
        self.held
    }
}

use std::net::SocketAddr;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, bail};
use clap::{Args as ClapArgs, Parser, Subcommand};
use sf3_netplay::{
    ExitReason, NetplayConfig, NetplaySession, SessionState,
    transport::{LinkConditions, MemoryNetwork},
};
use tracing::{Level, info, warn};
use tracing_subscriber::FmtSubscriber;

mod game;

use game::{Bot, DemoGame};

const TICK_HZ: u32 = 60;

/// Frames of checksum history kept by each game.
const CHECKSUM_HISTORY: u32 = 4 * TICK_HZ;

/// Headless rollback netplay peer
#[derive(Parser, Debug)]
#[command(name = "sf3-netpeer")]
#[command(about = "Plays a scripted demo match against a netplay peer", long_about = None)]
#[command(args_conflicts_with_subcommands = true)]
struct Args {
    #[command(subcommand)]
    command: Option<Command>,

    /// Local player slot (0 or 1)
    #[arg(short, long)]
    player: Option<u8>,

    /// Peer address, `ip` or `ip:port`
    #[arg(long)]
    peer: Option<String>,

    /// UDP bind address
    #[arg(short, long, default_value = "0.0.0.0:50000")]
    bind: SocketAddr,

    #[command(flatten)]
    tuning: Tuning,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info", global = true)]
    log_level: Level,
}

#[derive(ClapArgs, Debug, Clone)]
struct Tuning {
    /// Local input delay in frames
    #[arg(long, default_value_t = 2, global = true)]
    delay: u8,

    /// Rollback window in frames
    #[arg(long, default_value_t = 12, global = true)]
    max_rollback: u8,

    /// Frames to play once running before leaving the match
    #[arg(long, default_value_t = 3600, global = true)]
    frames: u32,
}

impl Tuning {
    fn config(&self) -> NetplayConfig {
        NetplayConfig {
            input_delay: self.delay,
            max_rollback_frames: self.max_rollback,
            ..Default::default()
        }
    }
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run both peers in-process over a simulated network and compare checksums
    Local {
        /// One-way latency in frames
        #[arg(long, default_value_t = 4)]
        latency: u32,

        /// Extra random latency in frames
        #[arg(long, default_value_t = 1)]
        jitter: u32,

        /// Packet loss probability (0.0 - 1.0)
        #[arg(long, default_value_t = 0.05)]
        loss: f64,

        /// Seed for loss, jitter and the input bots
        #[arg(long, default_value_t = 1)]
        seed: u64,
    },
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize tracing
    let subscriber = FmtSubscriber::builder()
        .with_max_level(args.log_level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    match args.command {
        Some(Command::Local {
            latency,
            jitter,
            loss,
            seed,
        }) => {
            if !(0.0..=1.0).contains(&loss) {
                bail!("--loss must be between 0 and 1");
            }
            let conditions = LinkConditions {
                latency_ticks: latency,
                jitter_ticks: jitter,
                loss,
            };
            run_local(&args.tuning, conditions, seed)
        }
        None => {
            let player = args.player.context("--player is required")?;
            let peer = args.peer.as_deref().context("--peer is required")?;
            let config = NetplayConfig {
                bind_addr: args.bind,
                ..args.tuning.config()
            };
            run_udp(config, player, peer, args.tuning.frames)
        }
    }
}

/// Play against a remote peer at 60 Hz.
fn run_udp(config: NetplayConfig, player: u8, peer: &str, frames: u32) -> anyhow::Result<()> {
    let mut session: NetplaySession<DemoGame> = NetplaySession::udp(config.clone());
    session.set_params(player, peer);
    session.begin();
    if session.state() == SessionState::Idle {
        bail!("could not start a session with player {} and peer {:?}", player, peer);
    }
    info!("Netplay peer started on {}", config.bind_addr);

    let mut game = DemoGame::new(CHECKSUM_HISTORY);
    let mut bot = Bot::new(player as u64 + 1);
    let frame_time = Duration::from_secs(1) / TICK_HZ;
    let mut deadline = Instant::now();

    while session.state() != SessionState::Idle {
        let input = if session.state() == SessionState::Running {
            bot.next_input()
        } else {
            0
        };
        session.run(&mut game, input);

        if let Some(current) = session.current_frame() {
            if current > 0 && current % TICK_HZ == 0 {
                let stats = session.network_stats();
                info!("R:{} P:{}", stats.rollback, stats.ping);
                let settled = current.saturating_sub(config.max_rollback_frames as u32 + 1);
                if let Some(sum) = game.checksum_at(settled) {
                    info!("frame {} checksum {:016x}", settled, sum);
                }
            }
            if current >= frames {
                info!("Played {} frames, leaving match", current);
                session.handle_menu_exit();
            }
        }

        deadline += frame_time;
        let now = Instant::now();
        if deadline > now {
            thread::sleep(deadline - now);
        } else if now - deadline > frame_time * 5 {
            deadline = now;
        }
    }

    let health = game.health();
    info!("Final health: P1 {} / P2 {}", health[0], health[1]);
    match session.exit_reason() {
        Some(ExitReason::MenuExit | ExitReason::PeerLeft) => Ok(()),
        reason => bail!("session ended: {:?}", reason),
    }
}

/// Two peers on one simulated network, stepped as fast as possible.
fn run_local(tuning: &Tuning, conditions: LinkConditions, seed: u64) -> anyhow::Result<()> {
    let net = MemoryNetwork::new(conditions, seed);
    let addrs: [SocketAddr; 2] = [
        SocketAddr::from(([10, 0, 0, 1], 50_000)),
        SocketAddr::from(([10, 0, 0, 2], 50_000)),
    ];
    let keep = tuning.frames + TICK_HZ;

    let mut peers: Vec<(NetplaySession<DemoGame>, DemoGame, Bot)> = (0..2)
        .map(|slot| {
            let mut session = NetplaySession::new(tuning.config(), net.opener(addrs[slot]));
            session.set_params(slot as u8, &addrs[1 - slot].to_string());
            session.begin();
            (session, DemoGame::new(keep), Bot::new(seed ^ (slot as u64 + 1)))
        })
        .collect();
    info!(
        "Local match: latency {} (+{}) frames, loss {:.0}%",
        conditions.latency_ticks,
        conditions.jitter_ticks,
        conditions.loss * 100.0
    );

    let budget = tuning.frames + 10 * TICK_HZ;
    for tick in 0..budget {
        for (session, game, bot) in peers.iter_mut() {
            let input = if session.state() == SessionState::Running {
                bot.next_input()
            } else {
                0
            };
            session.run(game, input);
        }
        net.advance();

        let (session, _, _) = &peers[0];
        if tick % TICK_HZ == 0 && session.state() == SessionState::Running {
            let stats = session.network_stats();
            info!("R:{} P:{}", stats.rollback, stats.ping);
        }
        let ended = peers.iter().any(|(s, _, _)| {
            !matches!(s.state(), SessionState::Connecting | SessionState::Running)
        });
        if ended {
            break;
        }
        if peers.iter().all(|(_, g, _)| g.frame() >= tuning.frames) {
            break;
        }
    }

    for (slot, (session, game, _)) in peers.iter().enumerate() {
        info!(
            "P{}: {:?} at frame {}, exit reason {:?}",
            slot + 1,
            session.state(),
            game.frame(),
            session.exit_reason()
        );
    }
    info!("{} datagrams lost in transit", net.dropped());

    let settled = peers
        .iter()
        .map(|(_, g, _)| g.frame())
        .min()
        .unwrap_or(0)
        .saturating_sub(tuning.max_rollback as u32 + 1);
    if settled == 0 {
        bail!("peers never got past the handshake");
    }
    let (a, b) = (&peers[0].1, &peers[1].1);
    if let Some(frame) = (0..settled).find(|&f| a.checksum_at(f) != b.checksum_at(f)) {
        warn!("Checksums diverge at frame {}", frame);
        bail!("desync at frame {}", frame);
    }
    info!("Checksums agree over {} settled frames", settled);
    Ok(())
}

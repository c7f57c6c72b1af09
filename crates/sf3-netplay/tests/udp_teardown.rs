mod common;

use std::net::UdpSocket;
use std::time::{Duration, Instant};

use common::Duel;
use sf3_netplay::{ExitReason, NetplayConfig, NetplaySession, SessionState};

const FRAME_BUDGET: Duration = Duration::from_micros(16_667);

#[test]
fn closing_a_udp_session_fits_in_one_frame() {
    // Bound but never answers, so the session stays connecting.
    let silent = UdpSocket::bind("127.0.0.1:0").unwrap();
    let peer = silent.local_addr().unwrap().to_string();
    let config = NetplayConfig {
        bind_addr: "127.0.0.1:0".parse().unwrap(),
        teardown_ticks: 1,
        ..Default::default()
    };

    let mut sim = Duel::default();
    for _ in 0..5 {
        let mut session: NetplaySession<Duel> = NetplaySession::udp(config.clone());
        session.set_params(0, &peer);
        session.begin();
        for _ in 0..3 {
            session.run(&mut sim, 0);
        }
        assert_eq!(session.state(), SessionState::Connecting);

        session.handle_menu_exit();
        let mut worst = Duration::ZERO;
        while session.state() != SessionState::Idle {
            let started = Instant::now();
            session.run(&mut sim, 0);
            worst = worst.max(started.elapsed());
        }
        assert_eq!(session.exit_reason(), Some(ExitReason::MenuExit));
        assert!(worst < FRAME_BUDGET, "teardown run() took {worst:?}");
    }
}

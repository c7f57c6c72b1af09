use std::io::ErrorKind;
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr, UdpSocket};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{Receiver, Sender, TrySendError};
use sf3_netproto::constants::{HEADER_LEN, MAX_UDP_PAYLOAD};
use tracing::{debug, trace, warn};

use super::{ChannelOpener, Datagram, PacketChannel};
use crate::error::NetplayError;

/// How long the receiver thread blocks before re-checking the stop flag.
///
/// Drop also wakes the thread with an empty datagram, so this only bounds
/// teardown when that wake-up is lost.
const RECV_POLL_INTERVAL: Duration = Duration::from_millis(5);

/// Datagrams buffered between the receiver thread and the tick loop.
const INBOUND_QUEUE_LEN: usize = 1024;

/// Opens a [`UdpChannel`] bound to a fixed local address.
#[derive(Debug, Clone)]
pub struct UdpOpener {
    bind: SocketAddr,
}

impl UdpOpener {
    pub fn new(bind: SocketAddr) -> Self {
        Self { bind }
    }
}

impl ChannelOpener for UdpOpener {
    fn open(&self) -> Result<Box<dyn PacketChannel>, NetplayError> {
        Ok(Box::new(UdpChannel::bind(self.bind)?))
    }
}

/// UDP socket plus a receiver thread.
///
/// The thread only pushes datagrams into a bounded queue; the tick loop drains
/// it in [`PacketChannel::poll_received`]. Dropping the channel stops and joins
/// the thread.
pub struct UdpChannel {
    socket: UdpSocket,
    local_addr: SocketAddr,
    inbound: Receiver<Datagram>,
    stop: Arc<AtomicBool>,
    receiver: Option<JoinHandle<()>>,
}

impl UdpChannel {
    pub fn bind(addr: SocketAddr) -> Result<Self, NetplayError> {
        let socket = UdpSocket::bind(addr)
            .map_err(|e| NetplayError::ChannelUnavailable(format!("bind {addr}: {e}")))?;
        let local_addr = socket.local_addr()?;

        let recv_socket = socket.try_clone()?;
        recv_socket.set_read_timeout(Some(RECV_POLL_INTERVAL))?;

        let (tx, rx) = crossbeam_channel::bounded(INBOUND_QUEUE_LEN);
        let stop = Arc::new(AtomicBool::new(false));
        let stop_flag = stop.clone();
        let receiver = thread::Builder::new()
            .name("sf3-netplay-rx".to_string())
            .spawn(move || receive_loop(recv_socket, tx, stop_flag))?;

        debug!("UDP channel bound on {}", local_addr);
        Ok(Self {
            socket,
            local_addr,
            inbound: rx,
            stop,
            receiver: Some(receiver),
        })
    }
}

fn receive_loop(socket: UdpSocket, tx: Sender<Datagram>, stop: Arc<AtomicBool>) {
    let mut buf = vec![0u8; HEADER_LEN + MAX_UDP_PAYLOAD + 1];
    while !stop.load(Ordering::Acquire) {
        match socket.recv_from(&mut buf) {
            // Empty datagrams carry no packet; Drop sends one to unblock us.
            Ok((0, _)) => continue,
            Ok((len, from)) => {
                let datagram = Datagram {
                    from,
                    bytes: buf[..len].to_vec(),
                };
                match tx.try_send(datagram) {
                    Ok(()) => {}
                    Err(TrySendError::Full(_)) => trace!("inbound queue full, dropping datagram"),
                    Err(TrySendError::Disconnected(_)) => break,
                }
            }
            Err(e) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => {}
            // ICMP port-unreachable surfaces here on some platforms; the peer may
            // simply not be listening yet.
            Err(e) if e.kind() == ErrorKind::ConnectionReset => {}
            Err(e) => {
                warn!("UDP receive failed: {}", e);
                thread::sleep(RECV_POLL_INTERVAL);
            }
        }
    }
    trace!("UDP receiver thread exiting");
}

impl PacketChannel for UdpChannel {
    fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    fn send(&mut self, bytes: &[u8], to: SocketAddr) -> Result<(), NetplayError> {
        match self.socket.send_to(bytes, to) {
            Ok(_) => Ok(()),
            Err(e) if e.kind() == ErrorKind::WouldBlock => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn poll_received(&mut self) -> Vec<Datagram> {
        self.inbound.try_iter().collect()
    }
}

/// Where to send the wake-up datagram: a wildcard bind is reachable on loopback.
fn wake_addr(local: SocketAddr) -> SocketAddr {
    let mut addr = local;
    match local {
        SocketAddr::V4(v4) if v4.ip().is_unspecified() => addr.set_ip(Ipv4Addr::LOCALHOST.into()),
        SocketAddr::V6(v6) if v6.ip().is_unspecified() => addr.set_ip(Ipv6Addr::LOCALHOST.into()),
        _ => {}
    }
    addr
}

impl Drop for UdpChannel {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Release);
        if let Err(e) = self.socket.send_to(&[], wake_addr(self.local_addr)) {
            trace!("UDP wake-up send failed: {}", e);
        }
        if let Some(handle) = self.receiver.take()
            && handle.join().is_err()
        {
            warn!("UDP receiver thread on {} panicked", self.local_addr);
        }
        debug!("UDP channel on {} closed", self.local_addr);
    }
}

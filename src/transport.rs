//! Fire-and-forget bundle delivery.

use anyhow::{Context, Result};
use log::{debug, info};
use std::net::{SocketAddr, ToSocketAddrs, UdpSocket};

use crate::tuio::TuioBundle;

/// Receives one finished bundle per processed frame. Delivery problems stay
/// inside the implementation; callers never learn about them.
pub trait Transport {
    fn send(&mut self, bundle: &TuioBundle);
}

pub struct UdpTransport {
    socket: UdpSocket,
    target: SocketAddr,
}

impl UdpTransport {
    pub fn connect(host: &str, port: u16) -> Result<Self> {
        let target = (host, port)
            .to_socket_addrs()
            .with_context(|| format!("failed to resolve {host}:{port}"))?
            .next()
            .with_context(|| format!("no address for {host}:{port}"))?;
        let local = if target.is_ipv6() { "[::]:0" } else { "0.0.0.0:0" };
        let socket = UdpSocket::bind(local).context("failed to bind UDP socket")?;
        socket.set_nonblocking(true)?;
        info!("tuio: sending to udp://{target}");
        Ok(Self { socket, target })
    }
}

impl Transport for UdpTransport {
    fn send(&mut self, bundle: &TuioBundle) {
        let bytes = match bundle.encode() {
            Ok(b) => b,
            Err(e) => {
                debug!("tuio: encode failed: {e}");
                return;
            }
        };
        if let Err(e) = self.socket.send_to(&bytes, self.target) {
            debug!("tuio: send to {} failed: {e}", self.target);
        }
    }
}

/// `--dry-run`: log bundles instead of sending them.
#[derive(Debug, Default)]
pub struct LogTransport;

impl Transport for LogTransport {
    fn send(&mut self, bundle: &TuioBundle) {
        info!("tuio: {} cursors {:?}", bundle.cursor_count(), bundle.messages);
    }
}

/// Keeps every bundle; used by tests.
impl Transport for Vec<TuioBundle> {
    fn send(&mut self, bundle: &TuioBundle) {
        self.push(bundle.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tuio::BundleEncoder;
    use rosc::{OscPacket, decoder};
    use std::time::Duration;

    #[test]
    fn test_udp_delivers_bundle() {
        let receiver = UdpSocket::bind("127.0.0.1:0").unwrap();
        receiver
            .set_read_timeout(Some(Duration::from_secs(2)))
            .unwrap();
        let port = receiver.local_addr().unwrap().port();

        let mut tx = UdpTransport::connect("127.0.0.1", port).unwrap();
        assert_eq!(tx.target.port(), port);
        tx.send(&BundleEncoder.bundle(&[], &[], 77));

        let mut buf = [0u8; 1024];
        let n = receiver.recv(&mut buf).unwrap();
        let (_, packet) = decoder::decode_udp(&buf[..n]).unwrap();
        assert!(matches!(packet, OscPacket::Bundle(b) if b.content.len() == 2));
    }

    #[test]
    fn test_unreachable_target_is_silent() {
        let mut tx = UdpTransport::connect("127.0.0.1", 9).unwrap();
        tx.send(&BundleEncoder.bundle(&[], &[], 1));
        tx.send(&BundleEncoder.bundle(&[], &[], 2));
    }
}

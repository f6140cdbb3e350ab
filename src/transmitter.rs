use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr, UdpSocket};

use crate::ddp::Packet;
use crate::error::Error;

/// Fire-and-forget DDP sender. One datagram per packet, no retries.
pub struct DdpTransmitter {
    sock: UdpSocket,
    buffer: Vec<u8>,
}

impl DdpTransmitter {
    /// Binds an ephemeral local port of the same address family as `dest`.
    pub fn open(dest: SocketAddr) -> Result<Self, Error> {
        let our_addr = match dest {
            SocketAddr::V4(_) => SocketAddr::from((Ipv4Addr::UNSPECIFIED, 0)),
            SocketAddr::V6(_) => SocketAddr::from((Ipv6Addr::UNSPECIFIED, 0)),
        };
        let sock = UdpSocket::bind(our_addr)?;

        Ok(DdpTransmitter {
            sock,
            buffer: Vec::with_capacity(crate::ddp::HEADER_LEN + crate::ddp::MAX_DATALEN),
        })
    }

    pub fn send(&mut self, packet: &Packet, dest: Option<SocketAddr>) -> Result<(), Error> {
        let dest = match dest {
            Some(dest) => dest,
            None => return Err(Error::Transmit("destination is not resolved".to_string())),
        };

        self.buffer.clear();
        packet.write_to(&mut self.buffer)?;

        let sent = self.sock.send_to(&self.buffer, dest)?;
        if sent != self.buffer.len() {
            return Err(Error::Transmit(format!(
                "short send to {}: {} of {} bytes",
                dest,
                sent,
                self.buffer.len()
            )));
        }
        Ok(())
    }
}

//! GSMTAP-style UDP tap emitter.
//!
//! One `TapSink` per process, cloned (cheaply, via `Arc`) into every
//! actor's params struct (Design Note, "Global state") rather than reached
//! for through a hidden global.

use std::net::{SocketAddr, UdpSocket};
use std::sync::Arc;

use crate::errors::{Gmr1Error, ResourceError};

/// Channel type tag carried in the tap header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelType {
    Bcch,
    Ccch,
    Tch3,
    Tch9,
    Facch3,
    Facch9,
    Rach,
}

impl ChannelType {
    fn wire_tag(&self) -> u8 {
        match self {
            ChannelType::Bcch => 1,
            ChannelType::Ccch => 2,
            ChannelType::Tch3 => 3,
            ChannelType::Tch9 => 4,
            ChannelType::Facch3 => 5,
            ChannelType::Facch9 => 6,
            ChannelType::Rach => 7,
        }
    }
}

struct Inner {
    socket: UdpSocket,
    dest: SocketAddr,
}

/// Send-only handle to the tap socket. Cheap to clone; all clones share the
/// one underlying `UdpSocket`.
#[derive(Clone)]
pub struct TapSink {
    inner: Arc<Inner>,
}

impl TapSink {
    /// Bind an ephemeral local send-only socket targeting `dest`.
    pub fn connect(dest: SocketAddr) -> Result<Self, Gmr1Error> {
        let socket = UdpSocket::bind("0.0.0.0:0")
            .map_err(|source| Gmr1Error::Resource(ResourceError::TapBind { source }))?;
        Ok(Self {
            inner: Arc::new(Inner { socket, dest }),
        })
    }

    /// Serialize a minimal GSMTAP-style header followed by `payload`, and
    /// send it as one datagram. Errors are non-fatal to the caller (a lost
    /// tap datagram is an observability miss, not a scheduling failure);
    /// the caller decides whether to log it.
    pub fn send(
        &self,
        channel_type: ChannelType,
        arfcn: u32,
        frame_no: u32,
        tn: u8,
        payload: &[u8],
    ) -> std::io::Result<()> {
        let mut datagram = Vec::with_capacity(12 + payload.len());
        datagram.push(channel_type.wire_tag());
        datagram.push(tn);
        datagram.extend_from_slice(&arfcn.to_be_bytes());
        datagram.extend_from_slice(&frame_no.to_be_bytes());
        datagram.extend_from_slice(&(payload.len() as u16).to_be_bytes());
        datagram.extend_from_slice(payload);

        self.inner.socket.send_to(&datagram, self.inner.dest)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::{Ipv4Addr, SocketAddrV4};

    #[test]
    fn send_round_trips_over_loopback() {
        let listener = UdpSocket::bind("127.0.0.1:0").unwrap();
        listener
            .set_read_timeout(Some(std::time::Duration::from_millis(500)))
            .unwrap();
        let dest = SocketAddr::V4(SocketAddrV4::new(
            Ipv4Addr::LOCALHOST,
            listener.local_addr().unwrap().port(),
        ));

        let tap = TapSink::connect(dest).unwrap();
        tap.send(ChannelType::Bcch, 120, 7, 2, &[0xDE, 0xAD, 0xBE, 0xEF])
            .unwrap();

        let mut buf = [0u8; 256];
        let (n, _) = listener.recv_from(&mut buf).unwrap();
        assert_eq!(buf[0], ChannelType::Bcch.wire_tag());
        assert_eq!(buf[1], 2);
        assert_eq!(&buf[12..n], &[0xDE, 0xAD, 0xBE, 0xEF]);
    }
}

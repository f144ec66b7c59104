//! Socket helpers.

use std::io;
use std::net::SocketAddr;

use socket2::{Domain, Protocol, Socket, Type};
use tokio::net::UdpSocket;

/// Bind a non-blocking UDP socket for use with tokio.
///
/// IPv6 sockets are dual-stack. `recv_buffer_size` is a request; the kernel
/// caps it at `net.core.rmem_max` and a refusal is ignored.
pub(crate) async fn bind_udp_socket(
    addr: SocketAddr,
    recv_buffer_size: Option<usize>,
) -> io::Result<UdpSocket> {
    let socket = Socket::new(Domain::for_address(addr), Type::DGRAM, Some(Protocol::UDP))?;
    if addr.is_ipv6() {
        socket.set_only_v6(false)?;
    }
    socket.set_reuse_address(true)?;
    if let Some(size) = recv_buffer_size {
        let _ = socket.set_recv_buffer_size(size);
    }
    socket.set_nonblocking(true)?;
    socket.bind(&addr.into())?;

    UdpSocket::from_std(socket.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_binds_ephemeral_v4() {
        let socket = bind_udp_socket("127.0.0.1:0".parse().unwrap(), None)
            .await
            .unwrap();
        let local = socket.local_addr().unwrap();
        assert!(local.is_ipv4());
        assert_ne!(local.port(), 0);
    }

    #[tokio::test]
    async fn test_binds_dual_stack_v6() {
        let socket = bind_udp_socket("[::]:0".parse().unwrap(), Some(256 * 1024))
            .await
            .unwrap();
        assert!(socket.local_addr().unwrap().is_ipv6());
    }
}

//! UDP echo mode.
//!
//! A stateless loop: each datagram comes back with its printable characters
//! upper-cased. No capture, no cache, no shared state.

use tokio::net::UdpSocket;

/// Jumbo-frame sized receive buffer.
const MAX_DATAGRAM: usize = 9014;

/// Bind a UDP socket on `port` and echo datagrams until the process exits.
pub async fn run(port: u16) -> Result<(), std::io::Error> {
    let socket = UdpSocket::bind(("0.0.0.0", port)).await?;
    tracing::info!(address = %socket.local_addr()?, "Listening for udp packets");

    let mut buf = vec![0u8; MAX_DATAGRAM];
    loop {
        let (n, peer) = match socket.recv_from(&mut buf).await {
            Ok(received) => received,
            Err(e) => {
                tracing::warn!(error = %e, "Receive error");
                continue;
            }
        };

        let reply = shout(&buf[..n]);
        match socket.send_to(reply.as_bytes(), peer).await {
            Ok(sent) => {
                tracing::info!(client = %peer, echo = %reply.trim(), bytes = sent, "Echoed datagram");
            }
            Err(e) => tracing::warn!(client = %peer, error = %e, "Send error"),
        }
    }
}

/// Upper-case every printable character, leaving control bytes untouched.
fn shout(data: &[u8]) -> String {
    String::from_utf8_lossy(data)
        .chars()
        .flat_map(|c| {
            if c.is_control() {
                vec![c]
            } else {
                c.to_uppercase().collect()
            }
        })
        .collect()
}

use std::time::Instant;

use tokio::net::TcpStream;
use tokio::time::timeout;

use crate::config::PROBE_TIMEOUT;

/// TCP connect/close round trip in milliseconds.
///
/// `None` means unreachable: empty host or zero port (no I/O attempted),
/// connect refusal, DNS failure, or timeout. No payload is exchanged; the
/// socket is closed as soon as the connect completes.
pub async fn measure_ping_ms(host: &str, port: u16) -> Option<u32> {
    let host = host.trim();
    if host.is_empty() || port == 0 {
        return None;
    }

    let start = Instant::now();
    let stream = timeout(PROBE_TIMEOUT, TcpStream::connect((host, port)))
        .await
        .ok()?
        .ok()?;
    drop(stream);

    Some((start.elapsed().as_secs_f64() * 1000.0).round() as u32)
}

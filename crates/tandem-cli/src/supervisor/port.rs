//! Debugger port allocation.

use std::net::{SocketAddr, TcpListener};

use crate::error::ProcessError;

/// Default node inspector port.
pub const DEFAULT_INSPECT_PORT: u16 = 9229;

/// Ports tried after the requested one.
const PORT_ATTEMPTS: u16 = 10;

/// First port from `requested_port` (up to `+10`) that can be bound on
/// the loopback interface.
pub fn find_available_port(requested_port: u16) -> Result<u16, ProcessError> {
    for offset in 0..=PORT_ATTEMPTS {
        let port = requested_port.saturating_add(offset);
        let addr = SocketAddr::from(([127, 0, 0, 1], port));
        if TcpListener::bind(addr).is_ok() {
            if offset > 0 {
                tracing::debug!("port {} is busy, using {}", requested_port, port);
            }
            return Ok(port);
        }
    }

    Err(ProcessError::NoFreePort {
        start: requested_port,
        end: requested_port.saturating_add(PORT_ATTEMPTS),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_available_port_success() {
        let listener = match TcpListener::bind(("127.0.0.1", 0)) {
            Ok(listener) => listener,
            Err(err) => {
                eprintln!("Skipping test_find_available_port_success: unable to bind socket ({err})");
                return;
            }
        };

        let start_port = listener.local_addr().unwrap().port();
        drop(listener);

        let port = find_available_port(start_port).expect("should find port");
        assert!(port >= start_port);
        assert!(port <= start_port.saturating_add(PORT_ATTEMPTS));
    }

    #[test]
    fn test_busy_port_is_skipped() {
        let listener = match TcpListener::bind(("127.0.0.1", 0)) {
            Ok(listener) => listener,
            Err(err) => {
                eprintln!("Skipping test_busy_port_is_skipped: unable to bind socket ({err})");
                return;
            }
        };
        let busy = listener.local_addr().unwrap().port();

        if let Ok(port) = find_available_port(busy) {
            assert_ne!(port, busy);
        }
    }
}

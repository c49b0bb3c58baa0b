//! Preferred-port search.

use std::net::TcpListener;

use crate::error::ServerError;

/// Find the first bindable port at or after `preferred`.
///
/// Probes at most `max_attempts` consecutive ports by binding and immediately
/// releasing a listener on `host`. The search stops early at port 65535.
///
/// The result is only a hint: another process may grab the port before the
/// real listener binds it, which surfaces later as [`ServerError::BindFailed`].
///
/// # Errors
///
/// Returns [`ServerError::PortExhausted`] if no probed port could be bound.
pub fn find_available_port(
    host: &str,
    preferred: u16,
    max_attempts: u16,
) -> Result<u16, ServerError> {
    let mut last = preferred;
    let mut attempts = 0;

    for offset in 0..max_attempts {
        let Some(port) = preferred.checked_add(offset) else {
            break;
        };
        last = port;
        attempts += 1;

        match TcpListener::bind((host, port)) {
            Ok(_probe) => {
                if port != preferred {
                    tracing::info!(preferred, port, "Preferred port is busy, using next free port");
                }
                return Ok(port);
            }
            Err(e) => {
                tracing::debug!(port, error = %e, "Port unavailable");
            }
        }
    }

    Err(ServerError::PortExhausted {
        first: preferred,
        last,
        attempts,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Bind an ephemeral port and keep it occupied.
    fn occupy_port() -> (TcpListener, u16) {
        let listener = TcpListener::bind(("127.0.0.1", 0)).unwrap();
        let port = listener.local_addr().unwrap().port();
        (listener, port)
    }

    #[test]
    fn test_returns_preferred_port_when_free() {
        let (listener, port) = occupy_port();
        drop(listener);

        let found = find_available_port("127.0.0.1", port, 10).unwrap();
        assert_eq!(found, port);
    }

    #[test]
    fn test_skips_occupied_preferred_port() {
        let (_listener, port) = occupy_port();
        if port > u16::MAX - 10 {
            return;
        }

        let found = find_available_port("127.0.0.1", port, 10).unwrap();
        assert!(found > port && found < port + 10, "found {found} from {port}");
    }

    #[test]
    fn test_fails_when_every_candidate_is_taken() {
        let (_listener, port) = occupy_port();

        let err = find_available_port("127.0.0.1", port, 1).unwrap_err();
        assert!(matches!(
            err,
            ServerError::PortExhausted { first, last, attempts: 1 } if first == port && last == port
        ));
    }

    #[test]
    fn test_zero_attempts_is_exhausted() {
        let err = find_available_port("127.0.0.1", 5500, 0).unwrap_err();
        assert!(matches!(err, ServerError::PortExhausted { attempts: 0, .. }));
    }

    #[test]
    fn test_search_stops_at_last_port() {
        let Ok(_listener) = TcpListener::bind(("127.0.0.1", u16::MAX)) else {
            // Port 65535 already taken by someone else: the search must still stop there
            let err = find_available_port("127.0.0.1", u16::MAX, 10).unwrap_err();
            assert!(matches!(err, ServerError::PortExhausted { attempts: 1, .. }));
            return;
        };

        let err = find_available_port("127.0.0.1", u16::MAX, 10).unwrap_err();
        assert!(matches!(
            err,
            ServerError::PortExhausted { last: u16::MAX, attempts: 1, .. }
        ));
    }
}

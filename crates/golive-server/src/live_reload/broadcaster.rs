//! Registry of connected reload clients.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use tokio::sync::mpsc;

/// Identifier assigned to a registered client.
pub type ClientId = u64;

/// Message delivered to a client connection task.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ClientMessage {
    /// Tell the browser to reload.
    Reload,
    /// Close the connection.
    Close,
}

struct Clients {
    senders: HashMap<ClientId, mpsc::UnboundedSender<ClientMessage>>,
    closed: bool,
}

/// Fan-out of reload signals to every connected browser tab.
///
/// The lock is held only to add, remove, or snapshot senders, never while a
/// message is delivered.
pub struct Broadcaster {
    clients: Mutex<Clients>,
    next_id: AtomicU64,
}

impl Broadcaster {
    /// Create an empty, open broadcaster.
    #[must_use]
    pub fn new() -> Self {
        Self {
            clients: Mutex::new(Clients {
                senders: HashMap::new(),
                closed: false,
            }),
            next_id: AtomicU64::new(1),
        }
    }

    /// Register a new client.
    ///
    /// Returns `None` once [`close_all`](Self::close_all) has run.
    pub fn register(&self) -> Option<(ClientId, mpsc::UnboundedReceiver<ClientMessage>)> {
        let (tx, rx) = mpsc::unbounded_channel();
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);

        let mut clients = self.clients.lock();
        if clients.closed {
            return None;
        }
        clients.senders.insert(id, tx);
        let count = clients.senders.len();
        drop(clients);

        tracing::debug!(client = id, clients = count, "Reload client connected");
        Some((id, rx))
    }

    /// Remove a client. Unknown ids are ignored.
    pub fn unregister(&self, id: ClientId) {
        let removed = self.clients.lock().senders.remove(&id).is_some();
        if removed {
            tracing::debug!(client = id, "Reload client disconnected");
        }
    }

    /// Deliver `message` to every client; returns how many were reached.
    ///
    /// Clients whose connection task is gone are dropped silently.
    pub fn broadcast(&self, message: ClientMessage) -> usize {
        let snapshot: Vec<_> = self
            .clients
            .lock()
            .senders
            .iter()
            .map(|(id, tx)| (*id, tx.clone()))
            .collect();

        let mut reached = 0;
        for (id, tx) in snapshot {
            if tx.send(message).is_ok() {
                reached += 1;
            } else {
                self.unregister(id);
            }
        }
        reached
    }

    /// Close every client and refuse new registrations.
    ///
    /// Returns the number of clients told to close.
    pub fn close_all(&self) -> usize {
        let senders: Vec<_> = {
            let mut clients = self.clients.lock();
            clients.closed = true;
            clients.senders.drain().map(|(_, tx)| tx).collect()
        };

        senders
            .into_iter()
            .filter(|tx| tx.send(ClientMessage::Close).is_ok())
            .count()
    }

    /// Number of registered clients.
    #[must_use]
    pub fn client_count(&self) -> usize {
        self.clients.lock().senders.len()
    }

    /// Whether [`close_all`](Self::close_all) has run.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.clients.lock().closed
    }
}

impl Default for Broadcaster {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_broadcast_reaches_every_client() {
        let broadcaster = Broadcaster::new();
        let (_, mut rx1) = broadcaster.register().unwrap();
        let (_, mut rx2) = broadcaster.register().unwrap();

        assert_eq!(broadcaster.broadcast(ClientMessage::Reload), 2);
        assert_eq!(rx1.try_recv().unwrap(), ClientMessage::Reload);
        assert_eq!(rx2.try_recv().unwrap(), ClientMessage::Reload);
    }

    #[test]
    fn test_broadcast_without_clients() {
        let broadcaster = Broadcaster::new();
        assert_eq!(broadcaster.broadcast(ClientMessage::Reload), 0);
    }

    #[test]
    fn test_dead_client_is_dropped_silently() {
        let broadcaster = Broadcaster::new();
        let (_, rx1) = broadcaster.register().unwrap();
        let (_, mut rx2) = broadcaster.register().unwrap();
        drop(rx1);

        assert_eq!(broadcaster.broadcast(ClientMessage::Reload), 1);
        assert_eq!(broadcaster.client_count(), 1);
        assert_eq!(rx2.try_recv().unwrap(), ClientMessage::Reload);
    }

    #[test]
    fn test_unregister() {
        let broadcaster = Broadcaster::new();
        let (id, _rx) = broadcaster.register().unwrap();
        assert_eq!(broadcaster.client_count(), 1);

        broadcaster.unregister(id);
        broadcaster.unregister(id);
        assert_eq!(broadcaster.client_count(), 0);
    }

    #[test]
    fn test_ids_are_unique() {
        let broadcaster = Broadcaster::new();
        let (a, _rx_a) = broadcaster.register().unwrap();
        let (b, _rx_b) = broadcaster.register().unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_close_all_sends_close_and_refuses_new_clients() {
        let broadcaster = Broadcaster::new();
        let (_, mut rx) = broadcaster.register().unwrap();

        assert_eq!(broadcaster.close_all(), 1);
        assert_eq!(rx.try_recv().unwrap(), ClientMessage::Close);
        assert_eq!(broadcaster.client_count(), 0);
        assert!(broadcaster.is_closed());
        assert!(broadcaster.register().is_none());
        assert_eq!(broadcaster.broadcast(ClientMessage::Reload), 0);
    }

    #[test]
    fn test_concurrent_register_and_broadcast() {
        let broadcaster = std::sync::Arc::new(Broadcaster::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let broadcaster = std::sync::Arc::clone(&broadcaster);
                std::thread::spawn(move || {
                    let (_, rx) = broadcaster.register().unwrap();
                    broadcaster.broadcast(ClientMessage::Reload);
                    rx
                })
            })
            .collect();

        let mut receivers: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert_eq!(broadcaster.client_count(), 8);
        for rx in &mut receivers {
            assert_eq!(rx.try_recv().unwrap(), ClientMessage::Reload);
        }
    }
}

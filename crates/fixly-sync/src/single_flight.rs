//! Per-key operation guard.

use std::collections::HashMap;
use std::future::Future;
use std::hash::Hash;
use std::sync::{Arc, Mutex};

/// Admission control for per-key operations.
///
/// At most one operation runs at a time for any given key; callers for
/// the same key are admitted in arrival order (the gate is a fair
/// queue), and callers for distinct keys never wait on each other. A
/// caller whose operation was made redundant by the flight it waited on
/// collapses into a cache hit upstream (the engine's unchanged-digest
/// short-circuit), so racing duplicate writers produce a single store
/// write without re-running it.
///
/// Tickets are reference-counted and removed from the registry as soon
/// as the last interested caller finishes, regardless of how many
/// waiters there were, so a failed operation releases the key
/// immediately and the next call runs fresh. There is no poisoned
/// state.
#[derive(Debug, Default)]
pub struct SingleFlight<K> {
    tickets: Mutex<HashMap<K, Arc<Ticket>>>,
}

#[derive(Debug, Default)]
struct Ticket {
    // tokio's Mutex queues waiters fairly, which is what gives
    // per-session FIFO merge order.
    gate: tokio::sync::Mutex<()>,
}

impl<K> SingleFlight<K>
where
    K: Eq + Hash + Clone,
{
    /// Creates an empty guard registry.
    pub fn new() -> Self {
        Self {
            tickets: Mutex::new(HashMap::new()),
        }
    }

    /// Runs `op` for `key`, waiting first for any operation already in
    /// flight for the same key.
    ///
    /// The registry lock is only held for map bookkeeping, never across
    /// an await, so operations on unrelated keys proceed fully in
    /// parallel.
    pub async fn run<T, F, Fut>(&self, key: K, op: F) -> T
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        let ticket = {
            let mut tickets = self.tickets.lock().expect("ticket registry poisoned");
            tickets.entry(key.clone()).or_default().clone()
        };

        let _cleanup = TicketCleanup {
            registry: self,
            key: &key,
            ticket: &ticket,
        };
        let _admitted = ticket.gate.lock().await;
        op().await
    }

    /// Number of keys with a registered ticket. Used by tests to verify
    /// the registry drains.
    pub fn in_flight(&self) -> usize {
        self.tickets.lock().expect("ticket registry poisoned").len()
    }
}

/// Removes the ticket once the last caller holding it finishes,
/// including on cancellation.
struct TicketCleanup<'a, K: Eq + Hash> {
    registry: &'a SingleFlight<K>,
    key: &'a K,
    ticket: &'a Arc<Ticket>,
}

impl<K: Eq + Hash> Drop for TicketCleanup<'_, K> {
    fn drop(&mut self) {
        let mut tickets = self
            .registry
            .tickets
            .lock()
            .expect("ticket registry poisoned");
        // Two strong references mean the map entry plus ourselves: no
        // other caller is waiting, so the ticket can go.
        if Arc::strong_count(self.ticket) == 2 {
            tickets.remove(self.key);
        }
    }
}

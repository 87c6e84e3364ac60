//! The unsolicited-frame listener table.

use std::sync::{Arc, Mutex};

use even_g1_core::event::EventPattern;
use even_g1_core::Side;

struct ListenerEntry {
    id: String,
    matches: Box<dyn Fn(&[u8], Side) -> bool + Send + Sync>,
    deliver: Box<dyn Fn(&[u8], Side) + Send + Sync>,
}

/// Registered predicates and handlers for frames no command is waiting for.
///
/// Registration is idempotent by id: re-registering an id replaces the old
/// entry in place, keeping its position in the scan order. Dispatch scans in
/// registration order and stops at the first matching predicate.
#[derive(Default)]
pub(crate) struct ListenerTable {
    entries: Mutex<Vec<Arc<ListenerEntry>>>,
}

impl ListenerTable {
    pub(crate) fn register<P, F>(&self, id: &str, pattern: P, handler: F)
    where
        P: EventPattern + 'static,
        F: Fn(P::Output, Side) + Send + Sync + 'static,
    {
        let pattern = Arc::new(pattern);
        let predicate = Arc::clone(&pattern);
        let entry = Arc::new(ListenerEntry {
            id: id.to_owned(),
            matches: Box::new(move |data, side| predicate.matches(data, side)),
            deliver: Box::new(move |data, side| handler(pattern.parse(data, side), side)),
        });

        let mut entries = self.entries.lock().unwrap();
        match entries.iter_mut().find(|existing| existing.id == id) {
            Some(slot) => *slot = entry,
            None => entries.push(entry),
        }
    }

    pub(crate) fn remove(&self, id: &str) -> bool {
        let mut entries = self.entries.lock().unwrap();
        let before = entries.len();
        entries.retain(|entry| entry.id != id);
        entries.len() != before
    }

    /// Delivers `data` to the first listener whose predicate matches.
    /// Returns whether any did. Handlers run outside the table lock.
    pub(crate) fn dispatch(&self, data: &[u8], side: Side) -> bool {
        let entries: Vec<Arc<ListenerEntry>> = self.entries.lock().unwrap().clone();
        for entry in entries {
            if (entry.matches)(data, side) {
                (entry.deliver)(data, side);
                return true;
            }
        }
        false
    }
}

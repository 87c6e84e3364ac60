//! Per-side bookkeeping for in-flight commands.
//!
//! Correlation is by response prefix: a reply belongs to whichever pending
//! command's prefix it starts with. That only stays unambiguous if no two
//! entries in the same side's registry have prefixes where one is a prefix
//! of the other, so admission rejects any candidate whose prefix agrees
//! with an existing entry over their common length.

use std::sync::{Arc, Mutex};

use crate::error::Error;

/// Resolves the command's promise. Taken at most once; later completion
/// attempts (a second response, the deadline, a disconnect) find it gone.
type Completer = Box<dyn FnOnce(Result<&[u8], Error>) + Send>;

/// One in-flight command, shared between the side registries it was
/// admitted to, its deadline timer, and the submitter's handle.
pub(crate) struct Pending {
    id: u64,
    prefix: Vec<u8>,
    completer: Mutex<Option<Completer>>,
}

impl Pending {
    pub(crate) fn new(id: u64, prefix: Vec<u8>, completer: Completer) -> Arc<Self> {
        Arc::new(Self {
            id,
            prefix,
            completer: Mutex::new(Some(completer)),
        })
    }

    pub(crate) fn id(&self) -> u64 {
        self.id
    }

    pub(crate) fn prefix(&self) -> &[u8] {
        &self.prefix
    }

    fn take(&self) -> Option<Completer> {
        self.completer.lock().unwrap().take()
    }

    /// Resolves with a matched response frame. No-op if already resolved.
    pub(crate) fn complete_ok(&self, data: &[u8]) {
        if let Some(complete) = self.take() {
            complete(Ok(data));
        }
    }

    /// Resolves with a failure. No-op if already resolved.
    pub(crate) fn complete_err(&self, err: Error) {
        if let Some(complete) = self.take() {
            complete(Err(err));
        }
    }
}

/// The ordered list of commands awaiting responses on one side.
///
/// The engine serializes access behind its own mutex; the registry itself
/// is plain data.
#[derive(Default)]
pub(crate) struct PendingRegistry {
    entries: Vec<Arc<Pending>>,
}

impl PendingRegistry {
    /// Whether `prefix` can be admitted without making correlation
    /// ambiguous against any current entry.
    pub(crate) fn admits(&self, prefix: &[u8]) -> bool {
        self.entries
            .iter()
            .all(|entry| !prefixes_collide(entry.prefix(), prefix))
    }

    /// Appends an entry. Callers must have checked [`admits`](Self::admits)
    /// under the same lock.
    pub(crate) fn insert(&mut self, entry: Arc<Pending>) {
        self.entries.push(entry);
    }

    /// Removes and returns every entry whose prefix matches `data`, in
    /// insertion order.
    pub(crate) fn take_matches(&mut self, data: &[u8]) -> Vec<Arc<Pending>> {
        let mut matched = Vec::new();
        self.entries.retain(|entry| {
            if prefix_matches(entry.prefix(), data) {
                matched.push(Arc::clone(entry));
                false
            } else {
                true
            }
        });
        matched
    }

    /// Removes an entry by identity. Idempotent.
    pub(crate) fn remove(&mut self, id: u64) -> Option<Arc<Pending>> {
        let pos = self.entries.iter().position(|entry| entry.id() == id)?;
        Some(self.entries.remove(pos))
    }

    /// Removes and returns everything, e.g. when the side disconnects.
    pub(crate) fn drain(&mut self) -> Vec<Arc<Pending>> {
        std::mem::take(&mut self.entries)
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }
}

/// Two response prefixes collide when they agree over their common length;
/// any disagreeing byte makes them distinguishable.
pub(crate) fn prefixes_collide(a: &[u8], b: &[u8]) -> bool {
    let common = a.len().min(b.len());
    a[..common] == b[..common]
}

/// A response belongs to a command when it starts with the command's full
/// prefix.
pub(crate) fn prefix_matches(prefix: &[u8], data: &[u8]) -> bool {
    data.len() >= prefix.len() && &data[..prefix.len()] == prefix
}

//! The protocol engine: routes commands to the two sides, correlates
//! responses back to their submitters, and feeds unsolicited frames to
//! registered listeners.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;

use even_g1_core::event::{EventPattern, AUDIO_OPCODE};
use even_g1_core::{Command, Side};
use tokio::sync::oneshot;

use crate::error::{Error, Result};
use crate::listener::ListenerTable;
use crate::registry::{Pending, PendingRegistry};
use crate::transport::{SideState, Transport, TransportEvent};

/// One value per side.
struct PerSide<T> {
    left: T,
    right: T,
}

impl<T> PerSide<T> {
    fn get(&self, side: Side) -> &T {
        match side {
            Side::Left => &self.left,
            Side::Right => &self.right,
        }
    }

    fn get_mut(&mut self, side: Side) -> &mut T {
        match side {
            Side::Left => &mut self.left,
            Side::Right => &mut self.right,
        }
    }
}

struct EngineInner {
    transports: PerSide<Arc<dyn Transport>>,
    registries: Mutex<PerSide<PendingRegistry>>,
    states: Mutex<PerSide<SideState>>,
    listeners: ListenerTable,
    next_id: AtomicU64,
}

impl EngineInner {
    /// Withdraws a command from every registry it was admitted to.
    /// Idempotent with concurrent matches, timeouts and disconnects.
    fn remove_everywhere(&self, id: u64) -> Option<Arc<Pending>> {
        let mut registries = self.registries.lock().unwrap();
        let left = registries.left.remove(id);
        let right = registries.right.remove(id);
        left.or(right)
    }
}

/// The dual-side protocol engine.
///
/// Owns one pending registry and one lifecycle state per side plus the
/// shared listener table. Cloning is cheap and clones share all state.
///
/// Outbound: [`submit`](Engine::submit) admits a command against its target
/// registries (rejecting response-prefix collisions), writes its packets and
/// returns a typed handle. Inbound: the transport glue calls
/// [`on_bytes`](Engine::on_bytes) with each received frame and
/// [`on_transport_event`](Engine::on_transport_event) with lifecycle
/// changes.
#[derive(Clone)]
pub struct Engine {
    inner: Arc<EngineInner>,
}

impl Engine {
    /// Builds an engine over the two transport endpoints.
    pub fn new(left: Arc<dyn Transport>, right: Arc<dyn Transport>) -> Self {
        Self {
            inner: Arc::new(EngineInner {
                transports: PerSide { left, right },
                registries: Mutex::new(PerSide {
                    left: PendingRegistry::default(),
                    right: PendingRegistry::default(),
                }),
                states: Mutex::new(PerSide {
                    left: SideState::default(),
                    right: SideState::default(),
                }),
                listeners: ListenerTable::default(),
                next_id: AtomicU64::new(1),
            }),
        }
    }

    /// Current lifecycle state of one side.
    pub fn side_state(&self, side: Side) -> SideState {
        *self.inner.states.lock().unwrap().get(side)
    }

    /// Connects one side's transport.
    ///
    /// On success the side is `Connected`; it becomes `Initialized` once the
    /// transport glue reports [`TransportEvent::Initialized`].
    pub async fn connect(&self, side: Side) -> Result<()> {
        self.on_transport_event(side, TransportEvent::Connecting);
        match self.inner.transports.get(side).connect().await {
            Ok(()) => {
                self.on_transport_event(side, TransportEvent::Connected);
                // transports that finish MTU/discovery/subscription inside
                // connect() are ready right away
                if self.inner.transports.get(side).is_initialized() {
                    self.on_transport_event(side, TransportEvent::Initialized);
                }
                Ok(())
            }
            Err(err) => {
                self.on_transport_event(side, TransportEvent::Disconnected);
                Err(err.into())
            }
        }
    }

    /// Disconnects one side, failing its pending commands.
    pub async fn disconnect(&self, side: Side) {
        self.inner.transports.get(side).disconnect().await;
        self.on_transport_event(side, TransportEvent::Disconnected);
    }

    /// Applies a lifecycle change reported by the transport layer.
    ///
    /// A transition to `Disconnected` fails every command pending on that
    /// side with [`Error::SideDisconnected`]; out-of-order events are
    /// logged and ignored.
    pub fn on_transport_event(&self, side: Side, event: TransportEvent) {
        let accepted = {
            let mut states = self.inner.states.lock().unwrap();
            let current = *states.get(side);
            match current.apply(event) {
                Some(next) => {
                    if next != current {
                        log::debug!("{side} side: {current:?} -> {next:?}");
                    }
                    *states.get_mut(side) = next;
                    true
                }
                None => {
                    log::warn!("{side} side: ignoring {event:?} while {current:?}");
                    false
                }
            }
        };

        if accepted && event == TransportEvent::Disconnected {
            let dropped = self.inner.registries.lock().unwrap().get_mut(side).drain();
            for entry in dropped {
                entry.complete_err(Error::SideDisconnected(side));
            }
        }
    }

    /// Submits a command and returns a handle resolving to its decoded
    /// response.
    ///
    /// Every target side must be `Initialized` and free of in-flight
    /// commands with a colliding response prefix; admission is
    /// all-or-nothing across both sides. Packets are written in order, a
    /// failed write withdraws the command everywhere. Commands targeting
    /// both sides resolve with the first matching response and fail with the
    /// first side failure.
    pub async fn submit<R: Send + 'static>(&self, cmd: Command<R>) -> Result<CommandHandle<R>> {
        let targets = cmd.target().sides();

        {
            let states = self.inner.states.lock().unwrap();
            for &side in targets {
                if *states.get(side) != SideState::Initialized {
                    return Err(Error::SideNotReady(side));
                }
            }
        }

        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = oneshot::channel();
        let decode = cmd.decoder();
        let entry = Pending::new(
            id,
            cmd.response_prefix().to_vec(),
            Box::new(move |outcome: Result<&[u8]>| {
                let result = outcome.and_then(|data| decode(data).map_err(Error::from));
                let _ = tx.send(result);
            }),
        );

        {
            let mut registries = self.inner.registries.lock().unwrap();
            for &side in targets {
                if !registries.get(side).admits(entry.prefix()) {
                    return Err(Error::Busy);
                }
            }
            for &side in targets {
                registries.get_mut(side).insert(Arc::clone(&entry));
            }
        }

        for &side in targets {
            for packet in cmd.packets() {
                if let Err(err) = self.inner.transports.get(side).send(packet).await {
                    log::error!("{side} side: write failed: {err}");
                    self.inner.remove_everywhere(id);
                    return Err(err.into());
                }
            }
        }

        self.arm_deadline(id, cmd.deadline());

        Ok(CommandHandle {
            id,
            rx,
            engine: Arc::downgrade(&self.inner),
        })
    }

    /// Submits a command and awaits its response up to the command deadline.
    pub async fn submit_and_wait<R: Send + 'static>(&self, cmd: Command<R>) -> Result<R> {
        let deadline = cmd.deadline();
        let handle = self.submit(cmd).await?;
        match tokio::time::timeout(deadline, handle.wait()).await {
            Ok(result) => result,
            Err(_) => Err(Error::Timeout),
        }
    }

    fn arm_deadline(&self, id: u64, deadline: Duration) {
        let inner = Arc::downgrade(&self.inner);
        tokio::spawn(async move {
            tokio::time::sleep(deadline).await;
            if let Some(inner) = inner.upgrade() {
                if let Some(entry) = inner.remove_everywhere(id) {
                    log::debug!("command {id} hit its {deadline:?} deadline");
                    entry.complete_err(Error::Timeout);
                }
            }
        });
    }

    /// Feeds one received frame into the engine.
    ///
    /// Callable from any thread; the two transports may deliver from
    /// independent executors. Matching pending commands are resolved and
    /// withdrawn, then the frame is offered to the listener table
    /// (first matching predicate wins). Frames nobody claims are logged and
    /// dropped; this never fails and never panics on garbage.
    pub fn on_bytes(&self, side: Side, data: &[u8]) {
        if data.is_empty() {
            log::warn!("{side} side: empty frame");
            return;
        }

        let matched = self
            .inner
            .registries
            .lock()
            .unwrap()
            .get_mut(side)
            .take_matches(data);
        let had_command = !matched.is_empty();
        for entry in matched {
            entry.complete_ok(data);
        }

        let had_listener = self.inner.listeners.dispatch(data, side);

        if !had_command && !had_listener {
            if data[0] == AUDIO_OPCODE {
                log::trace!("{side} side: dropping {}-byte audio frame", data.len());
            } else {
                log::debug!(
                    "{side} side: unknown frame {:02X?}",
                    &data[..data.len().min(16)]
                );
            }
        }
    }

    /// Registers a listener for unsolicited frames. Re-registering an id
    /// replaces the previous listener.
    pub fn add_listener<P, F>(&self, id: &str, pattern: P, handler: F)
    where
        P: EventPattern + 'static,
        F: Fn(P::Output, Side) + Send + Sync + 'static,
    {
        self.inner.listeners.register(id, pattern, handler);
    }

    /// Removes a listener. Returns whether it existed.
    pub fn remove_listener(&self, id: &str) -> bool {
        self.inner.listeners.remove(id)
    }
}

/// A submitted command's completion promise.
///
/// Resolves at most once: with the decoded response, or with the first of
/// timeout, cancellation, transport failure or disconnect.
pub struct CommandHandle<R> {
    id: u64,
    rx: oneshot::Receiver<Result<R>>,
    engine: Weak<EngineInner>,
}

impl<R> CommandHandle<R> {
    /// Awaits the command's resolution.
    pub async fn wait(self) -> Result<R> {
        match self.rx.await {
            Ok(result) => result,
            // the engine was dropped with the command still pending
            Err(_) => Err(Error::Cancelled),
        }
    }

    /// Cancels the command: it is withdrawn from the registries
    /// synchronously and no later response can resolve it.
    pub fn cancel(self) {
        if let Some(inner) = self.engine.upgrade() {
            if let Some(entry) = inner.remove_everywhere(self.id) {
                entry.complete_err(Error::Cancelled);
            }
        }
    }
}

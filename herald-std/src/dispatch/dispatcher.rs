use super::waiter::{Predicate, Waiter, WaiterGuard};
use super::{lock, read, write};
use crate::hooks::logging::default_error_handler;
use crate::hooks::run::panic_message;
use futures::FutureExt;
use herald_core::{
    BoxError, Event, HookError, Intents, Listener, normalize_event_name, required_intents, share,
};
use std::collections::{HashMap, HashSet};
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use tokio::runtime::Handle;
use tokio::sync::{oneshot, watch};
use tokio::task::JoinSet;
use tracing::{debug, warn};

pub(super) struct Inner {
    intents: Intents,
    listeners: RwLock<HashMap<String, Vec<Arc<Listener>>>>,
    pub(super) waiters: Mutex<HashMap<String, Vec<Waiter>>>,
    next_waiter: AtomicU64,
    ready: watch::Sender<bool>,
    tasks: Mutex<JoinSet<()>>,
}

/// Routes events to listeners and waiters.
///
/// Cloning is cheap; every clone drives the same registries.
#[derive(Clone)]
pub struct Dispatcher {
    pub(super) inner: Arc<Inner>,
}

impl Dispatcher {
    /// Creates a dispatcher. `intents` is only consulted to warn about
    /// listeners that can never fire.
    pub fn new(intents: Intents) -> Self {
        let (ready, _) = watch::channel(false);
        Self {
            inner: Arc::new(Inner {
                intents,
                listeners: RwLock::new(HashMap::new()),
                waiters: Mutex::new(HashMap::new()),
                next_waiter: AtomicU64::new(0),
                ready,
                tasks: Mutex::new(JoinSet::new()),
            }),
        }
    }

    pub fn intents(&self) -> Intents {
        self.inner.intents
    }

    // ========================================================================
    // Listener registry
    // ========================================================================

    /// Registers a listener and returns the handle used to remove it.
    ///
    /// Listeners fire in registration order. Registering a listener that
    /// disables defaults evicts every default listener of the same event.
    pub fn add_listener(&self, listener: Listener) -> Arc<Listener> {
        if !listener.is_default() {
            if let Some(required) = required_intents(listener.event()) {
                if !required.intersects(self.inner.intents) {
                    warn!(
                        event = listener.event(),
                        ?required,
                        "listener registered for an event none of whose intents are enabled"
                    );
                }
            }
        }

        let listener = Arc::new(listener);
        let mut listeners = write(&self.inner.listeners);
        let list = listeners.entry(listener.event().to_owned()).or_default();
        list.push(Arc::clone(&listener));

        if list.iter().any(|l| l.is_default()) && list.iter().any(|l| l.disables_defaults()) {
            list.retain(|l| !l.is_default());
            debug!(event = listener.event(), "default listeners removed");
        }
        listener
    }

    /// Removes a listener by identity. Returns false if it was not registered.
    pub fn remove_listener(&self, listener: &Arc<Listener>) -> bool {
        let mut listeners = write(&self.inner.listeners);
        let Some(list) = listeners.get_mut(listener.event()) else {
            return false;
        };
        let before = list.len();
        list.retain(|l| !Arc::ptr_eq(l, listener));
        let removed = list.len() != before;
        if list.is_empty() {
            listeners.remove(listener.event());
        }
        removed
    }

    /// Removes every listener attributed to `extension`. Returns how many were removed.
    pub fn remove_extension_listeners(&self, extension: &str) -> usize {
        let mut listeners = write(&self.inner.listeners);
        let mut removed = 0;
        for list in listeners.values_mut() {
            let before = list.len();
            list.retain(|l| l.extension() != Some(extension));
            removed += before - list.len();
        }
        listeners.retain(|_, list| !list.is_empty());
        removed
    }

    /// Snapshot of the listeners registered for `event`, in dispatch order.
    pub fn listeners(&self, event: &str) -> Vec<Arc<Listener>> {
        read(&self.inner.listeners)
            .get(&normalize_event_name(event))
            .cloned()
            .unwrap_or_default()
    }

    // ========================================================================
    // Dispatch
    // ========================================================================

    /// Fans an event out to its listeners and waiters.
    ///
    /// Returns as soon as every listener has been spawned; it never waits for
    /// them. Waiter predicates run inline, in registration order.
    pub fn dispatch(&self, event: Event) {
        debug!(event = event.name(), "dispatching");
        let listeners = read(&self.inner.listeners)
            .get(event.name())
            .cloned()
            .unwrap_or_default();

        if !listeners.is_empty() {
            match Handle::try_current() {
                Ok(handle) => {
                    let mut tasks = lock(&self.inner.tasks);
                    while tasks.try_join_next().is_some() {}
                    for listener in listeners {
                        let this = self.clone();
                        tasks.spawn_on(this.run_listener(listener, event.clone()), &handle);
                    }
                }
                Err(_) => warn!(
                    event = event.name(),
                    "dispatch called outside a tokio runtime; listeners skipped"
                ),
            }
        }

        self.resolve_waiters(&event);
    }

    async fn run_listener(self, listener: Arc<Listener>, event: Event) {
        if listener.requires_ready() && !event.is_error_report() && !event.is_raw() {
            self.wait_until_ready().await;
        }

        let result = AssertUnwindSafe(listener.call(event.clone()))
            .catch_unwind()
            .await;
        let error: BoxError = match result {
            Ok(Ok(())) => return,
            Ok(Err(error)) => error,
            Err(panic) => Box::new(HookError::Panic(panic_message(panic.as_ref()))),
        };
        if matches!(error.downcast_ref::<HookError>(), Some(HookError::Cancelled)) {
            return;
        }

        let source = event.to_string();
        if event.is_error_report() {
            default_error_handler(&source, error.as_ref());
        } else {
            self.dispatch(Event::error(source, share(error), event.context()));
        }
    }

    fn resolve_waiters(&self, event: &Event) {
        let candidates: Vec<(u64, Predicate)> = match lock(&self.inner.waiters).get(event.name()) {
            Some(pending) => pending
                .iter()
                .map(|waiter| (waiter.id, Arc::clone(&waiter.predicate)))
                .collect(),
            None => return,
        };

        let fired: HashSet<u64> = candidates
            .into_iter()
            .filter(|(_, predicate)| {
                std::panic::catch_unwind(AssertUnwindSafe(|| predicate(event))).unwrap_or_else(|_| {
                    warn!(event = event.name(), "waiter predicate panicked");
                    false
                })
            })
            .map(|(id, _)| id)
            .collect();
        if fired.is_empty() {
            return;
        }

        let matched = {
            let mut waiters = lock(&self.inner.waiters);
            let Some(pending) = waiters.get_mut(event.name()) else {
                return;
            };
            let (matched, kept): (Vec<Waiter>, Vec<Waiter>) = std::mem::take(pending)
                .into_iter()
                .partition(|waiter| fired.contains(&waiter.id));
            *pending = kept;
            if pending.is_empty() {
                waiters.remove(event.name());
            }
            matched
        };
        for waiter in matched {
            // The receiver may already be gone if its timeout raced this event.
            let _ = waiter.slot.send(event.clone());
        }
    }

    pub(super) fn register_waiter(
        &self,
        event: &str,
        predicate: Predicate,
    ) -> (oneshot::Receiver<Event>, WaiterGuard) {
        let name = normalize_event_name(event);
        let id = self.inner.next_waiter.fetch_add(1, Ordering::Relaxed);
        let (slot, receiver) = oneshot::channel();
        lock(&self.inner.waiters)
            .entry(name.clone())
            .or_default()
            .push(Waiter {
                id,
                predicate,
                slot,
            });
        let guard = WaiterGuard::new(Arc::downgrade(&self.inner), name, id);
        (receiver, guard)
    }

    /// Number of waiters still pending on `event`.
    pub fn pending_waiters(&self, event: &str) -> usize {
        lock(&self.inner.waiters)
            .get(&normalize_event_name(event))
            .map_or(0, Vec::len)
    }

    // ========================================================================
    // Readiness and lifecycle
    // ========================================================================

    pub fn set_ready(&self, ready: bool) {
        self.inner.ready.send_replace(ready);
    }

    pub fn is_ready(&self) -> bool {
        *self.inner.ready.borrow()
    }

    /// Suspends until the ready flag is set.
    pub async fn wait_until_ready(&self) {
        let mut receiver = self.inner.ready.subscribe();
        // The sender lives as long as `self`, so this cannot fail.
        let _ = receiver.wait_for(|ready| *ready).await;
    }

    /// Waits until every spawned listener, including those spawned while
    /// waiting, has finished.
    pub async fn wait_idle(&self) {
        let tasks = &self.inner.tasks;
        while std::future::poll_fn(|cx| lock(tasks).poll_join_next(cx))
            .await
            .is_some()
        {}
    }

    /// Aborts every in-flight listener. Aborted listeners never report errors.
    pub fn shutdown(&self) {
        lock(&self.inner.tasks).abort_all();
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("intents", &self.inner.intents)
            .field("ready", &self.is_ready())
            .finish_non_exhaustive()
    }
}

//! Host runtime: lifecycle handler registration and event dispatch.
//!
//! A [`LifecycleHandler`] is registered with a [`Host`] and receives
//! `install`, `activate` and `fetch` events. Registration returns a
//! [`Subscription`]; dropping or disposing it unregisters the handler.
//!
//! [`LocalHost`] is the in-process dispatcher. It enforces event order:
//!
//! ```text
//! Parsed -> Installing -> Installed -> Activating -> Activated
//!               |                          |
//!               v                          v
//!           Redundant                  Installed (activation failed)
//! ```
//!
//! Fetch events reach a handler only once it is `Activated`. Until then the
//! previously activated handler keeps answering them, or the host sends the
//! request to the network itself when there is none.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use swcache_core::{CacheRequest, Error};

use crate::fetch::Fetcher;
use crate::intercept::{InterceptedResponse, ResponseSource};

/// Lifecycle state of a registered handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum WorkerState {
    Parsed,
    Installing,
    Installed,
    Activating,
    Activated,
    Redundant,
}

/// Receiver of host lifecycle events.
#[async_trait::async_trait]
pub trait LifecycleHandler: Send + Sync {
    /// Prepare everything needed before activation. Failure makes the
    /// handler redundant; the host may install again later.
    async fn on_install(&self) -> Result<(), Error>;

    /// Take over from any previous version.
    async fn on_activate(&self) -> Result<(), Error>;

    /// Answer an intercepted request.
    async fn on_fetch(&self, request: &CacheRequest) -> Result<InterceptedResponse, Error>;

    /// Activate right after a successful install instead of waiting.
    fn skip_waiting(&self) -> bool {
        false
    }
}

/// Dispatcher that handlers register with.
pub trait Host: Send + Sync {
    fn register(&self, handler: Arc<dyn LifecycleHandler>) -> Subscription;
}

/// Disposable registration. Unregisters on drop.
#[must_use = "dropping a Subscription unregisters the handler"]
pub struct Subscription {
    id: u64,
    on_dispose: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
    pub fn new(id: u64, on_dispose: impl FnOnce() + Send + 'static) -> Self {
        Self { id, on_dispose: Some(Box::new(on_dispose)) }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    /// Unregister now.
    pub fn dispose(mut self) {
        self.run_dispose();
    }

    fn run_dispose(&mut self) {
        if let Some(on_dispose) = self.on_dispose.take() {
            on_dispose();
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("disposed", &self.on_dispose.is_none())
            .finish()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.run_dispose();
    }
}

struct Registration {
    id: u64,
    handler: Arc<dyn LifecycleHandler>,
    state: WorkerState,
}

#[derive(Default)]
struct Registrations {
    /// Newest registration, until it is activated.
    incoming: Option<Registration>,
    /// Registration answering fetch events.
    active: Option<Registration>,
}

#[derive(Default)]
struct Registry {
    slots: Mutex<Registrations>,
    next_id: AtomicU64,
}

impl Registry {
    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Registrations>, Error> {
        self.slots
            .lock()
            .map_err(|e| Error::Lifecycle(format!("host registry poisoned: {e}")))
    }

    /// Move the incoming registration from one of `from` to `to`, returning
    /// its id and handler. With `expected`, the incoming registration must
    /// still be that one.
    fn transition(
        &self, expected: Option<u64>, from: &[WorkerState], to: WorkerState,
    ) -> Result<(u64, Arc<dyn LifecycleHandler>), Error> {
        let mut slots = self.lock()?;
        let registration = slots
            .incoming
            .as_mut()
            .ok_or_else(|| Error::Lifecycle("no handler waiting to install or activate".into()))?;

        if let Some(id) = expected
            && registration.id != id
        {
            return Err(Error::Lifecycle(format!("registration {id} was replaced by {}", registration.id)));
        }

        if !from.contains(&registration.state) {
            return Err(Error::Lifecycle(format!(
                "cannot move from {:?} to {:?}",
                registration.state, to
            )));
        }

        registration.state = to;
        Ok((registration.id, Arc::clone(&registration.handler)))
    }

    /// Set the state if `id` is still the incoming registration.
    fn settle(&self, id: u64, state: WorkerState) {
        if let Ok(mut slots) = self.lock()
            && let Some(registration) = slots.incoming.as_mut()
            && registration.id == id
        {
            registration.state = state;
        }
    }

    /// Make the incoming registration `id` the active one. The previously
    /// active registration stops receiving events.
    fn promote(&self, id: u64) -> Result<(), Error> {
        let mut slots = self.lock()?;
        let Some(mut registration) = slots.incoming.take_if(|r| r.id == id) else {
            return Err(Error::Lifecycle(format!("registration {id} was replaced before activation")));
        };

        registration.state = WorkerState::Activated;
        if let Some(previous) = slots.active.replace(registration) {
            tracing::debug!(previous = previous.id, next = id, "replaced active handler");
        }
        Ok(())
    }

    fn unregister(&self, id: u64) {
        if let Ok(mut slots) = self.lock() {
            let removed = slots.incoming.take_if(|r| r.id == id).is_some()
                || slots.active.take_if(|r| r.id == id).is_some();
            if removed {
                tracing::debug!(registration = id, "handler unregistered");
            }
        }
    }
}

/// In-process host.
///
/// Keeps two registrations like a browser does: the newest one moving
/// through install and activation, and the activated one that answers
/// fetch events. A new handler takes over fetches only once its activation
/// succeeds; until then, and after any failure, the previous one stays in
/// control.
#[derive(Clone)]
pub struct LocalHost {
    registry: Arc<Registry>,
    network: Arc<dyn Fetcher>,
}

impl LocalHost {
    /// `network` answers fetches while no handler is activated.
    pub fn new(network: Arc<dyn Fetcher>) -> Self {
        Self { registry: Arc::new(Registry::default()), network }
    }

    /// State of the newest registration: the incoming one if any, else the
    /// active one.
    pub fn state(&self) -> Option<WorkerState> {
        let slots = self.registry.lock().ok()?;
        slots.incoming.as_ref().or(slots.active.as_ref()).map(|r| r.state)
    }

    /// Id of the registration answering fetch events.
    pub fn active_id(&self) -> Option<u64> {
        self.registry.lock().ok()?.active.as_ref().map(|r| r.id)
    }

    /// Dispatch `install` to the incoming handler. Activates immediately
    /// when the handler asks to skip waiting. Returns the resulting state.
    ///
    /// # Errors
    ///
    /// - `Error::Lifecycle` if no handler is waiting or it was already installed
    /// - the handler's install error (the handler becomes `Redundant`)
    /// - the handler's activation error when skipping the wait
    pub async fn install(&self) -> Result<WorkerState, Error> {
        let (id, handler) =
            self.registry
                .transition(None, &[WorkerState::Parsed, WorkerState::Redundant], WorkerState::Installing)?;

        if let Err(e) = handler.on_install().await {
            tracing::warn!(registration = id, error = %e, "install failed");
            self.registry.settle(id, WorkerState::Redundant);
            return Err(e);
        }
        self.registry.settle(id, WorkerState::Installed);
        tracing::debug!(registration = id, "installed");

        if handler.skip_waiting() {
            self.activate_registration(Some(id)).await?;
            return Ok(WorkerState::Activated);
        }
        Ok(WorkerState::Installed)
    }

    /// Dispatch `activate` to the installed, waiting handler.
    ///
    /// # Errors
    ///
    /// - `Error::Lifecycle` unless a handler is `Installed`
    /// - the handler's activation error (it stays `Installed`, the previous
    ///   handler keeps answering fetches)
    pub async fn activate(&self) -> Result<(), Error> {
        self.activate_registration(None).await
    }

    async fn activate_registration(&self, expected: Option<u64>) -> Result<(), Error> {
        let (id, handler) = self
            .registry
            .transition(expected, &[WorkerState::Installed], WorkerState::Activating)?;

        if let Err(e) = handler.on_activate().await {
            tracing::warn!(registration = id, error = %e, "activation failed");
            self.registry.settle(id, WorkerState::Installed);
            return Err(e);
        }
        self.registry.promote(id)?;
        tracing::debug!(registration = id, "activated");
        Ok(())
    }

    /// Dispatch `fetch` to the active handler, or straight to the network
    /// when there is none.
    pub async fn fetch(&self, request: &CacheRequest) -> Result<InterceptedResponse, Error> {
        let handler = self.registry.lock()?.active.as_ref().map(|r| Arc::clone(&r.handler));

        match handler {
            Some(handler) => handler.on_fetch(request).await,
            None => {
                let response = self.network.fetch(request).await?;
                Ok(InterceptedResponse { source: ResponseSource::Network, response: response.into_stored() })
            }
        }
    }
}

impl Host for LocalHost {
    fn register(&self, handler: Arc<dyn LifecycleHandler>) -> Subscription {
        let id = self.registry.next_id.fetch_add(1, Ordering::SeqCst) + 1;

        if let Ok(mut slots) = self.registry.lock()
            && let Some(previous) = slots.incoming.replace(Registration { id, handler, state: WorkerState::Parsed })
        {
            tracing::debug!(previous = previous.id, next = id, "replaced incoming handler");
        }

        let registry: Weak<Registry> = Arc::downgrade(&self.registry);
        Subscription::new(id, move || {
            if let Some(registry) = registry.upgrade() {
                registry.unregister(id);
            }
        })
    }
}

//! # Task Kinds
//!
//! Two kinds of background work run against the state store:
//!
//! - [`NavigationSlot`]: a single preempting slot. Starting a new occupant
//!   cancels the previous one. Each occupant holds a [`NavTicket`] with a
//!   monotonically increasing generation; commits are only accepted while
//!   the ticket's generation is still the slot's.
//! - [`OneShot`]: run-once work that is never cancelled.
//!
//! ```text
//! preempt() ──► cancel(old token) ──► generation += 1 ──► NavTicket { gen, token }
//!                                                             │
//!        ticket.run(fetch) ──► Value(result) | Cancelled ─────┤
//!                                                             ▼
//!        slot.with_current(ticket, |resource| commit) ──► Some(_) | None (superseded)
//! ```

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use log::debug;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

pub type Generation = u64;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CancelAware<T> {
    Value(T),
    Cancelled,
}

/// Proof of occupying the navigation slot at a given generation.
#[derive(Debug, Clone)]
pub struct NavTicket {
    generation: Generation,
    token: CancellationToken,
}

impl NavTicket {
    pub fn generation(&self) -> Generation {
        self.generation
    }

    #[cfg(test)]
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Awaits `fut` unless this ticket is cancelled first.
    pub async fn run<T, F>(&self, fut: F) -> CancelAware<T>
    where
        F: Future<Output = T>,
    {
        if self.token.is_cancelled() {
            return CancelAware::Cancelled;
        }
        tokio::select! {
            biased;
            _ = self.token.cancelled() => CancelAware::Cancelled,
            value = fut => CancelAware::Value(value),
        }
    }
}

struct SlotInner<T> {
    generation: Generation,
    token: CancellationToken,
    resource: T,
}

/// Single-occupant slot guarding a resource `T` that only the current
/// occupant may change.
pub struct NavigationSlot<T> {
    inner: Mutex<SlotInner<T>>,
}

impl<T> NavigationSlot<T> {
    pub fn new(resource: T) -> Self {
        Self {
            inner: Mutex::new(SlotInner {
                generation: 0,
                token: CancellationToken::new(),
                resource,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, SlotInner<T>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Cancels the current occupant and returns the ticket of the next one.
    pub fn preempt(&self) -> NavTicket {
        let mut inner = self.lock();
        inner.token.cancel();
        inner.generation += 1;
        inner.token = CancellationToken::new();
        debug!("Navigation slot preempted, generation {}", inner.generation);
        NavTicket {
            generation: inner.generation,
            token: inner.token.clone(),
        }
    }

    #[cfg(test)]
    pub fn current_generation(&self) -> Generation {
        self.lock().generation
    }

    /// Runs `f` under the slot lock if `ticket` still occupies the slot.
    ///
    /// Returns `None` when the ticket has been superseded; `f` is not run.
    pub fn with_current<R>(&self, ticket: &NavTicket, f: impl FnOnce(&mut T) -> R) -> Option<R> {
        let mut inner = self.lock();
        if inner.generation != ticket.generation {
            debug!(
                "Dropping stale commit from generation {} (current {})",
                ticket.generation, inner.generation
            );
            return None;
        }
        Some(f(&mut inner.resource))
    }

    /// Reads the resource regardless of occupant.
    pub fn peek<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.lock().resource)
    }
}

/// Work that runs at most once per owner and is never cancelled.
#[derive(Debug, Default)]
pub struct OneShot {
    started: AtomicBool,
}

impl OneShot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawns `fut` the first time it is called; later calls return `None`.
    pub fn launch<F>(&self, fut: F) -> Option<JoinHandle<()>>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        if self.started.swap(true, Ordering::SeqCst) {
            debug!("One-shot task already started");
            return None;
        }
        Some(tokio::spawn(fut))
    }

    #[cfg(test)]
    pub fn has_started(&self) -> bool {
        self.started.load(Ordering::SeqCst)
    }
}

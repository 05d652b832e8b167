//! Multicast change events with RAII subscriptions.
//!
//! # Architecture
//!
//! An [`Event`] keeps only `Weak` references to its handlers; the strong
//! reference lives in the [`Subscription`] returned by [`Event::subscribe`].
//! Dropping the subscription therefore detaches the handler, and dead entries
//! are pruned lazily on the next emission or subscription.
//!
//! # Invariants
//!
//! 1. Handlers run in subscription order.
//! 2. Emission works on a snapshot: handlers may subscribe, unsubscribe or
//!    emit again without deadlocking on the handler list.
//! 3. A handler whose subscription was dropped before emission started never
//!    runs.
//! 4. Stored entries never exceed the live handlers plus those dropped since
//!    the last `subscribe` or `emit`.

use std::any::Any;
use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

type Handler<A> = dyn Fn(&A);

/// A single-threaded multicast event carrying `&A` to every handler.
pub struct Event<A: ?Sized + 'static = ()> {
    handlers: RefCell<Vec<Weak<Handler<A>>>>,
}

impl<A: ?Sized + 'static> Event<A> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            handlers: RefCell::new(Vec::new()),
        }
    }

    /// Register a handler. It stays attached while the returned guard lives.
    #[must_use = "dropping the subscription detaches the handler immediately"]
    pub fn subscribe(&self, handler: impl Fn(&A) + 'static) -> Subscription {
        let handler: Rc<Handler<A>> = Rc::new(handler);
        let mut handlers = self.handlers.borrow_mut();
        handlers.retain(|h| h.strong_count() > 0);
        handlers.push(Rc::downgrade(&handler));
        drop(handlers);
        Subscription {
            _handler: Box::new(handler),
        }
    }

    /// Invoke every live handler with `args`.
    pub fn emit(&self, args: &A) {
        let live: Vec<Rc<Handler<A>>> = {
            let mut handlers = self.handlers.borrow_mut();
            handlers.retain(|h| h.strong_count() > 0);
            handlers.iter().filter_map(Weak::upgrade).collect()
        };
        for handler in live {
            handler(args);
        }
    }

    /// Number of handlers that are still attached.
    #[must_use]
    pub fn handler_count(&self) -> usize {
        self.handlers
            .borrow()
            .iter()
            .filter(|h| h.strong_count() > 0)
            .count()
    }
}

impl<A: ?Sized + 'static> Default for Event<A> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A: ?Sized + 'static> fmt::Debug for Event<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Event")
            .field("handlers", &self.handler_count())
            .finish()
    }
}

/// Keeps an event handler attached. Drop to unsubscribe.
#[must_use = "dropping the subscription detaches the handler immediately"]
pub struct Subscription {
    _handler: Box<dyn Any>,
}

impl Subscription {
    /// Detach the handler now.
    pub fn unsubscribe(self) {}
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription").finish_non_exhaustive()
    }
}

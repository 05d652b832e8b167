//! Deferred teardown tied to a logical scope.

use std::fmt;

/// Collects teardown actions for a logical scope (a view, a dialog, a session).
///
/// When the scope is disposed or dropped, the actions run in reverse
/// registration order.
///
/// # Invariants
///
/// 1. Every deferred action runs at most once.
/// 2. `dispose()` leaves the scope empty and reusable.
/// 3. Dropping a scope disposes it.
pub struct DisposeScope {
    actions: Vec<Box<dyn FnOnce()>>,
}

impl DisposeScope {
    #[must_use]
    pub fn new() -> Self {
        Self {
            actions: Vec::new(),
        }
    }

    /// Run `action` when the scope ends.
    pub fn defer(&mut self, action: impl FnOnce() + 'static) -> &mut Self {
        self.actions.push(Box::new(action));
        self
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.actions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// Run all pending actions now, newest first.
    pub fn dispose(&mut self) {
        while let Some(action) = self.actions.pop() {
            action();
        }
    }
}

impl Default for DisposeScope {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for DisposeScope {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl fmt::Debug for DisposeScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DisposeScope")
            .field("pending", &self.actions.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn recorder() -> (Rc<RefCell<Vec<u32>>>, impl Fn(u32) -> Box<dyn FnOnce()>) {
        let log = Rc::new(RefCell::new(Vec::new()));
        let l = Rc::clone(&log);
        let make = move |n: u32| -> Box<dyn FnOnce()> {
            let l = Rc::clone(&l);
            Box::new(move || l.borrow_mut().push(n))
        };
        (log, make)
    }

    #[test]
    fn runs_in_reverse_order() {
        let (log, make) = recorder();
        let mut scope = DisposeScope::new();
        scope.defer(make(1)).defer(make(2)).defer(make(3));
        assert_eq!(scope.len(), 3);

        scope.dispose();
        assert_eq!(*log.borrow(), vec![3, 2, 1]);
        assert!(scope.is_empty());
    }

    #[test]
    fn reusable_after_dispose() {
        let (log, make) = recorder();
        let mut scope = DisposeScope::new();
        scope.defer(make(1));
        scope.dispose();
        scope.defer(make(2));
        scope.dispose();
        scope.dispose();
        assert_eq!(*log.borrow(), vec![1, 2]);
    }

    #[test]
    fn drop_disposes() {
        let (log, make) = recorder();
        {
            let mut scope = DisposeScope::default();
            scope.defer(make(7));
        }
        assert_eq!(*log.borrow(), vec![7]);
    }
}

/// A host registration (event listener, observer) that must be undone on teardown.
pub trait Subscription {
    fn unsubscribe(&mut self);
}

/// Subscription backed by a closure that runs at most once.
pub struct CallbackSubscription {
    undo: Option<Box<dyn FnOnce()>>,
}

impl CallbackSubscription {
    pub fn new(undo: impl FnOnce() + 'static) -> Self {
        Self {
            undo: Some(Box::new(undo)),
        }
    }

    pub fn is_active(&self) -> bool {
        self.undo.is_some()
    }
}

impl Subscription for CallbackSubscription {
    fn unsubscribe(&mut self) {
        if let Some(undo) = self.undo.take() {
            undo();
        }
    }
}

/// Owned set of subscriptions released together.
#[derive(Default)]
pub struct Subscriptions {
    items: Vec<Box<dyn Subscription>>,
}

impl Subscriptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, subscription: impl Subscription + 'static) {
        self.items.push(Box::new(subscription));
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Unsubscribe everything in registration order; returns how many were released.
    pub fn release_all(&mut self) -> usize {
        let count = self.items.len();
        for mut item in self.items.drain(..) {
            item.unsubscribe();
        }
        count
    }
}

impl Drop for Subscriptions {
    fn drop(&mut self) {
        self.release_all();
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::rc::Rc;

    use super::*;

    #[test]
    fn callback_runs_once() {
        let hits = Rc::new(Cell::new(0));
        let h = hits.clone();
        let mut sub = CallbackSubscription::new(move || h.set(h.get() + 1));
        assert!(sub.is_active());
        sub.unsubscribe();
        sub.unsubscribe();
        assert_eq!(hits.get(), 1);
        assert!(!sub.is_active());
    }

    #[test]
    fn release_all_empties_the_set() {
        let hits = Rc::new(Cell::new(0));
        let mut subs = Subscriptions::new();
        for _ in 0..3 {
            let h = hits.clone();
            subs.push(CallbackSubscription::new(move || h.set(h.get() + 1)));
        }
        assert_eq!(subs.release_all(), 3);
        assert_eq!(subs.release_all(), 0);
        assert!(subs.is_empty());
        assert_eq!(hits.get(), 3);
    }

    #[test]
    fn dropping_releases() {
        let hits = Rc::new(Cell::new(0));
        {
            let mut subs = Subscriptions::new();
            let h = hits.clone();
            subs.push(CallbackSubscription::new(move || h.set(h.get() + 1)));
        }
        assert_eq!(hits.get(), 1);
    }
}

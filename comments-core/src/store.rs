//! Synchronous single-threaded store.
//!
//! Every dispatch runs the root reducer to completion before any subscriber
//! sees the new state, so actions are applied atomically and in order.
//! Subscribers may dispatch again from inside their callback.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use crate::state::{reducer, Action, AppState};

/// Handle returned by [`Store::subscribe`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Listener = Rc<dyn Fn(&AppState)>;

#[derive(Default)]
pub struct Store {
    state: RefCell<AppState>,
    listeners: RefCell<Vec<(SubscriptionId, Listener)>>,
    next_subscription: Cell<u64>,
}

impl Store {
    pub fn new(initial: AppState) -> Self {
        Self {
            state: RefCell::new(initial),
            ..Default::default()
        }
    }

    /// Snapshot of the current state. Cheap: the comment map is shared.
    pub fn state(&self) -> AppState {
        self.state.borrow().clone()
    }

    pub fn dispatch(&self, action: Action) {
        let next = reducer(&self.state.borrow(), &action);
        *self.state.borrow_mut() = next.clone();

        let listeners: Vec<Listener> = self
            .listeners
            .borrow()
            .iter()
            .map(|(_, listener)| Rc::clone(listener))
            .collect();
        for listener in listeners {
            listener(&next);
        }
    }

    pub fn subscribe(&self, listener: impl Fn(&AppState) + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.next_subscription.get());
        self.next_subscription.set(id.0 + 1);
        self.listeners.borrow_mut().push((id, Rc::new(listener)));
        id
    }

    pub fn unsubscribe(&self, id: SubscriptionId) {
        self.listeners
            .borrow_mut()
            .retain(|(subscription, _)| *subscription != id);
    }
}

impl std::fmt::Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store")
            .field("state", &self.state.borrow())
            .field("listeners", &self.listeners.borrow().len())
            .finish()
    }
}

use super::{Listener, ListenerId, ThreadEvent};
use parking_lot::Mutex;
use std::sync::Arc;

/// Listener bookkeeping shared by the thread handle implementations
#[derive(Default)]
pub(crate) struct ListenerSet {
    state: Mutex<ListenerState>,
}

#[derive(Default)]
struct ListenerState {
    next_id: u64,
    closed: bool,
    listeners: Vec<(ListenerId, Arc<Listener>)>,
}

impl ListenerSet {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn add(&self, listener: Listener) -> ListenerId {
        let mut state = self.state.lock();
        let id = ListenerId(state.next_id);
        state.next_id += 1;

        // Dropping the listener here releases whatever it captured
        if !state.closed {
            state.listeners.push((id, Arc::new(listener)));
        }

        id
    }

    pub(crate) fn remove(&self, id: ListenerId) {
        self.state.lock().listeners.retain(|(lid, _)| *lid != id);
    }

    /// Deliver an event to every attached listener
    ///
    /// The lock is released before the callbacks run so listeners may add or
    /// remove listeners themselves.
    pub(crate) fn dispatch(&self, event: &ThreadEvent) {
        let listeners: Vec<Arc<Listener>> = {
            let state = self.state.lock();
            if state.closed {
                return;
            }
            state.listeners.iter().map(|(_, l)| Arc::clone(l)).collect()
        };

        for listener in listeners {
            (*listener)(event);
        }
    }

    /// Drop every listener and refuse new ones
    pub(crate) fn close(&self) {
        let drained = {
            let mut state = self.state.lock();
            state.closed = true;
            std::mem::take(&mut state.listeners)
        };
        drop(drained);
    }

    pub(crate) fn len(&self) -> usize {
        self.state.lock().listeners.len()
    }
}

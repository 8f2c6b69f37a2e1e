//! Per-key reactive cells and their subscription handles.

use serde_json::Value;
use std::sync::{Arc, Mutex, MutexGuard, Weak};

/// Event delivered to stream observers.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    /// A newly published value, or the current value at subscription time.
    Value(Value),
    /// The stream terminated. No further events will be delivered.
    Completed,
}

type Callback = Arc<Mutex<dyn FnMut(StreamEvent) + Send>>;

/// Mutable reactive holder of the latest known value for one key.
///
/// A cell is active until explicitly completed. Emission invokes every
/// registered observer synchronously, in subscription order. Completion
/// notifies observers once, clears the observer list, and marks the cell
/// closed; late subscribers receive [`StreamEvent::Completed`] immediately.
pub(crate) struct Cell {
    state: Mutex<CellState>,
}

struct CellState {
    value: Value,
    closed: bool,
    next_observer_id: u64,
    observers: Vec<(u64, Callback)>,
}

impl Cell {
    pub(crate) fn new(value: Value) -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(CellState {
                value,
                closed: false,
                next_observer_id: 0,
                observers: Vec::new(),
            }),
        })
    }

    /// Observer callbacks run outside the state lock, so a poisoned lock
    /// only means a panic during bookkeeping; recover the state rather
    /// than propagate the poison.
    fn lock_state(&self) -> MutexGuard<'_, CellState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub(crate) fn current(&self) -> Value {
        self.lock_state().value.clone()
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.lock_state().closed
    }

    /// Publish a new value to all observers, in subscription order.
    ///
    /// Ignored after completion; the stream has already terminated.
    pub(crate) fn publish(&self, value: Value) {
        let callbacks: Vec<Callback> = {
            let mut state = self.lock_state();
            if state.closed {
                return;
            }
            state.value = value.clone();
            state.observers.iter().map(|(_, cb)| cb.clone()).collect()
        };
        // Invoke outside the lock so a callback may subscribe, unsubscribe,
        // or call back into the registry.
        for cb in callbacks {
            let mut f = cb.lock().unwrap_or_else(|e| e.into_inner());
            f(StreamEvent::Value(value.clone()));
        }
    }

    /// Complete the cell: notify every observer once, clear the observer
    /// list, and mark the cell closed. Idempotent.
    pub(crate) fn complete(&self) {
        let callbacks: Vec<Callback> = {
            let mut state = self.lock_state();
            if state.closed {
                return;
            }
            state.closed = true;
            state.observers.drain(..).map(|(_, cb)| cb).collect()
        };
        for cb in callbacks {
            let mut f = cb.lock().unwrap_or_else(|e| e.into_inner());
            f(StreamEvent::Completed);
        }
    }

    /// Register an observer and immediately deliver the current value, or
    /// completion if the cell is already closed.
    pub(crate) fn subscribe<F>(self: &Arc<Self>, f: F) -> Subscription
    where
        F: FnMut(StreamEvent) + Send + 'static,
    {
        let callback: Callback = Arc::new(Mutex::new(f));

        let initial = {
            let mut state = self.lock_state();
            if state.closed {
                None
            } else {
                let id = state.next_observer_id;
                state.next_observer_id += 1;
                state.observers.push((id, callback.clone()));
                Some((id, state.value.clone()))
            }
        };

        match initial {
            Some((id, current)) => {
                {
                    let mut f = callback.lock().unwrap_or_else(|e| e.into_inner());
                    f(StreamEvent::Value(current));
                }
                Subscription {
                    cell: Arc::downgrade(self),
                    id,
                }
            }
            None => {
                {
                    let mut f = callback.lock().unwrap_or_else(|e| e.into_inner());
                    f(StreamEvent::Completed);
                }
                // Nothing was registered; the handle is inert.
                Subscription {
                    cell: Weak::new(),
                    id: 0,
                }
            }
        }
    }

    fn remove_observer(&self, id: u64) {
        self.lock_state().observers.retain(|(obs_id, _)| *obs_id != id);
    }
}

/// Live per-key value stream handed out by the registry.
///
/// Always subscribable: new subscribers receive the current value
/// immediately, then every subsequent update, until the key is deleted
/// (the stream completes).
pub struct ValueStream {
    cell: Arc<Cell>,
}

impl std::fmt::Debug for ValueStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ValueStream")
            .field("current", &self.cell.current())
            .field("closed", &self.cell.is_closed())
            .finish()
    }
}

impl ValueStream {
    pub(crate) fn new(cell: Arc<Cell>) -> Self {
        Self { cell }
    }

    /// The latest known value. `Value::Null` for keys with no persisted
    /// record.
    pub fn current(&self) -> Value {
        self.cell.current()
    }

    /// Whether the underlying key has been deleted.
    pub fn is_closed(&self) -> bool {
        self.cell.is_closed()
    }

    /// Register an observer. The current value is delivered synchronously
    /// before this returns; completion is delivered instead if the stream
    /// has already terminated.
    pub fn subscribe<F>(&self, f: F) -> Subscription
    where
        F: FnMut(StreamEvent) + Send + 'static,
    {
        self.cell.subscribe(f)
    }
}

/// Handle to an active observer registration. Dropping the handle
/// unsubscribes; [`unsubscribe`](Subscription::unsubscribe) does the same
/// explicitly. Both are idempotent and never touch the registry mapping.
pub struct Subscription {
    cell: Weak<Cell>,
    id: u64,
}

impl Subscription {
    pub fn unsubscribe(&self) {
        if let Some(cell) = self.cell.upgrade() {
            cell.remove_observer(self.id);
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

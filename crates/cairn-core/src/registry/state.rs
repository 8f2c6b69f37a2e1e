//! Derived aggregate stream over the whole registry.

use super::cell::{Cell, StreamEvent, Subscription};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

/// Live composite of every key known to the registry when the stream was
/// created.
///
/// Each emission is one JSON object mapping keys to their current values,
/// recomputed atomically whenever any constituent cell emits. The stream is
/// purely derived: it has no value of its own between recomputations. The
/// filter runs per value before the composite is assembled, so filtered-out
/// keys are never built into an emission. A deleted key leaves the
/// composite; once every constituent has completed, the stream completes.
///
/// Dropping the `StateStream` detaches it from all constituent cells.
pub struct StateStream {
    shared: Arc<Shared>,
    _subs: Vec<Subscription>,
}

struct Shared {
    filter: Box<dyn Fn(&Value) -> bool + Send + Sync>,
    latest: Mutex<Latest>,
    output: Arc<Cell>,
}

struct Latest {
    /// Unfiltered latest value per still-live constituent.
    values: BTreeMap<String, Value>,
    /// Constituents that have not yet completed.
    live: usize,
}

impl Shared {
    fn lock_latest(&self) -> MutexGuard<'_, Latest> {
        self.latest.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Assemble the composite under the lock, publish outside it.
    fn recompute_and_publish(&self) {
        let composite = {
            let latest = self.lock_latest();
            let mut object = Map::new();
            for (key, value) in latest.values.iter() {
                if (self.filter)(value) {
                    object.insert(key.clone(), value.clone());
                }
            }
            Value::Object(object)
        };
        self.output.publish(composite);
    }

    fn on_value(&self, key: &str, value: Value) {
        self.lock_latest().values.insert(key.to_string(), value);
        self.recompute_and_publish();
    }

    fn on_completed(&self, key: &str) {
        let all_done = {
            let mut latest = self.lock_latest();
            latest.values.remove(key);
            latest.live = latest.live.saturating_sub(1);
            latest.live == 0
        };
        self.recompute_and_publish();
        if all_done {
            self.output.complete();
        }
    }
}

impl StateStream {
    pub(crate) fn new<F>(cells: Vec<(String, Arc<Cell>)>, filter: F) -> Self
    where
        F: Fn(&Value) -> bool + Send + Sync + 'static,
    {
        let shared = Arc::new(Shared {
            filter: Box::new(filter),
            latest: Mutex::new(Latest {
                values: BTreeMap::new(),
                live: cells.len(),
            }),
            output: Cell::new(Value::Object(Map::new())),
        });

        // Subscribing delivers each cell's current value synchronously, so
        // the output holds the full initial composite once this loop ends.
        let subs = cells
            .into_iter()
            .map(|(key, cell)| {
                let shared = shared.clone();
                cell.subscribe(move |event| match event {
                    StreamEvent::Value(value) => shared.on_value(&key, value),
                    StreamEvent::Completed => shared.on_completed(&key),
                })
            })
            .collect();

        // Zero constituents: the aggregate has nothing to wait for.
        if shared.lock_latest().live == 0 {
            shared.output.complete();
        }

        Self {
            shared,
            _subs: subs,
        }
    }

    /// The latest composite snapshot.
    pub fn current(&self) -> Value {
        self.shared.output.current()
    }

    /// Whether every constituent has completed.
    pub fn is_closed(&self) -> bool {
        self.shared.output.is_closed()
    }

    /// Register an observer. The current composite is delivered
    /// synchronously before this returns.
    pub fn subscribe<F>(&self, f: F) -> Subscription
    where
        F: FnMut(StreamEvent) + Send + 'static,
    {
        self.shared.output.subscribe(f)
    }
}

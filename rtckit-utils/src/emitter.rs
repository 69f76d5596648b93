// Copyright 2025 LiveKit, Inc.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! A synchronous, name-keyed event emitter.
//!
//! Listeners registered for an event name are called in registration order
//! on the thread that calls [`EventEmitter::emit`]. The registry lock is
//! released before listeners run, so a listener may register, remove or emit
//! on the same emitter.

use std::{fmt::Debug, sync::Arc};

use parking_lot::Mutex;
use tokio::sync::mpsc;

use crate::observer::Dispatcher;

/// Identifies a registered listener, returned by [`EventEmitter::on`] and
/// [`EventEmitter::once`] and consumed by [`EventEmitter::off`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(u64);

type Callback<T> = Arc<dyn Fn(&T) + Send + Sync>;

struct Listener<T> {
    id: ListenerId,
    once: bool,
    callback: Callback<T>,
}

struct Inner<T: Clone> {
    // Kept in first-registration order, lookups are linear.
    events: Vec<(String, Vec<Listener<T>>)>,
    dispatcher: Dispatcher<T>,
    next_id: u64,
}

impl<T: Clone> Inner<T> {
    fn listeners_mut(&mut self, event: &str) -> Option<&mut Vec<Listener<T>>> {
        self.events.iter_mut().find(|(name, _)| name == event).map(|(_, listeners)| listeners)
    }

    fn prune(&mut self) {
        self.events.retain(|(_, listeners)| !listeners.is_empty());
    }
}

pub struct EventEmitter<T: Clone> {
    inner: Mutex<Inner<T>>,
}

impl<T: Clone> Default for EventEmitter<T> {
    fn default() -> Self {
        Self {
            inner: Mutex::new(Inner {
                events: Vec::new(),
                dispatcher: Dispatcher::default(),
                next_id: 1,
            }),
        }
    }
}

impl<T: Clone> Debug for EventEmitter<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.lock();
        let events: Vec<_> = inner.events.iter().map(|(name, l)| (name, l.len())).collect();
        f.debug_struct("EventEmitter")
            .field("events", &events)
            .field("subscribers", &inner.dispatcher.len())
            .finish()
    }
}

impl<T: Clone> EventEmitter<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Call `callback` every time `event` is emitted.
    pub fn on<F>(&self, event: impl Into<String>, callback: F) -> ListenerId
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        self.add_listener(event.into(), false, Arc::new(callback))
    }

    /// Call `callback` the next time `event` is emitted, then forget it.
    pub fn once<F>(&self, event: impl Into<String>, callback: F) -> ListenerId
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        self.add_listener(event.into(), true, Arc::new(callback))
    }

    /// Remove a listener. Returns false if it was not registered for `event`
    /// (already removed, or a `once` listener that already fired).
    pub fn off(&self, event: &str, id: ListenerId) -> bool {
        let mut inner = self.inner.lock();
        let Some(listeners) = inner.listeners_mut(event) else {
            return false;
        };

        let before = listeners.len();
        listeners.retain(|listener| listener.id != id);
        let removed = listeners.len() != before;
        inner.prune();
        removed
    }

    /// Publish `payload` under `event`.
    ///
    /// Listeners run synchronously in registration order, and channel
    /// subscribers receive a clone of the payload. Returns whether `event`
    /// had any listener.
    pub fn emit(&self, event: &str, payload: T) -> bool {
        let callbacks: Vec<Callback<T>> = {
            let mut inner = self.inner.lock();
            inner.dispatcher.dispatch(&payload);

            let callbacks = match inner.listeners_mut(event) {
                Some(listeners) => {
                    let callbacks = listeners.iter().map(|l| l.callback.clone()).collect();
                    listeners.retain(|l| !l.once);
                    callbacks
                }
                None => Vec::new(),
            };
            inner.prune();
            callbacks
        };

        log::trace!("emit {} to {} listener(s)", event, callbacks.len());

        for callback in &callbacks {
            callback(&payload);
        }

        !callbacks.is_empty()
    }

    pub fn listener_count(&self, event: &str) -> usize {
        self.inner.lock().listeners_mut(event).map_or(0, |listeners| listeners.len())
    }

    /// Names of the events that currently have listeners.
    pub fn event_names(&self) -> Vec<String> {
        self.inner.lock().events.iter().map(|(name, _)| name.clone()).collect()
    }

    /// Remove every listener of `event`, or of all events when `None`.
    /// Channel subscribers are not affected.
    pub fn remove_all_listeners(&self, event: Option<&str>) {
        let mut inner = self.inner.lock();
        match event {
            Some(event) => inner.events.retain(|(name, _)| name != event),
            None => inner.events.clear(),
        }
    }

    /// Receive every emitted payload, whatever its event name.
    pub fn subscribe(&self) -> mpsc::UnboundedReceiver<T> {
        self.inner.lock().dispatcher.register()
    }

    fn add_listener(&self, event: String, once: bool, callback: Callback<T>) -> ListenerId {
        let mut inner = self.inner.lock();
        let id = ListenerId(inner.next_id);
        inner.next_id += 1;

        let listener = Listener { id, once, callback };
        match inner.listeners_mut(&event) {
            Some(listeners) => listeners.push(listener),
            None => inner.events.push((event, vec![listener])),
        }
        id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    const TOPIC: &str = "some-topic";

    fn counter() -> (Arc<AtomicU32>, impl Fn(&u32) + Send + Sync + 'static) {
        let count = Arc::new(AtomicU32::new(0));
        let count_clone = count.clone();
        (count, move |_: &u32| {
            count_clone.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[test]
    fn test_on_called_every_emit() {
        let emitter = EventEmitter::<u32>::new();
        let (count, callback) = counter();
        emitter.on(TOPIC, callback);

        assert!(emitter.emit(TOPIC, 1));
        assert!(emitter.emit(TOPIC, 2));
        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_once_called_once() {
        let emitter = EventEmitter::<u32>::new();
        let (count, callback) = counter();
        emitter.once(TOPIC, callback);

        assert!(emitter.emit(TOPIC, 1));
        assert!(!emitter.emit(TOPIC, 2), "once listener should be gone");
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert_eq!(emitter.listener_count(TOPIC), 0);
    }

    #[test]
    fn test_off() {
        let emitter = EventEmitter::<u32>::new();
        let (count, callback) = counter();
        let id = emitter.on(TOPIC, callback);

        emitter.emit(TOPIC, 1);
        assert!(emitter.off(TOPIC, id));
        assert!(!emitter.off(TOPIC, id), "cannot remove twice");
        emitter.emit(TOPIC, 2);
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_off_wrong_event() {
        let emitter = EventEmitter::<u32>::new();
        let id = emitter.on(TOPIC, |_| {});
        assert!(!emitter.off("other", id));
        assert_eq!(emitter.listener_count(TOPIC), 1);
    }

    #[test]
    fn test_registration_order() {
        let emitter = EventEmitter::<u32>::new();
        let calls = Arc::new(Mutex::new(Vec::new()));

        for tag in 0..4 {
            let calls = calls.clone();
            if tag % 2 == 0 {
                emitter.on(TOPIC, move |v| calls.lock().push((tag, *v)));
            } else {
                emitter.once(TOPIC, move |v| calls.lock().push((tag, *v)));
            }
        }

        emitter.emit(TOPIC, 10);
        emitter.emit(TOPIC, 20);
        assert_eq!(*calls.lock(), vec![(0, 10), (1, 10), (2, 10), (3, 10), (0, 20), (2, 20)]);
    }

    #[test]
    fn test_reentrant_listener() {
        let emitter = Arc::new(EventEmitter::<u32>::new());
        let (count, callback) = counter();
        emitter.on("inner", callback);

        let weak = Arc::downgrade(&emitter);
        emitter.on(TOPIC, move |v| {
            if let Some(emitter) = weak.upgrade() {
                emitter.emit("inner", *v);
            }
        });

        emitter.emit(TOPIC, 1);
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_emit_without_listeners() {
        let emitter = EventEmitter::<u32>::new();
        assert!(!emitter.emit(TOPIC, 1));
        assert!(emitter.event_names().is_empty());
    }

    #[test]
    fn test_event_names_and_remove_all() {
        let emitter = EventEmitter::<u32>::new();
        emitter.on("a", |_| {});
        emitter.on("b", |_| {});
        emitter.on("a", |_| {});
        assert_eq!(emitter.event_names(), vec!["a".to_owned(), "b".to_owned()]);
        assert_eq!(emitter.listener_count("a"), 2);

        emitter.remove_all_listeners(Some("a"));
        assert_eq!(emitter.event_names(), vec!["b".to_owned()]);

        emitter.remove_all_listeners(None);
        assert!(emitter.event_names().is_empty());
    }

    #[test]
    fn test_subscribe_receives_all_events() {
        let emitter = EventEmitter::<u32>::new();
        let mut rx = emitter.subscribe();

        emitter.emit("a", 1);
        emitter.emit("b", 2);
        emitter.remove_all_listeners(None);
        emitter.emit("c", 3);

        assert_eq!(rx.try_recv().ok(), Some(1));
        assert_eq!(rx.try_recv().ok(), Some(2));
        assert_eq!(rx.try_recv().ok(), Some(3));
    }
}

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

use std::{
    fmt::Debug,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};

use downcast_rs::{impl_downcast, DowncastSync};
use parking_lot::Mutex;
use rtckit_utils::{ConfigTree, EventEmitter, ListenerId};
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;
use tokio::sync::mpsc;

pub mod options;

use options::ClientOptions;

/// The connection object of the streaming library, stored by the client as
/// an opaque handle. Implemented by the library adapters.
pub trait StreamConnection: DowncastSync + Debug {}

impl_downcast!(sync StreamConnection);

pub type StreamHandle = Arc<dyn StreamConnection>;

pub type ClientEvents = mpsc::UnboundedReceiver<ClientEvent>;
pub type ClientResult<T> = Result<T, ClientError>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClientError {
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),
}

#[derive(Clone, Debug, PartialEq)]
pub struct ClientEvent {
    pub name: String,
    pub payload: Option<Value>,
    pub details: Option<Value>,
}

impl ClientEvent {
    pub const CONNECTED: &'static str = "connected";
    pub const DISCONNECTED: &'static str = "disconnected";
}

struct ClientInner {
    // Always a `Value::Object`
    options: Value,
    connected: AtomicBool,
    stream_connection: Mutex<Option<StreamHandle>>,
    emitter: EventEmitter<ClientEvent>,
}

/// The event-emitting client handed to connection collaborators.
///
/// Cloning is cheap, every clone shares the same state and listeners.
#[derive(Clone)]
pub struct Client {
    inner: Arc<ClientInner>,
}

impl Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("connected", &self.connected())
            .field("has_stream_connection", &self.inner.stream_connection.lock().is_some())
            .field("emitter", &self.inner.emitter)
            .finish()
    }
}

impl Client {
    /// Create a client from a configuration tree.
    ///
    /// Fails with [`ClientError::InvalidConfiguration`] when no configuration
    /// is given. The content of the tree is not validated here, it is merged
    /// over [`ClientOptions::defaults`] and stored as is.
    pub fn new(config: Option<ConfigTree>) -> ClientResult<Self> {
        let Some(config) = config else {
            return Err(ClientError::InvalidConfiguration("a configuration is required".into()));
        };

        let options = ClientOptions::resolve(&config)?;
        log::debug!("creating client with {} option(s)", options.len());

        Ok(Self {
            inner: Arc::new(ClientInner {
                options: Value::Object(options),
                connected: AtomicBool::new(false),
                stream_connection: Mutex::new(None),
                emitter: EventEmitter::new(),
            }),
        })
    }

    /// Create a client from an untyped value. `null` and non-object values
    /// are rejected.
    pub fn from_value(config: Value) -> ClientResult<Self> {
        match config {
            Value::Object(tree) => Self::new(Some(tree)),
            Value::Null => Self::new(None),
            other => Err(ClientError::InvalidConfiguration(format!(
                "expected an object, got {}",
                type_name(&other)
            ))),
        }
    }

    pub fn connected(&self) -> bool {
        self.inner.connected.load(Ordering::Acquire)
    }

    /// The configuration the client was created with, merged over the
    /// defaults. Always an object.
    pub fn options(&self) -> &Value {
        &self.inner.options
    }

    /// Look up one option by JSON pointer, e.g. `/media/video`.
    pub fn option(&self, pointer: &str) -> Option<&Value> {
        self.inner.options.pointer(pointer)
    }

    pub fn typed_options(&self) -> ClientResult<ClientOptions> {
        ClientOptions::deserialize(&self.inner.options)
            .map_err(|e| ClientError::InvalidConfiguration(e.to_string()))
    }

    pub fn stream_connection(&self) -> Option<StreamHandle> {
        self.inner.stream_connection.lock().clone()
    }

    /// The stream connection downcast to the streaming library's type.
    pub fn stream_connection_as<T: StreamConnection>(&self) -> Option<Arc<T>> {
        self.stream_connection().and_then(|handle| handle.downcast_arc::<T>().ok())
    }

    // Connection lifecycle, written by the collaborators driving the
    // streaming library.

    /// Record the connection state. `connected` / `disconnected` is emitted
    /// when the state changes.
    pub fn set_connected(&self, connected: bool) {
        let previous = self.inner.connected.swap(connected, Ordering::AcqRel);
        if previous == connected {
            return;
        }

        log::debug!("client connection state changed: {} -> {}", previous, connected);
        let name = if connected { ClientEvent::CONNECTED } else { ClientEvent::DISCONNECTED };
        self.emit(name, None, None);
    }

    /// Replace the stream connection handle, returning the previous one.
    pub fn set_stream_connection(&self, handle: Option<StreamHandle>) -> Option<StreamHandle> {
        std::mem::replace(&mut *self.inner.stream_connection.lock(), handle)
    }

    // Event capability

    pub fn on<F>(&self, event: impl Into<String>, callback: F) -> ListenerId
    where
        F: Fn(&ClientEvent) + Send + Sync + 'static,
    {
        self.inner.emitter.on(event, callback)
    }

    pub fn once<F>(&self, event: impl Into<String>, callback: F) -> ListenerId
    where
        F: Fn(&ClientEvent) + Send + Sync + 'static,
    {
        self.inner.emitter.once(event, callback)
    }

    pub fn off(&self, event: &str, id: ListenerId) -> bool {
        self.inner.emitter.off(event, id)
    }

    /// Publish an event to the listeners of `event` and to every
    /// [`subscribe`](Self::subscribe) receiver. Returns whether `event` had
    /// listeners.
    pub fn emit(&self, event: &str, payload: Option<Value>, details: Option<Value>) -> bool {
        let event_data = ClientEvent { name: event.to_owned(), payload, details };
        self.inner.emitter.emit(event, event_data)
    }

    pub fn listener_count(&self, event: &str) -> usize {
        self.inner.emitter.listener_count(event)
    }

    pub fn event_names(&self) -> Vec<String> {
        self.inner.emitter.event_names()
    }

    pub fn remove_all_listeners(&self, event: Option<&str>) {
        self.inner.emitter.remove_all_listeners(event)
    }

    /// Receive every event emitted by this client.
    pub fn subscribe(&self) -> ClientEvents {
        self.inner.emitter.subscribe()
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

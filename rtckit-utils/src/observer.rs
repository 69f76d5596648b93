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

// Fan-out of events to channel subscribers.
// Channels are unbounded, a subscriber that never drains its receiver grows
// without limit.

use tokio::sync::mpsc;

#[derive(Debug)]
pub struct Dispatcher<T>
where
    T: Clone,
{
    senders: Vec<mpsc::UnboundedSender<T>>,
}

impl<T> Default for Dispatcher<T>
where
    T: Clone,
{
    fn default() -> Self {
        Self { senders: Default::default() }
    }
}

impl<T> Dispatcher<T>
where
    T: Clone,
{
    pub fn register(&mut self) -> mpsc::UnboundedReceiver<T> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.senders.push(tx);
        rx
    }

    /// Send `msg` to every live subscriber. Subscribers whose receiver was
    /// dropped are forgotten.
    pub fn dispatch(&mut self, msg: &T) {
        self.senders.retain(|sender| sender.send(msg.clone()).is_ok());
    }

    pub fn len(&self) -> usize {
        self.senders.iter().filter(|sender| !sender.is_closed()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&mut self) {
        self.senders.clear();
    }
}

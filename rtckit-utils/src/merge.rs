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

//! Recursive merging of configuration trees.
//!
//! Only `Value::Object` is treated as a nested tree. Arrays and `null` are
//! plain values and replace whatever the destination holds.

use serde_json::{Map, Value};

/// A mapping from option names to scalars, arrays or nested trees.
pub type ConfigTree = Map<String, Value>;

/// Merge `provided` into `destination` and return `destination` for chaining.
///
/// Nested trees are merged key by key, every other value overwrites the
/// destination slot. A nested tree in `provided` always wins over a
/// non-tree value already present in `destination`. Keys only present in
/// `destination` are left untouched, and `None` is a no-op.
pub fn merge<'a>(
    destination: &'a mut ConfigTree,
    provided: Option<&ConfigTree>,
) -> &'a mut ConfigTree {
    let Some(provided) = provided else {
        return destination;
    };

    for (key, value) in provided {
        match value {
            Value::Object(nested) => {
                let mut slot = take_tree(destination, key);
                merge(&mut slot, Some(nested));
                destination.insert(key.clone(), Value::Object(slot));
            }
            _ => {
                destination.insert(key.clone(), value.clone());
            }
        }
    }

    destination
}

/// Same as [`merge`], but moves the values out of `provided` instead of
/// cloning them.
pub fn merge_owned(destination: &mut ConfigTree, provided: ConfigTree) -> &mut ConfigTree {
    for (key, value) in provided {
        match value {
            Value::Object(nested) => {
                let mut slot = take_tree(destination, &key);
                merge_owned(&mut slot, nested);
                destination.insert(key, Value::Object(slot));
            }
            value => {
                destination.insert(key, value);
            }
        }
    }

    destination
}

/// Merge two untyped values. When both sides are trees they are merged,
/// otherwise `provided` replaces `destination`.
pub fn merge_value(destination: &mut Value, provided: Value) -> &mut Value {
    match provided {
        Value::Object(src) if destination.is_object() => {
            if let Value::Object(dst) = &mut *destination {
                merge_owned(dst, src);
            }
        }
        provided => *destination = provided,
    }
    destination
}

/// Returns a copy of `defaults` with `provided` merged on top.
pub fn merged(defaults: &ConfigTree, provided: Option<&ConfigTree>) -> ConfigTree {
    let mut tree = defaults.clone();
    merge(&mut tree, provided);
    tree
}

// A non-tree value in the slot is discarded.
fn take_tree(tree: &mut ConfigTree, key: &str) -> ConfigTree {
    match tree.remove(key) {
        Some(Value::Object(map)) => map,
        _ => Map::new(),
    }
}

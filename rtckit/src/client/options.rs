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

use rtckit_utils::{merge, ConfigTree};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{ClientError, ClientResult};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MediaOptions {
    pub audio: bool,
    pub video: bool,
    pub dtx: bool,
}

impl Default for MediaOptions {
    fn default() -> Self {
        Self { audio: true, video: true, dtx: true }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IceServer {
    pub urls: Vec<String>,
    pub username: String,
    pub credential: String,
}

/// Defaults applied underneath the configuration handed to
/// [`Client::new`](crate::Client::new).
///
/// Keys the struct does not know about are kept in the merged tree and left
/// to the streaming library.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientOptions {
    pub media: MediaOptions,
    // Empty means the streaming library picks its own servers
    pub ice_servers: Vec<IceServer>,
}

impl ClientOptions {
    /// The default options as a configuration tree.
    pub fn defaults() -> ClientResult<ConfigTree> {
        Self::default().to_tree()
    }

    pub fn to_tree(&self) -> ClientResult<ConfigTree> {
        match serde_json::to_value(self) {
            Ok(Value::Object(tree)) => Ok(tree),
            Ok(other) => Err(ClientError::InvalidConfiguration(format!(
                "options serialized to a non-object value: {}",
                other
            ))),
            Err(e) => Err(ClientError::InvalidConfiguration(e.to_string())),
        }
    }

    /// Read the typed options out of a configuration tree. Missing keys take
    /// their default value.
    pub fn from_tree(tree: &ConfigTree) -> ClientResult<Self> {
        serde_json::from_value(Value::Object(tree.clone()))
            .map_err(|e| ClientError::InvalidConfiguration(e.to_string()))
    }

    /// Returns `provided` merged over the defaults.
    pub fn resolve(provided: &ConfigTree) -> ClientResult<ConfigTree> {
        let mut tree = Self::defaults()?;
        merge(&mut tree, Some(provided));
        Ok(tree)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn tree(value: Value) -> ConfigTree {
        match value {
            Value::Object(tree) => tree,
            _ => panic!("expected an object"),
        }
    }

    #[test]
    fn test_defaults_tree() {
        let tree = ClientOptions::defaults().unwrap();
        assert_eq!(tree.get("media"), Some(&json!({ "audio": true, "video": true, "dtx": true })));
        assert_eq!(tree.get("ice_servers"), Some(&json!([])));
        assert_eq!(tree.len(), 2);
    }

    #[test]
    fn test_to_tree_keeps_custom_values() {
        let options = ClientOptions {
            media: MediaOptions { audio: false, ..Default::default() },
            ice_servers: vec![IceServer {
                urls: vec!["stun:stun.example.com:3478".to_owned()],
                ..Default::default()
            }],
        };
        let tree = options.to_tree().unwrap();
        assert_eq!(tree.get("media").and_then(|m| m.get("audio")), Some(&json!(false)));
        assert_eq!(ClientOptions::from_tree(&tree).unwrap(), options);
    }

    #[test]
    fn test_resolve_keeps_nested_defaults() {
        let provided = tree(json!({ "media": { "video": false }, "region": "eu" }));
        let resolved = ClientOptions::resolve(&provided).unwrap();
        assert_eq!(resolved.get("region"), Some(&json!("eu")));

        let options = ClientOptions::from_tree(&resolved).unwrap();
        assert_eq!(options.media, MediaOptions { audio: true, video: false, dtx: true });
        assert!(options.ice_servers.is_empty());
    }

    #[test]
    fn test_from_tree_rejects_wrong_type() {
        let provided = tree(json!({ "ice_servers": "stun:stun.example.com" }));
        let err = ClientOptions::from_tree(&provided).unwrap_err();
        assert!(matches!(err, ClientError::InvalidConfiguration(_)));
    }
}

//! Relayed manifest plus the request details used to obtain it.

use std::collections::BTreeMap;

use serde_json::{Map, Value};

/// Keys the relay always controls in a serialized [`StreamResult`].
pub const RESERVED_KEYS: [&str; 3] = ["api_url", "headers", "playlist"];

/// Outcome of a successful stream fetch.
///
/// Serialized as a single JSON object: the provider payload with `api_url`,
/// `headers` and `playlist` laid over it. Those three fixed fields win when
/// the payload carries keys of the same name.
#[derive(Debug, Clone, PartialEq)]
pub struct StreamResult {
    /// Manifest URL, token included
    pub api_url: String,
    /// Headers sent on the manifest and playlist requests
    pub headers: BTreeMap<String, String>,
    /// Playlist document text, when referenced and fetched successfully
    pub playlist: Option<String>,
    /// Manifest JSON object as returned by the provider
    pub payload: Map<String, Value>,
}

impl StreamResult {
    /// Playlist URL referenced by a manifest payload, if any.
    pub fn playlist_reference(payload: &Map<String, Value>) -> Option<&str> {
        payload
            .get("stream")
            .and_then(|stream| stream.get("playlist"))
            .and_then(Value::as_str)
            .filter(|url| !url.is_empty())
    }

    /// Merges the result into one JSON object.
    ///
    /// `identifiers` are written last and win over every other key.
    pub fn into_body<I>(self, identifiers: I) -> Value
    where
        I: IntoIterator<Item = (&'static str, Value)>,
    {
        let mut body = self.payload;

        let collisions: Vec<&str> = RESERVED_KEYS
            .iter()
            .copied()
            .filter(|key| body.contains_key(*key))
            .collect();
        if !collisions.is_empty() {
            tracing::debug!("Provider payload keys overridden by relay fields: {collisions:?}");
        }

        let headers: Map<String, Value> = self
            .headers
            .into_iter()
            .map(|(name, value)| (name, Value::String(value)))
            .collect();

        body.insert("api_url".to_string(), Value::String(self.api_url));
        body.insert("headers".to_string(), Value::Object(headers));
        body.insert(
            "playlist".to_string(),
            self.playlist.map_or(Value::Null, Value::String),
        );

        for (key, value) in identifiers {
            body.insert(key.to_string(), value);
        }

        Value::Object(body)
    }
}

//! JSON message shapes exchanged with HTTP callers and the RPC service.
//!
//! Byte fields travel as base64 strings (standard alphabet), the same way
//! protobuf JSON renders `bytes`. Field names are camelCase.

use base64::engine::general_purpose::{STANDARD, URL_SAFE, URL_SAFE_NO_PAD};
use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::keyspace::KeyBearing;

/// Decodes a byte string the way path and query parameters carry it.
///
/// Tries the standard alphabet first and falls back to the URL-safe one,
/// with or without padding.
///
/// # Errors
///
/// Returns the standard-alphabet decode error when no alphabet matches.
pub fn decode_bytes(value: &str) -> Result<Vec<u8>, base64::DecodeError> {
    STANDARD.decode(value).or_else(|err| {
        URL_SAFE
            .decode(value)
            .or_else(|_| URL_SAFE_NO_PAD.decode(value))
            .map_err(|_| err)
    })
}

/// Serde adapter for `Vec<u8>` fields carried as base64 strings.
pub mod base64_bytes {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = Option::<String>::deserialize(deserializer)?.unwrap_or_default();
        super::decode_bytes(&encoded).map_err(serde::de::Error::custom)
    }
}

/// Same as [`base64_bytes`] for optional fields, so absence can be told apart
/// from an empty value.
pub mod base64_bytes_opt {
    use serde::{Deserialize, Deserializer, Serializer};

    #[allow(clippy::ref_option)]
    pub fn serialize<S: Serializer>(
        bytes: &Option<Vec<u8>>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match bytes {
            Some(bytes) => super::base64_bytes::serialize(bytes, serializer),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Vec<u8>>, D::Error> {
        Option::<String>::deserialize(deserializer)?
            .map(|encoded| super::decode_bytes(&encoded).map_err(serde::de::Error::custom))
            .transpose()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Key {
    #[serde(default, with = "base64_bytes_opt", skip_serializing_if = "Option::is_none")]
    pub key: Option<Vec<u8>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyList {
    #[serde(default)]
    pub keys: Vec<Key>,
}

/// Body of a set request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyValue {
    #[serde(default, with = "base64_bytes_opt", skip_serializing_if = "Option::is_none")]
    pub key: Option<Vec<u8>>,
    #[serde(default, with = "base64_bytes")]
    pub value: Vec<u8>,
}

/// A stored entry as returned by the RPC service.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    #[serde(default, with = "base64_bytes")]
    pub key: Vec<u8>,
    #[serde(default, with = "base64_bytes")]
    pub value: Vec<u8>,
    #[serde(default)]
    pub index: u64,
}

impl KeyBearing for Item {
    fn key_mut(&mut self) -> &mut Vec<u8> {
        &mut self.key
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemList {
    #[serde(default)]
    pub items: Vec<Item>,
}

/// One page of an index-ordered scan.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    #[serde(default)]
    pub items: Vec<Item>,
    #[serde(default)]
    pub more: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemsCount {
    pub count: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Index {
    pub index: u64,
}

/// Pagination options for an index-ordered scan.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IScanOptions {
    #[serde(default)]
    pub page_number: u64,
    #[serde(default)]
    pub page_size: u64,
}

/// Options for a key-ordered scan.
///
/// `offset` is exclusive: scanning resumes after that key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanOptions {
    #[serde(default, with = "base64_bytes")]
    pub prefix: Vec<u8>,
    #[serde(default, with = "base64_bytes")]
    pub offset: Vec<u8>,
    #[serde(default)]
    pub limit: u64,
    #[serde(default)]
    pub reverse: bool,
}

//! `kvgw` core: tenant key namespaces, bearer token payloads, and the JSON
//! message shapes shared by the gateway and its RPC service.

pub mod keyspace;
pub mod messages;
pub mod token;

pub use keyspace::{prefix_many, prefix_one, unprefix, KeyBearing, TenantPrefix, SEPARATOR};
pub use messages::{
    decode_bytes, IScanOptions, Index, Item, ItemList, ItemsCount, Key, KeyList, KeyValue, Page,
    ScanOptions,
};
pub use token::{bearer_token, derive_prefix, parse_public_payload, TokenError, TokenPayload};

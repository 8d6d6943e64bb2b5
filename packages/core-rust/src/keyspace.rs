//! Tenant key namespaces over a shared physical keyspace.
//!
//! Outbound keys are prefixed with the caller's [`TenantPrefix`] and inbound
//! keys have it stripped again. Both directions are pure functions of the
//! prefix so every gateway endpoint applies exactly the same rule.
//!
//! A username that itself contains [`SEPARATOR`] makes the namespace boundary
//! ambiguous: tenants `a` and `a:b` share the physical range `a:b:...`. This
//! is kept as-is; callers that need hard isolation must forbid the separator
//! in usernames upstream.

use std::fmt;

use tracing::trace;

/// Byte placed between the username and the caller's key.
pub const SEPARATOR: u8 = b':';

/// Namespace prefix of one tenant: `username || ':'`.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct TenantPrefix(Vec<u8>);

impl TenantPrefix {
    /// Builds the prefix for `username`.
    #[must_use]
    pub fn for_username(username: &str) -> Self {
        let mut bytes = Vec::with_capacity(username.len() + 1);
        bytes.extend_from_slice(username.as_bytes());
        bytes.push(SEPARATOR);
        Self(bytes)
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns `prefix || key`.
    #[must_use]
    pub fn apply(&self, key: &[u8]) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.0.len() + key.len());
        out.extend_from_slice(&self.0);
        out.extend_from_slice(key);
        out
    }

    /// Returns the remainder of `key` if it lies inside this namespace.
    #[must_use]
    pub fn strip<'a>(&self, key: &'a [u8]) -> Option<&'a [u8]> {
        key.strip_prefix(self.0.as_slice())
    }
}

impl fmt::Debug for TenantPrefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TenantPrefix({:?})", String::from_utf8_lossy(&self.0))
    }
}

/// A response record whose key may need the tenant prefix removed.
pub trait KeyBearing {
    fn key_mut(&mut self) -> &mut Vec<u8>;
}

/// Prefixes a single key. `None` leaves the key unchanged.
#[must_use]
pub fn prefix_one(prefix: Option<&TenantPrefix>, key: Vec<u8>) -> Vec<u8> {
    match prefix {
        Some(prefix) => prefix.apply(&key),
        None => key,
    }
}

/// Prefixes every key independently, preserving order and length.
#[must_use]
pub fn prefix_many(prefix: Option<&TenantPrefix>, keys: Vec<Vec<u8>>) -> Vec<Vec<u8>> {
    match prefix {
        Some(prefix) => keys.iter().map(|key| prefix.apply(key)).collect(),
        None => keys,
    }
}

/// Strips `prefix` from the key of every item, in place.
///
/// Items whose key lies outside the namespace are passed through untouched.
pub fn unprefix<T: KeyBearing>(prefix: Option<&TenantPrefix>, items: &mut [T]) {
    let Some(prefix) = prefix.filter(|p| !p.is_empty()) else {
        return;
    };
    for item in items {
        let key = item.key_mut();
        if key.starts_with(prefix.as_bytes()) {
            key.drain(..prefix.len());
        } else {
            trace!(?prefix, "response key outside tenant namespace left as-is");
        }
    }
}

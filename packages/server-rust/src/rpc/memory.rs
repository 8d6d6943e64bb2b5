//! In-memory [`KvClient`] backed by an ordered map and an append-only log.
//!
//! Used by the `kvgw` binary when no remote service is configured and by
//! tests as the RPC collaborator.

use std::collections::BTreeMap;
use std::ops::Bound;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use kvgw_core::{IScanOptions, Index, Item, ItemList, ItemsCount, Page, ScanOptions};
use parking_lot::RwLock;

use super::{CallContext, KvClient, RpcCode, RpcError};

#[derive(Debug, Default)]
struct Store {
    /// Latest entry per key.
    latest: BTreeMap<Vec<u8>, Item>,
    /// Every write, in index order.
    log: Vec<Item>,
}

/// In-memory key-value service.
///
/// Reads take a shared lock; writes are serialized. Every method call is
/// counted so callers can tell whether the service was reached at all.
#[derive(Debug, Default)]
pub struct MemoryClient {
    store: RwLock<Store>,
    calls: AtomicU64,
}

impl MemoryClient {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of RPC calls served so far.
    #[must_use]
    pub fn call_count(&self) -> u64 {
        self.calls.load(Ordering::Relaxed)
    }

    /// Writes directly, bypassing call accounting. Intended for seeding.
    pub fn insert(&self, key: &[u8], value: &[u8]) -> u64 {
        let mut store = self.store.write();
        let index = store.log.len() as u64;
        let item = Item {
            key: key.to_vec(),
            value: value.to_vec(),
            index,
        };
        store.latest.insert(key.to_vec(), item.clone());
        store.log.push(item);
        index
    }

    fn record_call(&self) {
        self.calls.fetch_add(1, Ordering::Relaxed);
    }
}

#[async_trait]
impl KvClient for MemoryClient {
    async fn count(&self, _ctx: &CallContext, prefix: &[u8]) -> Result<ItemsCount, RpcError> {
        self.record_call();
        let store = self.store.read();
        let count = store
            .latest
            .range::<[u8], _>((Bound::Included(prefix), Bound::Unbounded))
            .take_while(|(key, _)| key.starts_with(prefix))
            .count();
        Ok(ItemsCount {
            count: count as u64,
        })
    }

    async fn iscan(&self, _ctx: &CallContext, opts: IScanOptions) -> Result<Page, RpcError> {
        self.record_call();
        if opts.page_number == 0 {
            return Err(RpcError::new(
                RpcCode::InvalidArgument,
                "page number must be greater than zero",
            ));
        }
        if opts.page_size == 0 {
            return Err(RpcError::new(
                RpcCode::InvalidArgument,
                "page size must be greater than zero",
            ));
        }

        let store = self.store.read();
        let start = usize::try_from((opts.page_number - 1).saturating_mul(opts.page_size))
            .unwrap_or(usize::MAX);
        let size = usize::try_from(opts.page_size).unwrap_or(usize::MAX);
        let items: Vec<Item> = store.log.iter().skip(start).take(size).cloned().collect();
        let more = start.saturating_add(items.len()) < store.log.len();
        Ok(Page { items, more })
    }

    async fn get(&self, _ctx: &CallContext, key: &[u8]) -> Result<Item, RpcError> {
        self.record_call();
        self.store
            .read()
            .latest
            .get(key)
            .cloned()
            .ok_or_else(|| RpcError::new(RpcCode::NotFound, "key not found"))
    }

    async fn set(&self, _ctx: &CallContext, key: &[u8], value: &[u8]) -> Result<Index, RpcError> {
        self.record_call();
        if key.is_empty() {
            return Err(RpcError::new(RpcCode::InvalidArgument, "key must not be empty"));
        }
        Ok(Index {
            index: self.insert(key, value),
        })
    }

    async fn get_batch(&self, _ctx: &CallContext, keys: &[Vec<u8>]) -> Result<ItemList, RpcError> {
        self.record_call();
        let store = self.store.read();
        let items = keys
            .iter()
            .filter_map(|key| store.latest.get(key).cloned())
            .collect();
        Ok(ItemList { items })
    }

    async fn scan(&self, _ctx: &CallContext, opts: &ScanOptions) -> Result<ItemList, RpcError> {
        self.record_call();
        let store = self.store.read();
        let prefix = opts.prefix.as_slice();
        let offset = opts.offset.as_slice();

        let in_prefix = |key: &&Vec<u8>| key.starts_with(prefix);
        let limit = match usize::try_from(opts.limit) {
            Ok(0) | Err(_) => usize::MAX,
            Ok(limit) => limit,
        };

        let items = if opts.reverse {
            let upper = if offset.is_empty() {
                Bound::Unbounded
            } else {
                Bound::Excluded(offset)
            };
            store
                .latest
                .range::<[u8], _>((Bound::Unbounded, upper))
                .rev()
                .filter(|(key, _)| in_prefix(key))
                .take(limit)
                .map(|(_, item)| item.clone())
                .collect()
        } else {
            let lower = if offset.is_empty() {
                Bound::Included(prefix)
            } else {
                Bound::Excluded(offset)
            };
            store
                .latest
                .range::<[u8], _>((lower, Bound::Unbounded))
                .filter(|(key, _)| in_prefix(key))
                .take(limit)
                .map(|(_, item)| item.clone())
                .collect()
        };
        Ok(ItemList { items })
    }
}

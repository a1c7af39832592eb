//! Where ERC725Y values are read from

use crate::error::Result;
use alloy_primitives::{B256, Bytes, FixedBytes};
use erc725_schema::EncodedEntry;
use std::collections::{BTreeMap, BTreeSet};
use std::future::Future;
use std::sync::{Arc, PoisonError, RwLock};

/// Read access to an ERC725Y store, usually a contract behind an RPC node.
///
/// `None` means the key was never set. `Some` with empty bytes is a stored
/// `0x`, which decodes the same way but is kept distinct for callers that care.
#[trait_variant::make(Send)]
pub trait DataSource {
    /// Value stored under one key
    async fn get_value(&self, key: &B256) -> Result<Option<Bytes>>;

    /// Values stored under several keys, in key order.
    ///
    /// Implementations backed by a contract should batch this into a single
    /// `getDataBatch` call.
    async fn get_values(&self, keys: &[B256]) -> Result<Vec<Option<Bytes>>>;

    /// ERC165 `supportsInterface`
    async fn supports_interface(&self, interface_id: FixedBytes<4>) -> Result<bool>;
}

/// In-memory [`DataSource`], for tests and for data already fetched elsewhere
#[derive(Debug, Clone, Default)]
pub struct MemoryDataSource {
    values: Arc<RwLock<BTreeMap<B256, Bytes>>>,
    interfaces: Arc<RwLock<BTreeSet<FixedBytes<4>>>>,
}

impl MemoryDataSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store one value
    pub fn insert(&self, key: B256, value: impl Into<Bytes>) {
        self.values
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key, value.into());
    }

    /// Store encoded entries, e.g. the output of `encode_data`
    pub fn insert_entries(&self, entries: impl IntoIterator<Item = EncodedEntry>) {
        let mut values = self.values.write().unwrap_or_else(PoisonError::into_inner);
        values.extend(entries.into_iter().map(|e| (e.key, e.value)));
    }

    /// Remove a key, returning its value
    pub fn remove(&self, key: &B256) -> Option<Bytes> {
        self.values
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key)
    }

    /// Declare an ERC165 interface as supported
    pub fn add_interface(&self, interface_id: FixedBytes<4>) {
        self.interfaces
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(interface_id);
    }

    pub fn len(&self) -> usize {
        self.values.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl FromIterator<EncodedEntry> for MemoryDataSource {
    fn from_iter<T: IntoIterator<Item = EncodedEntry>>(iter: T) -> Self {
        let source = Self::new();
        source.insert_entries(iter);
        source
    }
}

impl DataSource for MemoryDataSource {
    async fn get_value(&self, key: &B256) -> Result<Option<Bytes>> {
        Ok(self
            .values
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned())
    }

    async fn get_values(&self, keys: &[B256]) -> Result<Vec<Option<Bytes>>> {
        let values = self.values.read().unwrap_or_else(PoisonError::into_inner);
        Ok(keys.iter().map(|key| values.get(key).cloned()).collect())
    }

    async fn supports_interface(&self, interface_id: FixedBytes<4>) -> Result<bool> {
        Ok(self
            .interfaces
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(&interface_id))
    }
}

impl<T: DataSource + Sync> DataSource for Arc<T> {
    fn get_value(
        &self,
        key: &B256,
    ) -> impl Future<Output = Result<Option<Bytes>>> + Send {
        self.as_ref().get_value(key)
    }

    fn get_values(
        &self,
        keys: &[B256],
    ) -> impl Future<Output = Result<Vec<Option<Bytes>>>> + Send {
        self.as_ref().get_values(keys)
    }

    fn supports_interface(
        &self,
        interface_id: FixedBytes<4>,
    ) -> impl Future<Output = Result<bool>> + Send {
        self.as_ref().supports_interface(interface_id)
    }
}

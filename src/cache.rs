use std::borrow::Borrow;
use std::collections::HashMap;
use std::future::Future;
use std::hash::Hash;
use tokio::sync::RwLock;

/// Get-or-populate memo table.
///
/// Entries are never invalidated: a cache is valid for the lifetime of the
/// Session or BlueprintHandle that owns it. Failed populations are not
/// stored, so a lookup that errored is retried on the next call.
pub struct LookupCache<K, V> {
    entries: RwLock<HashMap<K, V>>,
}

impl<K, V> Default for LookupCache<K, V> {
    fn default() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }
}

impl<K, V> LookupCache<K, V>
where
    K: Eq + Hash,
    V: Clone,
{
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Eq + Hash + ?Sized,
    {
        self.entries.read().await.get(key).cloned()
    }

    pub async fn insert(&self, key: K, value: V) {
        self.entries.write().await.insert(key, value);
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    /// Return the cached value for `key`, or run `populate` and remember its
    /// successful result.
    pub async fn get_or_try_populate<F, Fut, E>(&self, key: K, populate: F) -> Result<V, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        if let Some(hit) = self.entries.read().await.get(&key) {
            return Ok(hit.clone());
        }

        let value = populate().await?;
        self.entries.write().await.insert(key, value.clone());
        Ok(value)
    }
}

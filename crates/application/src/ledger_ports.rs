use async_trait::async_trait;
use medconsent_core::AppResult;
use medconsent_domain::CompositeKey;
use tracing::warn;

/// One key/value pair produced by a state range query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateEntry {
    /// Encoded state key.
    pub key: String,
    /// Stored value bytes.
    pub value: Vec<u8>,
}

/// Forward-only cursor over the result of a state range query.
///
/// A cursor is single-pass: once exhausted or closed it never yields again.
#[async_trait]
pub trait StateQueryIterator: Send {
    /// Returns whether another entry is available.
    async fn has_next(&mut self) -> bool;

    /// Returns the next entry.
    async fn next(&mut self) -> AppResult<StateEntry>;

    /// Releases the resources held by the query.
    fn close(&mut self) -> AppResult<()>;
}

/// Ledger world-state port consumed by the consent operations.
///
/// Every call reads or writes exactly one key, and reads observe writes made
/// earlier in the same transaction.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Returns the value stored under a key, if any.
    async fn get_state(&self, key: &str) -> AppResult<Option<Vec<u8>>>;

    /// Writes a value under a key, replacing any previous value.
    async fn put_state(&self, key: &str, value: Vec<u8>) -> AppResult<()>;

    /// Removes a key.
    async fn del_state(&self, key: &str) -> AppResult<()>;

    /// Opens a range query over every composite key in the namespace whose
    /// leading components equal `components`.
    async fn get_state_by_partial_composite_key(
        &self,
        namespace: &str,
        components: &[&str],
    ) -> AppResult<Box<dyn StateQueryIterator>>;

    /// Builds an encoded composite key.
    fn create_composite_key(&self, namespace: &str, components: &[&str]) -> AppResult<String> {
        CompositeKey::new(namespace, components.iter().copied()).map(|key| key.encode())
    }

    /// Decomposes an encoded composite key.
    fn split_composite_key(&self, key: &str) -> AppResult<CompositeKey> {
        CompositeKey::parse(key)
    }
}

/// Owns an open range query and closes it on every exit path.
pub struct ScanGuard {
    iterator: Box<dyn StateQueryIterator>,
    closed: bool,
}

impl ScanGuard {
    /// Takes ownership of an open query.
    #[must_use]
    pub fn new(iterator: Box<dyn StateQueryIterator>) -> Self {
        Self {
            iterator,
            closed: false,
        }
    }

    /// Returns the next entry, or `None` once the query is exhausted.
    pub async fn next_entry(&mut self) -> AppResult<Option<StateEntry>> {
        if self.closed || !self.iterator.has_next().await {
            return Ok(None);
        }

        self.iterator.next().await.map(Some)
    }

    /// Closes the query and reports a failure to release it.
    pub fn close(mut self) -> AppResult<()> {
        self.closed = true;
        self.iterator.close()
    }
}

impl Drop for ScanGuard {
    fn drop(&mut self) {
        if self.closed {
            return;
        }

        self.closed = true;
        if let Err(error) = self.iterator.close() {
            warn!(error = %error, "failed to close state range query");
        }
    }
}

use std::collections::{BTreeMap, VecDeque};

use async_trait::async_trait;
use medconsent_application::{LedgerStore, StateEntry, StateQueryIterator};
use medconsent_core::{AppError, AppResult};
use tokio::sync::RwLock;
use tracing::trace;

mod snapshot;

#[cfg(test)]
mod tests;

pub use snapshot::LedgerSnapshot;

/// In-memory ordered world state.
#[derive(Debug, Default)]
pub struct InMemoryLedgerStore {
    state: RwLock<BTreeMap<String, Vec<u8>>>,
}

impl InMemoryLedgerStore {
    /// Creates an empty in-memory store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: RwLock::new(BTreeMap::new()),
        }
    }

    /// Returns the number of stored keys.
    pub async fn len(&self) -> usize {
        self.state.read().await.len()
    }

    /// Returns whether the store holds no keys.
    pub async fn is_empty(&self) -> bool {
        self.state.read().await.is_empty()
    }
}

fn ensure_key(key: &str) -> AppResult<()> {
    if key.is_empty() {
        return Err(AppError::Store("state key must not be empty".to_owned()));
    }

    Ok(())
}

impl InMemoryLedgerStore {
    /// Plain keys must not start with U+0000, which is reserved for
    /// well-formed composite keys.
    fn ensure_writable_key(&self, key: &str) -> AppResult<()> {
        ensure_key(key)?;
        if key.starts_with('\u{0}') {
            self.split_composite_key(key).map_err(|error| {
                AppError::Store(format!(
                    "state key '{}' starts with U+0000 but is not a composite key: {error}",
                    key.escape_debug()
                ))
            })?;
        }

        Ok(())
    }
}

#[async_trait]
impl LedgerStore for InMemoryLedgerStore {
    async fn get_state(&self, key: &str) -> AppResult<Option<Vec<u8>>> {
        ensure_key(key)?;
        Ok(self.state.read().await.get(key).cloned())
    }

    async fn put_state(&self, key: &str, value: Vec<u8>) -> AppResult<()> {
        self.ensure_writable_key(key)?;
        trace!(key = %key.escape_debug(), bytes = value.len(), "put state");
        self.state.write().await.insert(key.to_owned(), value);
        Ok(())
    }

    async fn del_state(&self, key: &str) -> AppResult<()> {
        self.ensure_writable_key(key)?;
        trace!(key = %key.escape_debug(), "delete state");
        self.state.write().await.remove(key);
        Ok(())
    }

    async fn get_state_by_partial_composite_key(
        &self,
        namespace: &str,
        components: &[&str],
    ) -> AppResult<Box<dyn StateQueryIterator>> {
        let prefix = self.create_composite_key(namespace, components)?;
        let entries: VecDeque<StateEntry> = self
            .state
            .read()
            .await
            .range(prefix.clone()..)
            .take_while(|(key, _)| key.starts_with(prefix.as_str()))
            .map(|(key, value)| StateEntry {
                key: key.clone(),
                value: value.clone(),
            })
            .collect();

        trace!(
            prefix = %prefix.escape_debug(),
            matched = entries.len(),
            "opened partial composite key query"
        );

        Ok(Box::new(InMemoryStateIterator {
            entries,
            closed: false,
        }))
    }
}

/// Cursor over a point-in-time copy of the matched range.
#[derive(Debug)]
struct InMemoryStateIterator {
    entries: VecDeque<StateEntry>,
    closed: bool,
}

#[async_trait]
impl StateQueryIterator for InMemoryStateIterator {
    async fn has_next(&mut self) -> bool {
        !self.closed && !self.entries.is_empty()
    }

    async fn next(&mut self) -> AppResult<StateEntry> {
        if self.closed {
            return Err(AppError::Store("state query iterator is closed".to_owned()));
        }

        self.entries
            .pop_front()
            .ok_or_else(|| AppError::Store("state query iterator is exhausted".to_owned()))
    }

    fn close(&mut self) -> AppResult<()> {
        self.closed = true;
        self.entries.clear();
        Ok(())
    }
}

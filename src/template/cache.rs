//! Compiled template cache
//!
//! Entries are created on first use and never evicted. Each key owns a
//! shared once-cell, so concurrent misses for the same key wait on a single
//! compile instead of racing. A failed compile leaves the cell empty and the
//! next request retries.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::OnceCell;

use super::CompiledTemplate;

type Slot = Arc<OnceCell<Arc<dyn CompiledTemplate>>>;

#[derive(Default)]
pub struct TemplateCache {
    slots: Mutex<HashMap<String, Slot>>,
}

impl TemplateCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self, key: &str) -> Slot {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(slots.entry(key.to_string()).or_default())
    }

    /// Compiled template for `key`, if one has been stored
    pub fn get(&self, key: &str) -> Option<Arc<dyn CompiledTemplate>> {
        let slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        slots.get(key).and_then(|slot| slot.get().cloned())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Number of compiled entries
    pub fn len(&self) -> usize {
        let slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        slots.values().filter(|slot| slot.initialized()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Return the cached template for `key`, running `compile` on a miss.
    ///
    /// Callers that miss while another compile for `key` is in flight wait
    /// for that compile and share its result.
    pub async fn get_or_try_compile<F, Fut, E>(
        &self,
        key: &str,
        compile: F,
    ) -> Result<Arc<dyn CompiledTemplate>, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Arc<dyn CompiledTemplate>, E>>,
    {
        let slot = self.slot(key);
        slot.get_or_try_init(compile).await.cloned()
    }
}

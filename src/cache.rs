//! LRU cache of parsed SQL templates.
//!
//! The only shared mutable state of the engine. A single mutex guards lookup
//! and insertion; parsing runs outside the lock, so two threads racing on the
//! same text may both parse it and the later insert wins.

use std::num::NonZeroUsize;
use std::sync::{Arc, LazyLock, Mutex, PoisonError};

use lru::LruCache;
use tracing::{debug, trace};

use crate::error::Result;
use crate::parser::ParsedSqlTemplate;

static SHARED: LazyLock<Arc<TemplateCache>> =
    LazyLock::new(|| Arc::new(TemplateCache::new(TemplateCache::DEFAULT_CAPACITY)));

/// Template cache keyed by raw SQL text. Capacity 0 disables caching.
#[derive(Debug)]
pub struct TemplateCache {
    store: Option<Mutex<LruCache<String, Arc<ParsedSqlTemplate>>>>,
}

impl TemplateCache {
    pub const DEFAULT_CAPACITY: usize = 256;

    pub fn new(capacity: usize) -> Self {
        Self {
            store: NonZeroUsize::new(capacity).map(|cap| Mutex::new(LruCache::new(cap))),
        }
    }

    /// A cache that parses on every call.
    pub fn disabled() -> Self {
        Self { store: None }
    }

    /// The process-wide cache used by [`crate::parse_named_parameters`].
    pub fn shared() -> Arc<TemplateCache> {
        Arc::clone(&SHARED)
    }

    /// Returns the cached template for `sql`, parsing and inserting it on a miss.
    pub fn get_or_parse(&self, sql: &str) -> Result<Arc<ParsedSqlTemplate>> {
        let Some(store) = &self.store else {
            return ParsedSqlTemplate::parse(sql).map(Arc::new);
        };

        if let Some(hit) = store
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(sql)
        {
            trace!(sql, "template cache hit");
            return Ok(Arc::clone(hit));
        }

        debug!(sql, "template cache miss");
        let parsed = Arc::new(ParsedSqlTemplate::parse(sql)?);

        let mut guard = store.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some((evicted, _)) = guard.push(sql.to_owned(), Arc::clone(&parsed)) {
            if evicted != sql {
                debug!(sql = %evicted, "template evicted from cache");
            }
        }
        Ok(parsed)
    }

    /// Number of cached templates.
    pub fn len(&self) -> usize {
        self.store.as_ref().map_or(0, |store| {
            store.lock().unwrap_or_else(PoisonError::into_inner).len()
        })
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.store.as_ref().map_or(0, |store| {
            store
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .cap()
                .get()
        })
    }

    pub fn clear(&self) {
        if let Some(store) = &self.store {
            store.lock().unwrap_or_else(PoisonError::into_inner).clear();
        }
    }
}

impl Default for TemplateCache {
    fn default() -> Self {
        Self::new(Self::DEFAULT_CAPACITY)
    }
}

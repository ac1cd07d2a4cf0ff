//! Method result caching.
//!
//! Methods marked with [`MethodMarker::Cache`] have their results stored in a
//! named LRU store of the [`MethodCache`] service, keyed by declaring type,
//! signature, and arguments. Methods marked with [`MethodMarker::EvictCache`]
//! clear stores before they run.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use weft_aop::prelude::*;
//! use weft_aspects::cache::{MethodCache, cache_aspect};
//!
//! let context = Arc::new(AopContext::new().with_service(MethodCache::default()));
//! let registry = Arc::new(BeanRegistry::new());
//! let builder = GenericPointcutBuilder::new(registry.clone(), context);
//! let weaver = ProxyingAspectWeaver::new(registry, builder, DelegatingProxyFactory);
//!
//! weaver.weave(&[cache_aspect()]).unwrap();
//! ```

use lru::LruCache;
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::sync::Arc;
use weft_aop::advisor::{AdviceMethod, Advisor};
use weft_aop::definition::{AdviceDefinition, AdviceLocation, AspectDefinition, PointcutKind};
use weft_aop::error::InvocationError;
use weft_aop::join_point::{JoinPoint, ProceedingJoinPoint};
use weft_aop::meta::{MethodDescriptor, MethodMarker};

/// Entries kept per named cache unless configured otherwise.
pub const DEFAULT_CACHE_CAPACITY: usize = 15;

/// Advisor type of the caching aspect.
pub const CACHE_ASPECT_TYPE: &str = "weft.aspects.CacheAspect";

/// Name of the caching aspect.
pub const CACHE_ASPECT_NAME: &str = "cacheAspect";

// ─────────────────────────────────────────────────────────────────────────────
// MethodCache
// ─────────────────────────────────────────────────────────────────────────────

/// Named LRU stores of method results.
///
/// Stores are created on first write and hold at most `capacity` entries
/// each; the least recently used entry is evicted first.
pub struct MethodCache {
    capacity: NonZeroUsize,
    stores: Mutex<HashMap<String, LruCache<String, Value>>>,
}

impl core::fmt::Debug for MethodCache {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("MethodCache")
            .field("capacity", &self.capacity)
            .field("caches", &self.cache_names())
            .finish()
    }
}

impl Default for MethodCache {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_CAPACITY)
    }
}

impl MethodCache {
    /// Creates an empty cache. A capacity of zero is raised to one.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN),
            stores: Mutex::new(HashMap::new()),
        }
    }

    /// Entries kept per named cache.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity.get()
    }

    /// Looks up `key` in the cache `name`, marking it most recently used.
    #[must_use]
    pub fn get(&self, name: &str, key: &str) -> Option<Value> {
        self.stores
            .lock()
            .get_mut(name)
            .and_then(|store| store.get(key).cloned())
    }

    /// Stores `value` under `key` in the cache `name`.
    pub fn put(&self, name: &str, key: impl Into<String>, value: Value) {
        let mut stores = self.stores.lock();
        let store = stores
            .entry(name.to_string())
            .or_insert_with(|| LruCache::new(self.capacity));
        store.put(key.into(), value);
    }

    /// Empties the cache `name`.
    pub fn clear(&self, name: &str) {
        if let Some(store) = self.stores.lock().get_mut(name) {
            store.clear();
        }
    }

    /// Drops every cache.
    pub fn clear_all(&self) {
        self.stores.lock().clear();
    }

    /// Number of entries in the cache `name`.
    #[must_use]
    pub fn len(&self, name: &str) -> usize {
        self.stores.lock().get(name).map_or(0, LruCache::len)
    }

    /// Names of every cache that has been written to.
    #[must_use]
    pub fn cache_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.stores.lock().keys().cloned().collect();
        names.sort();
        names
    }
}

/// Key of one call: declaring type, signature, and the serialized arguments.
///
/// # Errors
///
/// [`InvocationError::Serialization`] if an argument cannot be serialized.
pub fn cache_key(method: &MethodDescriptor, args: &[Value]) -> Result<String, InvocationError> {
    Ok(format!(
        "{}#{}:{}",
        method.declaring_type,
        method.signature(),
        serde_json::to_string(args)?
    ))
}

// ─────────────────────────────────────────────────────────────────────────────
// Advice
// ─────────────────────────────────────────────────────────────────────────────

fn cached_call(pjp: &mut ProceedingJoinPoint) -> Result<Value, InvocationError> {
    let Some(method) = pjp.method().cloned() else {
        return pjp.proceed();
    };
    let cache_name = match method.marker(|marker| matches!(marker, MethodMarker::Cache { .. })) {
        Some(MethodMarker::Cache { name }) => name.clone(),
        _ => return pjp.proceed(),
    };

    let context = Arc::clone(pjp.context());
    if !context.has_service::<MethodCache>() {
        tracing::warn!(method = %method, "no method cache installed, call not cached");
        return pjp.proceed();
    }

    let key = cache_key(&method, pjp.arguments())?;
    let hit = context
        .service::<MethodCache>()
        .and_then(|cache| cache.get(&cache_name, &key));
    if let Some(value) = hit {
        tracing::trace!(cache = %cache_name, method = %method, "cache hit");
        return Ok(value);
    }

    let value = pjp.proceed()?;
    if let Some(cache) = context.service::<MethodCache>() {
        cache.put(&cache_name, key, value.clone());
    }
    Ok(value)
}

fn evict(jp: &mut dyn JoinPoint) -> Result<Value, InvocationError> {
    let Some(MethodMarker::EvictCache { names }) = jp
        .method()
        .and_then(|method| method.marker(|marker| matches!(marker, MethodMarker::EvictCache { .. })))
    else {
        return Ok(Value::Null);
    };
    let Some(cache) = jp.context().service::<MethodCache>() else {
        tracing::warn!(bean = jp.bean_name(), "no method cache installed, nothing evicted");
        return Ok(Value::Null);
    };

    if names.iter().all(String::is_empty) {
        cache.clear_all();
    } else {
        for name in names.iter().filter(|name| !name.is_empty()) {
            cache.clear(name);
        }
    }
    tracing::debug!(bean = jp.bean_name(), caches = ?names, "evicted caches");
    Ok(Value::Null)
}

/// The caching advisor: around advice `cache` and before advice `evictCache`.
#[must_use]
pub fn cache_advisor() -> Arc<Advisor> {
    Arc::new(
        Advisor::new(CACHE_ASPECT_TYPE)
            .with_around("cache", cached_call)
            .with_advice("evictCache", evict),
    )
}

/// The caching aspect, applied to every component that declares a cached or
/// evicting method.
#[must_use]
pub fn cache_aspect() -> AspectDefinition {
    let evict_method = AdviceMethod::plain("evictCache", evict);
    let cache_method = AdviceMethod::proceeding("cache", cached_call);
    let advisor = Arc::new(
        Advisor::new(CACHE_ASPECT_TYPE)
            .with_method(cache_method.clone())
            .with_method(evict_method.clone()),
    );

    AspectDefinition::new(advisor, CACHE_ASPECT_NAME)
        .with_advice(
            AdviceDefinition::new(
                evict_method,
                AdviceLocation::Before,
                PointcutKind::Within,
                ["*"],
            )
            .with_qualifier(|ty| {
                ty.has_method_marker(|marker| matches!(marker, MethodMarker::EvictCache { .. }))
            }),
        )
        .with_advice(
            AdviceDefinition::new(
                cache_method,
                AdviceLocation::Around,
                PointcutKind::Within,
                ["*"],
            )
            .with_qualifier(|ty| {
                ty.has_method_marker(|marker| matches!(marker, MethodMarker::Cache { .. }))
            }),
        )
}

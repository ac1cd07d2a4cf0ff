//! Built-in aspects for weft components.
//!
//! - [`cache`] - Method result caching through [`MethodMarker::Cache`] and
//!   [`MethodMarker::EvictCache`]
//! - [`events`] - Framework events through [`MethodMarker::Event`]
//!
//! Both aspects select every component with `within "*"` and narrow the
//! selection with a qualifier, so only types that declare a marked method are
//! proxied. The services they use ([`MethodCache`], [`EventBus`]) are read
//! from the [`AopContext`](weft_aop::context::AopContext) of the weave.
//!
//! [`MethodMarker::Cache`]: weft_aop::meta::MethodMarker::Cache
//! [`MethodMarker::EvictCache`]: weft_aop::meta::MethodMarker::EvictCache
//! [`MethodMarker::Event`]: weft_aop::meta::MethodMarker::Event
//! [`MethodCache`]: cache::MethodCache
//! [`EventBus`]: events::EventBus

pub mod cache;
pub mod events;

/// Re-export all common types for easy access.
pub mod prelude {
    pub use crate::cache::{
        CACHE_ASPECT_NAME, CACHE_ASPECT_TYPE, DEFAULT_CACHE_CAPACITY, MethodCache, cache_advisor,
        cache_aspect, cache_key,
    };
    pub use crate::events::{
        EVENTS_ASPECT_NAME, EVENTS_ASPECT_TYPE, EventBus, EventListener, FrameworkEvent,
        events_advisor, events_aspect,
    };
}

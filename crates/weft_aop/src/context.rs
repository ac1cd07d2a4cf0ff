//! The context join points are created in.

use weft_system::resource::{Resource, ResourceRef, Resources};

/// Services visible to advice while it runs.
///
/// Every join point carries the context of the weave that produced it, so
/// advice reaches shared stores such as a method cache through
/// [`JoinPoint::context`](crate::join_point::JoinPoint::context) instead of
/// through globals. Services are installed before the context is shared and
/// provide their own synchronization.
///
/// # Example
///
/// ```
/// use weft_aop::context::AopContext;
///
/// struct Counter(std::sync::atomic::AtomicUsize);
///
/// let context = AopContext::new().with_service(Counter(Default::default()));
/// assert!(context.has_service::<Counter>());
/// ```
#[derive(Debug, Default)]
pub struct AopContext {
    services: Resources,
}

impl AopContext {
    /// Creates a context with no services.
    #[must_use]
    pub fn new() -> Self {
        Self {
            services: Resources::new(),
        }
    }

    /// Adds a service.
    #[must_use]
    pub fn with_service<T: Resource>(mut self, service: T) -> Self {
        self.insert_service(service);
        self
    }

    /// Adds a service, returning the one it replaced.
    pub fn insert_service<T: Resource>(&mut self, service: T) -> Option<T> {
        self.services.insert(service)
    }

    /// Borrows a service.
    #[must_use]
    pub fn service<T: Resource>(&self) -> Option<ResourceRef<'_, T>> {
        self.services.get::<T>().ok()
    }

    /// Returns `true` if a service of type `T` is installed.
    #[must_use]
    pub fn has_service<T: Resource>(&self) -> bool {
        self.services.contains::<T>()
    }
}

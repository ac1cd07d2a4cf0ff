//! Resource storage.
//!
//! [`Resources`] is a type-keyed container: at most one value per type, each
//! guarded by its own `RwLock` so independent resources never contend.
//! Access goes through guards that release the lock on drop.

use core::any::{Any, TypeId};
use hashbrown::HashMap;
use parking_lot::{
    MappedRwLockReadGuard, MappedRwLockWriteGuard, RwLock, RwLockReadGuard, RwLockWriteGuard,
};

/// A value that can live in a [`Resources`] container.
///
/// Implemented for every `Send + Sync + 'static` type.
pub trait Resource: Send + Sync + 'static {}

impl<T: Send + Sync + 'static> Resource for T {}

/// Read guard returned by [`Resources::get`].
pub type ResourceRef<'a, T> = MappedRwLockReadGuard<'a, T>;

/// Write guard returned by [`Resources::get_mut`].
pub type ResourceRefMut<'a, T> = MappedRwLockWriteGuard<'a, T>;

/// Errors that can occur during resource access.
#[derive(Debug, thiserror::Error)]
pub enum ResourceError {
    /// No resource of the requested type is stored.
    #[error("resource not found: {0}")]
    NotFound(&'static str),

    /// The resource is locked in a way that conflicts with the request.
    #[error("resource already borrowed: {0}")]
    BorrowConflict(&'static str),
}

type Slot = RwLock<Box<dyn Any + Send + Sync>>;

/// Container for type-keyed shared state.
///
/// # Example
///
/// ```
/// use weft_system::resource::Resources;
///
/// struct Counter(u32);
///
/// let mut resources = Resources::new();
/// resources.insert(Counter(1));
///
/// resources.get_mut::<Counter>().unwrap().0 += 1;
/// assert_eq!(resources.get::<Counter>().unwrap().0, 2);
/// ```
#[derive(Default)]
pub struct Resources {
    slots: HashMap<TypeId, Slot>,
}

impl core::fmt::Debug for Resources {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Resources")
            .field("len", &self.slots.len())
            .finish()
    }
}

impl Resources {
    /// Creates an empty container.
    #[must_use]
    pub fn new() -> Self {
        Self {
            slots: HashMap::new(),
        }
    }

    /// Stores `resource`, returning the value it replaced, if any.
    pub fn insert<T: Resource>(&mut self, resource: T) -> Option<T> {
        self.slots
            .insert(TypeId::of::<T>(), RwLock::new(Box::new(resource)))
            .and_then(|old| old.into_inner().downcast::<T>().ok())
            .map(|boxed| *boxed)
    }

    /// Returns `true` if a resource of type `T` is stored.
    #[must_use]
    pub fn contains<T: Resource>(&self) -> bool {
        self.slots.contains_key(&TypeId::of::<T>())
    }

    /// Borrows a resource immutably.
    ///
    /// # Errors
    ///
    /// - [`ResourceError::NotFound`] if no `T` is stored
    /// - [`ResourceError::BorrowConflict`] if `T` is currently borrowed mutably
    pub fn get<T: Resource>(&self) -> Result<ResourceRef<'_, T>, ResourceError> {
        let name = core::any::type_name::<T>();
        let slot = self
            .slots
            .get(&TypeId::of::<T>())
            .ok_or(ResourceError::NotFound(name))?;
        let guard = slot
            .try_read()
            .ok_or(ResourceError::BorrowConflict(name))?;
        RwLockReadGuard::try_map(guard, |boxed| boxed.downcast_ref::<T>())
            .map_err(|_| ResourceError::NotFound(name))
    }

    /// Borrows a resource mutably.
    ///
    /// # Errors
    ///
    /// - [`ResourceError::NotFound`] if no `T` is stored
    /// - [`ResourceError::BorrowConflict`] if `T` is currently borrowed at all
    pub fn get_mut<T: Resource>(&self) -> Result<ResourceRefMut<'_, T>, ResourceError> {
        let name = core::any::type_name::<T>();
        let slot = self
            .slots
            .get(&TypeId::of::<T>())
            .ok_or(ResourceError::NotFound(name))?;
        let guard = slot
            .try_write()
            .ok_or(ResourceError::BorrowConflict(name))?;
        RwLockWriteGuard::try_map(guard, |boxed| boxed.downcast_mut::<T>())
            .map_err(|_| ResourceError::NotFound(name))
    }

    /// Removes and returns a resource.
    pub fn remove<T: Resource>(&mut self) -> Option<T> {
        self.slots
            .remove(&TypeId::of::<T>())
            .and_then(|slot| slot.into_inner().downcast::<T>().ok())
            .map(|boxed| *boxed)
    }

    /// Returns the number of stored resources.
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Returns `true` if nothing is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct Capacity(usize);

    #[derive(Debug, PartialEq)]
    struct Label(&'static str);

    #[test]
    fn insert_then_get() {
        let mut resources = Resources::new();
        resources.insert(Capacity(15));

        assert_eq!(resources.get::<Capacity>().unwrap().0, 15);
    }

    #[test]
    fn insert_returns_replaced_value() {
        let mut resources = Resources::new();
        assert!(resources.insert(Capacity(1)).is_none());

        let old = resources.insert(Capacity(2));
        assert_eq!(old, Some(Capacity(1)));
        assert_eq!(resources.get::<Capacity>().unwrap().0, 2);
    }

    #[test]
    fn missing_resource_is_not_found() {
        let resources = Resources::new();
        assert!(matches!(
            resources.get::<Capacity>(),
            Err(ResourceError::NotFound(_))
        ));
    }

    #[test]
    fn write_guard_blocks_readers_until_dropped() {
        let mut resources = Resources::new();
        resources.insert(Capacity(3));

        {
            let mut guard = resources.get_mut::<Capacity>().unwrap();
            guard.0 = 4;
            assert!(matches!(
                resources.get::<Capacity>(),
                Err(ResourceError::BorrowConflict(_))
            ));
        }

        assert_eq!(resources.get::<Capacity>().unwrap().0, 4);
    }

    #[test]
    fn distinct_types_are_independent() {
        let mut resources = Resources::new();
        resources.insert(Capacity(8));
        resources.insert(Label("methodCache"));

        let _write = resources.get_mut::<Capacity>().unwrap();
        assert_eq!(resources.get::<Label>().unwrap().0, "methodCache");
        assert_eq!(resources.len(), 2);
    }

    #[test]
    fn remove_takes_ownership() {
        let mut resources = Resources::new();
        resources.insert(Label("events"));

        assert_eq!(resources.remove::<Label>(), Some(Label("events")));
        assert!(resources.remove::<Label>().is_none());
        assert!(resources.is_empty());
    }
}

//! Components and the registry that owns them.
//!
//! A [`Component`] is any registry-managed object that can be advised. It
//! describes its own shape with a [`TypeDescriptor`] and dispatches calls by
//! [`MethodDescriptor`]. The weaver only talks to the registry through the
//! [`ComponentRegistry`] trait; [`BeanRegistry`] is the in-memory
//! implementation.

use crate::error::{ConfigError, InvocationError};
use crate::meta::{MethodDescriptor, TypeDescriptor};
use downcast_rs::{DowncastSync, impl_downcast};
use indexmap::IndexMap;
use parking_lot::RwLock;
use serde_json::Value;
use std::sync::Arc;

// ─────────────────────────────────────────────────────────────────────────────
// Component
// ─────────────────────────────────────────────────────────────────────────────

/// A named application object that calls can be routed through.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use serde_json::{Value, json};
/// use weft_aop::component::Component;
/// use weft_aop::error::InvocationError;
/// use weft_aop::meta::{MethodDescriptor, TypeDescriptor};
///
/// struct Greeter {
///     descriptor: Arc<TypeDescriptor>,
/// }
///
/// impl Component for Greeter {
///     fn type_descriptor(&self) -> Arc<TypeDescriptor> {
///         Arc::clone(&self.descriptor)
///     }
///
///     fn invoke(&self, method: &MethodDescriptor, args: &[Value]) -> Result<Value, InvocationError> {
///         match method.name.as_str() {
///             "greet" => Ok(json!(format!("hello {}", args[0].as_str().unwrap_or("?")))),
///             _ => Err(InvocationError::no_such_method("Greeter", method.signature())),
///         }
///     }
/// }
///
/// let greeter: Arc<dyn Component> = Arc::new(Greeter {
///     descriptor: Arc::new(TypeDescriptor::new("app.Greeter").with_method("greet", ["String"])),
/// });
/// let out = greeter.call("greet", &["String"], vec![json!("ann")]).unwrap();
/// assert_eq!(out, json!("hello ann"));
/// ```
pub trait Component: DowncastSync {
    /// Describes this component's type.
    fn type_descriptor(&self) -> Arc<TypeDescriptor>;

    /// Runs `method` with `args`.
    ///
    /// # Errors
    ///
    /// Whatever the method reports, or [`InvocationError::NoSuchMethod`].
    fn invoke(&self, method: &MethodDescriptor, args: &[Value]) -> Result<Value, InvocationError>;
}

impl_downcast!(sync Component);

impl dyn Component {
    /// Resolves a method by name and parameter types, then invokes it.
    ///
    /// # Errors
    ///
    /// [`InvocationError::NoSuchMethod`] if the type has no such overload, or
    /// whatever the invocation reports.
    pub fn call<S: AsRef<str>>(
        &self,
        name: &str,
        param_types: &[S],
        args: Vec<Value>,
    ) -> Result<Value, InvocationError> {
        let descriptor = self.type_descriptor();
        let method = descriptor.method(name, param_types).ok_or_else(|| {
            let params: Vec<&str> = param_types.iter().map(AsRef::as_ref).collect();
            InvocationError::no_such_method(
                descriptor.name.clone(),
                format!("{name}({})", params.join(",")),
            )
        })?;
        self.invoke(method, &args)
    }
}

impl core::fmt::Debug for dyn Component {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Component")
            .field("type", &self.type_descriptor().name)
            .finish_non_exhaustive()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// ComponentRegistry
// ─────────────────────────────────────────────────────────────────────────────

/// Read and replace access to the components a weave operates on.
pub trait ComponentRegistry: Send + Sync {
    /// Returns the effective instance registered under `name`.
    fn resolve(&self, name: &str) -> Option<Arc<dyn Component>>;

    /// Returns the instance registered under `name`, bypassing any installed
    /// proxy. Registries that never proxy can rely on the default.
    fn original(&self, name: &str) -> Option<Arc<dyn Component>> {
        self.resolve(name)
    }

    /// Returns the declared type of the component registered under `name`.
    fn type_of(&self, name: &str) -> Option<Arc<TypeDescriptor>>;

    /// Every registered component name with its declared type, in registration
    /// order.
    fn components(&self) -> Vec<(String, Arc<TypeDescriptor>)>;

    /// Installs `instance` as the effective instance of `name`.
    ///
    /// # Errors
    ///
    /// [`ConfigError::ComponentNotFound`] if nothing is registered under `name`.
    fn replace_instance(&self, name: &str, instance: Arc<dyn Component>)
    -> Result<(), ConfigError>;
}

// ─────────────────────────────────────────────────────────────────────────────
// BeanRegistry
// ─────────────────────────────────────────────────────────────────────────────

struct BeanEntry {
    declared_type: Arc<TypeDescriptor>,
    original: Arc<dyn Component>,
    proxy: Option<Arc<dyn Component>>,
}

impl BeanEntry {
    fn effective(&self) -> Arc<dyn Component> {
        Arc::clone(self.proxy.as_ref().unwrap_or(&self.original))
    }
}

/// In-memory component registry.
///
/// Keeps registration order and remembers the original instance of every
/// component after a proxy has been installed.
#[derive(Default)]
pub struct BeanRegistry {
    beans: RwLock<IndexMap<String, BeanEntry>>,
}

impl core::fmt::Debug for BeanRegistry {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("BeanRegistry")
            .field("beans", &self.names())
            .finish()
    }
}

impl BeanRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            beans: RwLock::new(IndexMap::new()),
        }
    }

    /// Registers `instance` under `name`, declaring it with the instance's
    /// own type descriptor.
    ///
    /// # Panics
    ///
    /// Panics if a component with the same name is already registered.
    pub fn register(&self, name: impl Into<String>, instance: Arc<dyn Component>) {
        let declared = instance.type_descriptor();
        self.register_as(name, declared, instance);
    }

    /// Registers `instance` under `name` with an explicit declared type.
    ///
    /// # Panics
    ///
    /// Panics if a component with the same name is already registered.
    pub fn register_as(
        &self,
        name: impl Into<String>,
        declared_type: Arc<TypeDescriptor>,
        instance: Arc<dyn Component>,
    ) {
        let name = name.into();
        let mut beans = self.beans.write();
        assert!(
            !beans.contains_key(&name),
            "Component '{name}' is already registered"
        );
        beans.insert(
            name,
            BeanEntry {
                declared_type,
                original: instance,
                proxy: None,
            },
        );
    }

    /// Returns `true` if a proxy is installed for `name`.
    #[must_use]
    pub fn is_proxied(&self, name: &str) -> bool {
        self.beans
            .read()
            .get(name)
            .is_some_and(|entry| entry.proxy.is_some())
    }

    /// Returns whether a component with the given name is registered.
    #[must_use]
    pub fn has(&self, name: &str) -> bool {
        self.beans.read().contains_key(name)
    }

    /// Returns the names of all registered components.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        self.beans.read().keys().cloned().collect()
    }

    /// Returns the number of registered components.
    #[must_use]
    pub fn len(&self) -> usize {
        self.beans.read().len()
    }

    /// Returns `true` if nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.beans.read().is_empty()
    }
}

impl ComponentRegistry for BeanRegistry {
    fn resolve(&self, name: &str) -> Option<Arc<dyn Component>> {
        self.beans.read().get(name).map(BeanEntry::effective)
    }

    fn original(&self, name: &str) -> Option<Arc<dyn Component>> {
        self.beans
            .read()
            .get(name)
            .map(|entry| Arc::clone(&entry.original))
    }

    fn type_of(&self, name: &str) -> Option<Arc<TypeDescriptor>> {
        self.beans
            .read()
            .get(name)
            .map(|entry| Arc::clone(&entry.declared_type))
    }

    fn components(&self) -> Vec<(String, Arc<TypeDescriptor>)> {
        self.beans
            .read()
            .iter()
            .map(|(name, entry)| (name.clone(), Arc::clone(&entry.declared_type)))
            .collect()
    }

    fn replace_instance(
        &self,
        name: &str,
        instance: Arc<dyn Component>,
    ) -> Result<(), ConfigError> {
        let mut beans = self.beans.write();
        let entry = beans
            .get_mut(name)
            .ok_or_else(|| ConfigError::component_not_found(name))?;
        entry.proxy = Some(instance);
        Ok(())
    }
}

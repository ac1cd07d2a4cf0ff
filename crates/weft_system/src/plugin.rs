//! Plugin system.
//!
//! Everything an application does is contributed by a plugin: the component
//! registry, the logging setup, and the aspect weaver are all plugins.
//!
//! # Lifecycle
//!
//! 1. **Build** - [`Plugin::build`] in dependency order; plugins insert resources
//! 2. **Ready** - [`Plugin::ready`] in dependency order; plugins consume what
//!    other plugins built (the weaver runs here)
//! 3. **Cleanup** - [`Plugin::cleanup`] in reverse dependency order
//!
//! # Example
//!
//! ```
//! use weft_system::application::Application;
//! use weft_system::plugin::{Plugin, PluginId};
//!
//! struct RegistryPlugin;
//! impl Plugin for RegistryPlugin {
//!     fn build(&self, app: &mut Application) {
//!         app.insert_resource(Vec::<String>::new());
//!     }
//! }
//!
//! struct BeansPlugin;
//! impl Plugin for BeansPlugin {
//!     fn build(&self, app: &mut Application) {
//!         app.get_resource_mut::<Vec<String>>()
//!             .expect("RegistryPlugin must be added first")
//!             .push("fooBean".into());
//!     }
//!
//!     fn dependencies(&self) -> Vec<PluginId> {
//!         vec![PluginId::of::<RegistryPlugin>()]
//!     }
//! }
//!
//! let mut app = Application::new();
//! app.add_plugins(BeansPlugin).add_plugins(RegistryPlugin);
//! app.finish();
//! ```

use core::any::TypeId;

use crate::application::Application;

// ─────────────────────────────────────────────────────────────────────────────
// PluginId
// ─────────────────────────────────────────────────────────────────────────────

/// Unique identifier for a plugin type, used for dependency resolution and
/// duplicate detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PluginId {
    type_id: TypeId,
    type_name: &'static str,
}

impl PluginId {
    /// Creates the `PluginId` of plugin type `P`.
    #[must_use]
    pub fn of<P: Plugin>() -> Self {
        Self {
            type_id: TypeId::of::<P>(),
            type_name: core::any::type_name::<P>(),
        }
    }

    /// Returns the underlying `TypeId`.
    #[must_use]
    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    /// Returns the plugin's type name.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Plugin
// ─────────────────────────────────────────────────────────────────────────────

/// A unit of application functionality.
pub trait Plugin: Send + Sync + 'static {
    /// Registers resources. Called once, in dependency order.
    fn build(&self, app: &mut Application);

    /// Called after every plugin has been built, in dependency order.
    ///
    /// Use this for work that needs what other plugins registered during
    /// `build()`.
    fn ready(&self, _app: &mut Application) {}

    /// Called on shutdown, in reverse dependency order.
    fn cleanup(&self, _app: &mut Application) {}

    /// Returns the plugin's name for diagnostics.
    fn name(&self) -> &str {
        core::any::type_name::<Self>()
    }

    /// Plugins that must be built before this one.
    fn dependencies(&self) -> Vec<PluginId> {
        Vec::new()
    }

    /// Whether adding this plugin type twice is an error. Defaults to `true`.
    fn is_unique(&self) -> bool {
        true
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Plugins (add_plugins polymorphism)
// ─────────────────────────────────────────────────────────────────────────────

/// Anything accepted by [`Application::add_plugins`]: a single plugin or a
/// [`PluginGroupBuilder`].
pub trait Plugins {
    /// Adds these plugins to the application.
    fn add_to_app(self, app: &mut Application);
}

impl<P: Plugin> Plugins for P {
    fn add_to_app(self, app: &mut Application) {
        app.add_plugin_boxed(PluginId::of::<P>(), Box::new(self));
    }
}

impl Plugins for PluginGroupBuilder {
    fn add_to_app(self, app: &mut Application) {
        for (id, plugin) in self.plugins {
            app.add_plugin_boxed(id, plugin);
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// PluginGroup
// ─────────────────────────────────────────────────────────────────────────────

/// A bundle of plugins that are usually added together.
pub trait PluginGroup {
    /// Returns the plugins in this group.
    fn build(self) -> PluginGroupBuilder;
}

/// Ordered, editable list of plugins produced by a [`PluginGroup`].
#[derive(Default)]
pub struct PluginGroupBuilder {
    plugins: Vec<(PluginId, Box<dyn Plugin>)>,
}

impl PluginGroupBuilder {
    /// Creates an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self {
            plugins: Vec::new(),
        }
    }

    /// Appends a plugin, replacing an existing plugin of the same type in place.
    #[must_use]
    #[expect(
        clippy::should_implement_trait,
        reason = "builder method, not std::ops::Add"
    )]
    pub fn add<P: Plugin>(mut self, plugin: P) -> Self {
        let id = PluginId::of::<P>();
        match self.plugins.iter().position(|(existing, _)| *existing == id) {
            Some(index) => self.plugins[index].1 = Box::new(plugin),
            None => self.plugins.push((id, Box::new(plugin))),
        }
        self
    }

    /// Removes the plugin of type `P` from the group, if present.
    #[must_use]
    pub fn disable<P: Plugin>(mut self) -> Self {
        let id = PluginId::of::<P>();
        self.plugins.retain(|(existing, _)| *existing != id);
        self
    }

    /// Returns `true` if the group contains a plugin of type `P`.
    #[must_use]
    pub fn contains<P: Plugin>(&self) -> bool {
        let id = PluginId::of::<P>();
        self.plugins.iter().any(|(existing, _)| *existing == id)
    }

    /// Returns the number of plugins in the group.
    #[must_use]
    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    /// Returns `true` if the group is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }
}

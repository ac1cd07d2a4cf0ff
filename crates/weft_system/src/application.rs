//! Application runtime for plugin orchestration.
//!
//! The [`Application`] owns the resources plugins share and drives the plugin
//! lifecycle. It does nothing on its own: the registry, logging, and weaving
//! are all contributed by plugins.
//!
//! # Lifecycle
//!
//! 1. **Dependency resolution** - plugins are topologically sorted
//! 2. **Build phase** - `plugin.build()` in dependency order
//! 3. **Ready phase** - `plugin.ready()` in dependency order
//! 4. **Cleanup phase** - `plugin.cleanup()` in reverse order

use crate::plugin::{Plugin, PluginId, Plugins};
use crate::resource::{Resource, ResourceRef, ResourceRefMut, Resources};
use hashbrown::{HashMap, HashSet};
use std::sync::Arc;

/// Build progress. Moves strictly forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum BuildState {
    #[default]
    NotStarted,
    Building,
    Built,
}

struct PluginEntry {
    id: PluginId,
    plugin: Arc<dyn Plugin>,
    name: String,
}

/// The runtime that orchestrates plugins and holds shared resources.
///
/// # Example
///
/// ```
/// use weft_system::application::Application;
/// use weft_system::plugin::Plugin;
///
/// struct Flag(bool);
///
/// struct FlagPlugin;
/// impl Plugin for FlagPlugin {
///     fn build(&self, app: &mut Application) {
///         app.insert_resource(Flag(false));
///     }
///     fn ready(&self, app: &mut Application) {
///         app.get_resource_mut::<Flag>().unwrap().0 = true;
///     }
/// }
///
/// let mut app = Application::new();
/// app.add_plugins(FlagPlugin);
/// app.finish();
/// assert!(app.get_resource::<Flag>().unwrap().0);
/// ```
pub struct Application {
    resources: Resources,
    pending: Vec<PluginEntry>,
    built: Vec<PluginEntry>,
    plugin_ids: HashSet<PluginId>,
    build_state: BuildState,
}

impl Default for Application {
    fn default() -> Self {
        Self::new()
    }
}

impl core::fmt::Debug for Application {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Application")
            .field("resources", &self.resources)
            .field(
                "plugins",
                &self
                    .built
                    .iter()
                    .chain(&self.pending)
                    .map(|entry| entry.name.as_str())
                    .collect::<Vec<_>>(),
            )
            .field("build_state", &self.build_state)
            .finish()
    }
}

impl Application {
    /// Creates an application with no plugins and no resources.
    #[must_use]
    pub fn new() -> Self {
        Self {
            resources: Resources::new(),
            pending: Vec::new(),
            built: Vec::new(),
            plugin_ids: HashSet::new(),
            build_state: BuildState::NotStarted,
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Plugin Management
    // ─────────────────────────────────────────────────────────────────────────

    /// Adds a plugin or a plugin group.
    ///
    /// # Panics
    ///
    /// Panics if a unique plugin is added twice.
    pub fn add_plugins<P: Plugins>(&mut self, plugins: P) -> &mut Self {
        plugins.add_to_app(self);
        self
    }

    pub(crate) fn add_plugin_boxed(&mut self, id: PluginId, plugin: Box<dyn Plugin>) {
        let name = plugin.name().to_string();
        if plugin.is_unique() && !self.plugin_ids.insert(id) {
            panic!("Plugin '{name}' is unique and was already added.");
        }
        self.plugin_ids.insert(id);

        let entry = PluginEntry {
            id,
            plugin: Arc::from(plugin),
            name,
        };

        if self.build_state == BuildState::Building {
            let plugin = Arc::clone(&entry.plugin);
            plugin.build(self);
            self.built.push(entry);
        } else {
            self.pending.push(entry);
        }
    }

    /// Returns `true` if a plugin of type `P` has been added.
    #[must_use]
    pub fn has_plugin<P: Plugin>(&self) -> bool {
        self.plugin_ids.contains(&PluginId::of::<P>())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Resource Access
    // ─────────────────────────────────────────────────────────────────────────

    /// Inserts a resource, returning the value it replaced.
    pub fn insert_resource<R: Resource>(&mut self, resource: R) -> Option<R> {
        self.resources.insert(resource)
    }

    /// Returns `true` if a resource of type `R` exists.
    #[must_use]
    pub fn contains_resource<R: Resource>(&self) -> bool {
        self.resources.contains::<R>()
    }

    /// Borrows a resource immutably.
    ///
    /// Returns `None` if it doesn't exist or is mutably borrowed.
    #[must_use]
    pub fn get_resource<R: Resource>(&self) -> Option<ResourceRef<'_, R>> {
        self.resources.get::<R>().ok()
    }

    /// Borrows a resource mutably.
    ///
    /// Returns `None` if it doesn't exist or is already borrowed.
    #[must_use]
    pub fn get_resource_mut<R: Resource>(&self) -> Option<ResourceRefMut<'_, R>> {
        self.resources.get_mut::<R>().ok()
    }

    /// Removes a resource and returns it.
    pub fn remove_resource<R: Resource>(&mut self) -> Option<R> {
        self.resources.remove::<R>()
    }

    /// Returns the underlying resource container.
    #[must_use]
    pub fn resources(&self) -> &Resources {
        &self.resources
    }

    /// Returns `true` once [`finish()`](Self::finish) has completed.
    #[must_use]
    pub fn is_built(&self) -> bool {
        self.build_state == BuildState::Built
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Lifecycle
    // ─────────────────────────────────────────────────────────────────────────

    /// Builds and readies every plugin.
    ///
    /// # Panics
    ///
    /// - If a dependency was never added
    /// - If plugin dependencies form a cycle
    /// - If called twice
    pub fn finish(&mut self) {
        assert!(
            self.build_state == BuildState::NotStarted,
            "Application::finish() was already called"
        );

        let sorted = self.sort_pending();

        self.build_state = BuildState::Building;
        for entry in sorted {
            tracing::debug!(plugin = %entry.name, "building plugin");
            let plugin = Arc::clone(&entry.plugin);
            plugin.build(self);
            self.built.push(entry);
        }

        let plugins: Vec<Arc<dyn Plugin>> =
            self.built.iter().map(|entry| Arc::clone(&entry.plugin)).collect();
        for plugin in plugins {
            plugin.ready(self);
        }

        self.build_state = BuildState::Built;
    }

    /// Calls `cleanup()` on every built plugin, dependents first.
    pub fn cleanup(&mut self) {
        let plugins: Vec<Arc<dyn Plugin>> = self
            .built
            .iter()
            .rev()
            .map(|entry| Arc::clone(&entry.plugin))
            .collect();
        for plugin in plugins {
            plugin.cleanup(self);
        }
    }

    /// Orders pending plugins so every plugin follows its dependencies.
    fn sort_pending(&mut self) -> Vec<PluginEntry> {
        let pending = core::mem::take(&mut self.pending);
        let index_of: HashMap<PluginId, usize> = pending
            .iter()
            .enumerate()
            .map(|(index, entry)| (entry.id, index))
            .collect();

        let mut in_degree = vec![0usize; pending.len()];
        let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); pending.len()];

        for (index, entry) in pending.iter().enumerate() {
            for dependency in entry.plugin.dependencies() {
                if let Some(&dep_index) = index_of.get(&dependency) {
                    dependents[dep_index].push(index);
                    in_degree[index] += 1;
                } else if !self.built.iter().any(|built| built.id == dependency) {
                    panic!(
                        "Plugin '{}' requires '{}' which was not added.",
                        entry.name,
                        dependency.type_name()
                    );
                }
            }
        }

        // Kahn's algorithm; the ready list is kept in insertion order.
        let mut ready: Vec<usize> = (0..pending.len())
            .filter(|&index| in_degree[index] == 0)
            .collect();
        ready.reverse();
        let mut order = Vec::with_capacity(pending.len());
        while let Some(index) = ready.pop() {
            order.push(index);
            for &dependent in dependents[index].iter().rev() {
                in_degree[dependent] -= 1;
                if in_degree[dependent] == 0 {
                    ready.push(dependent);
                }
            }
        }

        if order.len() != pending.len() {
            let cycle: Vec<&str> = in_degree
                .iter()
                .enumerate()
                .filter(|(_, degree)| **degree > 0)
                .map(|(index, _)| pending[index].name.as_str())
                .collect();
            panic!("Circular dependency detected among plugins: {cycle:?}");
        }

        let mut slots: Vec<Option<PluginEntry>> = pending.into_iter().map(Some).collect();
        order
            .into_iter()
            .filter_map(|index| slots[index].take())
            .collect()
    }
}

//! Component registry plugin.

use std::sync::Arc;
use weft_aop::component::{BeanRegistry, Component};
use weft_system::application::Application;
use weft_system::plugin::Plugin;

/// Publishes the application's [`BeanRegistry`] as an `Arc<BeanRegistry>`
/// resource.
///
/// Other plugins register their components into the shared registry during
/// `build()`; components known up front can be handed to the plugin itself.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use weft_aop::component::BeanRegistry;
/// use weft_system::application::Application;
/// use weft_core_plugins::ComponentsPlugin;
///
/// let mut app = Application::new();
/// app.add_plugins(ComponentsPlugin::new());
/// app.finish();
///
/// assert!(app.get_resource::<Arc<BeanRegistry>>().unwrap().is_empty());
/// ```
#[derive(Default)]
pub struct ComponentsPlugin {
    components: Vec<(String, Arc<dyn Component>)>,
}

impl core::fmt::Debug for ComponentsPlugin {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ComponentsPlugin")
            .field(
                "components",
                &self
                    .components
                    .iter()
                    .map(|(name, _)| name.as_str())
                    .collect::<Vec<_>>(),
            )
            .finish()
    }
}

impl ComponentsPlugin {
    /// Creates a plugin with no predefined components.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `instance` under `name` when the plugin builds.
    #[must_use]
    pub fn with_component(mut self, name: impl Into<String>, instance: Arc<dyn Component>) -> Self {
        self.components.push((name.into(), instance));
        self
    }
}

impl Plugin for ComponentsPlugin {
    fn build(&self, app: &mut Application) {
        let registry = Arc::new(BeanRegistry::new());
        for (name, instance) in &self.components {
            registry.register(name.clone(), Arc::clone(instance));
        }
        tracing::debug!(components = registry.len(), "component registry created");
        app.insert_resource(registry);
    }
}

//! Core infrastructure plugins for weft.
//!
//! - [`TracingPlugin`] - Logging via the `tracing` crate
//! - [`ComponentsPlugin`] - The shared component registry
//! - [`AopPlugin`] - Aspect collection and the weave
//! - [`DefaultPlugins`] - All of the above
//!
//! # Example
//!
//! ```
//! use weft_system::application::Application;
//! use weft_system::plugin::PluginGroup;
//! use weft_core_plugins::MinimalPlugins;
//!
//! let mut app = Application::new();
//! app.add_plugins(MinimalPlugins.build());
//! app.finish();
//! ```
//!
//! # Individual Plugin Usage
//!
//! ```
//! use weft_system::application::Application;
//! use weft_core_plugins::{AopPlugin, ComponentsPlugin, TracingPlugin};
//! use tracing::Level;
//!
//! let mut app = Application::new();
//! app.add_plugins(TracingPlugin::default().with_level(Level::DEBUG))
//!     .add_plugins(ComponentsPlugin::new())
//!     .add_plugins(AopPlugin::new().with_method_caching(true));
//! app.finish();
//! ```

mod aop;
mod components;
mod tracing_plugin;

pub use aop::{
    AopConfig, AopConfigError, AopPlugin, AspectRegistry, CACHE_CAPACITY_KEY, EVENTS_KEY,
    METHOD_CACHING_KEY,
};
pub use components::ComponentsPlugin;
pub use tracing_plugin::{TracingConfig, TracingFormat, TracingPlugin};

use weft_system::plugin::{PluginGroup, PluginGroupBuilder};

/// Default plugins for most weft applications.
///
/// Includes:
/// - [`TracingPlugin`]
/// - [`ComponentsPlugin`]
/// - [`AopPlugin`] with both built-in aspects disabled
///
/// # Customization
///
/// ```
/// use weft_system::plugin::PluginGroup;
/// use weft_core_plugins::{AopPlugin, DefaultPlugins, TracingPlugin};
///
/// let plugins = DefaultPlugins
///     .build()
///     .disable::<TracingPlugin>()
///     .add(AopPlugin::new().with_events(true));
/// assert_eq!(plugins.len(), 2);
/// ```
#[derive(Debug, Clone, Copy)]
pub struct DefaultPlugins;

impl PluginGroup for DefaultPlugins {
    fn build(self) -> PluginGroupBuilder {
        PluginGroupBuilder::new()
            .add(TracingPlugin::default())
            .add(ComponentsPlugin::new())
            .add(AopPlugin::new())
    }
}

/// Default plugins without logging, for tests and embedding.
#[derive(Debug, Clone, Copy)]
pub struct MinimalPlugins;

impl PluginGroup for MinimalPlugins {
    fn build(self) -> PluginGroupBuilder {
        PluginGroupBuilder::new()
            .add(ComponentsPlugin::new())
            .add(AopPlugin::new())
    }
}

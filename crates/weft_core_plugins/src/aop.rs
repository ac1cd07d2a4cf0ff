//! Aspect weaving plugin.
//!
//! Provides [`AopPlugin`], which owns the weave of an application: plugins
//! contribute aspects to the [`AspectRegistry`] during `build()`, and the
//! weave replaces every advised component of the [`BeanRegistry`] during
//! `ready()`.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use serde_json::Value;
//! use weft_aop::prelude::*;
//! use weft_system::application::Application;
//! use weft_system::plugin::{Plugin, PluginId};
//! use weft_core_plugins::{AopPlugin, AspectRegistry, ComponentsPlugin};
//!
//! struct AuditPlugin;
//!
//! impl Plugin for AuditPlugin {
//!     fn build(&self, app: &mut Application) {
//!         let advisor = Arc::new(Advisor::new("app.Audit").with_advice("audit", |_jp| Ok(Value::Null)));
//!         app.get_resource_mut::<AspectRegistry>()
//!             .unwrap()
//!             .add_declaration(
//!                 AspectDeclaration::new(advisor)
//!                     .with_advice(AdviceAnnotation::after("audit").within(["app"])),
//!             );
//!     }
//!
//!     fn dependencies(&self) -> Vec<PluginId> {
//!         vec![PluginId::of::<AopPlugin>()]
//!     }
//! }
//!
//! let mut app = Application::new();
//! app.add_plugins(ComponentsPlugin::new())
//!     .add_plugins(AopPlugin::new())
//!     .add_plugins(AuditPlugin);
//! app.finish();
//! ```

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use weft_aop::advisor::{Advisor, AdvisorCatalog};
use weft_aop::builder::GenericPointcutBuilder;
use weft_aop::component::BeanRegistry;
use weft_aop::context::AopContext;
use weft_aop::definition::AspectDefinition;
use weft_aop::error::ConfigError;
use weft_aop::proxy::DelegatingProxyFactory;
use weft_aop::transform::{
    AspectConfig, AspectDeclaration, AspectTransformer, GenericAspectTransformer,
};
use weft_aop::weaver::{AspectWeaver, ProxyingAspectWeaver};
use weft_aspects::cache::{DEFAULT_CACHE_CAPACITY, MethodCache, cache_advisor, cache_aspect};
use weft_aspects::events::{EventBus, events_advisor, events_aspect};
use weft_system::application::Application;
use weft_system::plugin::{Plugin, PluginId};
use weft_system::resource::Resource;

use crate::components::ComponentsPlugin;

// ─────────────────────────────────────────────────────────────────────────────
// AopConfig
// ─────────────────────────────────────────────────────────────────────────────

/// Application setting that enables the built-in caching aspect.
pub const METHOD_CACHING_KEY: &str = "methodCaching";
/// Application setting that enables the built-in events aspect.
pub const EVENTS_KEY: &str = "events";
/// Application setting for the number of entries kept per method cache.
pub const CACHE_CAPACITY_KEY: &str = "cacheCapacity";

/// Errors raised while reading [`AopConfig`] from application settings.
#[derive(Debug, thiserror::Error)]
pub enum AopConfigError {
    /// A numeric setting did not parse.
    #[error("setting '{key}' expects a number, got '{value}'")]
    InvalidNumber {
        /// Setting name.
        key: String,
        /// Raw value.
        value: String,
    },
}

/// Switches for the built-in aspects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AopConfig {
    /// Weave the caching aspect.
    pub method_caching: bool,
    /// Weave the events aspect.
    pub events: bool,
    /// Entries kept per method cache.
    pub cache_capacity: usize,
}

impl Default for AopConfig {
    fn default() -> Self {
        Self {
            method_caching: false,
            events: false,
            cache_capacity: DEFAULT_CACHE_CAPACITY,
        }
    }
}

impl AopConfig {
    /// Reads the configuration from flat application settings.
    ///
    /// Boolean settings are `true` when their value is `true` in any case and
    /// `false` otherwise. Missing settings keep their defaults.
    ///
    /// # Errors
    ///
    /// [`AopConfigError::InvalidNumber`] if `cacheCapacity` is not a number.
    pub fn from_app_config(settings: &HashMap<String, String>) -> Result<Self, AopConfigError> {
        let flag = |key: &str| {
            settings
                .get(key)
                .is_some_and(|value| value.trim().eq_ignore_ascii_case("true"))
        };
        let cache_capacity = match settings.get(CACHE_CAPACITY_KEY) {
            Some(value) => value
                .trim()
                .parse()
                .map_err(|_| AopConfigError::InvalidNumber {
                    key: CACHE_CAPACITY_KEY.to_string(),
                    value: value.clone(),
                })?,
            None => DEFAULT_CACHE_CAPACITY,
        };
        Ok(Self {
            method_caching: flag(METHOD_CACHING_KEY),
            events: flag(EVENTS_KEY),
            cache_capacity,
        })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// AspectRegistry Resource
// ─────────────────────────────────────────────────────────────────────────────

/// Aspects and advice services collected before the weave.
///
/// Inserted by [`AopPlugin`] during `build()` and consumed by its `ready()`.
/// The catalog starts with the built-in advisors so configuration records
/// can name them.
#[derive(Debug)]
pub struct AspectRegistry {
    declarations: Vec<AspectDeclaration>,
    configs: Vec<AspectConfig>,
    definitions: Vec<AspectDefinition>,
    catalog: AdvisorCatalog,
    context: AopContext,
}

impl Default for AspectRegistry {
    fn default() -> Self {
        let mut catalog = AdvisorCatalog::new();
        catalog.register(cache_advisor());
        catalog.register(events_advisor());
        Self {
            declarations: Vec::new(),
            configs: Vec::new(),
            definitions: Vec::new(),
            catalog,
            context: AopContext::new(),
        }
    }
}

impl AspectRegistry {
    /// Creates a registry holding only the built-in advisors.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an aspect declared in code.
    pub fn add_declaration(&mut self, declaration: AspectDeclaration) -> &mut Self {
        self.declarations.push(declaration);
        self
    }

    /// Adds a declarative aspect record. Its advisor must be in the catalog
    /// by the time the weave runs.
    pub fn add_config(&mut self, config: AspectConfig) -> &mut Self {
        self.configs.push(config);
        self
    }

    /// Adds every record of a JSON aspect document.
    ///
    /// # Errors
    ///
    /// [`ConfigError::Parse`] if the document is malformed.
    pub fn add_config_json(&mut self, json: &str) -> Result<&mut Self, ConfigError> {
        self.configs.extend(AspectConfig::from_json(json)?);
        Ok(self)
    }

    /// Adds an already normalized aspect.
    pub fn add_definition(&mut self, definition: AspectDefinition) -> &mut Self {
        self.definitions.push(definition);
        self
    }

    /// Makes `advisor` resolvable by type name for configuration records.
    ///
    /// # Panics
    ///
    /// Panics if an advisor with the same type name is already registered.
    pub fn register_advisor(&mut self, advisor: Arc<Advisor>) -> &mut Self {
        self.catalog.register(advisor);
        self
    }

    /// Installs a service that advice can read from its join point context.
    pub fn insert_service<T: Resource>(&mut self, service: T) -> &mut Self {
        self.context.insert_service(service);
        self
    }

    /// Number of aspects contributed so far, across all sources.
    #[must_use]
    pub fn len(&self) -> usize {
        self.declarations.len() + self.configs.len() + self.definitions.len()
    }

    /// Returns `true` if no aspect has been contributed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn into_aspects(self) -> Result<(Vec<AspectDefinition>, AopContext), ConfigError> {
        let transformer = GenericAspectTransformer::new();
        let mut aspects = Vec::with_capacity(self.len());
        for declaration in &self.declarations {
            aspects.push(transformer.transform(declaration)?);
        }
        for config in &self.configs {
            aspects.push(transformer.transform_config(config, &self.catalog)?);
        }
        aspects.extend(self.definitions);
        Ok((aspects, self.context))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// AopPlugin
// ─────────────────────────────────────────────────────────────────────────────

/// Weaves every contributed aspect into the component registry.
///
/// # Resources Provided
///
/// | Resource | Description |
/// |----------|-------------|
/// | [`AopConfig`] | Built-in aspect switches |
/// | [`AspectRegistry`] | Aspect contributions; removed when the weave runs |
/// | `Arc<AopContext>` | The services advice sees, available after `ready()` |
///
/// # Dependencies
///
/// - [`ComponentsPlugin`]
///
/// # Panics
///
/// `ready()` panics if an aspect is invalid or the weave fails: an
/// application never starts with a partial weave.
#[derive(Debug, Clone, Default)]
pub struct AopPlugin {
    config: AopConfig,
}

impl AopPlugin {
    /// Creates a plugin with both built-in aspects disabled.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a plugin configured from flat application settings
    /// (`methodCaching`, `events`, `cacheCapacity`).
    ///
    /// # Errors
    ///
    /// [`AopConfigError`] if a setting has an unusable value.
    pub fn from_app_config(settings: &HashMap<String, String>) -> Result<Self, AopConfigError> {
        AopConfig::from_app_config(settings).map(|config| Self::new().with_config(config))
    }

    /// Replaces the whole configuration.
    #[must_use]
    pub fn with_config(mut self, config: AopConfig) -> Self {
        self.config = config;
        self
    }

    /// Enables or disables the caching aspect.
    #[must_use]
    pub fn with_method_caching(mut self, enabled: bool) -> Self {
        self.config.method_caching = enabled;
        self
    }

    /// Enables or disables the events aspect.
    #[must_use]
    pub fn with_events(mut self, enabled: bool) -> Self {
        self.config.events = enabled;
        self
    }

    /// Sets the number of entries kept per method cache.
    #[must_use]
    pub fn with_cache_capacity(mut self, capacity: usize) -> Self {
        self.config.cache_capacity = capacity;
        self
    }

    /// The configuration this plugin weaves with.
    #[must_use]
    pub fn config(&self) -> &AopConfig {
        &self.config
    }
}

impl Plugin for AopPlugin {
    fn build(&self, app: &mut Application) {
        app.insert_resource(self.config.clone());
        app.insert_resource(AspectRegistry::new());
    }

    fn ready(&self, app: &mut Application) {
        let Some(components) = app
            .get_resource::<Arc<BeanRegistry>>()
            .map(|registry| Arc::clone(&*registry))
        else {
            panic!("AopPlugin requires the component registry published by ComponentsPlugin");
        };
        let contributions = app.remove_resource::<AspectRegistry>().unwrap_or_default();

        let (mut aspects, mut context) = match contributions.into_aspects() {
            Ok(transformed) => transformed,
            Err(err) => panic!("Invalid aspect declaration: {err}"),
        };

        if self.config.method_caching {
            if !context.has_service::<MethodCache>() {
                context.insert_service(MethodCache::new(self.config.cache_capacity));
            }
            aspects.push(cache_aspect());
        }
        if self.config.events {
            if !context.has_service::<EventBus>() {
                context.insert_service(EventBus::new());
            }
            aspects.push(events_aspect());
        }

        let context = Arc::new(context);
        let builder = GenericPointcutBuilder::new(components.clone(), Arc::clone(&context));
        let weaver = ProxyingAspectWeaver::new(components, builder, DelegatingProxyFactory);
        if let Err(err) = weaver.weave(&aspects) {
            panic!("Aspect weaving failed: {err}");
        }

        tracing::info!(
            aspects = aspects.len(),
            method_caching = self.config.method_caching,
            events = self.config.events,
            "AopPlugin woven"
        );
        app.insert_resource(context);
    }

    fn dependencies(&self) -> Vec<PluginId> {
        vec![PluginId::of::<ComponentsPlugin>()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(key, value)| ((*key).to_string(), (*value).to_string()))
            .collect()
    }

    #[test]
    fn defaults_disable_built_in_aspects() {
        let config = AopConfig::default();
        assert!(!config.method_caching);
        assert!(!config.events);
        assert_eq!(config.cache_capacity, 15);
    }

    #[test]
    fn app_settings_parse_booleans_leniently() {
        let config = AopConfig::from_app_config(&settings(&[
            ("methodCaching", "TRUE"),
            ("events", "yes"),
            ("cacheCapacity", " 40 "),
        ]))
        .unwrap();
        assert!(config.method_caching);
        assert!(!config.events);
        assert_eq!(config.cache_capacity, 40);
    }

    #[test]
    fn bad_capacity_is_rejected() {
        let err = AopConfig::from_app_config(&settings(&[("cacheCapacity", "lots")])).unwrap_err();
        assert_eq!(err.to_string(), "setting 'cacheCapacity' expects a number, got 'lots'");
    }

    #[test]
    fn plugin_reads_app_settings() {
        let plugin = AopPlugin::from_app_config(&settings(&[
            (METHOD_CACHING_KEY, "true"),
            (CACHE_CAPACITY_KEY, "3"),
        ]))
        .unwrap();
        assert!(plugin.config().method_caching);
        assert!(!plugin.config().events);
        assert_eq!(plugin.config().cache_capacity, 3);

        assert!(AopPlugin::from_app_config(&settings(&[(CACHE_CAPACITY_KEY, "-1")])).is_err());
    }

    #[test]
    fn config_deserializes_camel_case_with_defaults() {
        let config: AopConfig = serde_json::from_str(r#"{ "methodCaching": true }"#).unwrap();
        assert_eq!(
            config,
            AopConfig {
                method_caching: true,
                ..AopConfig::default()
            }
        );
    }

    #[test]
    fn registry_counts_every_source() {
        let mut registry = AspectRegistry::new();
        assert!(registry.is_empty());
        registry
            .add_definition(cache_aspect())
            .add_config_json(r#"[{ "id": "events", "class": "weft.aspects.EventsAspect" }]"#)
            .unwrap();
        assert_eq!(registry.len(), 2);
    }
}

//! Installs proxies for every advised component.

use crate::builder::PointcutBuilder;
use crate::component::ComponentRegistry;
use crate::definition::AspectDefinition;
use crate::error::ConfigError;
use crate::proxy::ProxyFactory;
use std::sync::Arc;

/// Applies aspects to the components of a registry.
pub trait AspectWeaver: Send + Sync {
    /// Resolves `aspects` and installs a proxy for every advised component.
    ///
    /// # Errors
    ///
    /// Any [`ConfigError`] from pointcut resolution, or
    /// [`ConfigError::ComponentNotFound`] if an advised component disappears
    /// before its proxy is installed. The weave stops at the first error.
    fn weave(&self, aspects: &[AspectDefinition]) -> Result<(), ConfigError>;
}

/// [`AspectWeaver`] that replaces each advised component with a proxy.
///
/// Proxies are subtype proxies by default, so a woven component can still
/// stand in for its concrete type. [`with_require_concrete(false)`] lets the
/// factory pick an interface proxy instead.
///
/// [`with_require_concrete(false)`]: Self::with_require_concrete
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use weft_aop::builder::GenericPointcutBuilder;
/// use weft_aop::component::BeanRegistry;
/// use weft_aop::context::AopContext;
/// use weft_aop::proxy::DelegatingProxyFactory;
/// use weft_aop::weaver::{AspectWeaver, ProxyingAspectWeaver};
///
/// let registry = Arc::new(BeanRegistry::new());
/// let builder = GenericPointcutBuilder::new(registry.clone(), Arc::new(AopContext::new()));
/// let weaver = ProxyingAspectWeaver::new(registry, builder, DelegatingProxyFactory);
///
/// // Nothing registered, nothing advised.
/// weaver.weave(&[]).unwrap();
/// ```
pub struct ProxyingAspectWeaver {
    registry: Arc<dyn ComponentRegistry>,
    builder: Box<dyn PointcutBuilder>,
    factory: Box<dyn ProxyFactory>,
    require_concrete: bool,
}

impl core::fmt::Debug for ProxyingAspectWeaver {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ProxyingAspectWeaver")
            .field("require_concrete", &self.require_concrete)
            .finish_non_exhaustive()
    }
}

impl ProxyingAspectWeaver {
    /// Creates a weaver.
    pub fn new(
        registry: Arc<dyn ComponentRegistry>,
        builder: impl PointcutBuilder + 'static,
        factory: impl ProxyFactory + 'static,
    ) -> Self {
        Self {
            registry,
            builder: Box::new(builder),
            factory: Box::new(factory),
            require_concrete: true,
        }
    }

    /// Sets whether every proxy must extend the concrete component type.
    #[must_use]
    pub fn with_require_concrete(mut self, require_concrete: bool) -> Self {
        self.require_concrete = require_concrete;
        self
    }
}

impl AspectWeaver for ProxyingAspectWeaver {
    fn weave(&self, aspects: &[AspectDefinition]) -> Result<(), ConfigError> {
        let pointcuts = self.builder.build(aspects)?;
        let advised = pointcuts.len();

        for pointcut in pointcuts {
            let bean_name = pointcut.bean_name().to_string();
            let target = self
                .registry
                .resolve(&bean_name)
                .ok_or_else(|| ConfigError::component_not_found(bean_name.as_str()))?;
            let proxy = self
                .factory
                .create_proxy_with(target, pointcut, self.require_concrete);
            self.registry.replace_instance(&bean_name, Arc::new(proxy))?;
        }

        tracing::info!(aspects = aspects.len(), advised, "weave complete");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::advisor::{AdviceMethod, Advisor};
    use crate::builder::GenericPointcutBuilder;
    use crate::component::{BeanRegistry, Component};
    use crate::context::AopContext;
    use crate::definition::{AdviceDefinition, AdviceLocation, PointcutKind};
    use crate::error::InvocationError;
    use crate::meta::{MethodDescriptor, TypeDescriptor};
    use crate::pointcut::Pointcut;
    use crate::proxy::{AdvisedProxy, DelegatingProxyFactory, ProxyKind};
    use serde_json::{Value, json};

    struct Counter(Arc<TypeDescriptor>);

    impl Component for Counter {
        fn type_descriptor(&self) -> Arc<TypeDescriptor> {
            Arc::clone(&self.0)
        }

        fn invoke(&self, _method: &MethodDescriptor, _args: &[Value]) -> Result<Value, InvocationError> {
            Ok(json!(1))
        }
    }

    fn setup() -> (Arc<BeanRegistry>, ProxyingAspectWeaver) {
        let registry = Arc::new(BeanRegistry::new());
        registry.register(
            "counterBean",
            Arc::new(Counter(Arc::new(
                TypeDescriptor::new("app.Counter").with_method("next", Vec::<String>::new()),
            ))),
        );
        registry.register(
            "idleBean",
            Arc::new(Counter(Arc::new(TypeDescriptor::new("lib.Idle")))),
        );
        let builder = GenericPointcutBuilder::new(registry.clone(), Arc::new(AopContext::new()));
        let weaver = ProxyingAspectWeaver::new(registry.clone(), builder, DelegatingProxyFactory);
        (registry, weaver)
    }

    fn doubling_aspect() -> AspectDefinition {
        let method = AdviceMethod::proceeding("double", |pjp| {
            let value = pjp.proceed()?;
            Ok(json!(value.as_i64().unwrap_or_default() * 2))
        });
        let advisor = Arc::new(Advisor::new("app.Doubler").with_method(method.clone()));
        AspectDefinition::new(advisor, "doubler").with_advice(AdviceDefinition::new(
            method,
            AdviceLocation::Around,
            PointcutKind::Within,
            ["app"],
        ))
    }

    #[test]
    fn advised_components_are_replaced() {
        let (registry, weaver) = setup();
        weaver.weave(&[doubling_aspect()]).unwrap();

        assert!(registry.is_proxied("counterBean"));
        assert!(!registry.is_proxied("idleBean"));

        let counter = registry.resolve("counterBean").unwrap();
        assert!(counter.is::<AdvisedProxy>());
        assert_eq!(counter.call::<&str>("next", &[], vec![]).unwrap(), json!(2));
    }

    #[test]
    fn no_aspects_leaves_registry_untouched() {
        let (registry, weaver) = setup();
        weaver.weave(&[]).unwrap();
        assert!(!registry.is_proxied("counterBean"));
    }

    fn api_registry() -> Arc<BeanRegistry> {
        let registry = Arc::new(BeanRegistry::new());
        registry.register(
            "counterBean",
            Arc::new(Counter(Arc::new(
                TypeDescriptor::new("app.Counter")
                    .with_supertype("app.BaseCounter")
                    .with_interface("app.Source")
                    .with_method("next", Vec::<String>::new()),
            ))),
        );
        registry
    }

    #[test]
    fn woven_proxies_extend_the_concrete_type() {
        let registry = api_registry();
        let builder = GenericPointcutBuilder::new(registry.clone(), Arc::new(AopContext::new()));
        ProxyingAspectWeaver::new(registry.clone(), builder, DelegatingProxyFactory)
            .weave(&[doubling_aspect()])
            .unwrap();

        let counter = registry.resolve("counterBean").unwrap();
        let proxy = counter.downcast_ref::<AdvisedProxy>().unwrap();
        assert!(matches!(proxy.kind(), ProxyKind::Subtype { type_name } if type_name == "app.Counter"));
        assert!(proxy.is_assignable_to("app.Counter"));
        assert!(proxy.is_assignable_to("app.BaseCounter"));
        assert!(proxy.is_assignable_to("app.Source"));
    }

    #[test]
    fn interface_proxies_on_request() {
        let registry = api_registry();
        let builder = GenericPointcutBuilder::new(registry.clone(), Arc::new(AopContext::new()));
        ProxyingAspectWeaver::new(registry.clone(), builder, DelegatingProxyFactory)
            .with_require_concrete(false)
            .weave(&[doubling_aspect()])
            .unwrap();

        let counter = registry.resolve("counterBean").unwrap();
        let proxy = counter.downcast_ref::<AdvisedProxy>().unwrap();
        assert!(matches!(proxy.kind(), ProxyKind::Interface { .. }));
        assert!(!proxy.is_assignable_to("app.Counter"));
        assert_eq!(counter.call::<&str>("next", &[], vec![]).unwrap(), json!(2));
    }

    struct StaleBuilder;

    impl PointcutBuilder for StaleBuilder {
        fn build(&self, _aspects: &[AspectDefinition]) -> Result<Vec<Pointcut>, ConfigError> {
            Ok(vec![Pointcut::new(
                "removedBean",
                Arc::new(TypeDescriptor::new("app.Removed")),
            )])
        }
    }

    #[test]
    fn missing_component_aborts_weave() {
        let registry = Arc::new(BeanRegistry::new());
        let weaver = ProxyingAspectWeaver::new(registry, StaleBuilder, DelegatingProxyFactory);
        assert!(matches!(
            weaver.weave(&[]),
            Err(ConfigError::ComponentNotFound(name)) if name == "removedBean"
        ));
    }
}

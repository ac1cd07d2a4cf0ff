//! Resolves advice selectors into per-component pointcuts.
//!
//! Two selector grammars are understood:
//!
//! - **beans**: `"fooBean"` (every method), `"fooBean.bar()"` (the zero-arg
//!   overload), `"fooBean.bar(*)"` (every overload), or
//!   `"fooBean.bar(int,String)"` (exactly that overload).
//! - **within**: a type-name prefix compared case-insensitively, or `"*"`
//!   for every registered component.

use crate::component::{Component, ComponentRegistry};
use crate::context::AopContext;
use crate::definition::{AdviceDefinition, AspectDefinition, PointcutKind};
use crate::error::ConfigError;
use crate::join_point::{BoundJoinPoint, JoinPoint, JoinPointState};
use crate::meta::TypeDescriptor;
use crate::pointcut::Pointcut;
use indexmap::IndexMap;
use std::sync::Arc;

/// Produces pointcuts from aspect definitions.
pub trait PointcutBuilder: Send + Sync {
    /// Resolves every advice of every aspect, grouping join points by
    /// component.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] for a malformed selector, an unknown
    /// component, or a method that cannot be found.
    fn build(&self, aspects: &[AspectDefinition]) -> Result<Vec<Pointcut>, ConfigError>;
}

/// Default [`PointcutBuilder`], resolving against a [`ComponentRegistry`].
pub struct GenericPointcutBuilder {
    registry: Arc<dyn ComponentRegistry>,
    context: Arc<AopContext>,
}

impl core::fmt::Debug for GenericPointcutBuilder {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("GenericPointcutBuilder")
            .field("context", &self.context)
            .finish_non_exhaustive()
    }
}

/// Join points collected so far, keyed by component name in first-seen order.
type PointcutMap = IndexMap<String, Pointcut>;

impl GenericPointcutBuilder {
    /// Creates a builder over `registry`; join points carry `context`.
    pub fn new(registry: Arc<dyn ComponentRegistry>, context: Arc<AopContext>) -> Self {
        Self { registry, context }
    }

    fn template(
        &self,
        aspect: &AspectDefinition,
        advice: &AdviceDefinition,
        bean_name: &str,
        target: Arc<dyn Component>,
    ) -> JoinPointState {
        JoinPointState::new(Arc::clone(&self.context), advice.location())
            .with_advice(Arc::clone(aspect.advisor()), advice.method().clone())
            .with_bean_name(bean_name)
            .with_target(target)
            .with_order(advice.order())
    }

    fn resolve_beans(
        &self,
        aspect: &AspectDefinition,
        advice: &AdviceDefinition,
        pointcuts: &mut PointcutMap,
    ) -> Result<(), ConfigError> {
        for raw in advice.selectors() {
            let selector = raw.trim();
            if selector.is_empty() {
                continue;
            }

            let (bean_name, pattern) = match selector.split_once('.') {
                Some((bean_name, pattern)) => (bean_name, Some(pattern)),
                None => (selector, None),
            };

            let declared = self
                .registry
                .type_of(bean_name)
                .ok_or_else(|| ConfigError::component_not_found(bean_name))?;
            if !advice.qualifies(&declared) {
                tracing::trace!(
                    aspect = aspect.name(),
                    selector,
                    "component rejected by qualifier"
                );
                continue;
            }
            let target = self
                .registry
                .resolve(bean_name)
                .ok_or_else(|| ConfigError::component_not_found(bean_name))?;
            let instance_type = target.type_descriptor();
            let template = self.template(aspect, advice, bean_name, target);

            let Some(pattern) = pattern else {
                insert(pointcuts, &declared, template.with_class_scope(true));
                continue;
            };

            let (method_name, params) = pattern
                .strip_suffix(')')
                .and_then(|body| body.split_once('('))
                .ok_or_else(|| ConfigError::invalid_selector(selector, aspect.name()))?;
            let method_name = method_name.trim();
            let params = params.trim();

            if params.is_empty() {
                let method = instance_type
                    .method::<&str>(method_name, &[])
                    .ok_or_else(|| {
                        ConfigError::method_not_found(format!("{method_name}()"), selector)
                    })?;
                insert(pointcuts, &declared, template.with_method(method.clone()));
            } else if params == "*" {
                let mut matched = 0usize;
                for method in instance_type.methods_named(method_name) {
                    insert(
                        pointcuts,
                        &declared,
                        template.clone().with_method(method.clone()),
                    );
                    matched += 1;
                }
                if matched == 0 {
                    tracing::warn!(
                        aspect = aspect.name(),
                        selector,
                        "wildcard selector matched no methods"
                    );
                }
            } else {
                let types: Vec<&str> = params.split(',').map(str::trim).collect();
                let method = instance_type.method(method_name, &types).ok_or_else(|| {
                    ConfigError::method_not_found(
                        format!("{method_name}({})", types.join(",")),
                        selector,
                    )
                })?;
                insert(pointcuts, &declared, template.with_method(method.clone()));
            }
        }
        Ok(())
    }

    fn resolve_within(
        &self,
        aspect: &AspectDefinition,
        advice: &AdviceDefinition,
        pointcuts: &mut PointcutMap,
    ) -> Result<(), ConfigError> {
        for raw in advice.selectors() {
            let prefix = raw.trim().to_lowercase();
            if prefix.is_empty() {
                continue;
            }
            let all = prefix == "*";

            for (bean_name, declared) in self.registry.components() {
                if !all && !declared.name.to_lowercase().starts_with(&prefix) {
                    continue;
                }
                if !advice.qualifies(&declared) {
                    continue;
                }
                let target = self
                    .registry
                    .original(&bean_name)
                    .ok_or_else(|| ConfigError::component_not_found(bean_name.as_str()))?;
                let state = self
                    .template(aspect, advice, &bean_name, target)
                    .with_class_scope(true);
                insert(pointcuts, &declared, state);
            }
        }
        Ok(())
    }
}

fn insert(pointcuts: &mut PointcutMap, declared: &Arc<TypeDescriptor>, state: JoinPointState) {
    let join_point = BoundJoinPoint::for_location(state);
    let bean_name = join_point.bean_name().to_string();
    tracing::debug!(
        bean = %bean_name,
        location = %join_point.location(),
        "resolved join point"
    );
    pointcuts
        .entry(bean_name)
        .or_insert_with_key(|name| Pointcut::new(name.clone(), Arc::clone(declared)))
        .add_join_point(join_point);
}

impl PointcutBuilder for GenericPointcutBuilder {
    fn build(&self, aspects: &[AspectDefinition]) -> Result<Vec<Pointcut>, ConfigError> {
        let mut pointcuts = PointcutMap::new();
        for aspect in aspects {
            for advice in aspect.advice() {
                match advice.pointcut_kind() {
                    PointcutKind::Beans => self.resolve_beans(aspect, advice, &mut pointcuts)?,
                    PointcutKind::Within => self.resolve_within(aspect, advice, &mut pointcuts)?,
                }
            }
        }
        Ok(pointcuts.into_values().collect())
    }
}

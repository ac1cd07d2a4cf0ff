//! Aspect-oriented interception for weft components.
//!
//! Aspects declare advice that runs before, after, or around the methods of
//! registered components. Weaving resolves every advice selector against the
//! component registry and replaces each advised component with a proxy that
//! runs the advice chain on every call.
//!
//! # Pipeline
//!
//! ```text
//! AspectDeclaration / AspectConfig
//!         │  AspectTransformer
//!         ▼
//! AspectDefinition ──► PointcutBuilder ──► Pointcut (per component)
//!                                              │  AspectWeaver + ProxyFactory
//!                                              ▼
//!                                   AdvisedProxy installed in the registry
//! ```
//!
//! # Modules
//!
//! - [`meta`] - Type and method descriptors
//! - [`component`] - The component seam and the in-memory registry
//! - [`advisor`] - Advice owners and advice methods
//! - [`definition`] - The normalized aspect model
//! - [`transform`] - Declaration sources and the transformer
//! - [`join_point`] - Join points and around chains
//! - [`pointcut`] - Per-component join point queues
//! - [`builder`] - Selector resolution
//! - [`proxy`] - Proxy dispatch
//! - [`weaver`] - Proxy installation
//! - [`context`] - Services visible to advice
//! - [`error`] - Configuration and invocation errors

pub mod advisor;
pub mod builder;
pub mod component;
pub mod context;
pub mod definition;
pub mod error;
pub mod join_point;
pub mod meta;
pub mod pointcut;
pub mod proxy;
pub mod transform;
pub mod weaver;

/// Re-export all common types for easy access.
pub mod prelude {
    pub use crate::advisor::{AdviceFn, AdviceMethod, Advisor, AdvisorCatalog};
    pub use crate::builder::{GenericPointcutBuilder, PointcutBuilder};
    pub use crate::component::{BeanRegistry, Component, ComponentRegistry};
    pub use crate::context::AopContext;
    pub use crate::definition::{
        AdviceDefinition, AdviceLocation, AspectDefinition, DEFAULT_ORDER, PointcutKind,
    };
    pub use crate::error::{ConfigError, InvocationError};
    pub use crate::join_point::{
        BasicJoinPoint, BoundJoinPoint, JoinPoint, JoinPointState, ProceedingJoinPoint,
    };
    pub use crate::meta::{MethodDescriptor, MethodMarker, TypeDescriptor};
    pub use crate::pointcut::Pointcut;
    pub use crate::proxy::{
        AdviceChain, AdvisedProxy, DelegatingProxyFactory, ProxyFactory, ProxyKind, applies,
    };
    pub use crate::transform::{
        AdviceAnnotation, AdviceConfig, AspectConfig, AspectDeclaration, AspectTransformer,
        GenericAspectTransformer,
    };
    pub use crate::weaver::{AspectWeaver, ProxyingAspectWeaver};
}

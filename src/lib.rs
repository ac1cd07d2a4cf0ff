//! Aspect-oriented interception for weft components.
//!
//! Components register in a shared registry; aspects declare advice that runs
//! before, after, or around their methods; the weave replaces every advised
//! component with a proxy that runs the advice chain on each call.
//!
//! - [`weft_system`] - Application host: plugins and resources
//! - [`weft_aop`] - Aspects, pointcuts, join points, proxies, the weaver
//! - [`weft_aspects`] - Method caching and framework events
//! - [`weft_core_plugins`] - Logging, component registry, and weaving plugins
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use serde_json::{Value, json};
//! use weft::prelude::*;
//!
//! struct Clock;
//!
//! impl Component for Clock {
//!     fn type_descriptor(&self) -> Arc<TypeDescriptor> {
//!         Arc::new(TypeDescriptor::new("app.Clock").with_method("now", Vec::<String>::new()))
//!     }
//!
//!     fn invoke(&self, _method: &MethodDescriptor, _args: &[Value]) -> Result<Value, InvocationError> {
//!         Ok(json!(1_700_000_000))
//!     }
//! }
//!
//! struct FrozenTime;
//!
//! impl Plugin for FrozenTime {
//!     fn build(&self, app: &mut Application) {
//!         let advisor = Arc::new(Advisor::new("app.Freeze").with_around("freeze", |_pjp| Ok(json!(0))));
//!         app.get_resource_mut::<AspectRegistry>().unwrap().add_declaration(
//!             AspectDeclaration::new(advisor)
//!                 .with_advice(AdviceAnnotation::around("freeze").beans(["clock.now()"])),
//!         );
//!     }
//!
//!     fn dependencies(&self) -> Vec<PluginId> {
//!         vec![PluginId::of::<AopPlugin>()]
//!     }
//! }
//!
//! let mut app = Application::new();
//! app.add_plugins(ComponentsPlugin::new().with_component("clock", Arc::new(Clock)))
//!     .add_plugins(AopPlugin::new())
//!     .add_plugins(FrozenTime);
//! app.finish();
//!
//! let clock = app.get_resource::<Arc<BeanRegistry>>().unwrap().resolve("clock").unwrap();
//! assert_eq!(clock.call::<&str>("now", &[], vec![]).unwrap(), json!(0));
//! ```

pub use weft_aop;
pub use weft_aspects;
pub use weft_core_plugins;
pub use weft_system;

/// Re-export all common types for easy access.
pub mod prelude {
    pub use weft_aop::prelude::*;
    pub use weft_aspects::prelude::*;
    pub use weft_core_plugins::{
        AopConfig, AopPlugin, AspectRegistry, ComponentsPlugin, DefaultPlugins, MinimalPlugins,
        TracingConfig, TracingFormat, TracingPlugin,
    };
    pub use weft_system::prelude::*;
}

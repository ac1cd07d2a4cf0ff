//! The application host for weft.
//!
//! `weft_system` provides the primitives every weft application is assembled
//! from:
//!
//! - [`plugin`] - Plugin trait and plugin groups
//! - [`resource`] - Type-keyed shared state
//! - [`application`] - Plugin lifecycle orchestration
//!
//! # Example
//!
//! ```
//! use weft_system::application::Application;
//! use weft_system::plugin::Plugin;
//!
//! struct Greeting(&'static str);
//!
//! struct GreetingPlugin;
//!
//! impl Plugin for GreetingPlugin {
//!     fn build(&self, app: &mut Application) {
//!         app.insert_resource(Greeting("hello"));
//!     }
//! }
//!
//! let mut app = Application::new();
//! app.add_plugins(GreetingPlugin);
//! app.finish();
//!
//! assert_eq!(app.get_resource::<Greeting>().unwrap().0, "hello");
//! ```

/// Application runtime for plugin orchestration.
pub mod application;

/// Plugin trait for extensible functionality.
pub mod plugin;

/// Type-keyed resource storage.
pub mod resource;

/// Re-export all common types for easy access.
pub mod prelude {
    pub use crate::application::*;
    pub use crate::plugin::*;
    pub use crate::resource::*;
}

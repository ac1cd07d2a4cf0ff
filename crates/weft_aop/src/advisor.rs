//! Advisors: the objects that own advice methods.
//!
//! An [`Advisor`] plays the part of an aspect instance. Each of its advice
//! methods is a closure taking the join point it is bound to. Whether that
//! closure takes a plain [`JoinPoint`] or a [`ProceedingJoinPoint`] decides
//! which advice locations it may be used for.

use crate::error::InvocationError;
use crate::join_point::{JoinPoint, ProceedingJoinPoint};
use indexmap::IndexMap;
use serde_json::Value;
use std::sync::Arc;

/// Advice that observes a call without controlling it.
pub type PlainAdvice =
    Arc<dyn Fn(&mut dyn JoinPoint) -> Result<Value, InvocationError> + Send + Sync>;

/// Advice that controls whether and how the call proceeds.
pub type ProceedingAdvice =
    Arc<dyn Fn(&mut ProceedingJoinPoint) -> Result<Value, InvocationError> + Send + Sync>;

/// The callable body of an advice method.
#[derive(Clone)]
pub enum AdviceFn {
    /// Usable for before and after advice.
    Plain(PlainAdvice),
    /// Usable for around advice.
    Proceeding(ProceedingAdvice),
}

impl AdviceFn {
    /// Returns `true` for [`AdviceFn::Proceeding`].
    #[must_use]
    pub fn is_proceeding(&self) -> bool {
        matches!(self, Self::Proceeding(_))
    }
}

/// A named advice method of an [`Advisor`].
#[derive(Clone)]
pub struct AdviceMethod {
    name: String,
    handler: AdviceFn,
}

impl core::fmt::Debug for AdviceMethod {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("AdviceMethod")
            .field("name", &self.name)
            .field("proceeding", &self.handler.is_proceeding())
            .finish()
    }
}

impl PartialEq for AdviceMethod {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.handler.is_proceeding() == other.handler.is_proceeding()
    }
}

impl Eq for AdviceMethod {}

impl AdviceMethod {
    /// Creates a method with a plain handler.
    pub fn plain<F>(name: impl Into<String>, handler: F) -> Self
    where
        F: Fn(&mut dyn JoinPoint) -> Result<Value, InvocationError> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            handler: AdviceFn::Plain(Arc::new(handler)),
        }
    }

    /// Creates a method with a proceeding handler.
    pub fn proceeding<F>(name: impl Into<String>, handler: F) -> Self
    where
        F: Fn(&mut ProceedingJoinPoint) -> Result<Value, InvocationError> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            handler: AdviceFn::Proceeding(Arc::new(handler)),
        }
    }

    /// Method name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The callable body.
    #[must_use]
    pub fn handler(&self) -> &AdviceFn {
        &self.handler
    }
}

/// An aspect instance: a type name plus a table of advice methods.
///
/// # Example
///
/// ```
/// use serde_json::Value;
/// use weft_aop::advisor::Advisor;
///
/// let advisor = Advisor::new("com.example.TimingAspect")
///     .with_advice("log", |_jp| Ok(Value::Null))
///     .with_around("time", |pjp| pjp.proceed());
///
/// assert_eq!(advisor.default_aspect_name(), "timingAspect");
/// assert!(advisor.method("time").unwrap().handler().is_proceeding());
/// ```
#[derive(Clone)]
pub struct Advisor {
    type_name: String,
    methods: IndexMap<String, AdviceMethod>,
}

impl core::fmt::Debug for Advisor {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Advisor")
            .field("type_name", &self.type_name)
            .field("methods", &self.methods.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl Advisor {
    /// Creates an advisor with no advice methods.
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            methods: IndexMap::new(),
        }
    }

    /// Adds a plain advice method.
    #[must_use]
    pub fn with_advice<F>(self, name: impl Into<String>, handler: F) -> Self
    where
        F: Fn(&mut dyn JoinPoint) -> Result<Value, InvocationError> + Send + Sync + 'static,
    {
        self.with_method(AdviceMethod::plain(name, handler))
    }

    /// Adds a proceeding advice method.
    #[must_use]
    pub fn with_around<F>(self, name: impl Into<String>, handler: F) -> Self
    where
        F: Fn(&mut ProceedingJoinPoint) -> Result<Value, InvocationError> + Send + Sync + 'static,
    {
        self.with_method(AdviceMethod::proceeding(name, handler))
    }

    /// Adds a prebuilt advice method, replacing one with the same name.
    #[must_use]
    pub fn with_method(mut self, method: AdviceMethod) -> Self {
        self.methods.insert(method.name.clone(), method);
        self
    }

    /// Fully qualified type name.
    #[must_use]
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Looks up an advice method by name.
    #[must_use]
    pub fn method(&self, name: &str) -> Option<&AdviceMethod> {
        self.methods.get(name)
    }

    /// Advice method names, in insertion order.
    #[must_use]
    pub fn method_names(&self) -> Vec<&str> {
        self.methods.keys().map(String::as_str).collect()
    }

    /// The type's simple name with its first letter lowercased.
    #[must_use]
    pub fn default_aspect_name(&self) -> String {
        let tail = self.type_name.rsplit("::").next().unwrap_or(&self.type_name);
        let simple = tail.rsplit('.').next().unwrap_or(tail);
        let mut chars = simple.chars();
        match chars.next() {
            Some(first) => first.to_lowercase().chain(chars).collect(),
            None => String::new(),
        }
    }
}

/// Advisors addressable by type name.
///
/// Declarative aspect records name their advisor by type; this catalog is
/// where those names resolve.
#[derive(Debug, Default, Clone)]
pub struct AdvisorCatalog {
    advisors: IndexMap<String, Arc<Advisor>>,
}

impl AdvisorCatalog {
    /// Creates an empty catalog.
    #[must_use]
    pub fn new() -> Self {
        Self {
            advisors: IndexMap::new(),
        }
    }

    /// Registers an advisor under its type name.
    ///
    /// # Panics
    ///
    /// Panics if an advisor with the same type name is already registered.
    pub fn register(&mut self, advisor: Arc<Advisor>) {
        let name = advisor.type_name().to_string();
        assert!(
            !self.advisors.contains_key(&name),
            "Advisor '{name}' is already registered"
        );
        self.advisors.insert(name, advisor);
    }

    /// Returns the advisor registered under `type_name`.
    #[must_use]
    pub fn get(&self, type_name: &str) -> Option<Arc<Advisor>> {
        self.advisors.get(type_name).cloned()
    }

    /// Returns the number of registered advisors.
    #[must_use]
    pub fn len(&self) -> usize {
        self.advisors.len()
    }

    /// Returns `true` if the catalog is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.advisors.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_name_is_lower_camel_simple_name() {
        assert_eq!(
            Advisor::new("org.app.LoggingAspect").default_aspect_name(),
            "loggingAspect"
        );
        assert_eq!(
            Advisor::new("app::aspects::Audit").default_aspect_name(),
            "audit"
        );
        assert_eq!(Advisor::new("X").default_aspect_name(), "x");
    }

    #[test]
    fn with_method_replaces_same_name() {
        let advisor = Advisor::new("a.B")
            .with_advice("run", |_jp| Ok(Value::Null))
            .with_around("run", |pjp| pjp.proceed());

        assert_eq!(advisor.method_names(), vec!["run"]);
        assert!(advisor.method("run").unwrap().handler().is_proceeding());
    }

    #[test]
    #[should_panic(expected = "already registered")]
    fn catalog_rejects_duplicates() {
        let mut catalog = AdvisorCatalog::new();
        catalog.register(Arc::new(Advisor::new("a.B")));
        catalog.register(Arc::new(Advisor::new("a.B")));
    }
}

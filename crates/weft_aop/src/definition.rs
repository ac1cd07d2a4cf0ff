//! The normalized aspect model.
//!
//! Every declaration source is turned into [`AspectDefinition`]s before the
//! pointcut builder sees it. Definitions are immutable once built.

use crate::advisor::{AdviceMethod, Advisor};
use crate::meta::TypeDescriptor;
use core::fmt;
use core::str::FromStr;
use std::sync::Arc;

/// Default precedence: the lowest priority.
pub const DEFAULT_ORDER: i32 = i32::MAX;

// ─────────────────────────────────────────────────────────────────────────────
// AdviceLocation / PointcutKind
// ─────────────────────────────────────────────────────────────────────────────

/// Where advice runs relative to the advised call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AdviceLocation {
    /// Before the call.
    Before,
    /// After the call returns.
    After,
    /// In place of the call, deciding whether to proceed.
    Around,
}

impl AdviceLocation {
    /// Lowercase name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Before => "before",
            Self::After => "after",
            Self::Around => "around",
        }
    }
}

impl fmt::Display for AdviceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AdviceLocation {
    type Err = String;

    /// Case-insensitive.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "before" => Ok(Self::Before),
            "after" => Ok(Self::After),
            "around" => Ok(Self::Around),
            _ => Err(s.to_string()),
        }
    }
}

/// How an advice's selectors pick components.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PointcutKind {
    /// Selectors name components, optionally with a method pattern.
    Beans,
    /// Selectors are type-name prefixes, or `*`.
    Within,
}

impl PointcutKind {
    /// Lowercase name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Beans => "beans",
            Self::Within => "within",
        }
    }
}

impl fmt::Display for PointcutKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PointcutKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "beans" => Ok(Self::Beans),
            "within" => Ok(Self::Within),
            _ => Err(s.to_string()),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// AdviceDefinition
// ─────────────────────────────────────────────────────────────────────────────

/// Predicate over a component's declared type. A component whose type is
/// rejected receives no join points from the advice.
pub type Qualifier = Arc<dyn Fn(&TypeDescriptor) -> bool + Send + Sync>;

/// One unit of advice: a method, where it runs, and what it applies to.
#[derive(Clone)]
pub struct AdviceDefinition {
    method: AdviceMethod,
    location: AdviceLocation,
    pointcut_kind: PointcutKind,
    selectors: Vec<String>,
    order: i32,
    qualifier: Option<Qualifier>,
}

impl fmt::Debug for AdviceDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdviceDefinition")
            .field("method", &self.method.name())
            .field("location", &self.location)
            .field("pointcut_kind", &self.pointcut_kind)
            .field("selectors", &self.selectors)
            .field("order", &self.order)
            .field("qualified", &self.qualifier.is_some())
            .finish()
    }
}

impl AdviceDefinition {
    /// Creates advice with the default order and no qualifier.
    pub fn new<I, S>(
        method: AdviceMethod,
        location: AdviceLocation,
        pointcut_kind: PointcutKind,
        selectors: I,
    ) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            method,
            location,
            pointcut_kind,
            selectors: selectors.into_iter().map(Into::into).collect(),
            order: DEFAULT_ORDER,
            qualifier: None,
        }
    }

    /// Sets the precedence. Lower runs first.
    #[must_use]
    pub fn with_order(mut self, order: i32) -> Self {
        self.order = order;
        self
    }

    /// Restricts the advice to component types accepted by `qualifier`.
    #[must_use]
    pub fn with_qualifier<F>(mut self, qualifier: F) -> Self
    where
        F: Fn(&TypeDescriptor) -> bool + Send + Sync + 'static,
    {
        self.qualifier = Some(Arc::new(qualifier));
        self
    }

    /// Copy of this advice with a different pointcut.
    ///
    /// Method, location, order, and qualifier are shared with `self`.
    #[must_use]
    pub fn with_pointcut<I, S>(&self, kind: PointcutKind, selectors: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            pointcut_kind: kind,
            selectors: selectors.into_iter().map(Into::into).collect(),
            ..self.clone()
        }
    }

    /// The advice method.
    #[must_use]
    pub fn method(&self) -> &AdviceMethod {
        &self.method
    }

    /// Where the advice runs.
    #[must_use]
    pub fn location(&self) -> AdviceLocation {
        self.location
    }

    /// How selectors are interpreted.
    #[must_use]
    pub fn pointcut_kind(&self) -> PointcutKind {
        self.pointcut_kind
    }

    /// Raw selector strings.
    #[must_use]
    pub fn selectors(&self) -> &[String] {
        &self.selectors
    }

    /// Precedence.
    #[must_use]
    pub fn order(&self) -> i32 {
        self.order
    }

    /// Returns `true` if the advice has a qualifier.
    #[must_use]
    pub fn is_qualified(&self) -> bool {
        self.qualifier.is_some()
    }

    /// Applies the qualifier; unqualified advice accepts every type.
    #[must_use]
    pub fn qualifies(&self, ty: &TypeDescriptor) -> bool {
        self.qualifier.as_ref().is_none_or(|qualifier| qualifier(ty))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// AspectDefinition
// ─────────────────────────────────────────────────────────────────────────────

/// A named source of advice: the advisor plus its ordered advice list.
#[derive(Debug, Clone)]
pub struct AspectDefinition {
    advisor: Arc<Advisor>,
    name: String,
    advice: Vec<AdviceDefinition>,
}

impl AspectDefinition {
    /// Creates an aspect with no advice.
    pub fn new(advisor: Arc<Advisor>, name: impl Into<String>) -> Self {
        Self {
            advisor,
            name: name.into(),
            advice: Vec::new(),
        }
    }

    /// Appends advice.
    #[must_use]
    pub fn with_advice(mut self, advice: AdviceDefinition) -> Self {
        self.advice.push(advice);
        self
    }

    /// Appends advice in place.
    pub fn push_advice(&mut self, advice: AdviceDefinition) {
        self.advice.push(advice);
    }

    /// The advice owner.
    #[must_use]
    pub fn advisor(&self) -> &Arc<Advisor> {
        &self.advisor
    }

    /// Aspect name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Advice, in declaration order.
    #[must_use]
    pub fn advice(&self) -> &[AdviceDefinition] {
        &self.advice
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::advisor::AdviceMethod;
    use serde_json::Value;

    fn log_method() -> AdviceMethod {
        AdviceMethod::plain("log", |_jp| Ok(Value::Null))
    }

    #[test]
    fn location_parses_case_insensitively() {
        assert_eq!("BEFORE".parse::<AdviceLocation>(), Ok(AdviceLocation::Before));
        assert_eq!("After".parse::<AdviceLocation>(), Ok(AdviceLocation::After));
        assert_eq!(" around ".parse::<AdviceLocation>(), Ok(AdviceLocation::Around));
        assert_eq!(
            "during".parse::<AdviceLocation>(),
            Err("during".to_string())
        );
    }

    #[test]
    fn pointcut_kind_parses_case_insensitively() {
        assert_eq!("Beans".parse::<PointcutKind>(), Ok(PointcutKind::Beans));
        assert_eq!("WITHIN".parse::<PointcutKind>(), Ok(PointcutKind::Within));
        assert!("execution".parse::<PointcutKind>().is_err());
    }

    #[test]
    fn with_pointcut_keeps_everything_else() {
        let original = AdviceDefinition::new(
            log_method(),
            AdviceLocation::After,
            PointcutKind::Beans,
            ["fooBean"],
        )
        .with_order(3)
        .with_qualifier(|ty| ty.name.starts_with("app"));

        let copy = original.with_pointcut(PointcutKind::Within, ["app.service"]);

        assert_eq!(copy.method(), original.method());
        assert_eq!(copy.location(), AdviceLocation::After);
        assert_eq!(copy.order(), 3);
        assert!(copy.is_qualified());
        assert_eq!(copy.pointcut_kind(), PointcutKind::Within);
        assert_eq!(copy.selectors(), ["app.service"]);
        assert_eq!(original.selectors(), ["fooBean"]);
    }

    #[test]
    fn unqualified_advice_accepts_any_type() {
        let advice = AdviceDefinition::new(
            log_method(),
            AdviceLocation::Before,
            PointcutKind::Within,
            ["*"],
        );
        assert_eq!(advice.order(), DEFAULT_ORDER);
        assert!(advice.qualifies(&TypeDescriptor::new("anything.At.All")));
    }

    #[test]
    fn qualifier_filters_types() {
        let advice = AdviceDefinition::new(
            log_method(),
            AdviceLocation::Before,
            PointcutKind::Within,
            ["*"],
        )
        .with_qualifier(|ty| ty.simple_name() == "Foo");

        assert!(advice.qualifies(&TypeDescriptor::new("app.Foo")));
        assert!(!advice.qualifies(&TypeDescriptor::new("app.Bar")));
    }
}

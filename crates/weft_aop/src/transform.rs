//! Turns aspect declarations into [`AspectDefinition`]s.
//!
//! Two declaration sources exist:
//!
//! - [`AspectDeclaration`]: advice declared in code next to the advisor,
//!   the way annotations would declare it on an aspect type.
//! - [`AspectConfig`]: declarative records loaded from JSON, naming their
//!   advisor by type through an [`AdvisorCatalog`].

use crate::advisor::{AdviceMethod, Advisor, AdvisorCatalog};
use crate::definition::{AdviceDefinition, AdviceLocation, AspectDefinition, DEFAULT_ORDER, PointcutKind};
use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

// ─────────────────────────────────────────────────────────────────────────────
// AspectDeclaration
// ─────────────────────────────────────────────────────────────────────────────

/// One advice method's declaration: where it runs and what it selects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdviceAnnotation {
    method: String,
    location: AdviceLocation,
    beans: Option<Vec<String>>,
    within: Option<Vec<String>>,
    order: i32,
}

impl AdviceAnnotation {
    /// Declares `method` as advice at `location`, with no selectors yet.
    pub fn new(method: impl Into<String>, location: AdviceLocation) -> Self {
        Self {
            method: method.into(),
            location,
            beans: None,
            within: None,
            order: DEFAULT_ORDER,
        }
    }

    /// Declares before advice.
    pub fn before(method: impl Into<String>) -> Self {
        Self::new(method, AdviceLocation::Before)
    }

    /// Declares after advice.
    pub fn after(method: impl Into<String>) -> Self {
        Self::new(method, AdviceLocation::After)
    }

    /// Declares around advice.
    pub fn around(method: impl Into<String>) -> Self {
        Self::new(method, AdviceLocation::Around)
    }

    /// Sets the `beans` selectors.
    #[must_use]
    pub fn beans<I, S>(mut self, selectors: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.beans = Some(selectors.into_iter().map(Into::into).collect());
        self
    }

    /// Sets the `within` selectors.
    #[must_use]
    pub fn within<I, S>(mut self, selectors: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.within = Some(selectors.into_iter().map(Into::into).collect());
        self
    }

    /// Sets the precedence.
    #[must_use]
    pub fn order(mut self, order: i32) -> Self {
        self.order = order;
        self
    }
}

/// An aspect declared in code: an advisor plus its advice declarations.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use serde_json::Value;
/// use weft_aop::advisor::Advisor;
/// use weft_aop::transform::{AdviceAnnotation, AspectDeclaration, AspectTransformer, GenericAspectTransformer};
///
/// let advisor = Arc::new(Advisor::new("app.AuditAspect").with_advice("audit", |_jp| Ok(Value::Null)));
/// let declaration = AspectDeclaration::new(advisor)
///     .with_advice(AdviceAnnotation::after("audit").beans(["fooBean"]).within(["app.dao"]));
///
/// let aspect = GenericAspectTransformer::new().transform(&declaration).unwrap();
/// assert_eq!(aspect.name(), "auditAspect");
/// assert_eq!(aspect.advice().len(), 2);
/// ```
#[derive(Debug, Clone)]
pub struct AspectDeclaration {
    advisor: Arc<Advisor>,
    name: Option<String>,
    advice: Vec<AdviceAnnotation>,
}

impl AspectDeclaration {
    /// Creates a declaration with no advice, named after the advisor type.
    #[must_use]
    pub fn new(advisor: Arc<Advisor>) -> Self {
        Self {
            advisor,
            name: None,
            advice: Vec::new(),
        }
    }

    /// Gives the aspect an explicit name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Adds an advice declaration.
    #[must_use]
    pub fn with_advice(mut self, advice: AdviceAnnotation) -> Self {
        self.advice.push(advice);
        self
    }

    /// The advisor.
    #[must_use]
    pub fn advisor(&self) -> &Arc<Advisor> {
        &self.advisor
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// AspectConfig
// ─────────────────────────────────────────────────────────────────────────────

/// Declarative aspect record.
///
/// ```json
/// {
///   "id": "loggingAspect",
///   "class": "app.LoggingAspect",
///   "advice": [
///     { "id": "log", "type": "before", "pointcut": "beans", "value": "fooBean, barBean.run()", "order": 1 }
///   ]
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AspectConfig {
    /// Aspect name.
    pub id: String,
    /// Advisor type name, resolved through an [`AdvisorCatalog`].
    pub class: String,
    /// Advice entries.
    #[serde(default)]
    pub advice: Vec<AdviceConfig>,
}

/// One advice entry of an [`AspectConfig`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdviceConfig {
    /// Advice method name.
    pub id: String,
    /// `before`, `after`, or `around`, in any case.
    #[serde(rename = "type")]
    pub location: String,
    /// `beans` or `within`, in any case.
    pub pointcut: String,
    /// Comma separated selectors.
    pub value: String,
    /// Precedence.
    #[serde(default = "default_order")]
    pub order: i32,
}

fn default_order() -> i32 {
    DEFAULT_ORDER
}

impl AdviceConfig {
    /// The selectors in `value`, trimmed, empty entries removed.
    #[must_use]
    pub fn separated_values(&self) -> Vec<String> {
        self.value
            .split(',')
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(String::from)
            .collect()
    }
}

impl AspectConfig {
    /// Parses a JSON array of aspect records.
    ///
    /// # Errors
    ///
    /// [`ConfigError::Parse`] if the document is not a valid record list.
    pub fn from_json(json: &str) -> Result<Vec<Self>, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// AspectTransformer
// ─────────────────────────────────────────────────────────────────────────────

/// Normalizes declarations into [`AspectDefinition`]s.
pub trait AspectTransformer: Send + Sync {
    /// Transforms a code declaration.
    ///
    /// # Errors
    ///
    /// [`ConfigError`] if an advice method is missing or has the wrong kind
    /// for its location.
    fn transform(&self, declaration: &AspectDeclaration) -> Result<AspectDefinition, ConfigError>;

    /// Transforms a declarative record, resolving its advisor in `catalog`.
    ///
    /// # Errors
    ///
    /// [`ConfigError`] for an unknown advisor type, advice method, location,
    /// or pointcut kind. An advice entry with no pointcut values is a
    /// [`ConfigError::InvalidDeclaration`].
    fn transform_config(
        &self,
        config: &AspectConfig,
        catalog: &AdvisorCatalog,
    ) -> Result<AspectDefinition, ConfigError>;
}

/// Default [`AspectTransformer`].
#[derive(Debug, Default, Clone, Copy)]
pub struct GenericAspectTransformer;

impl GenericAspectTransformer {
    /// Creates a transformer.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

fn advice_method(
    advisor: &Advisor,
    aspect: &str,
    method: &str,
    location: AdviceLocation,
) -> Result<AdviceMethod, ConfigError> {
    let found = advisor
        .method(method)
        .ok_or_else(|| ConfigError::AdviceMethodNotFound {
            method: method.to_string(),
            aspect: aspect.to_string(),
        })?;
    let proceeding = found.handler().is_proceeding();
    if proceeding != (location == AdviceLocation::Around) {
        return Err(ConfigError::AdviceSignatureMismatch {
            method: method.to_string(),
            aspect: aspect.to_string(),
            location: location.to_string(),
        });
    }
    Ok(found.clone())
}

const LOCATION_ORDER: [AdviceLocation; 3] = [
    AdviceLocation::Before,
    AdviceLocation::After,
    AdviceLocation::Around,
];

impl AspectTransformer for GenericAspectTransformer {
    fn transform(&self, declaration: &AspectDeclaration) -> Result<AspectDefinition, ConfigError> {
        let advisor = &declaration.advisor;
        let name = declaration
            .name
            .clone()
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| advisor.default_aspect_name());
        let mut aspect = AspectDefinition::new(Arc::clone(advisor), name);

        for location in LOCATION_ORDER {
            for annotation in declaration
                .advice
                .iter()
                .filter(|annotation| annotation.location == location)
            {
                let method = advice_method(advisor, aspect.name(), &annotation.method, location)?;
                match (&annotation.beans, &annotation.within) {
                    (Some(beans), Some(within)) => {
                        let first = AdviceDefinition::new(method, location, PointcutKind::Beans, beans.iter().cloned())
                            .with_order(annotation.order);
                        let second = first.with_pointcut(PointcutKind::Within, within.iter().cloned());
                        aspect.push_advice(first);
                        aspect.push_advice(second);
                    }
                    (Some(beans), None) => aspect.push_advice(
                        AdviceDefinition::new(method, location, PointcutKind::Beans, beans.iter().cloned())
                            .with_order(annotation.order),
                    ),
                    (None, Some(within)) => aspect.push_advice(
                        AdviceDefinition::new(method, location, PointcutKind::Within, within.iter().cloned())
                            .with_order(annotation.order),
                    ),
                    (None, None) => {
                        tracing::debug!(
                            aspect = aspect.name(),
                            method = %annotation.method,
                            "advice declares no selectors, dropped"
                        );
                    }
                }
            }
        }

        Ok(aspect)
    }

    fn transform_config(
        &self,
        config: &AspectConfig,
        catalog: &AdvisorCatalog,
    ) -> Result<AspectDefinition, ConfigError> {
        let advisor = catalog
            .get(&config.class)
            .ok_or_else(|| ConfigError::UnknownAspectType(config.class.clone()))?;
        let mut aspect = AspectDefinition::new(Arc::clone(&advisor), config.id.clone());

        for entry in &config.advice {
            let location: AdviceLocation =
                entry
                    .location
                    .parse()
                    .map_err(|location| ConfigError::UnknownAdviceLocation {
                        location,
                        aspect: config.id.clone(),
                    })?;
            let kind: PointcutKind =
                entry
                    .pointcut
                    .parse()
                    .map_err(|kind| ConfigError::UnknownPointcutKind {
                        kind,
                        aspect: config.id.clone(),
                    })?;
            let selectors = entry.separated_values();
            if selectors.is_empty() {
                return Err(ConfigError::invalid_declaration(format!(
                    "advice '{}' in aspect '{}' has no pointcut values",
                    entry.id, config.id
                )));
            }
            let method = advice_method(&advisor, &config.id, &entry.id, location)?;
            aspect.push_advice(
                AdviceDefinition::new(method, location, kind, selectors).with_order(entry.order),
            );
        }

        Ok(aspect)
    }
}

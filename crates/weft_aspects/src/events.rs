//! Framework events published after marked methods return.

use indexmap::IndexMap;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use weft_aop::advisor::{AdviceMethod, Advisor};
use weft_aop::definition::{AdviceDefinition, AdviceLocation, AspectDefinition, PointcutKind};
use weft_aop::error::InvocationError;
use weft_aop::join_point::JoinPoint;
use weft_aop::meta::MethodMarker;

/// Advisor type of the events aspect.
pub const EVENTS_ASPECT_TYPE: &str = "weft.aspects.EventsAspect";

/// Name of the events aspect.
pub const EVENTS_ASPECT_NAME: &str = "eventsAspect";

/// An event raised by a component method.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameworkEvent {
    /// Event name.
    pub name: String,
    /// Name of the component that raised the event.
    pub bean: String,
    /// Published arguments, by payload key.
    #[serde(default)]
    pub payload: IndexMap<String, Value>,
}

impl FrameworkEvent {
    /// Creates an event with an empty payload.
    pub fn new(name: impl Into<String>, bean: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            bean: bean.into(),
            payload: IndexMap::new(),
        }
    }

    /// Adds a payload entry.
    #[must_use]
    pub fn with_payload(mut self, key: impl Into<String>, value: Value) -> Self {
        self.payload.insert(key.into(), value);
        self
    }
}

/// Callback registered with an [`EventBus`].
pub type EventListener = Arc<dyn Fn(&FrameworkEvent) + Send + Sync>;

/// Synchronous fan-out of [`FrameworkEvent`]s.
///
/// Listeners run on the publishing thread, in subscription order.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use std::sync::atomic::{AtomicUsize, Ordering};
/// use weft_aspects::events::{EventBus, FrameworkEvent};
///
/// let bus = EventBus::new();
/// let seen = Arc::new(AtomicUsize::new(0));
/// let counter = Arc::clone(&seen);
/// bus.subscribe(move |_event| {
///     counter.fetch_add(1, Ordering::SeqCst);
/// });
///
/// bus.publish(&FrameworkEvent::new("saved", "userService"));
/// assert_eq!(seen.load(Ordering::SeqCst), 1);
/// ```
#[derive(Default)]
pub struct EventBus {
    listeners: RwLock<Vec<EventListener>>,
}

impl core::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("EventBus")
            .field("listeners", &self.listener_count())
            .finish()
    }
}

impl EventBus {
    /// Creates a bus with no listeners.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a listener.
    pub fn subscribe<F>(&self, listener: F)
    where
        F: Fn(&FrameworkEvent) + Send + Sync + 'static,
    {
        self.listeners.write().push(Arc::new(listener));
    }

    /// Delivers `event` to every listener and returns how many were called.
    ///
    /// Listeners may subscribe further listeners; those see later events only.
    pub fn publish(&self, event: &FrameworkEvent) -> usize {
        let listeners = self.listeners.read().clone();
        for listener in &listeners {
            listener(event);
        }
        tracing::debug!(
            event = %event.name,
            bean = %event.bean,
            listeners = listeners.len(),
            "published framework event"
        );
        listeners.len()
    }

    /// Number of registered listeners.
    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.listeners.read().len()
    }
}

fn publish_event(jp: &mut dyn JoinPoint) -> Result<Value, InvocationError> {
    let Some(method) = jp.method() else {
        return Ok(Value::Null);
    };
    let Some(MethodMarker::Event { name, payload }) =
        method.marker(|marker| matches!(marker, MethodMarker::Event { .. }))
    else {
        return Ok(Value::Null);
    };

    let name = name
        .as_deref()
        .filter(|name| !name.is_empty())
        .unwrap_or(method.name.as_str());
    let mut event = FrameworkEvent::new(name, jp.bean_name());
    for (index, key) in payload {
        match jp.arguments().get(*index) {
            Some(value) => {
                event.payload.insert(key.clone(), value.clone());
            }
            None => tracing::warn!(
                event = %event.name,
                index,
                "payload parameter out of range"
            ),
        }
    }

    match jp.context().service::<EventBus>() {
        Some(bus) => {
            bus.publish(&event);
        }
        None => tracing::warn!(event = %event.name, "no event bus installed, event dropped"),
    }
    Ok(Value::Null)
}

/// The events advisor: after advice `publishEvent`.
#[must_use]
pub fn events_advisor() -> Arc<Advisor> {
    Arc::new(Advisor::new(EVENTS_ASPECT_TYPE).with_advice("publishEvent", publish_event))
}

/// The events aspect, applied to every component that declares an event
/// method.
#[must_use]
pub fn events_aspect() -> AspectDefinition {
    let publish = AdviceMethod::plain("publishEvent", publish_event);
    let advisor = Arc::new(Advisor::new(EVENTS_ASPECT_TYPE).with_method(publish.clone()));
    AspectDefinition::new(advisor, EVENTS_ASPECT_NAME).with_advice(
        AdviceDefinition::new(publish, AdviceLocation::After, PointcutKind::Within, ["*"])
            .with_qualifier(|ty| {
                ty.has_method_marker(|marker| matches!(marker, MethodMarker::Event { .. }))
            }),
    )
}

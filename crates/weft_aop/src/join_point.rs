//! Join points: advice bound to a component, and optionally to one method.
//!
//! A [`BasicJoinPoint`] carries before or after advice. A
//! [`ProceedingJoinPoint`] carries around advice and links to the next
//! proceeding join point of its chain; the last link proceeds to the real
//! target method.

use crate::advisor::{AdviceFn, AdviceMethod, Advisor};
use crate::component::Component;
use crate::context::AopContext;
use crate::definition::{AdviceLocation, DEFAULT_ORDER};
use crate::error::InvocationError;
use crate::meta::MethodDescriptor;
use core::hash::{Hash, Hasher};
use serde_json::Value;
use std::sync::Arc;

fn same_instance<T: ?Sized>(a: Option<&Arc<T>>, b: Option<&Arc<T>>) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => core::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b)),
        (None, None) => true,
        _ => false,
    }
}

fn instance_address<T: ?Sized>(instance: Option<&Arc<T>>) -> usize {
    instance.map_or(0, |arc| Arc::as_ptr(arc).cast::<()>() as usize)
}

// ─────────────────────────────────────────────────────────────────────────────
// JoinPointState
// ─────────────────────────────────────────────────────────────────────────────

/// Everything a join point knows about the call it advises.
///
/// Built once per resolved selector by the pointcut builder and cloned for
/// every intercepted call.
#[derive(Debug, Clone)]
pub struct JoinPointState {
    target: Option<Arc<dyn Component>>,
    method: Option<MethodDescriptor>,
    arguments: Vec<Value>,
    bean_name: String,
    class_scope: bool,
    location: AdviceLocation,
    order: i32,
    advisor: Option<Arc<Advisor>>,
    advice: Option<AdviceMethod>,
    context: Arc<AopContext>,
}

impl JoinPointState {
    /// Creates an unbound state for advice at `location`.
    #[must_use]
    pub fn new(context: Arc<AopContext>, location: AdviceLocation) -> Self {
        Self {
            target: None,
            method: None,
            arguments: Vec::new(),
            bean_name: String::new(),
            class_scope: false,
            location,
            order: DEFAULT_ORDER,
            advisor: None,
            advice: None,
            context,
        }
    }

    /// Sets the advised instance.
    #[must_use]
    pub fn with_target(mut self, target: Arc<dyn Component>) -> Self {
        self.target = Some(target);
        self
    }

    /// Sets the advised component name.
    #[must_use]
    pub fn with_bean_name(mut self, bean_name: impl Into<String>) -> Self {
        self.bean_name = bean_name.into();
        self
    }

    /// Sets the advised method.
    #[must_use]
    pub fn with_method(mut self, method: MethodDescriptor) -> Self {
        self.method = Some(method);
        self
    }

    /// Sets whether the advice covers every method of the component.
    #[must_use]
    pub fn with_class_scope(mut self, class_scope: bool) -> Self {
        self.class_scope = class_scope;
        self
    }

    /// Sets the precedence.
    #[must_use]
    pub fn with_order(mut self, order: i32) -> Self {
        self.order = order;
        self
    }

    /// Sets the advice owner and the advice method to run.
    #[must_use]
    pub fn with_advice(mut self, advisor: Arc<Advisor>, advice: AdviceMethod) -> Self {
        self.advisor = Some(advisor);
        self.advice = Some(advice);
        self
    }

    fn handler(&self) -> Result<(String, AdviceFn), InvocationError> {
        if self.advisor.is_none() {
            return Err(InvocationError::MissingAdvisor);
        }
        let advice = self.advice.as_ref().ok_or(InvocationError::MissingAdvice)?;
        Ok((advice.name().to_string(), advice.handler().clone()))
    }
}

impl PartialEq for JoinPointState {
    fn eq(&self, other: &Self) -> bool {
        same_instance(self.target.as_ref(), other.target.as_ref())
            && self.method == other.method
            && self.arguments == other.arguments
            && self.bean_name == other.bean_name
            && self.class_scope == other.class_scope
            && same_instance(self.advisor.as_ref(), other.advisor.as_ref())
            && self.advice == other.advice
    }
}

impl Eq for JoinPointState {}

impl Hash for JoinPointState {
    fn hash<H: Hasher>(&self, state: &mut H) {
        instance_address(self.target.as_ref()).hash(state);
        self.method.hash(state);
        for argument in &self.arguments {
            argument.to_string().hash(state);
        }
        self.bean_name.hash(state);
        self.class_scope.hash(state);
        instance_address(self.advisor.as_ref()).hash(state);
        self.advice.as_ref().map(AdviceMethod::name).hash(state);
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// JoinPoint
// ─────────────────────────────────────────────────────────────────────────────

/// What advice sees of the call it is advising.
pub trait JoinPoint {
    /// The underlying state.
    fn state(&self) -> &JoinPointState;

    /// Binds the invoked method.
    fn set_method(&mut self, method: MethodDescriptor);

    /// Binds the call arguments.
    fn set_arguments(&mut self, arguments: Vec<Value>);

    /// Runs the advice method with this join point.
    ///
    /// # Errors
    ///
    /// [`InvocationError::MissingAdvisor`] or [`InvocationError::MissingAdvice`]
    /// if the join point is incomplete; otherwise whatever the advice returns.
    fn invoke(&mut self) -> Result<Value, InvocationError>;

    /// The advised instance.
    fn target(&self) -> Option<&Arc<dyn Component>> {
        self.state().target.as_ref()
    }

    /// The invoked method.
    fn method(&self) -> Option<&MethodDescriptor> {
        self.state().method.as_ref()
    }

    /// The call arguments.
    fn arguments(&self) -> &[Value] {
        &self.state().arguments
    }

    /// Name of the advised component.
    fn bean_name(&self) -> &str {
        &self.state().bean_name
    }

    /// `true` if the advice covers every method of the component.
    fn is_class_scope(&self) -> bool {
        self.state().class_scope
    }

    /// Where the advice runs.
    fn location(&self) -> AdviceLocation {
        self.state().location
    }

    /// Precedence.
    fn order(&self) -> i32 {
        self.state().order
    }

    /// The advice owner.
    fn advisor(&self) -> Option<&Arc<Advisor>> {
        self.state().advisor.as_ref()
    }

    /// The advice method.
    fn advice(&self) -> Option<&AdviceMethod> {
        self.state().advice.as_ref()
    }

    /// The weave context.
    fn context(&self) -> &Arc<AopContext> {
        &self.state().context
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// BasicJoinPoint
// ─────────────────────────────────────────────────────────────────────────────

/// Join point for before and after advice.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BasicJoinPoint {
    state: JoinPointState,
}

impl BasicJoinPoint {
    /// Wraps a state.
    #[must_use]
    pub fn new(state: JoinPointState) -> Self {
        Self { state }
    }
}

impl JoinPoint for BasicJoinPoint {
    fn state(&self) -> &JoinPointState {
        &self.state
    }

    fn set_method(&mut self, method: MethodDescriptor) {
        self.state.method = Some(method);
    }

    fn set_arguments(&mut self, arguments: Vec<Value>) {
        self.state.arguments = arguments;
    }

    fn invoke(&mut self) -> Result<Value, InvocationError> {
        match self.state.handler()? {
            (_, AdviceFn::Plain(advice)) => advice(self),
            (name, AdviceFn::Proceeding(_)) => Err(InvocationError::AdviceKindMismatch(name)),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// ProceedingJoinPoint
// ─────────────────────────────────────────────────────────────────────────────

/// Join point for around advice.
///
/// Links form an owned singly linked chain. Binding a method or arguments on
/// a link binds them on every link after it, so the whole chain observes the
/// same call.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use serde_json::json;
/// use weft_aop::advisor::{AdviceMethod, Advisor};
/// use weft_aop::context::AopContext;
/// use weft_aop::definition::AdviceLocation;
/// use weft_aop::join_point::{JoinPoint, JoinPointState, ProceedingJoinPoint};
///
/// let advice = AdviceMethod::proceeding("veto", |_pjp| Ok(json!("vetoed")));
/// let advisor = Arc::new(Advisor::new("app.Veto").with_method(advice.clone()));
/// let state = JoinPointState::new(Arc::new(AopContext::new()), AdviceLocation::Around)
///     .with_advice(advisor, advice);
///
/// let mut pjp = ProceedingJoinPoint::new(state);
/// assert_eq!(pjp.invoke().unwrap(), json!("vetoed"));
/// ```
#[derive(Debug, Clone)]
pub struct ProceedingJoinPoint {
    state: JoinPointState,
    next: Option<Box<ProceedingJoinPoint>>,
}

impl PartialEq for ProceedingJoinPoint {
    fn eq(&self, other: &Self) -> bool {
        self.state == other.state
    }
}

impl Eq for ProceedingJoinPoint {}

impl Hash for ProceedingJoinPoint {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.state.hash(state);
    }
}

impl ProceedingJoinPoint {
    /// Wraps a state, with no next link.
    #[must_use]
    pub fn new(state: JoinPointState) -> Self {
        Self { state, next: None }
    }

    /// The next link, or `None` if this link proceeds to the target.
    #[must_use]
    pub fn next(&self) -> Option<&ProceedingJoinPoint> {
        self.next.as_deref()
    }

    /// Replaces the next link.
    pub fn set_next(&mut self, next: Option<ProceedingJoinPoint>) {
        self.next = next.map(Box::new);
    }

    /// Number of links from this one to the end of the chain.
    #[must_use]
    pub fn chain_len(&self) -> usize {
        let mut len = 1;
        let mut link = self.next.as_deref();
        while let Some(next) = link {
            len += 1;
            link = next.next.as_deref();
        }
        len
    }

    /// Continues the call: runs the next link's advice, or the target method
    /// when this is the last link.
    ///
    /// # Errors
    ///
    /// [`InvocationError::TargetNotBound`] or [`InvocationError::MethodNotBound`]
    /// if the last link is unbound; otherwise whatever the advice or the target
    /// returns.
    pub fn proceed(&mut self) -> Result<Value, InvocationError> {
        if let Some(next) = self.next.as_deref_mut() {
            return next.invoke();
        }
        let target = self
            .state
            .target
            .as_ref()
            .ok_or(InvocationError::TargetNotBound)?;
        let method = self
            .state
            .method
            .as_ref()
            .ok_or(InvocationError::MethodNotBound)?;
        target.invoke(method, &self.state.arguments)
    }

    /// Rebinds the arguments, then proceeds.
    ///
    /// # Errors
    ///
    /// As [`proceed`](Self::proceed).
    pub fn proceed_with(&mut self, arguments: Vec<Value>) -> Result<Value, InvocationError> {
        self.set_arguments(arguments);
        self.proceed()
    }
}

impl JoinPoint for ProceedingJoinPoint {
    fn state(&self) -> &JoinPointState {
        &self.state
    }

    fn set_method(&mut self, method: MethodDescriptor) {
        let mut link = Some(self);
        while let Some(current) = link {
            current.state.method = Some(method.clone());
            link = current.next.as_deref_mut();
        }
    }

    fn set_arguments(&mut self, arguments: Vec<Value>) {
        let mut link = Some(self);
        while let Some(current) = link {
            current.state.arguments.clone_from(&arguments);
            link = current.next.as_deref_mut();
        }
    }

    fn invoke(&mut self) -> Result<Value, InvocationError> {
        match self.state.handler()? {
            (_, AdviceFn::Proceeding(advice)) => advice(self),
            (_, AdviceFn::Plain(advice)) => advice(self),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// BoundJoinPoint
// ─────────────────────────────────────────────────────────────────────────────

/// Either kind of join point, as stored in a pointcut.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum BoundJoinPoint {
    /// Before or after advice.
    Basic(BasicJoinPoint),
    /// Around advice.
    Proceeding(ProceedingJoinPoint),
}

impl BoundJoinPoint {
    /// Wraps `state` in the variant its location calls for.
    #[must_use]
    pub fn for_location(state: JoinPointState) -> Self {
        match state.location {
            AdviceLocation::Around => Self::Proceeding(ProceedingJoinPoint::new(state)),
            AdviceLocation::Before | AdviceLocation::After => {
                Self::Basic(BasicJoinPoint::new(state))
            }
        }
    }

    /// Returns the proceeding join point, if this is one.
    #[must_use]
    pub fn into_proceeding(self) -> Option<ProceedingJoinPoint> {
        match self {
            Self::Proceeding(pjp) => Some(pjp),
            Self::Basic(_) => None,
        }
    }
}

impl JoinPoint for BoundJoinPoint {
    fn state(&self) -> &JoinPointState {
        match self {
            Self::Basic(jp) => jp.state(),
            Self::Proceeding(pjp) => pjp.state(),
        }
    }

    fn set_method(&mut self, method: MethodDescriptor) {
        match self {
            Self::Basic(jp) => jp.set_method(method),
            Self::Proceeding(pjp) => pjp.set_method(method),
        }
    }

    fn set_arguments(&mut self, arguments: Vec<Value>) {
        match self {
            Self::Basic(jp) => jp.set_arguments(arguments),
            Self::Proceeding(pjp) => pjp.set_arguments(arguments),
        }
    }

    fn invoke(&mut self) -> Result<Value, InvocationError> {
        match self {
            Self::Basic(jp) => jp.invoke(),
            Self::Proceeding(pjp) => pjp.invoke(),
        }
    }
}

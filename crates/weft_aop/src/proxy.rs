//! Proxy dispatch: intercepting stand-ins that run a pointcut's advice.
//!
//! A proxy splits its pointcut into a before list, an after list, and an
//! around chain, then runs them on every call:
//!
//! 1. every applicable before advice
//! 2. the around chain head if it applies, otherwise the target itself
//! 3. every applicable after advice
//!
//! The value produced in step 2 is returned. A failure at any step ends the
//! call and is returned unchanged.

use crate::component::Component;
use crate::definition::AdviceLocation;
use crate::error::InvocationError;
use crate::join_point::{BoundJoinPoint, JoinPoint, ProceedingJoinPoint};
use crate::meta::{MethodDescriptor, TypeDescriptor};
use crate::pointcut::Pointcut;
use serde_json::Value;
use std::sync::Arc;

/// Returns `true` if the advice behind `join_point` should run for a call to
/// `method`.
///
/// Class-scoped join points apply to every method. Otherwise the bound
/// method's name and ordered parameter type names must equal the invoked
/// method's.
pub fn applies(join_point: &dyn JoinPoint, method: &MethodDescriptor) -> bool {
    if join_point.is_class_scope() {
        return true;
    }
    join_point
        .method()
        .is_some_and(|bound| bound.matches(&method.name, method.parameter_types.as_slice()))
}

// ─────────────────────────────────────────────────────────────────────────────
// ProxyKind
// ─────────────────────────────────────────────────────────────────────────────

/// How a proxy presents itself to callers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProxyKind {
    /// Stands in for the target's interfaces only.
    Interface {
        /// Interfaces the proxy implements.
        interfaces: Vec<String>,
    },
    /// A generated subtype of the target's concrete type.
    Subtype {
        /// The concrete type being extended.
        type_name: String,
    },
}

impl ProxyKind {
    /// Interface proxies are preferred; a subtype is generated when the type
    /// implements no interface or the caller needs the concrete type.
    #[must_use]
    pub fn select(ty: &TypeDescriptor, require_concrete: bool) -> Self {
        if !ty.interfaces.is_empty() && !require_concrete {
            Self::Interface {
                interfaces: ty.interfaces.clone(),
            }
        } else {
            Self::Subtype {
                type_name: ty.name.clone(),
            }
        }
    }

    fn describe(&self, target: &TypeDescriptor) -> TypeDescriptor {
        match self {
            Self::Interface { interfaces } => TypeDescriptor {
                name: format!("{}$$Proxy", target.name),
                supertype: None,
                interfaces: interfaces.clone(),
                methods: target.methods.clone(),
            },
            Self::Subtype { type_name } => TypeDescriptor {
                name: format!("{type_name}$$Advised"),
                supertype: Some(type_name.clone()),
                interfaces: target.interfaces.clone(),
                methods: target.methods.clone(),
            },
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// AdviceChain
// ─────────────────────────────────────────────────────────────────────────────

/// A pointcut partitioned for dispatch.
#[derive(Debug, Clone, Default)]
pub struct AdviceChain {
    before: Vec<BoundJoinPoint>,
    after: Vec<BoundJoinPoint>,
    around: Option<ProceedingJoinPoint>,
}

impl AdviceChain {
    /// Drains `pointcut` into before, after, and around advice.
    ///
    /// The around chain is linked so that its head is the advice with the
    /// lowest precedence value; each link proceeds to the next-lowest, and
    /// the last one proceeds to the target.
    pub fn from_pointcut(pointcut: &mut Pointcut) -> Self {
        let mut before = Vec::new();
        let mut after = Vec::new();
        let mut around = Vec::new();

        for join_point in pointcut.drain_ordered() {
            match join_point.location() {
                AdviceLocation::Before => before.push(join_point),
                AdviceLocation::After => after.push(join_point),
                AdviceLocation::Around => match join_point.into_proceeding() {
                    Some(pjp) => around.push(pjp),
                    None => tracing::warn!(
                        bean = pointcut.bean_name(),
                        "around advice without a proceeding join point ignored"
                    ),
                },
            }
        }

        let mut head: Option<ProceedingJoinPoint> = None;
        for mut link in around.into_iter().rev() {
            link.set_next(head.take());
            head = Some(link);
        }

        Self {
            before,
            after,
            around: head,
        }
    }

    /// Before advice, in precedence order.
    #[must_use]
    pub fn before(&self) -> &[BoundJoinPoint] {
        &self.before
    }

    /// After advice, in precedence order.
    #[must_use]
    pub fn after(&self) -> &[BoundJoinPoint] {
        &self.after
    }

    /// Head of the around chain.
    #[must_use]
    pub fn around(&self) -> Option<&ProceedingJoinPoint> {
        self.around.as_ref()
    }

    /// Runs the chain for one call to `target`.
    ///
    /// Join points are cloned before binding, so concurrent calls never share
    /// call state.
    ///
    /// # Errors
    ///
    /// The first failure raised by advice or by the target.
    pub fn dispatch(
        &self,
        target: &dyn Component,
        method: &MethodDescriptor,
        args: &[Value],
    ) -> Result<Value, InvocationError> {
        run_observers(&self.before, method, args)?;

        let result = match &self.around {
            Some(head) if applies(head, method) => {
                let mut head = head.clone();
                head.set_method(method.clone());
                head.set_arguments(args.to_vec());
                head.invoke()?
            }
            _ => target.invoke(method, args)?,
        };

        run_observers(&self.after, method, args)?;
        Ok(result)
    }
}

fn run_observers(
    join_points: &[BoundJoinPoint],
    method: &MethodDescriptor,
    args: &[Value],
) -> Result<(), InvocationError> {
    for join_point in join_points {
        if !applies(join_point, method) {
            continue;
        }
        let mut bound = join_point.clone();
        bound.set_method(method.clone());
        bound.set_arguments(args.to_vec());
        bound.invoke()?;
    }
    Ok(())
}

// ─────────────────────────────────────────────────────────────────────────────
// AdvisedProxy
// ─────────────────────────────────────────────────────────────────────────────

/// A component that routes every call through its advice chain.
pub struct AdvisedProxy {
    kind: ProxyKind,
    target: Arc<dyn Component>,
    pointcut: Pointcut,
    chain: AdviceChain,
    descriptor: Arc<TypeDescriptor>,
}

impl core::fmt::Debug for AdvisedProxy {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("AdvisedProxy")
            .field("kind", &self.kind)
            .field("bean", &self.pointcut.bean_name())
            .field("join_points", &self.pointcut.len())
            .finish_non_exhaustive()
    }
}

impl AdvisedProxy {
    /// Creates a proxy of `kind` around `target`.
    pub fn new(kind: ProxyKind, target: Arc<dyn Component>, pointcut: Pointcut) -> Self {
        let snapshot = pointcut.clone();
        let mut pointcut = pointcut;
        let chain = AdviceChain::from_pointcut(&mut pointcut);
        let descriptor = Arc::new(kind.describe(&target.type_descriptor()));
        tracing::debug!(
            bean = snapshot.bean_name(),
            proxy = %descriptor.name,
            before = chain.before.len(),
            after = chain.after.len(),
            around = chain.around.as_ref().map_or(0, ProceedingJoinPoint::chain_len),
            "created proxy"
        );
        Self {
            kind,
            target,
            pointcut: snapshot,
            chain,
            descriptor,
        }
    }

    /// Builds an equivalent proxy from the same target and pointcut.
    #[must_use]
    pub fn clone_proxy(&self) -> Self {
        Self::new(
            self.kind.clone(),
            Arc::clone(&self.target),
            self.pointcut.clone(),
        )
    }

    /// The proxy variant.
    #[must_use]
    pub fn kind(&self) -> &ProxyKind {
        &self.kind
    }

    /// The advised instance.
    #[must_use]
    pub fn target(&self) -> &Arc<dyn Component> {
        &self.target
    }

    /// The pointcut this proxy was built from.
    #[must_use]
    pub fn pointcut(&self) -> &Pointcut {
        &self.pointcut
    }

    /// The partitioned advice.
    #[must_use]
    pub fn chain(&self) -> &AdviceChain {
        &self.chain
    }

    /// Returns `true` if this proxy can stand in for `type_name`.
    ///
    /// Interface proxies only stand in for their interfaces. Subtype proxies
    /// also stand in for everything the target type is assignable to.
    #[must_use]
    pub fn is_assignable_to(&self, type_name: &str) -> bool {
        match self.kind {
            ProxyKind::Interface { .. } => self.descriptor.is_assignable_to(type_name),
            ProxyKind::Subtype { .. } => {
                self.descriptor.is_assignable_to(type_name)
                    || self.target.type_descriptor().is_assignable_to(type_name)
            }
        }
    }
}

impl Component for AdvisedProxy {
    fn type_descriptor(&self) -> Arc<TypeDescriptor> {
        Arc::clone(&self.descriptor)
    }

    fn invoke(&self, method: &MethodDescriptor, args: &[Value]) -> Result<Value, InvocationError> {
        self.chain.dispatch(self.target.as_ref(), method, args)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// ProxyFactory
// ─────────────────────────────────────────────────────────────────────────────

/// Creates proxies for advised components.
pub trait ProxyFactory: Send + Sync {
    /// Creates a proxy, letting the factory pick the variant.
    fn create_proxy(&self, target: Arc<dyn Component>, pointcut: Pointcut) -> AdvisedProxy {
        self.create_proxy_with(target, pointcut, false)
    }

    /// Creates a proxy; `require_concrete` forces a subtype proxy.
    fn create_proxy_with(
        &self,
        target: Arc<dyn Component>,
        pointcut: Pointcut,
        require_concrete: bool,
    ) -> AdvisedProxy;
}

/// Picks the proxy variant with [`ProxyKind::select`].
#[derive(Debug, Default, Clone, Copy)]
pub struct DelegatingProxyFactory;

impl ProxyFactory for DelegatingProxyFactory {
    fn create_proxy_with(
        &self,
        target: Arc<dyn Component>,
        pointcut: Pointcut,
        require_concrete: bool,
    ) -> AdvisedProxy {
        let kind = ProxyKind::select(&target.type_descriptor(), require_concrete);
        AdvisedProxy::new(kind, target, pointcut)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::advisor::{AdviceMethod, Advisor};
    use crate::context::AopContext;
    use crate::join_point::JoinPointState;
    use parking_lot::Mutex;
    use serde_json::json;

    struct Foo {
        descriptor: Arc<TypeDescriptor>,
        calls: Mutex<usize>,
    }

    impl Component for Foo {
        fn type_descriptor(&self) -> Arc<TypeDescriptor> {
            Arc::clone(&self.descriptor)
        }

        fn invoke(&self, method: &MethodDescriptor, args: &[Value]) -> Result<Value, InvocationError> {
            *self.calls.lock() += 1;
            match method.name.as_str() {
                "f" => Ok(json!("X")),
                "fail" => Err(InvocationError::failed("boom")),
                _ => Ok(args.first().cloned().unwrap_or(Value::Null)),
            }
        }
    }

    fn foo(interfaces: &[&str]) -> Arc<Foo> {
        let mut descriptor = TypeDescriptor::new("app.Foo")
            .with_supertype("app.BaseFoo")
            .with_method("f", Vec::<String>::new())
            .with_method("g", ["int"])
            .with_method("fail", Vec::<String>::new());
        for interface in interfaces {
            descriptor = descriptor.with_interface(*interface);
        }
        Arc::new(Foo {
            descriptor: Arc::new(descriptor),
            calls: Mutex::new(0),
        })
    }

    fn recorder(log: &Arc<Mutex<Vec<String>>>, tag: &'static str) -> AdviceMethod {
        let log = Arc::clone(log);
        AdviceMethod::plain(tag, move |jp| {
            log.lock().push(format!("{tag}:{}", jp.method().map_or("", |m| m.name.as_str())));
            Ok(json!("ignored"))
        })
    }

    fn state(target: &Arc<Foo>, advice: AdviceMethod, location: AdviceLocation, order: i32) -> JoinPointState {
        let advisor = Arc::new(Advisor::new("app.Recorder").with_method(advice.clone()));
        JoinPointState::new(Arc::new(AopContext::new()), location)
            .with_target(Arc::clone(target) as Arc<dyn Component>)
            .with_bean_name("fooBean")
            .with_order(order)
            .with_class_scope(true)
            .with_advice(advisor, advice)
    }

    #[test]
    fn selection_prefers_interfaces() {
        let with_interface = TypeDescriptor::new("a.Impl").with_interface("a.Api");
        let without = TypeDescriptor::new("a.Plain");

        assert!(matches!(
            ProxyKind::select(&with_interface, false),
            ProxyKind::Interface { .. }
        ));
        assert!(matches!(
            ProxyKind::select(&with_interface, true),
            ProxyKind::Subtype { .. }
        ));
        assert!(matches!(
            ProxyKind::select(&without, false),
            ProxyKind::Subtype { type_name } if type_name == "a.Plain"
        ));
    }

    #[test]
    fn interface_proxy_is_not_assignable_to_concrete_type() {
        let target = foo(&["app.Api"]);
        let pointcut = Pointcut::new("fooBean", target.type_descriptor());
        let proxy = DelegatingProxyFactory.create_proxy(target, pointcut);

        assert!(proxy.is_assignable_to("app.Api"));
        assert!(!proxy.is_assignable_to("app.Foo"));

        let concrete = DelegatingProxyFactory.create_proxy_with(
            Arc::clone(proxy.target()),
            proxy.pointcut().clone(),
            true,
        );
        assert!(concrete.is_assignable_to("app.Foo"));
        assert_eq!(concrete.type_descriptor().name, "app.Foo$$Advised");
    }

    #[test]
    fn subtype_proxy_is_assignable_to_declared_supertype() {
        let target = foo(&["app.Api"]);
        let pointcut = Pointcut::new("fooBean", target.type_descriptor());
        let proxy = DelegatingProxyFactory.create_proxy_with(target, pointcut, true);

        assert_eq!(proxy.type_descriptor().supertype.as_deref(), Some("app.Foo"));
        assert!(proxy.is_assignable_to("app.BaseFoo"));
        assert!(proxy.is_assignable_to("app.Api"));
        assert!(!proxy.is_assignable_to("app.Other"));

        let interface_only = DelegatingProxyFactory.create_proxy(
            Arc::clone(proxy.target()),
            proxy.pointcut().clone(),
        );
        assert!(!interface_only.is_assignable_to("app.BaseFoo"));
    }

    #[test]
    fn before_target_after_sequence() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let target = foo(&[]);
        let mut pointcut = Pointcut::new("fooBean", target.type_descriptor());
        pointcut.add_join_point(BoundJoinPoint::for_location(state(
            &target,
            recorder(&log, "after"),
            AdviceLocation::After,
            1,
        )));
        pointcut.add_join_point(BoundJoinPoint::for_location(state(
            &target,
            recorder(&log, "before"),
            AdviceLocation::Before,
            2,
        )));

        let proxy = DelegatingProxyFactory.create_proxy(Arc::clone(&target) as Arc<dyn Component>, pointcut);
        let proxy: Arc<dyn Component> = Arc::new(proxy);

        assert_eq!(proxy.call::<&str>("f", &[], vec![]).unwrap(), json!("X"));
        assert_eq!(*log.lock(), vec!["before:f", "after:f"]);
        assert_eq!(*target.calls.lock(), 1);
    }

    #[test]
    fn method_scoped_advice_only_runs_for_its_method() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let target = foo(&[]);
        let g = target.descriptor.method("g", &["int"]).unwrap().clone();
        let mut pointcut = Pointcut::new("fooBean", target.type_descriptor());
        pointcut.add_join_point(BoundJoinPoint::for_location(
            state(&target, recorder(&log, "before"), AdviceLocation::Before, 1)
                .with_class_scope(false)
                .with_method(g),
        ));

        let proxy: Arc<dyn Component> =
            Arc::new(DelegatingProxyFactory.create_proxy(Arc::clone(&target) as Arc<dyn Component>, pointcut));
        proxy.call::<&str>("f", &[], vec![]).unwrap();
        proxy.call("g", &["int"], vec![json!(4)]).unwrap();

        assert_eq!(*log.lock(), vec!["before:g"]);
    }

    #[test]
    fn target_failure_skips_after_advice() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let target = foo(&[]);
        let mut pointcut = Pointcut::new("fooBean", target.type_descriptor());
        pointcut.add_join_point(BoundJoinPoint::for_location(state(
            &target,
            recorder(&log, "after"),
            AdviceLocation::After,
            1,
        )));

        let proxy: Arc<dyn Component> =
            Arc::new(DelegatingProxyFactory.create_proxy(Arc::clone(&target) as Arc<dyn Component>, pointcut));
        let err = proxy.call::<&str>("fail", &[], vec![]).unwrap_err();

        assert!(matches!(err, InvocationError::Failed(msg) if msg == "boom"));
        assert!(log.lock().is_empty());
    }

    #[test]
    fn before_failure_skips_target_and_after() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let target = foo(&[]);
        let mut pointcut = Pointcut::new("fooBean", target.type_descriptor());
        pointcut.add_join_point(BoundJoinPoint::for_location(state(
            &target,
            AdviceMethod::plain("deny", |_jp| Err(InvocationError::failed("denied"))),
            AdviceLocation::Before,
            1,
        )));
        pointcut.add_join_point(BoundJoinPoint::for_location(state(
            &target,
            recorder(&log, "late"),
            AdviceLocation::Before,
            2,
        )));
        pointcut.add_join_point(BoundJoinPoint::for_location(state(
            &target,
            recorder(&log, "after"),
            AdviceLocation::After,
            1,
        )));

        let proxy: Arc<dyn Component> =
            Arc::new(DelegatingProxyFactory.create_proxy(Arc::clone(&target) as Arc<dyn Component>, pointcut));
        let err = proxy.call::<&str>("f", &[], vec![]).unwrap_err();

        assert!(matches!(err, InvocationError::Failed(msg) if msg == "denied"));
        assert!(log.lock().is_empty());
        assert_eq!(*target.calls.lock(), 0);
    }

    #[test]
    fn inapplicable_around_head_falls_through_to_target() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let target = foo(&[]);
        let g = target.descriptor.method("g", &["int"]).unwrap().clone();
        let around_log = Arc::clone(&log);
        let mut pointcut = Pointcut::new("fooBean", target.type_descriptor());
        pointcut.add_join_point(BoundJoinPoint::for_location(
            state(
                &target,
                AdviceMethod::proceeding("wrap", move |pjp| {
                    around_log.lock().push("wrap".to_string());
                    pjp.proceed()
                }),
                AdviceLocation::Around,
                1,
            )
            .with_class_scope(false)
            .with_method(g),
        ));

        let proxy: Arc<dyn Component> =
            Arc::new(DelegatingProxyFactory.create_proxy(Arc::clone(&target) as Arc<dyn Component>, pointcut));

        assert_eq!(proxy.call::<&str>("f", &[], vec![]).unwrap(), json!("X"));
        assert!(log.lock().is_empty());
        assert_eq!(*target.calls.lock(), 1);

        assert_eq!(proxy.call("g", &["int"], vec![json!(7)]).unwrap(), json!(7));
        assert_eq!(*log.lock(), vec!["wrap"]);
        assert_eq!(*target.calls.lock(), 2);
    }

    #[test]
    fn around_without_proceed_short_circuits() {
        let target = foo(&[]);
        let mut pointcut = Pointcut::new("fooBean", target.type_descriptor());
        pointcut.add_join_point(BoundJoinPoint::for_location(state(
            &target,
            AdviceMethod::proceeding("veto", |_pjp| Ok(json!("vetoed"))),
            AdviceLocation::Around,
            1,
        )));

        let proxy: Arc<dyn Component> =
            Arc::new(DelegatingProxyFactory.create_proxy(Arc::clone(&target) as Arc<dyn Component>, pointcut));
        assert_eq!(proxy.call::<&str>("f", &[], vec![]).unwrap(), json!("vetoed"));
        assert_eq!(*target.calls.lock(), 0);
    }

    #[test]
    fn clone_proxy_rebuilds_equivalent_chain() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let target = foo(&[]);
        let mut pointcut = Pointcut::new("fooBean", target.type_descriptor());
        pointcut.add_join_point(BoundJoinPoint::for_location(state(
            &target,
            recorder(&log, "before"),
            AdviceLocation::Before,
            1,
        )));

        let proxy = DelegatingProxyFactory.create_proxy(Arc::clone(&target) as Arc<dyn Component>, pointcut);
        let copy = proxy.clone_proxy();

        assert_eq!(copy.kind(), proxy.kind());
        assert_eq!(copy.chain().before().len(), 1);
        assert_eq!(copy.pointcut().len(), proxy.pointcut().len());

        let copy: Arc<dyn Component> = Arc::new(copy);
        copy.call::<&str>("f", &[], vec![]).unwrap();
        assert_eq!(*log.lock(), vec!["before:f"]);
    }
}

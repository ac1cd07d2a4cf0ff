//! Caching and event aspects woven into a live registry.

use parking_lot::Mutex;
use serde_json::{Value, json};
use std::sync::Arc;
use weft_aop::prelude::*;
use weft_aspects::prelude::*;

struct UserRepo {
    descriptor: Arc<TypeDescriptor>,
    calls: Mutex<Vec<String>>,
}

impl UserRepo {
    fn new() -> Arc<Self> {
        let descriptor = TypeDescriptor::new("app.UserRepo")
            .with_marked_method("find", ["int"], MethodMarker::Cache { name: "users".into() })
            .with_marked_method(
                "reset",
                Vec::<String>::new(),
                MethodMarker::EvictCache { names: vec![] },
            )
            .with_marked_method(
                "save",
                ["String", "int"],
                MethodMarker::Event {
                    name: Some("userSaved".into()),
                    payload: vec![(0, "name".into()), (1, "age".into())],
                },
            )
            .with_marked_method(
                "touch",
                Vec::<String>::new(),
                MethodMarker::Event {
                    name: None,
                    payload: vec![],
                },
            )
            .with_method("count", Vec::<String>::new());
        Arc::new(Self {
            descriptor: Arc::new(descriptor),
            calls: Mutex::new(Vec::new()),
        })
    }

    fn calls_to(&self, name: &str) -> usize {
        self.calls.lock().iter().filter(|call| *call == name).count()
    }
}

impl Component for UserRepo {
    fn type_descriptor(&self) -> Arc<TypeDescriptor> {
        Arc::clone(&self.descriptor)
    }

    fn invoke(&self, method: &MethodDescriptor, args: &[Value]) -> Result<Value, InvocationError> {
        self.calls.lock().push(method.name.clone());
        match method.name.as_str() {
            "find" => Ok(json!({ "id": args.first().cloned().unwrap_or(Value::Null) })),
            "count" => Ok(json!(self.calls.lock().len())),
            _ => Ok(Value::Null),
        }
    }
}

struct Plain(Arc<TypeDescriptor>);

impl Component for Plain {
    fn type_descriptor(&self) -> Arc<TypeDescriptor> {
        Arc::clone(&self.0)
    }

    fn invoke(&self, _method: &MethodDescriptor, _args: &[Value]) -> Result<Value, InvocationError> {
        Ok(Value::Null)
    }
}

struct Fixture {
    registry: Arc<BeanRegistry>,
    context: Arc<AopContext>,
    repo: Arc<UserRepo>,
}

fn woven() -> Fixture {
    let registry = Arc::new(BeanRegistry::new());
    let repo = UserRepo::new();
    registry.register("userRepo", repo.clone());
    registry.register(
        "plainBean",
        Arc::new(Plain(Arc::new(
            TypeDescriptor::new("app.Plain").with_method("run", Vec::<String>::new()),
        ))),
    );

    let context = Arc::new(
        AopContext::new()
            .with_service(MethodCache::new(DEFAULT_CACHE_CAPACITY))
            .with_service(EventBus::new()),
    );
    let builder = GenericPointcutBuilder::new(registry.clone(), Arc::clone(&context));
    ProxyingAspectWeaver::new(registry.clone(), builder, DelegatingProxyFactory)
        .weave(&[cache_aspect(), events_aspect()])
        .unwrap();

    Fixture {
        registry,
        context,
        repo,
    }
}

#[test]
fn only_marked_types_are_proxied() {
    let fixture = woven();
    assert!(fixture.registry.is_proxied("userRepo"));
    assert!(!fixture.registry.is_proxied("plainBean"));
}

#[test]
fn identical_calls_execute_once() {
    let fixture = woven();
    let repo = fixture.registry.resolve("userRepo").unwrap();

    let first = repo.call("find", &["int"], vec![json!(1)]).unwrap();
    let second = repo.call("find", &["int"], vec![json!(1)]).unwrap();

    assert_eq!(first, json!({ "id": 1 }));
    assert_eq!(first, second);
    assert_eq!(fixture.repo.calls_to("find"), 1);

    repo.call("find", &["int"], vec![json!(2)]).unwrap();
    assert_eq!(fixture.repo.calls_to("find"), 2);
    assert_eq!(fixture.context.service::<MethodCache>().unwrap().len("users"), 2);
}

#[test]
fn unmarked_methods_are_not_cached() {
    let fixture = woven();
    let repo = fixture.registry.resolve("userRepo").unwrap();

    repo.call::<&str>("count", &[], vec![]).unwrap();
    repo.call::<&str>("count", &[], vec![]).unwrap();
    assert_eq!(fixture.repo.calls_to("count"), 2);
}

#[test]
fn evicting_method_clears_caches() {
    let fixture = woven();
    let repo = fixture.registry.resolve("userRepo").unwrap();

    repo.call("find", &["int"], vec![json!(1)]).unwrap();
    repo.call::<&str>("reset", &[], vec![]).unwrap();
    repo.call("find", &["int"], vec![json!(1)]).unwrap();

    assert_eq!(fixture.repo.calls_to("find"), 2);
    assert_eq!(fixture.repo.calls_to("reset"), 1);
}

#[test]
fn event_methods_publish_after_returning() {
    let fixture = woven();
    let events = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&events);
    fixture
        .context
        .service::<EventBus>()
        .unwrap()
        .subscribe(move |event| sink.lock().push(event.clone()));

    let repo = fixture.registry.resolve("userRepo").unwrap();
    repo.call("save", &["String", "int"], vec![json!("ada"), json!(36)])
        .unwrap();
    repo.call::<&str>("touch", &[], vec![]).unwrap();
    repo.call::<&str>("count", &[], vec![]).unwrap();

    let events = events.lock();
    assert_eq!(
        *events,
        vec![
            FrameworkEvent::new("userSaved", "userRepo")
                .with_payload("name", json!("ada"))
                .with_payload("age", json!(36)),
            FrameworkEvent::new("touch", "userRepo"),
        ]
    );
}

#[test]
fn missing_services_leave_calls_working() {
    let registry = Arc::new(BeanRegistry::new());
    let repo = UserRepo::new();
    registry.register("userRepo", repo.clone());

    let builder = GenericPointcutBuilder::new(registry.clone(), Arc::new(AopContext::new()));
    ProxyingAspectWeaver::new(registry.clone(), builder, DelegatingProxyFactory)
        .weave(&[cache_aspect(), events_aspect()])
        .unwrap();

    let proxy = registry.resolve("userRepo").unwrap();
    proxy.call("find", &["int"], vec![json!(1)]).unwrap();
    proxy.call("find", &["int"], vec![json!(1)]).unwrap();
    proxy.call::<&str>("touch", &[], vec![]).unwrap();

    assert_eq!(repo.calls_to("find"), 2);
    assert_eq!(repo.calls_to("touch"), 1);
}

//! Shared fixtures for `weft_aop` integration tests.

#![allow(dead_code, reason = "each test binary uses a different subset")]

use parking_lot::Mutex;
use serde_json::{Value, json};
use std::sync::Arc;
use weft_aop::prelude::*;

/// A component that records every call it receives and answers with a fixed
/// value per method name.
pub struct Recorder {
    descriptor: Arc<TypeDescriptor>,
    answers: Vec<(String, Value)>,
    pub calls: Mutex<Vec<String>>,
}

impl Recorder {
    pub fn new(descriptor: TypeDescriptor) -> Arc<Self> {
        Arc::new(Self {
            descriptor: Arc::new(descriptor),
            answers: Vec::new(),
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn answering(descriptor: TypeDescriptor, answers: &[(&str, Value)]) -> Arc<Self> {
        Arc::new(Self {
            descriptor: Arc::new(descriptor),
            answers: answers
                .iter()
                .map(|(name, value)| ((*name).to_string(), value.clone()))
                .collect(),
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }
}

impl Component for Recorder {
    fn type_descriptor(&self) -> Arc<TypeDescriptor> {
        Arc::clone(&self.descriptor)
    }

    fn invoke(&self, method: &MethodDescriptor, _args: &[Value]) -> Result<Value, InvocationError> {
        self.calls.lock().push(method.signature());
        Ok(self
            .answers
            .iter()
            .find(|(name, _)| *name == method.name)
            .map_or(Value::Null, |(_, value)| value.clone()))
    }
}

/// `Foo` with `bar()` and `bar(int)`.
pub fn foo_type() -> TypeDescriptor {
    TypeDescriptor::new("com.example.Foo")
        .with_method("bar", Vec::<String>::new())
        .with_method("bar", ["int"])
        .with_method("f", Vec::<String>::new())
}

/// An around advice that logs `tag` and proceeds.
pub fn tracing_around(log: &Arc<Mutex<Vec<String>>>, tag: &'static str) -> AdviceMethod {
    let log = Arc::clone(log);
    AdviceMethod::proceeding(tag, move |pjp| {
        log.lock().push(format!("{tag}:enter"));
        let result = pjp.proceed()?;
        log.lock().push(format!("{tag}:exit"));
        Ok(result)
    })
}

/// An around advice that never proceeds.
pub fn blocking_around(tag: &'static str) -> AdviceMethod {
    AdviceMethod::proceeding(tag, move |_pjp| Ok(json!(format!("blocked by {tag}"))))
}

pub fn context() -> Arc<AopContext> {
    Arc::new(AopContext::new())
}

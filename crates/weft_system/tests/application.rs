//! Lifecycle tests for `weft_system::application::Application`.

use parking_lot::Mutex;
use std::sync::Arc;
use std::thread;

use weft_system::application::Application;
use weft_system::plugin::{Plugin, PluginGroup, PluginGroupBuilder, PluginId};
use weft_system::resource::Resources;

#[derive(Default)]
struct Log(Arc<Mutex<Vec<String>>>);

impl Log {
    fn entries(&self) -> Vec<String> {
        self.0.lock().clone()
    }
}

struct Recording {
    label: &'static str,
    log: Arc<Mutex<Vec<String>>>,
}

impl Plugin for Recording {
    fn build(&self, _app: &mut Application) {
        self.log.lock().push(format!("build:{}", self.label));
    }

    fn ready(&self, _app: &mut Application) {
        self.log.lock().push(format!("ready:{}", self.label));
    }

    fn cleanup(&self, _app: &mut Application) {
        self.log.lock().push(format!("cleanup:{}", self.label));
    }

    fn is_unique(&self) -> bool {
        false
    }
}

struct Registry;
impl Plugin for Registry {
    fn build(&self, app: &mut Application) {
        app.insert_resource(Vec::<&'static str>::new());
    }
}

struct Weaver;
impl Plugin for Weaver {
    fn build(&self, app: &mut Application) {
        app.get_resource_mut::<Vec<&'static str>>()
            .expect("registry resource")
            .push("weaver");
    }

    fn dependencies(&self) -> Vec<PluginId> {
        vec![PluginId::of::<Registry>()]
    }
}

#[test]
fn dependencies_build_first_regardless_of_insertion_order() {
    let mut app = Application::new();
    app.add_plugins(Weaver).add_plugins(Registry);
    app.finish();

    assert!(app.is_built());
    assert_eq!(
        *app.get_resource::<Vec<&'static str>>().unwrap(),
        vec!["weaver"]
    );
}

#[test]
fn lifecycle_phases_run_in_order() {
    let log = Log::default();
    let mut app = Application::new();
    app.add_plugins(Recording {
        label: "a",
        log: Arc::clone(&log.0),
    })
    .add_plugins(Recording {
        label: "b",
        log: Arc::clone(&log.0),
    });

    app.finish();
    app.cleanup();

    assert_eq!(
        log.entries(),
        vec![
            "build:a",
            "build:b",
            "ready:a",
            "ready:b",
            "cleanup:b",
            "cleanup:a"
        ]
    );
}

#[test]
#[should_panic(expected = "already added")]
fn unique_plugin_added_twice_panics() {
    let mut app = Application::new();
    app.add_plugins(Registry).add_plugins(Registry);
}

#[test]
#[should_panic(expected = "which was not added")]
fn missing_dependency_panics() {
    let mut app = Application::new();
    app.add_plugins(Weaver);
    app.finish();
}

struct Left;
impl Plugin for Left {
    fn build(&self, _app: &mut Application) {}
    fn dependencies(&self) -> Vec<PluginId> {
        vec![PluginId::of::<Right>()]
    }
}

struct Right;
impl Plugin for Right {
    fn build(&self, _app: &mut Application) {}
    fn dependencies(&self) -> Vec<PluginId> {
        vec![PluginId::of::<Left>()]
    }
}

#[test]
#[should_panic(expected = "Circular dependency")]
fn circular_dependency_panics() {
    let mut app = Application::new();
    app.add_plugins(Left).add_plugins(Right);
    app.finish();
}

struct Bundle;
impl PluginGroup for Bundle {
    fn build(self) -> PluginGroupBuilder {
        PluginGroupBuilder::new().add(Registry).add(Weaver)
    }
}

#[test]
fn plugin_group_adds_every_member() {
    let mut app = Application::new();
    app.add_plugins(Bundle.build());
    app.finish();

    assert!(app.has_plugin::<Registry>());
    assert!(app.has_plugin::<Weaver>());
}

#[test]
fn resources_are_shared_across_threads() {
    let mut resources = Resources::new();
    resources.insert(7_u32);
    let resources = Arc::new(resources);

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let resources = Arc::clone(&resources);
            thread::spawn(move || {
                for _ in 0..50 {
                    assert_eq!(*resources.get::<u32>().unwrap(), 7);
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().expect("reader thread panicked");
    }
}

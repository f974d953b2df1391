use ferrous_ioc::{
    BeanDefinition, BeanFactory, InMemoryRegistry, IocError, LifecycleObserver, MetricsObserver, Resolver, Scope,
    SupplierStrategy, TracingObserver,
};
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Default)]
struct Recorder {
    events: Mutex<Vec<String>>,
}

impl Recorder {
    fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }
}

impl LifecycleObserver for Recorder {
    fn resolving(&self, name: &str) {
        self.events.lock().unwrap().push(format!("resolving {name}"));
    }

    fn resolved(&self, name: &str, _duration: Duration) {
        self.events.lock().unwrap().push(format!("resolved {name}"));
    }

    fn resolution_failed(&self, name: &str, _error: &IocError) {
        self.events.lock().unwrap().push(format!("failed {name}"));
    }

    fn created(&self, name: &str, scope: &Scope, _duration: Duration) {
        self.events.lock().unwrap().push(format!("created {name} ({scope})"));
    }
}

fn factory(observer: Arc<dyn LifecycleObserver>) -> BeanFactory {
    let registry = InMemoryRegistry::new();
    registry.register_definition(BeanDefinition::singleton("config")).unwrap();
    registry.register_definition(BeanDefinition::prototype("request")).unwrap();

    BeanFactory::builder()
        .registry(Arc::new(registry))
        .strategy(
            SupplierStrategy::new()
                .supply("config", |_, _| Ok(1u8))
                .supply("request", |ctx, _| Ok(*ctx.get_typed::<u8>("config")? as u32)),
        )
        .observer(observer)
        .build()
        .unwrap()
}

#[test]
fn test_events_are_nested_in_resolution_order() {
    let recorder = Arc::new(Recorder::default());
    let factory = factory(recorder.clone());

    factory.get_bean("request").unwrap();
    factory.get_bean("config").unwrap();
    assert!(factory.get_bean("ghost").is_err());

    assert_eq!(
        recorder.events(),
        vec![
            "resolving request",
            "resolving config",
            "created config (singleton)",
            "resolved config",
            "created request (prototype)",
            "resolved request",
            "resolving config",
            "resolved config",
            "resolving ghost",
            "failed ghost",
        ]
    );
}

#[test]
fn test_metrics_observer_counts_creations_once() {
    let metrics = Arc::new(MetricsObserver::new());
    let factory = factory(metrics.clone());

    for _ in 0..3 {
        factory.get_bean("request").unwrap();
    }

    // Three prototypes, one singleton; every nested lookup counts as a resolution
    assert_eq!(metrics.creation_count(), 4);
    assert_eq!(metrics.resolution_count(), 6);
    assert_eq!(metrics.failure_count(), 0);
    assert!(metrics.average_resolution_time().is_some());
}

#[test]
fn test_tracing_observer_under_subscriber() {
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new("ferrous_ioc=trace"))
        .with_test_writer()
        .finish();

    tracing::subscriber::with_default(subscriber, || {
        let factory = factory(Arc::new(TracingObserver::with_label("observers-test")));
        assert_eq!(*factory.get_typed::<u32>("request").unwrap(), 1);
        assert!(factory.get_bean("ghost").is_err());
    });
}

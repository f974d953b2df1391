//! Observers for bean resolution events.
//!
//! Hooks are called synchronously on the resolving thread, so implementations
//! should stay cheap. With no observers registered the factory skips timing
//! and notification entirely.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, trace, warn};

use crate::{IocError, Scope};

/// Observer trait for bean factory events.
///
/// # Examples
///
/// ```
/// use ferrous_ioc::{IocError, LifecycleObserver, Scope};
/// use std::time::Duration;
///
/// struct PrintObserver;
///
/// impl LifecycleObserver for PrintObserver {
///     fn resolving(&self, name: &str) {
///         println!("resolving {name}");
///     }
///
///     fn resolved(&self, name: &str, duration: Duration) {
///         println!("resolved {name} in {duration:?}");
///     }
///
///     fn resolution_failed(&self, name: &str, error: &IocError) {
///         eprintln!("failed {name}: {error}");
///     }
/// }
/// ```
pub trait LifecycleObserver: Send + Sync {
    /// Called before resolution of `name` starts.
    fn resolving(&self, name: &str);

    /// Called after `name` resolved successfully, cache hits included.
    fn resolved(&self, name: &str, duration: Duration);

    /// Called when resolution of `name` failed.
    fn resolution_failed(&self, name: &str, error: &IocError);

    /// Called each time the creation strategy produced a new instance.
    fn created(&self, name: &str, scope: &Scope, duration: Duration) {
        let _ = (name, scope, duration);
    }
}

/// Container for registered observers.
#[derive(Default, Clone)]
pub(crate) struct Observers {
    observers: Vec<Arc<dyn LifecycleObserver>>,
}

impl Observers {
    pub(crate) fn add(&mut self, observer: Arc<dyn LifecycleObserver>) {
        self.observers.push(observer);
    }

    #[inline]
    pub(crate) fn has_observers(&self) -> bool {
        !self.observers.is_empty()
    }

    #[inline]
    pub(crate) fn resolving(&self, name: &str) {
        for observer in &self.observers {
            observer.resolving(name);
        }
    }

    #[inline]
    pub(crate) fn resolved(&self, name: &str, duration: Duration) {
        for observer in &self.observers {
            observer.resolved(name, duration);
        }
    }

    #[inline]
    pub(crate) fn resolution_failed(&self, name: &str, error: &IocError) {
        for observer in &self.observers {
            observer.resolution_failed(name, error);
        }
    }

    #[inline]
    pub(crate) fn created(&self, name: &str, scope: &Scope, duration: Duration) {
        for observer in &self.observers {
            observer.created(name, scope, duration);
        }
    }
}

/// Observer that forwards every event to `tracing`.
///
/// Resolutions log at `trace`, creations at `debug` and failures at `warn`,
/// all under the `ferrous_ioc::observer` target.
///
/// # Examples
///
/// ```
/// use ferrous_ioc::{BeanFactory, TracingObserver};
/// use std::sync::Arc;
///
/// let builder = BeanFactory::builder().observer(Arc::new(TracingObserver::new()));
/// ```
#[derive(Debug, Clone)]
pub struct TracingObserver {
    label: String,
}

impl TracingObserver {
    pub fn new() -> Self {
        Self::with_label("ferrous-ioc")
    }

    /// Observer whose events carry `label`, to tell several factories apart.
    pub fn with_label(label: impl Into<String>) -> Self {
        Self { label: label.into() }
    }
}

impl Default for TracingObserver {
    fn default() -> Self {
        Self::new()
    }
}

impl LifecycleObserver for TracingObserver {
    fn resolving(&self, name: &str) {
        trace!(target: "ferrous_ioc::observer", factory = %self.label, bean = name, "resolving");
    }

    fn resolved(&self, name: &str, duration: Duration) {
        trace!(target: "ferrous_ioc::observer", factory = %self.label, bean = name, ?duration, "resolved");
    }

    fn resolution_failed(&self, name: &str, error: &IocError) {
        warn!(target: "ferrous_ioc::observer", factory = %self.label, bean = name, %error, "resolution failed");
    }

    fn created(&self, name: &str, scope: &Scope, duration: Duration) {
        debug!(target: "ferrous_ioc::observer", factory = %self.label, bean = name, %scope, ?duration, "created");
    }
}

/// Observer collecting counters.
#[derive(Debug, Default)]
pub struct MetricsObserver {
    resolutions: AtomicU64,
    failures: AtomicU64,
    creations: AtomicU64,
    total_resolution_nanos: AtomicU64,
}

impl MetricsObserver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Successful resolutions, cache hits included.
    pub fn resolution_count(&self) -> u64 {
        self.resolutions.load(Ordering::Relaxed)
    }

    pub fn failure_count(&self) -> u64 {
        self.failures.load(Ordering::Relaxed)
    }

    /// Instances produced by the creation strategy.
    pub fn creation_count(&self) -> u64 {
        self.creations.load(Ordering::Relaxed)
    }

    pub fn total_resolution_time(&self) -> Duration {
        Duration::from_nanos(self.total_resolution_nanos.load(Ordering::Relaxed))
    }

    pub fn average_resolution_time(&self) -> Option<Duration> {
        let count = self.resolution_count();
        if count == 0 {
            return None;
        }
        Some(self.total_resolution_time() / count as u32)
    }

    pub fn reset(&self) {
        self.resolutions.store(0, Ordering::Relaxed);
        self.failures.store(0, Ordering::Relaxed);
        self.creations.store(0, Ordering::Relaxed);
        self.total_resolution_nanos.store(0, Ordering::Relaxed);
    }
}

impl LifecycleObserver for MetricsObserver {
    fn resolving(&self, _name: &str) {}

    fn resolved(&self, _name: &str, duration: Duration) {
        self.resolutions.fetch_add(1, Ordering::Relaxed);
        self.total_resolution_nanos
            .fetch_add(duration.as_nanos() as u64, Ordering::Relaxed);
    }

    fn resolution_failed(&self, _name: &str, _error: &IocError) {
        self.failures.fetch_add(1, Ordering::Relaxed);
    }

    fn created(&self, _name: &str, _scope: &Scope, _duration: Duration) {
        self.creations.fetch_add(1, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metrics_observer_counts() {
        let observer = MetricsObserver::new();
        assert!(observer.average_resolution_time().is_none());

        observer.resolved("a", Duration::from_millis(10));
        observer.resolved("a", Duration::from_millis(20));
        observer.created("a", &Scope::Singleton, Duration::from_millis(5));
        observer.resolution_failed("b", &IocError::NoSuchDefinition("b".into()));

        assert_eq!(observer.resolution_count(), 2);
        assert_eq!(observer.creation_count(), 1);
        assert_eq!(observer.failure_count(), 1);
        assert_eq!(observer.average_resolution_time(), Some(Duration::from_millis(15)));

        observer.reset();
        assert_eq!(observer.resolution_count(), 0);
        assert_eq!(observer.failure_count(), 0);
    }

    #[test]
    fn observers_fan_out() {
        let metrics = Arc::new(MetricsObserver::new());
        let mut observers = Observers::default();
        assert!(!observers.has_observers());
        observers.add(metrics.clone());
        observers.add(Arc::new(TracingObserver::with_label("test")));

        observers.resolving("a");
        observers.resolved("a", Duration::from_millis(1));
        observers.created("a", &Scope::Prototype, Duration::from_millis(1));
        observers.resolution_failed("a", &IocError::CircularPrototype("a".into()));

        assert!(observers.has_observers());
        assert_eq!(metrics.resolution_count(), 1);
        assert_eq!(metrics.creation_count(), 1);
        assert_eq!(metrics.failure_count(), 1);
    }
}

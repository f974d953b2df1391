//! The bean factory: scope dispatch, singleton caching and cycle detection.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use parking_lot::RwLock;
use tracing::{debug, trace};

use crate::class_resolver::{ClassResolver, NoClassResolver};
use crate::observer::{LifecycleObserver, Observers};
use crate::registry::DefinitionRegistry;
use crate::singleton::SingletonCache;
use crate::strategy::CreationStrategy;
use crate::tracker::CreationTracker;
use crate::traits::ResolverCore;
use crate::{AnyArc, BeanDefinition, BoxError, FactoryOptions, IocError, IocResult, Scope, TypeHandle};

mod context;

pub use context::CreationContext;

/// Coordinates bean creation for every name in a registry.
///
/// Singletons are built at most once and cached; prototypes are built on every
/// request. A prototype that (directly or through other beans) requests itself
/// on the same thread fails with [`IocError::CircularPrototype`] instead of
/// recursing forever.
///
/// Cloning a factory is cheap; clones share caches and configuration.
///
/// # Examples
///
/// ```
/// use ferrous_ioc::{BeanDefinition, BeanFactory, InMemoryRegistry, Resolver, SupplierStrategy};
/// use std::sync::Arc;
/// use std::sync::atomic::{AtomicUsize, Ordering};
///
/// struct Config { name: String }
/// struct Request { id: usize }
///
/// let registry = InMemoryRegistry::new();
/// registry.register_definition(BeanDefinition::singleton("config")).unwrap();
/// registry.register_definition(BeanDefinition::prototype("request")).unwrap();
///
/// let counter = Arc::new(AtomicUsize::new(0));
/// let ids = counter.clone();
/// let strategy = SupplierStrategy::new()
///     .supply("config", |_, _| Ok(Config { name: "app".into() }))
///     .supply("request", move |_, _| Ok(Request { id: ids.fetch_add(1, Ordering::SeqCst) }));
///
/// let factory = BeanFactory::builder()
///     .registry(Arc::new(registry))
///     .strategy(strategy)
///     .build()
///     .unwrap();
///
/// let a = factory.get_typed::<Config>("config").unwrap();
/// let b = factory.get_typed::<Config>("config").unwrap();
/// assert!(Arc::ptr_eq(&a, &b));
/// assert_eq!(a.name, "app");
///
/// let r1 = factory.get_typed::<Request>("request").unwrap();
/// let r2 = factory.get_typed::<Request>("request").unwrap();
/// assert_ne!(r1.id, r2.id);
/// ```
#[derive(Clone)]
pub struct BeanFactory {
    inner: Arc<FactoryInner>,
}

struct FactoryInner {
    registry: Arc<dyn DefinitionRegistry>,
    strategy: Arc<dyn CreationStrategy>,
    class_resolver: Arc<dyn ClassResolver>,
    singletons: SingletonCache,
    prototypes_in_creation: CreationTracker,
    already_created: RwLock<HashSet<String>>,
    observers: Observers,
    options: FactoryOptions,
}

impl BeanFactory {
    pub fn builder() -> BeanFactoryBuilder {
        BeanFactoryBuilder::new()
    }

    pub fn registry(&self) -> &Arc<dyn DefinitionRegistry> {
        &self.inner.registry
    }

    pub fn options(&self) -> &FactoryOptions {
        &self.inner.options
    }

    /// Returns the class of `definition`, resolving and memoizing it on first use.
    ///
    /// A failed resolution leaves the definition unresolved, so a later call
    /// asks the class resolver again.
    pub fn resolve_bean_class(&self, definition: &BeanDefinition) -> IocResult<TypeHandle> {
        if let Some(handle) = definition.bean_class() {
            return Ok(handle);
        }
        let class_name = definition
            .bean_class_name()
            .ok_or_else(|| IocError::ClassResolution {
                name: definition.name().to_string(),
                class_name: String::new(),
            })?;
        match self.inner.class_resolver.resolve(class_name) {
            Ok(handle) => {
                trace!(bean = definition.name(), class = class_name, "resolved bean class");
                Ok(definition.memoize_bean_class(handle))
            }
            Err(IocError::ClassResolution { name, class_name: reported }) => Err(IocError::ClassResolution {
                name: if name.is_empty() { definition.name().to_string() } else { name },
                class_name: if reported.is_empty() { class_name.to_string() } else { reported },
            }),
            Err(err) => Err(err),
        }
    }

    /// Resolved class of the definition for `name`, if it declares one.
    ///
    /// Instances registered through [`register_singleton`](Self::register_singleton)
    /// without a definition report `None`.
    pub fn get_type(&self, name: &str) -> IocResult<Option<TypeHandle>> {
        match self.inner.registry.get_definition(name) {
            Ok(definition) if definition.bean_class_name().is_some() => {
                self.resolve_bean_class(&definition).map(Some)
            }
            Ok(_) => Ok(None),
            Err(_) if self.inner.singletons.contains(name) => Ok(None),
            Err(err) => Err(err),
        }
    }

    pub fn is_singleton(&self, name: &str) -> IocResult<bool> {
        if self.inner.singletons.contains(name) {
            return Ok(true);
        }
        Ok(self.inner.registry.get_definition(name)?.is_singleton())
    }

    pub fn is_prototype(&self, name: &str) -> IocResult<bool> {
        match self.inner.registry.get_definition(name) {
            Ok(definition) => Ok(definition.is_prototype()),
            Err(_) if self.inner.singletons.contains(name) => Ok(false),
            Err(err) => Err(err),
        }
    }

    /// Registers an already built instance as the singleton `name`.
    pub fn register_singleton(&self, name: &str, instance: AnyArc) -> IocResult<()> {
        self.inner.singletons.register_singleton(name, instance)
    }

    /// Builds every non-lazy singleton definition, in registration order.
    ///
    /// Returns the number of singletons visited. Stops at the first failure.
    pub fn preinstantiate_singletons(&self) -> IocResult<usize> {
        let mut count = 0;
        for name in self.inner.registry.definition_names() {
            let definition = self.inner.registry.get_definition(&name)?;
            if !definition.is_singleton() || definition.is_lazy_init() {
                continue;
            }
            self.resolve(&name, None, &[], false)?;
            count += 1;
        }
        debug!(count, "pre-instantiated singletons");
        Ok(count)
    }

    pub fn singleton_count(&self) -> usize {
        self.inner.singletons.len()
    }

    /// Names of cached singletons, sorted.
    pub fn singleton_names(&self) -> Vec<String> {
        self.inner.singletons.names()
    }

    /// Whether some thread is building the singleton `name` right now.
    pub fn is_singleton_currently_in_creation(&self, name: &str) -> bool {
        self.inner.singletons.is_currently_in_creation(name)
    }

    /// Prototype names being built on the current thread, outermost first.
    pub fn prototypes_in_creation(&self) -> Vec<String> {
        self.inner.prototypes_in_creation.in_progress()
    }

    /// Whether `name` was handed out by a resolution that was not a type check.
    pub fn was_created(&self, name: &str) -> bool {
        self.inner.already_created.read().contains(name)
    }

    fn mark_created(&self, name: &str) {
        if self.inner.already_created.read().contains(name) {
            return;
        }
        self.inner.already_created.write().insert(name.to_string());
    }

    fn do_resolve(
        &self,
        name: &str,
        required: Option<&TypeHandle>,
        args: &[AnyArc],
        type_check_only: bool,
    ) -> IocResult<AnyArc> {
        if args.is_empty() {
            if let Some(instance) = self.inner.singletons.get(name) {
                trace!(bean = name, "returning cached singleton");
                return self.finish(name, instance, None, required, type_check_only);
            }
        }

        if self.inner.prototypes_in_creation.contains(name) {
            return Err(IocError::CircularPrototype(name.to_string()));
        }

        let definition = self.inner.registry.get_definition(name)?;

        let instance = match definition.scope() {
            Scope::Singleton => self
                .inner
                .singletons
                .get_or_create(name, || self.create_bean(name, &definition, args))?,
            Scope::Prototype => {
                let _guard = self.inner.prototypes_in_creation.guard(name);
                self.create_bean(name, &definition, args)?
            }
            Scope::Other(scope) => {
                return Err(IocError::UnsupportedScope {
                    name: name.to_string(),
                    scope: scope.clone(),
                })
            }
        };

        self.finish(name, instance, Some(definition.as_ref()), required, type_check_only)
    }

    fn finish(
        &self,
        name: &str,
        instance: AnyArc,
        definition: Option<&BeanDefinition>,
        required: Option<&TypeHandle>,
        type_check_only: bool,
    ) -> IocResult<AnyArc> {
        if let Some(required) = required {
            if !required.matches(&instance) {
                return Err(IocError::TypeMismatch {
                    name: name.to_string(),
                    expected: required.name(),
                    actual: self.describe_actual(name, &instance, definition),
                });
            }
        }
        if !type_check_only {
            self.mark_created(name);
        }
        Ok(instance)
    }

    fn describe_actual(&self, name: &str, instance: &AnyArc, definition: Option<&BeanDefinition>) -> String {
        let declared = match definition {
            Some(definition) => definition.bean_class_name().map(str::to_string),
            None => self
                .inner
                .registry
                .get_definition(name)
                .ok()
                .and_then(|definition| definition.bean_class_name().map(str::to_string)),
        };
        declared.unwrap_or_else(|| format!("{:?}", (**instance).type_id()))
    }

    fn create_bean(&self, name: &str, definition: &BeanDefinition, args: &[AnyArc]) -> IocResult<AnyArc> {
        let start = Instant::now();
        let ctx = CreationContext::new(self);
        let instance = self
            .inner
            .strategy
            .build(&ctx, name, definition, args)
            .map_err(|source| IocError::creation(name, source))?;

        let elapsed = start.elapsed();
        debug!(bean = name, scope = %definition.scope(), ?elapsed, "created bean instance");
        if self.inner.observers.has_observers() {
            self.inner.observers.created(name, definition.scope(), elapsed);
        }
        Ok(instance)
    }
}

impl ResolverCore for BeanFactory {
    fn resolve(
        &self,
        name: &str,
        required: Option<&TypeHandle>,
        args: &[AnyArc],
        type_check_only: bool,
    ) -> IocResult<AnyArc> {
        let observers = &self.inner.observers;
        if !observers.has_observers() {
            return self.do_resolve(name, required, args, type_check_only);
        }

        let start = Instant::now();
        observers.resolving(name);
        let result = self.do_resolve(name, required, args, type_check_only);
        match &result {
            Ok(_) => observers.resolved(name, start.elapsed()),
            Err(err) => observers.resolution_failed(name, err),
        }
        result
    }

    fn contains_bean(&self, name: &str) -> bool {
        self.inner.singletons.contains(name) || self.inner.registry.contains_definition(name)
    }
}

impl fmt::Debug for BeanFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BeanFactory")
            .field("definitions", &self.inner.registry.definition_count())
            .field("singletons", &self.inner.singletons.len())
            .field("options", &self.inner.options)
            .finish()
    }
}

/// Builder for [`BeanFactory`].
///
/// A creation strategy is required. Without an explicit registry the factory
/// starts with an empty [`InMemoryRegistry`](crate::InMemoryRegistry) shaped by
/// the options; without a class resolver, symbolic class names never resolve.
#[derive(Default)]
pub struct BeanFactoryBuilder {
    registry: Option<Arc<dyn DefinitionRegistry>>,
    strategy: Option<Arc<dyn CreationStrategy>>,
    class_resolver: Option<Arc<dyn ClassResolver>>,
    observers: Observers,
    options: FactoryOptions,
}

impl BeanFactoryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn registry(mut self, registry: Arc<dyn DefinitionRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    pub fn strategy<S: CreationStrategy + 'static>(mut self, strategy: S) -> Self {
        self.strategy = Some(Arc::new(strategy));
        self
    }

    /// Uses a closure as the creation strategy.
    ///
    /// ```
    /// use ferrous_ioc::{AnyArc, BeanDefinition, BeanFactory, InMemoryRegistry, Resolver};
    /// use std::sync::Arc;
    ///
    /// let registry = InMemoryRegistry::new();
    /// registry.register_definition(BeanDefinition::prototype("greeting")).unwrap();
    ///
    /// let factory = BeanFactory::builder()
    ///     .registry(Arc::new(registry))
    ///     .strategy_fn(|_ctx, name, _def, _args| Ok(Arc::new(format!("hello from {name}")) as AnyArc))
    ///     .build()
    ///     .unwrap();
    ///
    /// assert_eq!(*factory.get_typed::<String>("greeting").unwrap(), "hello from greeting");
    /// ```
    pub fn strategy_fn<F>(mut self, strategy: F) -> Self
    where
        F: Fn(&CreationContext<'_>, &str, &BeanDefinition, &[AnyArc]) -> Result<AnyArc, BoxError>
            + Send
            + Sync
            + 'static,
    {
        self.strategy = Some(Arc::new(strategy));
        self
    }

    pub fn strategy_arc(mut self, strategy: Arc<dyn CreationStrategy>) -> Self {
        self.strategy = Some(strategy);
        self
    }

    pub fn class_resolver<C: ClassResolver + 'static>(mut self, resolver: C) -> Self {
        self.class_resolver = Some(Arc::new(resolver));
        self
    }

    pub fn observer(mut self, observer: Arc<dyn LifecycleObserver>) -> Self {
        self.observers.add(observer);
        self
    }

    pub fn options(mut self, options: FactoryOptions) -> Self {
        self.options = options;
        self
    }

    pub fn build(self) -> IocResult<BeanFactory> {
        self.options.validate()?;
        let strategy = self
            .strategy
            .ok_or_else(|| IocError::InvalidOptions("a creation strategy is required".to_string()))?;
        let registry = match self.registry {
            Some(registry) => registry,
            None => Arc::new(self.options.registry()),
        };

        let factory = BeanFactory {
            inner: Arc::new(FactoryInner {
                registry,
                strategy,
                class_resolver: self.class_resolver.unwrap_or_else(|| Arc::new(NoClassResolver)),
                singletons: SingletonCache::with_shards(self.options.singleton_shards),
                prototypes_in_creation: CreationTracker::new(),
                already_created: RwLock::new(HashSet::new()),
                observers: self.observers,
                options: self.options,
            }),
        };

        if factory.inner.options.preinstantiate {
            factory.preinstantiate_singletons()?;
        }
        Ok(factory)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{InMemoryRegistry, MetricsObserver, Resolver, SupplierStrategy, TypeCatalog};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Service;

    fn registry(definitions: Vec<BeanDefinition>) -> Arc<InMemoryRegistry> {
        let registry = InMemoryRegistry::new();
        for definition in definitions {
            registry.register_definition(definition).unwrap();
        }
        Arc::new(registry)
    }

    #[test]
    fn singleton_built_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let factory = BeanFactory::builder()
            .registry(registry(vec![BeanDefinition::singleton("svc")]))
            .strategy(SupplierStrategy::new().supply("svc", move |_, _| {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(Service)
            }))
            .build()
            .unwrap();

        let a = factory.get_bean("svc").unwrap();
        let b = factory.get_bean("svc").unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(factory.singleton_count(), 1);
        assert!(factory.was_created("svc"));
    }

    #[test]
    fn missing_strategy_is_rejected() {
        let err = BeanFactory::builder().build().unwrap_err();
        assert!(matches!(err, IocError::InvalidOptions(_)));
    }

    #[test]
    fn type_check_does_not_mark_created() {
        let factory = BeanFactory::builder()
            .registry(registry(vec![BeanDefinition::prototype("svc")]))
            .strategy(SupplierStrategy::new().supply("svc", |_, _| Ok(Service)))
            .build()
            .unwrap();

        factory.check_type::<Service>("svc").unwrap();
        assert!(!factory.was_created("svc"));
        factory.get_typed::<Service>("svc").unwrap();
        assert!(factory.was_created("svc"));
    }

    #[test]
    fn mismatch_reports_declared_class() {
        let factory = BeanFactory::builder()
            .registry(registry(vec![BeanDefinition::builder("svc").bean_class::<Service>().build()]))
            .strategy(SupplierStrategy::new().supply("svc", |_, _| Ok(Service)))
            .build()
            .unwrap();

        match factory.get_typed::<String>("svc") {
            Err(IocError::TypeMismatch { actual, expected, .. }) => {
                assert!(actual.ends_with("Service"));
                assert!(expected.contains("String"));
            }
            other => panic!("unexpected {other:?}", other = other.map(|_| ())),
        }
        // Failed type check must not mark the bean
        assert!(!factory.was_created("svc"));
    }

    #[test]
    fn class_resolution_is_memoized() {
        let catalog = TypeCatalog::new();
        catalog.register_alias::<Service>("com.example.Service");
        let reg = registry(vec![BeanDefinition::builder("svc").class_name("com.example.Service").build()]);
        let factory = BeanFactory::builder()
            .registry(reg.clone())
            .class_resolver(catalog)
            .strategy(SupplierStrategy::new().supply_type::<Service, _>(|_, _| Ok(Service)))
            .build()
            .unwrap();

        let definition = reg.get_definition("svc").unwrap();
        assert!(definition.bean_class().is_none());
        assert_eq!(factory.get_type("svc").unwrap(), Some(TypeHandle::of::<Service>()));
        assert_eq!(definition.bean_class(), Some(TypeHandle::of::<Service>()));
        assert!(factory.get_typed::<Service>("svc").is_ok());
    }

    #[test]
    fn observers_see_resolutions() {
        let metrics = Arc::new(MetricsObserver::new());
        let factory = BeanFactory::builder()
            .registry(registry(vec![BeanDefinition::singleton("svc")]))
            .strategy(SupplierStrategy::new().supply("svc", |_, _| Ok(Service)))
            .observer(metrics.clone())
            .build()
            .unwrap();

        factory.get_bean("svc").unwrap();
        factory.get_bean("svc").unwrap();
        assert!(factory.get_bean("nope").is_err());

        assert_eq!(metrics.resolution_count(), 2);
        assert_eq!(metrics.creation_count(), 1);
        assert_eq!(metrics.failure_count(), 1);
    }

    #[test]
    fn preinstantiate_skips_lazy_and_prototypes() {
        let factory = BeanFactory::builder()
            .registry(registry(vec![
                BeanDefinition::singleton("eager"),
                BeanDefinition::builder("lazy").lazy_init(true).build(),
                BeanDefinition::prototype("proto"),
            ]))
            .strategy_fn(|_, _, _, _| Ok(Arc::new(Service) as AnyArc))
            .options(FactoryOptions::default().preinstantiate(true))
            .build()
            .unwrap();

        assert_eq!(factory.singleton_names(), vec!["eager".to_string()]);
        assert_eq!(factory.preinstantiate_singletons().unwrap(), 1);
    }
}

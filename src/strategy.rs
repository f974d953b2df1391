//! Creation strategies: how a definition becomes an instance.

use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;

use crate::{AnyArc, BeanDefinition, BoxError, CreationContext, TypeHandle};

/// Builds bean instances from definitions.
///
/// The factory calls `build` once per singleton and once per prototype
/// request. Returned errors are wrapped into
/// [`IocError::BeanCreation`](crate::IocError::BeanCreation). Use `ctx` to
/// resolve dependencies; nested requests go through the same cycle checks.
///
/// Any function with the matching signature is a strategy:
///
/// ```
/// use ferrous_ioc::{AnyArc, BeanDefinition, BoxError, CreationContext, CreationStrategy};
/// use std::sync::Arc;
///
/// fn shout(_ctx: &CreationContext<'_>, name: &str, _def: &BeanDefinition, _args: &[AnyArc]) -> Result<AnyArc, BoxError> {
///     Ok(Arc::new(name.to_uppercase()))
/// }
///
/// fn accepts(_: impl CreationStrategy) {}
///
/// accepts(shout);
/// ```
///
/// Closures go through
/// [`BeanFactoryBuilder::strategy_fn`](crate::BeanFactoryBuilder::strategy_fn),
/// which pins down their signature.
pub trait CreationStrategy: Send + Sync {
    fn build(
        &self,
        ctx: &CreationContext<'_>,
        name: &str,
        definition: &BeanDefinition,
        args: &[AnyArc],
    ) -> Result<AnyArc, BoxError>;
}

impl<F> CreationStrategy for F
where
    F: Fn(&CreationContext<'_>, &str, &BeanDefinition, &[AnyArc]) -> Result<AnyArc, BoxError>
        + Send
        + Sync,
{
    fn build(
        &self,
        ctx: &CreationContext<'_>,
        name: &str,
        definition: &BeanDefinition,
        args: &[AnyArc],
    ) -> Result<AnyArc, BoxError> {
        self(ctx, name, definition, args)
    }
}

type Supplier = Arc<dyn Fn(&CreationContext<'_>, &[AnyArc]) -> Result<AnyArc, BoxError> + Send + Sync>;

/// Strategy dispatching to suppliers registered by bean name or by class.
///
/// A supplier registered for the bean name wins. Otherwise the definition's
/// class is resolved through the factory and the supplier for that type is
/// used.
///
/// # Examples
///
/// ```
/// use ferrous_ioc::{BeanDefinition, BeanFactory, InMemoryRegistry, Resolver, SupplierStrategy};
/// use std::sync::Arc;
///
/// struct Database { url: String }
///
/// let registry = InMemoryRegistry::new();
/// registry.register_definition(BeanDefinition::builder("db").bean_class::<Database>().build()).unwrap();
/// registry.register_definition(BeanDefinition::singleton("url")).unwrap();
///
/// let strategy = SupplierStrategy::new()
///     .supply("url", |_, _| Ok("postgres://localhost".to_string()))
///     .supply_type::<Database, _>(|ctx, _| {
///         let url = ctx.get_typed::<String>("url")?;
///         Ok(Database { url: url.to_string() })
///     });
///
/// let factory = BeanFactory::builder()
///     .registry(Arc::new(registry))
///     .strategy(strategy)
///     .build()
///     .unwrap();
///
/// let db = factory.get_typed::<Database>("db").unwrap();
/// assert_eq!(db.url, "postgres://localhost");
/// ```
#[derive(Default, Clone)]
pub struct SupplierStrategy {
    by_name: HashMap<String, Supplier>,
    by_type: HashMap<TypeHandle, Supplier>,
}

impl SupplierStrategy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Supplier for the bean called `name`.
    pub fn supply<T, F>(mut self, name: impl Into<String>, supplier: F) -> Self
    where
        T: Any + Send + Sync,
        F: Fn(&CreationContext<'_>, &[AnyArc]) -> Result<T, BoxError> + Send + Sync + 'static,
    {
        self.by_name.insert(name.into(), erase(supplier));
        self
    }

    /// Supplier for every bean whose class resolves to `T`.
    pub fn supply_type<T, F>(mut self, supplier: F) -> Self
    where
        T: Any + Send + Sync,
        F: Fn(&CreationContext<'_>, &[AnyArc]) -> Result<T, BoxError> + Send + Sync + 'static,
    {
        self.by_type.insert(TypeHandle::of::<T>(), erase(supplier));
        self
    }

    pub fn len(&self) -> usize {
        self.by_name.len() + self.by_type.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn erase<T, F>(supplier: F) -> Supplier
where
    T: Any + Send + Sync,
    F: Fn(&CreationContext<'_>, &[AnyArc]) -> Result<T, BoxError> + Send + Sync + 'static,
{
    erased(move |ctx, args| supplier(ctx, args).map(|value| Arc::new(value) as AnyArc))
}

fn erased<F>(supplier: F) -> Supplier
where
    F: Fn(&CreationContext<'_>, &[AnyArc]) -> Result<AnyArc, BoxError> + Send + Sync + 'static,
{
    Arc::new(supplier)
}

impl CreationStrategy for SupplierStrategy {
    fn build(
        &self,
        ctx: &CreationContext<'_>,
        name: &str,
        definition: &BeanDefinition,
        args: &[AnyArc],
    ) -> Result<AnyArc, BoxError> {
        if let Some(supplier) = self.by_name.get(name) {
            return supplier(ctx, args);
        }
        if definition.bean_class_name().is_none() {
            return Err(format!("no supplier registered for bean '{name}' and it declares no class").into());
        }
        let class = ctx.resolve_bean_class(definition)?;
        match self.by_type.get(&class) {
            Some(supplier) => supplier(ctx, args),
            None => Err(format!("no supplier registered for class '{}'", class.name()).into()),
        }
    }
}

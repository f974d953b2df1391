//! Resolver traits for bean resolution.

use std::any::Any;
use std::sync::Arc;

use crate::{AnyArc, IocError, IocResult, TypeHandle};

/// Core resolver trait for object-safe bean resolution.
///
/// Implemented by [`BeanFactory`](crate::BeanFactory) and by the
/// [`CreationContext`](crate::CreationContext) handed to creation strategies,
/// so strategies resolve their dependencies through the same checks as any
/// other caller.
///
/// Most users should use the [`Resolver`] trait instead, which adds typed
/// convenience methods on top of this one.
pub trait ResolverCore: Send + Sync {
    /// Resolves the bean called `name`.
    ///
    /// # Arguments
    ///
    /// * `name` - Bean name
    /// * `required` - Type the instance must have, if any
    /// * `args` - Explicit construction arguments; non-empty arguments skip
    ///   the singleton cache lookup and are forwarded to the strategy
    /// * `type_check_only` - The caller only checks the type and does not
    ///   count as a real use of the bean
    fn resolve(
        &self,
        name: &str,
        required: Option<&TypeHandle>,
        args: &[AnyArc],
        type_check_only: bool,
    ) -> IocResult<AnyArc>;

    /// Whether a singleton is cached or a definition exists for `name`.
    fn contains_bean(&self, name: &str) -> bool;
}

/// High-level resolver interface with typed convenience methods.
///
/// # Examples
///
/// ```
/// use ferrous_ioc::{AnyArc, BeanDefinition, BeanFactory, InMemoryRegistry, Resolver, SupplierStrategy};
/// use std::sync::Arc;
///
/// let registry = InMemoryRegistry::new();
/// registry.register_definition(BeanDefinition::singleton("port")).unwrap();
///
/// let factory = BeanFactory::builder()
///     .registry(Arc::new(registry))
///     .strategy(SupplierStrategy::new().supply("port", |_, _| Ok(8080u16)))
///     .build()
///     .unwrap();
///
/// let any: AnyArc = factory.get_bean("port").unwrap();
/// assert!(any.downcast_ref::<u16>().is_some());
///
/// let port = factory.get_typed::<u16>("port").unwrap();
/// assert_eq!(*port, 8080);
///
/// assert!(factory.get_typed::<u32>("port").is_err());
/// ```
pub trait Resolver: ResolverCore {
    /// Resolves `name` without type requirement or arguments.
    fn get_bean(&self, name: &str) -> IocResult<AnyArc> {
        self.resolve(name, None, &[], false)
    }

    /// Resolves `name` with explicit construction arguments.
    fn get_bean_with_args(&self, name: &str, args: &[AnyArc]) -> IocResult<AnyArc> {
        self.resolve(name, None, args, false)
    }

    /// Resolves `name` and downcasts it to `T`.
    fn get_typed<T: Any + Send + Sync>(&self, name: &str) -> IocResult<Arc<T>> {
        let instance = self.resolve(name, Some(&TypeHandle::of::<T>()), &[], false)?;
        downcast_bean(name, instance)
    }

    /// Resolves `name` with arguments and downcasts it to `T`.
    fn get_typed_with_args<T: Any + Send + Sync>(&self, name: &str, args: &[AnyArc]) -> IocResult<Arc<T>> {
        let instance = self.resolve(name, Some(&TypeHandle::of::<T>()), args, false)?;
        downcast_bean(name, instance)
    }

    /// Checks that `name` resolves to a `T` without marking it as used.
    fn check_type<T: Any + Send + Sync>(&self, name: &str) -> IocResult<()> {
        self.resolve(name, Some(&TypeHandle::of::<T>()), &[], true)
            .map(|_| ())
    }
}

impl<R: ResolverCore + ?Sized> Resolver for R {}

fn downcast_bean<T: Any + Send + Sync>(name: &str, instance: AnyArc) -> IocResult<Arc<T>> {
    instance.downcast::<T>().map_err(|other| IocError::TypeMismatch {
        name: name.to_string(),
        expected: std::any::type_name::<T>(),
        actual: format!("{:?}", (*other).type_id()),
    })
}

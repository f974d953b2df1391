//! Creation context handed to creation strategies.

use crate::traits::ResolverCore;
use crate::{AnyArc, BeanDefinition, BeanFactory, IocResult, TypeHandle};

/// Context passed to creation strategies for resolving dependencies.
///
/// Wraps the factory that is building the current bean. Nested requests made
/// through it see the same singleton cache and the same prototype cycle
/// checks as the outer request.
///
/// # Examples
///
/// ```
/// use ferrous_ioc::{BeanDefinition, BeanFactory, InMemoryRegistry, IocError, Resolver, SupplierStrategy};
/// use std::sync::Arc;
///
/// struct Node;
///
/// let registry = InMemoryRegistry::new();
/// registry.register_definition(BeanDefinition::prototype("node")).unwrap();
///
/// let strategy = SupplierStrategy::new().supply("node", |ctx, _| {
///     // A prototype asking for itself is rejected
///     let err = ctx.get_bean("node").unwrap_err();
///     assert!(matches!(err, IocError::CircularPrototype(_)));
///     assert_eq!(ctx.prototypes_in_creation(), vec!["node".to_string()]);
///     Ok(Node)
/// });
///
/// let factory = BeanFactory::builder()
///     .registry(Arc::new(registry))
///     .strategy(strategy)
///     .build()
///     .unwrap();
///
/// assert!(factory.get_typed::<Node>("node").is_ok());
/// ```
pub struct CreationContext<'a> {
    factory: &'a BeanFactory,
}

impl<'a> CreationContext<'a> {
    pub(crate) fn new(factory: &'a BeanFactory) -> Self {
        Self { factory }
    }

    /// The factory performing the current creation.
    pub fn factory(&self) -> &BeanFactory {
        self.factory
    }

    /// Resolves, and memoizes, the class of `definition`.
    pub fn resolve_bean_class(&self, definition: &BeanDefinition) -> IocResult<TypeHandle> {
        self.factory.resolve_bean_class(definition)
    }

    /// Prototype names currently being built on this thread, outermost first.
    pub fn prototypes_in_creation(&self) -> Vec<String> {
        self.factory.prototypes_in_creation()
    }
}

impl ResolverCore for CreationContext<'_> {
    fn resolve(
        &self,
        name: &str,
        required: Option<&TypeHandle>,
        args: &[AnyArc],
        type_check_only: bool,
    ) -> IocResult<AnyArc> {
        self.factory.resolve(name, required, args, type_check_only)
    }

    fn contains_bean(&self, name: &str) -> bool {
        self.factory.contains_bean(name)
    }
}

//! Definition registry contract and an in-memory implementation.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, warn};

use crate::{BeanDefinition, IocError, IocResult};

/// Source of bean definitions consumed by the factory.
///
/// Implementations must return semantically equivalent definitions for a
/// name across calls; the factory memoizes resolved classes onto them.
pub trait DefinitionRegistry: Send + Sync {
    /// Definition for `name`, or [`IocError::NoSuchDefinition`].
    fn get_definition(&self, name: &str) -> IocResult<Arc<BeanDefinition>>;

    fn contains_definition(&self, name: &str) -> bool;

    /// All definition names, in registration order.
    fn definition_names(&self) -> Vec<String>;

    fn definition_count(&self) -> usize {
        self.definition_names().len()
    }
}

/// Thread-safe registry keeping definitions in memory.
///
/// # Examples
///
/// ```rust
/// use ferrous_ioc::{BeanDefinition, DefinitionRegistry, InMemoryRegistry};
///
/// let registry = InMemoryRegistry::new();
/// registry.register_definition(BeanDefinition::singleton("logger")).unwrap();
/// registry.register_definition(BeanDefinition::prototype("requestCtx")).unwrap();
///
/// assert_eq!(registry.definition_names(), vec!["logger", "requestCtx"]);
/// assert!(registry.get_definition("requestCtx").unwrap().is_prototype());
/// assert!(registry.get_definition("missing").is_err());
/// ```
pub struct InMemoryRegistry {
    inner: RwLock<RegistryInner>,
    allow_overriding: bool,
}

#[derive(Default)]
struct RegistryInner {
    order: Vec<String>,
    definitions: HashMap<String, Arc<BeanDefinition>>,
}

impl InMemoryRegistry {
    /// Registry that silently replaces definitions registered twice.
    pub fn new() -> Self {
        Self::with_overriding(true)
    }

    /// Registry with explicit overriding policy.
    pub fn with_overriding(allow_overriding: bool) -> Self {
        Self {
            inner: RwLock::new(RegistryInner::default()),
            allow_overriding,
        }
    }

    pub fn allows_overriding(&self) -> bool {
        self.allow_overriding
    }

    /// Adds or replaces the definition under its own name.
    ///
    /// A replaced definition keeps its original position in
    /// [`definition_names`](DefinitionRegistry::definition_names).
    pub fn register_definition(&self, definition: BeanDefinition) -> IocResult<()> {
        let name = definition.name().to_string();
        let mut inner = self.inner.write();
        if inner.definitions.contains_key(&name) {
            if !self.allow_overriding {
                return Err(IocError::DefinitionOverride(name));
            }
            warn!(bean = %name, "overriding bean definition");
        } else {
            inner.order.push(name.clone());
        }
        debug!(bean = %name, scope = %definition.scope(), "registered bean definition");
        inner.definitions.insert(name, Arc::new(definition));
        Ok(())
    }

    /// Removes the definition for `name`.
    pub fn remove_definition(&self, name: &str) -> IocResult<Arc<BeanDefinition>> {
        let mut inner = self.inner.write();
        let removed = inner
            .definitions
            .remove(name)
            .ok_or_else(|| IocError::NoSuchDefinition(name.to_string()))?;
        inner.order.retain(|n| n != name);
        Ok(removed)
    }
}

impl Default for InMemoryRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl DefinitionRegistry for InMemoryRegistry {
    fn get_definition(&self, name: &str) -> IocResult<Arc<BeanDefinition>> {
        self.inner
            .read()
            .definitions
            .get(name)
            .cloned()
            .ok_or_else(|| IocError::NoSuchDefinition(name.to_string()))
    }

    fn contains_definition(&self, name: &str) -> bool {
        self.inner.read().definitions.contains_key(name)
    }

    fn definition_names(&self) -> Vec<String> {
        self.inner.read().order.clone()
    }

    fn definition_count(&self) -> usize {
        self.inner.read().order.len()
    }
}

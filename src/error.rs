//! Error types for the bean factory.

use std::error::Error as StdError;
use std::sync::Arc;

use thiserror::Error;

/// Boxed error returned by creation strategies and other collaborators.
pub type BoxError = Box<dyn StdError + Send + Sync + 'static>;

/// Bean factory errors
///
/// Every failure the coordinator can surface. Errors are `Clone` so that a
/// failed singleton build can be handed to every caller that was waiting on it.
///
/// # Examples
///
/// ```rust
/// use ferrous_ioc::{BeanFactory, IocError, InMemoryRegistry, Resolver, SupplierStrategy};
/// use std::sync::Arc;
///
/// let factory = BeanFactory::builder()
///     .registry(Arc::new(InMemoryRegistry::new()))
///     .strategy(SupplierStrategy::new())
///     .build()
///     .unwrap();
///
/// match factory.get_bean("missing") {
///     Err(IocError::NoSuchDefinition(name)) => assert_eq!(name, "missing"),
///     _ => unreachable!(),
/// }
/// ```
#[derive(Debug, Clone, Error)]
pub enum IocError {
    /// No definition registered under this name
    #[error("No bean named '{0}' is defined")]
    NoSuchDefinition(String),

    /// Scope other than singleton or prototype
    #[error("Bean '{name}' declares unsupported scope '{scope}'; only singleton and prototype are supported")]
    UnsupportedScope { name: String, scope: String },

    /// Prototype bean re-entered while it is being built on the same thread
    #[error("Prototype bean '{0}' is currently in creation: is there an unresolvable circular reference?")]
    CircularPrototype(String),

    /// Singleton bean re-entered by the thread that is already building it
    #[error("Singleton bean '{0}' is currently in creation on this thread")]
    CurrentlyInCreation(String),

    /// Symbolic class reference could not be resolved
    #[error("Cannot resolve class '{class_name}' for bean '{name}'")]
    ClassResolution { name: String, class_name: String },

    /// Instance does not satisfy the requested type
    #[error("Bean '{name}' is expected to be of type '{expected}' but was '{actual}'")]
    TypeMismatch {
        name: String,
        expected: &'static str,
        actual: String,
    },

    /// The creation strategy failed
    #[error("Error creating bean '{name}': {source}")]
    BeanCreation {
        name: String,
        #[source]
        source: Arc<dyn StdError + Send + Sync + 'static>,
    },

    /// The thread building a singleton panicked before finishing
    #[error("Creation of singleton '{0}' panicked on another thread")]
    CreationPanicked(String),

    /// A singleton instance is already registered or being created under this name
    #[error("Could not register singleton '{0}': an instance is already bound")]
    SingletonAlreadyExists(String),

    /// Registry refuses to replace an existing definition
    #[error("Cannot register definition '{0}': a definition is already bound and overriding is disabled")]
    DefinitionOverride(String),

    /// Invalid factory options
    #[error("Invalid factory options: {0}")]
    InvalidOptions(String),
}

impl IocError {
    /// Wraps a strategy failure for `name`.
    ///
    /// The original error is kept as the `source`, so callers can still
    /// downcast it.
    pub fn creation(name: impl Into<String>, source: BoxError) -> Self {
        IocError::BeanCreation {
            name: name.into(),
            source: Arc::from(source),
        }
    }

    /// Bean name the error refers to, if any.
    pub fn name(&self) -> Option<&str> {
        match self {
            IocError::NoSuchDefinition(name)
            | IocError::CircularPrototype(name)
            | IocError::CurrentlyInCreation(name)
            | IocError::CreationPanicked(name)
            | IocError::SingletonAlreadyExists(name)
            | IocError::DefinitionOverride(name) => Some(name),
            IocError::UnsupportedScope { name, .. }
            | IocError::ClassResolution { name, .. }
            | IocError::TypeMismatch { name, .. }
            | IocError::BeanCreation { name, .. } => Some(name),
            IocError::InvalidOptions(_) => None,
        }
    }

    /// Underlying strategy error of a `BeanCreation`, unwrapped from its `Arc`.
    pub fn cause(&self) -> Option<&(dyn StdError + Send + Sync + 'static)> {
        match self {
            IocError::BeanCreation { source, .. } => Some(&**source),
            _ => None,
        }
    }

    /// Follows `BeanCreation` sources down to the innermost `IocError`.
    ///
    /// Useful when a nested resolution failed inside a strategy, e.g. a
    /// `CircularPrototype` raised two levels down.
    pub fn root_cause(&self) -> &IocError {
        let mut current = self;
        while let IocError::BeanCreation { source, .. } = current {
            match source.downcast_ref::<IocError>() {
                Some(inner) => current = inner,
                None => break,
            }
        }
        current
    }
}

/// Result type for bean factory operations
pub type IocResult<T> = Result<T, IocError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Error)]
    #[error("disk full")]
    struct DiskFull;

    #[test]
    fn creation_keeps_source() {
        let err = IocError::creation("db", Box::new(DiskFull));
        assert_eq!(err.to_string(), "Error creating bean 'db': disk full");
        assert!(err.source().is_some());
        assert!(err.cause().unwrap().downcast_ref::<DiskFull>().is_some());
        assert_eq!(err.name(), Some("db"));
    }

    #[test]
    fn root_cause_unwraps_nested_creation() {
        let inner = IocError::CircularPrototype("a".into());
        let middle = IocError::creation("b", Box::new(inner));
        let outer = IocError::creation("a", Box::new(middle));

        match outer.root_cause() {
            IocError::CircularPrototype(name) => assert_eq!(name, "a"),
            other => panic!("unexpected root cause: {other:?}"),
        }
    }

    #[test]
    fn root_cause_stops_at_foreign_error() {
        let err = IocError::creation("db", Box::new(DiskFull));
        assert!(matches!(err.root_cause(), IocError::BeanCreation { .. }));
    }
}

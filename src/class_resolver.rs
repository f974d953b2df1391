//! Symbolic class resolution.

use std::any::Any;
use std::collections::HashMap;

use parking_lot::RwLock;

use crate::{IocError, IocResult, TypeHandle};

/// Turns a symbolic class name into a [`TypeHandle`].
///
/// The factory only calls this for definitions whose class has not been
/// resolved yet. Implementations report unknown names as
/// [`IocError::ClassResolution`]; the `name` field may be left empty, the
/// factory fills in the bean name.
pub trait ClassResolver: Send + Sync {
    fn resolve(&self, class_name: &str) -> IocResult<TypeHandle>;
}

/// Resolver over an explicit catalog of Rust types.
///
/// Types are registered under their `std::any::type_name` and optionally under
/// extra aliases.
///
/// # Examples
///
/// ```rust
/// use ferrous_ioc::{ClassResolver, TypeCatalog, TypeHandle};
///
/// struct Database;
///
/// let catalog = TypeCatalog::new();
/// catalog.register::<Database>();
/// catalog.register_alias::<Database>("db.Database");
///
/// assert_eq!(catalog.resolve("db.Database").unwrap(), TypeHandle::of::<Database>());
/// assert_eq!(
///     catalog.resolve(std::any::type_name::<Database>()).unwrap(),
///     TypeHandle::of::<Database>()
/// );
/// assert!(catalog.resolve("db.Unknown").is_err());
/// ```
#[derive(Default)]
pub struct TypeCatalog {
    types: RwLock<HashMap<String, TypeHandle>>,
}

impl TypeCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `T` under its type name.
    pub fn register<T: Any>(&self) -> &Self {
        let handle = TypeHandle::of::<T>();
        self.types.write().insert(handle.name().to_string(), handle);
        self
    }

    /// Registers `T` under `alias`.
    pub fn register_alias<T: Any>(&self, alias: impl Into<String>) -> &Self {
        self.types.write().insert(alias.into(), TypeHandle::of::<T>());
        self
    }

    pub fn len(&self) -> usize {
        self.types.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.read().is_empty()
    }
}

impl ClassResolver for TypeCatalog {
    fn resolve(&self, class_name: &str) -> IocResult<TypeHandle> {
        self.types
            .read()
            .get(class_name)
            .copied()
            .ok_or_else(|| IocError::ClassResolution {
                name: String::new(),
                class_name: class_name.to_string(),
            })
    }
}

/// Resolver that knows no types; every lookup fails.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoClassResolver;

impl ClassResolver for NoClassResolver {
    fn resolve(&self, class_name: &str) -> IocResult<TypeHandle> {
        Err(IocError::ClassResolution {
            name: String::new(),
            class_name: class_name.to_string(),
        })
    }
}

//! Class identity of a bean: a symbolic name that resolves, once, into a type handle.

use std::any::{Any, TypeId};
use std::fmt;

use once_cell::sync::OnceCell;

use crate::AnyArc;

/// Resolved type identity of a bean.
///
/// Pairs the `TypeId` used for checks with the type name used for
/// diagnostics, much like a type key in a service registry.
///
/// # Examples
///
/// ```rust
/// use ferrous_ioc::{AnyArc, TypeHandle};
/// use std::sync::Arc;
///
/// let handle = TypeHandle::of::<String>();
/// assert_eq!(handle.name(), "alloc::string::String");
///
/// let instance: AnyArc = Arc::new("hello".to_string());
/// assert!(handle.matches(&instance));
/// assert!(!TypeHandle::of::<u32>().matches(&instance));
/// ```
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct TypeHandle {
    id: TypeId,
    name: &'static str,
}

impl TypeHandle {
    /// Handle for `T`, named by `std::any::type_name`.
    pub fn of<T: Any>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
        }
    }

    pub fn id(&self) -> TypeId {
        self.id
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Whether the concrete type behind `instance` is this type.
    pub fn matches(&self, instance: &AnyArc) -> bool {
        (**instance).type_id() == self.id
    }
}

impl fmt::Debug for TypeHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TypeHandle({})", self.name)
    }
}

/// Class identity stored on a definition.
///
/// Starts as an optional symbolic class name. The first successful
/// resolution is memoized in a `OnceCell`; concurrent resolutions of the same
/// name race harmlessly since they all produce an equal handle, and the
/// first stored one wins.
#[derive(Clone, Default)]
pub struct BeanClass {
    class_name: Option<String>,
    resolved: OnceCell<TypeHandle>,
}

impl BeanClass {
    /// Unresolved class known by name only.
    pub fn symbolic(class_name: impl Into<String>) -> Self {
        Self {
            class_name: Some(class_name.into()),
            resolved: OnceCell::new(),
        }
    }

    /// Class already resolved to a type.
    pub fn resolved(handle: TypeHandle) -> Self {
        Self {
            class_name: None,
            resolved: OnceCell::with_value(handle),
        }
    }

    /// Memoized handle, if resolution already happened.
    pub fn handle(&self) -> Option<TypeHandle> {
        self.resolved.get().copied()
    }

    pub fn is_resolved(&self) -> bool {
        self.resolved.get().is_some()
    }

    /// Resolved type name if known, otherwise the symbolic name.
    pub fn class_name(&self) -> Option<&str> {
        match self.resolved.get() {
            Some(handle) => Some(handle.name()),
            None => self.class_name.as_deref(),
        }
    }

    /// The symbolic name as configured, even after resolution.
    pub fn symbolic_name(&self) -> Option<&str> {
        self.class_name.as_deref()
    }

    /// Stores `handle` unless one is already present; returns the stored handle.
    pub(crate) fn memoize(&self, handle: TypeHandle) -> TypeHandle {
        *self.resolved.get_or_init(|| handle)
    }
}

impl fmt::Debug for BeanClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.resolved.get(), &self.class_name) {
            (Some(handle), _) => write!(f, "{:?}", handle),
            (None, Some(name)) => write!(f, "Unresolved({})", name),
            (None, None) => f.write_str("NoClass"),
        }
    }
}

//! Bean scope definitions.

use std::fmt;

/// Scope name for shared beans.
pub const SCOPE_SINGLETON: &str = "singleton";

/// Scope name for beans built fresh on every request.
pub const SCOPE_PROTOTYPE: &str = "prototype";

/// Bean scopes controlling instance caching behavior
///
/// Defines whether a bean instance is cached and shared, or built anew for
/// every request. Scopes other than singleton and prototype (`request`,
/// `session`, ...) are carried as [`Scope::Other`] so a definition can still
/// describe them; resolving such a bean fails with
/// [`IocError::UnsupportedScope`](crate::IocError::UnsupportedScope).
///
/// # Examples
///
/// ```rust
/// use ferrous_ioc::Scope;
///
/// assert_eq!(Scope::parse("singleton"), Scope::Singleton);
/// assert_eq!(Scope::parse("prototype"), Scope::Prototype);
/// assert_eq!(Scope::parse(""), Scope::Singleton);
/// assert_eq!(Scope::parse("session"), Scope::Other("session".to_string()));
/// assert_eq!(Scope::default(), Scope::Singleton);
/// assert_eq!(Scope::Other("request".into()).to_string(), "request");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum Scope {
    /// Single instance per factory, cached forever
    ///
    /// Created on first request and shared with every later caller, across
    /// all threads.
    #[default]
    Singleton,
    /// New instance per request, never cached
    Prototype,
    /// Any other scope name; not supported by the factory
    Other(String),
}

impl Scope {
    /// Parses a scope name. An empty name means singleton.
    pub fn parse(name: &str) -> Self {
        match name {
            "" | SCOPE_SINGLETON => Scope::Singleton,
            SCOPE_PROTOTYPE => Scope::Prototype,
            other => Scope::Other(other.to_string()),
        }
    }

    /// The scope name as written in a definition.
    pub fn as_str(&self) -> &str {
        match self {
            Scope::Singleton => SCOPE_SINGLETON,
            Scope::Prototype => SCOPE_PROTOTYPE,
            Scope::Other(name) => name,
        }
    }

    pub fn is_singleton(&self) -> bool {
        matches!(self, Scope::Singleton)
    }

    pub fn is_prototype(&self) -> bool {
        matches!(self, Scope::Prototype)
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for Scope {
    fn from(name: &str) -> Self {
        Scope::parse(name)
    }
}

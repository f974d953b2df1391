//! Bean definitions: how and when to build one named object.
//!
//! A [`BeanDefinition`] is built once through [`BeanDefinitionBuilder`] and
//! then shared as `Arc<BeanDefinition>`. The factory only reads its scope and
//! class identity; everything else is forwarded to the creation strategy.

mod class;

pub use class::{BeanClass, TypeHandle};

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use crate::{AnyArc, Scope};

/// Autowiring mode passed through to the creation strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "config", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "config", serde(rename_all = "snake_case"))]
pub enum AutowireMode {
    /// No autowiring
    #[default]
    No,
    /// Autowire properties by bean name
    ByName,
    /// Autowire properties by type
    ByType,
    /// Autowire constructor arguments by type
    Constructor,
}

/// Insertion-ordered bag of named, type-erased values.
///
/// Backs both definition attributes and property values. Setting an existing
/// name replaces the value in place, keeping its original position.
#[derive(Clone, Default)]
pub struct NamedValues {
    entries: Vec<(String, AnyArc)>,
}

impl NamedValues {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `value` under `name`, returning the previous value.
    pub fn set(&mut self, name: impl Into<String>, value: AnyArc) -> Option<AnyArc> {
        let name = name.into();
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some((_, slot)) => Some(std::mem::replace(slot, value)),
            None => {
                self.entries.push((name, value));
                None
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<&AnyArc> {
        self.entries.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    /// Typed lookup; `None` when absent or of another type.
    pub fn get_as<T: Any + Send + Sync>(&self, name: &str) -> Option<Arc<T>> {
        self.get(name).cloned()?.downcast::<T>().ok()
    }

    pub fn remove(&mut self, name: &str) -> Option<AnyArc> {
        let pos = self.entries.iter().position(|(n, _)| n == name)?;
        Some(self.entries.remove(pos).1)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Names in insertion order.
    pub fn names(&self) -> Vec<&str> {
        self.entries.iter().map(|(n, _)| n.as_str()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &AnyArc)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Debug for NamedValues {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}

/// Description of how and when to build one named bean.
///
/// # Examples
///
/// ```rust
/// use ferrous_ioc::{AutowireMode, BeanDefinition, Scope, TypeHandle};
///
/// let def = BeanDefinition::builder("userRepository")
///     .scope(Scope::Prototype)
///     .class_name("app::UserRepository")
///     .autowire_mode(AutowireMode::ByType)
///     .init_method("connect")
///     .attribute("owner", "accounts".to_string())
///     .build();
///
/// assert_eq!(def.name(), "userRepository");
/// assert!(def.is_prototype());
/// assert!(!def.has_bean_class());
/// assert_eq!(def.bean_class_name(), Some("app::UserRepository"));
/// assert_eq!(def.init_method_name(), Some("connect"));
/// assert_eq!(*def.attribute::<String>("owner").unwrap(), "accounts");
///
/// let resolved = BeanDefinition::builder("counter").bean_class::<u64>().build();
/// assert!(resolved.is_singleton());
/// assert_eq!(resolved.bean_class(), Some(TypeHandle::of::<u64>()));
/// ```
#[derive(Clone)]
pub struct BeanDefinition {
    name: String,
    scope: Scope,
    bean_class: BeanClass,
    lazy_init: bool,
    autowire_mode: AutowireMode,
    init_method_name: Option<String>,
    destroy_method_name: Option<String>,
    factory_method_name: Option<String>,
    factory_bean_name: Option<String>,
    property_values: NamedValues,
    attributes: NamedValues,
}

impl BeanDefinition {
    /// Starts a definition for `name` with singleton scope and no class.
    pub fn builder(name: impl Into<String>) -> BeanDefinitionBuilder {
        BeanDefinitionBuilder::new(name)
    }

    /// Singleton definition without any further configuration.
    pub fn singleton(name: impl Into<String>) -> Self {
        Self::builder(name).build()
    }

    /// Prototype definition without any further configuration.
    pub fn prototype(name: impl Into<String>) -> Self {
        Self::builder(name).scope(Scope::Prototype).build()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    pub fn is_singleton(&self) -> bool {
        self.scope.is_singleton()
    }

    pub fn is_prototype(&self) -> bool {
        self.scope.is_prototype()
    }

    /// Class identity, symbolic or resolved.
    pub fn class(&self) -> &BeanClass {
        &self.bean_class
    }

    /// Whether the class identity has been resolved to a type.
    pub fn has_bean_class(&self) -> bool {
        self.bean_class.is_resolved()
    }

    /// Resolved class, if any.
    pub fn bean_class(&self) -> Option<TypeHandle> {
        self.bean_class.handle()
    }

    /// Resolved type name when resolved, otherwise the symbolic class name.
    pub fn bean_class_name(&self) -> Option<&str> {
        self.bean_class.class_name()
    }

    pub fn is_lazy_init(&self) -> bool {
        self.lazy_init
    }

    pub fn autowire_mode(&self) -> AutowireMode {
        self.autowire_mode
    }

    pub fn init_method_name(&self) -> Option<&str> {
        self.init_method_name.as_deref()
    }

    pub fn destroy_method_name(&self) -> Option<&str> {
        self.destroy_method_name.as_deref()
    }

    pub fn factory_method_name(&self) -> Option<&str> {
        self.factory_method_name.as_deref()
    }

    pub fn factory_bean_name(&self) -> Option<&str> {
        self.factory_bean_name.as_deref()
    }

    pub fn property_values(&self) -> &NamedValues {
        &self.property_values
    }

    pub fn has_property_values(&self) -> bool {
        !self.property_values.is_empty()
    }

    pub fn attributes(&self) -> &NamedValues {
        &self.attributes
    }

    /// Mutable attributes, for definitions not yet shared.
    pub fn attributes_mut(&mut self) -> &mut NamedValues {
        &mut self.attributes
    }

    /// Sets an attribute, replacing any previous value in place.
    pub fn set_attribute<T: Any + Send + Sync>(&mut self, name: impl Into<String>, value: T) -> Option<AnyArc> {
        self.attributes.set(name, Arc::new(value))
    }

    pub fn remove_attribute(&mut self, name: &str) -> Option<AnyArc> {
        self.attributes.remove(name)
    }

    /// Typed attribute lookup.
    pub fn attribute<T: Any + Send + Sync>(&self, name: &str) -> Option<Arc<T>> {
        self.attributes.get_as::<T>(name)
    }

    pub fn has_attribute(&self, name: &str) -> bool {
        self.attributes.contains(name)
    }

    pub fn attribute_names(&self) -> Vec<&str> {
        self.attributes.names()
    }

    pub(crate) fn memoize_bean_class(&self, handle: TypeHandle) -> TypeHandle {
        self.bean_class.memoize(handle)
    }
}

impl fmt::Debug for BeanDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BeanDefinition")
            .field("name", &self.name)
            .field("scope", &self.scope)
            .field("class", &self.bean_class)
            .field("lazy_init", &self.lazy_init)
            .field("autowire_mode", &self.autowire_mode)
            .field("properties", &self.property_values)
            .field("attributes", &self.attributes)
            .finish()
    }
}

/// Fluent builder for [`BeanDefinition`].
pub struct BeanDefinitionBuilder {
    def: BeanDefinition,
}

impl BeanDefinitionBuilder {
    fn new(name: impl Into<String>) -> Self {
        Self {
            def: BeanDefinition {
                name: name.into(),
                scope: Scope::Singleton,
                bean_class: BeanClass::default(),
                lazy_init: false,
                autowire_mode: AutowireMode::No,
                init_method_name: None,
                destroy_method_name: None,
                factory_method_name: None,
                factory_bean_name: None,
                property_values: NamedValues::new(),
                attributes: NamedValues::new(),
            },
        }
    }

    pub fn scope(mut self, scope: impl Into<Scope>) -> Self {
        self.def.scope = scope.into();
        self
    }

    /// Symbolic class reference, resolved later through a `ClassResolver`.
    pub fn class_name(mut self, class_name: impl Into<String>) -> Self {
        self.def.bean_class = BeanClass::symbolic(class_name);
        self
    }

    /// Class already known as a Rust type.
    pub fn bean_class<T: Any>(mut self) -> Self {
        self.def.bean_class = BeanClass::resolved(TypeHandle::of::<T>());
        self
    }

    pub fn lazy_init(mut self, lazy: bool) -> Self {
        self.def.lazy_init = lazy;
        self
    }

    pub fn autowire_mode(mut self, mode: AutowireMode) -> Self {
        self.def.autowire_mode = mode;
        self
    }

    pub fn init_method(mut self, name: impl Into<String>) -> Self {
        self.def.init_method_name = Some(name.into());
        self
    }

    pub fn destroy_method(mut self, name: impl Into<String>) -> Self {
        self.def.destroy_method_name = Some(name.into());
        self
    }

    pub fn factory_method(mut self, name: impl Into<String>) -> Self {
        self.def.factory_method_name = Some(name.into());
        self
    }

    pub fn factory_bean(mut self, name: impl Into<String>) -> Self {
        self.def.factory_bean_name = Some(name.into());
        self
    }

    /// Adds a property value for the strategy to apply.
    pub fn property<T: Any + Send + Sync>(mut self, name: impl Into<String>, value: T) -> Self {
        self.def.property_values.set(name, Arc::new(value));
        self
    }

    /// Adds a metadata attribute.
    pub fn attribute<T: Any + Send + Sync>(mut self, name: impl Into<String>, value: T) -> Self {
        self.def.attributes.set(name, Arc::new(value));
        self
    }

    pub fn build(self) -> BeanDefinition {
        self.def
    }
}

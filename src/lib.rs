//! # ferrous-ioc
//!
//! Named-bean lifecycle coordination: definitions in, instances out.
//!
//! ## Features
//!
//! - **Two scopes**: singletons are built once and shared, prototypes are built on every request
//! - **Single-flight singletons**: concurrent first requests for a name run the strategy exactly once
//! - **Sharded cache**: unrelated singletons are created in parallel
//! - **Cycle detection**: a prototype that requests itself on the same thread fails instead of recursing
//! - **Lazy class resolution**: symbolic class names are resolved once and memoized on the definition
//! - **Pluggable creation**: a [`CreationStrategy`] decides how a definition becomes an instance
//!
//! ## Quick Start
//!
//! ```rust
//! use ferrous_ioc::{BeanDefinition, BeanFactory, InMemoryRegistry, Resolver, SupplierStrategy};
//! use std::sync::Arc;
//!
//! struct Database {
//!     url: String,
//! }
//!
//! struct UserService {
//!     db: Arc<Database>,
//! }
//!
//! // Describe the beans
//! let registry = InMemoryRegistry::new();
//! registry.register_definition(BeanDefinition::singleton("db")).unwrap();
//! registry.register_definition(BeanDefinition::prototype("users")).unwrap();
//!
//! // Tell the factory how to build them
//! let strategy = SupplierStrategy::new()
//!     .supply("db", |_, _| Ok(Database { url: "postgres://localhost".to_string() }))
//!     .supply("users", |ctx, _| Ok(UserService { db: ctx.get_typed::<Database>("db")? }));
//!
//! let factory = BeanFactory::builder()
//!     .registry(Arc::new(registry))
//!     .strategy(strategy)
//!     .build()
//!     .unwrap();
//!
//! let a = factory.get_typed::<UserService>("users").unwrap();
//! let b = factory.get_typed::<UserService>("users").unwrap();
//! assert!(!Arc::ptr_eq(&a, &b));
//! assert!(Arc::ptr_eq(&a.db, &b.db));
//! assert_eq!(a.db.url, "postgres://localhost");
//! ```
//!
//! ## Scopes
//!
//! - **Singleton** (the default): created once, cached and shared by every caller
//! - **Prototype**: created fresh on every request, never cached
//!
//! Any other scope name is rejected at resolution time with
//! [`IocError::UnsupportedScope`].
//!
//! ## Symbolic classes
//!
//! ```rust
//! use ferrous_ioc::{BeanDefinition, BeanFactory, InMemoryRegistry, Resolver, SupplierStrategy, TypeCatalog};
//! use std::sync::Arc;
//!
//! struct Mailer;
//!
//! let catalog = TypeCatalog::new();
//! catalog.register_alias::<Mailer>("mail.SmtpMailer");
//!
//! let registry = InMemoryRegistry::new();
//! registry
//!     .register_definition(BeanDefinition::builder("mailer").class_name("mail.SmtpMailer").build())
//!     .unwrap();
//!
//! let factory = BeanFactory::builder()
//!     .registry(Arc::new(registry))
//!     .class_resolver(catalog)
//!     .strategy(SupplierStrategy::new().supply_type::<Mailer, _>(|_, _| Ok(Mailer)))
//!     .build()
//!     .unwrap();
//!
//! assert!(factory.get_typed::<Mailer>("mailer").is_ok());
//! ```
//!
//! ## Logging
//!
//! The crate logs through `tracing`. Register a [`TracingObserver`] or a
//! [`MetricsObserver`] on the builder for per-resolution events.

use std::any::Any;
use std::sync::Arc;

pub mod class_resolver;
pub mod config;
pub mod definition;
pub mod error;
pub mod factory;
pub mod observer;
pub mod registry;
pub mod scope;
pub mod singleton;
pub mod strategy;
pub mod tracker;
pub mod traits;

/// Type-erased, shareable bean instance.
pub type AnyArc = Arc<dyn Any + Send + Sync>;

pub use class_resolver::{ClassResolver, NoClassResolver, TypeCatalog};
pub use config::{FactoryOptions, MAX_SHARD_COUNT};
pub use definition::{AutowireMode, BeanClass, BeanDefinition, BeanDefinitionBuilder, NamedValues, TypeHandle};
pub use error::{BoxError, IocError, IocResult};
pub use factory::{BeanFactory, BeanFactoryBuilder, CreationContext};
pub use observer::{LifecycleObserver, MetricsObserver, TracingObserver};
pub use registry::{DefinitionRegistry, InMemoryRegistry};
pub use scope::{Scope, SCOPE_PROTOTYPE, SCOPE_SINGLETON};
pub use singleton::{SingletonCache, DEFAULT_SHARD_COUNT};
pub use strategy::{CreationStrategy, SupplierStrategy};
pub use tracker::{CreationGuard, CreationTracker};
pub use traits::{Resolver, ResolverCore};

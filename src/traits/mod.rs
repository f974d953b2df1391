//! Core traits for bean resolution.

mod resolver;

pub use resolver::{Resolver, ResolverCore};

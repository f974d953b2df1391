//! Factory configuration.

use crate::singleton::DEFAULT_SHARD_COUNT;
use crate::{InMemoryRegistry, IocError, IocResult};

/// Largest accepted shard count.
pub const MAX_SHARD_COUNT: usize = 4096;

/// Tuning knobs for a [`BeanFactory`](crate::BeanFactory).
///
/// # Examples
///
/// ```
/// use ferrous_ioc::FactoryOptions;
///
/// let options = FactoryOptions::default()
///     .singleton_shards(16)
///     .preinstantiate(true);
/// assert!(options.validate().is_ok());
///
/// assert!(FactoryOptions::default().singleton_shards(3).validate().is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "config", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "config", serde(default))]
pub struct FactoryOptions {
    /// Shards in the singleton cache; a power of two
    pub singleton_shards: usize,
    /// Whether the default registry replaces definitions registered twice
    pub allow_definition_overriding: bool,
    /// Build all non-lazy singletons when the factory is built
    pub preinstantiate: bool,
}

impl Default for FactoryOptions {
    fn default() -> Self {
        Self {
            singleton_shards: DEFAULT_SHARD_COUNT,
            allow_definition_overriding: true,
            preinstantiate: false,
        }
    }
}

impl FactoryOptions {
    pub fn singleton_shards(mut self, shards: usize) -> Self {
        self.singleton_shards = shards;
        self
    }

    pub fn allow_definition_overriding(mut self, allow: bool) -> Self {
        self.allow_definition_overriding = allow;
        self
    }

    pub fn preinstantiate(mut self, eager: bool) -> Self {
        self.preinstantiate = eager;
        self
    }

    pub fn validate(&self) -> IocResult<()> {
        let shards = self.singleton_shards;
        if shards == 0 || shards > MAX_SHARD_COUNT || !shards.is_power_of_two() {
            return Err(IocError::InvalidOptions(format!(
                "singleton_shards must be a power of two in 1..={MAX_SHARD_COUNT}, got {shards}"
            )));
        }
        Ok(())
    }

    /// Empty registry following these options.
    pub fn registry(&self) -> InMemoryRegistry {
        InMemoryRegistry::with_overriding(self.allow_definition_overriding)
    }

    /// Parses and validates options from JSON. Missing fields take defaults.
    #[cfg(feature = "config")]
    pub fn from_json(json: &str) -> IocResult<Self> {
        let options: Self = serde_json::from_str(json)
            .map_err(|e| IocError::InvalidOptions(e.to_string()))?;
        options.validate()?;
        Ok(options)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let options = FactoryOptions::default();
        assert!(options.validate().is_ok());
        assert_eq!(options.singleton_shards, DEFAULT_SHARD_COUNT);
        assert!(options.registry().allows_overriding());
    }

    #[test]
    fn rejects_bad_shard_counts() {
        for shards in [0, 3, MAX_SHARD_COUNT * 2] {
            let err = FactoryOptions::default().singleton_shards(shards).validate();
            assert!(matches!(err, Err(IocError::InvalidOptions(_))), "{shards}");
        }
    }

    #[cfg(feature = "config")]
    #[test]
    fn from_json_fills_defaults() {
        let options = FactoryOptions::from_json(r#"{ "preinstantiate": true }"#).unwrap();
        assert!(options.preinstantiate);
        assert_eq!(options.singleton_shards, DEFAULT_SHARD_COUNT);

        assert!(FactoryOptions::from_json(r#"{ "singleton_shards": 5 }"#).is_err());
        assert!(FactoryOptions::from_json("not json").is_err());
    }
}

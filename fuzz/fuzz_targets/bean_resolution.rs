#![no_main]

use ferrous_ioc::{BeanDefinition, BeanFactory, InMemoryRegistry, IocError, Resolver, SupplierStrategy};
use libfuzzer_sys::fuzz_target;
use std::sync::Arc;

const SCOPES: [&str; 4] = ["singleton", "prototype", "", "session"];

// Each bean is described by two bytes: scope selector and dependency target.
// Bean `i` resolves bean `dep % count` while it is being built, which yields
// arbitrary graphs with self-loops and longer cycles.
fuzz_target!(|data: &[u8]| {
    if data.len() < 2 {
        return;
    }

    let count = (data.len() / 2).min(16);
    let registry = InMemoryRegistry::new();
    let mut strategy = SupplierStrategy::new();

    for i in 0..count {
        let scope = SCOPES[(data[2 * i] % 4) as usize];
        let dep = (data[2 * i + 1] as usize) % (count + 1);
        let name = format!("bean{i}");
        registry
            .register_definition(BeanDefinition::builder(name.as_str()).scope(scope).build())
            .unwrap();

        strategy = strategy.supply(name, move |ctx, _| {
            // `dep == count` means a leaf
            if dep < count {
                ctx.get_bean(&format!("bean{dep}"))?;
            }
            Ok(i)
        });
    }

    let factory = BeanFactory::builder()
        .registry(Arc::new(registry))
        .strategy(strategy)
        .build()
        .unwrap();

    for i in 0..count {
        let name = format!("bean{i}");
        match factory.get_typed::<usize>(&name) {
            Ok(value) => assert_eq!(*value, i),
            Err(err) => assert!(matches!(
                err.root_cause(),
                IocError::CircularPrototype(_)
                    | IocError::CurrentlyInCreation(_)
                    | IocError::UnsupportedScope { .. }
            )),
        }
        assert!(factory.prototypes_in_creation().is_empty());
    }
});
